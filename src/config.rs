use anyhow::{bail, Context, Result};

/// LLM provider backends supported by the coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => {
                bail!("Unsupported LLM provider '{other}' (expected openai, anthropic or ollama)")
            }
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_api_key: String,
    pub ollama_base_url: String,
    pub llm_timeout_seconds: u64,
    /// Temperature for evaluation calls; kept low so scoring stays steady.
    pub eval_temperature: f32,
    /// Temperature for generative calls (plans, practice items, briefings).
    pub generation_temperature: f32,
    /// Weekly minute budget tolerance: a week may hold hours_per_week * 60 * (1 + tolerance).
    pub week_minute_tolerance: f64,
    pub weak_mastery_threshold: f64,
    pub strong_mastery_threshold: f64,
    pub reinforcement_task_count: usize,
    pub min_spacing_days: i64,
    /// Hour of day (local-of-record) calendar events start at.
    pub coach_start_hour: u32,
    pub max_parallel_generations: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_provider = LlmProvider::parse(
            &std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
        )?;

        // Ollama runs locally and needs no key; the hosted providers do.
        let llm_api_key = match llm_provider {
            LlmProvider::OpenAi => require_env("OPENAI_API_KEY")?,
            LlmProvider::Anthropic => require_env("ANTHROPIC_API_KEY")?,
            LlmProvider::Ollama => String::new(),
        };

        let llm_model = std::env::var("LLM_MODEL").unwrap_or_else(|_| match llm_provider {
            LlmProvider::OpenAi => "gpt-4-turbo-preview".to_string(),
            LlmProvider::Anthropic => "claude-sonnet-4-5".to_string(),
            LlmProvider::Ollama => "llama3".to_string(),
        });

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            llm_provider,
            llm_model,
            llm_api_key,
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            llm_timeout_seconds: parse_env("LLM_TIMEOUT_SECONDS", 30)?,
            eval_temperature: parse_env("EVAL_TEMPERATURE", 0.3)?,
            generation_temperature: parse_env("GENERATION_TEMPERATURE", 0.8)?,
            week_minute_tolerance: parse_env("WEEK_MINUTE_TOLERANCE", 0.10)?,
            weak_mastery_threshold: parse_env("WEAK_MASTERY_THRESHOLD", 0.5)?,
            strong_mastery_threshold: parse_env("STRONG_MASTERY_THRESHOLD", 0.8)?,
            reinforcement_task_count: parse_env("REINFORCEMENT_TASK_COUNT", 2)?,
            min_spacing_days: parse_env("MIN_SPACING_DAYS", 2)?,
            coach_start_hour: parse_env("COACH_START_HOUR", 9)?,
            max_parallel_generations: parse_env("MAX_PARALLEL_GENERATIONS", 4)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn llm_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.llm_timeout_seconds)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_known_values() {
        assert_eq!(LlmProvider::parse("openai").unwrap(), LlmProvider::OpenAi);
        assert_eq!(
            LlmProvider::parse("Anthropic").unwrap(),
            LlmProvider::Anthropic
        );
        assert_eq!(LlmProvider::parse("OLLAMA").unwrap(), LlmProvider::Ollama);
    }

    #[test]
    fn test_provider_parse_rejects_unknown() {
        assert!(LlmProvider::parse("cohere").is_err());
    }
}
