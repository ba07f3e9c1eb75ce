// LLM prompt constants for the daily coach.

pub const MOTIVATION_SYSTEM: &str = "You are a supportive, encouraging study coach. \
    Generate one brief motivating paragraph (1-2 sentences) from the user's progress. \
    Be positive, specific and actionable. Respond with plain text only: no JSON, \
    no markdown.";

/// Motivational message template.
/// Replace: {completed}, {pending}, {overdue}, {completion_pct}, {focus_skills}
pub const MOTIVATION_PROMPT_TEMPLATE: &str = r#"Generate a motivational message for today's study session.

Completed tasks: {completed}
Pending tasks: {pending}
Overdue tasks: {overdue}
Completion percentage: {completion_pct}%
Today's focus skills: {focus_skills}

One brief, encouraging message."#;

pub fn motivation_prompt(
    completed: usize,
    pending: usize,
    overdue: usize,
    completion_pct: f64,
    focus_skills: &[String],
) -> String {
    let skills = if focus_skills.is_empty() {
        "general skills".to_string()
    } else {
        focus_skills.join(", ")
    };
    MOTIVATION_PROMPT_TEMPLATE
        .replace("{completed}", &completed.to_string())
        .replace("{pending}", &pending.to_string())
        .replace("{overdue}", &overdue.to_string())
        .replace("{completion_pct}", &format!("{completion_pct:.1}"))
        .replace("{focus_skills}", &skills)
}

/// Deterministic fallback when the model is unavailable. The briefing never
/// blocks on the motivational call.
pub fn fallback_message(completed: usize, pending: usize) -> String {
    if completed > 0 {
        format!("Great progress! You've completed {completed} task(s) today. Keep up the momentum!")
    } else if pending > 0 {
        format!("You have {pending} task(s) ahead. Take it one step at a time - you've got this!")
    } else {
        "Every journey begins with a single step. Let's make today count!".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_prefers_completed() {
        assert!(fallback_message(2, 3).contains("completed 2"));
    }

    #[test]
    fn test_fallback_pending_only() {
        assert!(fallback_message(0, 3).contains("3 task(s) ahead"));
    }

    #[test]
    fn test_fallback_empty_day() {
        assert!(fallback_message(0, 0).contains("single step"));
    }
}
