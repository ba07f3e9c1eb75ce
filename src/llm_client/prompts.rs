// Cross-cutting prompt fragments shared by every module that calls the LLM.

/// Appended to a system prompt when the first structured response failed to
/// parse. The repeat call must leave no room for prose.
pub const STRICT_JSON_RETRY: &str = "IMPORTANT: your previous response could not be parsed. \
    Respond with ONE valid JSON value and NOTHING else. \
    No markdown code fences. No explanations. No apologies. \
    The first character of your response must be '{' or '['.";
