// LLM prompt constants for attempt evaluation.

pub const EVALUATION_SYSTEM: &str = "You are an expert evaluator for interview preparation. \
    Score the user's answer against the provided rubric, criterion by criterion. \
    Be fair but thorough; the goal is actionable improvement. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Evaluation prompt template.
/// Replace: {item_type}, {question}, {expected}, {criteria}, {answer}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate this practice attempt against the rubric.

PRACTICE ITEM:
Type: {item_type}
Question: {question}
Expected answer / key points: {expected}

RUBRIC CRITERIA (score each 0.0 to 1.0):
{criteria}

USER'S ANSWER:
{answer}

Return JSON:
{
  "criterion_scores": {
    "Criterion Name": 0.0
  },
  "strengths": ["specific strength 1", "specific strength 2"],
  "weaknesses": ["specific weakness 1", "specific weakness 2"],
  "feedback": "Two to three sentences of constructive, actionable feedback."
}

Score every rubric criterion by its exact name. 2-3 strengths and 2-3 weaknesses."#;

pub fn evaluation_prompt(
    item_type: &str,
    question: &str,
    expected: &str,
    criteria: &str,
    answer: &str,
) -> String {
    EVALUATION_PROMPT_TEMPLATE
        .replace("{item_type}", item_type)
        .replace("{question}", question)
        .replace("{expected}", expected)
        .replace("{criteria}", criteria)
        .replace("{answer}", answer)
}
