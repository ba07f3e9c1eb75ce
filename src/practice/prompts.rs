// LLM prompt constants for practice generation, one template per item type.

pub const PRACTICE_SYSTEM: &str = "You are an expert at creating interview-preparation \
    practice material. Questions must be clear, unambiguous and appropriate for the \
    requested difficulty. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// MCQ template. Replace {difficulty}, {skills}, {context}.
pub const MCQ_PROMPT_TEMPLATE: &str = r#"Generate one {difficulty}-level multiple-choice quiz question about: {skills}

Context: {context}

Return JSON:
{
  "title": "Short quiz title",
  "question": "Question text",
  "options": ["Option A", "Option B", "Option C", "Option D"],
  "correct_index": 0,
  "explanation": "Why the correct option is correct"
}

Rules: exactly 4 options, exactly one correct, correct_index is 0-based."#;

/// Short-answer template. Replace {difficulty}, {skills}, {context}.
pub const SHORT_PROMPT_TEMPLATE: &str = r#"Generate one {difficulty}-level short-answer quiz question about: {skills}

Context: {context}

Return JSON:
{
  "title": "Short quiz title",
  "question": "Question text",
  "key_points": ["Key concept 1", "Key concept 2", "Key concept 3"]
}

Rules: 3 to 6 key_points; they form the scoring rubric for the answer."#;

/// Flashcard template. Replace {difficulty}, {skills}, {context}.
pub const FLASHCARD_PROMPT_TEMPLATE: &str = r#"Create one {difficulty}-level flashcard about: {skills}

Context: {context}

Return JSON:
{
  "title": "Flashcard title",
  "front": "Question or prompt (concise)",
  "back": "Answer in at most three short sentences",
  "tags": ["concept1", "concept2"]
}"#;

/// Behavioral template. Replace {difficulty}, {skills}, {context}.
pub const BEHAVIORAL_PROMPT_TEMPLATE: &str = r#"Generate one behavioral interview question for a role requiring: {skills}

Role level: {difficulty}
Context: {context}

Return JSON:
{
  "title": "Behavioral question title",
  "question": "Tell me about a time when...",
  "competency": "leadership",
  "star_guidance": {
    "situation": "What context to describe",
    "task": "What challenge to focus on",
    "action": "What actions to detail",
    "result": "What outcomes to highlight"
  },
  "evaluation_criteria": ["Criterion 1", "Criterion 2", "Criterion 3"]
}"#;

/// System-design template. Replace {difficulty}, {skills}, {context}.
pub const SYSTEM_DESIGN_PROMPT_TEMPLATE: &str = r#"Generate one {difficulty}-level system design question for skills: {skills}

Context: {context}

Return JSON:
{
  "title": "Design challenge title",
  "question": "Design a system to...",
  "requirements": ["Requirement 1", "Requirement 2"],
  "constraints": ["Constraint 1", "Constraint 2"],
  "evaluation_framework": {
    "functional": ["What to evaluate"],
    "non_functional": ["Scalability", "Reliability"],
    "architecture": ["Components", "Data flow"],
    "trade_offs": ["What trade-offs to discuss"],
    "completeness": ["APIs", "Data model"]
  }
}"#;

pub fn fill(template: &str, difficulty: &str, skills: &str, context: &str) -> String {
    template
        .replace("{difficulty}", difficulty)
        .replace("{skills}", skills)
        .replace("{context}", context)
}
