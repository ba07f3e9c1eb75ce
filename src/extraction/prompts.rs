// LLM prompt constants for skill extraction.

/// System prompt for resume skill extraction.
pub const RESUME_EXTRACT_SYSTEM: &str = "You are an expert at analyzing resumes and extracting \
    technical and professional skills. Extract ALL skills demonstrated in the resume: \
    programming languages, frameworks, databases, cloud platforms, tools, soft skills \
    and domain expertise. Evidence text must be quoted VERBATIM from the resume. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// System prompt for job-description requirement extraction.
pub const JD_EXTRACT_SYSTEM: &str = "You are an expert at analyzing job descriptions and \
    extracting required skills and qualifications. Extract ALL required and preferred \
    skills. Confidence reflects how strongly the skill is required: 0.9-1.0 for hard \
    requirements, 0.6-0.8 for preferred or nice-to-have. Evidence text must be quoted \
    VERBATIM from the job description. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Extraction prompt template. Replace `{document_text}` before sending.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract all skills from the document below.

Return a JSON array with this EXACT record structure (no extra fields):
[
  {
    "skill_name": "Python",
    "category": "programming",
    "confidence": 0.95,
    "evidence_text": "Developed machine learning models using Python and scikit-learn",
    "section_name": "experience"
  }
]

Rules:
- skill_name: standardized (e.g. "Python", not "python programming")
- category: one of programming, framework, database, cloud, tool, soft_skill, domain, other
- confidence: 0.0 to 1.0
- evidence_text: an EXACT quote from the document. Records whose evidence does
  not appear in the document will be discarded.
- section_name: the document section the evidence came from, if identifiable

Return an empty array if no skills are found.

DOCUMENT:
{document_text}"#;

pub fn extract_prompt(document_text: &str) -> String {
    EXTRACT_PROMPT_TEMPLATE.replace("{document_text}", document_text)
}
