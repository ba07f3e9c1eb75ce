// LLM prompt constants for study plan synthesis.

/// System prompt for plan generation — enforces JSON-only output.
pub const PLAN_SYSTEM: &str = "You are an expert interview-preparation coach creating \
    structured multi-week study plans from skill gaps. Plans organize learning into weekly \
    themes and daily tasks mixing learn, practice and review work. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Plan prompt template.
/// Replace: {weeks}, {hours_per_week}, {total_hours}, {start_date},
///          {interview_date}, {gaps_summary}, {focus_dates}
pub const PLAN_PROMPT_TEMPLATE: &str = r#"Create a {weeks}-week interview-preparation study plan.

CONSTRAINTS:
- Start date: {start_date}
- Interview date: {interview_date}
- Hours per week: {hours_per_week} (hard budget; do not exceed)
- Total available hours: {total_hours}
- Schedulable dates per week: {focus_dates}

SKILL GAPS TO ADDRESS (highest priority first):
{gaps_summary}

Plan rules:
1. Cover the highest-priority gaps in the earliest weeks.
2. Give each week a theme and 2-5 focus skills drawn from the gaps above.
3. Within a day, order tasks learn -> practice -> review; the review recaps
   the previous day's learn and practice work.
4. Use ONLY skill names that appear in the gap list.
5. Dates must be ISO (YYYY-MM-DD) and fall on the schedulable dates listed.

Return a JSON object with this EXACT structure:
{
  "weeks": [
    {
      "week_number": 1,
      "theme": "Container orchestration fundamentals",
      "focus_skills": ["Kubernetes", "Docker"],
      "days": [
        {
          "day_number": 1,
          "date": "2025-03-03",
          "theme": "Core concepts",
          "tasks": [
            {
              "task_type": "learn",
              "title": "Kubernetes architecture walkthrough",
              "description": "Read the official concepts guide covering pods, services and deployments.",
              "skill_names": ["Kubernetes"],
              "estimated_minutes": 60,
              "content": {
                "study_materials": ["Kubernetes concepts documentation"],
                "resources": ["https://kubernetes.io/docs/concepts/"],
                "key_concepts": ["pods", "services", "deployments"],
                "exercises": ["Sketch the control-plane components from memory"]
              }
            }
          ]
        }
      ]
    }
  ]
}"#;

pub fn plan_prompt(
    weeks: i32,
    hours_per_week: f64,
    start_date: &str,
    interview_date: &str,
    gaps_summary: &str,
    focus_dates: &str,
) -> String {
    PLAN_PROMPT_TEMPLATE
        .replace("{weeks}", &weeks.to_string())
        .replace("{hours_per_week}", &format!("{hours_per_week:.1}"))
        .replace(
            "{total_hours}",
            &format!("{:.1}", weeks as f64 * hours_per_week),
        )
        .replace("{start_date}", start_date)
        .replace("{interview_date}", interview_date)
        .replace("{gaps_summary}", gaps_summary)
        .replace("{focus_dates}", focus_dates)
}
