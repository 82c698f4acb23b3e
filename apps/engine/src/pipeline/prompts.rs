// Instruction template for the scoring call. The inference capability gets
// the stored resume plus this template; it must answer with JSON matching the
// `Feedback` wire shape exactly, since the pipeline parses the payload with no
// repair pass.

/// JSON shape the model must produce. Mirrors `models::feedback`.
const FEEDBACK_FORMAT: &str = r#"{
  "overallScore": <number 0-100>,
  "toneAndStyle": { "score": <number 0-100>, "tips": [ { "type": "good" | "improve", "tip": "<short title>", "explanation": "<concrete detail>" } ] },
  "content": { "score": <number 0-100>, "tips": [ ... ] },
  "structure": { "score": <number 0-100>, "tips": [ ... ] },
  "skills": { "score": <number 0-100>, "tips": [ ... ] },
  "ATS": { "score": <number 0-100>, "tips": [ ... ] }
}"#;

/// Builds the scoring instructions for one job posting.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        "You are an expert in applicant tracking systems and resume review. \
         Analyze and rate the attached resume for the role below. Be thorough: \
         low scores are acceptable when deserved, and every 'improve' tip must \
         name something the candidate can actually change.\n\
         Job title: {job_title}\n\
         Job description: {job_description}\n\
         Respond with valid JSON only, matching this format exactly. Do NOT \
         include any text outside the JSON object and do NOT use markdown code \
         fences:\n{FEEDBACK_FORMAT}"
    )
}
