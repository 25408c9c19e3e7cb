use crate::quiz::Difficulty;

pub const SYSTEM_PROMPT: &str = "You are an exam question generator. \
You produce high-quality, exam-level multiple choice questions. \
You ALWAYS respond with valid JSON only: no prose, no markdown, no code fences.";

/// Harder tiers use a lower temperature.
pub fn temperature(difficulty: Difficulty) -> f32 {
    match difficulty {
        Difficulty::Beginner => 0.7,
        Difficulty::Intermediate => 0.5,
        Difficulty::Advanced => 0.3,
    }
}

pub fn user_prompt(subject: &str, difficulty: Difficulty, count: usize) -> String {
    format!(
        "Generate EXACTLY {count} multiple choice questions.\n\n\
         Subject: {subject}\n\
         Difficulty: {difficulty}\n\n\
         Rules:\n\
         - Each question must be exam-level\n\
         - 4 options only\n\
         - 1 correct answer\n\
         - Include a concise explanation for the correct answer\n\
         - Return VALID JSON ONLY\n\n\
         Return a JSON array where each element has this shape:\n\
         {{\"question\": \"...\", \"options\": [\"A\",\"B\",\"C\",\"D\"], \"correct_index\": 0, \"explanation\": \"...\"}}\n\n\
         No prose. No markdown. JSON array only."
    )
}
