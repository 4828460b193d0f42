//! Prompt templates for content generation.
//!
//! Each template states the exact JSON shape expected so the normalizer and
//! validator have something to hold the model to. Learner context is
//! interpolated as plain text; it never changes the requested shape.

use crate::request::AuxiliaryContext;

/// System prompt shared by every generation request.
pub const SYSTEM_PROMPT: &str = r#"You are an expert curriculum designer and career mentor.
You produce structured learning content as strict JSON.
Respond with the JSON only: no markdown, no commentary before or after it.
Use exactly the field names and allowed values you are given."#;

const ROADMAP_TEMPLATE: &str = r#"Create a learning roadmap for someone whose goal is: {goal}
{context}
Return a JSON array of 5 to 10 modules, in learning order. Each module is an object:
{
  "title": "string",
  "description": "string, one or two sentences",
  "difficulty": "Low" | "Low-Med" | "Med" | "Med-High" | "High",
  "order": integer starting at 1,
  "estimated_hours": integer between 1 and 200,
  "topics": ["string", ...],
  "resources": ["string", ...]
}"#;

const QUIZ_TEMPLATE: &str = r#"Write a multiple-choice quiz on: {topic}
{context}
Return a JSON array of 5 questions. Each question is an object:
{
  "question": "string",
  "options": ["string", "string", "string", "string"],
  "correct_answer": integer index 0 to 3,
  "explanation": "string",
  "difficulty": "easy" | "medium" | "hard"
}"#;

const LESSON_TEMPLATE: &str = r#"Write a lesson for the module "{module}" within a roadmap whose goal is: {goal}
{context}
Return a single JSON object:
{
  "title": "string",
  "summary": "string",
  "content_type": "reading" | "video" | "exercise" | "project",
  "duration_minutes": integer between 5 and 240,
  "sections": [{"heading": "string", "body": "string"}, ...],
  "key_takeaways": ["string", ...]
}"#;

/// Render learner context as prompt lines, or nothing when empty.
fn render_context(aux: &AuxiliaryContext) -> String {
    let mut lines = Vec::new();
    if let Some(course) = non_blank(&aux.university_course) {
        lines.push(format!("The learner is studying: {}.", course));
    }
    if let Some(level) = non_blank(&aux.experience_level) {
        lines.push(format!("Their experience level is: {}.", level));
    }
    if let Some(budget) = non_blank(&aux.budget_tier) {
        lines.push(format!(
            "Their budget for paid resources is: {}. Prefer resources within it.",
            budget
        ));
    }
    lines.join("\n")
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Prompt for a roadmap module list.
pub fn roadmap_prompt(goal: &str, aux: &AuxiliaryContext) -> String {
    ROADMAP_TEMPLATE
        .replace("{goal}", goal.trim())
        .replace("{context}", &render_context(aux))
}

/// Prompt for a quiz question list.
pub fn quiz_prompt(topic: &str, aux: &AuxiliaryContext) -> String {
    QUIZ_TEMPLATE
        .replace("{topic}", topic.trim())
        .replace("{context}", &render_context(aux))
}

/// Prompt for a single lesson.
pub fn lesson_prompt(module_title: &str, goal: &str, aux: &AuxiliaryContext) -> String {
    LESSON_TEMPLATE
        .replace("{module}", module_title.trim())
        .replace("{goal}", goal.trim())
        .replace("{context}", &render_context(aux))
}
