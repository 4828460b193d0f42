//! Static fallback content.
//!
//! When every generation path fails the pipeline still has to return
//! something usable. The templates here are authored to satisfy their schemas
//! and personalized only by substituting the learner's subject. Every item
//! carries the `is_fallback` marker.

use serde::{Deserialize, Serialize};

use crate::content::{
    ContentBody, Difficulty, Lesson, LessonFormat, LessonSection, ModuleStatus, QuizDifficulty,
    QuizQuestion, RoadmapModule, ValidatedContent,
};
use crate::schema::SchemaKind;

const DEFAULT_SUBJECT: &str = "your chosen career";

/// Personalization available to fallback templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackContext {
    /// Career goal, topic or module title the content is about
    #[serde(default)]
    pub subject: String,
}

impl FallbackContext {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// Subject to substitute, with a generic default for blank input.
    pub fn subject(&self) -> &str {
        let trimmed = self.subject.trim();
        if trimmed.is_empty() {
            DEFAULT_SUBJECT
        } else {
            trimmed
        }
    }
}

/// Always-available source of schema-conformant content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

impl FallbackProvider {
    pub fn new() -> Self {
        Self
    }

    /// Produce fallback content for a schema. Cannot fail.
    pub fn fallback(&self, schema: SchemaKind, context: &FallbackContext) -> ValidatedContent {
        let subject = context.subject();
        let body = match schema {
            SchemaKind::RoadmapModules => ContentBody::RoadmapModules(roadmap(subject)),
            SchemaKind::QuizQuestions => ContentBody::QuizQuestions(quiz(subject)),
            SchemaKind::Lesson => ContentBody::Lesson(lesson(subject)),
        };
        ValidatedContent::from_static(body)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn roadmap(subject: &str) -> Vec<RoadmapModule> {
    let plan: [(&str, String, Difficulty, u32, [&str; 3]); 6] = [
        (
            "Foundations",
            format!("Core vocabulary, tools and mental models behind {}.", subject),
            Difficulty::Low,
            20,
            ["Key terminology", "Essential tools", "How the field is organized"],
        ),
        (
            "Core Skills",
            format!("The everyday skills practitioners of {} rely on.", subject),
            Difficulty::LowMed,
            40,
            ["Fundamental techniques", "Common workflows", "Reading documentation"],
        ),
        (
            "Guided Practice",
            format!("Small, structured exercises applying {} fundamentals.", subject),
            Difficulty::Med,
            40,
            ["Worked examples", "Practice problems", "Reviewing your mistakes"],
        ),
        (
            "Applied Projects",
            format!("Build portfolio projects that demonstrate {} skills.", subject),
            Difficulty::MedHigh,
            60,
            ["Project scoping", "Building end to end", "Presenting your work"],
        ),
        (
            "Advanced Topics",
            format!("Deeper concepts that separate experienced {} practitioners.", subject),
            Difficulty::High,
            50,
            ["Specialization options", "Performance and quality", "Industry practices"],
        ),
        (
            "Career Readiness",
            format!("Prepare to find work in {}.", subject),
            Difficulty::Med,
            20,
            ["Resume and portfolio", "Interview preparation", "Networking"],
        ),
    ];

    plan.into_iter()
        .enumerate()
        .map(|(i, (title, description, difficulty, hours, topics))| RoadmapModule {
            title: title.to_string(),
            description,
            difficulty,
            order: i as u32 + 1,
            estimated_hours: hours,
            topics: strings(&topics),
            status: Some(ModuleStatus::NotStarted),
            resources: Vec::new(),
            is_fallback: true,
        })
        .collect()
}

fn quiz(subject: &str) -> Vec<QuizQuestion> {
    let question = |text: String, options: [&str; 4], answer: u8, explanation: &str, difficulty| {
        QuizQuestion {
            question: text,
            options: strings(&options),
            correct_answer: answer,
            explanation: explanation.to_string(),
            difficulty,
            is_fallback: true,
        }
    };

    vec![
        question(
            format!("What is the best first step when starting to learn {}?", subject),
            [
                "Master the fundamentals",
                "Skip to advanced topics",
                "Memorize every tool",
                "Avoid practice",
            ],
            0,
            "Solid fundamentals make every later topic easier to learn.",
            QuizDifficulty::Easy,
        ),
        question(
            format!("How do you retain new {} concepts most effectively?", subject),
            [
                "Reading once",
                "Regular hands-on practice",
                "Watching videos only",
                "Cramming before a deadline",
            ],
            1,
            "Spaced, active practice builds lasting understanding.",
            QuizDifficulty::Easy,
        ),
        question(
            format!("What best demonstrates your {} skills to an employer?", subject),
            [
                "A list of courses",
                "Certificates alone",
                "A portfolio of real projects",
                "Years of reading",
            ],
            2,
            "Projects show what you can actually build and deliver.",
            QuizDifficulty::Medium,
        ),
        question(
            format!("What should you do when you get stuck on a {} problem?", subject),
            [
                "Give up on the topic",
                "Copy a solution without reading it",
                "Wait for inspiration",
                "Break it into smaller parts and research each",
            ],
            3,
            "Decomposing a problem turns it into steps you can solve.",
            QuizDifficulty::Medium,
        ),
        question(
            format!("How do experienced {} practitioners keep improving?", subject),
            [
                "Continuous learning and feedback",
                "Avoiding new tools",
                "Working in isolation",
                "Repeating the same tasks",
            ],
            0,
            "Fields evolve; deliberate learning and feedback keep skills current.",
            QuizDifficulty::Hard,
        ),
    ]
}

fn lesson(subject: &str) -> Lesson {
    Lesson {
        title: format!("Getting Started with {}", subject),
        summary: format!(
            "An orientation to {}: what it involves, how to study it and how to practice.",
            subject
        ),
        content_type: LessonFormat::Reading,
        duration_minutes: 30,
        sections: vec![
            LessonSection {
                heading: "What You Will Learn".to_string(),
                body: format!(
                    "This lesson outlines the core ideas of {} and how they fit together.",
                    subject
                ),
            },
            LessonSection {
                heading: "How to Study".to_string(),
                body: "Alternate short reading sessions with hands-on exercises, and review \
                       what you learned at the end of each week."
                    .to_string(),
            },
            LessonSection {
                heading: "Practice".to_string(),
                body: format!(
                    "Pick one small {} task today and complete it from start to finish.",
                    subject
                ),
            },
        ],
        key_takeaways: strings(&[
            "Fundamentals come first",
            "Practice beats passive reading",
            "Small projects build confidence",
        ]),
        is_fallback: true,
    }
}
