//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use waypoint_core::SchemaKind;
use waypoint_runtime::{AuxiliaryContext, GenerationParameters};

/// Waypoint - learning roadmaps, quizzes and lessons from LLMs, with a
/// static fallback when every model fails
#[derive(Parser, Debug)]
#[command(name = "waypoint", version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub generation: GenerationArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate roadmap modules for a career goal
    Roadmap {
        /// Career goal, e.g. "Become a data engineer"
        #[arg(long)]
        goal: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Generate quiz questions on a topic
    Quiz {
        #[arg(long)]
        topic: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Generate a lesson for one roadmap module
    Lesson {
        /// Module title
        #[arg(long)]
        module: String,

        /// Career goal the module belongs to
        #[arg(long)]
        goal: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Normalize, sanitize and validate a saved raw model response
    Check {
        /// roadmap_modules, quiz_questions or lesson
        #[arg(long)]
        schema: SchemaKind,

        /// File holding the raw response text ("-" for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the static fallback content for a schema
    Fallback {
        #[arg(long)]
        schema: SchemaKind,

        /// Goal or topic to mention in the content
        #[arg(long, default_value = "")]
        subject: String,
    },
}

/// Learner context interpolated into prompts.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// University course the learner is enrolled in
    #[arg(long)]
    pub course: Option<String>,

    /// Budget tier for paid resources
    #[arg(long)]
    pub budget: Option<String>,

    /// Experience level
    #[arg(long)]
    pub level: Option<String>,
}

impl From<ContextArgs> for AuxiliaryContext {
    fn from(args: ContextArgs) -> Self {
        AuxiliaryContext {
            university_course: args.course,
            budget_tier: args.budget,
            experience_level: args.level,
        }
    }
}

/// Overrides for the configured generation parameters.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Sampling temperature
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Maximum output tokens
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Read timeout per provider call, e.g. "45s" or "2m"
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl GenerationArgs {
    /// Apply the overrides on top of `base`.
    pub fn apply(&self, base: GenerationParameters) -> GenerationParameters {
        GenerationParameters {
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            timeout: self.timeout.unwrap_or(base.timeout),
        }
    }
}
