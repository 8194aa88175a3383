//! CLI parser.

use clap::{Parser, Subcommand, ValueEnum};
use coach_memory::MessageRole;

#[derive(Parser)]
#[command(name = "coachmem")]
#[command(about = "Coach conversation memory CLI: append, context, clear", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append one message to a (user, coach) conversation and print the saved memory.
    Append {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        coach: String,
        #[arg(short, long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
        #[arg(long)]
        content: String,
    },
    /// Print the assembled context of a conversation as JSON.
    Context {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        coach: String,
        /// Print the model-formatted prompt text instead of JSON.
        #[arg(long)]
        prompt: bool,
        /// System message prepended to the prompt text.
        #[arg(long)]
        system: Option<String>,
    },
    /// Delete all packets and reset the conversation.
    Clear {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        coach: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    User,
    Assistant,
}

impl From<RoleArg> for MessageRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => MessageRole::User,
            RoleArg::Assistant => MessageRole::Assistant,
        }
    }
}
