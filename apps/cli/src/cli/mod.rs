use clap::{Parser, Subcommand};


#[derive(Debug, Parser)]
#[command(name = "resumesync")]
#[command(about = "Edit a resume locally and keep it in sync with the server", version)]
pub struct Cli {
    /// Resume owner; overrides RESUME_IDENTITY.
    #[arg(long, global = true)]
    pub identity: Option<String>,

    /// Log debug output from the sync engine.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_filter(&self, default: &str) -> String {
        if self.verbose {
            default.replace("=info", "=debug")
        } else {
            default.to_string()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the current document as JSON.
    Show,
    /// Set a field, e.g. `set experience[0].title Engineer`.
    Set { path: String, value: String },
    /// Append an empty entry, e.g. `append projects` or `append skills.Tools`.
    Append { path: String },
    /// Remove an entry; the last one is reset instead.
    Remove { path: String, index: usize },
    /// Add a custom skill category.
    AddCategory { name: String },
    /// Replace the document with the empty template.
    Reset,
    /// Show how much of the resume is filled in.
    Progress,
    /// Show the sync state.
    Status,
    /// Push pending changes now.
    Sync,
    /// Rewrite the text at a field with the content-improvement service.
    Improve { path: String },
    /// List documents in the local cache.
    Cache,
}
