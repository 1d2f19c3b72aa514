use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use resumesync_core::document::{FieldPath, ListPath};
use resumesync_core::sync::{LogSessionObserver, StaticTokenProvider, SyncStatus};
use resumesync_core::{DocumentCache, IdentityKey, Mutation};
use resumesync_engine::{EditorSession, FlushOutcome, MutationOutcome, SyncContext};
use resumesync_remote::{ContentImproveClient, ResumeStoreClient};
use resumesync_storage_sqlite::SqliteStore;

use crate::cli::Commands;
use crate::config::Config;

pub async fn run(config: &Config, command: Commands) -> Result<()> {
    let store = Arc::new(
        SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open cache at {}", config.db_path.display()))?,
    );

    if let Commands::Cache = command {
        for entry in store.entries()? {
            println!("{}\t{} bytes\t{}", entry.key, entry.size_bytes, entry.updated_at);
        }
        return Ok(());
    }

    let identity = config.identity()?;
    if config.access_token.is_none() {
        warn!(
            "RESUME_ACCESS_TOKEN is not set; edits are only cached locally and \
             opening a resume with no cached copy fails"
        );
    }

    let client = ResumeStoreClient::new(&config.api_url)?;
    let tokens = Arc::new(StaticTokenProvider::new(config.access_token.clone()));
    let context = SyncContext {
        cache: DocumentCache::new(store),
        remote: Arc::new(client.clone()),
        tokens: tokens.clone(),
        observer: Arc::new(LogSessionObserver),
        config: config.scheduler.clone(),
    };

    let mut session = EditorSession::open(&context, identity.clone())
        .await
        .with_context(|| load_failure(&identity, config.access_token.is_some()))?;
    info!("Loaded resume for {} from {:?}", identity, session.source());

    match command {
        Commands::Show => {
            println!("{}", serde_json::to_string_pretty(&*session.document())?);
        }
        Commands::Set { path, value } => {
            let outcome = session.apply(&Mutation::set_path(&path, value)?)?;
            report(&path, outcome);
        }
        Commands::Append { path } => {
            let outcome = session.apply(&Mutation::append(ListPath::parse(&path)?))?;
            report(&path, outcome);
        }
        Commands::Remove { path, index } => {
            let outcome = session.apply(&Mutation::remove(ListPath::parse(&path)?, index))?;
            report(&format!("{}[{}]", path, index), outcome);
        }
        Commands::AddCategory { name } => {
            let outcome = session.apply(&Mutation::AddSkillCategory {
                category: name.clone(),
            })?;
            report(&format!("skills.{}", name), outcome);
        }
        Commands::Reset => {
            let outcome = session.reset()?;
            report("document", outcome);
        }
        Commands::Progress => {
            let completeness = session.completeness();
            println!(
                "{}% complete ({}/{} parts, {} skills)",
                completeness.percent(),
                completeness.filled,
                completeness.total,
                completeness.filled_skills
            );
            for missing in &completeness.missing {
                println!("  missing: {}", missing);
            }
        }
        Commands::Status => print_status(&session.status()),
        Commands::Sync => match session.flush_now().await {
            FlushOutcome::Stored { .. } => println!("Synced"),
            FlushOutcome::Unchanged => println!("Already up to date"),
            FlushOutcome::Skipped => println!("Nothing to sync"),
            FlushOutcome::Failed(err) => println!("Sync failed: {}", err),
        },
        Commands::Improve { path } => {
            let improver = ContentImproveClient::new(client, tokens);
            let improved = session
                .improve_field(&improver, FieldPath::parse(&path)?)
                .await?;
            println!("{}", improved.text);
            for suggestion in &improved.suggestions {
                println!("  - {}", suggestion);
            }
        }
        Commands::Cache => {}
    }

    let status = session.close().await;
    if status.pending {
        warn!("Changes are saved locally but not yet synced");
    }
    Ok(())
}

fn load_failure(identity: &IdentityKey, has_token: bool) -> String {
    if has_token {
        format!("Failed to load resume for {}", identity)
    } else {
        format!(
            "Failed to load resume for {}: no cached copy and RESUME_ACCESS_TOKEN is not set",
            identity
        )
    }
}

fn report(target: &str, outcome: MutationOutcome) {
    match outcome {
        MutationOutcome { dirty: false, .. } => println!("{}: unchanged", target),
        MutationOutcome {
            persisted: false, ..
        } => println!("{}: updated (local save failed)", target),
        MutationOutcome { .. } => println!("{}: updated", target),
    }
}

fn print_status(status: &SyncStatus) {
    println!("state:     {:?}", status.indicator());
    println!("phase:     {:?}", status.phase);
    if let Some(at) = status.last_synced_at {
        println!("synced at: {}", at.to_rfc3339());
    }
    if let Some(error) = &status.last_error {
        println!("error:     {}", error);
    }
    if status.consecutive_failures > 0 {
        println!("failures:  {}", status.consecutive_failures);
    }
}
