mod cli;
mod processor;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use mediashelf::manager::ScanManager;
use mediashelf::scanner::{CancelToken, RootStatus, Scanner};
use mediashelf::{config, state};
use mediashelf_common::{IndexId, MediaType};
use mediashelf_db::models::Index;
use mediashelf_db::queries::indexes;
use mediashelf_db::{init_pool, DbPool};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediashelf=trace,mediashelf_db=debug,mediashelf_common=debug".to_string()
        } else {
            "mediashelf=debug,mediashelf_db=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    let config = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Start => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(config))
        }
        Commands::Scan { index } => scan_once(&config, &index),
        Commands::AddIndex {
            name,
            media_type,
            folders,
        } => add_index(&config, &name, media_type, &folders),
        Commands::ListIndexes => list_indexes(&config),
        Commands::Status { index } => show_status(&config, &index),
        Commands::Version => {
            println!("mediashelf {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_pool(config: &config::Config) -> Result<DbPool> {
    let db_path = config.database_path();
    tracing::info!("Opening database at {:?}", db_path);
    Ok(init_pool(&db_path.to_string_lossy())?)
}

/// Resolve an index by name first, then by id.
fn resolve_index(pool: &DbPool, name_or_id: &str) -> Result<Index> {
    let conn = pool.get()?;
    if let Some(index) = indexes::get_index_by_name(&conn, name_or_id)? {
        return Ok(index);
    }
    if let Ok(id) = IndexId::parse(name_or_id) {
        if let Some(index) = indexes::get_index(&conn, id)? {
            return Ok(index);
        }
    }
    anyhow::bail!("No index named '{}'", name_or_id)
}

async fn start(config: config::Config) -> Result<()> {
    let pool = open_pool(&config)?;
    let state = state::AppState::new();
    let manager = Arc::new(ScanManager::new(pool.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let proc = processor::ScanProcessor::new(
        pool,
        config.spool_root(),
        manager,
        state.clone(),
        shutdown_rx,
    );
    let handle = tokio::spawn(proc.run());

    tracing::info!("mediashelf running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let _ = shutdown_tx.send(()).await;
    let _ = handle.await;

    Ok(())
}

fn scan_once(config: &config::Config, name_or_id: &str) -> Result<()> {
    let pool = open_pool(config)?;
    let index = resolve_index(&pool, name_or_id)?;

    let scanner = Scanner::new(pool, config.spool_root());
    let cancel = CancelToken::new();
    let summary = scanner.scan_index(index.id, &cancel)?;

    println!("Scanned index '{}'", index.name);
    println!("  files seen:      {}", summary.files_seen);
    println!("  files added:     {}", summary.files_added);
    println!("  files skipped:   {}", summary.files_skipped);
    println!("  parts relocated: {}", summary.parts_relocated);
    println!("  parts migrated:  {}", summary.parts_migrated);
    println!("  parts removed:   {}", summary.parts_removed);
    for root in &summary.roots {
        let status = match root.status {
            RootStatus::Completed => "ok",
            RootStatus::Unavailable => "unavailable",
        };
        println!("  root {:?}: {} ({} files)", root.path, status, root.files_seen);
    }

    Ok(())
}

fn add_index(
    config: &config::Config,
    name: &str,
    media_type: MediaType,
    folders: &[std::path::PathBuf],
) -> Result<()> {
    let pool = open_pool(config)?;
    let conn = pool.get()?;

    for folder in folders {
        if !Path::new(folder).is_dir() {
            tracing::warn!("Root folder does not exist yet: {:?}", folder);
        }
    }

    let folder_strings: Vec<String> = folders
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    let index = indexes::create_index(&conn, name, media_type, &folder_strings)?;

    println!("Created index '{}' ({})", index.name, index.id);
    Ok(())
}

fn list_indexes(config: &config::Config) -> Result<()> {
    let pool = open_pool(config)?;
    let conn = pool.get()?;

    let all = indexes::list_indexes(&conn)?;
    if all.is_empty() {
        println!("No indexes configured. Use `mediashelf add-index` to create one.");
        return Ok(());
    }

    for index in all {
        println!(
            "{}  {}  [{}]  {} folder(s)  status: {}",
            index.id,
            index.name,
            index.media_type,
            index.folders.len(),
            index.scan_status
        );
    }
    Ok(())
}

fn show_status(config: &config::Config, name_or_id: &str) -> Result<()> {
    let pool = open_pool(config)?;
    let index = resolve_index(&pool, name_or_id)?;

    let manager = ScanManager::new(pool);
    let status = manager.status(index.id)?;

    println!("Index '{}': {}", index.name, status.status);
    match index.last_scanned_at {
        Some(at) => println!("  last scanned: {}", at),
        None => println!("  never scanned"),
    }
    Ok(())
}
