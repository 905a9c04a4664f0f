use crate::config::MenuRegistry;
use crate::error::{SyncError, SyncResult};
use crate::logging::LOG_FILE;
use crate::scheduler::{read_status_file, Scheduler, STATUS_FILE};
use crate::sheets::google::TOKEN_ENV;
use crate::sheets::GoogleSheets;
use crate::sync::{StateStore, SyncOrchestrator, CONSOLIDATED_KEY};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

/// Paths shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub state_dir: PathBuf,
    pub config: Option<PathBuf>,
}

impl Context {
    pub fn new(state_dir: PathBuf, config: Option<PathBuf>) -> Self {
        Self { state_dir, config }
    }

    pub fn registry(&self) -> SyncResult<MenuRegistry> {
        MenuRegistry::load_or_builtin(self.config.as_deref())
    }

    pub fn state(&self) -> StateStore {
        StateStore::new(&self.state_dir)
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join(LOG_FILE)
    }

    fn status_file(&self) -> PathBuf {
        self.state_dir.join(STATUS_FILE)
    }
}

fn connect() -> SyncResult<GoogleSheets> {
    match GoogleSheets::from_env() {
        Some(client) => Ok(client?),
        None => Err(SyncError::Config(format!(
            "{} is not set. Export an OAuth access token with the spreadsheets and drive scopes.",
            TOKEN_ENV
        ))),
    }
}

fn format_instant(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "never".to_string(),
    }
}

fn report_failures(results: &[(String, bool)]) -> SyncResult<()> {
    let failed: Vec<String> = results
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(id, _)| id.clone())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(SyncError::SyncFailed { menus: failed })
    }
}

/// Execute the menus command - list configured menus
pub fn menus(ctx: &Context) -> SyncResult<()> {
    let registry = ctx.registry()?;

    println!("{}", "📋 Configured menus".bold().green());
    if let Some(path) = &ctx.config {
        println!("   Config: {}", path.display());
    }
    println!();

    for menu in registry.menus() {
        println!("   {} {}", menu.id.bright_blue().bold(), menu.name);
        println!("      Source: {} / {}", menu.source_sheet_id, menu.source_sheet_tab);
        println!("      Target: {}", menu.target_sheet_name);
        if menu.filter_enabled {
            println!("      Filter: {}", menu.row_filter_keywords.join(", ").cyan());
        }
    }

    let consolidated = registry.consolidated();
    println!();
    println!(
        "   {} {}",
        CONSOLIDATED_KEY.bright_blue().bold(),
        consolidated.current_title()
    );
    for tab in &consolidated.tabs {
        println!("      {} ← {}", tab.title, tab.menu);
    }
    Ok(())
}

/// Execute the sync command
pub fn sync(ctx: &Context, menu: &str, dry_run: bool) -> SyncResult<()> {
    let registry = ctx.registry()?;
    let ids = registry.select(menu)?;
    let sheets = connect()?;
    let orchestrator = SyncOrchestrator::new(&sheets, &registry, ctx.state());

    println!("{}", "🔄 Syncing menus".bold().green());
    println!("   Menus: {}", ids.join(", "));
    println!();

    if dry_run {
        println!("{}", "📋 DRY RUN MODE - No changes will be written\n".yellow());
        let mut results = Vec::new();
        for (id, preview) in orchestrator.preview_each(&ids) {
            let composition = match preview {
                Ok(composition) => composition,
                Err(e) => {
                    println!("   {} {}: {}", "❌".red(), id.bright_blue().bold(), e);
                    results.push((id, false));
                    continue;
                }
            };
            let stats = composition.stats;
            println!("   {} {}", "✅".green(), id.bright_blue().bold());
            println!(
                "      {} operations, {} rows, {} hyperlinks, {} prices adjusted",
                composition.operations.len(),
                stats.rows_emitted,
                stats.hyperlinks,
                stats.prices_adjusted
            );
            results.push((id, true));
        }
        println!();
        report_failures(&results)?;
        println!("{}", "📋 Dry run complete - no changes written".yellow());
        return Ok(());
    }

    let mut results = Vec::new();
    for id in ids {
        let ok = orchestrator.sync_menu(&id);
        if ok {
            println!("   {} {}", "✅".green(), id.bright_blue().bold());
        } else {
            println!("   {} {}", "❌".red(), id.bright_blue().bold());
        }
        results.push((id, ok));
    }
    println!();
    report_failures(&results)?;
    println!("{}", "✨ Sync complete".bold().green());
    Ok(())
}

/// Execute the sync-consolidated command
pub fn sync_consolidated(ctx: &Context) -> SyncResult<()> {
    let registry = ctx.registry()?;
    let sheets = connect()?;
    let orchestrator = SyncOrchestrator::new(&sheets, &registry, ctx.state());

    println!("{}", "🔄 Syncing consolidated sheet".bold().green());
    println!("   Title: {}\n", registry.consolidated().current_title());

    if !orchestrator.sync_consolidated() {
        return Err(SyncError::SyncFailed {
            menus: vec![CONSOLIDATED_KEY.to_string()],
        });
    }
    println!("{}", "✨ Consolidated sheet synced".bold().green());
    Ok(())
}

/// Execute the status command
pub fn status(ctx: &Context, menu: Option<&str>) -> SyncResult<()> {
    let registry = ctx.registry()?;
    let ids = match menu {
        Some(m) => registry.select(m)?,
        None => registry.ids(),
    };
    let state = ctx.state().load()?;

    println!("{}", "📊 Sync status".bold().green());
    println!("   State: {}", ctx.state_dir.display());
    println!();

    for id in &ids {
        println!("   {}", id.bright_blue().bold());
        println!("      Last sync: {}", format_instant(state.last_sync.get(id).copied()));
        if let Some(target) = state.targets.get(id) {
            println!("      Target:    {}", target);
        }
    }
    if menu.is_none() {
        println!("   {}", CONSOLIDATED_KEY.bright_blue().bold());
        println!(
            "      Last sync: {}",
            format_instant(state.last_sync.get(CONSOLIDATED_KEY).copied())
        );
        if let Some(target) = &state.consolidated {
            println!("      Target:    {}", target);
        }
    }

    println!();
    match read_status_file(&ctx.status_file())? {
        Some(s) if s.running => println!(
            "   Scheduler: {} (every {} min, next sync {})",
            "running".green(),
            s.interval_secs / 60,
            format_instant(s.next_sync)
        ),
        _ => println!("   Scheduler: {}", "stopped".yellow()),
    }
    Ok(())
}

/// Execute the schedule command - sync on an interval until interrupted
pub fn schedule(ctx: &Context, menu: &str, interval_mins: u64) -> SyncResult<()> {
    if interval_mins == 0 {
        return Err(SyncError::Config("interval must be at least 1 minute".to_string()));
    }
    let registry = ctx.registry()?;
    let ids = registry.select(menu)?;
    let sheets = connect()?;
    let state_dir = ctx.state_dir.clone();

    println!("{}", "⏰ Scheduled sync".bold().green());
    println!("   Menus: {}", ids.join(", "));
    println!("   Every: {} min", interval_mins);
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    let mut scheduler = Scheduler::new(Duration::from_secs(interval_mins * 60))
        .with_status_file(ctx.status_file());
    scheduler.start(move || {
        let orchestrator = SyncOrchestrator::new(&sheets, &registry, StateStore::new(&state_dir));
        for id in &ids {
            orchestrator.sync_menu(id);
        }
    });
    println!("   Next sync: {}", format_instant(scheduler.status().next_sync));

    let waited = wait_for_shutdown();
    scheduler.stop();
    waited.map_err(|e| SyncError::Config(format!("Signal handling failed: {:#}", e)))?;

    println!("\n{}", "👋 Scheduler stopped".yellow());
    Ok(())
}

fn wait_for_shutdown() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(shutdown_signal())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutdown signal received, stopping scheduler...");
    Ok(())
}
