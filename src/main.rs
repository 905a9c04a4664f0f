use clap::{Parser, Subcommand};
use menusync::cli;
use menusync::error::SyncResult;
use menusync::logging;
use menusync::scheduler::DEFAULT_INTERVAL_MINS;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "menusync")]
#[command(about = "Republish vendor product sheets as filtered, price-adjusted, branded menus.")]
#[command(long_about = "Menusync - vendor sheet to branded menu sheet

Reads a vendor's product sheet, stops at the truncation marker, keeps priced
rows (and, for filtered menus, only rows under matching category headers),
adds per-category upcharges, converts media links to hyperlinks, and writes
the result under a logo and contact block in the menu's target spreadsheet.

COMMANDS:
  menus              - List configured menus
  sync               - Sync one menu or all of them
  sync-consolidated  - Sync every menu into one dated spreadsheet
  status             - Show last sync times and scheduler state
  schedule           - Sync on an interval until Ctrl+C

AUTHENTICATION:
  Remote commands read an OAuth access token from MENUSYNC_ACCESS_TOKEN.

EXAMPLES:
  menusync sync --menu thca            # Sync the THCA menu
  menusync sync --dry-run              # Compose every menu, write nothing
  menusync schedule --interval-mins 15
  menusync status")]
#[command(version)]
struct Cli {
    /// Directory for state.json, app.log and scheduler status
    #[arg(long, global = true, env = "MENUSYNC_STATE_DIR", default_value = "logs")]
    state_dir: PathBuf,

    /// YAML menu registry replacing the built-in menus
    #[arg(long, global = true, env = "MENUSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured menus
    Menus,

    #[command(long_about = "Sync one menu, or all menus in order.

Each menu runs as an independent pass: extract, resolve target, clear,
write, record. A failing menu does not stop the others; the command exits
non-zero if any menu failed.

Use --dry-run to fetch and compose without writing anything.")]
    /// Sync one menu or all of them
    Sync {
        /// Menu id, or 'all'
        #[arg(short, long, default_value = "all")]
        menu: String,

        /// Compose operations without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Sync every menu into its tab of the consolidated spreadsheet
    SyncConsolidated,

    /// Show last sync times, cached targets and scheduler state
    Status {
        /// Only this menu
        #[arg(short, long)]
        menu: Option<String>,
    },

    #[command(long_about = "Run syncs on a fixed interval in the foreground.

The first sync happens one interval after start. Ctrl+C or SIGTERM stops the
timer; a sync already in progress finishes first.")]
    /// Sync on an interval until interrupted
    Schedule {
        /// Menu id, or 'all'
        #[arg(short, long, default_value = "all")]
        menu: String,

        /// Minutes between syncs
        #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MINS)]
        interval_mins: u64,
    },
}

fn main() -> SyncResult<()> {
    let cli = Cli::parse();
    let ctx = cli::Context::new(cli.state_dir, cli.config);

    // Only commands that touch the remote side keep a log file.
    let log_file = match cli.command {
        Commands::Menus | Commands::Status { .. } => None,
        _ => Some(ctx.log_file()),
    };
    logging::init(cli.verbose, log_file.as_deref());

    match cli.command {
        Commands::Menus => cli::menus(&ctx),

        Commands::Sync { menu, dry_run } => cli::sync(&ctx, &menu, dry_run),

        Commands::SyncConsolidated => cli::sync_consolidated(&ctx),

        Commands::Status { menu } => cli::status(&ctx, menu.as_deref()),

        Commands::Schedule {
            menu,
            interval_mins,
        } => cli::schedule(&ctx, &menu, interval_mins),
    }
}
