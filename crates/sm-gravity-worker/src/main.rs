use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use sm_common::Profile;
use sm_common::gravity::run_gravity_cycle;
use sm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use sm_common::store::{MemoryProfileStore, ProfileStore};
use tokio::time::{Duration, sleep};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "sm-gravity-worker",
    about = "Recompute time-decayed skill freshness over a profile export"
)]
struct Cli {
    /// Path to a JSON array of profiles (document-store export)
    #[arg(long, env = "SM_PROFILE_EXPORT")]
    profiles: PathBuf,

    /// Write recomputed freshness back to the export file after each cycle
    #[arg(long, default_value_t = false)]
    write: bool,

    /// Seconds between cycles when running as a long-lived service
    #[arg(long, default_value_t = 3600)]
    interval_secs: u64,

    /// Optional cap on how many cycles to run (default: keep cycling)
    #[arg(long)]
    max_cycles: Option<usize>,

    /// Exit after the first cycle where no profile moved
    #[arg(long, default_value_t = false)]
    exit_on_settle: bool,
}

fn parse_profiles(raw: &str) -> serde_json::Result<Vec<Profile>> {
    serde_json::from_str(raw)
}

fn render_profiles(profiles: &[Profile]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(profiles)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.profiles)?;
    let profiles = parse_profiles(&raw)?;
    info!(
        path = %cli.profiles.display(),
        count = profiles.len(),
        "loaded profile export"
    );

    let store = Arc::new(MemoryProfileStore::with_profiles(profiles));
    let mut cycles = 0usize;

    loop {
        let summary = run_gravity_cycle(store.as_ref()).await?;
        cycles += 1;
        info!(
            cycle = cycles,
            scanned = summary.profiles_scanned,
            updated = summary.profiles_updated,
            decayed = summary.skills_decayed,
            grown = summary.skills_grown,
            "gravity cycle complete"
        );

        if cli.write {
            let rendered = render_profiles(&store.list_profiles().await?)?;
            std::fs::write(&cli.profiles, rendered)?;
            info!(path = %cli.profiles.display(), "profile export rewritten");
        }

        if cli.max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }
        if cli.exit_on_settle && !summary.changed_anything() {
            info!("freshness settled; exiting");
            break;
        }

        sleep(Duration::from_secs(cli.interval_secs)).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("sm-gravity-worker failed: {err}");
        std::process::exit(1);
    }
}
