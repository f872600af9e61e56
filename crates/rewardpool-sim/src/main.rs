//! rewardpool-sim: replay scenario scripts against a reward pool

use {
    anyhow::{anyhow, Context, Result},
    clap::{Parser, Subcommand},
    rewardpool_common::PoolConfig,
    rewardpool_sim::{resolve, Script, Simulator},
    rewardpool_store::{PoolStoreFactory, SnapshotStoreFactory, StoreConfig},
    std::path::{Path, PathBuf},
    tracing::info,
    tracing_subscriber::{EnvFilter, FmtSubscriber},
};

#[derive(Parser, Debug)]
#[command(
    name = "rewardpool-sim",
    about = "Replay reward pool scenarios against an in-memory ledger",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision a pool from a config file and replay a script against it
    Run {
        /// Pool config (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Scenario script (JSON)
        #[arg(long)]
        script: PathBuf,

        /// Snapshot directory to persist the final pool state into
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Print persisted pool snapshots
    Show {
        /// Snapshot directory
        #[arg(long)]
        snapshot: PathBuf,

        /// Pool label or address; lists stored pools when omitted
        #[arg(long)]
        pool: Option<String>,
    },
}

fn init_logging(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            script,
            snapshot,
        } => run(&config, &script, snapshot.as_deref()).await,
        Command::Show { snapshot, pool } => {
            init_logging("info")?;
            show(&snapshot, pool.as_deref()).await
        }
    }
}

async fn run(config_path: &Path, script_path: &Path, snapshot_dir: Option<&Path>) -> Result<()> {
    let config = PoolConfig::from_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    init_logging(&config.log_level)?;

    let script = Script::from_file(script_path)?;
    info!(
        "Replaying {} steps from {}",
        script.steps.len(),
        script_path.display()
    );

    let mut sim = Simulator::new(&script.pool, config, script.start_time)?;
    let report = sim.run(&script.steps);

    let snapshot = sim.snapshot()?;
    println!("{}", serde_json::to_string_pretty(snapshot)?);

    let metrics = sim.pool().metrics();
    info!(
        "Metrics: {} stakes, {} claims, {} unstakes, {} accrual passes, {} distributed, {} rejections",
        metrics.stakes(),
        metrics.claims(),
        metrics.unstakes(),
        metrics.accrual_passes(),
        metrics.rewards_distributed(),
        metrics.rejections()
    );

    for failure in &report.failed {
        println!("step #{} {} failed: {}", failure.index, failure.op, failure.error);
    }
    println!(
        "{} steps applied, {} failed",
        report.applied,
        report.failed.len()
    );

    if let Some(dir) = snapshot_dir {
        let store = PoolStoreFactory::new(StoreConfig::file(dir))
            .create_store()
            .await?;
        store.save(&sim.pool().address(), snapshot).await?;
        store.close().await?;
        info!(
            "Snapshot for {} written to {}",
            sim.pool().address(),
            dir.display()
        );
    }

    Ok(())
}

async fn show(dir: &Path, pool: Option<&str>) -> Result<()> {
    let store = PoolStoreFactory::new(StoreConfig::file(dir))
        .create_store()
        .await?;

    match pool {
        Some(name) => {
            let address = resolve(name);
            let snapshot = store
                .load(&address)
                .await?
                .ok_or_else(|| anyhow!("no snapshot for {} in {}", address, dir.display()))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        None => {
            for address in store.list().await? {
                println!("{}", address);
            }
        }
    }

    Ok(())
}
