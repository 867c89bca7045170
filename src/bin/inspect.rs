//! claims-inspect binary
//!
//! Loads a claim data directory and answers ownership queries against it.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                     | Default   | Description                         |
//! |-------------------------|-----------|-------------------------------------|
//! | `CLAIMS_OPTIMIZATION`   | `process` | `memory` (list) or `process` (map)  |
//! | `CLAIMS_CREATION_COST`  | `0.0`     | Cost reported on faction creation   |
//! | `CLAIMS_CLAIM_OWNERS`   | `true`    | Track individual claim owners       |
//! | `CLAIMS_CELL_SIZE`      | `16`      | Geometry grid bucket size (columns) |
//!
//! Command-line flags override both.

use anyhow::{bail, Context, Result};
use clap::Parser;
use faction_claims::{
    config,
    persistence::{write_behind::WriteBehind, JsonFilePersistence, Persistence},
    BoundedArea, Column, FactionRegistry, OptimizationMode,
};
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "claims-inspect", about = "Inspect a faction claim registry", version)]
struct Args {
    /// Optional TOML configuration file
    #[arg(long, env = "CLAIMS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding factions.json and claims.json
    #[arg(long, env = "CLAIMS_DATA_DIR", default_value = "claims-data")]
    data_dir: PathBuf,

    /// Override the configured optimization mode
    #[arg(long)]
    optimization: Option<OptimizationMode>,

    /// Resolve the owner of one column, as `world:x:z`
    #[arg(long)]
    at: Option<String>,

    /// List factions with claims in an area, as `world:x1:z1:x2:z2`
    #[arg(long)]
    area: Option<String>,
}

fn parse_column(s: &str) -> Result<Column> {
    let parts: Vec<&str> = s.split(':').collect();
    let [world, x, z] = parts.as_slice() else {
        bail!("expected world:x:z, got '{}'", s);
    };
    Ok(Column::new(*world, x.parse()?, z.parse()?))
}

fn parse_area(s: &str) -> Result<BoundedArea> {
    let parts: Vec<&str> = s.split(':').collect();
    let [world, x1, z1, x2, z2] = parts.as_slice() else {
        bail!("expected world:x1:z1:x2:z2, got '{}'", s);
    };
    Ok(BoundedArea::new(
        *world,
        x1.parse()?,
        z1.parse()?,
        x2.parse()?,
        z2.parse()?,
    ))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("faction_claims=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut registry_config =
        config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(mode) = args.optimization {
        registry_config.optimization = mode;
    }

    log::info!(
        "Starting claims-inspect (data_dir={}, optimization={}, cell_size={})",
        args.data_dir.display(),
        registry_config.optimization,
        registry_config.cell_size,
    );

    let files = JsonFilePersistence::open(&args.data_dir)
        .with_context(|| format!("failed to open {}", args.data_dir.display()))?;
    let (store, worker) = WriteBehind::spawn(Arc::new(files));
    let store = Arc::new(store);

    let registry = {
        let _span = tracing::info_span!("load", dir = %args.data_dir.display()).entered();
        FactionRegistry::load(registry_config, store.clone() as Arc<dyn Persistence>)
            .context("failed to load registry")?
    };

    let stats = registry.stats();
    log::info!(
        "{} factions, {} claims, {} columns indexed",
        stats.factions,
        stats.claims,
        stats.indexed_columns
    );

    if let Some(at) = &args.at {
        let column = parse_column(at).context("invalid --at")?;
        let owner = registry.by_column(&column);
        println!("{}", serde_json::to_string_pretty(owner)?);
    }
    if let Some(area) = &args.area {
        let area = parse_area(area).context("invalid --area")?;
        let factions = registry.by_area(&area);
        println!("{}", serde_json::to_string_pretty(&factions)?);
    }
    if args.at.is_none() && args.area.is_none() {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    // Loading may have queued a synthesised Wilderness.
    store.flush().await.context("failed to flush pending writes")?;
    if store.failed_writes() > 0 {
        log::warn!("{} background writes failed", store.failed_writes());
    }
    drop(registry);
    drop(store);
    worker.await?;
    Ok(())
}
