use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Client;
use ridership::{
    fetch,
    sink::ParquetSink,
    stage::Resource,
    Pipeline, PipelineConfig,
};
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Consolidate bike-share ridership files into one table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML configuration; defaults apply to anything it leaves out
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local archives, spreadsheets or CSVs to consolidate
    #[arg(long, num_args = 1.., conflicts_with = "fetch")]
    input: Vec<PathBuf>,

    /// Download the package's resources from the open-data portal
    #[arg(long)]
    fetch: bool,

    /// Override the extraction / staging directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.out_dir {
        config.output_dir = dir;
    }

    // ─── 3) gather resources ─────────────────────────────────────────
    let resources: Vec<Resource> = if args.fetch {
        let client = Client::new();
        let pkg = fetch::fetch_package(&client, &config.package_url, &config.package_id).await?;
        let wanted = fetch::filter_resources(pkg.resources, &config.required_patterns()?);
        info!("{} resources to download", wanted.len());
        let resources = fetch::download_all(&client, wanted).await?;
        if let Err(e) =
            fetch::fetch_station_info(&client, &config.station_info_url, &config.output_dir).await
        {
            warn!("station info not saved: {:#}", e);
        }
        resources
    } else if !args.input.is_empty() {
        args.input.into_iter().map(Resource::from_path).collect()
    } else {
        bail!("nothing to do: pass --input <path>... or --fetch");
    };

    // ─── 4) consolidate and persist off the async runtime ────────────
    let start = Instant::now();
    let rows = tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut sink = ParquetSink::new(&config.sink.dir, &config.sink.table)?;
        let pipeline = Pipeline::new(config)?;
        let table = pipeline.run_and_persist(resources, &mut sink)?;
        Ok(table.len())
    })
    .await
    .context("pipeline task panicked")?;

    match rows {
        Ok(rows) => {
            info!(rows, elapsed = ?start.elapsed(), "done");
            Ok(())
        }
        Err(e) => {
            error!("run failed: {:#}", e);
            Err(e)
        }
    }
}
