use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use score_fetcher::config::{resolve_song_ids, AppConfig, CliConfig, FileConfig};
use score_fetcher::pipeline::Pipeline;
use score_fetcher::transport::{FixedDelayThrottler, HttpTransport};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Song ids to fetch, space or comma separated. Defaults to the whole catalog.
    pub ids: Vec<String>,

    /// Resolve every declared difficulty and log its URL, even when already saved.
    #[clap(long)]
    pub print_urls: bool,

    /// Accept the first candidate without probing; content is still validated.
    #[clap(long)]
    pub no_probe: bool,

    /// Log what would be fetched without writing anything.
    #[clap(long)]
    pub dry_run: bool,

    /// Timeout in seconds for existence probes.
    #[clap(long, default_value_t = 6)]
    pub probe_timeout: u64,

    /// Timeout in seconds for chart downloads.
    #[clap(long, default_value_t = 25)]
    pub download_timeout: u64,

    /// Retries per request on transient network errors.
    #[clap(long, default_value_t = 2)]
    pub retries: u32,

    /// Root directory for song folders, the record and failure ledgers.
    #[clap(long, default_value = "output/musicscore")]
    pub output_dir: PathBuf,

    /// Server region of the asset host.
    #[clap(long, default_value = "cn")]
    pub region: String,

    /// Path to TOML config file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            output_dir: self.output_dir.clone(),
            region: self.region.clone(),
            probe_timeout_secs: self.probe_timeout,
            download_timeout_secs: self.download_timeout,
            retries: self.retries,
            print_urls: self.print_urls,
            no_probe: self.no_probe,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let song_ids = resolve_song_ids(&cli_args.ids);

    info!(
        "Fetching {} songs for region {} into {:?}",
        song_ids.len(),
        config.region,
        config.output_dir
    );
    if config.options.dry_run {
        info!("Dry run: nothing will be downloaded or written");
    }

    let transport = HttpTransport::new(
        &config.transport.user_agent,
        config.transport.probe_timeout(),
        config.transport.download_timeout(),
    )
    .context("Failed to build HTTP client")?;
    let throttler = FixedDelayThrottler::new(config.download_delay());

    let mut pipeline = Pipeline::from_config(&config, Arc::new(transport), Arc::new(throttler))
        .context("Failed to open output directory")?;
    let summary = pipeline
        .run(&song_ids)
        .await
        .context("Run aborted")?;

    summary.log(&config.record_path(), config.options.dry_run);
    Ok(())
}
