//! Command-line entry point for trial-dl

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use trial_dl::portal::regions;
use trial_dl::progress::spawn_progress_logger;
use trial_dl::task_file::read_task_file;
use trial_dl::{Config, Crawler, Database, PortalClient, Result, run_with_shutdown};

#[derive(Parser)]
#[command(name = "trial-dl")]
#[command(about = "Archive recorded court hearings from the trial video portal")]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database of processed cases
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory videos are written to
    #[arg(long, global = true)]
    save_dir: Option<PathBuf>,

    /// Maximum concurrent segment downloads per case
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Portal session cookie
    #[arg(long, env = "TRIAL_DL_COOKIE", hide_env_values = true, global = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every court of a region
    Crawl {
        /// Area code of the region (see `regions`)
        #[arg(long)]
        area_code: String,
    },

    /// Download the hearings listed in a task file
    Cases {
        /// Excel workbook or CSV file whose first column holds case ids or hearing URLs
        #[arg(long)]
        task_file: PathBuf,
    },

    /// Print region names and their area codes
    Regions {
        /// Also write the list to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Load the configuration file, then apply command-line overrides
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(database) = &self.database {
            config.persistence.database_path = database.clone();
        }
        if let Some(save_dir) = &self.save_dir {
            config.download.save_dir = save_dir.clone();
        }
        if let Some(workers) = self.workers {
            config.download.workers = workers;
        }
        if let Some(cookie) = &self.cookie {
            config.portal.cookie = cookie.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "trial-dl failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;

    match cli.command {
        Commands::Crawl { area_code } => {
            let (db, crawler) = open_crawler(&config).await?;
            let result =
                run_with_shutdown(crawler.cancel_token(), crawler.run_region(&area_code)).await;
            db.pool().close().await;
            result.map(|_| ())
        }
        Commands::Cases { task_file } => {
            let ids = read_task_file(&task_file).await?;
            let (db, crawler) = open_crawler(&config).await?;
            let result = run_with_shutdown(crawler.cancel_token(), crawler.run_case_ids(&ids)).await;
            db.pool().close().await;
            result.map(|_| ())
        }
        Commands::Regions { output } => {
            let client = PortalClient::new(config.portal.clone())?;
            let region_list = regions::list_regions(&client).await?;

            let lines: Vec<String> = region_list
                .iter()
                .map(|region| format!("{}: {}", region.name, region.code))
                .collect();
            for line in &lines {
                println!("{line}");
            }
            if let Some(path) = output {
                tokio::fs::write(&path, lines.join("\n") + "\n").await?;
                tracing::info!(path = %path.display(), "Wrote region list");
            }
            Ok(())
        }
    }
}

async fn open_crawler(config: &Config) -> Result<(Arc<Database>, Crawler)> {
    let db = Arc::new(Database::new(&config.persistence.database_path).await?);
    let crawler = Crawler::from_config(config, db.clone())?;
    spawn_progress_logger(crawler.subscribe());
    Ok((db, crawler))
}
