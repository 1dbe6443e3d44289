mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgGroup, Parser};
use mapscout_browser::ChromiumLauncher;
use mapscout_core::{load_locator_map, AppConfig, LocatorMap, RunParams};
use mapscout_scraper::{Reporter, RunEvent, ScraperError, Session};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::commands::{parse_positive, spawn_stdin_commands};

#[derive(Debug, Parser)]
#[command(name = "mapscout")]
#[command(about = "Collect business listings and reviews from 2GIS search results")]
#[command(group(ArgGroup::new("target").required(true).args(["query", "url"])))]
struct Cli {
    /// Search text, run against the configured city.
    #[arg(long, short)]
    query: Option<String>,

    /// Direct link to a business card or a search results page.
    #[arg(long)]
    url: Option<String>,

    /// Also collect reviews for every business.
    #[arg(long)]
    reviews: bool,

    #[arg(long, default_value_t = 10, value_parser = parse_positive)]
    max_reviews: usize,

    /// Overrides `MAPSCOUT_CITY`.
    #[arg(long)]
    city: Option<String>,

    /// Show the browser window.
    #[arg(long)]
    headed: bool,

    /// Overrides `MAPSCOUT_OUTPUT_DIR`.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// YAML file overriding element locators; overrides `MAPSCOUT_LOCATOR_MAP_PATH`.
    #[arg(long)]
    locators: Option<PathBuf>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(city) = &self.city {
            config.city.clone_from(city);
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(path) = &self.locators {
            config.locator_map_path = Some(path.clone());
        }
    }

    fn run_params(&self) -> RunParams {
        RunParams {
            search_query: self.query.clone(),
            direct_url: self.url.clone(),
            scrape_reviews: self.reviews,
            max_reviews: self.max_reviews,
        }
    }
}

/// Observer line for an event. Log events are already rendered by the
/// tracing subscriber.
fn render(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::Log { .. } => None,
        RunEvent::Status(status) => Some(format!("[{status}]")),
        RunEvent::ReviewProgress {
            place,
            current,
            target,
        } => Some(format!("{place}: {current}/{target} reviews")),
        RunEvent::Finished { output: Some(path) } => {
            Some(format!("Finished, saved to {}", path.display()))
        }
        RunEvent::Finished { output: None } => Some("Finished, nothing saved".to_string()),
    }
}

type Worker = JoinHandle<Result<Option<PathBuf>, ScraperError>>;

fn print_event(event: &RunEvent) {
    if let Some(line) = render(event) {
        println!("{line}");
    }
}

/// Print events until the run finishes. Returns as soon as the worker ends,
/// even while other holders keep the event channel open.
async fn observe(mut events: UnboundedReceiver<RunEvent>, mut worker: Worker) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    print_event(&event);
                    if matches!(event, RunEvent::Finished { .. }) {
                        break;
                    }
                }
                None => break,
            },
            joined = &mut worker => {
                while let Ok(event) = events.try_recv() {
                    print_event(&event);
                }
                joined??;
                return Ok(());
            }
        }
    }

    worker.await??;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = mapscout_core::load_app_config()?;
    cli.apply_overrides(&mut config);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let locators = match &config.locator_map_path {
        Some(path) => load_locator_map(path)?,
        None => LocatorMap::default(),
    };
    tracing::info!(env = %config.env, city = %config.city, "starting mapscout");

    let launcher = ChromiumLauncher::from_config(&config, locators);
    let (reporter, events) = Reporter::channel();
    let session = Arc::new(Session::new(launcher, config, reporter));

    let params = cli.run_params();
    let worker = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.start(params).await })
    };
    spawn_stdin_commands(Arc::clone(&session));
    {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                session.stop();
            }
        });
    }

    observe(events, worker).await
}
