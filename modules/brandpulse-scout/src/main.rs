use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use brandpulse_common::{Config, PageBackend};
use brandpulse_scout::fetch::{
    BrowserFetcher, BrowserlessRenderer, ChromeRenderer, CookieJar, FetchOptions, PageRenderer,
    RetryPolicy, ScrollPlan,
};
use brandpulse_scout::pipeline::{Harvester, RunOutcome};
use brandpulse_scout::sources::{self, MAX_LISTING_PAGES, POPUP_WAIT};
use brandpulse_scout::store::PgConnector;

#[derive(Parser)]
#[command(name = "brandpulse", about = "Scrape brand mentions into the document store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search Quora for questions about the brand
    Quora {
        /// Search query; repeat for several. Defaults to the built-in list.
        #[arg(long = "query")]
        queries: Vec<String>,
    },
    /// Scrape the retailer's own site
    Site {
        /// Page URL; repeat for several. Defaults to the built-in pages.
        #[arg(long = "url")]
        urls: Vec<String>,
        /// Product listing pages to follow; 0 skips the listing.
        #[arg(long, default_value_t = MAX_LISTING_PAGES)]
        max_pages: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brandpulse=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("Brandpulse starting...");

    let config = Config::from_env().context("Invalid configuration")?;
    config.log_redacted();

    let profile = match &cli.command {
        Command::Quora { queries } => sources::quora_profile(queries),
        Command::Site { urls, max_pages } => sources::miniso_site_profile(urls, *max_pages),
    };

    let scroll = ScrollPlan {
        steps: config.scroll_count,
        pause: config.scroll_pause,
    };
    let options = FetchOptions {
        retry: RetryPolicy::exponential(
            config.fetch_max_attempts,
            config.fetch_backoff,
            config.fetch_backoff_multiplier,
        ),
        scroll,
        nav_timeout: config.nav_timeout,
    };

    let renderer: Box<dyn PageRenderer> = match &config.page_backend {
        PageBackend::Chrome {
            chrome_bin,
            headless,
        } => Box::new(
            ChromeRenderer::launch(chrome_bin.clone(), *headless)
                .await
                .context("Failed to launch Chrome")?,
        ),
        PageBackend::Browserless { base_url, token } => Box::new(
            BrowserlessRenderer::new(
                base_url,
                token.as_deref(),
                config.nav_timeout + POPUP_WAIT + scroll.total(),
            )
            .context("Failed to build Browserless client")?,
        ),
    };

    let fetcher = BrowserFetcher::new(
        renderer,
        &profile,
        CookieJar::load(&config.cookies_file),
        options,
    );
    let connector = PgConnector::new(&config.database_url);
    let harvester = Harvester::new(&profile, &fetcher, &connector);

    let result = harvester.run().await;
    fetcher.shutdown().await;

    let report = result.context("Harvest failed")?;
    match report.outcome {
        RunOutcome::NothingFound => info!("Nothing found"),
        RunOutcome::NothingNew => info!("No new records to store"),
        RunOutcome::Stored(n) => info!(count = n, "Stored new records"),
    }
    info!("Harvest run complete. {}", report.stats);

    Ok(())
}
