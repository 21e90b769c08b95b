mod chromedriver;
mod cli;
mod filter;
mod models;
mod output;
mod scraper;
mod selectors;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::models::RunStats;
use crate::output::ListingSheet;

/// Transient working space, created before the crawl and removed after.
const SCRATCH_DIR: &str = "tmp";

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let query = args.query();
    let filter = args.filter();
    let output_filename = output::output_filename();

    info!("initializing scrape...");
    let started = Instant::now();

    // Cheap resources first; once the browser is up, every exit path below
    // runs the teardown block.
    let mut sheet = ListingSheet::new()?;
    fs::create_dir_all(SCRATCH_DIR).context("failed to create scratch directory")?;
    let (driver, mut driver_proc) = match scraper::launch_browser().await {
        Ok(pair) => pair,
        Err(e) => {
            if let Err(rm) = fs::remove_dir_all(SCRATCH_DIR) {
                warn!("failed to remove scratch directory: {}", rm);
            }
            return Err(e);
        }
    };

    let mut stats = RunStats::default();
    let crawl = scraper::scrape_search(&driver, &query, &filter, &mut sheet, &mut stats).await;

    // Teardown runs whatever the crawl did: save the sheet, release the
    // browser, kill the driver process, drop the scratch space.
    let saved = sheet.save(Path::new(&output_filename));
    if let Err(e) = driver.quit().await {
        warn!("failed to quit browser: {}", e);
    }
    scraper::reap(&mut driver_proc);
    if let Err(e) = fs::remove_dir_all(SCRATCH_DIR) {
        warn!("failed to remove scratch directory: {}", e);
    }

    if let Err(e) = &crawl {
        error!("scrape aborted: {:#}", e);
    }

    let elapsed = started.elapsed().as_secs();
    info!(
        "scanned {} listings in {}m {}s",
        stats.listings_seen,
        elapsed / 60,
        elapsed % 60
    );
    info!(
        "scrape complete, {} entries made to {}",
        stats.rows_written, output_filename
    );

    crawl?;
    saved?;
    Ok(())
}
