use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::Rng;
use serde_json::json;
use std::process::Child;
use std::time::Instant;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Duration};

use crate::chromedriver::ensure_chromedriver;
use crate::filter::{clean_title, title_matches, DedupTracker, FilterConfig};
use crate::models::{ListingRecord, RunStats, SearchQuery};
use crate::output::ListingSheet;
use crate::selectors;

/// Poll interval for the bounded element waits.
const ELEMENT_POLL: Duration = Duration::from_millis(500);
/// Short wait for listing sections on a freshly opened product page; an empty
/// product page is valid, so this stays small.
const LISTING_WAIT: Duration = Duration::from_secs(2);
/// Longer wait for page-level containers after navigation.
const PAGE_WAIT: Duration = Duration::from_secs(10);
/// Settle delay after scrolling, for lazy-loaded listing sections.
const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Countdown before an unfiltered full-catalog crawl.
const EMPTY_QUERY_COUNTDOWN_SECS: u64 = 10;

/// Spawn chromedriver on a randomized port and connect a Chrome session.
/// If the session never comes up the child process is reaped before the
/// error propagates; a dropped `Child` would keep running otherwise.
pub async fn launch_browser() -> Result<(WebDriver, Child)> {
    let driver_path = ensure_chromedriver().await?;

    let mut caps = DesiredCapabilities::chrome();
    caps.set_no_sandbox()?;
    caps.set_disable_dev_shm_usage()?;
    caps.add_arg("window-size=1920,1080")?;

    let port: u32 = rand::thread_rng().gen_range(5000..9000);
    let mut child = std::process::Command::new(&driver_path)
        .arg(format!("--port={}", port))
        .spawn()
        .context("failed to spawn chromedriver")?;

    // Give chromedriver a moment to bind its port.
    sleep(Duration::from_secs(2)).await;

    match WebDriver::new(&format!("http://localhost:{}", port), caps).await {
        Ok(driver) => Ok((driver, child)),
        Err(e) => {
            reap(&mut child);
            Err(anyhow::Error::new(e).context("failed to connect to chromedriver"))
        }
    }
}

/// Kill and wait on the chromedriver child. Failures are logged, not
/// propagated; the process may already have exited.
pub fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("failed to kill chromedriver: {}", e);
    }
    let _ = child.wait();
}

/// Bounded wait for an element to appear. Returns false on timeout; callers
/// decide whether that is an empty state or the end of pagination.
async fn wait_for(driver: &WebDriver, css: &str, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if driver.find(By::Css(css)).await.is_ok() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        sleep(ELEMENT_POLL).await;
    }
}

/// Outcome of a next-page attempt. Errors while locating or clicking the
/// control are logged and collapse into `End`: pagination trouble is never
/// fatal, it just terminates the current level.
enum Pagination {
    Advanced,
    End,
}

/// A next-page control marked disabled means the current page is the last
/// one; no click is attempted.
fn next_is_terminal(class: &str) -> bool {
    class.contains("disabled")
}

async fn advance_page(driver: &WebDriver, wait_css: &str) -> Pagination {
    let next = match driver.find(By::Css(selectors::NEXT_PAGE)).await {
        Ok(el) => el,
        Err(_) => {
            debug!("no next-page control, pagination complete");
            return Pagination::End;
        }
    };

    let class = next.attr("class").await.unwrap_or(None).unwrap_or_default();
    if next_is_terminal(&class) {
        debug!("next-page control disabled, no more pages");
        return Pagination::End;
    }

    // Script click, the control sits below the fold more often than not.
    let clicked = async {
        let arg = next.to_json()?;
        driver.execute("arguments[0].click();", vec![arg]).await?;
        Ok::<(), WebDriverError>(())
    }
    .await;
    if let Err(e) = clicked {
        warn!("error clicking next button: {}", e);
        return Pagination::End;
    }

    if !wait_for(driver, wait_css, PAGE_WAIT).await {
        warn!("timed out waiting for the next page to load");
        return Pagination::End;
    }
    Pagination::Advanced
}

/// Filter + dedup decision for one listing. Records the URL on acceptance.
fn accept_listing(
    title: &str,
    listing_url: &str,
    filter: &FilterConfig,
    tracker: &mut DedupTracker,
) -> bool {
    if !title_matches(title, filter) {
        debug!("skipping listing, title does not contain keywords: {}", title);
        return false;
    }
    if tracker.seen(listing_url) {
        debug!("skipping duplicate listing: {}", listing_url);
        return false;
    }
    tracker.record(listing_url);
    true
}

async fn read_listing(section: &WebElement) -> WebDriverResult<(String, String, String)> {
    let title_el = section.find(By::Css(selectors::LISTING_TITLE)).await?;
    let title = clean_title(&title_el.text().await?);

    let link_el = section.find(By::Css(selectors::LISTING_LINK)).await?;
    let listing_url = link_el.attr("href").await?.unwrap_or_default();

    let price_el = section.find(By::Css(selectors::LISTING_PRICE)).await?;
    let price = price_el.text().await?.trim().to_string();

    Ok((title, listing_url, price))
}

/// Crawl every listing page of the product the driver is currently on,
/// writing matching listings to the sheet. The tab is assumed to be freshly
/// navigated; an absent listing container means an empty product page.
/// The product URL is captured once when the page first loads; rows found on
/// later listing pages reuse it even if pagination rewrites the URL fragment.
pub async fn scrape_product_listings(
    driver: &WebDriver,
    filter: &FilterConfig,
    sheet: &mut ListingSheet,
    stats: &mut RunStats,
) -> Result<()> {
    if !wait_for(driver, selectors::LISTING_SECTION, LISTING_WAIT).await {
        debug!("no listings found on this page, skipping");
        return Ok(());
    }

    let product_url = driver
        .current_url()
        .await
        .map(|u| u.to_string())
        .unwrap_or_default();
    let mut tracker = DedupTracker::new();

    loop {
        // Scroll to the bottom and let lazy-loaded sections settle before
        // re-reading the DOM. Listings seen in an earlier pass are caught by
        // the tracker, so re-reading is idempotent.
        let _ = driver
            .execute("window.scrollTo(0, document.body.scrollHeight);", Vec::new())
            .await;
        sleep(SETTLE_DELAY).await;

        let sections = driver
            .find_all(By::Css(selectors::LISTING_SECTION))
            .await
            .unwrap_or_default();
        debug!("found {} listings on the page", sections.len());

        for section in &sections {
            stats.listings_seen += 1;

            let (title, listing_url, price) = match read_listing(section).await {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("error processing listing: {}", e);
                    continue;
                }
            };

            if !accept_listing(&title, &listing_url, filter, &mut tracker) {
                continue;
            }

            let record = ListingRecord {
                product_page_url: product_url.clone(),
                title,
                listing_url,
                price,
            };
            let row = sheet.append(&record)?;
            stats.rows_written += 1;
            info!("wrote row {}: {}, {}", row, record.title, record.price);
        }

        match advance_page(driver, selectors::LISTING_SECTION).await {
            Pagination::Advanced => continue,
            Pagination::End => break,
        }
    }
    Ok(())
}

/// Open `url` in a new tab, crawl its listings, then close the tab and hand
/// focus back to the results page. The secondary handle is always closed,
/// crawl error or not; leaking tabs is the one resource risk in this system.
async fn scrape_product_in_new_tab(
    driver: &WebDriver,
    url: &str,
    filter: &FilterConfig,
    sheet: &mut ListingSheet,
    stats: &mut RunStats,
) -> Result<()> {
    let primary = driver.window().await?;

    driver
        .execute("window.open(arguments[0]);", vec![json!(url)])
        .await
        .context("failed to open product tab")?;
    let handles = driver.windows().await?;
    let secondary = handles
        .last()
        .cloned()
        .context("no window handle after opening product tab")?;
    driver.switch_to_window(secondary).await?;

    let crawl = scrape_product_listings(driver, filter, sheet, stats).await;

    if let Err(e) = driver.close_window().await {
        warn!("failed to close product tab: {}", e);
    }
    driver
        .switch_to_window(primary)
        .await
        .context("failed to return to the search results tab")?;
    crawl
}

/// Crawl all search-result pages for the query, visiting each product link in
/// a secondary tab. Pagination trouble ends the crawl gracefully.
pub async fn scrape_search(
    driver: &WebDriver,
    query: &SearchQuery,
    filter: &FilterConfig,
    sheet: &mut ListingSheet,
    stats: &mut RunStats,
) -> Result<()> {
    if query.is_empty() {
        warn!("no search filters specified, the scraper will index ALL magic cards");
        println!("Press CTRL+C to cancel.");
        for i in (1..=EMPTY_QUERY_COUNTDOWN_SECS).rev() {
            println!("Proceeding with task in {}...", i);
            sleep(Duration::from_secs(1)).await;
        }
    }

    info!("scrape started with query: '{}'", query.filter_string());
    driver
        .goto(&query.to_url())
        .await
        .context("failed to open the search page")?;
    if !wait_for(driver, selectors::SEARCH_RESULTS, PAGE_WAIT).await {
        warn!("search results never appeared, nothing to scrape");
        return Ok(());
    }

    loop {
        let links = driver
            .find_all(By::Css(selectors::PRODUCT_LINKS))
            .await
            .unwrap_or_default();
        debug!("found {} product links on the page", links.len());

        // Read the hrefs up front; the elements go stale once we start
        // switching tabs.
        let mut product_urls = Vec::new();
        for link in &links {
            match link.attr("href").await {
                Ok(Some(href)) if !href.is_empty() => product_urls.push(href),
                Ok(_) => {}
                Err(e) => warn!("error reading product link: {}", e),
            }
        }

        for product_url in product_urls {
            debug!("scraping listings for product: {}", product_url);
            if let Err(e) =
                scrape_product_in_new_tab(driver, &product_url, filter, sheet, stats).await
            {
                warn!("error scraping product {}: {}", product_url, e);
            }
            // Re-synchronize with the results page before the next product.
            if !wait_for(driver, selectors::SEARCH_RESULTS, PAGE_WAIT).await {
                warn!("search results did not reappear, stopping");
                return Ok(());
            }
        }

        match advance_page(driver, selectors::SEARCH_RESULTS).await {
            Pagination::Advanced => continue,
            Pagination::End => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_listings_accept_only_matching_titles() {
        let filter = FilterConfig {
            include_altered: false,
            include_graded: true,
        };
        let mut tracker = DedupTracker::new();

        let listings = [
            ("Signed by Artist", "https://t.example/l/1"),
            ("Regular Foil", "https://t.example/l/2"),
            ("BGS 9.5 Graded", "https://t.example/l/3"),
        ];
        let accepted: Vec<&str> = listings
            .iter()
            .filter(|(title, url)| accept_listing(title, url, &filter, &mut tracker))
            .map(|(title, _)| *title)
            .collect();

        assert_eq!(accepted, vec!["Signed by Artist", "BGS 9.5 Graded"]);
    }

    #[test]
    fn rescanning_an_unchanged_page_accepts_nothing() {
        let filter = FilterConfig::default();
        let mut tracker = DedupTracker::new();
        let listings = [
            ("Signed playset", "https://t.example/l/1"),
            ("Artist proof", "https://t.example/l/2"),
        ];

        let first_pass = listings
            .iter()
            .filter(|(title, url)| accept_listing(title, url, &filter, &mut tracker))
            .count();
        let second_pass = listings
            .iter()
            .filter(|(title, url)| accept_listing(title, url, &filter, &mut tracker))
            .count();

        assert_eq!(first_pass, 2);
        assert_eq!(second_pass, 0);
    }

    #[test]
    fn disabled_next_control_ends_pagination() {
        assert!(next_is_terminal("tcg-standard-button disabled"));
        assert!(next_is_terminal("disabled"));
        assert!(!next_is_terminal("tcg-standard-button"));
        assert!(!next_is_terminal(""));
    }

    #[cfg(unix)]
    #[test]
    fn reap_terminates_a_running_process() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn duplicate_urls_are_written_once() {
        let filter = FilterConfig::default();
        let mut tracker = DedupTracker::new();

        assert!(accept_listing(
            "Signed copy",
            "https://t.example/l/1",
            &filter,
            &mut tracker
        ));
        assert!(!accept_listing(
            "Signed copy",
            "https://t.example/l/1",
            &filter,
            &mut tracker
        ));
    }
}
