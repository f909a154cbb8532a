//! Probe: load the listing once and show what the extractor sees.
//!
//! Loads the listing page, dismisses the consent dialog, applies the
//! navigation clicks, then prints:
//! - How many listing items were found in the second container
//! - The formatted newest item
//! - Optionally the social links and copied address of its detail page

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use agentwatch::config::AppConfig;
use agentwatch::enricher::{DetailPage, enrich_detail};
use agentwatch::listing::{SiteSelectors, extract_listing, format_item};
use agentwatch::session::{BrowserOptions, ChromeSession, RenderSession};

#[derive(Parser)]
#[command(name = "probe_listing", about = "Print the items extracted from the listing page")]
struct Args {
    #[arg(long, default_value = agentwatch::config::CONFIG_PATH)]
    config: PathBuf,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Also open the newest agent's detail page
    #[arg(long)]
    detail: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    agentwatch::init_tracing();
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;
    let selectors = SiteSelectors::compile(&config.site)?;
    let settings = &config.settings;

    println!("=== Probe: listing extraction ===");
    println!("URL: {}", settings.listing_url);
    println!();

    let origin = url::Url::parse(&settings.detail_base_url)?
        .origin()
        .ascii_serialization();
    let mut session = ChromeSession::launch(&BrowserOptions {
        headless: settings.headless && !args.headed,
        clipboard_origin: Some(origin),
    })
    .await?;

    let start = Instant::now();
    session.load(&settings.listing_url).await?;
    println!("Loaded in {:?}", start.elapsed());

    match session
        .click(&config.site.consent_button, settings.consent_timeout())
        .await
    {
        Ok(()) => println!("Consent dialog dismissed"),
        Err(e) => println!("No consent dialog ({e})"),
    }
    for locator in &config.site.nav_clicks {
        match session.click(locator, settings.click_timeout()).await {
            Ok(()) => println!("Clicked {locator}"),
            Err(e) => println!("Click failed: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(settings.jitter_max_ms)).await;
    }
    println!();

    let markup = session.current_markup().await?;
    println!("Snapshot: {} bytes", markup.len());
    let items = extract_listing(&markup, &selectors);
    println!("Items in second container: {}", items.len());

    let Some(first) = items.first() else {
        println!("Nothing to format (page not ready or structure changed)");
        session.quit().await?;
        return Ok(());
    };

    let item = format_item(first, &selectors);
    println!();
    println!("Newest item:");
    println!("  token:  {}", item.token_symbol);
    println!("  name:   {}", item.display_name);
    println!("  mcap:   {}", item.market_cap_text);
    println!("  link:   {}", item.detail_link);

    if args.detail {
        let page = DetailPage {
            base_url: &settings.detail_base_url,
            copy_button: &config.site.copy_button,
            settle: settings.settle_delay(),
            click_timeout: settings.click_timeout(),
        };
        let enrichment = enrich_detail(&mut session, &selectors, &page, &item.detail_link).await;
        println!();
        println!("Detail page ({:?}):", enrichment.outcome);
        println!("  address:  {}", enrichment.token_address);
        println!("  twitter:  {}", enrichment.socials.twitter);
        println!("  website:  {}", enrichment.socials.website);
        println!("  telegram: {}", enrichment.socials.telegram);
    }

    session.quit().await?;
    Ok(())
}
