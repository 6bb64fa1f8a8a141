//! One run of the crawler: collect matching listings, report them and notify about
//! the ones not seen by the previous run.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Local;

use crate::changes::{ChangeSet, ChangeSetError, Code, CodeSet};
use crate::config::{ConfigError, RunPaths, load_filter, load_recipients, load_search_areas};
use crate::filter::PropertyFilter;
use crate::notify;
use crate::parser::{parse_listing, parse_listing_links};
use crate::report::{self, ReportError};
use crate::scraper::{PageFetcher, ScraperError, WebScraper, search_page_url};
use crate::types::{PropertyRecord, SearchArea};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Scraper error: {0}")]
    Scraper(#[from] ScraperError),
    #[error("Host {0} does not resolve")]
    Unresolvable(&'static str),
    #[error("No filter configured at {0}")]
    MissingFilter(PathBuf),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
    #[error("Change detection error: {0}")]
    ChangeSet(#[from] ChangeSetError),
}

/// The listings accepted during one run, keyed by code and kept in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    index: HashMap<Code, usize>,
    records: Vec<PropertyRecord>,
}

impl Harvest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` unless a record with the same code is already held.
    pub fn insert(&mut self, record: PropertyRecord) -> bool {
        if self.index.contains_key(&record.code) {
            return false;
        }
        self.index.insert(record.code.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, code: &Code) -> Option<&PropertyRecord> {
        self.index.get(code).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn codes(&self) -> CodeSet {
        self.index.keys().cloned().collect()
    }

    /// The records whose code is in `codes`, in discovery order.
    pub fn select(&self, codes: &CodeSet) -> Vec<&PropertyRecord> {
        self.records
            .iter()
            .filter(|record| codes.contains(&record.code))
            .collect()
    }
}

/// Scrapes search areas page by page into a [`Harvest`].
pub struct Pipeline<F> {
    fetcher: F,
    base_url: String,
    filter: PropertyFilter,
    harvest: Harvest,
    pages_scanned: u32,
}

impl<F: PageFetcher> Pipeline<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>, filter: PropertyFilter) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            filter,
            harvest: Harvest::new(),
            pages_scanned: 0,
        }
    }

    pub fn filter(&self) -> &PropertyFilter {
        &self.filter
    }

    pub fn harvest(&self) -> &Harvest {
        &self.harvest
    }

    pub fn pages_scanned(&self) -> u32 {
        self.pages_scanned
    }

    /// Fetches every listing linked from a search results page and keeps the ones
    /// the filter accepts. Returns `true` when the page has no listing anchors.
    pub async fn scrape_page(&mut self, page_html: Option<&str>) -> bool {
        let Some(page_html) = page_html else {
            return true;
        };

        let links = parse_listing_links(page_html);

        for link in &links {
            let Some(target) = link.target() else {
                log::debug!("Skipping listing anchor with href {:?}", link.href);
                continue;
            };

            let Some(detail_html) = self.fetcher.fetch(target).await else {
                continue;
            };

            let Some(record) = parse_listing(&detail_html, target, &link.fragment) else {
                continue;
            };

            if !self.filter.evaluate(&record) {
                continue;
            }

            let code = record.code.clone();
            if self.harvest.insert(record) {
                log::info!("Property Code: {}", code.as_deref().unwrap_or("None"));
            }
        }

        links.is_empty()
    }

    /// Walks the results pages of `area` until one comes back without listings.
    pub async fn scrape_area(&mut self, area: &SearchArea) -> u32 {
        let mut page = 1;

        loop {
            let url = search_page_url(&self.base_url, area, page);
            let page_html = self.fetcher.fetch(&url).await;
            log::info!("{} page number: {}", area, page);
            self.pages_scanned += 1;

            if self.scrape_page(page_html.as_deref()).await {
                break;
            }
            page += 1;
        }

        page
    }

    pub fn into_harvest(self) -> Harvest {
        self.harvest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub notify: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { notify: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub areas: usize,
    pub pages_scanned: u32,
    pub matches: usize,
    pub new_matches: usize,
    pub state_rewritten: bool,
    pub notified: bool,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nRun summary:")?;
        writeln!(f, "  Search areas:    {}", self.areas)?;
        writeln!(f, "  Pages scanned:   {}", self.pages_scanned)?;
        writeln!(f, "  Matches:         {}", self.matches)?;
        writeln!(f, "  New matches:     {}", self.new_matches)?;
        writeln!(f, "  State rewritten: {}", self.state_rewritten)?;
        writeln!(f, "  Email sent:      {}", self.notified)
    }
}

/// Runs the whole crawl against the live site.
pub async fn run(paths: &RunPaths, options: RunOptions) -> Result<RunSummary, PipelineError> {
    let scraper = WebScraper::new()?;
    if !scraper.resolve_host().await {
        return Err(PipelineError::Unresolvable(crate::HOST));
    }

    let base_url = scraper.base_url().to_string();
    run_with(scraper, base_url, paths, options).await
}

/// Runs the crawl with pages from `fetcher`, rooted at `base_url`.
///
/// Nothing is written before every area has been scraped, so an interrupted run
/// leaves the previous report and code state untouched.
pub async fn run_with<F: PageFetcher>(
    fetcher: F,
    base_url: impl Into<String>,
    paths: &RunPaths,
    options: RunOptions,
) -> Result<RunSummary, PipelineError> {
    let filter = load_filter(&paths.filter)?
        .ok_or_else(|| PipelineError::MissingFilter(paths.filter.clone()))?;
    let areas = load_search_areas(&paths.areas)?;
    let recipients = load_recipients(&paths.recipients)?;

    let mut pipeline = Pipeline::new(fetcher, base_url, filter);
    for area in &areas {
        pipeline.scrape_area(area).await;
    }

    let generated_at = Local::now();
    let harvest = pipeline.harvest();

    report::write_report(
        &paths.report,
        pipeline.filter(),
        harvest.records(),
        generated_at,
    )?;
    log::info!(
        "Wrote {} matching listings to {}",
        harvest.len(),
        paths.report.display()
    );

    let change_set = ChangeSet::load(&paths.codes, harvest.codes())?;
    let state_rewritten = change_set.persist(&paths.codes)?;
    let fresh = harvest.select(&change_set.new_codes());

    let mut notified = false;
    if options.notify && !fresh.is_empty() && !recipients.is_empty() {
        let body = report::render_report(pipeline.filter(), fresh.iter().copied(), generated_at);
        match notify::send_report(&paths.token, &recipients, &body).await {
            Ok(()) => notified = true,
            Err(e) => log::error!("Unable to send email: {e}"),
        }
    }

    Ok(RunSummary {
        areas: areas.len(),
        pages_scanned: pipeline.pages_scanned(),
        matches: harvest.len(),
        new_matches: fresh.len(),
        state_rewritten,
        notified,
    })
}
