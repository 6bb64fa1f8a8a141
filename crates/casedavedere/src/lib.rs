pub mod changes;
pub mod coercion;
pub mod config;
pub mod filter;
pub mod notify;
mod parser;
pub mod pipeline;
pub mod report;
pub mod scraper;
pub mod types;

pub use crate::filter::PropertyFilter;
pub use crate::pipeline::{Harvest, Pipeline, PipelineError, RunSummary};
pub use crate::scraper::{PageFetcher, ScraperError, WebScraper};
pub use crate::types::{PropertyRecord, SearchArea};

pub(crate) const HOST: &str = "www.casedavedere.it";
pub(crate) const BASE_URL: &str = "https://www.casedavedere.it";
