//! Crawl adapter for portscout.
//!
//! - [`engine`]: the HTTP crawler implementing [`portscout_core::PageCrawler`]
//! - [`signals`]: HTML signal extraction (anchors, text blocks, tables, embedded JSON)

pub mod engine;
pub mod signals;

pub use engine::{CrawlerConfig, HttpCrawler};
pub use signals::{extract_signals, gatsby_page_data_url};
