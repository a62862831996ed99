//! Extraction service implementations

pub mod smart_scraper;

pub use smart_scraper::SmartScraper;
