#![recursion_limit = "1024"]

pub mod crawler;
pub mod errors;
pub mod output;
pub mod page;
pub mod walker;

pub use crawler::{CrawlSummary, Crawler, CrawlerConfig};
pub use errors::{Error, ErrorKind, Result};
pub use output::{OutputFormat, OutputTarget, Row};
pub use page::{Card, FetchMode, PageFetcher, PageParser, PageSelectors, TagPage};
pub use walker::{TagWalker, WalkResult};
