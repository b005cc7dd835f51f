#![forbid(unsafe_code)]
//! Web search and page fetching for Lodestar
//!
//! [`BraveSearchClient`] turns a query into ranked result links;
//! [`PageFetcher`] downloads a page and reduces it to readable paragraph
//! text.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_websearch::{BraveSearchClient, PageFetchConfig, PageFetcher, SearchProvider, WebSearchConfig};
//!
//! let search = BraveSearchClient::new(&WebSearchConfig::default())?;
//! let fetcher = PageFetcher::new(&PageFetchConfig::default())?;
//!
//! for result in search.search("rust async cancellation", 5).await? {
//!     let text = fetcher.fetch_text(&result.url).await?;
//!     println!("#{} {}: {} chars", result.position, result.url, text.len());
//! }
//! ```

mod brave;
mod config;
mod error;
mod models;
mod page;
mod provider;

pub use brave::BraveSearchClient;
pub use config::{PageFetchConfig, WebSearchConfig};
pub use error::WebSearchError;
pub use models::SearchResult;
pub use page::{PageFetcher, TextExtractor};
pub use provider::SearchProvider;
