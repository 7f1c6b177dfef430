#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::perf,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
//! wordlist-driven http fuzzer
//!
//! the crate is organized around a single cooperative engine loop: word
//! cursors feed an iteration strategy, the strategy loads values into a
//! fixed pool of request contexts, the transport multiplexes the in-flight
//! requests, and completions are classified by filter/match rules before
//! being reported
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod filters;
pub mod pool;
pub mod progress;
pub mod reporter;
pub mod strategies;
pub mod template;
pub mod transport;

pub use error::StrikeFuzzError;

/// default placeholder token substituted per request
pub const DEFAULT_MARKER: &str = "FUZZ";
