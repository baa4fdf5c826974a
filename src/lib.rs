//! Parallel word frequency counting library and CLI.
//!
//! The input is cut into word-aligned byte ranges, each range is scanned on its own thread into
//! a private prefix-tree multiset, and the partial multisets are merged into one table whose
//! ordered walk yields the `word=count` report.
//!
//! ```no_run
//! use wordfreq::{CountConfig, WordCounter};
//!
//! # fn main() -> wordfreq::Result<()> {
//! let cfg = CountConfig::builder().workers(8).build()?;
//! let artifacts = WordCounter::new(cfg).count_path("/path/to/corpus.txt")?;
//! artifacts.write_report(std::io::stdout().lock())
//!     .map_err(|err| wordfreq::WordFreqError::io(err, None))?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `wordfreq = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod counter;
pub mod error;
pub mod metrics;
pub mod planner;
pub mod source;
pub mod tokenizer;
pub mod trie;

pub use config::{CountBuilder, CountConfig};
pub use counter::{CountArtifacts, WordCounter};
pub use error::{Result, WordFreqError};
pub use metrics::{ChunkMetrics, CountMetrics, Execution};
pub use planner::{ChunkPlanner, ChunkSpan};
pub use source::{ChunkSource, FileSource, MemorySource};
pub use trie::PrefixMultiset;
