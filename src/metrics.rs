//! Metrics describing how a counting run was executed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a chunk ended up being scanned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Execution {
    /// Scanned on its own worker thread.
    Threaded,
    /// Scanned synchronously on the calling thread after a thread could not be used.
    Fallback,
}

/// Metrics captured for each chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetrics {
    /// Position of the chunk in the plan.
    pub index: usize,
    /// First byte of the chunk.
    pub start: u64,
    /// Length of the chunk in bytes.
    pub len: u64,
    /// Words found in the chunk.
    pub words: u64,
    /// Execution path taken by the chunk.
    pub execution: Execution,
    /// Scan time of the chunk.
    pub elapsed: Duration,
}

/// Aggregate metrics produced by a counting run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountMetrics {
    /// Worker count asked for by the caller.
    pub requested_workers: usize,
    /// Worker count actually used after handle and planning reductions.
    pub effective_workers: usize,
    /// Per-chunk snapshots in plan order.
    pub chunks: Vec<ChunkMetrics>,
    /// Words found across all chunks.
    pub total_words: u64,
    /// Distinct words in the merged multiset.
    pub distinct_words: usize,
    /// Wall time from opening the input to the end of the reduction.
    pub total_duration: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

impl CountMetrics {
    /// Creates an empty metrics container for `requested_workers`.
    ///
    /// Chunk storage is not reserved here; the requested count may far exceed the plan.
    #[must_use]
    pub fn new(requested_workers: usize) -> Self {
        Self {
            requested_workers,
            effective_workers: 0,
            chunks: Vec::new(),
            total_words: 0,
            distinct_words: 0,
            total_duration: Duration::ZERO,
            rss_kb: None,
        }
    }

    /// Number of chunks that took the synchronous fallback path.
    #[must_use]
    pub fn fallback_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.execution == Execution::Fallback)
            .count()
    }

    /// Serialises the metrics as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(std::result::Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            return rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, words: u64, execution: Execution) -> ChunkMetrics {
        ChunkMetrics {
            index,
            start: index as u64 * 10,
            len: 10,
            words,
            execution,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn fallback_chunks_are_counted() {
        let mut metrics = CountMetrics::new(3);
        metrics.chunks.push(chunk(0, 2, Execution::Threaded));
        metrics.chunks.push(chunk(1, 1, Execution::Fallback));
        metrics.chunks.push(chunk(2, 4, Execution::Fallback));
        assert_eq!(metrics.fallback_chunks(), 2);
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let mut metrics = CountMetrics::new(2);
        metrics.effective_workers = 1;
        metrics.total_words = 5;
        metrics.chunks.push(chunk(0, 5, Execution::Threaded));
        let json = metrics.to_json(true).expect("serialize");
        assert!(json.contains("\"Threaded\""));
        let parsed: CountMetrics = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, metrics);
    }
}
