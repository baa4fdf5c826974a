//! Word-aligned partitioning of a byte source into worker chunks.
//!
//! The planner never loads the input: it seeks to a naive cut every `size / workers` bytes and
//! reads forward only as far as the next word start.

use std::io::{self, BufRead, Read, Seek, SeekFrom};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::tokenizer::is_word_byte;

/// Byte range assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpan {
    /// First byte of the range.
    pub start: u64,
    /// Number of bytes in the range.
    pub len: u64,
}

impl ChunkSpan {
    /// One past the last byte of the range.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Moves forward from `from` to the start of the next word.
///
/// Skips the rest of any word straddling `from`, then the separators after it, and returns the
/// offset of the first alphabetic byte found, or the end of the stream. Probes at or past `size`
/// return `size`.
pub fn seek_word_start<R>(reader: &mut R, from: u64, size: u64) -> io::Result<u64>
where
    R: BufRead + Seek,
{
    if from >= size {
        return Ok(size);
    }
    reader.seek(SeekFrom::Start(from))?;
    let mut position = from;
    let mut straddling = true;
    for byte in reader.by_ref().bytes() {
        let byte = byte?;
        if straddling {
            straddling = is_word_byte(byte);
        } else if is_word_byte(byte) {
            return Ok(position);
        }
        position += 1;
    }
    Ok(position)
}

/// Splits a source into at most `workers` word-aligned chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    workers: usize,
}

impl ChunkPlanner {
    /// Creates a planner targeting `workers` chunks (at least one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Requested number of chunks.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Naive chunk size before word alignment, never below one byte.
    #[must_use]
    pub fn base_size(&self, size: u64) -> u64 {
        (size / self.workers as u64).max(1)
    }

    /// Computes the chunk plan for a source of `size` bytes read through `reader`.
    ///
    /// The returned spans partition `[0, size)` exactly and every boundary is a word start or
    /// the end of the input. The plan holds fewer chunks than requested when the input runs
    /// out of word boundaries; callers must use its length. An empty input yields one empty
    /// chunk.
    pub fn plan<R>(&self, reader: &mut R, size: u64) -> io::Result<Vec<ChunkSpan>>
    where
        R: BufRead + Seek,
    {
        let base = self.base_size(size);
        debug!("chunk size is {base}");
        let mut spans: Vec<ChunkSpan> = Vec::new();
        let mut start = 0u64;
        while spans.len() < self.workers {
            let end = seek_word_start(reader, start.saturating_add(base), size)?.min(size);
            spans.push(ChunkSpan {
                start,
                len: end - start,
            });
            if end >= size {
                break;
            }
            start = end;
        }
        if let Some(last) = spans.last_mut() {
            last.len = size - last.start;
        }
        for (index, span) in spans.iter().enumerate() {
            debug!("chunk #{index}: start {} len {}", span.start, span.len);
        }
        Ok(spans)
    }
}
