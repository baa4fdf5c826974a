//! Byte-at-a-time word extraction and the per-chunk worker.
//!
//! A word is a maximal run of ASCII alphabetic bytes, folded to lowercase. Every other byte,
//! including anything outside ASCII, separates words.

use std::io::{self, Read, Seek, SeekFrom};
use std::time::{Duration, Instant};

use log::debug;

use crate::planner::ChunkSpan;
use crate::trie::PrefixMultiset;

/// Returns true for bytes that belong to words.
#[inline]
#[must_use]
pub fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphabetic()
}

/// Two-state scanner accumulating the word in progress.
#[derive(Debug, Default)]
pub struct WordScanner {
    word: Vec<u8>,
    in_word: bool,
    words: u64,
}

impl WordScanner {
    /// Creates a scanner in the outside-word state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one byte, inserting a finished word into `sink` when a separator ends it.
    pub fn feed(&mut self, byte: u8, sink: &mut PrefixMultiset) {
        if is_word_byte(byte) {
            self.in_word = true;
            self.word.push(byte.to_ascii_lowercase());
        } else if self.in_word {
            self.emit(sink);
        }
    }

    /// Flushes a pending word and returns the number of words emitted so far.
    pub fn finish(&mut self, sink: &mut PrefixMultiset) -> u64 {
        if self.in_word {
            self.emit(sink);
        }
        self.words
    }

    fn emit(&mut self, sink: &mut PrefixMultiset) {
        sink.insert(&self.word);
        self.word.clear();
        self.in_word = false;
        self.words += 1;
    }
}

/// Reads at most `budget` bytes from `reader` into `sink`, returning the number of words found.
///
/// A read error ends the scan as if the stream had ended; the pending word is still counted.
pub fn scan<R: Read>(reader: R, budget: u64, sink: &mut PrefixMultiset) -> u64 {
    if budget == 0 {
        return 0;
    }
    let mut scanner = WordScanner::new();
    for byte in reader.take(budget).bytes() {
        match byte {
            Ok(byte) => scanner.feed(byte, sink),
            Err(err) => {
                debug!("read failed, treating as end of input: {err}");
                break;
            }
        }
    }
    scanner.finish(sink)
}

/// Result of scanning one chunk.
#[derive(Debug)]
pub struct ChunkTally {
    /// Position of the chunk in the plan.
    pub index: usize,
    /// Byte range that was scanned.
    pub span: ChunkSpan,
    /// Words found in the range.
    pub words: u64,
    /// Private multiset of the words found.
    pub multiset: PrefixMultiset,
    /// Time spent scanning.
    pub elapsed: Duration,
}

/// One chunk of work bound to its own read handle.
#[derive(Debug)]
pub struct ChunkJob<R> {
    index: usize,
    span: ChunkSpan,
    reader: R,
}

impl<R: Read + Seek> ChunkJob<R> {
    /// Binds `reader` to the chunk at `index` covering `span`.
    pub fn new(index: usize, span: ChunkSpan, reader: R) -> Self {
        Self {
            index,
            span,
            reader,
        }
    }

    /// Plan position of the chunk.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte range of the chunk.
    #[must_use]
    pub fn span(&self) -> ChunkSpan {
        self.span
    }

    /// Scans the chunk into a fresh multiset.
    ///
    /// Failing to position the handle at the chunk start is an error; read errors after that
    /// end the scan early.
    pub fn run(mut self) -> io::Result<ChunkTally> {
        let started = Instant::now();
        let mut multiset = PrefixMultiset::new();
        let words = if self.span.len == 0 {
            0
        } else {
            self.reader
                .seek(SeekFrom::Start(self.span.start))
                .map_err(|err| {
                    io::Error::new(
                        err.kind(),
                        format!(
                            "chunk #{} could not seek to {}: {err}",
                            self.index, self.span.start
                        ),
                    )
                })?;
            scan(&mut self.reader, self.span.len, &mut multiset)
        };
        Ok(ChunkTally {
            index: self.index,
            span: self.span,
            words,
            multiset,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn count(text: &[u8], budget: u64) -> (u64, PrefixMultiset) {
        let mut sink = PrefixMultiset::new();
        let words = scan(text, budget, &mut sink);
        (words, sink)
    }

    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn case_is_folded() {
        let (words, set) = count(b"Ab, ab AB.", 10);
        assert_eq!(words, 3);
        assert_eq!(set.get(b"ab"), 3);
        assert_eq!(set.distinct_words(), 1);

        let (words, set) = count(b"Apple APPLE apple", 17);
        assert_eq!(words, 3);
        assert_eq!(set.get(b"apple"), 3);
    }

    #[test]
    fn budget_limits_scan_and_flushes_pending_word() {
        let (words, set) = count(b"hello world", 5);
        assert_eq!(words, 1);
        assert_eq!(set.get(b"hello"), 1);

        let (words, set) = count(b"hello world", 7);
        assert_eq!(words, 2);
        assert_eq!(set.get(b"w"), 1);
    }

    #[test]
    fn zero_budget_does_nothing() {
        let (words, set) = count(b"anything", 0);
        assert_eq!(words, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn non_ascii_and_digits_separate_words() {
        let (words, set) = count("caf\u{e9}s x2y don't".as_bytes(), 64);
        assert_eq!(words, 6);
        assert_eq!(set.get(b"caf"), 1);
        assert_eq!(set.get(b"s"), 1);
        assert_eq!(set.get(b"x"), 1);
        assert_eq!(set.get(b"y"), 1);
        assert_eq!(set.get(b"don"), 1);
        assert_eq!(set.get(b"t"), 1);
        assert_eq!(set.total_words(), 6);
    }

    #[test]
    fn read_error_is_end_of_input() {
        let mut sink = PrefixMultiset::new();
        let words = scan(FailingReader { data: b"one two" }, 100, &mut sink);
        assert_eq!(words, 2);
        assert_eq!(sink.get(b"two"), 1);
    }

    #[test]
    fn job_reads_only_its_span() {
        let text = b"cat cats dog".to_vec();
        let job = ChunkJob::new(1, ChunkSpan { start: 4, len: 5 }, Cursor::new(text));
        assert_eq!(job.index(), 1);
        assert_eq!(job.span().end(), 9);
        let tally = job.run().expect("scan chunk");
        assert_eq!(tally.words, 1);
        assert_eq!(tally.multiset.get(b"cats"), 1);
        assert_eq!(tally.multiset.get(b"dog"), 0);
    }

    #[test]
    fn empty_job_reports_zero_words() {
        let job = ChunkJob::new(0, ChunkSpan { start: 0, len: 0 }, Cursor::new(Vec::new()));
        let tally = job.run().expect("empty chunk");
        assert_eq!(tally.words, 0);
        assert!(tally.multiset.is_empty());
    }

    struct UnseekableReader(Cursor<Vec<u8>>);

    impl Read for UnseekableReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Seek for UnseekableReader {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Other, "seek not supported"))
        }
    }

    #[test]
    fn failed_seek_fails_the_chunk() {
        let reader = UnseekableReader(Cursor::new(b"cat cats dog".to_vec()));
        let job = ChunkJob::new(2, ChunkSpan { start: 4, len: 5 }, reader);
        let err = job.run().expect_err("seek failure must surface");
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(err.to_string().contains("chunk #2"));
    }
}
