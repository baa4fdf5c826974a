//! Map/reduce orchestration of a word count.
//!
//! The map phase runs one [`ChunkJob`] per planned chunk, each on its own scoped thread with
//! its own read handle and private multiset. A chunk whose thread cannot be created runs on
//! the calling thread once every launch has been attempted. The reduce phase then folds the
//! private multisets into one, strictly sequentially and in plan order.

use std::fmt;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::Path;
use std::sync::mpsc::{self, SendError};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::CountConfig;
use crate::error::{Result, WordFreqError};
use crate::metrics::{sample_rss_kb, ChunkMetrics, CountMetrics, Execution};
use crate::planner::ChunkPlanner;
use crate::source::{ChunkSource, FileSource};
use crate::tokenizer::{ChunkJob, ChunkTally};
use crate::trie::PrefixMultiset;

/// High-level façade configuring and executing counting runs.
#[derive(Debug, Clone)]
pub struct WordCounter {
    cfg: CountConfig,
}

/// Artifacts returned after a counting run completes.
#[must_use]
#[derive(Debug)]
pub struct CountArtifacts {
    /// Merged multiset of every word in the input.
    pub multiset: PrefixMultiset,
    /// Number of words found, duplicates included.
    pub total_words: u64,
    /// Execution details of the run.
    pub metrics: CountMetrics,
}

impl CountArtifacts {
    /// Writes the `word=count` report in lexicographic order.
    pub fn write_report<W: Write>(&self, out: W) -> std::io::Result<()> {
        self.multiset.write_report(out)
    }
}

/// Where a chunk stands after the launch pass.
enum Dispatch<'scope, R> {
    Launched(ScopedJoinHandle<'scope, Option<io::Result<ChunkTally>>>),
    Deferred(ChunkJob<R>),
}

/// Where a chunk stands once deferred chunks have been run.
enum Outcome<'scope> {
    Launched(usize, ScopedJoinHandle<'scope, Option<io::Result<ChunkTally>>>),
    FallenBack(io::Result<ChunkTally>),
}

impl WordCounter {
    /// Creates a counter for the supplied configuration.
    #[must_use]
    pub fn new(cfg: CountConfig) -> Self {
        Self { cfg }
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &CountConfig {
        &self.cfg
    }

    /// Counts the words of the file at `path`.
    pub fn count_path<P: AsRef<Path>>(&self, path: P) -> Result<CountArtifacts> {
        self.count_source(&FileSource::new(path))
    }

    /// Counts the words of `source`.
    ///
    /// Fails when the configuration is invalid, when not a single handle can be opened, when
    /// the size, the planning reads or a chunk seek fail, or when a worker thread panics.
    ///
    /// No more handles are opened than the input has bytes, since each chunk after the first
    /// starts on its own word.
    pub fn count_source<S: ChunkSource>(&self, source: &S) -> Result<CountArtifacts> {
        self.cfg.validate()?;
        let started = Instant::now();
        let io_error = |err| WordFreqError::io(err, source.path().map(Path::to_path_buf));

        let size = source.size().map_err(io_error)?;
        let byte_bound = usize::try_from(size.max(1)).unwrap_or(usize::MAX);
        let slots = self.cfg.workers.min(byte_bound);
        if slots < self.cfg.workers {
            debug!("input holds {size} bytes, opening at most {slots} handles");
        }
        let handles = open_handles(source, slots)?;
        info!("real number of workers is {}", handles.len());
        let buffer_size = self.cfg.read_buffer_size.min(byte_bound);
        let mut readers: Vec<_> = handles
            .into_iter()
            .map(|handle| BufReader::with_capacity(buffer_size, handle))
            .collect();

        let planner = ChunkPlanner::new(readers.len());
        let spans = planner.plan(&mut readers[0], size).map_err(io_error)?;
        if spans.len() < readers.len() {
            info!("reducing to {} workers", spans.len());
            readers.truncate(spans.len());
        }

        let jobs: Vec<_> = spans
            .into_iter()
            .zip(readers)
            .enumerate()
            .map(|(index, (span, reader))| ChunkJob::new(index, span, reader))
            .collect();

        let mut metrics = CountMetrics::new(self.cfg.workers);
        metrics.effective_workers = jobs.len();
        metrics.chunks.reserve(jobs.len());
        let tallies = self.map_chunks(jobs, source.path())?;

        let mut multiset = PrefixMultiset::new();
        let mut total_words = 0u64;
        for (tally, execution) in tallies {
            debug!(
                "chunk #{} found {} words ({} {})",
                tally.index, tally.words, tally.span.start, tally.span.len
            );
            total_words += tally.words;
            metrics.chunks.push(ChunkMetrics {
                index: tally.index,
                start: tally.span.start,
                len: tally.span.len,
                words: tally.words,
                execution,
                elapsed: tally.elapsed,
            });
            multiset.absorb(tally.multiset);
        }
        info!("found {total_words} words");

        metrics.total_words = total_words;
        metrics.distinct_words = multiset.distinct_words();
        metrics.total_duration = started.elapsed();
        metrics.rss_kb = sample_rss_kb();
        Ok(CountArtifacts {
            multiset,
            total_words,
            metrics,
        })
    }

    fn map_chunks<R>(
        &self,
        jobs: Vec<ChunkJob<R>>,
        path: Option<&Path>,
    ) -> Result<Vec<(ChunkTally, Execution)>>
    where
        R: Read + Seek + Send + 'static,
    {
        let budget = self.cfg.thread_budget.unwrap_or(usize::MAX);
        info!("starting {} worker thread(s)", jobs.len().min(budget));
        thread::scope(|scope| {
            let dispatched: Vec<_> = jobs
                .into_iter()
                .enumerate()
                .map(|(slot, job)| launch(scope, job, slot < budget))
                .collect();

            let outcomes: Vec<_> = dispatched
                .into_iter()
                .enumerate()
                .map(|(index, dispatch)| match dispatch {
                    Dispatch::Launched(handle) => Outcome::Launched(index, handle),
                    Dispatch::Deferred(job) => {
                        warn!("falling back on chunk #{index}");
                        Outcome::FallenBack(job.run())
                    }
                })
                .collect();

            debug!("waiting for {} results", outcomes.len());
            let harvested: Vec<Result<(ChunkTally, Execution)>> =
                outcomes.into_iter().map(|outcome| harvest(outcome, path)).collect();
            harvested.into_iter().collect()
        })
    }
}

fn open_handles<S: ChunkSource>(source: &S, workers: usize) -> Result<Vec<S::Reader>> {
    let mut handles = Vec::new();
    for slot in 0..workers {
        match source.open() {
            Ok(handle) => handles.push(handle),
            Err(err) if slot > 0 => {
                warn!("opening handle #{slot} failed, keeping {slot} workers: {err}");
                break;
            }
            Err(err) => {
                return Err(WordFreqError::io(
                    err,
                    source.path().map(Path::to_path_buf),
                ))
            }
        }
    }
    Ok(handles)
}

fn launch<'scope, R>(
    scope: &'scope Scope<'scope, '_>,
    job: ChunkJob<R>,
    allowed: bool,
) -> Dispatch<'scope, R>
where
    R: Read + Seek + Send + 'static,
{
    let index = job.index();
    if !allowed {
        debug!("thread budget exhausted before chunk #{index}");
        return Dispatch::Deferred(job);
    }
    // The job only moves once the thread exists, so a failed spawn keeps it.
    let (sender, receiver) = mpsc::channel::<ChunkJob<R>>();
    let spawned = thread::Builder::new()
        .name(format!("wordfreq-{index}"))
        .spawn_scoped(scope, move || receiver.recv().ok().map(ChunkJob::run));
    match spawned {
        Ok(handle) => match sender.send(job) {
            Ok(()) => Dispatch::Launched(handle),
            Err(SendError(job)) => {
                warn!("thread for chunk #{index} exited early, fallback...");
                Dispatch::Deferred(job)
            }
        },
        Err(err) => {
            warn!("creating thread for chunk #{index} failed, fallback...: {err}");
            Dispatch::Deferred(job)
        }
    }
}

fn harvest(outcome: Outcome<'_>, path: Option<&Path>) -> Result<(ChunkTally, Execution)> {
    let io_error = |err| WordFreqError::io(err, path.map(Path::to_path_buf));
    match outcome {
        Outcome::FallenBack(tally) => Ok((tally.map_err(io_error)?, Execution::Fallback)),
        Outcome::Launched(index, handle) => match handle.join() {
            Ok(Some(tally)) => Ok((tally.map_err(io_error)?, Execution::Threaded)),
            Ok(None) => Err(WordFreqError::Internal(format!(
                "worker for chunk #{index} never received its job"
            ))),
            Err(_) => Err(WordFreqError::Internal(format!(
                "worker for chunk #{index} panicked"
            ))),
        },
    }
}

impl fmt::Display for CountArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} words, {} distinct",
            self.total_words, self.metrics.distinct_words
        )?;
        writeln!(
            f,
            "Workers: {} requested, {} used, {} fallback",
            self.metrics.requested_workers,
            self.metrics.effective_workers,
            self.metrics.fallback_chunks()
        )?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
