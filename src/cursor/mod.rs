//! Forward-only range scanning over sorted flat datasets.
//!
//! A [`RangeScanCursor`] is seeded at a byte offset taken from the sparse
//! index and walks the file line by line. Because the index is coarse, the
//! first lines it sees may precede the wanted range; those are skipped while
//! the cursor is [`ScanState::Seeking`]. Once a line matches, the cursor is
//! [`ScanState::Matching`] and the first non-matching line ends the scan:
//! the dataset is sorted, so nothing after it can match.
//!
//! ```text
//!   offset ─┐
//!           ▼
//!   [miss][miss][HIT][HIT][HIT][miss] ...
//!    Seeking ───▶ Matching ──────▶ Exhausted
//! ```
//!
//! Every call to [`RangeScanCursor::next`] runs against its own wall-clock
//! budget (100ms by default), checked once per line read.

mod domain;
mod reverse;

pub use domain::{DomainNeedle, DomainRecord};
pub use reverse::{ReverseHits, ReverseMatch, ReverseNeedle, ReverseRecord};

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Default budget for a single [`RangeScanCursor::next`] call.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(100);

/// Read buffer size for dataset files.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Cursor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Before the first match: non-matching lines are index catch-up.
    Seeking,
    /// Inside the contiguous run of matches.
    Matching,
    /// EOF, or a mismatch after the run.
    Exhausted,
    /// IO or parse error.
    Failed,
    /// A step ran past its deadline.
    TimedOut,
}

impl ScanState {
    /// Whether the cursor can produce no more matches.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Exhausted | ScanState::Failed | ScanState::TimedOut
        )
    }
}

/// Outcome of testing one dataset line against a needle.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict<T> {
    /// Not in range. Skipped while seeking, ends the scan while matching.
    Miss,
    /// Sorts after the range. Ends the scan in any state.
    Past,
    /// In range but collapses into the previous match; produces nothing.
    Repeat,
    /// In range.
    Hit(T),
}

/// Predicate a cursor applies to each line, plus result reconstruction.
pub trait Needle {
    /// One reconstructed match.
    type Item;
    /// What [`RangeScanCursor::take`] collects matches into.
    type Output: Default + Extend<Self::Item>;

    /// Test a line (without its trailing newline).
    fn test(&mut self, line: &str) -> Result<Verdict<Self::Item>>;
}

/// A point in time a scan step must finish by.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Whether the deadline has been reached.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Stateful forward scanner over one dataset file.
pub struct RangeScanCursor<N: Needle> {
    reader: Option<BufReader<File>>,
    needle: N,
    state: ScanState,
    budget: Duration,
    line: String,
    current: Option<N::Item>,
    error: Option<Error>,
    /// Query text, for logs and timeout errors
    label: String,
}

impl<N: Needle> RangeScanCursor<N> {
    /// Open `path`, seek to `offset` and prepare to scan with `needle`.
    pub fn open(path: &Path, offset: u64, needle: N, label: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;

        Ok(Self {
            reader: Some(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
            needle,
            state: ScanState::Seeking,
            budget: DEFAULT_SCAN_TIMEOUT,
            line: String::new(),
            current: None,
            error: None,
            label: label.to_string(),
        })
    }

    /// Set the per-step wall-clock budget.
    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The match produced by the last successful [`next`](Self::next).
    pub fn current(&self) -> Option<&N::Item> {
        self.current.as_ref()
    }

    /// The error that ended the scan, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Take ownership of the error that ended the scan, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Advance to the next match.
    ///
    /// Returns `false` once the cursor reaches a terminal state; the reason
    /// is available from [`state`](Self::state) and [`error`](Self::error).
    pub fn next(&mut self) -> bool {
        self.current = None;
        if self.state.is_terminal() {
            return false;
        }

        let Some(reader) = self.reader.as_mut() else {
            self.state = ScanState::Exhausted;
            return false;
        };

        let deadline = Deadline::after(self.budget);
        loop {
            if deadline.expired() {
                log::warn!("Scan timeout on {} after {:?}", self.label, self.budget);
                self.state = ScanState::TimedOut;
                self.error = Some(Error::ScanTimeout {
                    query: self.label.clone(),
                    budget: self.budget,
                });
                return false;
            }

            self.line.clear();
            match reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.state = ScanState::Exhausted;
                    return false;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Read failed while scanning for {}: {}", self.label, e);
                    self.state = ScanState::Failed;
                    self.error = Some(Error::Io(e));
                    return false;
                }
            }

            let line = self.line.trim_end_matches(['\n', '\r']);
            match self.needle.test(line) {
                Ok(Verdict::Hit(item)) => {
                    self.state = ScanState::Matching;
                    self.current = Some(item);
                    return true;
                }
                Ok(Verdict::Repeat) => {
                    self.state = ScanState::Matching;
                }
                Ok(Verdict::Miss) if self.state == ScanState::Seeking => {}
                Ok(Verdict::Miss) | Ok(Verdict::Past) => {
                    self.state = ScanState::Exhausted;
                    return false;
                }
                Err(e) => {
                    log::error!("Scan for {} failed: {}", self.label, e);
                    self.state = ScanState::Failed;
                    self.error = Some(e);
                    return false;
                }
            }
        }
    }

    /// Discard up to `n` matches.
    pub fn skip(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            if !self.next() {
                break;
            }
        }
        self
    }

    /// Collect up to `n` matches in scan order.
    pub fn take(&mut self, n: usize) -> N::Output {
        let mut out = N::Output::default();
        for _ in 0..n {
            if !self.next() {
                break;
            }
            out.extend(self.current.take());
        }
        out
    }

    /// Release the file handle. Safe to call repeatedly and in any state.
    pub fn close(&mut self) {
        self.reader = None;
        self.current = None;
    }
}

/// Cursor over the domain dataset.
pub type DomainCursor = RangeScanCursor<DomainNeedle>;

/// Cursor over the reverse dataset.
pub type ReverseCursor = RangeScanCursor<ReverseNeedle>;
