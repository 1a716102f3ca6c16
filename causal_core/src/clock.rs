//! The clock algebra - vector and matrix logical clocks.
//!
//! Every operation takes `&self` and returns a fresh clock. Nothing here
//! mutates in place, so a participant's clock history stays inspectable and
//! replay is trivially deterministic.
//!
//! # Theory
//!
//! Given two vector timestamps a and b:
//! - a dominates b iff a[i] >= b[i] for every i
//! - a happens-before b iff b dominates a and a != b
//! - a and b are concurrent iff neither happens-before the other
//!
//! A matrix clock holds one vector clock per row: row i is what the holder
//! believes process i knows.

use causal_env::{ClockView, ProcessId};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by clock algebra operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("Clock shape mismatch: expected {expected} processes, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("{process} is outside a clock of {size} processes")]
    ProcessOutOfRange { process: ProcessId, size: usize },

    #[error("Cannot combine a vector clock with a matrix clock")]
    KindMismatch,

    #[error("Matrix clock rows must form a square grid")]
    NotSquare,
}

fn check_owner(owner: ProcessId, size: usize) -> Result<usize, ClockError> {
    let index = owner.index();
    if index < size {
        Ok(index)
    } else {
        Err(ClockError::ProcessOutOfRange {
            process: owner,
            size,
        })
    }
}

// ============================================================================
// VECTOR CLOCK
// ============================================================================

/// Vector clock over a fixed set of processes.
///
/// # Example
///
/// ```text
/// P1: [2, 1, 0]  (P1 has done 2 events, last saw P2 at 1, P3 at 0)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorClock {
    entries: DVector<u64>,
}

impl VectorClock {
    /// Creates an all-zero clock for `size` processes.
    pub fn zero(size: usize) -> Self {
        Self {
            entries: DVector::zeros(size),
        }
    }

    /// Creates a clock from raw entries.
    pub fn from_entries(entries: Vec<u64>) -> Self {
        Self {
            entries: DVector::from_vec(entries),
        }
    }

    /// Number of processes covered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `process`.
    pub fn get(&self, process: ProcessId) -> Option<u64> {
        self.entries.get(process.index()).copied()
    }

    /// Returns the raw entries.
    pub fn entries(&self) -> &[u64] {
        self.entries.as_slice()
    }

    /// Returns a copy with `owner`'s entry advanced by one.
    pub fn increment(&self, owner: ProcessId) -> Result<Self, ClockError> {
        let index = check_owner(owner, self.len())?;
        let mut entries = self.entries.clone();
        entries[index] = entries[index].saturating_add(1);
        Ok(Self { entries })
    }

    /// Element-wise maximum of two clocks of the same size.
    pub fn merge(&self, other: &VectorClock) -> Result<Self, ClockError> {
        if self.len() != other.len() {
            return Err(ClockError::ShapeMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(Self {
            entries: self.entries.zip_map(&other.entries, |a, b| a.max(b)),
        })
    }

    /// True iff every entry of `self` is at least the matching entry of
    /// `other`. Clocks of different sizes never dominate each other.
    pub fn dominates(&self, other: &VectorClock) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a >= b)
    }

    /// True iff `self` causally precedes `other`.
    pub fn happens_before(&self, other: &VectorClock) -> bool {
        other.dominates(self) && self != other
    }

    /// True iff neither clock precedes the other and they differ.
    pub fn concurrent(&self, other: &VectorClock) -> bool {
        self != other && !self.happens_before(other) && !other.happens_before(self)
    }

    /// Returns the plain numeric view.
    pub fn view(&self) -> ClockView {
        ClockView::Vector(self.entries.iter().copied().collect())
    }
}

impl std::fmt::Display for VectorClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.view())
    }
}

// ============================================================================
// MATRIX CLOCK
// ============================================================================

/// Matrix clock: an N x N grid of counters.
///
/// Cell (i, j) is what the holder believes process i knows about process
/// j's counter. The holder's own row is its vector clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixClock {
    cells: DMatrix<u64>,
}

impl MatrixClock {
    /// Creates an all-zero `size` x `size` clock.
    pub fn zero(size: usize) -> Self {
        Self {
            cells: DMatrix::zeros(size, size),
        }
    }

    /// Creates a clock from rows. Rows must form a square grid.
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<Self, ClockError> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return Err(ClockError::NotSquare);
        }
        Ok(Self {
            cells: DMatrix::from_fn(size, size, |i, j| rows[i][j]),
        })
    }

    /// Number of processes covered.
    pub fn size(&self) -> usize {
        self.cells.nrows()
    }

    /// Returns cell (`row`, `col`).
    pub fn get(&self, row: ProcessId, col: ProcessId) -> Option<u64> {
        self.cells.get((row.index(), col.index())).copied()
    }

    /// Returns row `process` as a vector clock.
    pub fn row(&self, process: ProcessId) -> Result<VectorClock, ClockError> {
        let index = check_owner(process, self.size())?;
        Ok(VectorClock::from_entries(
            self.cells.row(index).iter().copied().collect(),
        ))
    }

    /// Returns a copy with the diagonal cell of `owner` advanced by one.
    pub fn increment(&self, owner: ProcessId) -> Result<Self, ClockError> {
        let index = check_owner(owner, self.size())?;
        let mut cells = self.cells.clone();
        cells[(index, index)] = cells[(index, index)].saturating_add(1);
        Ok(Self { cells })
    }

    /// Row-wise maximum: every row pair is merged element-wise.
    pub fn merge(&self, other: &MatrixClock) -> Result<Self, ClockError> {
        if self.size() != other.size() {
            return Err(ClockError::ShapeMismatch {
                expected: self.size(),
                found: other.size(),
            });
        }
        Ok(Self {
            cells: self.cells.zip_map(&other.cells, |a, b| a.max(b)),
        })
    }

    /// Returns a copy where row `owner` is the element-wise maximum of row
    /// `owner` and row `source`.
    pub fn absorb_row(&self, owner: ProcessId, source: ProcessId) -> Result<Self, ClockError> {
        let target = check_owner(owner, self.size())?;
        let source = check_owner(source, self.size())?;
        let mut cells = self.cells.clone();
        for col in 0..self.size() {
            cells[(target, col)] = cells[(target, col)].max(self.cells[(source, col)]);
        }
        Ok(Self { cells })
    }

    /// True iff every cell of `self` is at least the matching cell of `other`.
    pub fn dominates(&self, other: &MatrixClock) -> bool {
        self.size() == other.size()
            && self
                .cells
                .iter()
                .zip(other.cells.iter())
                .all(|(a, b)| a >= b)
    }

    /// Returns the plain numeric view, one inner list per row.
    pub fn view(&self) -> ClockView {
        let rows = (0..self.size())
            .map(|i| self.cells.row(i).iter().copied().collect())
            .collect();
        ClockView::Matrix(rows)
    }
}

impl std::fmt::Display for MatrixClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.view())
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// A participant's clock under any discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clock {
    Vector(VectorClock),
    Matrix(MatrixClock),
}

impl Clock {
    /// Returns a copy with `owner`'s own counter advanced by one.
    pub fn increment(&self, owner: ProcessId) -> Result<Clock, ClockError> {
        match self {
            Clock::Vector(v) => v.increment(owner).map(Clock::Vector),
            Clock::Matrix(m) => m.increment(owner).map(Clock::Matrix),
        }
    }

    /// Element-wise (vector) or row-wise (matrix) maximum.
    pub fn merge(&self, other: &Clock) -> Result<Clock, ClockError> {
        match (self, other) {
            (Clock::Vector(a), Clock::Vector(b)) => a.merge(b).map(Clock::Vector),
            (Clock::Matrix(a), Clock::Matrix(b)) => a.merge(b).map(Clock::Matrix),
            _ => Err(ClockError::KindMismatch),
        }
    }

    /// True iff every entry of `self` is at least the matching entry of `other`.
    pub fn dominates(&self, other: &Clock) -> bool {
        match (self, other) {
            (Clock::Vector(a), Clock::Vector(b)) => a.dominates(b),
            (Clock::Matrix(a), Clock::Matrix(b)) => a.dominates(b),
            _ => false,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorClock> {
        match self {
            Clock::Vector(v) => Some(v),
            Clock::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&MatrixClock> {
        match self {
            Clock::Vector(_) => None,
            Clock::Matrix(m) => Some(m),
        }
    }

    /// Returns the plain numeric view.
    pub fn view(&self) -> ClockView {
        match self {
            Clock::Vector(v) => v.view(),
            Clock::Matrix(m) => m.view(),
        }
    }
}

impl std::fmt::Display for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.view())
    }
}

// ============================================================================
// TESTS
// ============================================================================
