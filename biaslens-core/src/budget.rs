//! Wall-clock budget for a single request.

use std::time::{Duration, Instant};

/// Optional deadline checked between stages and columns.
///
/// When exhausted, long-running work stops at the next checkpoint and returns
/// what it has, flagged as partial.
#[derive(Debug, Clone, Copy, Default)]
pub struct Budget {
    deadline: Option<Instant>,
}

impl Budget {
    /// No deadline.
    pub fn unlimited() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
        }
    }

    pub fn until(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
