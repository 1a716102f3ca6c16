//! Text presentation of snapshots through `tracing`.

use causal_env::{SnapshotSink, StateSnapshot};
use tracing::{debug, info};

/// Logs each snapshot's new event lines at INFO and, when detailed, every
/// participant's clock and pending messages at DEBUG.
pub struct TextPresenter {
    /// Log lines already rendered
    rendered: usize,

    /// Cursor of the last rendered snapshot
    last_cursor: Option<usize>,

    /// Whether to dump participant state after each step
    detailed: bool,
}

impl TextPresenter {
    pub fn new() -> Self {
        Self {
            rendered: 0,
            last_cursor: None,
            detailed: false,
        }
    }

    /// Also dump participant state after each step.
    pub fn detailed(mut self) -> Self {
        self.detailed = true;
        self
    }

    /// Lines from `snapshot.log` not rendered yet.
    ///
    /// Cursor and log only grow during a run; either going backwards means
    /// a new run, rendered from its first line.
    pub fn fresh_lines<'a>(&mut self, snapshot: &'a StateSnapshot) -> &'a [String] {
        let rewound = self.last_cursor.is_some_and(|c| snapshot.cursor < c);
        if rewound || snapshot.log.len() < self.rendered {
            self.rendered = 0;
        }
        self.last_cursor = Some(snapshot.cursor);
        let fresh = &snapshot.log[self.rendered..];
        self.rendered = snapshot.log.len();
        fresh
    }
}

impl Default for TextPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSink for TextPresenter {
    fn render(&mut self, snapshot: &StateSnapshot) {
        let step = snapshot.cursor;
        let total = snapshot.total_steps;
        for line in self.fresh_lines(snapshot) {
            info!("[{}/{}] {}", step, total, line);
        }

        if !self.detailed {
            return;
        }
        for view in &snapshot.participants {
            debug!("  {} clock={}", view.id, view.clock);
            for pending in &view.pending {
                debug!(
                    "    {} from {} ({})",
                    pending.message.id, pending.message.from, pending.status
                );
            }
        }
    }
}
