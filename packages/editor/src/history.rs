//! # Change History
//!
//! Snapshot-based undo for the editing session.
//!
//! ## Design
//!
//! - The history is a stack of checkpoints; checkpoint 0 is the state the
//!   session started from
//! - Every accepted commit pushes a deep copy of the state *after* the
//!   change, so the top checkpoint always equals the live state
//! - Undo pops the top and hands back the new top, which the caller
//!   installs wholesale
//! - The bottom checkpoint is never popped
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(state.clone());
//!
//! state.count += 1;
//! history.record(state.clone(), "Increment");
//!
//! if let Some(previous) = history.undo() {
//!     state = previous.clone();
//! }
//! ```

/// One retained state
#[derive(Debug, Clone)]
pub struct Checkpoint<T> {
    pub state: T,

    /// Label of the change that produced this state
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct History<T> {
    /// Oldest first; never empty
    checkpoints: Vec<Checkpoint<T>>,

    /// Maximum number of retained checkpoints (0 = unlimited)
    max_levels: usize,
}

impl<T: Clone> History<T> {
    /// Unlimited history starting at `initial`
    pub fn new(initial: T) -> Self {
        Self::with_max_levels(initial, 0)
    }

    pub fn with_max_levels(initial: T, max_levels: usize) -> Self {
        Self {
            checkpoints: vec![Checkpoint {
                state: initial,
                description: None,
            }],
            max_levels,
        }
    }

    /// Push the post-commit state
    pub fn record(&mut self, state: T, description: impl Into<String>) {
        self.checkpoints.push(Checkpoint {
            state,
            description: Some(description.into()),
        });

        // Trim if exceeded max levels; the oldest retained checkpoint becomes the floor
        if self.max_levels > 0 {
            while self.checkpoints.len() > self.max_levels.max(1) {
                self.checkpoints.remove(0);
            }
        }
    }

    /// Drop the latest checkpoint and return the one now on top.
    ///
    /// Returns `None` (and changes nothing) at the floor.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.checkpoints.pop();
        self.checkpoints.last().map(|checkpoint| &checkpoint.state)
    }

    pub fn can_undo(&self) -> bool {
        self.checkpoints.len() > 1
    }

    /// Number of retained checkpoints, floor included
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn undo_levels(&self) -> usize {
        self.checkpoints.len().saturating_sub(1)
    }

    /// The state the live session should equal
    pub fn current(&self) -> Option<&T> {
        self.checkpoints.last().map(|checkpoint| &checkpoint.state)
    }

    /// Label of the change `undo` would revert
    pub fn undo_description(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.checkpoints
            .last()
            .and_then(|checkpoint| checkpoint.description.as_deref())
    }

    /// Forget everything and start again from `initial`
    pub fn reset(&mut self, initial: T) {
        self.checkpoints.clear();
        self.checkpoints.push(Checkpoint {
            state: initial,
            description: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_creation() {
        let history = History::new(0);
        assert_eq!(history.depth(), 1);
        assert_eq!(history.undo_levels(), 0);
        assert!(!history.can_undo());
        assert_eq!(history.current(), Some(&0));
    }

    #[test]
    fn test_record_and_undo() {
        let mut history = History::new(vec![1]);
        history.record(vec![1, 2], "Append");
        history.record(vec![1, 2, 3], "Append again");

        assert_eq!(history.undo_description(), Some("Append again"));
        assert_eq!(history.undo(), Some(&vec![1, 2]));
        assert_eq!(history.undo(), Some(&vec![1]));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_at_floor_is_noop() {
        let mut history = History::new("start");
        assert_eq!(history.undo(), None);
        assert_eq!(history.depth(), 1);
        assert_eq!(history.current(), Some(&"start"));
        assert_eq!(history.undo_description(), None);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut history = History::with_max_levels(0, 2);
        for i in 1..=3 {
            history.record(i, format!("Set {}", i));
        }

        // Should only keep 2 (max levels)
        assert_eq!(history.depth(), 2);
        assert_eq!(history.undo(), Some(&2));
        assert_eq!(history.undo(), None);
        assert_eq!(history.current(), Some(&2));
    }

    #[test]
    fn test_reset() {
        let mut history = History::new(1);
        history.record(2, "Two");
        history.reset(10);

        assert_eq!(history.depth(), 1);
        assert_eq!(history.current(), Some(&10));
    }
}
