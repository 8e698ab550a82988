use std::fmt;

/// A door contact that changed between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorTransition {
    /// Zero-based door index.
    pub door: usize,
    pub open: bool,
}

impl fmt::Display for DoorTransition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = if self.open { "OPEN" } else { "CLOSED" };
        write!(f, "Door {} {}", self.door + 1, state)
    }
}

/// Remembers the previous door sample and reports what changed.
///
/// Every door is assumed closed before the first sample, so a door that is
/// already open at startup is reported as opening.
#[derive(Debug, Clone)]
pub struct DoorMonitor {
    last: Vec<bool>,
}

impl DoorMonitor {
    pub fn new(door_count: usize) -> Self {
        Self {
            last: vec![false; door_count],
        }
    }

    /// Record a sample and return the changes, in door order.
    ///
    /// A sample with more doors than before extends the tracked set; the new
    /// doors start out closed.
    pub fn observe(&mut self, sample: &[bool]) -> Vec<DoorTransition> {
        if sample.len() > self.last.len() {
            self.last.resize(sample.len(), false);
        }

        sample
            .iter()
            .zip(self.last.iter_mut())
            .enumerate()
            .filter_map(|(door, (&now, before))| {
                let changed = now != *before;
                *before = now;
                changed.then_some(DoorTransition { door, open: now })
            })
            .collect()
    }

    /// The last recorded state of every door.
    pub fn states(&self) -> &[bool] {
        &self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_only_changes() {
        let mut monitor = DoorMonitor::new(2);

        assert!(monitor.observe(&[false, false]).is_empty());

        let changes = monitor.observe(&[true, false]);
        assert_eq!(changes, vec![DoorTransition { door: 0, open: true }]);

        assert!(monitor.observe(&[true, false]).is_empty());

        let changes = monitor.observe(&[false, true]);
        assert_eq!(
            changes,
            vec![
                DoorTransition { door: 0, open: false },
                DoorTransition { door: 1, open: true },
            ]
        );
        assert_eq!(monitor.states(), &[false, true]);
    }

    #[test]
    fn test_open_at_startup_is_reported() {
        let mut monitor = DoorMonitor::new(2);
        let changes = monitor.observe(&[false, true]);
        assert_eq!(changes[0].to_string(), "Door 2 OPEN");
    }

    #[test]
    fn test_display_is_one_based() {
        let closed = DoorTransition { door: 0, open: false };
        assert_eq!(closed.to_string(), "Door 1 CLOSED");
    }
}
