//! Recorded evaluation points replayed by the mock engine.

use std::collections::BTreeMap;

/// One evaluation of a breakpoint at a simulation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalPoint {
    /// Simulation time.
    pub time: u64,
    /// Breakpoint evaluated at this point.
    pub breakpoint_id: u64,
    /// Signals written by the statement, with their new values.
    pub writes: BTreeMap<String, i64>,
}

/// Evaluation points ordered by time. Points at the same time keep their
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    points: Vec<EvalPoint>,
    last: Option<usize>,
}

impl Timeline {
    /// An empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an evaluation of `breakpoint_id` at `time`.
    #[must_use]
    pub fn at(mut self, time: u64, breakpoint_id: u64) -> Self {
        let pos = self.points.partition_point(|p| p.time <= time);
        self.points.insert(
            pos,
            EvalPoint {
                time,
                breakpoint_id,
                writes: BTreeMap::new(),
            },
        );
        self.last = Some(pos);
        self
    }

    /// Record a write by the most recently added point.
    ///
    /// # Panics
    ///
    /// Panics if no point was added yet.
    #[must_use]
    pub fn write(mut self, signal: impl Into<String>, value: i64) -> Self {
        let last = self.last.expect("write() needs a preceding at()");
        self.points[last].writes.insert(signal.into(), value);
        self
    }

    /// All points, in replay order.
    #[must_use]
    pub fn points(&self) -> &[EvalPoint] {
        &self.points
    }

    /// A point by position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&EvalPoint> {
        self.points.get(index)
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the timeline has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position of the first point at or after `time`.
    #[must_use]
    pub fn first_at_or_after(&self, time: u64) -> Option<usize> {
        let pos = self.points.partition_point(|p| p.time < time);
        (pos < self.points.len()).then_some(pos)
    }

    /// Signal values after replaying every point up to and including
    /// `through`. `None` replays nothing.
    #[must_use]
    pub fn values_through(&self, through: Option<usize>) -> BTreeMap<String, i64> {
        let mut values = BTreeMap::new();
        if let Some(end) = through {
            for point in self.points.iter().take(end + 1) {
                values.extend(point.writes.iter().map(|(k, v)| (k.clone(), *v)));
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_points_stay_time_ordered() {
        let timeline = Timeline::new().at(10, 1).at(0, 0).at(10, 2).at(5, 3);
        let order: Vec<(u64, u64)> = timeline
            .points()
            .iter()
            .map(|p| (p.time, p.breakpoint_id))
            .collect();
        assert_eq!(order, vec![(0, 0), (5, 3), (10, 1), (10, 2)]);
    }

    #[test]
    fn test_write_targets_last_added_point() {
        let timeline = Timeline::new().at(10, 1).at(0, 0).write("a", 3);
        assert_eq!(timeline.get(0).unwrap().writes.get("a"), Some(&3));
        assert!(timeline.get(1).unwrap().writes.is_empty());
    }

    #[test]
    fn test_first_at_or_after() {
        let timeline = Timeline::new().at(0, 0).at(10, 1).at(20, 2);
        assert_eq!(timeline.first_at_or_after(0), Some(0));
        assert_eq!(timeline.first_at_or_after(11), Some(2));
        assert_eq!(timeline.first_at_or_after(21), None);
    }

    #[test]
    fn test_values_replay() {
        let timeline = Timeline::new()
            .at(0, 0)
            .write("a", 1)
            .at(10, 0)
            .write("a", 2)
            .write("b", 7);
        assert!(timeline.values_through(None).is_empty());
        assert_eq!(timeline.values_through(Some(0)).get("a"), Some(&1));
        let all = timeline.values_through(Some(1));
        assert_eq!(all.get("a"), Some(&2));
        assert_eq!(all.get("b"), Some(&7));
    }
}
