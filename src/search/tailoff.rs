//! Tailing-off detection over the LP objective history.

use std::collections::VecDeque;

use crate::settings::ObjSense;

/// Stagnation tracker for the cutting-plane loop.
///
/// Keeps a bounded window of LP objective values and declares tailing
/// off when the sense-directed improvement across the window falls
/// below a relative threshold. Callers reset it after genuine progress
/// and may flag one upcoming value (e.g. from an approximate solve) to
/// be excluded from the judgment.
#[derive(Debug, Clone)]
pub struct TailOff {
    history: VecDeque<f64>,
    window: usize,
    min_rel_improvement: f64,
    skip_next: bool,
}

impl TailOff {
    /// Create a detector with the given window length and minimum
    /// relative improvement.
    pub fn new(window: usize, min_rel_improvement: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(window + 1),
            window,
            min_rel_improvement,
            skip_next: false,
        }
    }

    /// Record an LP value.
    pub fn update(&mut self, value: f64) {
        if self.skip_next {
            self.skip_next = false;
            return;
        }
        self.history.push_back(value);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    /// Exclude the next recorded value from the judgment.
    pub fn ignore_next_update(&mut self) {
        self.skip_next = true;
    }

    /// Clear the history (after genuine progress).
    pub fn reset(&mut self) {
        self.history.clear();
        self.skip_next = false;
    }

    /// Check whether the objective has stagnated.
    ///
    /// Only a full window is judged; a node that has not yet done
    /// `window` solves is never considered tailing off.
    pub fn tailing_off(&self, sense: ObjSense) -> bool {
        if self.window == 0 || self.history.len() < self.window {
            return false;
        }
        let first = *self.history.front().unwrap();
        let last = *self.history.back().unwrap();

        // The LP relaxation bound tightens towards the true optimum:
        // upward for minimization, downward for maximization.
        let improvement = match sense {
            ObjSense::Min => last - first,
            ObjSense::Max => first - last,
        };
        let rel = improvement / first.abs().max(1e-10);
        rel < self.min_rel_improvement
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_tailing_before_window_fills() {
        let mut t = TailOff::new(3, 1e-4);
        t.update(1.0);
        t.update(1.0);
        assert!(!t.tailing_off(ObjSense::Min));
    }

    #[test]
    fn test_stagnation_detected() {
        let mut t = TailOff::new(3, 1e-4);
        t.update(100.0);
        t.update(100.000001);
        t.update(100.000002);
        assert!(t.tailing_off(ObjSense::Min));
    }

    #[test]
    fn test_progress_is_not_stagnation() {
        let mut t = TailOff::new(3, 1e-4);
        t.update(100.0);
        t.update(105.0);
        t.update(110.0);
        assert!(!t.tailing_off(ObjSense::Min));

        // For maximization the bound must fall to count as progress.
        let mut t = TailOff::new(3, 1e-4);
        t.update(110.0);
        t.update(105.0);
        t.update(100.0);
        assert!(!t.tailing_off(ObjSense::Max));
    }

    #[test]
    fn test_ignore_next_update() {
        let mut t = TailOff::new(2, 1e-4);
        t.update(100.0);
        t.ignore_next_update();
        t.update(42.0); // dropped
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut t = TailOff::new(2, 1e-4);
        t.update(100.0);
        t.update(100.0);
        assert!(t.tailing_off(ObjSense::Min));
        t.reset();
        assert!(!t.tailing_off(ObjSense::Min));
    }
}
