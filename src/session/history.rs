//! Bounded history of completed traces.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::propagation::ActivationTrace;

/// Keeps the most recent traces, oldest first. Traces computed against a
/// graph that has since been replaced stay valid records.
#[derive(Debug, Clone)]
pub struct TraceHistory {
    traces: VecDeque<Arc<ActivationTrace>>,
    capacity: usize,
}

impl TraceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            traces: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a trace, evicting the oldest once full. A zero capacity keeps
    /// nothing.
    pub fn push(&mut self, trace: Arc<ActivationTrace>) {
        if self.capacity == 0 {
            return;
        }
        while self.traces.len() >= self.capacity {
            self.traces.pop_front();
        }
        self.traces.push_back(trace);
    }

    pub fn latest(&self) -> Option<&Arc<ActivationTrace>> {
        self.traces.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActivationTrace>> {
        self.traces.iter()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::graph::Vec3;
    use crate::propagation::{ManualClock, PropagationConfig, PropagationEngine, PulseRequest};
    use crate::test_helpers::make_chain_graph;

    fn traces(n: usize) -> Vec<Arc<ActivationTrace>> {
        let engine =
            PropagationEngine::new(PropagationConfig::default(), Arc::new(ManualClock::new()))
                .unwrap();
        let graph = make_chain_graph(n);
        (0..n)
            .map(|i| {
                let req = PulseRequest::new(Vec3::new(i as f64, 0.0, 0.0), Rgb::PURPLE, 1.0);
                Arc::new(engine.propagate(&graph, &req).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = TraceHistory::new(2);
        for t in traces(3) {
            history.push(t);
        }
        assert_eq!(history.len(), 2);
        let anchors: Vec<_> = history.iter().map(|t| t.anchor).collect();
        assert_eq!(anchors, vec![1, 2]);
        assert_eq!(history.latest().unwrap().anchor, 2);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = TraceHistory::new(0);
        for t in traces(2) {
            history.push(t);
        }
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }
}
