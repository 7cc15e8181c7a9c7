//! Test helper factories
//!
//! Small hand-built drafts and graphs with known shapes, so tests can
//! assert exact step counts and energies without going through a strategy.
#![allow(dead_code)]

use crate::graph::{GraphDraft, NetworkGraph, Vec3};

// ============================================================================
// Drafts
// ============================================================================

/// Root at the origin with `leaves` nodes on a unit circle, each joined to
/// the root at full strength.
pub fn make_star_draft(leaves: usize) -> GraphDraft {
    let mut draft = GraphDraft::with_capacity(leaves + 1);
    let root = draft.add_node(Vec3::ZERO);
    for i in 0..leaves {
        let angle = i as f64 / leaves.max(1) as f64 * std::f64::consts::TAU;
        let leaf = draft.add_node(Vec3::new(angle.cos(), angle.sin(), 0.0));
        draft.connect(root, leaf, 1.0);
    }
    draft
}

/// `len` nodes on the x axis, one unit apart, consecutive pairs joined at
/// full strength.
pub fn make_chain_draft(len: usize) -> GraphDraft {
    let mut draft = GraphDraft::with_capacity(len);
    for i in 0..len {
        let id = draft.add_node(Vec3::new(i as f64, 0.0, 0.0));
        if id > 0 {
            draft.connect(id - 1, id, 1.0);
        }
    }
    draft
}

// ============================================================================
// Frozen graphs
// ============================================================================

pub fn make_star_graph(leaves: usize) -> NetworkGraph {
    make_star_draft(leaves).freeze(0, "star", 1.0)
}

pub fn make_chain_graph(len: usize) -> NetworkGraph {
    make_chain_draft(len).freeze(0, "chain", 1.0)
}
