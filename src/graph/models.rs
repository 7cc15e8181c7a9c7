//! Spatial graph data models.
//!
//! Defines the complete type system for formations:
//!
//! ## Construction types
//! - [`GraphDraft`] — mutable staging area filled by a formation strategy
//!
//! ## Frozen types
//! - [`Vec3`] — 3D position
//! - [`Connection`] — one side of a symmetric, weighted edge
//! - [`Node`] / [`NodeClass`] — a point in the graph plus its classification
//! - [`NetworkGraph`] — immutable, index-stable node list rooted at index 0
//!
//! A `NetworkGraph` is never patched. A formation change builds a fresh one
//! and the old one stays valid for whoever still holds it.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::GraphError;

/// Index of a node inside its [`NetworkGraph`].
pub type NodeId = usize;

/// Index of the root node in every graph.
pub const ROOT: NodeId = 0;

/// Number of coarse distance bands used for `Node::level`.
pub const LEVEL_BANDS: u32 = 4;

/// Lower bound applied to every connection strength.
pub const MIN_STRENGTH: f64 = 0.01;

// ============================================================================
// Vec3
// ============================================================================

/// A point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn length(&self) -> f64 {
        self.distance(&Vec3::ZERO)
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(&self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    /// Linear interpolation: `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &Vec3, t: f64) -> Vec3 {
        Vec3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// ============================================================================
// Node / Connection
// ============================================================================

/// One side of a symmetric edge. The mirrored side lives on the target node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub target: NodeId,
    /// Edge weight in (0, 1]
    pub strength: f64,
}

/// Coarse role of a node, reported in diagnostics and used for size hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    Root,
    Terminal,
    Interior,
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Terminal => write!(f, "terminal"),
            Self::Interior => write!(f, "interior"),
        }
    }
}

/// A point in the spatial graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable index inside the owning graph
    pub id: NodeId,
    pub position: Vec3,
    /// Distance band from the root, `0..LEVEL_BANDS`
    pub level: u32,
    pub terminal: bool,
    /// Outgoing side of every edge touching this node, in creation order
    pub connections: Vec<Connection>,
}

impl Node {
    pub fn class(&self) -> NodeClass {
        if self.id == ROOT {
            NodeClass::Root
        } else if self.terminal {
            NodeClass::Terminal
        } else {
            NodeClass::Interior
        }
    }

    pub fn degree(&self) -> usize {
        self.connections.len()
    }

    /// Relative draw size: the root is largest, outer bands shrink.
    pub fn size_hint(&self) -> f64 {
        match self.class() {
            NodeClass::Root => 2.0,
            NodeClass::Terminal => 0.6,
            NodeClass::Interior => 1.0 - 0.1 * self.level as f64,
        }
    }

    pub fn strength_to(&self, target: NodeId) -> Option<f64> {
        self.connections
            .iter()
            .find(|c| c.target == target)
            .map(|c| c.strength)
    }
}

// ============================================================================
// NetworkGraph
// ============================================================================

/// Immutable spatial graph produced by one formation build.
///
/// Deserialization re-checks what a build guarantees: ids equal indices and
/// every connection is mirrored on an existing node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord")]
pub struct NetworkGraph {
    nodes: Vec<Node>,
    /// Registry index of the formation that built this graph
    pub formation_id: usize,
    /// Human-readable formation name
    pub formation: String,
    /// Density factor used during the build
    pub density: f64,
}

/// Unchecked wire form of a [`NetworkGraph`].
#[derive(Deserialize)]
struct GraphRecord {
    nodes: Vec<Node>,
    formation_id: usize,
    formation: String,
    density: f64,
}

impl TryFrom<GraphRecord> for NetworkGraph {
    type Error = GraphError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        if let Some((index, node)) = record
            .nodes
            .iter()
            .enumerate()
            .find(|(index, node)| node.id != *index)
        {
            return Err(GraphError::InvalidGraph(format!(
                "node at index {index} has id {}",
                node.id
            )));
        }
        let graph = NetworkGraph {
            nodes: record.nodes,
            formation_id: record.formation_id,
            formation: record.formation,
            density: record.density,
        };
        if !graph.is_symmetric() {
            return Err(GraphError::InvalidGraph(
                "connections are not symmetric".to_string(),
            ));
        }
        Ok(graph)
    }
}

impl NetworkGraph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(ROOT)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(Node::degree).sum::<usize>() / 2
    }

    /// Each undirected edge exactly once, as `(low, high, strength)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.nodes.iter().flat_map(|node| {
            node.connections
                .iter()
                .filter(move |c| node.id < c.target)
                .map(move |c| (node.id, c.target, c.strength))
        })
    }

    /// Linear scan for the node closest to `point`. Ties keep the lower id.
    pub fn nearest(&self, point: &Vec3) -> Option<(NodeId, f64)> {
        let mut best: Option<(NodeId, f64)> = None;
        for node in &self.nodes {
            let d = node.position.distance(point);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((node.id, d)),
            }
        }
        best
    }

    /// True when every A→B(s) has a matching B→A(s), with no self-loops
    /// and no duplicate targets.
    pub fn is_symmetric(&self) -> bool {
        for node in &self.nodes {
            let mut seen = HashSet::with_capacity(node.connections.len());
            for c in &node.connections {
                if c.target == node.id || !seen.insert(c.target) {
                    return false;
                }
                match self.node(c.target).and_then(|t| t.strength_to(node.id)) {
                    Some(s) if s == c.strength => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// Undirected petgraph view, node indices match `NodeId`.
    pub fn to_petgraph(&self) -> UnGraph<NodeId, f64> {
        let mut g = UnGraph::with_capacity(self.nodes.len(), self.edge_count());
        for node in &self.nodes {
            g.add_node(node.id);
        }
        for (a, b, s) in self.edges() {
            g.add_edge(NodeIndex::new(a), NodeIndex::new(b), s);
        }
        g
    }

    /// Number of nodes reachable from the root (root included).
    pub fn reachable_from_root(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let g = self.to_petgraph();
        let mut bfs = Bfs::new(&g, NodeIndex::new(ROOT));
        let mut count = 0;
        while bfs.next(&g).is_some() {
            count += 1;
        }
        count
    }

    pub fn is_connected(&self) -> bool {
        self.reachable_from_root() == self.len()
    }
}

// ============================================================================
// GraphDraft
// ============================================================================

/// A node under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftNode {
    pub position: Vec3,
    pub terminal: bool,
    pub connections: Vec<Connection>,
}

/// Mutable staging area a formation strategy fills before it is frozen.
///
/// `connect` maintains the symmetry invariant: every edge is written on both
/// endpoints, self-loops and duplicates are refused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDraft {
    nodes: Vec<DraftNode>,
}

impl GraphDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
        }
    }

    /// Append a node and return its id. The first node added is the root.
    pub fn add_node(&mut self, position: Vec3) -> NodeId {
        self.nodes.push(DraftNode {
            position,
            terminal: false,
            connections: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn add_terminal(&mut self, position: Vec3) -> NodeId {
        let id = self.add_node(position);
        self.nodes[id].terminal = true;
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, id: NodeId) -> Vec3 {
        self.nodes[id].position
    }

    pub fn nodes(&self) -> &[DraftNode] {
        &self.nodes
    }

    pub fn is_connected_pair(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes
            .get(a)
            .is_some_and(|n| n.connections.iter().any(|c| c.target == b))
    }

    /// Create the symmetric edge `a ↔ b`.
    ///
    /// Returns `false` (and changes nothing) for self-loops, unknown ids or
    /// an already existing edge. Strength is clamped into
    /// `[MIN_STRENGTH, 1.0]`.
    pub fn connect(&mut self, a: NodeId, b: NodeId, strength: f64) -> bool {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        if self.is_connected_pair(a, b) {
            return false;
        }
        let strength = if strength.is_nan() {
            MIN_STRENGTH
        } else {
            strength.clamp(MIN_STRENGTH, 1.0)
        };
        self.nodes[a].connections.push(Connection {
            target: b,
            strength,
        });
        self.nodes[b].connections.push(Connection {
            target: a,
            strength,
        });
        true
    }

    /// Remove every node whose `keep` flag is false together with every
    /// connection referencing it, on both sides, and compact the ids.
    ///
    /// The root is always kept. `keep` shorter than the draft counts missing
    /// entries as kept.
    pub fn retain_nodes(&mut self, keep: &[bool]) {
        let kept = |id: NodeId| id == ROOT || keep.get(id).copied().unwrap_or(true);

        let mut remap: Vec<Option<NodeId>> = Vec::with_capacity(self.nodes.len());
        let mut next = 0;
        for id in 0..self.nodes.len() {
            if kept(id) {
                remap.push(Some(next));
                next += 1;
            } else {
                remap.push(None);
            }
        }

        let old = std::mem::take(&mut self.nodes);
        self.nodes = old
            .into_iter()
            .enumerate()
            .filter(|(id, _)| remap[*id].is_some())
            .map(|(_, mut node)| {
                node.connections = node
                    .connections
                    .iter()
                    .filter_map(|c| {
                        remap[c.target].map(|target| Connection {
                            target,
                            strength: c.strength,
                        })
                    })
                    .collect();
                node
            })
            .collect();
    }

    /// Undirected petgraph view of the draft, node indices match `NodeId`.
    pub fn to_petgraph(&self) -> UnGraph<NodeId, f64> {
        let edges: usize = self.nodes.iter().map(|n| n.connections.len()).sum();
        let mut g = UnGraph::with_capacity(self.nodes.len(), edges / 2);
        for id in 0..self.nodes.len() {
            g.add_node(id);
        }
        for (id, node) in self.nodes.iter().enumerate() {
            for c in node.connections.iter().filter(|c| id < c.target) {
                g.add_edge(NodeIndex::new(id), NodeIndex::new(c.target), c.strength);
            }
        }
        g
    }

    /// Freeze into an immutable graph, assigning distance bands and
    /// marking degree-one non-root nodes as terminal.
    pub fn freeze(self, formation_id: usize, formation: &str, density: f64) -> NetworkGraph {
        let root = self.nodes.first().map(|n| n.position).unwrap_or_default();
        let max_dist = self
            .nodes
            .iter()
            .map(|n| n.position.distance(&root))
            .fold(0.0_f64, f64::max);

        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(id, draft)| {
                let level = if max_dist > 0.0 {
                    let band = draft.position.distance(&root) / max_dist * LEVEL_BANDS as f64;
                    (band as u32).min(LEVEL_BANDS - 1)
                } else {
                    0
                };
                let terminal = id != ROOT && (draft.terminal || draft.connections.len() == 1);
                Node {
                    id,
                    position: draft.position,
                    level,
                    terminal,
                    connections: draft.connections,
                }
            })
            .collect();

        NetworkGraph {
            nodes,
            formation_id,
            formation: formation.to_string(),
            density,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_chain_draft, make_star_draft};

    #[test]
    fn test_connect_is_symmetric() {
        let mut d = GraphDraft::new();
        let a = d.add_node(Vec3::ZERO);
        let b = d.add_node(Vec3::new(1.0, 0.0, 0.0));
        assert!(d.connect(a, b, 0.7));

        let g = d.freeze(0, "pair", 1.0);
        assert_eq!(g.node(a).unwrap().strength_to(b), Some(0.7));
        assert_eq!(g.node(b).unwrap().strength_to(a), Some(0.7));
        assert!(g.is_symmetric());
    }

    #[test]
    fn test_connect_rejects_self_and_duplicate() {
        let mut d = GraphDraft::new();
        let a = d.add_node(Vec3::ZERO);
        let b = d.add_node(Vec3::new(1.0, 0.0, 0.0));
        assert!(!d.connect(a, a, 1.0));
        assert!(d.connect(a, b, 1.0));
        assert!(!d.connect(b, a, 0.5));
        assert!(!d.connect(a, 99, 0.5));
        assert_eq!(d.nodes()[a].connections.len(), 1);
        assert_eq!(d.nodes()[b].connections.len(), 1);
    }

    #[test]
    fn test_connect_clamps_strength() {
        let mut d = GraphDraft::new();
        let a = d.add_node(Vec3::ZERO);
        let b = d.add_node(Vec3::new(1.0, 0.0, 0.0));
        let c = d.add_node(Vec3::new(2.0, 0.0, 0.0));
        d.connect(a, b, 4.0);
        d.connect(b, c, -1.0);
        assert_eq!(d.nodes()[a].connections[0].strength, 1.0);
        assert_eq!(d.nodes()[c].connections[0].strength, MIN_STRENGTH);
    }

    #[test]
    fn test_retain_nodes_removes_both_sides() {
        let mut d = make_star_draft(4);
        // Also link leaves 1 and 2 so node 2 has two references
        d.connect(1, 2, 0.5);

        d.retain_nodes(&[true, true, false, true, true]);

        assert_eq!(d.len(), 4);
        let g = d.freeze(0, "star", 0.5);
        assert!(g.is_symmetric());
        // Root lost one spoke, leaf 1 lost its side link
        assert_eq!(g.root().unwrap().degree(), 3);
        assert_eq!(g.node(1).unwrap().degree(), 1);
        for node in g.nodes() {
            for c in &node.connections {
                assert!(c.target < g.len());
            }
        }
    }

    #[test]
    fn test_retain_nodes_always_keeps_root() {
        let mut d = make_star_draft(3);
        d.retain_nodes(&[false, false, false, false]);
        assert_eq!(d.len(), 1);
        assert!(d.nodes()[0].connections.is_empty());
    }

    #[test]
    fn test_freeze_levels_and_terminals() {
        let g = make_chain_draft(5).freeze(0, "chain", 1.0);
        assert_eq!(g.root().unwrap().level, 0);
        assert_eq!(g.node(4).unwrap().level, LEVEL_BANDS - 1);
        // Chain ends: root is never terminal, the far end is
        assert_eq!(g.root().unwrap().class(), NodeClass::Root);
        assert!(g.node(4).unwrap().terminal);
        assert_eq!(g.node(2).unwrap().class(), NodeClass::Interior);
    }

    #[test]
    fn test_edges_iterates_each_edge_once() {
        let g = make_star_draft(5).freeze(0, "star", 1.0);
        assert_eq!(g.edges().count(), 5);
        assert_eq!(g.edge_count(), 5);
        assert!(g.edges().all(|(a, b, _)| a < b));
    }

    #[test]
    fn test_nearest_prefers_lowest_id_on_tie() {
        let mut d = GraphDraft::new();
        d.add_node(Vec3::new(-1.0, 0.0, 0.0));
        d.add_node(Vec3::new(1.0, 0.0, 0.0));
        let g = d.freeze(0, "tie", 1.0);
        let (id, dist) = g.nearest(&Vec3::ZERO).unwrap();
        assert_eq!(id, 0);
        assert!((dist - 1.0).abs() < 1e-12);
        assert!(NetworkGraph::default().nearest(&Vec3::ZERO).is_none());
    }

    #[test]
    fn test_graph_json_reloads() {
        let g = make_star_draft(3).freeze(0, "star", 1.0);
        let json = serde_json::to_string(&g).unwrap();
        let back: NetworkGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_graphs() {
        let g = make_star_draft(2).freeze(0, "star", 1.0);
        let json = serde_json::to_value(&g).unwrap();

        // Node id out of step with its index
        let mut bad = json.clone();
        bad["nodes"][1]["id"] = serde_json::json!(5);
        assert!(serde_json::from_value::<NetworkGraph>(bad).is_err());

        // Connection pointing past the end
        let mut bad = json.clone();
        bad["nodes"][0]["connections"][0]["target"] = serde_json::json!(9);
        assert!(serde_json::from_value::<NetworkGraph>(bad).is_err());

        // One-sided edge
        let mut bad = json;
        bad["nodes"][2]["connections"] = serde_json::json!([]);
        let err = serde_json::from_value::<NetworkGraph>(bad).unwrap_err();
        assert!(err.to_string().contains("not symmetric"));
    }

    #[test]
    fn test_reachability() {
        let mut d = make_chain_draft(3);
        d.add_node(Vec3::new(10.0, 10.0, 10.0));
        let g = d.clone().freeze(0, "chain", 1.0);
        assert_eq!(g.reachable_from_root(), 3);
        assert!(!g.is_connected());

        let pg = d.to_petgraph();
        assert_eq!(pg.node_count(), 4);
        assert_eq!(pg.edge_count(), 2);
        assert_eq!(petgraph::algo::connected_components(&pg), 2);
    }
}
