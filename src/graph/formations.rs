//! Formation strategies.
//!
//! Each strategy fills a [`GraphDraft`] from an explicit random generator.
//! Density filtering, reachability repair and freezing happen afterwards in
//! the registry, so a strategy only decides geometry and connections.
//!
//! Index 0 of every draft is the root.

use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::PI;

use super::models::{GraphDraft, NodeId, Vec3, ROOT};

/// A named procedure that lays out one complete formation.
pub trait FormationStrategy: Send + Sync {
    /// Stable, human-readable name.
    fn name(&self) -> &'static str;

    /// Lay out nodes and connections. The first node added is the root.
    ///
    /// All randomness must come from `rng` so seeded builds repeat exactly.
    fn generate(&self, rng: &mut StdRng) -> GraphDraft;
}

/// Evenly spread unit direction `i` of `n` on a sphere (Fibonacci lattice).
pub(crate) fn fibonacci_direction(i: usize, n: usize) -> Vec3 {
    if n <= 1 {
        return Vec3::new(0.0, 1.0, 0.0);
    }
    let golden = PI * (3.0 - 5.0_f64.sqrt());
    let y = 1.0 - (i as f64 / (n - 1) as f64) * 2.0;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let theta = golden * i as f64;
    Vec3::new(theta.cos() * r, y, theta.sin() * r)
}

fn jitter(rng: &mut StdRng, amount: f64) -> Vec3 {
    Vec3::new(
        rng.gen_range(-amount..=amount),
        rng.gen_range(-amount..=amount),
        rng.gen_range(-amount..=amount),
    )
}

/// Strength that falls off linearly with distance up to `reach`.
fn proximity_strength(distance: f64, reach: f64) -> f64 {
    (1.0 - distance / reach).max(0.0)
}

/// Connect `id` to its `k` nearest candidates closer than `reach`.
fn link_nearest(
    draft: &mut GraphDraft,
    id: NodeId,
    candidates: impl Iterator<Item = NodeId>,
    k: usize,
    reach: f64,
) {
    let origin = draft.position(id);
    let mut near: Vec<(NodeId, f64)> = candidates
        .filter(|&other| other != id)
        .map(|other| (other, draft.position(other).distance(&origin)))
        .filter(|(_, d)| *d < reach)
        .collect();
    near.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    for (other, d) in near.into_iter().take(k) {
        draft.connect(id, other, proximity_strength(d, reach));
    }
}

// ============================================================================
// Radial tree
// ============================================================================

/// Branching tree growing outward from the root; leaves are terminals.
#[derive(Debug, Clone)]
pub struct RadialTreeStrategy {
    pub branches: usize,
    pub depth: usize,
    pub fanout: usize,
    pub step: f64,
}

impl Default for RadialTreeStrategy {
    fn default() -> Self {
        Self {
            branches: 6,
            depth: 4,
            fanout: 2,
            step: 1.8,
        }
    }
}

impl FormationStrategy for RadialTreeStrategy {
    fn name(&self) -> &'static str {
        "radial_tree"
    }

    fn generate(&self, rng: &mut StdRng) -> GraphDraft {
        let mut draft = GraphDraft::new();
        let root = draft.add_node(Vec3::ZERO);

        // (node id, outward direction) of the current generation
        let mut generation: Vec<(NodeId, Vec3)> = Vec::new();
        for b in 0..self.branches {
            let dir = fibonacci_direction(b, self.branches);
            let pos = dir.scale(self.step * rng.gen_range(0.9..1.1));
            let id = draft.add_node(pos);
            draft.connect(root, id, rng.gen_range(0.85..=1.0));
            generation.push((id, dir));
        }

        for depth in 1..self.depth {
            let last = depth + 1 == self.depth;
            let mut next = Vec::with_capacity(generation.len() * self.fanout);
            for &(parent, dir) in &generation {
                let parent_pos = draft.position(parent);
                for _ in 0..self.fanout {
                    let spread = jitter(rng, 0.45);
                    let child_dir = dir.add(&spread);
                    let len = child_dir.length().max(1e-9);
                    let child_dir = child_dir.scale(1.0 / len);
                    let reach = self.step * rng.gen_range(0.7..1.2);
                    let pos = parent_pos.add(&child_dir.scale(reach));
                    let child = if last {
                        draft.add_terminal(pos)
                    } else {
                        draft.add_node(pos)
                    };
                    let strength = 1.0 - 0.15 * depth as f64 + rng.gen_range(-0.05..0.05);
                    draft.connect(parent, child, strength);
                    next.push((child, child_dir));
                }
            }
            generation = next;
        }

        draft
    }
}

// ============================================================================
// Spiral
// ============================================================================

/// Double-turn spiral with a sinusoidal height profile; nearby points link up.
#[derive(Debug, Clone)]
pub struct SpiralStrategy {
    pub count: usize,
    pub max_radius: f64,
    pub height: f64,
    pub link_distance: f64,
    pub max_links: usize,
}

impl Default for SpiralStrategy {
    fn default() -> Self {
        Self {
            count: 500,
            max_radius: 8.0,
            height: 3.0,
            link_distance: 2.5,
            max_links: 6,
        }
    }
}

impl FormationStrategy for SpiralStrategy {
    fn name(&self) -> &'static str {
        "spiral"
    }

    fn generate(&self, rng: &mut StdRng) -> GraphDraft {
        let mut draft = GraphDraft::with_capacity(self.count);
        let n = self.count.max(1) as f64;

        for i in 0..self.count {
            let t = i as f64 / n;
            let angle = t * PI * 4.0;
            let radius = t * self.max_radius;
            let base = Vec3::new(
                angle.cos() * radius,
                (angle * 2.0).sin() * self.height * t,
                angle.sin() * radius,
            );
            let pos = if i == ROOT {
                base
            } else {
                base.add(&jitter(rng, 0.08))
            };
            draft.add_node(pos);
        }

        // The arm itself keeps the spiral connected
        for i in 1..draft.len() {
            let d = draft.position(i).distance(&draft.position(i - 1));
            draft.connect(i - 1, i, proximity_strength(d, self.link_distance).max(0.5));
        }

        for i in 0..draft.len() {
            link_nearest(&mut draft, i, 0..self.count, self.max_links, self.link_distance);
        }

        draft
    }
}

// ============================================================================
// Lattice
// ============================================================================

/// Jittered cubic grid centred on the root, with sparse diagonal shortcuts.
#[derive(Debug, Clone)]
pub struct LatticeStrategy {
    /// Cells per axis; forced odd so the root sits on the centre cell
    pub size: usize,
    pub spacing: f64,
    pub shortcut_probability: f64,
}

impl Default for LatticeStrategy {
    fn default() -> Self {
        Self {
            size: 5,
            spacing: 1.5,
            shortcut_probability: 0.1,
        }
    }
}

impl FormationStrategy for LatticeStrategy {
    fn name(&self) -> &'static str {
        "lattice"
    }

    fn generate(&self, rng: &mut StdRng) -> GraphDraft {
        let size = self.size.max(1) | 1;
        let half = (size / 2) as i64;
        let cell = |x: usize, y: usize, z: usize| (x * size + y) * size + z;
        let centre = cell(size / 2, size / 2, size / 2);

        let mut draft = GraphDraft::with_capacity(size * size * size);
        let mut ids: Vec<NodeId> = vec![ROOT; size * size * size];
        let mut order: Vec<usize> = Vec::with_capacity(size * size * size);
        order.push(centre);
        order.extend((0..size * size * size).filter(|&c| c != centre));

        for &c in &order {
            let (x, y, z) = (c / (size * size), (c / size) % size, c % size);
            let grid = Vec3::new(
                (x as i64 - half) as f64,
                (y as i64 - half) as f64,
                (z as i64 - half) as f64,
            )
            .scale(self.spacing);
            let pos = if c == centre {
                grid
            } else {
                grid.add(&jitter(rng, self.spacing * 0.15))
            };
            ids[c] = draft.add_node(pos);
        }

        for &c in &order {
            let (x, y, z) = (c / (size * size), (c / size) % size, c % size);
            let axis_neighbours = [
                (x + 1 < size).then(|| cell(x + 1, y, z)),
                (y + 1 < size).then(|| cell(x, y + 1, z)),
                (z + 1 < size).then(|| cell(x, y, z + 1)),
            ];
            for other in axis_neighbours.into_iter().flatten() {
                draft.connect(ids[c], ids[other], rng.gen_range(0.75..=0.95));
            }
            if x + 1 < size
                && y + 1 < size
                && z + 1 < size
                && rng.gen_bool(self.shortcut_probability.clamp(0.0, 1.0))
            {
                draft.connect(ids[c], ids[cell(x + 1, y + 1, z + 1)], 0.4);
            }
        }

        draft
    }
}

// ============================================================================
// Shell
// ============================================================================

/// Fibonacci sphere around a central hub, with periodic spokes to the hub.
#[derive(Debug, Clone)]
pub struct ShellStrategy {
    pub count: usize,
    pub radius: f64,
    pub spoke_every: usize,
    pub ring_links: usize,
}

impl Default for ShellStrategy {
    fn default() -> Self {
        Self {
            count: 160,
            radius: 6.0,
            spoke_every: 8,
            ring_links: 4,
        }
    }
}

impl FormationStrategy for ShellStrategy {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn generate(&self, rng: &mut StdRng) -> GraphDraft {
        let mut draft = GraphDraft::with_capacity(self.count + 1);
        let hub = draft.add_node(Vec3::ZERO);

        for i in 0..self.count {
            let r = self.radius * rng.gen_range(0.95..1.05);
            draft.add_node(fibonacci_direction(i, self.count).scale(r));
        }

        let every = self.spoke_every.max(1);
        for i in (1..draft.len()).step_by(every) {
            draft.connect(hub, i, 0.8);
        }

        // Neighbour spacing on the sphere is roughly r·sqrt(4π/n)
        let spacing = self.radius * (4.0 * PI / self.count.max(1) as f64).sqrt();
        let reach = spacing * 2.5;
        for i in 1..draft.len() {
            link_nearest(&mut draft, i, 1..self.count + 1, self.ring_links, reach);
        }

        draft
    }
}
