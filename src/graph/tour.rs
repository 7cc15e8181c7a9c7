//! Routed tour formation.
//!
//! Finds the shortest cyclic visiting orders over a handful of "city" points
//! by exhaustive search, then lays the best tour and a few runner-ups out as
//! explicit paths fanning from a shared root.
//!
//! ## Search
//!
//! 1. Full pairwise distance matrix
//! 2. Every permutation of cities `1..n` (city 0 fixed, so rotations are not
//!    revisited), enumerated with Heap's algorithm: one swap per step
//! 3. Cyclic cost of each permutation, closing edge included
//! 4. The `keep` cheapest tours retained in a sorted list
//!
//! Retention bounds the output, not the search: every permutation is costed.
//! The cost is `(n-1)!`, so callers keep `n` at or below [`MAX_TOUR_CITIES`].

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use super::formations::FormationStrategy;
use super::models::{GraphDraft, NodeId, Vec3};
use crate::error::GraphError;

/// Largest city count accepted for interactive builds (9! permutations).
pub const MAX_TOUR_CITIES: usize = 10;

/// One cyclic visiting order. `order[0]` is always city 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub order: Vec<usize>,
    pub cost: f64,
}

/// Result of an exhaustive tour search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSearch {
    /// Cheapest first, at most `keep` entries
    pub tours: Vec<Tour>,
    /// Number of permutations costed
    pub examined: usize,
}

impl TourSearch {
    pub fn best(&self) -> Option<&Tour> {
        self.tours.first()
    }
}

/// Pairwise Euclidean distances.
pub fn distance_matrix(points: &[Vec3]) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|a| points.iter().map(|b| a.distance(b)).collect())
        .collect()
}

/// Cost of visiting `order` and returning to its first city.
pub fn cyclic_cost(order: &[usize], dist: &[Vec<f64>]) -> f64 {
    if order.len() < 2 {
        return 0.0;
    }
    let path: f64 = order.windows(2).map(|w| dist[w[0]][w[1]]).sum();
    path + dist[order[order.len() - 1]][order[0]]
}

/// Visit every permutation of `items` in place, one swap apart (Heap's algorithm).
fn for_each_permutation(items: &mut [usize], mut visit: impl FnMut(&[usize])) {
    let n = items.len();
    let mut counters = vec![0usize; n];
    visit(items);
    let mut i = 1;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                items.swap(0, i);
            } else {
                items.swap(counters[i], i);
            }
            visit(items);
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}

/// Same cycle walked the other way round.
fn is_mirror(a: &[usize], b: &[usize]) -> bool {
    a.len() == b.len()
        && a.first() == b.first()
        && a.iter().skip(1).eq(b.iter().skip(1).rev())
}

/// Insert a candidate into the sorted retained list.
///
/// A full list only accepts strictly cheaper tours, which replace the
/// current worst. A tour whose mirror image is already retained is skipped.
fn offer(kept: &mut Vec<Tour>, keep: usize, order: &[usize], cost: f64) {
    if keep == 0 {
        return;
    }
    if kept.len() == keep && kept.last().is_some_and(|worst| cost >= worst.cost) {
        return;
    }
    if kept.iter().any(|t| is_mirror(&t.order, order)) {
        return;
    }
    let at = kept.partition_point(|t| t.cost <= cost);
    kept.insert(
        at,
        Tour {
            order: order.to_vec(),
            cost,
        },
    );
    kept.truncate(keep);
}

/// Exhaustive search for the `keep` shortest cyclic tours over `points`.
///
/// Fewer than three points have only one possible cycle, reported as a
/// single trivial tour.
pub fn solve_tours(points: &[Vec3], keep: usize) -> TourSearch {
    let n = points.len();
    let dist = distance_matrix(points);

    if n < 3 {
        let order: Vec<usize> = (0..n).collect();
        let tours = if n == 0 || keep == 0 {
            Vec::new()
        } else {
            vec![Tour {
                cost: cyclic_cost(&order, &dist),
                order,
            }]
        };
        return TourSearch {
            tours,
            examined: usize::from(n > 0),
        };
    }

    let mut kept: Vec<Tour> = Vec::with_capacity(keep);
    let mut examined = 0usize;
    let mut order: Vec<usize> = (0..n).collect();
    let mut rest: Vec<usize> = (1..n).collect();

    for_each_permutation(&mut rest, |perm| {
        order[1..].copy_from_slice(perm);
        let cost = cyclic_cost(&order, &dist);
        examined += 1;
        offer(&mut kept, keep, &order, cost);
    });

    debug!(
        cities = n,
        examined,
        best = kept.first().map(|t| t.cost).unwrap_or(0.0),
        "Tour search complete"
    );

    TourSearch {
        tours: kept,
        examined,
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// Formation drawing the best tour and its runner-ups as graph paths.
#[derive(Debug, Clone)]
pub struct RoutedTourStrategy {
    cities: usize,
    alternatives: usize,
    /// Via nodes between consecutive cities on the best tour
    pub via_nodes: usize,
    pub radius: f64,
}

impl RoutedTourStrategy {
    /// `alternatives` runner-up tours are drawn next to the best one.
    pub fn new(cities: usize, alternatives: usize) -> Result<Self, GraphError> {
        if cities > MAX_TOUR_CITIES {
            return Err(GraphError::TooManyCities {
                requested: cities,
                max: MAX_TOUR_CITIES,
            });
        }
        Ok(Self {
            cities,
            alternatives,
            via_nodes: 3,
            radius: 7.0,
        })
    }

    pub fn cities(&self) -> usize {
        self.cities
    }

    /// Runner-ups move up and out to alternating sides so overlapping
    /// tours stay distinguishable.
    fn offset(rank: usize) -> Vec3 {
        if rank == 0 {
            return Vec3::ZERO;
        }
        let side = if rank % 2 == 1 { 1.0 } else { -1.0 };
        let step = rank.div_ceil(2) as f64;
        Vec3::new(side * step * 0.3, rank as f64 * 0.45, side * step * 0.3)
    }

    fn strength(rank: usize) -> f64 {
        (1.0 - 0.2 * rank as f64).max(0.3)
    }

    fn city_points(&self, rng: &mut StdRng) -> Vec<Vec3> {
        let n = self.cities.max(1) as f64;
        (0..self.cities)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / n + rng.gen_range(-0.3..0.3);
                let r = self.radius * rng.gen_range(0.55..1.0);
                Vec3::new(angle.cos() * r, rng.gen_range(-1.0..1.0), angle.sin() * r)
            })
            .collect()
    }

    /// Lay one tour out as a closed path of city and via nodes, hung off the root.
    fn draw_tour(
        &self,
        draft: &mut GraphDraft,
        root: NodeId,
        cities: &[Vec3],
        tour: &Tour,
        rank: usize,
    ) {
        let offset = Self::offset(rank);
        let strength = Self::strength(rank);
        let vias = self.via_nodes.saturating_sub(rank);

        let stops: Vec<NodeId> = tour
            .order
            .iter()
            .map(|&c| draft.add_terminal(cities[c].add(&offset)))
            .collect();

        if let Some(&first) = stops.first() {
            draft.connect(root, first, strength);
        }
        if stops.len() < 2 {
            return;
        }

        // Two stops: the closing leg would retrace the outgoing one
        let legs = if stops.len() == 2 { 1 } else { stops.len() };
        for k in 0..legs {
            let a = stops[k];
            let b = stops[(k + 1) % stops.len()];
            let (pa, pb) = (draft.position(a), draft.position(b));
            let mut prev = a;
            for v in 1..=vias {
                let t = v as f64 / (vias + 1) as f64;
                // Slight arch so vias of stacked tours do not coincide
                let arch = Vec3::new(0.0, (t * PI).sin() * 0.25 * (rank + 1) as f64, 0.0);
                let via = draft.add_node(pa.lerp(&pb, t).add(&arch));
                draft.connect(prev, via, strength);
                prev = via;
            }
            draft.connect(prev, b, strength);
        }
    }
}

impl Default for RoutedTourStrategy {
    fn default() -> Self {
        Self {
            cities: 7,
            alternatives: 3,
            via_nodes: 3,
            radius: 7.0,
        }
    }
}

impl FormationStrategy for RoutedTourStrategy {
    fn name(&self) -> &'static str {
        "routed_tour"
    }

    fn generate(&self, rng: &mut StdRng) -> GraphDraft {
        let cities = self.city_points(rng);
        let search = solve_tours(&cities, self.alternatives + 1);

        let mut draft = GraphDraft::new();
        let root = draft.add_node(Vec3::ZERO);
        for (rank, tour) in search.tours.iter().enumerate() {
            self.draw_tour(&mut draft, root, &cities, tour, rank);
        }

        debug!(
            cities = cities.len(),
            tours = search.tours.len(),
            nodes = draft.len(),
            "Routed tour laid out"
        );
        draft
    }
}
