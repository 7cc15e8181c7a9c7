//! Formation registry.
//!
//! Owns the fixed, ordered set of strategies and turns
//! `(formation id, density)` into a finished [`NetworkGraph`]:
//!
//! 1. **Resolve**: the id wraps modulo the number of strategies
//! 2. **Generate**: the strategy fills a draft from the caller's generator
//! 3. **Thin**: each non-root node survives with probability `density`;
//!    removed nodes take every connection touching them along
//! 4. **Repair**: nodes cut off from the root are bridged to their nearest
//!    reachable node
//! 5. **Freeze**: levels and terminal flags are assigned

use petgraph::graph::NodeIndex;
use petgraph::visit::{Bfs, VisitMap};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::formations::{
    FormationStrategy, LatticeStrategy, RadialTreeStrategy, ShellStrategy, SpiralStrategy,
};
use super::models::{GraphDraft, NetworkGraph, NodeId, ROOT};
use super::tour::RoutedTourStrategy;
use crate::error::GraphError;

/// Strength of the bridges added by reachability repair.
const BRIDGE_STRENGTH: f64 = 0.3;

/// Formation selection and build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Formation built at startup (wraps modulo the registry size)
    pub default_formation: usize,
    /// Fraction of nodes kept, in (0, 1]
    pub density: f64,
    /// Generator seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// City count of the routed tour (factorial search, at most 10)
    pub tour_cities: usize,
    /// Runner-up tours drawn next to the best one
    pub tour_alternatives: usize,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            default_formation: 0,
            density: 1.0,
            seed: None,
            tour_cities: 7,
            tour_alternatives: 3,
        }
    }
}

/// The fixed set of named formation strategies.
pub struct FormationRegistry {
    strategies: Vec<Box<dyn FormationStrategy>>,
}

impl FormationRegistry {
    pub fn new(strategies: Vec<Box<dyn FormationStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard registry, in id order:
    /// `radial_tree`, `spiral`, `lattice`, `shell`, `routed_tour`.
    pub fn from_config(config: &FormationConfig) -> Result<Self, GraphError> {
        let tour = RoutedTourStrategy::new(config.tour_cities, config.tour_alternatives)?;
        Ok(Self::new(vec![
            Box::new(RadialTreeStrategy::default()),
            Box::new(SpiralStrategy::default()),
            Box::new(LatticeStrategy::default()),
            Box::new(ShellStrategy::default()),
            Box::new(tour),
        ]))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Wrap an arbitrary id onto the registry.
    pub fn resolve(&self, id: usize) -> Option<usize> {
        (!self.strategies.is_empty()).then(|| id % self.strategies.len())
    }

    pub fn name(&self, id: usize) -> Option<&'static str> {
        self.resolve(id).map(|i| self.strategies[i].name())
    }

    /// Build formation `id` at `density`, drawing all randomness from `rng`.
    pub fn build(
        &self,
        id: usize,
        density: f64,
        rng: &mut StdRng,
    ) -> Result<NetworkGraph, GraphError> {
        if !(density > 0.0 && density <= 1.0) {
            return Err(GraphError::InvalidDensity(density));
        }
        let index = self.resolve(id).ok_or_else(|| GraphError::GenerationFailure {
            formation: format!("#{id}"),
        })?;
        let strategy = &self.strategies[index];

        let mut draft = strategy.generate(rng);
        if draft.is_empty() {
            return Err(GraphError::GenerationFailure {
                formation: strategy.name().to_string(),
            });
        }
        let generated = draft.len();

        if density < 1.0 {
            let keep: Vec<bool> = (0..draft.len())
                .map(|i| i == ROOT || rng.gen::<f64>() < density)
                .collect();
            draft.retain_nodes(&keep);
        }

        let bridges = repair_reachability(&mut draft);

        debug!(
            formation = strategy.name(),
            generated,
            kept = draft.len(),
            bridges,
            "Formation draft thinned"
        );

        let graph = draft.freeze(index, strategy.name(), density);
        info!(
            formation = %graph.formation,
            nodes = graph.len(),
            edges = graph.edge_count(),
            density,
            "Formation built"
        );
        Ok(graph)
    }
}

impl std::fmt::Debug for FormationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormationRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

/// Bridge every component not reachable from the root to the nearest
/// reachable node, in id order. Returns the number of bridges added.
///
/// One BFS runs over the whole repair: each bridged node seeds the search
/// again, so its component joins the discovered set without revisiting
/// what is already reached.
fn repair_reachability(draft: &mut GraphDraft) -> usize {
    if draft.is_empty() {
        return 0;
    }
    let g = draft.to_petgraph();
    let mut bfs = Bfs::new(&g, NodeIndex::new(ROOT));
    while bfs.next(&g).is_some() {}

    let mut bridges = 0;
    for id in 0..draft.len() {
        if bfs.discovered.contains(id) {
            continue;
        }
        let pos = draft.position(id);
        let nearest: Option<NodeId> = (0..draft.len())
            .filter(|&other| bfs.discovered.contains(other))
            .min_by(|&a, &b| {
                let da = draft.position(a).distance(&pos);
                let db = draft.position(b).distance(&pos);
                da.total_cmp(&db).then(a.cmp(&b))
            });
        if let Some(anchor) = nearest {
            draft.connect(id, anchor, BRIDGE_STRENGTH);
            let seed: NodeIndex = NodeIndex::new(id);
            bfs.discovered.visit(seed);
            bfs.stack.push_back(seed);
            while bfs.next(&g).is_some() {}
            bridges += 1;
        }
    }
    bridges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::Vec3;
    use rand::SeedableRng;

    struct EmptyStrategy;

    impl FormationStrategy for EmptyStrategy {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn generate(&self, _rng: &mut StdRng) -> GraphDraft {
            GraphDraft::new()
        }
    }

    /// Root plus two islands that only connect to each other.
    struct IslandStrategy;

    impl FormationStrategy for IslandStrategy {
        fn name(&self) -> &'static str {
            "islands"
        }

        fn generate(&self, _rng: &mut StdRng) -> GraphDraft {
            let mut d = GraphDraft::new();
            d.add_node(Vec3::ZERO);
            let a = d.add_node(Vec3::new(5.0, 0.0, 0.0));
            let b = d.add_node(Vec3::new(6.0, 0.0, 0.0));
            d.connect(a, b, 0.9);
            d
        }
    }

    fn registry() -> FormationRegistry {
        FormationRegistry::from_config(&FormationConfig::default()).unwrap()
    }

    #[test]
    fn test_default_registry_order() {
        assert_eq!(
            registry().names(),
            vec!["radial_tree", "spiral", "lattice", "shell", "routed_tour"]
        );
    }

    #[test]
    fn test_formation_id_wraps() {
        let r = registry();
        assert_eq!(r.resolve(7), Some(2));
        assert_eq!(r.name(5), Some("radial_tree"));

        let g = r.build(6, 1.0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(g.formation_id, 1);
        assert_eq!(g.formation, "spiral");
    }

    #[test]
    fn test_invalid_density_rejected() {
        let r = registry();
        let mut rng = StdRng::seed_from_u64(1);
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                r.build(0, bad, &mut rng),
                Err(GraphError::InvalidDensity(_))
            ));
        }
    }

    #[test]
    fn test_empty_strategy_is_generation_failure() {
        let r = FormationRegistry::new(vec![Box::new(EmptyStrategy)]);
        let err = r.build(0, 1.0, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(
            err,
            GraphError::GenerationFailure {
                formation: "empty".into()
            }
        );

        let none = FormationRegistry::new(vec![]);
        assert!(none.build(0, 1.0, &mut StdRng::seed_from_u64(1)).is_err());
    }

    #[test]
    fn test_repair_bridges_islands() {
        let r = FormationRegistry::new(vec![Box::new(IslandStrategy)]);
        let g = r.build(0, 1.0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(g.is_connected());
        assert!(g.is_symmetric());
        // Node 1 is the island node nearest to nothing but the root
        assert_eq!(g.root().unwrap().strength_to(1), Some(BRIDGE_STRENGTH));
        // Node 2 joins through the bridge to 1 and needs none of its own
        assert_eq!(g.root().unwrap().strength_to(2), None);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_density_one_keeps_everything() {
        let r = registry();
        let g = r.build(0, 1.0, &mut StdRng::seed_from_u64(9)).unwrap();
        let draft = RadialTreeStrategy::default().generate(&mut StdRng::seed_from_u64(9));
        assert_eq!(g.len(), draft.len());
        assert_eq!(g.density, 1.0);
    }

    #[test]
    fn test_thinned_graphs_stay_valid() {
        let r = registry();
        for seed in 0..4 {
            for id in 0..r.len() {
                let mut rng = StdRng::seed_from_u64(seed);
                let full = r.build(id, 1.0, &mut rng).unwrap();
                let mut rng = StdRng::seed_from_u64(seed);
                let thin = r.build(id, 0.4, &mut rng).unwrap();

                assert!(thin.len() <= full.len(), "{}", thin.formation);
                assert!(!thin.is_empty());
                assert_eq!(thin.root().unwrap().position, Vec3::ZERO);
                assert!(thin.is_symmetric(), "{} asymmetric", thin.formation);
                assert!(thin.is_connected(), "{} disconnected", thin.formation);
            }
        }
    }

    #[test]
    fn test_seeded_builds_identical() {
        let r = registry();
        for id in 0..r.len() {
            let a = r.build(id, 0.7, &mut StdRng::seed_from_u64(99)).unwrap();
            let b = r.build(id, 0.7, &mut StdRng::seed_from_u64(99)).unwrap();
            assert_eq!(a, b, "formation {} not reproducible", a.formation);
        }
    }

    #[test]
    fn test_too_many_cities_fails_registry() {
        let config = FormationConfig {
            tour_cities: 11,
            ..Default::default()
        };
        assert!(matches!(
            FormationRegistry::from_config(&config),
            Err(GraphError::TooManyCities { .. })
        ));
    }
}
