//! [`ParallelForestLearner`]: grows `number_of_trees` independent trees
//! across a bounded worker pool, each seeded deterministically from its
//! index so the resulting forest doesn't depend on scheduling order.

use rayon::prelude::*;

use crate::collection::BufferCollection;
use crate::learner::DepthFirstTreeLearner;
use crate::rng::rng_for_tree;
use crate::tree::{ForestStats, Tree};

pub struct Forest {
    pub trees: Vec<Tree>,
}

impl Forest {
    pub fn stats(&self) -> ForestStats {
        let mut stats = ForestStats::default();
        for tree in &self.trees {
            stats.merge_tree(tree);
        }
        stats
    }

    /// Predicts a per-class score by averaging each tree's leaf estimate,
    /// descending each tree with the caller-provided `go_left` decision.
    pub fn predict(&self, number_of_classes: usize, go_left: impl Fn(&Tree, usize) -> bool) -> Vec<f32> {
        let mut scores = vec![0.0f32; number_of_classes];
        for tree in &self.trees {
            for (class, score) in scores.iter_mut().enumerate() {
                *score += tree.predict(class, |node_id| go_left(tree, node_id));
            }
        }
        for score in scores.iter_mut() {
            *score /= self.trees.len() as f32;
        }
        scores
    }
}

pub struct ParallelForestLearner {
    tree_learner: DepthFirstTreeLearner,
    number_of_trees: usize,
    max_number_of_threads: usize,
    base_seed: u64,
}

impl ParallelForestLearner {
    pub fn new(
        tree_learner: DepthFirstTreeLearner,
        number_of_trees: usize,
        max_number_of_threads: usize,
        base_seed: u64,
    ) -> Self {
        ParallelForestLearner { tree_learner, number_of_trees, max_number_of_threads, base_seed }
    }

    pub fn learn(&self, root_collection: &BufferCollection) -> Forest {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_number_of_threads.max(1))
            .build()
            .expect("failed to build forest worker pool");

        let trees: Vec<Tree> = pool.install(|| {
            (0..self.number_of_trees)
                .into_par_iter()
                .map(|tree_index| {
                    let learner = self.tree_learner.clone();
                    let mut rng = rng_for_tree(self.base_seed, tree_index);
                    let tree = learner.learn(root_collection, &mut rng);
                    log::debug!("tree {tree_index} grown: {} nodes", tree.len());
                    tree
                })
                .collect()
        });

        log::info!("forest grown: {} trees across {} threads", trees.len(), self.max_number_of_threads);
        Forest { trees }
    }
}
