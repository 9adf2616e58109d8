//! [`DepthFirstTreeLearner`]: grows one tree by recursing depth-first,
//! pushing exactly one [`BufferCollectionStack`] frame per recursion level
//! so sibling subtrees never see each other's sliced indices.

use rand::RngCore;

use crate::buffer::Vector;
use crate::collection::{BufferCollection, BufferCollectionStack};
use crate::criteria::TrySplitCriteria;
use crate::ids::BufferId;
use crate::pipeline::Pipeline;
use crate::split_selector::SplitSelector;
use crate::tree::Tree;

pub struct DepthFirstTreeLearner {
    try_split: Box<dyn TrySplitCriteria>,
    tree_pipeline: Pipeline,
    node_pipeline: Pipeline,
    split_selector: SplitSelector,
    indices_id: BufferId,
    weights_id: BufferId,
    number_of_classes: usize,
    int_params_dim: usize,
    float_params_dim: usize,
}

impl DepthFirstTreeLearner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        try_split: Box<dyn TrySplitCriteria>,
        tree_pipeline: Pipeline,
        node_pipeline: Pipeline,
        split_selector: SplitSelector,
        indices_id: BufferId,
        weights_id: BufferId,
        number_of_classes: usize,
        int_params_dim: usize,
        float_params_dim: usize,
    ) -> Self {
        DepthFirstTreeLearner {
            try_split,
            tree_pipeline,
            node_pipeline,
            split_selector,
            indices_id,
            weights_id,
            number_of_classes,
            int_params_dim,
            float_params_dim,
        }
    }

    /// Grows a complete tree from the root collection (holding the full
    /// feature matrix, class labels, and sample weights).
    pub fn learn(&self, root_collection: &BufferCollection, rng: &mut dyn RngCore) -> Tree {
        let mut tree = Tree::new(self.number_of_classes, self.int_params_dim, self.float_params_dim);

        let root_stack = BufferCollectionStack::new(root_collection);
        let mut tree_frame = BufferCollection::new();
        self.tree_pipeline.process(&root_stack, &mut tree_frame, rng);
        let tree_stack = root_stack.push(&tree_frame);

        self.grow_node(&tree_stack, &mut tree, 0, 0, rng);

        tree.compact();
        log::debug!("tree grown: {} nodes", tree.len());
        tree
    }

    fn grow_node(
        &self,
        stack: &BufferCollectionStack,
        tree: &mut Tree,
        node_id: usize,
        depth: i32,
        rng: &mut dyn RngCore,
    ) {
        let indices = stack.require::<Vector<i32>>(self.indices_id);
        let weights = stack.require::<Vector<f32>>(self.weights_id);
        let node_weight: f32 = (0..indices.len()).map(|i| weights.get(indices.get(i) as usize)).sum();
        tree.set_count(node_id, node_weight);

        if !self.try_split.try_split(node_weight, depth) {
            log::trace!("node {node_id} (depth {depth}, weight {node_weight}): leaf, trySplit rejected");
            return;
        }

        let mut node_frame = BufferCollection::new();
        self.node_pipeline.process(stack, &mut node_frame, rng);
        let node_stack = stack.push(&node_frame);

        let info = match self.split_selector.select(&node_stack, depth) {
            Some(info) => info,
            None => {
                log::trace!("node {node_id} (depth {depth}): leaf, no acceptable split");
                return;
            }
        };

        let left_id = tree.next_node_index();
        let right_id = tree.next_node_index();
        tree.set_path(node_id, left_id as i32, right_id as i32);
        info.write_to_tree(&node_stack, self.split_selector.finalizer(), tree, node_id, left_id, right_id);

        let (left_collection, right_collection) = info.split_indices(&node_stack);

        let left_stack = node_stack.push(&left_collection);
        self.grow_node(&left_stack, tree, left_id, depth + 1, rng);

        let right_stack = node_stack.push(&right_collection);
        self.grow_node(&right_stack, tree, right_id, depth + 1, rng);
    }
}

impl Clone for DepthFirstTreeLearner {
    fn clone(&self) -> Self {
        DepthFirstTreeLearner {
            try_split: self.try_split.clone_box(),
            tree_pipeline: self.tree_pipeline.clone(),
            node_pipeline: self.node_pipeline.clone(),
            split_selector: self.split_selector.clone(),
            indices_id: self.indices_id,
            weights_id: self.weights_id,
            number_of_classes: self.number_of_classes,
            int_params_dim: self.int_params_dim,
            float_params_dim: self.float_params_dim,
        }
    }
}
