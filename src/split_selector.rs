//! [`SplitSelector`]: picks the best (bundle, feature) pair by maximum
//! positive impurity across every scorer bundle evaluated for this node,
//! consults a post-split acceptance criterion, and — once accepted —
//! writes the chosen split into the tree and partitions the node's sample
//! indices for the two children.

use crate::buffer::{Matrix, Vector};
use crate::collection::BufferCollectionStack;
use crate::criteria::ShouldSplitCriteria;
use crate::features::FeatureValueOrdering;
use crate::ids::BufferId;
use crate::tree::Tree;

/// The set of buffer ids one scorer bundle (one feature generator + one
/// split-scoring step) publishes, bundled together so a [`SplitSelector`]
/// can compare several bundles' outputs without caring how each was
/// produced.
#[derive(Clone, Copy)]
pub struct SplitSelectorBuffers {
    pub impurity_id: BufferId,
    pub threshold_id: BufferId,
    pub child_counts_id: BufferId,
    pub left_ys_id: BufferId,
    pub right_ys_id: BufferId,
    pub float_params_id: BufferId,
    pub int_params_id: BufferId,
    pub feature_values_id: BufferId,
    pub ordering: FeatureValueOrdering,
    pub indices_id: BufferId,
}

/// Normalizes a leaf's raw weighted class counts into a probability
/// distribution. Implementations handle the zero-weight edge case (an
/// empty child) themselves.
pub trait Finalizer: Send + Sync {
    fn finalize(&self, weight: f32, ys: &mut [f32]);
    fn clone_box(&self) -> Box<dyn Finalizer>;
}

impl Clone for Box<dyn Finalizer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Divides weighted class counts by the child's total weight; a
/// zero-weight child (no samples crossed to that side) falls back to a
/// uniform prior rather than propagating a `NaN`.
#[derive(Clone, Copy, Default)]
pub struct ClassEstimatorFinalizer;

impl Finalizer for ClassEstimatorFinalizer {
    fn finalize(&self, weight: f32, ys: &mut [f32]) {
        if weight > 0.0 {
            for y in ys.iter_mut() {
                *y /= weight;
            }
        } else {
            let uniform = 1.0 / ys.len() as f32;
            for y in ys.iter_mut() {
                *y = uniform;
            }
        }
    }

    fn clone_box(&self) -> Box<dyn Finalizer> {
        Box::new(*self)
    }
}

pub struct SplitSelector {
    buffers: Vec<SplitSelectorBuffers>,
    should_split: Box<dyn ShouldSplitCriteria>,
    finalizer: Box<dyn Finalizer>,
}

impl SplitSelector {
    pub fn new(
        buffers: Vec<SplitSelectorBuffers>,
        should_split: Box<dyn ShouldSplitCriteria>,
        finalizer: Box<dyn Finalizer>,
    ) -> Self {
        assert!(!buffers.is_empty(), "a split selector needs at least one scorer bundle");
        SplitSelector { buffers, should_split, finalizer }
    }

    /// The shared indices id every bundle reads samples through. Bundles
    /// wired by the same config always agree on this, so the first is
    /// representative.
    pub fn indices_id(&self) -> BufferId {
        self.buffers[0].indices_id
    }

    pub fn finalizer(&self) -> &dyn Finalizer {
        self.finalizer.as_ref()
    }

    /// Scans every bundle's impurity vector for the maximum *positive*
    /// value (a non-positive impurity means "no acceptable threshold on
    /// this feature"), then checks the post-split criterion against the
    /// winner's child weights. Returns `None` if nothing qualifies.
    pub fn select(&self, read: &BufferCollectionStack, depth: i32) -> Option<SplitSelectorInfo> {
        let mut best: Option<(usize, usize, f32)> = None;
        for (bundle_index, buffers) in self.buffers.iter().enumerate() {
            let impurity = read.require::<Vector<f32>>(buffers.impurity_id);
            for feature_index in 0..impurity.len() {
                let value = impurity.get(feature_index);
                if value > 0.0 && best.map_or(true, |(_, _, best_value)| value > best_value) {
                    best = Some((bundle_index, feature_index, value));
                }
            }
        }

        let (bundle_index, feature_index, impurity_value) = best?;
        let buffers = self.buffers[bundle_index];

        let child_counts = read.require::<Matrix<f32>>(buffers.child_counts_id);
        let left_weight = child_counts.get(feature_index, 0);
        let right_weight = child_counts.get(feature_index, 1);

        if !self.should_split.should_split(impurity_value, left_weight, right_weight, depth) {
            return None;
        }

        Some(SplitSelectorInfo { buffers, feature_index, depth })
    }
}

impl Clone for SplitSelector {
    fn clone(&self) -> Self {
        SplitSelector {
            buffers: self.buffers.clone(),
            should_split: self.should_split.clone_box(),
            finalizer: self.finalizer.clone_box(),
        }
    }
}

/// The winning (bundle, feature) pair for one node, ready to be committed
/// to the tree and used to partition the node's samples.
pub struct SplitSelectorInfo {
    buffers: SplitSelectorBuffers,
    feature_index: usize,
    depth: i32,
}

impl SplitSelectorInfo {
    /// Writes depths, copies the winning feature's parameter rows, writes
    /// the splitpoint, and finalizes each child's class histogram before
    /// storing it.
    pub fn write_to_tree(
        &self,
        read: &BufferCollectionStack,
        finalizer: &dyn Finalizer,
        tree: &mut Tree,
        node_id: usize,
        left_node_id: usize,
        right_node_id: usize,
    ) {
        let float_params = read.require::<Matrix<f32>>(self.buffers.float_params_id);
        let int_params = read.require::<Matrix<i32>>(self.buffers.int_params_id);
        let threshold = read.require::<Vector<f32>>(self.buffers.threshold_id);
        let child_counts = read.require::<Matrix<f32>>(self.buffers.child_counts_id);
        let left_ys = read.require::<Matrix<f32>>(self.buffers.left_ys_id);
        let right_ys = read.require::<Matrix<f32>>(self.buffers.right_ys_id);

        tree.set_depth(node_id, self.depth);
        tree.set_depth(left_node_id, self.depth + 1);
        tree.set_depth(right_node_id, self.depth + 1);

        tree.set_int_params_row(node_id, int_params.row_slice(self.feature_index));
        tree.set_float_params_row(node_id, float_params.row_slice(self.feature_index));
        tree.set_splitpoint(node_id, threshold.get(self.feature_index));

        let left_weight = child_counts.get(self.feature_index, 0);
        tree.set_count(left_node_id, left_weight);
        let mut left_row: Vec<f32> = (0..left_ys.cols()).map(|c| left_ys.get(self.feature_index, c)).collect();
        finalizer.finalize(left_weight, &mut left_row);
        tree.set_ys_row(left_node_id, &left_row);

        let right_weight = child_counts.get(self.feature_index, 1);
        tree.set_count(right_node_id, right_weight);
        let mut right_row: Vec<f32> =
            (0..right_ys.cols()).map(|c| right_ys.get(self.feature_index, c)).collect();
        finalizer.finalize(right_weight, &mut right_row);
        tree.set_ys_row(right_node_id, &right_row);
    }

    /// Partitions the node's sample indices into left/right child buffer
    /// collections, using the convention `featureValue > threshold` sends a
    /// sample left (this is the opposite of the usual "less-than" reading,
    /// but matches the scorer's walk: it accumulates right-to-left as the
    /// sorted threshold index advances, so the side a sample lands on above
    /// the chosen midpoint is the left child).
    pub fn split_indices(
        &self,
        read: &BufferCollectionStack,
    ) -> (crate::collection::BufferCollection, crate::collection::BufferCollection) {
        let indices = read.require::<Vector<i32>>(self.buffers.indices_id);
        let feature_values = read.require::<Matrix<f32>>(self.buffers.feature_values_id);
        let threshold = read.require::<Vector<f32>>(self.buffers.threshold_id).get(self.feature_index);

        let mut left = Vec::new();
        let mut right = Vec::new();
        for i in 0..indices.len() {
            let value = match self.buffers.ordering {
                FeatureValueOrdering::FeaturesByDatapoints => feature_values.get(self.feature_index, i),
                FeatureValueOrdering::DatapointsByFeatures => feature_values.get(i, self.feature_index),
            };
            if value > threshold {
                left.push(indices.get(i));
            } else {
                right.push(indices.get(i));
            }
        }

        let mut left_collection = crate::collection::BufferCollection::new();
        left_collection.insert(self.buffers.indices_id, Vector::from_vec(left));
        let mut right_collection = crate::collection::BufferCollection::new();
        right_collection.insert(self.buffers.indices_id, Vector::from_vec(right));

        (left_collection, right_collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::BufferCollection;
    use crate::criteria::ShouldSplitNoCriteria;

    fn bundle() -> (SplitSelectorBuffers, BufferCollection) {
        let indices_id = BufferId::fresh();
        let feature_values_id = BufferId::fresh();
        let impurity_id = BufferId::fresh();
        let threshold_id = BufferId::fresh();
        let child_counts_id = BufferId::fresh();
        let left_ys_id = BufferId::fresh();
        let right_ys_id = BufferId::fresh();
        let float_params_id = BufferId::fresh();
        let int_params_id = BufferId::fresh();

        let mut collection = BufferCollection::new();
        collection.insert(indices_id, Vector::from_vec(vec![0, 1, 2, 3]));
        let mut values = Matrix::<f32>::new(1, 4);
        for (i, v) in [1.0, 2.0, 10.0, 11.0].iter().enumerate() {
            values.set(0, i, *v);
        }
        collection.insert(feature_values_id, values);
        collection.insert(impurity_id, Vector::from_vec(vec![0.5]));
        collection.insert(threshold_id, Vector::from_vec(vec![6.0]));
        let mut child_counts = Matrix::<f32>::new(1, 2);
        child_counts.set(0, 0, 2.0);
        child_counts.set(0, 1, 2.0);
        collection.insert(child_counts_id, child_counts);
        // raw weighted class counts (matching child_counts' per-side weight), not yet normalized
        let mut left_ys = Matrix::<f32>::new(1, 2);
        left_ys.set(0, 1, 2.0);
        collection.insert(left_ys_id, left_ys);
        let mut right_ys = Matrix::<f32>::new(1, 2);
        right_ys.set(0, 0, 2.0);
        collection.insert(right_ys_id, right_ys);
        collection.insert(float_params_id, Matrix::<f32>::filled(1, 3, 1.0));
        collection.insert(int_params_id, Matrix::<i32>::filled(1, 3, 1));

        let buffers = SplitSelectorBuffers {
            impurity_id,
            threshold_id,
            child_counts_id,
            left_ys_id,
            right_ys_id,
            float_params_id,
            int_params_id,
            feature_values_id,
            ordering: FeatureValueOrdering::FeaturesByDatapoints,
            indices_id,
        };
        (buffers, collection)
    }

    #[test]
    fn selects_the_only_positive_impurity_feature() {
        let (buffers, collection) = bundle();
        let selector =
            SplitSelector::new(vec![buffers], Box::new(ShouldSplitNoCriteria), Box::new(ClassEstimatorFinalizer));
        let stack = BufferCollectionStack::new(&collection);

        let info = selector.select(&stack, 0).expect("expected a split");
        let (left, right) = info.split_indices(&stack);
        assert_eq!(left.get::<Vector<i32>>(buffers.indices_id).unwrap().as_slice(), &[2, 3]);
        assert_eq!(right.get::<Vector<i32>>(buffers.indices_id).unwrap().as_slice(), &[0, 1]);
    }

    #[test]
    fn returns_none_when_no_bundle_has_positive_impurity() {
        let (buffers, mut collection) = bundle();
        collection.insert(buffers.impurity_id, Vector::from_vec(vec![f32::NEG_INFINITY]));
        let selector =
            SplitSelector::new(vec![buffers], Box::new(ShouldSplitNoCriteria), Box::new(ClassEstimatorFinalizer));
        let stack = BufferCollectionStack::new(&collection);
        assert!(selector.select(&stack, 0).is_none());
    }

    #[test]
    fn finalizer_falls_back_to_uniform_on_zero_weight() {
        let finalizer = ClassEstimatorFinalizer;
        let mut ys = vec![5.0, 0.0, 0.0];
        finalizer.finalize(0.0, &mut ys);
        assert_eq!(ys, vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
    }
}
