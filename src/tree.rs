//! The grown tree: a set of parallel arrays indexed by node id, and
//! [`ForestStats`], a leaf-level aggregation used to summarize a learned
//! forest's shape.

use crate::buffer::{Matrix, Vector};
use crate::consts::{LEFT_CHILD_INDEX, NULL_CHILD, RIGHT_CHILD_INDEX, SPLITPOINT_INDEX};

/// A binary decision tree stored as parallel arrays, grown node by node via
/// [`Tree::next_node_index`] and trimmed to its final size with
/// [`Tree::compact`].
pub struct Tree {
    path: Matrix<i32>,
    int_feature_params: Matrix<i32>,
    float_feature_params: Matrix<f32>,
    counts: Vector<f32>,
    depths: Vector<i32>,
    ys: Matrix<f32>,
    last_node_index: usize,
}

impl Tree {
    /// A freshly allocated tree with a single root node (depth 0, uniform
    /// class estimate, no children yet).
    pub fn new(number_of_classes: usize, int_params_dim: usize, float_params_dim: usize) -> Self {
        let path = Matrix::filled(1, 2, NULL_CHILD);
        let int_feature_params = Matrix::new(1, int_params_dim);
        let float_feature_params = Matrix::new(1, float_params_dim);
        let counts = Vector::new(1);
        let depths = Vector::new(1);
        let mut ys = Matrix::new(1, number_of_classes);
        let uniform = 1.0 / number_of_classes as f32;
        for c in 0..number_of_classes {
            ys.set(0, c, uniform);
        }
        Tree { path, int_feature_params, float_feature_params, counts, depths, ys, last_node_index: 1 }
    }

    /// Number of nodes currently allocated (including unused growth slack
    /// before a [`Tree::compact`] call).
    pub fn len(&self) -> usize {
        self.last_node_index
    }

    pub fn is_empty(&self) -> bool {
        self.last_node_index == 0
    }

    pub fn number_of_classes(&self) -> usize {
        self.ys.cols()
    }

    /// Reserves and returns the next node id, growing the backing arrays
    /// geometrically (by half the current capacity, plus one) whenever the
    /// preallocated capacity is exhausted.
    pub fn next_node_index(&mut self) -> usize {
        let next = self.last_node_index;
        self.last_node_index += 1;

        let allocated = self.path.rows();
        if self.last_node_index > allocated {
            let new_size = self.last_node_index + allocated / 2 + 1;
            self.grow(new_size);
        }
        next
    }

    fn grow(&mut self, new_size: usize) {
        self.path.resize(new_size, 2, NULL_CHILD);
        let int_cols = self.int_feature_params.cols();
        self.int_feature_params.resize(new_size, int_cols, 0);
        let float_cols = self.float_feature_params.cols();
        self.float_feature_params.resize(new_size, float_cols, 0.0);
        self.counts.resize(new_size, 0.0);
        self.depths.resize(new_size, 0);
        let ys_cols = self.ys.cols();
        self.ys.resize(new_size, ys_cols, 0.0);
    }

    /// Shrinks the backing arrays down to exactly the nodes actually used.
    pub fn compact(&mut self) {
        let n = self.last_node_index;
        self.path.resize(n, 2, NULL_CHILD);
        let int_cols = self.int_feature_params.cols();
        self.int_feature_params.resize(n, int_cols, 0);
        let float_cols = self.float_feature_params.cols();
        self.float_feature_params.resize(n, float_cols, 0.0);
        self.counts.resize(n, 0.0);
        self.depths.resize(n, 0);
        let ys_cols = self.ys.cols();
        self.ys.resize(n, ys_cols, 0.0);
    }

    pub fn left_child(&self, node_id: usize) -> i32 {
        self.path.get(node_id, LEFT_CHILD_INDEX)
    }

    pub fn right_child(&self, node_id: usize) -> i32 {
        self.path.get(node_id, RIGHT_CHILD_INDEX)
    }

    pub fn is_leaf(&self, node_id: usize) -> bool {
        self.left_child(node_id) == NULL_CHILD || self.right_child(node_id) == NULL_CHILD
    }

    pub fn set_path(&mut self, node_id: usize, left: i32, right: i32) {
        self.path.set(node_id, LEFT_CHILD_INDEX, left);
        self.path.set(node_id, RIGHT_CHILD_INDEX, right);
    }

    pub fn depth(&self, node_id: usize) -> i32 {
        self.depths.get(node_id)
    }

    pub fn set_depth(&mut self, node_id: usize, depth: i32) {
        self.depths.set(node_id, depth);
    }

    pub fn count(&self, node_id: usize) -> f32 {
        self.counts.get(node_id)
    }

    pub fn set_count(&mut self, node_id: usize, count: f32) {
        self.counts.set(node_id, count);
    }

    pub fn int_params_row(&self, node_id: usize) -> &[i32] {
        self.int_feature_params.row_slice(node_id)
    }

    pub fn set_int_params_row(&mut self, node_id: usize, row: &[i32]) {
        self.int_feature_params.set_row(node_id, row);
    }

    pub fn float_params_row(&self, node_id: usize) -> &[f32] {
        self.float_feature_params.row_slice(node_id)
    }

    pub fn set_float_params_row(&mut self, node_id: usize, row: &[f32]) {
        self.float_feature_params.set_row(node_id, row);
    }

    /// The split threshold lives in column 0 of the float-params row, ahead
    /// of the feature's own parameters, following the same
    /// type/dims/params layout used for feature rows.
    pub fn splitpoint(&self, node_id: usize) -> f32 {
        self.float_feature_params.get(node_id, SPLITPOINT_INDEX)
    }

    pub fn set_splitpoint(&mut self, node_id: usize, value: f32) {
        self.float_feature_params.set(node_id, SPLITPOINT_INDEX, value);
    }

    pub fn ys(&self, node_id: usize, class: usize) -> f32 {
        self.ys.get(node_id, class)
    }

    pub fn set_ys_row(&mut self, node_id: usize, row: &[f32]) {
        self.ys.set_row(node_id, row);
    }

    pub fn predict(&self, class: usize, visit: impl Fn(usize) -> bool) -> f32 {
        let mut node_id = 0usize;
        loop {
            if self.is_leaf(node_id) {
                return self.ys(node_id, class);
            }
            node_id = if visit(node_id) {
                self.left_child(node_id) as usize
            } else {
                self.right_child(node_id) as usize
            };
        }
    }
}

/// Leaf-level aggregation of a forest's depth, node size, and estimator
/// error, tracked as running min/max/total so it can be folded over many
/// trees without keeping every leaf in memory.
pub struct ForestStats {
    pub number_of_leaf_nodes: usize,
    pub min_depth: i32,
    pub max_depth: i32,
    pub total_depth: i64,
    pub min_estimator_points: f32,
    pub max_estimator_points: f32,
    pub total_estimator_points: f64,
    pub min_error: f32,
    pub max_error: f32,
    pub total_error: f64,
}

impl Default for ForestStats {
    fn default() -> Self {
        ForestStats {
            number_of_leaf_nodes: 0,
            min_depth: i32::MAX,
            max_depth: 0,
            total_depth: 0,
            min_estimator_points: f32::MAX,
            max_estimator_points: 0.0,
            total_estimator_points: 0.0,
            min_error: 1.0,
            max_error: 0.0,
            total_error: 0.0,
        }
    }
}

impl ForestStats {
    pub fn process_leaf(&mut self, tree: &Tree, node_id: usize) {
        let depth = tree.depth(node_id);
        self.number_of_leaf_nodes += 1;
        self.min_depth = self.min_depth.min(depth);
        self.max_depth = self.max_depth.max(depth);
        self.total_depth += depth as i64;

        let points = tree.count(node_id);
        self.min_estimator_points = self.min_estimator_points.min(points);
        self.max_estimator_points = self.max_estimator_points.max(points);
        self.total_estimator_points += points as f64;

        let max_y = (0..tree.number_of_classes())
            .map(|c| tree.ys(node_id, c))
            .fold(f32::MIN, f32::max);
        let error = 1.0 - max_y;
        self.min_error = self.min_error.min(error);
        self.max_error = self.max_error.max(error);
        self.total_error += error as f64;
    }

    pub fn merge_tree(&mut self, tree: &Tree) {
        for node_id in 0..tree.len() {
            if tree.is_leaf(node_id) {
                self.process_leaf(tree, node_id);
            }
        }
    }

    pub fn average_depth(&self) -> f32 {
        self.total_depth as f32 / self.number_of_leaf_nodes as f32
    }

    pub fn average_estimator_points(&self) -> f32 {
        (self.total_estimator_points / self.number_of_leaf_nodes as f64) as f32
    }

    pub fn average_error(&self) -> f32 {
        (self.total_error / self.number_of_leaf_nodes as f64) as f32
    }
}

impl std::fmt::Display for ForestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ForestStats: leaves={} depth=[{}, {}] avg={:.2} points=[{}, {}] avg={:.2} error=[{:.3}, {:.3}] avg={:.3}",
            self.number_of_leaf_nodes,
            self.min_depth,
            self.max_depth,
            self.average_depth(),
            self.min_estimator_points,
            self.max_estimator_points,
            self.average_estimator_points(),
            self.min_error,
            self.max_error,
            self.average_error(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_has_one_uniform_leaf() {
        let tree = Tree::new(2, 3, 3);
        assert_eq!(tree.len(), 1);
        assert!(tree.is_leaf(0));
        assert_eq!(tree.ys(0, 0), 0.5);
        assert_eq!(tree.ys(0, 1), 0.5);
    }

    #[test]
    fn next_node_index_grows_geometrically() {
        let mut tree = Tree::new(2, 3, 3);
        let a = tree.next_node_index();
        let b = tree.next_node_index();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn compact_shrinks_to_used_nodes() {
        let mut tree = Tree::new(2, 3, 3);
        tree.next_node_index();
        tree.next_node_index();
        tree.compact();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.path.rows(), 3);
    }

    #[test]
    fn forest_stats_merges_all_leaves() {
        let mut tree = Tree::new(2, 3, 3);
        let left = tree.next_node_index();
        let right = tree.next_node_index();
        tree.set_path(0, left as i32, right as i32);
        tree.set_depth(0, 0);
        tree.set_depth(left, 1);
        tree.set_depth(right, 1);
        tree.set_count(left, 3.0);
        tree.set_count(right, 7.0);
        tree.set_ys_row(left, &[1.0, 0.0]);
        tree.set_ys_row(right, &[0.0, 1.0]);

        let mut stats = ForestStats::default();
        stats.merge_tree(&tree);

        assert_eq!(stats.number_of_leaf_nodes, 2);
        assert_eq!(stats.min_depth, 1);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(stats.total_estimator_points, 10.0);
        assert_eq!(stats.average_error(), 0.0);
    }
}
