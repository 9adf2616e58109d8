//! Pre- and post-split acceptance criteria. `TrySplitCriteria` is consulted
//! before the (expensive) node pipeline runs, using only the weight
//! reaching the node and its depth; `ShouldSplitCriteria` is consulted
//! after a candidate split has been scored, using its impurity and child
//! weights.

pub trait TrySplitCriteria: Send + Sync {
    fn try_split(&self, weight: f32, depth: i32) -> bool;
    fn clone_box(&self) -> Box<dyn TrySplitCriteria>;
}

impl Clone for Box<dyn TrySplitCriteria> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Clone, Copy, Default)]
pub struct TrySplitNoCriteria;

impl TrySplitCriteria for TrySplitNoCriteria {
    fn try_split(&self, _weight: f32, _depth: i32) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn TrySplitCriteria> {
        Box::new(*self)
    }
}

/// Rejects growing past a node whose incoming weight is below
/// `min_node_size`.
#[derive(Clone, Copy)]
pub struct MinNodeSizeCriteria {
    min_node_size: f32,
}

impl MinNodeSizeCriteria {
    pub fn new(min_node_size: f32) -> Self {
        MinNodeSizeCriteria { min_node_size }
    }
}

impl TrySplitCriteria for MinNodeSizeCriteria {
    fn try_split(&self, weight: f32, _depth: i32) -> bool {
        weight >= self.min_node_size
    }

    fn clone_box(&self) -> Box<dyn TrySplitCriteria> {
        Box::new(*self)
    }
}

pub trait ShouldSplitCriteria: Send + Sync {
    fn should_split(&self, impurity: f32, left_weight: f32, right_weight: f32, depth: i32) -> bool;
    fn clone_box(&self) -> Box<dyn ShouldSplitCriteria>;
}

impl Clone for Box<dyn ShouldSplitCriteria> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Clone, Copy, Default)]
pub struct ShouldSplitNoCriteria;

impl ShouldSplitCriteria for ShouldSplitNoCriteria {
    fn should_split(&self, _impurity: f32, _left_weight: f32, _right_weight: f32, _depth: i32) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn ShouldSplitCriteria> {
        Box::new(*self)
    }
}

/// Rejects a split whose winning impurity falls below `min_impurity`.
#[derive(Clone, Copy)]
pub struct MinImpurityCriteria {
    min_impurity: f32,
}

impl MinImpurityCriteria {
    pub fn new(min_impurity: f32) -> Self {
        MinImpurityCriteria { min_impurity }
    }
}

impl ShouldSplitCriteria for MinImpurityCriteria {
    fn should_split(&self, impurity: f32, _left_weight: f32, _right_weight: f32, _depth: i32) -> bool {
        impurity >= self.min_impurity
    }

    fn clone_box(&self) -> Box<dyn ShouldSplitCriteria> {
        Box::new(*self)
    }
}

/// Rejects a split that would leave either child under `min_child_size`.
#[derive(Clone, Copy)]
pub struct MinChildSizeCriteria {
    min_child_size: f32,
}

impl MinChildSizeCriteria {
    pub fn new(min_child_size: f32) -> Self {
        MinChildSizeCriteria { min_child_size }
    }
}

impl ShouldSplitCriteria for MinChildSizeCriteria {
    fn should_split(&self, _impurity: f32, left_weight: f32, right_weight: f32, _depth: i32) -> bool {
        left_weight >= self.min_child_size && right_weight >= self.min_child_size
    }

    fn clone_box(&self) -> Box<dyn ShouldSplitCriteria> {
        Box::new(*self)
    }
}

/// Combines several `ShouldSplitCriteria` with logical AND.
pub struct CombinedShouldSplitCriteria {
    criteria: Vec<Box<dyn ShouldSplitCriteria>>,
}

impl CombinedShouldSplitCriteria {
    pub fn new(criteria: Vec<Box<dyn ShouldSplitCriteria>>) -> Self {
        CombinedShouldSplitCriteria { criteria }
    }
}

impl ShouldSplitCriteria for CombinedShouldSplitCriteria {
    fn should_split(&self, impurity: f32, left_weight: f32, right_weight: f32, depth: i32) -> bool {
        self.criteria.iter().all(|c| c.should_split(impurity, left_weight, right_weight, depth))
    }

    fn clone_box(&self) -> Box<dyn ShouldSplitCriteria> {
        Box::new(CombinedShouldSplitCriteria {
            criteria: self.criteria.iter().map(|c| c.clone_box()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_split_no_criteria_always_true() {
        let c = TrySplitNoCriteria;
        assert!(c.try_split(0.0, 0));
        let cloned = c.clone_box();
        assert!(cloned.try_split(0.0, 0));
    }

    #[test]
    fn min_node_size_rejects_below_threshold() {
        let c = MinNodeSizeCriteria::new(5.0);
        assert!(!c.try_split(4.9, 3));
        assert!(c.try_split(5.0, 3));
    }

    #[test]
    fn min_impurity_rejects_below_threshold() {
        let c = MinImpurityCriteria::new(0.1);
        assert!(!c.should_split(0.05, 10.0, 10.0, 1));
        assert!(c.should_split(0.1, 10.0, 10.0, 1));
    }

    #[test]
    fn min_child_size_requires_both_sides() {
        let c = MinChildSizeCriteria::new(2.0);
        assert!(!c.should_split(1.0, 1.0, 5.0, 1));
        assert!(c.should_split(1.0, 2.0, 2.0, 1));
    }

    #[test]
    fn combined_requires_all() {
        let c = CombinedShouldSplitCriteria::new(vec![
            Box::new(MinImpurityCriteria::new(0.1)),
            Box::new(MinChildSizeCriteria::new(2.0)),
        ]);
        assert!(!c.should_split(0.05, 10.0, 10.0, 1));
        assert!(!c.should_split(0.2, 1.0, 10.0, 1));
        assert!(c.should_split(0.2, 2.0, 2.0, 1));
    }
}
