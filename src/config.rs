//! [`ForestConfig`]: a builder that wires together the whole pipeline —
//! feature generation, split scoring, split selection, and the depth-first
//! tree learner — and produces a [`ClassificationForestLearner`] ready to
//! `fit` a dataset. Grounded in the same construction sequence as the
//! original engine's depth-first-learner test fixture: one
//! `AllSamplesStep` feeding one axis-aligned feature generator feeding one
//! class-info-gain scorer.

use crate::buffer::{Matrix, Vector};
use crate::collection::BufferCollection;
use crate::consts::PARAM_START_INDEX;
use crate::criteria::{
    CombinedShouldSplitCriteria, MinChildSizeCriteria, MinImpurityCriteria, MinNodeSizeCriteria,
    ShouldSplitCriteria, ShouldSplitNoCriteria,
};
use crate::error::ForesterError;
use crate::features::{AxisAlignedParamsStep, FeatureExtractorStep, FeatureValueOrdering, LinearMatrixFeature};
use crate::forest::{Forest, ParallelForestLearner};
use crate::ids::BufferId;
use crate::learner::DepthFirstTreeLearner;
use crate::pipeline::{AllSamplesStep, Pipeline, SetBufferStep, SetRule};
use crate::slice::SliceBufferStep;
use crate::split::ClassInfoGainBestSplitStep;
use crate::split_selector::{ClassEstimatorFinalizer, SplitSelector, SplitSelectorBuffers};

/// Builder for a classification forest. Every setter consumes and returns
/// `self`, so a config is assembled with a chain of method calls ending in
/// [`ForestConfig::build`].
pub struct ForestConfig {
    number_of_classes: usize,
    ratio_of_thresholds_to_test: f32,
    min_number_thresholds_to_test: usize,
    feature_ordering: FeatureValueOrdering,
    min_node_size: f32,
    number_of_trees: usize,
    max_number_of_threads: usize,
    number_of_features_per_node: usize,
    min_impurity: Option<f32>,
    min_child_size: Option<f32>,
    seed: u64,
}

impl ForestConfig {
    pub fn new(number_of_classes: usize) -> Self {
        ForestConfig {
            number_of_classes,
            ratio_of_thresholds_to_test: 1.0,
            min_number_thresholds_to_test: 1,
            feature_ordering: FeatureValueOrdering::FeaturesByDatapoints,
            min_node_size: 1.0,
            number_of_trees: 100,
            max_number_of_threads: num_cpus::get(),
            number_of_features_per_node: 1,
            min_impurity: None,
            min_child_size: None,
            seed: 0,
        }
    }

    pub fn ratio_of_thresholds_to_test(mut self, ratio: f32) -> Self {
        self.ratio_of_thresholds_to_test = ratio;
        self
    }

    pub fn min_number_thresholds_to_test(mut self, n: usize) -> Self {
        self.min_number_thresholds_to_test = n;
        self
    }

    pub fn feature_ordering(mut self, ordering: FeatureValueOrdering) -> Self {
        self.feature_ordering = ordering;
        self
    }

    pub fn min_node_size(mut self, size: f32) -> Self {
        self.min_node_size = size;
        self
    }

    pub fn number_of_trees(mut self, n: usize) -> Self {
        self.number_of_trees = n;
        self
    }

    pub fn max_number_of_threads(mut self, n: usize) -> Self {
        self.max_number_of_threads = n;
        self
    }

    pub fn number_of_features_per_node(mut self, n: usize) -> Self {
        self.number_of_features_per_node = n;
        self
    }

    pub fn min_impurity(mut self, min_impurity: f32) -> Self {
        self.min_impurity = Some(min_impurity);
        self
    }

    pub fn min_child_size(mut self, min_child_size: f32) -> Self {
        self.min_child_size = Some(min_child_size);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<(), ForesterError> {
        if self.number_of_classes == 0 {
            return Err(ForesterError::InvalidConfig("numberOfClasses must be > 0".into()));
        }
        if self.number_of_trees == 0 {
            return Err(ForesterError::InvalidConfig("numberOfTrees must be > 0".into()));
        }
        if self.number_of_features_per_node == 0 {
            return Err(ForesterError::InvalidConfig("numberOfFeaturesPerNode must be > 0".into()));
        }
        if self.ratio_of_thresholds_to_test <= 0.0 || self.ratio_of_thresholds_to_test > 1.0 {
            return Err(ForesterError::InvalidConfig("ratioOfThresholdsToTest must be in (0, 1]".into()));
        }
        Ok(())
    }

    pub fn build(self) -> Result<ClassificationForestLearner, ForesterError> {
        self.validate()?;
        Ok(ClassificationForestLearner { config: self })
    }
}

pub struct ClassificationForestLearner {
    config: ForestConfig,
}

impl ClassificationForestLearner {
    /// Fits a forest to `features` (one row per sample) and `labels`
    /// (class index per sample, `0..number_of_classes`).
    pub fn fit(&self, features: Matrix<f32>, labels: Vec<i32>) -> Result<Forest, ForesterError> {
        let n = features.rows();
        let d = features.cols();
        if n == 0 {
            return Err(ForesterError::EmptyDataset);
        }
        if labels.len() != n {
            return Err(ForesterError::DimensionMismatch { expected: n, actual: labels.len() });
        }
        if self.config.number_of_features_per_node > d {
            return Err(ForesterError::InvalidConfig(format!(
                "numberOfFeaturesPerNode ({}) must be in [1, {}]",
                self.config.number_of_features_per_node, d
            )));
        }

        let data_id = BufferId::named("FEATURE_VALUES");
        let class_labels_id = BufferId::named("CLASS_LABELS");

        let mut root = BufferCollection::new();
        root.insert(data_id, features);
        root.insert(class_labels_id, Vector::from_vec(labels));

        let all_samples = AllSamplesStep::new(data_id);
        let indices_id = all_samples.indices_id;
        let weights_id = all_samples.weights_id;

        let number_of_features = SetBufferStep::new(
            Vector::from_vec(vec![self.config.number_of_features_per_node as i32]),
            SetRule::WhenNew,
        );
        let number_of_features_id = number_of_features.output_id;

        let tree_pipeline = Pipeline::new(vec![Box::new(all_samples), Box::new(number_of_features)]);

        let feature_params = AxisAlignedParamsStep::new(number_of_features_id, data_id);
        let int_params_id = feature_params.int_params_id;
        let float_params_id = feature_params.float_params_id;

        let feature = LinearMatrixFeature::new(float_params_id, int_params_id, indices_id, data_id);
        let feature_extractor = FeatureExtractorStep::new(feature, self.config.feature_ordering);
        let feature_values_id = feature_extractor.feature_values_id;

        let slice_classes = SliceBufferStep::<Vector<i32>>::new(class_labels_id, indices_id);
        let sliced_classes_id = slice_classes.sliced_id;
        let slice_weights = SliceBufferStep::<Vector<f32>>::new(weights_id, indices_id);
        let sliced_weights_id = slice_weights.sliced_id;

        let best_split = ClassInfoGainBestSplitStep::new(
            feature_values_id,
            sliced_classes_id,
            sliced_weights_id,
            self.config.feature_ordering,
            self.config.ratio_of_thresholds_to_test,
            self.config.min_number_thresholds_to_test,
            self.config.number_of_classes,
        );
        let split_buffers = SplitSelectorBuffers {
            impurity_id: best_split.impurity_id,
            threshold_id: best_split.threshold_id,
            child_counts_id: best_split.child_counts_id,
            left_ys_id: best_split.left_ys_id,
            right_ys_id: best_split.right_ys_id,
            float_params_id,
            int_params_id,
            feature_values_id,
            ordering: self.config.feature_ordering,
            indices_id,
        };

        let node_pipeline = Pipeline::new(vec![
            Box::new(feature_params),
            Box::new(feature_extractor),
            Box::new(slice_classes),
            Box::new(slice_weights),
            Box::new(best_split),
        ]);

        let should_split: Box<dyn ShouldSplitCriteria> =
            match (self.config.min_impurity, self.config.min_child_size) {
                (None, None) => Box::new(ShouldSplitNoCriteria),
                (Some(min_impurity), None) => Box::new(MinImpurityCriteria::new(min_impurity)),
                (None, Some(min_child_size)) => Box::new(MinChildSizeCriteria::new(min_child_size)),
                (Some(min_impurity), Some(min_child_size)) => {
                    Box::new(CombinedShouldSplitCriteria::new(vec![
                        Box::new(MinImpurityCriteria::new(min_impurity)),
                        Box::new(MinChildSizeCriteria::new(min_child_size)),
                    ]))
                }
            };

        let split_selector = SplitSelector::new(vec![split_buffers], should_split, Box::new(ClassEstimatorFinalizer));
        let try_split = Box::new(MinNodeSizeCriteria::new(self.config.min_node_size));

        let int_params_dim = PARAM_START_INDEX + 1;
        let float_params_dim = PARAM_START_INDEX + 1;

        let tree_learner = DepthFirstTreeLearner::new(
            try_split,
            tree_pipeline,
            node_pipeline,
            split_selector,
            indices_id,
            weights_id,
            self.config.number_of_classes,
            int_params_dim,
            float_params_dim,
        );

        let parallel_learner = ParallelForestLearner::new(
            tree_learner,
            self.config.number_of_trees,
            self.config.max_number_of_threads,
            self.config.seed,
        );

        Ok(parallel_learner.learn(&root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_trees() {
        let err = ForestConfig::new(2).number_of_trees(0).build().unwrap_err();
        assert!(matches!(err, ForesterError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_classes() {
        let err = ForestConfig::new(0).build().unwrap_err();
        assert!(matches!(err, ForesterError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_feature_count_over_dimensionality() {
        let learner = ForestConfig::new(2).number_of_features_per_node(5).build().unwrap();
        let features = Matrix::<f32>::new(4, 2);
        let err = learner.fit(features, vec![0, 0, 1, 1]).unwrap_err();
        assert!(matches!(err, ForesterError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_label_length_mismatch() {
        let learner = ForestConfig::new(2).build().unwrap();
        let features = Matrix::<f32>::new(4, 2);
        let err = learner.fit(features, vec![0, 1]).unwrap_err();
        assert!(matches!(err, ForesterError::DimensionMismatch { .. }));
    }

    #[test]
    fn fits_a_small_separable_dataset() {
        let learner = ForestConfig::new(2)
            .number_of_trees(5)
            .max_number_of_threads(1)
            .number_of_features_per_node(1)
            .seed(7)
            .build()
            .unwrap();

        let mut features = Matrix::<f32>::new(6, 1);
        for (i, v) in [0.0, 0.1, 0.2, 9.0, 9.1, 9.2].iter().enumerate() {
            features.set(i, 0, *v);
        }
        let labels = vec![0, 0, 0, 1, 1, 1];

        let forest = learner.fit(features, labels).unwrap();
        assert_eq!(forest.trees.len(), 5);
        let stats = forest.stats();
        assert!(stats.number_of_leaf_nodes > 0);
    }
}
