//! The class-information-gain split scorer: for each candidate feature,
//! walks datapoints in ascending feature-value order while incrementally
//! updating per-class left/right weight, recomputing logs lazily only for
//! classes that changed since the last tested threshold, and keeps the best
//! midpoint threshold seen. Grounded directly on the original engine's
//! `ClassInfoGainAllThresholdsBestSplit`.

use rand::RngCore;

use crate::buffer::{Matrix, Vector};
use crate::collection::{BufferCollection, BufferCollectionStack};
use crate::features::FeatureValueOrdering;
use crate::ids::BufferId;
use crate::pipeline::PipelineStep;

fn entropy(counts: &[f32], logs: &[f32], total: f32) -> f32 {
    if total <= 0.0 {
        return 0.0;
    }
    let inv_total = 1.0 / total;
    let log_total = total.ln();
    let mut h = 0.0f32;
    for c in 0..counts.len() {
        let p = inv_total * counts[c];
        h -= p * (logs[c] - log_total);
    }
    h
}

/// Reads a feature-values matrix, the sliced class labels, and the sliced
/// sample weights for the current node; writes, per candidate feature, the
/// best split's impurity, threshold, child weights, and each child's raw
/// weighted class counts (left un-normalized — [`crate::split_selector::ClassEstimatorFinalizer`]
/// divides by child weight once a feature is actually selected).
pub struct ClassInfoGainBestSplitStep {
    pub impurity_id: BufferId,
    pub threshold_id: BufferId,
    pub child_counts_id: BufferId,
    pub left_ys_id: BufferId,
    pub right_ys_id: BufferId,
    feature_values_id: BufferId,
    class_labels_id: BufferId,
    sample_weights_id: BufferId,
    ordering: FeatureValueOrdering,
    ratio_of_thresholds_to_test: f32,
    min_number_thresholds_to_test: usize,
    number_of_classes: usize,
}

impl ClassInfoGainBestSplitStep {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feature_values_id: BufferId,
        class_labels_id: BufferId,
        sample_weights_id: BufferId,
        ordering: FeatureValueOrdering,
        ratio_of_thresholds_to_test: f32,
        min_number_thresholds_to_test: usize,
        number_of_classes: usize,
    ) -> Self {
        ClassInfoGainBestSplitStep {
            impurity_id: BufferId::fresh(),
            threshold_id: BufferId::fresh(),
            child_counts_id: BufferId::fresh(),
            left_ys_id: BufferId::fresh(),
            right_ys_id: BufferId::fresh(),
            feature_values_id,
            class_labels_id,
            sample_weights_id,
            ordering,
            ratio_of_thresholds_to_test,
            min_number_thresholds_to_test,
            number_of_classes,
        }
    }
}

impl PipelineStep for ClassInfoGainBestSplitStep {
    fn clone_box(&self) -> Box<dyn PipelineStep> {
        Box::new(ClassInfoGainBestSplitStep {
            impurity_id: self.impurity_id,
            threshold_id: self.threshold_id,
            child_counts_id: self.child_counts_id,
            left_ys_id: self.left_ys_id,
            right_ys_id: self.right_ys_id,
            feature_values_id: self.feature_values_id,
            class_labels_id: self.class_labels_id,
            sample_weights_id: self.sample_weights_id,
            ordering: self.ordering,
            ratio_of_thresholds_to_test: self.ratio_of_thresholds_to_test,
            min_number_thresholds_to_test: self.min_number_thresholds_to_test,
            number_of_classes: self.number_of_classes,
        })
    }

    fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        rng: &mut dyn RngCore,
    ) {
        let raw_feature_values = read.require::<Matrix<f32>>(self.feature_values_id);
        let class_labels = read.require::<Vector<i32>>(self.class_labels_id);
        let sample_weights = read.require::<Vector<f32>>(self.sample_weights_id);

        let feature_values = match self.ordering {
            FeatureValueOrdering::FeaturesByDatapoints => raw_feature_values.clone(),
            FeatureValueOrdering::DatapointsByFeatures => raw_feature_values.transpose(),
        };

        let num_features = feature_values.rows();
        let num_datapoints = feature_values.cols();
        assert_eq!(class_labels.len(), sample_weights.len());
        assert_eq!(class_labels.len(), num_datapoints);

        let c = self.number_of_classes;
        let mut initial_counts = vec![0f32; c];
        let mut total_weight = 0f32;
        for i in 0..num_datapoints {
            let class = class_labels.get(i) as usize;
            let w = sample_weights.get(i);
            initial_counts[class] += w;
            total_weight += w;
        }
        let initial_logs: Vec<f32> =
            initial_counts.iter().map(|&x| if x > 0.0 { x.ln() } else { 0.0 }).collect();
        let h_start = entropy(&initial_counts, &initial_logs, total_weight);

        let requested = ((self.ratio_of_thresholds_to_test * num_datapoints as f32) as usize)
            .max(self.min_number_thresholds_to_test)
            .min(num_datapoints);
        let tested: std::collections::HashSet<usize> = if num_datapoints > 1 {
            rand::seq::index::sample(rng, num_datapoints, requested.min(num_datapoints))
                .into_iter()
                .collect()
        } else {
            std::collections::HashSet::new()
        };

        let mut impurity = Vector::<f32>::new(num_features);
        let mut threshold = Vector::<f32>::new(num_features);
        let mut child_counts = Matrix::<f32>::new(num_features, 2);
        let mut left_ys = Matrix::<f32>::new(num_features, c);
        let mut right_ys = Matrix::<f32>::new(num_features, c);

        for f in 0..num_features {
            let values = feature_values.row_slice(f);
            let mut order: Vec<usize> = (0..num_datapoints).collect();
            order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).expect("NaN feature value"));

            let mut left_counts = initial_counts.clone();
            let mut right_counts = vec![0f32; c];
            let mut left_logs = initial_logs.clone();
            let mut right_logs = vec![0f32; c];
            let mut stale = vec![false; c];

            let mut left_weight = total_weight;
            let mut right_weight = 0f32;

            let mut best_gain = f32::NEG_INFINITY;
            let mut best_threshold = 0f32;
            let mut best_left_counts = vec![0f32; c];
            let mut best_right_counts = vec![0f32; c];
            let mut best_left_weight = 0f32;
            let mut best_right_weight = 0f32;

            for sorted_index in 0..num_datapoints.saturating_sub(1) {
                let i = order[sorted_index];
                let w = sample_weights.get(i);
                let class = class_labels.get(i) as usize;

                left_counts[class] -= w;
                right_counts[class] += w;
                stale[class] = true;
                left_weight -= w;
                right_weight += w;

                if tested.contains(&sorted_index) {
                    for cc in 0..c {
                        if stale[cc] {
                            left_logs[cc] = if left_counts[cc] > 0.0 { left_counts[cc].ln() } else { 0.0 };
                            right_logs[cc] =
                                if right_counts[cc] > 0.0 { right_counts[cc].ln() } else { 0.0 };
                            stale[cc] = false;
                        }
                    }

                    let left_entropy = (left_weight / total_weight) * entropy(&left_counts, &left_logs, left_weight);
                    let right_entropy =
                        (right_weight / total_weight) * entropy(&right_counts, &right_logs, right_weight);
                    let gain = h_start - left_entropy - right_entropy;

                    let j = order[sorted_index + 1];
                    if gain > best_gain && values[i] != values[j] {
                        best_gain = gain;
                        best_threshold = 0.5 * (values[i] + values[j]);
                        best_left_counts.copy_from_slice(&left_counts);
                        best_right_counts.copy_from_slice(&right_counts);
                        best_left_weight = left_weight;
                        best_right_weight = right_weight;
                    }
                }
            }

            impurity.set(f, best_gain);
            threshold.set(f, best_threshold);
            child_counts.set(f, 0, best_left_weight);
            child_counts.set(f, 1, best_right_weight);
            for cc in 0..c {
                left_ys.set(f, cc, best_left_counts[cc]);
                right_ys.set(f, cc, best_right_counts[cc]);
            }
        }

        write.insert(self.impurity_id, impurity);
        write.insert(self.threshold_id, threshold);
        write.insert(self.child_counts_id, child_counts);
        write.insert(self.left_ys_id, left_ys);
        write.insert(self.right_ys_id, right_ys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn make_step(ordering: FeatureValueOrdering) -> (ClassInfoGainBestSplitStep, BufferId, BufferId, BufferId) {
        let feature_values_id = BufferId::fresh();
        let class_labels_id = BufferId::fresh();
        let sample_weights_id = BufferId::fresh();
        let step = ClassInfoGainBestSplitStep::new(
            feature_values_id,
            class_labels_id,
            sample_weights_id,
            ordering,
            1.0,
            1,
            2,
        );
        (step, feature_values_id, class_labels_id, sample_weights_id)
    }

    #[test]
    fn finds_perfect_split_on_separable_feature() {
        let (step, feature_values_id, class_labels_id, sample_weights_id) =
            make_step(FeatureValueOrdering::FeaturesByDatapoints);

        let mut root = BufferCollection::new();
        let mut values = Matrix::<f32>::new(1, 4);
        for (i, v) in [1.0, 2.0, 10.0, 11.0].iter().enumerate() {
            values.set(0, i, *v);
        }
        root.insert(feature_values_id, values);
        root.insert(class_labels_id, Vector::from_vec(vec![0, 0, 1, 1]));
        root.insert(sample_weights_id, Vector::from_vec(vec![1.0, 1.0, 1.0, 1.0]));
        let stack = BufferCollectionStack::new(&root);

        let mut write = BufferCollection::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        step.process(&stack, &mut write, &mut rng);

        let impurity = write.get::<Vector<f32>>(step.impurity_id).unwrap();
        assert!(impurity.get(0) > 0.0);
        let threshold = write.get::<Vector<f32>>(step.threshold_id).unwrap();
        assert_eq!(threshold.get(0), 6.0);

        let left_ys = write.get::<Matrix<f32>>(step.left_ys_id).unwrap();
        let right_ys = write.get::<Matrix<f32>>(step.right_ys_id).unwrap();
        // raw weighted class counts, not yet normalized by child weight
        assert_eq!(left_ys.get(0, 1), 2.0);
        assert_eq!(right_ys.get(0, 0), 2.0);
    }

    #[test]
    fn constant_feature_never_beats_sentinel() {
        let (step, feature_values_id, class_labels_id, sample_weights_id) =
            make_step(FeatureValueOrdering::FeaturesByDatapoints);

        let mut root = BufferCollection::new();
        let values = Matrix::<f32>::filled(1, 4, 5.0);
        root.insert(feature_values_id, values);
        root.insert(class_labels_id, Vector::from_vec(vec![0, 1, 0, 1]));
        root.insert(sample_weights_id, Vector::from_vec(vec![1.0, 1.0, 1.0, 1.0]));
        let stack = BufferCollectionStack::new(&root);

        let mut write = BufferCollection::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        step.process(&stack, &mut write, &mut rng);

        let impurity = write.get::<Vector<f32>>(step.impurity_id).unwrap();
        assert_eq!(impurity.get(0), f32::NEG_INFINITY);
    }
}
