//! Feature generation: picking which data columns a node's candidate splits
//! look at, and evaluating the resulting linear-combination feature values.

use rand::RngCore;

use crate::buffer::Matrix;
use crate::collection::{BufferCollection, BufferCollectionStack};
use crate::consts::{FEATURE_TYPE_INDEX, MATRIX_FEATURES, NUMBER_OF_DIMENSIONS_INDEX, PARAM_START_INDEX};
use crate::ids::BufferId;
use crate::pipeline::PipelineStep;

/// Layout the scorer and the tree both need to agree on: does a feature
/// matrix run features-by-datapoints (one row per feature) or
/// datapoints-by-features (one row per sample)?
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeatureValueOrdering {
    FeaturesByDatapoints,
    DatapointsByFeatures,
}

/// Draws, for each of `numberOfFeaturesPerNode` candidate features, a
/// single random data column (sampled without replacement across the
/// node's candidates) with coefficient 1.0 — i.e. an axis-aligned feature.
/// Reads `numberOfFeaturesId` (a length-1 int vector holding K) and the data
/// matrix (to learn its column count D), and writes int/float parameter
/// rows in the layout [`FEATURE_TYPE_INDEX`], [`NUMBER_OF_DIMENSIONS_INDEX`],
/// then `NUMBER_OF_DIMENSIONS_INDEX` param columns starting at
/// [`PARAM_START_INDEX`].
pub struct AxisAlignedParamsStep {
    pub int_params_id: BufferId,
    pub float_params_id: BufferId,
    number_of_features_id: BufferId,
    data_id: BufferId,
}

impl AxisAlignedParamsStep {
    pub fn new(number_of_features_id: BufferId, data_id: BufferId) -> Self {
        AxisAlignedParamsStep {
            int_params_id: BufferId::fresh(),
            float_params_id: BufferId::fresh(),
            number_of_features_id,
            data_id,
        }
    }
}

impl PipelineStep for AxisAlignedParamsStep {
    fn clone_box(&self) -> Box<dyn PipelineStep> {
        Box::new(AxisAlignedParamsStep {
            int_params_id: self.int_params_id,
            float_params_id: self.float_params_id,
            number_of_features_id: self.number_of_features_id,
            data_id: self.data_id,
        })
    }

    fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        rng: &mut dyn RngCore,
    ) {
        let k = read
            .require::<crate::buffer::Vector<i32>>(self.number_of_features_id)
            .get(0) as usize;
        let data = read.require::<Matrix<f32>>(self.data_id);
        let d = data.cols();
        assert!(k <= d, "numberOfFeaturesPerNode ({k}) exceeds data dimensionality ({d})");

        let dims = rand::seq::index::sample(rng, d, k);

        let mut int_params = Matrix::<i32>::new(k, PARAM_START_INDEX + 1);
        let mut float_params = Matrix::<f32>::new(k, PARAM_START_INDEX + 1);
        for (row, dim) in dims.into_iter().enumerate() {
            int_params.set(row, FEATURE_TYPE_INDEX, MATRIX_FEATURES);
            int_params.set(row, NUMBER_OF_DIMENSIONS_INDEX, 1);
            int_params.set(row, PARAM_START_INDEX, dim as i32);
            float_params.set(row, PARAM_START_INDEX, 1.0);
        }

        write.insert(self.int_params_id, int_params);
        write.insert(self.float_params_id, float_params);
    }
}

/// A weighted linear combination of selected data-matrix columns. Holds the
/// ids of its own parameters plus the sample indices and data matrix it
/// reads values from; [`FeatureExtractorStep`] is the pipeline step that
/// materializes its output into a buffer.
#[derive(Clone, Copy)]
pub struct LinearMatrixFeature {
    pub float_params_id: BufferId,
    pub int_params_id: BufferId,
    pub indices_id: BufferId,
    pub data_id: BufferId,
}

impl LinearMatrixFeature {
    pub fn new(
        float_params_id: BufferId,
        int_params_id: BufferId,
        indices_id: BufferId,
        data_id: BufferId,
    ) -> Self {
        LinearMatrixFeature { float_params_id, int_params_id, indices_id, data_id }
    }

    fn value(
        &self,
        int_params: &Matrix<i32>,
        float_params: &Matrix<f32>,
        indices: &crate::buffer::Vector<i32>,
        data: &Matrix<f32>,
        feature_index: usize,
        relative_sample_index: usize,
    ) -> f32 {
        let number_of_dimensions = int_params.get(feature_index, NUMBER_OF_DIMENSIONS_INDEX) as usize;
        let sample_index = indices.get(relative_sample_index) as usize;
        let mut value = 0.0f32;
        for i in PARAM_START_INDEX..PARAM_START_INDEX + number_of_dimensions {
            let dimension = int_params.get(feature_index, i) as usize;
            value += float_params.get(feature_index, i) * data.get(sample_index, dimension);
        }
        value
    }
}

/// Materializes a [`LinearMatrixFeature`]'s values over every (feature,
/// sample) pair into a single matrix, laid out per `ordering`.
pub struct FeatureExtractorStep {
    pub feature_values_id: BufferId,
    feature: LinearMatrixFeature,
    ordering: FeatureValueOrdering,
}

impl FeatureExtractorStep {
    pub fn new(feature: LinearMatrixFeature, ordering: FeatureValueOrdering) -> Self {
        FeatureExtractorStep { feature_values_id: BufferId::fresh(), feature, ordering }
    }
}

impl PipelineStep for FeatureExtractorStep {
    fn clone_box(&self) -> Box<dyn PipelineStep> {
        Box::new(FeatureExtractorStep {
            feature_values_id: self.feature_values_id,
            feature: self.feature,
            ordering: self.ordering,
        })
    }

    fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        _rng: &mut dyn RngCore,
    ) {
        let int_params = read.require::<Matrix<i32>>(self.feature.int_params_id);
        let float_params = read.require::<Matrix<f32>>(self.feature.float_params_id);
        let indices = read.require::<crate::buffer::Vector<i32>>(self.feature.indices_id);
        let data = read.require::<Matrix<f32>>(self.feature.data_id);

        let num_features = int_params.rows();
        let num_datapoints = indices.len();

        let (rows, cols) = match self.ordering {
            FeatureValueOrdering::FeaturesByDatapoints => (num_features, num_datapoints),
            FeatureValueOrdering::DatapointsByFeatures => (num_datapoints, num_features),
        };
        let mut values = Matrix::<f32>::new(rows, cols);

        for f in 0..num_features {
            for s in 0..num_datapoints {
                let v = self.feature.value(int_params, float_params, indices, data, f, s);
                match self.ordering {
                    FeatureValueOrdering::FeaturesByDatapoints => values.set(f, s, v),
                    FeatureValueOrdering::DatapointsByFeatures => values.set(s, f, v),
                }
            }
        }

        write.insert(self.feature_values_id, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Vector;
    use rand::SeedableRng;

    #[test]
    fn axis_aligned_params_step_picks_k_distinct_columns() {
        let data_id = BufferId::fresh();
        let k_id = BufferId::fresh();
        let mut root = BufferCollection::new();
        root.insert(data_id, Matrix::<f32>::new(5, 4));
        root.insert(k_id, Vector::<i32>::filled(1, 3));
        let stack = BufferCollectionStack::new(&root);

        let step = AxisAlignedParamsStep::new(k_id, data_id);
        let mut write = BufferCollection::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        step.process(&stack, &mut write, &mut rng);

        let int_params = write.get::<Matrix<i32>>(step.int_params_id).unwrap();
        assert_eq!(int_params.rows(), 3);
        let mut dims: Vec<i32> = (0..3).map(|r| int_params.get(r, PARAM_START_INDEX)).collect();
        dims.sort_unstable();
        dims.dedup();
        assert_eq!(dims.len(), 3, "dimensions must be sampled without replacement");
        for r in 0..3 {
            assert_eq!(int_params.get(r, FEATURE_TYPE_INDEX), MATRIX_FEATURES);
            assert_eq!(int_params.get(r, NUMBER_OF_DIMENSIONS_INDEX), 1);
        }
    }

    #[test]
    fn feature_extractor_computes_weighted_sum() {
        let data_id = BufferId::fresh();
        let indices_id = BufferId::fresh();
        let int_params_id = BufferId::fresh();
        let float_params_id = BufferId::fresh();

        let mut root = BufferCollection::new();
        let mut data = Matrix::<f32>::new(2, 2);
        data.set(0, 0, 1.0);
        data.set(0, 1, 2.0);
        data.set(1, 0, 3.0);
        data.set(1, 1, 4.0);
        root.insert(data_id, data);
        root.insert(indices_id, Vector::from_vec(vec![0, 1]));

        let mut int_params = Matrix::<i32>::new(1, PARAM_START_INDEX + 1);
        int_params.set(0, NUMBER_OF_DIMENSIONS_INDEX, 1);
        int_params.set(0, PARAM_START_INDEX, 1); // column 1
        root.insert(int_params_id, int_params);

        let mut float_params = Matrix::<f32>::new(1, PARAM_START_INDEX + 1);
        float_params.set(0, PARAM_START_INDEX, 2.0);
        root.insert(float_params_id, float_params);

        let stack = BufferCollectionStack::new(&root);
        let feature = LinearMatrixFeature::new(float_params_id, int_params_id, indices_id, data_id);
        let step = FeatureExtractorStep::new(feature, FeatureValueOrdering::FeaturesByDatapoints);
        let mut write = BufferCollection::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        step.process(&stack, &mut write, &mut rng);

        let values = write.get::<Matrix<f32>>(step.feature_values_id).unwrap();
        assert_eq!(values.get(0, 0), 4.0); // 2.0 * data[0][1]
        assert_eq!(values.get(0, 1), 8.0); // 2.0 * data[1][1]
    }
}
