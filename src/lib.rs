//! A decision-forest classification learning engine built from a
//! composable buffer/pipeline architecture: typed buffer collections feed a
//! chain of steps that generate candidate features, score class-information
//! gain across thresholds, and select the winning split, all driven by a
//! depth-first tree grower and a parallel forest learner on top.

mod buffer;
mod collection;
mod config;
mod consts;
mod criteria;
mod error;
mod features;
mod forest;
mod ids;
mod learner;
mod pipeline;
mod rng;
mod slice;
mod split;
mod split_selector;
mod tree;

pub use buffer::{Matrix, Tensor3, Vector};
pub use collection::{BufferCollection, BufferCollectionStack, BufferKind};
pub use config::{ClassificationForestLearner, ForestConfig};
pub use consts::{
    FEATURE_TYPE_INDEX, LEFT_CHILD_INDEX, MATRIX_FEATURES, NULL_CHILD, NUMBER_OF_DIMENSIONS_INDEX,
    PARAM_START_INDEX, RIGHT_CHILD_INDEX, SPLITPOINT_INDEX, SPLIT_SELECTOR_NO_SPLIT,
};
pub use criteria::{
    CombinedShouldSplitCriteria, MinChildSizeCriteria, MinImpurityCriteria, MinNodeSizeCriteria,
    ShouldSplitCriteria, ShouldSplitNoCriteria, TrySplitCriteria, TrySplitNoCriteria,
};
pub use error::ForesterError;
pub use features::{AxisAlignedParamsStep, FeatureExtractorStep, FeatureValueOrdering, LinearMatrixFeature};
pub use forest::{Forest, ParallelForestLearner};
pub use ids::BufferId;
pub use learner::DepthFirstTreeLearner;
pub use pipeline::{AllSamplesStep, Pipeline, PipelineStep, SetBufferStep, SetRule};
pub use slice::{Sliceable, SliceBufferStep};
pub use split::ClassInfoGainBestSplitStep;
pub use split_selector::{ClassEstimatorFinalizer, Finalizer, SplitSelector, SplitSelectorBuffers, SplitSelectorInfo};
pub use tree::{ForestStats, Tree};
