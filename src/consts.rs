//! Sentinels and fixed column offsets shared across the tree, feature, and
//! split-selector modules. Centralized here so the magic numbers that show
//! up in `DESIGN.md`'s worked example all trace back to one place.

/// Marks an unlinked tree child: the node is a leaf on that side.
pub const NULL_CHILD: i32 = -1;

/// Returned by a split selector when no bundle produced an acceptable split.
pub const SPLIT_SELECTOR_NO_SPLIT: i32 = -1;

pub const SPLITPOINT_INDEX: usize = 0;
pub const LEFT_CHILD_INDEX: usize = 0;
pub const RIGHT_CHILD_INDEX: usize = 1;

/// Layout of a feature-parameter row: type tag, dimensionality, then one
/// column per selected data dimension.
pub const FEATURE_TYPE_INDEX: usize = 0;
pub const NUMBER_OF_DIMENSIONS_INDEX: usize = FEATURE_TYPE_INDEX + 1;
pub const PARAM_START_INDEX: usize = NUMBER_OF_DIMENSIONS_INDEX + 1;

/// Feature-type tag for linear-combination-of-columns ("matrix") features,
/// the only feature family this engine generates today.
pub const MATRIX_FEATURES: i32 = 1;
