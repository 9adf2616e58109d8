//! [`BufferCollection`]: a heterogeneous map from [`BufferId`] to typed
//! buffer, partitioned by element/rank type so lookups stay monomorphized
//! instead of going through a boxed `dyn Any`. [`BufferCollectionStack`]
//! layers collections so a child scope reads through to its parent without
//! copying or mutating it — the mechanism that gives recursive tree growth
//! parent/child isolation.

use std::collections::HashMap;

use crate::buffer::{Matrix, Tensor3, Vector};
use crate::ids::BufferId;

#[derive(Default)]
pub struct BufferCollection {
    float_vectors: HashMap<BufferId, Vector<f32>>,
    int_vectors: HashMap<BufferId, Vector<i32>>,
    float_matrices: HashMap<BufferId, Matrix<f32>>,
    int_matrices: HashMap<BufferId, Matrix<i32>>,
    float_tensors: HashMap<BufferId, Tensor3<f32>>,
    int_tensors: HashMap<BufferId, Tensor3<i32>>,
}

/// Implemented for each of the six concrete buffer types a collection can
/// hold, routing generic `insert`/`get` calls to the right backing map.
pub trait BufferKind: Clone + Send + Sync + 'static {
    fn table(collection: &BufferCollection) -> &HashMap<BufferId, Self>;
    fn table_mut(collection: &mut BufferCollection) -> &mut HashMap<BufferId, Self>;
}

macro_rules! impl_buffer_kind {
    ($ty:ty, $field:ident) => {
        impl BufferKind for $ty {
            fn table(collection: &BufferCollection) -> &HashMap<BufferId, Self> {
                &collection.$field
            }
            fn table_mut(collection: &mut BufferCollection) -> &mut HashMap<BufferId, Self> {
                &mut collection.$field
            }
        }
    };
}

impl_buffer_kind!(Vector<f32>, float_vectors);
impl_buffer_kind!(Vector<i32>, int_vectors);
impl_buffer_kind!(Matrix<f32>, float_matrices);
impl_buffer_kind!(Matrix<i32>, int_matrices);
impl_buffer_kind!(Tensor3<f32>, float_tensors);
impl_buffer_kind!(Tensor3<i32>, int_tensors);

impl BufferCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: BufferKind>(&mut self, id: BufferId, value: T) {
        T::table_mut(self).insert(id, value);
    }

    pub fn get<T: BufferKind>(&self, id: BufferId) -> Option<&T> {
        T::table(self).get(&id)
    }

    pub fn has<T: BufferKind>(&self, id: BufferId) -> bool {
        T::table(self).contains_key(&id)
    }
}

/// A read-through stack of borrowed collections: `get` scans from the top
/// (most recently pushed frame) down to the root, returning the first hit.
/// Pushing returns a new, shorter-lived stack value rather than mutating in
/// place, so a frame a recursive call pushes is automatically "popped"
/// again when that call's stack value goes out of scope.
pub struct BufferCollectionStack<'a> {
    frames: Vec<&'a BufferCollection>,
}

impl<'a> BufferCollectionStack<'a> {
    pub fn new(base: &'a BufferCollection) -> Self {
        Self { frames: vec![base] }
    }

    pub fn push<'b>(&'b self, frame: &'b BufferCollection) -> BufferCollectionStack<'b>
    where
        'a: 'b,
    {
        let mut frames: Vec<&'b BufferCollection> = self.frames.iter().copied().collect();
        frames.push(frame);
        BufferCollectionStack { frames }
    }

    pub fn get<T: BufferKind>(&self, id: BufferId) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get::<T>(id))
    }

    pub fn require<T: BufferKind>(&self, id: BufferId) -> &T {
        self.get(id).expect("required buffer missing from stack")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut c = BufferCollection::new();
        let id = BufferId::fresh();
        c.insert(id, Vector::<f32>::filled(3, 1.0));
        assert!(c.has::<Vector<f32>>(id));
        assert_eq!(c.get::<Vector<f32>>(id).unwrap().get(0), 1.0);
    }

    #[test]
    fn stack_reads_through_to_parent() {
        let mut root = BufferCollection::new();
        let id = BufferId::fresh();
        root.insert(id, Vector::<i32>::filled(2, 7));

        let stack0 = BufferCollectionStack::new(&root);
        let child = BufferCollection::new();
        let stack1 = stack0.push(&child);

        assert_eq!(stack1.require::<Vector<i32>>(id).get(0), 7);
    }

    #[test]
    fn stack_top_frame_shadows_parent() {
        let mut root = BufferCollection::new();
        let id = BufferId::fresh();
        root.insert(id, Vector::<i32>::filled(2, 1));

        let stack0 = BufferCollectionStack::new(&root);
        let mut child = BufferCollection::new();
        child.insert(id, Vector::<i32>::filled(2, 99));
        let stack1 = stack0.push(&child);

        assert_eq!(stack1.require::<Vector<i32>>(id).get(0), 99);
    }
}
