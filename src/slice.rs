//! [`SliceBufferStep`]: gathers a source vector by an indices vector. Used
//! to restrict the full class-label and sample-weight vectors down to the
//! sample subset reaching the current node.

use std::marker::PhantomData;

use rand::RngCore;

use crate::buffer::Vector;
use crate::collection::{BufferCollection, BufferCollectionStack};
use crate::ids::BufferId;
use crate::pipeline::PipelineStep;

pub trait Sliceable: crate::collection::BufferKind {
    fn gather(&self, indices: &Vector<i32>) -> Self;
}

impl Sliceable for Vector<f32> {
    fn gather(&self, indices: &Vector<i32>) -> Self {
        let mut out = Vector::new(indices.len());
        for i in 0..indices.len() {
            out.set(i, self.get(indices.get(i) as usize));
        }
        out
    }
}

impl Sliceable for Vector<i32> {
    fn gather(&self, indices: &Vector<i32>) -> Self {
        let mut out = Vector::new(indices.len());
        for i in 0..indices.len() {
            out.set(i, self.get(indices.get(i) as usize));
        }
        out
    }
}

pub struct SliceBufferStep<T: Sliceable> {
    pub sliced_id: BufferId,
    source_id: BufferId,
    indices_id: BufferId,
    _marker: PhantomData<T>,
}

impl<T: Sliceable> SliceBufferStep<T> {
    pub fn new(source_id: BufferId, indices_id: BufferId) -> Self {
        SliceBufferStep { sliced_id: BufferId::fresh(), source_id, indices_id, _marker: PhantomData }
    }
}

impl<T: Sliceable> PipelineStep for SliceBufferStep<T> {
    fn clone_box(&self) -> Box<dyn PipelineStep> {
        Box::new(SliceBufferStep::<T> {
            sliced_id: self.sliced_id,
            source_id: self.source_id,
            indices_id: self.indices_id,
            _marker: PhantomData,
        })
    }

    fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        _rng: &mut dyn RngCore,
    ) {
        let source = read.require::<T>(self.source_id);
        let indices = read.require::<Vector<i32>>(self.indices_id);
        let sliced = source.gather(indices);
        write.insert(self.sliced_id, sliced);
    }
}
