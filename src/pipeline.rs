//! The pipeline abstraction: a [`PipelineStep`] announces the [`BufferId`]s
//! it will write at construction time, then `process`es by reading a
//! [`BufferCollectionStack`] and writing into a fresh [`BufferCollection`].
//! A [`Pipeline`] is just an ordered list of steps run in sequence; cloning
//! one deep-clones every step so each worker thread gets its own
//! independent copy of the graph (and of any step-local RNG state).

use rand::RngCore;

use crate::buffer::Vector;
use crate::collection::{BufferCollection, BufferCollectionStack};
use crate::ids::BufferId;

pub trait PipelineStep: Send + Sync {
    fn clone_box(&self) -> Box<dyn PipelineStep>;

    fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        rng: &mut dyn RngCore,
    );
}

impl Clone for Box<dyn PipelineStep> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An ordered list of steps executed in sequence, each writing into the same
/// output collection that later steps (and the pipeline's own caller) may
/// read from via the stack.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn PipelineStep>>) -> Self {
        Pipeline { steps }
    }

    pub fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        rng: &mut dyn RngCore,
    ) {
        for step in &self.steps {
            step.process(read, write, rng);
        }
    }
}

impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline { steps: self.steps.iter().map(|s| s.clone_box()).collect() }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SetRule {
    /// Write the buffer only if it isn't already present in the write
    /// collection.
    WhenNew,
    /// Write the buffer on every invocation, overwriting whatever was there.
    EveryProcess,
}

/// Publishes a fixed buffer value into the write collection. Used for
/// configuration constants (how many features to try per node, and the
/// like) that every tree shares but that still need to flow through the
/// same buffer-lookup machinery as computed values.
pub struct SetBufferStep<T> {
    pub output_id: BufferId,
    buffer: T,
    rule: SetRule,
}

impl<T: Clone> SetBufferStep<T> {
    pub fn new(buffer: T, rule: SetRule) -> Self {
        SetBufferStep { output_id: BufferId::fresh(), buffer, rule }
    }
}

impl<T> PipelineStep for SetBufferStep<T>
where
    T: crate::collection::BufferKind,
{
    fn clone_box(&self) -> Box<dyn PipelineStep> {
        Box::new(SetBufferStep {
            output_id: self.output_id,
            buffer: self.buffer.clone(),
            rule: self.rule,
        })
    }

    fn process(
        &self,
        _read: &BufferCollectionStack,
        write: &mut BufferCollection,
        _rng: &mut dyn RngCore,
    ) {
        if self.rule == SetRule::EveryProcess || !write.has::<T>(self.output_id) {
            write.insert(self.output_id, self.buffer.clone());
        }
    }
}

/// Publishes the full sample set as a 0..n indices vector and a
/// uniform-weight vector, both sized to the data matrix's row count. This
/// is the tree-level step that seeds what later node-level steps slice
/// down as recursion descends.
#[derive(Clone, Copy)]
pub struct AllSamplesStep {
    pub indices_id: BufferId,
    pub weights_id: BufferId,
    data_id: BufferId,
}

impl AllSamplesStep {
    pub fn new(data_id: BufferId) -> Self {
        AllSamplesStep { indices_id: BufferId::fresh(), weights_id: BufferId::fresh(), data_id }
    }
}

impl PipelineStep for AllSamplesStep {
    fn clone_box(&self) -> Box<dyn PipelineStep> {
        Box::new(*self)
    }

    fn process(
        &self,
        read: &BufferCollectionStack,
        write: &mut BufferCollection,
        _rng: &mut dyn RngCore,
    ) {
        let data = read.require::<crate::buffer::Matrix<f32>>(self.data_id);
        let n = data.rows();

        let mut indices = Vector::<i32>::new(n);
        let mut weights = Vector::<f32>::new(n);
        for i in 0..n {
            indices.set(i, i as i32);
            weights.set(i, 1.0);
        }
        write.insert(self.indices_id, indices);
        write.insert(self.weights_id, weights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Matrix;
    use rand::SeedableRng;

    #[test]
    fn set_buffer_step_when_new_does_not_overwrite() {
        let step = SetBufferStep::new(Vector::<i32>::filled(1, 5), SetRule::WhenNew);
        let root = BufferCollection::new();
        let stack = BufferCollectionStack::new(&root);
        let mut write = BufferCollection::new();
        write.insert(step.output_id, Vector::<i32>::filled(1, 99));

        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        step.process(&stack, &mut write, &mut rng);

        assert_eq!(write.get::<Vector<i32>>(step.output_id).unwrap().get(0), 99);
    }

    #[test]
    fn all_samples_step_covers_every_row() {
        let data_id = BufferId::fresh();
        let mut root = BufferCollection::new();
        root.insert(data_id, Matrix::<f32>::new(4, 2));
        let stack = BufferCollectionStack::new(&root);

        let step = AllSamplesStep::new(data_id);
        let mut write = BufferCollection::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        step.process(&stack, &mut write, &mut rng);

        let indices = write.get::<Vector<i32>>(step.indices_id).unwrap();
        let weights = write.get::<Vector<f32>>(step.weights_id).unwrap();
        assert_eq!(indices.len(), 4);
        for i in 0..4 {
            assert_eq!(indices.get(i), i as i32);
            assert_eq!(weights.get(i), 1.0);
        }
    }
}
