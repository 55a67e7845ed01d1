//! Compute-backend abstraction: typed device buffers with scoped write
//! mapping.
//!
//! A mapping borrows its buffer mutably and releases on drop, so two
//! outstanding maps of one buffer cannot exist and every write completes
//! before the unmap. [`HostBackend`] is the reference implementation used by
//! the tests; device implementations live in their own crates.

use std::ops::DerefMut;

use bytemuck::Pod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("compute backend initialization failed: {0}")]
    Init(String),
    #[error("buffer allocation of {len} elements failed: {reason}")]
    Allocation { len: usize, reason: String },
    #[error("buffer map failed: {0}")]
    Map(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    ReadOnly,
    ReadWrite,
}

pub trait ComputeBackend {
    type Buffer<T: Pod>;
    type Mapping<'a, T>: DerefMut<Target = [T]>
    where
        Self: 'a,
        T: Pod + 'a;

    fn create_buffer<T: Pod>(
        &self,
        len: usize,
        usage: BufferUsage,
    ) -> Result<Self::Buffer<T>, ComputeError>;

    /// Allocated element capacity of the buffer.
    fn capacity<T: Pod>(&self, buffer: &Self::Buffer<T>) -> usize;

    /// Maps the buffer for writing. The mapping unmaps when dropped.
    fn map_write<'a, T: Pod + 'a>(
        &'a self,
        buffer: &'a mut Self::Buffer<T>,
    ) -> Result<Self::Mapping<'a, T>, ComputeError>;
}

/// Host-memory backend: the reference implementation, also used by tests to
/// inspect serialized buffer contents.
#[derive(Debug, Default)]
pub struct HostBackend;

#[derive(Debug)]
pub struct HostBuffer<T> {
    data: Vec<T>,
    writes: u32,
}

impl<T: Pod> HostBuffer<T> {
    pub fn contents(&self) -> &[T] {
        &self.data
    }

    /// Number of write mappings taken against this buffer.
    pub fn write_count(&self) -> u32 {
        self.writes
    }
}

impl ComputeBackend for HostBackend {
    type Buffer<T: Pod> = HostBuffer<T>;
    type Mapping<'a, T>
        = &'a mut [T]
    where
        Self: 'a,
        T: Pod + 'a;

    fn create_buffer<T: Pod>(
        &self,
        len: usize,
        _usage: BufferUsage,
    ) -> Result<HostBuffer<T>, ComputeError> {
        Ok(HostBuffer {
            data: vec![T::zeroed(); len],
            writes: 0,
        })
    }

    fn capacity<T: Pod>(&self, buffer: &HostBuffer<T>) -> usize {
        buffer.data.len()
    }

    fn map_write<'a, T: Pod + 'a>(
        &'a self,
        buffer: &'a mut HostBuffer<T>,
    ) -> Result<&'a mut [T], ComputeError> {
        buffer.writes += 1;
        Ok(&mut buffer.data)
    }
}
