//! OpenCL implementation of the compute backend.
//!
//! Buffers are device allocations; a write mapping hands out a host staging
//! vector and uploads it with a blocking `enqueue_write_buffer` when the
//! mapping drops, completing the scoped map/unmap protocol.

use std::ops::{Deref, DerefMut};
use std::ptr::null_mut;

use bytemuck::Pod;
use cl3::ext::{CL_DEVICE_TYPE_GPU, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_TRUE};
use log::{debug, error};
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::Device;
use opencl3::memory::Buffer;
use opencl3::platform::Platform;

use scene_compiler::compute::{BufferUsage, ComputeBackend, ComputeError};

/// Compute backend over the first GPU device of the first OpenCL platform.
pub struct ClCompute {
    device: Device,
    context: Context,
    queue: CommandQueue,
}

fn init_error(what: &str, err: impl std::fmt::Display) -> ComputeError {
    ComputeError::Init(format!("{what}: {err}"))
}

impl ClCompute {
    pub fn new() -> Result<ClCompute, ComputeError> {
        let platform_ids = cl3::platform::get_platform_ids()
            .map_err(|err| init_error("unable to get platform ids", err))?;
        let platform_id = *platform_ids
            .first()
            .ok_or_else(|| ComputeError::Init("no OpenCL platform present".into()))?;
        let platform = Platform::new(platform_id);

        let device_ids = platform
            .get_devices(CL_DEVICE_TYPE_GPU)
            .map_err(|err| init_error("unable to get device ids", err))?;
        let device_id = *device_ids
            .first()
            .ok_or_else(|| ComputeError::Init("no GPU device present".into()))?;
        let device = Device::new(device_id);

        let context = Context::from_device(&device)
            .map_err(|err| init_error("unable to create context", err))?;
        let queue = CommandQueue::create_default_with_properties(&context, 0, 0)
            .map_err(|err| init_error("unable to create command queue", err))?;

        debug!("opencl compute backend on {}", device.name().unwrap_or_default());

        Ok(ClCompute {
            device,
            context,
            queue,
        })
    }

    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_default()
    }
}

pub struct ClBuffer<T> {
    buffer: Buffer<T>,
    len: usize,
}

/// Host staging for one mapped buffer; uploads on drop.
pub struct ClMapping<'a, T: Pod> {
    queue: &'a CommandQueue,
    buffer: &'a mut Buffer<T>,
    staging: Vec<T>,
}

impl<T: Pod> Deref for ClMapping<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.staging
    }
}

impl<T: Pod> DerefMut for ClMapping<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.staging
    }
}

impl<T: Pod> Drop for ClMapping<'_, T> {
    fn drop(&mut self) {
        let result = unsafe {
            self.queue
                .enqueue_write_buffer(self.buffer, CL_TRUE, 0, &self.staging, &[])
        };
        if let Err(err) = result {
            error!("buffer upload on unmap failed: {err}");
        }
    }
}

impl ComputeBackend for ClCompute {
    type Buffer<T: Pod> = ClBuffer<T>;
    type Mapping<'a, T>
        = ClMapping<'a, T>
    where
        Self: 'a,
        T: Pod + 'a;

    fn create_buffer<T: Pod>(
        &self,
        len: usize,
        usage: BufferUsage,
    ) -> Result<ClBuffer<T>, ComputeError> {
        let flags = match usage {
            BufferUsage::ReadOnly => CL_MEM_READ_ONLY,
            BufferUsage::ReadWrite => CL_MEM_READ_WRITE,
        };
        // Zero-sized allocations are invalid in OpenCL; keep a one-element
        // floor.
        let buffer = unsafe { Buffer::create(&self.context, flags, len.max(1), null_mut()) }
            .map_err(|err| ComputeError::Allocation {
                len,
                reason: err.to_string(),
            })?;
        Ok(ClBuffer { buffer, len })
    }

    fn capacity<T: Pod>(&self, buffer: &ClBuffer<T>) -> usize {
        buffer.len
    }

    fn map_write<'a, T: Pod + 'a>(
        &'a self,
        buffer: &'a mut ClBuffer<T>,
    ) -> Result<ClMapping<'a, T>, ComputeError> {
        Ok(ClMapping {
            queue: &self.queue,
            buffer: &mut buffer.buffer,
            staging: vec![T::zeroed(); buffer.len],
        })
    }
}
