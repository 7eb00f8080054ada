//! The seam between the engine and a compute device
//!
//! A [`ComputeDevice`] hands out at most one [`ComputeContext`] per multiply
//! call. The context owns the queue and every device object created through
//! it; the session decides when each one is released.

use std::fmt;

use aligned_vec::AVec;

use crate::constants::STAGING_ALIGNMENT;
use crate::device::kernel::{KernelParams, KernelSpec};
use crate::device::work_size::LaunchShape;
use crate::error::{Result, SpGemmError};
use crate::matrix::EngineConfig;

/// Element type of a staging block or device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// 32-bit signed integers (indices, counters)
    Int,
    /// 32-bit floats (values)
    Float,
}

/// How a kernel touches a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Input,
    Output,
    InputOutput,
}

impl BufferUsage {
    pub fn is_read_only(&self) -> bool {
        matches!(self, BufferUsage::Input)
    }
}

/// Host staging block backing a device buffer
///
/// Blocks are cache-line aligned so a backend may map them directly instead
/// of copying. Device indices are 32-bit.
pub enum HostData {
    Int(AVec<i32>),
    Float(AVec<f32>),
}

impl HostData {
    /// Narrows host indices to device integers
    pub fn from_indices(indices: &[usize]) -> Result<Self> {
        let mut block = AVec::with_capacity(STAGING_ALIGNMENT, indices.len());
        for &index in indices {
            let narrowed = i32::try_from(index).map_err(|_| SpGemmError::IndexOverflow { value: index })?;
            block.push(narrowed);
        }
        Ok(HostData::Int(block))
    }

    pub fn from_values(values: &[f32]) -> Self {
        HostData::Float(AVec::from_slice(STAGING_ALIGNMENT, values))
    }

    /// Zero-filled block of `len` elements
    pub fn zeroed(kind: ElementKind, len: usize) -> Self {
        match kind {
            ElementKind::Int => HostData::Int(AVec::from_iter(STAGING_ALIGNMENT, (0..len).map(|_| 0i32))),
            ElementKind::Float => {
                HostData::Float(AVec::from_iter(STAGING_ALIGNMENT, (0..len).map(|_| 0.0f32)))
            }
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            HostData::Int(_) => ElementKind::Int,
            HostData::Float(_) => ElementKind::Float,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostData::Int(data) => data.len(),
            HostData::Float(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the block in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            HostData::Int(data) => data.len() * std::mem::size_of::<i32>(),
            HostData::Float(data) => data.len() * std::mem::size_of::<f32>(),
        }
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            HostData::Int(data) => Some(data),
            HostData::Float(_) => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            HostData::Float(data) => Some(data),
            HostData::Int(_) => None,
        }
    }

    pub fn as_ints_mut(&mut self) -> Option<&mut [i32]> {
        match self {
            HostData::Int(data) => Some(data),
            HostData::Float(_) => None,
        }
    }

    pub fn as_floats_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            HostData::Float(data) => Some(data),
            HostData::Int(_) => None,
        }
    }

    /// Copies `other` into this block; kinds and lengths must agree
    pub fn copy_from(&mut self, other: &HostData) -> Result<()> {
        match (self, other) {
            (HostData::Int(dst), HostData::Int(src)) if dst.len() == src.len() => {
                dst.copy_from_slice(src);
                Ok(())
            }
            (HostData::Float(dst), HostData::Float(src)) if dst.len() == src.len() => {
                dst.copy_from_slice(src);
                Ok(())
            }
            (dst, src) => Err(SpGemmError::Dispatch(format!(
                "read-back mismatch: {:?}[{}] into {:?}[{}]",
                src.kind(),
                src.len(),
                dst.kind(),
                dst.len()
            ))),
        }
    }

    /// Independent copy with the same alignment
    pub fn duplicate(&self) -> Self {
        match self {
            HostData::Int(data) => HostData::Int(AVec::from_slice(STAGING_ALIGNMENT, data)),
            HostData::Float(data) => HostData::Float(AVec::from_slice(STAGING_ALIGNMENT, data)),
        }
    }
}

impl fmt::Debug for HostData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostData({:?}; {})", self.kind(), self.len())
    }
}

/// Something that can open a compute context
pub trait ComputeDevice {
    type Context: ComputeContext;

    /// Opens a context honouring the device-selection flags, `None` when no
    /// acceptable device exists
    fn create_context(&self, config: &EngineConfig) -> Option<Self::Context>;
}

/// A live context with one in-order queue
pub trait ComputeContext {
    type Buffer;
    type Program;

    fn device_name(&self) -> String;

    /// Smallest work-group bound across the context's devices
    fn max_work_group_size(&self) -> usize;

    /// Creates a device buffer initialised from (or mapped onto) `data`
    ///
    /// With `use_device_memory` false the backend may keep a pointer into
    /// `data`, which must then outlive the returned buffer.
    fn create_buffer(
        &mut self,
        name: &str,
        data: &mut HostData,
        usage: BufferUsage,
        use_device_memory: bool,
    ) -> Result<Self::Buffer>;

    /// Compiles the program containing `spec`'s entry point
    fn build_program(&mut self, spec: &KernelSpec, params: &KernelParams) -> Result<Self::Program>;

    /// Enqueues one launch with `args` bound in order
    fn dispatch(&mut self, program: &Self::Program, args: &[&Self::Buffer], shape: &LaunchShape) -> Result<()>;

    /// Waits for outstanding work and copies `buffer` into `out`
    fn read_buffer(&mut self, buffer: &Self::Buffer, out: &mut HostData) -> Result<()>;

    /// Submits and drains the queue
    fn flush(&mut self);

    fn release_program(&mut self, program: Self::Program);

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Releases the queue and the context itself
    fn release(self);
}
