//! OpenCL backend
//!
//! Opens one context and in-order queue on the first usable platform device,
//! GPUs only unless discrete-GPU selection is turned off. Launches are
//! asynchronous; reads wait on the most recent dispatch event.

use std::ffi::c_void;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{get_all_devices, Device, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_GPU};
use opencl3::event::Event;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{
    Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_USE_HOST_PTR,
    CL_MEM_WRITE_ONLY,
};
use opencl3::program::Program;
use opencl3::types::{cl_event, cl_float, cl_int, cl_mem_flags, CL_BLOCKING};
use tracing::{debug, warn};

use crate::device::backend::{BufferUsage, ComputeContext, ComputeDevice, HostData};
use crate::device::kernel::{KernelParams, KernelSpec};
use crate::device::work_size::LaunchShape;
use crate::error::{Result, SpGemmError};
use crate::matrix::EngineConfig;

/// Platform OpenCL devices
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenClDevice;

impl OpenClDevice {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeDevice for OpenClDevice {
    type Context = OpenClContext;

    fn create_context(&self, config: &EngineConfig) -> Option<OpenClContext> {
        let device_type = if config.force_discrete_gpu {
            CL_DEVICE_TYPE_GPU
        } else {
            CL_DEVICE_TYPE_ALL
        };
        let ids = match get_all_devices(device_type) {
            Ok(ids) => ids,
            Err(err) => {
                debug!(%err, "no OpenCL devices");
                return None;
            }
        };

        for id in ids {
            let device = Device::new(id);
            let Ok(context) = Context::from_device(&device) else {
                continue;
            };
            #[allow(deprecated)]
            let Ok(queue) = CommandQueue::create_default(&context, 0) else {
                continue;
            };

            let name = device.name().unwrap_or_default().trim().to_string();
            let max_work_group_size = context
                .devices()
                .iter()
                .map(|&d| Device::new(d).max_work_group_size().unwrap_or(1))
                .min()
                .unwrap_or(1);
            debug!(device = %name, max_work_group_size, "OpenCL context created");

            return Some(OpenClContext {
                name,
                max_work_group_size,
                pending: Vec::new(),
                queue,
                context,
            });
        }

        warn!(gpu_only = config.force_discrete_gpu, "no OpenCL device accepted a context");
        None
    }
}

/// Device memory of either element type
pub enum OpenClBuffer {
    Int(Buffer<cl_int>),
    Float(Buffer<cl_float>),
}

/// A built program and its single kernel; the kernel is dropped first
pub struct OpenClProgram {
    kernel: Kernel,
    _program: Program,
    entry_point: &'static str,
}

/// Context, queue and outstanding events
pub struct OpenClContext {
    name: String,
    max_work_group_size: usize,
    pending: Vec<Event>,
    // Field order is drop order: queue before context
    queue: CommandQueue,
    context: Context,
}

fn mem_flags(usage: BufferUsage, use_device_memory: bool) -> cl_mem_flags {
    let access = match usage {
        BufferUsage::Input => CL_MEM_READ_ONLY,
        BufferUsage::Output => CL_MEM_WRITE_ONLY,
        BufferUsage::InputOutput => CL_MEM_READ_WRITE,
    };
    if use_device_memory {
        access | CL_MEM_COPY_HOST_PTR
    } else {
        access | CL_MEM_USE_HOST_PTR
    }
}

fn allocation_error(name: &str, err: impl std::fmt::Display) -> SpGemmError {
    SpGemmError::AllocationFailure {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

impl OpenClContext {
    fn wait_list(&self) -> Vec<cl_event> {
        self.pending.iter().map(|e| e.get()).collect()
    }
}

impl ComputeContext for OpenClContext {
    type Buffer = OpenClBuffer;
    type Program = OpenClProgram;

    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    fn create_buffer(
        &mut self,
        name: &str,
        data: &mut HostData,
        usage: BufferUsage,
        use_device_memory: bool,
    ) -> Result<OpenClBuffer> {
        let flags = mem_flags(usage, use_device_memory);
        let len = data.len();
        if len == 0 {
            return Err(allocation_error(name, "zero-sized buffer"));
        }

        // SAFETY: the host pointer covers `len` elements. With CL_MEM_USE_HOST_PTR
        // the session keeps the staging block alive until the buffer is released.
        let buffer = match data {
            HostData::Int(values) => unsafe {
                Buffer::<cl_int>::create(&self.context, flags, len, values.as_mut_ptr() as *mut c_void)
                    .map(OpenClBuffer::Int)
            },
            HostData::Float(values) => unsafe {
                Buffer::<cl_float>::create(&self.context, flags, len, values.as_mut_ptr() as *mut c_void)
                    .map(OpenClBuffer::Float)
            },
        };
        buffer.map_err(|err| allocation_error(name, err))
    }

    fn build_program(&mut self, spec: &KernelSpec, params: &KernelParams) -> Result<OpenClProgram> {
        let options = params.build_options();
        let program = Program::create_and_build_from_source(&self.context, spec.source(), &options)
            .map_err(|log| SpGemmError::KernelBuild(format!("{}: {}", spec, log)))?;
        let kernel = Kernel::create(&program, spec.entry_point())
            .map_err(|err| SpGemmError::KernelBuild(format!("{}: {}", spec, err)))?;

        Ok(OpenClProgram {
            kernel,
            _program: program,
            entry_point: spec.entry_point(),
        })
    }

    fn dispatch(&mut self, program: &OpenClProgram, args: &[&OpenClBuffer], shape: &LaunchShape) -> Result<()> {
        let enqueued = {
            let mut exec = ExecuteKernel::new(&program.kernel);
            for arg in args {
                // SAFETY: argument order and element types follow the kernel's
                // signature as listed by KernelSpec::arg_names
                unsafe {
                    match arg {
                        OpenClBuffer::Int(buffer) => exec.set_arg(buffer),
                        OpenClBuffer::Float(buffer) => exec.set_arg(buffer),
                    };
                }
            }
            exec.set_global_work_sizes(&shape.global);
            if let Some(local) = shape.local.as_ref() {
                exec.set_local_work_sizes(local);
            }
            for event in &self.pending {
                exec.set_wait_event(event);
            }

            // SAFETY: every bound buffer outlives the launch; the session releases
            // buffers only after flushing the queue
            unsafe { exec.enqueue_nd_range(&self.queue) }
        };

        let event =
            enqueued.map_err(|err| SpGemmError::Dispatch(format!("{}: {}", program.entry_point, err)))?;
        self.pending.push(event);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &OpenClBuffer, out: &mut HostData) -> Result<()> {
        let wait = self.wait_list();
        // SAFETY: blocking read into a host slice of the buffer's length
        let event = unsafe {
            match (buffer, out) {
                (OpenClBuffer::Int(src), HostData::Int(dst)) => {
                    self.queue.enqueue_read_buffer(src, CL_BLOCKING, 0, dst, &wait)
                }
                (OpenClBuffer::Float(src), HostData::Float(dst)) => {
                    self.queue.enqueue_read_buffer(src, CL_BLOCKING, 0, dst, &wait)
                }
                _ => return Err(SpGemmError::Dispatch("read-back element type mismatch".to_string())),
            }
        }
        .map_err(|err| SpGemmError::Dispatch(err.to_string()))?;

        event.wait().map_err(|err| SpGemmError::Dispatch(err.to_string()))?;
        self.pending.clear();
        Ok(())
    }

    fn flush(&mut self) {
        if let Err(err) = self.queue.finish() {
            warn!(%err, "queue finish failed during release");
        }
        self.pending.clear();
    }

    fn release_program(&mut self, program: OpenClProgram) {
        debug!(kernel = program.entry_point, "releasing program");
        drop(program);
    }

    fn release_buffer(&mut self, buffer: OpenClBuffer) {
        drop(buffer);
    }

    fn release(self) {
        debug!(device = %self.name, "releasing OpenCL context");
        let OpenClContext {
            pending,
            queue,
            context,
            ..
        } = self;
        drop(pending);
        drop(queue);
        drop(context);
    }
}
