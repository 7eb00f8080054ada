//! Per-call device session
//!
//! Owns the context, every named buffer pair (host staging block plus device
//! buffer) and the programs built during one multiply call. Teardown always
//! runs in the same order: flush the queue, release programs, release device
//! buffers, drop host staging, release the context. A device buffer may map
//! its staging block, so the staging side must never go first.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::device::backend::{BufferUsage, ComputeContext, ComputeDevice, ElementKind, HostData};
use crate::device::kernel::{KernelParams, KernelSpec};
use crate::device::work_size::LaunchShape;
use crate::error::{Result, SpGemmError};
use crate::matrix::EngineConfig;

struct BufferPair<B> {
    host: HostData,
    device: B,
}

/// What a call to [`DeviceSession::free`] released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub programs: usize,
    pub buffers: usize,
    pub staging_bytes: usize,
    pub context: bool,
}

/// Resources acquired on one context during one multiply call
pub struct DeviceSession<C: ComputeContext> {
    context: Option<C>,
    buffers: BTreeMap<String, BufferPair<C::Buffer>>,
    programs: Vec<C::Program>,
    nnz: Option<usize>,
    use_device_memory: bool,
    max_work_group_size: usize,
}

impl<C: ComputeContext> DeviceSession<C> {
    /// Creates a context on `device`
    pub fn open<D>(device: &D, config: &EngineConfig) -> Result<Self>
    where
        D: ComputeDevice<Context = C>,
    {
        let context = device.create_context(config).ok_or_else(|| {
            SpGemmError::DeviceUnavailable(if config.force_discrete_gpu {
                "no GPU device found".to_string()
            } else {
                "no compute device found".to_string()
            })
        })?;

        let reported = context.max_work_group_size();
        let max_work_group_size = match config.system_params.max_work_group_size {
            Some(limit) => limit.min(reported),
            None => reported,
        };
        debug!(device = %context.device_name(), max_work_group_size, "opened device session");

        Ok(Self {
            context: Some(context),
            buffers: BTreeMap::new(),
            programs: Vec::new(),
            nnz: None,
            use_device_memory: config.use_device_local_memory,
            max_work_group_size,
        })
    }

    fn context_mut(&mut self) -> Result<&mut C> {
        self.context
            .as_mut()
            .ok_or_else(|| SpGemmError::DeviceUnavailable("session already freed".to_string()))
    }

    /// Work-group bound for launches in this session
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    pub fn device_name(&self) -> Option<String> {
        self.context.as_ref().map(|c| c.device_name())
    }

    /// Registers `host` under `name` and creates its device buffer
    ///
    /// An existing pair with the same name is released first. When buffer
    /// creation fails the staging block is dropped and nothing is registered.
    pub fn allocate(&mut self, name: &str, mut host: HostData, usage: BufferUsage) -> Result<()> {
        if self.buffers.contains_key(name) {
            self.release_single(name)?;
        }

        // Counters and outputs are written by kernels; keep them off host memory
        let use_device_memory = self.use_device_memory || !usage.is_read_only();
        let context = self.context_mut()?;
        let device = context.create_buffer(name, &mut host, usage, use_device_memory)?;

        debug!(name, elements = host.len(), ?usage, "allocated buffer");
        self.buffers.insert(name.to_string(), BufferPair { host, device });
        Ok(())
    }

    /// Zero-initialised buffer of `len` elements
    pub fn allocate_zeroed(&mut self, name: &str, kind: ElementKind, len: usize, usage: BufferUsage) -> Result<()> {
        self.allocate(name, HostData::zeroed(kind, len), usage)
    }

    /// Device buffer registered under `name`
    pub fn get(&self, name: &str) -> Result<&C::Buffer> {
        self.buffers
            .get(name)
            .map(|pair| &pair.device)
            .ok_or_else(|| SpGemmError::UnknownBuffer(name.to_string()))
    }

    /// Host staging block registered under `name`
    pub fn host(&self, name: &str) -> Result<&HostData> {
        self.buffers
            .get(name)
            .map(|pair| &pair.host)
            .ok_or_else(|| SpGemmError::UnknownBuffer(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Builds `spec`, binds its argument buffers by name and dispatches it
    ///
    /// The program stays alive until the session is freed.
    pub fn run(&mut self, spec: &KernelSpec, params: &KernelParams, shape: &LaunchShape) -> Result<()> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| SpGemmError::DeviceUnavailable("session already freed".to_string()))?;

        let args = spec
            .arg_names()
            .into_iter()
            .map(|name| {
                self.buffers
                    .get(name)
                    .map(|pair| &pair.device)
                    .ok_or_else(|| SpGemmError::UnknownBuffer(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let program = context.build_program(spec, params)?;
        debug!(kernel = %spec, global = ?shape.global, local = ?shape.local, "dispatching");
        let dispatched = context.dispatch(&program, &args, shape);
        self.programs.push(program);
        dispatched
    }

    /// Copies the device buffer back into its staging block and returns it
    pub fn read(&mut self, name: &str) -> Result<&HostData> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| SpGemmError::DeviceUnavailable("session already freed".to_string()))?;
        let pair = self
            .buffers
            .get_mut(name)
            .ok_or_else(|| SpGemmError::UnknownBuffer(name.to_string()))?;

        context.read_buffer(&pair.device, &mut pair.host)?;
        Ok(&pair.host)
    }

    /// Reads back a single-element integer buffer
    pub fn read_counter(&mut self, name: &str) -> Result<usize> {
        let host = self.read(name)?;
        let value = host
            .as_ints()
            .and_then(|ints| ints.first().copied())
            .ok_or_else(|| SpGemmError::Dispatch(format!("buffer '{}' is not a counter", name)))?;
        usize::try_from(value).map_err(|_| SpGemmError::Dispatch(format!("negative counter {}", value)))
    }

    /// Releases one pair, device side first
    pub fn release_single(&mut self, name: &str) -> Result<()> {
        let pair = self
            .buffers
            .remove(name)
            .ok_or_else(|| SpGemmError::UnknownBuffer(name.to_string()))?;
        let context = self.context_mut()?;
        context.release_buffer(pair.device);
        drop(pair.host);
        Ok(())
    }

    pub fn set_nnz(&mut self, nnz: usize) {
        self.nnz = Some(nnz);
    }

    /// Output non-zero estimate recorded for this call
    pub fn nnz(&self) -> Option<usize> {
        self.nnz
    }

    pub fn is_freed(&self) -> bool {
        self.context.is_none()
    }

    /// Releases everything the session holds
    ///
    /// Safe to call more than once; later calls release nothing.
    pub fn free(&mut self) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();
        let Some(mut context) = self.context.take() else {
            return summary;
        };

        context.flush();

        for program in self.programs.drain(..) {
            context.release_program(program);
            summary.programs += 1;
        }

        let pairs = std::mem::take(&mut self.buffers);
        let mut staging = Vec::with_capacity(pairs.len());
        for (_, pair) in pairs {
            context.release_buffer(pair.device);
            summary.buffers += 1;
            staging.push(pair.host);
        }

        summary.staging_bytes = staging.iter().map(HostData::byte_len).sum();
        drop(staging);

        context.release();
        summary.context = true;
        self.nnz = None;

        debug!(?summary, "device session freed");
        summary
    }

    /// Frees the session and reports what was released
    pub fn free_and_report(&mut self) -> ReleaseSummary {
        let summary = self.free();
        info!(
            programs = summary.programs,
            buffers = summary.buffers,
            staging_bytes = summary.staging_bytes,
            "released device resources"
        );
        summary
    }
}

impl<C: ComputeContext> Drop for DeviceSession<C> {
    fn drop(&mut self) {
        self.free();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BUF_A_ROWPTR, BUF_COUNTER};
    use crate::device::host::{HostDevice, LedgerEvent};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn test_allocate_and_get() {
        let device = HostDevice::new();
        let mut session = DeviceSession::open(&device, &config()).unwrap();

        session
            .allocate(BUF_A_ROWPTR, HostData::from_indices(&[0, 1, 2]).unwrap(), BufferUsage::Input)
            .unwrap();
        assert!(session.get(BUF_A_ROWPTR).is_ok());
        assert_eq!(session.host(BUF_A_ROWPTR).unwrap().len(), 3);
        assert!(matches!(session.get("missing"), Err(SpGemmError::UnknownBuffer(_))));
    }

    #[test]
    fn test_reallocate_replaces() {
        let device = HostDevice::new();
        let ledger = device.ledger();
        let mut session = DeviceSession::open(&device, &config()).unwrap();

        session
            .allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput)
            .unwrap();
        session
            .allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput)
            .unwrap();

        assert_eq!(session.buffer_count(), 1);
        assert_eq!(ledger.live_buffers(), 1);
    }

    #[test]
    fn test_free_is_idempotent() {
        let device = HostDevice::new();
        let ledger = device.ledger();
        let mut session = DeviceSession::open(&device, &config()).unwrap();
        session
            .allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput)
            .unwrap();

        let first = session.free();
        assert_eq!(first.buffers, 1);
        assert!(first.context);

        let second = session.free();
        assert_eq!(second, ReleaseSummary::default());
        assert!(ledger.is_clean());
    }

    #[test]
    fn test_drop_releases_in_order() {
        let device = HostDevice::new();
        let ledger = device.ledger();
        {
            let mut session = DeviceSession::open(&device, &config()).unwrap();
            session
                .allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput)
                .unwrap();
        }

        assert!(ledger.is_clean());
        let events = ledger.events();
        assert_eq!(events.first(), Some(&LedgerEvent::ContextCreated));
        assert_eq!(events.last(), Some(&LedgerEvent::ContextReleased));
        let flushed = events.iter().position(|e| *e == LedgerEvent::Flushed).unwrap();
        let released = events
            .iter()
            .position(|e| matches!(e, LedgerEvent::BufferReleased(_)))
            .unwrap();
        assert!(flushed < released);
    }

    #[test]
    fn test_use_after_free() {
        let device = HostDevice::new();
        let mut session = DeviceSession::open(&device, &config()).unwrap();
        session.free();

        let result = session.allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput);
        assert!(matches!(result, Err(SpGemmError::DeviceUnavailable(_))));
        assert!(session.is_freed());
    }

    #[test]
    fn test_open_without_device() {
        let device = HostDevice::builder().no_context().build();
        let result = DeviceSession::open(&device, &config());
        assert!(matches!(result, Err(SpGemmError::DeviceUnavailable(_))));
    }
}
