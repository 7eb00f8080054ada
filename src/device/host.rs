//! Emulated compute device running the kernels on a rayon pool
//!
//! Behaves like a device with separate memory: buffers are copies of their
//! staging blocks, launches are checked for legality, padding work items are
//! discarded through the same `A_ROWS`/`B_ROWS` guard the OpenCL sources use,
//! and the COO kernel claims output slots from the counter buffer.
//!
//! Every context, buffer and program is recorded in a shared
//! [`ResourceLedger`], so callers can check that a session released
//! everything and in which order. Faults can be injected through
//! [`HostDeviceBuilder`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, trace};

use crate::constants::*;
use crate::device::backend::{BufferUsage, ComputeContext, ComputeDevice, HostData};
use crate::device::kernel::{KernelKind, KernelParams, KernelSpec};
use crate::device::work_size::LaunchShape;
use crate::error::{Result, SpGemmError};
use crate::matrix::EngineConfig;

/// One device-side event, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    ContextCreated,
    BufferCreated(String),
    ProgramBuilt(&'static str),
    Dispatched(&'static str),
    BufferRead(String),
    Flushed,
    ProgramReleased(&'static str),
    BufferReleased(String),
    ContextReleased,
}

/// Live resource counts and event history shared by a device and its contexts
#[derive(Debug, Default)]
pub struct ResourceLedger {
    contexts: AtomicUsize,
    buffers: AtomicUsize,
    programs: AtomicUsize,
    events: Mutex<Vec<LedgerEvent>>,
}

impl ResourceLedger {
    fn record(&self, event: LedgerEvent) {
        trace!(?event, "ledger");
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }

    pub fn live_contexts(&self) -> usize {
        self.contexts.load(Ordering::SeqCst)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.load(Ordering::SeqCst)
    }

    pub fn live_programs(&self) -> usize {
        self.programs.load(Ordering::SeqCst)
    }

    /// No context, buffer or program is outstanding
    pub fn is_clean(&self) -> bool {
        self.live_contexts() == 0 && self.live_buffers() == 0 && self.live_programs() == 0
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Entry points dispatched so far, oldest first
    pub fn dispatched(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LedgerEvent::Dispatched(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[derive(Debug, Clone, Default)]
struct FaultPlan {
    no_context: bool,
    fail_allocation_at: Option<usize>,
    fail_build: Vec<KernelKind>,
}

/// Configures a [`HostDevice`]
#[derive(Debug, Clone)]
pub struct HostDeviceBuilder {
    max_work_group_size: usize,
    reports_gpu: bool,
    faults: FaultPlan,
}

impl HostDeviceBuilder {
    pub fn max_work_group_size(mut self, size: usize) -> Self {
        self.max_work_group_size = size;
        self
    }

    /// Presents the device as a CPU, so GPU-only selection rejects it
    pub fn reports_cpu(mut self) -> Self {
        self.reports_gpu = false;
        self
    }

    /// Every context request fails
    pub fn no_context(mut self) -> Self {
        self.faults.no_context = true;
        self
    }

    /// The `n`-th buffer created in a context fails (1-based)
    pub fn fail_allocation_at(mut self, n: usize) -> Self {
        self.faults.fail_allocation_at = Some(n);
        self
    }

    /// Program builds for `kind` fail
    pub fn fail_build(mut self, kind: KernelKind) -> Self {
        self.faults.fail_build.push(kind);
        self
    }

    pub fn build(self) -> HostDevice {
        HostDevice {
            max_work_group_size: self.max_work_group_size,
            reports_gpu: self.reports_gpu,
            faults: self.faults,
            ledger: Arc::new(ResourceLedger::default()),
        }
    }
}

/// A compute device emulated on host threads
#[derive(Debug, Clone)]
pub struct HostDevice {
    max_work_group_size: usize,
    reports_gpu: bool,
    faults: FaultPlan,
    ledger: Arc<ResourceLedger>,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HostDeviceBuilder {
        HostDeviceBuilder {
            max_work_group_size: HOST_MAX_WORK_GROUP_SIZE,
            reports_gpu: true,
            faults: FaultPlan::default(),
        }
    }

    /// Ledger shared with every context this device creates
    pub fn ledger(&self) -> Arc<ResourceLedger> {
        Arc::clone(&self.ledger)
    }
}

impl ComputeDevice for HostDevice {
    type Context = HostContext;

    fn create_context(&self, config: &EngineConfig) -> Option<HostContext> {
        if self.faults.no_context {
            debug!("host device: context creation disabled");
            return None;
        }
        if config.force_discrete_gpu && !self.reports_gpu {
            debug!("host device reports as CPU, rejected by GPU-only selection");
            return None;
        }

        let threads = config.system_params.n_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().ok()?;

        self.ledger.contexts.fetch_add(1, Ordering::SeqCst);
        self.ledger.record(LedgerEvent::ContextCreated);

        Some(HostContext {
            threads,
            max_work_group_size: self.max_work_group_size,
            faults: self.faults.clone(),
            ledger: Arc::clone(&self.ledger),
            pool,
            memory: HashMap::new(),
            next_id: 0,
            allocations: 0,
        })
    }
}

/// Handle to emulated device memory
#[derive(Debug)]
pub struct HostBuffer {
    id: usize,
    name: String,
}

/// A "compiled" kernel: its contract plus the build-time constants
#[derive(Debug)]
pub struct HostProgram {
    spec: KernelSpec,
    params: KernelParams,
}

/// Context of a [`HostDevice`]
pub struct HostContext {
    threads: usize,
    max_work_group_size: usize,
    faults: FaultPlan,
    ledger: Arc<ResourceLedger>,
    pool: ThreadPool,
    memory: HashMap<usize, HostData>,
    next_id: usize,
    allocations: usize,
}

/// Read-only kernel inputs resolved from emulated memory
struct Operands<'a> {
    a_rowptr: &'a [i32],
    a_colidx: &'a [i32],
    a_data: Option<&'a [f32]>,
    b_rowptr: &'a [i32],
    b_colidx: &'a [i32],
    b_data: Option<&'a [f32]>,
}

impl Operands<'_> {
    /// Merge-joins row `i` of A with row `j` of Bᵗ: (shares an index, dot product)
    fn cell(&self, i: usize, j: usize) -> (bool, f32) {
        let mut pa = self.a_rowptr[i] as usize;
        let ea = self.a_rowptr[i + 1] as usize;
        let mut pb = self.b_rowptr[j] as usize;
        let eb = self.b_rowptr[j + 1] as usize;

        let mut hit = false;
        let mut sum = 0.0f32;
        while pa < ea && pb < eb {
            let ca = self.a_colidx[pa];
            let cb = self.b_colidx[pb];
            if ca == cb {
                hit = true;
                sum += match (self.a_data, self.b_data) {
                    (Some(av), Some(bv)) => av[pa] * bv[pb],
                    _ => 1.0,
                };
                pa += 1;
                pb += 1;
            } else if ca < cb {
                pa += 1;
            } else {
                pb += 1;
            }
        }
        (hit, sum)
    }
}

impl HostContext {
    fn arg<'a>(&'a self, spec: &KernelSpec, args: &[&HostBuffer], name: &str) -> Result<&'a HostData> {
        let position = spec
            .arg_names()
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| SpGemmError::Dispatch(format!("{} has no argument '{}'", spec, name)))?;
        let buffer = args[position];
        self.memory
            .get(&buffer.id)
            .ok_or_else(|| SpGemmError::Dispatch(format!("buffer '{}' was released", buffer.name)))
    }

    fn int_arg<'a>(&'a self, spec: &KernelSpec, args: &[&HostBuffer], name: &str) -> Result<&'a [i32]> {
        self.arg(spec, args, name)?
            .as_ints()
            .ok_or_else(|| SpGemmError::Dispatch(format!("argument '{}' must be int", name)))
    }

    fn float_arg<'a>(&'a self, spec: &KernelSpec, args: &[&HostBuffer], name: &str) -> Result<&'a [f32]> {
        self.arg(spec, args, name)?
            .as_floats()
            .ok_or_else(|| SpGemmError::Dispatch(format!("argument '{}' must be float", name)))
    }

    fn operands<'a>(&'a self, program: &HostProgram, args: &[&HostBuffer]) -> Result<Operands<'a>> {
        let spec = &program.spec;
        let (a_data, b_data) = if spec.has_values() {
            (
                Some(self.float_arg(spec, args, BUF_A_DATA)?),
                Some(self.float_arg(spec, args, BUF_B_DATA)?),
            )
        } else {
            (None, None)
        };
        let operands = Operands {
            a_rowptr: self.int_arg(spec, args, BUF_A_ROWPTR)?,
            a_colidx: self.int_arg(spec, args, BUF_A_COLIDX)?,
            a_data,
            b_rowptr: self.int_arg(spec, args, BUF_B_ROWPTR)?,
            b_colidx: self.int_arg(spec, args, BUF_B_COLIDX)?,
            b_data,
        };

        if operands.a_rowptr.len() <= program.params.a_rows() || operands.b_rowptr.len() <= program.params.b_rows() {
            return Err(SpGemmError::Dispatch(format!(
                "row pointers shorter than A_ROWS={} / B_ROWS={}",
                program.params.a_rows(),
                program.params.b_rows()
            )));
        }
        Ok(operands)
    }

    /// Takes an output buffer out of memory so inputs can stay borrowed
    fn take_output(&mut self, spec: &KernelSpec, args: &[&HostBuffer], name: &str) -> Result<(usize, HostData)> {
        let position = spec
            .arg_names()
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| SpGemmError::Dispatch(format!("{} has no argument '{}'", spec, name)))?;
        let id = args[position].id;
        let data = self
            .memory
            .remove(&id)
            .ok_or_else(|| SpGemmError::Dispatch(format!("buffer '{}' was released", args[position].name)))?;
        Ok((id, data))
    }

    fn run_nnz(&mut self, program: &HostProgram, args: &[&HostBuffer], rows: usize, cols: usize) -> Result<()> {
        let (counter_id, mut counter) = self.take_output(&program.spec, args, BUF_COUNTER)?;
        let result = self.operands(program, args).map(|ops| {
            self.pool.install(|| {
                (0..rows)
                    .into_par_iter()
                    .map(|i| (0..cols).filter(|&j| ops.cell(i, j).0).count())
                    .sum::<usize>()
            })
        });
        let outcome = result.and_then(|count| {
            let slot = counter
                .as_ints_mut()
                .and_then(|c| c.first_mut())
                .ok_or_else(|| SpGemmError::Dispatch("counter must be a non-empty int buffer".to_string()))?;
            *slot += i32::try_from(count).map_err(|_| SpGemmError::IndexOverflow { value: count })?;
            Ok(())
        });
        self.memory.insert(counter_id, counter);
        outcome
    }

    fn run_dense(&mut self, program: &HostProgram, args: &[&HostBuffer], rows: usize, cols: usize) -> Result<()> {
        let (out_id, mut output) = self.take_output(&program.spec, args, BUF_OUT_DENSE)?;
        let b_rows = program.params.b_rows();
        let needed = program.params.a_rows() * b_rows;

        let outcome = match (self.operands(program, args), output.as_floats_mut()) {
            (Err(err), _) => Err(err),
            (Ok(_), Some(out)) if out.len() < needed => Err(SpGemmError::Dispatch(format!(
                "dense output holds {} cells, kernel writes {}",
                out.len(),
                needed
            ))),
            (Ok(ops), Some(out)) => {
                self.pool.install(|| {
                    out[..needed]
                        .par_chunks_mut(b_rows)
                        .take(rows)
                        .enumerate()
                        .for_each(|(i, row)| {
                            for (j, cell) in row.iter_mut().enumerate().take(cols) {
                                *cell = ops.cell(i, j).1;
                            }
                        });
                });
                Ok(())
            }
            (Ok(_), None) => Err(SpGemmError::Dispatch("dense output must be float".to_string())),
        };

        self.memory.insert(out_id, output);
        outcome
    }

    fn run_coo(&mut self, program: &HostProgram, args: &[&HostBuffer], rows: usize, cols: usize) -> Result<()> {
        let triples: Vec<(usize, usize, f32)> = {
            let ops = self.operands(program, args)?;
            self.pool.install(|| {
                (0..rows)
                    .into_par_iter()
                    .flat_map_iter(|i| {
                        let ops = &ops;
                        (0..cols).filter_map(move |j| {
                            let (_, sum) = ops.cell(i, j);
                            (sum != 0.0).then_some((i, j, sum))
                        })
                    })
                    .collect()
            })
        };

        let spec = program.spec;
        let mut taken = Vec::with_capacity(4);
        for name in [BUF_COUNTER, BUF_OUT_ROW, BUF_OUT_COL, BUF_OUT_VALUE] {
            match self.take_output(&spec, args, name) {
                Ok(pair) => taken.push(pair),
                Err(err) => {
                    for (id, data) in taken {
                        self.memory.insert(id, data);
                    }
                    return Err(err);
                }
            }
        }

        let outcome = scatter_triples(&triples, &mut taken);
        for (id, data) in taken {
            self.memory.insert(id, data);
        }
        outcome
    }
}

/// Writes each triple into the slot the counter hands out, as `atomic_inc` would
fn scatter_triples(triples: &[(usize, usize, f32)], outputs: &mut [(usize, HostData)]) -> Result<()> {
    let [(_, counter), (_, rows), (_, cols), (_, values)] = outputs else {
        return Err(SpGemmError::Dispatch("COO kernel needs four output buffers".to_string()));
    };
    let counter = counter
        .as_ints_mut()
        .and_then(|c| c.first_mut())
        .ok_or_else(|| SpGemmError::Dispatch("counter must be a non-empty int buffer".to_string()))?;
    let (Some(rows), Some(cols), Some(values)) = (rows.as_ints_mut(), cols.as_ints_mut(), values.as_floats_mut())
    else {
        return Err(SpGemmError::Dispatch("COO output buffers have the wrong element type".to_string()));
    };
    let capacity = rows.len().min(cols.len()).min(values.len());

    for &(i, j, sum) in triples {
        let slot = usize::try_from(*counter)
            .map_err(|_| SpGemmError::Dispatch(format!("negative counter {}", counter)))?;
        if slot >= capacity {
            return Err(SpGemmError::Dispatch(format!(
                "COO output overflow: slot {} with capacity {}",
                slot, capacity
            )));
        }
        rows[slot] = i as i32;
        cols[slot] = j as i32;
        values[slot] = sum;
        *counter += 1;
    }
    Ok(())
}

impl ComputeContext for HostContext {
    type Buffer = HostBuffer;
    type Program = HostProgram;

    fn device_name(&self) -> String {
        format!("host emulation ({} threads)", self.threads)
    }

    fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    fn create_buffer(
        &mut self,
        name: &str,
        data: &mut HostData,
        _usage: BufferUsage,
        _use_device_memory: bool,
    ) -> Result<HostBuffer> {
        self.allocations += 1;
        if self.faults.fail_allocation_at == Some(self.allocations) {
            return Err(SpGemmError::AllocationFailure {
                name: name.to_string(),
                reason: "injected allocation failure".to_string(),
            });
        }
        if data.is_empty() {
            return Err(SpGemmError::AllocationFailure {
                name: name.to_string(),
                reason: "zero-sized buffer".to_string(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.memory.insert(id, data.duplicate());

        self.ledger.buffers.fetch_add(1, Ordering::SeqCst);
        self.ledger.record(LedgerEvent::BufferCreated(name.to_string()));
        Ok(HostBuffer {
            id,
            name: name.to_string(),
        })
    }

    fn build_program(&mut self, spec: &KernelSpec, params: &KernelParams) -> Result<HostProgram> {
        if self.faults.fail_build.contains(&spec.kind) {
            return Err(SpGemmError::KernelBuild(format!(
                "injected build failure for {} ({})",
                spec,
                params.build_options()
            )));
        }

        self.ledger.programs.fetch_add(1, Ordering::SeqCst);
        self.ledger.record(LedgerEvent::ProgramBuilt(spec.entry_point()));
        Ok(HostProgram {
            spec: *spec,
            params: *params,
        })
    }

    fn dispatch(&mut self, program: &HostProgram, args: &[&HostBuffer], shape: &LaunchShape) -> Result<()> {
        if !shape.is_legal(self.max_work_group_size) {
            return Err(SpGemmError::Dispatch(format!(
                "illegal launch: global {:?}, local {:?}, work-group bound {}",
                shape.global, shape.local, self.max_work_group_size
            )));
        }
        let expected = program.spec.arg_names().len();
        if args.len() != expected {
            return Err(SpGemmError::Dispatch(format!(
                "{} takes {} arguments, got {}",
                program.spec,
                expected,
                args.len()
            )));
        }

        // Work items past A_ROWS / B_ROWS are padding
        let rows = shape.global[0].min(program.params.a_rows());
        let cols = shape.global[1].min(program.params.b_rows());

        match program.spec.kind {
            KernelKind::NnzCount => self.run_nnz(program, args, rows, cols)?,
            KernelKind::DenseMultiply => self.run_dense(program, args, rows, cols)?,
            KernelKind::CooMultiply => self.run_coo(program, args, rows, cols)?,
        }

        self.ledger.record(LedgerEvent::Dispatched(program.spec.entry_point()));
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &HostBuffer, out: &mut HostData) -> Result<()> {
        let data = self
            .memory
            .get(&buffer.id)
            .ok_or_else(|| SpGemmError::Dispatch(format!("buffer '{}' was released", buffer.name)))?;
        out.copy_from(data)?;
        self.ledger.record(LedgerEvent::BufferRead(buffer.name.clone()));
        Ok(())
    }

    fn flush(&mut self) {
        self.ledger.record(LedgerEvent::Flushed);
    }

    fn release_program(&mut self, program: HostProgram) {
        self.ledger.programs.fetch_sub(1, Ordering::SeqCst);
        self.ledger.record(LedgerEvent::ProgramReleased(program.spec.entry_point()));
    }

    fn release_buffer(&mut self, buffer: HostBuffer) {
        if self.memory.remove(&buffer.id).is_some() {
            self.ledger.buffers.fetch_sub(1, Ordering::SeqCst);
            self.ledger.record(LedgerEvent::BufferReleased(buffer.name));
        }
    }

    fn release(self) {
        self.ledger.contexts.fetch_sub(1, Ordering::SeqCst);
        self.ledger.record(LedgerEvent::ContextReleased);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::backend::ElementKind;
    use crate::device::work_size::naive_shape;

    fn upload(ctx: &mut HostContext, name: &str, mut data: HostData) -> HostBuffer {
        ctx.create_buffer(name, &mut data, BufferUsage::Input, true).unwrap()
    }

    #[test]
    fn test_nnz_kernel_counts_overlaps() {
        let device = HostDevice::new();
        let mut ctx = device.create_context(&EngineConfig::default()).unwrap();

        // A = [1 1; 0 1], Bᵗ = [1 0; 0 1]
        let a_rp = upload(&mut ctx, BUF_A_ROWPTR, HostData::from_indices(&[0, 2, 3]).unwrap());
        let a_ci = upload(&mut ctx, BUF_A_COLIDX, HostData::from_indices(&[0, 1, 1]).unwrap());
        let b_rp = upload(&mut ctx, BUF_B_ROWPTR, HostData::from_indices(&[0, 1, 2]).unwrap());
        let b_ci = upload(&mut ctx, BUF_B_COLIDX, HostData::from_indices(&[0, 1]).unwrap());
        let counter = upload(&mut ctx, BUF_COUNTER, HostData::zeroed(ElementKind::Int, 1));

        let spec = KernelSpec::nnz_count();
        let params = KernelParams::new(2, 2).unwrap();
        let program = ctx.build_program(&spec, &params).unwrap();
        ctx.dispatch(&program, &[&a_rp, &a_ci, &b_rp, &b_ci, &counter], &naive_shape(2, 2))
            .unwrap();

        let mut out = HostData::zeroed(ElementKind::Int, 1);
        ctx.read_buffer(&counter, &mut out).unwrap();
        assert_eq!(out.as_ints(), Some(&[3][..]));
    }

    #[test]
    fn test_padding_is_ignored() {
        let device = HostDevice::new();
        let mut ctx = device.create_context(&EngineConfig::default()).unwrap();

        let a_rp = upload(&mut ctx, BUF_A_ROWPTR, HostData::from_indices(&[0, 1]).unwrap());
        let a_ci = upload(&mut ctx, BUF_A_COLIDX, HostData::from_indices(&[0]).unwrap());
        let b_rp = upload(&mut ctx, BUF_B_ROWPTR, HostData::from_indices(&[0, 1]).unwrap());
        let b_ci = upload(&mut ctx, BUF_B_COLIDX, HostData::from_indices(&[0]).unwrap());
        let out = upload(&mut ctx, BUF_OUT_DENSE, HostData::zeroed(ElementKind::Float, 1));

        let program = ctx
            .build_program(&KernelSpec::dense(true), &KernelParams::new(1, 1).unwrap())
            .unwrap();
        let padded = LaunchShape {
            global: [4, 4],
            local: Some([2, 2]),
        };
        ctx.dispatch(&program, &[&a_rp, &a_ci, &b_rp, &b_ci, &out], &padded).unwrap();

        let mut host = HostData::zeroed(ElementKind::Float, 1);
        ctx.read_buffer(&out, &mut host).unwrap();
        assert_eq!(host.as_floats(), Some(&[1.0][..]));
    }

    #[test]
    fn test_illegal_launch_rejected() {
        let device = HostDevice::builder().max_work_group_size(4).build();
        let mut ctx = device.create_context(&EngineConfig::default()).unwrap();
        let program = ctx
            .build_program(&KernelSpec::nnz_count(), &KernelParams::new(3, 3).unwrap())
            .unwrap();
        let shape = LaunchShape {
            global: [3, 3],
            local: Some([3, 3]),
        };
        assert!(matches!(ctx.dispatch(&program, &[], &shape), Err(SpGemmError::Dispatch(_))));
    }

    #[test]
    fn test_injected_faults() {
        let device = HostDevice::builder()
            .fail_allocation_at(2)
            .fail_build(KernelKind::CooMultiply)
            .build();
        let mut ctx = device.create_context(&EngineConfig::default()).unwrap();

        let mut data = HostData::zeroed(ElementKind::Int, 1);
        assert!(ctx.create_buffer("first", &mut data, BufferUsage::Input, true).is_ok());
        assert!(matches!(
            ctx.create_buffer("second", &mut data, BufferUsage::Input, true),
            Err(SpGemmError::AllocationFailure { .. })
        ));

        let params = KernelParams::new(1, 1).unwrap();
        assert!(ctx.build_program(&KernelSpec::dense(false), &params).is_ok());
        assert!(matches!(
            ctx.build_program(&KernelSpec::coo(false), &params),
            Err(SpGemmError::KernelBuild(_))
        ));
    }

    #[test]
    fn test_cpu_device_rejected_when_gpu_forced() {
        let device = HostDevice::builder().reports_cpu().build();
        assert!(device.create_context(&EngineConfig::default()).is_none());

        let relaxed = EngineConfig {
            force_discrete_gpu: false,
            ..EngineConfig::default()
        };
        let ctx = device.create_context(&relaxed).unwrap();
        ctx.release();
        assert!(device.ledger().is_clean());
    }

    #[test]
    fn test_coo_overflow_detected() {
        let mut outputs = vec![
            (0, HostData::zeroed(ElementKind::Int, 1)),
            (1, HostData::zeroed(ElementKind::Int, 1)),
            (2, HostData::zeroed(ElementKind::Int, 1)),
            (3, HostData::zeroed(ElementKind::Float, 1)),
        ];
        let triples = [(0, 0, 1.0), (0, 1, 2.0)];
        assert!(matches!(
            scatter_triples(&triples, &mut outputs),
            Err(SpGemmError::Dispatch(_))
        ));
    }
}
