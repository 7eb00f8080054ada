//! Heterogeneous multiply orchestrator
//!
//! Decides per call between the CPU path and the two device strategies,
//! drives the device session through the NNZ pre-pass and the numeric pass,
//! and turns the device output back into CSR.
//!
//! Calls are serialized: one multiply runs at a time per engine, so a
//! session's context and buffers are never shared between calls.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, info, info_span, warn};

use crate::constants::*;
use crate::device::backend::{BufferUsage, ComputeContext, ComputeDevice, ElementKind, HostData};
use crate::device::kernel::{KernelParams, KernelSpec};
use crate::device::session::DeviceSession;
use crate::device::work_size::launch_shape;
use crate::error::{Result, SpGemmError};
use crate::matrix::multiply::csr_from_dense_output;
use crate::matrix::symbolic::{check_dimensions, symbolic_count};
use crate::matrix::{multiply_cpu, CsrMatrix, EngineConfig};

/// Where a product was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Host merge-join (or the configured CPU strategy)
    Cpu,
    /// Device kernel writing a full `rows × cols` float buffer
    GpuDense,
    /// Device kernel appending non-zero triples through a counter
    GpuCoo,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Cpu => "cpu",
            Strategy::GpuDense => "gpu-dense",
            Strategy::GpuCoo => "gpu-coo",
        };
        f.write_str(name)
    }
}

/// Picks the device output layout
///
/// COO wins when the dense buffer would hold more than `nnz_weight` cells per
/// output non-zero, or when it is forced.
pub fn choose_strategy(dense_cells: usize, nnz: usize, config: &EngineConfig) -> Strategy {
    if config.use_coo_always || dense_cells > nnz.saturating_mul(config.nnz_weight) {
        Strategy::GpuCoo
    } else {
        Strategy::GpuDense
    }
}

/// Sparse matrix multiply over a compute device with a host fallback
pub struct SpGemmEngine<D: ComputeDevice> {
    device: D,
    config: EngineConfig,
    // Held for the whole call; stores the strategy of the last finished call
    last: Mutex<Option<Strategy>>,
}

impl<D: ComputeDevice> SpGemmEngine<D> {
    /// Builds an engine after validating `config`
    pub fn new(device: D, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            device,
            config,
            last: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Strategy of the most recent call; `None` before any call, after a
    /// failed call, or when the product was trivially empty
    pub fn last_strategy(&self) -> Option<Strategy> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Strategy>> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Computes `a × b`
    pub fn multiply(&self, a: &CsrMatrix, b: &CsrMatrix) -> Result<CsrMatrix> {
        let mut last = self.lock();
        *last = None;

        let span = info_span!("spgemm", rows = a.n_rows(), cols = b.n_cols());
        let _enter = span.enter();

        match self.dispatch(a, b) {
            Ok((product, strategy)) => {
                *last = strategy;
                debug!(nnz = product.nnz(), "multiply finished");
                Ok(product)
            }
            Err(err) => {
                error!(%err, "multiply failed");
                Err(err)
            }
        }
    }

    fn dispatch(&self, a: &CsrMatrix, b: &CsrMatrix) -> Result<(CsrMatrix, Option<Strategy>)> {
        check_dimensions(a, b)?;

        if self.config.disable_compute_device {
            info!(strategy = %Strategy::Cpu, cpu = %self.config.cpu_strategy, "compute device disabled");
            return self.run_cpu(a, b);
        }

        if a.nnz() == 0 || b.nnz() == 0 || a.n_rows() == 0 || b.n_cols() == 0 {
            debug!("empty product, skipping the device");
            return Ok((CsrMatrix::zeros(a.n_rows(), b.n_cols()), None));
        }

        let mut session = match DeviceSession::open(&self.device, &self.config) {
            Ok(session) => session,
            Err(err @ SpGemmError::DeviceUnavailable(_)) if self.config.fallback_to_cpu => {
                warn!(%err, "falling back to the CPU path");
                return self.run_cpu(a, b);
            }
            Err(err) => return Err(err),
        };

        let result = self.run_on_device(&mut session, a, b);
        if self.config.force_release_after_call {
            session.free_and_report();
        }
        result.map(|(product, strategy)| (product, Some(strategy)))
    }

    fn run_cpu(&self, a: &CsrMatrix, b: &CsrMatrix) -> Result<(CsrMatrix, Option<Strategy>)> {
        let product = multiply_cpu(a, b, self.config.cpu_strategy)?;
        Ok((product, Some(Strategy::Cpu)))
    }

    fn run_on_device(
        &self,
        session: &mut DeviceSession<D::Context>,
        a: &CsrMatrix,
        b: &CsrMatrix,
    ) -> Result<(CsrMatrix, Strategy)> {
        let bt = b.transpose();
        let binary = a.is_binary() && bt.is_binary();
        let (rows, cols) = (a.n_rows(), bt.n_rows());

        let params = KernelParams::new(rows, cols)?;
        let shape = launch_shape(
            rows,
            cols,
            session.max_work_group_size(),
            self.config.use_local_work_size_heuristic,
        )?;
        debug!(global = ?shape.global, local = ?shape.local, binary, "launch shape");

        upload_indices(session, a, &bt)?;

        let nnz = if self.config.nnz_on_device {
            session.allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput)?;
            session.run(&KernelSpec::nnz_count(), &params, &shape)?;
            session.read_counter(BUF_COUNTER)?
        } else {
            symbolic_count(a, b)?
        };
        session.set_nnz(nnz);

        let strategy = choose_strategy(rows * cols, nnz, &self.config);
        info!(%strategy, nnz, dense_cells = rows * cols, weight = self.config.nnz_weight, "strategy selected");

        if nnz == 0 {
            return Ok((CsrMatrix::zeros(rows, cols), strategy));
        }

        if !binary {
            session.allocate(BUF_A_DATA, HostData::from_values(a.values()), BufferUsage::Input)?;
            session.allocate(BUF_B_DATA, HostData::from_values(bt.values()), BufferUsage::Input)?;
        }

        let product = match strategy {
            Strategy::GpuDense => {
                session.allocate_zeroed(BUF_OUT_DENSE, ElementKind::Float, rows * cols, BufferUsage::Output)?;
                session.run(&KernelSpec::dense(binary), &params, &shape)?;
                let output = session.read(BUF_OUT_DENSE)?;
                let dense = output
                    .as_floats()
                    .ok_or_else(|| SpGemmError::Dispatch("dense output must be float".to_string()))?;
                csr_from_dense_output(dense, rows, cols)?
            }
            Strategy::GpuCoo => {
                session.allocate_zeroed(BUF_COUNTER, ElementKind::Int, 1, BufferUsage::InputOutput)?;
                session.allocate_zeroed(BUF_OUT_ROW, ElementKind::Int, nnz, BufferUsage::Output)?;
                session.allocate_zeroed(BUF_OUT_COL, ElementKind::Int, nnz, BufferUsage::Output)?;
                session.allocate_zeroed(BUF_OUT_VALUE, ElementKind::Float, nnz, BufferUsage::Output)?;
                session.run(&KernelSpec::coo(binary), &params, &shape)?;
                read_coo(session, nnz, rows, cols)?
            }
            Strategy::Cpu => multiply_cpu(a, b, self.config.cpu_strategy)?,
        };

        Ok((product, strategy))
    }
}

fn upload_indices<C: ComputeContext>(session: &mut DeviceSession<C>, a: &CsrMatrix, bt: &CsrMatrix) -> Result<()> {
    session.allocate(BUF_A_ROWPTR, HostData::from_indices(a.row_ptr())?, BufferUsage::Input)?;
    session.allocate(BUF_A_COLIDX, HostData::from_indices(a.col_idx())?, BufferUsage::Input)?;
    session.allocate(BUF_B_ROWPTR, HostData::from_indices(bt.row_ptr())?, BufferUsage::Input)?;
    session.allocate(BUF_B_COLIDX, HostData::from_indices(bt.col_idx())?, BufferUsage::Input)?;
    Ok(())
}

/// Collects the first `counter` triples written by the COO kernel
fn read_coo<C: ComputeContext>(
    session: &mut DeviceSession<C>,
    capacity: usize,
    rows: usize,
    cols: usize,
) -> Result<CsrMatrix> {
    let written = session.read_counter(BUF_COUNTER)?;
    if written > capacity {
        return Err(SpGemmError::Dispatch(format!(
            "COO kernel wrote {} triples into {} slots",
            written, capacity
        )));
    }

    session.read(BUF_OUT_ROW)?;
    session.read(BUF_OUT_COL)?;
    session.read(BUF_OUT_VALUE)?;

    let out_rows = session.host(BUF_OUT_ROW)?.as_ints();
    let out_cols = session.host(BUF_OUT_COL)?.as_ints();
    let out_vals = session.host(BUF_OUT_VALUE)?.as_floats();
    let (Some(out_rows), Some(out_cols), Some(out_vals)) = (out_rows, out_cols, out_vals) else {
        return Err(SpGemmError::Dispatch("COO output buffers have the wrong element type".to_string()));
    };

    let triples: Vec<(usize, usize, f32)> = out_rows[..written]
        .iter()
        .zip(&out_cols[..written])
        .zip(&out_vals[..written])
        .map(|((&r, &c), &v)| (r as usize, c as usize, v))
        .collect();

    CsrMatrix::from_coo(&triples, rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::host::HostDevice;

    #[test]
    fn test_choose_strategy_switch() {
        let heavy = EngineConfig::default();
        assert_eq!(choose_strategy(10_000, 10, &heavy), Strategy::GpuCoo);

        let light = EngineConfig {
            nnz_weight: 1,
            ..EngineConfig::default()
        };
        assert_eq!(choose_strategy(10, 10, &light), Strategy::GpuDense);

        let forced = EngineConfig {
            use_coo_always: true,
            nnz_weight: 1,
            ..EngineConfig::default()
        };
        assert_eq!(choose_strategy(10, 10, &forced), Strategy::GpuCoo);
    }

    #[test]
    fn test_engine_rejects_bad_config() {
        let config = EngineConfig {
            nnz_weight: 0,
            ..EngineConfig::default()
        };
        assert!(SpGemmEngine::new(HostDevice::new(), config).is_err());
    }

    #[test]
    fn test_cpu_path_records_strategy() {
        let engine = SpGemmEngine::new(HostDevice::new(), EngineConfig::cpu_only()).unwrap();
        let a = CsrMatrix::identity(3);

        let c = engine.multiply(&a, &a).unwrap();
        assert_eq!(c, a);
        assert_eq!(engine.last_strategy(), Some(Strategy::Cpu));
        assert!(engine.device().ledger().events().is_empty());
    }

    #[test]
    fn test_device_path_matches_cpu() {
        let engine = SpGemmEngine::new(HostDevice::new(), EngineConfig::default()).unwrap();
        let a = CsrMatrix::new(2, 3, vec![0, 2, 3], vec![0, 2, 1], vec![1.0, 2.0, 3.0]).unwrap();
        let b = CsrMatrix::new(3, 2, vec![0, 1, 2, 4], vec![1, 0, 0, 1], vec![4.0, 5.0, 6.0, 7.0])
            .unwrap();

        let device = engine.multiply(&a, &b).unwrap();
        let cpu = multiply_cpu(&a, &b, Default::default()).unwrap();
        assert_eq!(device, cpu);
        assert!(engine.device().ledger().is_clean());
    }

    #[test]
    fn test_empty_product_skips_device() {
        let engine = SpGemmEngine::new(HostDevice::new(), EngineConfig::default()).unwrap();
        let a = CsrMatrix::zeros(3, 3);
        let b = CsrMatrix::identity(3);

        let c = engine.multiply(&a, &b).unwrap();
        assert_eq!(c.row_ptr(), &[0, 0, 0, 0]);
        assert_eq!(engine.last_strategy(), None);
        assert!(engine.device().ledger().events().is_empty());
    }
}
