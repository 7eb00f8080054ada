use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hetspgemm::{ComputeDevice, CsrMatrix, EngineConfig, SpGemmEngine};

// --- CLI Arguments ---
#[derive(Parser, Debug)]
#[command(version, about = "Sparse matrix multiplication on CPU or compute device", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Multiply two JSON-encoded CSR matrices and print the product as JSON
    Multiply {
        /// Left operand
        a: PathBuf,
        /// Right operand
        b: PathBuf,

        /// Skip the compute device
        #[arg(long)]
        cpu_only: bool,

        /// Always use the COO device strategy
        #[arg(long)]
        coo: bool,

        /// Weight applied to the NNZ estimate in the dense/COO decision
        #[arg(long)]
        nnz_weight: Option<usize>,
    },
    /// Print the effective configuration
    Config,
}

fn load_matrix(path: &Path) -> anyhow::Result<CsrMatrix> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let matrix = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(matrix)
}

fn run<D: ComputeDevice>(device: D, config: EngineConfig, a: &CsrMatrix, b: &CsrMatrix) -> anyhow::Result<CsrMatrix> {
    let engine = SpGemmEngine::new(device, config)?;
    let product = engine.multiply(a, b)?;
    if let Some(strategy) = engine.last_strategy() {
        info!(%strategy, nnz = product.nnz(), "product computed");
    }
    Ok(product)
}

#[cfg(feature = "opencl")]
fn multiply_with_device(config: EngineConfig, a: &CsrMatrix, b: &CsrMatrix) -> anyhow::Result<CsrMatrix> {
    run(hetspgemm::OpenClDevice::new(), config, a, b)
}

#[cfg(not(feature = "opencl"))]
fn multiply_with_device(config: EngineConfig, a: &CsrMatrix, b: &CsrMatrix) -> anyhow::Result<CsrMatrix> {
    run(hetspgemm::HostDevice::new(), config, a, b)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging to stderr so stdout is clean for JSON output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = EngineConfig::from_env();

    match args.command {
        Commands::Multiply {
            a,
            b,
            cpu_only,
            coo,
            nnz_weight,
        } => {
            if cpu_only {
                config.disable_compute_device = true;
            }
            if coo {
                config.use_coo_always = true;
            }
            if let Some(weight) = nnz_weight {
                config.nnz_weight = weight;
            }

            let a = load_matrix(&a)?;
            let b = load_matrix(&b)?;
            let product = multiply_with_device(config, &a, &b)?;
            println!("{}", serde_json::to_string(&product)?);
        }
        Commands::Config => {
            println!("hetspgemm {}", hetspgemm::VERSION);
            println!("{:#?}", config);
        }
    }

    Ok(())
}
