//! End-to-end correctness of every multiply path

use hetspgemm::device::KernelKind;
use hetspgemm::{
    from_sprs_csr, multiply_cpu, reference_multiply, to_sprs_csr, CpuStrategy, CsrMatrix, EngineConfig,
    HostDevice, SpGemmEngine, SpGemmError, Strategy,
};

/// Brute-force dense product, row-major
fn dense_reference(a: &[f32], a_rows: usize, inner: usize, b: &[f32], b_cols: usize) -> Vec<f32> {
    let mut c = vec![0.0; a_rows * b_cols];
    for i in 0..a_rows {
        for k in 0..inner {
            for j in 0..b_cols {
                c[i * b_cols + j] += a[i * inner + k] * b[k * b_cols + j];
            }
        }
    }
    c
}

fn scenario_one() -> (CsrMatrix, CsrMatrix) {
    #[rustfmt::skip]
    let a = [
        1.0, 0.0, 0.0, 0.0, 1.0,
        0.0, 1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 1.0,
        0.0, 0.0, 1.0, 1.0, 0.0,
    ];
    #[rustfmt::skip]
    let b = [
        1.0, 0.0, 0.0, 1.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
        0.0, 0.0, 0.0, 1.0,
        1.0, 1.0, 0.0, 1.0,
    ];
    (
        CsrMatrix::from_flat_array(&a, 5).unwrap(),
        CsrMatrix::from_flat_array(&b, 4).unwrap(),
    )
}

fn engines() -> Vec<(&'static str, SpGemmEngine<HostDevice>)> {
    let dense = EngineConfig {
        nnz_weight: usize::MAX,
        ..EngineConfig::default()
    };
    let coo = EngineConfig {
        use_coo_always: true,
        ..EngineConfig::default()
    };
    let host_nnz = EngineConfig {
        nnz_on_device: false,
        ..EngineConfig::default()
    };
    let naive_launch = EngineConfig {
        use_local_work_size_heuristic: false,
        ..EngineConfig::default()
    };

    [
        ("cpu", EngineConfig::cpu_only()),
        ("default", EngineConfig::default()),
        ("dense", dense),
        ("coo", coo),
        ("host-nnz", host_nnz),
        ("naive-launch", naive_launch),
    ]
    .into_iter()
    .map(|(name, config)| (name, SpGemmEngine::new(HostDevice::new(), config).unwrap()))
    .collect()
}

#[test]
fn test_scenario_one_binary_product() {
    let (a, b) = scenario_one();
    assert!(a.is_binary() && b.is_binary());

    let expected = dense_reference(&a.to_dense(), 4, 5, &b.to_dense(), 4);
    #[rustfmt::skip]
    let by_hand = vec![
        2.0, 1.0, 0.0, 2.0,
        0.0, 1.0, 0.0, 0.0,
        1.0, 1.0, 0.0, 2.0,
        0.0, 0.0, 0.0, 2.0,
    ];
    assert_eq!(expected, by_hand);

    for strategy in [CpuStrategy::Merge, CpuStrategy::Dense, CpuStrategy::RowAccumulate] {
        let c = multiply_cpu(&a, &b, strategy).unwrap();
        assert_eq!(c.to_dense(), expected, "cpu strategy {}", strategy);
    }

    for (name, engine) in engines() {
        let c = engine.multiply(&a, &b).unwrap();
        assert_eq!(c.to_dense(), expected, "engine {}", name);
        assert_eq!(c.nnz(), 8, "engine {}", name);
        assert!(engine.device().ledger().is_clean(), "engine {} leaked", name);
    }
}

#[test]
fn test_scenario_two_zero_operand() {
    let a = CsrMatrix::zeros(3, 3);
    let b = CsrMatrix::from_flat_array(&[1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 5.0, 0.0, 6.0], 3).unwrap();

    for (name, engine) in engines() {
        let c = engine.multiply(&a, &b).unwrap();
        assert_eq!(c.nnz(), 0, "engine {}", name);
        assert_eq!(c.row_ptr(), &[0, 0, 0, 0], "engine {}", name);
        assert_eq!((c.n_rows(), c.n_cols()), (3, 3));
    }
}

#[test]
fn test_scenario_three_dimension_mismatch() {
    let a = CsrMatrix::zeros(3, 4);
    let b = CsrMatrix::identity(5);

    for (name, engine) in engines() {
        let result = engine.multiply(&a, &b);
        assert!(
            matches!(
                result,
                Err(SpGemmError::DimensionMismatch {
                    left_cols: 4,
                    right_rows: 5
                })
            ),
            "engine {}",
            name
        );
        // Rejected before any device resource was requested
        assert!(engine.device().ledger().events().is_empty(), "engine {}", name);
        assert_eq!(engine.last_strategy(), None);
    }

    assert!(reference_multiply(&a, &b).is_err());
}

#[test]
fn test_valued_rectangular_product() {
    // 2×3 times 3×4
    let a = CsrMatrix::from_flat_array(&[1.5, 0.0, -2.0, 0.0, 4.0, 0.0], 3).unwrap();
    let b = CsrMatrix::from_flat_array(
        &[0.0, 1.0, 0.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 0.0],
        4,
    )
    .unwrap();
    let expected = dense_reference(&a.to_dense(), 2, 3, &b.to_dense(), 4);

    for (name, engine) in engines() {
        let c = engine.multiply(&a, &b).unwrap();
        assert_eq!((c.n_rows(), c.n_cols()), (2, 4));
        assert_eq!(c.to_dense(), expected, "engine {}", name);
    }
}

#[test]
fn test_cancellation_drops_zeros() {
    // Row 0 of the product is 1*1 + 1*(-1) = 0 in column 0
    let a = CsrMatrix::from_flat_array(&[1.0, 1.0], 2).unwrap();
    let b = CsrMatrix::from_flat_array(&[1.0, 1.0], 1).unwrap();
    let b = CsrMatrix::new(2, 1, b.row_ptr().to_vec(), b.col_idx().to_vec(), vec![1.0, -1.0]).unwrap();

    for (name, engine) in engines() {
        let c = engine.multiply(&a, &b).unwrap();
        assert_eq!(c.nnz(), 0, "engine {}", name);
    }
}

#[test]
fn test_against_sprs() {
    let a = CsrMatrix::from_flat_array(
        &[
            1.0, 0.0, 2.0, 0.0, //
            0.0, 3.0, 0.0, 0.0, //
            4.0, 0.0, 0.0, 5.0, //
        ],
        4,
    )
    .unwrap();
    let b = a.transpose();

    let expected = from_sprs_csr(&to_sprs_csr(&a) * &to_sprs_csr(&b)).unwrap();

    for (name, engine) in engines() {
        let c = engine.multiply(&a, &b).unwrap();
        assert_eq!(c.to_dense(), expected.to_dense(), "engine {}", name);
    }
}

#[test]
fn test_strategies_recorded() {
    let (a, b) = scenario_one();
    for (name, engine) in engines() {
        engine.multiply(&a, &b).unwrap();
        let strategy = engine.last_strategy().unwrap();
        match name {
            "cpu" => assert_eq!(strategy, Strategy::Cpu),
            "coo" => assert_eq!(strategy, Strategy::GpuCoo),
            "dense" => assert_eq!(strategy, Strategy::GpuDense),
            _ => assert_ne!(strategy, Strategy::Cpu),
        }
    }
}

#[test]
fn test_failed_build_leaves_no_result() {
    let device = HostDevice::builder().fail_build(KernelKind::DenseMultiply).build();
    let config = EngineConfig {
        nnz_weight: usize::MAX,
        ..EngineConfig::default()
    };
    let engine = SpGemmEngine::new(device, config).unwrap();
    let (a, b) = scenario_one();

    assert!(matches!(engine.multiply(&a, &b), Err(SpGemmError::KernelBuild(_))));
    assert_eq!(engine.last_strategy(), None);
    assert!(engine.device().ledger().is_clean());
}
