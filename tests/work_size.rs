//! Work-group sizing across a range of problem shapes

use hetspgemm::device::factor::{factors, is_prime};
use hetspgemm::device::work_size::{ceil_sqrt, launch_shape};
use hetspgemm::{good_single_size, good_sizes, NoSuitableSize};

#[test]
fn test_single_size_from_seventeen() {
    let (global, local) = good_single_size(17, 4).unwrap();

    assert!(global >= 17);
    assert!(!is_prime(global));
    assert!(local > 1 && local < 4);
    assert_eq!(global % local, 0);
    assert_eq!((global, local), (18, 3));
}

#[test]
fn test_single_size_deterministic_failure() {
    let first = good_single_size(17, 2);
    let second = good_single_size(17, 2);

    assert_eq!(
        first,
        Err(NoSuitableSize {
            bound: 17,
            max_bound: 2,
            attempts: 20
        })
    );
    assert_eq!(first, second);
}

#[test]
fn test_every_shape_is_legal() {
    for bound in [16, 64, 128, 256, 1024] {
        for size_x in 1..120 {
            for size_y in [1, 2, 3, 7, 31, 64, 97, 200] {
                let shape = good_sizes(size_x, size_y, bound).unwrap();
                let local = shape.local.unwrap();

                assert!(shape.global[0] >= size_x && shape.global[1] >= size_y);
                assert_eq!(shape.global[0] % local[0], 0, "x {} y {} bound {}", size_x, size_y, bound);
                assert_eq!(shape.global[1] % local[1], 0, "x {} y {} bound {}", size_x, size_y, bound);
                assert!(local[0] * local[1] <= bound, "x {} y {} bound {}", size_x, size_y, bound);
                assert!(shape.is_legal(bound));
            }
        }
    }
}

#[test]
fn test_padding_stays_within_budget() {
    for size in 1..500 {
        if let Ok((global, _)) = good_single_size(size, 16) {
            assert!(global - size < 20);
        }
    }
}

#[test]
fn test_tiny_bound_fails() {
    // ceil(sqrt(3)) = 2 leaves no divisor strictly between 1 and 2
    assert!(good_sizes(10, 10, 3).is_err());
    // ...unless the whole grid fits one group
    assert!(good_sizes(1, 2, 3).is_ok());
}

#[test]
fn test_naive_launch_shape() {
    let shape = launch_shape(1000, 3, 4, false).unwrap();
    assert_eq!(shape.global, [1000, 3]);
    assert_eq!(shape.local, None);
}

#[test]
fn test_factor_helpers() {
    assert_eq!(factors(36), vec![1, 2, 3, 4, 6, 9, 12, 18]);
    assert_eq!(ceil_sqrt(255), 16);
    assert_eq!(ceil_sqrt(257), 17);
}
