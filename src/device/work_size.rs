//! Work-group sizing for 2-D kernel launches
//!
//! A launch is legal when every global dimension is a multiple of the local
//! one and the local sizes multiply to at most the device's work-group bound.
//! Problem sizes are rarely that friendly, so each dimension is padded up to
//! a nearby composite number with enough small divisors; the kernels discard
//! the padding work items.

use tracing::debug;

use crate::constants::{MAX_SIZE_ATTEMPTS, MIN_DIVISORS};
use crate::device::factor::{factors, is_prime};
use crate::error::NoSuitableSize;

/// Global and local sizes of a 2-D launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchShape {
    /// Work items per dimension
    pub global: [usize; 2],
    /// Work-group size per dimension; `None` leaves the choice to the driver
    pub local: Option<[usize; 2]>,
}

impl LaunchShape {
    /// Total number of work items, padding included
    pub fn work_items(&self) -> usize {
        self.global[0] * self.global[1]
    }

    /// Checks the two dispatch constraints against a work-group bound
    pub fn is_legal(&self, max_work_group_size: usize) -> bool {
        match self.local {
            None => true,
            Some(local) => {
                local.iter().all(|&l| l > 0)
                    && self.global[0] % local[0] == 0
                    && self.global[1] % local[1] == 0
                    && local[0] * local[1] <= max_work_group_size
            }
        }
    }
}

/// Smallest integer whose square is at least `n`
pub fn ceil_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while root * root < n {
        root += 1;
    }
    root
}

/// Pads one dimension to a size with at least two divisors in `(1, max_bound)`
///
/// Tries `bound, bound + 1, ...` for the attempt budget, skipping primes.
/// Returns `(global, local)` where `local` is the largest accepted divisor.
pub fn good_single_size(bound: usize, max_bound: usize) -> Result<(usize, usize), NoSuitableSize> {
    for candidate in bound..bound + MAX_SIZE_ATTEMPTS {
        if is_prime(candidate) {
            continue;
        }

        let divisors: Vec<usize> = factors(candidate)
            .into_iter()
            .filter(|&f| f > 1 && f < max_bound)
            .collect();

        debug!(candidate, ?divisors, "size candidate");

        if divisors.len() >= MIN_DIVISORS {
            if let Some(&local) = divisors.last() {
                return Ok((candidate, local));
            }
        }
    }

    Err(NoSuitableSize {
        bound,
        max_bound,
        attempts: MAX_SIZE_ATTEMPTS,
    })
}

/// Launch shape for a `size_x × size_y` grid under a work-group bound
///
/// Grids smaller than the bound run as a single work group.
pub fn good_sizes(size_x: usize, size_y: usize, bound_size: usize) -> Result<LaunchShape, NoSuitableSize> {
    let max_sqrt = ceil_sqrt(bound_size);
    debug!(size_x, size_y, bound_size, max_sqrt, "calculating launch sizes");

    if size_x * size_y < bound_size {
        return Ok(LaunchShape {
            global: [size_x, size_y],
            local: Some([size_x, size_y]),
        });
    }

    let (global_x, local_x) = good_single_size(size_x, max_sqrt)?;
    let (global_y, local_y) = good_single_size(size_y, max_sqrt)?;

    Ok(LaunchShape {
        global: [global_x, global_y],
        local: Some([local_x, local_y]),
    })
}

/// One work item per cell, work-group size left to the driver
pub fn naive_shape(size_x: usize, size_y: usize) -> LaunchShape {
    LaunchShape {
        global: [size_x, size_y],
        local: None,
    }
}

/// Picks between the divisor heuristic and the naive shape
pub fn launch_shape(
    size_x: usize,
    size_y: usize,
    bound_size: usize,
    use_heuristic: bool,
) -> Result<LaunchShape, NoSuitableSize> {
    if use_heuristic {
        good_sizes(size_x, size_y, bound_size)
    } else {
        Ok(naive_shape(size_x, size_y))
    }
}
