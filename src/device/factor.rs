//! Trial-division helpers for the work-group size search

/// Primality by trial division
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Divisors of `n` in increasing order, including 1 and excluding `n` itself
///
/// `factors(18)` is `[1, 2, 3, 6, 9]`. Zero has no divisors here.
pub fn factors(n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }

    let mut low = vec![1];
    let mut high = Vec::new();

    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            low.push(d);
            let pair = n / d;
            if pair != d {
                high.push(pair);
            }
        }
        d += 1;
    }

    low.extend(high.into_iter().rev());
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime() {
        let primes: Vec<usize> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(!is_prime(1));
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
    }

    #[test]
    fn test_factors() {
        assert_eq!(factors(18), vec![1, 2, 3, 6, 9]);
        assert_eq!(factors(16), vec![1, 2, 4, 8]);
        assert_eq!(factors(17), vec![1]);
        assert_eq!(factors(1), vec![1]);
        assert!(factors(0).is_empty());
    }

    #[test]
    fn test_factors_divide() {
        for n in 1..200 {
            for f in factors(n) {
                assert_eq!(n % f, 0);
                assert!(f < n || n == 1);
            }
        }
    }
}
