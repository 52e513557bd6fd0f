//! Primality testing
//!
//! Trial division only. Results must agree exactly between local workers and a
//! remote peer, so there is no probabilistic shortcut.

/// Decides whether an integer is prime
///
/// Implementations must be pure: the same input always yields the same answer.
pub trait PrimalityOracle: Send + Sync {
    fn is_prime(&self, n: i32) -> bool;
}

/// Deterministic trial division oracle
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialDivision;

impl PrimalityOracle for TrialDivision {
    #[inline]
    fn is_prime(&self, n: i32) -> bool {
        is_prime(n)
    }
}

/// Trial division over `d` in `[2, floor(sqrt(n))]`
///
/// `d * d` is computed in 64 bits so candidates near `i32::MAX` do not overflow.
///
/// # Examples
///
/// ```
/// use primeshard::worker::is_prime;
///
/// assert!(is_prime(2));
/// assert!(is_prime(3));
/// assert!(!is_prime(1));
/// assert!(!is_prime(91));
/// ```
pub fn is_prime(n: i32) -> bool {
    if n < 2 {
        return false;
    }
    let n = n as i64;
    let mut d: i64 = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        let primes: Vec<i32> = (-5..=30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_squares_of_primes_are_composite() {
        for p in [2, 3, 5, 7, 11, 13, 46_337] {
            assert!(!is_prime(p * p), "{} should be composite", p * p);
        }
    }

    #[test]
    fn test_near_i32_max() {
        // 2^31 - 1 is a Mersenne prime
        assert!(is_prime(i32::MAX));
        assert!(!is_prime(i32::MAX - 1));
    }

    #[test]
    fn test_oracle_is_pure() {
        let oracle = TrialDivision;
        for n in 0..2_000 {
            assert_eq!(oracle.is_prime(n), oracle.is_prime(n));
            assert_eq!(oracle.is_prime(n), is_prime(n));
        }
    }

    #[test]
    fn test_prime_count_below_ten_thousand() {
        assert_eq!((0..10_000).filter(|&n| is_prime(n)).count(), 1229);
    }
}
