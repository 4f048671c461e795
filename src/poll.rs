//! Bounded busy-wait loops.

use crate::error::{Error, Result};

/// Spins while `busy` returns `true`, for at most `ceiling` iterations.
///
/// The condition is sampled once up front and once more after each
/// iteration, so a condition that never clears is sampled `ceiling + 1`
/// times and fails after exactly `ceiling` iterations. On success the
/// unused part of the budget is returned.
///
/// # Errors
///
/// [`Error::Timeout`] when the budget runs out.
///
/// ```rust
/// use dsi_pipeline::poll::spin_while;
///
/// let mut samples = 0;
/// let left = spin_while(10, || {
///     samples += 1;
///     samples < 4
/// });
/// assert_eq!(left, Ok(7));
/// ```
pub fn spin_while(ceiling: u32, mut busy: impl FnMut() -> bool) -> Result<u32> {
    let mut remaining = ceiling;
    loop {
        if !busy() {
            return Ok(remaining);
        }
        if remaining == 0 {
            return Err(Error::Timeout);
        }
        remaining -= 1;
    }
}

/// Spins until `done` returns `true`, for at most `ceiling` iterations.
///
/// # Errors
///
/// [`Error::Timeout`] when the budget runs out.
pub fn spin_until(ceiling: u32, mut done: impl FnMut() -> bool) -> Result<u32> {
    spin_while(ceiling, || !done())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::cell::Cell;

    use super::*;

    #[test]
    fn test_immediate_success_keeps_budget() {
        assert_eq!(spin_while(5, || false), Ok(5));
    }

    #[test]
    fn test_timeout_after_exactly_ceiling_iterations() {
        let samples = Cell::new(0u32);
        let result = spin_while(100, || {
            samples.set(samples.get() + 1);
            true
        });
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(samples.get(), 101);
    }

    #[test]
    fn test_clears_on_last_sample() {
        let samples = Cell::new(0u32);
        let result = spin_while(3, || {
            samples.set(samples.get() + 1);
            samples.get() <= 3
        });
        assert_eq!(result, Ok(0));
        assert_eq!(samples.get(), 4);
    }

    #[test]
    fn test_zero_ceiling_samples_once() {
        let samples = Cell::new(0u32);
        assert_eq!(
            spin_while(0, || {
                samples.set(samples.get() + 1);
                true
            }),
            Err(Error::Timeout)
        );
        assert_eq!(samples.get(), 1);
    }

    #[test]
    fn test_spin_until() {
        let mut polls = 0;
        assert_eq!(
            spin_until(10, || {
                polls += 1;
                polls == 2
            }),
            Ok(9)
        );
    }
}
