//! Wall-clock instrumentation around a single call.

use std::time::{Duration, Instant};

/// A value together with how long it took to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timed<T> {
    /// What the measured operation returned.
    pub value: T,
    /// Wall-clock time spent inside the operation.
    pub elapsed: Duration,
}

impl<T, E> Timed<Result<T, E>> {
    /// Moves the error out so `?` can be applied to a timed fallible call.
    ///
    /// # Errors
    /// Returns the measured operation's error unchanged.
    pub fn transpose(self) -> Result<Timed<T>, E> {
        let elapsed = self.elapsed;
        self.value.map(|value| Timed { value, elapsed })
    }
}

/// Runs `op` and records the elapsed wall-clock time around it.
#[inline]
pub fn measure<T>(op: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = op();
    Timed { value, elapsed: start.elapsed() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_passes_the_value_through() {
        let timed = measure(|| 6 * 7);
        assert_eq!(timed.value, 42);
    }

    #[test]
    fn transpose_surfaces_errors() {
        let ok: Timed<Result<u8, &str>> = measure(|| Ok(1));
        assert_eq!(ok.transpose().unwrap().value, 1);

        let err: Timed<Result<u8, &str>> = measure(|| Err("boom"));
        assert_eq!(err.transpose().unwrap_err(), "boom");
    }
}
