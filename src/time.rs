use crate::Real;
use serde::{Deserialize, Serialize};

/// Time-stepping context passed to time-dependent terms.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStep<T> {
    /// Index of the current step. The initial state has step 0.
    pub step: usize,
    /// Step size. Must be positive.
    pub dt: T,
    pub time: T,
}

impl<T: Real> TimeStep<T> {
    /// The initial state with the given step size.
    ///
    /// # Panics
    ///
    /// Panics if `dt` is not positive.
    pub fn initial(dt: T) -> Self {
        assert!(dt > T::zero(), "Time step size must be positive");
        Self {
            step: 0,
            dt,
            time: T::zero(),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.step == 0
    }

    /// Returns the next time step.
    pub fn advance(&self) -> Self {
        Self {
            step: self.step + 1,
            dt: self.dt,
            time: self.time + self.dt,
        }
    }
}
