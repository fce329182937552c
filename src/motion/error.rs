// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Error types for move submission and configuration.

use thiserror::Error;

/// Reason a move request produced no motion block.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MoveError {
    /// Pipeline has no free slot. Resubmit once blocks retire.
    #[error("motion pipeline full")]
    PipelineFull,

    /// Homing is running or a subdivided move is still being queued.
    #[error("motion controller busy")]
    Busy,

    /// Target equals the current commanded position (or rounds to zero steps).
    #[error("move has no distance")]
    NoMovement,

    /// The kinematics rejected the target and out-of-bounds moves are not allowed.
    #[error("target out of bounds")]
    OutOfBounds,
}

impl MoveError {
    /// Whether resubmitting the same request later may succeed without changing it.
    pub fn is_retryable(&self) -> bool {
        match self {
            MoveError::PipelineFull | MoveError::Busy => true,
            MoveError::NoMovement | MoveError::OutOfBounds => false,
        }
    }
}

/// Configuration rejected during validation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no axes configured")]
    NoAxes,

    #[error("{count} axes configured, at most {max} supported")]
    TooManyAxes { count: usize, max: usize },

    #[error("more than one axis flagged dominant")]
    MultipleDominantAxes,

    #[error("axis {axis}: steps per rotation must be positive")]
    InvalidStepsPerRotation { axis: usize },

    #[error("axis {axis}: acceleration must be positive")]
    InvalidAcceleration { axis: usize },

    #[error("axis index {axis} out of range")]
    AxisOutOfRange { axis: usize },

    #[error("pipeline length {requested} outside 2..={capacity}")]
    PipelineLength { requested: usize, capacity: usize },

    #[error("homing sequence too long")]
    HomingSequenceTooLong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backpressure_is_retryable() {
        assert!(MoveError::PipelineFull.is_retryable());
        assert!(MoveError::Busy.is_retryable());
        assert!(!MoveError::NoMovement.is_retryable());
        assert!(!MoveError::OutOfBounds.is_retryable());
    }
}
