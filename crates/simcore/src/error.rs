use thiserror::Error;

/// Errors raised by an ODE solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("no system equation installed")]
    NoSystemEquation,

    #[error("system equation returned {found} derivatives, state has {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("solver needs at least one sub-step per integration")]
    InvalidStepCount,
}

/// Errors raised while stepping the physical system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Simulation diverged: {0}")]
    Diverged(String),

    #[error("Motor {motor} current {current:.3} A exceeds limit {limit:.3} A")]
    LimitViolation { motor: usize, current: f64, limit: f64 },

    #[error("Invalid timestep: {0} (must be > 0)")]
    InvalidTimestep(f64),

    #[error("No control input for motor {motor}")]
    MissingInput { motor: usize },
}
