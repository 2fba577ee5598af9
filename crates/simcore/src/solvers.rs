use std::fmt;

use log::trace;
use nalgebra::DVector;

use crate::error::SolverError;

/// Right-hand side of an ODE system, `f(t, y, params) -> dy/dt`.
pub type SystemEquation = Box<dyn Fn(f64, &DVector<f64>, &[f64]) -> DVector<f64> + Send>;

/// A fixed-step integration strategy for ODE systems.
///
/// The solver keeps its own time and state. Callers install the equation once,
/// then refresh the parameters before every call to [`OdeSolver::integrate`] so
/// that external inputs (load current, applied voltage) can change between steps
/// without rebuilding the equation.
pub trait OdeSolver {
    /// Installs the system equation used by all subsequent integrations.
    fn set_system_equation(&mut self, equation: SystemEquation);

    /// Sets the state vector and the time it belongs to.
    fn set_initial_value(&mut self, y0: DVector<f64>, t0: f64);

    /// Sets the parameters handed to the equation on the next integration.
    fn set_f_params(&mut self, params: &[f64]);

    /// Advances the internal state from the current time to `t` and returns it.
    fn integrate(&mut self, t: f64) -> Result<DVector<f64>, SolverError>;

    /// Current integration time.
    fn t(&self) -> f64;

    /// Current state vector.
    fn y(&self) -> &DVector<f64>;
}

/// Explicit (forward) Euler solver.
///
/// Each call to `integrate` splits the requested interval into `nsteps` equal
/// sub-steps of `y <- y + h * f(t, y, params)`. First-order accurate and only
/// stable while the step stays well below the fastest time constant of the system.
pub struct EulerSolver {
    nsteps: usize,
    equation: Option<SystemEquation>,
    params: Vec<f64>,
    t: f64,
    y: DVector<f64>,
}

impl EulerSolver {
    /// Solver taking a single Euler step per integration.
    pub fn new() -> Self {
        EulerSolver {
            nsteps: 1,
            equation: None,
            params: Vec::new(),
            t: 0.0,
            y: DVector::zeros(0),
        }
    }

    /// Solver splitting every integration into `nsteps` sub-steps.
    pub fn with_nsteps(nsteps: usize) -> Result<Self, SolverError> {
        if nsteps == 0 {
            return Err(SolverError::InvalidStepCount);
        }
        Ok(EulerSolver {
            nsteps,
            ..EulerSolver::new()
        })
    }

    pub fn nsteps(&self) -> usize {
        self.nsteps
    }
}

impl Default for EulerSolver {
    fn default() -> Self {
        EulerSolver::new()
    }
}

impl fmt::Debug for EulerSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EulerSolver")
            .field("nsteps", &self.nsteps)
            .field("has_equation", &self.equation.is_some())
            .field("params", &self.params)
            .field("t", &self.t)
            .field("y", &self.y.as_slice())
            .finish()
    }
}

impl OdeSolver for EulerSolver {
    fn set_system_equation(&mut self, equation: SystemEquation) {
        self.equation = Some(equation);
    }

    fn set_initial_value(&mut self, y0: DVector<f64>, t0: f64) {
        self.y = y0;
        self.t = t0;
    }

    fn set_f_params(&mut self, params: &[f64]) {
        self.params.clear();
        self.params.extend_from_slice(params);
    }

    fn integrate(&mut self, t: f64) -> Result<DVector<f64>, SolverError> {
        let equation = self.equation.as_ref().ok_or(SolverError::NoSystemEquation)?;

        let h = (t - self.t) / self.nsteps as f64;
        let mut y = self.y.clone();
        let mut t_step = self.t;

        for _ in 0..self.nsteps {
            let dy = equation(t_step, &y, &self.params);
            if dy.len() != y.len() {
                return Err(SolverError::DimensionMismatch {
                    expected: y.len(),
                    found: dy.len(),
                });
            }
            y += dy * h;
            t_step += h;
        }

        trace!("euler: t {:.6} -> {:.6}, y = {:?}", self.t, t, y.as_slice());
        // Land exactly on the requested time instead of the accumulated sub-steps.
        self.t = t;
        self.y = y;
        Ok(self.y.clone())
    }

    fn t(&self) -> f64 {
        self.t
    }

    fn y(&self) -> &DVector<f64> {
        &self.y
    }
}
