//! ODE integration for kinetic simulation.
//!
//! The fitness evaluator only relies on the [`Integrator`] contract: prepare
//! once, reset per run, advance to a target time, read the state back.
//! [`DormandPrince`] adapts the `ode_solvers` Dormand-Prince 5(4) stepper to
//! that contract and is the integrator used by default.

use ode_solvers::dop_shared::{IntegrationError as SolverError, OutputType};
use ode_solvers::dopri5::Dopri5;
use ode_solvers::{DVector, System};

use crate::schema::IntegratorConfig;

/// A system of first-order ODEs `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Length of the state vector.
    fn dimension(&self) -> usize;

    /// Write `f(t, y)` into `dy`.
    fn derivatives(&self, t: f64, y: &[f64], dy: &mut [f64]);
}

/// Working state of an ODE solver.
///
/// Each concurrent evaluation must own its own integrator.
pub trait Integrator {
    /// Allocate working memory for systems of `dimension` variables.
    fn prepare_for_first_use(&mut self, dimension: usize);

    /// Reset time to zero and step-size state, loading `initial_state`.
    fn prepare_for_next_run(&mut self, initial_state: &[f64]);

    /// Advance the current state to `target_time`, returning the reached time.
    fn advance_to(
        &mut self,
        system: &dyn OdeSystem,
        target_time: f64,
    ) -> Result<f64, IntegrationError>;

    /// Latest state, indexed like the system's variables.
    fn current_state(&self) -> &[f64];

    /// Current simulation time.
    fn time(&self) -> f64;
}

/// Integration failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("Integrator was not prepared for a run")]
    NotPrepared,
    #[error("System has {found} variables but the integrator holds {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Target time {target} is before current time {current}")]
    BackwardTime { current: f64, target: f64 },
    #[error("Step size underflow after t = {time}")]
    StepSizeUnderflow { time: f64 },
    #[error("Exceeded {max_steps} steps at t = {time}")]
    TooManySteps { time: f64, max_steps: usize },
    #[error("State became non-finite at t = {time}")]
    NonFinite { time: f64 },
    #[error("Solver failed after t = {time}: {message}")]
    Solver { time: f64, message: String },
}

/// Right-hand side handed to the solver.
struct SolverSystem<'a> {
    system: &'a dyn OdeSystem,
}

impl System<f64, DVector<f64>> for SolverSystem<'_> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        self.system.derivatives(t, y.as_slice(), dy.as_mut_slice());
    }
}

// Step control constants of the reference DOPRI5 code.
const SAFETY: f64 = 0.9;
const BETA: f64 = 0.04;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const STIFFNESS_CHECK_INTERVAL: u32 = 1000;

/// Adaptive Dormand-Prince integrator backed by `ode_solvers::Dopri5`.
///
/// Each `advance_to` runs one solver from the current time to the target,
/// seeded with the current state.
pub struct DormandPrince {
    config: IntegratorConfig,
    t: f64,
    y: Vec<f64>,
    ready: bool,
}

impl DormandPrince {
    pub fn new(config: IntegratorConfig) -> Self {
        Self {
            config,
            t: 0.0,
            y: Vec::new(),
            ready: false,
        }
    }

    fn map_error(&self, error: SolverError) -> IntegrationError {
        match error {
            SolverError::MaxNumStepReached { .. } => IntegrationError::TooManySteps {
                time: self.t,
                max_steps: self.config.max_steps,
            },
            SolverError::StepSizeUnderflow { .. } => {
                IntegrationError::StepSizeUnderflow { time: self.t }
            }
            other => IntegrationError::Solver {
                time: self.t,
                message: other.to_string(),
            },
        }
    }
}

impl Integrator for DormandPrince {
    fn prepare_for_first_use(&mut self, dimension: usize) {
        self.y = vec![0.0; dimension];
        self.ready = false;
    }

    fn prepare_for_next_run(&mut self, initial_state: &[f64]) {
        if self.y.len() != initial_state.len() {
            self.prepare_for_first_use(initial_state.len());
        }
        self.y.copy_from_slice(initial_state);
        self.t = 0.0;
        self.ready = true;
    }

    fn advance_to(
        &mut self,
        system: &dyn OdeSystem,
        target_time: f64,
    ) -> Result<f64, IntegrationError> {
        if !self.ready {
            return Err(IntegrationError::NotPrepared);
        }
        if system.dimension() != self.y.len() {
            return Err(IntegrationError::DimensionMismatch {
                expected: self.y.len(),
                found: system.dimension(),
            });
        }
        if target_time < self.t {
            return Err(IntegrationError::BackwardTime {
                current: self.t,
                target: target_time,
            });
        }
        if target_time == self.t || self.y.is_empty() {
            self.t = target_time;
            return Ok(self.t);
        }

        let span = target_time - self.t;
        let mut stepper = Dopri5::from_param(
            SolverSystem { system },
            self.t,
            target_time,
            span,
            DVector::from_column_slice(&self.y),
            self.config.relative_tolerance,
            self.config.absolute_tolerance,
            SAFETY,
            BETA,
            MIN_FACTOR,
            MAX_FACTOR,
            span,
            self.config.initial_step.min(span),
            u32::try_from(self.config.max_steps).unwrap_or(u32::MAX),
            STIFFNESS_CHECK_INTERVAL,
            OutputType::Sparse,
        );
        stepper.integrate().map_err(|e| self.map_error(e))?;

        let Some(last) = stepper.y_out().last() else {
            return Err(IntegrationError::Solver {
                time: self.t,
                message: "solver produced no output".to_string(),
            });
        };
        if last.iter().any(|v| !v.is_finite()) {
            return Err(IntegrationError::NonFinite { time: target_time });
        }

        self.y.copy_from_slice(last.as_slice());
        self.t = target_time;
        Ok(self.t)
    }

    fn current_state(&self) -> &[f64] {
        &self.y
    }

    fn time(&self) -> f64 {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay;

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }
        fn derivatives(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
            dy[0] = -y[0];
        }
    }

    /// Harmonic oscillator: y0'' = -y0.
    struct Oscillator;

    impl OdeSystem for Oscillator {
        fn dimension(&self) -> usize {
            2
        }
        fn derivatives(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
            dy[0] = y[1];
            dy[1] = -y[0];
        }
    }

    /// y' = y^2 blows up at t = 1 for y(0) = 1.
    struct BlowUp;

    impl OdeSystem for BlowUp {
        fn dimension(&self) -> usize {
            1
        }
        fn derivatives(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
            dy[0] = y[0] * y[0];
        }
    }

    fn integrator() -> DormandPrince {
        let mut integrator = DormandPrince::new(IntegratorConfig::default());
        integrator.prepare_for_first_use(1);
        integrator
    }

    #[test]
    fn test_exponential_decay() {
        let mut integrator = integrator();
        integrator.prepare_for_next_run(&[1.0]);

        let t = integrator.advance_to(&Decay, 1.0).unwrap();
        assert_eq!(t, 1.0);
        assert!((integrator.current_state()[0] - (-1.0f64).exp()).abs() < 1e-6);

        integrator.advance_to(&Decay, 3.0).unwrap();
        assert!((integrator.current_state()[0] - (-3.0f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_oscillator_period() {
        let mut integrator = DormandPrince::new(IntegratorConfig::default());
        integrator.prepare_for_first_use(2);
        integrator.prepare_for_next_run(&[1.0, 0.0]);

        integrator
            .advance_to(&Oscillator, std::f64::consts::TAU)
            .unwrap();
        let state = integrator.current_state();
        assert!((state[0] - 1.0).abs() < 1e-4);
        assert!(state[1].abs() < 1e-4);
    }

    #[test]
    fn test_advance_to_current_time_is_noop() {
        let mut integrator = integrator();
        integrator.prepare_for_next_run(&[2.0]);
        assert_eq!(integrator.advance_to(&Decay, 0.0), Ok(0.0));
        assert_eq!(integrator.current_state(), &[2.0]);
    }

    #[test]
    fn test_next_run_resets_time() {
        let mut integrator = integrator();
        integrator.prepare_for_next_run(&[1.0]);
        integrator.advance_to(&Decay, 2.0).unwrap();

        integrator.prepare_for_next_run(&[5.0]);
        assert_eq!(integrator.time(), 0.0);
        assert_eq!(integrator.current_state(), &[5.0]);
    }

    #[test]
    fn test_backward_time_rejected() {
        let mut integrator = integrator();
        integrator.prepare_for_next_run(&[1.0]);
        integrator.advance_to(&Decay, 2.0).unwrap();
        assert!(matches!(
            integrator.advance_to(&Decay, 1.0),
            Err(IntegrationError::BackwardTime { .. })
        ));
    }

    #[test]
    fn test_not_prepared() {
        let mut integrator = integrator();
        assert_eq!(
            integrator.advance_to(&Decay, 1.0),
            Err(IntegrationError::NotPrepared)
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut integrator = integrator();
        integrator.prepare_for_next_run(&[1.0]);
        assert!(matches!(
            integrator.advance_to(&Oscillator, 1.0),
            Err(IntegrationError::DimensionMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_step_budget() {
        let mut integrator = DormandPrince::new(IntegratorConfig {
            max_steps: 3,
            ..Default::default()
        });
        integrator.prepare_for_first_use(1);
        integrator.prepare_for_next_run(&[1.0]);
        assert!(matches!(
            integrator.advance_to(&Decay, 1000.0),
            Err(IntegrationError::TooManySteps { max_steps: 3, .. })
        ));
    }

    #[test]
    fn test_finite_time_blow_up_fails() {
        let mut integrator = integrator();
        integrator.prepare_for_next_run(&[1.0]);
        assert!(integrator.advance_to(&BlowUp, 2.0).is_err());
    }
}
