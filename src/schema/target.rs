//! Target data that evolved networks are fitted against.

use serde::{Deserialize, Serialize};

use super::Species;

/// A single (input, output) pair of the target.
///
/// In time-series mode `input` is a time; in steady-state mode it is the
/// concentration the input species starts at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub input: f64,
    pub output: f64,
}

impl DataPoint {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }
}

/// Source of target data: explicit points or a sampled function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TargetSeries {
    /// Explicit data points, in order.
    Points { points: Vec<DataPoint> },
    /// A built-in function sampled on an evenly spaced grid over `[start, end]`.
    Function {
        function: TargetFunction,
        start: f64,
        end: f64,
        num_points: usize,
    },
}

impl Default for TargetSeries {
    fn default() -> Self {
        Self::Function {
            function: TargetFunction::ExponentialDecay {
                amplitude: 1.0,
                rate: 0.5,
            },
            start: 0.5,
            end: 10.0,
            num_points: 20,
        }
    }
}

/// Built-in target functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TargetFunction {
    Constant { value: f64 },
    Linear { slope: f64, intercept: f64 },
    ExponentialDecay { amplitude: f64, rate: f64 },
    Sine {
        amplitude: f64,
        frequency: f64,
        offset: f64,
    },
    /// `max * x^n / (k^n + x^n)`
    Hill { max: f64, k: f64, n: f64 },
}

impl TargetFunction {
    /// Evaluate the function at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        match *self {
            Self::Constant { value } => value,
            Self::Linear { slope, intercept } => slope * x + intercept,
            Self::ExponentialDecay { amplitude, rate } => amplitude * (-rate * x).exp(),
            Self::Sine {
                amplitude,
                frequency,
                offset,
            } => amplitude * (std::f64::consts::TAU * frequency * x).sin() + offset,
            Self::Hill { max, k, n } => {
                let xn = x.max(0.0).powf(n);
                max * xn / (k.powf(n) + xn)
            }
        }
    }
}

impl TargetSeries {
    /// Materialize the target as data points.
    pub fn sample(&self) -> Vec<DataPoint> {
        match self {
            Self::Points { points } => points.clone(),
            Self::Function {
                function,
                start,
                end,
                num_points,
            } => {
                let n = *num_points;
                (0..n)
                    .map(|i| {
                        let x = if n == 1 {
                            *start
                        } else {
                            start + (end - start) * i as f64 / (n - 1) as f64
                        };
                        DataPoint::new(x, function.eval(x))
                    })
                    .collect()
            }
        }
    }

    /// Validate the target for the given fitness mode.
    pub fn validate(&self, mode: &FitnessMode) -> Result<(), TargetError> {
        if let Self::Function {
            start,
            end,
            num_points,
            ..
        } = self
        {
            if *num_points == 0 {
                return Err(TargetError::Empty);
            }
            if !(end >= start) {
                return Err(TargetError::InvalidRange {
                    start: *start,
                    end: *end,
                });
            }
        }

        let points = self.sample();
        if points.is_empty() {
            return Err(TargetError::Empty);
        }
        for (i, p) in points.iter().enumerate() {
            if !p.input.is_finite() || !p.output.is_finite() {
                return Err(TargetError::NonFinite(i));
            }
        }

        if matches!(mode, FitnessMode::SteadyState { .. }) {
            if let Some(i) = points.iter().position(|p| p.input < 0.0) {
                return Err(TargetError::NegativeConcentration(i));
            }
        }

        if matches!(mode, FitnessMode::TimeSeries) {
            if points[0].input < 0.0 {
                return Err(TargetError::NegativeTime(points[0].input));
            }
            if let Some(i) = points.windows(2).position(|w| w[1].input < w[0].input) {
                return Err(TargetError::DecreasingTime(i + 1));
            }
        }
        Ok(())
    }
}

/// How a network's simulated behaviour is compared to the target.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "mode")]
pub enum FitnessMode {
    /// Data point inputs are times; the trajectory is compared point by point.
    #[default]
    TimeSeries,
    /// Data point inputs are initial concentrations of `input_species`;
    /// the steady state reached from each is compared to the output.
    SteadyState {
        input_species: Species,
        #[serde(default = "default_time_step")]
        time_step: f64,
        #[serde(default = "default_max_time")]
        max_time: f64,
        #[serde(default = "default_steady_state_tolerance")]
        tolerance: f64,
    },
}

fn default_time_step() -> f64 {
    2.0
}
fn default_max_time() -> f64 {
    50.0
}
fn default_steady_state_tolerance() -> f64 {
    0.001
}

impl FitnessMode {
    /// Validate mode parameters against the species alphabet.
    pub fn validate(&self, num_species: usize) -> Result<(), TargetError> {
        if let Self::SteadyState {
            input_species,
            time_step,
            max_time,
            tolerance,
        } = self
        {
            if *input_species >= num_species {
                return Err(TargetError::InputSpeciesOutOfRange {
                    species: *input_species,
                    num_species,
                });
            }
            if !(*time_step > 0.0) || !(*max_time >= *time_step) || !(*tolerance > 0.0) {
                return Err(TargetError::InvalidSteadyState);
            }
        }
        Ok(())
    }
}

/// Target validation errors.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Target contains no data points")]
    Empty,
    #[error("Target function range [{start}, {end}] is invalid")]
    InvalidRange { start: f64, end: f64 },
    #[error("Data point {0} is not finite")]
    NonFinite(usize),
    #[error("First data point time {0} is negative")]
    NegativeTime(f64),
    #[error("Data point {0} has a time earlier than its predecessor")]
    DecreasingTime(usize),
    #[error("Data point {0} has a negative input concentration")]
    NegativeConcentration(usize),
    #[error("Input species {species} is outside the alphabet of {num_species} species")]
    InputSpeciesOutOfRange { species: Species, num_species: usize },
    #[error("Steady-state time step, horizon and tolerance must be positive")]
    InvalidSteadyState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_sampling_inclusive() {
        let series = TargetSeries::Function {
            function: TargetFunction::Linear {
                slope: 2.0,
                intercept: 1.0,
            },
            start: 0.0,
            end: 4.0,
            num_points: 5,
        };
        let points = series.sample();
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], DataPoint::new(0.0, 1.0));
        assert_eq!(points[4], DataPoint::new(4.0, 9.0));
    }

    #[test]
    fn test_hill_half_max() {
        let f = TargetFunction::Hill {
            max: 2.0,
            k: 3.0,
            n: 2.0,
        };
        assert!((f.eval(3.0) - 1.0).abs() < 1e-12);
        assert_eq!(f.eval(0.0), 0.0);
    }

    #[test]
    fn test_decreasing_times_rejected() {
        let series = TargetSeries::Points {
            points: vec![
                DataPoint::new(1.0, 0.0),
                DataPoint::new(2.0, 0.0),
                DataPoint::new(1.5, 0.0),
            ],
        };
        assert!(matches!(
            series.validate(&FitnessMode::TimeSeries),
            Err(TargetError::DecreasingTime(2))
        ));

        let steady = FitnessMode::SteadyState {
            input_species: 0,
            time_step: 2.0,
            max_time: 50.0,
            tolerance: 1e-3,
        };
        assert!(series.validate(&steady).is_ok());
    }

    #[test]
    fn test_negative_input_concentration_rejected() {
        let steady = FitnessMode::SteadyState {
            input_species: 0,
            time_step: 2.0,
            max_time: 50.0,
            tolerance: 1e-3,
        };
        let series = TargetSeries::Points {
            points: vec![DataPoint::new(0.5, 1.0), DataPoint::new(-5.0, 1.0)],
        };
        assert!(matches!(
            series.validate(&steady),
            Err(TargetError::NegativeConcentration(1))
        ));

        let zero = TargetSeries::Points {
            points: vec![DataPoint::new(0.0, 1.0)],
        };
        assert!(zero.validate(&steady).is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let series = TargetSeries::Points { points: vec![] };
        assert!(matches!(
            series.validate(&FitnessMode::TimeSeries),
            Err(TargetError::Empty)
        ));
    }

    #[test]
    fn test_steady_state_species_checked() {
        let mode = FitnessMode::SteadyState {
            input_species: 4,
            time_step: 2.0,
            max_time: 50.0,
            tolerance: 1e-3,
        };
        assert!(mode.validate(5).is_ok());
        assert!(matches!(
            mode.validate(4),
            Err(TargetError::InputSpeciesOutOfRange { .. })
        ));
    }

    #[test]
    fn test_serde_tagged() {
        let json = r#"{"type":"Function","function":{"kind":"Constant","value":0.5},"start":0.0,"end":1.0,"num_points":3}"#;
        let series: TargetSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.sample().len(), 3);

        let mode: FitnessMode =
            serde_json::from_str(r#"{"mode":"SteadyState","input_species":1}"#).unwrap();
        assert!(matches!(
            mode,
            FitnessMode::SteadyState { input_species: 1, time_step, .. } if time_step == 2.0
        ));
    }
}
