use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A delay specification, in seconds.
///
/// In configuration files, a fixed delay is written as a plain number while a
/// random delay is written as a `{ min, max }` map.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delay {
    /// A constant delay.
    Fixed(f64),
    /// An integer delay drawn uniformly from `min..=max`.
    Uniform {
        /// Smallest delay.
        min: u64,
        /// Largest delay.
        max: u64,
    },
}

impl Delay {
    /// Checks that the delay can be sampled.
    pub fn validate(&self) -> Result<(), DelayError> {
        match *self {
            Self::Fixed(secs) if !(secs.is_finite() && secs >= 0.0) => {
                Err(DelayError::Negative(secs))
            }
            Self::Uniform { min, max } if min > max => Err(DelayError::EmptyRange { min, max }),
            _ => Ok(()),
        }
    }

    /// Draws a delay.
    ///
    /// Fixed delays do not consume randomness.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Self::Fixed(secs) => secs,
            Self::Uniform { min, max } => rng.gen_range(min..=max) as f64,
        }
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(secs) => write!(f, "{secs}s"),
            Self::Uniform { min, max } => write!(f, "{min}..={max}s"),
        }
    }
}

/// Error returned when a delay specification is invalid.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DelayError {
    /// A fixed delay is negative, infinite or NaN.
    #[error("delay must be a finite, non-negative number of seconds (got {0})")]
    Negative(f64),
    /// The bounds of a uniform delay are inverted.
    #[error("uniform delay range {min}..={max} is empty")]
    EmptyRange {
        /// Smallest delay.
        min: u64,
        /// Largest delay.
        max: u64,
    },
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn delay_validate() {
        assert_eq!(Delay::Fixed(0.0).validate(), Ok(()));
        assert_eq!(Delay::Fixed(-1.0).validate(), Err(DelayError::Negative(-1.0)));
        assert!(Delay::Fixed(f64::INFINITY).validate().is_err());
        assert_eq!(Delay::Uniform { min: 3, max: 3 }.validate(), Ok(()));
        assert_eq!(
            Delay::Uniform { min: 4, max: 2 }.validate(),
            Err(DelayError::EmptyRange { min: 4, max: 2 })
        );
    }

    #[test]
    fn delay_uniform_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let delay = Delay::Uniform { min: 5, max: 20 };

        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..10_000 {
            let d = delay.sample(&mut rng);
            assert!((5.0..=20.0).contains(&d));
            assert_eq!(d.fract(), 0.0);
            seen_min |= d == 5.0;
            seen_max |= d == 20.0;
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn delay_fixed_is_constant() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        assert_eq!(Delay::Fixed(2.5).sample(&mut rng), 2.5);
    }

    #[test]
    fn delay_deserialize() {
        let fixed: Delay = serde_json::from_str("1.5").unwrap();
        assert_eq!(fixed, Delay::Fixed(1.5));

        let fixed: Delay = serde_json::from_str("3").unwrap();
        assert_eq!(fixed, Delay::Fixed(3.0));

        let uniform: Delay = serde_yaml::from_str("{ min: 1, max: 7 }").unwrap();
        assert_eq!(uniform, Delay::Uniform { min: 1, max: 7 });
    }
}
