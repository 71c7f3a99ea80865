//! Two-field cron-like trigger expressions.

use std::fmt;
use std::str::FromStr;

use super::SimTime;

const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

/// A single field of a [`CronSpec`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CronField {
    /// `*`: matches any value.
    Any,
    /// `*/N`: matches every multiple of `N`, starting at 0.
    Every(u32),
    /// `N`: matches exactly `N`.
    At(u32),
}

impl CronField {
    fn parse(field: &str, max: u32) -> Result<Self, CronParseError> {
        if field == "*" {
            return Ok(Self::Any);
        }
        if let Some(step) = field.strip_prefix("*/") {
            let step: u32 = step.parse().map_err(|_| CronParseError::InvalidField {
                field: field.to_owned(),
            })?;
            if step == 0 {
                return Err(CronParseError::ZeroStep {
                    field: field.to_owned(),
                });
            }
            return Ok(Self::Every(step));
        }

        let value: u32 = field.parse().map_err(|_| CronParseError::InvalidField {
            field: field.to_owned(),
        })?;
        if value > max {
            return Err(CronParseError::OutOfRange { value, max });
        }

        Ok(Self::At(value))
    }

    /// Checks whether the field matches the provided minute or hour value.
    pub fn matches(self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Every(step) => value % step == 0,
            Self::At(at) => value == at,
        }
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Every(step) => write!(f, "*/{step}"),
            Self::At(at) => write!(f, "{at}"),
        }
    }
}

/// A `"<minute> <hour>"` trigger expression.
///
/// Simulation seconds are interpreted as the wall-clock time of day: the
/// minute of the hour is `⌊t/60⌋ mod 60` and the hour of the day is
/// `⌊t/3600⌋ mod 24`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CronSpec {
    minute: CronField,
    hour: CronField,
}

impl CronSpec {
    /// Creates a trigger from its two fields.
    pub fn new(minute: CronField, hour: CronField) -> Self {
        Self { minute, hour }
    }

    /// Returns the minute field.
    pub fn minute(&self) -> CronField {
        self.minute
    }

    /// Returns the hour field.
    pub fn hour(&self) -> CronField {
        self.hour
    }

    /// Returns the number of seconds from `now` until the next whole minute
    /// matching both fields.
    ///
    /// The offset is 0 if `now` lies exactly on a matching minute boundary.
    pub fn next_offset(&self, now: SimTime) -> f64 {
        // Only the time of day matters, which keeps minute numbers small.
        let secs = now.as_secs() % (MINUTES_PER_DAY * 60) as f64;
        let first_minute = (secs / 60.0).ceil() as u64;

        // Any valid expression matches at least once a day.
        let minute = (first_minute..=first_minute + MINUTES_PER_DAY)
            .find(|&m| {
                self.minute.matches((m % MINUTES_PER_HOUR) as u32)
                    && self
                        .hour
                        .matches(((m % MINUTES_PER_DAY) / MINUTES_PER_HOUR) as u32)
            })
            .unwrap_or(first_minute + MINUTES_PER_DAY);

        (minute as f64 * 60.0 - secs).max(0.0)
    }
}

impl FromStr for CronSpec {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [minute, hour] = fields.as_slice() else {
            return Err(CronParseError::FieldCount(fields.len()));
        };

        Ok(Self {
            minute: CronField::parse(minute, 59)?,
            hour: CronField::parse(hour, 23)?,
        })
    }
}

impl fmt::Display for CronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.minute, self.hour)
    }
}

/// Error returned when a cron expression cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CronParseError {
    /// The expression does not have exactly two fields.
    #[error("expected 2 fields (\"<minute> <hour>\"), found {0}")]
    FieldCount(usize),
    /// A field is neither `*`, `*/N` nor an integer.
    #[error("invalid cron field `{field}`")]
    InvalidField {
        /// The offending field.
        field: String,
    },
    /// A step of zero was given.
    #[error("step of cron field `{field}` must be at least 1")]
    ZeroStep {
        /// The offending field.
        field: String,
    },
    /// A literal value exceeds the field range.
    #[error("cron value {value} is out of range 0..={max}")]
    OutOfRange {
        /// The literal value.
        value: u32,
        /// The largest valid value for the field.
        max: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> SimTime {
        SimTime::from_secs(secs).unwrap()
    }

    #[test]
    fn cron_parse() {
        let spec: CronSpec = "35 *".parse().unwrap();
        assert_eq!(spec, CronSpec::new(CronField::At(35), CronField::Any));

        let spec: CronSpec = " */5   10 ".parse().unwrap();
        assert_eq!(spec, CronSpec::new(CronField::Every(5), CronField::At(10)));
        assert_eq!(spec.to_string(), "*/5 10");
    }

    #[test]
    fn cron_parse_errors() {
        assert_eq!("*".parse::<CronSpec>(), Err(CronParseError::FieldCount(1)));
        assert_eq!(
            "0 0 * * *".parse::<CronSpec>(),
            Err(CronParseError::FieldCount(5))
        );
        assert!(matches!(
            "x *".parse::<CronSpec>(),
            Err(CronParseError::InvalidField { .. })
        ));
        assert!(matches!(
            "*/0 *".parse::<CronSpec>(),
            Err(CronParseError::ZeroStep { .. })
        ));
        assert_eq!(
            "60 *".parse::<CronSpec>(),
            Err(CronParseError::OutOfRange { value: 60, max: 59 })
        );
        assert_eq!(
            "0 24".parse::<CronSpec>(),
            Err(CronParseError::OutOfRange { value: 24, max: 23 })
        );
    }

    #[test]
    fn cron_literal_minute() {
        let spec: CronSpec = "35 *".parse().unwrap();

        assert_eq!(spec.next_offset(at(0.0)), 35.0 * 60.0);
        assert_eq!(spec.next_offset(at(35.0 * 60.0)), 0.0);
        // Half a minute past 00:35, the next match is 01:35.
        assert_eq!(spec.next_offset(at(35.5 * 60.0)), 59.5 * 60.0);
    }

    #[test]
    fn cron_step_minute() {
        let spec: CronSpec = "*/10 *".parse().unwrap();

        assert_eq!(spec.next_offset(at(0.0)), 0.0);
        assert_eq!(spec.next_offset(at(1.0)), 599.0);
        assert_eq!(spec.next_offset(at(55.0 * 60.0)), 5.0 * 60.0);
    }

    #[test]
    fn cron_any_rounds_to_next_minute() {
        let spec: CronSpec = "* *".parse().unwrap();

        assert_eq!(spec.next_offset(at(120.0)), 0.0);
        assert_eq!(spec.next_offset(at(121.5)), 58.5);
    }

    #[test]
    fn cron_literal_hour() {
        let spec: CronSpec = "0 10".parse().unwrap();

        assert_eq!(spec.next_offset(at(0.0)), 10.0 * 3600.0);
        // Just after 10:00, the next match is 10:00 on the following day.
        assert_eq!(spec.next_offset(at(10.0 * 3600.0 + 60.0)), 24.0 * 3600.0 - 60.0);
    }

    #[test]
    fn cron_wraps_around_days() {
        let spec: CronSpec = "30 2".parse().unwrap();
        let day = 24.0 * 3600.0;

        assert_eq!(spec.next_offset(at(3.0 * day)), 2.5 * 3600.0);
        assert_eq!(spec.next_offset(at(3.0 * day + 3.0 * 3600.0)), day - 0.5 * 3600.0);
    }

    #[test]
    fn cron_far_future() {
        let spec: CronSpec = "*/10 *".parse().unwrap();

        let offset = spec.next_offset(at(1e25));
        assert!((0.0..=600.0).contains(&offset), "{offset}");
        assert!(spec.next_offset(at(f64::MAX)).is_finite());
    }
}
