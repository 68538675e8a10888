use std::borrow::Cow;
use std::fmt;

use crate::error::MetricsError;

/// A metric unit, such as `seconds` or `bytes`.
///
/// Units are free-form tokens, but a handful of well-known units are provided
/// as constants. When a metric carries a unit, its name must end in
/// `_<unit>`; that invariant is enforced by
/// [`MetricMetadata`](crate::MetricMetadata).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unit(Cow<'static, str>);

impl Unit {
    /// Seconds.
    pub const SECONDS: Unit = Unit(Cow::Borrowed("seconds"));
    /// Bytes.
    pub const BYTES: Unit = Unit(Cow::Borrowed("bytes"));
    /// A unitless ratio between 0 and 1.
    pub const RATIO: Unit = Unit(Cow::Borrowed("ratio"));
    /// Degrees Celsius.
    pub const CELSIUS: Unit = Unit(Cow::Borrowed("celsius"));
    /// Joules.
    pub const JOULES: Unit = Unit(Cow::Borrowed("joules"));
    /// Grams.
    pub const GRAMS: Unit = Unit(Cow::Borrowed("grams"));
    /// Meters.
    pub const METERS: Unit = Unit(Cow::Borrowed("meters"));
    /// Volts.
    pub const VOLTS: Unit = Unit(Cow::Borrowed("volts"));
    /// Amperes.
    pub const AMPERES: Unit = Unit(Cow::Borrowed("amperes"));

    /// Creates a unit from a free-form token.
    ///
    /// The token must be non-empty and consist of `[a-zA-Z0-9_]` characters.
    pub fn new<S: Into<String>>(name: S) -> Result<Unit, MetricsError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricsError::InvalidArgument("unit must not be empty".to_string()));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MetricsError::InvalidArgument(format!("invalid unit: {}", name)));
        }
        Ok(Unit(Cow::Owned(name)))
    }

    /// The unit token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Unit;

    #[test]
    fn test_well_known_units() {
        assert_eq!(Unit::SECONDS.as_str(), "seconds");
        assert_eq!(Unit::BYTES.as_str(), "bytes");
        assert_eq!(Unit::RATIO.as_str(), "ratio");
    }

    #[test]
    fn test_free_form_unit() {
        let unit = Unit::new("centigrade").expect("valid unit");
        assert_eq!(unit.as_str(), "centigrade");
        assert_eq!(unit, Unit::new("centigrade").unwrap());
    }

    #[test]
    fn test_invalid_units() {
        assert!(Unit::new("").is_err());
        assert!(Unit::new("two words").is_err());
        assert!(Unit::new("per/second").is_err());
    }
}
