//! Attribute decoding for Password Settings Objects.
//!
//! Active Directory stores PSO durations as signed 64-bit counts of
//! 100-nanosecond intervals. A negative value is a relative duration, `0`
//! means "never"/"no minimum", and `i64::MIN` is the "forever" marker. Flags use
//! the LDAP Boolean syntax (`TRUE` / `FALSE`).
//!
//! Every decoder here is pure. Field-level decoders return a [`Decoded`] so
//! callers can tell an absent attribute from an explicit zero and from a value
//! that could not be decoded.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DecodeFailure, DecodeFailureKind};
use crate::model::{attr, PasswordSettings};
use crate::operation::DirectoryEntry;

/// 100ns ticks per second.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// 100ns ticks per day.
pub const TICKS_PER_DAY: u64 = 86_400 * TICKS_PER_SECOND;

/// An elapsed duration decoded from interval ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyDuration {
    ticks: u64,
    days: f64,
}

impl PolicyDuration {
    /// Build from a non-negative tick count.
    pub fn from_ticks(ticks: u64) -> Self {
        Self {
            ticks,
            days: ticks as f64 / TICKS_PER_DAY as f64,
        }
    }

    /// Build from fractional days, rounding to the nearest tick.
    ///
    /// Inverse of [`as_days`](Self::as_days).
    pub fn from_days(days: f64) -> Self {
        let ticks = (days.max(0.0) * TICKS_PER_DAY as f64).round() as u64;
        Self::from_ticks(ticks)
    }

    /// Duration in 100ns ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Duration in fractional days.
    pub fn as_days(&self) -> f64 {
        self.days
    }

    /// Whole days, hours, minutes and seconds (sub-second remainder dropped).
    pub fn breakdown(&self) -> (u64, u64, u64, u64) {
        let total = self.ticks / TICKS_PER_SECOND;
        (
            total / 86_400,
            (total % 86_400) / 3_600,
            (total % 3_600) / 60,
            total % 60,
        )
    }
}

impl std::fmt::Display for PolicyDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ticks % TICKS_PER_DAY == 0 {
            let whole = self.ticks / TICKS_PER_DAY;
            let unit = if whole == 1 { "day" } else { "days" };
            return write!(f, "{whole} {unit}");
        }
        let text = format!("{:.4}", self.days);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        write!(f, "{text} days")
    }
}

/// A decoded interval attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interval {
    /// Stored as `0` or `i64::MIN`: never expires / no minimum / until unlocked.
    Never,
    /// A relative duration.
    Elapsed(PolicyDuration),
}

impl Interval {
    /// The elapsed duration, if any.
    pub fn duration(&self) -> Option<&PolicyDuration> {
        match self {
            Interval::Never => None,
            Interval::Elapsed(d) => Some(d),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Never => f.write_str("never"),
            Interval::Elapsed(d) => d.fmt(f),
        }
    }
}

/// Outcome of decoding one PSO attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Decoded<T> {
    /// The attribute is missing from the entry.
    NotPresent,
    /// The attribute decoded successfully.
    Value(T),
    /// The attribute is present but its value violates the encoding.
    Invalid(DecodeFailure),
}

impl<T> Decoded<T> {
    /// Borrow the decoded value.
    pub fn value(&self) -> Option<&T> {
        match self {
            Decoded::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The decode failure, if the value was invalid.
    pub fn failure(&self) -> Option<&DecodeFailure> {
        match self {
            Decoded::Invalid(f) => Some(f),
            _ => None,
        }
    }

    /// Whether the attribute was present but invalid.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Decoded::Invalid(_))
    }
}

/// Decode interval ticks.
///
/// Negative ticks are an elapsed duration of `abs(ticks) * 100ns`. `0` and
/// `i64::MIN` are the "never" sentinel. Positive ticks are rejected.
pub fn decode_interval(raw_ticks: i64) -> Result<Interval, DecodeFailureKind> {
    match raw_ticks {
        0 | i64::MIN => Ok(Interval::Never),
        t if t < 0 => Ok(Interval::Elapsed(PolicyDuration::from_ticks(t.unsigned_abs()))),
        _ => Err(DecodeFailureKind::PositiveInterval),
    }
}

/// Decode an LDAP Boolean token.
pub fn decode_boolean_flag(raw: &str) -> Result<bool, DecodeFailureKind> {
    if raw.eq_ignore_ascii_case("TRUE") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("FALSE") {
        Ok(false)
    } else {
        Err(DecodeFailureKind::InvalidBoolean)
    }
}

/// Decode a non-negative count (lengths, thresholds, precedence).
pub fn decode_count(raw: &str) -> Result<u32, DecodeFailureKind> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| DecodeFailureKind::InvalidInteger)?;
    if value < 0 {
        return Err(DecodeFailureKind::NegativeCount);
    }
    u32::try_from(value).map_err(|_| DecodeFailureKind::InvalidInteger)
}

fn decode_interval_text(raw: &str) -> Result<Interval, DecodeFailureKind> {
    let ticks: i64 = raw
        .trim()
        .parse()
        .map_err(|_| DecodeFailureKind::InvalidInteger)?;
    decode_interval(ticks)
}

/// Decode a single-valued attribute from an entry with `decoder`.
fn decode_attribute<T>(
    entry: &DirectoryEntry,
    attribute: &str,
    decoder: impl FnOnce(&str) -> Result<T, DecodeFailureKind>,
) -> Decoded<T> {
    let Some(values) = entry.values(attribute) else {
        return Decoded::NotPresent;
    };

    let outcome = if values.len() > 1 {
        Err(DecodeFailure::new(
            attribute,
            values.join(";"),
            DecodeFailureKind::MultipleValues,
        ))
    } else {
        let raw = values[0].as_str();
        decoder(raw).map_err(|kind| DecodeFailure::new(attribute, raw, kind))
    };

    match outcome {
        Ok(value) => Decoded::Value(value),
        Err(failure) => {
            warn!(dn = %entry.dn, attribute, raw = %failure.raw, kind = %failure.kind, "PSO attribute failed to decode");
            Decoded::Invalid(failure)
        }
    }
}

/// Decode an interval attribute of an entry.
pub fn decode_interval_attribute(entry: &DirectoryEntry, attribute: &str) -> Decoded<Interval> {
    decode_attribute(entry, attribute, decode_interval_text)
}

/// Decode a count attribute of an entry.
pub fn decode_count_attribute(entry: &DirectoryEntry, attribute: &str) -> Decoded<u32> {
    decode_attribute(entry, attribute, decode_count)
}

/// Decode a boolean attribute of an entry.
pub fn decode_boolean_attribute(entry: &DirectoryEntry, attribute: &str) -> Decoded<bool> {
    decode_attribute(entry, attribute, decode_boolean_flag)
}

/// Decode `msDS-PasswordComplexityEnabled`.
pub fn decode_complexity(entry: &DirectoryEntry) -> Decoded<bool> {
    decode_boolean_attribute(entry, attr::COMPLEXITY_ENABLED)
}

/// Decode `msDS-PasswordReversibleEncryptionEnabled`.
pub fn decode_reversible_encryption(entry: &DirectoryEntry) -> Decoded<bool> {
    decode_boolean_attribute(entry, attr::REVERSIBLE_ENCRYPTION_ENABLED)
}

/// Decode a raw PSO entry into [`PasswordSettings`].
///
/// Never fails: undecodable attributes are carried as [`Decoded::Invalid`].
pub fn decode_password_settings(entry: &DirectoryEntry) -> PasswordSettings {
    let name = entry
        .first(attr::NAME)
        .or_else(|| entry.first(attr::CN))
        .map(str::to_string)
        .unwrap_or_else(|| crate::model::rdn_value(&entry.dn).to_string());

    PasswordSettings {
        dn: entry.dn.clone(),
        name,
        description: entry.first(attr::DESCRIPTION).map(str::to_string),
        precedence: decode_count_attribute(entry, attr::PRECEDENCE),
        min_password_length: decode_count_attribute(entry, attr::MIN_PASSWORD_LENGTH),
        password_history_length: decode_count_attribute(entry, attr::PASSWORD_HISTORY_LENGTH),
        lockout_threshold: decode_count_attribute(entry, attr::LOCKOUT_THRESHOLD),
        lockout_duration: decode_interval_attribute(entry, attr::LOCKOUT_DURATION),
        lockout_observation_window: decode_interval_attribute(
            entry,
            attr::LOCKOUT_OBSERVATION_WINDOW,
        ),
        min_password_age: decode_interval_attribute(entry, attr::MIN_PASSWORD_AGE),
        max_password_age: decode_interval_attribute(entry, attr::MAX_PASSWORD_AGE),
        complexity_enabled: decode_complexity(entry),
        reversible_encryption_enabled: decode_reversible_encryption(entry),
        applies_to: entry
            .values(attr::PSO_APPLIES_TO)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_interval_thirty_minutes() {
        let decoded = decode_interval(-18_000_000_000).unwrap();
        let duration = decoded.duration().unwrap();
        assert_eq!(duration.ticks(), 18_000_000_000);
        assert!((duration.as_days() - 0.020_833_333).abs() < 1e-6);
        assert_eq!(duration.breakdown(), (0, 0, 30, 0));
        assert_eq!(duration.to_string(), "0.0208 days");
    }

    #[test]
    fn test_decode_interval_whole_days() {
        // 42 days
        let decoded = decode_interval(-36_288_000_000_000).unwrap();
        assert_eq!(decoded.to_string(), "42 days");

        let one = decode_interval(-(TICKS_PER_DAY as i64)).unwrap();
        assert_eq!(one.to_string(), "1 day");
    }

    #[test]
    fn test_decode_interval_zero_is_never() {
        assert_eq!(decode_interval(0), Ok(Interval::Never));
        assert_eq!(decode_interval(0).unwrap().to_string(), "never");
    }

    #[test]
    fn test_decode_interval_forever_marker() {
        assert_eq!(decode_interval(i64::MIN), Ok(Interval::Never));
    }

    #[test]
    fn test_decode_interval_positive_rejected() {
        for t in [1_i64, 600_000_000, i64::MAX] {
            assert_eq!(decode_interval(t), Err(DecodeFailureKind::PositiveInterval));
        }
    }

    #[test]
    fn test_decode_interval_is_abs_ticks_in_days() {
        for t in [-1_i64, -10_000_000, -864_000_000_000, -123_456_789_012, i64::MIN + 1] {
            let d = decode_interval(t).unwrap();
            let expected = t.unsigned_abs() as f64 / TICKS_PER_DAY as f64;
            let days = d.duration().unwrap().as_days();
            assert!(days >= 0.0);
            assert!((days - expected).abs() <= expected * 1e-12);
        }
    }

    #[test]
    fn test_duration_days_round_trip() {
        for days in [0.5_f64, 1.0, 0.020_833_333_333, 42.0, 3650.25] {
            let ticks = PolicyDuration::from_days(days).ticks() as i64;
            let back = decode_interval(-ticks).unwrap();
            assert!((back.duration().unwrap().as_days() - days).abs() < 1e-9);
        }
    }

    #[test]
    fn test_decode_boolean_flag() {
        assert_eq!(decode_boolean_flag("TRUE"), Ok(true));
        assert_eq!(decode_boolean_flag("FALSE"), Ok(false));
        assert_eq!(decode_boolean_flag("true"), Ok(true));
        assert_eq!(decode_boolean_flag("1"), Err(DecodeFailureKind::InvalidBoolean));
        assert_eq!(decode_boolean_flag("yes"), Err(DecodeFailureKind::InvalidBoolean));
        assert_eq!(decode_boolean_flag(""), Err(DecodeFailureKind::InvalidBoolean));
    }

    #[test]
    fn test_decode_count() {
        assert_eq!(decode_count("12"), Ok(12));
        assert_eq!(decode_count("0"), Ok(0));
        assert_eq!(decode_count("-1"), Err(DecodeFailureKind::NegativeCount));
        assert_eq!(decode_count("abc"), Err(DecodeFailureKind::InvalidInteger));
        assert_eq!(decode_count("99999999999"), Err(DecodeFailureKind::InvalidInteger));
    }

    fn strict_pso() -> DirectoryEntry {
        DirectoryEntry::new("CN=Strict,CN=Password Settings Container,CN=System,DC=corp,DC=local")
            .with("name", "Strict")
            .with("description", "Tier 0 accounts")
            .with("msDS-PasswordSettingsPrecedence", "10")
            .with("msDS-MinimumPasswordLength", "16")
            .with("msDS-PasswordHistoryLength", "24")
            .with("msDS-LockoutThreshold", "5")
            .with("msDS-LockoutDuration", "-18000000000")
            .with("msDS-LockoutObservationWindow", "-18000000000")
            .with("msDS-MinimumPasswordAge", "-864000000000")
            .with("msDS-MaximumPasswordAge", "-36288000000000")
            .with("msDS-PasswordComplexityEnabled", "TRUE")
            .with("msDS-PasswordReversibleEncryptionEnabled", "FALSE")
            .with("msDS-PSOAppliesTo", "CN=Domain Admins,CN=Users,DC=corp,DC=local")
    }

    #[test]
    fn test_decode_password_settings_full() {
        let pso = decode_password_settings(&strict_pso());

        assert_eq!(pso.name, "Strict");
        assert_eq!(pso.description.as_deref(), Some("Tier 0 accounts"));
        assert_eq!(pso.precedence.value(), Some(&10));
        assert_eq!(pso.min_password_length.value(), Some(&16));
        assert_eq!(pso.password_history_length.value(), Some(&24));
        assert_eq!(pso.lockout_threshold.value(), Some(&5));
        assert_eq!(pso.complexity_enabled.value(), Some(&true));
        assert_eq!(pso.reversible_encryption_enabled.value(), Some(&false));
        assert_eq!(
            pso.lockout_duration.value().and_then(Interval::duration).map(|d| d.breakdown()),
            Some((0, 0, 30, 0))
        );
        assert_eq!(pso.max_password_age.value().map(ToString::to_string), Some("42 days".to_string()));
        assert_eq!(pso.applies_to.len(), 1);
        assert!(pso.decode_failures().is_empty());
    }

    #[test]
    fn test_missing_attribute_is_not_present() {
        let entry = DirectoryEntry::new("CN=Loose,CN=Password Settings Container,CN=System,DC=corp,DC=local")
            .with("name", "Loose");
        let pso = decode_password_settings(&entry);
        assert_eq!(pso.password_history_length, Decoded::NotPresent);
        assert_eq!(pso.lockout_duration, Decoded::NotPresent);
        assert_eq!(pso.complexity_enabled, Decoded::NotPresent);
    }

    #[test]
    fn test_explicit_zero_differs_from_absent() {
        let zero = DirectoryEntry::new("CN=Zero").with("msDS-PasswordHistoryLength", "0");
        let absent = DirectoryEntry::new("CN=Absent");

        let zero = decode_count_attribute(&zero, "msDS-PasswordHistoryLength");
        let absent = decode_count_attribute(&absent, "msDS-PasswordHistoryLength");

        assert_eq!(zero, Decoded::Value(0));
        assert_eq!(absent, Decoded::NotPresent);
        assert_ne!(zero, absent);
    }

    #[test]
    fn test_invalid_attribute_is_flagged_and_others_decode() {
        // complexity ends up with two values: TRUE and MAYBE
        let entry = strict_pso().with("msDS-PasswordComplexityEnabled", "MAYBE");
        let pso = decode_password_settings(&entry);
        assert_eq!(
            pso.complexity_enabled.failure().map(|f| f.kind),
            Some(DecodeFailureKind::MultipleValues)
        );
        assert!(pso.lockout_duration.value().is_some());
        assert_eq!(pso.min_password_length.value(), Some(&16));
        assert_eq!(pso.decode_failures().len(), 1);
    }

    #[test]
    fn test_positive_interval_attribute_is_invalid() {
        let entry = DirectoryEntry::new("CN=Bad").with("msDS-MaximumPasswordAge", "36288000000000");
        let decoded = decode_interval_attribute(&entry, "msDS-MaximumPasswordAge");
        let failure = decoded.failure().unwrap();
        assert_eq!(failure.kind, DecodeFailureKind::PositiveInterval);
        assert_eq!(failure.raw, "36288000000000");
        assert_eq!(failure.attribute, "msDS-MaximumPasswordAge");
    }

    #[test]
    fn test_name_falls_back_to_rdn() {
        let entry = DirectoryEntry::new("CN=Fallback,CN=Password Settings Container,CN=System,DC=corp,DC=local");
        assert_eq!(decode_password_settings(&entry).name, "Fallback");
    }

    #[test]
    fn test_decoded_serialization_keeps_states_apart() {
        let absent: Decoded<Interval> = Decoded::NotPresent;
        let never: Decoded<Interval> = Decoded::Value(Interval::Never);

        let absent = serde_json::to_value(&absent).unwrap();
        let never = serde_json::to_value(&never).unwrap();

        assert_eq!(absent["state"], "not_present");
        assert_eq!(never["state"], "value");
        assert_eq!(never["value"]["kind"], "never");
    }
}
