//! Core types for constraint and cluster management.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// XML scope every constraint patch is submitted against.
pub const CONSTRAINTS_SCOPE: &str = "constraints";

/// Priority score of a constraint.
///
/// Accepts signed integer literals and the infinity tokens. The short
/// forms `inf` / `-inf` are normalized to `INFINITY` / `-INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Score {
    /// `INFINITY`
    #[default]
    Infinity,
    /// `-INFINITY`
    NegativeInfinity,
    /// A finite score
    Value(i64),
}

impl Score {
    /// Parse a score as it appears in a live CIB.
    ///
    /// The cluster manager also accepts `+INFINITY` and signed or
    /// zero-padded integers, which declared scores do not.
    pub fn from_cib(value: &str) -> Option<Self> {
        match value.trim() {
            "INFINITY" | "+INFINITY" => Some(Score::Infinity),
            "-INFINITY" => Some(Score::NegativeInfinity),
            other => other.parse::<i64>().ok().map(Score::Value),
        }
    }
}

impl FromStr for Score {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFINITY" | "inf" => Ok(Score::Infinity),
            "-INFINITY" | "-inf" => Ok(Score::NegativeInfinity),
            _ => s
                .parse::<i64>()
                .ok()
                // "+5" and "05" parse but are not canonical integer literals
                .filter(|value| value.to_string() == s)
                .map(Score::Value)
                .ok_or_else(|| Error::InvalidScore(s.to_string())),
        }
    }
}

impl TryFrom<String> for Score {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Score> for String {
    fn from(score: Score) -> Self {
        score.to_string()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Infinity => write!(f, "INFINITY"),
            Score::NegativeInfinity => write!(f, "-INFINITY"),
            Score::Value(value) => write!(f, "{value}"),
        }
    }
}

/// Kind of a two-primitive constraint.
///
/// Both kinds share one element layout; only the tag and the names of the
/// two primitive attributes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    /// Start ordering (`rsc_order`)
    Order,
    /// Co-placement (`rsc_colocation`)
    Colocation,
}

impl ConstraintKind {
    /// Both kinds, in listing order.
    pub const ALL: [ConstraintKind; 2] = [ConstraintKind::Order, ConstraintKind::Colocation];

    /// Element tag in the constraints section.
    pub fn tag(&self) -> &'static str {
        match self {
            ConstraintKind::Order => "rsc_order",
            ConstraintKind::Colocation => "rsc_colocation",
        }
    }

    /// Parse a kind from an element tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rsc_order" => Some(ConstraintKind::Order),
            "rsc_colocation" => Some(ConstraintKind::Colocation),
            _ => None,
        }
    }

    /// Attribute holding the first primitive.
    pub fn first_attribute(&self) -> &'static str {
        match self {
            ConstraintKind::Order => "first",
            ConstraintKind::Colocation => "rsc",
        }
    }

    /// Attribute holding the second primitive.
    pub fn second_attribute(&self) -> &'static str {
        match self {
            ConstraintKind::Order => "then",
            ConstraintKind::Colocation => "with-rsc",
        }
    }

    /// Resource type name used by the host for declared objects.
    pub fn resource_type(&self) -> &'static str {
        match self {
            ConstraintKind::Order => "pcmk_order",
            ConstraintKind::Colocation => "pcmk_colocation",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Options shared by every component of a reconciliation pass.
///
/// Durations are whole seconds so the structure reads naturally from a
/// config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Attempt budget of the retry engine
    pub retry_count: u32,
    /// Delay between attempts, in seconds
    pub retry_step: u64,
    /// Deadline of a single attempt, in seconds
    pub retry_timeout: u64,
    /// Treat a false/empty result as a failed attempt
    pub retry_false_is_failure: bool,
    /// Fail instead of returning once the attempt budget is spent
    pub retry_fail_on_timeout: bool,
    /// Log mutating commands instead of running them
    pub debug_enabled: bool,
    /// Cluster properties appended to debug reports
    pub debug_show_properties: Vec<String>,
    /// Attach discovered constraints to declared ones before checking them
    pub prefetch: bool,
    /// Read the CIB from this file instead of the live cluster
    pub cib_file: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            retry_count: 360,
            retry_step: 5,
            retry_timeout: 60,
            retry_false_is_failure: true,
            retry_fail_on_timeout: false,
            debug_enabled: false,
            debug_show_properties: vec![
                "symmetric-cluster".to_string(),
                "no-quorum-policy".to_string(),
            ],
            prefetch: false,
            cib_file: None,
        }
    }
}

impl Options {
    /// Deadline of a single attempt.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout)
    }

    /// Retry policy described by these options.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_count,
            timeout: self.attempt_timeout(),
            delay: Duration::from_secs(self.retry_step),
            false_is_failure: self.retry_false_is_failure,
            fail_on_timeout: self.retry_fail_on_timeout,
        }
    }
}

/// Configuration for the retry engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts
    pub attempts: u32,
    /// Deadline of each attempt
    pub timeout: Duration,
    /// Sleep between attempts
    pub delay: Duration,
    /// A false result counts as a failed attempt
    pub false_is_failure: bool,
    /// Fail with `RetryExhausted` instead of returning nothing
    pub fail_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Options::default().retry_policy()
    }
}

impl RetryPolicy {
    /// Create a policy; false results count as failures, exhaustion is silent.
    pub fn new(attempts: u32, timeout: Duration, delay: Duration) -> Self {
        Self {
            attempts,
            timeout,
            delay,
            false_is_failure: true,
            fail_on_timeout: false,
        }
    }

    /// A single attempt with no delay.
    pub fn once(timeout: Duration) -> Self {
        Self::new(1, timeout, Duration::ZERO)
    }

    /// Set the false-is-failure flag.
    pub fn false_is_failure(mut self, enabled: bool) -> Self {
        self.false_is_failure = enabled;
        self
    }

    /// Set the fail-on-timeout flag.
    pub fn fail_on_timeout(mut self, enabled: bool) -> Self {
        self.fail_on_timeout = enabled;
        self
    }

    /// Time spent sleeping over the whole budget (attempts times delay).
    pub fn total_wait(&self) -> Duration {
        self.delay.saturating_mul(self.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_normalization() {
        assert_eq!("inf".parse::<Score>().unwrap().to_string(), "INFINITY");
        assert_eq!("-inf".parse::<Score>().unwrap().to_string(), "-INFINITY");
        assert_eq!("INFINITY".parse::<Score>().unwrap(), Score::Infinity);
        assert_eq!("-INFINITY".parse::<Score>().unwrap(), Score::NegativeInfinity);
        assert_eq!("100".parse::<Score>().unwrap().to_string(), "100");
        assert_eq!("-100".parse::<Score>().unwrap().to_string(), "-100");
        assert_eq!("0".parse::<Score>().unwrap(), Score::Value(0));
    }

    #[test]
    fn test_score_rejects_other_strings() {
        for value in ["fadsfasdf", "10a", "", "+5", "05", "Infinity", "1.5"] {
            let err = value.parse::<Score>().unwrap_err();
            assert!(matches!(err, Error::InvalidScore(_)), "{value} accepted");
            assert!(err.to_string().contains("score"));
        }
    }

    #[test]
    fn test_score_from_cib_is_lenient() {
        assert_eq!(Score::from_cib("+INFINITY"), Some(Score::Infinity));
        assert_eq!(Score::from_cib("50"), Some(Score::Value(50)));
        assert_eq!(Score::from_cib("+100"), Some(Score::Value(100)));
        assert_eq!(Score::from_cib("-05"), Some(Score::Value(-5)));
        assert_eq!(Score::from_cib("-INFINITY"), Some(Score::NegativeInfinity));
        assert_eq!(Score::from_cib("bogus"), None);
    }

    #[test]
    fn test_score_serde_uses_long_form() {
        let score: Score = serde_json::from_str("\"inf\"").unwrap();
        assert_eq!(serde_json::to_string(&score).unwrap(), "\"INFINITY\"");
        assert!(serde_json::from_str::<Score>("\"10a\"").is_err());
    }

    #[test]
    fn test_constraint_kind_attributes() {
        assert_eq!(ConstraintKind::Order.tag(), "rsc_order");
        assert_eq!(ConstraintKind::Order.second_attribute(), "then");
        assert_eq!(ConstraintKind::Colocation.first_attribute(), "rsc");
        assert_eq!(ConstraintKind::Colocation.second_attribute(), "with-rsc");
        assert_eq!(
            ConstraintKind::from_tag("rsc_colocation"),
            Some(ConstraintKind::Colocation)
        );
        assert_eq!(ConstraintKind::from_tag("rsc_location"), None);
    }

    #[test]
    fn test_options_defaults_and_partial_config() {
        let options: Options = serde_json::from_str(r#"{"retry_count": 3, "prefetch": true}"#).unwrap();
        assert_eq!(options.retry_count, 3);
        assert!(options.prefetch);
        assert_eq!(options.retry_step, 5);
        assert_eq!(options.debug_show_properties.len(), 2);

        let policy = options.retry_policy();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.total_wait(), Duration::from_secs(15));
    }
}
