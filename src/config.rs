use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MiningError, Result};
use crate::membership::Representation;

/// Rule metric used for thresholding and as the primary sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Support,
    Confidence,
    #[default]
    Lift,
    Leverage,
    Conviction,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Support,
        Metric::Confidence,
        Metric::Lift,
        Metric::Leverage,
        Metric::Conviction,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Support => "support",
            Metric::Confidence => "confidence",
            Metric::Lift => "lift",
            Metric::Leverage => "leverage",
            Metric::Conviction => "conviction",
        }
    }

    /// Reject thresholds no rule could be scored against.
    pub fn validate_threshold(self, value: f64) -> Result<()> {
        let ok = match self {
            Metric::Support | Metric::Confidence => (0.0..=1.0).contains(&value),
            Metric::Lift | Metric::Conviction => value >= 0.0 && value.is_finite(),
            Metric::Leverage => (-1.0..=1.0).contains(&value),
        };
        if ok {
            Ok(())
        } else {
            Err(MiningError::InvalidThreshold {
                metric: self.name(),
                value,
            })
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| MiningError::UnknownMetric(s.to_string()))
    }
}

/// What the encoder does with a transaction that has no items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTransactionPolicy {
    /// Fail with [`MiningError::EmptyTransaction`].
    #[default]
    Reject,
    /// Count it in the support denominator and log a warning.
    Keep,
}

impl FromStr for EmptyTransactionPolicy {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(EmptyTransactionPolicy::Reject),
            "keep" => Ok(EmptyTransactionPolicy::Keep),
            _ => Err(MiningError::UnknownEmptyPolicy(s.to_string())),
        }
    }
}

/// Options recognised by [`crate::pipeline::mine`].
///
/// `min_support` and `min_threshold` have no defaults; everything else does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MiningConfig {
    pub min_support: f64,
    pub min_threshold: f64,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub max_len: Option<usize>,
    #[serde(default)]
    pub representation: Representation,
    #[serde(default)]
    pub empty_transactions: EmptyTransactionPolicy,
}

impl MiningConfig {
    pub fn new(min_support: f64, min_threshold: f64) -> Self {
        MiningConfig {
            min_support,
            min_threshold,
            metric: Metric::default(),
            max_len: None,
            representation: Representation::default(),
            empty_transactions: EmptyTransactionPolicy::default(),
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_empty_transactions(mut self, policy: EmptyTransactionPolicy) -> Self {
        self.empty_transactions = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_min_support(self.min_support)?;
        validate_max_len(self.max_len)?;
        self.metric.validate_threshold(self.min_threshold)
    }
}

pub(crate) fn validate_min_support(min_support: f64) -> Result<()> {
    // Written so that NaN fails too.
    if min_support > 0.0 && min_support <= 1.0 {
        Ok(())
    } else {
        Err(MiningError::InvalidMinSupport(min_support))
    }
}

pub(crate) fn validate_max_len(max_len: Option<usize>) -> Result<()> {
    match max_len {
        Some(0) => Err(MiningError::InvalidMaxLen),
        _ => Ok(()),
    }
}
