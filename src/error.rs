use thiserror::Error;

/// Broad class of a [`MiningError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MiningError {
    #[error("min_support must satisfy 0 < min_support <= 1, got {0}")]
    InvalidMinSupport(f64),

    #[error("min_threshold {value} is out of range for metric '{metric}'")]
    InvalidThreshold { metric: &'static str, value: f64 },

    #[error("unknown metric: '{0}'")]
    UnknownMetric(String),

    #[error("unknown representation: '{0}'")]
    UnknownRepresentation(String),

    #[error("unknown empty transaction policy: '{0}'")]
    UnknownEmptyPolicy(String),

    #[error("max_len must be at least 1")]
    InvalidMaxLen,

    #[error("transaction collection is empty")]
    EmptyCollection,

    #[error("transaction {index} is empty")]
    EmptyTransaction { index: usize },

    #[error("support {value} of itemset entry {index} is outside [0, 1]")]
    InvalidSupport { index: usize, value: f64 },

    #[error("itemset entry {index} repeats an earlier itemset")]
    DuplicateItemset { index: usize },

    #[error("missing support for {role} {items}; the itemset collection is not closed under subsets")]
    MissingSupport { role: &'static str, items: String },
}

impl MiningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MiningError::InvalidMinSupport(_)
            | MiningError::InvalidThreshold { .. }
            | MiningError::UnknownMetric(_)
            | MiningError::UnknownRepresentation(_)
            | MiningError::UnknownEmptyPolicy(_)
            | MiningError::InvalidMaxLen => ErrorKind::Configuration,
            MiningError::EmptyCollection
            | MiningError::EmptyTransaction { .. }
            | MiningError::InvalidSupport { .. }
            | MiningError::DuplicateItemset { .. }
            | MiningError::MissingSupport { .. } => ErrorKind::Data,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

pub type Result<T> = std::result::Result<T, MiningError>;
