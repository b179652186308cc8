use std::io;
use std::path::PathBuf;

/// Errors raised while parsing solver logs, assembling report rows or
/// driving a sweep.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A line carried a registered prefix but its body did not fit the rule.
    #[error("line with prefix `{prefix}` does not match its grammar: {line}")]
    GrammarMismatch { prefix: String, line: String },

    /// A field required by the report layout was never seen in the log.
    #[error("field `{0}` was never populated")]
    MissingField(String),

    #[error("field `{field}` holds `{value}`, expected {expected}")]
    InvalidField {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("invalid pattern for prefix `{prefix}`: {source}")]
    InvalidPattern {
        prefix: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern for prefix `{prefix}` has {groups} capture groups but {names} field names")]
    FieldCount {
        prefix: String,
        groups: usize,
        names: usize,
    },

    #[error("malformed edge token `{0}`")]
    MalformedEdge(String),

    #[error("report file {0} was opened read-only")]
    ReadOnlyReport(PathBuf),

    #[error("file '{0}' does not exist")]
    MissingExecutable(PathBuf),

    #[error("failed to load config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read results file {path}: {source}")]
    Results {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid sweep config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    /// Name of the offending field, for the two field-level variants.
    pub fn field(&self) -> Option<&str> {
        match self {
            HarnessError::MissingField(name) => Some(name),
            HarnessError::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
