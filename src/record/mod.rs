use crate::error::{HarnessError, Result};
use crate::grammar::GrammarRegistry;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Raw value captured for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Fields collected from one log file, keyed by field name.
///
/// Nothing is validated at accumulation time. Accessors fail with
/// [`HarnessError::MissingField`] when a field never appeared, so a record
/// from a truncated run can still be inspected field by field.
#[derive(Debug, Clone, Default)]
pub struct ParsedRecord {
    fields: FxHashMap<String, FieldValue>,
    lines_read: usize,
    lines_matched: usize,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any earlier one for the same field.
    pub fn insert(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&FieldValue> {
        self.fields
            .get(name)
            .ok_or_else(|| HarnessError::MissingField(name.to_string()))
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.get(name)? {
            FieldValue::Text(value) => Ok(value),
            FieldValue::List(values) => Err(HarnessError::InvalidField {
                field: name.to_string(),
                value: values.join(", "),
                expected: "a single value",
            }),
        }
    }

    pub fn list(&self, name: &str) -> Result<&[String]> {
        match self.get(name)? {
            FieldValue::List(values) => Ok(values),
            FieldValue::Text(value) => Err(HarnessError::InvalidField {
                field: name.to_string(),
                value: value.clone(),
                expected: "a list of values",
            }),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let raw = self.text(name)?;
        raw.parse().map_err(|_| HarnessError::InvalidField {
            field: name.to_string(),
            value: raw.to_string(),
            expected: "an integer",
        })
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        let raw = self.text(name)?;
        raw.parse().map_err(|_| HarnessError::InvalidField {
            field: name.to_string(),
            value: raw.to_string(),
            expected: "a number",
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn lines_matched(&self) -> usize {
        self.lines_matched
    }
}

/// Folds log lines into a [`ParsedRecord`], top to bottom.
///
/// Lines with no registered prefix are skipped. A repeated field keeps its
/// last value. A line that carries a known prefix but breaks its rule
/// aborts the whole log with [`HarnessError::GrammarMismatch`].
pub fn accumulate<I, S>(registry: &GrammarRegistry, lines: I) -> Result<ParsedRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut record = ParsedRecord::new();
    for line in lines {
        let line = line.as_ref();
        record.lines_read += 1;
        if let Some(matched) = registry.match_line(line)? {
            record.lines_matched += 1;
            for (name, value) in matched.fields {
                record.insert(name, value);
            }
        }
    }
    debug!(
        lines = record.lines_read,
        matched = record.lines_matched,
        fields = record.len(),
        "log accumulated"
    );
    Ok(record)
}
