use thiserror::Error;

/// A row references an entity that does not exist in the graph being built.
///
/// Raised while assembling a [`crate::SocialGraph`]; the edge or post is not
/// applied, so the graph is never left half-linked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Integrity error: {table} row ({row}) references missing {column} {missing_id}")]
pub struct IntegrityError {
    /// Table the offending row was read from.
    pub table: &'static str,
    /// The offending row, rendered as `column=value` pairs.
    pub row: String,
    /// Column holding the unresolved reference.
    pub column: &'static str,
    /// The id that did not resolve.
    pub missing_id: String,
}

impl IntegrityError {
    pub fn new(
        table: &'static str,
        row: impl Into<String>,
        column: &'static str,
        missing_id: impl ToString,
    ) -> Self {
        Self {
            table,
            row: row.into(),
            column,
            missing_id: missing_id.to_string(),
        }
    }
}
