//! Structured error types for the Quire layout engine.
//!
//! Every variant is fatal: the caller is expected to abort the whole
//! document rather than emit a truncated report.

use thiserror::Error;

/// The unified error type returned by all public Quire API functions.
#[derive(Debug, Error)]
pub enum QuireError {
    /// The markup event stream was malformed (bad nesting, bad syntax).
    #[error("Markup error at byte {position}: {message}")]
    Markup { position: u64, message: String },

    /// A tag or text run appeared where the parent's behavior disallows it.
    #[error("'<{tag}>' not allowed inside of '<{parent}>', maybe a missing close tag?")]
    Structure { tag: String, parent: String },

    /// A table received a second caption, header group or footer group.
    #[error("<{tag}>, a '{display}', was defined more than once in a table")]
    DuplicateTableSection { tag: String, display: String },

    /// The stylesheet could not be tokenized or has an unexpected shape.
    #[error("CSS error at {line}:{column}: {message}")]
    Css {
        line: u32,
        column: u32,
        message: String,
    },

    /// A dimension used a unit the engine cannot convert to points.
    #[error("Dimension unit \"{0}\" is not implemented")]
    UnknownUnit(String),

    /// A selector used a pseudo-class or at-rule the engine does not support.
    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    /// A CSS value could not be converted for the given property.
    #[error("Invalid value for '{property}': {value}")]
    InvalidValue { property: String, value: String },

    /// Splitting produced a shape that violates the layout invariants.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Render options JSON failed to parse.
    #[error("Failed to parse render options: {source}{hint}")]
    Config {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "\n  Hint: check for trailing commas, missing quotes, or unescaped characters."
                    .to_string()
            }
            serde_json::error::Category::Data => {
                "\n  Hint: the JSON is valid but doesn't match the options schema. Check field names."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "\n  Hint: unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Config { source: e, hint }
    }
}

pub type Result<T, E = QuireError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_error_names_tag_and_parent() {
        let err = QuireError::Structure {
            tag: "td".to_string(),
            parent: "div".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'<td>' not allowed inside of '<div>', maybe a missing close tag?"
        );
    }

    #[test]
    fn config_error_carries_hint() {
        let json_err = serde_json::from_str::<serde_json::Value>("{,}").unwrap_err();
        let err: QuireError = json_err.into();
        assert!(err.to_string().contains("Hint"));
    }
}
