use wasm_bindgen::JsValue;

use crate::schema::ValidationError;

/// Errors produced while building, validating, querying or writing a GPX document.
#[derive(Debug, thiserror::Error)]
pub enum GpxError {
    /// A path or argument supplied by the caller is unusable (empty, wrong extension).
    #[error("invalid input: {0}")]
    Input(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The markup parsed but does not describe a usable GPX document.
    #[error("malformed GPX document: {0}")]
    Parse(String),

    /// An extension field with an empty name or value.
    #[error("constraint violation in <{element}>: {message}")]
    Constraint {
        element: String,
        message: String,
    },

    #[error("schema locator is empty")]
    MissingSchema,

    #[error("schema validation failed: {0}")]
    Schema(#[from] ValidationError),

    /// Negative tolerance, negative length, out-of-range index and similar misuse.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML write error: {0}")]
    Write(String),

    #[error("cannot decode interchange string: {0}")]
    Decode(String),
}

/// Coarse classification of [`GpxError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Parse,
    Constraint,
    Schema,
    Usage,
    Io,
}

impl GpxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) | Self::Decode(_) => ErrorKind::Input,
            Self::Xml(_) | Self::Parse(_) => ErrorKind::Parse,
            Self::Constraint { .. } => ErrorKind::Constraint,
            Self::MissingSchema | Self::Schema(_) => ErrorKind::Schema,
            Self::Usage(_) => ErrorKind::Usage,
            Self::Io(_) | Self::Write(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn constraint(element: &str, message: impl Into<String>) -> Self {
        Self::Constraint {
            element: element.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GpxError>;

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(GpxError::Input("x".into()).kind(), ErrorKind::Input);
        assert_eq!(GpxError::Parse("x".into()).kind(), ErrorKind::Parse);
        assert_eq!(
            GpxError::constraint("wpt", "empty value").kind(),
            ErrorKind::Constraint
        );
        assert_eq!(GpxError::MissingSchema.kind(), ErrorKind::Schema);
        assert_eq!(GpxError::Usage("x".into()).kind(), ErrorKind::Usage);
        assert_eq!(GpxError::Write("x".into()).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_display() {
        let err = GpxError::constraint("ele", "extension value is empty");
        assert_eq!(
            err.to_string(),
            "constraint violation in <ele>: extension value is empty"
        );
    }
}
