use thiserror::Error;

pub type Result<T> = std::result::Result<T, LayerError>;

/// Errors that can occur while loading or saving layers.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Underlying storage failure, propagated unchanged.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed persisted layer. No partially populated layer is returned.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The structured text encoder failed to render JSON.
    #[error("JSON encode error: {0}")]
    JsonEncode(#[from] serde_json::Error),

    /// The compact encoder failed to serialize the layer.
    #[error("compact encode error: {0}")]
    CompactEncode(#[from] bincode::Error),
}

/// One variant per malformation the structured decoder can distinguish.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A required field is absent from an object.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The same field occurs more than once in one object.
    #[error("field `{0}` appears more than once")]
    DuplicateField(String),

    /// Strict mode only: a field no encoder of this format emits.
    #[error("unrecognized field `{0}`")]
    UnknownField(String),

    /// A value has the wrong shape for its position.
    #[error("{context}: expected {expected}")]
    TypeMismatch {
        context: &'static str,
        expected: &'static str,
    },

    /// The input is not valid JSON at all.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// The compact payload is unreadable.
    #[error("compact payload unreadable: {0}")]
    Compact(#[from] bincode::Error),
}
