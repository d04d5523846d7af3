use thiserror::Error;

/// Everything that can go wrong between issuing a request and handing
/// shaped data to a view region.
#[derive(Error, Debug)]
pub enum Error {
    #[error("server returned status {status}")]
    Server { status: u16 },

    #[error("expected JSON response (status {status}), got: {body_preview}")]
    UnexpectedContentType { status: u16, body_preview: String },

    #[error("empty response body (status {status})")]
    EmptyResponse { status: u16 },

    #[error("malformed JSON (status {status}): {parse_error}; body: {body_preview}")]
    MalformedJson {
        status: u16,
        body_preview: String,
        parse_error: String,
    },

    #[error("response missing field `{name}`")]
    MissingField { name: String },

    #[error("field `{name}` has unexpected shape: {detail}")]
    BadFieldShape { name: String, detail: String },

    #[error("grid `{field}` has unequal row lengths")]
    RaggedGrid { field: String },

    #[error("dvh dose_values and volume_percentages differ in length")]
    DvhLengthMismatch,

    #[error("required fields missing: {}", .missing_fields.join(", "))]
    Validation { missing_fields: Vec<&'static str> },

    #[error("no dataset selected")]
    NoSelection,

    #[error("network failure: {0}")]
    Network(String),
}

impl Error {
    /// Short machine-readable tag, used as the log category suffix.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Server { .. } => "server_error",
            Error::UnexpectedContentType { .. } => "unexpected_content_type",
            Error::EmptyResponse { .. } => "empty_response",
            Error::MalformedJson { .. } => "malformed_json",
            Error::MissingField { .. } => "missing_field",
            Error::BadFieldShape { .. } => "bad_field_shape",
            Error::RaggedGrid { .. } => "ragged_grid",
            Error::DvhLengthMismatch => "dvh_length_mismatch",
            Error::Validation { .. } => "validation",
            Error::NoSelection => "no_selection",
            Error::Network(_) => "network",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
