use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfEditError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Image could not be embedded: {0}")]
    ImageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PdfEditError>;

impl From<lopdf::Error> for PdfEditError {
    fn from(e: lopdf::Error) -> Self {
        PdfEditError::OperationError(e.to_string())
    }
}
