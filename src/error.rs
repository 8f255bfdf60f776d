use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open workbook: {0}")]
    Open(#[from] calamine::Error),

    #[error("workbook contains no sheets")]
    EmptyWorkbook,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("parser crashed on '{file}': {message}")]
    Parse { file: String, message: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;
