use thiserror::Error;

pub type Result<T> = std::result::Result<T, SotbError>;

#[derive(Debug, Error)]
pub enum SotbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row parsed but carries values that cannot be used. `line` is the
    /// 1-based line in the CSV file, header included.
    #[error("line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    #[error("the CSV file has no data rows")]
    EmptyInput,

    #[error("{phase} phase: the {category} category has no payees")]
    EmptyCategory {
        phase: &'static str,
        category: &'static str,
    },

    #[error(
        "invalid mpa-date '{0}': it must be formatted as [month]/[day]/[year] at [hour]"
    )]
    MpaDate(String),

    #[error("unknown tier identifier '{0}'")]
    UnknownTier(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SotbError {
    /// Error for the row starting on CSV line `line`.
    pub fn row(line: usize, message: impl Into<String>) -> Self {
        SotbError::InvalidRow {
            line,
            message: message.into(),
        }
    }
}
