use thiserror::Error;

/// Every failure the numeric core can report. All of them are synchronous
/// and local; the caller decides whether to abort.
#[derive(Debug, Error)]
pub enum Error {
    /// Operand shapes are incompatible for `op`. Shapes are `(rows, cols)`.
    #[error("dimension mismatch in {op}: {left:?} vs {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("matrix is singular and cannot be inverted")]
    Singular,

    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("label {label} is out of range for {num_classes} classes")]
    InvalidLabel { label: usize, num_classes: usize },

    #[error("invalid training config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
