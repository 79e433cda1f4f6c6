use std::error::Error as StdError;

/// Common error type for the synchronization engine.
///
/// External-system implementations should preserve the underlying error chain
/// via [`Error::external`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cloud request failed: {0}")]
    Cloud(#[from] cumulus_cloud::Error),

    #[error("external system error: {context}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("max {attempts} retries reached: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
