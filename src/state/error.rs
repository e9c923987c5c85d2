use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize history store: {0}")]
    History(#[source] anyhow::Error),

    #[error("Failed to initialize vector store: {0}")]
    Index(#[source] anyhow::Error),

    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),
}
