use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Failed to create intake queue: {0}")]
    Queue(#[from] crate::intake::QueueError),

    #[error("Failed to initialize dispatcher: {0}")]
    Dispatch(#[from] crate::dispatch::DispatchError),

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
