use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Client(#[from] vtep_client::ClientError),
}
