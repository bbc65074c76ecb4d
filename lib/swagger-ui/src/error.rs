use asset_fs::FsError;

/// Errors that can occur while setting up or running a [`crate::Handler`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Unable to load the embedded swagger-ui bundle")]
    Bundle(#[from] FsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Unable to build the HTTP response")]
    Http(#[from] http::Error),
    #[error("A spawned task didn't run to completion")]
    Join(#[from] tokio::task::JoinError),
    #[error("The specification document was poisoned by a panicking reader")]
    Poisoned,
}
