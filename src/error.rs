use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install dependency '{name}'")]
    Installation {
        name: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("Package manager exited with {status}: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("Package manager error: {0}")]
    PackageManager(String),

    #[error("Invalid requirement '{line}': {reason}")]
    Parse { line: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
