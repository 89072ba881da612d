use derive_more::Display;

#[derive(Debug, Display)]
pub enum SError {
    #[display("I/O error: {_0}")]
    IOError(String),
    #[display("Parse error: {_0}")]
    ParseError(String),
    #[display("File or directory not found: {_0}")]
    FileOrDirectoryNotFound(String),
    #[display("Mod not found: {_0}")]
    ModNotFound(String),
    #[display("Unknown game: {_0}")]
    UnknownGame(String),
    #[display("Game has not been discovered: {_0}")]
    GameNotDiscovered(String),
    #[display("No active game")]
    NoActiveGame,
    #[display("No active profile for game {_0}")]
    NoActiveProfile(String),
    #[display("Download not found: {_0}")]
    DownloadNotFound(String),
    #[display("No deployment method supports game {_0}")]
    NoDeploymentMethod(String),
    #[display("Deployment method no longer available: {_0}")]
    DeploymentMethodUnavailable(String),
    #[display("Deployment into {_0} was not prepared")]
    NotPrepared(String),
    #[display("Action {action} rejected: {reason}")]
    InvalidAction { action: String, reason: String },
    #[display("Install failed: {_0}")]
    InstallFailed(String),
    #[display("Async runtime error: {_0}")]
    AsyncRuntimeError(String),
    #[display("Unexpected error: {_0}")]
    Unexpected(String),
}

impl SError {
    /// Whether the error points at a bug worth reporting rather than at the
    /// user's environment or configuration.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            SError::IOError(_)
                | SError::ParseError(_)
                | SError::AsyncRuntimeError(_)
                | SError::Unexpected(_)
        )
    }
}

impl std::error::Error for SError {}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<walkdir::Error> for SError {
    fn from(e: walkdir::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<toml::de::Error> for SError {
    fn from(e: toml::de::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::ser::Error> for SError {
    fn from(e: toml::ser::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<serde_json::Error> for SError {
    fn from(e: serde_json::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<camino::FromPathBufError> for SError {
    fn from(e: camino::FromPathBufError) -> Self {
        SError::ParseError(format!("Invalid UTF-8 path: {}", e))
    }
}

impl From<std::path::StripPrefixError> for SError {
    fn from(e: std::path::StripPrefixError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::ParseError(e.to_string())
    }
}
