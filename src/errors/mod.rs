use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown dispatcher kind: {0}")]
    UnknownDispatcher(String),

    #[error("Unknown feed reader: {0}")]
    UnknownReader(String),

    // Feed errors
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Unexpected content type '{content_type}' from {url}")]
    UnexpectedContent { url: String, content_type: String },

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    // Storage errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("History for source '{0}' was already committed in this run")]
    AlreadyCommitted(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Channel errors from the bot API library
    #[error("Channel error: {0}")]
    Channel(String),
}

impl FeederError {
    /// Errors that must abort a run instead of being scoped to one source
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            FeederError::Persistence(_)
                | FeederError::AlreadyCommitted(_)
                | FeederError::Json(_)
                | FeederError::Io(_)
        )
    }
}

impl From<channels::ChannelError> for FeederError {
    fn from(err: channels::ChannelError) -> Self {
        FeederError::Channel(err.to_string())
    }
}

pub type FeederResult<T> = Result<T, FeederError>;
