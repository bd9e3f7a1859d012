use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarsubError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Gemini API key not set. Get one at https://aistudio.google.com/apikey")]
    MissingCredential,

    #[error("API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, FarsubError>;
