use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("No chapters file at {0}")]
    ContentMissing(PathBuf),
    #[error("Chapter {0} not found")]
    ChapterNotFound(u32),
    #[error("Could not parse chapters file: {0}")]
    ContentParse(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        TranslationError::Network(err.to_string())
    }
}
