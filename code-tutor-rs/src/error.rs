//! Error types for code-tutor-rs.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration errors. All of these abort the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config field `{0}` must not be empty")]
    EmptyPath(&'static str),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// Chat-completion service errors.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode completion response: {0}")]
    Decode(String),

    #[error("Completion response contained no choices")]
    EmptyChoices,
}

/// Speech-synthesis service errors.
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Voice not found in catalog: {0}")]
    UnknownVoice(String),

    #[error("Failed to describe voices: {0}")]
    DescribeVoices(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Could not stream audio")]
    MissingAudioStream,

    #[error("Failed to write audio to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that can end a tutoring run.
#[derive(Error, Debug)]
pub enum TutorError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("Uploaded file is not valid UTF-8: {0}")]
    InvalidUpload(#[from] std::string::FromUtf8Error),

    #[error("Malformed form submission: {0}")]
    Form(#[from] axum::extract::multipart::MultipartError),

    #[error("No code given")]
    NoCode,

    #[error("No voice selected")]
    NoVoice,
}

pub type Result<T> = std::result::Result<T, TutorError>;
