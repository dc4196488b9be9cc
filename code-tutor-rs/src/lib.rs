//! code-tutor-rs: explains source code out loud.
//!
//! A chat model names the language and summarizes the code; AWS Polly turns
//! both answers into MP3 files that the web UI plays back.

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod error;
pub mod explainer;
pub mod input;
pub mod speech;
pub mod tutor;
pub mod web;

pub use config::AppConfig;
pub use error::{CompletionError, ConfigError, SpeechError, TutorError};
pub use tutor::{Explanation, Tutor};

/// Boxed future returned by the remote-service ports.
pub type AiFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
