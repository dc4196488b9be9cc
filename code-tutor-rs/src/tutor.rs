//! Orchestration: two completion calls, then two synthesis calls.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::AppConfig;
use crate::error::{Result, TutorError};
use crate::explainer::{self, CompletionPort};
use crate::input::Submission;
use crate::speech::{self, SpeechPort, VoiceDescriptor};

/// The two generated answers of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub language: String,
    pub explanation: String,
}

/// Service clients and config, constructed once and shared by every session.
pub struct Tutor {
    config: AppConfig,
    model: String,
    completion: Arc<dyn CompletionPort>,
    speech: Arc<dyn SpeechPort>,
}

impl Tutor {
    pub fn new(
        config: AppConfig,
        model: &str,
        completion: Arc<dyn CompletionPort>,
        speech: Arc<dyn SpeechPort>,
    ) -> Self {
        Self {
            config,
            model: model.to_string(),
            completion,
            speech,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn voices(&self) -> Result<Vec<VoiceDescriptor>> {
        Ok(speech::get_voices(self.speech.as_ref()).await?)
    }

    /// Explain `code` and write both answers as MP3 to the configured paths.
    /// Stops at the first failure.
    pub async fn explain(
        &self,
        code: &str,
        voices: &[VoiceDescriptor],
        voice_name: &str,
    ) -> Result<Explanation> {
        let t_total = Instant::now();
        let completion = self.completion.as_ref();

        let language = explainer::retrieve_code_language(completion, &self.model, code).await?;
        let explanation =
            explainer::retrieve_code_explanation(completion, &self.model, code).await?;

        speech::convert_text_to_mp3(
            self.speech.as_ref(),
            &language,
            voices,
            voice_name,
            &self.config.language_audio_dir,
        )
        .await?;
        speech::convert_text_to_mp3(
            self.speech.as_ref(),
            &explanation,
            voices,
            voice_name,
            &self.config.explanation_audio_dir,
        )
        .await?;

        let total_ms = t_total.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Explained {} chars of code with voice {voice_name} in {total_ms:.0}ms",
            code.len()
        );

        Ok(Explanation {
            language,
            explanation,
        })
    }
}

/// Voice to speak with: the requested one, or the first catalog entry the
/// way the form's dropdown preselects it.
pub fn choose_voice(voices: &[VoiceDescriptor], requested: Option<&str>) -> Result<String> {
    match requested.filter(|v| !v.is_empty()) {
        Some(v) => Ok(v.to_string()),
        None => voices
            .first()
            .map(|v| v.name.clone())
            .ok_or(TutorError::NoVoice),
    }
}

/// One headless run: extract the code, fetch the catalog, explain.
/// Empty input is an error here since there is no form to show again.
pub async fn run_once(tutor: &Tutor, submission: &Submission) -> Result<Explanation> {
    let code = submission.extract_code()?;
    if code.is_empty() {
        return Err(TutorError::NoCode);
    }

    let voices = tutor.voices().await?;
    let voice_name = choose_voice(&voices, submission.voice.as_deref())?;
    tutor.explain(&code, &voices, &voice_name).await
}
