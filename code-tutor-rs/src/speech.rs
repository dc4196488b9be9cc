//! Speech synthesis through AWS Polly.
//!
//! The voice catalog is fetched for the `generative` engine and `en-US`
//! locale. Users pick a voice by display name, which is resolved to the
//! service's voice id before synthesis. Audio comes back as MP3 and is
//! written to disk as-is.

use std::path::Path;
use std::time::Instant;

use aws_sdk_polly::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_polly::error::DisplayErrorContext;
use aws_sdk_polly::types::{Engine, LanguageCode, OutputFormat, VoiceId};
use tracing::{debug, info, warn};

use crate::config::AwsCredentials;
use crate::error::SpeechError;
use crate::AiFuture;

pub const ENGINE: &str = "generative";
pub const LANGUAGE_CODE: &str = "en-US";
pub const OUTPUT_FORMAT: &str = "mp3";
pub const DEFAULT_REGION: &str = "us-east-1";

/// One entry of the voice catalog. Only `name` and `id` drive behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    pub name: String,
    pub id: String,
    pub language_name: Option<String>,
    pub gender: Option<String>,
}

impl VoiceDescriptor {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            language_name: None,
            gender: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub engine: String,
    pub text: String,
    pub output_format: String,
    pub voice_id: String,
}

/// Synthesis result. `audio_stream` is `None` when the service sent no audio.
#[derive(Debug, Clone, Default)]
pub struct SynthesizedAudio {
    pub audio_stream: Option<Vec<u8>>,
}

/// Seam for the remote speech service.
pub trait SpeechPort: Send + Sync {
    fn describe_voices(
        &self,
        engine: &str,
        language_code: &str,
    ) -> AiFuture<Result<Vec<VoiceDescriptor>, SpeechError>>;

    fn synthesize_speech(
        &self,
        request: SynthesisRequest,
    ) -> AiFuture<Result<SynthesizedAudio, SpeechError>>;
}

/// Polly client built from explicit credentials.
pub struct PollyClient {
    client: aws_sdk_polly::Client,
}

impl PollyClient {
    pub fn new(credentials: &AwsCredentials, region: &str) -> Self {
        let credentials = Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            "environment",
        );
        let config = aws_sdk_polly::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: aws_sdk_polly::Client::from_conf(config),
        }
    }
}

impl SpeechPort for PollyClient {
    fn describe_voices(
        &self,
        engine: &str,
        language_code: &str,
    ) -> AiFuture<Result<Vec<VoiceDescriptor>, SpeechError>> {
        let client = self.client.clone();
        let engine = Engine::from(engine);
        let language_code = LanguageCode::from(language_code);

        Box::pin(async move {
            let output = client
                .describe_voices()
                .engine(engine)
                .language_code(language_code)
                .send()
                .await
                .map_err(|e| SpeechError::DescribeVoices(DisplayErrorContext(&e).to_string()))?;

            let voices = output
                .voices
                .unwrap_or_default()
                .into_iter()
                .filter_map(voice_from_polly)
                .collect();
            Ok(voices)
        })
    }

    fn synthesize_speech(
        &self,
        request: SynthesisRequest,
    ) -> AiFuture<Result<SynthesizedAudio, SpeechError>> {
        let client = self.client.clone();

        Box::pin(async move {
            let output = client
                .synthesize_speech()
                .engine(Engine::from(request.engine.as_str()))
                .text(request.text)
                .output_format(OutputFormat::from(request.output_format.as_str()))
                .voice_id(VoiceId::from(request.voice_id.as_str()))
                .send()
                .await
                .map_err(|e| SpeechError::Synthesis(DisplayErrorContext(&e).to_string()))?;

            let bytes = output
                .audio_stream
                .collect()
                .await
                .map_err(|e| SpeechError::Synthesis(e.to_string()))?
                .into_bytes();

            // Polly always hands back a body; an empty one carries no audio.
            let audio_stream = (!bytes.is_empty()).then(|| bytes.to_vec());
            Ok(SynthesizedAudio { audio_stream })
        })
    }
}

/// Catalog entry for a Polly voice. Voices without a name or id cannot be
/// selected and are skipped.
fn voice_from_polly(voice: aws_sdk_polly::types::Voice) -> Option<VoiceDescriptor> {
    let (Some(name), Some(id)) = (voice.name, voice.id) else {
        warn!("Skipping voice without name or id from catalog");
        return None;
    };

    Some(VoiceDescriptor {
        name,
        id: id.as_str().to_string(),
        language_name: voice.language_name,
        gender: voice.gender.map(|g| g.as_str().to_string()),
    })
}

/// Fetch the voice catalog for the fixed engine tier and locale.
pub async fn get_voices(port: &dyn SpeechPort) -> Result<Vec<VoiceDescriptor>, SpeechError> {
    let voices = port.describe_voices(ENGINE, LANGUAGE_CODE).await?;
    info!("Fetched {} voices ({ENGINE}, {LANGUAGE_CODE})", voices.len());
    Ok(voices)
}

/// Display names in catalog order.
pub fn list_available_names(voices: &[VoiceDescriptor]) -> Vec<String> {
    voices.iter().map(|voice| voice.name.clone()).collect()
}

/// Resolve a display name to the service voice id.
pub fn voice_id_for<'a>(voices: &'a [VoiceDescriptor], name: &str) -> Result<&'a str, SpeechError> {
    voices
        .iter()
        .find(|voice| voice.name == name)
        .map(|voice| voice.id.as_str())
        .ok_or_else(|| SpeechError::UnknownVoice(name.to_string()))
}

/// Synthesize `message` with the named voice and write the MP3 to `mp3_path`.
///
/// The file is only opened once audio is in hand, so a missing stream leaves
/// any previous file untouched.
pub async fn convert_text_to_mp3(
    port: &dyn SpeechPort,
    message: &str,
    voices: &[VoiceDescriptor],
    voice_name: &str,
    mp3_path: &Path,
) -> Result<(), SpeechError> {
    let t_start = Instant::now();
    let voice_id = voice_id_for(voices, voice_name)?;
    debug!("Synthesizing {} chars with {voice_name} ({voice_id})", message.len());

    let response = port
        .synthesize_speech(SynthesisRequest {
            engine: ENGINE.to_string(),
            text: message.to_string(),
            output_format: OUTPUT_FORMAT.to_string(),
            voice_id: voice_id.to_string(),
        })
        .await?;

    let audio = response.audio_stream.ok_or(SpeechError::MissingAudioStream)?;

    tokio::fs::write(mp3_path, &audio)
        .await
        .map_err(|source| SpeechError::Write {
            path: mp3_path.to_path_buf(),
            source,
        })?;

    let latency_ms = t_start.elapsed().as_secs_f64() * 1000.0;
    info!(
        "Wrote {} bytes to {} ({latency_ms:.0}ms)",
        audio.len(),
        mp3_path.display()
    );
    Ok(())
}
