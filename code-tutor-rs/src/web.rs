//! Web UI for the code tutor.
//!
//! One form (file upload, text area, voice dropdown) and one result page
//! with two audio players. Every request starts from a blank form; nothing
//! is kept between sessions except the MP3 files on disk.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use crate::error::{SpeechError, TutorError};
use crate::input::Submission;
use crate::speech::{self, VoiceDescriptor};
use crate::tutor::{choose_voice, Explanation, Tutor};

const NO_INPUT_MESSAGE: &str = "Bring your code with one of the options from above.";

/// Progress messages shown while a submission runs, one per stage.
const PROGRESS_STAGES: [&str; 3] = [
    "Let me think for a while...",
    "Give me a little bit more time...",
    "I've got the language! I'm thinking about how to explain to you in a few words now...",
];
const PROGRESS_STEP_MS: u32 = 5000;

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100" width="100" height="100">
<rect width="100" height="100" rx="18" fill="#263238"/>
<text x="50" y="62" font-family="monospace" font-size="38" text-anchor="middle" fill="#80cbc4">&lt;/&gt;</text>
</svg>
"##;

#[derive(Clone)]
pub struct WebState {
    pub tutor: Arc<Tutor>,
}

/// Build the axum router.
pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/explain", post(handle_explain))
        .route("/audio/{kind}", get(handle_audio))
        .route("/logo.svg", get(handle_logo))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Serve the UI until the process is stopped.
pub async fn serve(state: WebState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Code tutor listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

// --- Error responses ---

fn status_for(error: &TutorError) -> StatusCode {
    match error {
        TutorError::InvalidUpload(_)
        | TutorError::Form(_)
        | TutorError::NoCode
        | TutorError::NoVoice => StatusCode::BAD_REQUEST,
        TutorError::Speech(SpeechError::UnknownVoice(_)) => StatusCode::BAD_REQUEST,
        TutorError::Speech(SpeechError::Write { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        TutorError::Speech(_) | TutorError::Completion(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for TutorError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        warn!("Run failed ({status}): {self}");
        let body = format!(
            "{}{}<p><a href=\"/\">Try again</a></p>",
            render_header(),
            banner("error", &self.to_string())
        );
        (status, Html(page(&body))).into_response()
    }
}

// --- Handlers ---

async fn handle_index(State(state): State<WebState>) -> Result<Html<String>, TutorError> {
    let voices = state.tutor.voices().await?;
    Ok(Html(page(&render_form(&voices, None))))
}

async fn handle_explain(
    State(state): State<WebState>,
    multipart: Multipart,
) -> Result<Html<String>, TutorError> {
    let voices = state.tutor.voices().await?;

    let submission = read_submission(multipart).await?;

    let code = submission.extract_code()?;
    if code.is_empty() {
        info!("Submission had no code");
        return Ok(Html(page(&render_form(&voices, Some(NO_INPUT_MESSAGE)))));
    }

    let voice_name = choose_voice(&voices, submission.voice.as_deref())?;

    let preview: String = code.chars().take(80).collect();
    info!(
        "Explaining \"{}{}\" ({} chars, voice={voice_name})",
        preview.replace('\n', " "),
        if code.chars().count() > 80 { "..." } else { "" },
        code.len(),
    );

    let result = state.tutor.explain(&code, &voices, &voice_name).await?;
    Ok(Html(page(&render_result(&result))))
}

async fn handle_audio(State(state): State<WebState>, Path(kind): Path<String>) -> Response {
    let config = state.tutor.config();
    let path = match kind.as_str() {
        "language" => &config.language_audio_dir,
        "explanation" => &config.explanation_audio_dir,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    match tokio::fs::read(path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "audio/mpeg"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!("Audio {} unavailable: {e}", path.display());
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn handle_logo() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], LOGO_SVG)
}

/// Collect the `file`, `code` and `voice` fields. A file part with an empty
/// filename means no file was chosen.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<Submission, axum::extract::multipart::MultipartError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let chosen = field.file_name().is_some_and(|f| !f.is_empty());
                let bytes = field.bytes().await?;
                if chosen {
                    submission.upload = Some(bytes.to_vec());
                }
            }
            "code" => {
                let text = field.text().await?;
                if !text.is_empty() {
                    submission.pasted = Some(text);
                }
            }
            "voice" => submission.voice = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(submission)
}

// --- Rendering ---

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI Code Tutor</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
.banner {{ padding: .75rem 1rem; border-radius: .4rem; margin: 1rem 0; }}
.warning {{ background: #fff8e1; }}
.error {{ background: #fdecea; }}
.success {{ background: #e8f5e9; }}
textarea {{ width: 100%; min-height: 14rem; font-family: monospace; }}
#spinner {{ display: none; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

fn banner(kind: &str, message: &str) -> String {
    format!(r#"<div class="banner {kind}">{}</div>"#, escape(message))
}

fn render_header() -> String {
    format!(
        "<img src=\"/logo.svg\" alt=\"AI Code Tutor\" width=\"100\">\n<h1>Welcome to AI Code Tutor</h1>\n<p>Simply upload your code or paste it into the field below.</p>\n{}",
        banner(
            "warning",
            "Note: Uploaded files will take priority over copied and pasted code."
        )
    )
}

fn render_form(voices: &[VoiceDescriptor], error: Option<&str>) -> String {
    let options: String = speech::list_available_names(voices)
        .iter()
        .map(|name| {
            let name = escape(name);
            format!("<option value=\"{name}\">{name}</option>")
        })
        .collect();

    let error = error.map(|e| banner("error", e)).unwrap_or_default();

    format!(
        r#"{header}
<form id="explain" method="post" action="/explain" enctype="multipart/form-data">
<p><label>Could you please choose one of our available voices to explain?<br>
<select name="voice">{options}</select></label></p>
<p><label>Upload your script here.<br><input type="file" name="file"></label></p>
<p><label>or copy and paste your code here<br><textarea name="code"></textarea></label></p>
{error}
<p><button type="submit">Explain</button></p>
<p id="spinner">{first_stage}</p>
</form>
{script}"#,
        header = render_header(),
        first_stage = escape(PROGRESS_STAGES[0]),
        script = progress_script(),
    )
}

/// Shows the spinner on submit and steps through the progress messages
/// while the request blocks.
fn progress_script() -> String {
    let stages = serde_json::to_string(&PROGRESS_STAGES).unwrap_or_else(|_| "[]".into());
    format!(
        r#"<script>
const stages = {stages};
document.getElementById("explain").addEventListener("submit", () => {{
  const spinner = document.getElementById("spinner");
  spinner.style.display = "block";
  stages.slice(1).forEach((text, i) => setTimeout(() => {{ spinner.textContent = text; }}, (i + 1) * {PROGRESS_STEP_MS}));
}});
</script>"#
    )
}

fn render_result(result: &Explanation) -> String {
    format!(
        r#"{header}
{success}
{reminder}
<p><strong>Language:</strong> {language}</p>
<audio controls src="/audio/language"></audio>
<p><strong>Explanation:</strong> {explanation}</p>
<audio controls src="/audio/explanation"></audio>
<p><a href="/">Explain more code</a></p>"#,
        header = render_header(),
        success = banner("success", "Uhg, that was hard! But here is your explanation"),
        reminder = banner("warning", "Remember to turn on your audio!"),
        language = escape(&result.language),
        explanation = escape(&result.explanation),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn form_lists_voices_in_order() {
        let voices = vec![
            VoiceDescriptor::new("Ruth", "Ruth"),
            VoiceDescriptor::new("Matthew", "Matthew"),
        ];
        let html = render_form(&voices, None);

        let ruth = html.find("<option value=\"Ruth\">").unwrap();
        let matthew = html.find("<option value=\"Matthew\">").unwrap();
        assert!(ruth < matthew);
        assert!(!html.contains(NO_INPUT_MESSAGE));
    }

    #[test]
    fn form_steps_through_progress_messages() {
        let html = render_form(&[], None);

        assert!(html.contains(r#"<p id="spinner">Let me think for a while...</p>"#));
        assert!(html.contains(r#""Give me a little bit more time...""#));
        assert!(html.contains(
            r#""I've got the language! I'm thinking about how to explain to you in a few words now...""#
        ));
    }

    #[test]
    fn header_shows_logo() {
        assert!(render_header().contains(r#"<img src="/logo.svg""#));
        assert!(LOGO_SVG.starts_with("<svg"));
    }

    #[test]
    fn result_shows_both_answers() {
        let html = render_result(&Explanation {
            language: "Python".into(),
            explanation: "Prints <a> greeting".into(),
        });

        assert!(html.contains("<strong>Language:</strong> Python"));
        assert!(html.contains("<strong>Explanation:</strong> Prints &lt;a&gt; greeting"));
        assert!(html.contains(r#"src="/audio/language""#));
        assert!(html.contains(r#"src="/audio/explanation""#));
    }

    #[test]
    fn remote_failures_are_bad_gateway() {
        assert_eq!(
            status_for(&TutorError::Speech(SpeechError::MissingAudioStream)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&TutorError::Speech(SpeechError::UnknownVoice("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&TutorError::NoCode), StatusCode::BAD_REQUEST);
    }
}
