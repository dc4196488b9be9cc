//! code-tutor-rs: upload or paste code, hear what it is and what it does.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use code_tutor::config::{self, AppConfig, AwsCredentials, OpenAiCredentials};
use code_tutor::explainer::{self, OpenAiClient};
use code_tutor::input::Submission;
use code_tutor::speech::{self, PollyClient};
use code_tutor::web::{self, WebState};
use code_tutor::tutor::{run_once, Tutor};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8501;

#[derive(Parser, Debug)]
#[command(name = "code-tutor-rs", about = "Explains source code out loud")]
struct Args {
    /// Path to config.json
    #[arg(short, long, env = "CODE_TUTOR_CONFIG", default_value = config::DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Chat model used for both questions
    #[arg(long, env = "CODE_TUTOR_MODEL", default_value = explainer::DEFAULT_MODEL, global = true)]
    model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = explainer::DEFAULT_BASE_URL, global = true)]
    openai_base_url: String,

    /// AWS region for Polly
    #[arg(long, env = "AWS_REGION", default_value = speech::DEFAULT_REGION, global = true)]
    region: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web UI (default)
    Serve {
        #[arg(long, env = "CODE_TUTOR_HOST", default_value = DEFAULT_HOST)]
        host: String,
        #[arg(short, long, env = "CODE_TUTOR_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Explain one file or snippet without the UI
    Explain {
        /// Voice display name from the catalog
        #[arg(long)]
        voice: String,
        /// Source file (takes priority over --code)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Code passed inline
        #[arg(long)]
        code: Option<String>,
    },
    /// List available voice names
    Voices,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,aws_smithy_runtime=warn,aws_config=warn,hyper=warn,h2=warn")
    } else {
        EnvFilter::new("info,aws_smithy_runtime=warn,aws_config=warn,hyper=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("code-tutor-rs starting");

    let app_config = AppConfig::load(&args.config)?;
    let polly = Arc::new(PollyClient::new(&AwsCredentials::from_env()?, &args.region));

    let command = args.command.unwrap_or(Command::Serve {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
    });

    let tutor = match command {
        Command::Voices => {
            let voices = speech::get_voices(polly.as_ref()).await?;
            for name in speech::list_available_names(&voices) {
                println!("{name}");
            }
            return Ok(());
        }
        _ => {
            let openai = Arc::new(OpenAiClient::new(
                &args.openai_base_url,
                &OpenAiCredentials::from_env()?.api_key,
            )?);
            Arc::new(Tutor::new(app_config, &args.model, openai, polly))
        }
    };

    match command {
        Command::Explain { voice, file, code } => {
            let upload = file.map(std::fs::read).transpose()?;
            let submission = Submission {
                upload,
                pasted: code,
                voice: Some(voice),
            };
            let result = run_once(&tutor, &submission).await?;

            println!("Language: {}", result.language);
            println!("Explanation: {}", result.explanation);
            println!("Audio: {}", tutor.config().language_audio_dir.display());
            println!("Audio: {}", tutor.config().explanation_audio_dir.display());
        }
        Command::Serve { host, port } => {
            web::serve(WebState { tutor }, &format!("{host}:{port}")).await?;
        }
        Command::Voices => {}
    }

    Ok(())
}
