use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use paper2audio_core::{
    Config, EnvCredentials, Ffmpeg, Pipeline, SummaryProvider, Template, config_file,
};
use paper2audio_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// Turn an academic PDF into a narrated audio overview
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log stage progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a PDF and synthesize the narration to an audio file
    Speak(SpeakArgs),

    /// Show the extracted metadata and word budget without contacting any backend
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Target narration length in minutes
    #[arg(long)]
    minutes: Option<i32>,

    /// Speaking rate in words per minute
    #[arg(long)]
    wpm: Option<i32>,

    /// Prompt template: general or expert
    #[arg(long)]
    template: Option<String>,

    /// Config file to use instead of the default cascade
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SpeakArgs {
    /// Path to the PDF to narrate
    pdf: PathBuf,

    /// Output audio file; the extension selects the container
    #[arg(short, long, default_value = "paper.m4a")]
    out: PathBuf,

    /// Also write the narration text to this file
    #[arg(long)]
    script_out: Option<PathBuf>,

    /// Summarization backend: openai, ollama, or none
    #[arg(long)]
    llm: Option<String>,

    /// Model name for the selected summarization backend
    #[arg(long)]
    model: Option<String>,

    /// Speech backend: piper, say, openai, or elevenlabs
    #[arg(long)]
    tts: Option<String>,

    /// Piper voice model (.onnx)
    #[arg(long)]
    piper_voice: Option<PathBuf>,

    /// Piper voice metadata (.onnx.json)
    #[arg(long)]
    piper_json: Option<PathBuf>,

    /// OpenAI speech voice
    #[arg(long)]
    openai_voice: Option<String>,

    /// ElevenLabs voice
    #[arg(long)]
    eleven_voice: Option<String>,

    #[command(flatten)]
    style: StyleArgs,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Path to the PDF to inspect
    pdf: PathBuf,

    #[command(flatten)]
    style: StyleArgs,

    /// Also print the fully rendered prompt
    #[arg(long)]
    prompt: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Speak(args) => speak(args).await,
        Command::Inspect(args) => inspect(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file layer: `--config` exactly, or the default cascade.
fn load_config_file(path: Option<&Path>) -> anyhow::Result<config_file::ConfigFile> {
    match path {
        Some(path) => config_file::load_explicit(path).context("loading --config"),
        None => Ok(config_file::load_config()),
    }
}

/// Resolve configuration: CLI flags > config file > defaults.
fn resolve_config(args: &SpeakArgs, file: &config_file::ConfigFile) -> Config {
    let mut config = Config::default();
    file.apply_to(&mut config);
    apply_style(&mut config, &args.style);

    if let Some(llm) = &args.llm {
        config.llm.provider = llm.clone();
    }
    if let Some(model) = &args.model {
        if SummaryProvider::from_name(&config.llm.provider) == SummaryProvider::Ollama {
            config.llm.ollama_model = model.clone();
        } else {
            config.llm.openai_model = model.clone();
        }
    }
    if let Some(tts) = &args.tts {
        config.tts.provider = tts.clone();
    }
    if let Some(p) = &args.piper_voice {
        config.tts.piper_voice = Some(p.clone());
    }
    if let Some(p) = &args.piper_json {
        config.tts.piper_voice_json = Some(p.clone());
    }
    if let Some(v) = &args.openai_voice {
        config.tts.openai_voice = v.clone();
    }
    if let Some(v) = &args.eleven_voice {
        config.tts.eleven_voice = v.clone();
    }
    config
}

fn apply_style(config: &mut Config, style: &StyleArgs) {
    if let Some(m) = style.minutes {
        config.style.target_minutes = m;
    }
    if let Some(w) = style.wpm {
        config.style.wpm = w;
    }
    if let Some(t) = &style.template {
        config.style.template = Template::from_name(t);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

async fn speak(args: SpeakArgs) -> anyhow::Result<()> {
    if !args.pdf.exists() {
        anyhow::bail!("File not found: {}", args.pdf.display());
    }

    let file = load_config_file(args.style.config.as_deref())?;
    let config = resolve_config(&args, &file);
    tracing::debug!(?config, "resolved configuration");

    let color = ColorMode(!args.no_color);
    let client = reqwest::Client::builder()
        .user_agent(concat!("paper2audio/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let pipeline = Pipeline::from_config(
        &config,
        Arc::new(MupdfBackend::new()),
        Arc::new(EnvCredentials),
        client,
        Arc::new(Ffmpeg::new(config.tools.ffmpeg.clone())),
    );

    let mut stdout = std::io::stdout();
    output::print_plan(
        &mut stdout,
        &display_name(&args.pdf),
        pipeline.summarizer_name(),
        pipeline.speaker_name(),
        color,
    )?;

    let spinner = if color.enabled() {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        bar.set_message("Extracting text...");
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    } else {
        ProgressBar::hidden()
    };

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let summarizer = pipeline.summarizer_name().to_string();
    let speaker = pipeline.speaker_name().to_string();
    let progress = |event: paper2audio_core::PipelineEvent| {
        spinner.suspend(|| {
            let mut w = std::io::stdout();
            let _ = output::print_event(&mut w, &event, color);
            let _ = w.flush();
        });
        if let Some(msg) = output::spinner_message(&event, &summarizer, &speaker) {
            spinner.set_message(msg);
        }
    };

    let result = pipeline
        .run(
            &args.pdf,
            &args.out,
            args.script_out.as_deref(),
            progress,
            &cancel,
        )
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            output::print_success(&mut stdout, &report, color)?;
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Interrupted.");
            std::process::exit(130);
        }
        Err(e) => Err(e).with_context(|| format!("narrating {}", args.pdf.display())),
    }
}

fn inspect(args: InspectArgs) -> anyhow::Result<()> {
    if !args.pdf.exists() {
        anyhow::bail!("File not found: {}", args.pdf.display());
    }

    let file = load_config_file(args.style.config.as_deref())?;
    let mut config = Config::default();
    file.apply_to(&mut config);
    apply_style(&mut config, &args.style);

    let use_color = !args.no_color && args.output.is_none();
    let color = ColorMode(use_color);

    let mut writer: Box<dyn Write> = if let Some(ref output_path) = args.output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    let doc = paper2audio_core::extract(&args.pdf, &MupdfBackend::new())
        .with_context(|| format!("extracting {}", args.pdf.display()))?;
    let target_words =
        paper2audio_core::target_word_count(config.style.target_minutes, config.style.wpm);

    output::print_document(&mut writer, &doc, target_words, config.style.template, color)?;
    if args.prompt {
        let prompt = config.style.template.render(&doc, target_words);
        output::print_prompt(&mut writer, &prompt, color)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper2audio_core::config_file::{ConfigFile, LlmSection, StyleSection};

    fn speak_args(argv: &[&str]) -> SpeakArgs {
        let mut full = vec!["paper2audio", "speak"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Speak(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn defaults_without_flags_or_file() {
        let args = speak_args(&["paper.pdf"]);
        assert_eq!(args.out, PathBuf::from("paper.m4a"));
        let config = resolve_config(&args, &ConfigFile::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn flags_override_file_values() {
        let file = ConfigFile {
            llm: Some(LlmSection {
                provider: Some("openai".into()),
                ..Default::default()
            }),
            style: Some(StyleSection {
                minutes: Some(5),
                wpm: Some(170),
                ..Default::default()
            }),
            ..Default::default()
        };
        let args = speak_args(&["paper.pdf", "--minutes", "20", "--tts", "piper"]);
        let config = resolve_config(&args, &file);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.style.target_minutes, 20);
        assert_eq!(config.style.wpm, 170);
        assert_eq!(config.tts.provider, "piper");
    }

    #[test]
    fn model_follows_selected_provider() {
        let args = speak_args(&["paper.pdf", "--llm", "ollama", "--model", "mistral"]);
        let config = resolve_config(&args, &ConfigFile::default());
        assert_eq!(config.llm.ollama_model, "mistral");
        assert_eq!(config.llm.openai_model, "gpt-4o-mini");

        let args = speak_args(&["paper.pdf", "--model", "gpt-4o"]);
        let config = resolve_config(&args, &ConfigFile::default());
        assert_eq!(config.llm.openai_model, "gpt-4o");
        assert_eq!(config.llm.ollama_model, "llama3.1");
    }

    #[test]
    fn model_uses_provider_from_config_file() {
        let file = ConfigFile {
            llm: Some(LlmSection {
                provider: Some("ollama".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let args = speak_args(&["paper.pdf", "--model", "qwen2"]);
        assert_eq!(resolve_config(&args, &file).llm.ollama_model, "qwen2");
    }

    #[test]
    fn inspect_accepts_style_flags() {
        let cli = Cli::try_parse_from([
            "paper2audio",
            "inspect",
            "paper.pdf",
            "--template",
            "expert",
            "--prompt",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Inspect(args) => {
                assert!(args.prompt);
                assert_eq!(args.style.template.as_deref(), Some("expert"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn explicit_config_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[style\n").unwrap();
        assert!(load_config_file(Some(&bad)).is_err());
        assert!(load_config_file(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
