use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use urdu_voice::conversation::CaptureSession;
use urdu_voice::i18n::Phrase;
use urdu_voice::quick::QUICK_COMMANDS;
use urdu_voice::terminal::{self, TerminalView};
use urdu_voice::voice::{
    AudioPlayer, CaptureSink, MicrophoneRecognizer, MutedPlayer, SpeakerPlayer, SpeechRecognizer,
    UnavailablePlayer, UnsupportedRecognizer,
};
use urdu_voice::{Assistant, Config, Event, HttpCommandClient, Intent, Locale};

/// Urdu Voice - talk to a bilingual voice assistant from the terminal
#[derive(Parser)]
#[command(name = "urdu-voice", version, about)]
struct Cli {
    /// Command service base URL
    #[arg(long)]
    api_url: Option<String>,

    /// UI language ("ur" or "en")
    #[arg(short, long)]
    locale: Option<Locale>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice input (type commands instead)
    #[arg(long, env = "URDU_VOICE_DISABLE_VOICE")]
    disable_voice: bool,

    /// Do not play audio replies
    #[arg(long)]
    mute: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one command and print the reply
    Ask {
        /// Command text
        text: String,
    },
    /// List the commands the service understands
    Commands,
    /// Check that the command service is reachable
    Health,
    /// List the quick commands
    Quick,
    /// Run one speech recognition session and print the transcript
    TestMic,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,urdu_voice=info",
        1 => "info,urdu_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so they never interleave with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_with_options(cli.disable_voice)?;

    if let Some(url) = cli.api_url {
        config.set_base_url(&url)?;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Ask { text } => ask(&config, cli.mute, &text).await,
            Command::Commands => list_commands(&config).await,
            Command::Health => health(&config).await,
            Command::Quick => {
                list_quick(config.locale);
                Ok(())
            }
            Command::TestMic => test_mic(&config).await,
        };
    }

    tracing::info!(
        base_url = %config.api.base_url,
        locale = ?config.locale,
        voice = config.voice.enabled,
        "starting voice client"
    );

    let recognizer = build_recognizer(&config);
    let player = build_player(&config, cli.mute);
    let client = Arc::new(HttpCommandClient::new(&config.api)?);

    let view = TerminalView::new(config.locale);
    println!("{}", config.locale.phrase(Phrase::Ready));
    view.print_help();

    let assistant = Assistant::new(config.locale, recognizer, player, client, Box::new(view));
    assistant.run(terminal::spawn_input_reader()).await?;

    Ok(())
}

fn build_recognizer(config: &Config) -> Box<dyn SpeechRecognizer> {
    match MicrophoneRecognizer::probe(config) {
        Some(recognizer) => Box::new(recognizer),
        None => Box::new(UnsupportedRecognizer),
    }
}

fn build_player(config: &Config, mute: bool) -> Box<dyn AudioPlayer> {
    if mute || !config.voice.playback {
        return Box::new(MutedPlayer);
    }

    match SpeakerPlayer::probe(config.api.timeout) {
        Some(player) => Box::new(player),
        None => Box::new(UnavailablePlayer),
    }
}

/// Run one command through the full flow
async fn ask(config: &Config, mute: bool, text: &str) -> anyhow::Result<()> {
    let client = Arc::new(HttpCommandClient::new(&config.api)?);
    let mut assistant = Assistant::new(
        config.locale,
        Box::new(UnsupportedRecognizer),
        build_player(config, mute),
        client,
        Box::new(TerminalView::new(config.locale)),
    );

    assistant.apply(Intent::Command(text.to_string()));
    assistant.run_until_idle().await;

    if let Some(error) = assistant.conversation().error() {
        anyhow::bail!("{error}");
    }

    Ok(())
}

/// Print the command catalog
async fn list_commands(config: &Config) -> anyhow::Result<()> {
    let client = HttpCommandClient::new(&config.api)?;
    let list = client.list_commands().await?;

    println!("{} commands:\n", list.total);
    for info in &list.commands {
        println!("{} - {}", info.category, info.description);
        for example in &info.examples {
            println!("    {example}");
        }
    }

    Ok(())
}

/// Probe the command service
async fn health(config: &Config) -> anyhow::Result<()> {
    use urdu_voice::CommandService;

    let client = HttpCommandClient::new(&config.api)?;
    match client.health_check().await {
        Ok(()) => {
            println!("{} ({})", config.locale.phrase(Phrase::BackendConnected), client.base_url());
            Ok(())
        }
        Err(e) => {
            println!("{} ({})", config.locale.phrase(Phrase::BackendDisconnected), client.base_url());
            Err(e.into())
        }
    }
}

fn list_quick(locale: Locale) {
    for (i, command) in QUICK_COMMANDS.iter().enumerate() {
        println!("{}. {} -> \"{}\"", i + 1, command.label(locale), command.command);
    }
}

/// Run a single recognition session
async fn test_mic(config: &Config) -> anyhow::Result<()> {
    let Some(mut recognizer) = MicrophoneRecognizer::probe(config) else {
        anyhow::bail!("speech recognition unavailable (check microphone and STT API key)");
    };

    println!("{}", config.locale.phrase(Phrase::Listening));

    let (tx, mut rx) = mpsc::unbounded_channel();
    recognizer.start(CaptureSink::new(CaptureSession::new(1), tx));

    while let Some(event) = rx.recv().await {
        match event {
            Event::TranscriptReceived {
                text, confidence, ..
            } => println!("{text} (confidence {confidence:.2})"),
            Event::CaptureFailed { kind, .. } => {
                println!("{} [{kind}]", config.locale.capture_error(kind));
            }
            Event::CaptureEnded { .. } => break,
            _ => {}
        }
    }

    Ok(())
}
