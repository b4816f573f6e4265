use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nofuss-transcribe",
    about = "The No-Fuss Transcriber - send an audio file, get text back",
    long_about = "Validates a local audio or video file, uploads it to a transcription service and prints the returned text.",
    after_help = "EXAMPLES:\n    # Transcribe a file and print the text\n    nofuss-transcribe file interview.mp3\n\n    # Transcribe and copy the result to the clipboard\n    nofuss-transcribe file memo.m4a --copy\n\n    # Check a file without uploading it\n    nofuss-transcribe check lecture.wav\n\n    # Use a different transcription service\n    nofuss-transcribe file talk.webm --server-url http://localhost:8000\n\n    # Interactive session\n    nofuss-transcribe session"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ServerArgs {
    /// Transcription service base URL [env: TRANSCRIBE_API_URL]
    #[arg(long)]
    pub server_url: Option<String>,

    /// Request timeout in seconds, 0 to wait forever [env: TRANSCRIBE_TIMEOUT_SECS]
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "file")]
    TranscribeFile {
        audio_file: PathBuf,

        #[command(flatten)]
        server: ServerArgs,

        /// Copy the transcript to the clipboard
        #[arg(long)]
        copy: bool,
    },
    #[command(name = "check")]
    Check { audio_file: PathBuf },
    #[command(name = "formats")]
    Formats,
    #[command(name = "session")]
    Session {
        #[command(flatten)]
        server: ServerArgs,
    },
}

/// One line of input in an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select(PathBuf),
    Transcribe,
    Status,
    Stop,
    Reset,
    Copy,
    Help,
    Quit,
}

pub const SESSION_HELP: &str = "Commands:\n    select <path>   pick an audio file\n    transcribe      upload the selected file\n    status          show the session as JSON\n    stop            clear everything\n    reset           clear everything\n    copy            copy the transcript to the clipboard\n    help            show this message\n    quit            leave the session";

pub fn parse_session_command(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "select" | "open" => {
            if rest.is_empty() {
                Err("select requires a path".to_string())
            } else {
                Ok(SessionCommand::Select(PathBuf::from(rest)))
            }
        }
        "transcribe" | "t" => Ok(SessionCommand::Transcribe),
        "status" | "s" => Ok(SessionCommand::Status),
        "stop" => Ok(SessionCommand::Stop),
        "reset" => Ok(SessionCommand::Reset),
        "copy" => Ok(SessionCommand::Copy),
        "help" | "?" => Ok(SessionCommand::Help),
        "quit" | "exit" | "q" => Ok(SessionCommand::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("Unknown command: {other}")),
    }
}
