use anyhow::{Result, anyhow};
use log::{debug, error};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::cli::{SESSION_HELP, ServerArgs, SessionCommand, parse_session_command};
use crate::client::{Transcribe, TranscriptionClient, TranscriptionOutcome};
use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::config::ClientConfig;
use crate::media::{self, MediaFile};
use crate::session::{Attempt, SelectError, SessionController};
use crate::validate::{ValidationResult, validate};

/// How long the one-shot runner waits for a duration estimate before
/// printing the file banner anyway.
const DURATION_WAIT: Duration = Duration::from_secs(2);

fn build_session(server: ServerArgs) -> Result<SessionController<TranscriptionClient>> {
    let config = ClientConfig::resolve(server.server_url, server.timeout)?;
    let client = TranscriptionClient::new(&config)?;
    println!("🌐 Transcription service: {}", client.endpoint());
    Ok(SessionController::new(client))
}

fn print_file_banner<T: Transcribe>(session: &SessionController<T>) {
    let snapshot = session.snapshot();
    if let (Some(name), Some(duration)) = (snapshot.file_name, snapshot.duration) {
        println!("✅ {name} - {duration}");
    }
}

pub async fn run_file(audio_file: &Path, server: ServerArgs, copy: bool) -> Result<()> {
    println!("🎵 The No-Fuss Transcriber");
    println!("==========================");

    let session = build_session(server)?;

    let probe = match session.select_path(audio_file).await {
        Ok(probe) => probe,
        Err(SelectError::Rejected(reason)) => {
            eprintln!("❌ {reason}");
            return Err(anyhow!(reason));
        }
        Err(SelectError::Io(e)) => {
            eprintln!("❌ {e}");
            return Err(e);
        }
    };
    if tokio::time::timeout(DURATION_WAIT, probe).await.is_err() {
        debug!("Duration probe still running, not waiting for it");
    }
    print_file_banner(&session);

    println!("🚀 Transcribing...");
    let outcome = match session.transcribe().await {
        Attempt::Completed(outcome) => outcome,
        other => return Err(anyhow!("Transcription did not run: {:?}", other)),
    };

    match &outcome {
        TranscriptionOutcome::Success { text } => {
            println!("\n✅ Transcription completed!");
            println!("📝 Result:");
            println!("{text}");
        }
        TranscriptionOutcome::Failure { kind } => {
            eprintln!("❌ {kind}");
            return Err(anyhow!("Transcription failed: {:?}", kind));
        }
    }

    if copy {
        let clipboard = SystemClipboard::holding_until_replaced();
        if clipboard.holds_until_replaced() {
            println!("📋 Keeping the transcript on the clipboard until something else is copied...");
        }
        match session.copy_transcript(&clipboard) {
            Ok(()) => println!("📋 Transcript copied to clipboard!"),
            Err(e) => eprintln!("⚠️  {e}"),
        }
    }

    Ok(())
}

pub async fn run_check(audio_file: &Path) -> Result<()> {
    let (name, size_bytes) = media::stat(audio_file).await?;

    if let ValidationResult::Invalid(reason) = validate(&name, size_bytes) {
        eprintln!("❌ {name}: {reason}");
        return Err(anyhow!(reason));
    }

    let file = MediaFile::load(audio_file).await?;
    let duration = tokio::task::spawn_blocking(move || {
        media::probe_duration(&file.name, &file.content)
    })
    .await?;

    let duration = media::format_probed_duration(duration);
    println!("✅ {name} ({size_bytes} bytes) - {duration}");
    Ok(())
}

pub async fn run_session(server: ServerArgs) -> Result<()> {
    println!("🎵 The No-Fuss Transcriber (interactive)");
    println!("========================================");

    let session = build_session(server)?;
    println!("{SESSION_HELP}\n");

    let clipboard = SystemClipboard::default();
    drive_session(&session, BufReader::new(tokio::io::stdin()), &clipboard).await
}

/// Runs session commands read from `input` until `quit` or end of input,
/// then waits for a transcription that is still pending.
async fn drive_session<T, R>(
    session: &SessionController<T>,
    input: R,
    clipboard: &dyn ClipboardSink,
) -> Result<()>
where
    T: Transcribe,
    R: AsyncBufRead + Unpin,
{
    let mut pending: Option<JoinHandle<()>> = None;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_session_command(&line) {
            Ok(command) => command,
            Err(e) => {
                if !line.trim().is_empty() {
                    eprintln!("❓ {e}");
                }
                continue;
            }
        };

        match command {
            SessionCommand::Select(path) => match session.select_path(&path).await {
                Ok(_) => print_file_banner(session),
                Err(e) => eprintln!("❌ {e}"),
            },
            SessionCommand::Transcribe => {
                let state = session.state();
                if state.selected_file.is_none() {
                    eprintln!("❌ Select a file first");
                    continue;
                }
                if state.in_flight {
                    eprintln!("⏳ Transcribing... (already in progress)");
                    continue;
                }

                println!("🚀 Transcribing...");
                let session = session.clone();
                pending = Some(tokio::spawn(async move {
                    match session.transcribe().await {
                        Attempt::Completed(outcome) => {
                            println!("\n📝 {}", outcome.display_text());
                        }
                        Attempt::Discarded(_) => {
                            debug!("Late transcription result dropped");
                        }
                        Attempt::Skipped => {}
                    }
                }));
            }
            SessionCommand::Status => {
                println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
            }
            SessionCommand::Stop | SessionCommand::Reset => {
                session.reset();
                println!("⏹️  Cleared");
            }
            SessionCommand::Copy => match session.copy_transcript(clipboard) {
                Ok(()) => println!("📋 Transcript copied to clipboard!"),
                Err(e) => error!("Failed to copy: {e}"),
            },
            SessionCommand::Help => println!("{SESSION_HELP}"),
            SessionCommand::Quit => break,
        }
    }

    if let Some(handle) = pending.filter(|h| !h.is_finished()) {
        println!("⏳ Waiting for the pending transcription to finish...");
        if let Err(e) = handle.await {
            error!("Transcription task failed: {e}");
        }
    }

    Ok(())
}
