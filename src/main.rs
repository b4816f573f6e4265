mod cli;
mod client;
mod clipboard;
mod config;
mod error;
mod media;
mod runner;
mod session;
mod validate;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::TranscribeFile {
            audio_file,
            server,
            copy,
        } => runner::run_file(&audio_file, server, copy).await,
        Commands::Check { audio_file } => runner::run_check(&audio_file).await,
        Commands::Formats => {
            print!("{}", validate::list_accepted_formats());
            Ok(())
        }
        Commands::Session { server } => runner::run_session(server).await,
    }
}
