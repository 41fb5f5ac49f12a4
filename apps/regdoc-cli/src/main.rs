//! `regdoc`: ingest regulation documents and answer questions about them.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use regdoc_cli::{build_pipeline, ingest, render_report, render_response};
use regdoc_core::config::{Settings, DEFAULT_CONFIG_FILE};
use regdoc_hybrid::QaPipeline;

#[derive(Parser, Debug)]
#[command(name = "regdoc", version, about = "Question answering over academic regulations")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "REGDOC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index new and modified files from the data directory
    Ingest {
        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },
    /// Answer one question
    Ask {
        question: String,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop on stdin
    Chat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "regdoc=debug" } else { "regdoc=info" };
    let filter = EnvFilter::try_from_env("REGDOC_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load_from(&cli.config)?;
    match cli.command {
        Command::Ingest { quiet } => {
            let report = ingest(&settings, !quiet).await?;
            println!("{}", render_report(&report));
        }
        Command::Ask { question, json } => {
            let pipeline = build_pipeline(&settings).await?;
            let resp = pipeline.ask(&question).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print!("{}", render_response(&resp));
            }
        }
        Command::Chat => chat(&build_pipeline(&settings).await?).await?,
    }
    Ok(())
}

/// One question per line; a failed question is reported and the loop goes on.
async fn chat(pipeline: &QaPipeline) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\n? ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        match pipeline.ask(line).await {
            Ok(resp) => print!("{}", render_response(&resp)),
            Err(e) => eprintln!("Lỗi: {e}"),
        }
    }
    Ok(())
}
