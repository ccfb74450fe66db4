use clap::Parser;
use cqe_core::cipher::Passphrase;
use cqe_core::config::{Credentials, ToolConfig};
use cqe_core::error::{CoreError, CoreResult};
use cqe_core::event::unpack_event_bundle;
use std::path::PathBuf;
use std::process::ExitCode;

/// Unpacks an encrypted event distribution bundle (`<event>.ar.gz.enc`).
#[derive(Parser, Debug)]
#[command(name = "unpack_event_bundle", version)]
struct Args {
    #[arg(long)]
    event_bundle: PathBuf,
    /// Bundle password; read from `--creds` when not given.
    #[arg(long, conflicts_with = "creds")]
    password: Option<String>,
    #[arg(long)]
    creds: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CoreResult<Vec<String>> {
    let cfg = ToolConfig::load_or_default(args.config.as_deref())?;
    let passphrase = match (args.password, &args.creds) {
        (Some(p), _) => Passphrase::new(p),
        (None, Some(path)) => Credentials::load(path)?.passphrase(),
        (None, None) => {
            return Err(CoreError::InvalidInput(
                "either --password or --creds is required".to_string(),
            ))
        }
    };
    let unpacked = unpack_event_bundle(
        &cfg.cipher(),
        &args.event_bundle,
        &passphrase,
        &args.output_dir,
        &cfg.archive_limits,
    )?;
    tracing::info!(event = %unpacked.event, files = unpacked.files.len(), "event bundle unpacked");
    Ok(unpacked.manifest.summary_lines())
}
