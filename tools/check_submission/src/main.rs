use clap::Parser;
use cqe_core::submission::{check_submission_pair, verify_uploaded};
use std::path::PathBuf;
use std::process::ExitCode;

/// Checks that an encrypted package and its commitment marker belong
/// together, and optionally that an uploaded copy matches the local file.
#[derive(Parser, Debug)]
#[command(name = "check_submission", version)]
struct Args {
    #[arg(long)]
    package: PathBuf,
    #[arg(long)]
    commitment: PathBuf,
    /// Content tag reported by the object store for the uploaded package.
    #[arg(long)]
    etag: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let name = match check_submission_pair(&args.package, &args.commitment) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Submission pair OK for CSID {}", name.csid);

    if let Some(etag) = &args.etag {
        if let Err(e) = verify_uploaded(&args.package, etag) {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
        println!("Uploaded package matches local copy");
    }
    ExitCode::SUCCESS
}
