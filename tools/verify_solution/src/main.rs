use clap::Parser;
use cqe_core::config::{Credentials, ToolConfig};
use cqe_core::pipeline::{SolutionPipeline, VerifyRequest};
use std::path::PathBuf;
use std::process::ExitCode;

/// Decrypts and checks a solution package, copies its PoV and replacement
/// binaries out, and prints the list identifiers.
#[derive(Parser, Debug)]
#[command(name = "verify_solution", version)]
struct Args {
    /// <csid>_<sha256>.ar.enc
    #[arg(long)]
    solution: PathBuf,
    #[arg(long)]
    creds: PathBuf,
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
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
    let cfg = match ToolConfig::load_or_default(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let creds = match Credentials::load(&args.creds) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let req = VerifyRequest {
        bundle: args.solution,
        output_dir: args.output_dir,
    };
    let report = match SolutionPipeline::from_config(&cfg).verify(&req, &creds.passphrase()) {
        Ok(r) => r,
        Err(failure) => {
            eprintln!("{}", failure);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("PoV file: {}", report.pov.display());
    for rb in &report.rbs {
        println!("RB file: {}", rb.display());
    }
    println!("POV List ID: {}", report.pov_list_id);
    println!("CB List ID: {}", report.cb_list_id);
    ExitCode::SUCCESS
}
