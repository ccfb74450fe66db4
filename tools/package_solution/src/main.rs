use clap::Parser;
use cqe_core::config::{Credentials, ToolConfig};
use cqe_core::pipeline::{PackageRequest, SolutionPipeline};
use std::path::PathBuf;
use std::process::ExitCode;

/// Builds the encrypted solution package and commitment marker for one
/// challenge set.
#[derive(Parser, Debug)]
#[command(name = "package_solution", version)]
struct Args {
    /// Credentials file holding `cqe_encryption_key`.
    #[arg(long)]
    creds: PathBuf,
    /// Challenge set identifier, e.g. 00000003.
    #[arg(long)]
    csid: String,
    /// POV_<csid>.xml
    #[arg(long)]
    pov: PathBuf,
    /// RB_<csid>_<nn> replacement binaries.
    #[arg(long, num_args = 1.., required = true)]
    files: Vec<PathBuf>,
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Tool configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the outcome as JSON.
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
    let (cfg, creds) = match load(&args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = SolutionPipeline::from_config(&cfg);
    let req = PackageRequest {
        csid: args.csid,
        pov: args.pov,
        rbs: args.files,
        output_dir: args.output_dir,
    };
    match pipeline.package(&req, &creds.passphrase()) {
        Ok(outcome) if args.json => match serde_json::to_string_pretty(&outcome) {
            Ok(s) => {
                println!("{}", s);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(outcome) => {
            println!("Encrypted package: {}", outcome.package.display());
            println!("Commitment file: {}", outcome.commitment.display());
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("{}", failure);
            ExitCode::FAILURE
        }
    }
}

fn load(args: &Args) -> cqe_core::error::CoreResult<(ToolConfig, Credentials)> {
    let cfg = ToolConfig::load_or_default(args.config.as_deref())?;
    let creds = Credentials::load(&args.creds)?;
    Ok((cfg, creds))
}
