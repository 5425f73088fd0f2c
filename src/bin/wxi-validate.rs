extern crate wxi_validate;

use anyhow::Context;
use clap::Parser;
use fs_err as fs;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wxi_validate::{validate_installed, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "wxi-validate",
    version,
    about = "Cross-check WiX include manifests against binaries and installed packages"
)]
struct Args {
    /// .wxi manifests to validate; the manifests they require are loaded too
    #[arg(required = true, value_name = "MANIFEST")]
    manifests: Vec<PathBuf>,

    /// Also write the full report, as JSON, to this path
    #[arg(short = 'j', long = "output-json-path", value_name = "OUTPUT_JSON_PATH")]
    output_json_path: Option<PathBuf>,

    /// Sets the level of verbosity (-v: progress, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match args.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env();
    tracing::debug!("{:?}", settings);

    let report = validate_installed(&settings, &args.manifests).context("Validation failed")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report
        .write_to(&mut out)
        .context("couldn't write the report")?;
    out.flush()?;

    // JSON representation

    if let Some(json_output_path) = &args.output_json_path {
        let js = serde_json::to_string_pretty(&report).context("Error serializing")?;
        let shown = json_output_path.display();
        let mut file = fs::File::create(json_output_path)
            .context(format!("couldn't create {}", shown))?;
        file.write_all(js.as_bytes())
            .context(format!("couldn't write to {}", shown))?;
        tracing::info!("successfully wrote to {}", shown);
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
