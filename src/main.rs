//! ChurnForge: customer churn risk console
//!
//! Entry point: loads the model artifacts once, then either scores a single
//! profile from the command line or runs an interactive session on stdin.

use anyhow::Result;
use churnforge::{Args, Config, Console, ModelArtifacts, ReportKind, SessionState};
use clap::Parser;
use std::io::{self, Write};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = Config::resolve(&args);
    log::debug!("Configuration: {:?}", config);

    if args.verbose {
        println!("ChurnForge - Customer Churn Risk Console");
        println!("========================================\n");
    }

    let artifacts = ModelArtifacts::load(&config.model_path, &config.encoder_path);
    let session = SessionState::with_profile(args.build_profile()?);

    if args.interactive {
        run_interactive(session, &artifacts, &config)
    } else {
        run_single_prediction(&args, session, &artifacts, &config)
    }
}

/// Interactive session on stdin/stdout
fn run_interactive(session: SessionState, artifacts: &ModelArtifacts, config: &Config) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut console = Console::new(session, artifacts, config);
    console.run(stdin.lock(), &mut out)?;
    writeln!(out)?;
    Ok(())
}

/// Score the profile given on the command line and print every report
fn run_single_prediction(
    args: &Args,
    session: SessionState,
    artifacts: &ModelArtifacts,
    config: &Config,
) -> Result<()> {
    println!("=== Churn Prediction ===");
    println!("{}\n", artifacts.status_line());

    let start_time = Instant::now();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut console = Console::new(session, artifacts, config);

    console.print_inputs(&mut out)?;
    writeln!(out)?;
    console.predict(&mut out)?;

    if console.session.result.is_none() {
        // refusal was already reported
        out.flush()?;
        std::process::exit(1);
    }

    writeln!(out)?;
    console.print_report(ReportKind::All, &mut out)?;

    if args.export {
        console.export(&mut out)?;
    }
    if args.charts {
        console.charts(&mut out)?;
    }

    if args.verbose {
        writeln!(
            out,
            "\nTotal processing time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        )?;
    }
    Ok(())
}
