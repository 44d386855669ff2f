//! nixpi-setup - NixOS Raspberry Pi post-boot configuration tool
//!
//! Entry point: initialize logging, gate on root privilege, then dispatch
//! to one of the three run modes (line prompts, screen flow, or
//! non-interactive flags).

use std::process::ExitCode;

use clap::Parser;

use nixpi_setup::apply::{ApplyPaths, ApplyRun};
use nixpi_setup::cli::Cli;
use nixpi_setup::keysource::GithubKeyFetcher;
use nixpi_setup::probe::HostProbe;
use nixpi_setup::wizard::Wizard;
use nixpi_setup::{prompt, ui};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    // every run mode writes system files and ends in nixos-rebuild
    if !nix::unistd::geteuid().is_root() {
        eprintln!("Error: this tool must be run as root");
        eprintln!("Usage: sudo nixpi-setup");
        return ExitCode::FAILURE;
    }

    let paths = ApplyPaths::default();

    if cli.non_interactive {
        return run_non_interactive(&cli, paths);
    }

    if !cli.tui {
        // Ctrl+C ends the linear session without applying anything
        let _ = ctrlc::set_handler(|| {
            eprintln!("\n\nSetup cancelled.");
            std::process::exit(1);
        });
    }

    let probe = HostProbe::detect(&paths);
    tracing::info!("{probe}");
    let wizard = Wizard::new(probe, Box::new(GithubKeyFetcher::new()));

    let result = if cli.tui {
        ui::run(wizard, paths)
    } else {
        prompt::run(wizard, paths)
    };

    match result {
        Ok(Some(report)) if !report.any_failed() => ExitCode::SUCCESS,
        // cancelled sessions and failed stages both report failure
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_non_interactive(cli: &Cli, paths: ApplyPaths) -> ExitCode {
    println!("Running in non-interactive mode...");

    let config = match cli.build_config(&GithubKeyFetcher::new()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut run = ApplyRun::new(config, paths);
    prompt::drive_pipeline(&mut run);
    let report = run.into_report();
    prompt::print_report(&report);

    if report.any_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
