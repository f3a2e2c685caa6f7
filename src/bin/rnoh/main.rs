//! rnoh CLI - React Native for OpenHarmony build tooling

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use miette::Diagnostic as _;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use rnoh::ops::SyncError;
use rnoh::util::diagnostic::{emit, DiagnosticError};
use rnoh::util::Shell;

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("rnoh=debug")
    } else {
        EnvFilter::new("rnoh=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color));

    if let Err(e) = run(cli.command, &shell) {
        report(&shell, &e);
        std::process::exit(1);
    }
}

fn run(command: Commands, shell: &Arc<Shell>) -> Result<()> {
    match command {
        Commands::Sync(args) => commands::sync::execute(args, shell),
        Commands::BundleHarmony(args) => commands::bundle_harmony::execute(args),
        Commands::RunHarmony(args) => commands::run_harmony::execute(args, shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report(shell: &Shell, e: &anyhow::Error) {
    if let Some(DiagnosticError(diag)) = e.downcast_ref::<DiagnosticError>() {
        emit(diag, shell.use_color());
        return;
    }
    // Already logged by the sync coordinator; only the hint is left to add.
    if let Some(SyncError::Validation(validation)) = e.downcast_ref::<SyncError>() {
        if let Some(help) = validation.help() {
            eprintln!("help: {}", help);
        }
        return;
    }
    eprintln!("error: {:#}", e);
}
