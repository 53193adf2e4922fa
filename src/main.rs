//! Stride CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use stride::cli::{commands, Cli, Commands};
use stride::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.silent {
        stride::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, cli.db.as_ref(), json),
        Commands::Version => commands::version::execute(json),
        Commands::Tag { command } => commands::tag::execute(command, cli.db.as_ref(), json),
        Commands::Task { command } => commands::task::execute(command, cli.db.as_ref(), json),
        Commands::Milestone { command } => {
            commands::milestone::execute(command, cli.db.as_ref(), json)
        }
        Commands::Progress => commands::progress::execute(cli.db.as_ref(), json),
        Commands::Sync { command } => commands::sync::execute(command, cli.db.as_ref(), json),
        Commands::Completions { shell } => commands::completions::execute(*shell),
    }
}
