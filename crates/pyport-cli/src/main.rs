mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{Failure, EXIT_UNEXPECTED};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pyport",
    version,
    about = "Provision a portable embeddable Python environment for a project"
)]
struct Cli {
    /// Project directory the environment is created in.
    #[arg(long, default_value = ".", global = true)]
    project_dir: PathBuf,

    /// Configuration file (defaults to <project-dir>/pyport.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the runtime, install pip, mirror host packages and prune (default).
    Provision,
    /// Check the host interpreter, configuration and target environment.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PYPORT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| dispatch(&cli)));

    match outcome {
        Ok(Ok(code)) => ExitCode::from(code),
        Ok(Err(Failure { code, message })) => {
            eprintln!("error: {message}");
            ExitCode::from(code)
        }
        Err(_) => {
            eprintln!("error: internal error (panic)");
            ExitCode::from(EXIT_UNEXPECTED)
        }
    }
}

fn dispatch(cli: &Cli) -> Result<u8, Failure> {
    let config = cli.config.as_deref();
    match cli.command.as_ref().unwrap_or(&Commands::Provision) {
        Commands::Provision => commands::provision::run(&cli.project_dir, config, cli.json),
        Commands::Doctor => commands::doctor::run(&cli.project_dir, config, cli.json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(*shell),
    }
}
