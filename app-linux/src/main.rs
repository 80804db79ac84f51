//! Linux shell for the PPTP client.
//! Wires procfs, process spawning and the TOML settings table into the core
//! lifecycle manager.

mod app;
mod paths;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use log::{error, info};
use pptp_client_core::StartOutcome;
use pptp_client_core::platform::AppPaths;

use crate::app::AppState;
use crate::paths::LinuxPaths;

#[derive(Parser)]
#[command(name = "pptp-client")]
#[command(about = "Start and stop the PPTP client tunnel")]
struct Cli {
    /// Path to the layout file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the connection settings file
    #[arg(short, long, global = true)]
    params: Option<PathBuf>,

    /// Override a connection setting (key=value), may repeat
    #[arg(long = "set", value_parser = parse_override, global = true)]
    overrides: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the tunnel up
    Start,
    /// Stop the tunnel and remove its scaffolding
    Stop,
    /// Report whether the tunnel process is running
    Status,
    /// Print the options file start would write, password masked
    Render,
    /// Start, wait for Ctrl-C or SIGTERM, then stop
    Run,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let paths = LinuxPaths {
        config: cli.config,
        params: cli.params,
    };

    let mut state = match AppState::new(paths, &cli.overrides) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Start => exit_code(cmd_start(&mut state).is_some()),
        Commands::Stop => {
            state.manager.stop();
            ExitCode::SUCCESS
        }
        Commands::Status => cmd_status(&state),
        Commands::Render => match state.manager.preview() {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("[ERROR] {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Run => cmd_run(&mut state),
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn cmd_start(state: &mut AppState) -> Option<StartOutcome> {
    match state.manager.start() {
        Ok(outcome) => {
            match outcome {
                StartOutcome::AlreadyRunning => println!("already running"),
                StartOutcome::Launched { pid } => println!("started (pid {pid})"),
            }
            Some(outcome)
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            None
        }
    }
}

/// Only a tunnel this invocation launched is stopped on exit.
fn stops_on_exit(outcome: StartOutcome) -> bool {
    matches!(outcome, StartOutcome::Launched { .. })
}

fn cmd_status(state: &AppState) -> ExitCode {
    let layout = state.manager.layout();
    let running = state.manager.is_running();

    println!("process:  {}", layout.process_name);
    println!("running:  {}", if running { "yes" } else { "no" });
    println!("workdir:  {}", layout.working_dir.display());
    println!("layout:   {}", state.paths.config_path().display());
    println!("params:   {}", state.paths.params_path().display());

    if running {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(3)
    }
}

fn cmd_run(state: &mut AppState) -> ExitCode {
    let Some(outcome) = cmd_start(state) else {
        return ExitCode::FAILURE;
    };
    if !stops_on_exit(outcome) {
        info!("Tunnel was not started by this invocation, leaving it running");
        return ExitCode::SUCCESS;
    }

    let (tx, rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(());
    }) {
        error!("Failed to install signal handler: {}", e);
        state.manager.stop();
        return ExitCode::FAILURE;
    }

    info!("Tunnel started; waiting for Ctrl-C or SIGTERM");
    let _ = rx.recv();

    info!("Received signal, stopping tunnel");
    state.manager.stop();
    ExitCode::SUCCESS
}
