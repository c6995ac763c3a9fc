use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use weft::dump::dump_routine;
use weft::scenario::Scenario;
use weft::DispatchConfig;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Join-point synthesis and advice dispatch", long_about = None)]
struct Cli {
    /// Configuration file (defaults to weft.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Trace synthesis decisions to stderr
    #[arg(long, global = true)]
    trace_synthesis: bool,

    /// Trace phase transitions and advice invocations to stderr
    #[arg(long, global = true)]
    trace_dispatch: bool,

    /// Disable the fast path even where it applies
    #[arg(long, global = true)]
    force_general_path: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize every operation in a scenario and report errors
    Check {
        /// The scenario file to check
        file: PathBuf,
    },
    /// Synthesize a scenario and print the resulting routine plans
    Dump {
        /// The scenario file to dump
        file: PathBuf,

        /// Only dump the operation with this signature
        #[arg(long)]
        operation: Option<String>,
    },
    /// Synthesize a scenario and execute its invocation list
    Run {
        /// The scenario file to run
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.command {
        Commands::Check { file } => {
            let scenario = match Scenario::load(file) {
                Ok(scenario) => scenario,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let mut failures = 0usize;
            for (signature, result) in scenario.synthesize_all(&config) {
                match result {
                    Ok(_) => println!("ok   {}", signature),
                    Err(e) => {
                        println!("FAIL {}: {}", signature, e);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                return ExitCode::FAILURE;
            }
        }
        Commands::Dump { file, operation } => {
            let scenario = match Scenario::load(file) {
                Ok(scenario) => scenario,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            for (signature, result) in scenario.synthesize_all(&config) {
                if let Some(filter) = operation {
                    if &signature != filter {
                        continue;
                    }
                }
                match result {
                    Ok(routine) => print!("{}", dump_routine(&scenario.env, &routine)),
                    Err(e) => {
                        eprintln!("synthesis of {} failed: {}", signature, e);
                        return ExitCode::FAILURE;
                    }
                }
            }
        }
        Commands::Run { file } => {
            let scenario = match Scenario::load(file) {
                Ok(scenario) => scenario,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            match scenario.run(&config) {
                Ok(lines) => {
                    for line in lines {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

fn load_config(cli: &Cli) -> Result<DispatchConfig, String> {
    let mut config = match &cli.config {
        Some(path) => DispatchConfig::load(path)?,
        None => {
            let default = Path::new("weft.toml");
            if default.exists() {
                DispatchConfig::load(default)?
            } else {
                DispatchConfig::default()
            }
        }
    };
    // CLI flags turn features on; they never turn a configured one off.
    config.trace_synthesis |= cli.trace_synthesis;
    config.trace_dispatch |= cli.trace_dispatch;
    config.force_general_path |= cli.force_general_path;
    Ok(config)
}
