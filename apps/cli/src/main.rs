//! # Tally Entry Point
//!
//! ## Startup Sequence
//! 1. Parse arguments (help needs no database)
//! 2. Initialize tracing (stderr, `RUST_LOG` aware)
//! 3. Load `tally.toml` and `TALLY_*` overrides
//! 4. Open the database and run pending migrations
//! 5. Run the command; map any error to an exit code

use std::process::ExitCode;

use tally_cli::cli::{Cli, Command, USAGE};
use tally_cli::config::AppConfig;
use tally_cli::error::ApiError;
use tally_cli::state::AppState;
use tally_cli::{init_tracing, print_error, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            print_error(&e, false);
            eprintln!("\n{}", USAGE);
            return exit_code(&e);
        }
    };

    if cli.command == Command::Help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    init_tracing();

    match start(cli.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e, cli.json);
            exit_code(&e)
        }
    }
}

async fn start(cli: Cli) -> Result<(), ApiError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let state = AppState::open(config, cli.db).await?;

    let result = run(&state, cli.command, cli.json).await;
    state.db.close().await;
    result
}

fn exit_code(err: &ApiError) -> ExitCode {
    ExitCode::from(u8::try_from(err.code.exit_code()).unwrap_or(1))
}
