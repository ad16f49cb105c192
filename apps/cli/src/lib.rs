//! # Tally CLI Library
//!
//! Everything behind the `tally` binary, kept in a library so commands can
//! be tested without spawning a process.
//!
//! ## Module Organization
//! ```text
//! tally_cli/
//! ├── lib.rs          ◄─── You are here (tracing, dispatch, watch session)
//! ├── cli.rs          ◄─── Argument parsing
//! ├── config.rs       ◄─── tally.toml + TALLY_* overrides
//! ├── state.rs        ◄─── Database handle + config
//! ├── commands/
//! │   ├── product.rs  ◄─── Catalog commands
//! │   ├── sale.rs     ◄─── Sale commands
//! │   └── report.rs   ◄─── Reports and dashboard
//! ├── output.rs       ◄─── Text and JSON rendering
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## The `watch` Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   stdin line ──► split_words ──► parse_command ──► execute ──► print    │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                               ChangeFeed publish        │
//! │                                                      │                  │
//! │   LiveQuery(low stock) ◄─────────────────────────────┘                  │
//! │        │                                                                │
//! │        └──► low-stock list reprinted only when the result differs      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands typed in the session run in this process, so they go through
//! the same change feed the live query listens to.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod state;

use tally_db::Table;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Command;
use commands::{product, report, sale};
use error::ApiError;
use output::Output;
use state::AppState;

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout stays clean for command output.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally_db=trace` - Show trace for the storage crate only
/// - Default: WARN, INFO for tally crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tally=info,sqlx=warn"));

    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs one command to completion and returns what should be printed.
///
/// `watch` is not handled here; see [`watch`].
pub async fn execute(state: &AppState, command: Command) -> Result<Output, ApiError> {
    debug!(?command, "Executing command");

    let output = match command {
        Command::ProductAdd(new) => Output::Product(product::add_product(state, new).await?),
        Command::ProductEdit { id, patch } => {
            Output::Product(product::edit_product(state, id, patch).await?)
        }
        Command::ProductDelete(id) => {
            product::delete_product(state, id).await?;
            Output::Deleted(id)
        }
        Command::ProductShow(id) => Output::Product(product::get_product(state, id).await?),
        Command::ProductList => Output::Products(product::list_products(state).await?),
        Command::ProductSearch(term) => {
            Output::Products(product::search_products(state, &term).await?)
        }
        Command::SaleNew { lines, discount } => {
            Output::Sale(sale::complete_sale(state, &lines, discount).await?)
        }
        Command::SalePreview { lines, discount } => {
            Output::Preview(sale::preview_sale(state, &lines, discount).await?)
        }
        Command::SaleList { limit } => Output::Sales(sale::list_sales(state, limit).await?),
        Command::SaleShow(id) => Output::Sale(sale::get_sale(state, id).await?),
        Command::Report { from, to } => {
            Output::Report(report::sales_report(state, from, to).await?)
        }
        Command::Dashboard => Output::Dashboard(report::dashboard(state).await?),
        Command::Help => Output::Help,
        Command::Watch => {
            return Err(ApiError::validation("Already watching"));
        }
    };

    Ok(output)
}

/// Runs a parsed command line, printing results to stdout.
pub async fn run(state: &AppState, command: Command, json: bool) -> Result<(), ApiError> {
    if command == Command::Watch {
        return watch(state, json).await;
    }

    let output = execute(state, command).await?;
    println!("{}", output.render(json, state.currency())?);
    Ok(())
}

/// Interactive session: reads commands from stdin and reprints the
/// low-stock list whenever it changes. Ends on EOF, `quit` or `exit`.
pub async fn watch(state: &AppState, json: bool) -> Result<(), ApiError> {
    let threshold = state.config.inventory.low_stock_threshold;
    let products = state.db.products();
    let mut low_stock = state
        .db
        .live_query(vec![Table::Products], move || {
            let products = products.clone();
            async move { products.list_low_stock(threshold).await }
        })
        .await?;

    info!(threshold, "Watching low stock");
    print_low_stock(&low_stock.current(), json)?;
    eprintln!("Type commands (e.g. `sale new 3:2`), `quit` to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" || line == "exit" {
                    break;
                }
                match run_line(state, line).await {
                    Ok(output) => println!("{}", output.render(json, state.currency())?),
                    Err(e) => print_error(&e, json),
                }
            }
            changed = low_stock.changed() => {
                let Some(products) = changed else { break };
                print_low_stock(&products, json)?;
            }
        }
    }

    low_stock.unsubscribe();
    info!("Watch session ended");
    Ok(())
}

async fn run_line(state: &AppState, line: &str) -> Result<Output, ApiError> {
    let words = cli::split_words(line)?;
    let command = cli::parse_command(&words)?;
    execute(state, command).await
}

fn print_low_stock(products: &[tally_core::Product], json: bool) -> Result<(), ApiError> {
    if json {
        println!("{}", serde_json::to_string(&serde_json::json!({ "low_stock": products }))?);
    } else {
        println!("Low stock:\n{}", output::low_stock_text(products));
    }
    Ok(())
}

/// Prints an error to stderr in the selected format.
pub fn print_error(err: &ApiError, json: bool) {
    if json {
        match serde_json::to_string(err) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("error: {}", err.message),
        }
    } else {
        eprintln!("error: {}", err.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ErrorCode;
    use std::time::Duration;
    use tally_core::{BasketLine, DiscountRate, NewProduct};

    async fn state() -> AppState {
        AppState::in_memory(AppConfig::default()).await.unwrap()
    }

    fn pen(stock: i64) -> NewProduct {
        NewProduct {
            name: "Gel Pen".to_string(),
            description: String::new(),
            wholesale_price: 1.0,
            selling_price: 2.5,
            stock,
            category: "Writing".to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_line_round_trip() {
        let state = state().await;

        let added = run_line(
            &state,
            r#"product add --name "Gel Pen" --category Writing --wholesale 1 --price 2.5 --stock 8"#,
        )
        .await
        .unwrap();
        let Output::Product(p) = added else {
            panic!("expected a product")
        };

        let sold = run_line(&state, &format!("sale new {}:3", p.id)).await.unwrap();
        let Output::Sale(sale) = sold else {
            panic!("expected a sale")
        };
        assert_eq!(sale.final_amount, 7.5);

        let shown = run_line(&state, &format!("product show {}", p.id)).await.unwrap();
        assert!(matches!(shown, Output::Product(ref q) if q.stock == 5));
    }

    #[tokio::test]
    async fn test_nested_watch_is_rejected() {
        let state = state().await;
        let err = execute(&state, Command::Watch).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_bad_line_is_a_validation_error() {
        let state = state().await;
        let err = run_line(&state, "sale new abc").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_low_stock_query_follows_sales() {
        let state = state().await;
        let id = state.db.products().create(&pen(8)).await.unwrap();

        let products = state.db.products();
        let mut low = state
            .db
            .live_query(vec![Table::Products], move || {
                let products = products.clone();
                async move { products.list_low_stock(5).await }
            })
            .await
            .unwrap();
        assert!(low.current().is_empty());

        execute(
            &state,
            Command::SaleNew {
                lines: vec![BasketLine::new(id, 4)],
                discount: DiscountRate::zero(),
            },
        )
        .await
        .unwrap();

        let updated = tokio::time::timeout(Duration::from_secs(5), low.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].stock, 4);
    }
}
