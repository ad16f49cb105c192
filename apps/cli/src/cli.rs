//! # Argument Parsing
//!
//! Turns `argv` (or a line typed in the `watch` session) into a [`Cli`].
//!
//! ```text
//! tally [--config PATH] [--db PATH] [--json] <command>
//!
//! product add --name N --category C --wholesale X --price Y --stock S [--description D]
//! product edit <id> [--name N] [--category C] [--wholesale X] [--price Y]
//!                   [--stock S] [--description D]
//! product delete <id>
//! product show <id>
//! product list
//! product search <term>
//! sale new <id:qty>... [--discount PCT]
//! sale preview <id:qty>... [--discount PCT]
//! sale list [--limit N]
//! sale show <id>
//! report <YYYY-MM-DD>..<YYYY-MM-DD>
//! dashboard
//! watch
//! help
//! ```
//!
//! Parsing only checks shape (numbers are numbers, ids are ids). Whether a
//! price may be negative or a quantity zero is decided by the stores.

use std::path::PathBuf;

use chrono::NaiveDate;
use tally_core::{BasketLine, DiscountRate, NewProduct, ProductId, ProductPatch, SaleId};

use crate::error::ApiError;

pub const USAGE: &str = "\
Usage: tally [--config PATH] [--db PATH] [--json] <command>

Commands:
  product add --name N --category C --wholesale X --price Y --stock S [--description D]
  product edit <id> [--name N] [--category C] [--wholesale X] [--price Y] [--stock S] [--description D]
  product delete <id>
  product show <id>
  product list
  product search <term>
  sale new <id:qty>... [--discount PCT]
  sale preview <id:qty>... [--discount PCT]
  sale list [--limit N]
  sale show <id>
  report <YYYY-MM-DD>..<YYYY-MM-DD>
  dashboard
  watch        interactive session; low stock is reprinted whenever it changes
  help

Environment:
  TALLY_DB_PATH, TALLY_LOW_STOCK_THRESHOLD, TALLY_CURRENCY, RUST_LOG";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub json: bool,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ProductAdd(NewProduct),
    ProductEdit { id: ProductId, patch: ProductPatch },
    ProductDelete(ProductId),
    ProductShow(ProductId),
    ProductList,
    ProductSearch(String),
    SaleNew { lines: Vec<BasketLine>, discount: DiscountRate },
    SalePreview { lines: Vec<BasketLine>, discount: DiscountRate },
    SaleList { limit: Option<usize> },
    SaleShow(SaleId),
    Report { from: NaiveDate, to: NaiveDate },
    Dashboard,
    Watch,
    Help,
}

type ParseResult<T> = Result<T, ApiError>;

// =============================================================================
// Entry Points
// =============================================================================

impl Cli {
    /// Parses process arguments, without the program name.
    pub fn parse<I, S>(args: I) -> ParseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = None;
        let mut db = None;
        let mut json = false;
        let mut rest = Vec::new();

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => config = Some(PathBuf::from(value_for(&mut args, "--config")?)),
                "--db" => db = Some(PathBuf::from(value_for(&mut args, "--db")?)),
                "--json" => json = true,
                "-h" | "--help" => rest.push("help".to_string()),
                _ => rest.push(arg),
            }
        }

        Ok(Cli {
            config,
            db,
            json,
            command: parse_command(&rest)?,
        })
    }
}

/// Parses one command from already split words.
pub fn parse_command(words: &[String]) -> ParseResult<Command> {
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    match words.as_slice() {
        [] | ["help"] => Ok(Command::Help),
        ["product", "add", flags @ ..] => parse_product_add(flags),
        ["product", "edit", id, flags @ ..] => Ok(Command::ProductEdit {
            id: parse_id(id)?,
            patch: parse_patch(flags)?,
        }),
        ["product", "delete", id] => Ok(Command::ProductDelete(parse_id(id)?)),
        ["product", "show", id] => Ok(Command::ProductShow(parse_id(id)?)),
        ["product", "list"] => Ok(Command::ProductList),
        ["product", "search", terms @ ..] => Ok(Command::ProductSearch(terms.join(" "))),
        ["sale", "new", args @ ..] => {
            let (lines, discount) = parse_basket(args)?;
            Ok(Command::SaleNew { lines, discount })
        }
        ["sale", "preview", args @ ..] => {
            let (lines, discount) = parse_basket(args)?;
            Ok(Command::SalePreview { lines, discount })
        }
        ["sale", "list"] => Ok(Command::SaleList { limit: None }),
        ["sale", "list", "--limit", n] => Ok(Command::SaleList {
            limit: Some(parse_number(n, "--limit")?),
        }),
        ["sale", "show", id] => Ok(Command::SaleShow(parse_id(id)?)),
        ["report", range] => {
            let (from, to) = parse_range(range)?;
            Ok(Command::Report { from, to })
        }
        ["dashboard"] => Ok(Command::Dashboard),
        ["watch"] => Ok(Command::Watch),
        _ => Err(ApiError::validation(format!(
            "Unrecognised command: {}. Run `tally help`.",
            words.join(" ")
        ))),
    }
}

/// Splits a line on whitespace, keeping double-quoted parts together.
pub fn split_words(line: &str) -> ParseResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }

    if in_quotes {
        return Err(ApiError::validation("Unclosed quote"));
    }
    if has_word {
        words.push(current);
    }
    Ok(words)
}

// =============================================================================
// Pieces
// =============================================================================

fn value_for<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> ParseResult<String> {
    args.next()
        .ok_or_else(|| ApiError::validation(format!("{} needs a value", flag)))
}

fn parse_id(raw: &str) -> ParseResult<i64> {
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| ApiError::validation(format!("Not an id: {}", raw)))
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> ParseResult<T> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("{} must be a number, got {}", what, raw)))
}

/// Collects `--flag value` pairs.
fn flag_pairs<'a>(flags: &[&'a str]) -> ParseResult<Vec<(&'a str, &'a str)>> {
    let mut pairs = Vec::with_capacity(flags.len() / 2);
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        if !flag.starts_with("--") {
            return Err(ApiError::validation(format!("Unexpected argument: {}", flag)));
        }
        let value = iter
            .next()
            .ok_or_else(|| ApiError::validation(format!("{} needs a value", flag)))?;
        pairs.push((*flag, *value));
    }
    Ok(pairs)
}

fn parse_patch(flags: &[&str]) -> ParseResult<ProductPatch> {
    let mut patch = ProductPatch::default();
    for (flag, value) in flag_pairs(flags)? {
        match flag {
            "--name" => patch.name = Some(value.to_string()),
            "--category" => patch.category = Some(value.to_string()),
            "--description" => patch.description = Some(value.to_string()),
            "--wholesale" => patch.wholesale_price = Some(parse_number(value, flag)?),
            "--price" => patch.selling_price = Some(parse_number(value, flag)?),
            "--stock" => patch.stock = Some(parse_number(value, flag)?),
            other => return Err(ApiError::validation(format!("Unknown option: {}", other))),
        }
    }
    Ok(patch)
}

fn parse_product_add(flags: &[&str]) -> ParseResult<Command> {
    let patch = parse_patch(flags)?;
    let missing = |flag: &str| ApiError::validation(format!("product add needs {}", flag));

    Ok(Command::ProductAdd(NewProduct {
        name: patch.name.ok_or_else(|| missing("--name"))?,
        description: patch.description.unwrap_or_default(),
        wholesale_price: patch.wholesale_price.ok_or_else(|| missing("--wholesale"))?,
        selling_price: patch.selling_price.ok_or_else(|| missing("--price"))?,
        stock: patch.stock.ok_or_else(|| missing("--stock"))?,
        category: patch.category.ok_or_else(|| missing("--category"))?,
    }))
}

/// Parses `id:qty` pairs and an optional `--discount PCT`.
fn parse_basket(args: &[&str]) -> ParseResult<(Vec<BasketLine>, DiscountRate)> {
    let mut lines = Vec::new();
    let mut discount = DiscountRate::zero();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--discount" {
            let value = iter
                .next()
                .ok_or_else(|| ApiError::validation("--discount needs a value"))?;
            discount = DiscountRate::from_percentage(parse_number(value.trim_end_matches('%'), "--discount")?);
            continue;
        }

        let (id, qty) = arg.split_once(':').unwrap_or((arg, "1"));
        lines.push(BasketLine::new(parse_id(id)?, parse_number(qty, "quantity")?));
    }

    Ok((lines, discount))
}

/// Parses `YYYY-MM-DD..YYYY-MM-DD`; a single day means that day only.
fn parse_range(raw: &str) -> ParseResult<(NaiveDate, NaiveDate)> {
    let parse_day = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApiError::validation(format!("Not a date (YYYY-MM-DD): {}", s)))
    };

    match raw.split_once("..") {
        Some((from, to)) => Ok((parse_day(from)?, parse_day(to)?)),
        None => {
            let day = parse_day(raw)?;
            Ok((day, day))
        }
    }
}
