//! # Seed Data Generator
//!
//! Fills a database with a small-shop catalog and a month of sales.
//!
//! ## Usage
//! ```bash
//! # 60 products, 120 sales (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amounts
//! cargo run -p tally-db --bin seed -- --products 200 --sales 500
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Sales go through the sale coordinator, so stock levels and the ledger
//! stay consistent exactly as they would in real use. Baskets that run
//! into empty stock are skipped.

use std::env;

use chrono::{Duration, Utc};
use tally_core::{BasketLine, CoreError, DiscountRate, NewProduct};
use tally_db::{Database, DbConfig, DbError};

/// Catalog templates: (category, names, base selling price)
const CATEGORIES: &[(&str, &[&str], f64)] = &[
    (
        "Stationery",
        &[
            "Notebook A5",
            "Notebook A4",
            "Sticky Notes",
            "Envelope Pack",
            "Binder Clips",
            "Stapler",
            "Ruler 30cm",
            "Eraser",
        ],
        4.5,
    ),
    (
        "Writing",
        &[
            "Gel Pen",
            "Ballpoint Pen",
            "Fountain Pen",
            "Pencil HB",
            "Marker Set",
            "Highlighter",
        ],
        2.0,
    ),
    (
        "Beverages",
        &[
            "Mineral Water",
            "Orange Juice",
            "Iced Tea",
            "Cola",
            "Coffee Beans",
            "Green Tea",
        ],
        1.5,
    ),
    (
        "Snacks",
        &[
            "Potato Chips",
            "Chocolate Bar",
            "Peanuts",
            "Biscuits",
            "Gummy Bears",
        ],
        1.2,
    ),
];

/// Size variants: (label, price multiplier)
const SIZES: &[(&str, f64)] = &[("", 1.0), ("Large", 1.6), ("Family Pack", 2.8)];

/// Discounts drawn for generated sales, in percent.
const DISCOUNTS: &[f64] = &[0.0, 0.0, 0.0, 5.0, 10.0, 15.0];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut product_count: usize = 60;
    let mut sale_count: usize = 120;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    product_count = args[i + 1].parse().unwrap_or(product_count);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sale_count = args[i + 1].parse().unwrap_or(sale_count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>  Number of products to generate (default: 60)");
                println!("  -s, --sales <N>     Number of sales to generate (default: 120)");
                println!("  -d, --db <PATH>     Database file path (default: ./tally_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Products: {}", product_count);
    println!("Sales:    {}", sale_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // ---- Products ----------------------------------------------------------
    let mut ids = Vec::with_capacity(product_count);
    'outer: for (size_idx, (size, multiplier)) in SIZES.iter().enumerate() {
        for (category_idx, (category, names, base_price)) in CATEGORIES.iter().enumerate() {
            for (name_idx, name) in names.iter().enumerate() {
                if ids.len() >= product_count {
                    break 'outer;
                }
                let seed = size_idx * 100 + category_idx * 10 + name_idx;
                let product = generate_product(category, name, size, base_price * multiplier, seed);

                match db.products().create(&product).await {
                    Ok(id) => ids.push(id),
                    Err(e) => eprintln!("Failed to insert {}: {}", product.name, e),
                }
            }
        }
    }
    println!("✓ Generated {} products", ids.len());

    // ---- Sales -------------------------------------------------------------
    let checkout = db.checkout();
    let now = Utc::now();
    let mut completed = 0;
    let mut skipped = 0;

    for seed in 0..sale_count {
        if ids.is_empty() {
            break;
        }
        let lines = generate_basket(&ids, seed);
        let discount = DiscountRate::from_percentage(DISCOUNTS[seed % DISCOUNTS.len()]);
        let date = now - Duration::minutes(((sale_count - seed) * 347 % (30 * 24 * 60)) as i64);

        match checkout.complete_sale_at(&lines, discount, date).await {
            Ok(_) => completed += 1,
            Err(DbError::Domain(CoreError::InsufficientStock { .. })) => skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }
    println!("✓ Completed {} sales ({} skipped for stock)", completed, skipped);

    let low = db.products().list_low_stock(tally_core::DEFAULT_LOW_STOCK_THRESHOLD).await?;
    println!("  Low-stock products: {}", low.len());

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

/// Generates a single product with plausible prices.
fn generate_product(category: &str, name: &str, size: &str, price: f64, seed: usize) -> NewProduct {
    let selling_price = ((price + (seed % 7) as f64 * 0.25) * 100.0).round() / 100.0;
    // Wholesale at 55-75% of the selling price
    let margin = 0.55 + (seed % 5) as f64 * 0.05;
    let wholesale_price = (selling_price * margin * 100.0).round() / 100.0;

    let name = if size.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, size)
    };

    NewProduct {
        name,
        description: format!("{} item", category),
        wholesale_price,
        selling_price,
        stock: (seed * 13 % 60) as i64,
        category: category.to_string(),
    }
}

/// Picks 1-3 products with small quantities.
fn generate_basket(ids: &[i64], seed: usize) -> Vec<BasketLine> {
    let lines = 1 + seed % 3;
    (0..lines)
        .map(|n| {
            let id = ids[(seed * 7 + n * 11) % ids.len()];
            BasketLine::new(id, 1 + ((seed + n) % 4) as i64)
        })
        .collect()
}
