//! # Output Formatting
//!
//! Everything a command produces is an [`Output`]. It is printed either as
//! plain text for people or, with `--json`, as pretty JSON for scripts.
//!
//! Amounts are stored unrounded; rounding to two decimals happens only
//! here, at display time.

use std::fmt::Write as _;

use serde::Serialize;
use tally_core::report::DashboardStats;
use tally_core::{PricedBasket, Product, ProductId, Sale, SaleItem, SaleTotals};

use crate::cli::USAGE;
use crate::commands::report::SalesReport;
use crate::error::ApiError;

/// Result of one command, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Product(Product),
    Products(Vec<Product>),
    Deleted(ProductId),
    Sale(Sale),
    Sales(Vec<Sale>),
    Preview(PricedBasket),
    Report(SalesReport),
    Dashboard(DashboardStats),
    Help,
}

#[derive(Serialize)]
struct Deleted {
    deleted: ProductId,
}

impl Output {
    /// Human-readable rendering.
    pub fn to_text(&self, currency: &str) -> String {
        match self {
            Output::Product(p) => product_detail(p, currency),
            Output::Products(list) => product_table(list, currency),
            Output::Deleted(id) => format!("Deleted product #{}", id),
            Output::Sale(sale) => sale_detail(sale, currency),
            Output::Sales(list) => sale_table(list, currency),
            Output::Preview(priced) => preview(priced, currency),
            Output::Report(report) => report_text(report, currency),
            Output::Dashboard(stats) => dashboard_text(stats, currency),
            Output::Help => USAGE.to_string(),
        }
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, ApiError> {
        let json = match self {
            Output::Product(p) => serde_json::to_string_pretty(p)?,
            Output::Products(list) => serde_json::to_string_pretty(list)?,
            Output::Deleted(id) => serde_json::to_string_pretty(&Deleted { deleted: *id })?,
            Output::Sale(sale) => serde_json::to_string_pretty(sale)?,
            Output::Sales(list) => serde_json::to_string_pretty(list)?,
            Output::Preview(priced) => serde_json::to_string_pretty(priced)?,
            Output::Report(report) => serde_json::to_string_pretty(report)?,
            Output::Dashboard(stats) => serde_json::to_string_pretty(stats)?,
            Output::Help => serde_json::to_string_pretty(USAGE)?,
        };
        Ok(json)
    }

    pub fn render(&self, json: bool, currency: &str) -> Result<String, ApiError> {
        if json {
            self.to_json()
        } else {
            Ok(self.to_text(currency))
        }
    }
}

/// Formats an amount with two decimals, e.g. `USD 1540.00`.
pub fn format_money(amount: f64, currency: &str) -> String {
    // Avoid printing "-0.00" for tiny negative rounding residue.
    let rounded = (amount * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{} {:.2}", currency, rounded)
}

// =============================================================================
// Products
// =============================================================================

pub fn product_table(products: &[Product], currency: &str) -> String {
    if products.is_empty() {
        return "No products.".to_string();
    }

    let mut out = format!(
        "{:>5}  {:<28} {:<14} {:>14} {:>14} {:>7}\n",
        "ID", "NAME", "CATEGORY", "WHOLESALE", "PRICE", "STOCK"
    );
    for p in products {
        let _ = writeln!(
            out,
            "{:>5}  {:<28} {:<14} {:>14} {:>14} {:>7}",
            p.id,
            truncate(&p.name, 28),
            truncate(&p.category, 14),
            format_money(p.wholesale_price, currency),
            format_money(p.selling_price, currency),
            p.stock
        );
    }
    out.trim_end().to_string()
}

fn product_detail(p: &Product, currency: &str) -> String {
    let mut out = format!("#{} {}\n", p.id, p.name);
    let _ = writeln!(out, "  Category:   {}", p.category);
    if !p.description.is_empty() {
        let _ = writeln!(out, "  About:      {}", p.description);
    }
    let _ = writeln!(out, "  Wholesale:  {}", format_money(p.wholesale_price, currency));
    let _ = writeln!(out, "  Price:      {}", format_money(p.selling_price, currency));
    let _ = writeln!(out, "  Margin:     {}", format_money(p.unit_margin(), currency));
    let _ = writeln!(out, "  Stock:      {}", p.stock);
    let _ = write!(out, "  Added:      {}", p.created_at.format("%Y-%m-%d %H:%M"));
    out
}

// =============================================================================
// Sales
// =============================================================================

fn sale_table(sales: &[Sale], currency: &str) -> String {
    if sales.is_empty() {
        return "No sales.".to_string();
    }

    let mut out = format!(
        "{:>5}  {:<16} {:>6} {:>14} {:>14}\n",
        "ID", "DATE", "ITEMS", "TOTAL", "PROFIT"
    );
    for s in sales {
        let _ = writeln!(
            out,
            "{:>5}  {:<16} {:>6} {:>14} {:>14}",
            s.id,
            s.date.format("%Y-%m-%d %H:%M"),
            s.items_sold(),
            format_money(s.final_amount, currency),
            format_money(s.profit, currency)
        );
    }
    out.trim_end().to_string()
}

fn item_lines(out: &mut String, items: &[SaleItem], currency: &str) {
    for item in items {
        let _ = writeln!(
            out,
            "  {:>4} × {:<28} @ {:>12}  {:>14}",
            item.quantity,
            truncate(&item.product_name, 28),
            format_money(item.selling_price, currency),
            format_money(item.total_price, currency)
        );
    }
}

fn totals_lines(out: &mut String, totals: &SaleTotals, discount_pct: f64, currency: &str) {
    let _ = writeln!(out, "  Subtotal:  {}", format_money(totals.total_amount, currency));
    if totals.discount_amount != 0.0 {
        let _ = writeln!(
            out,
            "  Discount:  -{} ({}%)",
            format_money(totals.discount_amount, currency),
            discount_pct
        );
    }
    let _ = writeln!(out, "  Total:     {}", format_money(totals.final_amount, currency));
    let _ = write!(out, "  Profit:    {}", format_money(totals.profit, currency));
}

fn sale_detail(sale: &Sale, currency: &str) -> String {
    let mut out = format!("Sale #{}  {}\n", sale.id, sale.date.format("%Y-%m-%d %H:%M:%S"));
    item_lines(&mut out, &sale.items, currency);
    let totals = SaleTotals {
        total_amount: sale.total_amount,
        discount_amount: sale.discount_amount,
        final_amount: sale.final_amount,
        profit: sale.profit,
    };
    totals_lines(&mut out, &totals, sale.discount_percentage, currency);
    out
}

fn preview(priced: &PricedBasket, currency: &str) -> String {
    let mut out = String::from("Preview (not saved)\n");
    item_lines(&mut out, &priced.items, currency);
    totals_lines(&mut out, &priced.totals, priced.discount.percentage(), currency);
    out
}

// =============================================================================
// Reports
// =============================================================================

fn report_text(report: &SalesReport, currency: &str) -> String {
    let s = &report.summary;
    let mut out = format!("Sales {} to {}\n", report.from, report.to);
    let _ = writeln!(out, "  Sales:     {}", s.sale_count);
    let _ = writeln!(out, "  Items:     {}", s.items_sold);
    let _ = writeln!(out, "  Revenue:   {}", format_money(s.total_sales, currency));
    let _ = writeln!(out, "  Discounts: {}", format_money(s.total_discount, currency));
    let _ = writeln!(out, "  Profit:    {}", format_money(s.total_profit, currency));
    let _ = writeln!(out, "  Average:   {}", format_money(s.average_sale(), currency));

    if !report.days.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {:<10} {:>6} {:>6} {:>14} {:>14}",
            "DAY", "SALES", "ITEMS", "REVENUE", "PROFIT"
        );
        for d in &report.days {
            let _ = writeln!(
                out,
                "  {:<10} {:>6} {:>6} {:>14} {:>14}",
                d.day,
                d.sale_count,
                d.items,
                format_money(d.sales, currency),
                format_money(d.profit, currency)
            );
        }
    }
    out.trim_end().to_string()
}

fn dashboard_text(stats: &DashboardStats, currency: &str) -> String {
    let mut out = format!("Products: {}\n", stats.product_count);
    let _ = writeln!(out, "Sales:    {}", stats.summary.sale_count);
    let _ = writeln!(out, "Revenue:  {}", format_money(stats.summary.total_sales, currency));
    let _ = writeln!(out, "Profit:   {}", format_money(stats.summary.total_profit, currency));

    let _ = writeln!(out, "\nLow stock:");
    let _ = writeln!(out, "{}", low_stock_text(&stats.low_stock));

    let _ = writeln!(out, "\nRecent sales:");
    let _ = write!(out, "{}", sale_table(&stats.recent_sales, currency));
    out
}

/// One line per low-stock product, lowest stock first as given.
pub fn low_stock_text(products: &[Product]) -> String {
    if products.is_empty() {
        return "  (none)".to_string();
    }
    products
        .iter()
        .map(|p| format!("  #{} {}: {} left", p.id, p.name, p.stock))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tally_core::DiscountRate;

    fn product() -> Product {
        Product {
            id: 1,
            name: "Notebook".to_string(),
            description: String::new(),
            wholesale_price: 100.0,
            selling_price: 150.0,
            stock: 3,
            category: "Stationery".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(540.0, "USD"), "USD 540.00");
        assert_eq!(format_money(0.125, "PKR"), "PKR 0.13");
        assert_eq!(format_money(-0.001, "USD"), "USD 0.00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Pen", 5), "Pen");
        assert_eq!(truncate("Notebook", 5), "Note…");
    }

    #[test]
    fn test_product_table() {
        let text = Output::Products(vec![product()]).to_text("USD");
        assert!(text.starts_with("   ID"));
        assert!(text.contains("Notebook"));
        assert!(text.contains("USD 150.00"));

        assert_eq!(Output::Products(vec![]).to_text("USD"), "No products.");
    }

    #[test]
    fn test_preview_shows_discount() {
        let item = SaleItem::snapshot(&product(), 4);
        let discount = DiscountRate::from_percentage(10.0);
        let totals = tally_core::pricing::sale_totals(std::slice::from_ref(&item), discount);
        let text = Output::Preview(PricedBasket {
            items: vec![item],
            discount,
            totals,
        })
        .to_text("USD");

        assert!(text.contains("Subtotal:  USD 600.00"));
        assert!(text.contains("Discount:  -USD 60.00 (10%)"));
        assert!(text.contains("Total:     USD 540.00"));
        assert!(text.contains("Profit:    USD 140.00"));
    }

    #[test]
    fn test_json_output() {
        let json = Output::Deleted(4).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["deleted"], 4);

        let json = Output::Product(product()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["selling_price"], 150.0);
    }

    #[test]
    fn test_low_stock_text() {
        assert_eq!(low_stock_text(&[]), "  (none)");
        assert_eq!(low_stock_text(&[product()]), "  #1 Notebook: 3 left");
    }
}
