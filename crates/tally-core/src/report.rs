//! # Reports
//!
//! Read-only aggregation over committed sales. Nothing here writes, and
//! nothing here is consulted when a sale is validated.
//!
//! ```text
//! Sales ──► summarize()        ──► SalesSummary   (range totals)
//!       ──► daily_breakdown()  ──► [DailyTotals]  (one row per UTC day)
//!       ──► DashboardStats::build() (+ products)  ──► dashboard panels
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Product, Sale};

/// Totals over a set of sales.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub sale_count: usize,
    /// Σ final_amount.
    pub total_sales: f64,
    /// Σ profit.
    pub total_profit: f64,
    /// Σ quantities over every line.
    pub items_sold: i64,
    /// Σ discount_amount.
    pub total_discount: f64,
}

impl SalesSummary {
    /// Mean final amount per sale, zero for an empty set.
    pub fn average_sale(&self) -> f64 {
        if self.sale_count == 0 {
            0.0
        } else {
            self.total_sales / self.sale_count as f64
        }
    }
}

/// Summarizes `sales` in a single pass.
pub fn summarize(sales: &[Sale]) -> SalesSummary {
    sales.iter().fold(SalesSummary::default(), |mut acc, sale| {
        acc.sale_count += 1;
        acc.total_sales += sale.final_amount;
        acc.total_profit += sale.profit;
        acc.items_sold += sale.items_sold();
        acc.total_discount += sale.discount_amount;
        acc
    })
}

/// Totals of one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyTotals {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub sale_count: usize,
    pub sales: f64,
    pub profit: f64,
    pub items: i64,
}

/// Groups sales by UTC day, oldest day first. Days without sales are
/// omitted.
pub fn daily_breakdown(sales: &[Sale]) -> Vec<DailyTotals> {
    let mut days: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();

    for sale in sales {
        let day = sale.date.date_naive();
        let entry = days.entry(day).or_insert_with(|| DailyTotals {
            day,
            sale_count: 0,
            sales: 0.0,
            profit: 0.0,
            items: 0,
        });
        entry.sale_count += 1;
        entry.sales += sale.final_amount;
        entry.profit += sale.profit;
        entry.items += sale.items_sold();
    }

    days.into_values().collect()
}

// =============================================================================
// Dashboard
// =============================================================================

/// Everything the dashboard shows, computed from current store contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub product_count: usize,
    pub summary: SalesSummary,
    /// Products under the threshold, emptiest first.
    pub low_stock: Vec<Product>,
    /// Newest sales first.
    pub recent_sales: Vec<Sale>,
}

impl DashboardStats {
    pub fn build(
        products: &[Product],
        sales: &[Sale],
        low_stock_threshold: i64,
        recent_limit: usize,
    ) -> Self {
        let mut low_stock: Vec<Product> = products
            .iter()
            .filter(|p| p.is_low_stock(low_stock_threshold))
            .cloned()
            .collect();
        low_stock.sort_by_key(|p| (p.stock, p.id));

        let mut recent_sales = sales.to_vec();
        recent_sales.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        recent_sales.truncate(recent_limit);

        DashboardStats {
            product_count: products.len(),
            summary: summarize(sales),
            low_stock,
            recent_sales,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::types::{DiscountRate, NewSale, SaleItem};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn product(id: i64, stock: i64) -> Product {
        Product {
            id,
            name: format!("P{id}"),
            description: String::new(),
            wholesale_price: 100.0,
            selling_price: 150.0,
            stock,
            category: "General".to_string(),
            created_at: at(1, 8),
        }
    }

    fn sale(id: i64, date: DateTime<Utc>, quantity: i64, discount: f64) -> Sale {
        let item = SaleItem::snapshot(&product(1, 100), quantity);
        NewSale::priced(date, vec![item], DiscountRate::from_percentage(discount)).into_sale(id)
    }

    #[test]
    fn test_summarize() {
        let sales = vec![sale(1, at(1, 9), 4, 10.0), sale(2, at(2, 9), 2, 0.0)];
        let summary = summarize(&sales);

        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.items_sold, 6);
        assert!((summary.total_sales - 840.0).abs() < 1e-9);
        assert!((summary.total_profit - 240.0).abs() < 1e-9);
        assert!((summary.total_discount - 60.0).abs() < 1e-9);
        assert!((summary.average_sale() - 420.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary, SalesSummary::default());
        assert_eq!(summary.average_sale(), 0.0);
    }

    #[test]
    fn test_daily_breakdown_groups_and_sorts() {
        let sales = vec![
            sale(3, at(5, 17), 1, 0.0),
            sale(1, at(2, 9), 2, 0.0),
            sale(2, at(5, 10), 3, 0.0),
        ];
        let days = daily_breakdown(&sales);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(days[0].items, 2);
        assert_eq!(days[1].sale_count, 2);
        assert_eq!(days[1].items, 4);
        assert!((days[1].sales - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_dashboard_stats() {
        let products = vec![product(1, 10), product(2, 4), product(3, 0)];
        let sales: Vec<Sale> = (1..=7).map(|i| sale(i, at(i as u32, 12), 1, 0.0)).collect();

        let stats = DashboardStats::build(&products, &sales, 5, 5);

        assert_eq!(stats.product_count, 3);
        assert_eq!(
            stats.low_stock.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![3, 2]
        );
        assert_eq!(
            stats.recent_sales.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![7, 6, 5, 4, 3]
        );
        assert_eq!(stats.summary.sale_count, 7);
    }
}
