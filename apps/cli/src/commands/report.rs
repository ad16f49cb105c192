//! # Report Commands
//!
//! Read-only views over the ledger: date-range reports and the dashboard.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tally_core::report::{daily_breakdown, summarize, DailyTotals, DashboardStats, SalesSummary};
use tally_core::Sale;

use crate::error::ApiError;
use crate::state::AppState;

/// Sales between two calendar days (both included).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary: SalesSummary,
    pub days: Vec<DailyTotals>,
    pub sales: Vec<Sale>,
}

/// Expands whole days into an inclusive UTC timestamp range.
pub fn day_bounds(from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .unwrap_or_else(|| to.and_time(NaiveTime::MIN))
        .and_utc();
    (start, end)
}

pub async fn sales_report(
    state: &AppState,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<SalesReport, ApiError> {
    if from > to {
        return Err(ApiError::validation(format!(
            "Report range starts after it ends: {} > {}",
            from, to
        )));
    }

    let (start, end) = day_bounds(from, to);
    let sales = state.db.sales().list_by_date_range(start, end).await?;

    Ok(SalesReport {
        from,
        to,
        summary: summarize(&sales),
        days: daily_breakdown(&sales),
        sales,
    })
}

pub async fn dashboard(state: &AppState) -> Result<DashboardStats, ApiError> {
    let products = state.db.products().list().await?;
    let sales = state.db.sales().list().await?;

    Ok(DashboardStats::build(
        &products,
        &sales,
        state.config.inventory.low_stock_threshold,
        state.config.display.recent_sales_limit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tally_core::{BasketLine, DiscountRate, NewProduct};

    use crate::config::AppConfig;
    use crate::error::ErrorCode;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    async fn seeded_state() -> AppState {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let id = state
            .db
            .products()
            .create(&NewProduct {
                name: "Notebook".to_string(),
                description: String::new(),
                wholesale_price: 100.0,
                selling_price: 150.0,
                stock: 20,
                category: "Stationery".to_string(),
            })
            .await
            .unwrap();

        let checkout = state.db.checkout();
        for (d, hour) in [(1, 0), (2, 23), (3, 12)] {
            let date = Utc.with_ymd_and_hms(2024, 6, d, hour, 0, 0).unwrap();
            checkout
                .complete_sale_at(&[BasketLine::new(id, 2)], DiscountRate::zero(), date)
                .await
                .unwrap();
        }
        state
    }

    #[test]
    fn test_day_bounds_cover_whole_days() {
        let (start, end) = day_bounds(day(1), day(2));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 6, 2, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_sales_report_range() {
        let state = seeded_state().await;

        let report = sales_report(&state, day(1), day(2)).await.unwrap();
        assert_eq!(report.summary.sale_count, 2);
        assert_eq!(report.summary.items_sold, 4);
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.summary.total_sales, 600.0);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let state = seeded_state().await;
        let err = sales_report(&state, day(3), day(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let state = seeded_state().await;
        let stats = dashboard(&state).await.unwrap();

        assert_eq!(stats.product_count, 1);
        assert_eq!(stats.summary.sale_count, 3);
        assert_eq!(stats.recent_sales.len(), 3);
        assert!(stats.low_stock.is_empty());
    }
}
