//! # Sale Commands
//!
//! Completing, previewing and looking up sales. Completion is handed to
//! the sale coordinator untouched; nothing here pre-validates the basket.

use tally_core::{BasketLine, DiscountRate, PricedBasket, Sale, SaleId};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn complete_sale(
    state: &AppState,
    lines: &[BasketLine],
    discount: DiscountRate,
) -> Result<Sale, ApiError> {
    Ok(state.db.checkout().complete_sale(lines, discount).await?)
}

pub async fn preview_sale(
    state: &AppState,
    lines: &[BasketLine],
    discount: DiscountRate,
) -> Result<PricedBasket, ApiError> {
    Ok(state.db.checkout().preview(lines, discount).await?)
}

/// Newest first. `None` lists every sale.
pub async fn list_sales(state: &AppState, limit: Option<usize>) -> Result<Vec<Sale>, ApiError> {
    Ok(state
        .db
        .sales()
        .list_recent(limit.unwrap_or(usize::MAX))
        .await?)
}

pub async fn get_sale(state: &AppState, id: SaleId) -> Result<Sale, ApiError> {
    state
        .db
        .sales()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::product::add_product;
    use crate::config::AppConfig;
    use crate::error::ErrorCode;
    use tally_core::NewProduct;

    async fn state_with_stock(stock: i64) -> (AppState, i64) {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let product = add_product(
            &state,
            NewProduct {
                name: "Notebook".to_string(),
                description: String::new(),
                wholesale_price: 100.0,
                selling_price: 150.0,
                stock,
                category: "Stationery".to_string(),
            },
        )
        .await
        .unwrap();
        (state, product.id)
    }

    #[tokio::test]
    async fn test_complete_and_show() {
        let (state, id) = state_with_stock(10).await;

        let sale = complete_sale(&state, &[BasketLine::new(id, 4)], DiscountRate::from_percentage(10.0))
            .await
            .unwrap();
        assert_eq!(sale.final_amount, 540.0);

        assert_eq!(get_sale(&state, sale.id).await.unwrap(), sale);
        assert_eq!(list_sales(&state, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_code() {
        let (state, id) = state_with_stock(3).await;

        let err = complete_sale(&state, &[BasketLine::new(id, 4)], DiscountRate::zero())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[tokio::test]
    async fn test_unknown_sale() {
        let (state, _) = state_with_stock(3).await;
        let err = get_sale(&state, 77).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
