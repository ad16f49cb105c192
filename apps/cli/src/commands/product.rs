//! # Product Commands
//!
//! Catalog maintenance: create, edit (including stock counts), delete,
//! list and search.

use tally_core::{NewProduct, Product, ProductId, ProductPatch};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Creates a product and returns it as stored.
pub async fn add_product(state: &AppState, product: NewProduct) -> Result<Product, ApiError> {
    let repo = state.db.products();
    let id = repo.create(&product).await?;
    info!(id, name = %product.name.trim(), "Product added");
    Ok(repo.get_required(id).await?)
}

/// Applies a partial edit and returns the updated product.
///
/// Setting `stock` here is how restocks and stock counts are recorded.
pub async fn edit_product(
    state: &AppState,
    id: ProductId,
    patch: ProductPatch,
) -> Result<Product, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::validation("Nothing to change"));
    }

    let repo = state.db.products();
    repo.update(id, &patch).await?;
    info!(id, "Product edited");
    Ok(repo.get_required(id).await?)
}

pub async fn delete_product(state: &AppState, id: ProductId) -> Result<(), ApiError> {
    state.db.products().delete(id).await?;
    info!(id, "Product deleted");
    Ok(())
}

pub async fn get_product(state: &AppState, id: ProductId) -> Result<Product, ApiError> {
    Ok(state.db.products().get_required(id).await?)
}

pub async fn list_products(state: &AppState) -> Result<Vec<Product>, ApiError> {
    Ok(state.db.products().list().await?)
}

pub async fn search_products(state: &AppState, term: &str) -> Result<Vec<Product>, ApiError> {
    Ok(state.db.products().search(term).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ErrorCode;

    fn notebook() -> NewProduct {
        NewProduct {
            name: "Notebook A5".to_string(),
            description: String::new(),
            wholesale_price: 100.0,
            selling_price: 150.0,
            stock: 10,
            category: "Stationery".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_edit_delete() {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();

        let product = add_product(&state, notebook()).await.unwrap();
        assert_eq!(product.stock, 10);

        let restocked = edit_product(
            &state,
            product.id,
            ProductPatch {
                stock: Some(40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(restocked.stock, 40);

        delete_product(&state, product.id).await.unwrap();
        let err = get_product(&state, product.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_empty_edit_is_rejected() {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let product = add_product(&state, notebook()).await.unwrap();

        let err = edit_product(&state, product.id, ProductPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected() {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let mut product = notebook();
        product.name = "  ".to_string();

        let err = add_product(&state, product).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(list_products(&state).await.unwrap().is_empty());
    }
}
