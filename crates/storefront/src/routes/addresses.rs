//! Address route handlers.
//!
//! All routes require authentication. Ownership is checked on every
//! id-addressed operation: another user's address answers 403, a missing
//! one 404.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use copperleaf_core::AddressId;

use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressPatch, NewAddress};
use crate::state::AppState;

/// GET /addresses - the caller's addresses in creation order.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(addresses))
}

/// POST /addresses - create an address for the caller.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(new): Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = AddressRepository::new(state.pool())
        .create(user.id, &new)
        .await?;

    tracing::info!(
        address_id = %address.id,
        address_type = %address.address_type,
        is_default = address.is_default,
        "address created"
    );
    Ok((StatusCode::CREATED, Json(address)))
}

/// PATCH /addresses/{id} - partial update of the caller's address.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(patch): Json<AddressPatch>,
) -> Result<Json<Address>> {
    let repo = AddressRepository::new(state.pool());
    check_ownership(&repo, id, user.id).await?;

    let address = repo.update(id, &patch).await?;
    Ok(Json(address))
}

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// DELETE /addresses/{id} - delete the caller's address.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<DeleteResponse>> {
    let repo = AddressRepository::new(state.pool());
    check_ownership(&repo, id, user.id).await?;

    repo.delete(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// POST /addresses/{id}/set-default - make the address its type's default.
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    let repo = AddressRepository::new(state.pool());
    check_ownership(&repo, id, user.id).await?;

    let address = repo.set_default(id).await?;
    Ok(Json(address))
}

/// Refuse the operation unless the address exists and belongs to the caller.
async fn check_ownership(
    repo: &AddressRepository<'_>,
    id: AddressId,
    owner: copperleaf_core::UserId,
) -> Result<()> {
    let address = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("address {id}")))?;
    if address.user_id != owner {
        return Err(AppError::Forbidden(
            "address belongs to another account".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_response_shape() {
        let json = serde_json::to_value(DeleteResponse { success: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }
}
