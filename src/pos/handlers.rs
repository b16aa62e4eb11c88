use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    paytypes::repo_types::Paytype,
    products::repo_types::Product,
    state::AppState,
    transactions::dto::TransactionView,
    users::{dto::UserResponse, handlers::load_users},
};

/// Everything the till screen needs in one round trip.
#[derive(Debug, Serialize)]
pub struct PosData {
    pub users: Vec<UserResponse>,
    pub transactions: Vec<TransactionView>,
    pub products: Vec<Product>,
    pub paytypes: Vec<Paytype>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/posdata", get(pos_data))
}

#[instrument(skip(state))]
pub async fn pos_data(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<PosData>, AppError> {
    let (users, transactions, products, paytypes) = tokio::try_join!(
        load_users(&state),
        state.transactions.get_all(),
        async { Ok::<_, AppError>(state.products.list().await?) },
        async { Ok::<_, AppError>(state.paytypes.list().await?) },
    )?;
    Ok(Json(PosData {
        users,
        transactions,
        products,
        paytypes,
    }))
}
