use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;

use super::{ok, AppState};
use crate::clinic::report::{build_surgical_report, SurgicalReport};
use crate::database::{inventory, restock};
use crate::error::ClinicResult;

pub async fn surgical_report(state: &AppState) -> ClinicResult<SurgicalReport> {
    let items = inventory::list_items(&state.pool, None, false).await?;
    let disposals = inventory::list_disposals(&state.pool, None).await?;
    let open = restock::count_open_restock_orders(&state.pool).await?;
    Ok(build_surgical_report(&items, &disposals, open, Utc::now()))
}

pub async fn handle_surgical_report(State(state): State<AppState>) -> ClinicResult<impl IntoResponse> {
    Ok(ok(surgical_report(&state).await?))
}
