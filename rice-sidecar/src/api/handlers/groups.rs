use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{GenericResponse, GroupListQuery, TestStep, TestStepGroup};

use super::super::state::AppState;

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupListQuery>,
) -> Result<Json<Vec<TestStepGroup>>> {
    Ok(Json(state.repository.list_groups(query.user_id)?))
}

pub async fn get_group_steps(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<TestStep>>> {
    Ok(Json(state.repository.steps_for_group(group_id)?))
}

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
) -> Result<Json<GenericResponse>> {
    state.repository.delete_group(group_id)?;
    tracing::info!("Deleted step group {}", group_id);
    Ok(Json(GenericResponse {
        status: "deleted".to_string(),
    }))
}
