use std::collections::{HashMap, HashSet};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    dto::{TourData, TourListResponse, TourResponse, ToursData, TOP_CHEAP_ALIAS},
    query::{project, ListOptions},
    repo_types::{NewTour, TourPatch},
};
use crate::{
    auth::{
        extractors::CurrentUser,
        roles::{restrict_to, Role},
    },
    error::AppError,
    extract::{JsonBody, PathParam, QueryParams},
    state::AppState,
};

pub fn tour_routes() -> Router<AppState> {
    Router::new()
        .route("/tours", get(list_tours).post(create_tour))
        .route("/tours/top-5-cheap", get(top_cheap_tours))
        .route(
            "/tours/:id",
            get(get_tour).patch(update_tour).delete(delete_tour),
        )
}

/// Roles allowed to change the catalogue.
fn editors() -> HashSet<Role> {
    HashSet::from([Role::Admin, Role::LeadGuide])
}

async fn run_list(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<Json<TourListResponse>, AppError> {
    let opts = ListOptions::from_params(params).map_err(AppError::Validation)?;
    debug!(?opts, "listing tours");
    let tours = state.tours.list(&opts.query).await?;
    let tours = tours
        .iter()
        .map(|t| project(t, opts.fields.as_deref()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(anyhow::Error::from)?;
    Ok(Json(TourListResponse {
        status: "success",
        results: tours.len(),
        data: ToursData { tours },
    }))
}

#[instrument(skip(state, _user))]
pub async fn list_tours(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<Json<TourListResponse>, AppError> {
    run_list(&state, &params).await
}

/// Same listing with the top-5-cheap presets laid over the caller's query.
#[instrument(skip(state, _user))]
pub async fn top_cheap_tours(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<Json<TourListResponse>, AppError> {
    let mut params = params;
    for (key, value) in TOP_CHEAP_ALIAS {
        params.insert(key.to_string(), value.to_string());
    }
    run_list(&state, &params).await
}

#[instrument(skip(state, _user))]
pub async fn get_tour(
    State(state): State<AppState>,
    _user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<TourResponse>, AppError> {
    let tour = state
        .tours
        .get(id)
        .await?
        .ok_or(AppError::NotFound("No tour found with that ID"))?;
    Ok(Json(TourResponse {
        status: "success",
        data: TourData { tour },
    }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id()))]
pub async fn create_tour(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<NewTour>,
) -> Result<(StatusCode, Json<TourResponse>), AppError> {
    restrict_to(&user, &editors())?;
    payload.validate().map_err(AppError::Validation)?;
    let tour = state.tours.create(payload).await?;
    info!(tour_id = %tour.id, "tour created");
    Ok((
        StatusCode::CREATED,
        Json(TourResponse {
            status: "success",
            data: TourData { tour },
        }),
    ))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id()))]
pub async fn update_tour(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<TourPatch>,
) -> Result<Json<TourResponse>, AppError> {
    restrict_to(&user, &editors())?;
    payload.validate().map_err(AppError::Validation)?;
    let tour = state
        .tours
        .update(id, payload)
        .await?
        .ok_or(AppError::NotFound("No tour found with that ID"))?;
    info!(tour_id = %tour.id, "tour updated");
    Ok(Json(TourResponse {
        status: "success",
        data: TourData { tour },
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn delete_tour(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<StatusCode, AppError> {
    restrict_to(&user, &editors())?;
    if !state.tours.delete(id).await? {
        return Err(AppError::NotFound("No tour found with that ID"));
    }
    info!(tour_id = %id, "tour deleted");
    Ok(StatusCode::NO_CONTENT)
}
