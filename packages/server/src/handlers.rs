//! HTTP handler functions for the road hazard API.

use actix_web::{HttpResponse, web};
use road_hazard_analytics::{filter_by_proximity, status_text};
use road_hazard_models::{GeoPoint, HazardId, NewHazard};
use road_hazard_prediction::NearestElevation;
use road_hazard_server_models::{
    AnalyzeRouteRequest, ApiCreated, ApiError, ApiHazardsAhead, ApiHealth, ApiNearby, ApiPrompt,
    ApiSkipped, ApiStoreStatus, ConfirmDetectionRequest, CreateHazardRequest, FilterParams,
    NearbyQueryParams, PromptQueryParams, RouteQueryRequest, UserRequest, VoteRequest,
};
use road_hazard_store::{HazardStore as _, StoreError};
use road_hazard_verification::VerificationError;

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.active_name().await.to_string(),
        primary_store: state.store.is_primary().await,
    })
}

/// `GET /api/hazards`
///
/// Lists stored hazards passing the type/severity/verification filters.
pub async fn list_hazards(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let filters = params.filters();
    match state.store.list().await {
        Ok(hazards) => {
            let hazards: Vec<_> = hazards.into_iter().filter(|h| filters.matches(h)).collect();
            HttpResponse::Ok().json(hazards)
        }
        Err(e) => store_failure("list hazards", &e),
    }
}

/// `GET /api/hazards/{id}`
pub async fn get_hazard(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = HazardId::new(path.into_inner());
    match state.store.read(&id).await {
        Ok(Some(hazard)) => HttpResponse::Ok().json(hazard),
        Ok(None) => HttpResponse::NotFound().json(ApiError::new(format!("Hazard not found: {id}"))),
        Err(e) => store_failure("read hazard", &e),
    }
}

/// `POST /api/hazards`
///
/// Stores a manual report.
pub async fn create_hazard(
    state: web::Data<AppState>,
    body: web::Json<CreateHazardRequest>,
) -> HttpResponse {
    if let Some(rejected) = reject_location(body.location) {
        return rejected;
    }
    let new = NewHazard::manual(body.hazard_type, body.severity, body.location);
    create(&state, new).await
}

/// `POST /api/hazards/detections`
///
/// Stores a detection the traveler confirmed, located where they were.
pub async fn confirm_detection(
    state: web::Data<AppState>,
    body: web::Json<ConfirmDetectionRequest>,
) -> HttpResponse {
    if let Some(rejected) = reject_location(body.location) {
        return rejected;
    }
    let new = NewHazard::from_detection(&body.detection, body.location);
    create(&state, new).await
}

async fn create(state: &AppState, new: NewHazard) -> HttpResponse {
    let source = new.source;
    match state.store.create(new).await {
        Ok(id) => {
            log::info!("Stored {source} report {id}");
            HttpResponse::Created().json(ApiCreated { id: id.to_string() })
        }
        Err(e) => store_failure("create hazard", &e),
    }
}

/// `GET /api/hazards/nearby`
///
/// Hazards around a position, nearest first, plus the status line.
pub async fn nearby(
    state: web::Data<AppState>,
    params: web::Query<NearbyQueryParams>,
) -> HttpResponse {
    let radius = params.radius.unwrap_or(state.navigation.warning_distance_m);
    match state.store.list().await {
        Ok(hazards) => {
            let hazards =
                filter_by_proximity(&hazards, Some(params.origin()), radius, &params.filters());
            HttpResponse::Ok().json(ApiNearby {
                status: status_text(&hazards),
                hazards,
            })
        }
        Err(e) => store_failure("list hazards", &e),
    }
}

/// `POST /api/route/ahead`
pub async fn route_ahead(
    state: web::Data<AppState>,
    body: web::Json<RouteQueryRequest>,
) -> HttpResponse {
    let look_ahead = body.look_ahead.unwrap_or(state.navigation.look_ahead_m);
    let filters = body.filters.clone().unwrap_or_default();
    match state.store.list().await {
        Ok(hazards) => HttpResponse::Ok().json(ApiHazardsAhead {
            hazards: state.matcher.hazards_ahead_on_route(
                &hazards,
                &body.path,
                body.location,
                look_ahead,
                &filters,
            ),
        }),
        Err(e) => store_failure("list hazards", &e),
    }
}

/// `POST /api/route/summary`
pub async fn route_summary(
    state: web::Data<AppState>,
    body: web::Json<RouteQueryRequest>,
) -> HttpResponse {
    let filters = body.filters.clone().unwrap_or_default();
    match state.store.list().await {
        Ok(hazards) => {
            HttpResponse::Ok().json(state.matcher.route_summary(&hazards, &body.path, &filters))
        }
        Err(e) => store_failure("list hazards", &e),
    }
}

/// `POST /api/route/segment`
///
/// Responds with `null` when the position or route is missing.
pub async fn route_segment(
    state: web::Data<AppState>,
    body: web::Json<RouteQueryRequest>,
) -> HttpResponse {
    let filters = body.filters.clone().unwrap_or_default();
    match state.store.list().await {
        Ok(hazards) => HttpResponse::Ok().json(state.matcher.segment_status(
            body.location,
            &body.path,
            &hazards,
            &filters,
        )),
        Err(e) => store_failure("list hazards", &e),
    }
}

/// `POST /api/route/analyze`
///
/// Predicts hazards along a route. Elevation points are looked up in the
/// supplied profile; if it is missing the result still carries the speed
/// profile candidates and names the elevation failure.
pub async fn analyze_route(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRouteRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let existing = match state.store.list().await {
        Ok(hazards) => hazards,
        Err(e) => {
            log::warn!("Analysing route without existing reports: {e}");
            Vec::new()
        }
    };
    let elevation = NearestElevation::new(body.elevations);
    let analysis = state
        .prediction
        .analyze_route(&body.route, &elevation, &existing)
        .await;
    HttpResponse::Ok().json(analysis)
}

/// `POST /api/hazards/{id}/votes`
pub async fn vote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<VoteRequest>,
) -> HttpResponse {
    let id = HazardId::new(path.into_inner());
    match state
        .verification
        .submit_vote(&id, &body.user_id, body.vote)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => verification_failure(&e),
    }
}

/// `POST /api/hazards/{id}/removal`
pub async fn request_removal(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UserRequest>,
) -> HttpResponse {
    let id = HazardId::new(path.into_inner());
    match state.verification.request_removal(&id, &body.user_id).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => verification_failure(&e),
    }
}

/// `GET /api/hazards/{id}/stats`
pub async fn stats(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = HazardId::new(path.into_inner());
    match state.verification.stats(&id).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => verification_failure(&e),
    }
}

/// `GET /api/prompt`
///
/// The hazard the traveler should be asked to vote on, if any.
pub async fn prompt(
    state: web::Data<AppState>,
    params: web::Query<PromptQueryParams>,
) -> HttpResponse {
    let origin = GeoPoint::new(params.lat, params.lng);
    match state.verification.next_prompt(&params.user_id, origin).await {
        Ok(hazard) => HttpResponse::Ok().json(ApiPrompt { hazard }),
        Err(e) => verification_failure(&e),
    }
}

/// `POST /api/prompt/skip`
pub async fn skip_prompt(
    state: web::Data<AppState>,
    body: web::Json<UserRequest>,
) -> HttpResponse {
    let skipped = state.verification.skip_prompt(&body.user_id);
    HttpResponse::Ok().json(ApiSkipped {
        skipped: skipped.map(|id| id.to_string()),
    })
}

/// `POST /api/store/retry`
///
/// Re-probes the primary store and switches back to it when healthy.
pub async fn retry_store(state: web::Data<AppState>) -> HttpResponse {
    match state.store.retry_primary().await {
        Ok(primary_store) => HttpResponse::Ok().json(ApiStoreStatus {
            store: state.store.active_name().await.to_string(),
            primary_store,
        }),
        Err(e) => {
            log::warn!("Primary store still unavailable: {e}");
            HttpResponse::ServiceUnavailable().json(ApiError::new(e.to_string()))
        }
    }
}

fn reject_location(location: GeoPoint) -> Option<HttpResponse> {
    GeoPoint::try_new(location.lat, location.lng)
        .err()
        .map(|e| HttpResponse::BadRequest().json(ApiError::new(e.to_string())))
}

fn store_failure(action: &str, e: &StoreError) -> HttpResponse {
    log::error!("Failed to {action}: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to {action}")))
}

fn verification_failure(e: &VerificationError) -> HttpResponse {
    let body = ApiError::new(e.to_string());
    match e {
        VerificationError::AlreadyVoted { .. }
        | VerificationError::AlreadyRequested { .. }
        | VerificationError::AlreadyVerified { .. } => HttpResponse::Conflict().json(body),
        VerificationError::NotFound { .. } | VerificationError::Store(StoreError::NotFound { .. }) => {
            HttpResponse::NotFound().json(body)
        }
        VerificationError::Store(store) => {
            log::error!("Verification store failure: {store}");
            HttpResponse::InternalServerError().json(body)
        }
    }
}
