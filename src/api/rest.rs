use crate::capture::GeoPoint;
use crate::config::ApiConfig;
use crate::db::models::{
    Alert, AlertStatus, AlertType, Checkin, Incident, IncidentStatus, Schedule, ScheduleStatus,
    Shift,
};
use crate::db::DatabaseService;
use crate::error::Error;
use crate::messaging::NotificationBus;
use crate::security::{Actor, Role};
use crate::services::{
    AlertLedger, AlertSubmission, CheckinRequest, CreatedAlert, IncidentLog, NewIncident,
    NewSchedule, PatrolLedger, StatsEngine, StatsWindow,
};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<AlertLedger>,
    pub patrol: Arc<PatrolLedger>,
    pub incidents: Arc<IncidentLog>,
    pub stats: Arc<StatsEngine>,
    pub bus: Arc<NotificationBus>,
    pub database: Arc<DatabaseService>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            Error::Authorization(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::FORBIDDEN.as_u16(),
            },
            Error::NotFound(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            },
            Error::InvalidTransition(_) | Error::AlreadyCheckedIn(_) | Error::AlreadyClosed(_) => {
                ApiError {
                    message: err.to_string(),
                    status: StatusCode::CONFLICT.as_u16(),
                }
            }
            Error::Config(_) => ApiError {
                message: err.to_string(),
                status: StatusCode::BAD_REQUEST.as_u16(),
            },
            _ => ApiError {
                message: err.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            },
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return err.clone().into();
        }

        ApiError {
            message: err.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

pub struct RestApi {
    config: ApiConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(config: &ApiConfig, state: AppState) -> Self {
        Self {
            config: config.clone(),
            state,
        }
    }

    pub fn router(&self) -> Router {
        // CORS layer allowing the portal frontend from any origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600));

        Router::new()
            // Alert routes
            .route("/api/alerts", post(create_alert).get(list_alerts))
            .route("/api/alerts/:id/respond", post(respond_alert))
            .route("/api/alerts/:id/resolve", post(resolve_alert))
            .route("/api/alerts/:id/false-alarm", post(false_alarm_alert))
            // Patrol routes
            .route("/api/schedules", post(create_schedule).get(list_schedules))
            .route("/api/checkins", post(checkin))
            .route("/api/checkins/:id/checkout", post(checkout))
            .route("/api/checkins/active", get(active_checkin))
            // Incident routes
            .route("/api/incidents", post(create_incident).get(list_incidents))
            .route("/api/incidents/:id/review", post(review_incident))
            // Stats and monitoring
            .route("/api/stats", get(security_stats))
            .route("/api/health", get(health))
            // Dashboard live feed
            .route("/api/ws/alerts", get(super::ws::alerts_subscribe))
            .with_state(self.state.clone())
            .layer(cors)
    }

    pub async fn run(&self) -> Result<()> {
        let app = self.router();

        let addr = self.config.address.clone() + ":" + &self.config.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        info!("API server listening on {}", addr);

        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub reporter_id: Uuid,
    pub reporter_block: String,
    pub alert_type: AlertType,
    pub description: Option<String>,
    pub location: Option<GeoPoint>,
    pub photo_url: Option<String>,
}

/// Pre-authenticated actor identity, attached by the caller's session layer
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor_id: Uuid,
    pub actor_role: Role,
}

impl From<&ActorRequest> for Actor {
    fn from(request: &ActorRequest) -> Self {
        Actor::new(request.actor_id, request.actor_role)
    }
}

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    pub status: Option<AlertStatus>,
    pub limit: Option<i64>,
}

async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> ApiResult<(StatusCode, Json<CreatedAlert>)> {
    let created = state
        .alerts
        .create_alert(AlertSubmission {
            reporter_id: request.reporter_id,
            reporter_block: request.reporter_block,
            alert_type: request.alert_type,
            description: request.description,
            location: request.location,
            photo: None,
            photo_url: request.photo_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
) -> ApiResult<Json<Vec<Alert>>> {
    let alerts = state.alerts.list(query.status, query.limit).await?;
    Ok(Json(alerts))
}

async fn respond_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<Json<Alert>> {
    let alert = state.alerts.respond(&id, &Actor::from(&request)).await?;
    Ok(Json(alert))
}

async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<Json<Alert>> {
    let alert = state.alerts.resolve(&id, &Actor::from(&request)).await?;
    Ok(Json(alert))
}

async fn false_alarm_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<Json<Alert>> {
    let alert = state
        .alerts
        .mark_false_alarm(&id, &Actor::from(&request))
        .await?;
    Ok(Json(alert))
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub actor_id: Uuid,
    pub actor_role: Role,
    pub schedule_date: NaiveDate,
    pub shift: Shift,
    pub assigned_blocks: Vec<String>,
    pub notes: Option<String>,
}

/// Schedule with its derived status attached
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub status: ScheduleStatus,
}

impl From<Schedule> for ScheduleResponse {
    fn from(schedule: Schedule) -> Self {
        let status = schedule.status_now();
        Self { schedule, status }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleListQuery {
    pub date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> ApiResult<(StatusCode, Json<ScheduleResponse>)> {
    let actor = Actor::new(request.actor_id, request.actor_role);
    let schedule = state
        .patrol
        .create_schedule(
            &actor,
            NewSchedule {
                schedule_date: request.schedule_date,
                shift: request.shift,
                assigned_blocks: request.assigned_blocks,
                notes: request.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(schedule.into())))
}

async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ScheduleListQuery>,
) -> ApiResult<Json<Vec<ScheduleResponse>>> {
    let schedules = state.patrol.list_schedules(query.date, query.limit).await?;
    Ok(Json(schedules.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CheckinBody {
    pub schedule_id: Uuid,
    pub guard_id: Uuid,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveCheckinQuery {
    pub guard_id: Uuid,
}

async fn checkin(
    State(state): State<AppState>,
    Json(request): Json<CheckinBody>,
) -> ApiResult<(StatusCode, Json<Checkin>)> {
    let checkin = state
        .patrol
        .checkin(CheckinRequest {
            schedule_id: request.schedule_id,
            guard_id: request.guard_id,
            location: request.location,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(checkin)))
}

async fn checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Checkin>> {
    let checkin = state.patrol.checkout(&id).await?;
    Ok(Json(checkin))
}

async fn active_checkin(
    State(state): State<AppState>,
    Query(query): Query<ActiveCheckinQuery>,
) -> ApiResult<Json<Checkin>> {
    let checkin = state
        .patrol
        .get_active_checkin(&query.guard_id)
        .await?
        .ok_or_else(|| {
            ApiError::from(Error::NotFound(format!(
                "No active checkin for guard {}",
                query.guard_id
            )))
        })?;

    Ok(Json(checkin))
}

#[derive(Debug, Deserialize)]
pub struct CreateIncidentRequest {
    pub reporter_id: Uuid,
    pub reporter_block: String,
    pub incident_type: String,
    pub title: String,
    pub description: String,
    pub location: Option<GeoPoint>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncidentListQuery {
    pub status: Option<IncidentStatus>,
    pub limit: Option<i64>,
}

async fn create_incident(
    State(state): State<AppState>,
    Json(request): Json<CreateIncidentRequest>,
) -> ApiResult<(StatusCode, Json<Incident>)> {
    let incident = state
        .incidents
        .report_incident(NewIncident {
            reporter_id: request.reporter_id,
            reporter_block: request.reporter_block,
            incident_type: request.incident_type,
            title: request.title,
            description: request.description,
            location: request.location,
            photo_url: request.photo_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(incident)))
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentListQuery>,
) -> ApiResult<Json<Vec<Incident>>> {
    let incidents = state.incidents.list(query.status, query.limit).await?;
    Ok(Json(incidents))
}

async fn review_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<Json<Incident>> {
    let incident = state
        .incidents
        .review_incident(&id, &Actor::from(&request))
        .await?;
    Ok(Json(incident))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

async fn security_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<crate::services::SecurityStats>> {
    let window = match (query.year, query.month) {
        (Some(year), Some(month)) => StatsWindow::month(year, month).map_err(ApiError::from)?,
        _ => StatsWindow::current_month(),
    };

    let stats = state.stats.security_stats(&window).await?;
    Ok(Json(stats))
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let database_ok = state.database.health_check().await?;
    Ok(Json(serde_json::json!({
        "database": database_ok,
        "subscribers": state.bus.subscriber_count(),
    })))
}
