use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::allocation::{AllocationCommand, DirectAssignment};
use super::approval::{ApproverRole, RequestStatus, SpaceRequestSubmission};
use super::compliance::{DepartmentOccupancy, PersonOccupancy, RoomOccupancySubmission};
use super::domain::{RequestId, ReturnId, RoomId};
use super::inventory::{Availability, RoomRegistration};
use super::quota::QuotaSource;
use super::repository::HousingStore;
use super::returns::{ReturnStatus, ReturnSubmission};
use super::service::HousingService;
use super::HousingError;

type SharedService<S, Q> = State<Arc<HousingService<S, Q>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveBody {
    pub role: ApproverRole,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectBody {
    pub role: ApproverRole,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchApproveBody {
    pub request_ids: Vec<RequestId>,
    pub role: ApproverRole,
    #[serde(default)]
    pub comment: String,
}

/// Optional `?status=` filter for request and return listings.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusFilter<T> {
    pub status: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityFilter {
    pub availability: Option<Availability>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomFilter {
    pub room_id: Option<String>,
}

/// Router exposing one endpoint per housing command plus read-only views.
pub fn housing_router<S, Q>(service: Arc<HousingService<S, Q>>) -> Router
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    Router::new()
        .route(
            "/api/v1/housing/requests",
            post(submit_request_handler::<S, Q>).get(list_requests_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/requests/batch-approve",
            post(batch_approve_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/requests/:request_id",
            get(request_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/requests/:request_id/approve",
            post(approve_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/requests/:request_id/reject",
            post(reject_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/requests/:request_id/allocate",
            post(allocate_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/requests/:request_id/complete",
            post(move_in_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/rooms",
            post(register_room_handler::<S, Q>).get(list_rooms_handler::<S, Q>),
        )
        .route("/api/v1/housing/rooms/:room_id", get(room_handler::<S, Q>))
        .route(
            "/api/v1/housing/rooms/:room_id/assign",
            post(direct_assign_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/allocations",
            get(allocations_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/returns",
            post(submit_return_handler::<S, Q>).get(list_returns_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/returns/:return_id",
            get(return_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/returns/:return_id/approve",
            post(approve_return_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/returns/:return_id/complete",
            post(complete_return_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/compliance/person",
            post(classify_person_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/compliance/room",
            post(classify_room_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/compliance/department",
            post(classify_department_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/compliance/rooms",
            post(register_occupancy_handler::<S, Q>).get(occupancy_register_handler::<S, Q>),
        )
        .route(
            "/api/v1/housing/quota/rules",
            get(quota_rules_handler::<S, Q>),
        )
        .with_state(service)
}

impl IntoResponse for HousingError {
    fn into_response(self) -> Response {
        let status = match &self {
            HousingError::InvalidStateTransition { .. }
            | HousingError::RoomUnavailable { .. }
            | HousingError::AlreadyCompleted { .. } => StatusCode::CONFLICT,
            HousingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HousingError::NotFound { .. } => StatusCode::NOT_FOUND,
            HousingError::UnauthorizedApprover { .. } => StatusCode::FORBIDDEN,
            HousingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let payload = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, axum::Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, HousingError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_request_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(submission): axum::Json<SpaceRequestSubmission>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::CREATED, service.submit_request(submission))
}

pub(crate) async fn list_requests_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Query(filter): Query<StatusFilter<RequestStatus>>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.list_requests(filter.status))
}

pub(crate) async fn request_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(request_id): Path<String>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.get_request(&RequestId(request_id)))
}

pub(crate) async fn approve_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(request_id): Path<String>,
    axum::Json(body): axum::Json<ApproveBody>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    let id = RequestId(request_id);
    respond(StatusCode::OK, service.approve(&id, body.role, &body.comment))
}

pub(crate) async fn reject_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(request_id): Path<String>,
    axum::Json(body): axum::Json<RejectBody>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    let id = RequestId(request_id);
    respond(StatusCode::OK, service.reject(&id, body.role, &body.reason))
}

pub(crate) async fn batch_approve_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(body): axum::Json<BatchApproveBody>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    let report = service.batch_approve(&body.request_ids, body.role, &body.comment);
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn allocate_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(request_id): Path<String>,
    axum::Json(command): axum::Json<AllocationCommand>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    let id = RequestId(request_id);
    respond(StatusCode::OK, service.allocate(&id, command))
}

pub(crate) async fn move_in_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(request_id): Path<String>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(
        StatusCode::OK,
        service.confirm_move_in(&RequestId(request_id)),
    )
}

pub(crate) async fn register_room_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(registration): axum::Json<RoomRegistration>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::CREATED, service.register_room(registration))
}

pub(crate) async fn list_rooms_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Query(filter): Query<AvailabilityFilter>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.list_rooms(filter.availability))
}

pub(crate) async fn room_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(room_id): Path<String>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.get_room(&RoomId(room_id)))
}

pub(crate) async fn direct_assign_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(room_id): Path<String>,
    axum::Json(assignment): axum::Json<DirectAssignment>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(
        StatusCode::OK,
        service.direct_assign(&RoomId(room_id), assignment),
    )
}

pub(crate) async fn allocations_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Query(filter): Query<RoomFilter>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.allocations(filter.room_id.map(RoomId).as_ref()))
}

pub(crate) async fn submit_return_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(submission): axum::Json<ReturnSubmission>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::CREATED, service.submit_return(submission))
}

pub(crate) async fn list_returns_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Query(filter): Query<StatusFilter<ReturnStatus>>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.list_returns(filter.status))
}

pub(crate) async fn return_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(return_id): Path<String>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.get_return(&ReturnId(return_id)))
}

pub(crate) async fn approve_return_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(return_id): Path<String>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.approve_return(&ReturnId(return_id)))
}

pub(crate) async fn complete_return_handler<S, Q>(
    State(service): SharedService<S, Q>,
    Path(return_id): Path<String>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.complete_return(&ReturnId(return_id)))
}

pub(crate) async fn classify_person_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(occupancy): axum::Json<PersonOccupancy>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.classify_person(&occupancy))
}

pub(crate) async fn classify_room_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(submission): axum::Json<RoomOccupancySubmission>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.classify_room(&submission))
}

pub(crate) async fn classify_department_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(occupancy): axum::Json<DepartmentOccupancy>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.classify_department(&occupancy))
}

pub(crate) async fn register_occupancy_handler<S, Q>(
    State(service): SharedService<S, Q>,
    axum::Json(submission): axum::Json<RoomOccupancySubmission>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.register_room_occupancy(submission))
}

pub(crate) async fn occupancy_register_handler<S, Q>(
    State(service): SharedService<S, Q>,
) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    respond(StatusCode::OK, service.room_occupancy_register())
}

pub(crate) async fn quota_rules_handler<S, Q>(State(service): SharedService<S, Q>) -> Response
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    (StatusCode::OK, axum::Json(service.quota_rules())).into_response()
}
