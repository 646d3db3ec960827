use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::checkout::CheckoutStatus;
use super::domain::{
    ApplicantId, ApplicantRegistration, ApplicantUpdate, DeviceId, IntakeOutcome, LoanId,
    LoanRequest, RiskGroupId,
};
use super::repository::{RepositoryError, UnderwritingStore};
use super::service::{UnderwritingError, UnderwritingService};

type SharedService<S> = Arc<UnderwritingService<S>>;

/// Router builder exposing the underwriting use cases over HTTP.
pub fn underwriting_router<S>(service: SharedService<S>) -> Router
where
    S: UnderwritingStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/applicants",
            post(register_handler::<S>).get(list_applicants_handler::<S>),
        )
        .route(
            "/api/v1/applicants/:applicant_id",
            get(get_applicant_handler::<S>).patch(update_applicant_handler::<S>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/loans",
            get(applicant_loans_handler::<S>),
        )
        .route("/api/v1/devices", get(list_devices_handler::<S>))
        .route("/api/v1/devices/:device_id", get(get_device_handler::<S>))
        .route(
            "/api/v1/devices/:device_id/pricing",
            get(price_device_handler::<S>),
        )
        .route("/api/v1/risk-groups", get(list_risk_groups_handler::<S>))
        .route(
            "/api/v1/risk-groups/:risk_group_id",
            get(get_risk_group_handler::<S>),
        )
        .route("/api/v1/loans", post(create_loan_handler::<S>))
        .route("/api/v1/loans/:loan_id", get(get_loan_handler::<S>))
        .route(
            "/api/v1/loans/:loan_id/checkout",
            put(advance_checkout_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceFilter {
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
    #[serde(default)]
    pub risk_group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PricingQuery {
    pub risk_group_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutUpdate {
    pub status: CheckoutStatus,
}

pub(crate) async fn register_handler<S>(
    State(service): State<SharedService<S>>,
    Json(registration): Json<ApplicantRegistration>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    let today = Local::now().date_naive();
    match service.register_applicant(registration, today) {
        Ok(outcome) => outcome_response(outcome, "applicant", StatusCode::OK),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_applicants_handler<S>(
    State(service): State<SharedService<S>>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.list_applicants())
}

pub(crate) async fn get_applicant_handler<S>(
    State(service): State<SharedService<S>>,
    Path(applicant_id): Path<Uuid>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.get_applicant(ApplicantId(applicant_id)))
}

pub(crate) async fn update_applicant_handler<S>(
    State(service): State<SharedService<S>>,
    Path(applicant_id): Path<Uuid>,
    Json(update): Json<ApplicantUpdate>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    match service.update_applicant(ApplicantId(applicant_id), update) {
        Ok(outcome) => outcome_response(outcome, "applicant", StatusCode::OK),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn applicant_loans_handler<S>(
    State(service): State<SharedService<S>>,
    Path(applicant_id): Path<Uuid>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.loans_for_applicant(ApplicantId(applicant_id)))
}

pub(crate) async fn list_devices_handler<S>(
    State(service): State<SharedService<S>>,
    Query(filter): Query<DeviceFilter>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(
        service
            .list_affordable_devices(filter.monthly_income, filter.risk_group_id.map(RiskGroupId)),
    )
}

pub(crate) async fn get_device_handler<S>(
    State(service): State<SharedService<S>>,
    Path(device_id): Path<Uuid>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.get_device(DeviceId(device_id)))
}

pub(crate) async fn price_device_handler<S>(
    State(service): State<SharedService<S>>,
    Path(device_id): Path<Uuid>,
    Query(query): Query<PricingQuery>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.price_device(DeviceId(device_id), RiskGroupId(query.risk_group_id)))
}

pub(crate) async fn list_risk_groups_handler<S>(
    State(service): State<SharedService<S>>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.list_risk_groups())
}

pub(crate) async fn get_risk_group_handler<S>(
    State(service): State<SharedService<S>>,
    Path(risk_group_id): Path<Uuid>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.get_risk_group(RiskGroupId(risk_group_id)))
}

pub(crate) async fn create_loan_handler<S>(
    State(service): State<SharedService<S>>,
    Json(request): Json<LoanRequest>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    match service.create_loan(request) {
        Ok(outcome) => outcome_response(outcome, "loan", StatusCode::CREATED),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_loan_handler<S>(
    State(service): State<SharedService<S>>,
    Path(loan_id): Path<Uuid>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.get_loan(LoanId(loan_id)))
}

pub(crate) async fn advance_checkout_handler<S>(
    State(service): State<SharedService<S>>,
    Path(loan_id): Path<Uuid>,
    Json(update): Json<CheckoutUpdate>,
) -> Response
where
    S: UnderwritingStore + 'static,
{
    respond(service.advance_checkout(LoanId(loan_id), update.status))
}

fn respond<T: Serialize>(result: Result<T, UnderwritingError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(err),
    }
}

/// `{success, <field>, errors}` envelope; rejected batches answer 422.
fn outcome_response<T: Serialize>(
    outcome: IntakeOutcome<T>,
    field: &str,
    accepted_status: StatusCode,
) -> Response {
    match outcome {
        IntakeOutcome::Accepted(value) => {
            let payload = json!({
                "success": true,
                field: value,
                "errors": Vec::<String>::new(),
            });
            (accepted_status, Json(payload)).into_response()
        }
        IntakeOutcome::Rejected(errors) => {
            let payload = json!({
                "success": false,
                field: serde_json::Value::Null,
                "errors": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
    }
}

pub(crate) fn error_response(err: UnderwritingError) -> Response {
    let status = match &err {
        UnderwritingError::NotFound { .. } => StatusCode::NOT_FOUND,
        UnderwritingError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        UnderwritingError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        UnderwritingError::Configuration { .. }
        | UnderwritingError::Pricing(_)
        | UnderwritingError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &err {
        UnderwritingError::NotFound { entity, id } => json!({
            "error": err.to_string(),
            "entity": entity.label(),
            "id": id,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, Json(payload)).into_response()
}
