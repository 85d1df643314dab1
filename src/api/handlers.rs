use crate::application::{
    ServiceDependencies, account, catalog, circulation, members, payments, reports, reservations,
    suspension, time_control,
};
use crate::domain::{
    Book, BookDetails, BookId, BorrowId, BorrowingTransaction, DamageId, DamageRecord, Member,
    MemberDetails, MemberId, PenaltyId, Reservation, ReservationId, ReturnId,
    ReturningTransaction, SuspensionPenalty, commands::*,
};
use crate::ports::{BookQuery, ReservationEntry};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    principal::Caller,
    types::{
        AdvanceTimeRequest, BookSearchQuery, BorrowingReportQuery, CollectResponse,
        DamagePreviewQuery, DamageReportQuery, DamageRequest, PaymentRequest, ReturnRequest,
        SetTimeRequest, SweepResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Catalogue
// ============================================================================

/// GET /books - search by title/author text and category
pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookSearchQuery>,
) -> ApiResult<Vec<Book>> {
    let query = BookQuery {
        text: query.q,
        category: query.category,
    };
    Ok(Json(catalog::search_books(&state.service_deps, query).await?))
}

/// GET /categories
pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    Ok(Json(catalog::list_categories(&state.service_deps).await?))
}

/// GET /books/:id
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Book> {
    let book = catalog::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book))
}

/// POST /books
pub async fn add_book(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(details): Json<BookDetails>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = catalog::add_book(&state.service_deps, &principal, details).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /books/:id
pub async fn edit_book(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(book_id): Path<Uuid>,
    Json(details): Json<BookDetails>,
) -> ApiResult<Book> {
    let book = catalog::edit_book(
        &state.service_deps,
        &principal,
        BookId::from_uuid(book_id),
        details,
    )
    .await?;
    Ok(Json(book))
}

/// DELETE /books/:id
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_book(&state.service_deps, &principal, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Members
// ============================================================================

/// GET /members
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<Vec<Member>> {
    Ok(Json(members::list_members(&state.service_deps, &principal).await?))
}

/// POST /members
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(details): Json<MemberDetails>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let member = members::add_member(&state.service_deps, &principal, details).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// GET /members/:id
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Member> {
    let member =
        members::get_member(&state.service_deps, &principal, MemberId::from_uuid(member_id))
            .await?;
    Ok(Json(member))
}

/// PUT /members/:id
pub async fn edit_member(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(member_id): Path<Uuid>,
    Json(details): Json<MemberDetails>,
) -> ApiResult<Member> {
    let member = members::edit_member(
        &state.service_deps,
        &principal,
        MemberId::from_uuid(member_id),
        details,
    )
    .await?;
    Ok(Json(member))
}

/// DELETE /members/:id
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    members::delete_member(&state.service_deps, &principal, MemberId::from_uuid(member_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /members/:id/account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(member_id): Path<Uuid>,
) -> ApiResult<account::AccountSummary> {
    let summary =
        account::account_summary(&state.service_deps, &principal, MemberId::from_uuid(member_id))
            .await?;
    Ok(Json(summary))
}

/// GET /members/:id/reservations
pub async fn list_member_reservations(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Vec<ReservationEntry>> {
    let entries = reservations::list_member_reservations(
        &state.service_deps,
        &principal,
        MemberId::from_uuid(member_id),
    )
    .await?;
    Ok(Json(entries))
}

// ============================================================================
// Circulation
// ============================================================================

/// POST /borrowings - lend a copy over the counter
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(cmd): Json<BorrowBook>,
) -> Result<(StatusCode, Json<BorrowingTransaction>), ApiError> {
    let borrowing = circulation::borrow_book(&state.service_deps, &principal, cmd).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// POST /borrowings/:id/return
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(borrow_id): Path<Uuid>,
    body: Option<Json<ReturnRequest>>,
) -> ApiResult<ReturningTransaction> {
    let return_date = body.and_then(|Json(req)| req.return_date);
    let cmd = ReturnBook {
        borrow_id: BorrowId::from_uuid(borrow_id),
        return_date,
    };
    Ok(Json(
        circulation::return_book(&state.service_deps, &principal, cmd).await?,
    ))
}

/// GET /borrowings/:id/damage/preview?category=...
pub async fn preview_damage(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(borrow_id): Path<Uuid>,
    Query(query): Query<DamagePreviewQuery>,
) -> ApiResult<circulation::DamagePreview> {
    let preview = circulation::preview_damage(
        &state.service_deps,
        &principal,
        BorrowId::from_uuid(borrow_id),
        query.category,
    )
    .await?;
    Ok(Json(preview))
}

/// POST /borrowings/:id/damage
pub async fn report_damage(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(borrow_id): Path<Uuid>,
    Json(req): Json<DamageRequest>,
) -> Result<(StatusCode, Json<DamageRecord>), ApiError> {
    let cmd = ReportDamage {
        borrow_id: BorrowId::from_uuid(borrow_id),
        category: req.category,
        notes: req.notes,
    };
    let record = circulation::report_damage(&state.service_deps, &principal, cmd).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ============================================================================
// Payments
// ============================================================================

/// POST /fines/late/:return_id/pay
pub async fn pay_late_fine(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(return_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<ReturningTransaction> {
    let cmd = PayLateFine {
        return_id: ReturnId::from_uuid(return_id),
        method: req.method,
    };
    Ok(Json(
        payments::pay_late_fine(&state.service_deps, &principal, cmd).await?,
    ))
}

/// POST /fines/damage/:damage_id/pay
pub async fn pay_damage_fine(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(damage_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<DamageRecord> {
    let cmd = PayDamageFine {
        damage_id: DamageId::from_uuid(damage_id),
        method: req.method,
    };
    Ok(Json(
        payments::pay_damage_fine(&state.service_deps, &principal, cmd).await?,
    ))
}

/// POST /penalties/:penalty_id/pay
pub async fn pay_penalty(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(penalty_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<SuspensionPenalty> {
    let cmd = PayPenalty {
        penalty_id: PenaltyId::from_uuid(penalty_id),
        method: req.method,
    };
    Ok(Json(
        payments::pay_penalty(&state.service_deps, &principal, cmd).await?,
    ))
}

// ============================================================================
// Reservations
// ============================================================================

/// POST /reservations
pub async fn reserve_book(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(cmd): Json<ReserveBook>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    let reservation = reservations::reserve_book(&state.service_deps, &principal, cmd).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /reservations - pending pickups
pub async fn list_pending_reservations(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<Vec<ReservationEntry>> {
    Ok(Json(
        reservations::list_pending(&state.service_deps, &principal).await?,
    ))
}

/// GET /reservation-codes/:code
pub async fn find_reservation_by_code(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(code): Path<String>,
) -> ApiResult<Reservation> {
    let reservation = reservations::find_by_code(&state.service_deps, &principal, &code).await?;
    Ok(Json(reservation))
}

/// POST /reservations/:id/collect
pub async fn collect_reservation(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(reservation_id): Path<Uuid>,
) -> ApiResult<CollectResponse> {
    let (reservation, borrowing) = reservations::collect_reservation(
        &state.service_deps,
        &principal,
        ReservationId::from_uuid(reservation_id),
    )
    .await?;
    Ok(Json(CollectResponse {
        reservation,
        borrowing,
    }))
}

/// POST /reservations/:id/cancel
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(reservation_id): Path<Uuid>,
) -> ApiResult<Reservation> {
    let reservation = reservations::cancel_reservation(
        &state.service_deps,
        &principal,
        ReservationId::from_uuid(reservation_id),
    )
    .await?;
    Ok(Json(reservation))
}

// ============================================================================
// Sweeps
// ============================================================================

/// POST /sweeps/reservations
pub async fn run_expiry_sweep(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<SweepResponse> {
    let affected = reservations::trigger_expiry_sweep(&state.service_deps, &principal).await?;
    Ok(Json(SweepResponse { affected }))
}

/// POST /sweeps/suspensions
pub async fn run_suspension_sweep(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<SweepResponse> {
    let affected = suspension::trigger_suspension_sweep(&state.service_deps, &principal).await?;
    Ok(Json(SweepResponse { affected }))
}

// ============================================================================
// Reports
// ============================================================================

/// GET /reports/borrowings?from=&to=&status=
pub async fn borrowing_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Query(query): Query<BorrowingReportQuery>,
) -> ApiResult<reports::BorrowingReport> {
    let report = reports::borrowing_report(
        &state.service_deps,
        &principal,
        query.from,
        query.to,
        query.status,
    )
    .await?;
    Ok(Json(report))
}

/// GET /reports/damages?payment_status=
pub async fn damage_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Query(query): Query<DamageReportQuery>,
) -> ApiResult<reports::DamageReport> {
    let report =
        reports::damage_report(&state.service_deps, &principal, query.payment_status).await?;
    Ok(Json(report))
}

/// GET /reports/suspension-risk
pub async fn suspension_risk(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<Vec<suspension::SuspensionRisk>> {
    Ok(Json(
        suspension::suspension_risk(&state.service_deps, &principal).await?,
    ))
}

// ============================================================================
// Time control
// ============================================================================

/// GET /time
pub async fn time_status(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<time_control::TimeStatus> {
    Ok(Json(time_control::time_status(
        &state.service_deps,
        &principal,
    )?))
}

/// POST /time/set
pub async fn set_time(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(req): Json<SetTimeRequest>,
) -> ApiResult<time_control::TimeStatus> {
    Ok(Json(time_control::set_time(
        &state.service_deps,
        &principal,
        req.at,
    )?))
}

/// POST /time/advance
pub async fn advance_time(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(req): Json<AdvanceTimeRequest>,
) -> ApiResult<time_control::TimeStatus> {
    let by = req
        .duration()
        .ok_or_else(|| ApiError::BadRequest("time step is out of range".to_string()))?;
    Ok(Json(time_control::advance_time(
        &state.service_deps,
        &principal,
        by,
    )?))
}

/// POST /time/reset
pub async fn reset_time(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> ApiResult<time_control::TimeStatus> {
    Ok(Json(time_control::reset_time(
        &state.service_deps,
        &principal,
    )?))
}
