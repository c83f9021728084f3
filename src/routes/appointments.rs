use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{user_validator, AuthUser},
    availability::{self, BookingRequest},
    db::{fetch_appointment, log_activity, APPOINTMENT_SELECT},
    error::{ApiError, ApiResult},
    models::{AppointmentRow, AppointmentStatus, AppointmentView},
    routes::{non_blank, parse_date, parse_time},
    slots::Interval,
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppointmentPayload {
    service_id: String,
    date: String,
    start_time: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictQuery {
    date: String,
    start_time: String,
    duration: u16,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/appointments/available-slots/{date}")
            .route(web::get().to(available_slots)),
    )
    .service(web::resource("/appointments/check-conflict").route(web::get().to(check_conflict)))
    .service(
        web::resource("/appointments")
            .wrap(HttpAuthentication::bearer(user_validator))
            .route(web::get().to(my_appointments))
            .route(web::post().to(create_appointment)),
    )
    .service(
        web::resource("/appointments/{id}")
            .wrap(HttpAuthentication::bearer(user_validator))
            .route(web::get().to(appointment_detail)),
    )
    .service(
        web::resource("/appointments/{id}/cancel")
            .wrap(HttpAuthentication::bearer(user_validator))
            .route(web::patch().to(cancel_appointment)),
    );
}

async fn available_slots(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let date = parse_date(&path.into_inner())?;
    let slots = availability::compute_available_slots(&state.db, date).await?;
    Ok(HttpResponse::Ok().json(json!({ "availableSlots": slots })))
}

async fn check_conflict(
    state: web::Data<AppState>,
    query: web::Query<ConflictQuery>,
) -> ApiResult<HttpResponse> {
    let date = parse_date(&query.date)?;
    let start = parse_time(&query.start_time)?;
    if query.duration == 0 {
        return Err(ApiError::validation("Duration must be positive"));
    }
    let interval = Interval::with_duration(start, query.duration)?;
    let conflict = availability::check_conflict(&state.db, date, start, query.duration).await?;
    Ok(HttpResponse::Ok().json(json!({
        "conflict": conflict,
        "startTime": interval.start,
        "endTime": interval.end,
    })))
}

async fn create_appointment(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<CreateAppointmentPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    if payload.service_id.trim().is_empty() {
        return Err(ApiError::validation("Please select a service."));
    }
    let request = BookingRequest {
        user_id: auth.id.clone(),
        service_id: payload.service_id.trim().to_string(),
        date: parse_date(&payload.date)?,
        start_time: parse_time(&payload.start_time)?,
        notes: non_blank(payload.notes),
    };

    let row = availability::book(&state.db, request).await?;

    log_activity(
        &state.db,
        "appointment_created",
        &format!(
            "{} booked {} on {} at {}.",
            auth.name,
            row.service_name.as_deref().unwrap_or("a service"),
            row.date,
            row.start_time
        ),
        Some(&auth.id),
        Some(&row.id),
    )
    .await;
    state.publish("appointment_created", row.clone());

    Ok(HttpResponse::Created().json(AppointmentView::from(row)))
}

async fn my_appointments(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> ApiResult<HttpResponse> {
    let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
        "{APPOINTMENT_SELECT} WHERE a.user_id = ? ORDER BY a.date DESC, a.start_time DESC"
    ))
    .bind(&auth.id)
    .fetch_all(&state.db)
    .await?;

    let appointments: Vec<AppointmentView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(appointments))
}

async fn appointment_detail(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let row = visible_appointment(&state, &auth, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AppointmentView::from(row)))
}

async fn cancel_appointment(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let row = visible_appointment(&state, &auth, &path.into_inner()).await?;
    let row = change_status(&state, &auth, row, AppointmentStatus::Cancelled).await?;
    Ok(HttpResponse::Ok().json(AppointmentView::from(row)))
}

/// Loads an appointment the caller may see: their own, or any for admins.
async fn visible_appointment(
    state: &AppState,
    auth: &AuthUser,
    appointment_id: &str,
) -> ApiResult<AppointmentRow> {
    let row = fetch_appointment(&state.db, appointment_id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    if row.user_id != auth.id && !auth.is_admin() {
        return Err(ApiError::NotFound("Appointment"));
    }
    Ok(row)
}

/// Moves `row` to `next` if the lifecycle allows it. The update only applies
/// while the stored status still matches what was read, so concurrent
/// transitions cannot both win.
pub(crate) async fn change_status(
    state: &AppState,
    auth: &AuthUser,
    row: AppointmentRow,
    next: AppointmentStatus,
) -> ApiResult<AppointmentRow> {
    let current = row
        .status()
        .ok_or_else(|| ApiError::Internal(format!("unknown stored status '{}'", row.status)))?;
    if !current.can_become(next) {
        return Err(ApiError::Validation(format!(
            "Cannot change a {current} appointment to {next}"
        )));
    }

    let updated = sqlx::query(
        "UPDATE appointments SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(next.as_str())
    .bind(Utc::now().to_rfc3339())
    .bind(&row.id)
    .bind(current.as_str())
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::validation(
            "Appointment was changed by someone else, please reload",
        ));
    }

    log_activity(
        &state.db,
        "appointment_status",
        &format!("{} changed appointment {} to {}.", auth.name, row.id, next),
        Some(&auth.id),
        Some(&row.id),
    )
    .await;

    let row = fetch_appointment(&state.db, &row.id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    state.publish("appointment_updated", row.clone());
    Ok(row)
}
