use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{new_id, AuthUser},
    db::log_activity,
    error::{ApiError, ApiResult},
    models::{UnavailabilityRow, UnavailabilityView},
    routes::parse_date,
    slots::{Interval, TimeOfDay},
    state::AppState,
};

const UNAVAILABILITY_SELECT: &str =
    "SELECT id, date, start_time, end_time, reason, is_active FROM unavailabilities";

#[derive(Deserialize)]
struct DateFilter {
    date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnavailabilityPayload {
    date: String,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    #[serde(default)]
    reason: String,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/unavailabilities").route(web::get().to(list_unavailabilities)));
}

/// Mounted under `/admin`.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/unavailabilities").route(web::post().to(create_unavailability)))
        .service(
            web::resource("/unavailabilities/{id}")
                .route(web::put().to(update_unavailability))
                .route(web::delete().to(delete_unavailability)),
        );
}

async fn list_unavailabilities(
    state: web::Data<AppState>,
    query: web::Query<DateFilter>,
) -> ApiResult<HttpResponse> {
    let date = query
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(|date| date.format("%Y-%m-%d").to_string());

    let rows = sqlx::query_as::<_, UnavailabilityRow>(&format!(
        "{UNAVAILABILITY_SELECT} WHERE (?1 IS NULL OR date = ?1) ORDER BY date, start_time"
    ))
    .bind(date)
    .fetch_all(&state.db)
    .await?;
    let windows: Vec<UnavailabilityView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(windows))
}

async fn fetch_unavailability(state: &AppState, id: &str) -> ApiResult<UnavailabilityRow> {
    sqlx::query_as::<_, UnavailabilityRow>(&format!("{UNAVAILABILITY_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Unavailability"))
}

fn validated(payload: &UnavailabilityPayload) -> ApiResult<(String, Interval)> {
    let date = parse_date(&payload.date)?;
    let window = Interval::new(payload.start_time, payload.end_time)?;
    Ok((date.format("%Y-%m-%d").to_string(), window))
}

async fn create_unavailability(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<UnavailabilityPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let (date, window) = validated(&payload)?;
    let id = new_id();

    sqlx::query(
        r#"INSERT INTO unavailabilities (id, date, start_time, end_time, reason, is_active, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&date)
    .bind(window.start.to_string())
    .bind(window.end.to_string())
    .bind(payload.reason.trim())
    .bind(i64::from(payload.is_active))
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "unavailability_created",
        &format!("{} blocked {} {}-{}.", auth.name, date, window.start, window.end),
        Some(&auth.id),
        None,
    )
    .await;

    let row = fetch_unavailability(&state, &id).await?;
    Ok(HttpResponse::Created().json(UnavailabilityView::from(row)))
}

async fn update_unavailability(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<UnavailabilityPayload>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let payload = payload.into_inner();
    let (date, window) = validated(&payload)?;

    let updated = sqlx::query(
        r#"UPDATE unavailabilities
           SET date = ?, start_time = ?, end_time = ?, reason = ?, is_active = ?
           WHERE id = ?"#,
    )
    .bind(&date)
    .bind(window.start.to_string())
    .bind(window.end.to_string())
    .bind(payload.reason.trim())
    .bind(i64::from(payload.is_active))
    .bind(&id)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("Unavailability"));
    }

    log_activity(
        &state.db,
        "unavailability_updated",
        &format!("{} updated blocked time on {}.", auth.name, date),
        Some(&auth.id),
        None,
    )
    .await;

    let row = fetch_unavailability(&state, &id).await?;
    Ok(HttpResponse::Ok().json(UnavailabilityView::from(row)))
}

async fn delete_unavailability(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let row = fetch_unavailability(&state, &id).await?;

    sqlx::query("DELETE FROM unavailabilities WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    log_activity(
        &state.db,
        "unavailability_removed",
        &format!("{} reopened {} {}-{}.", auth.name, row.date, row.start_time, row.end_time),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
