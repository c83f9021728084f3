use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{new_id, AuthUser},
    db::log_activity,
    error::{ApiError, ApiResult},
    models::{ScheduleRow, ScheduleView},
    slots::{Interval, TimeOfDay},
    state::AppState,
};

const DAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchedulePayload {
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/schedules").route(web::get().to(list_schedules)));
}

/// Mounted under `/admin`.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/schedules/{day_of_week}")
            .route(web::put().to(upsert_schedule))
            .route(web::delete().to(delete_schedule)),
    );
}

fn day_name(day_of_week: u8) -> ApiResult<&'static str> {
    DAY_NAMES
        .get(usize::from(day_of_week))
        .copied()
        .ok_or_else(|| ApiError::validation("dayOfWeek must be between 0 (Sunday) and 6 (Saturday)"))
}

async fn list_schedules(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let rows = sqlx::query_as::<_, ScheduleRow>(
        "SELECT id, day_of_week, start_time, end_time, is_active FROM schedules ORDER BY day_of_week",
    )
    .fetch_all(&state.db)
    .await?;
    let schedules: Vec<ScheduleView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(schedules))
}

async fn upsert_schedule(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<u8>,
    payload: web::Json<SchedulePayload>,
) -> ApiResult<HttpResponse> {
    let day_of_week = path.into_inner();
    let day = day_name(day_of_week)?;
    let window = Interval::new(payload.start_time, payload.end_time)?;

    sqlx::query(
        r#"INSERT INTO schedules (id, day_of_week, start_time, end_time, is_active)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(day_of_week) DO UPDATE SET
             start_time = excluded.start_time,
             end_time = excluded.end_time,
             is_active = excluded.is_active"#,
    )
    .bind(new_id())
    .bind(i64::from(day_of_week))
    .bind(window.start.to_string())
    .bind(window.end.to_string())
    .bind(i64::from(payload.is_active))
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "schedule_updated",
        &format!("{} set {} hours to {}-{}.", auth.name, day, window.start, window.end),
        Some(&auth.id),
        None,
    )
    .await;

    let row = sqlx::query_as::<_, ScheduleRow>(
        "SELECT id, day_of_week, start_time, end_time, is_active FROM schedules WHERE day_of_week = ?",
    )
    .bind(i64::from(day_of_week))
    .fetch_one(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(ScheduleView::from(row)))
}

async fn delete_schedule(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<u8>,
) -> ApiResult<HttpResponse> {
    let day_of_week = path.into_inner();
    let day = day_name(day_of_week)?;

    let deleted = sqlx::query("DELETE FROM schedules WHERE day_of_week = ?")
        .bind(i64::from(day_of_week))
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Schedule"));
    }

    log_activity(
        &state.db,
        "schedule_removed",
        &format!("{} closed the shop on {}s.", auth.name, day),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
