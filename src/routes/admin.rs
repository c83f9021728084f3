use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{admin_validator, AuthUser},
    db::{fetch_appointment, log_activity, APPOINTMENT_SELECT},
    error::{ApiError, ApiResult},
    models::{
        ActivityRow, AppointmentRow, AppointmentStatus, AppointmentView, UserRow, UserView,
        ROLE_ADMIN, ROLE_CUSTOMER,
    },
    routes::{
        appointments::change_status, events, gallery, non_blank, parse_date, schedules, services,
        unavailabilities,
    },
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatCard {
    label: &'static str,
    value: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityView {
    kind: String,
    message: String,
    created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    stats: Vec<StatCard>,
    today: Vec<AppointmentView>,
    activities: Vec<ActivityView>,
}

#[derive(Deserialize)]
struct AppointmentFilter {
    status: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct StatusPayload {
    status: AppointmentStatus,
}

#[derive(Deserialize)]
struct UserUpdatePayload {
    role: Option<String>,
    active: Option<bool>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::bearer(admin_validator))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/appointments").route(web::get().to(list_appointments)))
            .service(
                web::resource("/appointments/{id}/status").route(web::patch().to(update_status)),
            )
            .service(web::resource("/users").route(web::get().to(list_users)))
            .service(web::resource("/users/{id}").route(web::patch().to(update_user)))
            .configure(services::configure_admin)
            .configure(schedules::configure_admin)
            .configure(unavailabilities::configure_admin)
            .configure(gallery::configure_admin)
            .configure(events::configure),
    );
}

async fn dashboard(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

    let mut stats = vec![StatCard {
        label: "Total appointments",
        value: count(&state, "SELECT COUNT(*) FROM appointments", None).await?,
    }];
    for status in AppointmentStatus::ALL {
        stats.push(StatCard {
            label: status.as_str(),
            value: count(
                &state,
                "SELECT COUNT(*) FROM appointments WHERE status = ?",
                Some(status.as_str()),
            )
            .await?,
        });
    }

    let today_rows = sqlx::query_as::<_, AppointmentRow>(&format!(
        "{APPOINTMENT_SELECT} WHERE a.date = ? AND a.status != ? ORDER BY a.start_time"
    ))
    .bind(&today)
    .bind(AppointmentStatus::Cancelled.as_str())
    .fetch_all(&state.db)
    .await?;

    let activity_rows = sqlx::query_as::<_, ActivityRow>(
        "SELECT kind, message, created_at FROM activities ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(Dashboard {
        stats,
        today: today_rows.into_iter().map(Into::into).collect(),
        activities: activity_rows
            .into_iter()
            .map(|row| ActivityView {
                kind: row.kind,
                message: row.message,
                created_at: row.created_at,
            })
            .collect(),
    }))
}

async fn count(state: &AppState, query: &str, param: Option<&str>) -> ApiResult<i64> {
    let mut query = sqlx::query_scalar::<sqlx::Sqlite, i64>(query);
    if let Some(param) = param {
        query = query.bind(param.to_string());
    }
    Ok(query.fetch_one(&state.db).await?)
}

async fn list_appointments(
    state: web::Data<AppState>,
    query: web::Query<AppointmentFilter>,
) -> ApiResult<HttpResponse> {
    let filter = query.into_inner();
    let status = non_blank(filter.status)
        .map(|status| status.parse::<AppointmentStatus>().map_err(ApiError::Validation))
        .transpose()?;
    let date = non_blank(filter.date)
        .map(|date| parse_date(&date))
        .transpose()?
        .map(|date| date.format("%Y-%m-%d").to_string());

    let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
        r#"{APPOINTMENT_SELECT}
           WHERE (?1 IS NULL OR a.status = ?1) AND (?2 IS NULL OR a.date = ?2)
           ORDER BY a.date DESC, a.start_time DESC"#
    ))
    .bind(status.map(AppointmentStatus::as_str))
    .bind(date)
    .fetch_all(&state.db)
    .await?;

    let appointments: Vec<AppointmentView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(appointments))
}

async fn update_status(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<StatusPayload>,
) -> ApiResult<HttpResponse> {
    let row = fetch_appointment(&state.db, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    let row = change_status(&state, &auth, row, payload.status).await?;
    Ok(HttpResponse::Ok().json(AppointmentView::from(row)))
}

async fn list_users(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, email, name, phone, role, password_hash, active, created_at
           FROM users
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await?;
    let users: Vec<UserView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(users))
}

async fn update_user(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<UserUpdatePayload>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    let payload = payload.into_inner();

    if let Some(role) = payload.role.as_deref() {
        if role != ROLE_ADMIN && role != ROLE_CUSTOMER {
            return Err(ApiError::Validation(format!("Unknown role '{role}'")));
        }
    }
    let demotes_self = payload.role.as_deref().is_some_and(|role| role != ROLE_ADMIN)
        || payload.active == Some(false);
    if user_id == auth.id && demotes_self {
        return Err(ApiError::validation(
            "You cannot demote or deactivate your own account",
        ));
    }

    let updated = sqlx::query(
        r#"UPDATE users
           SET role = COALESCE(?, role), active = COALESCE(?, active)
           WHERE id = ?"#,
    )
    .bind(payload.role.as_deref())
    .bind(payload.active.map(i64::from))
    .bind(&user_id)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("User"));
    }

    log_activity(
        &state.db,
        "user_updated",
        &format!("{} updated account {}.", auth.name, user_id),
        Some(&auth.id),
        None,
    )
    .await;

    let row = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, email, name, phone, role, password_hash, active, created_at
           FROM users
           WHERE id = ?"#,
    )
    .bind(&user_id)
    .fetch_one(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(UserView::from(row)))
}
