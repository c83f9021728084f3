use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{new_id, AuthUser},
    db::log_activity,
    error::{ApiError, ApiResult},
    models::{ServiceRow, ServiceView},
    routes::{non_blank, reject, require},
    state::AppState,
};

const SERVICE_SELECT: &str =
    "SELECT id, name, description, duration, price, category, image, is_active FROM services";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicePayload {
    name: String,
    #[serde(default)]
    description: String,
    duration: i64,
    price: f64,
    #[serde(default)]
    category: String,
    image: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ServicePayload {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        require(&self.name, "Service name is required.", &mut errors);
        if self.duration <= 0 || self.duration > i64::from(u16::MAX) {
            errors.push("Duration must be a positive number of minutes.".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            errors.push("Price cannot be negative.".to_string());
        }
        reject(errors)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/services").route(web::get().to(list_active)))
        .service(web::resource("/services/{id}").route(web::get().to(service_detail)));
}

/// Mounted under `/admin`.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/services")
            .route(web::get().to(list_all))
            .route(web::post().to(create_service)),
    )
    .service(
        web::resource("/services/{id}")
            .route(web::put().to(update_service))
            .route(web::delete().to(deactivate_service)),
    );
}

async fn list_active(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let rows = sqlx::query_as::<_, ServiceRow>(&format!(
        "{SERVICE_SELECT} WHERE is_active = 1 ORDER BY category, name"
    ))
    .fetch_all(&state.db)
    .await?;
    let services: Vec<ServiceView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(services))
}

async fn list_all(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let rows = sqlx::query_as::<_, ServiceRow>(&format!("{SERVICE_SELECT} ORDER BY category, name"))
        .fetch_all(&state.db)
        .await?;
    let services: Vec<ServiceView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(services))
}

async fn service_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let row = sqlx::query_as::<_, ServiceRow>(&format!(
        "{SERVICE_SELECT} WHERE id = ? AND is_active = 1"
    ))
    .bind(path.into_inner())
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Service"))?;
    Ok(HttpResponse::Ok().json(ServiceView::from(row)))
}

async fn fetch_service(state: &AppState, id: &str) -> ApiResult<ServiceRow> {
    sqlx::query_as::<_, ServiceRow>(&format!("{SERVICE_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Service"))
}

async fn create_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<ServicePayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    payload.validate()?;
    let id = new_id();

    sqlx::query(
        r#"INSERT INTO services (id, name, description, duration, price, category, image, is_active, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(payload.name.trim())
    .bind(payload.description.trim())
    .bind(payload.duration)
    .bind(payload.price)
    .bind(payload.category.trim())
    .bind(non_blank(payload.image))
    .bind(i64::from(payload.is_active))
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "service_created",
        &format!("{} added service {}.", auth.name, payload.name.trim()),
        Some(&auth.id),
        None,
    )
    .await;

    let row = fetch_service(&state, &id).await?;
    Ok(HttpResponse::Created().json(ServiceView::from(row)))
}

async fn update_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<ServicePayload>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    let updated = sqlx::query(
        r#"UPDATE services
           SET name = ?, description = ?, duration = ?, price = ?, category = ?, image = ?, is_active = ?
           WHERE id = ?"#,
    )
    .bind(payload.name.trim())
    .bind(payload.description.trim())
    .bind(payload.duration)
    .bind(payload.price)
    .bind(payload.category.trim())
    .bind(non_blank(payload.image))
    .bind(i64::from(payload.is_active))
    .bind(&id)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("Service"));
    }

    log_activity(
        &state.db,
        "service_updated",
        &format!("{} updated service {}.", auth.name, payload.name.trim()),
        Some(&auth.id),
        None,
    )
    .await;

    let row = fetch_service(&state, &id).await?;
    Ok(HttpResponse::Ok().json(ServiceView::from(row)))
}

/// Appointments keep pointing at their service, so deletion only hides it.
async fn deactivate_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let updated = sqlx::query("UPDATE services SET is_active = 0 WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("Service"));
    }

    log_activity(
        &state.db,
        "service_deactivated",
        &format!("{} deactivated service {}.", auth.name, id),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
