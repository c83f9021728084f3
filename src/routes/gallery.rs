use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{new_id, AuthUser},
    db::log_activity,
    error::{ApiError, ApiResult},
    models::{GalleryPhotoRow, GalleryPhotoView},
    routes::{non_blank, reject, require},
    state::AppState,
};

#[derive(Deserialize)]
struct CategoryFilter {
    category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoPayload {
    title: String,
    #[serde(default)]
    description: String,
    image_url: String,
    #[serde(default)]
    category: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/gallery").route(web::get().to(list_photos)));
}

/// Mounted under `/admin`.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/gallery").route(web::post().to(add_photo)))
        .service(web::resource("/gallery/{id}").route(web::delete().to(remove_photo)));
}

async fn list_photos(
    state: web::Data<AppState>,
    query: web::Query<CategoryFilter>,
) -> ApiResult<HttpResponse> {
    let rows = sqlx::query_as::<_, GalleryPhotoRow>(
        r#"SELECT id, title, description, image_url, category, created_at
           FROM gallery_photos
           WHERE (?1 IS NULL OR category = ?1)
           ORDER BY created_at DESC"#,
    )
    .bind(non_blank(query.into_inner().category))
    .fetch_all(&state.db)
    .await?;
    let photos: Vec<GalleryPhotoView> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(photos))
}

async fn add_photo(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<PhotoPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let mut errors = Vec::new();
    require(&payload.title, "Title is required.", &mut errors);
    require(&payload.image_url, "Image URL is required.", &mut errors);
    reject(errors)?;

    let row = GalleryPhotoRow {
        id: new_id(),
        title: payload.title.trim().to_string(),
        description: payload.description.trim().to_string(),
        image_url: payload.image_url.trim().to_string(),
        category: payload.category.trim().to_string(),
        created_at: Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"INSERT INTO gallery_photos (id, title, description, image_url, category, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.image_url)
    .bind(&row.category)
    .bind(&row.created_at)
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "gallery_added",
        &format!("{} added photo {}.", auth.name, row.title),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Created().json(GalleryPhotoView::from(row)))
}

async fn remove_photo(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let deleted = sqlx::query("DELETE FROM gallery_photos WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Photo"));
    }

    log_activity(
        &state.db,
        "gallery_removed",
        &format!("{} removed photo {}.", auth.name, id),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
