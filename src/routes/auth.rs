use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{authenticate_credentials, find_active_user, issue_token, user_validator, AuthUser},
    db::{create_user, log_activity, NewUser},
    error::{ApiError, ApiResult},
    models::{UserView, ROLE_CUSTOMER},
    routes::{reject, require},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
struct RegisterPayload {
    email: String,
    password: String,
    name: String,
    phone: Option<String>,
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    token: String,
    user: UserView,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/auth/register").route(web::post().to(register)))
        .service(web::resource("/auth/login").route(web::post().to(login)))
        .service(
            web::resource("/auth/me")
                .wrap(HttpAuthentication::bearer(user_validator))
                .route(web::get().to(me)),
        );
}

async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let mut errors = Vec::new();
    require(&payload.name, "Name is required.", &mut errors);
    if !payload.email.contains('@') {
        errors.push("A valid email is required.".to_string());
    }
    if payload.password.trim().len() < MIN_PASSWORD_LEN {
        errors.push(format!("Password must be at least {MIN_PASSWORD_LEN} characters."));
    }
    reject(errors)?;

    let user = create_user(
        &state.db,
        NewUser {
            email: &payload.email,
            password: &payload.password,
            name: &payload.name,
            phone: payload.phone.as_deref(),
            role: ROLE_CUSTOMER,
        },
    )
    .await?;

    log_activity(
        &state.db,
        "user_registered",
        &format!("{} created an account.", user.name),
        Some(&user.id),
        None,
    )
    .await;

    let token = issue_token(&state.jwt, &user)?;
    Ok(HttpResponse::Created().json(SessionResponse {
        token,
        user: user.into(),
    }))
}

async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> ApiResult<HttpResponse> {
    let user = authenticate_credentials(&state.db, &payload.email, &payload.password)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let token = issue_token(&state.jwt, &user)?;
    Ok(HttpResponse::Ok().json(SessionResponse {
        token,
        user: user.into(),
    }))
}

async fn me(state: web::Data<AppState>, auth: web::ReqData<AuthUser>) -> ApiResult<HttpResponse> {
    let user = find_active_user(&state.db, &auth.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}
