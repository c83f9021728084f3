#![allow(dead_code)]

use std::str::FromStr;

use barbershop::{
    auth::{issue_token, new_id},
    config::JwtConfig,
    db::{self, create_user, NewUser},
    models::{UserRow, ROLE_ADMIN, ROLE_CUSTOMER},
    state::AppState,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Monday.
pub const OPEN_DAY: &str = "2030-01-07";
/// Sunday, never given hours in these tests.
pub const CLOSED_DAY: &str = "2030-01-06";

/// One connection keeps the in-memory database alive for the whole test.
pub async fn pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

pub fn jwt() -> JwtConfig {
    JwtConfig {
        secret: "integration-secret".to_string(),
        ttl_hours: 1,
    }
}

pub async fn state() -> AppState {
    AppState::new(pool().await, jwt())
}

pub async fn user(state: &AppState, email: &str, role: &str) -> (UserRow, String) {
    let user = create_user(
        &state.db,
        NewUser {
            email,
            password: "password123",
            name: email.split('@').next().unwrap_or(email),
            phone: None,
            role,
        },
    )
    .await
    .unwrap();
    let token = issue_token(&state.jwt, &user).unwrap();
    (user, token)
}

pub async fn admin(state: &AppState) -> (UserRow, String) {
    user(state, "admin@shop.test", ROLE_ADMIN).await
}

pub async fn customer(state: &AppState, email: &str) -> (UserRow, String) {
    user(state, email, ROLE_CUSTOMER).await
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (actix_web::http::header::AUTHORIZATION, format!("Bearer {token}"))
}

pub async fn service(pool: &SqlitePool, name: &str, duration: i64, price: f64) -> String {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO services (id, name, description, duration, price, category, image, is_active, created_at)
           VALUES (?, ?, '', ?, ?, 'hair', NULL, 1, '2030-01-01T00:00:00Z')"#,
    )
    .bind(&id)
    .bind(name)
    .bind(duration)
    .bind(price)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn hours(pool: &SqlitePool, day_of_week: i64, start: &str, end: &str) {
    sqlx::query(
        "INSERT INTO schedules (id, day_of_week, start_time, end_time, is_active) VALUES (?, ?, ?, ?, 1)",
    )
    .bind(new_id())
    .bind(day_of_week)
    .bind(start)
    .bind(end)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn blocked(pool: &SqlitePool, date: &str, start: &str, end: &str, reason: &str) {
    sqlx::query(
        r#"INSERT INTO unavailabilities (id, date, start_time, end_time, reason, is_active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, '2030-01-01T00:00:00Z')"#,
    )
    .bind(new_id())
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(reason)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn appointment(
    pool: &SqlitePool,
    user_id: &str,
    service_id: &str,
    date: &str,
    start: &str,
    end: &str,
    status: &str,
) -> String {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO appointments
           (id, user_id, service_id, date, start_time, end_time, status, notes, total_price, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, NULL, 20.0, '2030-01-01T00:00:00Z', '2030-01-01T00:00:00Z')"#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(service_id)
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(status)
    .execute(pool)
    .await
    .unwrap();
    id
}
