use std::{fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    config::SeedConfig,
    error::ApiError,
    models::{AppointmentRow, UserRow, ROLE_ADMIN},
};

/// Column list shared by every appointment read; joins user and service names.
pub const APPOINTMENT_SELECT: &str = r#"SELECT a.id, a.user_id, u.name AS user_name, a.service_id,
                  s.name AS service_name, a.date, a.start_time, a.end_time, a.status,
                  a.notes, a.total_price, a.created_at
           FROM appointments a
           LEFT JOIN users u ON a.user_id = u.id
           LEFT JOIN services s ON a.service_id = s.id"#;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"));

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool, seed: &SeedConfig) -> Result<(), sqlx::Error> {
    seed_admin(pool, seed).await?;
    if seed.schedule {
        seed_schedule(pool).await?;
    }
    Ok(())
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub role: &'a str,
}

/// Inserts an account; a duplicate e-mail is reported as a validation error.
pub async fn create_user(pool: &SqlitePool, user: NewUser<'_>) -> Result<UserRow, ApiError> {
    let email = user.email.trim().to_lowercase();
    let taken = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ? LIMIT 1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if taken.is_some() {
        return Err(ApiError::validation("An account with this email already exists"));
    }

    let password_hash = hash_password(user.password)
        .map_err(|err| ApiError::Internal(format!("password hash failed: {err}")))?;
    let row = UserRow {
        id: new_id(),
        email,
        name: user.name.trim().to_string(),
        phone: user
            .phone
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_string),
        role: user.role.to_string(),
        password_hash,
        active: 1,
        created_at: Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"INSERT INTO users (id, email, name, phone, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&row.id)
    .bind(&row.email)
    .bind(&row.name)
    .bind(&row.phone)
    .bind(&row.role)
    .bind(&row.password_hash)
    .bind(row.active)
    .bind(&row.created_at)
    .execute(pool)
    .await?;

    Ok(row)
}

pub async fn log_activity(
    pool: &SqlitePool,
    kind: &str,
    message: &str,
    user_id: Option<&str>,
    appointment_id: Option<&str>,
) {
    let result = sqlx::query(
        r#"INSERT INTO activities (id, kind, message, created_at, user_id, appointment_id)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(kind)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .bind(appointment_id)
    .execute(pool)
    .await;

    if let Err(err) = result {
        log::warn!("Failed to record activity {kind}: {err}");
    }
}

pub async fn fetch_appointment(
    pool: &SqlitePool,
    appointment_id: &str,
) -> Result<Option<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(&format!("{APPOINTMENT_SELECT} WHERE a.id = ? LIMIT 1"))
        .bind(appointment_id)
        .fetch_optional(pool)
        .await
}

async fn seed_admin(pool: &SqlitePool, seed: &SeedConfig) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if seed.admin_password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let admin = NewUser {
        email: &seed.admin_email,
        password: &seed.admin_password,
        name: &seed.admin_name,
        phone: None,
        role: ROLE_ADMIN,
    };
    match create_user(pool, admin).await {
        Ok(user) => {
            log::info!("Seeded admin account {}", user.email);
            Ok(())
        }
        Err(ApiError::Database(err)) => Err(err),
        Err(err) => Err(sqlx::Error::Protocol(format!("admin seed failed: {err}"))),
    }
}

/// Monday to Saturday, 09:00-18:00. Only runs against an empty schedule table.
async fn seed_schedule(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schedules")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    for day_of_week in 1..=6_i64 {
        sqlx::query(
            r#"INSERT INTO schedules (id, day_of_week, start_time, end_time, is_active)
               VALUES (?, ?, '09:00', '18:00', 1)"#,
        )
        .bind(new_id())
        .bind(day_of_week)
        .execute(pool)
        .await?;
    }
    log::info!("Seeded default weekly schedule");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_and_foreign_urls_need_no_directory() {
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
        assert!(ensure_sqlite_dir("sqlite://:memory:").is_ok());
        assert!(ensure_sqlite_dir("postgres://localhost/db").is_ok());
    }
}
