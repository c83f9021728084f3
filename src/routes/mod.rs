use actix_web::{web, HttpResponse};
use chrono::NaiveDate;

use crate::{
    error::{ApiError, ApiResult},
    slots::TimeOfDay,
};

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod events;
pub mod gallery;
pub mod schedules;
pub mod services;
pub mod unavailabilities;

/// Registers the whole REST surface. Extractor failures are rewritten into
/// the same `{"message": ...}` body every handler error uses.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .service(web::resource("/health").route(web::get().to(health)))
    .configure(auth::configure)
    .configure(appointments::configure)
    .configure(services::configure)
    .configure(schedules::configure)
    .configure(unavailabilities::configure)
    .configure(gallery::configure)
    .configure(admin::configure);
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

pub(crate) fn parse_date(value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

pub(crate) fn parse_time(value: &str) -> ApiResult<TimeOfDay> {
    Ok(value.parse::<TimeOfDay>()?)
}

/// Trims an optional text field, treating blank input as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn require(value: &str, message: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(message.to_string());
    }
}

pub(crate) fn reject(errors: Vec<String>) -> ApiResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_must_be_iso_days() {
        assert_eq!(
            parse_date("2030-01-07").unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
        );
        assert!(parse_date("07/01/2030").is_err());
        assert!(parse_date("2030-02-30").is_err());
    }

    #[test]
    fn validation_messages_are_joined() {
        let mut errors = Vec::new();
        require("", "Name is required.", &mut errors);
        require("  ", "Email is required.", &mut errors);
        require("x", "Unused.", &mut errors);
        let err = reject(errors).unwrap_err();
        assert_eq!(err.to_string(), "Name is required. Email is required.");
        assert!(reject(Vec::new()).is_ok());
    }
}
