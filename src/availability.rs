//! Store-backed slot availability and the booking guard.
//!
//! Loads the inputs of [`crate::slots`] for one calendar day. Dates are shop
//! local: a `NaiveDate` is stored as `YYYY-MM-DD` and compared as-is.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    db::fetch_appointment,
    error::{ApiError, ApiResult},
    models::{AppointmentRow, AppointmentStatus, ServiceRow},
    slots::{self, Interval, TimeOfDay},
};

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: String,
    pub service_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BlockedWindow {
    pub interval: Interval,
    pub reason: String,
}

fn stored_interval(start: &str, end: &str) -> ApiResult<Interval> {
    Interval::parse(start, end)
        .map_err(|err| ApiError::Internal(format!("corrupt stored interval {start}-{end}: {err}")))
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// True once a start at `start` on `date` lies before `now` (minute precision).
fn has_started(date: NaiveDate, start: TimeOfDay, now: NaiveDateTime) -> bool {
    let minute_of_day = now.hour() * 60 + now.minute();
    date < now.date() || (date == now.date() && u32::from(start.minutes()) < minute_of_day)
}

/// The active opening window for the weekday of `date`, if any.
pub async fn business_window(pool: &SqlitePool, date: NaiveDate) -> ApiResult<Option<Interval>> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT start_time, end_time FROM schedules WHERE day_of_week = ? AND is_active = 1 LIMIT 1",
    )
    .bind(i64::from(slots::day_of_week(date)))
    .fetch_optional(pool)
    .await?;

    row.map(|(start, end)| stored_interval(&start, &end)).transpose()
}

/// Intervals held by every appointment on `date` that is not cancelled.
pub async fn booked_intervals(pool: &SqlitePool, date: NaiveDate) -> ApiResult<Vec<Interval>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT start_time, end_time FROM appointments WHERE date = ? AND status != ?",
    )
    .bind(date_key(date))
    .bind(AppointmentStatus::Cancelled.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|(start, end)| stored_interval(start, end))
        .collect()
}

pub async fn blocked_windows(pool: &SqlitePool, date: NaiveDate) -> ApiResult<Vec<BlockedWindow>> {
    let rows = sqlx::query_as::<_, (String, String, String)>(
        "SELECT start_time, end_time, reason FROM unavailabilities WHERE date = ? AND is_active = 1",
    )
    .bind(date_key(date))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(start, end, reason)| {
            Ok(BlockedWindow {
                interval: stored_interval(&start, &end)?,
                reason,
            })
        })
        .collect()
}

pub async fn compute_available_slots(pool: &SqlitePool, date: NaiveDate) -> ApiResult<Vec<TimeOfDay>> {
    available_slots_at(pool, date, Local::now().naive_local()).await
}

/// Available starts on `date` as seen at `now`. Starts that have already
/// passed are dropped, so past days list nothing.
pub async fn available_slots_at(
    pool: &SqlitePool,
    date: NaiveDate,
    now: NaiveDateTime,
) -> ApiResult<Vec<TimeOfDay>> {
    let Some(window) = business_window(pool, date).await? else {
        return Ok(Vec::new());
    };

    let mut busy = booked_intervals(pool, date).await?;
    busy.extend(
        blocked_windows(pool, date)
            .await?
            .into_iter()
            .map(|blocked| blocked.interval),
    );
    let mut available = slots::available_slots(Some(window), &busy);
    available.retain(|start| !has_started(date, *start, now));
    Ok(available)
}

/// True when `[start, start + duration)` overlaps a non-cancelled appointment
/// on `date`. Errors if the interval would cross midnight.
pub async fn check_conflict(
    pool: &SqlitePool,
    date: NaiveDate,
    start: TimeOfDay,
    duration: u16,
) -> ApiResult<bool> {
    let proposed = Interval::with_duration(start, duration)?;
    let booked = booked_intervals(pool, date).await?;
    Ok(slots::has_conflict(&booked, &proposed))
}

async fn bookable_service(pool: &SqlitePool, service_id: &str) -> ApiResult<ServiceRow> {
    sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, description, duration, price, category, image, is_active
           FROM services
           WHERE id = ? AND is_active = 1"#,
    )
    .bind(service_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::validation("Service not found or inactive"))
}

/// Validates a booking against business hours, blocked windows and existing
/// appointments, then inserts it as `pending`.
///
/// The insert itself is conditional on no overlapping non-cancelled
/// appointment existing, so two concurrent requests for the same interval
/// cannot both succeed.
pub async fn book(pool: &SqlitePool, request: BookingRequest) -> ApiResult<AppointmentRow> {
    if has_started(request.date, request.start_time, Local::now().naive_local()) {
        return Err(ApiError::validation("Cannot book an appointment in the past"));
    }

    let service = bookable_service(pool, &request.service_id).await?;
    let duration = u16::try_from(service.duration)
        .map_err(|_| ApiError::validation("Service duration is out of range"))?;
    let proposed = Interval::with_duration(request.start_time, duration)?;

    let window = business_window(pool, request.date)
        .await?
        .ok_or_else(|| ApiError::validation("The shop is closed on this day"))?;
    if !window.contains(&proposed) {
        return Err(ApiError::Validation(format!(
            "Appointment must be between {} and {}",
            window.start, window.end
        )));
    }

    if let Some(blocked) = blocked_windows(pool, request.date)
        .await?
        .into_iter()
        .find(|blocked| blocked.interval.overlaps(&proposed))
    {
        let reason = if blocked.reason.trim().is_empty() {
            "unavailable"
        } else {
            blocked.reason.trim()
        };
        return Err(ApiError::Validation(format!("This time is unavailable: {reason}")));
    }

    if check_conflict(pool, request.date, proposed.start, duration).await? {
        return Err(ApiError::SlotTaken);
    }

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    let date = date_key(request.date);
    let start = proposed.start.to_string();
    let end = proposed.end.to_string();
    let notes = request
        .notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());

    let inserted = sqlx::query(
        r#"INSERT INTO appointments
           (id, user_id, service_id, date, start_time, end_time, status, notes, total_price, created_at, updated_at)
           SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
           WHERE NOT EXISTS (
               SELECT 1 FROM appointments
               WHERE date = ? AND status != ? AND start_time < ? AND ? < end_time
           )"#,
    )
    .bind(&id)
    .bind(&request.user_id)
    .bind(&service.id)
    .bind(&date)
    .bind(&start)
    .bind(&end)
    .bind(AppointmentStatus::Pending.as_str())
    .bind(notes)
    .bind(service.price)
    .bind(&now)
    .bind(&now)
    .bind(&date)
    .bind(AppointmentStatus::Cancelled.as_str())
    .bind(&end)
    .bind(&start)
    .execute(pool)
    .await?;

    if inserted.rows_affected() == 0 {
        log::info!("Booking for {date} {start} lost the race to a concurrent request");
        return Err(ApiError::SlotTaken);
    }

    fetch_appointment(pool, &id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))
}
