use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{config::JwtConfig, models::AppointmentRow};

const EVENT_BUFFER: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: broadcast::Sender<ServerEvent>,
    pub jwt: JwtConfig,
}

impl AppState {
    pub fn new(db: SqlitePool, jwt: JwtConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { db, events, jwt }
    }

    /// Fans an appointment change out to connected admin streams. Having no
    /// listener is not an error.
    pub fn publish(&self, kind: &str, row: AppointmentRow) {
        let _ = self.events.send(ServerEvent::from_row(kind, row));
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    pub kind: String,
    pub appointment_id: String,
    pub status: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub service_name: Option<String>,
    pub user_name: Option<String>,
}

impl ServerEvent {
    pub fn from_row(kind: &str, row: AppointmentRow) -> Self {
        Self {
            kind: kind.to_string(),
            appointment_id: row.id,
            status: row.status,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            service_name: row.service_name,
            user_name: row.user_name,
        }
    }
}
