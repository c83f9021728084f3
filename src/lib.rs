//! Booking backend for a single barbershop.
//!
//! REST over actix-web, SQLite through sqlx. The interesting part is
//! [`slots`] and [`availability`], which decide which start times can be
//! booked on a given day and guard inserts against double booking.

pub mod auth;
pub mod availability;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod slots;
pub mod state;
