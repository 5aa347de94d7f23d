//! `recordsd`: school records service.
//!
//! Students, subjects and per-subject marks stored in SQLite and served over
//! a JSON REST API, with a per-class mark report and zip backups.

pub mod api;
pub mod backup;
pub mod calc;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod store;
