// Scheduled countdown & notification engine for the LR Timer PWA, plus the
// Web Push backend that covers subscribers whose page is closed: subscription
// management endpoints and a cron-style threshold scanner.

pub mod engine;
pub mod models;
pub mod push;
pub mod routes;
pub mod scanner;
pub mod schedule;
pub mod storage;
pub mod store;
pub mod timeutil;
pub mod types;
pub mod util;

pub const LOG_CONFIG_PATH: &str = "log4rs.yaml";
