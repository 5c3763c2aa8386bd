use std::env::VarError;
use std::env;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};

use crate::LOG_CONFIG_PATH;

pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";

pub const VAR_VAPID_PRIVATE_KEY: &str = "VAPID_PRIVATE_KEY";
pub const VAR_VAPID_SUBJECT: &str = "VAPID_SUBJECT";
pub const VAR_BASE_ORIGIN: &str = "BASE_ORIGIN";
pub const VAR_SUBSCRIPTIONS_PATH: &str = "SUBSCRIPTIONS_PATH";
pub const VAR_SCAN_INTERVAL_S: &str = "SCAN_INTERVAL_S";

pub fn check_environment_vars() -> Result<(), VarError> {
    env::var(VAR_VAPID_PRIVATE_KEY)?;
    env::var(VAR_VAPID_SUBJECT)?;
    Ok(())
}

/// Init from log4rs.yaml when present, otherwise a plain console logger.
pub fn init_logging() {
    if log4rs::init_file(LOG_CONFIG_PATH, Default::default()).is_ok() {
        return;
    }
    let stdout = ConsoleAppender::builder().build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    if let Ok(config) = config {
        log4rs::init_config(config).ok();
    }
}

/// Shorten a push endpoint URL for logging (the full URL is a capability).
/// Keeps the last 16 chars; endpoints are client input and may be non-ASCII.
pub fn get_short_endpoint(endpoint: &str) -> &str {
    match endpoint.char_indices().rev().nth(15) {
        Some((start, _)) => &endpoint[start..],
        None => endpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_endpoint_keeps_tail() {
        let ep = "https://push.example.org/send/abcdef123456";
        let short = get_short_endpoint(ep);
        assert_eq!(short.len(), 16);
        assert!(ep.ends_with(short));
    }

    #[test]
    fn short_endpoint_passes_short_strings_through() {
        assert_eq!(get_short_endpoint("abc"), "abc");
    }

    #[test]
    fn short_endpoint_handles_multibyte_tails() {
        let ep = "https://push.example.org/送信エンドポイント識別子";
        let short = get_short_endpoint(ep);
        assert_eq!(short.chars().count(), 16);
        assert!(ep.ends_with(short));

        let short_ep = "エンドポイント";
        assert_eq!(get_short_endpoint(short_ep), short_ep);
    }
}
