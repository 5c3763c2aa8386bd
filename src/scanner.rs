// Server-side threshold scanner: the counterpart of the in-page engine for
// subscribers whose page is closed. Runs on a fixed cadence, re-derives each
// subscriber's remaining time in their local clock, and fans pushes out
// through the service's own send endpoint.
//
// Detection is crossing-based against the previous pass's delta (the same
// rule the engine uses), so a pass that lands a few seconds off the exact
// threshold still fires. A per-schedule, per-threshold local-date guard keeps
// it to one send per day.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use log::{debug, error, info};
use reqwest::StatusCode;

use crate::engine::{PRE_15_TARGET, PRE_5_TARGET};
use crate::models::{NotificationPayload, SendRequest, SubscriptionRecord};
use crate::store::SubscriptionStore;
use crate::timeutil::{crossed, time_left_in_cycle, SECONDS_PER_DAY};
use crate::util::get_short_endpoint;

pub const DEFAULT_SCAN_INTERVAL_S: u64 = 60;

const PUSH_TITLE: &str = "LR Timer";

/// Previous-pass deltas, endpoint -> schedule seconds -> delta.
type ScanState = HashMap<String, HashMap<u32, u32>>;

/// Subscriber-local seconds-since-midnight and calendar date for a stored
/// UTC offset (JS `getTimezoneOffset` convention: local = UTC - offset).
fn local_parts(utc: DateTime<Utc>, timezone_offset: i32) -> (u32, String) {
    let local = utc - chrono::Duration::minutes(timezone_offset as i64);
    (
        local.num_seconds_from_midnight(),
        local.format("%Y-%m-%d").to_string(),
    )
}

fn payload(body: &str) -> NotificationPayload {
    NotificationPayload {
        title: PUSH_TITLE.to_string(),
        body: body.to_string(),
    }
}

/// Evaluate one record against one pass. Fired thresholds are written into
/// `record.last_sent` (the caller persists the record) and returned as
/// payloads to deliver. The first pass only primes `prev_deltas`.
fn scan_record(
    record: &mut SubscriptionRecord,
    prev_deltas: &mut HashMap<u32, u32>,
    now_local: u32,
    today: &str,
) -> Vec<NotificationPayload> {
    let mut due = Vec::new();

    for entry in &record.schedules {
        if !entry.enabled {
            continue;
        }

        let delta = time_left_in_cycle(entry.seconds, now_local, SECONDS_PER_DAY);
        let prev = prev_deltas.insert(entry.seconds, delta);
        let last = record.last_sent.entry(entry.seconds.to_string()).or_default();

        if crossed(prev, delta, PRE_15_TARGET) && last.fifteen.as_deref() != Some(today) {
            last.fifteen = Some(today.to_string());
            due.push(payload("15 minutes remaining"));
        }
        if crossed(prev, delta, PRE_5_TARGET) && last.five.as_deref() != Some(today) {
            last.five = Some(today.to_string());
            due.push(payload("5 minutes remaining"));
        }
    }

    due
}

async fn scan_pass(
    store: &SubscriptionStore,
    client: &reqwest::Client,
    send_url: &str,
    state: &mut ScanState,
) {
    let records = store.list().await;
    state.retain(|endpoint, _| {
        records
            .iter()
            .any(|r| r.subscription.endpoint == *endpoint)
    });

    for mut record in records {
        let endpoint = record.subscription.endpoint.clone();
        let (now_local, today) = local_parts(Utc::now(), record.timezone_offset);
        let prev_deltas = state.entry(endpoint.clone()).or_default();

        let due = scan_record(&mut record, prev_deltas, now_local, &today);
        if due.is_empty() {
            continue;
        }

        // record the send dates before fan-out; a crash cannot double-send
        if let Err(e) = store.upsert(record.clone()).await {
            error!("Failed to persist last-sent dates: {}", e);
        }

        for notification in due {
            info!(
                "Pushing '{}' to ...{}",
                notification.body,
                get_short_endpoint(&endpoint)
            );
            let request = SendRequest {
                subscription: record.subscription.clone(),
                payload: notification,
            };
            match client.post(send_url).json(&request).send().await {
                Ok(res) if res.status() == StatusCode::GONE => {
                    info!("Endpoint ...{} is gone, dropping", get_short_endpoint(&endpoint));
                    if let Err(e) = store.remove(&endpoint).await {
                        error!("Failed to drop stale subscription: {}", e);
                    }
                    state.remove(&endpoint);
                    break;
                }
                Ok(res) if !res.status().is_success() => {
                    error!("Send endpoint returned {} for ...{}", res.status(), get_short_endpoint(&endpoint));
                }
                Ok(_) => debug!("Push accepted for ...{}", get_short_endpoint(&endpoint)),
                Err(e) => error!("Send request failed: {}", e),
            }
        }
    }
}

/// Scanner loop, spawned from main next to the HTTP server.
pub async fn run_scanner(store: Arc<SubscriptionStore>, base_origin: String, interval_s: u64) {
    let client = reqwest::Client::new();
    let send_url = format!("{}/api/send", base_origin.trim_end_matches('/'));
    let mut state = ScanState::new();
    let mut interval = tokio::time::interval(Duration::from_secs(interval_s.max(1)));

    info!("Scanner started, every {}s, fan-out to {}", interval_s.max(1), send_url);

    loop {
        interval.tick().await;
        scan_pass(&store, &client, &send_url, &mut state).await;
    }
}
