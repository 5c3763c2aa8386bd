// End-to-end tests for the subscription management API.

use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{test, App};
use tempfile::tempdir;

use lrtimer_notification_service::models::SubscriptionRecord;
use lrtimer_notification_service::push::VapidConfig;
use lrtimer_notification_service::routes::{health, send, subscribe, subscriptions, unsubscribe};
use lrtimer_notification_service::store::SubscriptionStore;

fn subscribe_payload(endpoint: &str) -> String {
    serde_json::json!({
        "subscription": {
            "endpoint": endpoint,
            "expirationTime": null,
            "keys": { "p256dh": "pk", "auth": "ak" }
        },
        "schedules": [
            { "seconds": 28800, "enabled": true },
            { "seconds": 72000, "enabled": true }
        ],
        "timezoneOffset": -540
    })
    .to_string()
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new(Arc::clone(&$store)))
                .app_data(Data::new(VapidConfig {
                    private_key: String::from("not a pem key"),
                    subject: String::from("mailto:test@example.com"),
                }))
                .service(subscribe)
                .service(unsubscribe)
                .service(subscriptions)
                .service(send)
                .service(health),
        )
        .await
    };
}

#[actix_web::test]
async fn subscribe_list_unsubscribe_round_trip() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SubscriptionStore::load(dir.path().join("subs.json")));
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/subscribe")
        .set_form([("payload", subscribe_payload("https://push.example.org/send/a"))])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/api/subscriptions").to_request();
    let records: Vec<SubscriptionRecord> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subscription.endpoint, "https://push.example.org/send/a");
    assert_eq!(records[0].schedules.len(), 2);
    assert_eq!(records[0].timezone_offset, -540);

    let req = test::TestRequest::post()
        .uri("/api/unsubscribe")
        .set_form([(
            "payload",
            serde_json::json!({ "endpoint": "https://push.example.org/send/a" }).to_string(),
        )])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/api/subscriptions").to_request();
    let records: Vec<SubscriptionRecord> = test::call_and_read_body_json(&app, req).await;
    assert!(records.is_empty());
}

#[actix_web::test]
async fn resubscribing_the_same_endpoint_replaces_the_record() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SubscriptionStore::load(dir.path().join("subs.json")));
    let app = app!(store);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/subscribe")
            .set_form([("payload", subscribe_payload("https://push.example.org/send/a"))])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::get().uri("/api/subscriptions").to_request();
    let records: Vec<SubscriptionRecord> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(records.len(), 1);
}

#[actix_web::test]
async fn malformed_payload_is_a_bad_request() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SubscriptionStore::load(dir.path().join("subs.json")));
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/subscribe")
        .set_form([("payload", String::from("{not json"))])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn send_with_a_bad_vapid_key_reports_a_server_error() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SubscriptionStore::load(dir.path().join("subs.json")));
    let app = app!(store);

    // the VAPID key in the test app is not a valid PEM, so the signature
    // build fails before anything touches the network
    let req = test::TestRequest::post()
        .uri("/api/send")
        .set_json(serde_json::json!({
            "subscription": {
                "endpoint": "https://push.example.org/send/a",
                "keys": { "p256dh": "pk", "auth": "ak" }
            },
            "payload": { "title": "LR Timer", "body": "15 minutes remaining" }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SubscriptionStore::load(dir.path().join("subs.json")));
    let app = app!(store);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}
