// A small service backing the LR Timer PWA: manages Web Push subscriptions
// and runs a cron-style scanner that pushes 15-minute/5-minute reminders to
// subscribers whose page is not open.

use actix_web::{HttpResponse, HttpServer, App, web::{self, Data}, error};
use dotenv::dotenv;
use log::{info, error};
use std::{sync::Arc, process::exit, env};

use lrtimer_notification_service::push::VapidConfig;
use lrtimer_notification_service::routes::{subscribe, unsubscribe, subscriptions, send, health};
use lrtimer_notification_service::scanner::{self, DEFAULT_SCAN_INTERVAL_S};
use lrtimer_notification_service::store::{SubscriptionStore, DEFAULT_SUBSCRIPTIONS_PATH};
use lrtimer_notification_service::util::{self, HOST, PORT, VAR_VAPID_PRIVATE_KEY,
    VAR_VAPID_SUBJECT, VAR_BASE_ORIGIN, VAR_SUBSCRIPTIONS_PATH, VAR_SCAN_INTERVAL_S};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    let check = util::check_environment_vars();
    if check.is_err() {
        eprintln!("Missing environment variable");
        eprintln!("Required environment variables: {VAR_VAPID_PRIVATE_KEY} {VAR_VAPID_SUBJECT}");
        exit(1)
    }
    util::init_logging();

    let vapid = match VapidConfig::from_env() {
        Ok(vapid) => vapid,
        Err(e) => {
            eprintln!("VAPID configuration error: {}", e);
            exit(1)
        }
    };
    let vapid_data = Data::new(vapid);

    let subscriptions_path = env::var(VAR_SUBSCRIPTIONS_PATH)
        .unwrap_or(String::from(DEFAULT_SUBSCRIPTIONS_PATH));
    let store = Arc::new(SubscriptionStore::load(subscriptions_path));
    info!("Subscription store ready with {} record(s)", store.len().await);
    let store_data = Data::new(Arc::clone(&store));

    let host = env::var(HOST).unwrap_or(String::from("127.0.0.1"));
    let port = env::var(PORT).unwrap_or(String::from("8788"));
    let base_origin = env::var(VAR_BASE_ORIGIN)
        .unwrap_or(format!("http://{}:{}", host, port));
    let scan_interval = env::var(VAR_SCAN_INTERVAL_S)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SCAN_INTERVAL_S);

    let scanner_handle = tokio::spawn(scanner::run_scanner(
        Arc::clone(&store),
        base_origin,
        scan_interval,
    ));

    let server_handle = HttpServer::new(move || {
        let json_cfg = web::JsonConfig::default()
            .error_handler(|err, _req| {
                error!("Json config error: {}", err);
                error::InternalError::from_response(err, HttpResponse::BadRequest().into()).into()
            });
        App::new()
            .app_data(Data::clone(&store_data))
            .app_data(Data::clone(&vapid_data))
            .app_data(json_cfg)
            .service(subscribe)
            .service(unsubscribe)
            .service(subscriptions)
            .service(send)
            .service(health)
    })
        .bind(format!("{}:{}", host, port))?
        .run();

    tokio::select! {
        _ = server_handle => {}
        _ = scanner_handle => {},
    }
    Ok(())
}
