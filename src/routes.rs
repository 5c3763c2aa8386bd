use actix_web::{Responder, HttpResponse, post, get, web::{self, Data}};
use log::{info, debug, error};
use std::sync::Arc;

use crate::models::{SendRequest, SubscribePayload, PayloadForm, UnsubscribePayload};
use crate::push::{send_web_push, PushError, VapidConfig};
use crate::store::SubscriptionStore;
use crate::util::get_short_endpoint;

#[post("/api/subscribe")]
pub async fn subscribe(form: web::Form<PayloadForm>,
    store: Data<Arc<SubscriptionStore>>) -> impl Responder {

    let payload: SubscribePayload = match serde_json::from_str(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Subscribe payload error: {}", e);
            return HttpResponse::BadRequest().body("Missing payload");
        }
    };

    debug!("subscribe:: ...{} with {} schedule(s), tz offset {}",
        get_short_endpoint(&payload.subscription.endpoint),
        payload.schedules.len(),
        payload.timezone_offset);

    match store.upsert(payload.into()).await {
        Ok(()) => HttpResponse::Ok().body("Subscribed"),
        Err(e) => {
            error!("Subscribe error: {}", e);
            HttpResponse::InternalServerError().body("Internal server error")
        }
    }
}

#[post("/api/unsubscribe")]
pub async fn unsubscribe(form: web::Form<PayloadForm>,
    store: Data<Arc<SubscriptionStore>>) -> impl Responder {

    let payload: UnsubscribePayload = match serde_json::from_str(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Unsubscribe payload error: {}", e);
            return HttpResponse::BadRequest().body("Missing payload");
        }
    };

    debug!("unsubscribe:: ...{}", get_short_endpoint(&payload.endpoint));

    match store.remove(&payload.endpoint).await {
        Ok(_) => HttpResponse::Ok().body("Unsubscribed"),
        Err(e) => {
            error!("Unsubscribe error: {}", e);
            HttpResponse::InternalServerError().body("Internal server error")
        }
    }
}

#[get("/api/subscriptions")]
pub async fn subscriptions(store: Data<Arc<SubscriptionStore>>) -> impl Responder {
    HttpResponse::Ok().json(store.list().await)
}

#[post("/api/send")]
pub async fn send(payload: web::Json<SendRequest>,
    store: Data<Arc<SubscriptionStore>>,
    vapid: Data<VapidConfig>) -> impl Responder {

    let request = payload.into_inner();
    let endpoint = request.subscription.endpoint.clone();

    match send_web_push(&request.subscription, &request.payload, &vapid).await {
        Ok(()) => HttpResponse::Ok().body("Sent"),
        Err(PushError::EndpointGone) => {
            // stale endpoint: drop the stored record so the scanner stops
            // retrying it
            if let Err(e) = store.remove(&endpoint).await {
                error!("Failed to drop gone subscription: {}", e);
            }
            HttpResponse::Gone().body("Subscription gone")
        }
        Err(e) => {
            error!("Send error: {}", e);
            HttpResponse::InternalServerError().body("Internal server error")
        }
    }
}

#[get("/health")]
pub async fn health() -> impl Responder {
    info!("Health check");
    HttpResponse::Ok()
}
