use actix_web::{web, HttpResponse, Result as ActixResult};
use firebase_shared::firestore::decode_fields;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ApiResponse;
use crate::context::AppContext;
use crate::triggers::{DispatchReport, EventKind, TriggerEvent, TriggerRegistry};

/// Body of a pushed trigger event
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub kind: EventKind,
    /// Document path (optionally fully qualified) or schedule name
    pub resource: String,
    /// Created document, fields in Firestore typed JSON
    #[serde(default)]
    pub value: Option<DocumentValue>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentValue {
    #[serde(default)]
    pub fields: serde_json::Value,
}

impl EventEnvelope {
    pub fn into_event(self) -> Result<TriggerEvent, String> {
        if self.resource.trim_matches('/').is_empty() {
            return Err("resource must not be empty".to_string());
        }

        match self.kind {
            EventKind::DocumentCreated => {
                let document = self
                    .value
                    .map(|value| decode_fields(&value.fields))
                    .transpose()
                    .map_err(|e| e.to_string())?;
                Ok(TriggerEvent::document_created(&self.resource, document))
            }
            EventKind::ScheduleTick => Ok(TriggerEvent::schedule_tick(&self.resource)),
        }
    }
}

/// Deliver a trigger event
///
/// POST /api/v1/events
///
/// Answers 200 whatever the handlers did; the outcomes are in the body.
pub async fn receive_event(
    ctx: web::Data<AppContext>,
    registry: web::Data<TriggerRegistry>,
    body: web::Json<EventEnvelope>,
) -> ActixResult<HttpResponse> {
    let event = match body.into_inner().into_event() {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected malformed event");
            return Ok(HttpResponse::BadRequest().json(ApiResponse::<DispatchReport>::err(e)));
        }
    };

    debug!(kind = ?event.kind, resource = %event.resource, "Event received");
    let report = registry.dispatch(&ctx, event).await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(report)))
}

/// Fire a schedule tick now
///
/// POST /api/v1/schedules/{name}/run
pub async fn run_schedule(
    ctx: web::Data<AppContext>,
    registry: web::Data<TriggerRegistry>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let name = path.into_inner();
    if !registry.schedules().contains(&name) {
        return Ok(HttpResponse::NotFound().json(ApiResponse::<DispatchReport>::err(format!(
            "unknown schedule {}",
            name
        ))));
    }

    let report = registry
        .dispatch(&ctx, TriggerEvent::schedule_tick(&name))
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(report)))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(ApiResponse::<DispatchReport>::err(message)),
                )
                .into()
            }))
            .route("/events", web::post().to(receive_event))
            .route("/schedules/{name}/run", web::post().to(run_schedule)),
    );
}
