//! Trigger registration table.
//!
//! Maps `{event kind, resource pattern}` to a handler. The hosting side (the
//! HTTP endpoint and the in-process scheduler) builds a [`TriggerEvent`] and
//! calls [`TriggerRegistry::dispatch`]; handlers never see the transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::services::{
    report, ApplicationReceivedNotifier, ExpirySweeper, ExpiryWarner, HandlerOutcome,
    JobCreatedNotifier,
};
use crate::store::Fields;

/// Schedule that purges expired jobs
pub const SWEEP_SCHEDULE: &str = "expire-jobs";
/// Schedule that warns posters about jobs expiring soon
pub const WARN_SCHEDULE: &str = "warn-expiring-jobs";

pub const JOB_CREATED_PATTERN: &str = "jobs/{jobId}";
pub const APPLICATION_CREATED_PATTERN: &str = "jobs/{jobId}/applications/{applicationId}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "document.created")]
    DocumentCreated,
    #[serde(rename = "schedule.tick")]
    ScheduleTick,
}

/// A single event delivered by the hosting runtime
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub kind: EventKind,
    /// Document path for document events, schedule name for ticks
    pub resource: String,
    /// Fields of the created document
    pub document: Option<Fields>,
    pub received_at: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn document_created(resource: &str, document: Option<Fields>) -> Self {
        Self {
            kind: EventKind::DocumentCreated,
            resource: normalize_resource(resource),
            document,
            received_at: Utc::now(),
        }
    }

    pub fn schedule_tick(name: &str) -> Self {
        Self {
            kind: EventKind::ScheduleTick,
            resource: normalize_resource(name),
            document: None,
            received_at: Utc::now(),
        }
    }
}

/// Strip a fully qualified `projects/.../documents/` prefix and slashes
pub fn normalize_resource(resource: &str) -> String {
    let relative = match resource.find("/documents/") {
        Some(idx) if resource.starts_with("projects/") => &resource[idx + "/documents/".len()..],
        _ => resource,
    };
    relative.trim_matches('/').to_string()
}

/// Event plus the parameters captured from its resource
#[derive(Debug, Clone)]
pub struct Invocation {
    pub event: TriggerEvent,
    pub params: BTreeMap<String, String>,
}

impl Invocation {
    pub fn param(&self, name: &str) -> Result<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::InvalidEvent(format!("missing path parameter {}", name)))
    }
}

#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Stable name used in logs and metrics
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &AppContext, invocation: &Invocation) -> HandlerOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Slash-separated pattern where `{name}` segments capture values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl ResourcePattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::Config("empty resource pattern".to_string()));
        }

        let segments = trimmed
            .split('/')
            .map(|segment| {
                if segment.is_empty() {
                    return Err(AppError::Config(format!("empty segment in pattern {}", raw)));
                }
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some("") => Err(AppError::Config(format!("unnamed parameter in pattern {}", raw))),
                    Some(name) => Ok(Segment::Param(name.to_string())),
                    None => Ok(Segment::Literal(segment.to_string())),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// Captured parameters when `resource` matches
    pub fn matches(&self, resource: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = resource.trim_matches('/').split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

pub struct Registration {
    pub kind: EventKind,
    pub pattern: ResourcePattern,
    pub handler: Arc<dyn TriggerHandler>,
}

/// One handler's result for a dispatched event
#[derive(Debug, Clone, Serialize)]
pub struct HandledBy {
    pub handler: &'static str,
    pub outcome: HandlerOutcome,
}

/// Everything that ran for one event; empty when nothing was registered
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub resource: String,
    pub handled: Vec<HandledBy>,
}

#[derive(Default)]
pub struct TriggerRegistry {
    registrations: Vec<Registration>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: EventKind,
        pattern: &str,
        handler: Arc<dyn TriggerHandler>,
    ) -> Result<&mut Self> {
        let pattern = ResourcePattern::parse(pattern)?;
        debug!(kind = ?kind, pattern = %pattern, handler = handler.name(), "Registered trigger");
        self.registrations.push(Registration {
            kind,
            pattern,
            handler,
        });
        Ok(self)
    }

    /// The service's trigger table
    pub fn standard(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        registry
            .register(
                EventKind::DocumentCreated,
                JOB_CREATED_PATTERN,
                Arc::new(JobCreatedNotifier::new(&config.notifications.new_jobs_topic)),
            )?
            .register(
                EventKind::DocumentCreated,
                APPLICATION_CREATED_PATTERN,
                Arc::new(ApplicationReceivedNotifier),
            )?
            .register(
                EventKind::ScheduleTick,
                SWEEP_SCHEDULE,
                Arc::new(ExpirySweeper::new(config.schedules.sweep_batch_size)),
            )?
            .register(
                EventKind::ScheduleTick,
                WARN_SCHEDULE,
                Arc::new(ExpiryWarner::new(config.schedules.warn_days_ahead)),
            )?;
        Ok(registry)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Names of the registered schedules
    pub fn schedules(&self) -> Vec<String> {
        self.registrations
            .iter()
            .filter(|r| r.kind == EventKind::ScheduleTick)
            .map(|r| r.pattern.to_string())
            .collect()
    }

    /// Run every handler registered for the event. Always completes; handler
    /// failures are reported and carried in the returned report.
    pub async fn dispatch(&self, ctx: &AppContext, event: TriggerEvent) -> DispatchReport {
        let resource = event.resource.clone();
        let mut handled = Vec::new();

        for registration in self.registrations.iter().filter(|r| r.kind == event.kind) {
            let Some(params) = registration.pattern.matches(&resource) else {
                continue;
            };

            let invocation = Invocation {
                event: event.clone(),
                params,
            };
            let name = registration.handler.name();
            let outcome = registration.handler.handle(ctx, &invocation).await;
            report(name, &resource, &outcome);

            handled.push(HandledBy {
                handler: name,
                outcome,
            });
        }

        if handled.is_empty() {
            warn!(kind = ?event.kind, resource = %resource, "No handler registered for event");
        }

        DispatchReport { resource, handled }
    }
}
