use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder,
};

/// Request latency per service route; `_count` doubles as the request total
static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "job_alerts_http_request_duration_seconds",
            "HTTP request latency by service route",
        )
        .buckets(vec![0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["route", "status"],
    )
    .expect("failed to create job_alerts_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register job_alerts_http_request_duration_seconds");
    histogram
});

static HANDLER_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "job_alerts_handler_outcomes_total",
            "Trigger handler invocations by outcome",
        ),
        &["trigger", "outcome"],
    )
    .expect("failed to create job_alerts_handler_outcomes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register job_alerts_handler_outcomes_total");
    counter
});

static PUSHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("job_alerts_pushes_total", "Push notifications attempted"),
        &["category", "result"],
    )
    .expect("failed to create job_alerts_pushes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register job_alerts_pushes_total");
    counter
});

static JOBS_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "job_alerts_jobs_deleted_total",
        "Expired jobs removed by the sweeper",
    )
    .expect("failed to create job_alerts_jobs_deleted_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register job_alerts_jobs_deleted_total");
    counter
});

static APPLICATIONS_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "job_alerts_applications_deleted_total",
        "Applications removed together with their expired job",
    )
    .expect("failed to create job_alerts_applications_deleted_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register job_alerts_applications_deleted_total");
    counter
});

/// Metric label for a matched route pattern. Anything outside the
/// service's own routes shares one label.
pub fn route_label(pattern: Option<&str>) -> &'static str {
    match pattern {
        Some("/api/v1/events") => "events",
        Some("/api/v1/schedules/{name}/run") => "schedule_run",
        Some("/health") => "health",
        Some("/metrics") => "metrics",
        _ => "unmatched",
    }
}

pub fn observe_http_request(route: &str, status: u16, elapsed: Duration) {
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[route, &status.to_string()])
        .observe(elapsed.as_secs_f64());
}

pub fn record_handler_outcome(trigger: &str, outcome: &str) {
    HANDLER_OUTCOMES_TOTAL
        .with_label_values(&[trigger, outcome])
        .inc();
}

pub fn record_push(category: &str, delivered: bool) {
    let result = if delivered { "sent" } else { "failed" };
    PUSHES_TOTAL.with_label_values(&[category, result]).inc();
}

/// One committed sweep batch
pub fn record_swept(jobs: usize, applications: usize) {
    JOBS_DELETED_TOTAL.inc_by(jobs as u64);
    APPLICATIONS_DELETED_TOTAL.inc_by(applications as u64);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;

/// Times every request under its [`route_label`]
pub struct RouteMetrics;

impl<S, B> Transform<S, ServiceRequest> for RouteMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RouteMetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RouteMetricsService {
            service: Rc::new(service),
        }))
    }
}

pub struct RouteMetricsService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RouteMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let route = route_label(req.match_pattern().as_deref());
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(_) => 500,
            };
            observe_http_request(route, status, start.elapsed());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_once() {
        record_handler_outcome("expiry_sweeper", "completed");
        record_handler_outcome("expiry_sweeper", "completed");
        record_push("new_job", true);
        record_swept(1, 3);

        let value = HANDLER_OUTCOMES_TOTAL
            .with_label_values(&["expiry_sweeper", "completed"])
            .get();
        assert!(value >= 2);
        assert!(JOBS_DELETED_TOTAL.get() >= 1);
    }

    #[test]
    fn test_route_labels() {
        assert_eq!(route_label(Some("/api/v1/events")), "events");
        assert_eq!(route_label(Some("/api/v1/schedules/{name}/run")), "schedule_run");
        assert_eq!(route_label(Some("/health")), "health");
        assert_eq!(route_label(Some("/metrics")), "metrics");
        assert_eq!(route_label(Some("/api/v1/schedules")), "unmatched");
        assert_eq!(route_label(None), "unmatched");
    }

    #[actix_web::test]
    async fn test_requests_are_timed_per_route() {
        use actix_web::{test, web, App};

        let app = test::init_service(
            App::new()
                .wrap(RouteMetrics)
                .service(
                    web::scope("/api/v1")
                        .route("/schedules/{name}/run", web::post().to(|| async { HttpResponse::Ok().finish() })),
                )
                .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let runs = || {
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&["schedule_run", "200"])
                .get_sample_count()
        };
        let strays = || {
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&["unmatched", "404"])
                .get_sample_count()
        };
        let (runs_before, strays_before) = (runs(), strays());

        for name in ["expire-jobs", "warn-expiring-jobs"] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/v1/schedules/{}/run", name))
                .to_request();
            test::call_service(&app, req).await;
        }
        let req = test::TestRequest::get().uri("/wp-login.php").to_request();
        test::call_service(&app, req).await;

        assert!(runs() >= runs_before + 2);
        assert!(strays() > strays_before);
    }
}
