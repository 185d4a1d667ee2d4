use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use job_alerts_service::{
    handlers, jobs, metrics, AppContext, Config, TriggerRegistry,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=debug".into());

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app.log_format);

    tracing::info!(env = %config.app.env, "Starting job alerts service");

    let registry = Arc::new(
        TriggerRegistry::standard(&config).context("Failed to build trigger registry")?,
    );
    let scheduler_enabled = config.schedules.enabled;
    let schedules = jobs::configured_schedules(&config);
    let addr = format!("0.0.0.0:{}", config.app.port);

    let ctx = AppContext::from_config(config).context("Failed to initialize application context")?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let schedule_handles = if scheduler_enabled {
        jobs::spawn_schedules(schedules, registry.clone(), ctx.clone(), &shutdown_tx)
    } else {
        tracing::info!("In-process scheduler disabled, expecting external schedule ticks");
        Vec::new()
    };

    tracing::info!("Starting HTTP server on {}", addr);

    let app_ctx = web::Data::new(ctx.clone());
    let app_registry = web::Data::from(registry);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_ctx.clone())
            .app_data(app_registry.clone())
            .wrap(middleware::Logger::default())
            .wrap(metrics::RouteMetrics)
            .route("/", web::get().to(|| async { "Job Alerts Service v0.1" }))
            .configure(handlers::configure)
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run();

    // actix stops the server on ctrl-c; the schedule loops need their own signal
    server.await.context("HTTP server error")?;

    tracing::info!("HTTP server stopped, shutting down schedule loops");
    let _ = shutdown_tx.send(());
    for handle in schedule_handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Schedule loop panicked");
        }
    }

    ctx.shutdown();
    Ok(())
}
