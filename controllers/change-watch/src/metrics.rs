//! Prometheus metrics and the metrics/probe HTTP endpoint.

use crate::change::ChangeType;
use crate::error::ControllerError;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Counter of observed raw changes, labelled by kind and change type.
#[derive(Debug, Clone)]
pub struct ChangeMetrics {
    registry: Registry,
    events: IntCounterVec,
}

impl ChangeMetrics {
    /// # Errors
    ///
    /// Returns an error if the counter cannot be created or registered.
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();
        let events = IntCounterVec::new(
            Opts::new("changewatch_events_total", "Total number of observed resource changes"),
            &["resourceType", "eventType"],
        )?;
        registry.register(Box::new(events.clone()))?;
        Ok(Self { registry, events })
    }

    /// Counts one observed change, before any suppression.
    pub fn observe(&self, kind: &str, change_type: ChangeType) {
        self.events
            .with_label_values(&[kind, change_type.as_str()])
            .inc();
    }

    /// Current count for a (kind, change type) pair
    #[cfg(test)]
    pub fn count(&self, kind: &str, change_type: ChangeType) -> u64 {
        self.events
            .with_label_values(&[kind, change_type.as_str()])
            .get()
    }

    /// Renders all metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, ControllerError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// `/metrics` and `/healthz` routes
pub fn router(metrics: Arc<ChangeMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<ChangeMetrics>>) -> impl IntoResponse {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        ),
        Err(e) => {
            error!("Could not encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                e.to_string(),
            )
        }
    }
}

/// Serves the metrics endpoint on `addr` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(addr: String, metrics: Arc<ChangeMetrics>, shutdown: CancellationToken) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving metrics on {}", listener.local_addr()?);
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_counts_per_kind_and_type() {
        let metrics = ChangeMetrics::new().unwrap();
        metrics.observe("Pod", ChangeType::Create);
        metrics.observe("Pod", ChangeType::Create);
        metrics.observe("Pod", ChangeType::Delete);

        assert_eq!(metrics.count("Pod", ChangeType::Create), 2);
        assert_eq!(metrics.count("Pod", ChangeType::Delete), 1);
        assert_eq!(metrics.count("Node", ChangeType::Create), 0);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = ChangeMetrics::new().unwrap();
        metrics.observe("ConfigMap", ChangeType::Update);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"changewatch_events_total{eventType="update",resourceType="ConfigMap"} 1"#));
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let metrics = Arc::new(ChangeMetrics::new().unwrap());
        metrics.observe("Pod", ChangeType::Create);

        let response = router(Arc::clone(&metrics))
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("changewatch_events_total"));
    }

    #[tokio::test]
    async fn test_healthz_route() {
        let metrics = Arc::new(ChangeMetrics::new().unwrap());
        let response = router(metrics)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
