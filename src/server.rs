// src/server.rs
// =============================================================================
// The HTTP surface: POST /scrape and GET /health.
//
// Request body (JSON):
//   { "domain": "example.com", "max_pages": 50, "extract_tables": false }
//   { "url": "https://example.com/page", "include_html": true }   (single page)
//
// Responses:
//   200 { "results": [PageRecord, ...] }
//   400 { "error": "..." }   malformed request (bad JSON, bad domain or URL)
//   504 { "error": "..." }   the request timeout passed
//   500 { "error": "..." }   anything else at request level
//
// Per-page failures are not HTTP errors: they are records with an "error"
// field inside a 200 response.
// =============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ScrapeJob, DEFAULT_MAX_PAGES};
use crate::pipeline::{normalize_domain, validate_page_url, Pipeline};
use crate::record::PageRecord;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeRequest {
    pub domain: Option<String>,
    pub url: Option<String>,
    pub max_pages: Option<usize>,
    #[serde(default)]
    pub extract_tables: bool,
    #[serde(default)]
    pub include_html: bool,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub results: Vec<PageRecord>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

impl ScrapeRequest {
    // Validates the body and turns it into a job
    //
    // Exactly one of `domain` and `url` must be given, and it has to be
    // usable: a bad domain or URL is the caller's mistake, not a server
    // error.
    pub fn into_job(self) -> Result<ScrapeJob> {
        let job = match (self.domain, self.url) {
            (Some(domain), None) => {
                let max_pages = self.max_pages.unwrap_or(DEFAULT_MAX_PAGES);
                ScrapeJob::crawl(normalize_domain(&domain)?, max_pages)
            }
            (None, Some(url)) => {
                if url.trim().is_empty() {
                    return Err(anyhow!("Missing URL in request body"));
                }
                ScrapeJob::single_page(validate_page_url(&url)?)
            }
            (Some(_), Some(_)) => {
                return Err(anyhow!("Provide either 'domain' or 'url', not both"));
            }
            (None, None) => {
                return Err(anyhow!("Missing 'domain' or 'url' in request body"));
            }
        };

        Ok(job
            .with_tables(self.extract_tables)
            .with_html(self.include_html))
    }
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/scrape", post(scrape))
        .route("/health", get(health))
        .with_state(pipeline)
}

// Binds the listener and serves until the process is stopped
pub async fn serve(pipeline: Arc<Pipeline>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, "server listening");
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    Ok(())
}

async fn scrape(
    State(pipeline): State<Arc<Pipeline>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    // axum's own rejection is plain text; answer in the {error} shape instead
    let Json(request) =
        body.map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    let job = request
        .into_job()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("{:#}", e)))?;
    info!(?job, "scrape requested");

    match pipeline.execute(&job).await {
        Ok(results) => Ok(Json(ScrapeResponse { results })),
        Err(e) => {
            let status = if e.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!(error = %format!("{:#}", e), "scrape request failed");
            Err(error_response(status, format!("{:#}", e)))
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, ScrapeMode};
    use crate::fetch::scripted::ScriptedRenderer;
    use std::time::Duration;

    fn request(json: serde_json::Value) -> ScrapeRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_domain_request_defaults_max_pages() {
        let job = request(serde_json::json!({ "domain": "https://example.com/" }))
            .into_job()
            .unwrap();
        assert_eq!(
            job.mode,
            ScrapeMode::DomainCrawl {
                domain: "example.com".to_string(),
                max_pages: 50
            }
        );
        assert!(!job.options.tables);
        assert!(!job.options.html);
    }

    #[test]
    fn test_url_request_is_single_page() {
        let job = request(serde_json::json!({
            "url": "https://example.com/a",
            "extract_tables": true
        }))
        .into_job()
        .unwrap();
        assert_eq!(
            job.mode,
            ScrapeMode::SinglePage {
                url: "https://example.com/a".to_string()
            }
        );
        assert!(job.options.tables);
    }

    #[test]
    fn test_invalid_requests_are_rejected() {
        assert!(request(serde_json::json!({})).into_job().is_err());
        assert!(request(serde_json::json!({ "domain": "" })).into_job().is_err());
        assert!(request(serde_json::json!({ "url": "  " })).into_job().is_err());
        assert!(request(serde_json::json!({ "url": "not a url" })).into_job().is_err());
        assert!(request(serde_json::json!({ "url": "ftp://example.com/" })).into_job().is_err());
        assert!(request(serde_json::json!({
            "domain": "example.com",
            "url": "https://example.com/"
        }))
        .into_job()
        .is_err());
    }

    #[test]
    fn test_response_shape() {
        let response = ScrapeResponse {
            results: vec![PageRecord::failure("https://example.com/", "boom")],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "results": [{ "url": "https://example.com/", "error": "boom" }] })
        );
    }

    // Serves the router on an ephemeral port and returns its base URL
    async fn spawn_server(renderer: ScriptedRenderer) -> String {
        let config = PipelineConfig {
            navigation_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_millis(300),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(&config, Arc::new(renderer)).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(Arc::new(pipeline))).await;
        });
        format!("http://{}", addr)
    }

    async fn post_scrape(base: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = reqwest::Client::new()
            .post(format!("{}/scrape", base))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        let text = response.text().await.unwrap();
        (status, serde_json::from_str(&text).unwrap())
    }

    fn renderer() -> ScriptedRenderer {
        ScriptedRenderer::new()
            .page("https://example.com/ok", "<title>Fine</title><p>Body</p>")
            .hanging("https://example.com/slow")
    }

    #[tokio::test]
    async fn test_scrape_returns_records() {
        let base = spawn_server(renderer()).await;

        let (status, body) = post_scrape(
            &base,
            r#"{"url": "https://example.com/ok", "include_html": true}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["title"], "Fine");
        assert!(body["results"][0]["html"].as_str().unwrap().contains("<p>Body</p>"));

        // A page that can't be rendered is a record, not an HTTP error
        let (status, body) = post_scrape(&base, r#"{"url": "https://example.com/missing"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["results"][0]["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_requests_are_400_with_error_body() {
        let base = spawn_server(renderer()).await;

        for body in [
            r#"{"url": "not a url"}"#,
            r#"{"url": "ftp://example.com/"}"#,
            r#"{"domain": ""}"#,
            r#"{"domain": "example.com", "url": "https://example.com/"}"#,
            r#"{}"#,
            "{not json",
        ] {
            let (status, response) = post_scrape(&base, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert!(response["error"].is_string(), "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_request_timeout_is_504() {
        let base = spawn_server(renderer()).await;

        let (status, body) = post_scrape(&base, r#"{"url": "https://example.com/slow"}"#).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["error"].as_str().unwrap().contains("did not finish"));
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_server(ScriptedRenderer::new()).await;
        let response = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.unwrap(), "ok");
    }
}
