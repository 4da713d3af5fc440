use crate::bridge::model::{status_for, warnings_header, AnalyzeQuery, ErrorBody, HealthStatus};
use crate::workflow::runner::Runner;
use anyhow::Context;
use chrono::Utc;
use gnsscore::features::LayoutInfo;
use gnsscore::CancelFlag;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Raises the cancel flag unless disarmed, so a dropped request future
/// stops its blocking analysis at the next checkpoint.
struct CancelOnDrop(Option<CancelFlag>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0.take();
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.0.take() {
            flag.cancel();
        }
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// HTTP front end: `POST /analyze` and `GET /health`.
pub struct HttpBridge {
    runner: Runner,
    max_upload_bytes: u64,
}

impl HttpBridge {
    pub fn new(runner: Runner, max_upload_bytes: u64) -> Self {
        Self {
            runner,
            max_upload_bytes,
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let analyze = warp::path("analyze")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::query::<AnalyzeQuery>())
            .and(warp::body::content_length_limit(self.max_upload_bytes))
            .and(warp::body::bytes())
            .and(runner_filter.clone())
            .and_then(handle_analyze);

        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter)
            .map(|runner: Runner| {
                let analyzer = runner.analyzer();
                warp::reply::json(&HealthStatus {
                    status: "ok",
                    model_loaded: analyzer.has_model(),
                    feature_layout: LayoutInfo::current(),
                    metrics: analyzer.metrics(),
                })
                .into_response()
            });

        analyze.or(health).unify().recover(handle_rejection).unify()
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding HTTP bridge to {}", addr))?;
        log::info!("[bridge] listening on http://{}", bound);
        server.await;
        log::info!("[bridge] stopped");
        Ok(())
    }
}

async fn handle_analyze(query: AnalyzeQuery, body: Bytes, runner: Runner) -> Result<Response, Rejection> {
    let file_name = query.file_name().to_string();
    let cancel = CancelFlag::new();
    let guard = CancelOnDrop(Some(cancel.clone()));
    let analyzed_at = Utc::now();

    let task_name = file_name.clone();
    let joined = tokio::task::spawn_blocking(move || {
        runner.analyze(&task_name, &body, analyzed_at, &cancel)
    })
    .await;
    guard.disarm();

    let outcome = match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            log::warn!("[bridge] {}: {}", file_name, err);
            return Ok(json_error(status_for(&err), err.to_string()));
        }
        Err(err) => {
            log::error!("[bridge] {}: analysis task failed: {}", file_name, err);
            return Ok(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "analysis task failed",
            ));
        }
    };

    let body = match outcome.report.to_json() {
        Ok(body) => body,
        Err(err) => {
            return Ok(json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()));
        }
    };
    let reply = warp::reply::with_header(body, "content-type", "application/json");
    let reply = warp::reply::with_header(
        reply,
        "x-parse-errors",
        outcome.diagnostics.parse_errors.to_string(),
    );
    let reply = warp::reply::with_header(
        reply,
        "x-analysis-warnings",
        warnings_header(&outcome.diagnostics),
    );
    Ok(reply.into_response())
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let response = if rejection.is_not_found() {
        json_error(StatusCode::NOT_FOUND, "not found")
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        json_error(StatusCode::PAYLOAD_TOO_LARGE, "upload exceeds the size limit")
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        json_error(StatusCode::LENGTH_REQUIRED, "content-length required")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        json_error(StatusCode::BAD_REQUEST, format!("bad request: {:?}", rejection))
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_log, GeneratorConfig};
    use crate::workflow::config::WorkflowConfig;
    use gnsscore::features::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
    use std::path::Path;

    fn bridge(max_upload_bytes: u64) -> HttpBridge {
        let config = WorkflowConfig {
            model_path: Some(
                Path::new(env!("CARGO_MANIFEST_DIR")).join("../models/baseline-logreg.json"),
            ),
            ..Default::default()
        };
        HttpBridge::new(Runner::from_config(&config).unwrap(), max_upload_bytes)
    }

    #[tokio::test]
    async fn analyze_returns_report_with_diagnostic_headers() {
        let routes = bridge(1 << 20).routes();
        let mut log = build_log(&GeneratorConfig::default()).unwrap();
        log.push_str("$GPGGA,garbage*00\r\n");

        let response = warp::test::request()
            .method("POST")
            .path("/analyze?file_name=drive.nmea")
            .body(log)
            .reply(&routes)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-parse-errors"], "1");
        let report: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(report["meta"]["file_name"], "drive.nmea");
        assert_eq!(report["meta"]["sample_count"], 120);
        assert!(report["spoofing_score"].is_number());
    }

    #[tokio::test]
    async fn empty_upload_is_bad_request() {
        let routes = bridge(1 << 20).routes();
        let response = warp::test::request()
            .method("POST")
            .path("/analyze")
            .body("")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("upload.nmea"));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let routes = bridge(64).routes();
        let response = warp::test::request()
            .method("POST")
            .path("/analyze")
            .body(vec![b'$'; 1024])
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let routes = bridge(1 << 20).routes();
        warp::test::request()
            .method("POST")
            .path("/analyze")
            .body("")
            .reply(&routes)
            .await;
        let response = warp::test::request().path("/health").reply(&routes).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["processed"], 0);
        let layout = &body["feature_layout"];
        assert_eq!(layout["version"], FEATURE_VERSION);
        assert_eq!(layout["hash"], layout_hash());
        assert_eq!(layout["feature_names"].as_array().unwrap().len(), FEATURE_COUNT);
        assert_eq!(layout["feature_names"][0], "speed_mean_mps");
    }

    #[test]
    fn dropped_guard_cancels() {
        let flag = CancelFlag::new();
        drop(CancelOnDrop(Some(flag.clone())));
        assert!(flag.is_cancelled());

        let kept = CancelFlag::new();
        CancelOnDrop(Some(kept.clone())).disarm();
        assert!(!kept.is_cancelled());
    }
}
