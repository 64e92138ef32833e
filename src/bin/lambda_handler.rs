//! AWS Lambda handler serving dashboard recomputes
//!
//! Loads the benefits table once per cold start and answers each request with
//! the indicators and chart tables for the posted filter selection.
//!
//! Supports Lambda Function URLs for direct HTTP access.
//! Accepts config via environment variables:
//!   DATASET_PATH (default: output/base_final.csv)

use aws_lambda_events::event::lambda_function_urls::LambdaFunctionUrlRequest;
use benefit_dashboard::dataset::DEFAULT_DATASET_PATH;
use benefit_dashboard::{
    Dashboard, DashboardReport, FilterOptions, FilterSelection, PresentationConfig, Selection,
};
use chrono::NaiveDate;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Filter selection posted by the dashboard page
#[derive(Debug, Default, Deserialize)]
pub struct DashboardRequest {
    /// First month; defaults to the earliest available month
    #[serde(default)]
    pub date_start: Option<NaiveDate>,

    /// Last month; defaults to the latest available month
    #[serde(default)]
    pub date_end: Option<NaiveDate>,

    /// Selected regions (absent = control never touched)
    #[serde(default)]
    pub regions: Option<Vec<String>>,

    /// Selected CID categories (absent = control never touched)
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

/// Output for one recompute
#[derive(Debug, Serialize)]
pub struct DashboardResponse<'a> {
    pub report: DashboardReport,
    pub options: &'a FilterOptions,
    pub presentation: &'a PresentationConfig,
    pub execution_time_ms: u64,
}

/// Function URL response envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UrlResponse {
    status_code: u16,
    headers: HashMap<&'static str, &'static str>,
    body: String,
}

fn cors_headers() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ])
}

fn error_response(status_code: u16, message: &str) -> UrlResponse {
    UrlResponse {
        status_code,
        headers: cors_headers(),
        body: serde_json::json!({ "error": message }).to_string(),
    }
}

fn json_response<T: Serialize>(body: &T) -> Result<UrlResponse, Error> {
    Ok(UrlResponse {
        status_code: 200,
        headers: cors_headers(),
        body: serde_json::to_string(body)?,
    })
}

/// Lambda handler function
async fn handler(
    dashboard: &Dashboard,
    presentation: &PresentationConfig,
    event: LambdaEvent<LambdaFunctionUrlRequest>,
) -> Result<UrlResponse, Error> {
    let start = std::time::Instant::now();
    let payload = event.payload;

    // Handle CORS preflight
    if payload.request_context.http.method.as_deref() == Some("OPTIONS") {
        return Ok(UrlResponse {
            status_code: 200,
            headers: cors_headers(),
            body: String::new(),
        });
    }

    if payload.is_base64_encoded {
        return Ok(error_response(400, "Binary request bodies are not supported"));
    }

    let body = payload.body.unwrap_or_default();
    let request: DashboardRequest = if body.trim().is_empty() {
        DashboardRequest::default()
    } else {
        match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => return Ok(error_response(400, &format!("Invalid JSON: {}", e))),
        }
    };

    let selection = match FilterSelection::resolve(
        dashboard.options(),
        request.date_start,
        request.date_end,
        Selection::from(request.regions),
        Selection::from(request.categories),
    ) {
        Ok(selection) => selection,
        Err(e) => {
            warn!("Rejected selection: {}", e);
            return Ok(error_response(400, &e.to_string()));
        }
    };

    let report = match dashboard.compute(&selection) {
        Ok(report) => report,
        Err(e) => return Ok(error_response(400, &e.to_string())),
    };

    let response = DashboardResponse {
        report,
        options: dashboard.options(),
        presentation,
        execution_time_ms: start.elapsed().as_millis() as u64,
    };

    json_response(&response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let dataset_path = env::var("DATASET_PATH").unwrap_or_else(|_| DEFAULT_DATASET_PATH.to_string());
    let dashboard = Dashboard::load(&dataset_path)?;
    info!("Serving {} rows from {}", dashboard.dataset().len(), dataset_path);

    let presentation = PresentationConfig::default();
    let dashboard = &dashboard;
    let presentation = &presentation;

    run(service_fn(move |event| async move {
        handler(dashboard, presentation, event).await
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use benefit_dashboard::{BenefitRecord, Dataset};
    use lambda_runtime::Context;
    use serde_json::Value;

    fn dashboard() -> Dashboard {
        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let july = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        Dashboard::new(Dataset::from_records(vec![
            BenefitRecord::new(june, 10.0, 100.0)
                .with_region("Norte")
                .with_category("Neoplasias")
                .with_sex("F"),
            BenefitRecord::new(july, 30.0, 200.0)
                .with_region("Sul")
                .with_category("Neoplasias")
                .with_sex("M"),
        ]))
    }

    fn event(method: &str, body: &str) -> LambdaEvent<LambdaFunctionUrlRequest> {
        let mut request = LambdaFunctionUrlRequest {
            body: Some(body.to_string()),
            is_base64_encoded: false,
            ..Default::default()
        };
        request.request_context.http.method = Some(method.to_string());
        LambdaEvent::new(request, Context::default())
    }

    async fn call(method: &str, body: &str) -> UrlResponse {
        handler(&dashboard(), &PresentationConfig::default(), event(method, body))
            .await
            .expect("handler failed")
    }

    #[tokio::test]
    async fn test_preflight_returns_empty_ok() {
        let response = call("OPTIONS", "").await;
        assert_eq!(response.status_code, 200);
        assert!(response.body.is_empty());
        assert_eq!(response.headers["Access-Control-Allow-Methods"], "POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_inverted_range_is_bad_request() {
        let response = call("POST", r#"{"date_start":"2024-07-01","date_end":"2024-06-01"}"#).await;
        assert_eq!(response.status_code, 400);

        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"], "start date 2024-07-01 is after end date 2024-06-01");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let response = call("POST", "{not json").await;
        assert_eq!(response.status_code, 400);
        assert!(response.body.contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_selection_returns_report() {
        let response = call("POST", r#"{"regions":["Sul"]}"#).await;
        assert_eq!(response.status_code, 200);

        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["report"]["row_count"], 1);
        assert_eq!(body["report"]["indicators"]["total_benefits"], 30.0);
        assert_eq!(body["options"]["regions"], serde_json::json!(["Norte", "Sul"]));
        assert_eq!(body["presentation"]["chart_height"], 450);
    }

    #[tokio::test]
    async fn test_empty_body_uses_full_range() {
        let response = call("POST", "").await;
        assert_eq!(response.status_code, 200);

        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["report"]["row_count"], 2);
        assert_eq!(body["report"]["indicators"]["distinct_months"], 2);
    }

    #[test]
    fn test_request_defaults_to_unset() {
        let request: DashboardRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.date_start, None);
        assert_eq!(Selection::from(request.regions), Selection::Unset);
    }

    #[test]
    fn test_request_with_cleared_regions() {
        let request: DashboardRequest = serde_json::from_str(
            r#"{"date_start":"2024-06-01","date_end":"2024-09-01","regions":[],"categories":["Neoplasias"]}"#,
        )
        .unwrap();

        assert_eq!(request.date_start, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(Selection::from(request.regions), Selection::none());
        assert_eq!(Selection::from(request.categories), Selection::subset(["Neoplasias"]));
    }

    #[test]
    fn test_error_response_body() {
        let response = error_response(400, "bad");
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, r#"{"error":"bad"}"#);
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    }
}
