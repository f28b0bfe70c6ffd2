//! API client for the capacity server

use anyhow::{Context, Result};
use capacity_lib::models::{CapacityReport, CapacityTrend};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Non-success response from the server
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

/// Report selection shared by every report-backed command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportQuery {
    pub report_date: Option<NaiveDate>,
    pub tenant: Option<String>,
}

/// Date range and tenant for the trend endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tenant: Option<String>,
}

/// API client for the capacity server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        // Keep any path prefix when joining relative endpoints
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ApiError { status, message }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    /// Fetch the full capacity report
    pub async fn report(&self, query: &ReportQuery) -> Result<CapacityReport> {
        let url = self.url_with_query(
            "api/v1/report",
            &[
                ("report_date", query.report_date.map(|d| d.to_string())),
                ("tenant", query.tenant.clone()),
            ],
        )?;
        self.get(url).await
    }

    /// Fetch capacity totals per reporting date
    pub async fn trend(&self, query: &TrendQuery) -> Result<CapacityTrend> {
        let url = self.url_with_query(
            "api/v1/trend",
            &[
                ("start_date", query.start_date.map(|d| d.to_string())),
                ("end_date", query.end_date.map(|d| d.to_string())),
                ("tenant", query.tenant.clone()),
            ],
        )?;
        self.get(url).await
    }

    /// Endpoint URL carrying only the parameters that are set
    fn url_with_query(&self, path: &str, params: &[(&str, Option<String>)]) -> Result<Url> {
        let mut url = self.url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                if let Some(value) = value {
                    pairs.append_pair(key, value);
                }
            }
        }
        // An empty query string would leave a dangling '?'
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    pub async fn report_dates(&self) -> Result<ReportDates> {
        self.get(self.url("api/v1/report-dates")?).await
    }

    pub async fn tenants(&self) -> Result<TenantList> {
        self.get(self.url("api/v1/tenants")?).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDates {
    pub latest: Option<NaiveDate>,
    pub report_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantList {
    pub tenants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use capacity_lib::models::{CapacitySnapshot, TenantMappingEntry, VolumeRecord};
    use capacity_lib::CapacityEngine;
    use mockito::Matcher;

    fn sample_report() -> CapacityReport {
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let snapshot = CapacitySnapshot {
            report_date: date,
            volumes: vec![VolumeRecord {
                pool_id: "pool-a".to_string(),
                storage_system_id: "sys-1".to_string(),
                report_date: date,
                volume_name: None,
                provisioned_capacity: Some(1000.0),
                used_capacity: Some(900.0),
                available_capacity: Some(100.0),
            }],
            system_savings: Vec::new(),
        };
        let mappings = vec![TenantMappingEntry {
            pool_id: "pool-a".to_string(),
            storage_system_id: "sys-1".to_string(),
            tenant_name: "Finance".to_string(),
        }];
        CapacityEngine::default().run(&snapshot, &mappings, None)
    }

    #[tokio::test]
    async fn test_report_sends_query_parameters() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::to_string(&sample_report()).unwrap();
        let mock = server
            .mock("GET", "/api/v1/report")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("report_date".into(), "2024-06-30".into()),
                Matcher::UrlEncoded("tenant".into(), "Finance".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report = client
            .report(&ReportQuery {
                report_date: NaiveDate::from_ymd_opt(2024, 6, 30),
                tenant: Some("Finance".to_string()),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(report.root().unwrap().total_capacity, 1000.0);
        assert_eq!(report.alerts.critical.len(), 1);
    }

    #[tokio::test]
    async fn test_report_without_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/report")
            .match_query(Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&sample_report()).unwrap())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        client.report(&ReportQuery::default()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/report")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "no capacity snapshot for 2024-05-31"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .report(&ReportQuery {
                report_date: NaiveDate::from_ymd_opt(2024, 5, 31),
                tenant: None,
            })
            .await
            .unwrap_err();

        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert!(api_error.is_not_found());
        assert_eq!(api_error.message, "no capacity snapshot for 2024-05-31");
    }

    #[tokio::test]
    async fn test_report_dates_and_tenants() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/report-dates")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"latest": "2024-06-30", "report_dates": ["2024-06-30", "2024-06-01"]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/tenants")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tenants": ["Finance", "Ops"]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let dates = client.report_dates().await.unwrap();
        assert_eq!(dates.latest, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(dates.report_dates.len(), 2);

        let tenants = client.tenants().await.unwrap();
        assert_eq!(tenants.tenants, vec!["Finance", "Ops"]);
    }

    #[tokio::test]
    async fn test_trend_sends_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/trend")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start_date".into(), "2024-06-01".into()),
                Matcher::UrlEncoded("end_date".into(), "2024-06-30".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "start_date": "2024-06-01",
                    "end_date": "2024-06-30",
                    "points": [
                        {
                            "report_date": "2024-06-30",
                            "total_capacity": 1000.0,
                            "used_capacity": 900.0,
                            "available_capacity": 100.0,
                            "utilization_pct": 90.0
                        }
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let trend = client
            .trend(&TrendQuery {
                start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
                tenant: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(trend.points.len(), 1);
        assert_eq!(trend.points[0].utilization_pct, 90.0);
        assert!(trend.tenant_filter.is_none());
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = ApiClient::new("http://capacity.example.com/insights").unwrap();
        assert_eq!(
            client.url("api/v1/report").unwrap().as_str(),
            "http://capacity.example.com/insights/api/v1/report"
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
