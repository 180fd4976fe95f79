use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CostSource, CostSourceError};
use crate::config::CostSourceConfig;

/// Cost source backed by a billing export HTTP API.
///
/// Issues one `POST {base_url}/costs` per batch with the project ids in
/// the body and expects a JSON array of per-project totals.
pub struct HttpCostSource {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Serialize)]
struct CostQuery<'a> {
    projects: &'a [String],
}

#[derive(Deserialize)]
struct ProjectCost {
    project_id: String,
    cost: f64,
}

impl HttpCostSource {
    /// Build from configuration. Returns `NotConfigured` when no base
    /// URL is set.
    pub fn from_config(config: &CostSourceConfig) -> Result<Self, CostSourceError> {
        let base_url = config
            .base_url
            .as_ref()
            .ok_or(CostSourceError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl CostSource for HttpCostSource {
    async fn fetch_costs(
        &self,
        cloud_projects: &[String],
    ) -> Result<HashMap<String, f64>, CostSourceError> {
        if cloud_projects.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/costs", self.base_url);
        let mut request = self.client.post(&url).json(&CostQuery {
            projects: cloud_projects,
        });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CostSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let costs: Vec<ProjectCost> = response
            .json()
            .await
            .map_err(|e| CostSourceError::Decode(e.to_string()))?;

        Ok(costs
            .into_iter()
            .map(|c| (c.project_id, c.cost))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;

    fn config(base_url: String) -> CostSourceConfig {
        CostSourceConfig {
            base_url: Some(base_url),
            auth_token: Some("test-token".into()),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_fetch_costs() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/costs"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({"projects": ["proj-a", "proj-b"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"project_id": "proj-a", "cost": 12.5},
                {"project_id": "proj-b", "cost": 0.0},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpCostSource::from_config(&config(server.uri())).unwrap();
        let costs = source
            .fetch_costs(&["proj-a".into(), "proj-b".into()])
            .await
            .unwrap();

        assert_eq!(costs.get("proj-a"), Some(&12.5));
        assert_eq!(costs.get("proj-b"), Some(&0.0));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let server = MockServer::start().await;
        // No mock mounted: any request would fail the test via the error path.

        let source = HttpCostSource::from_config(&config(server.uri())).unwrap();
        let costs = source.fetch_costs(&[]).await.unwrap();
        assert!(costs.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/costs"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
            .mount(&server)
            .await;

        let source = HttpCostSource::from_config(&config(server.uri())).unwrap();
        let err = source.fetch_costs(&["proj-a".into()]).await.unwrap_err();

        match err {
            CostSourceError::Status { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unconfigured_is_error() {
        let result = HttpCostSource::from_config(&CostSourceConfig::default());
        assert!(matches!(result, Err(CostSourceError::NotConfigured)));
    }
}
