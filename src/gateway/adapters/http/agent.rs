//! HTTP client for the agent API.

use super::{API_KEY_HEADER, segment, with_body};
use crate::gateway::domain::{AgentNamespaces, ServiceList, ServiceName};
use crate::gateway::ports::{AgentGateway, AgentGatewayError, AgentGatewayResult};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

/// Header carrying the api key through the agent proxy.
const PROXY_API_KEY_HEADER: &str = "X-Apihub-ApiKey";
/// Header an agent proxy sets when it could not relay a request.
const PROXY_ERROR_HEADER: &str = "X-Apihub-Proxy-Error";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceNamesBody {
    #[serde(default)]
    service_names: Vec<ServiceName>,
}

/// Agent gateway backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAgentGateway {
    client: Client,
    api_key: String,
}

impl HttpAgentGateway {
    /// Creates a client sending `api_key` on every call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentGatewayError::Transport`] when the TLS backend cannot
    /// be initialised.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> AgentGatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AgentGatewayError::transport)?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn send(&self, method: Method, url: &str) -> AgentGatewayResult<Response> {
        debug!(%method, url, "calling agent");
        self.client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(AgentGatewayError::transport)
    }
}

async fn rejection(response: Response, message: String) -> AgentGatewayError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        error!(status = status.as_u16(), "agent rejected the configured api key");
        return AgentGatewayError::Unauthorized(status.as_u16());
    }
    let body = response.text().await.unwrap_or_default();
    AgentGatewayError::Rejected {
        status: status.as_u16(),
        message: with_body(message, &body),
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn list_namespaces(&self, agent_url: &str) -> AgentGatewayResult<AgentNamespaces> {
        let response = self
            .send(Method::GET, &format!("{agent_url}/api/v1/namespaces"))
            .await?;
        match response.status() {
            StatusCode::OK => response.json().await.map_err(AgentGatewayError::transport),
            StatusCode::NOT_FOUND => Ok(AgentNamespaces::default()),
            _ => Err(rejection(response, "failed to get namespaces".to_owned()).await),
        }
    }

    async fn list_service_names(
        &self,
        agent_url: &str,
        namespace: &str,
    ) -> AgentGatewayResult<Vec<ServiceName>> {
        let url = format!("{agent_url}/api/v1/namespaces/{namespace}/serviceNames");
        let response = self.send(Method::GET, &url).await?;
        match response.status() {
            StatusCode::OK => {
                let body: ServiceNamesBody =
                    response.json().await.map_err(AgentGatewayError::transport)?;
                Ok(body.service_names)
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => {
                let message = format!("failed to get service names for namespace {namespace}");
                Err(rejection(response, message).await)
            }
        }
    }

    async fn start_discovery(
        &self,
        agent_url: &str,
        namespace: &str,
        workspace_id: &str,
        fail_on_error: bool,
    ) -> AgentGatewayResult<()> {
        let url = format!(
            "{agent_url}/api/v2/namespaces/{namespace}/workspaces/{workspace_id}/discover?failOnError={fail_on_error}"
        );
        let response = self.send(Method::POST, &url).await?;
        match response.status() {
            StatusCode::ACCEPTED | StatusCode::NOT_FOUND => Ok(()),
            _ => {
                let message = format!("failed to start discovery for namespace {namespace}");
                Err(rejection(response, message).await)
            }
        }
    }

    async fn list_services(
        &self,
        agent_url: &str,
        namespace: &str,
        workspace_id: &str,
    ) -> AgentGatewayResult<ServiceList> {
        let url =
            format!("{agent_url}/api/v3/namespaces/{namespace}/workspaces/{workspace_id}/services");
        let response = self.send(Method::GET, &url).await?;
        match response.status() {
            StatusCode::OK => response.json().await.map_err(AgentGatewayError::transport),
            StatusCode::NOT_FOUND => Ok(ServiceList::default()),
            _ => {
                let message = format!("failed to get services for namespace {namespace}");
                Err(rejection(response, message).await)
            }
        }
    }

    async fn fetch_specification(
        &self,
        agent_url: &str,
        namespace: &str,
        workspace_id: &str,
        service_id: &str,
        file_id: &str,
    ) -> AgentGatewayResult<Vec<u8>> {
        let url = format!(
            "{agent_url}/api/v2/namespaces/{namespace}/workspaces/{workspace_id}/services/{}/specs/{}",
            segment(service_id),
            segment(file_id),
        );
        let response = self.send(Method::GET, &url).await?;
        match response.status() {
            StatusCode::OK => response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(AgentGatewayError::transport),
            StatusCode::NOT_FOUND | StatusCode::FAILED_DEPENDENCY => {
                let body = response.text().await.unwrap_or_default();
                Err(AgentGatewayError::SpecificationNotFound(body))
            }
            _ => {
                let message = "failed to get service specification".to_owned();
                Err(rejection(response, message).await)
            }
        }
    }

    async fn probe_endpoint(
        &self,
        agent_url: &str,
        namespace: &str,
        service_id: &str,
        method: &str,
        path: &str,
    ) -> AgentGatewayResult<u16> {
        let http_method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(AgentGatewayError::transport)?;
        let url = format!(
            "{agent_url}/agents/agentId/namespaces/{}/services/{}/proxy/{}",
            segment(namespace),
            segment(service_id),
            path.strip_prefix('/').unwrap_or(path),
        );
        let response = self
            .client
            .request(http_method, &url)
            .header(PROXY_API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(AgentGatewayError::transport)?;
        let proxy_error = response
            .headers()
            .get(PROXY_ERROR_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());
        if let Some(proxy_error) = proxy_error {
            return Err(AgentGatewayError::Proxy(proxy_error.to_owned()));
        }
        Ok(response.status().as_u16())
    }
}
