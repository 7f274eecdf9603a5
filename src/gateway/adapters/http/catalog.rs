//! HTTP client for the catalog API.

use super::{API_KEY_HEADER, segment, with_body};
use crate::gateway::domain::{
    ApiKeyInfo, CatalogPackage, PackageCreateRequest, PublishRequest, PublishStatus,
    PublishedVersion, RestOperation, UserInfo, VersionContent, VersionReferences,
};
use crate::gateway::ports::{CatalogGateway, CatalogGatewayError, CatalogGatewayResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Page size used when a version listing does not ask for one.
const DEFAULT_VERSIONS_LIMIT: u32 = 100;

#[derive(Deserialize)]
struct PackagesBody {
    #[serde(default)]
    packages: Vec<CatalogPackage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPackage {
    package_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishAccepted {
    #[serde(default)]
    publish_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishStatusQuery<'a> {
    publish_ids: &'a [String],
}

#[derive(Deserialize)]
struct VersionsBody {
    #[serde(default)]
    versions: Vec<PublishedVersion>,
}

#[derive(Deserialize)]
struct OperationsBody {
    #[serde(default)]
    operations: Vec<RestOperation>,
}

/// Catalog gateway backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCatalogGateway {
    client: Client,
    base_url: Arc<str>,
    api_key: String,
}

impl HttpCatalogGateway {
    /// Creates a client for the catalog at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogGatewayError::Transport`] when the TLS backend cannot
    /// be initialised.
    pub fn new(
        base_url: Arc<str>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> CatalogGatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CatalogGatewayError::transport)?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "calling catalog");
        self.client.get(url).header(API_KEY_HEADER, &self.api_key)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "calling catalog");
        self.client.post(url).header(API_KEY_HEADER, &self.api_key)
    }
}

/// Sends a lookup, mapping 404 to `None`.
async fn lookup<T: DeserializeOwned>(
    request: RequestBuilder,
    what: impl FnOnce() -> String,
) -> CatalogGatewayResult<Option<T>> {
    let response = send(request).await?;
    match response.status() {
        StatusCode::OK => decode(response).await.map(Some),
        StatusCode::NOT_FOUND => Ok(None),
        _ => Err(rejection(response, what()).await),
    }
}

async fn send(request: RequestBuilder) -> CatalogGatewayResult<Response> {
    request.send().await.map_err(CatalogGatewayError::transport)
}

async fn decode<T: DeserializeOwned>(response: Response) -> CatalogGatewayResult<T> {
    response.json().await.map_err(CatalogGatewayError::transport)
}

async fn rejection(response: Response, message: String) -> CatalogGatewayError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        error!(status = status.as_u16(), "catalog rejected the configured api key");
        return CatalogGatewayError::Unauthorized(status.as_u16());
    }
    let body = response.text().await.unwrap_or_default();
    CatalogGatewayError::Rejected {
        status: status.as_u16(),
        message: with_body(message, &body),
    }
}

fn publish_form(request: &PublishRequest) -> CatalogGatewayResult<Form> {
    let config = serde_json::to_string(&request.config).map_err(CatalogGatewayError::transport)?;
    let dependencies =
        serde_json::to_string(&request.dependencies).map_err(CatalogGatewayError::transport)?;
    let mut form = Form::new()
        .text("config", config)
        .text("clientBuild", request.client_build.to_string())
        .text("saveSources", request.save_sources.to_string())
        .text("dependencies", dependencies);
    if let Some(builder_id) = request.builder_id.as_ref().filter(|id| !id.is_empty()) {
        form = form.text("builderId", builder_id.clone());
    }
    if let Some(sources) = &request.sources {
        form = form.part("sources", Part::bytes(sources.clone()).file_name("sources.zip"));
    }
    Ok(form)
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn get_package(&self, package_id: &str) -> CatalogGatewayResult<Option<CatalogPackage>> {
        let request = self.get(&format!("/api/v2/packages/{}", segment(package_id)));
        lookup(request, || format!("failed to get package {package_id}"))
            .await
    }

    async fn find_package_by_service_name(
        &self,
        workspace_id: &str,
        service_name: &str,
    ) -> CatalogGatewayResult<Option<CatalogPackage>> {
        let request = self.get("/api/v2/packages").query(&[
            ("kind", "package"),
            ("serviceName", service_name),
            ("parentId", workspace_id),
            ("showAllDescendants", "true"),
        ]);
        let found: Option<PackagesBody> = lookup(request, || {
            format!("failed to get package by service name {service_name}")
        })
        .await?;
        let mut packages = found.map(|body| body.packages).unwrap_or_default();
        match packages.len() {
            0 => Ok(None),
            1 => Ok(packages.pop()),
            count => Err(CatalogGatewayError::Ambiguous(count)),
        }
    }

    async fn create_package(&self, request: &PackageCreateRequest) -> CatalogGatewayResult<String> {
        let response = send(self.post("/api/v2/packages").json(request)).await?;
        if response.status() != StatusCode::CREATED {
            let message = format!("failed to create package {}", request.package_id());
            return Err(rejection(response, message).await);
        }
        let created: CreatedPackage = decode(response).await?;
        Ok(created.package_id)
    }

    async fn publish(&self, request: &PublishRequest) -> CatalogGatewayResult<String> {
        let package_id = &request.config.package_id;
        let form = publish_form(request)?;
        let path = format!("/api/v2/packages/{}/publish", segment(package_id));
        let response = send(self.post(&path).multipart(form)).await?;
        match response.status() {
            StatusCode::ACCEPTED => {
                let accepted: PublishAccepted = decode(response).await?;
                Ok(accepted.publish_id)
            }
            StatusCode::NO_CONTENT => Ok(String::new()),
            _ => {
                let message = format!("failed to build and publish package {package_id}");
                Err(rejection(response, message).await)
            }
        }
    }

    async fn publish_statuses(
        &self,
        package_id: &str,
        publish_ids: &[String],
    ) -> CatalogGatewayResult<Vec<PublishStatus>> {
        let path = format!("/api/v2/packages/{}/publish/statuses", segment(package_id));
        let response = send(self.post(&path).json(&PublishStatusQuery { publish_ids })).await?;
        if response.status() != StatusCode::OK {
            let message = format!("failed to get build statuses for {publish_ids:?}");
            return Err(rejection(response, message).await);
        }
        decode(response).await
    }

    async fn get_version(
        &self,
        package_id: &str,
        version: &str,
    ) -> CatalogGatewayResult<Option<VersionContent>> {
        let path = format!(
            "/api/v3/packages/{}/versions/{}",
            segment(package_id),
            segment(version)
        );
        let request = self
            .get(&path)
            .query(&[("includeSummary", "true"), ("includeOperations", "true")]);
        let content: Option<VersionContent> = lookup(request, || {
            format!("failed to get version {version} for id {package_id}")
        })
        .await?;
        Ok(content.map(|mut folded| {
            folded.fold_operation_types();
            folded
        }))
    }

    async fn list_versions(
        &self,
        package_id: &str,
        page: u32,
        limit: u32,
    ) -> CatalogGatewayResult<Vec<PublishedVersion>> {
        let page_size = if limit == 0 { DEFAULT_VERSIONS_LIMIT } else { limit };
        let path = format!("/api/v3/packages/{}/versions", segment(package_id));
        let request = self.get(&path).query(&[
            ("sortBy", "createdAt".to_owned()),
            ("sortOrder", "desc".to_owned()),
            ("limit", page_size.to_string()),
            ("page", page.to_string()),
        ]);
        let body: Option<VersionsBody> =
            lookup(request, || format!("failed to get versions of {package_id}")).await?;
        Ok(body.map(|body| body.versions).unwrap_or_default())
    }

    async fn get_version_references(
        &self,
        package_id: &str,
        version: &str,
    ) -> CatalogGatewayResult<Option<VersionReferences>> {
        let path = format!(
            "/api/v3/packages/{}/versions/{}/references",
            segment(package_id),
            segment(version)
        );
        lookup(self.get(&path), || {
            format!("failed to get version references. version {version} for id {package_id}")
        })
        .await
    }

    async fn list_rest_operations(
        &self,
        package_id: &str,
        version: &str,
        limit: u32,
        page: u32,
    ) -> CatalogGatewayResult<Vec<RestOperation>> {
        let path = format!(
            "/api/v2/packages/{}/versions/{}/rest/operations",
            segment(package_id),
            segment(version)
        );
        let request = self.get(&path).query(&[
            ("includeData", "true".to_owned()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ]);
        let body: Option<OperationsBody> =
            lookup(request, || "failed to get version rest operations".to_owned()).await?;
        Ok(body.map(|body| body.operations).unwrap_or_default())
    }

    async fn get_api_key(&self, api_key_id: &str) -> CatalogGatewayResult<Option<ApiKeyInfo>> {
        let path = format!("/api/v1/auth/apiKey/{}", segment(api_key_id));
        lookup(self.get(&path), || "failed to get api-key info".to_owned())
            .await
    }

    async fn get_user(&self, user_id: &str) -> CatalogGatewayResult<Option<UserInfo>> {
        let path = format!("/api/v2/users/{}", segment(user_id));
        lookup(self.get(&path), || "failed to get user info".to_owned())
            .await
    }
}
