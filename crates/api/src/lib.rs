//! Resource-management API client.
//!
//! This module provides a lightweight client for the management endpoints the
//! discovery pipelines depend on. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Reading the bearer token from `FIELDSCOUT_ACCESS_TOKEN`
//! - Validating `FIELDSCOUT_ARM_BASE` and `FIELDSCOUT_SERVICE_HOST` for safety
//! - Folding every response into an [`ApiResponse`] with success metadata
//!
//! The primary entry point is [`ArmClient`]. Create an instance via
//! [`ArmClient::new_from_env`] and call the typed endpoint helpers.
//!
//! # Example
//!
//! ```ignore
//! use fieldscout_api::ArmClient;
//!
//! async fn keys() -> anyhow::Result<()> {
//!     let client = ArmClient::new_from_env()?;
//!     let response = client.list_storage_keys("/subscriptions/.../storageAccounts/acct").await?;
//!     println!("success: {}", response.metadata.success);
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use fieldscout_types::{AccountKeys, ApiResponse, BindingEnvelope, FunctionList, StorageCredential, StorageItem};
use fieldscout_util::{build_path, redact_sensitive};
use reqwest::{Client, Method, RequestBuilder, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const ARM_BASE_ENV: &str = "FIELDSCOUT_ARM_BASE";
pub const SERVICE_HOST_ENV: &str = "FIELDSCOUT_SERVICE_HOST";
pub const ACCESS_TOKEN_ENV: &str = "FIELDSCOUT_ACCESS_TOKEN";

pub const DEFAULT_ARM_BASE: &str = "https://management.azure.com";
pub const DEFAULT_SERVICE_HOST: &str = "https://functions.azure.com";

const STORAGE_API_VERSION: &str = "2019-06-01";
const WEBSITES_API_VERSION: &str = "2022-03-01";
const AUTHORIZATION_API_VERSION: &str = "2015-07-01";

/// Allowed hostnames or base domains for non-local base URLs. Subdomains are
/// also allowed.
const ALLOWED_AZURE_DOMAINS: &[&str] = &["azure.com", "azure.net", "windows.net", "usgovcloudapi.net", "chinacloudapi.cn"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Failure to reach the API at all. HTTP error statuses are not errors; they
/// surface as `metadata.success == false`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{command}: request failed: {source}")]
    Transport {
        command: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// One entry of the permissions listing for a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub not_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionList {
    #[serde(default)]
    pub value: Vec<PermissionGrant>,
}

/// Thin wrapper around a configured `reqwest::Client` for management access.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub base_url: String,
    pub service_host: String,
    pub http: Client,
    pub user_agent: String,
}

impl ArmClient {
    /// Construct a client from `FIELDSCOUT_*` environment variables.
    pub fn new_from_env() -> Result<Self> {
        let base_url = env::var(ARM_BASE_ENV).unwrap_or_else(|_| DEFAULT_ARM_BASE.into());
        let service_host = env::var(SERVICE_HOST_ENV).unwrap_or_else(|_| DEFAULT_SERVICE_HOST.into());
        let token = env::var(ACCESS_TOKEN_ENV).ok().filter(|token| !token.trim().is_empty());
        Self::new(base_url, service_host, token)
    }

    pub fn new(base_url: impl Into<String>, service_host: impl Into<String>, token: Option<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let service_host = service_host.into().trim_end_matches('/').to_string();
        validate_base_url(ARM_BASE_ENV, &base_url)?;
        validate_base_url(SERVICE_HOST_ENV, &service_host)?;

        let mut default_headers = header::HeaderMap::new();
        if let Some(token) = token {
            let mut value =
                header::HeaderValue::from_str(&format!("Bearer {token}")).context("access token is not a valid header value")?;
            value.set_sensitive(true);
            default_headers.insert(header::AUTHORIZATION, value);
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            service_host,
            http,
            user_agent: format!("fieldscout/0.1; {}", env::consts::OS),
        })
    }

    /// Build a request for a resource-id relative path against the management base.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");
        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Build a request against the function service host.
    pub fn service_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.service_host, path);
        debug!(%url, "building service request");
        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Send a request and fold the outcome into an [`ApiResponse`].
    pub async fn send_json<T: DeserializeOwned>(&self, command: &'static str, builder: RequestBuilder) -> Result<ApiResponse<T>, ApiError> {
        let response = builder.send().await.map_err(|source| ApiError::Transport { command, source })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| ApiError::Transport { command, source })?;

        if !status.is_success() {
            warn!(command, status = status.as_u16(), body = %redact_sensitive(&text), "request returned error status");
            let error = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
            return Ok(ApiResponse::failure(Some(status.as_u16()), Some(error)));
        }

        match serde_json::from_str::<T>(&text) {
            Ok(data) => {
                debug!(command, status = status.as_u16(), "request succeeded");
                let mut response = ApiResponse::success(data);
                response.metadata.status = Some(status.as_u16());
                Ok(response)
            }
            Err(error) => {
                warn!(command, %error, "response body did not match the expected shape");
                Ok(ApiResponse::failure(
                    Some(status.as_u16()),
                    Some(Value::String(format!("invalid response body: {error}"))),
                ))
            }
        }
    }

    pub async fn list_storage_keys(&self, account_id: &str) -> Result<ApiResponse<AccountKeys>, ApiError> {
        let path = format!("{account_id}/listKeys?api-version={STORAGE_API_VERSION}");
        self.send_json("listStorageKeys", self.request(Method::POST, &path)).await
    }

    pub async fn storage_containers(
        &self,
        account_name: &str,
        credential: &StorageCredential,
    ) -> Result<ApiResponse<Vec<StorageItem>>, ApiError> {
        let builder = self
            .service_request(Method::POST, "/api/getStorageContainers")
            .query(&[("accountName", account_name)])
            .json(credential);
        self.send_json("getStorageContainers", builder).await
    }

    pub async fn storage_file_shares(
        &self,
        account_name: &str,
        credential: &StorageCredential,
    ) -> Result<ApiResponse<Vec<StorageItem>>, ApiError> {
        let builder = self
            .service_request(Method::POST, "/api/getStorageFileShares")
            .query(&[("accountName", account_name)])
            .json(credential);
        self.send_json("getStorageFileShares", builder).await
    }

    pub async fn binding(&self, resource_id: &str, binding_id: &str) -> Result<ApiResponse<BindingEnvelope>, ApiError> {
        let binding_path = build_path("/host/default/bindings/{binding}", &[("binding", binding_id)]);
        let path = format!("{resource_id}{binding_path}?api-version={WEBSITES_API_VERSION}");
        self.send_json("getBinding", self.request(Method::GET, &path)).await
    }

    pub async fn functions(&self, resource_id: &str) -> Result<ApiResponse<FunctionList>, ApiError> {
        let path = format!("{resource_id}/functions?api-version={WEBSITES_API_VERSION}");
        self.send_json("getFunctions", self.request(Method::GET, &path)).await
    }

    pub async fn permissions(&self, scope: &str) -> Result<ApiResponse<PermissionList>, ApiError> {
        let path = format!("{scope}/providers/Microsoft.Authorization/permissions?api-version={AUTHORIZATION_API_VERSION}");
        self.send_json("getPermissions", self.request(Method::GET, &path)).await
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and host must be one of the allowed
///   Azure domains or a subdomain thereof
fn validate_base_url(variable: &str, base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid {} URL '{}': {}", variable, base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("{} must include a host", variable))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "{} must use https for non-localhost hosts; got '{}://'",
            variable,
            parsed_base_url.scheme()
        ));
    }

    let is_allowed_domain = ALLOWED_AZURE_DOMAINS.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.ends_with(&format!(".{}", allowed_domain))
    });
    if !is_allowed_domain {
        return Err(anyhow!(
            "{} host '{}' is not allowed; must be one of {:?} or a subdomain, or localhost",
            variable,
            host_name,
            ALLOWED_AZURE_DOMAINS
        ));
    }

    Ok(())
}
