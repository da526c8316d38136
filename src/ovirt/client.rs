// HTTP implementation of the engine API
//
// Sessions authenticate against the engine SSO service with the password
// grant and then send the bearer token on every request. All calls are
// bounded by the per-call timeout given when the session is opened.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::model::{Api, Cluster, DataCenter, Host, StorageDomain, Vm};
use super::{ApiError, Connector, EngineApi};

const JSON: &str = "application/json";
const SSO_SCOPE: &str = "ovirt-app-api";

/// TLS trust settings for the engine connection
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM bundle with additional trusted CA certificates
    pub ca_bundle: Option<PathBuf>,

    /// Accept any server certificate
    pub insecure_skip_verify: bool,
}

/// Opens authenticated sessions with an oVirt Engine
pub struct EngineConnector {
    api_url: Url,
    endpoint: String,
    username: String,
    password: String,
    tls: TlsOptions,
}

impl EngineConnector {
    /// Creates a connector for the engine API at `api_url`
    /// (e.g. `https://engine.local/ovirt-engine/api`)
    pub fn new(
        api_url: &str,
        username: &str,
        password: &str,
        tls: TlsOptions,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(api_url).map_err(|e| ApiError::Url(format!("{}: {}", api_url, e)))?;
        if parsed.host_str().is_none() {
            return Err(ApiError::Url(format!("{}: missing host", api_url)));
        }

        Ok(EngineConnector {
            api_url: parsed,
            endpoint: api_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            tls,
        })
    }

    async fn http_client(&self, timeout: Duration) -> Result<reqwest::Client, ApiError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(format!("ovirt-metrics-collector/{}", env!("CARGO_PKG_VERSION")));

        if let Some(path) = &self.tls.ca_bundle {
            let pem = tokio::fs::read(path)
                .await
                .map_err(|source| ApiError::CaBundle {
                    path: path.display().to_string(),
                    source,
                })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        if self.tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[async_trait]
impl Connector for EngineConnector {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self, timeout: Duration) -> Result<Box<dyn EngineApi>, ApiError> {
        let http = self.http_client(timeout).await?;
        let token_url = sso_url(&self.api_url, "token");

        debug!("Requesting SSO token from {}", token_url);
        let response = http
            .post(token_url.clone())
            .header(ACCEPT, JSON)
            .form(&[
                ("grant_type", "password"),
                ("scope", SSO_SCOPE),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let token: TokenResponse = match serde_json::from_str(&body) {
            Ok(token) => token,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    url: token_url.to_string(),
                    body,
                })
            }
            Err(e) => return Err(ApiError::Decode(e)),
        };

        let access_token = match token.access_token {
            Some(access_token) if status.is_success() => access_token,
            _ => {
                let reason = token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| format!("SSO answered {} without a token", status));
                return Err(ApiError::Protocol(reason));
            }
        };

        debug!("Obtained SSO token from {}", token_url);

        Ok(Box::new(EngineClient {
            http,
            api_url: self.api_url.clone(),
            revoke_url: sso_url(&self.api_url, "revoke"),
            token: access_token,
        }))
    }
}

/// One authenticated engine session
pub struct EngineClient {
    http: reqwest::Client,
    api_url: Url,
    revoke_url: Url,
    token: String,
}

impl EngineClient {
    fn resource_url(&self, path: &str) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.resource_url(path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, JSON)
            .header("Version", "4")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Vec<T>>, ApiError> {
        let document = self.get_json(path, query).await?;
        extract_list(document, key)
    }
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn test(&self) -> Result<(), ApiError> {
        self.get_json("", &[]).await.map(|_| ())
    }

    async fn api(&self) -> Result<Api, ApiError> {
        Ok(serde_json::from_value(self.get_json("", &[]).await?)?)
    }

    async fn datacenters(&self) -> Result<Option<Vec<DataCenter>>, ApiError> {
        self.list("datacenters", "data_center", &[]).await
    }

    async fn clusters(&self) -> Result<Option<Vec<Cluster>>, ApiError> {
        self.list("clusters", "cluster", &[("follow", "gluster_volumes")])
            .await
    }

    async fn hosts(&self) -> Result<Option<Vec<Host>>, ApiError> {
        self.list("hosts", "host", &[]).await
    }

    async fn storage_domains(&self) -> Result<Option<Vec<StorageDomain>>, ApiError> {
        self.list("storagedomains", "storage_domain", &[]).await
    }

    async fn vms(&self) -> Result<Option<Vec<Vm>>, ApiError> {
        self.list("vms", "vm", &[]).await
    }

    async fn close(&self) {
        let result = self
            .http
            .post(self.revoke_url.clone())
            .header(ACCEPT, JSON)
            .form(&[("token", self.token.as_str()), ("scope", SSO_SCOPE)])
            .send()
            .await;
        match result {
            Ok(response) => debug!("SSO token revoked ({})", response.status()),
            Err(e) => debug!("Could not revoke SSO token: {}", e),
        }
    }
}

/// Builds the SSO service URL that sits next to the API path
fn sso_url(api_url: &Url, action: &str) -> Url {
    let path = api_url.path().trim_end_matches('/');
    let base = path.strip_suffix("/api").unwrap_or("/ovirt-engine");

    let mut url = api_url.clone();
    url.set_path(&format!("{}/sso/oauth/{}", base, action));
    url.set_query(None);
    url
}

/// Takes the collection element `key` out of a list document
///
/// The engine answers an empty collection with an empty object, so a missing
/// key is an empty list. `None` is returned only when the document is not an
/// object at all.
pub(crate) fn extract_list<T: DeserializeOwned>(
    mut document: Value,
    key: &str,
) -> Result<Option<Vec<T>>, ApiError> {
    let Some(object) = document.as_object_mut() else {
        return Ok(None);
    };
    match object.remove(key) {
        None | Some(Value::Null) => Ok(Some(Vec::new())),
        Some(items) => Ok(Some(serde_json::from_value(items)?)),
    }
}
