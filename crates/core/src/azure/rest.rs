//! Azure Blob Storage account client.
//!
//! Container creation goes through the Blob REST API with Shared Key or SAS
//! authentication; blob data operations go through the OpenDAL `azblob`
//! service.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use opendal::{Operator, services};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use sha2::Sha256;
use tracing::debug;
use url::Url;

use super::connection::{ConnectionString, Credential};
use super::service::{BlobService, BlobServiceConnector, ContainerHandle, ServiceError};
use crate::storage::StorageError;

/// Azure REST API version used for all requests.
const AZURE_API_VERSION: &str = "2023-11-03";

/// Connects to Azure Storage accounts.
#[derive(Debug, Clone)]
pub struct AzureConnector {
    client: reqwest::Client,
}

impl AzureConnector {
    /// Create a connector with its own HTTP client, using the transport's
    /// default timeouts.
    pub fn new() -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Create a connector sharing `client`, e.g. one configured with timeouts.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl BlobServiceConnector for AzureConnector {
    fn connect(&self, connection_string: &str) -> Result<Arc<dyn BlobService>, StorageError> {
        let connection = ConnectionString::parse(connection_string)?;
        debug!(
            endpoint = %connection.blob_endpoint(),
            account = connection.account_name().unwrap_or("-"),
            "Connecting to blob service"
        );
        Ok(Arc::new(AzureBlobService {
            client: self.client.clone(),
            connection,
        }))
    }
}

/// Blob service of one Azure Storage account.
#[derive(Debug)]
pub struct AzureBlobService {
    client: reqwest::Client,
    connection: ConnectionString,
}

impl AzureBlobService {
    /// `{endpoint}/{container}?restype=container`, SAS appended when used.
    fn container_url(&self, name: &str) -> Result<Url, ServiceError> {
        let mut url = self.connection.blob_endpoint().clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::Configuration("blob endpoint cannot be a base".into()))?
            .pop_if_empty()
            .push(name);
        match self.connection.credential() {
            Credential::SasToken(token) => url.set_query(Some(&format!("restype=container&{token}"))),
            Credential::SharedKey { .. } => url.set_query(Some("restype=container")),
        }
        Ok(url)
    }
}

#[async_trait]
impl BlobService for AzureBlobService {
    async fn create_container(&self, name: &str) -> Result<ContainerHandle, ServiceError> {
        let url = self.container_url(name)?;
        let date = rfc1123_date();

        let mut request = self
            .client
            .put(url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION)
            .header(CONTENT_LENGTH, 0);

        if let (Credential::SharedKey { account_key }, Some(account)) =
            (self.connection.credential(), self.connection.account_name())
        {
            let resource = format!("/{account}{}", url.path());
            let authorization = sign_container_request(
                account,
                account_key,
                "PUT",
                &date,
                &resource,
                &[("restype", "container")],
            )?;
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(container = name, "Created container");
            return self.container(name);
        }

        let code = response
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if status == StatusCode::CONFLICT && code == "ContainerAlreadyExists" {
            return Err(ServiceError::ContainerAlreadyExists(name.to_string()));
        }
        Err(ServiceError::Request {
            status: status.as_u16(),
            code,
        })
    }

    fn container(&self, name: &str) -> Result<ContainerHandle, ServiceError> {
        let endpoint = self.connection.blob_endpoint().as_str().trim_end_matches('/');
        let mut builder = services::Azblob::default()
            .container(name)
            .endpoint(endpoint);
        if let Some(account) = self.connection.account_name() {
            builder = builder.account_name(account);
        }
        builder = match self.connection.credential() {
            Credential::SharedKey { account_key } => builder.account_key(account_key),
            Credential::SasToken(token) => builder.sas_token(token),
        };

        let operator = Operator::new(builder)
            .map_err(|e| ServiceError::Configuration(e.to_string()))?
            .finish();
        Ok(ContainerHandle::new(name, operator))
    }
}

/// Current UTC date in RFC 1123 format for the `x-ms-date` header.
fn rfc1123_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Shared Key `Authorization` header for a body-less container-level request.
fn sign_container_request(
    account: &str,
    account_key: &str,
    method: &str,
    date: &str,
    canonicalized_resource: &str,
    query_params: &[(&str, &str)],
) -> Result<String, ServiceError> {
    let key_bytes = BASE64_STANDARD
        .decode(account_key)
        .map_err(|e| ServiceError::Configuration(format!("invalid account key: {e}")))?;

    let mut resource = canonicalized_resource.to_string();
    let mut sorted_params = query_params.to_vec();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));
    for (k, v) in &sorted_params {
        resource.push('\n');
        resource.push_str(&k.to_lowercase());
        resource.push(':');
        resource.push_str(v);
    }

    // VERB, then eleven empty standard headers (Content-Length is empty for zero)
    let string_to_sign = format!(
        "{method}\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:{AZURE_API_VERSION}\n{resource}"
    );

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(&key_bytes)
        .map_err(|e| ServiceError::Configuration(format!("HMAC key error: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!("SharedKey {account}:{signature}"))
}
