//! Azure Storage connection string parsing.
//!
//! Supported forms:
//! - `DefaultEndpointsProtocol=https;AccountName=..;AccountKey=..;EndpointSuffix=..`
//! - `BlobEndpoint=..;SharedAccessSignature=..`
//! - `UseDevelopmentStorage=true` (local emulator)

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use url::Url;

use crate::storage::StorageError;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Credential carried by a connection string.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Shared Key authentication with the base64 account key.
    SharedKey {
        /// Account key as found in the connection string.
        account_key: String,
    },
    /// SAS token, without the leading `?`.
    SasToken(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey { .. } => f.write_str("SharedKey(<redacted>)"),
            Self::SasToken(_) => f.write_str("SasToken(<redacted>)"),
        }
    }
}

/// Parsed Azure Storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    account_name: Option<String>,
    blob_endpoint: Url,
    credential: Credential,
}

impl ConnectionString {
    /// Parses a connection string.
    pub fn parse(input: &str) -> Result<Self, StorageError> {
        let mut protocol = "https".to_string();
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;
        let mut endpoint_suffix = DEFAULT_ENDPOINT_SUFFIX.to_string();
        let mut sas_token = None;
        let mut development = false;

        for part in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                return Err(StorageError::configuration(format!(
                    "malformed connection string segment '{part}'"
                )));
            };
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => protocol = value,
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "blobendpoint" => blob_endpoint = Some(value),
                "endpointsuffix" => endpoint_suffix = value,
                "sharedaccesssignature" => {
                    sas_token = Some(value.trim_start_matches('?').to_string());
                }
                "usedevelopmentstorage" => development = value.eq_ignore_ascii_case("true"),
                // queue/table/file endpoints and proxy settings do not apply to blobs
                _ => {}
            }
        }

        if development {
            account_name.get_or_insert_with(|| DEV_ACCOUNT_NAME.to_string());
            account_key.get_or_insert_with(|| DEV_ACCOUNT_KEY.to_string());
            blob_endpoint.get_or_insert_with(|| DEV_BLOB_ENDPOINT.to_string());
        }

        let endpoint = match (blob_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(account)) => format!("{protocol}://{account}.blob.{endpoint_suffix}"),
            (None, None) => {
                return Err(StorageError::configuration(
                    "connection string must contain AccountName or BlobEndpoint",
                ));
            }
        };
        let blob_endpoint = Url::parse(&endpoint).map_err(|e| {
            StorageError::configuration(format!("invalid blob endpoint '{endpoint}': {e}"))
        })?;

        let account_name = account_name.or_else(|| account_from_host(&blob_endpoint));

        let credential = match (account_key, sas_token) {
            (Some(key), _) => {
                BASE64_STANDARD
                    .decode(&key)
                    .map_err(|e| StorageError::configuration(format!("invalid AccountKey: {e}")))?;
                if account_name.is_none() {
                    return Err(StorageError::configuration(
                        "AccountKey requires AccountName",
                    ));
                }
                Credential::SharedKey { account_key: key }
            }
            (None, Some(token)) => Credential::SasToken(token),
            (None, None) => {
                return Err(StorageError::configuration(
                    "connection string must contain AccountKey or SharedAccessSignature",
                ));
            }
        };

        Ok(Self {
            account_name,
            blob_endpoint,
            credential,
        })
    }

    /// Storage account name, when known.
    #[must_use]
    pub fn account_name(&self) -> Option<&str> {
        self.account_name.as_deref()
    }

    /// Blob service endpoint.
    #[must_use]
    pub fn blob_endpoint(&self) -> &Url {
        &self.blob_endpoint
    }

    /// Credential used to sign requests.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `myaccount` from `myaccount.blob.core.windows.net`.
fn account_from_host(endpoint: &Url) -> Option<String> {
    let host = endpoint.host_str()?;
    let (account, rest) = host.split_once('.')?;
    rest.starts_with("blob.").then(|| account.to_string())
}
