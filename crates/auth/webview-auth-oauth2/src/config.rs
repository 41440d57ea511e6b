//! Client configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Unrecoverable configuration faults.
///
/// These indicate programmer or deployment error and are raised at the call
/// site; they are never delivered through the failure callback.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("client_id must not be empty")]
    MissingClientId,

    #[error("invalid {field} URL: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("malformed settings: {0}")]
    MalformedSettings(#[from] serde_json::Error),
}

/// Raw settings mapping as hosts supply it, e.g. parsed from a settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub authorize_uri: String,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub verbose: bool,
}

/// Validated client configuration; immutable once a flow owns it.
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorize_uri: Url,
    /// Token endpoint; `None` falls back to `authorize_uri`.
    pub token_uri: Option<Url>,
    /// Candidate redirect URIs, in preference order.
    pub redirect_uris: Vec<String>,
    pub scope: Option<String>,
    /// Extra parameters merged into every token-exchange body.
    pub extra_token_params: HashMap<String, String>,
    /// Gates the chattier `debug!` logging in the flows.
    pub verbose: bool,
}

impl ClientConfiguration {
    pub fn new(client_id: impl Into<String>, authorize_uri: Url) -> Result<Self, ConfigError> {
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }

        Ok(Self {
            client_id,
            client_secret: None,
            authorize_uri,
            token_uri: None,
            redirect_uris: Vec::new(),
            scope: None,
            extra_token_params: HashMap::new(),
            verbose: false,
        })
    }

    /// Builds a validated configuration from the raw settings mapping.
    pub fn from_settings(settings: serde_json::Value) -> Result<Self, ConfigError> {
        let settings: ClientSettings = serde_json::from_value(settings)?;

        let authorize_uri =
            Url::parse(&settings.authorize_uri).map_err(|source| ConfigError::InvalidUrl {
                field: "authorize_uri",
                source,
            })?;
        let token_uri = settings
            .token_uri
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|source| ConfigError::InvalidUrl {
                field: "token_uri",
                source,
            })?;

        let mut config = Self::new(settings.client_id, authorize_uri)?;
        config.client_secret = settings.client_secret;
        config.token_uri = token_uri;
        config.redirect_uris = settings.redirect_uris;
        config.scope = settings.scope;
        config.verbose = settings.verbose;

        Ok(config)
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_token_uri(mut self, uri: Url) -> Self {
        self.token_uri = Some(uri);
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_token_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extra_token_params.insert(key.into(), value.into());
        self
    }

    /// Token endpoint, falling back to the authorize endpoint when no
    /// dedicated one is configured.
    pub fn token_endpoint(&self) -> &Url {
        self.token_uri.as_ref().unwrap_or(&self.authorize_uri)
    }
}
