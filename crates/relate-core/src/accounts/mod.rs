//! Account backends
//!
//! An [`Account`] is what callers hold on to: the same four operations
//! whether the DBMSs live on this machine or behind a remote service. The
//! backend is chosen once, from the environment configuration.

mod local;
mod remote;

pub use local::{AccessClaims, LocalAccount};
pub use remote::RemoteAccount;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::batch::BatchResult;
use crate::config::{EnvironmentConfig, EnvironmentKind};
use crate::environment::LocalEnvironment;
use crate::error::{RelateError, Result};

/// Credentials presented when requesting an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub scheme: String,
    pub principal: String,
    pub credentials: String,
}

impl AuthToken {
    pub fn basic(principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self {
            scheme: "basic".to_string(),
            principal: principal.into(),
            credentials: credentials.into(),
        }
    }
}

#[async_trait]
pub trait Account: Send + Sync {
    async fn start_dbmss(&self, ids: &[String]) -> BatchResult<String>;

    async fn stop_dbmss(&self, ids: &[String]) -> BatchResult<String>;

    async fn status_dbmss(&self, ids: &[String]) -> BatchResult<String>;

    /// Token an application presents to talk to `dbms_id`.
    async fn create_access_token(
        &self,
        app_id: &str,
        dbms_id: &str,
        auth: &AuthToken,
    ) -> Result<String>;
}

/// Build the account backend for `config`.
pub fn create_account(config: EnvironmentConfig) -> Result<Arc<dyn Account>> {
    match config.kind() {
        EnvironmentKind::Local => Ok(Arc::new(LocalAccount::new(Arc::new(LocalEnvironment::new(
            config,
        ))))),
        EnvironmentKind::Remote => {
            let url = config.remote_url().ok_or_else(|| {
                RelateError::InvalidArgument(format!(
                    "Environment {} has no remote_url",
                    config.id()
                ))
            })?;
            Ok(Arc::new(RemoteAccount::new(url)))
        }
    }
}
