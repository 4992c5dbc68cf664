use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::{Account, AuthToken};
use crate::archive;
use crate::batch::BatchResult;
use crate::constants::SECRET_FILE;
use crate::environment::LocalEnvironment;
use crate::error::{RelateError, Result};

const TOKEN_ISSUER: &str = "relate";
const TOKEN_TTL_SECS: i64 = 60 * 60;
const SECRET_LEN: usize = 32;

/// Claims of a locally issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub iss: String,
    pub aud: Vec<String>,
    pub dbms: String,
    pub iat: i64,
    pub exp: i64,
}

/// Account for DBMSs managed on this machine.
#[derive(Clone)]
pub struct LocalAccount {
    environment: Arc<LocalEnvironment>,
}

impl LocalAccount {
    pub fn new(environment: Arc<LocalEnvironment>) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &LocalEnvironment {
        &self.environment
    }
}

#[async_trait]
impl Account for LocalAccount {
    async fn start_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.environment.start_dbmss(ids).await
    }

    async fn stop_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.environment.stop_dbmss(ids).await
    }

    async fn status_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.environment.status_dbmss(ids).await
    }

    /// Self-signed HS256 token; the credentials are not checked against the DBMS.
    #[instrument(skip(self, auth), fields(principal = %auth.principal))]
    async fn create_access_token(
        &self,
        app_id: &str,
        dbms_id: &str,
        auth: &AuthToken,
    ) -> Result<String> {
        if app_id.trim().is_empty() {
            return Err(RelateError::InvalidArgument("App id must be specified".to_string()));
        }
        self.environment.dbms_path(dbms_id)?;

        let secret = load_or_create_secret(&self.environment.config().paths().data).await?;
        let iat = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: auth.principal.clone(),
            iss: TOKEN_ISSUER.to_string(),
            aud: vec![app_id.to_string()],
            dbms: dbms_id.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&secret),
        )?;
        Ok(token)
    }
}

/// Signing secret for this environment, created on first use.
///
/// The secret is written to a 0600 staging file and hard-linked into place.
/// Concurrent first callers all get the secret whose link won.
pub(crate) async fn load_or_create_secret(data_root: &Path) -> Result<Vec<u8>> {
    let path = data_root.join(SECRET_FILE);
    if let Some(secret) = read_secret(&path).await? {
        return Ok(secret);
    }

    tokio::fs::create_dir_all(data_root)
        .await
        .map_err(|e| RelateError::io_at(data_root, e))?;

    let secret = generate_secret();
    let staging = archive::staging_dir(data_root, &format!("{}.secret", uuid::Uuid::new_v4()));
    let published = publish_secret(&staging, &path, &secret).await;
    let _ = tokio::fs::remove_file(&staging).await;

    match published {
        Ok(()) => {
            debug!("Created signing secret at {}", path.display());
            Ok(secret)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => read_secret(&path)
            .await?
            .ok_or_else(|| RelateError::Auth(format!("{} disappeared", path.display()))),
        Err(e) => Err(RelateError::io_at(&path, e)),
    }
}

async fn publish_secret(staging: &Path, path: &Path, secret: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(staging).await?;
    file.write_all(STANDARD.encode(secret).as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::hard_link(staging, path).await
}

async fn read_secret(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read_to_string(path).await {
        Ok(encoded) => STANDARD
            .decode(encoded.trim())
            .map(Some)
            .map_err(|e| RelateError::Auth(format!("{} is corrupt: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RelateError::io_at(path, e)),
    }
}

fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
