use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::{Account, AuthToken};
use crate::batch::BatchResult;
use crate::error::{RelateError, Result};

const START_DBMSS: &str =
    "mutation StartDbmss($dbmsIds: [String!]!) { startDbmss(dbmsIds: $dbmsIds) }";
const STOP_DBMSS: &str =
    "mutation StopDbmss($dbmsIds: [String!]!) { stopDbmss(dbmsIds: $dbmsIds) }";
const STATUS_DBMSS: &str =
    "query StatusDbmss($dbmsIds: [String!]!) { statusDbmss(dbmsIds: $dbmsIds) }";
const CREATE_ACCESS_TOKEN: &str = concat!(
    "mutation CreateAccessToken($appId: String!, $dbmsId: String!, $authToken: AuthTokenInput!) ",
    "{ createAccessToken(appId: $appId, dbmsId: $dbmsId, authToken: $authToken) }"
);

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Account whose DBMSs are managed by a remote service speaking GraphQL.
#[derive(Debug, Clone)]
pub struct RemoteAccount {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteAccount {
    pub fn new(remote_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: graphql_endpoint(remote_url),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        field: &str,
    ) -> Result<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelateError::Transport(format!(
                "{} returned status {}",
                self.endpoint, status
            )));
        }

        let body: GraphQlResponse = response.json().await?;
        extract_field(body, field)
    }

    /// The remote answers a batch in one response; a failed request fails every id.
    async fn batch(&self, query: &str, field: &str, ids: &[String]) -> BatchResult<String> {
        match self
            .request::<Vec<String>>(query, json!({ "dbmsIds": ids }), field)
            .await
        {
            Ok(results) if results.len() == ids.len() => results.into_iter().map(Ok).collect(),
            Ok(results) => ids
                .iter()
                .map(|_| {
                    Err(RelateError::Transport(format!(
                        "{} returned {} results for {} ids",
                        field,
                        results.len(),
                        ids.len()
                    )))
                })
                .collect(),
            Err(e) => {
                let message = e.to_string();
                ids.iter()
                    .map(|_| Err(RelateError::Transport(message.clone())))
                    .collect()
            }
        }
    }
}

fn graphql_endpoint(remote_url: &str) -> String {
    format!("{}/graphql", remote_url.trim_end_matches('/'))
}

fn extract_field<T: DeserializeOwned>(body: GraphQlResponse, field: &str) -> Result<T> {
    if !body.errors.is_empty() {
        let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(RelateError::Transport(messages.join("; ")));
    }
    let value = body
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .ok_or_else(|| RelateError::Transport(format!("response has no {} field", field)))?;
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl Account for RemoteAccount {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn start_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.batch(START_DBMSS, "startDbmss", ids).await
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn stop_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.batch(STOP_DBMSS, "stopDbmss", ids).await
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn status_dbmss(&self, ids: &[String]) -> BatchResult<String> {
        self.batch(STATUS_DBMSS, "statusDbmss", ids).await
    }

    #[instrument(skip(self, auth), fields(endpoint = %self.endpoint))]
    async fn create_access_token(
        &self,
        app_id: &str,
        dbms_id: &str,
        auth: &AuthToken,
    ) -> Result<String> {
        self.request(
            CREATE_ACCESS_TOKEN,
            json!({ "appId": app_id, "dbmsId": dbms_id, "authToken": auth }),
            "createAccessToken",
        )
        .await
    }
}
