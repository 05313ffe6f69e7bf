use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::license::{computer_name, machine_fingerprint, username};
use crate::auth::Authorization;
use crate::config::AuthorizationConfig;
use crate::errors::{AutoQuizError, AutoQuizResult};

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub user_id: String,
    pub computer_name: String,
    pub username: String,
}

impl UserInfo {
    pub fn current() -> Self {
        let fingerprint = machine_fingerprint();
        Self {
            user_id: fingerprint.chars().take(16).collect(),
            computer_name: computer_name(),
            username: username(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AccessRequest<'a> {
    app_name: &'a str,
    user_info: &'a UserInfo,
    request_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    #[serde(default)]
    access_granted: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Asks approval servers in order; the first grant wins.
pub struct RemoteAuthorization {
    client: reqwest::Client,
    servers: Vec<String>,
    app_name: String,
    user: UserInfo,
}

impl RemoteAuthorization {
    pub fn new(servers: Vec<String>, app_name: impl Into<String>, timeout: Duration, user: UserInfo) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "http client config rejected, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            servers,
            app_name: app_name.into(),
            user,
        }
    }

    pub fn from_config(config: &AuthorizationConfig) -> Self {
        Self::new(
            config.servers.clone(),
            config.app_name.clone(),
            Duration::from_secs(config.timeout_secs),
            UserInfo::current(),
        )
    }

    async fn ask(&self, server: &str) -> AutoQuizResult<bool> {
        let body = AccessRequest {
            app_name: &self.app_name,
            user_info: &self.user,
            request_type: "access_request",
        };
        let response = self.client.post(server).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(AutoQuizError::AuthorizationDenied(format!(
                "server answered {}",
                response.status()
            )));
        }
        let answer: AccessResponse = response.json().await?;
        if !answer.access_granted {
            tracing::info!(
                server = %server,
                reason = %answer.reason.as_deref().unwrap_or("access refused"),
                "access refused"
            );
        }
        Ok(answer.access_granted)
    }
}

#[async_trait]
impl Authorization for RemoteAuthorization {
    async fn is_authorized(&self) -> bool {
        for server in &self.servers {
            match self.ask(server).await {
                Ok(true) => {
                    tracing::info!(server = %server, "access granted");
                    return true;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(server = %server, error = %e, "approval server unavailable"),
            }
        }
        tracing::warn!(servers = self.servers.len(), "no approval server granted access");
        false
    }
}
