//! Home Assistant REST adapter
//!
//! Implements the state and notification ports against the hub's REST API
//! using a long-lived access token.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};
use warden_core::api_key::SecretApiKey;
use warden_core::ports::hub::{
    snapshot_from_states, EntitySnapshot, EntityState, HubError, NotificationPort, StatePort,
};

/// Service path used to create persistent notifications
pub const CREATE_NOTIFICATION_PATH: &str = "/api/services/persistent_notification/create";

#[derive(Debug, Serialize)]
struct CreateNotification<'a> {
    title: &'a str,
    message: &'a str,
}

/// REST client for a single Home Assistant instance
#[derive(Clone)]
pub struct HassRestAdapter {
    http: Client,
    base_url: String,
}

impl HassRestAdapter {
    /// Creates a client for `base_url`
    ///
    /// Without a token requests are sent unauthenticated, which the hub
    /// answers with 401.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<SecretApiKey>,
        timeout: Duration,
    ) -> Result<Self, HubError> {
        let mut headers = HeaderMap::new();
        match token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                    .map_err(|_| {
                        HubError::RequestFailed("hub token is not a valid header value".to_string())
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("No hub token configured, requests will be rejected"),
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::RequestFailed(format!("failed to create hub client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: Response) -> Result<Response, HubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!(status = status.as_u16(), "Hub rejected the access token");
                Err(HubError::Unauthorized)
            }
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!(status = status.as_u16(), body = %body, "Hub request failed");
                Err(HubError::UnexpectedStatus(status.as_u16(), body))
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> HubError {
    HubError::RequestFailed(e.to_string())
}

#[async_trait]
impl StatePort for HassRestAdapter {
    async fn get_states(&self) -> Result<EntitySnapshot, HubError> {
        debug!("Fetching all hub states");
        let response = self
            .http
            .get(self.url("/api/states"))
            .send()
            .await
            .map_err(transport_error)?;

        let states: Vec<EntityState> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| HubError::InvalidResponse(e.to_string()))?;

        debug!(count = states.len(), "Fetched hub states");
        Ok(snapshot_from_states(states))
    }

    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, HubError> {
        let response = self
            .http
            .get(self.url(&format!("/api/states/{}", entity_id)))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(entity_id, "Entity not found on hub");
            return Ok(None);
        }

        let state: EntityState = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| HubError::InvalidResponse(e.to_string()))?;

        Ok(Some(state))
    }
}

#[async_trait]
impl NotificationPort for HassRestAdapter {
    async fn create_notification(&self, title: &str, message: &str) -> Result<(), HubError> {
        let response = self
            .http
            .post(self.url(CREATE_NOTIFICATION_PATH))
            .json(&CreateNotification { title, message })
            .send()
            .await
            .map_err(transport_error)?;

        Self::check_status(response).await?;
        Ok(())
    }
}
