//! HTTP access to the chat server.
//!
//! [`ChatApi`] is the seam between the controller and the network. The
//! production implementation is [`HttpChatApi`]; tests substitute their own.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    AddContactRequest, Contact, CurrentUser, Credentials, ErrorBody, Message, SendMessageRequest,
    TokenResponse,
};

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError>;

    async fn signup(&self, username: &str, password: &str) -> Result<(), ApiError>;

    async fn current_user(&self, token: &str) -> Result<CurrentUser, ApiError>;

    async fn contacts(&self, token: &str) -> Result<Vec<Contact>, ApiError>;

    async fn add_contact(&self, token: &str, username: &str) -> Result<(), ApiError>;

    /// Conversation with `contact_id`, in server order.
    async fn messages(&self, token: &str, contact_id: i64) -> Result<Vec<Message>, ApiError>;

    async fn send_message(
        &self,
        token: &str,
        receiver_username: &str,
        content: &str,
    ) -> Result<(), ApiError>;
}

/// [`ChatApi`] over JSON/HTTP with bearer-token auth
#[derive(Clone)]
pub struct HttpChatApi {
    base_url: String,
    client: Client,
}

impl HttpChatApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.server_url.clone(),
                source,
            })?;
        Ok(HttpChatApi {
            base_url: config.server_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, url: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        debug!("-> {}", url);
        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!("<- {} {}", status.as_u16(), url);
        if status.is_success() {
            return Ok(response);
        }

        // Prefer the server's own explanation over the status line
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail_text())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        warn!("Request to {} rejected with {}: {}", url, status.as_u16(), detail);

        Err(ApiError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    async fn get_authed<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .execute(&url, self.client.get(&url).bearer_auth(token))
            .await?;
        Self::json(&url, response).await
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let url = self.url("/login");
        let request = self
            .client
            .post(&url)
            .json(&Credentials { username, password });
        let response = self.execute(&url, request).await?;
        let token: TokenResponse = Self::json(&url, response).await?;
        Ok(token.access_token)
    }

    async fn signup(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = self.url("/signup");
        let request = self
            .client
            .post(&url)
            .json(&Credentials { username, password });
        self.execute(&url, request).await?;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<CurrentUser, ApiError> {
        self.get_authed(token, "/users/me").await
    }

    async fn contacts(&self, token: &str) -> Result<Vec<Contact>, ApiError> {
        self.get_authed(token, "/contacts").await
    }

    async fn add_contact(&self, token: &str, username: &str) -> Result<(), ApiError> {
        let url = self.url("/contacts/add");
        let request = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&AddContactRequest { username });
        self.execute(&url, request).await?;
        Ok(())
    }

    async fn messages(&self, token: &str, contact_id: i64) -> Result<Vec<Message>, ApiError> {
        self.get_authed(token, &format!("/messages/{}", contact_id))
            .await
    }

    async fn send_message(
        &self,
        token: &str,
        receiver_username: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        let url = self.url("/messages/send");
        let request = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&SendMessageRequest {
                receiver_username,
                content,
            });
        self.execute(&url, request).await?;
        Ok(())
    }
}
