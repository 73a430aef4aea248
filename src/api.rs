use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::model::{Chat, Message, NewChat, OutgoingMessage, Reply};

/// The six endpoints the client consumes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_chats(&self) -> ApiResult<Vec<Chat>>;
    async fn create_chat(&self, chat: &NewChat) -> ApiResult<()>;
    async fn delete_chat(&self, chat_id: &str) -> ApiResult<()>;
    async fn chat_messages(&self, chat_id: &str) -> ApiResult<Vec<Message>>;
    async fn start_chat(&self, chat_id: &str) -> ApiResult<String>;
    async fn send_message(&self, chat_id: &str, message: &str) -> ApiResult<String>;
}

#[derive(Clone)]
pub struct TeyaClient {
    client: Client,
    base_url: String,
}

impl TeyaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn checked(url: &str, result: reqwest::Result<Response>) -> ApiResult<Response> {
        let response = result.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> ApiResult<T> {
        response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = Self::checked(&url, self.client.get(&url).send().await)?;
        Self::decode(&url, response).await
    }
}

#[async_trait]
impl ChatBackend for TeyaClient {
    async fn list_chats(&self) -> ApiResult<Vec<Chat>> {
        self.get_json("/api/chats").await
    }

    async fn create_chat(&self, chat: &NewChat) -> ApiResult<()> {
        let url = self.url("/api/chats");
        tracing::debug!(%url, id = %chat.id, "POST");
        Self::checked(&url, self.client.post(&url).json(chat).send().await)?;
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &str) -> ApiResult<()> {
        let url = self.url(&format!("/api/chats/{}", chat_id));
        tracing::debug!(%url, "DELETE");
        Self::checked(&url, self.client.delete(&url).send().await)?;
        Ok(())
    }

    async fn chat_messages(&self, chat_id: &str) -> ApiResult<Vec<Message>> {
        self.get_json(&format!("/api/chats/{}", chat_id)).await
    }

    async fn start_chat(&self, chat_id: &str) -> ApiResult<String> {
        let reply: Reply = self.get_json(&format!("/api/chats/{}/start", chat_id)).await?;
        Ok(reply.reply)
    }

    async fn send_message(&self, chat_id: &str, message: &str) -> ApiResult<String> {
        let url = self.url(&format!("/api/chats/{}/messages", chat_id));
        tracing::debug!(%url, "POST");
        let response = Self::checked(
            &url,
            self.client
                .post(&url)
                .json(&OutgoingMessage { message })
                .send()
                .await,
        )?;
        let reply: Reply = Self::decode(&url, response).await?;
        Ok(reply.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = TeyaClient::new("http://localhost:5000/");
        assert_eq!(client.url("/api/chats"), "http://localhost:5000/api/chats");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is essentially never listening for HTTP.
        let client = TeyaClient::new("http://127.0.0.1:9");
        let err = client.list_chats().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
