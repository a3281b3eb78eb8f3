use async_trait::async_trait;
use common::config::PushConfig;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 单条推送消息
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub body: String,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

/// 推送服务返回的回执，只记录日志
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PushTicket {
    pub status: String,
    pub id: Option<String>,
    pub message: Option<String>,
}

/// 推送失败原因，不会转换为 AppError
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PushError {
    #[error("invalid push address: {0}")]
    InvalidAddress(String),
    #[error("push transport failed: {0}")]
    Transport(String),
    #[error("push provider rejected message: {0}")]
    Provider(String),
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// 返回结果与输入逐条对应
    async fn send(&self, messages: Vec<PushMessage>) -> Vec<Result<PushTicket, PushError>>;
}

pub fn is_push_address(address: &str) -> bool {
    lazy_static! {
        static ref PUSH_ADDRESS_RE: Regex = Regex::new(r"^Expo(nent)?PushToken\[.+\]$").expect("push address regex");
    }
    PUSH_ADDRESS_RE.is_match(address)
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
}

/// Expo 推送 HTTP 客户端，按 chunk_size 分批发送
#[derive(Debug, Clone)]
pub struct ExpoPushService {
    client: reqwest::Client,
    config: PushConfig,
}

impl ExpoPushService {
    pub fn new(config: PushConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PushError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn send_chunk(&self, chunk: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
        let mut request = self.client.post(&self.config.endpoint).header("Accept", "application/json").json(chunk);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| PushError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PushError::Transport(format!("HTTP {}", response.status())));
        }
        let body: ExpoResponse = response.json().await.map_err(|e| PushError::Provider(e.to_string()))?;
        Ok(body.data)
    }
}

#[async_trait]
impl PushSender for ExpoPushService {
    async fn send(&self, messages: Vec<PushMessage>) -> Vec<Result<PushTicket, PushError>> {
        let mut results: Vec<Result<PushTicket, PushError>> =
            messages.iter().map(|m| Err(PushError::InvalidAddress(m.to.clone()))).collect();

        let (indexes, valid): (Vec<usize>, Vec<PushMessage>) =
            messages.into_iter().enumerate().filter(|(_, m)| is_push_address(&m.to)).unzip();

        let chunk_size = self.config.chunk_size.max(1);
        for (chunk_indexes, chunk) in indexes.chunks(chunk_size).zip(valid.chunks(chunk_size)) {
            match self.send_chunk(chunk).await {
                Ok(tickets) => {
                    let mut tickets = tickets.into_iter();
                    for &i in chunk_indexes {
                        results[i] = match tickets.next() {
                            Some(t) if t.status == "error" => {
                                Err(PushError::Provider(t.message.unwrap_or_else(|| "unknown".to_string())))
                            }
                            Some(t) => Ok(t),
                            None => Err(PushError::Provider("missing ticket".to_string())),
                        };
                    }
                }
                Err(e) => {
                    for &i in chunk_indexes {
                        results[i] = Err(e.clone());
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_address_syntax() {
        assert!(is_push_address("ExponentPushToken[xxxxxxxxxxxxxxxxxxxxxx]"));
        assert!(is_push_address("ExpoPushToken[abc]"));
        assert!(!is_push_address("ExponentPushToken[]"));
        assert!(!is_push_address("not-a-token"));
    }

    #[tokio::test]
    async fn test_invalid_addresses_skip_network() {
        let config = PushConfig { endpoint: "http://127.0.0.1:9/unreachable".to_string(), ..Default::default() };
        let service = ExpoPushService::new(config).unwrap();
        let msg = PushMessage { to: "bogus".to_string(), body: "hi".to_string(), data: serde_json::Value::Null, sound: None };
        let results = service.send(vec![msg]).await;
        assert_eq!(results, vec![Err(PushError::InvalidAddress("bogus".to_string()))]);
    }
}
