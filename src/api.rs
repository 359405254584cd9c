//! HTTP adapter for the QA backend.
//!
//! Classification of failures into [`QaError`] happens here, so the turn
//! controller only matches on the tagged variants and never inspects
//! transport details.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Fallback shown when the wait bound is exceeded.
const TIMEOUT_MESSAGE: &str = "请求超时，请稍后重试。如果问题持续，建议联系人工客服（电话：95588）。";
/// Fallback shown when a failure carries no usable message or detail.
const UNAVAILABLE_MESSAGE: &str = "抱歉，服务暂时不可用，请稍后重试。";

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

/// Successful answer from `POST /api/chat`. The backend also returns a
/// `confidence` score; it is not displayed, so unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Client-observed failure taxonomy. All variants are non-fatal to the
/// session; each maps to exactly one localized display string.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("request timed out")]
    Timeout,

    #[error("server error: {detail}")]
    Server { detail: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("unknown error")]
    Unknown,
}

impl QaError {
    /// Localized text appended to the chat when a turn fails.
    pub fn user_message(&self) -> String {
        match self {
            QaError::Timeout => TIMEOUT_MESSAGE.to_string(),
            QaError::Server { detail } => detail.clone(),
            QaError::Request(message) => format!("错误：{}", message),
            QaError::Unknown => UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

/// Displayed answer text: tagged with category and topic when the backend
/// classified the question, verbatim otherwise.
pub fn format_answer(answer: &ChatAnswer) -> String {
    match answer.topic.as_deref() {
        Some(topic) if !topic.is_empty() => {
            let category = answer.category.as_deref().unwrap_or("");
            format!("【{} - {}】\n\n{}", category, topic, answer.answer)
        }
        _ => answer.answer.clone(),
    }
}

#[derive(Clone)]
pub struct QaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl QaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// One question, one answer. The timeout is the sole wait bound; there
    /// are no retries and no cancellation.
    pub async fn ask(&self, question: &str) -> Result<ChatAnswer, QaError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, "sending question to QA backend");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { question })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            // Non-2xx with a machine-readable detail is shown verbatim.
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail);
            warn!(%status, ?detail, "QA backend returned an error status");
            return match detail {
                Some(detail) => Err(QaError::Server { detail }),
                None => Err(QaError::Request(format!("HTTP {}", status.as_u16()))),
            };
        }

        // The wait bound can also expire while the body is being read;
        // classify that as a timeout, not a generic failure.
        response
            .json::<ChatAnswer>()
            .await
            .map_err(classify_send_error)
    }

    /// Connectivity probe against the backend's health endpoint.
    pub async fn health(&self) -> Result<(), QaError> {
        let url = format!("{}/api/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(classify_send_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(QaError::Request(format!(
                "HTTP {}",
                response.status().as_u16()
            )))
        }
    }
}

fn classify_send_error(err: reqwest::Error) -> QaError {
    if err.is_timeout() {
        QaError::Timeout
    } else {
        let message = err.to_string();
        if message.is_empty() {
            QaError::Unknown
        } else {
            QaError::Request(message)
        }
    }
}
