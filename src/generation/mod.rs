//! 생성 모듈 - 외부 LLM 호출
//!
//! 검색된 문서 컨텍스트와 질문을 OpenAI 호환 chat-completions API로 보내
//! 답변을 생성합니다. 기본 엔드포인트는 Perplexity입니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let client = PerplexityClient::from_config(&config)?;
//! let answer = client.generate("Why is my pump noisy?", &context, "sonar").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ServiceError;

// ============================================================================
// GenerationProvider Trait
// ============================================================================

/// 생성 프로바이더 트레이트
///
/// 실패는 `ServiceError`로 구분되어 "답 없음"과 섞이지 않습니다.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// 질문 + 그라운딩 컨텍스트로 답변 생성
    async fn generate(
        &self,
        prompt: &str,
        context: &str,
        model: &str,
    ) -> Result<String, ServiceError>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Perplexity (OpenAI-compatible) Client
// ============================================================================

/// 429/전송 에러 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 2;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 1000;

/// 기술자 지원 시스템 프롬프트
const SYSTEM_PROMPT: &str = "You are a technician support assistant for industrial \
equipment (motors, pumps, HVAC, compressors, valves, electrical systems). \
Give concise, step-by-step answers. Always mention relevant safety precautions \
such as lockout/tagout and PPE. When documentation is provided, base your answer on it \
and cite the source file names.";

/// OpenAI 호환 chat-completions 클라이언트
#[derive(Debug)]
pub struct PerplexityClient {
    api_key: String,
    api_url: String,
    max_tokens: u32,
    timeout: Duration,
    initial_backoff: Duration,
    client: reqwest::Client,
}

/// chat-completions 요청 본문
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// chat-completions 응답
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// API 에러 응답
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl PerplexityClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `api_key` - API 키
    /// * `api_url` - chat-completions 엔드포인트
    /// * `max_tokens` - 응답 최대 토큰 수
    /// * `timeout` - 요청 타임아웃 (호출자 지정)
    pub fn new(
        api_key: String,
        api_url: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::NotConfigured("empty API key".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_url,
            max_tokens,
            timeout,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            client,
        })
    }

    /// 재시도 초기 백오프 변경
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// 설정에서 생성 (API 키가 없으면 `NotConfigured`)
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ServiceError::NotConfigured("PERPLEXITY_API_KEY not set".to_string())
        })?;

        Self::new(
            api_key,
            config.api_url.clone(),
            config.max_response_length,
            config.request_timeout,
        )
    }

    /// 단일 요청 전송
    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        parse_response(status, &body)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl GenerationProvider for PerplexityClient {
    async fn generate(
        &self,
        prompt: &str,
        context: &str,
        model: &str,
    ) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model,
            messages: build_messages(prompt, context),
            max_tokens: self.max_tokens,
        };

        let mut attempt = 0;

        // 재시도 루프 (429/전송 에러 시 지수 백오프)
        loop {
            match self.send_once(&request).await {
                Ok(answer) => return Ok(answer),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let backoff = self.initial_backoff * 2u32.pow(attempt);
                    tracing::warn!(
                        "Generation failed ({}), retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        attempt + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        "perplexity"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 시스템 + 사용자 메시지 구성
fn build_messages(prompt: &str, context: &str) -> Vec<ChatMessage> {
    let user_content = if context.trim().is_empty() {
        prompt.to_string()
    } else {
        format!(
            "Technical documentation:\n\n{}\n\nQuestion: {}",
            context, prompt
        )
    };

    vec![
        ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: user_content,
        },
    ]
}

/// HTTP 상태 + 본문을 답변 또는 에러로 변환
fn parse_response(status: u16, body: &str) -> Result<String, ServiceError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ApiError>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());
        return Err(ServiceError::Http { status, message });
    }

    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let answer = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| ServiceError::InvalidResponse("no choices in response".to_string()))?;

    if answer.is_empty() {
        return Err(ServiceError::InvalidResponse("empty answer".to_string()));
    }

    Ok(answer)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const OK_BODY: &str = r#"{"choices":[{"message":{"role":"assistant","content":"done"}}]}"#;

    /// 요청마다 준비된 (상태, 본문)을 순서대로 응답하는 로컬 서버
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);

                let response = format!(
                    "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/chat/completions", addr), hits)
    }

    /// 헤더와 Content-Length 만큼의 본문을 읽음
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn local_client(url: String) -> PerplexityClient {
        PerplexityClient::new("test_key".to_string(), url, 50, Duration::from_secs(5))
            .unwrap()
            .with_initial_backoff(Duration::from_millis(10))
    }

    #[test]
    fn test_build_messages_with_context() {
        let messages = build_messages("Why is the pump noisy?", "Source: pump.txt\nCheck seals");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Source: pump.txt"));
        assert!(messages[1].content.ends_with("Question: Why is the pump noisy?"));
    }

    #[test]
    fn test_build_messages_without_context() {
        let messages = build_messages("Explain torque", "");
        assert_eq!(messages[1].content, "Explain torque");
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Check the seals. "}}]}"#;
        assert_eq!(parse_response(200, body).unwrap(), "Check the seals.");
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#;
        match parse_response(401, body) {
            Err(ServiceError::Http { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rate_limit_is_retryable() {
        let err = parse_response(429, "Too Many Requests").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_invalid_bodies() {
        assert!(matches!(
            parse_response(200, "not json"),
            Err(ServiceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(200, r#"{"choices":[]}"#),
            Err(ServiceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(200, r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#),
            Err(ServiceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_from_config_without_key() {
        let config = Config::with_data_dir(PathBuf::from("."));
        let result = PerplexityClient::from_config(&config);
        assert!(matches!(result, Err(ServiceError::NotConfigured(_))));
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let result = PerplexityClient::new(
            "  ".to_string(),
            "https://example.com".to_string(),
            100,
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_service_error() {
        let client = PerplexityClient::new(
            "fake_key".to_string(),
            "http://127.0.0.1:9/chat/completions".to_string(),
            50,
            Duration::from_millis(200),
        )
        .unwrap();

        let request = ChatRequest {
            model: "sonar",
            messages: build_messages("hi", ""),
            max_tokens: 50,
        };
        let err = client.send_once(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Transport(_) | ServiceError::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn test_generate_retries_rate_limit_then_succeeds() {
        let (url, hits) = serve(vec![(429, "slow down"), (200, OK_BODY)]).await;
        let client = local_client(url);

        let answer = client.generate("hi", "", "sonar").await.unwrap();
        assert_eq!(answer, "done");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generate_fails_fast_on_auth_error() {
        let body = r#"{"error":{"message":"bad key"}}"#;
        let (url, hits) = serve(vec![(401, body), (200, OK_BODY)]).await;
        let client = local_client(url);

        match client.generate("hi", "", "sonar").await {
            Err(ServiceError::Http { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_gives_up_after_max_retries() {
        let (url, hits) = serve(vec![(429, "slow down"); MAX_RETRIES as usize + 2]).await;
        let client = local_client(url);

        let err = client.generate("hi", "", "sonar").await.unwrap_err();
        assert!(matches!(err, ServiceError::Http { status: 429, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_RETRIES as usize + 1);
    }
}
