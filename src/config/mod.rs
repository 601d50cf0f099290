//! 설정 모듈
//!
//! 환경변수에서 실행 설정을 읽습니다.
//! 값이 없으면 기본값을 사용하고, 잘못된 값은 에러로 처리합니다.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use url::Url;

/// 기본 생성 API 엔드포인트 (OpenAI 호환)
pub const DEFAULT_API_URL: &str = "https://api.perplexity.ai/chat/completions";

/// 기본 생성 모델
pub const DEFAULT_MODEL: &str = "sonar";

/// 기본 응답 최대 길이 (max_tokens)
pub const DEFAULT_MAX_RESPONSE_LENGTH: u32 = 500;

/// 기본 생성 요청 타임아웃 (초)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 기본 컨텍스트 문서 수
pub const DEFAULT_CONTEXT_DOCUMENTS: usize = 3;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.tech-assist/)
///
/// `TECH_ASSIST_HOME` 환경변수가 있으면 우선 사용합니다.
pub fn get_data_dir() -> PathBuf {
    if let Some(home) = non_empty_var("TECH_ASSIST_HOME") {
        return PathBuf::from(home);
    }

    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tech-assist")
}

// ============================================================================
// Config
// ============================================================================

/// 실행 설정
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// 데이터 루트 디렉토리
    pub data_dir: PathBuf,
    /// 기술 매뉴얼 디렉토리 (*.txt)
    pub documents_dir: PathBuf,
    /// 인텐트 키워드 테이블 경로 (JSON)
    pub intent_table_path: PathBuf,
    /// 생성 API 키 (없으면 생성 경로 비활성화)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// 생성 API 엔드포인트 (검증된 URL)
    pub api_url: String,
    /// 생성 모델 이름
    pub model: String,
    /// 응답 최대 길이 (max_tokens)
    pub max_response_length: u32,
    /// 생성 요청 타임아웃
    pub request_timeout: Duration,
    /// 그라운딩 컨텍스트에 포함할 문서 수
    pub context_documents: usize,
}

impl Config {
    /// 지정된 데이터 디렉토리 기준 기본 설정
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            documents_dir: data_dir.join("knowledge_base").join("technician_manuals"),
            intent_table_path: data_dir.join("models").join("intent_keywords.json"),
            data_dir,
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_response_length: DEFAULT_MAX_RESPONSE_LENGTH,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            context_documents: DEFAULT_CONTEXT_DOCUMENTS,
        }
    }

    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        let mut config = Self::with_data_dir(get_data_dir());

        if let Some(path) = non_empty_var("DOCUMENTS_PATH") {
            config.documents_dir = PathBuf::from(path);
        }

        if let Some(path) = non_empty_var("INTENT_TABLE_PATH") {
            config.intent_table_path = PathBuf::from(path);
        }

        config.api_key = non_empty_var("PERPLEXITY_API_KEY");

        if let Some(raw) = non_empty_var("PERPLEXITY_API_URL") {
            let url = Url::parse(&raw)
                .with_context(|| format!("Invalid PERPLEXITY_API_URL: {}", raw))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("PERPLEXITY_API_URL must be http(s): {}", raw);
            }
            config.api_url = url.to_string();
        }

        if let Some(model) = non_empty_var("PERPLEXITY_MODEL") {
            config.model = model;
        }

        if let Some(raw) = non_empty_var("MAX_RESPONSE_LENGTH") {
            config.max_response_length = raw
                .parse()
                .with_context(|| format!("Invalid MAX_RESPONSE_LENGTH: {}", raw))?;
        }

        if let Some(raw) = non_empty_var("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_timeout_secs(&raw)?;
        }

        if let Some(raw) = non_empty_var("CONTEXT_DOCUMENTS") {
            config.context_documents = raw
                .parse()
                .with_context(|| format!("Invalid CONTEXT_DOCUMENTS: {}", raw))?;
        }

        tracing::debug!("Loaded config: {:?}", config.data_dir);
        Ok(config)
    }

    /// 생성 API 사용 가능 여부
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 비어있지 않은 환경변수 값
fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 요청 타임아웃 파싱 (0초 거부)
fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("Invalid REQUEST_TIMEOUT_SECS: {}", raw))?;
    if secs == 0 {
        bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
    }
    Ok(Duration::from_secs(secs))
}

// ============================================================================
// Tests
// ============================================================================
