//! 에러 타입
//!
//! 컴포넌트 경계에서 호출자에게 전달되는 에러만 정의합니다.
//! - StoreError: 문서 디렉토리 인덱싱 실패 (기존 인덱스는 유지)
//! - ModelLoadError: 인텐트 테이블 로드 실패 (기본 테이블로 복구)
//! - ServiceError: 외부 생성 API 실패 (규칙 기반 응답으로 폴백)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 문서 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document directory not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Failed to read document directory {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document index lock poisoned")]
    LockPoisoned,
}

/// 인텐트 테이블 로드 에러
///
/// 호출자에게 전파되지 않고 기본 테이블 폴백으로 처리됩니다.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Intent table not found: {0:?}")]
    Missing(PathBuf),

    #[error("Failed to read intent table {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse intent table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid intent table: {0}")]
    Invalid(String),
}

/// 외부 생성 서비스 에러
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Generation service not configured: {0}")]
    NotConfigured(String),

    #[error("Generation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation transport error: {0}")]
    Transport(String),

    #[error("Generation API error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// 에러 사유 (로그/응답 표시용)
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// 재시도 가능한 에러인지 여부 (429, 전송 에러, 타임아웃)
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Http { status, .. } => *status == 429,
            ServiceError::Transport(_) | ServiceError::Timeout(_) => true,
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ServiceError::Http {
            status: 429,
            message: "slow down".to_string()
        }
        .is_retryable());
        assert!(ServiceError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!ServiceError::Http {
            status: 401,
            message: "unauthorized".to_string()
        }
        .is_retryable());
        assert!(!ServiceError::InvalidResponse("empty".to_string()).is_retryable());
    }

    #[test]
    fn test_store_error_message() {
        let err = StoreError::NotFound(PathBuf::from("/missing"));
        assert!(err.to_string().contains("/missing"));
    }
}
