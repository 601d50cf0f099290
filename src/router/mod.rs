//! Router 모듈 - 응답 전략 디스패치
//!
//! 분류 결과의 route에 따라 규칙 기반 응답기 또는
//! 문서 검색 + 생성 경로로 보냅니다.

mod assistant;
mod responder;

// Re-exports
pub use assistant::{Assistant, Reply, Statistics, Strategy};
pub use responder::{CannedResponder, RuleResponder};
