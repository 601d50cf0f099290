//! Intent 모듈 - 키워드 기반 인텐트 분류
//!
//! - Table: 인텐트 → 키워드 목록 (JSON 저장, 순서 보존)
//! - Classifier: 점수 계산, 신뢰도, 응답 전략(route) 결정

mod classifier;
mod table;

// Re-exports
pub use classifier::{
    route, ClassificationResult, IntentClassifier, ModelInfo, Route, TableSource,
    SIMPLE_INTENTS, UNCLEAR_CONFIDENCE, UNCLEAR_INTENT,
};
pub use table::IntentTable;
