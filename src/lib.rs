//! tech-assist - 기술자 지원 챗봇 코어
//!
//! 키워드 기반 인텐트 분류로 질문을 규칙 기반 응답 또는
//! 문서 검색(RAG) + 외부 LLM 생성 경로로 라우팅합니다.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod intent;
pub mod knowledge;
pub mod router;

// Re-exports
pub use config::{get_data_dir, Config};
pub use error::{ModelLoadError, ServiceError, StoreError};
pub use generation::{GenerationProvider, PerplexityClient};
pub use intent::{route, ClassificationResult, IntentClassifier, IntentTable, ModelInfo, Route};
pub use knowledge::{
    seed_sample_documents, Document, DocumentMetadata, DocumentStore, KnowledgeStats,
    RetrievalResult, Retriever,
};
pub use router::{Assistant, CannedResponder, Reply, RuleResponder, Statistics, Strategy};
