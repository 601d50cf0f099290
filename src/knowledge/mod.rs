//! Knowledge 모듈 - 기술 매뉴얼 지식베이스
//!
//! - Store: `*.txt` 문서를 메모리 인덱스로 로드 (원자적 교체)
//! - Retriever: 단어 집합 Jaccard 점수로 상위 k개 검색
//! - Samples: 초기 샘플 매뉴얼

mod retriever;
mod samples;
mod store;

// Re-exports
pub use retriever::{format_context, word_set, RetrievalResult, Retriever, CONTEXT_SEPARATOR};
pub use samples::{seed_sample_documents, SAMPLE_DOCUMENTS};
pub use store::{Document, DocumentIndex, DocumentMetadata, DocumentStore, KnowledgeStats};
