//! Assistant - 분류, 검색, 생성 컴포넌트 조립
//!
//! 전역 싱글톤 대신 명시적으로 생성한 컴포넌트를 주입받습니다.
//! 생성 프로바이더는 선택 사항이며, 없으면 LLM 경로가 규칙 기반으로 폴백합니다.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::error::{ServiceError, StoreError};
use crate::generation::{GenerationProvider, PerplexityClient};
use crate::intent::{ClassificationResult, IntentClassifier, ModelInfo, Route};
use crate::knowledge::{
    format_context, DocumentStore, KnowledgeStats, RetrievalResult, Retriever,
};

use super::responder::{CannedResponder, RuleResponder};

// ============================================================================
// Types
// ============================================================================

/// 실제로 사용된 응답 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 규칙 기반 응답
    RuleBased,
    /// 문서 검색 + LLM 생성
    Generated,
    /// LLM 경로였으나 규칙 기반으로 폴백
    Fallback,
}

/// 질문에 대한 응답
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub text: String,
    pub classification: ClassificationResult,
    pub strategy: Strategy,
    /// 그라운딩에 사용된 문서 파일 이름
    pub sources: Vec<String>,
    /// 폴백 사유 (Fallback일 때만)
    pub fallback_reason: Option<String>,
}

/// 전체 통계
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub knowledge: KnowledgeStats,
    pub classifier: ModelInfo,
    pub responder: String,
    pub generation_provider: Option<String>,
    pub model: String,
}

// ============================================================================
// Assistant
// ============================================================================

/// 기술자 지원 어시스턴트
pub struct Assistant {
    classifier: Arc<IntentClassifier>,
    retriever: Retriever,
    responder: Box<dyn RuleResponder>,
    generator: Option<Arc<dyn GenerationProvider>>,
    model: String,
    context_documents: usize,
}

impl Assistant {
    /// 컴포넌트로 생성 (생성 프로바이더 없음)
    pub fn new(
        classifier: Arc<IntentClassifier>,
        retriever: Retriever,
        responder: Box<dyn RuleResponder>,
    ) -> Self {
        Self {
            classifier,
            retriever,
            responder,
            generator: None,
            model: crate::config::DEFAULT_MODEL.to_string(),
            context_documents: crate::config::DEFAULT_CONTEXT_DOCUMENTS,
        }
    }

    /// 생성 프로바이더 지정
    pub fn with_generator(mut self, generator: Arc<dyn GenerationProvider>, model: &str) -> Self {
        self.generator = Some(generator);
        self.model = model.to_string();
        self
    }

    /// 그라운딩 컨텍스트 문서 수 지정
    pub fn with_context_documents(mut self, k: usize) -> Self {
        self.context_documents = k;
        self
    }

    /// 설정으로 전체 구성
    ///
    /// - 인텐트 테이블: 로드 실패 시 기본 테이블 (실패하지 않음)
    /// - 문서 디렉토리: 없으면 생성 후 인덱싱, 읽기 실패는 에러
    /// - 생성 API: 키가 없으면 비활성화 (LLM 경로는 폴백)
    pub fn bootstrap(config: &Config) -> Result<Self> {
        let classifier = Arc::new(IntentClassifier::load_or_default(
            config.intent_table_path.clone(),
        ));

        if !config.documents_dir.exists() {
            std::fs::create_dir_all(&config.documents_dir).with_context(|| {
                format!(
                    "Failed to create documents directory: {:?}",
                    config.documents_dir
                )
            })?;
        }

        let store = Arc::new(DocumentStore::new());
        store
            .load(&config.documents_dir)
            .context("Failed to index documents")?;

        let mut assistant = Self::new(
            classifier,
            Retriever::new(store),
            Box::new(CannedResponder::new()),
        )
        .with_context_documents(config.context_documents);

        match PerplexityClient::from_config(config) {
            Ok(client) => {
                tracing::info!("Generation enabled ({}, model={})", client.name(), config.model);
                assistant = assistant.with_generator(Arc::new(client), &config.model);
            }
            Err(ServiceError::NotConfigured(reason)) => {
                tracing::warn!("Generation disabled: {}", reason);
                assistant.model = config.model.clone();
            }
            Err(e) => return Err(e).context("Failed to create generation client"),
        }

        Ok(assistant)
    }

    /// 질문 분류
    pub fn classify(&self, text: &str) -> ClassificationResult {
        self.classifier.classify(text)
    }

    /// 문서 검색
    pub fn retrieve_context(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        self.retriever.retrieve(query, k)
    }

    /// 문서 재인덱싱 (실패 시 기존 인덱스 유지)
    pub fn index_documents(&self, path: &Path) -> Result<usize, StoreError> {
        self.retriever.store().load(path)
    }

    /// 분류기 재학습
    pub fn train(&self) -> bool {
        self.classifier.train()
    }

    /// 통계
    pub fn get_statistics(&self) -> Statistics {
        Statistics {
            knowledge: self.retriever.store().stats(),
            classifier: self.classifier.model_info(),
            responder: self.responder.name().to_string(),
            generation_provider: self.generator.as_ref().map(|g| g.name().to_string()),
            model: self.model.clone(),
        }
    }

    /// 내부 분류기 접근
    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// 질문에 응답 (분류 → 라우팅 → 응답)
    pub async fn ask(&self, query: &str) -> Reply {
        let classification = self.classify(query);

        match classification.route {
            Route::RuleBased => {
                let text = self.responder.respond(query, &classification);
                Reply {
                    text,
                    classification,
                    strategy: Strategy::RuleBased,
                    sources: vec![],
                    fallback_reason: None,
                }
            }
            Route::Llm => self.ask_llm(query, classification).await,
        }
    }

    /// LLM 경로: 컨텍스트 검색 + 생성, 실패 시 규칙 기반 폴백
    async fn ask_llm(&self, query: &str, classification: ClassificationResult) -> Reply {
        let Some(generator) = self.generator.as_ref() else {
            return self.fallback(query, classification, "generation service not configured");
        };

        let results = self.retriever.retrieve(query, self.context_documents);
        let context = format_context(&results);

        match generator.generate(query, &context, &self.model).await {
            Ok(text) => Reply {
                text,
                classification,
                strategy: Strategy::Generated,
                sources: results.into_iter().map(|r| r.metadata.filename).collect(),
                fallback_reason: None,
            },
            Err(e) => {
                tracing::warn!("Generation failed, falling back to rule-based: {}", e);
                self.fallback(query, classification, &e.reason())
            }
        }
    }

    fn fallback(&self, query: &str, classification: ClassificationResult, reason: &str) -> Reply {
        let text = self.responder.respond(query, &classification);
        Reply {
            text,
            classification,
            strategy: Strategy::Fallback,
            sources: vec![],
            fallback_reason: Some(reason.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
