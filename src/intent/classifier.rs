//! Intent Classifier - 키워드 기반 인텐트 분류 및 라우팅 결정
//!
//! 인텐트별 키워드가 쿼리의 부분 문자열로 나타나면
//! `1 / 키워드 수`만큼 점수를 더합니다. 키워드가 적은(구체적인)
//! 인텐트일수록 히트당 가중치가 큽니다.
//!
//! 부분 문자열 매칭이므로 "pump"는 "pumpkin"에도 매칭됩니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::table::IntentTable;

/// 키워드가 하나도 매칭되지 않을 때의 인텐트
pub const UNCLEAR_INTENT: &str = "unclear";

/// 키워드가 하나도 매칭되지 않을 때의 신뢰도
pub const UNCLEAR_CONFIDENCE: f64 = 0.1;

/// 규칙 기반으로 처리하는 단순 인텐트
pub const SIMPLE_INTENTS: &[&str] = &[
    "greeting",
    "goodbye",
    "help",
    "simple_troubleshooting",
    "safety_query",
];

/// 단순 인텐트를 규칙 기반으로 보내는 최소 신뢰도 (초과)
const SIMPLE_INTENT_THRESHOLD: f64 = 0.5;
/// 이 값 미만이면 안전하게 규칙 기반으로 폴백
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.3;
/// 이 값을 초과하면 LLM 경로 사용
const LLM_THRESHOLD: f64 = 0.7;

// ============================================================================
// Types
// ============================================================================

/// 응답 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// 규칙/키워드 기반 응답
    RuleBased,
    /// 문서 검색 + 외부 LLM 생성
    Llm,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::RuleBased => "rule_based",
            Route::Llm => "llm",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 분류 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub intent: String,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    pub route: Route,
}

impl ClassificationResult {
    /// 매칭 실패 시 안전 기본값
    pub fn unclear() -> Self {
        Self {
            intent: UNCLEAR_INTENT.to_string(),
            confidence: UNCLEAR_CONFIDENCE,
            route: Route::RuleBased,
        }
    }
}

/// 테이블 로드 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSource {
    /// 저장된 파일에서 로드
    File,
    /// 파일이 없거나 손상되어 기본 테이블 사용
    Defaults,
}

/// 분류기 정보
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: &'static str,
    pub intent_categories: usize,
    pub intents: Vec<String>,
    pub model_exists: bool,
    pub model_path: PathBuf,
}

// ============================================================================
// Routing Policy
// ============================================================================

/// 인텐트와 신뢰도로 응답 전략 결정
///
/// `_text`는 받지만 사용하지 않습니다. 모든 비교는 엄격한 부등호입니다.
pub fn route(intent: &str, confidence: f64, _text: &str) -> Route {
    if SIMPLE_INTENTS.contains(&intent) && confidence > SIMPLE_INTENT_THRESHOLD {
        Route::RuleBased
    } else if confidence < LOW_CONFIDENCE_THRESHOLD {
        Route::RuleBased
    } else if confidence > LLM_THRESHOLD {
        Route::Llm
    } else {
        Route::RuleBased
    }
}

// ============================================================================
// IntentClassifier
// ============================================================================

/// 키워드 기반 인텐트 분류기
///
/// 테이블은 읽기 위주로 공유되며, `reset`/`load`는 새 테이블로 교체합니다.
#[derive(Debug)]
pub struct IntentClassifier {
    table: RwLock<Arc<IntentTable>>,
    model_path: PathBuf,
}

impl IntentClassifier {
    /// 지정된 테이블로 생성 (파일을 읽지 않음)
    pub fn with_table(table: IntentTable, model_path: impl Into<PathBuf>) -> Self {
        Self {
            table: RwLock::new(Arc::new(table)),
            model_path: model_path.into(),
        }
    }

    /// 저장된 테이블 로드, 없거나 손상되면 기본 테이블 생성 후 저장
    pub fn load_or_default(model_path: impl Into<PathBuf>) -> Self {
        let classifier = Self::with_table(IntentTable::default(), model_path);
        classifier.load();
        classifier
    }

    /// 파일에서 테이블 다시 로드
    ///
    /// 실패는 전파하지 않고 기본 테이블로 복구한 뒤 저장합니다.
    pub fn load(&self) -> TableSource {
        match IntentTable::read_from(&self.model_path) {
            Ok(table) => {
                tracing::info!(
                    "Intent table loaded from {:?} ({} intents)",
                    self.model_path,
                    table.len()
                );
                self.replace(table);
                TableSource::File
            }
            Err(e) => {
                tracing::warn!("Falling back to default intent table: {}", e);
                self.replace(IntentTable::default());
                if let Err(e) = self.save() {
                    tracing::error!("Failed to save intent table: {}", e);
                }
                TableSource::Defaults
            }
        }
    }

    /// 현재 테이블을 파일로 저장
    pub fn save(&self) -> std::io::Result<()> {
        self.table().write_to(&self.model_path)?;
        tracing::info!("Intent table saved to {:?}", self.model_path);
        Ok(())
    }

    /// 기본 테이블로 초기화 후 저장
    pub fn reset(&self) -> std::io::Result<()> {
        self.replace(IntentTable::default());
        self.save()
    }

    /// 재학습 (키워드 기반이므로 항상 성공하는 no-op)
    pub fn train(&self) -> bool {
        tracing::info!("Intent classifier training completed (keyword-based)");
        true
    }

    /// 텍스트 분류
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let table = self.table();
        let text_lower = text.to_lowercase();

        let mut best: Option<(&str, f64)> = None;

        for (intent, keywords) in table.iter() {
            let weight = 1.0 / keywords.len() as f64;
            let score: f64 = keywords
                .iter()
                .filter(|k| text_lower.contains(k.to_lowercase().as_str()))
                .map(|_| weight)
                .sum();

            if score <= 0.0 {
                continue;
            }

            // 동점이면 테이블 순서상 먼저 나온 인텐트 유지
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((intent, score)),
            }
        }

        let Some((intent, score)) = best else {
            return ClassificationResult::unclear();
        };

        let confidence = score.clamp(0.0, 1.0);
        let route = route(intent, confidence, &text_lower);

        tracing::debug!(
            "Classified as {} (confidence={:.3}, route={})",
            intent,
            confidence,
            route
        );

        ClassificationResult {
            intent: intent.to_string(),
            confidence,
            route,
        }
    }

    /// 현재 테이블 스냅샷
    pub fn table(&self) -> Arc<IntentTable> {
        let guard = self.table.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// 테이블 파일 경로
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// 분류기 정보
    pub fn model_info(&self) -> ModelInfo {
        let table = self.table();
        ModelInfo {
            model_type: "keyword-based classifier",
            intent_categories: table.len(),
            intents: table.intents().into_iter().map(String::from).collect(),
            model_exists: self.model_path.exists(),
            model_path: self.model_path.clone(),
        }
    }

    fn replace(&self, table: IntentTable) {
        let mut guard = self.table.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(table);
    }
}

// ============================================================================
// Tests
// ============================================================================
