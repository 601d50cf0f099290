//! Retriever - 단어 집합 겹침 기반 문서 검색
//!
//! 쿼리와 문서를 소문자 단어 집합으로 바꾼 뒤
//! Jaccard 계수(|교집합| / |합집합|)로 점수를 매깁니다.
//! 의미 검색이 아니므로 유사어는 매칭되지 않습니다.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::store::{DocumentMetadata, DocumentStore};

/// 컨텍스트 블록 구분자
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

// ============================================================================
// Types
// ============================================================================

/// 검색 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub text: String,
    pub metadata: DocumentMetadata,
    /// 유사도 스코어 (0.0 ~ 1.0)
    pub similarity_score: f64,
    /// 정렬 후 순위 (1부터 시작)
    pub rank: usize,
}

// ============================================================================
// Retriever
// ============================================================================

/// 어휘 겹침 검색기
#[derive(Debug, Clone)]
pub struct Retriever {
    store: Arc<DocumentStore>,
}

impl Retriever {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// 상위 k개 문서 검색
    ///
    /// 겹치는 단어가 없는 문서는 결과에서 제외됩니다.
    /// 동점은 인덱스 순서를 유지합니다 (안정 정렬).
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        let query_words = word_set(query);
        if query_words.is_empty() || k == 0 {
            return vec![];
        }

        let index = self.store.snapshot();

        let mut scored: Vec<(f64, usize)> = index
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let overlap = query_words.intersection(&entry.words).count();
                if overlap == 0 {
                    return None;
                }
                let union = query_words.len() + entry.words.len() - overlap;
                Some((overlap as f64 / union as f64, i))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        tracing::debug!(
            "Retrieved {} documents for query ({} words)",
            scored.len(),
            query_words.len()
        );

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (score, i))| {
                let doc = &index.entries()[i].document;
                RetrievalResult {
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    similarity_score: score,
                    rank: rank + 1,
                }
            })
            .collect()
    }

    /// 검색 결과를 그라운딩 컨텍스트 문자열로 포맷
    ///
    /// 결과가 없으면 빈 문자열을 반환합니다.
    pub fn context_string(&self, query: &str, k: usize) -> String {
        format_context(&self.retrieve(query, k))
    }

    /// 내부 저장소 접근
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 소문자 공백 분리 단어 집합 (구두점 제거 없음)
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// 검색 결과를 `Source: {filename}\n{text}` 블록으로 연결
pub fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| format!("Source: {}\n{}", r.metadata.filename, r.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn retriever_with(docs: &[(&str, &str)]) -> (TempDir, Retriever) {
        let dir = TempDir::new().unwrap();
        for (name, text) in docs {
            std::fs::write(dir.path().join(name), text).unwrap();
        }
        let store = Arc::new(DocumentStore::new());
        store.load(dir.path()).unwrap();
        (dir, Retriever::new(store))
    }

    #[test]
    fn test_word_set_lowercases_and_keeps_punctuation() {
        let words = word_set("Motor troubleshooting: CHECK  power\tsupply");
        assert_eq!(words.len(), 5);
        assert!(words.contains("motor"));
        assert!(words.contains("troubleshooting:"));
        assert!(words.contains("check"));
    }

    #[test]
    fn test_jaccard_score() {
        let (_dir, retriever) =
            retriever_with(&[("motor.txt", "Motor troubleshooting: check power supply")]);

        let results = retriever.retrieve("motor power", 1);
        assert_eq!(results.len(), 1);
        // {motor, power} / {motor, power, troubleshooting:, check, supply}
        assert!((results[0].similarity_score - 2.0 / 5.0).abs() < 1e-9);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].metadata.filename, "motor.txt");
    }

    #[test]
    fn test_results_sorted_and_limited() {
        let (_dir, retriever) = retriever_with(&[
            ("a.txt", "pump seal leak inspection procedure for the plant"),
            ("b.txt", "pump seal"),
            ("c.txt", "hvac filter replacement"),
            ("d.txt", "pump"),
        ]);

        let results = retriever.retrieve("pump seal", 10);
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
        assert_eq!(results[0].metadata.filename, "b.txt");
        let ranks: Vec<_> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);

        let top = retriever.retrieve("pump seal", 2);
        assert_eq!(top.len(), 2);
        assert!(retriever.retrieve("pump seal", 0).is_empty());
    }

    #[test]
    fn test_ties_keep_document_order() {
        let (_dir, retriever) = retriever_with(&[
            ("a.txt", "valve check"),
            ("b.txt", "valve test"),
            ("c.txt", "valve open"),
        ]);

        let results = retriever.retrieve("valve", 3);
        let names: Vec<_> = results.iter().map(|r| r.metadata.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_no_overlap_returns_empty() {
        let (_dir, retriever) = retriever_with(&[("a.txt", "compressor oil level")]);
        assert!(retriever.retrieve("refrigerant leak", 3).is_empty());
        assert_eq!(retriever.context_string("refrigerant leak", 3), "");
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let (_dir, retriever) = retriever_with(&[("a.txt", "compressor oil level")]);
        assert!(retriever.retrieve("", 3).is_empty());
        assert!(retriever.retrieve("   ", 3).is_empty());
    }

    #[test]
    fn test_empty_store() {
        let retriever = Retriever::new(Arc::new(DocumentStore::new()));
        assert!(retriever.retrieve("motor", 3).is_empty());
        assert_eq!(retriever.context_string("motor", 3), "");
    }

    #[test]
    fn test_context_string_format() {
        let (_dir, retriever) = retriever_with(&[
            ("a.txt", "motor power check"),
            ("b.txt", "motor bearing"),
        ]);

        let context = retriever.context_string("motor power", 3);
        assert_eq!(
            context,
            "Source: a.txt\nmotor power check\n\n---\n\nSource: b.txt\nmotor bearing"
        );
    }

    #[test]
    fn test_store_accessor() {
        let store = Arc::new(DocumentStore::new());
        let retriever = Retriever::new(Arc::clone(&store));
        assert!(Arc::ptr_eq(retriever.store(), &store));
    }
}
