//! Document Store - 메모리 기반 문서 인덱스
//!
//! 디렉토리의 `*.txt` 파일을 읽어 순서가 있는 문서 컬렉션으로 유지합니다.
//! 재인덱싱은 새 인덱스를 완전히 만든 뒤 참조만 교체하므로
//! 동시 읽기에서 중간 상태가 노출되지 않습니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::StoreError;

use super::retriever::word_set;

/// 인덱싱 대상 확장자
const DOCUMENT_EXTENSION: &str = "txt";

// ============================================================================
// Types
// ============================================================================

/// 문서 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// 파일 이름 (인용 라벨로 사용)
    pub filename: String,
    /// 원본 파일 경로
    pub source_path: String,
}

/// 인덱싱된 문서
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// 검색용 단어 집합이 함께 저장된 문서
#[derive(Debug, Clone)]
pub(crate) struct IndexedDocument {
    pub(crate) document: Document,
    pub(crate) words: HashSet<String>,
}

/// 불변 문서 인덱스 스냅샷
#[derive(Debug, Default)]
pub struct DocumentIndex {
    entries: Vec<IndexedDocument>,
    source_dir: Option<PathBuf>,
    indexed_at: Option<DateTime<Utc>>,
    fingerprint: String,
}

impl DocumentIndex {
    /// 문서 목록으로 인덱스 생성
    fn build(documents: Vec<Document>, source_dir: PathBuf) -> Self {
        let mut hasher = Sha256::new();
        for doc in &documents {
            hasher.update(doc.metadata.filename.as_bytes());
            hasher.update([0u8]);
            hasher.update(doc.text.as_bytes());
            hasher.update([0u8]);
        }

        let entries = documents
            .into_iter()
            .map(|document| IndexedDocument {
                words: word_set(&document.text),
                document,
            })
            .collect();

        Self {
            entries,
            source_dir: Some(source_dir),
            indexed_at: Some(Utc::now()),
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    pub(crate) fn entries(&self) -> &[IndexedDocument] {
        &self.entries
    }

    /// 인덱스 순서대로 문서 반복
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().map(|e| &e.document)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 내용 지문 (파일 이름 + 본문, 순서 반영 SHA-256)
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// 지식베이스 통계
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub total_documents: usize,
    /// 청킹을 하지 않으므로 문서 수와 같음
    pub total_chunks: usize,
    pub total_content_bytes: usize,
    pub source_dir: Option<PathBuf>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub fingerprint: String,
    pub retrieval_method: &'static str,
}

// ============================================================================
// DocumentStore
// ============================================================================

/// 문서 저장소
///
/// 읽기는 스냅샷(`Arc<DocumentIndex>`)을 통해 이루어지며,
/// `load`는 새 인덱스를 만든 뒤 원자적으로 교체합니다.
#[derive(Debug, Default)]
pub struct DocumentStore {
    index: RwLock<Arc<DocumentIndex>>,
}

impl DocumentStore {
    /// 빈 저장소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 디렉토리 인덱싱 (기존 인덱스 교체)
    ///
    /// 개별 파일 읽기 실패는 건너뛰고 로그만 남깁니다.
    /// 디렉토리 자체를 읽을 수 없으면 `StoreError`를 반환하며
    /// 이때 기존 인덱스는 그대로 유지됩니다.
    ///
    /// # Returns
    /// 인덱싱된 문서 수
    pub fn load(&self, directory: &Path) -> Result<usize, StoreError> {
        let documents = read_documents(directory)?;
        let index = Arc::new(DocumentIndex::build(documents, directory.to_path_buf()));
        let count = index.len();

        {
            let mut guard = self.index.write().map_err(|_| StoreError::LockPoisoned)?;
            *guard = index;
        }

        tracing::info!("Indexed {} documents from {:?}", count, directory);
        Ok(count)
    }

    /// 현재 인덱스 스냅샷
    pub fn snapshot(&self) -> Arc<DocumentIndex> {
        // 교체만 일어나는 락이므로 poison 상태여도 마지막 인덱스는 온전함
        let guard = self.index.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// 현재 문서 수
    pub fn count(&self) -> usize {
        self.snapshot().len()
    }

    /// 저장소 통계
    pub fn stats(&self) -> KnowledgeStats {
        let index = self.snapshot();

        KnowledgeStats {
            total_documents: index.len(),
            total_chunks: index.len(),
            total_content_bytes: index.documents().map(|d| d.text.len()).sum(),
            source_dir: index.source_dir.clone(),
            indexed_at: index.indexed_at,
            fingerprint: index.fingerprint.clone(),
            retrieval_method: "lexical word overlap (jaccard)",
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 디렉토리에서 문서 읽기 (비재귀, 파일 이름 사전순)
fn read_documents(directory: &Path) -> Result<Vec<Document>, StoreError> {
    if !directory.exists() {
        return Err(StoreError::NotFound(directory.to_path_buf()));
    }

    if !directory.is_dir() {
        return Err(StoreError::NotADirectory(directory.to_path_buf()));
    }

    // 디렉토리 읽기 권한 확인
    std::fs::read_dir(directory).map_err(|source| StoreError::Unreadable {
        path: directory.to_path_buf(),
        source,
    })?;

    let walker = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut documents = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Failed to read entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_document(entry.path()) {
            continue;
        }

        let path = entry.path();
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        documents.push(Document {
            text,
            metadata: DocumentMetadata {
                filename: entry.file_name().to_string_lossy().into_owned(),
                source_path: path.display().to_string(),
            },
        });
    }

    Ok(documents)
}

/// `*.txt` 파일 여부
fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == DOCUMENT_EXTENSION)
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &[u8]) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_reads_txt_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b_pump.txt", b"Pump maintenance");
        write(dir.path(), "a_motor.txt", b"Motor troubleshooting");
        write(dir.path(), "notes.md", b"not indexed");

        let store = DocumentStore::new();
        let count = store.load(dir.path()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.count(), 2);

        let index = store.snapshot();
        let names: Vec<_> = index
            .documents()
            .map(|d| d.metadata.filename.clone())
            .collect();
        assert_eq!(names, vec!["a_motor.txt", "b_pump.txt"]);
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pump.txt", b"Pump maintenance");
        write(dir.path(), "MANUAL.TXT", b"Upper-case extension");
        write(dir.path(), "notes.Txt", b"Mixed-case extension");

        let store = DocumentStore::new();
        assert_eq!(store.load(dir.path()).unwrap(), 1);
        assert!(is_document(Path::new("a.txt")));
        assert!(!is_document(Path::new("MANUAL.TXT")));
    }

    #[test]
    fn test_load_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.txt", b"top level");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "deep.txt", b"nested");

        let store = DocumentStore::new();
        assert_eq!(store.load(dir.path()).unwrap(), 1);
    }

    #[test]
    fn test_invalid_utf8_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.txt", b"valid text");
        write(dir.path(), "bad.txt", &[0xff, 0xfe, 0xfd]);

        let store = DocumentStore::new();
        assert_eq!(store.load(dir.path()).unwrap(), 1);
        let index = store.snapshot();
        assert_eq!(
            index.documents().next().unwrap().metadata.filename,
            "good.txt"
        );
    }

    #[test]
    fn test_missing_directory_keeps_previous_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "doc.txt", b"content");

        let store = DocumentStore::new();
        store.load(dir.path()).unwrap();

        let result = store.load(&dir.path().join("missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_file_path_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "doc.txt", b"content");

        let store = DocumentStore::new();
        let result = store.load(&dir.path().join("doc.txt"));
        assert!(matches!(result, Err(StoreError::NotADirectory(_))));
    }

    #[test]
    fn test_reload_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.txt", b"first document");
        write(dir.path(), "two.txt", b"second document");

        let store = DocumentStore::new();
        store.load(dir.path()).unwrap();
        let first = store.snapshot();
        store.load(dir.path()).unwrap();
        let second = store.snapshot();

        assert_eq!(first.fingerprint(), second.fingerprint());
        let a: Vec<_> = first.documents().cloned().collect();
        let b: Vec<_> = second.documents().cloned().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.txt", b"first");

        let store = DocumentStore::new();
        store.load(dir.path()).unwrap();
        let old = store.snapshot();

        write(dir.path(), "two.txt", b"second");
        store.load(dir.path()).unwrap();

        assert_eq!(old.len(), 1);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "doc.txt", b"1234567890");

        let store = DocumentStore::new();
        assert_eq!(store.stats().total_documents, 0);
        assert!(store.stats().indexed_at.is_none());

        store.load(dir.path()).unwrap();
        let stats = store.stats();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.total_content_bytes, 10);
        assert!(stats.indexed_at.is_some());
        assert_eq!(stats.fingerprint.len(), 64);
    }
}
