//! Intent Table - 인텐트별 키워드 목록
//!
//! JSON 객체(인텐트 → 키워드 배열)로 저장되며 키 순서를 보존합니다.
//! 순서는 분류 시 동점 처리 기준이 됩니다.

use std::fmt;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelLoadError;

// ============================================================================
// Default Table
// ============================================================================

/// 기본 인텐트 키워드 (순서 유지)
const DEFAULT_INTENTS: &[(&str, &[&str])] = &[
    (
        "greeting",
        &["hello", "hi", "hey", "greetings", "good morning", "good afternoon"],
    ),
    (
        "goodbye",
        &["bye", "goodbye", "farewell", "see you", "exit", "quit"],
    ),
    (
        "help",
        &["help", "assist", "what can you do", "capabilities", "guide"],
    ),
    (
        "simple_troubleshooting",
        &[
            "motor",
            "pump",
            "not working",
            "stopped",
            "problem",
            "issue",
            "broken",
            "repair",
            "fix",
        ],
    ),
    (
        "safety_query",
        &["safety", "lockout", "tagout", "loto", "ppe", "hazard", "emergency"],
    ),
    (
        "maintenance_planning",
        &["maintenance", "schedule", "service", "inspection", "routine"],
    ),
    (
        "equipment_specific",
        &["hvac", "compressor", "valve", "sensor", "electrical", "mechanical"],
    ),
    (
        "technical_explanation",
        &["how does", "explain", "why", "what causes", "principle", "theory"],
    ),
    (
        "unclear",
        &["unclear", "don't know", "not sure", "confusing", "huh"],
    ),
];

// ============================================================================
// IntentTable
// ============================================================================

/// 순서가 있는 인텐트 → 키워드 매핑
///
/// 모든 인텐트는 비어있지 않은 키워드를 1개 이상 가집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentTable {
    entries: Vec<(String, Vec<String>)>,
}

impl Default for IntentTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_INTENTS
                .iter()
                .map(|(intent, keywords)| {
                    (
                        intent.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl IntentTable {
    /// 엔트리 목록으로 생성 (검증 포함)
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, ModelLoadError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let mut table = Self { entries: vec![] };
        for (intent, keywords) in entries {
            let keywords = keywords.into_iter().map(Into::into).collect();
            table
                .push(intent.into(), keywords)
                .map_err(ModelLoadError::Invalid)?;
        }
        Ok(table)
    }

    /// 엔트리 추가 (중복 인텐트, 빈 키워드 거부)
    fn push(&mut self, intent: String, keywords: Vec<String>) -> Result<(), String> {
        if intent.trim().is_empty() {
            return Err("intent name must not be empty".to_string());
        }
        if self.keywords(&intent).is_some() {
            return Err(format!("duplicate intent '{}'", intent));
        }
        if keywords.is_empty() {
            return Err(format!("intent '{}' has no keywords", intent));
        }
        if keywords.iter().any(|k| k.is_empty()) {
            return Err(format!("intent '{}' has an empty keyword", intent));
        }

        self.entries.push((intent, keywords));
        Ok(())
    }

    /// 테이블 순서대로 (인텐트, 키워드) 반복
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(intent, keywords)| (intent.as_str(), keywords.as_slice()))
    }

    /// 인텐트 이름 목록
    pub fn intents(&self) -> Vec<&str> {
        self.entries.iter().map(|(intent, _)| intent.as_str()).collect()
    }

    /// 특정 인텐트의 키워드
    pub fn keywords(&self, intent: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == intent)
            .map(|(_, keywords)| keywords.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// JSON 문자열에서 파싱
    pub fn from_json(json: &str) -> Result<Self, ModelLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 사람이 편집하기 쉬운 JSON 문자열
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 파일에서 로드
    pub fn read_from(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::Missing(path.to_path_buf()));
        }

        let json = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&json)
    }

    /// 파일에 저장 (부모 디렉토리 자동 생성)
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = self.to_json_pretty()?;
        std::fs::write(path, json)
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for IntentTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (intent, keywords) in &self.entries {
            map.serialize_entry(intent, keywords)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IntentTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(IntentTableVisitor)
    }
}

/// 키 순서를 유지하며 맵을 읽는 방문자
struct IntentTableVisitor;

impl<'de> Visitor<'de> for IntentTableVisitor {
    type Value = IntentTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of intent names to keyword lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = IntentTable { entries: vec![] };
        while let Some((intent, keywords)) = access.next_entry::<String, Vec<String>>()? {
            table.push(intent, keywords).map_err(de::Error::custom)?;
        }
        Ok(table)
    }
}

// ============================================================================
// Tests
// ============================================================================
