//! 샘플 기술 매뉴얼
//!
//! `init` 명령에서 빈 지식베이스를 채우는 데 사용합니다.

use std::path::Path;

use anyhow::{Context, Result};

/// (파일 이름, 내용)
pub const SAMPLE_DOCUMENTS: &[(&str, &str)] = &[
    (
        "motor_troubleshooting.txt",
        "Motor troubleshooting guide: Check power supply, verify connections, \
         test overload relays, inspect for mechanical binding.",
    ),
    (
        "pump_maintenance.txt",
        "Pump maintenance: Check suction line, verify priming, inspect impeller, \
         check seals for leaks.",
    ),
    (
        "safety_procedures.txt",
        "Safety procedures: Use lockout/tagout, wear proper PPE, follow emergency protocols.",
    ),
    (
        "hvac_maintenance.txt",
        "HVAC maintenance: Replace filters regularly, clean coils, check refrigerant levels, \
         inspect ductwork.",
    ),
];

/// 샘플 문서 생성 (이미 있는 파일은 덮어쓰지 않음)
///
/// # Returns
/// 새로 생성한 파일 수
pub fn seed_sample_documents(dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create documents directory: {:?}", dir))?;

    let mut created = 0;

    for (filename, content) in SAMPLE_DOCUMENTS {
        let path = dir.join(filename);
        if path.exists() {
            tracing::debug!("Sample already exists: {:?}", path);
            continue;
        }

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write sample document: {:?}", path))?;
        created += 1;
    }

    tracing::info!("Seeded {} sample documents into {:?}", created, dir);
    Ok(created)
}

// ============================================================================
// Tests
// ============================================================================
