//! CLI 모듈
//!
//! tech-assist CLI 명령어 정의 및 구현

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::intent::{IntentClassifier, IntentTable, TableSource};
use crate::knowledge::{seed_sample_documents, DocumentStore, Retriever};
use crate::router::{Assistant, Strategy};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "tech-assist")]
#[command(version, about = "기술자 지원 챗봇 - 인텐트 라우팅 + 키워드 RAG", long_about = None)]
pub struct Cli {
    /// 디버그 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 문서 디렉토리 (DOCUMENTS_PATH 환경변수보다 우선)
    #[arg(long, global = true)]
    pub documents: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 디렉토리 생성, 샘플 매뉴얼 및 기본 인텐트 테이블 작성
    Init,

    /// 질문하기 (분류 → 라우팅 → 응답)
    Ask {
        /// 질문
        query: String,

        /// 컨텍스트 문서 수
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 인텐트 분류만 수행
    Classify {
        /// 분류할 텍스트
        text: String,
    },

    /// 지식베이스 검색
    Search {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한
        #[arg(short = 'k', long, default_value = "3")]
        limit: usize,
    },

    /// 문서 인덱싱
    Index {
        /// 문서 디렉토리 (기본: 설정의 문서 디렉토리)
        path: Option<PathBuf>,
    },

    /// 분류기 재학습
    Train,

    /// 인텐트 테이블을 기본값으로 초기화
    ResetIntents,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env().context("설정 로드 실패")?;
    if let Some(dir) = cli.documents {
        config.documents_dir = dir;
    }

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Ask { query, limit, json } => cmd_ask(config, &query, limit, json).await,
        Commands::Classify { text } => cmd_classify(&config, &text),
        Commands::Search { query, limit } => cmd_search(&config, &query, limit),
        Commands::Index { path } => cmd_index(&config, path),
        Commands::Train => cmd_train(&config),
        Commands::ResetIntents => cmd_reset_intents(&config),
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 초기화 명령어 (init)
///
/// 데이터 디렉토리, 샘플 매뉴얼, 인텐트 테이블을 준비합니다.
/// 이미 있는 파일은 덮어쓰지 않습니다.
fn cmd_init(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.data_dir).context("데이터 디렉토리 생성 실패")?;
    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());

    let created = seed_sample_documents(&config.documents_dir).context("샘플 문서 생성 실패")?;
    println!(
        "[OK] 샘플 매뉴얼: {} 개 생성 ({})",
        created,
        config.documents_dir.display()
    );

    let classifier =
        IntentClassifier::with_table(IntentTable::default(), config.intent_table_path.clone());
    match classifier.load() {
        TableSource::File => println!(
            "[OK] 인텐트 테이블 유지: {}",
            config.intent_table_path.display()
        ),
        TableSource::Defaults => println!(
            "[OK] 기본 인텐트 테이블 생성: {}",
            config.intent_table_path.display()
        ),
    }

    if !config.has_api_key() {
        println!("[!] PERPLEXITY_API_KEY 미설정 - LLM 경로는 규칙 기반으로 폴백합니다");
    }

    Ok(())
}

/// 질문 명령어 (ask)
async fn cmd_ask(mut config: Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        bail!("질문이 비어 있습니다");
    }

    if let Some(k) = limit {
        config.context_documents = k;
    }

    let assistant = Assistant::bootstrap(&config).context("어시스턴트 초기화 실패")?;
    let reply = assistant.ask(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    let strategy_str = match reply.strategy {
        Strategy::RuleBased => "RULE",
        Strategy::Generated => "LLM",
        Strategy::Fallback => "FALLBACK",
    };

    println!(
        "[*] 인텐트: {} (신뢰도: {:.2}, 경로: {}) [{}]",
        reply.classification.intent,
        reply.classification.confidence,
        reply.classification.route,
        strategy_str
    );

    if let Some(ref reason) = reply.fallback_reason {
        println!("[!] 폴백 사유: {}", reason);
    }

    println!();
    println!("{}", reply.text);

    if !reply.sources.is_empty() {
        println!();
        println!("출처: {}", reply.sources.join(", "));
    }

    Ok(())
}

/// 분류 명령어 (classify)
fn cmd_classify(config: &Config, text: &str) -> Result<()> {
    let classifier = IntentClassifier::load_or_default(config.intent_table_path.clone());
    let result = classifier.classify(text);

    println!("인텐트:  {}", result.intent);
    println!("신뢰도:  {:.4}", result.confidence);
    println!("경로:    {}", result.route);

    Ok(())
}

/// 검색 명령어 (search)
///
/// 단어 겹침(Jaccard) 점수로 지식베이스를 검색합니다.
fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    println!("[*] 검색 중: \"{}\"", query);

    let store = DocumentStore::new();
    store
        .load(&config.documents_dir)
        .context("문서 인덱싱 실패")?;
    let retriever = Retriever::new(store.into());

    let results = retriever.retrieve(query, limit);

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for result in &results {
        println!(
            "{}. [점수: {:.4}] {}",
            result.rank, result.similarity_score, result.metadata.filename
        );
        println!("   경로: {}", result.metadata.source_path);
        println!("   내용: {}", truncate_text(&result.text, 200));
        println!();
    }

    Ok(())
}

/// 인덱싱 명령어 (index)
///
/// 인덱스는 메모리에만 유지되므로 결과 확인용입니다.
fn cmd_index(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| config.documents_dir.clone());

    let store = DocumentStore::new();
    let count = store
        .load(&path)
        .with_context(|| format!("문서 인덱싱 실패: {}", path.display()))?;

    let stats = store.stats();
    println!("[OK] {} 개 문서 인덱싱 완료: {}", count, path.display());
    println!("     총 콘텐츠: {}", format_bytes(stats.total_content_bytes));
    println!("     지문: {}", stats.fingerprint);

    Ok(())
}

/// 재학습 명령어 (train)
fn cmd_train(config: &Config) -> Result<()> {
    let classifier = IntentClassifier::load_or_default(config.intent_table_path.clone());

    if classifier.train() {
        println!("[OK] 분류기 학습 완료 (키워드 기반)");
    } else {
        bail!("분류기 학습 실패");
    }

    Ok(())
}

/// 인텐트 초기화 명령어 (reset-intents)
fn cmd_reset_intents(config: &Config) -> Result<()> {
    let classifier = IntentClassifier::load_or_default(config.intent_table_path.clone());
    classifier
        .reset()
        .context("인텐트 테이블 저장 실패")?;

    println!(
        "[OK] 기본 인텐트 테이블로 초기화: {}",
        config.intent_table_path.display()
    );

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &Config) -> Result<()> {
    println!("tech-assist v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] 문서 디렉토리:   {}", config.documents_dir.display());

    if config.has_api_key() {
        println!("[OK] API 키: 설정됨 ({}, 모델: {})", config.api_url, config.model);
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export PERPLEXITY_API_KEY=your-key");
    }

    match Assistant::bootstrap(config) {
        Ok(assistant) => {
            let stats = assistant.get_statistics();
            println!(
                "[OK] 인덱싱된 문서: {} 건 ({})",
                stats.knowledge.total_documents,
                format_bytes(stats.knowledge.total_content_bytes)
            );
            println!("     검색 방식: {}", stats.knowledge.retrieval_method);
            println!(
                "[OK] 인텐트: {} 개 ({})",
                stats.classifier.intent_categories,
                stats.classifier.intents.join(", ")
            );
            println!(
                "     테이블: {}",
                stats.classifier.model_path.display()
            );
            println!("[*] 규칙 응답기: {}", stats.responder);
        }
        Err(e) => {
            println!("[!] 어시스턴트 초기화 실패: {:#}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
