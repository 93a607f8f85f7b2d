//! 扫描流程 - 流程层
//!
//! 核心职责：定义"一张图片"的完整处理流程
//!
//! 流程顺序：
//! 1. OCR → 置信度检查
//! 2. 解析 → 有效性检查
//! 3. 搜索 → 抓取页面 → 统计证据 → 候选答案

use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, OcrError};
use crate::infrastructure::{HttpClient, OcrBackend, OcrOutput, OcrSpaceClient};
use crate::models::answer::Resolution;
use crate::models::question::{OptionLabel, ParsedQuestion};
use crate::services::{AnswerAggregator, PageFetcher, QuestionParser, WebSearch};
use crate::utils::logging::truncate_text;
use crate::workflow::scan_ctx::ScanCtx;

/// 交给 OCR.Space 的图片扩展名
const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// 单次扫描的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// OCR 置信度不足，没有解析
    LowConfidence { confidence: f32 },
    /// 文本里没有可用的选择题
    NoValidQuestion { question: ParsedQuestion },
    /// 有题目，但证据不足
    NoConfidentAnswer { question: ParsedQuestion },
    /// 得到候选答案
    Answered {
        question: ParsedQuestion,
        answers: Vec<OptionLabel>,
    },
}

impl ScanOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, ScanOutcome::Answered { .. })
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::LowConfidence { confidence } => {
                write!(f, "Low text confidence ({:.2})", confidence)
            }
            ScanOutcome::NoValidQuestion { .. } => write!(f, "No valid question detected"),
            ScanOutcome::NoConfidentAnswer { question } => {
                write_options(f, question)?;
                write!(f, "\nAnswer: {}", Resolution::NotFound)
            }
            ScanOutcome::Answered { question, answers } => {
                write_options(f, question)?;
                write!(f, "\nAnswer: {}", Resolution::Answers(answers.clone()))
            }
        }
    }
}

fn write_options(f: &mut fmt::Formatter<'_>, question: &ParsedQuestion) -> fmt::Result {
    writeln!(f, "Options:")?;
    for (label, text) in question.options() {
        writeln!(f, "{}: {}", label, text)?;
    }
    Ok(())
}

/// 扫描流程
///
/// - 编排 OCR → 解析 → 搜索 → 推断
/// - 持有各个能力的实例，可以被多个任务共享（`Arc<ScanFlow>`）
pub struct ScanFlow {
    parser: QuestionParser,
    aggregator: AnswerAggregator,
    web_search: WebSearch,
    page_fetcher: PageFetcher,
    image_ocr: OcrBackend,
    text_ocr: OcrBackend,
    ocr_confidence_threshold: f32,
    verbose_logging: bool,
}

impl ScanFlow {
    /// 创建新的扫描流程
    pub fn new(config: &Config) -> AppResult<Self> {
        let search_http = HttpClient::new(
            &config.user_agent,
            Duration::from_secs(config.search_timeout_secs),
        )?;
        let fetch_http = HttpClient::new(
            &config.user_agent,
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let ocr_client = OcrSpaceClient::new(
            config.ocr_api_url.clone(),
            config.ocr_api_key.clone(),
            Duration::from_secs(config.search_timeout_secs),
        )?;

        if config.ocr_api_key.is_empty() {
            warn!("⚠️ 未配置 OCR_SPACE_API_KEY，图片识别会失败，只能处理 .txt 输入");
        }

        Ok(Self {
            parser: QuestionParser::new(config.parser_config()),
            aggregator: AnswerAggregator::new(config.aggregator_config()),
            web_search: WebSearch::new(
                search_http,
                config.search_base_url.clone(),
                config.max_search_results,
                config.quote_query,
                Duration::from_secs(config.cache_duration_secs),
            ),
            page_fetcher: PageFetcher::new(fetch_http),
            image_ocr: OcrBackend::OcrSpace(ocr_client),
            text_ocr: OcrBackend::PlainText,
            ocr_confidence_threshold: config.ocr_confidence_threshold,
            verbose_logging: config.verbose_logging,
        })
    }

    /// 处理一个输入文件
    pub async fn run(&self, ctx: &ScanCtx, path: &Path) -> AppResult<ScanOutcome> {
        let backend = self.backend_for(path)?;
        let ocr = backend.recognize(path).await?;
        self.run_ocr_output(ctx, ocr).await
    }

    /// 从 OCR 结果开始处理
    pub async fn run_ocr_output(&self, ctx: &ScanCtx, ocr: OcrOutput) -> AppResult<ScanOutcome> {
        info!(
            "{} OCR 文本 (置信度: {:.2}): {}",
            ctx,
            ocr.confidence,
            truncate_text(&ocr.text.replace('\n', " "), 100)
        );

        if ocr.confidence < self.ocr_confidence_threshold {
            warn!("{} ⚠️ OCR 置信度过低: {:.2}", ctx, ocr.confidence);
            return Ok(ScanOutcome::LowConfidence {
                confidence: ocr.confidence,
            });
        }

        self.run_text(ctx, &ocr.text).await
    }

    /// 从文本开始处理
    pub async fn run_text(&self, ctx: &ScanCtx, text: &str) -> AppResult<ScanOutcome> {
        let question = self.parser.parse(text);
        let verdict = self.parser.is_valid(&question);

        if !verdict.is_valid() {
            warn!(
                "{} ⚠️ 未检测到有效题目 (题干: {}, 选项: {})",
                ctx,
                if verdict.stem_ok { "✓" } else { "✗" },
                if verdict.options_ok { "✓" } else { "✗" }
            );
            return Ok(ScanOutcome::NoValidQuestion { question });
        }

        info!("{} ✓ 有效题目: {}", ctx, truncate_text(question.stem(), 50));
        if self.verbose_logging {
            for (label, text) in question.options() {
                info!("{}   {}: {}", ctx, label, text);
            }
        }

        let references = self.web_search.search(question.stem()).await?;
        info!("{} 🔍 得到 {} 个参考页面", ctx, references.len());

        let fetcher = &self.page_fetcher;
        let resolution = self
            .aggregator
            .resolve(&question, &references, move |url: String| async move {
                fetcher.fetch_text(&url).await.map_err(anyhow::Error::from)
            })
            .await?;

        match resolution {
            Resolution::Answers(answers) => {
                info!("{} ✓ 候选答案: {}", ctx, Resolution::Answers(answers.clone()));
                Ok(ScanOutcome::Answered { question, answers })
            }
            Resolution::NotFound => {
                info!("{} 未找到可信答案", ctx);
                Ok(ScanOutcome::NoConfidentAnswer { question })
            }
        }
    }

    fn backend_for(&self, path: &Path) -> AppResult<&OcrBackend> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "txt" {
            Ok(&self.text_ocr)
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Ok(&self.image_ocr)
        } else {
            Err(AppError::Ocr(OcrError::UnsupportedInput {
                path: path.display().to_string(),
            }))
        }
    }
}
