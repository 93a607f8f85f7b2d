//! # MCQ Scanner
//!
//! 从 OCR 文本中识别选择题，并根据网页证据推断候选答案
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有网络客户端，只暴露能力
//! - `HttpClient` - 带超时和 UA 的 HTTP 客户端
//! - `OcrBackend` - OCR.Space 图片识别 / 纯文本输入
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单道题
//! - `QuestionParser` - 清洗 → 分段 → 组装 → 去除题头噪声 → 有效性检查
//! - `AnswerAggregator` - 多来源证据统计，得到候选答案
//! - `WebSearch` / `PageFetcher` - 搜索题干、抓取页面文本
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个输入"的完整处理流程
//! - `ScanCtx` - 上下文封装（扫描序号 + 来源）
//! - `ScanFlow` - 流程编排（OCR → parse → search → resolve）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量输入处理器，管理资源和并发

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{OptionLabel, ParsedQuestion, Resolution};
pub use orchestrator::{App, ProcessingStats};
pub use services::{strip_header_noise, AnswerAggregator, QuestionParser};
pub use workflow::{ScanCtx, ScanFlow, ScanOutcome};
