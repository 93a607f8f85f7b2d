//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量扫描和并发调度。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PathBuf>)
//!     ↓
//! workflow::ScanFlow (处理单个输入)
//!     ↓
//! services (能力层：parse / search / resolve)
//!     ↓
//! infrastructure (基础设施：HttpClient / OcrBackend)
//! ```
//!
//! 编排层只做调度和统计，不做具体业务判断。

pub mod batch_processor;

pub use batch_processor::{App, ProcessingStats};
