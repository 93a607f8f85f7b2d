//! 扫描上下文
//!
//! 封装"我正在处理第几个输入、它是哪个文件"这一信息

use std::fmt::Display;
use std::path::Path;

/// 扫描上下文
#[derive(Debug, Clone)]
pub struct ScanCtx {
    /// 输入序号（从1开始，仅用于日志显示）
    pub scan_index: usize,

    /// 输入文件名
    pub source: String,
}

impl ScanCtx {
    /// 创建新的扫描上下文
    pub fn new(scan_index: usize, source: impl Into<String>) -> Self {
        Self {
            scan_index,
            source: source.into(),
        }
    }

    /// 用文件路径创建，只保留文件名
    pub fn for_path(scan_index: usize, path: &Path) -> Self {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(scan_index, source)
    }
}

impl Display for ScanCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[扫描 #{} {}]", self.scan_index, self.source)
    }
}
