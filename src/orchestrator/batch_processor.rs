//! 批量扫描处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量输入的处理和资源管理。
//!
//! 1. **应用初始化**：写扫描日志头、创建 `ScanFlow`
//! 2. **并发控制**：使用 Semaphore 限制同时扫描的数量
//! 3. **分批处理**：每批完成后再开始下一批
//! 4. **全局统计**：汇总所有输入的处理结果

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::utils::logging;
use crate::workflow::{ScanCtx, ScanFlow, ScanOutcome};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<ScanFlow>,
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    /// 得到候选答案
    pub answered: usize,
    /// 置信度低 / 无有效题目 / 无可信答案
    pub unanswered: usize,
    /// 处理出错
    pub failed: usize,
    pub total: usize,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        // 初始化扫描日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(config.max_concurrent_scans);

        let flow = Arc::new(ScanFlow::new(&config)?);

        Ok(Self { config, flow })
    }

    /// 运行应用主逻辑
    pub async fn run(&self, inputs: Vec<PathBuf>) -> AppResult<ProcessingStats> {
        if inputs.is_empty() {
            warn!("⚠️ 没有待扫描的输入，程序结束");
            return Ok(ProcessingStats::default());
        }

        let total = inputs.len();
        let batch_size = self.config.max_concurrent_scans.max(1);
        logging::log_inputs_loaded(total, batch_size);

        let semaphore = Arc::new(Semaphore::new(batch_size));
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        // 分批处理
        for batch_start in (0..total).step_by(batch_size) {
            let batch_end = (batch_start + batch_size).min(total);
            let batch_num = batch_start / batch_size + 1;
            let total_batches = (total + batch_size - 1) / batch_size;

            logging::log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

            let batch = self
                .process_batch(&inputs[batch_start..batch_end], batch_start, semaphore.clone())
                .await?;

            logging::log_batch_complete(batch_num, batch.answered, batch_end - batch_start);

            stats.answered += batch.answered;
            stats.unanswered += batch.unanswered;
            stats.failed += batch.failed;
        }

        logging::print_final_stats(
            stats.answered,
            stats.unanswered,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_inputs: &[PathBuf],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> AppResult<ProcessingStats> {
        let mut handles = Vec::new();

        for (idx, path) in batch_inputs.iter().enumerate() {
            let ctx = ScanCtx::for_path(batch_start + idx + 1, path);
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Other(format!("并发控制失败: {}", e)))?;
            let flow = Arc::clone(&self.flow);
            let path = path.clone();
            let log_file = self.config.output_log_file.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = flow.run(&ctx, &path).await;
                record_outcome(&log_file, &ctx, &result);
                result
            });
            handles.push(handle);
        }

        // 等待本批所有任务完成
        let mut stats = ProcessingStats {
            total: batch_inputs.len(),
            ..Default::default()
        };

        for handle in handles {
            match handle.await {
                Ok(Ok(outcome)) if outcome.is_answered() => stats.answered += 1,
                Ok(Ok(_)) => stats.unanswered += 1,
                Ok(Err(_)) => stats.failed += 1,
                Err(e) => {
                    error!("扫描任务执行失败: {}", e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// 输出并记录单次扫描结果
fn record_outcome(log_file: &str, ctx: &ScanCtx, result: &AppResult<ScanOutcome>) {
    let body = match result {
        Ok(outcome) => {
            info!("{}\n{}", ctx, outcome);
            outcome.to_string()
        }
        Err(e) => {
            error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
            format!("Error: {}", e)
        }
    };

    if let Err(e) = logging::append_log_entry(log_file, &ctx.to_string(), &body) {
        warn!("{} ⚠️ 写入扫描日志失败: {}", ctx, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config(log_name: &str) -> Config {
        Config {
            search_base_url: "http://127.0.0.1:9/".to_string(),
            search_timeout_secs: 1,
            fetch_timeout_secs: 1,
            max_concurrent_scans: 2,
            output_log_file: std::env::temp_dir()
                .join(log_name)
                .to_string_lossy()
                .to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_run_counts_outcomes() {
        let dir = std::env::temp_dir();
        let invalid = dir.join("mcq_scanner_batch_invalid.txt");
        let missing = dir.join("mcq_scanner_batch_missing.txt");
        let unsupported = dir.join("mcq_scanner_batch.docx");
        tokio::fs::write(&invalid, "just a heading").await.unwrap();
        let _ = tokio::fs::remove_file(&missing).await;

        let config = offline_config("mcq_scanner_batch_log.txt");
        let log_file = config.output_log_file.clone();
        let app = App::initialize(config).unwrap();

        let stats = app
            .run(vec![invalid.clone(), missing, unsupported])
            .await
            .unwrap();

        assert_eq!(
            stats,
            ProcessingStats {
                answered: 0,
                unanswered: 1,
                failed: 2,
                total: 3,
            }
        );

        let log = tokio::fs::read_to_string(&log_file).await.unwrap();
        assert!(log.contains("No valid question detected"));

        let _ = tokio::fs::remove_file(&invalid).await;
        let _ = tokio::fs::remove_file(&log_file).await;
    }

    #[tokio::test]
    async fn test_run_without_inputs() {
        let app = App::initialize(offline_config("mcq_scanner_empty_log.txt")).unwrap();
        assert_eq!(app.run(Vec::new()).await.unwrap(), ProcessingStats::default());
    }
}
