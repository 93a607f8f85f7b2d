use anyhow::Result;
use std::path::PathBuf;
use tracing::warn;

use mcq_scanner::utils::logging;
use mcq_scanner::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let inputs: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        warn!("用法: mcq_scanner <图片或 .txt 文件>...");
        return Ok(());
    }

    // 初始化并运行应用
    let stats = App::initialize(config)?.run(inputs).await?;

    if stats.failed > 0 {
        warn!("⚠️ 有 {} 个输入处理失败", stats.failed);
    }

    Ok(())
}
