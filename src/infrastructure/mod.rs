//! 基础设施层
//!
//! 持有网络客户端等资源，只暴露能力，不认识题目和答案

pub mod html_text;
pub mod http_client;
pub mod ocr_client;

pub use http_client::HttpClient;
pub use ocr_client::{OcrBackend, OcrOutput, OcrSpaceClient};
