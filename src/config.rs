use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::answer_aggregator::AggregatorConfig;
use crate::services::question_parser::ParserConfig;
use crate::services::text_cleaner::Substitutions;

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "MCQ_CONFIG";

/// 程序配置
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- OCR ---
    /// OCR 置信度低于该值时不解析
    pub ocr_confidence_threshold: f32,
    pub ocr_api_url: String,
    pub ocr_api_key: String,
    /// 把 `|` 当成 `I`
    pub substitute_pipe: bool,
    /// 把 `0` 当成 `O`（会破坏数字选项，默认关闭）
    pub substitute_zero: bool,
    // --- 解析 ---
    pub min_stem_length: usize,
    pub short_question_length: usize,
    pub min_options: usize,
    // --- 搜索 ---
    pub search_base_url: String,
    pub max_search_results: usize,
    /// 搜索时给题干加引号
    pub quote_query: bool,
    pub search_timeout_secs: u64,
    /// 单个页面的抓取超时
    pub fetch_timeout_secs: u64,
    /// 搜索结果缓存时间
    pub cache_duration_secs: u64,
    pub user_agent: String,
    // --- 推断 ---
    pub evidence_share_threshold: f64,
    pub keyword_window: usize,
    // --- 运行 ---
    /// 同时处理的图片数量
    pub max_concurrent_scans: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr_confidence_threshold: 0.5,
            ocr_api_url: "https://api.ocr.space/parse/image".to_string(),
            ocr_api_key: String::new(),
            substitute_pipe: true,
            substitute_zero: false,
            min_stem_length: 20,
            short_question_length: 10,
            min_options: 2,
            search_base_url: "https://html.duckduckgo.com/html/".to_string(),
            max_search_results: 3,
            quote_query: true,
            search_timeout_secs: 15,
            fetch_timeout_secs: 10,
            cache_duration_secs: 300,
            user_agent: "Mozilla/5.0 (Linux; Android 10; Mobile) AppleWebKit/537.36".to_string(),
            evidence_share_threshold: 0.3,
            keyword_window: 10,
            max_concurrent_scans: 4,
            verbose_logging: false,
            output_log_file: "scan_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 默认配置 + 环境变量覆盖
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::File(FileError::NotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 加载配置：`MCQ_CONFIG` 指定的文件（如果有）→ 环境变量覆盖 → 校验
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖已有的值；无法解析的值返回 `EnvVarParseFailed`
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            ocr_confidence_threshold: env_parse("OCR_CONFIDENCE_THRESHOLD", self.ocr_confidence_threshold)?,
            ocr_api_url: std::env::var("OCR_API_URL").unwrap_or(self.ocr_api_url),
            ocr_api_key: std::env::var("OCR_SPACE_API_KEY").unwrap_or(self.ocr_api_key),
            substitute_pipe: env_parse("SUBSTITUTE_PIPE", self.substitute_pipe)?,
            substitute_zero: env_parse("SUBSTITUTE_ZERO", self.substitute_zero)?,
            min_stem_length: env_parse("MIN_STEM_LENGTH", self.min_stem_length)?,
            short_question_length: env_parse("SHORT_QUESTION_LENGTH", self.short_question_length)?,
            min_options: env_parse("MIN_OPTIONS", self.min_options)?,
            search_base_url: std::env::var("SEARCH_BASE_URL").unwrap_or(self.search_base_url),
            max_search_results: env_parse("MAX_SEARCH_RESULTS", self.max_search_results)?,
            quote_query: env_parse("QUOTE_QUERY", self.quote_query)?,
            search_timeout_secs: env_parse("SEARCH_TIMEOUT_SECS", self.search_timeout_secs)?,
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", self.fetch_timeout_secs)?,
            cache_duration_secs: env_parse("CACHE_DURATION_SECS", self.cache_duration_secs)?,
            user_agent: std::env::var("USER_AGENT").unwrap_or(self.user_agent),
            evidence_share_threshold: env_parse("EVIDENCE_SHARE_THRESHOLD", self.evidence_share_threshold)?,
            keyword_window: env_parse("KEYWORD_WINDOW", self.keyword_window)?,
            max_concurrent_scans: env_parse("MAX_CONCURRENT_SCANS", self.max_concurrent_scans)?,
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        })
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.ocr_confidence_threshold) {
            return Err(out_of_range("ocr_confidence_threshold", self.ocr_confidence_threshold));
        }
        if !(self.evidence_share_threshold > 0.0 && self.evidence_share_threshold <= 1.0) {
            return Err(out_of_range("evidence_share_threshold", self.evidence_share_threshold));
        }
        if self.max_search_results == 0 {
            return Err(out_of_range("max_search_results", self.max_search_results));
        }
        if self.keyword_window == 0 {
            return Err(out_of_range("keyword_window", self.keyword_window));
        }
        if self.max_concurrent_scans == 0 {
            return Err(out_of_range("max_concurrent_scans", self.max_concurrent_scans));
        }
        Ok(())
    }

    pub fn substitutions(&self) -> Substitutions {
        Substitutions {
            pipe_as_i: self.substitute_pipe,
            zero_as_o: self.substitute_zero,
        }
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            min_stem_length: self.min_stem_length,
            short_question_length: self.short_question_length,
            min_options: self.min_options,
            substitutions: self.substitutions(),
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            share_threshold: self.evidence_share_threshold,
            max_references: self.max_search_results,
            keyword_window: self.keyword_window,
        }
    }
}

fn env_parse<T: FromStr>(var_name: &str, current: T) -> Result<T, ConfigError> {
    parse_env_value(var_name, std::env::var(var_name).ok(), current)
}

/// 未设置时保留当前值，设置了但无法解析时报错
fn parse_env_value<T: FromStr>(
    var_name: &str,
    raw: Option<String>,
    current: T,
) -> Result<T, ConfigError> {
    let Some(raw) = raw else {
        return Ok(current);
    };

    raw.trim().parse::<T>().map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: raw.clone(),
        expected_type: std::any::type_name::<T>().to_string(),
    })
}

fn out_of_range(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_core_constants() {
        let config = Config::default();

        assert_eq!(config.parser_config(), ParserConfig::default());
        assert_eq!(config.aggregator_config(), AggregatorConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            evidence_share_threshold = 0.5
            substitute_zero = true
            "#,
        )
        .unwrap();

        assert_eq!(config.evidence_share_threshold, 0.5);
        assert!(config.substitute_zero);
        assert_eq!(config.max_search_results, 3);
        assert!(config.parser_config().substitutions.zero_as_o);
    }

    #[test]
    fn test_validate_rejects_zero_share_threshold() {
        let config = Config {
            evidence_share_threshold: 0.0,
            ..Config::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "evidence_share_threshold"
        ));
    }

    #[test]
    fn test_from_toml_file_missing_path() {
        let result = Config::from_toml_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(AppError::File(FileError::NotFound { .. }))));
    }

    #[test]
    fn test_env_value_unset_keeps_current() {
        assert_eq!(parse_env_value("MAX_SEARCH_RESULTS", None, 3usize).unwrap(), 3);
        assert_eq!(
            parse_env_value("MAX_SEARCH_RESULTS", Some(" 5 ".to_string()), 3usize).unwrap(),
            5
        );
    }

    #[test]
    fn test_env_value_unparseable_is_reported() {
        let result = parse_env_value("EVIDENCE_SHARE_THRESHOLD", Some("high".to_string()), 0.3f64);

        match result {
            Err(ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            }) => {
                assert_eq!(var_name, "EVIDENCE_SHARE_THRESHOLD");
                assert_eq!(value, "high");
                assert_eq!(expected_type, "f64");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_env_override_fails_config_overrides() {
        std::env::set_var("KEYWORD_WINDOW", "ten");
        let result = Config::default().with_env_overrides();
        std::env::remove_var("KEYWORD_WINDOW");

        assert!(matches!(
            result,
            Err(ConfigError::EnvVarParseFailed { ref var_name, .. }) if var_name == "KEYWORD_WINDOW"
        ));
    }
}
