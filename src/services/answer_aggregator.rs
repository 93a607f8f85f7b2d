//! 答案推断服务 - 业务能力层
//!
//! 只负责"从若干网页文本中统计每个选项的证据"这一能力：
//! - 不做搜索，引用列表由调用方提供
//! - 不做网络请求，抓取能力以闭包形式注入
//! - 每次调用独立持有自己的 `AnswerTally`，可以并发调用

use futures::future::join_all;
use regex::RegexSet;
use std::collections::BTreeSet;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::models::answer::{AnswerTally, Resolution};
use crate::models::question::{OptionLabel, ParsedQuestion};

/// 明确指出答案的文字模式，`{label}` 会替换成小写标签
pub const EVIDENCE_PATTERNS: [(&str, &str); 3] = [
    ("answer_then_label", r"\banswer[\s:.=\-]+\(?{label}\b"),
    ("correct_then_label", r"\bcorrect[\s:.=\-]+\(?{label}\b"),
    ("label_then_correct", r"\(?\b{label}[.)\s][^\n]*?\bcorrect\b"),
];

/// 推断配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorConfig {
    /// 候选答案的最低占比
    pub share_threshold: f64,
    /// 最多使用的引用数
    pub max_references: usize,
    /// 题干关键词窗口（前 N 个词）
    pub keyword_window: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            share_threshold: 0.3,
            max_references: 3,
            keyword_window: 10,
        }
    }
}

/// 答案推断器
#[derive(Debug, Clone, Default)]
pub struct AnswerAggregator {
    config: AggregatorConfig,
}

impl AnswerAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// 根据外部来源推断答案
    ///
    /// # 参数
    /// - `parsed`: 已通过有效性检查的题目
    /// - `references`: 外部引用（通常是搜索结果 URL），超过 `max_references` 的部分忽略
    /// - `fetch_content`: 引用 → 纯文本；单个来源失败只会被跳过
    ///
    /// # 返回
    /// - `Ok(Resolution::Answers)`: 排好序的候选答案
    /// - `Ok(Resolution::NotFound)`: 没有来源或证据不足
    /// - `Err(ResolveError)`: 传入的题目本身不可用
    pub async fn resolve<F, Fut>(
        &self,
        parsed: &ParsedQuestion,
        references: &[String],
        fetch_content: F,
    ) -> Result<Resolution, ResolveError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        if parsed.options().is_empty() {
            return Err(ResolveError::NoOptions);
        }
        if parsed.stem().trim().is_empty() {
            return Err(ResolveError::EmptyStem);
        }

        if references.len() > self.config.max_references {
            warn!(
                "引用数量 {} 超过上限 {}，只使用前 {} 个",
                references.len(),
                self.config.max_references,
                self.config.max_references
            );
        }
        let references = &references[..references.len().min(self.config.max_references)];

        // 并发抓取，抓取完成后按引用顺序合并
        let pages = join_all(references.iter().map(|r| fetch_content(r.clone()))).await;

        let mut tally = AnswerTally::new();
        for (reference, page) in references.iter().zip(pages) {
            match page {
                Ok(text) => {
                    let labels = self.score_content(&text, parsed);
                    debug!("来源 {} 给出的证据: {:?}", reference, labels);
                    tally.merge(&labels);
                }
                Err(e) => {
                    warn!("⚠️ 跳过来源 {}: {}", reference, e);
                }
            }
        }

        if tally.is_empty() {
            info!("所有来源均无有效证据");
            return Ok(Resolution::NotFound);
        }

        let ranked = tally.ranked(self.config.share_threshold);
        for label in OptionLabel::ALL {
            if tally.count(label) > 0 {
                debug!(
                    "选项 {}: {} 次命中, 占比 {:.2}",
                    label,
                    tally.count(label),
                    tally.share(label)
                );
            }
        }

        if ranked.is_empty() {
            info!(
                "没有选项达到占比阈值 {:.2}，共 {} 次命中",
                self.config.share_threshold,
                tally.total()
            );
            Ok(Resolution::NotFound)
        } else {
            Ok(Resolution::Answers(ranked))
        }
    }

    /// 统计单个页面对哪些选项给出了证据
    ///
    /// 两类证据：
    /// 1. 题干关键词窗口和选项文本同时出现在页面中（不要求位置相邻）
    /// 2. 页面中出现 `answer: X` / `correct: X` / `X. ... correct` 这类说法
    pub fn score_content(&self, page_text: &str, parsed: &ParsedQuestion) -> BTreeSet<OptionLabel> {
        let page_lower = page_text.to_lowercase();
        let page_flat = collapse_whitespace(&page_lower);
        let window = self.keyword_window(parsed.stem());
        let window_present = !window.is_empty() && page_flat.contains(&window);

        let mut found = BTreeSet::new();

        for (label, option_text) in parsed.options() {
            let option_lower = collapse_whitespace(&option_text.to_lowercase());

            // 空选项文本是任何页面的子串，不参与共现判断
            if window_present && !option_lower.is_empty() && page_flat.contains(&option_lower) {
                found.insert(*label);
            }

            match evidence_set(*label) {
                Ok(set) => {
                    if set.is_match(&page_lower) {
                        found.insert(*label);
                    }
                }
                Err(e) => warn!("选项 {} 的证据模式无效: {}", label, e),
            }
        }

        found
    }

    /// 题干前 N 个词（小写，单空格连接）
    pub fn keyword_window(&self, stem: &str) -> String {
        stem.to_lowercase()
            .split_whitespace()
            .take(self.config.keyword_window)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn evidence_set(label: OptionLabel) -> Result<RegexSet, regex::Error> {
    let letter = label.as_char().to_ascii_lowercase().to_string();
    let patterns = EVIDENCE_PATTERNS
        .iter()
        .map(|(_, template)| format!("(?i){}", template.replace("{label}", &letter)));
    RegexSet::new(patterns)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn capital_question() -> ParsedQuestion {
        let mut options = BTreeMap::new();
        options.insert(OptionLabel::A, "Paris".to_string());
        options.insert(OptionLabel::B, "London".to_string());
        options.insert(OptionLabel::C, "Rome".to_string());
        options.insert(OptionLabel::D, "Berlin".to_string());
        ParsedQuestion::new("What is the capital of France?", options)
    }

    fn labels(ls: &[OptionLabel]) -> BTreeSet<OptionLabel> {
        ls.iter().copied().collect()
    }

    #[test]
    fn test_keyword_window_takes_first_ten_words() {
        let aggregator = AnswerAggregator::default();
        let window = aggregator.keyword_window("One two three four five six seven eight nine ten eleven");

        assert_eq!(window, "one two three four five six seven eight nine ten");
    }

    #[test]
    fn test_score_content_co_occurrence() {
        let aggregator = AnswerAggregator::default();
        let page = "Quiz\nWHAT IS THE CAPITAL OF\n  FRANCE? Many say Paris.";

        assert_eq!(aggregator.score_content(page, &capital_question()), labels(&[OptionLabel::A]));
    }

    #[test]
    fn test_score_content_option_without_stem_is_not_evidence() {
        let aggregator = AnswerAggregator::default();
        let page = "Paris and London are both large cities.";

        assert!(aggregator.score_content(page, &capital_question()).is_empty());
    }

    #[test]
    fn test_score_content_answer_patterns() {
        let aggregator = AnswerAggregator::default();
        let q = capital_question();

        assert_eq!(aggregator.score_content("Answer: C", &q), labels(&[OptionLabel::C]));
        assert_eq!(aggregator.score_content("the correct - (b)", &q), labels(&[OptionLabel::B]));
        assert_eq!(
            aggregator.score_content("d) berlin is the correct choice", &q),
            labels(&[OptionLabel::D])
        );
    }

    #[test]
    fn test_score_content_label_then_correct_with_whitespace() {
        let aggregator = AnswerAggregator::default();
        let mut options = BTreeMap::new();
        options.insert(OptionLabel::A, "Paris".to_string());
        options.insert(OptionLabel::B, "London".to_string());
        let q = ParsedQuestion::new("What is the capital of France?", options);

        assert_eq!(
            aggregator.score_content("Option B is the correct choice", &q),
            labels(&[OptionLabel::B])
        );
        assert_eq!(
            aggregator.score_content("(c) is correct", &capital_question()),
            labels(&[OptionLabel::C])
        );
        assert!(aggregator
            .score_content("apple is not correct", &capital_question())
            .is_empty());
    }

    #[test]
    fn test_score_content_label_needs_word_boundary() {
        let aggregator = AnswerAggregator::default();

        assert!(aggregator
            .score_content("answer: apple pie recipe", &capital_question())
            .is_empty());
    }

    #[test]
    fn test_score_content_counts_label_once_per_source() {
        let aggregator = AnswerAggregator::default();
        let page = "What is the capital of France? Paris. Answer: A. Correct: A";

        assert_eq!(aggregator.score_content(page, &capital_question()), labels(&[OptionLabel::A]));
    }

    #[test]
    fn test_empty_option_text_is_ignored_for_co_occurrence() {
        let aggregator = AnswerAggregator::default();
        let mut options = BTreeMap::new();
        options.insert(OptionLabel::A, String::new());
        options.insert(OptionLabel::B, "London".to_string());
        let q = ParsedQuestion::new("What is the capital of France?", options);

        let found = aggregator.score_content("what is the capital of france? london", &q);
        assert_eq!(found, labels(&[OptionLabel::B]));
    }

    #[tokio::test]
    async fn test_resolve_majority_answer() {
        let aggregator = AnswerAggregator::default();
        let refs = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let result = aggregator
            .resolve(&capital_question(), &refs, |r: String| async move {
                Ok(match r.as_str() {
                    "a" | "b" => "What is the capital of France? Paris. The answer: A".to_string(),
                    _ => "Weather forecast for tomorrow: sunny with light winds.".to_string(),
                })
            })
            .await;

        assert_eq!(result, Ok(Resolution::Answers(vec![OptionLabel::A])));
    }

    #[tokio::test]
    async fn test_resolve_all_fetches_fail_is_not_found() {
        let aggregator = AnswerAggregator::default();
        let refs = vec!["a".to_string(), "b".to_string()];

        let result = aggregator
            .resolve(&capital_question(), &refs, |_r: String| async move {
                Err::<String, _>(anyhow::anyhow!("timeout"))
            })
            .await;

        assert_eq!(result, Ok(Resolution::NotFound));
    }

    #[tokio::test]
    async fn test_resolve_even_split_is_not_found() {
        let aggregator = AnswerAggregator::new(AggregatorConfig {
            max_references: 4,
            ..AggregatorConfig::default()
        });
        let refs: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();

        let result = aggregator
            .resolve(&capital_question(), &refs, |r: String| async move {
                Ok(format!("answer: {}", r))
            })
            .await;

        assert_eq!(result, Ok(Resolution::NotFound));
    }

    #[tokio::test]
    async fn test_resolve_skips_failed_source() {
        let aggregator = AnswerAggregator::default();
        let refs = vec!["ok".to_string(), "broken".to_string()];

        let result = aggregator
            .resolve(&capital_question(), &refs, |r: String| async move {
                if r == "broken" {
                    anyhow::bail!("connection reset");
                }
                Ok("correct: b".to_string())
            })
            .await;

        assert_eq!(result, Ok(Resolution::Answers(vec![OptionLabel::B])));
    }

    #[tokio::test]
    async fn test_resolve_ignores_references_beyond_limit() {
        let aggregator = AnswerAggregator::default();
        let refs: Vec<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();

        let result = aggregator
            .resolve(&capital_question(), &refs, |r: String| async move {
                Ok(if r == "4" { "answer: d" } else { "answer: c" }.to_string())
            })
            .await;

        assert_eq!(result, Ok(Resolution::Answers(vec![OptionLabel::C])));
    }

    #[test]
    fn test_resolve_rejects_question_without_options() {
        let aggregator = AnswerAggregator::default();
        let q = ParsedQuestion::new("What is the capital of France?", BTreeMap::new());

        let result = tokio_test::block_on(aggregator.resolve(&q, &[], |_r: String| async move {
            Ok(String::new())
        }));

        assert_eq!(result, Err(ResolveError::NoOptions));
    }

    #[test]
    fn test_resolve_without_references_is_not_found() {
        let aggregator = AnswerAggregator::default();

        let result = tokio_test::block_on(aggregator.resolve(
            &capital_question(),
            &[],
            |_r: String| async move { Ok(String::new()) },
        ));

        assert_eq!(result, Ok(Resolution::NotFound));
    }
}
