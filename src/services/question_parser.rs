//! 选择题解析服务 - 业务能力层
//!
//! 只负责把一段 OCR 文本变成 `ParsedQuestion`，并判断它是否可用。
//! 不做任何网络请求，不关心后续流程。
//!
//! 分段是一个两状态的状态机：
//!
//! ```text
//! BeforeFirstOption --(选项标记 L)--> InOption(L)
//! InOption(L)       --(选项标记 M)--> InOption(M)   // 先结束 L
//! InOption(L)       --(普通行)-----> InOption(L)   // 追加到 L
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::question::{OptionLabel, ParsedQuestion, RawLine, ValidityVerdict};
use crate::services::text_cleaner::{Substitutions, TextCleaner};

/// 行首选项标记：`A.` `A)` `(A)` `A:` `A ` 或单独的 `A`
static OPTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?([A-D])(?:[.):]|\s|$)\s*(.*)$").expect("选项标记正则无效"));

/// 题干前缀噪声规则
pub struct HeaderRule {
    pub name: &'static str,
    pub pattern: Lazy<Regex>,
}

/// 按顺序尝试的前缀规则表，第一条生效的规则胜出
pub static HEADER_RULES: [HeaderRule; 5] = [
    HeaderRule {
        name: "numeric_enumeration",
        pattern: Lazy::new(|| Regex::new(r"^\(?\d+\s*[.):\-]\s*").expect("编号前缀正则无效")),
    },
    HeaderRule {
        name: "title",
        pattern: Lazy::new(|| Regex::new(r"(?i)^title\b\s*[:.\-]?\s*").expect("Title 前缀正则无效")),
    },
    HeaderRule {
        name: "question",
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)^question\b\s*\d*\s*[:.)\-]?\s*").expect("Question 前缀正则无效")
        }),
    },
    HeaderRule {
        name: "mcq",
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)^mcqs?\b\s*\d*\s*[:.)\-]?\s*").expect("MCQ 前缀正则无效")
        }),
    },
    HeaderRule {
        name: "bare_q",
        pattern: Lazy::new(|| Regex::new(r"^Q\s*\d*\s*(?:[.):\-]\s*|\s+)").expect("Q 前缀正则无效")),
    },
];

/// 解析器配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
    /// 题干超过该长度即视为有效
    pub min_stem_length: usize,
    /// 含问号时的最短题干长度
    pub short_question_length: usize,
    /// 最少选项数
    pub min_options: usize,
    pub substitutions: Substitutions,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_stem_length: 20,
            short_question_length: 10,
            min_options: 2,
            substitutions: Substitutions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    BeforeFirstOption,
    InOption(OptionLabel),
}

/// 选择题解析器
///
/// 纯函数式：同样的输入永远得到同样的输出，内部没有可变状态。
#[derive(Debug, Clone, Default)]
pub struct QuestionParser {
    config: ParserConfig,
    cleaner: TextCleaner,
}

impl QuestionParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            cleaner: TextCleaner::new(config.substitutions),
        }
    }

    /// 清洗 OCR 文本
    pub fn clean(&self, text: &str) -> String {
        self.cleaner.clean(text)
    }

    /// 把清洗后的文本切成带标签的行
    pub fn segment(&self, text: &str) -> Vec<RawLine> {
        let mut state = SegmentState::BeforeFirstOption;
        let mut lines = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some((label, rest)) = match_option_marker(line) {
                state = SegmentState::InOption(label);
                lines.push(RawLine::OptionStart {
                    label,
                    text: rest.to_string(),
                });
                continue;
            }

            match state {
                SegmentState::BeforeFirstOption => lines.push(RawLine::Stem(line.to_string())),
                SegmentState::InOption(label) => lines.push(RawLine::Continuation {
                    label,
                    text: line.to_string(),
                }),
            }
        }

        lines
    }

    /// 解析 OCR 文本
    ///
    /// 不会失败；最坏情况下得到空题干和空选项。
    pub fn parse(&self, raw_text: &str) -> ParsedQuestion {
        let cleaned = self.clean(raw_text);
        let lines = self.segment(&cleaned);
        let question = assemble(lines);

        debug!(
            "解析完成: 题干 {} 字符, {} 个选项",
            question.stem().chars().count(),
            question.option_count()
        );

        question
    }

    /// 判断题目是否可用
    pub fn is_valid(&self, parsed: &ParsedQuestion) -> ValidityVerdict {
        let stem = parsed.stem();
        let stem_len = stem.chars().count();

        let stem_ok = stem_len > self.config.min_stem_length
            || (stem.contains('?') && stem_len > self.config.short_question_length);
        let options_ok = parsed.option_count() >= self.config.min_options;

        ValidityVerdict {
            stem_ok,
            options_ok,
        }
    }
}

/// 去掉题干开头的编号 / 标题噪声
///
/// 只移除一次：按顺序找到第一条能改变内容且移除后非空的规则。
/// 移除后以选项标记开头的结果不采用，否则题干会被当成选项。
pub fn strip_header_noise(stem: &str) -> String {
    let stem = stem.trim();

    for rule in HEADER_RULES.iter() {
        if let Some(m) = rule.pattern.find(stem) {
            let rest = stem[m.end()..].trim_start();
            if !rest.is_empty() && rest != stem && !OPTION_MARKER.is_match(rest) {
                debug!("去除题干前缀 ({}): {:?}", rule.name, m.as_str());
                return rest.to_string();
            }
        }
    }

    stem.to_string()
}

fn match_option_marker(line: &str) -> Option<(OptionLabel, &str)> {
    let caps = OPTION_MARKER.captures(line)?;
    let label = caps
        .get(1)
        .and_then(|m| m.as_str().chars().next())
        .and_then(OptionLabel::from_char)?;
    let rest = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    Some((label, rest))
}

/// 把分段结果组装成题目
fn assemble(lines: Vec<RawLine>) -> ParsedQuestion {
    let mut stem_parts: Vec<String> = Vec::new();
    let mut options: BTreeMap<OptionLabel, String> = BTreeMap::new();
    let mut open: Option<(OptionLabel, String)> = None;

    for line in lines {
        match line {
            RawLine::Stem(text) => stem_parts.push(text),
            RawLine::OptionStart { label, text } => {
                if let Some((prev, prev_text)) = open.take() {
                    options.insert(prev, prev_text);
                }
                open = Some((label, text));
            }
            RawLine::Continuation { label, text } => match open.as_mut() {
                Some((current, buf)) if *current == label => {
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(&text);
                }
                // 分段器保证续行总跟在同一标签之后
                _ => debug!("丢弃无法归属的续行: {}", text),
            },
        }
    }

    if let Some((label, text)) = open {
        options.insert(label, text);
    }

    let stem = strip_header_noise(&stem_parts.join(" "));
    ParsedQuestion::new(stem, options)
}
