use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 选项标签（只支持 A-D）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    /// 全部标签，按字母顺序
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    /// 获取大写字母
    pub fn as_char(self) -> char {
        match self {
            OptionLabel::A => 'A',
            OptionLabel::B => 'B',
            OptionLabel::C => 'C',
            OptionLabel::D => 'D',
        }
    }

    /// 从字符解析标签（不区分大小写）
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionLabel::A),
            'B' => Some(OptionLabel::B),
            'C' => Some(OptionLabel::C),
            'D' => Some(OptionLabel::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 解析后的选择题
///
/// 构建完成后不可变。同一标签重复出现时以最后一次为准。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    stem: String,
    options: BTreeMap<OptionLabel, String>,
}

impl ParsedQuestion {
    pub fn new(stem: impl Into<String>, options: BTreeMap<OptionLabel, String>) -> Self {
        Self {
            stem: stem.into(),
            options,
        }
    }

    /// 题干
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// 全部选项（按标签排序）
    pub fn options(&self) -> &BTreeMap<OptionLabel, String> {
        &self.options
    }

    /// 指定标签的选项内容
    pub fn option(&self, label: OptionLabel) -> Option<&str> {
        self.options.get(&label).map(String::as_str)
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

impl fmt::Display for ParsedQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.stem)?;
        for (label, text) in &self.options {
            writeln!(f, "{}: {}", label, text)?;
        }
        Ok(())
    }
}

/// 分段结果中的一行
///
/// 只在解析过程中存在，组装完成后丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLine {
    /// 第一个选项标记之前的行，属于题干
    Stem(String),
    /// 带选项标记的行，开始一个新选项
    OptionStart { label: OptionLabel, text: String },
    /// 没有标记的行，接在当前选项后面
    Continuation { label: OptionLabel, text: String },
}

/// 有效性判断结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityVerdict {
    /// 题干长度 / 问号判断是否通过
    pub stem_ok: bool,
    /// 选项数量判断是否通过
    pub options_ok: bool,
}

impl ValidityVerdict {
    pub fn is_valid(&self) -> bool {
        self.stem_ok && self.options_ok
    }
}
