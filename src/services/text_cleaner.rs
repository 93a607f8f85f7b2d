//! OCR 文本清洗 - 业务能力层
//!
//! 只做字符级别的清洗：常见误识别字符替换、空白压缩，不关心题目结构

use phf::phf_map;

/// OCR 常见误识别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confusion {
    /// 竖线被识别成字母 I 的位置
    PipeAsI,
    /// 数字 0 被当成字母 O（会破坏真实数字，默认关闭）
    ZeroAsO,
}

/// 误识别替换表：原字符 → (替换字符, 所属类别)
pub static OCR_CONFUSIONS: phf::Map<char, (char, Confusion)> = phf_map! {
    '|' => ('I', Confusion::PipeAsI),
    '0' => ('O', Confusion::ZeroAsO),
};

/// 启用哪些替换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitutions {
    pub pipe_as_i: bool,
    pub zero_as_o: bool,
}

impl Substitutions {
    /// 全部关闭
    pub fn none() -> Self {
        Self {
            pipe_as_i: false,
            zero_as_o: false,
        }
    }

    pub fn is_enabled(&self, confusion: Confusion) -> bool {
        match confusion {
            Confusion::PipeAsI => self.pipe_as_i,
            Confusion::ZeroAsO => self.zero_as_o,
        }
    }

    /// 对单个字符应用替换
    pub fn apply(&self, c: char) -> char {
        match OCR_CONFUSIONS.get(&c) {
            Some((replacement, confusion)) if self.is_enabled(*confusion) => *replacement,
            _ => c,
        }
    }
}

impl Default for Substitutions {
    fn default() -> Self {
        Self {
            pipe_as_i: true,
            zero_as_o: false,
        }
    }
}

/// 文本清洗器
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    substitutions: Substitutions,
}

impl TextCleaner {
    pub fn new(substitutions: Substitutions) -> Self {
        Self { substitutions }
    }

    /// 清洗 OCR 文本
    ///
    /// - 统一换行符，保留行结构（分段依赖换行）
    /// - 每行内的连续空白压缩为一个空格
    /// - 应用误识别替换表
    /// - 去掉首尾空白
    pub fn clean(&self, text: &str) -> String {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

        normalized
            .split('\n')
            .map(|line| self.clean_line(line))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    fn clean_line(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut pending_space = false;

        for c in line.chars() {
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(self.substitutions.apply(c));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_collapses_spaces_and_keeps_line_breaks() {
        let cleaner = TextCleaner::default();
        let cleaned = cleaner.clean("  What   is\tthis?  \r\nA.  one \n\n B) two  ");

        assert_eq!(cleaned, "What is this?\nA. one\n\nB) two");
    }

    #[test]
    fn test_pipe_becomes_i_by_default() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean("| think so"), "I think so");
    }

    #[test]
    fn test_zero_substitution_is_opt_in() {
        let default_cleaner = TextCleaner::default();
        assert_eq!(default_cleaner.clean("A. 100"), "A. 100");

        let lossy = TextCleaner::new(Substitutions {
            pipe_as_i: true,
            zero_as_o: true,
        });
        assert_eq!(lossy.clean("A. 100"), "A. 1OO");
    }

    #[test]
    fn test_no_substitutions() {
        let cleaner = TextCleaner::new(Substitutions::none());
        assert_eq!(cleaner.clean("a | b"), "a | b");
    }

    #[test]
    fn test_confusion_table_is_enumerable() {
        let mut entries: Vec<_> = OCR_CONFUSIONS.entries().map(|(k, v)| (*k, v.0)).collect();
        entries.sort();
        assert_eq!(entries, vec![('0', 'O'), ('|', 'I')]);
    }
}
