use crate::models::question::OptionLabel;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 单次推断中每个选项的命中次数
///
/// 每个证据来源对同一标签最多贡献 1 次。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerTally {
    counts: BTreeMap<OptionLabel, u32>,
}

impl AnswerTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一个来源给出的标签集合
    pub fn merge(&mut self, labels: &BTreeSet<OptionLabel>) {
        for label in labels {
            *self.counts.entry(*label).or_insert(0) += 1;
        }
    }

    pub fn count(&self, label: OptionLabel) -> u32 {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// 所有标签的命中总数
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// 该标签占总命中的比例
    pub fn share(&self, label: OptionLabel) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.count(label)) / f64::from(total)
    }

    /// 比例不低于阈值的标签，按命中次数降序、标签升序排列
    pub fn ranked(&self, share_threshold: f64) -> Vec<OptionLabel> {
        let mut qualifying: Vec<(OptionLabel, u32)> = self
            .counts
            .iter()
            .filter(|(label, count)| **count > 0 && self.share(**label) >= share_threshold)
            .map(|(label, count)| (*label, *count))
            .collect();

        qualifying.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        qualifying.into_iter().map(|(label, _)| label).collect()
    }
}

/// 答案推断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 候选答案（非空，已排序）
    Answers(Vec<OptionLabel>),
    /// 没有足够证据
    NotFound,
}

impl Resolution {
    pub fn answers(&self) -> &[OptionLabel] {
        match self {
            Resolution::Answers(labels) => labels,
            Resolution::NotFound => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Answers(_))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Answers(labels) => {
                let joined: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
                write!(f, "{}", joined.join(", "))
            }
            Resolution::NotFound => write!(f, "No confident answer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[OptionLabel]) -> BTreeSet<OptionLabel> {
        labels.iter().copied().collect()
    }

    #[test]
    fn test_merge_counts_once_per_source() {
        let mut tally = AnswerTally::new();
        tally.merge(&set(&[OptionLabel::A, OptionLabel::C]));
        tally.merge(&set(&[OptionLabel::A]));

        assert_eq!(tally.count(OptionLabel::A), 2);
        assert_eq!(tally.count(OptionLabel::C), 1);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_ranked_orders_by_count_then_label() {
        let mut tally = AnswerTally::new();
        tally.merge(&set(&[OptionLabel::C, OptionLabel::B]));
        tally.merge(&set(&[OptionLabel::C, OptionLabel::B]));
        tally.merge(&set(&[OptionLabel::C]));

        // C = 3/5, B = 2/5
        assert_eq!(tally.ranked(0.3), vec![OptionLabel::C, OptionLabel::B]);
    }

    #[test]
    fn test_ranked_ties_break_by_label() {
        let mut tally = AnswerTally::new();
        tally.merge(&set(&[OptionLabel::D, OptionLabel::A]));

        assert_eq!(tally.ranked(0.3), vec![OptionLabel::A, OptionLabel::D]);
    }

    #[test]
    fn test_even_split_below_threshold_is_empty() {
        let mut tally = AnswerTally::new();
        for label in OptionLabel::ALL {
            tally.merge(&set(&[label]));
        }

        assert_eq!(tally.share(OptionLabel::A), 0.25);
        assert!(tally.ranked(0.3).is_empty());
    }

    #[test]
    fn test_resolution_display() {
        let r = Resolution::Answers(vec![OptionLabel::A, OptionLabel::C]);
        assert_eq!(r.to_string(), "A, C");
        assert_eq!(Resolution::NotFound.to_string(), "No confident answer");
    }
}
