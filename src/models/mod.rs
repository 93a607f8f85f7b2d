pub mod answer;
pub mod question;

pub use answer::{AnswerTally, Resolution};
pub use question::{OptionLabel, ParsedQuestion, RawLine, ValidityVerdict};
