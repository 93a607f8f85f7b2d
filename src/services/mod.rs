pub mod answer_aggregator;
pub mod question_parser;
pub mod text_cleaner;
pub mod web_search;

pub use answer_aggregator::{AggregatorConfig, AnswerAggregator};
pub use question_parser::{strip_header_noise, ParserConfig, QuestionParser};
pub use text_cleaner::{Substitutions, TextCleaner};
pub use web_search::{PageFetcher, WebSearch};
