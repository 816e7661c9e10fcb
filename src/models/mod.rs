pub mod essay;
pub mod loaders;

pub use essay::{
    format_float, EssayRecord, JudgmentRow, JudgmentScores, PerplexityGroup, ScoredEssay,
    TestSetRow,
};
pub use loaders::{read_headers, read_table, write_table};
