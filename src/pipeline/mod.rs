// Pipelines: analysis (sentiment, keywords, themes, aggregation) and
// persistence of the tagged table.

pub mod analyze;
pub mod persist;
