// Reviewlens: sentiment, keyword, and theme analytics for banking app reviews
//
// This is the library root. Each module corresponds to a stage of the
// review analytics pipeline or one of its collaborators.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod keywords;
pub mod output;
pub mod pipeline;
pub mod reviews;
pub mod sentiment;
pub mod status;
pub mod themes;
