pub mod export;
pub mod merge;
