pub mod baseline;
pub mod frequency;
pub mod rule;
pub mod rule_set;
pub mod time;
