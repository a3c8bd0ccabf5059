pub mod rule_generator;
