pub mod config;
pub mod error;
pub mod file_store;
pub mod gateway;
pub mod ledger;
pub mod store;
