pub mod rate;
pub mod snapshot;
