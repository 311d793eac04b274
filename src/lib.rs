pub mod advancement;
pub mod badges;
pub mod config;
pub mod error;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod results;
pub mod scoring;
pub mod standings;
pub mod store;

pub use error::{EngineError, EngineResult};
