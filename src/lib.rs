pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod locations;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod stats;

pub use error::{Error, Result};
