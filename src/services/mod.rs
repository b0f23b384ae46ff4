pub mod analyzers;
pub mod artifacts;
pub mod cache;
pub mod cleanup;
pub mod data_persistance;
pub mod export;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod worker;

pub use artifacts::*;
pub use cache::*;
pub use cleanup::*;
pub use data_persistance::*;
pub use export::*;
pub use fetcher::*;
pub use pipeline::*;
pub use worker::*;
