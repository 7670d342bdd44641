pub mod analyzer;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod ledger;
pub mod strategy;
