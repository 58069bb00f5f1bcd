pub mod cache;
pub mod config;
pub mod dumper;
pub mod engines;
pub mod model;
pub mod observability;
pub mod source;
pub mod spawn;
pub mod storage;
