#![forbid(unsafe_code)]

pub mod align;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod fetch;
pub mod formats;
pub mod level;
pub mod logging;
pub mod normalize;
pub mod pool;
pub mod reader;
pub mod render;
pub mod scrape;
pub mod series;
pub mod writer;
