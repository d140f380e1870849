pub mod cache;
pub mod config;
pub mod errors;
pub mod options;
pub mod plugins;
pub mod resolver;
pub mod session;
pub mod streams;
pub mod web;
