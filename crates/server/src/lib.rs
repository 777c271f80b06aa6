//! HTTP surface of the risk predictor

pub mod api;
pub mod config;
