//! HTTP reporting boundary for the capacity rollup engine

pub mod api;
pub mod config;
