//! Mapping module - converts decoded daemon events to virtual device events

pub mod codes;
pub mod config;
pub mod mapper;
pub mod tables;

pub use config::{BridgeConfig, Config, ConfigError};
pub use mapper::{map_event, AxisScale};
pub use tables::{ButtonLayout, MappingTable};
