//! Port traits the domain and CLI talk through.

pub mod broker_port;
pub mod config_port;
pub mod data_port;
pub mod sink_port;
