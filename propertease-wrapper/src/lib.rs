//! # PropertEase Wrapper
//!
//! Process entry point for one booking service wrapper. A wrapper binds a
//! single booking service (Zooking, Earthstayin or Clickandgo) and a handler
//! role, consumes that service's topic and the broadcast topic, and keeps the
//! service in step with the rest of PropertEase.
//!
//! ## Modules
//!
//! - [`config`]: Environment configuration and dependency wiring
//! - [`errors`]: Error types for startup and execution

pub mod config;
pub mod errors;

pub use config::{Dependencies, WrapperConfig};
pub use errors::WrapperError;
