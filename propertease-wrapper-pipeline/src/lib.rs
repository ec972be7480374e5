//! # PropertEase Wrapper Pipeline
//! This crate holds everything a wrapper process does between the queue and a
//! booking service: consuming messages, dispatching them per handler role,
//! converting properties to and from each service's format, calling the
//! service's REST API, reconciling imported reservations against the
//! identifier store and publishing the results.
pub mod adapter;
pub mod api;
pub mod consumer;
pub mod converter;
pub mod errors;
pub mod handler;
pub mod orchestrator;
pub mod publisher;
pub mod reconciler;
pub mod topics;
