mod adapter;
mod consumer;
mod conversion;
mod handler;
mod orchestrator;
mod publisher;

pub use adapter::AdapterError;
pub use consumer::ConsumerError;
pub use conversion::ConversionError;
pub use handler::HandlerError;
pub use orchestrator::OrchestratorError;
pub use publisher::PublisherError;
