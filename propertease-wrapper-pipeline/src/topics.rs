//! Kafka topic names shared by the consumer and the publisher.
use propertease_wrapper_shared::Service;

/// Messages addressed to every wrapper.
pub const BROADCAST_TOPIC: &str = "wrapper.broadcast";

/// Responses consumed by the application backend.
pub const TO_APP_TOPIC: &str = "wrapper.to_app";

/// Responses consumed by the calendar service.
pub const TO_CALENDAR_TOPIC: &str = "wrapper.to_calendar";

/// The topic carrying messages addressed to a single service's wrappers.
pub fn service_topic(service: Service) -> String {
    format!("wrapper.{}", service.as_str())
}
