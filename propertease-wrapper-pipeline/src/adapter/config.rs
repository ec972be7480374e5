use propertease_wrapper_shared::Service;

use crate::topics::service_topic;

/// How a booking service models closed time frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementEventStyle {
    /// Time frames are a resource of their own under `properties/closedtimeframes`.
    ClosedTimeFrameResource,
    /// Time frames live inside the property and change through property updates.
    EmbeddedInProperty,
}

/// Everything that differs between booking services apart from field translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorConfig {
    pub service: Service,
    pub base_url: String,
    /// Topic carrying messages addressed to this service.
    pub topic: String,
    pub management_events: ManagementEventStyle,
}

impl VendorConfig {
    pub fn for_service(service: Service) -> Self {
        let management_events = match service {
            Service::Zooking => ManagementEventStyle::EmbeddedInProperty,
            Service::Earthstayin | Service::Clickandgo => {
                ManagementEventStyle::ClosedTimeFrameResource
            }
        };
        Self {
            service,
            base_url: default_base_url(service).to_string(),
            topic: service_topic(service),
            management_events,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Local address of each booking service's API.
pub fn default_base_url(service: Service) -> &'static str {
    match service {
        Service::Zooking => "http://localhost:8000/",
        Service::Earthstayin => "http://localhost:8001/",
        Service::Clickandgo => "http://localhost:8002/",
    }
}
