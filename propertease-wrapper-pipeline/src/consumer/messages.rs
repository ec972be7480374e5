//! Message types exchanged between the consumer and the orchestrator.

/// Where a message was read from, enough to commit or replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug)]
pub enum StreamMessage {
    /// A raw message body awaiting processing.
    Message { payload: Vec<u8>, delivery: Delivery },
    /// Outcome of processing; `success = false` asks for redelivery.
    Acknowledgment {
        delivery: Delivery,
        success: bool,
        error: Option<String>,
    },
    /// The consumer stopped.
    End,
    Error(String),
}
