pub mod consumer;
pub mod producer;
pub mod retry;

pub use consumer::KafkaEventConsumer;
pub use producer::KafkaEventProducer;
pub use retry::RetryPolicy;
