mod bus;
mod models;

pub use bus::{spawn_event_logger, EventBus, DEFAULT_EVENT_CHANNEL_CAPACITY};
pub use models::{EvaluationNotification, PipelineEvent, PipelineStage};
