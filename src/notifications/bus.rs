use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::models::PipelineEvent;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fire-and-forget fan-out of pipeline events to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Never waits and never fails; events sent with no subscriber are dropped.
    pub fn publish(&self, event: PipelineEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No subscribers for pipeline event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

/// Logs every event until the bus is dropped.
pub fn spawn_event_logger(mut event_rx: broadcast::Receiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(PipelineEvent::StageCompleted { athlete_id, stage }) => {
                    debug!("Athlete {}: stage {:?} completed", athlete_id, stage);
                }
                Ok(PipelineEvent::Evaluated(n)) => {
                    info!(
                        "Athlete {} evaluated: score {:.2}, rank {}, improvement {:+.2}, flagged {}",
                        n.athlete_id, n.overall_score, n.rank, n.improvement, n.cheat_detected
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event logger lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event channel closed");
                    break;
                }
            }
        }
    })
}
