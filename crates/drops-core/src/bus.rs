use std::sync::Arc;
use tokio::sync::broadcast;

use drops_navigation::UpdateMode;

use crate::error::FailureKind;

/// Outcome of one update cycle, broadcast to anyone watching the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Published {
        mode: UpdateMode,
        width: usize,
        height: usize,
        changed_cells: usize,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because we hop across threads.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes to current subscribers and returns how many there were.
    /// Nobody listening is not an error.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let topic: Topic<UpdateEvent> = Topic::new(4);
        assert_eq!(
            topic.publish(UpdateEvent::Failed {
                kind: FailureKind::Schema,
                message: "dropped".into(),
            }),
            0
        );

        let mut rx = topic.subscribe();
        let event = UpdateEvent::Published {
            mode: UpdateMode::Refresh,
            width: 5,
            height: 5,
            changed_cells: 3,
        };
        assert_eq!(topic.publish(event.clone()), 1);
        assert_eq!(*rx.recv().await.unwrap(), event);
    }
}
