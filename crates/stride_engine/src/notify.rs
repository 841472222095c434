//! Notification dispatch seam.
//!
//! Level-up and course-completed events go to live client connections
//! owned elsewhere; from the engine's side dispatch is fire-and-forget.
//! A failed dispatch is logged and swallowed, never propagated into
//! the progression transaction that produced the event.

use std::sync::Mutex;

use tracing::{info, warn};

use stride_common::ProgressionEvent;

/// Downstream event sink.
pub trait Notifier: Send {
    fn dispatch(&self, event: &ProgressionEvent) -> anyhow::Result<()>;
}

/// Default sink: log the event and move on.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn dispatch(&self, event: &ProgressionEvent) -> anyhow::Result<()> {
        info!("{}", event.format_debug());
        Ok(())
    }
}

/// Collects events in memory. Used by tests and by embedders that
/// forward events on their own schedule.
#[derive(Default)]
pub struct BufferNotifier {
    events: Mutex<Vec<ProgressionEvent>>,
}

impl BufferNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<ProgressionEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<ProgressionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for BufferNotifier {
    fn dispatch(&self, event: &ProgressionEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

impl<N: Notifier + Send + Sync> Notifier for std::sync::Arc<N> {
    fn dispatch(&self, event: &ProgressionEvent) -> anyhow::Result<()> {
        (**self).dispatch(event)
    }
}

/// Dispatch and swallow failure.
pub(crate) fn emit(notifier: &dyn Notifier, event: ProgressionEvent) {
    if let Err(e) = notifier.dispatch(&event) {
        warn!("notification dispatch failed (ignored): {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn dispatch(&self, _event: &ProgressionEvent) -> anyhow::Result<()> {
            anyhow::bail!("sink down")
        }
    }

    #[test]
    fn test_emit_swallows_failures() {
        // Must not panic or propagate
        emit(
            &FailingNotifier,
            ProgressionEvent::level_up(Uuid::new_v4(), 2, 100),
        );
    }

    #[test]
    fn test_buffer_notifier_collects() {
        let sink = BufferNotifier::new();
        emit(&sink, ProgressionEvent::level_up(Uuid::new_v4(), 2, 100));
        emit(
            &sink,
            ProgressionEvent::course_completed(Uuid::new_v4(), Uuid::new_v4()),
        );
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.snapshot().is_empty());
    }
}
