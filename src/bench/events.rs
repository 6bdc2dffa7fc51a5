use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Notifications for the external UI collaborator, delivered in the order the
/// orchestrator produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Controls should accept input again (false while a workload runs).
    UiEnabled(bool),
    /// Full cumulative result log, not a delta.
    ResultsChanged(String),
    DatasetSizeChanged(usize),
}

pub type EventSender = UnboundedSender<UiEvent>;
pub type EventReceiver = UnboundedReceiver<UiEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send that tolerates a departed subscriber.
pub(crate) fn emit(events: &EventSender, event: UiEvent) {
    let _ = events.send(event);
}
