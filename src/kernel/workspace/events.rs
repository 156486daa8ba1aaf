//! 工作区事件：多订阅者的类型化通道

use crate::models::ItemId;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// Active tab changed; `None` when the last tab closed.
    TabSwitched(Option<ItemId>),
    TabCreated(ItemId),
    TabClosed(ItemId),
    /// Content, name, language or dirty flag of one tab changed.
    TabUpdated(ItemId),
    /// The tab list itself changed (open/close/reorder).
    TabsChanged,
}

#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<Sender<WorkspaceEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<WorkspaceEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers `event` to every live subscriber; dropped receivers are pruned.
    pub fn emit(&mut self, event: WorkspaceEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/workspace/events.rs"]
mod tests;
