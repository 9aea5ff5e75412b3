//! User-notification hook for collection dispatch.
//!
//! # Responsibility
//! - Describe user-visible notices raised by collection operations.
//! - Provide sinks: a drainable queue for UI bridges and a log-only sink.

use crate::model::feature_items::CollectionFeature;
use crate::model::item::ItemId;
use log::warn;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Notice category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// Add refused because the id already exists.
    Duplicate { id: ItemId },
}

/// One user-visible notice (rendered as a toast by the UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub feature: CollectionFeature,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn duplicate(feature: CollectionFeature, id: ItemId) -> Self {
        let message = format!("{} {id} already exists.", feature.item_label());
        Self {
            feature,
            kind: NoticeKind::Duplicate { id },
            message,
        }
    }
}

/// Receiver of user-visible notices.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

impl<F> NoticeSink for F
where
    F: Fn(Notice) + Send + Sync,
{
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// Sink that only writes a diagnostic line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn notify(&self, notice: Notice) {
        warn!(
            "event=collection_notice module=collection status=duplicate feature={}",
            notice.feature.as_str()
        );
    }
}

/// FIFO queue drained by a UI bridge.
#[derive(Debug, Default)]
pub struct NoticeQueue {
    pending: Mutex<VecDeque<Notice>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all pending notices in arrival order.
    pub fn drain(&self) -> Vec<Notice> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeSink for NoticeQueue {
    fn notify(&self, notice: Notice) {
        LogNoticeSink.notify(notice.clone());
        match self.pending.lock() {
            Ok(mut pending) => pending.push_back(notice),
            Err(poisoned) => poisoned.into_inner().push_back(notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Notice, NoticeQueue, NoticeSink};
    use crate::model::feature_items::CollectionFeature;
    use crate::model::item::ItemId;

    #[test]
    fn duplicate_message_uses_feature_label() {
        let notice = Notice::duplicate(CollectionFeature::ChatThreads, ItemId::Int(4));
        assert_eq!(notice.message, "Conversation 4 already exists.");
    }

    #[test]
    fn queue_drains_in_arrival_order() {
        let queue = NoticeQueue::new();
        queue.notify(Notice::duplicate(CollectionFeature::MailList, ItemId::Int(1)));
        queue.notify(Notice::duplicate(CollectionFeature::MailList, ItemId::Int(2)));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0].message, "Email 1 already exists.");
        assert_eq!(drained[1].message, "Email 2 already exists.");
        assert!(queue.is_empty());
    }
}
