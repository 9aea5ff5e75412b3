//! Feature-scoped dispatch handle over the collection reducer.
//!
//! # Responsibility
//! - Own the current collection state for one UI feature.
//! - Route actions through `reduce` and raise duplicate notices.
//!
//! # Invariants
//! - Exactly one notice is raised per refused duplicate add.
//! - State is replaced only when the reducer reports a change.

use crate::collection::notice::{LogNoticeSink, Notice, NoticeSink};
use crate::collection::reducer::{
    reduce, CollectionAction, CollectionError, OrderedCollection, ReduceOutcome, SortDirection,
};
use crate::model::feature_items::{ChatThread, CollectionFeature};
use crate::model::item::{CollectionItem, ItemId};
use log::debug;
use std::sync::Arc;

/// Dispatch handle bound to one feature's collection.
pub struct CollectionStore<T> {
    feature: CollectionFeature,
    state: OrderedCollection<T>,
    notices: Arc<dyn NoticeSink>,
}

impl<T: CollectionItem + Clone> CollectionStore<T> {
    /// Creates an empty store that reports notices to the log only.
    pub fn new(feature: CollectionFeature) -> Self {
        Self::with_sink(feature, Arc::new(LogNoticeSink))
    }

    pub fn with_sink(feature: CollectionFeature, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            feature,
            state: OrderedCollection::new(),
            notices,
        }
    }

    pub fn feature(&self) -> CollectionFeature {
        self.feature
    }

    /// Returns the current state; cheap, shares the buffer.
    pub fn snapshot(&self) -> OrderedCollection<T> {
        self.state.clone()
    }

    pub fn items(&self) -> &[T] {
        self.state.items()
    }

    /// Replaces the whole state with a seed, e.g. on feature mount.
    pub fn reset(&mut self, seed: Vec<T>) -> Result<(), CollectionError> {
        self.state = OrderedCollection::from_items(seed)?;
        Ok(())
    }

    /// Applies one action and returns its outcome.
    pub fn dispatch(&mut self, action: CollectionAction<T>) -> ReduceOutcome {
        let reduction = reduce(&self.state, action);
        match &reduction.outcome {
            ReduceOutcome::Changed => {
                self.state = reduction.collection;
            }
            ReduceOutcome::Duplicate(id) => {
                self.notices
                    .notify(Notice::duplicate(self.feature, id.clone()));
            }
            ReduceOutcome::Unchanged(reason) => {
                debug!(
                    "event=collection_noop module=collection status=skipped feature={} reason={:?}",
                    self.feature.as_str(),
                    reason
                );
            }
        }
        reduction.outcome
    }

    pub fn add(&mut self, item: T) -> ReduceOutcome {
        self.dispatch(CollectionAction::Add {
            item,
            insert_at_start: false,
        })
    }

    pub fn prepend(&mut self, item: T) -> ReduceOutcome {
        self.dispatch(CollectionAction::Add {
            item,
            insert_at_start: true,
        })
    }

    pub fn remove(&mut self, id: impl Into<ItemId>) -> ReduceOutcome {
        self.dispatch(CollectionAction::Remove {
            id: Some(id.into()),
        })
    }

    /// Replaces the item in place.
    pub fn edit(&mut self, id: impl Into<ItemId>, item: T) -> ReduceOutcome {
        self.dispatch(CollectionAction::Edit {
            id: Some(id.into()),
            item,
            move_to_start: false,
        })
    }

    /// Replaces the item and moves it to index 0.
    pub fn edit_to_front(&mut self, id: impl Into<ItemId>, item: T) -> ReduceOutcome {
        self.dispatch(CollectionAction::Edit {
            id: Some(id.into()),
            item,
            move_to_start: true,
        })
    }

    pub fn sort(&mut self, field: impl Into<String>, direction: SortDirection) -> ReduceOutcome {
        self.dispatch(CollectionAction::Sort {
            field: Some(field.into()),
            direction: Some(direction),
        })
    }
}

impl CollectionStore<ChatThread> {
    /// Records new activity on a thread and floats it to the top.
    pub fn touch_thread(&mut self, mut thread: ChatThread, at_epoch_ms: i64) -> ReduceOutcome {
        thread.last_message_at = at_epoch_ms;
        let id = thread.id.clone();
        self.edit_to_front(id, thread)
    }
}
