//! Ordered collection and its pure reducer.
//!
//! # Responsibility
//! - Hold an insertion-ordered sequence of uniquely identified items.
//! - Apply `Add | Remove | Edit | Sort` actions as pure transitions.
//!
//! # Invariants
//! - Item ids are unique within one collection.
//! - Invalid input never panics and never errors; it degrades to a no-op.
//! - A no-op returns a collection sharing the input buffer (`ptr_eq`); a
//!   change returns a fresh buffer.
//! - Sort is stable in both directions.

use crate::model::item::{CollectionItem, ItemId, SortKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors raised while seeding a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// Seed item at `index` has no id.
    MissingId { index: usize },
    /// Seed contains the same id twice.
    DuplicateId(ItemId),
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId { index } => write!(f, "seed item at index {index} has no id"),
            Self::DuplicateId(id) => write!(f, "seed contains duplicate id: {id}"),
        }
    }
}

impl Error for CollectionError {}

/// Sort direction for `CollectionAction::Sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// One state transition request.
///
/// Optional fields model inputs a caller may fail to supply; a missing
/// required input turns the action into a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionAction<T> {
    Add {
        item: T,
        insert_at_start: bool,
    },
    Remove {
        id: Option<ItemId>,
    },
    /// Full replacement; `item` is the complete new value, not a patch.
    Edit {
        id: Option<ItemId>,
        item: T,
        move_to_start: bool,
    },
    Sort {
        field: Option<String>,
        direction: Option<SortDirection>,
    },
}

/// Why an action left the collection unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Required id was not supplied (or the item carries none).
    MissingId,
    /// Sort field or direction was not supplied.
    MissingSortInput,
    /// Target id is not in the collection.
    NotFound,
    /// Edit replacement id belongs to a different existing item.
    IdConflict,
    /// Sort would not move any item.
    AlreadyOrdered,
}

/// Result classification of one reduce call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    Changed,
    /// Add refused because the id already exists.
    Duplicate(ItemId),
    Unchanged(NoOpReason),
}

impl ReduceOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Output of `reduce`: next state plus outcome classification.
#[derive(Debug, Clone)]
pub struct Reduction<T> {
    pub collection: OrderedCollection<T>,
    pub outcome: ReduceOutcome,
}

/// Insertion-ordered collection of uniquely identified items.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct OrderedCollection<T> {
    items: Arc<Vec<T>>,
}

impl<T> Clone for OrderedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for OrderedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T> OrderedCollection<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }

    fn from_vec_unchecked(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        self.items.as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Returns whether both handles share one buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T: CollectionItem + Clone> OrderedCollection<T> {
    /// Builds a pre-seeded collection.
    ///
    /// # Errors
    /// - `MissingId` when an item carries no id.
    /// - `DuplicateId` when two items share an id.
    pub fn from_items(items: Vec<T>) -> Result<Self, CollectionError> {
        let mut seen = HashSet::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let id = item.item_id().ok_or(CollectionError::MissingId { index })?;
            if !seen.insert(id.clone()) {
                return Err(CollectionError::DuplicateId(id));
            }
        }
        Ok(Self::from_vec_unchecked(items))
    }

    /// Returns the index of the item with `id`.
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.item_id().as_ref() == Some(id))
    }

    pub fn contains_id(&self, id: &ItemId) -> bool {
        self.position(id).is_some()
    }

    pub fn find(&self, id: &ItemId) -> Option<&T> {
        self.position(id).and_then(|index| self.items.get(index))
    }
}

/// Applies one action to `state` and returns the next state.
///
/// Pure: the input is never mutated and no side effects run here. Callers
/// that need the duplicate notice inspect `Reduction::outcome`.
pub fn reduce<T: CollectionItem + Clone>(
    state: &OrderedCollection<T>,
    action: CollectionAction<T>,
) -> Reduction<T> {
    match action {
        CollectionAction::Add {
            item,
            insert_at_start,
        } => add(state, item, insert_at_start),
        CollectionAction::Remove { id } => match id {
            Some(id) => remove(state, &id),
            None => unchanged(state, NoOpReason::MissingId),
        },
        CollectionAction::Edit {
            id,
            item,
            move_to_start,
        } => match id {
            Some(id) => edit(state, &id, item, move_to_start),
            None => unchanged(state, NoOpReason::MissingId),
        },
        CollectionAction::Sort { field, direction } => match (field, direction) {
            (Some(field), Some(direction)) if !field.trim().is_empty() => {
                sort(state, field.trim(), direction)
            }
            _ => unchanged(state, NoOpReason::MissingSortInput),
        },
    }
}

fn unchanged<T>(state: &OrderedCollection<T>, reason: NoOpReason) -> Reduction<T> {
    Reduction {
        collection: state.clone(),
        outcome: ReduceOutcome::Unchanged(reason),
    }
}

fn changed<T>(items: Vec<T>) -> Reduction<T> {
    Reduction {
        collection: OrderedCollection::from_vec_unchecked(items),
        outcome: ReduceOutcome::Changed,
    }
}

fn add<T: CollectionItem + Clone>(
    state: &OrderedCollection<T>,
    item: T,
    insert_at_start: bool,
) -> Reduction<T> {
    let Some(id) = item.item_id() else {
        return unchanged(state, NoOpReason::MissingId);
    };
    if state.contains_id(&id) {
        return Reduction {
            collection: state.clone(),
            outcome: ReduceOutcome::Duplicate(id),
        };
    }

    let mut items = Vec::with_capacity(state.len() + 1);
    if insert_at_start {
        items.push(item);
        items.extend(state.iter().cloned());
    } else {
        items.extend(state.iter().cloned());
        items.push(item);
    }
    changed(items)
}

fn remove<T: CollectionItem + Clone>(state: &OrderedCollection<T>, id: &ItemId) -> Reduction<T> {
    let Some(index) = state.position(id) else {
        return unchanged(state, NoOpReason::NotFound);
    };
    let mut items = state.items().to_vec();
    items.remove(index);
    changed(items)
}

fn edit<T: CollectionItem + Clone>(
    state: &OrderedCollection<T>,
    id: &ItemId,
    item: T,
    move_to_start: bool,
) -> Reduction<T> {
    let Some(index) = state.position(id) else {
        return unchanged(state, NoOpReason::NotFound);
    };
    let Some(new_id) = item.item_id() else {
        return unchanged(state, NoOpReason::MissingId);
    };
    // A replacement may carry a new id, but never one owned by another item.
    if &new_id != id && state.contains_id(&new_id) {
        return unchanged(state, NoOpReason::IdConflict);
    }

    let mut items = state.items().to_vec();
    if move_to_start {
        items.remove(index);
        items.insert(0, item);
    } else {
        items[index] = item;
    }
    changed(items)
}

fn sort<T: CollectionItem + Clone>(
    state: &OrderedCollection<T>,
    field: &str,
    direction: SortDirection,
) -> Reduction<T> {
    let keys: Vec<Option<SortKey>> = state.iter().map(|item| item.sort_key(field)).collect();
    let mut order: Vec<usize> = (0..keys.len()).collect();
    // `sort_by` is stable; reversing the comparator keeps ties in prior order.
    order.sort_by(|&a, &b| {
        let ordering = compare_keys(keys[a].as_ref(), keys[b].as_ref());
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    if order.iter().enumerate().all(|(slot, &index)| slot == index) {
        return unchanged(state, NoOpReason::AlreadyOrdered);
    }
    let items = order
        .into_iter()
        .map(|index| state.items()[index].clone())
        .collect();
    changed(items)
}

fn compare_keys(left: Option<&SortKey>, right: Option<&SortKey>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{reduce, CollectionAction, NoOpReason, OrderedCollection, ReduceOutcome};
    use crate::model::item::{ItemId, Record};

    fn seeded(ids: &[i64]) -> OrderedCollection<Record> {
        OrderedCollection::from_items(ids.iter().map(|id| Record::with_id(*id)).collect())
            .expect("seed ids are unique")
    }

    #[test]
    fn add_without_id_is_a_shared_no_op() {
        let state = seeded(&[1]);
        let result = reduce(
            &state,
            CollectionAction::Add {
                item: Record::new().set("name", "anonymous"),
                insert_at_start: false,
            },
        );
        assert_eq!(result.outcome, ReduceOutcome::Unchanged(NoOpReason::MissingId));
        assert!(result.collection.ptr_eq(&state));
    }

    #[test]
    fn edit_rejects_replacement_that_steals_another_id() {
        let state = seeded(&[1, 2]);
        let result = reduce(
            &state,
            CollectionAction::Edit {
                id: Some(ItemId::Int(1)),
                item: Record::with_id(2),
                move_to_start: false,
            },
        );
        assert_eq!(result.outcome, ReduceOutcome::Unchanged(NoOpReason::IdConflict));
        assert!(result.collection.ptr_eq(&state));
    }

    #[test]
    fn from_items_rejects_duplicates_and_missing_ids() {
        let duplicate = OrderedCollection::from_items(vec![Record::with_id(1), Record::with_id(1)]);
        assert!(duplicate.is_err());
        let missing = OrderedCollection::from_items(vec![Record::with_id(1), Record::new()]);
        assert!(missing.is_err());
    }
}
