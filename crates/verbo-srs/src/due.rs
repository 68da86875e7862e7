//! Ordering of the items a learner should review next.

use std::{cmp::Ordering, collections::BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{ItemId, ReviewRecord, TopicFilter};

/// Where never-attempted items go in a due set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewItems {
    /// After every overdue reviewed item. Not-yet-due items are never part of
    /// a due set, so this is also "new items last".
    #[default]
    AfterReviews,
    /// Leave new items out entirely.
    Exclude,
}

/// What to include in a due set. The default returns every due item with
/// new candidates last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueQuery {
    /// Maximum number of items returned.
    pub limit: Option<usize>,
    /// Restricts the reviewed records considered.
    pub topic: TopicFilter,
    /// Items the caller can offer as new material. Candidates that already
    /// have a record are ignored as new items.
    pub candidates: Vec<ItemId>,
    pub new_items: NewItems,
    /// Maximum number of new items in one batch.
    pub max_new: Option<usize>,
}

/// Order of reviewed items: most overdue first, harder items first among
/// equally due ones, then by id.
pub fn compare_due(a: &ReviewRecord, b: &ReviewRecord) -> Ordering {
    a.due_at
        .cmp(&b.due_at)
        .then_with(|| a.easiness_factor.total_cmp(&b.easiness_factor))
        .then_with(|| a.item_id.cmp(&b.item_id))
}

/// Build the ordered due set.
///
/// `records` may contain anything; only records matching the query's topic
/// filter with `due_at <= now` are kept. `unseen` must only contain items the
/// learner has no record for.
pub fn select_due(
    records: &[ReviewRecord],
    unseen: &[ItemId],
    now: DateTime<Utc>,
    query: &DueQuery,
) -> Vec<ItemId> {
    let mut due: Vec<&ReviewRecord> = records
        .iter()
        .filter(|record| record.is_due(now) && query.topic.matches(&record.topic))
        .collect();
    due.sort_by(|a, b| compare_due(a, b));

    let reviewed: BTreeSet<&ItemId> = records.iter().map(|record| &record.item_id).collect();
    let fresh: Vec<&ItemId> = match query.new_items {
        NewItems::Exclude => Vec::new(),
        NewItems::AfterReviews => unseen
            .iter()
            .filter(|item| !reviewed.contains(item))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(query.max_new.unwrap_or(usize::MAX))
            .collect(),
    };

    due.into_iter()
        .map(|record| &record.item_id)
        .chain(fresh)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}
