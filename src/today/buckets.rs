//! Bucket classification and ordering for the today view.

use chrono::{Duration, NaiveDate};

use crate::hours::Hours;
use crate::model::SubtaskDetail;

/// The three disjoint urgency groups.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TodayBuckets {
    pub overdue: Vec<SubtaskDetail>,
    pub due_today: Vec<SubtaskDetail>,
    pub upcoming: Vec<SubtaskDetail>,
}

impl TodayBuckets {
    pub fn len(&self) -> usize {
        self.overdue.len() + self.due_today.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition dated subtasks around `reference` in a single pass.
///
/// Dates before the reference are overdue, the reference date itself
/// is due today, later dates are upcoming. With a horizon, upcoming
/// items dated after `reference + days_ahead` are dropped; a horizon
/// past the calendar range behaves as unbounded. Rows without a
/// target date are skipped (the fetch already excludes them).
pub fn classify(
    items: Vec<SubtaskDetail>,
    reference: NaiveDate,
    days_ahead: Option<i64>,
) -> TodayBuckets {
    // try_days is None for spans no calendar date can express, which
    // collapses to the unbounded case below.
    let cutoff = days_ahead
        .and_then(Duration::try_days)
        .and_then(|days| reference.checked_add_signed(days));

    let mut buckets = TodayBuckets::default();
    for item in items {
        let Some(date) = item.subtask.target_date else {
            continue;
        };
        if date < reference {
            buckets.overdue.push(item);
        } else if date == reference {
            buckets.due_today.push(item);
        } else if cutoff.map_or(true, |c| date <= c) {
            buckets.upcoming.push(item);
        }
    }
    buckets
}

/// Order each bucket in place: overdue and upcoming by target date
/// then estimated hours, due-today by estimated hours alone. The
/// sorts are stable, so equal keys keep their fetch order, and the
/// hours comparison is exact integer comparison.
pub fn sort_buckets(buckets: &mut TodayBuckets) {
    buckets.overdue.sort_by_key(date_then_hours);
    buckets.upcoming.sort_by_key(date_then_hours);
    buckets.due_today.sort_by_key(|item| item.subtask.estimated_hours);
}

fn date_then_hours(item: &SubtaskDetail) -> (Option<NaiveDate>, Hours) {
    (item.subtask.target_date, item.subtask.estimated_hours)
}
