//! The today view: a user's dated subtasks classified into urgency
//! buckets and ordered deterministically.
//!
//! The pipeline is pure and per-request: validate the raw query
//! parameters (`filters`), fetch the matching rows, partition and
//! sort them (`buckets`), then let `api::today` assemble the payload.
//! Nothing here mutates stored data.

pub mod buckets;
pub mod filters;

pub use buckets::{classify, sort_buckets, TodayBuckets};
pub use filters::{FilterError, TodayFilters, TodayQuery};
