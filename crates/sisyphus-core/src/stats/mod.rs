//! Statistics module for Sisyphus
//!
//! Read-side projections over the session log: per-period totals, the
//! consecutive-day streak, per-project rollups and the paginated history.

mod report;
mod streak;

pub use report::{history, Bucket, HistoryPage, Period, PeriodReport, ProjectBucket, Reporter};
pub use streak::current_streak;
