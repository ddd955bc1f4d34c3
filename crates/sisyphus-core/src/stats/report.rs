//! Focus-time reports derived from the session log.
//!
//! Everything here is a pure projection: given the same sessions, the same
//! reference time and the same UTC offset, the output is identical. Nothing
//! is cached.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Offset, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

use super::streak::current_streak;
use crate::session::Session;

/// Reporting window, counted back from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Since local midnight.
    Day,
    /// Last 7 days.
    Week,
    /// Last calendar month.
    Month,
    /// Last 12 months.
    Year,
}

/// Granularity of a per-project rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Week,
    Month,
    Year,
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        })
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(Bucket::Week),
            "month" => Ok(Bucket::Month),
            "year" => Ok(Bucket::Year),
            other => Err(format!("unknown bucket: {other}")),
        }
    }
}

/// Summary for one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: Period,
    pub since: DateTime<Utc>,
    /// Sum of planned minutes over work sessions in the window.
    pub total_focus_minutes: u64,
    /// `total_focus_minutes` in hours, one decimal.
    pub total_hours: f64,
    pub focus_sessions: usize,
    /// Distinct local dates with at least one work session in the window.
    pub days_accessed: usize,
    /// Consecutive-day streak over the whole log.
    pub current_streak: u32,
}

/// Focus minutes per project within one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBucket {
    /// e.g. `2024-W19`, `2024-05`, `2024`
    pub label: String,
    pub start: NaiveDate,
    pub minutes_by_project: BTreeMap<String, u64>,
    pub total_minutes: u64,
}

/// One page of the reverse-chronological session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// 1-based
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub sessions: Vec<Session>,
}

/// Builds reports relative to a fixed "now" in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl Reporter {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Reporter in UTC.
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now)
    }

    /// Start of the reporting window for `period`.
    pub fn period_start(&self, period: Period) -> DateTime<Utc> {
        let local_now = self.now.with_timezone(&self.offset);
        match period {
            Period::Day => self
                .today()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| self.offset.from_local_datetime(&midnight).single())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(self.now),
            Period::Week => self.now - Duration::days(7),
            Period::Month => local_now
                .checked_sub_months(Months::new(1))
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(self.now),
            Period::Year => local_now
                .checked_sub_months(Months::new(12))
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(self.now),
        }
    }

    /// Work-session streak over the whole log.
    pub fn streak(&self, sessions: &[Session]) -> u32 {
        current_streak(
            sessions
                .iter()
                .filter(|s| s.is_work())
                .map(|s| self.local_date(s.start_time)),
            self.today(),
        )
    }

    pub fn report(&self, sessions: &[Session], period: Period) -> PeriodReport {
        let since = self.period_start(period);
        let in_window: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.is_work() && s.start_time >= since)
            .collect();

        let total_focus_minutes: u64 = in_window.iter().map(|s| u64::from(s.duration_minutes)).sum();
        let days: BTreeSet<NaiveDate> = in_window.iter().map(|s| self.local_date(s.start_time)).collect();

        PeriodReport {
            period,
            since,
            total_focus_minutes,
            total_hours: (total_focus_minutes as f64 / 60.0 * 10.0).round() / 10.0,
            focus_sessions: in_window.len(),
            days_accessed: days.len(),
            current_streak: self.streak(sessions),
        }
    }

    fn bucket_of(&self, date: NaiveDate, bucket: Bucket) -> (String, NaiveDate) {
        match bucket {
            Bucket::Week => {
                let week = date.iso_week();
                let start = NaiveDate::from_isoywd_opt(week.year(), week.week(), Weekday::Mon)
                    .unwrap_or(date);
                (format!("{}-W{:02}", week.year(), week.week()), start)
            }
            Bucket::Month => {
                let start = date.with_day(1).unwrap_or(date);
                (format!("{}-{:02}", date.year(), date.month()), start)
            }
            Bucket::Year => {
                let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
                (date.year().to_string(), start)
            }
        }
    }

    /// Focus minutes stacked by project per bucket, oldest bucket first.
    ///
    /// With `within`, only sessions inside that reporting window count.
    pub fn rollup(&self, sessions: &[Session], bucket: Bucket, within: Option<Period>) -> Vec<ProjectBucket> {
        let since = within.map(|p| self.period_start(p));
        let mut buckets: BTreeMap<NaiveDate, ProjectBucket> = BTreeMap::new();

        for s in sessions.iter().filter(|s| s.is_work()) {
            if since.is_some_and(|since| s.start_time < since) {
                continue;
            }
            let (label, start) = self.bucket_of(self.local_date(s.start_time), bucket);
            let entry = buckets.entry(start).or_insert_with(|| ProjectBucket {
                label,
                start,
                minutes_by_project: BTreeMap::new(),
                total_minutes: 0,
            });
            let minutes = u64::from(s.duration_minutes);
            *entry.minutes_by_project.entry(s.project_name.clone()).or_default() += minutes;
            entry.total_minutes += minutes;
        }

        buckets.into_values().collect()
    }
}

/// Page `page` (1-based) of sessions, newest first.
pub fn history(sessions: &[Session], page: usize, per_page: usize) -> HistoryPage {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total = sessions.len();

    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by(|a, b| b.start_time.cmp(&a.start_time));

    HistoryPage {
        page,
        per_page,
        total,
        total_pages: total.div_ceil(per_page),
        sessions: ordered
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect(),
    }
}
