//! Consecutive-day focus streak.

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Length of the run of consecutive days ending at the most recent date.
///
/// The run only counts if the most recent date is `today` or the day
/// before; anything older means the streak is already broken.
pub fn current_streak<I>(dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let distinct: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut days = distinct.into_iter().rev();

    let Some(mut previous) = days.next() else {
        return 0;
    };
    if (today - previous).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    for day in days {
        if (previous - day).num_days() != 1 {
            break;
        }
        streak += 1;
        previous = day;
    }
    streak
}
