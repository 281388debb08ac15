// Bucket boundaries per step, all in UTC:
//   daily   -> midnight
//   weekly  -> Sunday midnight
//   monthly -> the 1st, midnight
//   yearly  -> Jan 1, midnight
// Everything that needs a bucket edge goes through here so boundaries match across calls
// (the merger compares bucket starts for equality).

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};

use crate::models::Step;

/// Start of the bucket containing `t` and start of the following bucket (unix seconds).
///
/// Instants chrono cannot represent (hundreds of millennia away) get `(t, i64::MAX)`.
pub fn bounds(t: i64, step: Step) -> (i64, i64) {
    let Some(at) = DateTime::<Utc>::from_timestamp(t, 0) else {
        return (t, i64::MAX);
    };
    let date = at.date_naive();
    let start = match step {
        Step::Daily => Some(date),
        Step::Weekly => {
            date.checked_sub_days(Days::new(date.weekday().num_days_from_sunday().into()))
        }
        Step::Monthly => date.with_day(1),
        Step::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    };
    let next = start.and_then(|s| match step {
        Step::Daily => s.checked_add_days(Days::new(1)),
        Step::Weekly => s.checked_add_days(Days::new(7)),
        Step::Monthly => s.checked_add_months(Months::new(1)),
        Step::Yearly => s.checked_add_months(Months::new(12)),
    });
    (start.map_or(t, midnight), next.map_or(i64::MAX, midnight))
}

pub fn bucket_start(t: i64, step: Step) -> i64 {
    bounds(t, step).0
}

pub fn next_boundary(t: i64, step: Step) -> i64 {
    bounds(t, step).1
}

fn midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}
