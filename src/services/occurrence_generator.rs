//! Occurrence generation for frequency rules.
//!
//! Given a [`FrequencySpec`] and a start date, produces the ordered sequence
//! of calendar dates on which the plan comes due. The sequence is lazy
//! ([`Occurrences`] is an iterator), strictly increasing, never earlier than
//! the start date, and deterministic: the same spec and start date always
//! yield the same dates.
//!
//! Weekly and monthly rules stop at a bounded [`ScanHorizon`]; a rule that
//! cannot produce more dates within it simply ends early. Nothing here
//! returns an error.

use std::collections::{btree_set, BTreeSet};
use std::iter::FusedIterator;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::models::frequency::{DayOfWeek, FrequencySpec, MonthlyAnchor};
use crate::services::calendar;

/// How far ahead weekly and monthly rules are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHorizon {
    /// Weeks of elapsed days scanned by weekly rules.
    pub weeks: u32,
    /// Calendar months scanned by monthly rules, counting the start month.
    pub months: u32,
}

impl Default for ScanHorizon {
    fn default() -> Self {
        Self {
            weeks: 52,
            months: 12,
        }
    }
}

/// Computes occurrence dates for frequency rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceGenerator {
    horizon: ScanHorizon,
}

impl OccurrenceGenerator {
    pub const fn new(horizon: ScanHorizon) -> Self {
        Self { horizon }
    }

    pub const fn horizon(&self) -> ScanHorizon {
        self.horizon
    }

    /// First `count` occurrences of `spec` on or after `start`.
    pub fn generate(&self, spec: &FrequencySpec, start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let dates: Vec<NaiveDate> = self.occurrences(spec, start).take(count).collect();
        tracing::debug!(
            kind = spec.kind().as_str(),
            %start,
            requested = count,
            produced = dates.len(),
            "generated occurrences"
        );
        dates
    }

    /// Lazy sequence of occurrences of `spec` on or after `start`.
    pub fn occurrences<'a>(&self, spec: &'a FrequencySpec, start: NaiveDate) -> Occurrences<'a> {
        self.occurrences_from(spec, start, start)
    }

    /// Occurrences of a rule that started on `anchor`, from `from` onwards.
    ///
    /// The rule keeps its phase relative to `anchor` (day step, week index,
    /// month step) while only dates `>= from` are emitted. The scan horizon
    /// is measured from `from`. A `from` earlier than `anchor` is treated as
    /// `anchor`.
    pub fn occurrences_from<'a>(
        &self,
        spec: &'a FrequencySpec,
        anchor: NaiveDate,
        from: NaiveDate,
    ) -> Occurrences<'a> {
        let from = from.max(anchor);
        let state = match spec {
            FrequencySpec::Daily { interval_days } => daily_state(*interval_days, anchor, from),
            FrequencySpec::Weekly {
                interval_weeks,
                weekdays,
            } => weekly_state(*interval_weeks, weekdays, anchor, from, self.horizon.weeks),
            FrequencySpec::Monthly {
                interval_months,
                anchor: month_anchor,
            } => monthly_state(*interval_months, *month_anchor, anchor, from, self.horizon.months),
            FrequencySpec::Custom { dates } => State::Custom {
                dates: dates.range(from..),
            },
        };
        Occurrences { state }
    }
}

/// Iterator over the occurrences of one rule.
///
/// A clone continues from the same position. Ask the generator again to
/// restart from the beginning.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    state: State<'a>,
}

#[derive(Debug, Clone)]
enum State<'a> {
    Daily {
        next: NaiveDate,
        step: Days,
    },
    Weekly {
        cursor: NaiveDate,
        end: NaiveDate,
        anchor: NaiveDate,
        interval: i64,
        weekdays: &'a BTreeSet<DayOfWeek>,
    },
    Monthly {
        month: i64,
        limit: i64,
        step: i64,
        anchor: MonthlyAnchor,
        from: NaiveDate,
    },
    Custom {
        dates: btree_set::Range<'a, NaiveDate>,
    },
    Done,
}

fn daily_state<'a>(interval: u32, anchor: NaiveDate, from: NaiveDate) -> State<'a> {
    let step = u64::from(interval.max(1));
    let elapsed = (from - anchor).num_days().unsigned_abs();
    let first = elapsed.div_ceil(step).checked_mul(step);
    match first.and_then(|offset| anchor.checked_add_days(Days::new(offset))) {
        Some(next) => State::Daily {
            next,
            step: Days::new(step),
        },
        None => State::Done,
    }
}

fn weekly_state<'a>(
    interval: u32,
    weekdays: &'a BTreeSet<DayOfWeek>,
    anchor: NaiveDate,
    from: NaiveDate,
    horizon_weeks: u32,
) -> State<'a> {
    if weekdays.is_empty() {
        return State::Done;
    }
    let end = from
        .checked_add_days(Days::new(u64::from(horizon_weeks) * 7))
        .unwrap_or(NaiveDate::MAX);
    State::Weekly {
        cursor: from,
        end,
        anchor,
        interval: i64::from(interval.max(1)),
        weekdays,
    }
}

fn monthly_state<'a>(
    interval: u32,
    month_anchor: MonthlyAnchor,
    anchor: NaiveDate,
    from: NaiveDate,
    horizon_months: u32,
) -> State<'a> {
    let step = i64::from(interval.max(1));
    let anchor_month = calendar::month_index(anchor);
    let from_month = calendar::month_index(from);
    let elapsed = from_month - anchor_month;
    let first = anchor_month + (elapsed + step - 1).div_euclid(step) * step;
    State::Monthly {
        month: first,
        limit: from_month + i64::from(horizon_months),
        step,
        anchor: month_anchor,
        from,
    }
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            match &mut self.state {
                State::Daily { next, step } => {
                    let current = *next;
                    match current.checked_add_days(*step) {
                        Some(following) => *next = following,
                        None => self.state = State::Done,
                    }
                    return Some(current);
                }
                State::Weekly {
                    cursor,
                    end,
                    anchor,
                    interval,
                    weekdays,
                } => {
                    if *cursor >= *end {
                        self.state = State::Done;
                        continue;
                    }
                    let day = *cursor;
                    let week = (day - *anchor).num_days().div_euclid(7);
                    let matches =
                        week % *interval == 0 && weekdays.contains(&DayOfWeek::of(day));
                    match day.succ_opt() {
                        Some(succ) => *cursor = succ,
                        None => *end = day,
                    }
                    if matches {
                        return Some(day);
                    }
                }
                State::Monthly {
                    month,
                    limit,
                    step,
                    anchor,
                    from,
                } => {
                    if *month >= *limit {
                        self.state = State::Done;
                        continue;
                    }
                    let index = *month;
                    *month += *step;
                    let Some(first) = calendar::first_of_month(index) else {
                        self.state = State::Done;
                        continue;
                    };
                    let candidate = match *anchor {
                        MonthlyAnchor::DayOfMonth { day } => {
                            calendar::clamped_day_of_month(first, day)
                        }
                        MonthlyAnchor::NthWeekdayOfMonth { ordinal, weekday } => {
                            calendar::nth_weekday_of_month(first, ordinal, weekday)
                        }
                    };
                    match candidate {
                        Some(date) if date >= *from => return Some(date),
                        _ => {}
                    }
                }
                State::Custom { dates } => {
                    let next = dates.next().copied();
                    if next.is_none() {
                        self.state = State::Done;
                    }
                    return next;
                }
                State::Done => return None,
            }
        }
    }
}

impl FusedIterator for Occurrences<'_> {}
