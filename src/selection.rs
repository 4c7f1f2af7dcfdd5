// src/selection.rs
//! Eligibility filter and random pick.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::announcement::{start_of_day, Announcement};

pub const DEFAULT_MIN_AGE_HOURS: f64 = 1.0;
pub const DEFAULT_MAX_AGE_DAYS: f64 = 30.0;

/// Inclusive age bounds, measured against the announcement's derived date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeWindow {
    pub min_age_hours: f64,
    pub max_age_days: f64,
}

impl Default for AgeWindow {
    fn default() -> Self {
        Self {
            min_age_hours: DEFAULT_MIN_AGE_HOURS,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

impl AgeWindow {
    pub fn new(min_age_hours: f64, max_age_days: f64) -> Self {
        Self {
            min_age_hours,
            max_age_days,
        }
    }

    pub fn contains(&self, a: &Announcement, now: DateTime<Utc>) -> bool {
        a.age_hours(now) >= self.min_age_hours && a.age_days(now) <= self.max_age_days
    }

    /// Past the upper bound for good: an item dated `date` can never be eligible again.
    pub fn is_expired(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        let age_days = (now - start_of_day(date)).num_milliseconds() as f64 / 86_400_000.0;
        age_days > self.max_age_days
    }

    /// Unposted and inside the window.
    pub fn is_eligible(&self, a: &Announcement, now: DateTime<Utc>) -> bool {
        !a.posted && self.contains(a, now)
    }

    pub fn eligible<'a, I>(&self, items: I, now: DateTime<Utc>) -> Vec<&'a Announcement>
    where
        I: IntoIterator<Item = &'a Announcement>,
    {
        items
            .into_iter()
            .filter(|a| self.is_eligible(a, now))
            .collect()
    }
}

/// Uniform pick; `None` for an empty slice.
pub fn pick_random<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.random_range(0..items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announcement::{start_of_day, Source};
    use chrono::{Duration, NaiveDate, TimeZone};
    use rand::{rngs::StdRng, SeedableRng};

    fn at(date: NaiveDate, posted: bool) -> Announcement {
        Announcement {
            id: format!("{date}-x"),
            content: "x".into(),
            source: Source::Website,
            date,
            timestamp: start_of_day(date),
            discovered_at: start_of_day(date),
            title: None,
            posted,
            last_posted: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn min_age_boundary_is_inclusive() {
        let w = AgeWindow::default();
        let a = at(day(3), false);
        let exactly_one_hour = start_of_day(day(3)) + Duration::hours(1);
        assert!(w.is_eligible(&a, exactly_one_hour));
        assert!(!w.is_eligible(&a, exactly_one_hour - Duration::seconds(1)));
    }

    #[test]
    fn max_age_boundary_is_inclusive() {
        let w = AgeWindow::default();
        let a = at(day(1), false);
        let exactly_thirty_days = start_of_day(day(1)) + Duration::days(30);
        assert!(w.is_eligible(&a, exactly_thirty_days));
        assert!(!w.is_eligible(&a, exactly_thirty_days + Duration::seconds(1)));
    }

    #[test]
    fn expiry_matches_the_upper_bound() {
        let w = AgeWindow::default();
        let exactly_thirty_days = start_of_day(day(1)) + Duration::days(30);
        assert!(!w.is_expired(day(1), exactly_thirty_days));
        assert!(w.is_expired(day(1), exactly_thirty_days + Duration::seconds(1)));
        // too young is not expired
        assert!(!w.is_expired(day(1), start_of_day(day(1))));
    }

    #[test]
    fn posted_items_never_eligible() {
        let w = AgeWindow::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let items = [at(day(1), true), at(day(2), false)];
        let got = w.eligible(items.iter(), now);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].date, day(2));
    }

    #[test]
    fn pick_stays_within_set() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pick_random::<u8, _>(&[], &mut rng).is_none());
        let items = [1, 2, 3];
        for _ in 0..50 {
            let got = pick_random(&items, &mut rng).copied().unwrap();
            assert!(items.contains(&got));
        }
    }
}
