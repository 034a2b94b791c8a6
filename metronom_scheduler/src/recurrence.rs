use chrono::{Datelike, NaiveDate};

use metronom_models::job::Job;

/// Decides whether a job fires on the given date, already shifted into the
/// job's own timezone. Each present constraint must match; an absent one is a
/// wildcard. Weekdays count from Sunday as 0, months from January as 1.
pub fn fires_on(job: &Job, local_date: NaiveDate) -> bool {
    if let Some(day) = &job.day {
        if !day.contains(&(local_date.weekday().num_days_from_sunday() as u8)) {
            return false;
        }
    }
    if let Some(date) = &job.date {
        if !date.contains(&(local_date.day() as u8)) {
            return false;
        }
    }
    if let Some(month) = &job.month {
        if !month.contains(&(local_date.month() as u8)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use metronom_models::job::TzOffset;
    use proptest::prelude::*;

    fn job(day: Option<Vec<u8>>, date: Option<Vec<u8>>, month: Option<Vec<u8>>) -> Job {
        Job {
            fire_at: "1907".parse().unwrap(),
            message: "dinner".to_string(),
            day,
            date,
            month,
            tz: TzOffset::DEFAULT,
        }
    }

    #[test]
    fn weekday_constraint_only_matches_listed_days() {
        // 2025-06-01 is a Sunday, 2025-06-04 a Wednesday, 2025-06-05 a Thursday.
        let sunday_and_wednesday = job(Some(vec![0, 3]), None, None);

        assert!(fires_on(&sunday_and_wednesday, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        assert!(fires_on(&sunday_and_wednesday, NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()));
        assert!(!fires_on(&sunday_and_wednesday, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap()));
    }

    #[test]
    fn date_constraint_only_matches_listed_days_of_month() {
        let twelfth_and_twenty_third = job(None, Some(vec![12, 23]), None);

        assert!(fires_on(&twelfth_and_twenty_third, NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()));
        assert!(fires_on(&twelfth_and_twenty_third, NaiveDate::from_ymd_opt(2025, 6, 23).unwrap()));
        assert!(!fires_on(&twelfth_and_twenty_third, NaiveDate::from_ymd_opt(2025, 6, 13).unwrap()));
    }

    #[test]
    fn month_constraint_only_matches_listed_months() {
        let january_and_december = job(None, None, Some(vec![1, 12]));

        assert!(fires_on(&january_and_december, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()));
        assert!(fires_on(&january_and_december, NaiveDate::from_ymd_opt(2025, 12, 5).unwrap()));
        assert!(!fires_on(&january_and_december, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap()));
    }

    #[test]
    fn all_constraints_must_match_together() {
        // 2025-06-04: a Wednesday, the 4th, in June.
        let date = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();

        assert!(fires_on(&job(Some(vec![3]), Some(vec![4]), Some(vec![6])), date));
        assert!(!fires_on(&job(Some(vec![3]), Some(vec![4]), Some(vec![7])), date));
        assert!(!fires_on(&job(Some(vec![3]), Some(vec![5]), Some(vec![6])), date));
        assert!(!fires_on(&job(Some(vec![2]), Some(vec![4]), Some(vec![6])), date));
    }

    proptest! {
        #[test]
        fn unconstrained_jobs_fire_every_day(days_offset in 0i64..10_000) {
            let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
                + chrono::Duration::days(days_offset);

            prop_assert!(fires_on(&job(None, None, None), date));
        }

        #[test]
        fn weekday_constraint_ignores_date_and_month(days_offset in 0i64..10_000) {
            let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
                + chrono::Duration::days(days_offset);
            let weekday = date.weekday().num_days_from_sunday() as u8;

            let matching = job(Some(vec![weekday]), None, None);
            let other = job(Some(vec![(weekday + 1) % 7]), None, None);

            prop_assert!(fires_on(&matching, date));
            prop_assert!(!fires_on(&other, date));
        }
    }
}
