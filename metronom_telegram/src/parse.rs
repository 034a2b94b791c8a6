use metronom_models::job::{JobFireTime, NewJob};

pub const TIME_USAGE: &str =
    "Invalid argument\nUsage: <time in 24h format> <message>\nExample: 1907 dinner";

const WEEKDAY_USAGE: &str =
    "Invalid day\nUsage: -w 0,1,2,3,4,5,6 \nExample: -w 0,3 sends a message every Sunday and Wednesday";
const MONTH_DAY_USAGE: &str =
    "Invalid date\nUsage: -d 12,23 \nExample: -d 12,23 sends a message every 12th and 23rd of the month";
const MONTH_USAGE: &str =
    "Invalid month\nUsage: -m 1,12 \nExample: -m 1,12 sends a message every Jan and Dec";

/// The closed set of /set flags, each with its own bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScheduleFlag {
    Weekday,
    MonthDay,
    Month,
}

impl ScheduleFlag {
    fn from_key(key: char) -> Option<Self> {
        match key {
            'w' => Some(Self::Weekday),
            'd' => Some(Self::MonthDay),
            'm' => Some(Self::Month),
            _ => None,
        }
    }

    fn bounds(self) -> (u8, u8) {
        match self {
            Self::Weekday => (0, 6),
            Self::MonthDay => (1, 31),
            Self::Month => (1, 12),
        }
    }

    fn max_values(self) -> usize {
        match self {
            Self::Weekday => 7,
            Self::MonthDay => 31,
            Self::Month => 12,
        }
    }

    fn usage(self) -> &'static str {
        match self {
            Self::Weekday => WEEKDAY_USAGE,
            Self::MonthDay => MONTH_DAY_USAGE,
            Self::Month => MONTH_USAGE,
        }
    }

    /// Parses the comma-separated value list, rejecting oversized lists and
    /// out-of-bounds entries with the flag's usage text.
    fn parse_values(self, raw: &str) -> Result<Vec<u8>, String> {
        let (lower, upper) = self.bounds();
        let tokens: Vec<&str> = raw.split(',').collect();

        if tokens.len() > self.max_values() {
            return Err(self.usage().to_string());
        }

        let mut values = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token.trim().parse::<u8>() {
                Ok(value) if (lower..=upper).contains(&value) => values.push(value),
                _ => return Err(self.usage().to_string()),
            }
        }

        Ok(values)
    }
}

/// Turns the argument text of /set into a job, or every validation error the
/// text contains. The first token is the `HHMM` time, the text before the
/// first `-` is the message, and each `-`-separated tail segment is a flag.
pub fn parse_set_args(args: &str) -> Result<NewJob, Vec<String>> {
    let mut errors = Vec::new();

    let args = args.trim();
    let (time_token, rest) = match args.split_once(char::is_whitespace) {
        Some((time_token, rest)) => (time_token, rest.trim()),
        None => (args, ""),
    };

    let fire_at = time_token.parse::<JobFireTime>().ok();

    let mut segments = rest.split('-');
    let message = segments.next().unwrap_or("").trim().to_string();

    if fire_at.is_none() || message.is_empty() {
        errors.push(TIME_USAGE.to_string());
    }

    let mut day = None;
    let mut date = None;
    let mut month = None;

    for segment in segments {
        let Some(key) = segment.chars().next() else {
            errors.push("Invalid flag -".to_string());
            continue;
        };

        match ScheduleFlag::from_key(key) {
            None => errors.push(format!("Invalid flag -{key}")),
            Some(flag) => match flag.parse_values(segment[key.len_utf8()..].trim()) {
                // A repeated flag overwrites the earlier occurrence.
                Ok(values) => match flag {
                    ScheduleFlag::Weekday => day = Some(values),
                    ScheduleFlag::MonthDay => date = Some(values),
                    ScheduleFlag::Month => month = Some(values),
                },
                Err(usage) => errors.push(usage),
            },
        }
    }

    let Some(fire_at) = fire_at else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewJob {
        fire_at,
        message,
        day,
        date,
        month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_time_and_message_parse() {
        let parsed = parse_set_args("1907 dinner").unwrap();

        assert_eq!(parsed.fire_at.storage_key(), "1907");
        assert_eq!(parsed.message, "dinner");
        assert_eq!(parsed.day, None);
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.month, None);
    }

    #[test]
    fn multi_word_messages_are_kept_whole() {
        let parsed = parse_set_args("0900 water the plants").unwrap();

        assert_eq!(parsed.message, "water the plants");
    }

    #[test]
    fn flags_set_exactly_their_fields() {
        let parsed = parse_set_args("1907 dinner -w 1,2 -d 2,4 -m 2,12").unwrap();

        assert_eq!(parsed.day, Some(vec![1, 2]));
        assert_eq!(parsed.date, Some(vec![2, 4]));
        assert_eq!(parsed.month, Some(vec![2, 12]));
    }

    #[test]
    fn flag_values_may_follow_the_key_directly() {
        let parsed = parse_set_args("0900 water plants -w0,1").unwrap();

        assert_eq!(parsed.message, "water plants");
        assert_eq!(parsed.day, Some(vec![0, 1]));
    }

    #[test]
    fn malformed_time_is_rejected_with_usage() {
        for args in ["190 dinner", "2460 dinner", "19x7 dinner", "dinner 1907"] {
            let errors = parse_set_args(args).unwrap_err();
            assert_eq!(errors, vec![TIME_USAGE.to_string()], "args = {args:?}");
        }
    }

    #[test]
    fn missing_message_is_rejected() {
        for args in ["1907", "1907   ", "1907 -w 0,3"] {
            let errors = parse_set_args(args).unwrap_err();
            assert_eq!(errors, vec![TIME_USAGE.to_string()], "args = {args:?}");
        }
    }

    #[test]
    fn unknown_flags_are_named_in_the_error() {
        let errors = parse_set_args("1907 dinner -x 1").unwrap_err();

        assert_eq!(errors, vec!["Invalid flag -x".to_string()]);
    }

    #[test]
    fn out_of_bounds_values_use_the_flags_usage_text() {
        let day_errors = parse_set_args("1907 dinner -w 7").unwrap_err();
        assert_eq!(day_errors.len(), 1);
        assert!(day_errors[0].starts_with("Invalid day"));

        let date_errors = parse_set_args("1907 dinner -d 0").unwrap_err();
        assert!(date_errors[0].starts_with("Invalid date"));

        let month_errors = parse_set_args("1907 dinner -m 13").unwrap_err();
        assert!(month_errors[0].starts_with("Invalid month"));
    }

    #[test]
    fn oversized_value_lists_are_rejected() {
        let errors = parse_set_args("1907 dinner -w 0,1,2,3,4,5,6,0").unwrap_err();

        assert!(errors[0].starts_with("Invalid day"));
    }

    #[test]
    fn empty_flag_values_are_rejected() {
        let errors = parse_set_args("1907 dinner -w").unwrap_err();

        assert!(errors[0].starts_with("Invalid day"));
    }

    #[test]
    fn errors_accumulate_across_the_whole_command() {
        let errors = parse_set_args("2500 dinner -x 1 -w 9").unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], TIME_USAGE);
        assert_eq!(errors[1], "Invalid flag -x");
        assert!(errors[2].starts_with("Invalid day"));
    }

    #[test]
    fn repeated_flags_keep_the_last_occurrence() {
        let parsed = parse_set_args("1907 dinner -w 0 -w 3").unwrap();

        assert_eq!(parsed.day, Some(vec![3]));
    }

    #[test]
    fn message_containing_a_dash_is_treated_as_a_flag_boundary() {
        let errors = parse_set_args("0900 check e-mail").unwrap_err();

        assert!(errors[0].starts_with("Invalid month"), "errors = {errors:?}");
    }

    proptest! {
        #[test]
        fn valid_commands_produce_exactly_the_given_fields(
            hour in 0u32..24,
            minute in 0u32..60,
            days in proptest::option::of(proptest::collection::vec(0u8..=6, 1..=7)),
            dates in proptest::option::of(proptest::collection::vec(1u8..=31, 1..=31)),
            months in proptest::option::of(proptest::collection::vec(1u8..=12, 1..=12)),
        ) {
            let mut args = format!("{hour:02}{minute:02} dinner");
            if let Some(days) = &days {
                args.push_str(&format!(" -w {}", render(days)));
            }
            if let Some(dates) = &dates {
                args.push_str(&format!(" -d {}", render(dates)));
            }
            if let Some(months) = &months {
                args.push_str(&format!(" -m {}", render(months)));
            }

            let parsed = parse_set_args(&args).unwrap();

            prop_assert_eq!(parsed.fire_at.hour(), hour);
            prop_assert_eq!(parsed.fire_at.minute(), minute);
            prop_assert_eq!(&parsed.message, "dinner");
            prop_assert_eq!(parsed.day, days);
            prop_assert_eq!(parsed.date, dates);
            prop_assert_eq!(parsed.month, months);
        }
    }

    fn render(values: &[u8]) -> String {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
