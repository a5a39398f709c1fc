#![forbid(unsafe_code)]

//! Calendar bucketing for timestamp group keys.
//!
//! A [`Freq`] names a period in pandas offset-alias form (`D`, `W`,
//! `W-MON`, `M`, ...). [`period_start`] truncates a timestamp to the first
//! instant of its period and [`period_range`] lists every period start
//! between two timestamps, inclusive and without gaps.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Weekday};
use fe_types::{naive_to_nanos, nanos_to_naive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Period frequency.
///
/// `Week` carries the weekday each period *ends* on, like pandas `W-SUN`;
/// the period then starts on the following weekday at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freq {
    Second,
    Minute,
    Hour,
    Day,
    Week(Weekday),
    Month,
    Quarter,
    Year,
}

impl Default for Freq {
    fn default() -> Self {
        Self::Week(Weekday::Sun)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("unknown period frequency {spec:?}")]
    UnknownFreq { spec: String },
    #[error("timestamp {nanos}ns cannot be bucketed at {freq} without leaving the supported range")]
    TimestampOutOfRange { nanos: i64, freq: Freq },
}

impl FromStr for Freq {
    type Err = PeriodError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let spec = input.trim();
        let unknown = || PeriodError::UnknownFreq {
            spec: spec.to_owned(),
        };

        let upper = spec.to_ascii_uppercase();
        if let Some(anchor) = upper.strip_prefix("W-") {
            return anchor.parse::<Weekday>().map(Self::Week).map_err(|_| unknown());
        }

        match upper.as_str() {
            "S" | "SEC" => Ok(Self::Second),
            "T" | "MIN" => Ok(Self::Minute),
            "H" => Ok(Self::Hour),
            "D" => Ok(Self::Day),
            "W" => Ok(Self::Week(Weekday::Sun)),
            "M" | "MS" | "ME" => Ok(Self::Month),
            "Q" | "QS" | "QE" | "Q-DEC" => Ok(Self::Quarter),
            "Y" | "YS" | "YE" | "A" | "AS" | "Y-DEC" | "A-DEC" => Ok(Self::Year),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Second => write!(f, "s"),
            Self::Minute => write!(f, "min"),
            Self::Hour => write!(f, "h"),
            Self::Day => write!(f, "D"),
            Self::Week(end) => write!(f, "W-{}", end.to_string().to_ascii_uppercase()),
            Self::Month => write!(f, "M"),
            Self::Quarter => write!(f, "Q-DEC"),
            Self::Year => write!(f, "Y-DEC"),
        }
    }
}

impl Serialize for Freq {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Freq {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = String::deserialize(deserializer)?;
        spec.parse().map_err(serde::de::Error::custom)
    }
}

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

fn truncate(value: NaiveDateTime, freq: Freq) -> Option<NaiveDateTime> {
    let date = value.date();
    match freq {
        Freq::Second => value.with_nanosecond(0),
        Freq::Minute => date.and_hms_opt(value.hour(), value.minute(), 0),
        Freq::Hour => date.and_hms_opt(value.hour(), 0, 0),
        Freq::Day => midnight(date),
        Freq::Week(end) => {
            let first_day = end.succ();
            let days_back = (date.weekday().num_days_from_monday() + 7
                - first_day.num_days_from_monday())
                % 7;
            date.checked_sub_signed(TimeDelta::try_days(i64::from(days_back))?)
                .and_then(midnight)
        }
        Freq::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).and_then(midnight),
        Freq::Quarter => {
            let first_month = (date.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), first_month, 1).and_then(midnight)
        }
        Freq::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(midnight),
    }
}

fn advance(start: NaiveDateTime, freq: Freq) -> Option<NaiveDateTime> {
    let fixed = |seconds: i64| {
        TimeDelta::try_seconds(seconds).and_then(|delta| start.checked_add_signed(delta))
    };
    match freq {
        Freq::Second => fixed(1),
        Freq::Minute => fixed(60),
        Freq::Hour => fixed(3_600),
        Freq::Day => fixed(86_400),
        Freq::Week(_) => fixed(7 * 86_400),
        Freq::Month => start.checked_add_months(Months::new(1)),
        Freq::Quarter => start.checked_add_months(Months::new(3)),
        Freq::Year => start.checked_add_months(Months::new(12)),
    }
}

/// First instant of the period containing `nanos`.
///
/// Matches `ts.to_period(freq).start_time`.
pub fn period_start(nanos: i64, freq: Freq) -> Result<i64, PeriodError> {
    truncate(nanos_to_naive(nanos), freq)
        .and_then(naive_to_nanos)
        .ok_or(PeriodError::TimestampOutOfRange { nanos, freq })
}

/// Start of the period following the one that starts at `start`.
pub fn next_period_start(start: i64, freq: Freq) -> Result<i64, PeriodError> {
    advance(nanos_to_naive(start), freq)
        .and_then(naive_to_nanos)
        .ok_or(PeriodError::TimestampOutOfRange {
            nanos: start,
            freq,
        })
}

/// Every period start from the period of `first` to the period of `last`.
///
/// Matches `pd.period_range(first, last, freq=freq).to_timestamp()`.
/// Returns an empty range when `first` falls after `last`.
pub fn period_range(first: i64, last: i64, freq: Freq) -> Result<Vec<i64>, PeriodError> {
    let mut current = period_start(first, freq)?;
    let end = period_start(last, freq)?;
    let mut out = Vec::new();
    while current <= end {
        out.push(current);
        if current == end {
            break;
        }
        current = next_period_start(current, freq)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;
    use fe_types::parse_timestamp;

    use super::{Freq, PeriodError, period_range, period_start};

    fn ts(text: &str) -> i64 {
        parse_timestamp(text).expect("valid timestamp literal")
    }

    #[test]
    fn default_week_starts_on_monday() {
        // 2024-01-03 is a Wednesday; its W-SUN period starts Monday 2024-01-01.
        assert_eq!(
            period_start(ts("2024-01-03 15:30:00"), Freq::default()).expect("start"),
            ts("2024-01-01")
        );
        // Sunday still belongs to the week that started the Monday before.
        assert_eq!(
            period_start(ts("2024-01-07 23:59:59"), Freq::default()).expect("start"),
            ts("2024-01-01")
        );
    }

    #[test]
    fn anchored_week_starts_after_anchor() {
        // W-WED periods run Thursday..Wednesday.
        let freq = Freq::Week(Weekday::Wed);
        assert_eq!(
            period_start(ts("2024-01-03"), freq).expect("start"),
            ts("2023-12-28")
        );
        assert_eq!(
            period_start(ts("2024-01-04"), freq).expect("start"),
            ts("2024-01-04")
        );
    }

    #[test]
    fn calendar_periods_truncate_to_first_day() {
        let value = ts("2024-08-17 10:11:12");
        assert_eq!(period_start(value, Freq::Month).expect("m"), ts("2024-08-01"));
        assert_eq!(period_start(value, Freq::Quarter).expect("q"), ts("2024-07-01"));
        assert_eq!(period_start(value, Freq::Year).expect("y"), ts("2024-01-01"));
        assert_eq!(
            period_start(value, Freq::Hour).expect("h"),
            ts("2024-08-17 10:00:00")
        );
        assert_eq!(
            period_start(value, Freq::Minute).expect("min"),
            ts("2024-08-17 10:11:00")
        );
    }

    #[test]
    fn weekly_range_fills_gaps() {
        let range = period_range(ts("2024-01-02"), ts("2024-01-24"), Freq::default())
            .expect("range");
        assert_eq!(
            range,
            vec![
                ts("2024-01-01"),
                ts("2024-01-08"),
                ts("2024-01-15"),
                ts("2024-01-22"),
            ]
        );
    }

    #[test]
    fn monthly_range_handles_uneven_months() {
        let range = period_range(ts("2024-01-31"), ts("2024-03-01"), Freq::Month).expect("range");
        assert_eq!(
            range,
            vec![ts("2024-01-01"), ts("2024-02-01"), ts("2024-03-01")]
        );
    }

    #[test]
    fn single_period_and_inverted_range() {
        assert_eq!(
            period_range(ts("2024-01-02"), ts("2024-01-03"), Freq::default())
                .expect("range")
                .len(),
            1
        );
        assert!(
            period_range(ts("2024-02-01"), ts("2024-01-01"), Freq::Day)
                .expect("range")
                .is_empty()
        );
    }

    #[test]
    fn aliases_parse_and_print() {
        assert_eq!("W".parse::<Freq>().expect("W"), Freq::Week(Weekday::Sun));
        assert_eq!("w-mon".parse::<Freq>().expect("w-mon"), Freq::Week(Weekday::Mon));
        assert_eq!("MS".parse::<Freq>().expect("MS"), Freq::Month);
        assert_eq!("T".parse::<Freq>().expect("T"), Freq::Minute);
        assert_eq!(Freq::Week(Weekday::Tue).to_string(), "W-TUE");
        assert_eq!(
            "fortnight".parse::<Freq>().expect_err("unknown"),
            PeriodError::UnknownFreq {
                spec: "fortnight".to_owned()
            }
        );
    }

    #[test]
    fn freq_serializes_as_alias() {
        let json = serde_json::to_string(&Freq::Day).expect("serialize");
        assert_eq!(json, r#""D""#);
        let back: Freq = serde_json::from_str(r#""W-FRI""#).expect("deserialize");
        assert_eq!(back, Freq::Week(Weekday::Fri));
        assert!(serde_json::from_str::<Freq>(r#""W-XYZ""#).is_err());
    }
}
