//! Rule codec -- converts between canonical rules and the calendar provider's
//! compact `RRULE:` text.
//!
//! The provider understands a subset of RFC 5545:
//!
//! ```text
//! RRULE:FREQ=<DAILY|WEEKLY|MONTHLY>[;INTERVAL=n][;BYDAY=MO,WE][;BYMONTHDAY=d][;COUNT=n|;UNTIL=YYYYMMDDTHHMMSSZ]
//! ```
//!
//! Nth-weekday and yearly patterns have no encoding in that subset; they fail
//! with [`RecurrenceError::UnsupportedEncoding`] instead of being approximated.
//! Decoding is strict: unknown, duplicated or malformed tokens are rejected,
//! and so is any value not written the way [`encode_line`] writes it
//! (lower-case `FREQ`, `INTERVAL=02`, `BYDAY=MO,MO`, an `UNTIL` time other
//! than midnight). A decoded line re-encodes to the same text.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::{RecurrenceError, Result};
use crate::primitives::Weekday;
use crate::rule::{Frequency, MonthlyMode, RecurrenceEnd, RecurrencePattern, RecurrenceRule};

const PREFIX: &str = "RRULE:";
const UNTIL_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Encode a rule as the provider's recurrence list (a single `RRULE:` line).
pub fn encode(rule: &RecurrenceRule) -> Result<Vec<String>> {
    Ok(vec![encode_line(rule)?])
}

/// Encode a rule as one `RRULE:` line.
pub fn encode_line(rule: &RecurrenceRule) -> Result<String> {
    let pattern = &rule.pattern;
    let mut parts = vec![format!("FREQ={}", pattern.frequency())];

    if pattern.interval() > 1 {
        parts.push(format!("INTERVAL={}", pattern.interval()));
    }

    match pattern {
        RecurrencePattern::Daily { .. } => {}
        RecurrencePattern::Weekly { days, .. } => {
            let codes: Vec<&str> = days.iter().map(|d| d.code()).collect();
            parts.push(format!("BYDAY={}", codes.join(",")));
        }
        RecurrencePattern::Monthly { mode, .. } => match mode {
            MonthlyMode::DayOfMonth(day) => parts.push(format!("BYMONTHDAY={day}")),
            MonthlyMode::NthWeekday(position) => {
                return Err(RecurrenceError::unsupported(format!(
                    "monthly nth-weekday rule ({position}) has no provider encoding"
                )));
            }
        },
        RecurrencePattern::Yearly { .. } => {
            return Err(RecurrenceError::unsupported(
                "yearly rules have no provider encoding",
            ));
        }
    }

    match rule.end {
        RecurrenceEnd::Never => {}
        RecurrenceEnd::AfterOccurrences(count) => parts.push(format!("COUNT={count}")),
        RecurrenceEnd::OnDate(date) => {
            let until = date.and_hms_opt(0, 0, 0).unwrap_or_default();
            parts.push(format!("UNTIL={}", until.format(UNTIL_FORMAT)));
        }
    }

    Ok(format!("{PREFIX}{}", parts.join(";")))
}

/// Decode the provider's recurrence list. Exactly one `RRULE:` line is
/// accepted; `EXDATE`/`RDATE` companions are not part of the subset.
pub fn decode<S: AsRef<str>>(lines: &[S]) -> Result<RecurrenceRule> {
    match lines {
        [line] => decode_line(line.as_ref()),
        [] => Err(reject("empty recurrence list")),
        _ => Err(reject(format!(
            "expected a single RRULE line, got {}",
            lines.len()
        ))),
    }
}

/// Decode one `RRULE:` line.
pub fn decode_line(line: &str) -> Result<RecurrenceRule> {
    let body = line
        .trim()
        .strip_prefix(PREFIX)
        .ok_or_else(|| reject(format!("missing '{PREFIX}' prefix in '{line}'")))?;

    let tokens = Tokens::parse(body)?;

    let frequency = match tokens.freq.ok_or_else(|| reject("FREQ is required"))? {
        "DAILY" => Frequency::Daily,
        "WEEKLY" => Frequency::Weekly,
        "MONTHLY" => Frequency::Monthly,
        "YEARLY" => Frequency::Yearly,
        other => return Err(reject(format!("unsupported FREQ '{other}'"))),
    };

    let interval = match tokens.interval {
        Some(raw) => parse_positive(raw, "INTERVAL")?,
        None => 1,
    };

    let pattern = match frequency {
        Frequency::Daily => {
            forbid(tokens.byday, "BYDAY", frequency)?;
            forbid(tokens.bymonthday, "BYMONTHDAY", frequency)?;
            RecurrencePattern::daily(interval)
        }
        Frequency::Weekly => {
            forbid(tokens.bymonthday, "BYMONTHDAY", frequency)?;
            let raw = tokens.byday.ok_or_else(|| reject("WEEKLY requires BYDAY"))?;
            RecurrencePattern::weekly(interval, parse_byday(raw)?)
        }
        Frequency::Monthly => {
            forbid(tokens.byday, "BYDAY", frequency)?;
            let raw = tokens
                .bymonthday
                .ok_or_else(|| reject("MONTHLY requires BYMONTHDAY"))?;
            RecurrencePattern::monthly_on_day(interval, parse_positive(raw, "BYMONTHDAY")?)
        }
        Frequency::Yearly => return Err(reject("yearly rules have no provider encoding")),
    }
    .map_err(|e| reject(e.to_string()))?;

    let end = match (tokens.count, tokens.until) {
        (Some(_), Some(_)) => return Err(reject("COUNT and UNTIL are mutually exclusive")),
        (Some(raw), None) => RecurrenceEnd::AfterOccurrences(parse_positive(raw, "COUNT")?),
        (None, Some(raw)) => RecurrenceEnd::OnDate(parse_until(raw)?),
        (None, None) => RecurrenceEnd::Never,
    };

    Ok(RecurrenceRule { pattern, end })
}

/// Raw token values, each present at most once.
#[derive(Default)]
struct Tokens<'a> {
    freq: Option<&'a str>,
    interval: Option<&'a str>,
    byday: Option<&'a str>,
    bymonthday: Option<&'a str>,
    count: Option<&'a str>,
    until: Option<&'a str>,
}

impl<'a> Tokens<'a> {
    fn parse(body: &'a str) -> Result<Self> {
        let mut tokens = Tokens::default();
        for part in body.split(';') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| reject(format!("malformed token '{part}'")))?;
            if value.is_empty() {
                return Err(reject(format!("empty value for {key}")));
            }
            let slot = match key {
                "FREQ" => &mut tokens.freq,
                "INTERVAL" => &mut tokens.interval,
                "BYDAY" => &mut tokens.byday,
                "BYMONTHDAY" => &mut tokens.bymonthday,
                "COUNT" => &mut tokens.count,
                "UNTIL" => &mut tokens.until,
                other => return Err(reject(format!("unsupported token '{other}'"))),
            };
            if slot.replace(value).is_some() {
                return Err(reject(format!("duplicate token '{key}'")));
            }
        }
        Ok(tokens)
    }
}

fn forbid(value: Option<&str>, key: &str, frequency: Frequency) -> Result<()> {
    match value {
        Some(_) => Err(reject(format!("{key} is not supported with FREQ={frequency}"))),
        None => Ok(()),
    }
}

/// Plain decimal digits without sign or leading zero.
fn parse_positive(raw: &str, key: &str) -> Result<u32> {
    let canonical = raw.bytes().all(|b| b.is_ascii_digit()) && !raw.starts_with('0');
    match raw.parse::<u32>() {
        Ok(n) if canonical && n >= 1 => Ok(n),
        _ => Err(reject(format!("{key} must be a positive integer, got '{raw}'"))),
    }
}

fn parse_byday(raw: &str) -> Result<BTreeSet<Weekday>> {
    let mut days = BTreeSet::new();
    for code in raw.split(',') {
        let day = Weekday::from_code(code)
            .ok_or_else(|| reject(format!("unsupported BYDAY value '{code}'")))?;
        if !days.insert(day) {
            return Err(reject(format!("repeated BYDAY value '{code}'")));
        }
    }
    Ok(days)
}

/// Only the midnight form the encoder emits; the model holds dates, so any
/// other time of day would be lost.
fn parse_until(raw: &str) -> Result<NaiveDate> {
    let until = NaiveDateTime::parse_from_str(raw, UNTIL_FORMAT)
        .map_err(|_| reject(format!("malformed UNTIL '{raw}'")))?;
    if until.format(UNTIL_FORMAT).to_string() != raw || until.time() != NaiveTime::MIN {
        return Err(reject(format!("UNTIL must be a midnight UTC timestamp, got '{raw}'")));
    }
    Ok(until.date())
}

fn reject(detail: impl Into<String>) -> RecurrenceError {
    let detail = detail.into();
    debug!(%detail, "rejecting provider recurrence");
    RecurrenceError::unsupported(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_without_interval() {
        let rule = RecurrenceRule::forever(RecurrencePattern::daily(1).unwrap());
        assert_eq!(encode_line(&rule).unwrap(), "RRULE:FREQ=DAILY");
    }

    #[test]
    fn explicit_interval_one_decodes() {
        let rule = decode_line("RRULE:FREQ=DAILY;INTERVAL=1").unwrap();
        assert_eq!(rule.pattern, RecurrencePattern::daily(1).unwrap());
    }

    #[test]
    fn until_decodes_midnight_form_only() {
        let rule = decode_line("RRULE:FREQ=DAILY;UNTIL=20301231T000000Z").unwrap();
        assert_eq!(
            rule.end,
            RecurrenceEnd::OnDate(NaiveDate::from_ymd_opt(2030, 12, 31).unwrap())
        );
        assert!(decode_line("RRULE:FREQ=DAILY;UNTIL=20301231").is_err());
        assert!(decode_line("RRULE:FREQ=DAILY;UNTIL=20301231T235959Z").is_err());
    }

    #[test]
    fn canonical_numbers_only() {
        assert_eq!(parse_positive("12", "COUNT").unwrap(), 12);
        for raw in ["+2", "02", "0", "-1", " 3", "1e2", "99999999999"] {
            assert!(parse_positive(raw, "COUNT").is_err(), "{raw}");
        }
    }

    #[test]
    fn duplicate_tokens_rejected() {
        let err = decode_line("RRULE:FREQ=DAILY;FREQ=WEEKLY").unwrap_err();
        assert!(matches!(err, RecurrenceError::UnsupportedEncoding(_)));
    }
}
