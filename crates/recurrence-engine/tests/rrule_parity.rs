//! Parity tests -- the hand-rolled calculator must agree with the `rrule`
//! crate's RFC 5545 expansion for every pattern both can express.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use recurrence_engine::primitives::days_in_month;
use recurrence_engine::{occurrences, RecurrencePattern, RecurrenceRule, RecurrenceState, Weekday};
use rrule::RRuleSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expand `rule` (an RRULE body without COUNT) from `anchor` with the `rrule`
/// crate, returning the first `n` dates.
fn oracle(rule: &str, anchor: NaiveDate, n: u16) -> Vec<NaiveDate> {
    let text = format!(
        "DTSTART;TZID=UTC:{}T000000\nRRULE:{}",
        anchor.format("%Y%m%d"),
        rule
    );
    let set: RRuleSet = text.parse().expect("oracle rule should parse");
    set.all(n)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .collect()
}

fn ours(pattern: RecurrencePattern, anchor: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let state = RecurrenceState::new(RecurrenceRule::forever(pattern), anchor);
    occurrences(&state, anchor, true).take(n).collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_parity(rule: &str, pattern: RecurrencePattern, anchor: NaiveDate) {
    let expected = oracle(rule, anchor, 15);
    let actual = ours(pattern, anchor, 15);
    assert_eq!(actual, expected, "mismatch for {rule} from {anchor}");
}

// ---------------------------------------------------------------------------
// Fixed vectors
// ---------------------------------------------------------------------------

#[test]
fn parity_daily() {
    assert_parity(
        "FREQ=DAILY;INTERVAL=3",
        RecurrencePattern::daily(3).unwrap(),
        date(2024, 2, 27),
    );
}

#[test]
fn parity_biweekly_mon_wed() {
    assert_parity(
        "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE",
        RecurrencePattern::weekly(2, [Weekday::Monday, Weekday::Wednesday]).unwrap(),
        date(2024, 1, 1),
    );
}

#[test]
fn parity_weekly_anchor_mid_week() {
    assert_parity(
        "FREQ=WEEKLY;INTERVAL=3;BYDAY=TU,SA",
        RecurrencePattern::weekly(3, [Weekday::Tuesday, Weekday::Saturday]).unwrap(),
        date(2024, 1, 4),
    );
}

#[test]
fn parity_monthly_31st() {
    assert_parity(
        "FREQ=MONTHLY;BYMONTHDAY=31",
        RecurrencePattern::monthly_on_day(1, 31).unwrap(),
        date(2024, 1, 31),
    );
}

#[test]
fn parity_monthly_last_friday() {
    assert_parity(
        "FREQ=MONTHLY;BYDAY=-1FR",
        RecurrencePattern::monthly_on_nth(1, -1, Weekday::Friday).unwrap(),
        date(2024, 1, 1),
    );
}

#[test]
fn parity_monthly_fifth_monday_bimonthly() {
    assert_parity(
        "FREQ=MONTHLY;INTERVAL=2;BYDAY=5MO",
        RecurrencePattern::monthly_on_nth(2, 5, Weekday::Monday).unwrap(),
        date(2024, 1, 1),
    );
}

#[test]
fn parity_yearly_leap_day() {
    assert_parity(
        "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29",
        RecurrencePattern::yearly_on_date(1, 2, 29).unwrap(),
        date(2024, 2, 29),
    );
}

#[test]
fn parity_yearly_fourth_thursday_november() {
    assert_parity(
        "FREQ=YEARLY;BYMONTH=11;BYDAY=4TH",
        RecurrencePattern::yearly_on_nth(1, 11, 4, Weekday::Thursday).unwrap(),
        date(2024, 1, 1),
    );
}

// ---------------------------------------------------------------------------
// Randomized parity over the compact subset
// ---------------------------------------------------------------------------

fn arb_anchor() -> impl Strategy<Value = NaiveDate> {
    (2020i32..=2030, 1u32..=12, 1u32..=31)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d.min(days_in_month(y, m))).unwrap())
}

fn arb_days() -> impl Strategy<Value = Vec<Weekday>> {
    prop::collection::vec(prop::sample::select(Weekday::ALL.to_vec()), 1..=7)
}

/// (RRULE body, canonical pattern) pairs. Monthly intervals stay within 1-6
/// so every cadence reaches a 31-day month.
fn arb_pair() -> impl Strategy<Value = (String, RecurrencePattern)> {
    prop_oneof![
        (1u32..=10).prop_map(|i| (
            format!("FREQ=DAILY;INTERVAL={i}"),
            RecurrencePattern::daily(i).unwrap()
        )),
        (1u32..=4, arb_days()).prop_map(|(i, days)| {
            let pattern = RecurrencePattern::weekly(i, days).unwrap();
            let RecurrencePattern::Weekly { days, .. } = &pattern else {
                unreachable!()
            };
            let codes: Vec<&str> = days.iter().map(|d| d.code()).collect();
            (
                format!("FREQ=WEEKLY;INTERVAL={i};BYDAY={}", codes.join(",")),
                pattern,
            )
        }),
        (1u32..=6, 1u32..=31).prop_map(|(i, d)| (
            format!("FREQ=MONTHLY;INTERVAL={i};BYMONTHDAY={d}"),
            RecurrencePattern::monthly_on_day(i, d).unwrap()
        )),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

    #[test]
    fn calculator_matches_rrule((rule, pattern) in arb_pair(), anchor in arb_anchor()) {
        let expected = oracle(&rule, anchor, 20);
        let actual = ours(pattern, anchor, 20);
        prop_assert_eq!(actual, expected, "rule {} from {}", rule, anchor);
    }
}
