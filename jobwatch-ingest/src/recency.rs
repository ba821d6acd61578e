//! Posting-date helpers shared by the card parser and the fallback generator.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// A posting time uniformly `[1, window_days * 24]` hours before `now`.
///
/// Windows reaching past the calendar's range are clamped to its start.
pub fn random_posted_at<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    window_days: u32,
    rng: &mut R,
) -> DateTime<Utc> {
    let max_hours = i64::from(window_days.max(1)) * 24;
    let hours_ago = rng.random_range(1..=max_hours);
    Duration::try_hours(hours_ago)
        .and_then(|age| posted_at(now, age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse the relative age shown on a listing card ("Posted 3 days ago",
/// "Just posted", "30+ days ago", "5 hours ago").
///
/// Amounts too large for a `Duration` yield `None`.
pub fn parse_posted_age(text: &str) -> Option<Duration> {
    let lower = text.to_lowercase();
    if lower.contains("just posted") || lower.contains("today") {
        return Some(Duration::zero());
    }

    let digits: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let amount: i64 = digits.parse().ok()?;

    if lower.contains("minute") {
        Duration::try_minutes(amount)
    } else if lower.contains("hour") {
        Duration::try_hours(amount)
    } else if lower.contains("day") {
        Duration::try_days(amount)
    } else {
        None
    }
}

/// `now - age`, or `None` when the result is out of range.
pub fn posted_at(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(age)
}
