//! Turning a scheduling suggestion into a reminder payload

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::api::types::{Priority, ReminderCreate, SchedulingSuggestion, SourceType};

/// Longest generated title, in characters, before the ellipsis
pub const MAX_FALLBACK_TITLE_CHARS: usize = 50;

/// Combine a detected date and time into an instant.
///
/// Each missing part is taken from `now` in `now`'s time zone; with both
/// missing the result is `now`. Sub-second precision is dropped.
pub fn combine_schedule<Tz: TimeZone>(
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    now: &DateTime<Tz>,
) -> DateTime<Utc> {
    let local = now.naive_local();
    let date = date.unwrap_or_else(|| local.date());
    let time = time.unwrap_or_else(|| local.time());
    let time = time.with_nanosecond(0).unwrap_or(time);
    let naive = date.and_time(time);

    match now.timezone().from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            // Nonexistent local time (DST gap): apply the offset in effect at `now`
            let offset = now.naive_local() - now.naive_utc();
            (naive - offset).and_utc()
        }
    }
}

/// Title derived from the first non-blank line of `text`.
///
/// Whitespace is collapsed and long lines are cut at
/// [`MAX_FALLBACK_TITLE_CHARS`] with a trailing `...`.
pub fn fallback_title(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "Reminder".to_string();
    }
    if collapsed.chars().count() <= MAX_FALLBACK_TITLE_CHARS {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(MAX_FALLBACK_TITLE_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// Build the reminder payload for an accepted suggestion
pub fn reminder_from_suggestion<Tz: TimeZone>(
    suggestion: &SchedulingSuggestion,
    text: &str,
    source: SourceType,
    priority: Priority,
    now: &DateTime<Tz>,
) -> ReminderCreate {
    let title = suggestion
        .suggested_title
        .clone()
        .unwrap_or_else(|| fallback_title(text));
    let when = combine_schedule(suggestion.detected_date, suggestion.detected_time, now);
    let mut create = ReminderCreate::new(title, when);
    create.is_important = priority.is_important();
    create.original_text = Some(text.to_string());
    create.confidence_score = Some(suggestion.confidence);
    create.source_type = Some(source);
    create
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2030, 3, 10, 8, 15, 30)
            .unwrap()
    }

    #[test]
    fn test_combine_both_parts() {
        let when = combine_schedule(
            NaiveDate::from_ymd_opt(2030, 4, 1),
            NaiveTime::from_hms_opt(15, 0, 0),
            &now(),
        );
        // 15:00 at +02:00
        assert_eq!(when, Utc.with_ymd_and_hms(2030, 4, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_combine_missing_time_uses_now_time() {
        let when = combine_schedule(NaiveDate::from_ymd_opt(2030, 4, 1), None, &now());
        assert_eq!(when, Utc.with_ymd_and_hms(2030, 4, 1, 6, 15, 30).unwrap());
    }

    #[test]
    fn test_combine_missing_date_uses_today() {
        let when = combine_schedule(None, NaiveTime::from_hms_opt(20, 30, 0), &now());
        assert_eq!(when, Utc.with_ymd_and_hms(2030, 3, 10, 18, 30, 0).unwrap());
    }

    #[test]
    fn test_combine_nothing_is_now() {
        assert_eq!(combine_schedule(None, None, &now()), now().with_timezone(&Utc));
    }

    #[test]
    fn test_fallback_title() {
        assert_eq!(fallback_title("\n  call   mom\nabout sunday"), "call mom");
        assert_eq!(fallback_title("   "), "Reminder");
        let long = "a".repeat(80);
        let title = fallback_title(&long);
        assert_eq!(title, format!("{}...", "a".repeat(MAX_FALLBACK_TITLE_CHARS)));
    }

    #[test]
    fn test_reminder_from_suggestion() {
        let suggestion = SchedulingSuggestion {
            detected_date: NaiveDate::from_ymd_opt(2030, 4, 1),
            detected_time: None,
            suggested_title: None,
            confidence: 0.72,
        };
        let create = reminder_from_suggestion(
            &suggestion,
            "pay the electricity bill on april first",
            SourceType::Text,
            Priority::High,
            &now(),
        );
        assert_eq!(create.title, "pay the electricity bill on april first");
        assert!(create.is_important);
        assert_eq!(create.confidence_score, Some(0.72));
        assert_eq!(create.source_type, Some(SourceType::Text));
        assert_eq!(
            create.original_text.as_deref(),
            Some("pay the electricity bill on april first")
        );
    }
}
