//! Calendar arithmetic in the bot's display timezone.
//!
//! Zoom returns `start_time` in UTC; users pick dates and times in the
//! configured zone. Everything that crosses that boundary goes through
//! [`Schedule`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::config::ScheduleConfig;
use crate::domain::meeting::{parse_time, MeetingDuration};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaySchedule<T> {
    pub date: NaiveDate,
    pub items: Vec<T>,
}

#[derive(Clone, Debug)]
pub struct Schedule {
    timezone: String,
    offset: FixedOffset,
    default_start_time: NaiveTime,
    default_duration: MeetingDuration,
    list_days: u32,
}

impl Schedule {
    pub fn new(
        timezone: impl Into<String>,
        utc_offset_minutes: i32,
        default_start_time: NaiveTime,
        default_duration: MeetingDuration,
        list_days: u32,
    ) -> Result<Self, DomainError> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            DomainError::invalid("utc_offset_minutes", format!("{utc_offset_minutes} is out of range"))
        })?;
        if list_days == 0 {
            return Err(DomainError::invalid("list_days", "must be greater than zero"));
        }

        Ok(Self {
            timezone: timezone.into(),
            offset,
            default_start_time,
            default_duration,
            list_days,
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, DomainError> {
        Self::new(
            config.timezone.clone(),
            config.utc_offset_minutes,
            parse_time(&config.default_start_time)?,
            MeetingDuration::from_minutes(config.default_duration_minutes)?,
            config.list_days,
        )
    }

    /// IANA name sent to Zoom alongside local start times.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn default_duration(&self) -> MeetingDuration {
        self.default_duration
    }

    pub fn default_start_time(&self) -> NaiveTime {
        self.default_start_time
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Local wall-clock start in the form Zoom expects when `timezone` is set.
    pub fn local_start_time(&self, date: NaiveDate, time: Option<NaiveTime>) -> String {
        let time = time.unwrap_or(self.default_start_time);
        NaiveDateTime::new(date, time).format("%Y-%m-%dT%H:%M:00").to_string()
    }

    pub fn window(&self, start: NaiveDate) -> Vec<NaiveDate> {
        start.iter_days().take(self.list_days as usize).collect()
    }

    /// Groups items by local calendar day within `window`, dropping anything
    /// without a start or outside the window. Every window day is present in
    /// the output, in order; each day is sorted by start instant.
    pub fn bucket_by_day<T, F>(
        &self,
        window: &[NaiveDate],
        items: impl IntoIterator<Item = T>,
        start_of: F,
    ) -> Vec<DaySchedule<T>>
    where
        F: Fn(&T) -> Option<DateTime<Utc>>,
    {
        let mut buckets: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, T)>> =
            window.iter().map(|date| (*date, Vec::new())).collect();

        for item in items {
            let Some(start) = start_of(&item) else {
                continue;
            };
            let local_date = self.to_local(start).date_naive();
            if let Some(bucket) = buckets.get_mut(&local_date) {
                bucket.push((start, item));
            }
        }

        window
            .iter()
            .map(|date| {
                let mut entries = buckets.remove(date).unwrap_or_default();
                entries.sort_by_key(|(start, _)| *start);
                DaySchedule { date: *date, items: entries.into_iter().map(|(_, item)| item).collect() }
            })
            .collect()
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    pub fn local_date_and_time(&self, instant: DateTime<Utc>) -> (NaiveDate, NaiveTime) {
        let local = self.to_local(instant);
        (local.date_naive(), local.time())
    }

    pub fn day_label(&self, date: NaiveDate) -> String {
        date.format("%-m/%-d (%a)").to_string()
    }

    pub fn range_label(&self, first: NaiveDate, last: NaiveDate) -> String {
        format!("{} - {}", first.format("%-m/%-d"), last.format("%-m/%-d"))
    }

    pub fn clock_label(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%H:%M").to_string()
    }

    pub fn end_clock_label(&self, start: DateTime<Utc>, duration_minutes: u32) -> String {
        self.clock_label(start + Duration::minutes(i64::from(duration_minutes)))
    }

    pub fn full_label(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%Y-%m-%d (%a) %H:%M").to_string()
    }
}

/// Parses Zoom's `start_time`. Values without an offset are taken as UTC.
pub fn parse_zoom_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use super::{parse_zoom_timestamp, Schedule};
    use crate::domain::meeting::MeetingDuration;

    fn tokyo() -> Schedule {
        Schedule::new(
            "Asia/Tokyo",
            540,
            NaiveTime::from_hms_opt(9, 0, 0).expect("time"),
            MeetingDuration::DEFAULT,
            7,
        )
        .expect("schedule")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn today_follows_display_offset() {
        // 16:30 UTC is already the next day in Tokyo.
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 16, 30, 0).single().expect("instant");
        assert_eq!(tokyo().today(now), date(2026, 10, 20));
    }

    #[test]
    fn start_time_defaults_to_nine_local() {
        let schedule = tokyo();
        assert_eq!(schedule.local_start_time(date(2026, 10, 20), None), "2026-10-20T09:00:00");
        assert_eq!(
            schedule.local_start_time(
                date(2026, 10, 20),
                Some(NaiveTime::from_hms_opt(14, 30, 0).expect("time"))
            ),
            "2026-10-20T14:30:00"
        );
    }

    #[test]
    fn window_spans_month_boundaries() {
        let window = tokyo().window(date(2026, 10, 29));
        assert_eq!(window.len(), 7);
        assert_eq!(window[0], date(2026, 10, 29));
        assert_eq!(window[6], date(2026, 11, 4));
    }

    #[test]
    fn bucketing_uses_local_dates_sorts_and_keeps_empty_days() {
        let schedule = tokyo();
        let window = schedule.window(date(2026, 10, 20));
        let meetings = vec![
            ("late", "2026-10-20T08:00:00Z"),
            // 2026-10-19 23:30 UTC is 10/20 08:30 in Tokyo.
            ("early", "2026-10-19T23:30:00Z"),
            ("outside", "2026-10-27T01:00:00Z"),
            ("undated", ""),
            ("friday", "2026-10-23T02:00:00Z"),
        ];

        let days = schedule.bucket_by_day(&window, meetings, |(_, start)| parse_zoom_timestamp(start));

        assert_eq!(days.len(), 7);
        let first: Vec<_> = days[0].items.iter().map(|(name, _)| *name).collect();
        assert_eq!(first, vec!["early", "late"]);
        assert!(days[1].items.is_empty());
        assert_eq!(days[3].items.len(), 1);
        assert!(days.iter().flat_map(|day| &day.items).all(|(name, _)| *name != "outside"));
    }

    #[test]
    fn labels_render_in_local_time() {
        let schedule = tokyo();
        let start = parse_zoom_timestamp("2026-10-20T01:00:00Z").expect("timestamp");

        assert_eq!(schedule.clock_label(start), "10:00");
        assert_eq!(schedule.end_clock_label(start, 90), "11:30");
        assert_eq!(schedule.full_label(start), "2026-10-20 (Tue) 10:00");
        assert_eq!(schedule.day_label(date(2026, 10, 20)), "10/20 (Tue)");
        assert_eq!(schedule.range_label(date(2026, 10, 20), date(2026, 10, 26)), "10/20 - 10/26");
    }

    #[test]
    fn naive_zoom_timestamps_are_utc() {
        let parsed = parse_zoom_timestamp("2026-10-20T01:00:00").expect("naive");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 10, 20, 1, 0, 0).single().expect("utc"));
        assert_eq!(parse_zoom_timestamp("soon"), None);
    }

    #[test]
    fn invalid_offset_is_rejected() {
        let result = Schedule::new(
            "Nowhere",
            100_000,
            NaiveTime::from_hms_opt(9, 0, 0).expect("time"),
            MeetingDuration::DEFAULT,
            7,
        );
        assert!(result.is_err());
    }
}
