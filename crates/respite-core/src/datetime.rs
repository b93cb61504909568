use anyhow::{Context, anyhow};
use chrono::{DateTime, Days, Local, NaiveDate};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// ISO date key used for the day-record map.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(text: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_KEY_FORMAT)
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {text}"))
}

/// Date expressions accepted by the `date` command: `today`, `prev`,
/// `next`, or a literal `YYYY-MM-DD`. `prev`/`next` step from `viewed`.
pub fn parse_date_expr(
    expr: &str,
    viewed: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<NaiveDate> {
    match expr.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "prev" => viewed
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| anyhow!("date out of range")),
        "next" => viewed
            .checked_add_days(Days::new(1))
            .ok_or_else(|| anyhow!("date out of range")),
        _ => parse_date_key(expr),
    }
}

/// `45m` below one hour, `2h` on the hour, `1h 30m` otherwise.
pub fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{hours}h")
    }
}

/// Zero-padded `HH:MM:SS` running clock.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Whole days left until midnight of `end`, rounded up, never negative.
pub fn days_until(end: NaiveDate, now: DateTime<Local>) -> u64 {
    let end_midnight = end.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    let Some(end_midnight) = end_midnight else {
        return 0;
    };

    let remaining = end_midnight.signed_duration_since(now.naive_local().and_utc());
    let secs = remaining.num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs as u64).div_ceil(86_400)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};

    use super::{date_key, days_until, format_clock, format_minutes, parse_date_expr};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn date_key_is_iso() {
        assert_eq!(date_key(date("2026-02-07")), "2026-02-07");
    }

    #[test]
    fn date_expr_steps_from_viewed() {
        let viewed = date("2026-02-10");
        let today = date("2026-02-15");

        assert_eq!(
            parse_date_expr("prev", viewed, today).expect("prev"),
            date("2026-02-09")
        );
        assert_eq!(
            parse_date_expr("next", viewed, today).expect("next"),
            date("2026-02-11")
        );
        assert_eq!(
            parse_date_expr("today", viewed, today).expect("today"),
            today
        );
        assert_eq!(
            parse_date_expr("2026-02-27", viewed, today).expect("literal"),
            date("2026-02-27")
        );
        assert!(parse_date_expr("soonish", viewed, today).is_err());
    }

    #[test]
    fn minutes_format_matches_display_rules() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(60), "1h");
        assert_eq!(format_minutes(90), "1h 30m");
        assert_eq!(format_minutes(125), "2h 5m");
    }

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(61), "00:01:01");
        assert_eq!(format_clock(3 * 3600 + 25 * 60 + 9), "03:25:09");
    }

    #[test]
    fn countdown_rounds_up_and_clamps() {
        let now = Local
            .with_ymd_and_hms(2026, 2, 25, 18, 0, 0)
            .single()
            .expect("valid now");

        assert_eq!(days_until(date("2026-02-27"), now), 2);
        assert_eq!(days_until(date("2026-02-26"), now), 1);
        assert_eq!(days_until(date("2026-02-25"), now), 0);
        assert_eq!(days_until(date("2026-01-01"), now), 0);
    }
}
