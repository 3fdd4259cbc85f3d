//! Provider period formats normalized to period-start ISO dates.

use chrono::NaiveDate;

/// First month of a 1-based quarter.
#[must_use]
pub const fn quarter_start_month(quarter: u32) -> u32 {
    (quarter - 1) * 3 + 1
}

/// Parse any of the period representations the upstream providers emit into
/// the period-start date:
///
/// - `2020` → 2020-01-01
/// - `2020-Q2`, `2020Q2`, `2020-q2` → 2020-04-01
/// - `2020-07`, `2020M07`, `2020-M07` → 2020-07-01
/// - `2020-S2` (semiannual) → 2020-07-01
/// - `2020-07-15` → passed through unchanged
/// - `20200715` (compact) → 2020-07-15
#[must_use]
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Full ISO date.
    if let Ok(d) = s.parse::<NaiveDate>() {
        return Some(d);
    }

    // Compact YYYYMMDD (Comtrade period keys).
    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
    }

    // Compact YYYYMM.
    if s.len() == 6 && s.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = s[..4].parse().ok()?;
        let month: u32 = s[4..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    // Plain year.
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    let upper = s.to_ascii_uppercase();
    let (year_part, rest) = if let Some((y, r)) = upper.split_once('-') {
        (y, r)
    } else if upper.len() > 4 {
        upper.split_at(4)
    } else {
        return None;
    };
    let year: i32 = year_part.parse().ok()?;

    if let Some(q) = rest.strip_prefix('Q') {
        let quarter: u32 = q.parse().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, quarter_start_month(quarter), 1);
    }

    if let Some(h) = rest.strip_prefix('S') {
        let half: u32 = h.parse().ok()?;
        if !(1..=2).contains(&half) {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, if half == 1 { 1 } else { 7 }, 1);
    }

    let month_digits = rest.strip_prefix('M').unwrap_or(rest);
    let month: u32 = month_digits.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn quarters_map_to_first_month_of_quarter() {
        assert_eq!(parse_period("2020-Q2"), Some(d("2020-04-01")));
        assert_eq!(parse_period("2020Q2"), Some(d("2020-04-01")));
        assert_eq!(parse_period("2020-q4"), Some(d("2020-10-01")));
        assert_eq!(parse_period("2020-Q5"), None);
    }

    #[test]
    fn months_and_years_map_to_period_start() {
        assert_eq!(parse_period("2020-07"), Some(d("2020-07-01")));
        assert_eq!(parse_period("2020M07"), Some(d("2020-07-01")));
        assert_eq!(parse_period("2020"), Some(d("2020-01-01")));
        assert_eq!(parse_period("202007"), Some(d("2020-07-01")));
    }

    #[test]
    fn full_dates_pass_through() {
        assert_eq!(parse_period("2020-07-15"), Some(d("2020-07-15")));
        assert_eq!(parse_period("20200715"), Some(d("2020-07-15")));
    }

    #[test]
    fn semiannual_halves() {
        assert_eq!(parse_period("2020-S1"), Some(d("2020-01-01")));
        assert_eq!(parse_period("2020-S2"), Some(d("2020-07-01")));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_period(""), None);
        assert_eq!(parse_period("latest"), None);
        assert_eq!(parse_period("2020-13"), None);
    }
}
