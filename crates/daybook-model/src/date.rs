use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Preferred order for ambiguous numeric dates like `01/02/2024`.
///
/// Unambiguous inputs (a 4-digit leading year, or a component larger than 12)
/// ignore the preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// Day / month / year (e.g. `31/12/2024`).
    Dmy,
    /// Month / day / year (e.g. `12/31/2024`).
    Mdy,
    /// Year / month / day (e.g. `2024/12/31`).
    Ymd,
}

impl Default for DateOrder {
    fn default() -> Self {
        // Ledger files in the wild write day-first dates.
        DateOrder::Dmy
    }
}

/// Format a date the way the ledger stores it (ISO `YYYY-MM-DD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a calendar date from loosely formatted text.
///
/// Accepts `-` or `/` separated triples plus compact `YYYYMMDD`. A 4-digit
/// component pins the year; day/month ambiguity is resolved by magnitude
/// first and `order` second. Returns `None` for anything that is not a valid
/// calendar date.
pub fn parse_date(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit() || b == b'-' || b == b'/') {
        return None;
    }

    // YYYYMMDD.
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.get(0..4)?.parse().ok()?;
        let month: u32 = s.get(4..6)?.parse().ok()?;
        let day: u32 = s.get(6..8)?.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let parts: Vec<&str> = s.split(['-', '/']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    if parts[0].len() == 4 {
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let day: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if parts[2].len() == 4 {
        let year: i32 = parts[2].parse().ok()?;
        let a: u32 = parts[0].parse().ok()?;
        let b: u32 = parts[1].parse().ok()?;

        let (day, month) = if a > 12 && b <= 12 {
            (a, b)
        } else if b > 12 && a <= 12 {
            (b, a)
        } else {
            match order {
                DateOrder::Dmy => (a, b),
                DateOrder::Mdy | DateOrder::Ymd => (b, a),
            }
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}
