//! Calendar arithmetic for asset age and warranty.

use chrono::{DateTime, Datelike, Local, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Elapsed calendar time between a purchase date and a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetAge {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl std::fmt::Display for AssetAge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}y, {}m, {}d", self.years, self.months, self.days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarrantyStatus {
    Active,
    Expired,
    Unknown,
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses `YYYY-MM-DD`, RFC 3339 (converted to local time) or
/// `YYYY-MM-DD HH:MM:SS`. Anything else is `None`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Local).date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(ts.date());
        }
    }
    None
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Age of an asset bought on `purchased` as seen on `now`.
///
/// A negative day difference borrows the length of the month before `now`'s
/// month; a negative month difference borrows a year. Purchases after `now`
/// have zero age.
pub fn asset_age(purchased: NaiveDate, now: NaiveDate) -> AssetAge {
    if purchased > now {
        return AssetAge::default();
    }

    let mut years = now.year() - purchased.year();
    let mut months = now.month() as i32 - purchased.month() as i32;
    let mut days = now.day() as i32 - purchased.day() as i32;

    if days < 0 {
        let (prev_year, prev_month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };
        let borrowed = days_in_month(prev_year, prev_month);
        // purchase day past the end of the borrowed month: count from its last day
        days = if purchased.day() > borrowed {
            now.day() as i32
        } else {
            days + borrowed as i32
        };
        months -= 1;
    }
    if months < 0 {
        months += 12;
        years -= 1;
    }

    AssetAge {
        years: years.max(0) as u32,
        months: months.max(0) as u32,
        days: days.max(0) as u32,
    }
}

/// One calendar year after purchase. Feb 29 lands on Feb 28 in a non-leap year.
pub fn warranty_date(purchased: NaiveDate) -> NaiveDate {
    purchased
        .checked_add_months(Months::new(12))
        .unwrap_or(purchased)
}

pub fn warranty_status(warranty: Option<NaiveDate>, now: NaiveDate) -> WarrantyStatus {
    match warranty {
        Some(date) if date >= now => WarrantyStatus::Active,
        Some(_) => WarrantyStatus::Expired,
        None => WarrantyStatus::Unknown,
    }
}
