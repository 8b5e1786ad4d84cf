//! Call-scheduling clusters over client accounts.

use chrono::{Days, Months, NaiveDate};
use serde::Serialize;

use crate::dates::parse_date;
use crate::entities::account::Model as Account;

/// Top tier; accounts here are called again after 15 days instead of a month.
pub const TOP_TIER: &str = "TOP 50";

pub const DUE_TODAY_ORDER: [&str; 5] = ["TOP 50", "NEXT 30", "BALANCE 20", "CSE ACCOUNTS", "NEW CLIENT"];

pub const AVAILABLE_ORDER: [&str; 5] = ["TOP 50", "NEXT 30", "NEW CLIENT", "BALANCE 20", "CSE ACCOUNTS"];

const TOP_TIER_CADENCE_DAYS: u64 = 15;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterGroup {
    pub cluster: String,
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Schedule {
    pub today: NaiveDate,
    pub due_today: Vec<ClusterGroup>,
    pub available: Vec<ClusterGroup>,
}

impl Schedule {
    pub fn due_in(&self, cluster: &str) -> &[Account] {
        find_group(&self.due_today, cluster)
    }

    pub fn available_in(&self, cluster: &str) -> &[Account] {
        find_group(&self.available, cluster)
    }
}

fn find_group<'a>(groups: &'a [ClusterGroup], cluster: &str) -> &'a [Account] {
    groups
        .iter()
        .find(|g| g.cluster == cluster)
        .map(|g| g.accounts.as_slice())
        .unwrap_or(&[])
}

/// `next_available_date` as a local calendar date, `None` if absent or unparseable.
pub fn normalize_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_date)
}

fn is_pending(account: &Account) -> bool {
    account
        .status
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("pending"))
}

fn cluster_of(account: &Account) -> Option<&str> {
    account.type_client.as_deref().map(str::trim)
}

fn group_by(order: &[&str], accounts: Vec<&Account>) -> Vec<ClusterGroup> {
    order
        .iter()
        .map(|cluster| ClusterGroup {
            cluster: cluster.to_string(),
            accounts: accounts
                .iter()
                .filter(|a| cluster_of(a).is_some_and(|c| c.eq_ignore_ascii_case(cluster)))
                .map(|a| (*a).clone())
                .collect(),
        })
        .collect()
}

/// Partitions non-pending accounts into those due on `today` and those never
/// scheduled, each grouped by cluster in display order.
pub fn build_schedule(accounts: &[Account], today: NaiveDate) -> Schedule {
    let mut due = Vec::new();
    let mut available = Vec::new();

    for account in accounts.iter().filter(|a| !is_pending(a)) {
        match normalize_date(account.next_available_date.as_deref()) {
            Some(date) if date == today => due.push(account),
            Some(_) => {}
            None => available.push(account),
        }
    }

    Schedule {
        today,
        due_today: group_by(&DUE_TODAY_ORDER, due),
        available: group_by(&AVAILABLE_ORDER, available),
    }
}

/// Date an account queued today becomes available again.
pub fn next_available_date(type_client: Option<&str>, today: NaiveDate) -> NaiveDate {
    let top = type_client.is_some_and(|t| t.trim().eq_ignore_ascii_case(TOP_TIER));
    let next = if top {
        today.checked_add_days(Days::new(TOP_TIER_CADENCE_DAYS))
    } else {
        today.checked_add_months(Months::new(1))
    };
    next.unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(id: i32, cluster: &str, status: &str, next: Option<&str>) -> Account {
        let now = chrono::Utc::now().into();
        Account {
            id,
            reference_id: format!("ref-{id}"),
            company_name: format!("Company {id}"),
            contact_person: None,
            type_client: Some(cluster.to_string()),
            status: Some(status.to_string()),
            next_available_date: next.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_due_today_by_cluster() {
        let today = date(2026, 10, 15);
        let accounts = vec![account(1, "NEXT 30", "on-progress", Some("2026-10-15"))];
        let schedule = build_schedule(&accounts, today);

        assert_eq!(schedule.due_in("NEXT 30").len(), 1);
        assert!(schedule.available_in("NEXT 30").is_empty());
    }

    #[test]
    fn test_pending_is_excluded_everywhere() {
        let today = date(2026, 10, 15);
        let accounts = vec![
            account(1, "NEXT 30", "Pending", Some("2026-10-15")),
            account(2, "TOP 50", "PENDING", None),
        ];
        let schedule = build_schedule(&accounts, today);

        assert!(schedule.due_today.iter().all(|g| g.accounts.is_empty()));
        assert!(schedule.available.iter().all(|g| g.accounts.is_empty()));
    }

    #[test]
    fn test_never_scheduled_is_available_only() {
        let today = date(2026, 10, 15);
        let accounts = vec![account(7, "TOP 50", "on-progress", None)];
        let schedule = build_schedule(&accounts, today);

        assert_eq!(schedule.available_in("TOP 50")[0].id, 7);
        assert!(schedule.due_today.iter().all(|g| g.accounts.is_empty()));
        let others: usize = schedule
            .available
            .iter()
            .filter(|g| g.cluster != "TOP 50")
            .map(|g| g.accounts.len())
            .sum();
        assert_eq!(others, 0);
    }

    #[test]
    fn test_unparseable_date_counts_as_never_scheduled() {
        let today = date(2026, 10, 15);
        let accounts = vec![account(3, "NEW CLIENT", "Done", Some("someday"))];
        let schedule = build_schedule(&accounts, today);
        assert_eq!(schedule.available_in("NEW CLIENT").len(), 1);
    }

    #[test]
    fn test_other_dates_are_in_neither_group() {
        let today = date(2026, 10, 15);
        let accounts = vec![account(4, "TOP 50", "Done", Some("2026-10-30"))];
        let schedule = build_schedule(&accounts, today);
        assert!(schedule.due_in("TOP 50").is_empty());
        assert!(schedule.available_in("TOP 50").is_empty());
    }

    #[test]
    fn test_group_orders() {
        let schedule = build_schedule(&[], date(2026, 10, 15));
        let due: Vec<_> = schedule.due_today.iter().map(|g| g.cluster.as_str()).collect();
        let available: Vec<_> = schedule.available.iter().map(|g| g.cluster.as_str()).collect();
        assert_eq!(due, DUE_TODAY_ORDER);
        assert_eq!(available, AVAILABLE_ORDER);
    }

    #[test]
    fn test_timestamp_dates_are_normalized() {
        let today = date(2026, 10, 15);
        let accounts = vec![account(5, "BALANCE 20", "Done", Some("2026-10-15 09:00:00"))];
        let schedule = build_schedule(&accounts, today);
        assert_eq!(schedule.due_in("BALANCE 20").len(), 1);
    }

    #[test]
    fn test_next_available_date_cadence() {
        let today = date(2026, 10, 15);
        assert_eq!(next_available_date(Some("TOP 50"), today), date(2026, 10, 30));
        assert_eq!(next_available_date(Some("NEXT 30"), today), date(2026, 11, 15));
        assert_eq!(next_available_date(None, today), date(2026, 11, 15));
        assert_eq!(
            next_available_date(Some("CSE ACCOUNTS"), date(2026, 1, 31)),
            date(2026, 2, 28)
        );
    }
}
