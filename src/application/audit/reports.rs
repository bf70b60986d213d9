//! Summaries built by walking the audit trail.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::domain::audit::{AuditAction, AuditEntry, EntityKind};

/// Entries kept in a user activity report's recent list
pub const RECENT_ACTIVITY_LIMIT: usize = 100;

/// Trail activity over a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_entries: u64,
    pub active_users: u64,
    pub unique_actions: u64,
    pub security_events: u64,
    pub by_action: BTreeMap<AuditAction, u64>,
    pub by_target: BTreeMap<EntityKind, u64>,
    /// Keyed by username
    pub by_actor: BTreeMap<String, u64>,
    pub by_date: BTreeMap<NaiveDate, u64>,
    #[serde(skip)]
    actors: BTreeSet<String>,
}

impl ComplianceReport {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            total_entries: 0,
            active_users: 0,
            unique_actions: 0,
            security_events: 0,
            by_action: BTreeMap::new(),
            by_target: BTreeMap::new(),
            by_actor: BTreeMap::new(),
            by_date: BTreeMap::new(),
            actors: BTreeSet::new(),
        }
    }

    pub fn add(&mut self, e: &AuditEntry) {
        self.total_entries += 1;
        if e.action.is_security_event() {
            self.security_events += 1;
        }
        *self.by_action.entry(e.action).or_default() += 1;
        *self.by_target.entry(e.target.kind).or_default() += 1;
        *self.by_actor.entry(e.actor_username.clone()).or_default() += 1;
        *self.by_date.entry(e.timestamp.date_naive()).or_default() += 1;
        self.actors.insert(e.actor_id.clone());
        self.active_users = self.actors.len() as u64;
        self.unique_actions = self.by_action.len() as u64;
    }
}

/// One user's trail over the last `days` days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivityReport {
    pub user_id: String,
    pub days: u32,
    pub total_activities: u64,
    pub average_daily: f64,
    pub by_action: BTreeMap<AuditAction, u64>,
    pub by_target: BTreeMap<EntityKind, u64>,
    pub by_date: BTreeMap<NaiveDate, u64>,
    /// Hour of day (UTC), 0-23
    pub by_hour: BTreeMap<u32, u64>,
    /// Newest first
    pub recent: Vec<AuditEntry>,
}

impl UserActivityReport {
    pub fn from_entries(user_id: impl Into<String>, days: u32, entries: impl IntoIterator<Item = AuditEntry>) -> Self {
        let mut report = Self {
            user_id: user_id.into(),
            days,
            total_activities: 0,
            average_daily: 0.0,
            by_action: BTreeMap::new(),
            by_target: BTreeMap::new(),
            by_date: BTreeMap::new(),
            by_hour: BTreeMap::new(),
            recent: Vec::new(),
        };
        let mut recent = VecDeque::with_capacity(RECENT_ACTIVITY_LIMIT);

        for e in entries {
            report.total_activities += 1;
            *report.by_action.entry(e.action).or_default() += 1;
            *report.by_target.entry(e.target.kind).or_default() += 1;
            *report.by_date.entry(e.timestamp.date_naive()).or_default() += 1;
            *report.by_hour.entry(e.timestamp.hour()).or_default() += 1;
            if recent.len() == RECENT_ACTIVITY_LIMIT {
                recent.pop_front();
            }
            recent.push_back(e);
        }

        if days > 0 {
            let avg = report.total_activities as f64 / f64::from(days);
            report.average_daily = (avg * 100.0).round() / 100.0;
        }
        report.recent = recent.into_iter().rev().collect();
        report
    }
}
