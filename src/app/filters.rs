// ABOUTME: Predicate filters over consultation lists (history and in-person tabs)

use crate::models::{ConsultationMode, ConsultationSession, ConsultationStatus};
use chrono::NaiveDate;

/// Consultation history: status, mode and an inclusive calendar-day range on the start date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Empty means any status.
    pub statuses: Vec<ConsultationStatus>,
    /// Empty means any mode.
    pub modes: Vec<ConsultationMode>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn matches(&self, consultation: &ConsultationSession) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&consultation.status) {
            return false;
        }
        if !self.modes.is_empty() && !self.modes.contains(&consultation.mode) {
            return false;
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        // Date-bounded filters drop sessions whose start cannot be read.
        let Some(day) = consultation.start_instant().date() else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }

    /// Setting a start after the current end clears the end.
    pub fn set_from(&mut self, from: NaiveDate) {
        if self.to.is_some_and(|to| from > to) {
            self.to = None;
        }
        self.from = Some(from);
    }

    /// Setting an end before the current start clears the start.
    pub fn set_to(&mut self, to: NaiveDate) {
        if self.from.is_some_and(|from| to < from) {
            self.from = None;
        }
        self.to = Some(to);
    }

    pub fn apply<'a>(&self, consultations: &'a [ConsultationSession]) -> Vec<&'a ConsultationSession> {
        let mut matching: Vec<_> = consultations.iter().filter(|c| self.matches(c)).collect();
        // Newest booking first.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching
    }
}

/// The in-person tab: upcoming, running or finished sessions, searchable by name or city.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InPersonFilter {
    pub search: String,
}

impl InPersonFilter {
    const SHOWN: [ConsultationStatus; 3] = [
        ConsultationStatus::Scheduled,
        ConsultationStatus::InProgress,
        ConsultationStatus::Ended,
    ];

    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
        }
    }

    pub fn matches(&self, consultation: &ConsultationSession) -> bool {
        if !consultation.is_in_person() || !Self::SHOWN.contains(&consultation.status) {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        consultation.counterpart_name.to_lowercase().contains(&needle)
            || consultation
                .counterpart_city
                .as_deref()
                .is_some_and(|city| city.to_lowercase().contains(&needle))
    }

    pub fn apply<'a>(&self, consultations: &'a [ConsultationSession]) -> Vec<&'a ConsultationSession> {
        consultations.iter().filter(|c| self.matches(c)).collect()
    }
}
