// ABOUTME: Turns a message store snapshot into the display sequence for an inverted chat list
// Adds humanized date separators and sender-change markers, newest entry first

use crate::chat::timestamp::LocalInstant;
use crate::models::ChatMessage;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "id")]
    Indonesian,
    #[serde(rename = "en")]
    English,
}

/// Humanized labels for date separators and message times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateLabels {
    locale: Locale,
}

const ID_WEEKDAYS: [&str; 7] = ["Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu", "Minggu"];
const ID_MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September",
    "Oktober", "November", "Desember",
];
const EN_WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];
const EN_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

impl DateLabels {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn today(&self) -> &'static str {
        match self.locale {
            Locale::Indonesian => "Hari ini",
            Locale::English => "Today",
        }
    }

    pub fn yesterday(&self) -> &'static str {
        match self.locale {
            Locale::Indonesian => "Kemarin",
            Locale::English => "Yesterday",
        }
    }

    pub fn unknown(&self) -> &'static str {
        match self.locale {
            Locale::Indonesian => "Tanggal tidak diketahui",
            Locale::English => "Unknown date",
        }
    }

    /// "Senin, 1 Januari 2024" / "Monday, January 1, 2024".
    pub fn long_date(&self, date: NaiveDate) -> String {
        let weekday = weekday_index(date.weekday());
        let month = date.month0() as usize;
        match self.locale {
            Locale::Indonesian => format!(
                "{}, {} {} {}",
                ID_WEEKDAYS[weekday],
                date.day(),
                ID_MONTHS[month],
                date.year()
            ),
            Locale::English => format!(
                "{}, {} {}, {}",
                EN_WEEKDAYS[weekday],
                EN_MONTHS[month],
                date.day(),
                date.year()
            ),
        }
    }

    /// Calendar-day comparison against `now`, not a 24h duration.
    pub fn day_label(&self, date: NaiveDate, now: NaiveDateTime) -> String {
        let today = now.date();
        if date == today {
            self.today().to_string()
        } else if today.pred_opt() == Some(date) {
            self.yesterday().to_string()
        } else {
            self.long_date(date)
        }
    }

    /// Time of day shown next to a bubble: "10.30" in Indonesian, "10:30" in English.
    pub fn time_of_day(&self, instant: LocalInstant) -> String {
        let Some(value) = instant.value() else {
            return String::new();
        };
        match self.locale {
            Locale::Indonesian => value.format("%H.%M").to_string(),
            Locale::English => value.format("%H:%M").to_string(),
        }
    }
}

impl Default for DateLabels {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayItem {
    DateSeparator {
        id: String,
        label: String,
    },
    Message {
        message: ChatMessage,
        time_label: String,
        /// Sender differs from the previous bubble, or first bubble of the day.
        first_from_sender: bool,
    },
}

impl DisplayItem {
    pub fn id(&self) -> String {
        match self {
            DisplayItem::DateSeparator { id, .. } => id.clone(),
            DisplayItem::Message { message, .. } => message.id.to_string(),
        }
    }
}

/// Build the inverted display sequence: sorted ascending by timestamp (stable,
/// unparseable timestamps last), separators inserted on day changes, then reversed.
pub fn group_messages(messages: &[ChatMessage], now: NaiveDateTime, labels: &DateLabels) -> Vec<DisplayItem> {
    if messages.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<(LocalInstant, &ChatMessage)> =
        messages.iter().map(|m| (m.instant(), m)).collect();
    sorted.sort_by_key(|(instant, _)| (!instant.is_valid(), instant.value()));

    let mut grouped = Vec::with_capacity(sorted.len() + 4);
    let mut current_day: Option<Option<NaiveDate>> = None;
    let mut previous_from_user: Option<bool> = None;

    for (instant, message) in sorted {
        let day = instant.date();
        if current_day != Some(day) {
            current_day = Some(day);
            previous_from_user = None;
            grouped.push(separator(day, now, labels));
        }

        let first_from_sender = previous_from_user != Some(message.is_from_user);
        grouped.push(DisplayItem::Message {
            message: message.clone(),
            time_label: labels.time_of_day(instant),
            first_from_sender,
        });
        previous_from_user = Some(message.is_from_user);
    }

    grouped.reverse();
    grouped
}

fn separator(day: Option<NaiveDate>, now: NaiveDateTime, labels: &DateLabels) -> DisplayItem {
    match day {
        Some(date) => DisplayItem::DateSeparator {
            id: format!("date-{}", date.format("%Y-%m-%d")),
            label: labels.day_label(date, now),
        },
        None => DisplayItem::DateSeparator {
            id: "date-unknown".to_string(),
            label: labels.unknown().to_string(),
        },
    }
}
