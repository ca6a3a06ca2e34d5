//! Shared preferences document and section-scoped patches.
//!
//! # Responsibility
//! - Define the five-section preferences document and its defaults.
//! - Merge partial patches without losing sibling fields.
//! - Decode partial or mistyped stored documents into a complete one.
//!
//! # Invariants
//! - A decoded document is always fully populated; every absent or mistyped
//!   field falls back to its default individually.
//! - Merging is per section: `result[s] = { ...base[s], ...patch[s] }`.
//! - Merging the same patch twice equals merging it once.

use super::lenient::lenient;
use crate::store::JsonMap;
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visual theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// Accent color preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    Pink,
    Purple,
    Rose,
}

/// Names of the five document sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Couple,
    Personalization,
    Notifications,
    Relationship,
    Privacy,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Couple,
        Section::Personalization,
        Section::Notifications,
        Section::Relationship,
        Section::Privacy,
    ];

    /// Stored key of the section.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Couple => "couple",
            Self::Personalization => "personalization",
            Self::Notifications => "notifications",
            Self::Relationship => "relationship",
            Self::Privacy => "privacy",
        }
    }
}

/// Identity of the two partners. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupleSection {
    pub partner_a_name: String,
    pub partner_b_name: String,
    pub partner_a_email: String,
    pub partner_b_email: String,
    pub relationship_start_date: String,
    /// Only month and day matter for birthday checks.
    pub partner_a_birthday: String,
    pub partner_b_birthday: String,
    pub birthday_confetti: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationSection {
    pub theme: Theme,
    pub accent: Accent,
    pub floating_hearts: bool,
    pub background_glow: bool,
}

/// Notification toggles. Quiet hours are `HH:MM` and may wrap midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsSection {
    pub reminders: bool,
    pub birthdays: bool,
    pub unread_letters: bool,
    pub quiet_hours_enabled: bool,
    pub quiet_start: String,
    pub quiet_end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSection {
    pub show_days_together: bool,
    pub show_moods_on_home: bool,
    pub show_timeline_on_home: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySection {
    pub require_reauth_for_danger_zone: bool,
}

/// The single shared preferences record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceDocument {
    pub couple: CoupleSection,
    pub personalization: PersonalizationSection,
    pub notifications: NotificationsSection,
    pub relationship: RelationshipSection,
    pub privacy: PrivacySection,
    /// Epoch milliseconds of the last persisted write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Default for PreferenceDocument {
    fn default() -> Self {
        Self {
            couple: CoupleSection {
                partner_a_name: "Partner A".to_string(),
                partner_b_name: "Partner B".to_string(),
                partner_a_email: "partner.a@example.com".to_string(),
                partner_b_email: "partner.b@example.com".to_string(),
                relationship_start_date: "2025-12-27".to_string(),
                partner_a_birthday: "2000-08-25".to_string(),
                partner_b_birthday: "2000-09-01".to_string(),
                birthday_confetti: true,
            },
            personalization: PersonalizationSection {
                theme: Theme::System,
                accent: Accent::Pink,
                floating_hearts: true,
                background_glow: true,
            },
            notifications: NotificationsSection {
                reminders: true,
                birthdays: true,
                unread_letters: true,
                quiet_hours_enabled: false,
                quiet_start: "22:00".to_string(),
                quiet_end: "08:00".to_string(),
            },
            relationship: RelationshipSection {
                show_days_together: true,
                show_moods_on_home: true,
                show_timeline_on_home: true,
            },
            privacy: PrivacySection {
                require_reauth_for_danger_zone: true,
            },
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplePatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub partner_a_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub partner_b_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub partner_a_email: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub partner_b_email: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub relationship_start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub partner_a_birthday: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub partner_b_birthday: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub birthday_confetti: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub accent: Option<Accent>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub floating_hearts: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub background_glow: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reminders: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub birthdays: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub unread_letters: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub quiet_hours_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub quiet_start: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub quiet_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub show_days_together: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub show_moods_on_home: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub show_timeline_on_home: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub require_reauth_for_danger_zone: Option<bool>,
}

/// Partial document. Absent sections and absent fields are left untouched
/// by a merge.
///
/// Stored documents are decoded through this type, so it doubles as the
/// tolerant read shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencePatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub couple: Option<CouplePatch>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub personalization: Option<PersonalizationPatch>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationsPatch>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipPatch>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub privacy: Option<PrivacyPatch>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl PreferencePatch {
    pub fn couple(patch: CouplePatch) -> Self {
        Self {
            couple: Some(patch),
            ..Self::default()
        }
    }

    pub fn personalization(patch: PersonalizationPatch) -> Self {
        Self {
            personalization: Some(patch),
            ..Self::default()
        }
    }

    pub fn notifications(patch: NotificationsPatch) -> Self {
        Self {
            notifications: Some(patch),
            ..Self::default()
        }
    }

    pub fn relationship(patch: RelationshipPatch) -> Self {
        Self {
            relationship: Some(patch),
            ..Self::default()
        }
    }

    pub fn privacy(patch: PrivacyPatch) -> Self {
        Self {
            privacy: Some(patch),
            ..Self::default()
        }
    }

    /// Decodes a stored body, ignoring unknown keys and mistyped values.
    pub fn from_stored(data: &JsonMap) -> Self {
        serde_json::from_value(Value::Object(data.clone())).unwrap_or_default()
    }

    /// Sections this patch touches, in declaration order.
    pub fn sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|section| match section {
                Section::Couple => self.couple.is_some(),
                Section::Personalization => self.personalization.is_some(),
                Section::Notifications => self.notifications.is_some(),
                Section::Relationship => self.relationship.is_some(),
                Section::Privacy => self.privacy.is_some(),
            })
            .collect()
    }
}

impl CoupleSection {
    fn apply(&mut self, patch: &CouplePatch) {
        if let Some(value) = &patch.partner_a_name {
            self.partner_a_name = value.clone();
        }
        if let Some(value) = &patch.partner_b_name {
            self.partner_b_name = value.clone();
        }
        if let Some(value) = &patch.partner_a_email {
            self.partner_a_email = value.clone();
        }
        if let Some(value) = &patch.partner_b_email {
            self.partner_b_email = value.clone();
        }
        if let Some(value) = &patch.relationship_start_date {
            self.relationship_start_date = value.clone();
        }
        if let Some(value) = &patch.partner_a_birthday {
            self.partner_a_birthday = value.clone();
        }
        if let Some(value) = &patch.partner_b_birthday {
            self.partner_b_birthday = value.clone();
        }
        if let Some(value) = patch.birthday_confetti {
            self.birthday_confetti = value;
        }
    }
}

impl PersonalizationSection {
    fn apply(&mut self, patch: &PersonalizationPatch) {
        if let Some(value) = patch.theme {
            self.theme = value;
        }
        if let Some(value) = patch.accent {
            self.accent = value;
        }
        if let Some(value) = patch.floating_hearts {
            self.floating_hearts = value;
        }
        if let Some(value) = patch.background_glow {
            self.background_glow = value;
        }
    }
}

impl NotificationsSection {
    fn apply(&mut self, patch: &NotificationsPatch) {
        if let Some(value) = patch.reminders {
            self.reminders = value;
        }
        if let Some(value) = patch.birthdays {
            self.birthdays = value;
        }
        if let Some(value) = patch.unread_letters {
            self.unread_letters = value;
        }
        if let Some(value) = patch.quiet_hours_enabled {
            self.quiet_hours_enabled = value;
        }
        if let Some(value) = &patch.quiet_start {
            self.quiet_start = value.clone();
        }
        if let Some(value) = &patch.quiet_end {
            self.quiet_end = value.clone();
        }
    }

    /// Returns whether `now` falls inside enabled quiet hours.
    ///
    /// Ranges wrap midnight when `quiet_start` is later than `quiet_end`.
    /// Unparsable bounds disable quiet hours.
    pub fn is_quiet_time(&self, now: NaiveTime) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }
        let (Some(start), Some(end)) = (
            parse_hh_mm(&self.quiet_start),
            parse_hh_mm(&self.quiet_end),
        ) else {
            return false;
        };
        if start == end {
            return false;
        }
        if start < end {
            start <= now && now < end
        } else {
            now >= start || now < end
        }
    }
}

impl RelationshipSection {
    fn apply(&mut self, patch: &RelationshipPatch) {
        if let Some(value) = patch.show_days_together {
            self.show_days_together = value;
        }
        if let Some(value) = patch.show_moods_on_home {
            self.show_moods_on_home = value;
        }
        if let Some(value) = patch.show_timeline_on_home {
            self.show_timeline_on_home = value;
        }
    }
}

impl PrivacySection {
    fn apply(&mut self, patch: &PrivacyPatch) {
        if let Some(value) = patch.require_reauth_for_danger_zone {
            self.require_reauth_for_danger_zone = value;
        }
    }
}

impl PreferenceDocument {
    /// Applies `patch` in place with section-scoped shallow merge.
    pub fn apply(&mut self, patch: &PreferencePatch) {
        if let Some(section) = &patch.couple {
            self.couple.apply(section);
        }
        if let Some(section) = &patch.personalization {
            self.personalization.apply(section);
        }
        if let Some(section) = &patch.notifications {
            self.notifications.apply(section);
        }
        if let Some(section) = &patch.relationship {
            self.relationship.apply(section);
        }
        if let Some(section) = &patch.privacy {
            self.privacy.apply(section);
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    /// Returns `self` merged with `patch`, leaving `self` untouched.
    pub fn merged(&self, patch: &PreferencePatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }

    /// Defaults overlaid with whatever a stored body carries.
    pub fn from_stored(data: &JsonMap) -> Self {
        Self::default().merged(&PreferencePatch::from_stored(data))
    }

    /// Serializes into a stored body with every section present.
    pub fn to_json_map(&self) -> JsonMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonMap::new(),
        }
    }

    /// Whole days since `relationship_start_date`, never negative.
    pub fn days_together(&self, today: NaiveDate) -> Option<i64> {
        let start = parse_ymd(&self.couple.relationship_start_date)?;
        Some((today - start).num_days().max(0))
    }

    /// `month` is 1-based. Matches either partner's birthday month/day.
    pub fn is_birthday(&self, month: u32, day: u32) -> bool {
        [
            &self.couple.partner_a_birthday,
            &self.couple.partner_b_birthday,
        ]
        .into_iter()
        .filter_map(|value| parse_ymd(value))
        .any(|birthday| birthday.month() == month && birthday.day() == day)
    }
}

fn parse_ymd(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_hh_mm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::{
        Accent, NotificationsPatch, PersonalizationPatch, PreferenceDocument, PreferencePatch,
        Section, Theme,
    };
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn time(value: &str) -> NaiveTime {
        NaiveTime::parse_from_str(value, "%H:%M").expect("valid test time")
    }

    #[test]
    fn from_stored_fills_missing_and_mistyped_fields() {
        let stored = json!({
            "personalization": {"theme": "dark", "accent": "teal"},
            "notifications": {"reminders": "nope"},
            "privacy": 7,
            "unknownTopLevel": true
        });
        let doc = PreferenceDocument::from_stored(stored.as_object().expect("object"));
        let defaults = PreferenceDocument::default();

        assert_eq!(doc.personalization.theme, Theme::Dark);
        assert_eq!(doc.personalization.accent, Accent::Pink);
        assert!(doc.notifications.reminders);
        assert_eq!(doc.privacy, defaults.privacy);
        assert_eq!(doc.couple, defaults.couple);
    }

    #[test]
    fn sections_lists_touched_sections() {
        let mut patch = PreferencePatch::notifications(NotificationsPatch::default());
        patch.personalization = Some(PersonalizationPatch::default());
        assert_eq!(
            patch.sections(),
            vec![Section::Personalization, Section::Notifications]
        );
    }

    #[test]
    fn to_json_map_round_trips_through_from_stored() {
        let mut doc = PreferenceDocument::default();
        doc.personalization.theme = Theme::Light;
        doc.updated_at = Some(42);
        let restored = PreferenceDocument::from_stored(&doc.to_json_map());
        assert_eq!(restored, doc);
    }

    #[test]
    fn days_together_is_never_negative() {
        let doc = PreferenceDocument::default();
        let before = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
        let after = NaiveDate::from_ymd_opt(2026, 1, 6).expect("valid date");
        assert_eq!(doc.days_together(before), Some(0));
        assert_eq!(doc.days_together(after), Some(10));
    }

    #[test]
    fn is_birthday_matches_month_and_day_only() {
        let doc = PreferenceDocument::default();
        assert!(doc.is_birthday(8, 25));
        assert!(doc.is_birthday(9, 1));
        assert!(!doc.is_birthday(8, 26));
    }

    #[test]
    fn quiet_hours_wrap_past_midnight() {
        let mut doc = PreferenceDocument::default();
        assert!(!doc.notifications.is_quiet_time(time("23:00")));

        doc.notifications.quiet_hours_enabled = true;
        assert!(doc.notifications.is_quiet_time(time("23:00")));
        assert!(doc.notifications.is_quiet_time(time("07:59")));
        assert!(!doc.notifications.is_quiet_time(time("08:00")));
        assert!(!doc.notifications.is_quiet_time(time("12:00")));

        doc.notifications.quiet_start = "13:00".to_string();
        doc.notifications.quiet_end = "14:00".to_string();
        assert!(doc.notifications.is_quiet_time(time("13:30")));
        assert!(!doc.notifications.is_quiet_time(time("14:30")));
    }
}
