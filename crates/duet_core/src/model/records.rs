//! Typed views over the feature collections.
//!
//! Every field is decoded leniently: a record missing a field, or carrying
//! a mistyped one, still decodes, with that field empty.

use super::lenient::lenient;
use crate::store::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DIARY_ENTRIES: &str = "diaryEntries";
pub const MEMORIES: &str = "memories";
pub const LETTERS: &str = "letters";
pub const MOODS: &str = "moods";
pub const EVENTS: &str = "events";
pub const GOALS: &str = "goals";
pub const APP_META: &str = "appMeta";

/// Collections holding user data, in export and wipe order.
pub const DATA_COLLECTIONS: [&str; 5] = [DIARY_ENTRIES, MEMORIES, LETTERS, MOODS, EVENTS];

/// Field stamped on every record at creation, epoch milliseconds.
pub const CREATED_AT: &str = "createdAt";
/// Explicit day key carried by reminders and moods.
pub const DATE: &str = "date";

fn decode<T: DeserializeOwned + Default>(doc: &Document) -> T {
    serde_json::from_value(Value::Object(doc.data.clone())).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiaryFields {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    body: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    author_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    created_at: Option<i64>,
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author_email: Option<String>,
    pub created_at: Option<i64>,
}

impl DiaryEntry {
    pub fn from_document(doc: &Document) -> Self {
        let fields: DiaryFields = decode(doc);
        Self {
            id: doc.id.clone(),
            title: fields.title.unwrap_or_default(),
            body: fields.body.unwrap_or_default(),
            author_email: fields.author_email,
            created_at: fields.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LetterFields {
    #[serde(default, deserialize_with = "lenient")]
    subject: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    body: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    sender_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    recipient_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    read: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    created_at: Option<i64>,
}

/// One letter between the partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub sender_email: Option<String>,
    pub recipient_email: Option<String>,
    pub read: bool,
    pub created_at: Option<i64>,
}

impl Letter {
    pub fn from_document(doc: &Document) -> Self {
        let fields: LetterFields = decode(doc);
        Self {
            id: doc.id.clone(),
            subject: fields.subject.unwrap_or_default(),
            body: fields.body.unwrap_or_default(),
            sender_email: fields.sender_email,
            recipient_email: fields.recipient_email,
            read: fields.read.unwrap_or(false),
            created_at: fields.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryFields {
    #[serde(default, deserialize_with = "lenient")]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    storage_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    caption: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    author_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    created_at: Option<i64>,
}

/// One photo memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub image_url: Option<String>,
    /// Blob key of the uploaded image.
    pub storage_path: Option<String>,
    pub caption: String,
    pub author_email: Option<String>,
    pub created_at: Option<i64>,
}

impl Memory {
    pub fn from_document(doc: &Document) -> Self {
        let fields: MemoryFields = decode(doc);
        Self {
            id: doc.id.clone(),
            image_url: fields.image_url,
            storage_path: fields.storage_path,
            caption: fields.caption.unwrap_or_default(),
            author_email: fields.author_email,
            created_at: fields.created_at,
        }
    }
}

/// Fixed mood options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Okay,
    #[serde(rename = "Missing You")]
    MissingYou,
    Excited,
    Tired,
    Stressed,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Okay,
        Mood::MissingYou,
        Mood::Excited,
        Mood::Tired,
        Mood::Stressed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Happy => "Happy",
            Self::Okay => "Okay",
            Self::MissingYou => "Missing You",
            Self::Excited => "Excited",
            Self::Tired => "Tired",
            Self::Stressed => "Stressed",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Okay => "🙂",
            Self::MissingYou => "🥺",
            Self::Excited => "✨",
            Self::Tired => "😴",
            Self::Stressed => "😵‍💫",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mood| mood.label().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoodFields {
    #[serde(default, deserialize_with = "lenient")]
    user_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    mood: Option<Mood>,
}

/// One user's mood on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub user_email: Option<String>,
    pub date: Option<String>,
    pub mood: Option<Mood>,
}

impl MoodEntry {
    pub fn from_document(doc: &Document) -> Self {
        let fields: MoodFields = decode(doc);
        Self {
            id: doc.id.clone(),
            user_email: fields.user_email,
            date: fields.date,
            mood: fields.mood,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderFields {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    created_by: Option<String>,
}

/// Calendar reminder bound to one day key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub created_by: Option<String>,
}

impl Reminder {
    pub fn from_document(doc: &Document) -> Self {
        let fields: ReminderFields = decode(doc);
        Self {
            id: doc.id.clone(),
            title: fields.title.unwrap_or_default(),
            date: fields.date,
            created_by: fields.created_by,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalFields {
    #[serde(default, deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    done: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    created_by: Option<String>,
}

/// Shared goal with a done flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub text: String,
    pub done: bool,
    pub created_by: Option<String>,
}

impl Goal {
    pub fn from_document(doc: &Document) -> Self {
        let fields: GoalFields = decode(doc);
        Self {
            id: doc.id.clone(),
            text: fields.text.unwrap_or_default(),
            done: fields.done.unwrap_or(false),
            created_by: fields.created_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Letter, Mood, MoodEntry};
    use crate::store::Document;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::new("x", value.as_object().cloned().expect("object"))
    }

    #[test]
    fn letter_decodes_with_missing_and_mistyped_fields() {
        let letter = Letter::from_document(&doc(json!({"subject": 5, "read": "yes"})));
        assert_eq!(letter.subject, "");
        assert!(!letter.read);
        assert!(letter.created_at.is_none());
    }

    #[test]
    fn mood_labels_round_trip() {
        for mood in Mood::ALL {
            assert_eq!(Mood::from_label(mood.label()), Some(mood));
        }
        let entry = MoodEntry::from_document(&doc(json!({"mood": "Missing You"})));
        assert_eq!(entry.mood, Some(Mood::MissingYou));
        assert_eq!(Mood::from_label("grumpy"), None);
    }
}
