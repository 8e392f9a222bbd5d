//! World-info entry model.
//!
//! An [`Entry`] is one trigger-able knowledge snippet inside a book. The struct
//! names the fields the drawer reads or edits and keeps every other host field
//! in [`Entry::extra`], so a load → edit → save cycle never drops data the drawer
//! does not understand.
//!
//! Entries are plain values. The cache clones them on read and writes them back
//! through the host explicitly; nothing in the crate aliases host-owned data.

use crate::domain::error::{DrawerError, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Host-assigned entry identifier, unique within its book.
///
/// Hosts hand out numeric identifiers but string identifiers are tolerated.
/// Strings made only of digits are normalized to [`Uid::Number`] so that a uid
/// read from a JSON object key and the same uid read from an entry's `uid`
/// field compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Uid {
    /// Numeric identifier (the common case).
    Number(u64),
    /// Non-numeric identifier.
    Text(String),
}

impl Uid {
    /// Numeric interpretation used by the UID sort.
    #[must_use]
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Uid {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        value
            .parse::<u64>()
            .map_or_else(|_| Self::Text(value.to_string()), Self::Number)
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_u64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(UidVisitor)
    }
}

struct UidVisitor;

impl Visitor<'_> for UidVisitor {
    type Value = Uid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a numeric or string entry uid")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Uid, E> {
        Ok(Uid::Number(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Uid, E> {
        u64::try_from(v)
            .map(Uid::Number)
            .map_err(|_| E::custom(format!("negative uid {v}")))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Uid, E> {
        if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
            Ok(Uid::Number(v as u64))
        } else {
            Ok(Uid::Text(v.to_string()))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Uid, E> {
        Ok(Uid::from(v))
    }
}

/// Activation strategy of an entry.
///
/// Derived from the `constant` and `vectorized` flags; `constant` wins when a
/// malformed entry has both set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Always injected.
    Constant,
    /// Activated by vector similarity.
    Vectorized,
    /// Activated by keyword match.
    Normal,
}

impl Strategy {
    /// Value used by strategy selectors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Vectorized => "vectorized",
            Self::Normal => "normal",
        }
    }

    /// Parses a selector value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "constant" => Some(Self::Constant),
            "vectorized" => Some(Self::Vectorized),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }
}

/// Insertion anchor of an entry in the generated prompt.
///
/// Stored as a small integer on the wire. Values this crate does not know are
/// kept as [`Position::Other`] and written back unchanged. Ordering follows the
/// wire value, which is what the prompt sort compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    /// Before the character definition.
    #[default]
    BeforeCharacter,
    /// After the character definition.
    AfterCharacter,
    /// Top of the author's note.
    AuthorsNoteTop,
    /// Bottom of the author's note.
    AuthorsNoteBottom,
    /// At a chat depth (see [`Entry::depth`]).
    AtDepth,
    /// Before example messages.
    ExamplesTop,
    /// After example messages.
    ExamplesBottom,
    /// Named outlet.
    Outlet,
    /// Unknown anchor value.
    Other(u8),
}

impl Position {
    /// Wire value of the anchor.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::BeforeCharacter => 0,
            Self::AfterCharacter => 1,
            Self::AuthorsNoteTop => 2,
            Self::AuthorsNoteBottom => 3,
            Self::AtDepth => 4,
            Self::ExamplesTop => 5,
            Self::ExamplesBottom => 6,
            Self::Outlet => 7,
            Self::Other(v) => v,
        }
    }
}

impl From<u8> for Position {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::BeforeCharacter,
            1 => Self::AfterCharacter,
            2 => Self::AuthorsNoteTop,
            3 => Self::AuthorsNoteBottom,
            4 => Self::AtDepth,
            5 => Self::ExamplesTop,
            6 => Self::ExamplesBottom,
            7 => Self::Outlet,
            v => Self::Other(v),
        }
    }
}

impl From<Position> for u8 {
    fn from(value: Position) -> Self {
        value.value()
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Selectors hand positions back as strings, so both forms are accepted.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(u8),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(n) => Ok(Self::from(n)),
            Wire::Text(s) => s
                .trim()
                .parse::<u8>()
                .map(Self::from)
                .map_err(|_| de::Error::custom(format!("invalid position {s:?}"))),
        }
    }
}

/// Field of an entry as seen by change detection.
///
/// The reconciler patches list labels and decides on editor refreshes per
/// field; the named variants are the fields with special handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryField {
    /// Title / memo.
    Comment,
    /// Trigger keywords.
    Key,
    /// Body text.
    Content,
    /// Enabled toggle (inverted).
    Disable,
    /// Constant strategy flag.
    Constant,
    /// Vectorized strategy flag.
    Vectorized,
    /// Any other host field, by wire name.
    Other(String),
}

impl EntryField {
    /// Maps a wire field name to a field.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "comment" => Self::Comment,
            "key" => Self::Key,
            "content" => Self::Content,
            "disable" => Self::Disable,
            "constant" => Self::Constant,
            "vectorized" => Self::Vectorized,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name of the field.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Comment => "comment",
            Self::Key => "key",
            Self::Content => "content",
            Self::Disable => "disable",
            Self::Constant => "constant",
            Self::Vectorized => "vectorized",
            Self::Other(name) => name,
        }
    }
}

/// A single world-info entry.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::domain::{Entry, Strategy, Uid};
///
/// let mut entry = Entry::new(Uid::from(3));
/// entry.key = vec!["dragon".to_string(), "wyrm".to_string()];
/// assert_eq!(entry.title(), "dragon, wyrm");
///
/// entry.set_strategy(Strategy::Vectorized);
/// assert_eq!(entry.strategy(), Strategy::Vectorized);
/// assert!(!entry.constant);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Identifier, unique within the owning book.
    pub uid: Uid,

    /// Trigger keywords in display order.
    #[serde(default)]
    pub key: Vec<String>,

    /// Title / memo. May be empty.
    #[serde(default)]
    pub comment: String,

    /// Body text.
    #[serde(default)]
    pub content: String,

    /// `true` when the entry is switched off.
    #[serde(default)]
    pub disable: bool,

    /// Constant strategy flag. Never set together with `vectorized`.
    #[serde(default)]
    pub constant: bool,

    /// Vectorized strategy flag. Never set together with `constant`.
    #[serde(default)]
    pub vectorized: bool,

    /// Insertion anchor.
    #[serde(default)]
    pub position: Position,

    /// Chat depth, meaningful for depth-based anchors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    /// Tie-break inside one depth; higher is inserted later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,

    /// Trigger chance in percent (0–100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selective_probability: Option<u32>,

    /// Host fields the drawer does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Creates an entry with the host's new-entry defaults.
    #[must_use]
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            key: Vec::new(),
            comment: String::new(),
            content: String::new(),
            disable: false,
            constant: false,
            vectorized: false,
            position: Position::default(),
            depth: Some(4),
            order: Some(100),
            selective_probability: Some(100),
            extra: Map::new(),
        }
    }

    /// Current activation strategy.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        if self.constant {
            Strategy::Constant
        } else if self.vectorized {
            Strategy::Vectorized
        } else {
            Strategy::Normal
        }
    }

    /// Sets the strategy, always writing both flags.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.constant = strategy == Strategy::Constant;
        self.vectorized = strategy == Strategy::Vectorized;
    }

    /// Keywords joined the way labels and form fields show them.
    #[must_use]
    pub fn keywords(&self) -> String {
        self.key.join(", ")
    }

    /// Display title: the comment, or the keywords when the comment is empty.
    #[must_use]
    pub fn title(&self) -> String {
        if self.comment.is_empty() {
            self.keywords()
        } else {
            self.comment.clone()
        }
    }

    /// Serializes the entry into its wire fields.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Serialization`] if a preserved host field cannot be
    /// represented as JSON.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(DrawerError::Host(format!("entry serialized to non-object {other}"))),
        }
    }

    /// Text a form shows for a field, as used for visible-value comparisons.
    ///
    /// Keywords are joined with `", "`, strings are shown verbatim and every
    /// other value uses its JSON text. Missing optional fields show as empty.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures from [`Entry::to_fields`].
    pub fn display_value(&self, field: &EntryField) -> Result<String> {
        Ok(match field {
            EntryField::Comment => self.comment.clone(),
            EntryField::Key => self.keywords(),
            EntryField::Content => self.content.clone(),
            EntryField::Disable => self.disable.to_string(),
            EntryField::Constant => self.constant.to_string(),
            EntryField::Vectorized => self.vectorized.to_string(),
            EntryField::Other(name) => match self.to_fields()?.get(name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            },
        })
    }

    /// Writes a form value back into the entry.
    ///
    /// Text is converted to the field's wire type: keywords are split on
    /// commas, flags parse as booleans, numeric fields accept an empty string
    /// as "unset". Fields the drawer does not model keep the JSON type they
    /// already had.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Serialization`] when the text does not fit the
    /// field's type.
    pub fn set_field(&mut self, field: &EntryField, text: &str) -> Result<()> {
        match field {
            EntryField::Comment => self.comment = text.to_string(),
            EntryField::Content => self.content = text.to_string(),
            EntryField::Key => {
                self.key = text
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect();
            }
            EntryField::Disable => self.disable = parse_flag(text),
            EntryField::Constant => {
                let on = parse_flag(text);
                self.constant = on;
                if on {
                    self.vectorized = false;
                }
            }
            EntryField::Vectorized => {
                let on = parse_flag(text);
                self.vectorized = on;
                if on {
                    self.constant = false;
                }
            }
            EntryField::Other(name) => {
                let mut fields = self.to_fields()?;
                let value = match fields.get(name.as_str()) {
                    Some(Value::Number(_)) | None if text.trim().is_empty() => Value::Null,
                    Some(Value::String(_)) => Value::String(text.to_string()),
                    _ => serde_json::from_str(text.trim())
                        .unwrap_or_else(|_| Value::String(text.to_string())),
                };
                fields.insert(name.clone(), value);
                let uid = self.uid.clone();
                *self = serde_json::from_value(Value::Object(fields))?;
                self.uid = uid;
            }
        }
        Ok(())
    }
}

fn parse_flag(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "true" | "on" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_from_object_key_matches_numeric_field() {
        let from_key: Uid = serde_json::from_str("\"12\"").unwrap();
        let from_field: Uid = serde_json::from_str("12").unwrap();
        assert_eq!(from_key, from_field);
        assert_eq!(Uid::from("abc"), Uid::Text("abc".to_string()));
    }

    #[test]
    fn unknown_host_fields_survive_round_trip() {
        let raw = r#"{"uid":1,"key":["a"],"comment":"c","content":"x","position":4,
                      "depth":2,"order":7,"selectiveLogic":0,"group":"g"}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.position, Position::AtDepth);
        assert_eq!(entry.extra.get("group"), Some(&Value::String("g".into())));

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["selectiveLogic"], Value::from(0));
        assert_eq!(back["order"], Value::from(7));
    }

    #[test]
    fn position_accepts_selector_strings_and_unknown_values() {
        let entry: Entry = serde_json::from_str(r#"{"uid":1,"position":"2"}"#).unwrap();
        assert_eq!(entry.position, Position::AuthorsNoteTop);

        let odd: Entry = serde_json::from_str(r#"{"uid":1,"position":42}"#).unwrap();
        assert_eq!(odd.position, Position::Other(42));
        assert!(Position::Other(42) > Position::Outlet);
    }

    #[test]
    fn strategy_is_derived_and_exclusive() {
        let mut entry = Entry::new(Uid::from(0));
        assert_eq!(entry.strategy(), Strategy::Normal);

        entry.set_strategy(Strategy::Constant);
        assert!(entry.constant && !entry.vectorized);

        entry.set_field(&EntryField::Vectorized, "true").unwrap();
        assert_eq!(entry.strategy(), Strategy::Vectorized);
        assert!(!entry.constant);
    }

    #[test]
    fn set_field_converts_form_text() {
        let mut entry = Entry::new(Uid::from(5));
        entry.set_field(&EntryField::Key, "sun, moon ,").unwrap();
        assert_eq!(entry.key, vec!["sun", "moon"]);

        entry.set_field(&EntryField::from_name("order"), "").unwrap();
        assert_eq!(entry.order, None);

        entry.set_field(&EntryField::from_name("depth"), "9").unwrap();
        assert_eq!(entry.depth, Some(9));
        assert_eq!(entry.uid, Uid::from(5));
        assert_eq!(entry.display_value(&EntryField::from_name("depth")).unwrap(), "9");
    }
}
