//! Request validation schemas.
//!
//! Every schema parses an untyped JSON body into a typed, normalized request or
//! returns the full list of field-scoped violations. Paths use dotted notation
//! (`tags.0.name`) and messages are meant to be shown next to the offending field.

mod account;
mod collections;
mod dashboard;
mod highlights;
mod links;
mod rss;
mod tags;
mod upload;
mod users;

pub use account::*;
pub use collections::*;
pub use dashboard::*;
pub use highlights::*;
pub use links::*;
pub use rss::*;
pub use tags::*;
pub use upload::*;
pub use users::*;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Lowercase handle: letters, digits, underscore, hyphen; 3 to 50 characters.
pub static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{3,50}$").expect("valid username pattern"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("valid email pattern")
});

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All violations found while parsing one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field, in the order they were raised.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// One-line rendering used as the envelope message.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| {
                if e.field.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.field, e.message)
                }
            })
            .collect();
        format!("Validation failed: {}", parts.join("; "))
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

/// Whether a key may be missing or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-null.
    Required,
    /// May be missing, but not `null`.
    Optional,
    /// May be missing or `null`.
    Nullish,
}

/// String format checks applied after trimming and case folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    Url,
    Username,
}

/// Rules for one string field.
#[derive(Debug, Clone, Copy)]
pub struct Text {
    presence: Presence,
    trim: bool,
    lowercase: bool,
    min: Option<usize>,
    max: Option<usize>,
    format: Option<Format>,
}

impl Text {
    const fn with(presence: Presence) -> Self {
        Self {
            presence,
            trim: false,
            lowercase: false,
            min: None,
            max: None,
            format: None,
        }
    }

    pub const fn required() -> Self {
        Self::with(Presence::Required)
    }

    pub const fn optional() -> Self {
        Self::with(Presence::Optional)
    }

    pub const fn nullish() -> Self {
        Self::with(Presence::Nullish)
    }

    pub const fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub const fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub const fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub const fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub const fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Normalize `raw` and collect every violated rule.
    fn apply(&self, raw: &str) -> (String, Vec<String>) {
        let mut value = if self.trim {
            raw.trim().to_string()
        } else {
            raw.to_string()
        };
        if self.lowercase {
            value = value.to_lowercase();
        }

        let mut problems = Vec::new();
        let len = value.chars().count();
        if let Some(min) = self.min {
            if len < min {
                problems.push(format!("String must contain at least {min} character(s)"));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                problems.push(format!("String must contain at most {max} character(s)"));
            }
        }
        match self.format {
            Some(Format::Email) if !is_email(&value) => problems.push("Invalid email".to_string()),
            Some(Format::Url) if url::Url::parse(&value).is_err() => {
                problems.push("Invalid url".to_string())
            }
            Some(Format::Username) if !USERNAME_PATTERN.is_match(&value) => problems.push(
                "Username must be 3-50 characters of lowercase letters, numbers, underscores or hyphens"
                    .to_string(),
            ),
            _ => {}
        }
        (value, problems)
    }
}

fn is_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL_PATTERN.is_match(value)
}

/// Closed string enumerations accepted by schemas.
pub trait SchemaEnum: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == name)
    }

    /// `'a' | 'b' | 'c'`
    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|v| format!("'{}'", v.as_str()))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field reader over one JSON object, accumulating violations as it goes.
///
/// Accessors return `None` for absent values and for values that failed
/// validation; callers check [`Input::finish`] before trusting required fields.
pub struct Input<'a> {
    path: String,
    object: Option<&'a Map<String, Value>>,
    errors: Vec<FieldError>,
}

impl<'a> Input<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self::at(value, String::new())
    }

    pub(crate) fn at(value: &'a Value, path: String) -> Self {
        let mut errors = Vec::new();
        let object = match value {
            Value::Object(map) => Some(map),
            other => {
                errors.push(FieldError::new(
                    path.clone(),
                    format!("Expected object, received {}", type_name(other)),
                ));
                None
            }
        };
        Self {
            path,
            object,
            errors,
        }
    }

    fn field_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// Record a violation on `key` (relative to this reader).
    pub fn error(&mut self, key: &str, message: impl Into<String>) {
        let field = self.field_path(key);
        self.errors.push(FieldError::new(field, message));
    }

    /// Raw access for fields with bespoke shapes (unions, literals).
    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.object.and_then(|map| map.get(key))
    }

    fn lookup(&mut self, key: &str, presence: Presence, expected: &str) -> Option<&'a Value> {
        let map = self.object?;
        match map.get(key) {
            None => {
                if presence == Presence::Required {
                    self.error(key, "Required");
                }
                None
            }
            Some(Value::Null) => {
                if presence != Presence::Nullish {
                    self.error(key, format!("Expected {expected}, received null"));
                }
                None
            }
            Some(value) => Some(value),
        }
    }

    pub fn text(&mut self, key: &str, rule: Text) -> Option<String> {
        let value = self.lookup(key, rule.presence, "string")?;
        let Some(raw) = value.as_str() else {
            self.error(key, format!("Expected string, received {}", type_name(value)));
            return None;
        };
        let (normalized, problems) = rule.apply(raw);
        if problems.is_empty() {
            Some(normalized)
        } else {
            for problem in problems {
                self.error(key, problem);
            }
            None
        }
    }

    /// Like [`Input::text`] with nullish presence, but keeps an explicit `null`
    /// as `Some(None)` so updates can clear a value.
    pub fn nullable_text(&mut self, key: &str, rule: Text) -> Option<Option<String>> {
        if matches!(self.raw(key), Some(Value::Null)) {
            return Some(None);
        }
        self.text(key, Text { presence: Presence::Nullish, ..rule }).map(Some)
    }

    pub fn boolean(&mut self, key: &str, presence: Presence) -> Option<bool> {
        let value = self.lookup(key, presence, "boolean")?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.error(key, format!("Expected boolean, received {}", type_name(value)));
                None
            }
        }
    }

    pub fn integer(&mut self, key: &str, presence: Presence) -> Option<i64> {
        let value = self.lookup(key, presence, "number")?;
        check_integer(value).map_err(|msg| self.error(key, msg)).ok()
    }

    pub fn choice<E: SchemaEnum>(&mut self, key: &str, presence: Presence) -> Option<E> {
        let value = self.lookup(key, presence, "string")?;
        match value.as_str().and_then(E::from_name) {
            Some(v) => Some(v),
            None => {
                let received = match value.as_str() {
                    Some(s) => format!("'{s}'"),
                    None => type_name(value).to_string(),
                };
                self.error(
                    key,
                    format!("Invalid enum value. Expected {}, received {received}", E::expected()),
                );
                None
            }
        }
    }

    fn array(
        &mut self,
        key: &str,
        presence: Presence,
        max_items: Option<usize>,
    ) -> Option<&'a Vec<Value>> {
        let value = self.lookup(key, presence, "array")?;
        let Some(items) = value.as_array() else {
            self.error(key, format!("Expected array, received {}", type_name(value)));
            return None;
        };
        if let Some(max) = max_items {
            if items.len() > max {
                self.error(key, format!("Array must contain at most {max} element(s)"));
                return None;
            }
        }
        Some(items)
    }

    pub fn texts(
        &mut self,
        key: &str,
        presence: Presence,
        max_items: Option<usize>,
        item: Text,
    ) -> Option<Vec<String>> {
        let items = self.array(key, presence, max_items)?;
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, value) in items.iter().enumerate() {
            let path = format!("{key}.{i}");
            match value.as_str() {
                Some(raw) => {
                    let (normalized, problems) = item.apply(raw);
                    if problems.is_empty() {
                        out.push(normalized);
                    } else {
                        ok = false;
                        for problem in problems {
                            self.error(&path, problem);
                        }
                    }
                }
                None => {
                    ok = false;
                    self.error(&path, format!("Expected string, received {}", type_name(value)));
                }
            }
        }
        ok.then_some(out)
    }

    pub fn integers(&mut self, key: &str, presence: Presence) -> Option<Vec<i64>> {
        let items = self.array(key, presence, None)?;
        let mut out = Vec::with_capacity(items.len());
        for (i, value) in items.iter().enumerate() {
            match check_integer(value) {
                Ok(n) => out.push(n),
                Err(msg) => self.error(&format!("{key}.{i}"), msg),
            }
        }
        (out.len() == items.len()).then_some(out)
    }

    /// Parse a nested object with `parse`, folding its violations into this reader.
    pub fn object<T>(
        &mut self,
        key: &str,
        presence: Presence,
        parse: impl FnOnce(&mut Input<'a>) -> T,
    ) -> Option<T> {
        let value = self.lookup(key, presence, "object")?;
        let mut child = Input::at(value, self.field_path(key));
        let before = child.errors.len();
        let parsed = parse(&mut child);
        let failed = child.object.is_none() || child.errors.len() > before;
        self.errors.append(&mut child.errors);
        (!failed).then_some(parsed)
    }

    /// Parse an array of objects, one child reader per element.
    pub fn objects<T>(
        &mut self,
        key: &str,
        presence: Presence,
        mut parse: impl FnMut(&mut Input<'a>) -> T,
    ) -> Option<Vec<T>> {
        let items = self.array(key, presence, None)?;
        let base = self.field_path(key);
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, value) in items.iter().enumerate() {
            let mut child = Input::at(value, format!("{base}.{i}"));
            let parsed = parse(&mut child);
            if child.object.is_none() || !child.errors.is_empty() {
                ok = false;
            }
            self.errors.append(&mut child.errors);
            out.push(parsed);
        }
        ok.then_some(out)
    }

    pub(crate) fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// Succeeds only when no violation was recorded.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

fn check_integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| "Expected integer, received float".to_string()),
        other => Err(format!("Expected number, received {}", type_name(other))),
    }
}
