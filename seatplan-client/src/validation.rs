//! Form validation
//!
//! 姓名字段校验：必须包含空格 (名 + 姓)，并与现有预订做相似度比对；
//! 桌台名称不允许与其他桌台重复 (忽略大小写)。

use std::collections::BTreeMap;

use shared::models::Reservation;

use crate::ClientError;
use crate::similarity::{SIMILARITY_LIMIT, compare_two_strings};

/// 缺少姓氏
pub const MSG_FULL_NAME_REQUIRED: &str = "Bitte trage Vor- und Nachnamen ein";
/// 桌台名称重复
pub const MSG_TABLE_NAME_TAKEN: &str = "Bitte wähle einen anderen Namen";
/// Field key used for the table name
pub const TABLE_NAME_KEY: &str = "name";

/// Error attached to one form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Message(String),
    /// Similar existing reservations, formatted "<name> an Tisch <table>"
    Conflicts(Vec<String>),
}

impl FieldError {
    /// All lines to display
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::Message(msg) => vec![msg.as_str()],
            Self::Conflicts(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

/// Field key -> error, in key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .insert(key.into(), FieldError::Message(message.into()));
    }

    /// Append a conflict line; replaces a plain message on the same key
    pub fn push_conflict(&mut self, key: &str, line: impl Into<String>) {
        let entry = self
            .errors
            .entry(key.to_string())
            .or_insert_with(|| FieldError::Conflicts(Vec::new()));
        match entry {
            FieldError::Conflicts(list) => list.push(line.into()),
            FieldError::Message(_) => *entry = FieldError::Conflicts(vec![line.into()]),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldError> {
        self.errors.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldError> {
        self.errors.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check one seat name against the other reservations
    ///
    /// - 空值：清除该字段的错误
    /// - 没有空格：提示填写全名
    /// - 否则列出所有相似度 >= 0.64 的现有预订
    pub fn validate_name(&mut self, key: &str, name: &str, reservations: &[Reservation]) {
        if name.is_empty() {
            self.remove(key);
            return;
        }

        if !name.contains(' ') {
            self.set(key, MSG_FULL_NAME_REQUIRED);
            return;
        }

        self.remove(key);

        let lowered = name.to_lowercase();
        for entry in reservations {
            let similarity = compare_two_strings(&lowered, &entry.name.to_lowercase());
            if similarity >= SIMILARITY_LIMIT {
                self.push_conflict(key, format!("{} an Tisch {}", entry.name, entry.table));
            }
        }
    }

    /// Table names must be unique, ignoring case
    pub fn validate_table_name<S: AsRef<str>>(&mut self, name: &str, table_names: &[S]) {
        let lowered = name.to_lowercase();
        let taken = table_names
            .iter()
            .any(|other| other.as_ref().to_lowercase() == lowered);
        if taken {
            self.set(TABLE_NAME_KEY, MSG_TABLE_NAME_TAKEN);
        } else {
            self.remove(TABLE_NAME_KEY);
        }
    }
}

/// Whether any of the values is empty
pub fn is_empty<S: AsRef<str>>(values: &[S]) -> bool {
    values.iter().any(|v| v.as_ref().is_empty())
}

/// Submit lock plus field errors of one edit form
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub errors: ValidationErrors,
    submit_locked: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提交前加锁，防止重复提交
    pub fn before_submit(&mut self) {
        self.submit_locked = true;
    }

    pub fn unlock_submit(&mut self) {
        self.submit_locked = false;
    }

    pub fn handle_submit_error(&mut self, error: &ClientError) {
        tracing::error!(error = %error, "Submit failed");
        self.unlock_submit();
    }

    pub fn is_submit_locked(&self) -> bool {
        self.submit_locked
    }

    pub fn can_submit(&self) -> bool {
        !self.submit_locked && self.errors.is_empty()
    }

    pub fn reset(&mut self) {
        self.errors.clear();
        self.submit_locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(name: &str, table: &str) -> Reservation {
        Reservation {
            name: name.into(),
            table: table.into(),
        }
    }

    #[test]
    fn test_name_without_space_is_rejected() {
        let mut errors = ValidationErrors::new();
        errors.validate_name("seat_1", "Max", &[]);
        assert_eq!(
            errors.get("seat_1"),
            Some(&FieldError::Message(MSG_FULL_NAME_REQUIRED.into()))
        );

        // 即使有完全相同的预订，也先要求全名
        errors.validate_name("seat_1", "Max", &[reservation("Max", "Tisch 1")]);
        assert_eq!(
            errors.get("seat_1"),
            Some(&FieldError::Message(MSG_FULL_NAME_REQUIRED.into()))
        );
    }

    #[test]
    fn test_clearing_field_clears_error() {
        let mut errors = ValidationErrors::new();
        errors.validate_name("seat_2", "Max", &[]);
        assert!(errors.has("seat_2"));
        errors.validate_name("seat_2", "", &[]);
        assert!(!errors.has("seat_2"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_similar_names_are_listed() {
        let reservations = vec![
            reservation("Max Mustermann", "1"),
            reservation("Erika Gabler", "2"),
            reservation("max mustermann", "4"),
        ];
        let mut errors = ValidationErrors::new();
        errors.validate_name("seat_3", "Max Musterman", &reservations);

        assert_eq!(
            errors.get("seat_3"),
            Some(&FieldError::Conflicts(vec![
                "Max Mustermann an Tisch 1".into(),
                "max mustermann an Tisch 4".into(),
            ]))
        );
    }

    #[test]
    fn test_unique_name_has_no_error() {
        let mut errors = ValidationErrors::new();
        errors.set("seat_1", "stale");
        errors.validate_name("seat_1", "Anna Schmidt", &[reservation("Erika Gabler", "Tisch 2")]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_table_name() {
        let mut errors = ValidationErrors::new();
        errors.validate_table_name("tisch 1", &["Tisch 1", "Tisch 2"]);
        assert_eq!(
            errors.get(TABLE_NAME_KEY).map(FieldError::lines),
            Some(vec![MSG_TABLE_NAME_TAKEN])
        );
        errors.validate_table_name("Tisch 3", &["Tisch 1", "Tisch 2"]);
        assert!(!errors.has(TABLE_NAME_KEY));
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&["a", ""]));
        assert!(!is_empty(&["a", "b"]));
        assert!(!is_empty::<&str>(&[]));
    }

    #[test]
    fn test_form_state_submit_lock() {
        let mut form = FormState::new();
        assert!(form.can_submit());
        form.before_submit();
        assert!(!form.can_submit());
        form.handle_submit_error(&ClientError::Backend("down".into()));
        assert!(form.can_submit());

        form.errors.set("seat_1", MSG_FULL_NAME_REQUIRED);
        assert!(!form.can_submit());
        form.reset();
        assert!(form.can_submit());
    }
}
