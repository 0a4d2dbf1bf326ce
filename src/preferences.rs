//! Persisted filter and current-user settings.
//!
//! Preferences live in a small TOML file. Missing keys read as their defaults,
//! and every edit is written to disk before subscribers see it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::watch;

use crate::models::DEFAULT_USER_ID;
use crate::query::TaskFilter;

/// Persisted value of `filter_user_id` meaning "no user filter"
pub const NO_USER_FILTER: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub show_only_pending: bool,
    pub filter_category: String,
    #[serde(with = "user_filter")]
    pub filter_user_id: Option<i64>,
    pub current_user_id: i64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_only_pending: false,
            filter_category: String::new(),
            filter_user_id: None,
            current_user_id: DEFAULT_USER_ID,
        }
    }
}

impl Preferences {
    pub fn task_filter(&self) -> TaskFilter {
        TaskFilter {
            show_only_pending: self.show_only_pending,
            category: self.filter_category.clone(),
            user_id: self.filter_user_id,
        }
    }

    pub fn clear_filters(&mut self) {
        self.filter_category.clear();
        self.filter_user_id = None;
        self.show_only_pending = false;
    }

    pub fn get(&self, key: PreferenceKey) -> PreferenceValue {
        match key {
            PreferenceKey::ShowOnlyPending => PreferenceValue::Bool(self.show_only_pending),
            PreferenceKey::FilterCategory => PreferenceValue::Text(self.filter_category.clone()),
            PreferenceKey::FilterUserId => {
                PreferenceValue::Int(self.filter_user_id.unwrap_or(NO_USER_FILTER))
            }
            PreferenceKey::CurrentUserId => PreferenceValue::Int(self.current_user_id),
        }
    }

    pub fn set(&mut self, key: PreferenceKey, value: PreferenceValue) -> Result<(), PreferenceError> {
        match (key, value) {
            (PreferenceKey::ShowOnlyPending, PreferenceValue::Bool(v)) => self.show_only_pending = v,
            (PreferenceKey::FilterCategory, PreferenceValue::Text(v)) => self.filter_category = v,
            (PreferenceKey::FilterUserId, PreferenceValue::Int(v)) => {
                self.filter_user_id = user_filter::from_sentinel(v)
            }
            (PreferenceKey::CurrentUserId, PreferenceValue::Int(v)) => self.current_user_id = v,
            (key, value) => {
                return Err(PreferenceError::TypeMismatch {
                    key: key.as_str(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    ShowOnlyPending,
    FilterCategory,
    FilterUserId,
    CurrentUserId,
}

impl PreferenceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::ShowOnlyPending => "show_only_pending",
            PreferenceKey::FilterCategory => "filter_category",
            PreferenceKey::FilterUserId => "filter_user_id",
            PreferenceKey::CurrentUserId => "current_user_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceValue {
    Bool(bool),
    Text(String),
    Int(i64),
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceValue::Bool(v) => write!(f, "{v}"),
            PreferenceValue::Text(v) => write!(f, "{v:?}"),
            PreferenceValue::Int(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Failed to read preferences file: {0}")]
    ReadError(String),
    #[error("Failed to parse preferences: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write preferences file: {0}")]
    WriteError(String),
    #[error("Preference {key} cannot hold {value}")]
    TypeMismatch { key: &'static str, value: String },
}

/// Serializes `Option<i64>` as an integer, using -1 for `None`
mod user_filter {
    use super::NO_USER_FILTER;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn from_sentinel(value: i64) -> Option<i64> {
        if value < 0 { None } else { Some(value) }
    }

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.unwrap_or(NO_USER_FILTER))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(from_sentinel(i64::deserialize(deserializer)?))
    }
}

/// Turn the persisted integer form into an optional user filter
pub fn user_filter_from_sentinel(value: i64) -> Option<i64> {
    user_filter::from_sentinel(value)
}

pub struct PreferenceStore {
    path: Option<PathBuf>,
    changes: watch::Sender<Preferences>,
}

impl PreferenceStore {
    /// Load preferences from `path`; a missing file reads as all defaults
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let prefs = Self::read_file(&path)?;
        let (changes, _) = watch::channel(prefs);
        Ok(Self {
            path: Some(path),
            changes,
        })
    }

    /// Preferences that are never written to disk
    pub fn in_memory() -> Self {
        let (changes, _) = watch::channel(Preferences::default());
        Self { path: None, changes }
    }

    fn read_file(path: &Path) -> Result<Preferences, PreferenceError> {
        if !path.exists() {
            return Ok(Preferences::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| PreferenceError::ReadError(e.to_string()))?;
        Ok(toml::from_str(&contents)?)
    }

    fn write_file(path: &Path, prefs: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PreferenceError::WriteError(e.to_string()))?;
            }
        }

        let toml_string = toml::to_string_pretty(prefs)
            .map_err(|e| PreferenceError::WriteError(format!("Failed to serialize preferences: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| PreferenceError::WriteError(e.to_string()))
    }

    pub fn current(&self) -> Preferences {
        self.changes.borrow().clone()
    }

    pub fn get(&self, key: PreferenceKey) -> PreferenceValue {
        self.changes.borrow().get(key)
    }

    pub fn set(&self, key: PreferenceKey, value: PreferenceValue) -> Result<Preferences, PreferenceError> {
        let mut updated = self.current();
        updated.set(key, value)?;
        self.store(updated)
    }

    /// Apply several changes as one write; subscribers never see part of an edit
    pub fn edit<F>(&self, f: F) -> Result<Preferences, PreferenceError>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut updated = self.current();
        f(&mut updated);
        self.store(updated)
    }

    fn store(&self, updated: Preferences) -> Result<Preferences, PreferenceError> {
        if *self.changes.borrow() == updated {
            return Ok(updated);
        }
        if let Some(path) = &self.path {
            Self::write_file(path, &updated)?;
        }
        self.changes.send_replace(updated.clone());
        Ok(updated)
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.changes.subscribe()
    }
}
