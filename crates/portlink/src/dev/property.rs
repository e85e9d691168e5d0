// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key/value configuration used to open devices.
//!
//! Accepted sources:
//!
//! ```text
//! # config text
//! device fake_grabber
//! width 320
//! size 4 3            -> list (4 3)
//! [motor]
//! axes 6
//! ```
//!
//! and command lines (`--device fake_motor --axes 4 --verbose`).

use crate::bottle::{Bottle, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered string -> [`Value`] map with named sub-groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    values: BTreeMap<String, Value>,
    groups: BTreeMap<String, Property>,
}

/// Single token stays a scalar; several become a list; none means "set".
fn parse_value(text: &str) -> Value {
    let mut parsed = Bottle::from_text(text);
    match parsed.len() {
        0 => Value::from_bool(true),
        1 => parsed.iter().next().cloned().unwrap_or_else(|| Value::from_bool(true)),
        _ => {
            let list = std::mem::take(&mut parsed);
            Value::List(list)
        }
    }
}

impl Property {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration text. Malformed lines are skipped.
    #[must_use]
    pub fn from_config(text: &str) -> Self {
        let mut root = Property::new();
        let mut section: Option<String> = None;
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                if name.is_empty() {
                    log::warn!("[dev] Ignoring empty section header");
                    section = None;
                } else {
                    section = Some(name.to_string());
                    root.groups.entry(name.to_string()).or_default();
                }
                continue;
            }
            let (key, rest) = match line.split_once(char::is_whitespace) {
                Some((k, r)) => (k, r.trim()),
                None => (line, ""),
            };
            let target = match &section {
                Some(name) => root.groups.entry(name.clone()).or_default(),
                None => &mut root,
            };
            target.values.insert(key.to_string(), parse_value(rest));
        }
        root
    }

    /// Parse `--key value` pairs. A key with no value is stored as `true`.
    #[must_use]
    pub fn from_command_line<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prop = Property::new();
        let mut pending: Option<String> = None;
        for arg in args {
            let arg = arg.as_ref();
            if let Some(key) = arg.strip_prefix("--").filter(|k| !k.is_empty()) {
                if let Some(flag) = pending.take() {
                    prop.put(flag, true);
                }
                pending = Some(key.to_string());
            } else if let Some(key) = pending.take() {
                prop.values.insert(key, parse_value(arg));
            } else {
                log::debug!("[dev] Ignoring stray argument {:?}", arg);
            }
        }
        if let Some(flag) = pending {
            prop.put(flag, true);
        }
        prop
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn unput(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn put_group(&mut self, name: impl Into<String>, group: Property) -> &mut Self {
        self.groups.insert(name.into(), group);
        self
    }

    #[must_use]
    pub fn check(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn find_str(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn find_int(&self, key: &str) -> Option<i64> {
        self.find(key).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn find_float(&self, key: &str) -> Option<f64> {
        self.find(key).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn find_bool(&self, key: &str) -> Option<bool> {
        self.find(key).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Property> {
        self.groups.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.groups.is_empty()
    }

    /// `(key value) ...` followed by `(group (key value) ...)` entries.
    #[must_use]
    pub fn to_bottle(&self) -> Bottle {
        let mut out = Bottle::new();
        for (key, value) in &self.values {
            let entry = out.add_nested();
            entry.add_string(key.as_str()).add(value.clone());
        }
        for (name, group) in &self.groups {
            let mut entry = Bottle::new();
            entry.add_string(name.as_str());
            for item in &group.to_bottle() {
                entry.add(item.clone());
            }
            out.add_list(entry);
        }
        out
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bottle())
    }
}
