// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The leveled logger capability handed to agents and factories.
//!
//! Agents receive a [`Logger`] trait object instead of logging through a
//! global. Values passed to it come from the closed [`LogValue`] set so any
//! sink can render them uniformly. [`TracingLogger`] is the production sink;
//! [`MemoryLogger`] records entries for assertions in tests.

use std::fmt;
use std::sync::Mutex;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Fatal => "FATAL",
        };
        f.write_str(name)
    }
}

/// A single loggable value.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Str(String),
    Int(i64),
    Float(f64),
    /// The rendered message of an error.
    Error(String),
    /// A structured `key=value` pair.
    Field(String, Box<LogValue>),
}

impl LogValue {
    /// Captures the message of an error.
    pub fn error(err: &(dyn std::error::Error + '_)) -> Self {
        LogValue::Error(err.to_string())
    }

    /// Builds a `key=value` field.
    pub fn field(key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        LogValue::Field(key.into(), Box::new(value.into()))
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Str(s) => f.write_str(s),
            LogValue::Int(i) => write!(f, "{}", i),
            LogValue::Float(x) => write!(f, "{}", x),
            LogValue::Error(e) => write!(f, "error: {}", e),
            LogValue::Field(k, v) => write!(f, "{}={}", k, v),
        }
    }
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        LogValue::Str(s.to_string())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        LogValue::Str(s)
    }
}

impl From<&String> for LogValue {
    fn from(s: &String) -> Self {
        LogValue::Str(s.clone())
    }
}

impl From<i64> for LogValue {
    fn from(i: i64) -> Self {
        LogValue::Int(i)
    }
}

impl From<i32> for LogValue {
    fn from(i: i32) -> Self {
        LogValue::Int(i64::from(i))
    }
}

impl From<u32> for LogValue {
    fn from(i: u32) -> Self {
        LogValue::Int(i64::from(i))
    }
}

impl From<u64> for LogValue {
    fn from(i: u64) -> Self {
        LogValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<usize> for LogValue {
    fn from(i: usize) -> Self {
        LogValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for LogValue {
    fn from(x: f64) -> Self {
        LogValue::Float(x)
    }
}

/// Renders values the way every sink prints them: space separated.
pub fn render(values: &[LogValue]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leveled logging capability.
pub trait Logger: Send + Sync {
    /// Writes one entry at `level`.
    fn log(&self, level: Level, values: &[LogValue]);

    fn debug(&self, values: &[LogValue]) {
        self.log(Level::Debug, values);
    }

    fn info(&self, values: &[LogValue]) {
        self.log(Level::Info, values);
    }

    fn warning(&self, values: &[LogValue]) {
        self.log(Level::Warning, values);
    }

    fn error(&self, values: &[LogValue]) {
        self.log(Level::Error, values);
    }

    fn critical(&self, values: &[LogValue]) {
        self.log(Level::Critical, values);
    }

    /// Logs at [`Level::Fatal`] and terminates the process.
    fn fatal(&self, values: &[LogValue]) -> ! {
        self.log(Level::Fatal, values);
        std::process::exit(1)
    }
}

/// Forwards entries to `tracing`, tagging each with a fixed prefix.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    prefix: String,
}

impl TracingLogger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, values: &[LogValue]) {
        let message = render(values);
        let prefix = self.prefix.as_str();
        match level {
            Level::Debug => tracing::debug!(prefix, "{}", message),
            Level::Info => tracing::info!(prefix, "{}", message),
            Level::Warning => tracing::warn!(prefix, "{}", message),
            Level::Error => tracing::error!(prefix, "{}", message),
            Level::Critical | Level::Fatal => {
                tracing::error!(prefix, severity = %level, "{}", message)
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _values: &[LogValue]) {}
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded `(level, rendered message)` pairs.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the messages recorded at `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, values: &[LogValue]) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, render(values)));
    }
}
