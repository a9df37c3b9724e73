/*
Copyright 2021 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::error::Severity;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Severity of the inter-component scope check; `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeValidation {
    Error,
    Warning,
    None,
}

impl ScopeValidation {
    pub fn severity(self) -> Option<Severity> {
        match self {
            ScopeValidation::Error => Some(Severity::Error),
            ScopeValidation::Warning => Some(Severity::Warning),
            ScopeValidation::None => None,
        }
    }
}

/// Recognized processor options. Unknown values self-diagnose and fall back
/// to the defaults; option names and values are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorOptions {
    pub scope_validation: ScopeValidation,
    pub nullable_validation: Severity,
    pub private_member_validation: Severity,
    pub static_member_validation: Severity,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        ProcessorOptions {
            scope_validation: ScopeValidation::Error,
            nullable_validation: Severity::Error,
            private_member_validation: Severity::Error,
            static_member_validation: Severity::Error,
        }
    }
}

lazy_static! {
    static ref RECOGNIZED_OPTIONS: Vec<&'static str> = vec![
        "scopevalidation",
        "nullablevalidation",
        "privatemembervalidation",
        "staticmembervalidation",
    ];
}

impl ProcessorOptions {
    /// Parses host-supplied options. Problems are returned as
    /// self-diagnostic strings rather than failing the round.
    pub fn parse(raw: &HashMap<String, String>) -> (ProcessorOptions, Vec<String>) {
        let mut options = ProcessorOptions::default();
        let mut complaints = Vec::new();
        for (name, value) in raw {
            let lower_name = name.to_lowercase();
            let lower_value = value.to_lowercase();
            if !RECOGNIZED_OPTIONS.contains(&lower_name.as_str()) {
                continue;
            }
            match lower_name.as_str() {
                "scopevalidation" => match lower_value.as_str() {
                    "error" => options.scope_validation = ScopeValidation::Error,
                    "warning" => options.scope_validation = ScopeValidation::Warning,
                    "none" => options.scope_validation = ScopeValidation::None,
                    _ => complaints.push(unknown_value(name, value, "error")),
                },
                "nullablevalidation" => {
                    match parse_severity(&lower_value) {
                        Some(severity) => options.nullable_validation = severity,
                        None => complaints.push(unknown_value(name, value, "error")),
                    }
                }
                "privatemembervalidation" => {
                    match parse_severity(&lower_value) {
                        Some(severity) => options.private_member_validation = severity,
                        None => complaints.push(unknown_value(name, value, "error")),
                    }
                }
                "staticmembervalidation" => {
                    match parse_severity(&lower_value) {
                        Some(severity) => options.static_member_validation = severity,
                        None => complaints.push(unknown_value(name, value, "error")),
                    }
                }
                _ => {}
            }
        }
        (options, complaints)
    }
}

fn parse_severity(value: &str) -> Option<Severity> {
    match value {
        "error" => Some(Severity::Error),
        "warning" => Some(Severity::Warning),
        _ => None,
    }
}

fn unknown_value(name: &str, value: &str, fallback: &str) -> String {
    format!(
        "unknown value '{}' for processor option '{}', falling back to '{}'",
        value, name, fallback
    )
}
