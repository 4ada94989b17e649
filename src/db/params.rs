//! Named-parameter translation.
//!
//! Callers write `:name` placeholders and pass a JSON object of values. This
//! module rewrites the placeholders into SQL Server `@name` markers and infers
//! a wire type for every non-null value.
//!
//! The rewrite is lexical: a `:name` sequence inside a string literal is
//! rewritten too.

use crate::error::{GatewayError, GatewayResult};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("valid placeholder regex"))
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// A value in the closed set of driver types the gateway binds.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Int(i32),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Bit(bool),
    Text(String),
}

impl WireValue {
    /// Infer the wire type of a JSON value. `None` for JSON null.
    pub fn from_json(name: &str, value: &JsonValue) -> GatewayResult<Option<Self>> {
        let wire = match value {
            JsonValue::Null => return Ok(None),
            JsonValue::Bool(b) => WireValue::Bit(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    WireValue::Int(int_in_range(name, i as f64)?)
                } else if n.as_u64().is_some() {
                    return Err(out_of_range(name));
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.is_finite() && f.fract() == 0.0 {
                        WireValue::Int(int_in_range(name, f)?)
                    } else {
                        WireValue::Float(f)
                    }
                }
            }
            JsonValue::String(s) => match DateTime::parse_from_rfc3339(s) {
                Ok(ts) => WireValue::Timestamp(ts.with_timezone(&Utc)),
                Err(_) => WireValue::Text(s.clone()),
            },
            other => WireValue::Text(other.to_string()),
        };
        Ok(Some(wire))
    }

    /// SQL Server type used when declaring the parameter.
    pub fn sql_type(&self) -> &'static str {
        match self {
            WireValue::Int(_) => "int",
            WireValue::Float(_) => "float",
            WireValue::Timestamp(_) => "datetime2",
            WireValue::Bit(_) => "bit",
            WireValue::Text(_) => "nvarchar(max)",
        }
    }
}

fn int_in_range(name: &str, value: f64) -> GatewayResult<i32> {
    if value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Ok(value as i32)
    } else {
        Err(out_of_range(name))
    }
}

fn out_of_range(name: &str) -> GatewayError {
    GatewayError::binding(name, "whole number outside the 32-bit integer range")
}

/// One named, typed parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Parameter name without the `@` prefix.
    pub name: String,
    pub value: WireValue,
}

impl Binding {
    /// `@name type`, one entry of an `sp_executesql` parameter declaration.
    pub fn declaration(&self) -> String {
        format!("@{} {}", self.name, self.value.sql_type())
    }
}

/// Rewrite `:name` placeholders to `@name`.
pub fn rewrite_placeholders(sql: &str) -> String {
    placeholder_regex().replace_all(sql, "@$1").into_owned()
}

/// Build bindings for every non-null parameter, in key order.
pub fn build_bindings(params: &serde_json::Map<String, JsonValue>) -> GatewayResult<Vec<Binding>> {
    let mut bindings = Vec::with_capacity(params.len());
    for (name, value) in params {
        if !identifier_regex().is_match(name) {
            return Err(GatewayError::binding(
                name.as_str(),
                "parameter names must match [A-Za-z_][A-Za-z0-9_]*",
            ));
        }
        if let Some(value) = WireValue::from_json(name, value)? {
            bindings.push(Binding {
                name: name.clone(),
                value,
            });
        }
    }
    Ok(bindings)
}

/// Rewrite placeholders and build bindings in one step.
pub fn translate(
    sql: &str,
    params: &serde_json::Map<String, JsonValue>,
) -> GatewayResult<(String, Vec<Binding>)> {
    let bindings = build_bindings(params)?;
    Ok((rewrite_placeholders(sql), bindings))
}

/// Comma-separated declaration list for `sp_executesql`.
pub fn declaration_list(bindings: &[Binding]) -> String {
    bindings
        .iter()
        .map(Binding::declaration)
        .collect::<Vec<_>>()
        .join(", ")
}
