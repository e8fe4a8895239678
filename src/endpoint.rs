//! Endpoint specification and normalization.
//!
//! Callers describe broker endpoints as a single URL, a list, or a failover
//! group such as `failover:(ws://a:61614, ws://b:61614)`. Groups may be
//! nested inside lists and inside other groups. [`normalize`] flattens any of
//! these into the ordered candidate list the manager rotates through.

use crate::error::Error;
use serde_json::Value;
use std::collections::VecDeque;

const GROUP_PREFIX: &str = "failover:(";
const GROUP_SUFFIX: &str = ")";

/// Raw endpoint specification as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSpec {
    /// A single endpoint, possibly in `failover:(...)` group syntax
    Url(String),
    /// An ordered list of specifications
    List(Vec<EndpointSpec>),
}

impl EndpointSpec {
    /// Returns `true` if the specification carries no endpoint text at all.
    ///
    /// An empty list is not considered missing: it is a valid, if useless,
    /// specification that leaves the manager idle.
    pub fn is_missing(&self) -> bool {
        matches!(self, EndpointSpec::Url(url) if url.is_empty())
    }
}

impl From<&str> for EndpointSpec {
    fn from(url: &str) -> Self {
        EndpointSpec::Url(url.to_string())
    }
}

impl From<String> for EndpointSpec {
    fn from(url: String) -> Self {
        EndpointSpec::Url(url)
    }
}

impl<T: Into<EndpointSpec>> From<Vec<T>> for EndpointSpec {
    fn from(items: Vec<T>) -> Self {
        EndpointSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<&Value> for EndpointSpec {
    type Error = Error;

    /// Accepts strings and (nested) arrays of strings; anything else is an
    /// [`Error::InvalidEndpoint`].
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(url) => Ok(EndpointSpec::Url(url.clone())),
            Value::Array(items) => items
                .iter()
                .map(EndpointSpec::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(EndpointSpec::List),
            other => Err(Error::InvalidEndpoint(format!(
                "expected string or list, got {}",
                json_type_name(other)
            ))),
        }
    }
}

impl TryFrom<Value> for EndpointSpec {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        EndpointSpec::try_from(&value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip the `failover:(` / `)` wrapper, returning the group body.
fn group_body(url: &str) -> Option<&str> {
    url.strip_prefix(GROUP_PREFIX)?.strip_suffix(GROUP_SUFFIX)
}

/// Flatten an endpoint specification into an ordered list of plain endpoints.
///
/// Work-queue expansion: lists and group members are spliced back at the
/// front of the queue so leaves come out in first-seen order. Group members
/// are trimmed and empty members dropped; `failover:()` contributes nothing.
/// The result may be empty.
pub fn normalize(spec: &EndpointSpec) -> Vec<String> {
    let mut queue: VecDeque<EndpointSpec> = VecDeque::from([spec.clone()]);
    let mut endpoints = Vec::new();

    while let Some(entry) = queue.pop_front() {
        match entry {
            EndpointSpec::List(items) => {
                for item in items.into_iter().rev() {
                    queue.push_front(item);
                }
            }
            EndpointSpec::Url(url) => match group_body(&url) {
                Some(body) => {
                    let members: Vec<&str> = body
                        .split(',')
                        .map(str::trim)
                        .filter(|member| !member.is_empty())
                        .collect();
                    for member in members.into_iter().rev() {
                        queue.push_front(EndpointSpec::Url(member.to_string()));
                    }
                }
                None => endpoints.push(url),
            },
        }
    }

    endpoints
}

/// Normalize a dynamically-typed endpoint value (e.g. from a JSON document).
///
/// # Errors
///
/// Returns [`Error::InvalidEndpoint`] if the value is missing, empty, or
/// contains anything other than strings and lists.
pub fn normalize_value(value: &Value) -> Result<Vec<String>, Error> {
    let spec = EndpointSpec::try_from(value)?;
    if spec.is_missing() {
        return Err(Error::InvalidEndpoint("missing endpoint".to_string()));
    }
    Ok(normalize(&spec))
}
