//! Shared vessel data model - the attribute store the evaluator reads
//! and writes.
//!
//! Every vessel lives under a [`VesselContext`] (e.g. `vessels.<urn>`);
//! attributes are keyed by dotted paths under that context. The core
//! uses three paths: the `buddy` membership flag, the published vessel
//! `name`, and `navigation.position`. The local vessel is addressed via
//! the reserved `vessels.self` context.
//!
//! [`VesselDataModel`] is the seam to the external data model; the
//! in-memory [`SharedDataModel`] backs the CLI's UDP feed and tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::geo::Position;

/// Attribute paths used by the proximity core.
pub mod paths {
    /// Boolean membership flag marking a vessel as a known buddy.
    pub const BUDDY: &str = "buddy";
    /// The vessel's published display name.
    pub const NAME: &str = "name";
    /// The vessel's position.
    pub const POSITION: &str = "navigation.position";
}

/// A vessel's namespace in the shared data model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VesselContext(String);

impl VesselContext {
    /// Context for a remote vessel by identifier.
    pub fn vessel(id: &str) -> Self {
        Self(format!("vessels.{id}"))
    }

    /// Context for the local vessel.
    pub fn own() -> Self {
        Self("vessels.self".to_string())
    }

    /// Context from an already fully qualified string
    /// (e.g. the `context` field of an incoming delta).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw context string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VesselContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value stored at an attribute path.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
    Position(Position),
}

/// Read/write access to the shared vessel data model.
///
/// All reads are synchronous snapshot reads; implementations must be
/// safe to call from the evaluation loop and the feed concurrently.
pub trait VesselDataModel: Send + Sync {
    /// Read an attribute, or `None` if absent.
    fn get(&self, context: &VesselContext, path: &str) -> Option<AttributeValue>;

    /// Write an attribute (last write wins).
    fn set(&self, context: &VesselContext, path: &str, value: AttributeValue);

    /// The local vessel's current position, if known.
    fn own_position(&self) -> Option<Position> {
        match self.get(&VesselContext::own(), paths::POSITION) {
            Some(AttributeValue::Position(p)) => Some(p),
            _ => None,
        }
    }

    /// A vessel's published display name, if any.
    fn vessel_name(&self, context: &VesselContext) -> Option<String> {
        match self.get(context, paths::NAME) {
            Some(AttributeValue::Text(name)) => Some(name),
            _ => None,
        }
    }
}

/// Thread-safe in-memory data model.
///
/// Cheap to clone; all clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct SharedDataModel {
    attributes: Arc<RwLock<HashMap<VesselContext, HashMap<String, AttributeValue>>>>,
}

impl SharedDataModel {
    /// Create an empty data model.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VesselDataModel for SharedDataModel {
    fn get(&self, context: &VesselContext, path: &str) -> Option<AttributeValue> {
        self.attributes
            .read()
            .unwrap()
            .get(context)
            .and_then(|attrs| attrs.get(path))
            .cloned()
    }

    fn set(&self, context: &VesselContext, path: &str, value: AttributeValue) {
        self.attributes
            .write()
            .unwrap()
            .entry(context.clone())
            .or_default()
            .insert(path.to_string(), value);
    }
}
