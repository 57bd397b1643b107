//! The buddy roster - the user-curated list of tracked vessels.
//!
//! A [`Buddy`] is a remote vessel identified by a URN-like string
//! (e.g. `urn:mrn:imo:mmsi:123456`) with an optional display name.
//! The [`Roster`] owns the ordered list and enforces the CRUD
//! validation rules: identifiers are required, unique, and must exist
//! for remove/rename. Mutations are last-write-wins; persistence lives
//! in [`crate::config`].
//!
//! The evaluation core treats the roster as a read-only snapshot - it
//! never mutates the list itself.

use std::fmt;

use thiserror::Error;

/// Unique identifier of a buddy vessel (a URN-like string).
///
/// Immutable once created; used as the key for subscriptions,
/// membership flags, and notification records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuddyId(String);

impl BuddyId {
    /// Create a buddy id. Callers validate non-emptiness via
    /// [`Roster::add`]; this constructor does not.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuddyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuddyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A configured tracking target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buddy {
    /// Unique identifier, immutable once created.
    pub id: BuddyId,
    /// Optional human-readable label.
    pub name: Option<String>,
}

impl Buddy {
    /// Create a buddy with no display name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: BuddyId::new(id),
            name: None,
        }
    }

    /// Create a buddy with a display name.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: BuddyId::new(id),
            name: Some(name.into()),
        }
    }
}

/// Validation errors for roster mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    /// An identifier was empty or missing.
    #[error("please include an identifier")]
    MissingId,

    /// A buddy with this identifier already exists.
    #[error("buddy already exists: {0}")]
    Duplicate(BuddyId),

    /// No buddy with this identifier exists.
    #[error("cannot find buddy with identifier: {0}")]
    Unknown(BuddyId),
}

/// The ordered buddy list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    buddies: Vec<Buddy>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a roster from an existing list, preserving order.
    pub fn from_buddies(buddies: Vec<Buddy>) -> Self {
        Self { buddies }
    }

    /// The buddies in insertion order.
    pub fn buddies(&self) -> &[Buddy] {
        &self.buddies
    }

    /// Look up a buddy by id.
    pub fn get(&self, id: &BuddyId) -> Option<&Buddy> {
        self.buddies.iter().find(|b| &b.id == id)
    }

    /// Whether a buddy with this id is on the roster.
    pub fn contains(&self, id: &BuddyId) -> bool {
        self.get(id).is_some()
    }

    /// Number of buddies on the roster.
    pub fn len(&self) -> usize {
        self.buddies.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.buddies.is_empty()
    }

    /// Add a buddy to the roster.
    ///
    /// Fails if the identifier is empty or already present.
    pub fn add(&mut self, buddy: Buddy) -> Result<(), RosterError> {
        if buddy.id.as_str().trim().is_empty() {
            return Err(RosterError::MissingId);
        }
        if self.contains(&buddy.id) {
            return Err(RosterError::Duplicate(buddy.id));
        }
        self.buddies.push(buddy);
        Ok(())
    }

    /// Remove a buddy, returning it so callers can clear external
    /// state (membership flag, subscriptions) for the removed vessel.
    pub fn remove(&mut self, id: &BuddyId) -> Result<Buddy, RosterError> {
        let index = self
            .buddies
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| RosterError::Unknown(id.clone()))?;
        Ok(self.buddies.remove(index))
    }

    /// Change a buddy's display name. `None` clears the name.
    pub fn rename(&mut self, id: &BuddyId, name: Option<String>) -> Result<(), RosterError> {
        let buddy = self
            .buddies
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| RosterError::Unknown(id.clone()))?;
        buddy.name = name;
        Ok(())
    }
}
