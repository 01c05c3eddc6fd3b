//! Core types for circuit representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The identity of a single terminal or wire endpoint.
///
/// Node keys carry no state of their own. Their voltage is a solver output
/// keyed by the [`NetId`] they reduce to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub String);

impl NodeKey {
    /// Create a node key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stable identifier for a component, assigned by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub String);

impl ComponentId {
    /// Create a component id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical identifier of an electrical net (an equivalence class of nodes).
///
/// The value is the registration index of the class root, so ordering nets
/// by id follows the order in which their first node was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A wire between two node identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub from: NodeKey,
    pub to: NodeKey,
    /// Deleted wires are kept by the editor for undo but carry no current.
    #[serde(default)]
    pub deleted: bool,
    /// Hidden wires are not drawn but remain electrically active.
    #[serde(default)]
    pub hidden: bool,
}

impl Wire {
    /// Create an active, visible wire.
    pub fn new(from: impl Into<NodeKey>, to: impl Into<NodeKey>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            deleted: false,
            hidden: false,
        }
    }

    /// Whether this wire participates in the circuit.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}
