//! Change event payloads.

use std::fmt;

use serde::Deserialize;

// == Event Kind ==
/// What kind of upstream object changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Page,
    Database,
    Block,
    Resource,
}

/// How it changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// A recognized `{resource}.{action}` event type, e.g. `page.updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKind {
    pub resource: ResourceKind,
    pub action: ChangeAction,
}

impl EventKind {
    /// Parses an event type string. Returns `None` for anything unrecognized.
    pub fn parse(event_type: &str) -> Option<Self> {
        let (resource, action) = event_type.split_once('.')?;

        let resource = match resource {
            "page" => ResourceKind::Page,
            "database" => ResourceKind::Database,
            "block" => ResourceKind::Block,
            "resource" => ResourceKind::Resource,
            _ => return None,
        };
        let action = match action {
            "created" => ChangeAction::Created,
            "updated" => ChangeAction::Updated,
            "deleted" => ChangeAction::Deleted,
            _ => return None,
        };

        Some(Self { resource, action })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource = match self.resource {
            ResourceKind::Page => "page",
            ResourceKind::Database => "database",
            ResourceKind::Block => "block",
            ResourceKind::Resource => "resource",
        };
        let action = match self.action {
            ChangeAction::Created => "created",
            ChangeAction::Updated => "updated",
            ChangeAction::Deleted => "deleted",
        };
        write!(f, "{}.{}", resource, action)
    }
}

// == Change Event ==
/// An inbound change notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeEvent {
    /// Event type, e.g. `page.updated`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Identifier of the changed object
    #[serde(default, alias = "resourceId")]
    pub resource_id: Option<String>,
    /// Canonical path of the object, handed to the revalidation sink
    #[serde(default, alias = "resourcePath")]
    pub resource_path: Option<String>,
    /// Containing object whose cached form is also stale (e.g. a block's page)
    #[serde(default, alias = "parentId")]
    pub parent_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(event_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            resource_id: Some(resource_id.into()),
            resource_path: None,
            parent_id: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = Some(path.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }
}
