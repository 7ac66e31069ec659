// Member References - Resolvable handles to variables and functions
//
// A reference is stored on every node that names a field. The referenced
// field lives either on the node's own class (self context), on an explicit
// class, or in the local scope of a function graph.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ClassHandle;

/// Which scope a member reference resolves against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum MemberParent {
    /// The class being compiled, whatever generation is current at the time
    SelfContext,
    /// An explicit class, possibly superseded since it was stored
    Class { class: ClassHandle },
    /// A local variable of the named function graph
    LocalScope { function: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReference {
    pub member_name: String,
    pub parent: MemberParent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_guid: Option<Uuid>,
}

impl MemberReference {
    pub fn self_member(name: impl Into<String>, guid: Option<Uuid>) -> Self {
        Self {
            member_name: name.into(),
            parent: MemberParent::SelfContext,
            member_guid: guid,
        }
    }

    pub fn external(class: ClassHandle, name: impl Into<String>) -> Self {
        Self {
            member_name: name.into(),
            parent: MemberParent::Class { class },
            member_guid: None,
        }
    }

    pub fn local(function: impl Into<String>, name: impl Into<String>, guid: Uuid) -> Self {
        Self {
            member_name: name.into(),
            parent: MemberParent::LocalScope {
                function: function.into(),
            },
            member_guid: Some(guid),
        }
    }

    pub fn is_self_context(&self) -> bool {
        matches!(self.parent, MemberParent::SelfContext)
    }

    pub fn is_local_scope(&self) -> bool {
        matches!(self.parent, MemberParent::LocalScope { .. })
    }

    /// The explicitly stored parent class, if any
    pub fn parent_class(&self) -> Option<ClassHandle> {
        match self.parent {
            MemberParent::Class { class } => Some(class),
            _ => None,
        }
    }

    /// Point the reference at a different owner, keeping name and guid
    pub fn set_parent_class(&mut self, class: ClassHandle) {
        self.parent = MemberParent::Class { class };
    }
}

impl std::fmt::Display for MemberReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parent {
            MemberParent::SelfContext => write!(f, "self.{}", self.member_name),
            MemberParent::Class { class } => write!(f, "{}.{}", class, self.member_name),
            MemberParent::LocalScope { function } => write!(f, "{}::{}", function, self.member_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_exclusive() {
        let r = MemberReference::self_member("Health", None);
        assert!(r.is_self_context());
        assert_eq!(r.parent_class(), None);

        let mut r = MemberReference::external(ClassHandle::new(3, 1), "Fire");
        assert_eq!(r.parent_class(), Some(ClassHandle::new(3, 1)));
        r.set_parent_class(ClassHandle::new(4, 0));
        assert!(!r.is_self_context());
        assert_eq!(r.to_string(), "class#4.0.Fire");

        let r = MemberReference::local("Tick", "Counter", Uuid::new_v4());
        assert!(r.is_local_scope());
        assert!(r.member_guid.is_some());
    }

    #[test]
    fn test_json_shape() {
        let r = MemberReference::external(ClassHandle::new(2, 0), "Jump");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["parent"]["scope"], "class");
        let back: MemberReference = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
