use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::security::AccessControl;

/// Node discriminator with the payload specific to each kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Markup element such as `div` or `a`
    Element { tag: String },
    /// Character data
    Text { text: String },
    /// Markup comment
    Comment { text: String },
    /// Opaque template body handed to the rendering collaborator
    Template { content: String },
    /// Reference to a shared component root (store id of the component node)
    Placement { component: String },
}

impl NodeKind {
    /// Short discriminator used by the hasher and the reconciler
    pub fn discriminator(&self) -> &str {
        match self {
            NodeKind::Element { tag } => tag,
            NodeKind::Text { .. } => "#text",
            NodeKind::Comment { .. } => "#comment",
            NodeKind::Template { .. } => "#template",
            NodeKind::Placement { .. } => "#placement",
        }
    }

    /// Whether this kind may own children
    pub fn accepts_children(&self) -> bool {
        matches!(self, NodeKind::Element { .. })
    }
}

/// Where a node hangs in the content graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Page(String),
    Node(String),
}

impl ParentRef {
    pub fn id(&self) -> &str {
        match self {
            ParentRef::Page(id) | ParentRef::Node(id) => id,
        }
    }
}

/// Data key and query expression feeding a node
///
/// The query text belongs to the expression collaborator and is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBinding {
    pub data_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// A node of a page's markup tree or of a shared component
///
/// Shared component roots have `shared == true` and no parent; they live in
/// the store's shadow container and are reached from pages only through
/// placement nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Store-assigned identifier (UUID v7)
    pub id: String,

    /// Reconciliation key
    pub key: String,

    #[serde(flatten)]
    pub kind: NodeKind,

    pub name: Option<String>,

    /// Custom schema type this node is an instance of
    pub custom_type: Option<String>,

    pub parent: Option<ParentRef>,

    /// Ordered child node ids
    pub children: Vec<String>,

    /// Plain markup attributes
    pub attributes: BTreeMap<String, String>,

    pub access: AccessControl,

    pub show_condition: Option<String>,
    pub hide_condition: Option<String>,
    pub show_for_locales: Vec<String>,
    pub hide_for_locales: Vec<String>,
    pub render_mode: Option<String>,
    pub binding: Option<DataBinding>,

    /// Root of a shared component stored in the shadow container
    pub shared: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentNode {
    pub fn new(id: String, key: String, kind: NodeKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            key,
            kind,
            name: None,
            custom_type: None,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            access: AccessControl::default(),
            show_condition: None,
            hide_condition: None,
            show_for_locales: Vec::new(),
            hide_for_locales: Vec::new(),
            render_mode: None,
            binding: None,
            shared: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_placement(&self) -> bool {
        matches!(self.kind, NodeKind::Placement { .. })
    }

    /// Component id referenced by a placement node
    pub fn placement_target(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Placement { component } => Some(component),
            _ => None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminators() {
        let el = NodeKind::Element {
            tag: "div".to_string(),
        };
        assert_eq!(el.discriminator(), "div");
        assert!(el.accepts_children());
        let text = NodeKind::Text {
            text: "hi".to_string(),
        };
        assert_eq!(text.discriminator(), "#text");
        assert!(!text.accepts_children());
    }

    #[test]
    fn test_placement_target() {
        let node = ContentNode::new(
            "n1".to_string(),
            "k1".to_string(),
            NodeKind::Placement {
                component: "c1".to_string(),
            },
        );
        assert!(node.is_placement());
        assert_eq!(node.placement_target(), Some("c1"));
    }

    #[test]
    fn test_node_serializes_kind_inline() {
        let node = ContentNode::new(
            "n1".to_string(),
            "k1".to_string(),
            NodeKind::Element {
                tag: "p".to_string(),
            },
        );
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["kind"], "element");
        assert_eq!(value["tag"], "p");
        let back: ContentNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }
}
