//! Graph nodes
//!
//! Node kinds form a closed sum type. Per-kind behaviour that the pipeline
//! needs to query (does the node reference other assets, can it change the
//! class layout, in which order should it be refreshed) is declared once in [`NODE_CAPABILITIES`] and looked up through
//! the kind's [`NodeTag`].

use serde::{Deserialize, Serialize};

use crate::{
    BlueprintId, ClassHandle, Function, FunctionParam, MemberReference, PN_THEN, PN_VALUE, Pin,
    PinDirection, PinType, Position,
};

// ─────────────────────────────────────────────────────────────────────────────
// Node Kinds
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Override of an overridable parent or interface function
    Event { event_reference: MemberReference },
    /// Self-standing event declared by the Blueprint
    CustomEvent { name: String },
    /// Entry point of a function graph
    FunctionEntry { signature: MemberReference },
    FunctionResult,
    CallFunction { function: MemberReference },
    /// Call into the parent class implementation of the enclosing function
    CallParentFunction { function: MemberReference },
    VariableGet { variable: MemberReference },
    VariableSet { variable: MemberReference },
    MacroInstance {
        macro_blueprint: BlueprintId,
        macro_graph: String,
    },
    /// Entry or exit of a macro graph
    Tunnel { is_entry: bool },
    Timeline { timeline_name: String },
    MakeStruct { struct_name: String },
    /// Anything the pipeline has no special handling for (math, flow control)
    Generic { node_type: String },
}

/// Discriminant of [`NodeKind`], used to index the capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Event = 0,
    CustomEvent,
    FunctionEntry,
    FunctionResult,
    CallFunction,
    CallParentFunction,
    VariableGet,
    VariableSet,
    MacroInstance,
    Tunnel,
    Timeline,
    MakeStruct,
    Generic,
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Event { .. } => NodeTag::Event,
            NodeKind::CustomEvent { .. } => NodeTag::CustomEvent,
            NodeKind::FunctionEntry { .. } => NodeTag::FunctionEntry,
            NodeKind::FunctionResult => NodeTag::FunctionResult,
            NodeKind::CallFunction { .. } => NodeTag::CallFunction,
            NodeKind::CallParentFunction { .. } => NodeTag::CallParentFunction,
            NodeKind::VariableGet { .. } => NodeTag::VariableGet,
            NodeKind::VariableSet { .. } => NodeTag::VariableSet,
            NodeKind::MacroInstance { .. } => NodeTag::MacroInstance,
            NodeKind::Tunnel { .. } => NodeTag::Tunnel,
            NodeKind::Timeline { .. } => NodeTag::Timeline,
            NodeKind::MakeStruct { .. } => NodeTag::MakeStruct,
            NodeKind::Generic { .. } => NodeTag::Generic,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability Table
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCapabilities {
    /// References a class, struct or Blueprint other than its own
    pub has_external_dependencies: bool,
    /// Adding or removing the node changes the generated class layout
    pub causes_structural_change: bool,
    /// Higher refreshes first among nodes with the same structural flag
    pub refresh_priority: u8,
}

const fn caps(external: bool, structural: bool, priority: u8) -> NodeCapabilities {
    NodeCapabilities {
        has_external_dependencies: external,
        causes_structural_change: structural,
        refresh_priority: priority,
    }
}

/// Indexed by `NodeTag as usize`
pub const NODE_CAPABILITIES: [NodeCapabilities; 13] = [
    caps(true, true, 3),   // Event
    caps(false, true, 3),  // CustomEvent
    caps(false, true, 4),  // FunctionEntry
    caps(false, true, 2),  // FunctionResult
    caps(true, false, 0),  // CallFunction
    caps(true, false, 1),  // CallParentFunction
    caps(true, false, 0),  // VariableGet
    caps(true, false, 0),  // VariableSet
    caps(true, false, 1),  // MacroInstance
    caps(false, true, 4),  // Tunnel
    caps(false, true, 3),  // Timeline
    caps(true, false, 0),  // MakeStruct
    caps(false, false, 0), // Generic
];

impl NodeTag {
    pub const fn capabilities(self) -> NodeCapabilities {
        NODE_CAPABILITIES[self as usize]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub pins: Vec<Pin>,
    #[serde(default)]
    pub position: Position,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            pins: Vec::new(),
            position: Position::default(),
        }
    }

    pub fn with_pins(mut self, pins: Vec<Pin>) -> Self {
        self.pins = pins;
        self
    }

    pub fn event(id: impl Into<String>, event_reference: MemberReference, function: &Function) -> Self {
        Self::new(id, NodeKind::Event { event_reference }).with_pins(event_pins(&function.inputs))
    }

    pub fn custom_event(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, NodeKind::CustomEvent { name: name.into() }).with_pins(event_pins(&[]))
    }

    pub fn call_function(id: impl Into<String>, function: MemberReference, signature: &Function) -> Self {
        Self::new(id, NodeKind::CallFunction { function }).with_pins(call_pins(signature))
    }

    pub fn call_parent(id: impl Into<String>, function: MemberReference, signature: &Function) -> Self {
        Self::new(id, NodeKind::CallParentFunction { function }).with_pins(call_pins(signature))
    }

    pub fn variable_get(id: impl Into<String>, variable: MemberReference, ty: PinType) -> Self {
        Self::new(id, NodeKind::VariableGet { variable }).with_pins(variable_get_pins(ty))
    }

    pub fn variable_set(id: impl Into<String>, variable: MemberReference, ty: PinType) -> Self {
        Self::new(id, NodeKind::VariableSet { variable }).with_pins(variable_set_pins(ty))
    }

    pub fn generic(id: impl Into<String>, node_type: impl Into<String>, pins: Vec<Pin>) -> Self {
        Self::new(
            id,
            NodeKind::Generic {
                node_type: node_type.into(),
            },
        )
        .with_pins(pins)
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    pub fn capabilities(&self) -> NodeCapabilities {
        self.tag().capabilities()
    }

    pub fn find_pin(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// Variable reference held by a get/set node
    pub fn variable_reference(&self) -> Option<&MemberReference> {
        match &self.kind {
            NodeKind::VariableGet { variable } | NodeKind::VariableSet { variable } => Some(variable),
            _ => None,
        }
    }

    pub fn variable_reference_mut(&mut self) -> Option<&mut MemberReference> {
        match &mut self.kind {
            NodeKind::VariableGet { variable } | NodeKind::VariableSet { variable } => Some(variable),
            _ => None,
        }
    }

    /// Function reference held by call, parent-call, event and entry nodes
    pub fn function_reference(&self) -> Option<&MemberReference> {
        match &self.kind {
            NodeKind::CallFunction { function } | NodeKind::CallParentFunction { function } => {
                Some(function)
            }
            NodeKind::Event { event_reference } => Some(event_reference),
            NodeKind::FunctionEntry { signature } => Some(signature),
            _ => None,
        }
    }

    pub fn function_reference_mut(&mut self) -> Option<&mut MemberReference> {
        match &mut self.kind {
            NodeKind::CallFunction { function } | NodeKind::CallParentFunction { function } => {
                Some(function)
            }
            NodeKind::Event { event_reference } => Some(event_reference),
            NodeKind::FunctionEntry { signature } => Some(signature),
            _ => None,
        }
    }

    /// Whether this is a get/set of the named variable in the given scope.
    ///
    /// `function` selects local scope; `None` matches member (self) variables.
    pub fn references_variable(&self, name: &str, function: Option<&str>) -> bool {
        let Some(reference) = self.variable_reference() else {
            return false;
        };
        if reference.member_name != name {
            return false;
        }
        match (&reference.parent, function) {
            (crate::MemberParent::SelfContext, None) => true,
            (crate::MemberParent::LocalScope { function: scope }, Some(f)) => scope == f,
            _ => false,
        }
    }

    /// Classes named explicitly by this node (not through self context)
    pub fn referenced_classes(&self) -> Vec<ClassHandle> {
        let mut out: Vec<ClassHandle> = self
            .function_reference()
            .into_iter()
            .chain(self.variable_reference())
            .filter_map(|r| r.parent_class())
            .collect();
        out.dedup();
        out
    }

    /// Struct type names this node depends on
    pub fn referenced_structs(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .pins
            .iter()
            .filter_map(|p| p.pin_type.struct_name().map(str::to_string))
            .collect();
        if let NodeKind::MakeStruct { struct_name } = &self.kind {
            out.push(struct_name.clone());
        }
        out.sort();
        out.dedup();
        out
    }

    /// Name under which this node declares an event on the class, if any
    pub fn declared_event_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Event { event_reference } => Some(&event_reference.member_name),
            NodeKind::CustomEvent { name } => Some(name),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pin Layouts
// ─────────────────────────────────────────────────────────────────────────────

/// Event and entry nodes expose the function's inputs as outputs
pub fn event_pins(inputs: &[FunctionParam]) -> Vec<Pin> {
    std::iter::once(Pin::exec_out(PN_THEN))
        .chain(inputs.iter().map(|p| Pin::data_out(&p.name, p.param_type.clone())))
        .collect()
}

pub fn result_pins(outputs: &[FunctionParam]) -> Vec<Pin> {
    std::iter::once(Pin::exec_in())
        .chain(outputs.iter().map(|p| Pin::data_in(&p.name, p.param_type.clone())))
        .collect()
}

pub fn call_pins(function: &Function) -> Vec<Pin> {
    let mut pins = Vec::new();
    if !function.flags.pure {
        pins.push(Pin::exec_in());
        pins.push(Pin::exec_out(PN_THEN));
    }
    pins.extend(
        function
            .inputs
            .iter()
            .map(|p| Pin::data_in(&p.name, p.param_type.clone())),
    );
    pins.extend(
        function
            .outputs
            .iter()
            .map(|p| Pin::data_out(&p.name, p.param_type.clone())),
    );
    pins
}

pub fn variable_get_pins(ty: PinType) -> Vec<Pin> {
    vec![Pin::data_out(PN_VALUE, ty)]
}

pub fn variable_set_pins(ty: PinType) -> Vec<Pin> {
    vec![
        Pin::exec_in(),
        Pin::exec_out(PN_THEN),
        Pin::data_in(PN_VALUE, ty),
    ]
}

pub fn tunnel_pins(is_entry: bool, params: &[FunctionParam]) -> Vec<Pin> {
    if is_entry {
        event_pins(params)
    } else {
        result_pins(params)
    }
}

/// A macro instance mirrors the macro's tunnels: what the entry tunnel emits
/// the instance takes in, what the exit tunnel takes in the instance emits
pub fn macro_instance_pins(entry: &[Pin], exit: &[Pin]) -> Vec<Pin> {
    entry
        .iter()
        .chain(exit)
        .map(|pin| Pin {
            direction: match pin.direction {
                PinDirection::Input => PinDirection::Output,
                PinDirection::Output => PinDirection::Input,
            },
            ..pin.clone()
        })
        .collect()
}

pub fn timeline_pins() -> Vec<Pin> {
    vec![
        Pin {
            name: "play".to_string(),
            ..Pin::exec_in()
        },
        Pin::exec_out("update"),
        Pin::exec_out("finished"),
        Pin::data_out("alpha", PinType::Real),
    ]
}
