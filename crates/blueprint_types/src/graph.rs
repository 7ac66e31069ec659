// Graphs - Function, macro and event-graph bodies
//
// A graph owns its nodes and the connections between their pins. Function
// graphs always carry an entry node and a result node whose pins mirror the
// graph's signature; macro graphs use tunnel nodes instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Connection, Function, FunctionParam, MemberReference, Node, NodeKind, NodeTag, Pin,
    VariableDescription, event_pins, result_pins, tunnel_pins,
};

pub const ENTRY_NODE_ID: &str = "entry";
pub const RESULT_NODE_ID: &str = "result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Function,
    Macro,
    /// Event graph page
    Ubergraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub guid: Uuid,
    pub kind: GraphKind,
    /// Guid of the interface function this graph implements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_guid: Option<Uuid>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub inputs: Vec<FunctionParam>,
    #[serde(default)]
    pub outputs: Vec<FunctionParam>,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub local_variables: Vec<VariableDescription>,
    #[serde(default)]
    next_node_index: u32,
}

impl Graph {
    fn empty(name: impl Into<String>, kind: GraphKind) -> Self {
        Self {
            name: name.into(),
            guid: Uuid::new_v4(),
            kind,
            interface_guid: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            is_const: false,
            local_variables: Vec::new(),
            next_node_index: 0,
        }
    }

    /// Function graph with entry and result nodes and an empty signature
    pub fn new_function(name: impl Into<String>) -> Self {
        let mut graph = Self::empty(name, GraphKind::Function);
        let signature = MemberReference::self_member(graph.name.clone(), Some(graph.guid));
        graph
            .nodes
            .push(Node::new(ENTRY_NODE_ID, NodeKind::FunctionEntry { signature }).with_pins(event_pins(&[])));
        graph
            .nodes
            .push(Node::new(RESULT_NODE_ID, NodeKind::FunctionResult).with_pins(result_pins(&[])));
        graph
    }

    /// Function graph whose signature matches `function`
    pub fn new_function_matching(function: &Function) -> Self {
        let mut graph = Self::new_function(function.name.clone());
        graph.set_signature(function);
        graph
    }

    pub fn new_macro(name: impl Into<String>) -> Self {
        let mut graph = Self::empty(name, GraphKind::Macro);
        graph.nodes.push(
            Node::new("inputs", NodeKind::Tunnel { is_entry: true }).with_pins(tunnel_pins(true, &[])),
        );
        graph.nodes.push(
            Node::new("outputs", NodeKind::Tunnel { is_entry: false }).with_pins(tunnel_pins(false, &[])),
        );
        graph
    }

    pub fn new_ubergraph(name: impl Into<String>) -> Self {
        Self::empty(name, GraphKind::Ubergraph)
    }

    /// Copy the parameter lists and constness of `function` onto this graph
    pub fn set_signature(&mut self, function: &Function) {
        self.inputs = function.inputs.clone();
        self.outputs = function.outputs.clone();
        self.is_const = function.flags.is_const;
        let inputs = self.inputs.clone();
        let outputs = self.outputs.clone();
        for node in &mut self.nodes {
            match node.kind {
                NodeKind::FunctionEntry { .. } => node.pins = event_pins(&inputs),
                NodeKind::FunctionResult => node.pins = result_pins(&outputs),
                _ => {}
            }
        }
        self.drop_dangling_connections();
    }

    /// Rename the graph, keeping the entry node's signature in step
    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        let name = self.name.clone();
        for node in &mut self.nodes {
            if let NodeKind::FunctionEntry { signature } = &mut node.kind {
                signature.member_name = name.clone();
            }
        }
    }

    /// Signature of this graph as a reflected function
    pub fn to_function(&self) -> Function {
        let mut function = Function::new(self.name.clone()).with_guid(self.guid);
        function.inputs = self.inputs.clone();
        function.outputs = self.outputs.clone();
        function.flags.is_const = self.is_const;
        function
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────────

    /// Allocate a node id unique within this graph
    pub fn next_node_id(&mut self, prefix: &str) -> String {
        loop {
            let id = format!("{}_{}", prefix, self.next_node_index);
            self.next_node_index += 1;
            if self.get_node(&id).is_none() {
                return id;
            }
        }
    }

    pub fn add_node(&mut self, node: Node) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Remove a node together with every connection touching it
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        self.connections.retain(|c| !c.touches_node(id));
        Some(self.nodes.remove(index))
    }

    pub fn entry_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.tag() == NodeTag::FunctionEntry)
    }

    pub fn nodes_with_tag(&self, tag: NodeTag) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.tag() == tag)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────────

    pub fn connect(&mut self, from_node: &str, from_pin: &str, to_node: &str, to_pin: &str) {
        let conn = Connection::new(from_node, from_pin, to_node, to_pin);
        if !self.connections.contains(&conn) {
            self.connections.push(conn);
        }
    }

    /// (node, pin) pairs fed by the given output pin
    pub fn links_from(&self, node: &str, pin: &str) -> Vec<(String, String)> {
        self.connections
            .iter()
            .filter(|c| c.from_parts() == Some((node, pin)))
            .filter_map(|c| c.to_parts().map(|(n, p)| (n.to_string(), p.to_string())))
            .collect()
    }

    /// (node, pin) pairs feeding the given input pin
    pub fn links_to(&self, node: &str, pin: &str) -> Vec<(String, String)> {
        self.connections
            .iter()
            .filter(|c| c.to_parts() == Some((node, pin)))
            .filter_map(|c| c.from_parts().map(|(n, p)| (n.to_string(), p.to_string())))
            .collect()
    }

    /// Drop every link on a pin. Returns how many were broken.
    pub fn break_pin_links(&mut self, node: &str, pin: &str) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches_pin(node, pin));
        before - self.connections.len()
    }

    /// Remove connections whose endpoints no longer exist
    pub fn drop_dangling_connections(&mut self) -> usize {
        let before = self.connections.len();
        let nodes = &self.nodes;
        let has_pin = |parts: Option<(&str, &str)>| {
            parts.is_some_and(|(n, p)| {
                nodes
                    .iter()
                    .any(|node| node.id == n && node.find_pin(p).is_some())
            })
        };
        self.connections
            .retain(|c| has_pin(c.from_parts()) && has_pin(c.to_parts()));
        before - self.connections.len()
    }

    /// Remove connections whose pin types no longer line up. Run after pins
    /// were rebuilt from a changed signature or variable type.
    pub fn drop_incompatible_connections(&mut self) -> usize {
        let before = self.connections.len();
        let nodes = &self.nodes;
        let pin = |parts: Option<(&str, &str)>| {
            let (node, pin) = parts?;
            nodes.iter().find(|n| n.id == node)?.find_pin(pin)
        };
        self.connections.retain(|c| match (pin(c.from_parts()), pin(c.to_parts())) {
            (Some(from), Some(to)) => from.pin_type.is_compatible_with(&to.pin_type),
            _ => false,
        });
        before - self.connections.len()
    }

    /// Remove a node, first wiring every exec source of its inputs directly to
    /// every exec target of its outputs so downstream flow survives.
    pub fn splice_exec_through(&mut self, id: &str) -> Option<Node> {
        let node = self.get_node(id)?;
        let exec_inputs: Vec<&Pin> = node
            .pins
            .iter()
            .filter(|p| p.is_exec() && p.direction == crate::PinDirection::Input)
            .collect();
        let exec_outputs: Vec<&Pin> = node
            .pins
            .iter()
            .filter(|p| p.is_exec() && p.direction == crate::PinDirection::Output)
            .collect();

        let sources: Vec<(String, String)> = exec_inputs
            .iter()
            .flat_map(|p| self.links_to(id, &p.name))
            .collect();
        let targets: Vec<(String, String)> = exec_outputs
            .iter()
            .flat_map(|p| self.links_from(id, &p.name))
            .collect();

        let removed = self.remove_node(id);
        for (src_node, src_pin) in &sources {
            for (dst_node, dst_pin) in &targets {
                self.connect(src_node, src_pin, dst_node, dst_pin);
            }
        }
        removed
    }

    pub fn find_local_variable(&self, name: &str) -> Option<&VariableDescription> {
        self.local_variables.iter().find(|v| v.name == name)
    }
}
