// Compiler Results Log - User-visible diagnostics
//
// Every message is also mirrored to tracing at the matching level so headless
// runs see the same diagnostics as an editor UI would.

use blueprint_types::BlueprintId;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Location of a node, for click-to-navigate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub blueprint: BlueprintId,
    pub graph: String,
    pub node: String,
}

impl NodeRef {
    pub fn new(blueprint: BlueprintId, graph: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            blueprint,
            graph: graph.into(),
            node: node.into(),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.blueprint, self.graph, self.node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    pub severity: Severity,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<BlueprintId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRef>,
}

#[derive(Debug, Default)]
pub struct CompilerResultsLog {
    messages: Vec<LogMessage>,
    num_errors: usize,
    num_warnings: usize,
}

impl CompilerResultsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, blueprint: BlueprintId, text: impl Into<String>) {
        self.push(Severity::Note, Some(blueprint), None, text.into());
    }

    pub fn warning(&mut self, blueprint: BlueprintId, text: impl Into<String>) {
        self.push(Severity::Warning, Some(blueprint), None, text.into());
    }

    pub fn error(&mut self, blueprint: BlueprintId, text: impl Into<String>) {
        self.push(Severity::Error, Some(blueprint), None, text.into());
    }

    /// Warning attached to a specific node
    pub fn warning_at(&mut self, node: NodeRef, text: impl Into<String>) {
        self.push(Severity::Warning, Some(node.blueprint), Some(node), text.into());
    }

    pub fn error_at(&mut self, node: NodeRef, text: impl Into<String>) {
        self.push(Severity::Error, Some(node.blueprint), Some(node), text.into());
    }

    fn push(&mut self, severity: Severity, blueprint: Option<BlueprintId>, node: Option<NodeRef>, text: String) {
        let location = node
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| blueprint.map(|b| b.to_string()))
            .unwrap_or_default();
        match severity {
            Severity::Note => info!(%location, "{}", text),
            Severity::Warning => {
                self.num_warnings += 1;
                warn!(%location, "{}", text)
            }
            Severity::Error => {
                self.num_errors += 1;
                error!(%location, "{}", text)
            }
        }
        self.messages.push(LogMessage {
            severity,
            text,
            blueprint,
            node,
        });
    }

    pub fn error_count(&self) -> usize {
        self.num_errors
    }

    pub fn warning_count(&self) -> usize {
        self.num_warnings
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    /// Messages concerning one Blueprint
    pub fn messages_for(&self, blueprint: BlueprintId) -> impl Iterator<Item = &LogMessage> {
        self.messages
            .iter()
            .filter(move |m| m.blueprint == Some(blueprint))
    }

    /// Take every message, resetting the counters
    pub fn drain(&mut self) -> Vec<LogMessage> {
        self.num_errors = 0;
        self.num_warnings = 0;
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_drain() {
        let mut log = CompilerResultsLog::new();
        let bp = BlueprintId(1);
        log.note(bp, "compiled");
        log.warning_at(NodeRef::new(bp, "EventGraph", "node_3"), "now a custom event");
        log.error(BlueprintId(2), "name collision");

        assert_eq!(log.error_count(), 1);
        assert_eq!(log.warning_count(), 1);
        assert_eq!(log.messages_for(bp).count(), 2);
        assert_eq!(
            log.messages()[1].node.as_ref().map(ToString::to_string).as_deref(),
            Some("bp#1/EventGraph/node_3")
        );

        let drained = log.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(log.error_count(), 0);
        assert!(log.messages().is_empty());
    }
}
