//! Change notifications broadcast by the editor

use blueprint_types::BlueprintId;

use crate::CompileType;

/// Events broadcast when Blueprints change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlueprintEvent {
    /// A compile pass produced new class generations
    Compiled {
        blueprint: BlueprintId,
        compile_type: CompileType,
    },
    /// The Blueprint changed; sent once any recompile cascade has finished
    Changed(BlueprintId),
    /// The Blueprint and its classes were removed
    Removed(BlueprintId),
}

impl BlueprintEvent {
    /// Get the Blueprint affected by this event
    pub fn blueprint(&self) -> BlueprintId {
        match self {
            BlueprintEvent::Compiled { blueprint, .. } => *blueprint,
            BlueprintEvent::Changed(id) | BlueprintEvent::Removed(id) => *id,
        }
    }
}
