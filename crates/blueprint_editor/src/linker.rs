// Linker - Export table of a loaded Blueprint package
//
// Other packages refer to a Blueprint's class and default object by export
// index. Regeneration replaces those objects, so the new versions are patched
// into the slots the old ones occupied instead of being appended.

use blueprint_types::{Blueprint, BlueprintId, ClassHandle};
use tracing::debug;

pub const CONSTRUCTION_SCRIPT_EXPORT: &str = "SimpleConstructionScript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportObject {
    Blueprint(BlueprintId),
    Class(ClassHandle),
    DefaultObject(ClassHandle),
    ConstructionScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectExport {
    pub object_name: String,
    pub object: ExportObject,
    /// Still waiting to be preloaded
    pub needs_load: bool,
}

#[derive(Debug, Default)]
pub struct Linker {
    exports: Vec<ObjectExport>,
    preloads: usize,
}

/// Name of the default object export for a class
pub fn default_object_name(class_name: &str) -> String {
    format!("Default__{}", class_name)
}

impl Linker {
    /// Export table for a Blueprint as it was saved
    pub fn new_for_blueprint(blueprint: &Blueprint) -> Self {
        let mut exports = vec![ObjectExport {
            object_name: blueprint.name.clone(),
            object: ExportObject::Blueprint(blueprint.id),
            needs_load: true,
        }];
        if let Some(class) = blueprint.generated_class {
            let class_name = blueprint.generated_class_name();
            exports.push(ObjectExport {
                object_name: default_object_name(&class_name),
                object: ExportObject::DefaultObject(class),
                needs_load: true,
            });
            exports.push(ObjectExport {
                object_name: class_name,
                object: ExportObject::Class(class),
                needs_load: true,
            });
        }
        if !blueprint.components.is_empty() {
            exports.push(ObjectExport {
                object_name: CONSTRUCTION_SCRIPT_EXPORT.to_string(),
                object: ExportObject::ConstructionScript,
                needs_load: true,
            });
        }
        Self { exports, preloads: 0 }
    }

    /// Load an export if it still needs it. Returns true if it was loaded now.
    pub fn preload(&mut self, index: usize) -> bool {
        match self.exports.get_mut(index) {
            Some(export) if export.needs_load => {
                export.needs_load = false;
                self.preloads += 1;
                debug!(export = %export.object_name, "preloaded");
                true
            }
            _ => false,
        }
    }

    pub fn preload_by_name(&mut self, object_name: &str) -> bool {
        match self.find_export_index(object_name) {
            Some(index) => self.preload(index),
            None => false,
        }
    }

    /// Total exports actually loaded so far
    pub fn preload_count(&self) -> usize {
        self.preloads
    }

    pub fn find_export_index(&self, object_name: &str) -> Option<usize> {
        self.exports.iter().position(|e| e.object_name == object_name)
    }

    /// Put a regenerated object into the slot its predecessor occupied, or
    /// append a new export if there was none. Returns the slot index.
    pub fn patch_new_object_into_export(&mut self, object_name: &str, object: ExportObject) -> usize {
        let export = ObjectExport {
            object_name: object_name.to_string(),
            object,
            needs_load: false,
        };
        match self.find_export_index(object_name) {
            Some(index) => {
                self.exports[index] = export;
                index
            }
            None => {
                self.exports.push(export);
                self.exports.len() - 1
            }
        }
    }

    pub fn object(&self, index: usize) -> Option<ExportObject> {
        self.exports.get(index).map(|e| e.object)
    }

    pub fn exports(&self) -> &[ObjectExport] {
        &self.exports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::ComponentTemplate;

    fn saved_blueprint() -> Blueprint {
        let mut bp = Blueprint::new(BlueprintId(3), "BP_Lamp", ClassHandle::new(0, 0));
        bp.generated_class = Some(ClassHandle::new(4, 2));
        bp.components.push(ComponentTemplate::new("Bulb", "PointLightComponent"));
        bp
    }

    #[test]
    fn test_preload_is_idempotent() {
        let mut linker = Linker::new_for_blueprint(&saved_blueprint());
        assert_eq!(linker.exports().len(), 4);
        assert!(linker.preload_by_name("BP_Lamp"));
        assert!(!linker.preload_by_name("BP_Lamp"));
        assert!(linker.preload_by_name(CONSTRUCTION_SCRIPT_EXPORT));
        assert!(!linker.preload_by_name("Missing"));
        assert_eq!(linker.preload_count(), 2);
    }

    #[test]
    fn test_patch_reuses_export_slot() {
        let mut linker = Linker::new_for_blueprint(&saved_blueprint());
        let index = linker.find_export_index("BP_Lamp_C").unwrap();

        let patched = linker.patch_new_object_into_export("BP_Lamp_C", ExportObject::Class(ClassHandle::new(4, 3)));
        assert_eq!(patched, index);
        assert_eq!(linker.object(index), Some(ExportObject::Class(ClassHandle::new(4, 3))));
        assert!(!linker.exports()[index].needs_load);

        let appended = linker.patch_new_object_into_export("Extra", ExportObject::ConstructionScript);
        assert_eq!(appended, 4);
    }
}
