//! Blueprint asset files (blueprints/*.bp.json)
//!
//! Class handles are only meaningful inside one registry, so an asset stores
//! the names of the classes it uses in an import table and every handle in
//! the Blueprint is written as `{ slot: <import index>, generation: 0 }`.

use serde::{Deserialize, Serialize};

use blueprint_editor::blueprint_types::{Blueprint, ClassHandle, ClassRegistry};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Import {0} is missing from the import table")]
    MissingImport(u32),

    #[error("Imported class not found: {0}")]
    UnresolvedImport(String),

    #[error("Blueprint {blueprint} refers to an unregistered class {class}")]
    UnknownClass { blueprint: String, class: ClassHandle },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintAsset {
    #[serde(default)]
    pub imports: Vec<String>,
    pub blueprint: Blueprint,
}

impl BlueprintAsset {
    /// Generated class name the asset will produce when loaded
    pub fn generated_class_name(&self) -> String {
        self.blueprint.generated_class_name()
    }

    /// Bind the import table against `classes`, producing a Blueprint whose
    /// handles point into that registry
    pub fn resolve(self, classes: &ClassRegistry) -> Result<Blueprint, AssetError> {
        let handles = self
            .imports
            .iter()
            .map(|name| {
                classes
                    .find_by_name(name)
                    .ok_or_else(|| AssetError::UnresolvedImport(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut blueprint = self.blueprint;
        blueprint.skeleton_class = None;
        blueprint.generated_class = None;

        let mut missing = None;
        blueprint.visit_classes_mut(&mut |h| match handles.get(h.slot as usize) {
            Some(&resolved) => *h = resolved,
            None => {
                missing.get_or_insert(h.slot);
            }
        });
        match missing {
            Some(index) => Err(AssetError::MissingImport(index)),
            None => Ok(blueprint),
        }
    }

    /// Write a loaded Blueprint back into asset form
    pub fn from_blueprint(blueprint: &Blueprint, classes: &ClassRegistry) -> Result<Self, AssetError> {
        let mut blueprint = blueprint.clone();
        blueprint.skeleton_class = None;
        blueprint.generated_class = None;

        let mut imports: Vec<String> = Vec::new();
        let mut unknown = None;
        blueprint.visit_classes_mut(&mut |h| {
            let Some(name) = classes.name_of(classes.most_up_to_date(*h)) else {
                unknown.get_or_insert(*h);
                return;
            };
            let index = match imports.iter().position(|i| i == name) {
                Some(index) => index,
                None => {
                    imports.push(name.to_string());
                    imports.len() - 1
                }
            };
            *h = ClassHandle::new(index as u32, 0);
        });

        if let Some(class) = unknown {
            return Err(AssetError::UnknownClass {
                blueprint: blueprint.name,
                class,
            });
        }
        Ok(Self { imports, blueprint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_editor::blueprint_types::{BlueprintId, Class, InterfaceDescription};

    fn registry() -> (ClassRegistry, ClassHandle, ClassHandle) {
        let mut classes = ClassRegistry::new();
        let actor = classes.register(Class::native("Actor", None)).unwrap();
        let usable = classes.register(Class::interface("Usable")).unwrap();
        (classes, actor, usable)
    }

    #[test]
    fn test_imports_are_bound_by_name() {
        let (classes, actor, usable) = registry();
        let mut blueprint = Blueprint::new(BlueprintId(1), "BP_Door", ClassHandle::new(1, 0));
        blueprint.implemented_interfaces.push(InterfaceDescription {
            interface: ClassHandle::new(0, 0),
            graphs: Vec::new(),
        });
        blueprint.generated_class = Some(ClassHandle::new(9, 9));
        let asset = BlueprintAsset {
            imports: vec!["Usable".into(), "Actor".into()],
            blueprint,
        };

        let resolved = asset.resolve(&classes).unwrap();
        assert_eq!(resolved.parent_class, actor);
        assert_eq!(resolved.implemented_interfaces[0].interface, usable);
        assert!(resolved.generated_class.is_none());
    }

    #[test]
    fn test_unknown_import_is_reported() {
        let (classes, _, _) = registry();
        let asset = BlueprintAsset {
            imports: vec!["Pawn".into()],
            blueprint: Blueprint::new(BlueprintId(1), "BP_Guard", ClassHandle::new(0, 0)),
        };
        assert!(matches!(asset.resolve(&classes), Err(AssetError::UnresolvedImport(name)) if name == "Pawn"));

        let asset = BlueprintAsset {
            imports: Vec::new(),
            blueprint: Blueprint::new(BlueprintId(1), "BP_Guard", ClassHandle::new(0, 0)),
        };
        assert!(matches!(asset.resolve(&classes), Err(AssetError::MissingImport(0))));
    }

    #[test]
    fn test_from_blueprint_builds_import_table() {
        let (classes, actor, usable) = registry();
        let mut blueprint = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        blueprint.implemented_interfaces.push(InterfaceDescription {
            interface: usable,
            graphs: Vec::new(),
        });

        let asset = BlueprintAsset::from_blueprint(&blueprint, &classes).unwrap();
        assert_eq!(asset.imports, vec!["Actor".to_string(), "Usable".to_string()]);
        assert_eq!(asset.blueprint.parent_class, ClassHandle::new(0, 0));
        assert_eq!(asset.blueprint.implemented_interfaces[0].interface, ClassHandle::new(1, 0));

        let restored = asset.resolve(&classes).unwrap();
        assert_eq!(restored.parent_class, actor);
    }
}
