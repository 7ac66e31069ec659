//! Member reference resolution
//!
//! Resolves a [`MemberReference`] against the live class hierarchy. Stored
//! parent classes are redirected to their most up-to-date generation first,
//! guids win over names, and the field redirect table is consulted before a
//! lookup is declared unresolved. A resolution whose owner or name differs from
//! what the reference stores is flagged `stale` so the caller can repair it.

use blueprint_types::{
    Blueprint, ClassHandle, ClassKind, ClassRegistry, Function, MemberParent, MemberReference,
    PinType,
};

use crate::{EditorError, Result};

/// What a resolution is checked against
pub struct ResolveContext<'a> {
    pub classes: &'a ClassRegistry,
    pub blueprint: &'a Blueprint,
    /// The class standing in for `self`; skeleton while editing, generated
    /// class at final compile time
    pub self_class: ClassHandle,
}

impl<'a> ResolveContext<'a> {
    /// Resolve against the Blueprint's skeleton class, or its parent when no
    /// skeleton exists yet
    pub fn for_blueprint(classes: &'a ClassRegistry, blueprint: &'a Blueprint) -> Self {
        let self_class = blueprint
            .skeleton_class
            .or(blueprint.generated_class)
            .unwrap_or(blueprint.parent_class);
        Self {
            classes,
            blueprint,
            self_class: classes.most_up_to_date(self_class),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyResolution {
    pub owner: ClassHandle,
    pub name: String,
    pub pin_type: PinType,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResolution {
    pub owner: ClassHandle,
    pub function: Function,
    pub stale: bool,
}

pub fn resolve_variable(cx: &ResolveContext<'_>, reference: &MemberReference) -> Result<PropertyResolution> {
    let unresolved = || EditorError::ReferenceUnresolved(reference.to_string());

    match &reference.parent {
        MemberParent::LocalScope { function } => {
            let graph = cx.blueprint.find_graph(function).ok_or_else(unresolved)?;
            let by_guid = reference
                .member_guid
                .and_then(|guid| graph.local_variables.iter().find(|v| v.guid == guid));
            let var = by_guid
                .or_else(|| graph.find_local_variable(&reference.member_name))
                .ok_or_else(unresolved)?;
            Ok(PropertyResolution {
                owner: cx.self_class,
                name: var.name.clone(),
                pin_type: var.var_type.clone(),
                stale: var.name != reference.member_name,
            })
        }
        MemberParent::SelfContext => {
            // Variables declared on this Blueprint are authoritative even
            // before the skeleton class has picked them up
            let own = reference
                .member_guid
                .and_then(|guid| cx.blueprint.find_variable_by_guid(guid))
                .or_else(|| cx.blueprint.find_variable(&reference.member_name));
            if let Some(var) = own {
                return Ok(PropertyResolution {
                    owner: cx.self_class,
                    name: var.name.clone(),
                    pin_type: var.var_type.clone(),
                    stale: var.name != reference.member_name,
                });
            }
            find_property_in(cx.classes, cx.self_class, reference).ok_or_else(unresolved)
        }
        MemberParent::Class { class } => {
            let current = cx.classes.most_up_to_date(*class);
            let mut resolution =
                find_property_in(cx.classes, layout_class(cx.classes, current), reference).ok_or_else(unresolved)?;
            resolution.owner = authoritative_class(cx.classes, resolution.owner);
            resolution.stale |= current != *class || !resolution.owner.same_class(class);
            Ok(resolution)
        }
    }
}

fn find_property_in(
    classes: &ClassRegistry,
    class: ClassHandle,
    reference: &MemberReference,
) -> Option<PropertyResolution> {
    let found = reference
        .member_guid
        .and_then(|guid| classes.find_property_by_guid(class, guid))
        .or_else(|| classes.find_property(class, &reference.member_name))
        .or_else(|| {
            let renamed = remapped_name(classes, class, &reference.member_name)?;
            classes.find_property(class, &renamed)
        })?;
    let (owner, property) = found;
    Some(PropertyResolution {
        owner,
        name: property.name.clone(),
        pin_type: property.pin_type.clone(),
        stale: property.name != reference.member_name,
    })
}

pub fn resolve_function(cx: &ResolveContext<'_>, reference: &MemberReference) -> Result<FunctionResolution> {
    let unresolved = || EditorError::ReferenceUnresolved(reference.to_string());

    match &reference.parent {
        MemberParent::LocalScope { .. } => Err(unresolved()),
        MemberParent::SelfContext => {
            let own_functions = cx
                .blueprint
                .function_graphs
                .iter()
                .chain(cx.blueprint.implemented_interfaces.iter().flat_map(|d| &d.graphs));
            let by_guid = reference
                .member_guid
                .and_then(|guid| own_functions.clone().find(|g| g.guid == guid));
            if let Some(graph) = by_guid.or_else(|| own_functions.clone().find(|g| g.name == reference.member_name)) {
                return Ok(FunctionResolution {
                    owner: cx.self_class,
                    stale: graph.name != reference.member_name,
                    function: graph.to_function(),
                });
            }
            find_function_in(cx.classes, cx.self_class, reference).ok_or_else(unresolved)
        }
        MemberParent::Class { class } => {
            let current = cx.classes.most_up_to_date(*class);
            let mut resolution =
                find_function_in(cx.classes, layout_class(cx.classes, current), reference).ok_or_else(unresolved)?;
            resolution.owner = authoritative_class(cx.classes, resolution.owner);
            resolution.stale |= current != *class || !resolution.owner.same_class(class);
            Ok(resolution)
        }
    }
}

fn find_function_in(
    classes: &ClassRegistry,
    class: ClassHandle,
    reference: &MemberReference,
) -> Option<FunctionResolution> {
    let (owner, function) = reference
        .member_guid
        .and_then(|guid| classes.find_function_by_guid(class, guid))
        .or_else(|| classes.find_function(class, &reference.member_name))
        .or_else(|| {
            let renamed = remapped_name(classes, class, &reference.member_name)?;
            classes.find_function(class, &renamed)
        })?;
    Some(FunctionResolution {
        owner,
        stale: function.name != reference.member_name,
        function: function.clone(),
    })
}

/// Where to look up the members of a class. A Blueprint-generated class lags
/// behind its skeleton until the next full compile.
pub fn layout_class(classes: &ClassRegistry, class: ClassHandle) -> ClassHandle {
    let class = classes.most_up_to_date(class);
    match classes.resolve(class) {
        Some(c) if c.kind == ClassKind::Generated => {
            classes.find_by_name(&format!("SKEL_{}", c.name)).unwrap_or(class)
        }
        _ => class,
    }
}

/// The class a reference should store for an owner found through
/// [`layout_class`]. Skeletons never leak into stored references.
pub fn authoritative_class(classes: &ClassRegistry, class: ClassHandle) -> ClassHandle {
    let class = classes.most_up_to_date(class);
    classes
        .resolve(class)
        .filter(|c| c.kind == ClassKind::Skeleton)
        .and_then(|c| c.name.strip_prefix("SKEL_"))
        .and_then(|name| classes.find_by_name(name))
        .unwrap_or(class)
}

/// First redirect registered for `name` anywhere along the class chain
fn remapped_name(classes: &ClassRegistry, class: ClassHandle, name: &str) -> Option<String> {
    classes.super_chain(class).into_iter().find_map(|h| {
        let class_name = classes.name_of(h)?;
        classes.find_remapped_field(class_name, name)
    })
}

/// Point a reference at what it resolved to. Returns true if anything changed.
pub fn repair_reference(
    classes: &ClassRegistry,
    reference: &mut MemberReference,
    owner: ClassHandle,
    resolved_name: &str,
) -> bool {
    let mut changed = false;
    if reference.member_name != resolved_name {
        reference.member_name = resolved_name.to_string();
        changed = true;
    }
    if let Some(stored) = reference.parent_class() {
        let current = classes.most_up_to_date(owner);
        if stored != current {
            reference.set_parent_class(current);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::{BlueprintId, Class, Graph, Property, VariableDescription};
    use uuid::Uuid;

    fn fixture() -> (ClassRegistry, Blueprint, ClassHandle) {
        let mut classes = ClassRegistry::new();
        let actor = classes
            .register(
                Class::native("Actor", None)
                    .with_property(Property::new("Tags", PinType::Name))
                    .with_function(Function::overridable("ReceiveTick").with_input("DeltaSeconds", PinType::Real)),
            )
            .unwrap();
        let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
        bp.new_variables.push(VariableDescription::new("Health", PinType::Real));
        (classes, bp, actor)
    }

    #[test]
    fn test_guid_wins_over_name() {
        let (classes, mut bp, _) = fixture();
        let guid = bp.new_variables[0].guid;
        bp.new_variables[0].name = "Vitality".into();

        let cx = ResolveContext::for_blueprint(&classes, &bp);
        let resolved = resolve_variable(&cx, &MemberReference::self_member("Health", Some(guid))).unwrap();
        assert_eq!(resolved.name, "Vitality");
        assert!(resolved.stale);
    }

    #[test]
    fn test_inherited_and_missing_members() {
        let (classes, bp, actor) = fixture();
        let cx = ResolveContext::for_blueprint(&classes, &bp);

        let tags = resolve_variable(&cx, &MemberReference::self_member("Tags", None)).unwrap();
        assert_eq!(tags.owner, actor);
        assert!(!tags.stale);

        let missing = resolve_variable(&cx, &MemberReference::self_member("Armor", None));
        assert!(matches!(missing, Err(EditorError::ReferenceUnresolved(_))));
    }

    #[test]
    fn test_superseded_class_is_redirected() {
        let (mut classes, bp, actor) = fixture();
        let old = classes.install(Class::native("Helper_C", Some(actor)).with_function(Function::new("Assist")));
        let new = classes.install(Class::native("Helper_C", Some(actor)).with_function(Function::new("Assist")));

        let cx = ResolveContext::for_blueprint(&classes, &bp);
        let mut reference = MemberReference::external(old, "Assist");
        let resolved = resolve_function(&cx, &reference).unwrap();
        assert_eq!(resolved.owner, new);
        assert!(resolved.stale);

        assert!(repair_reference(&classes, &mut reference, resolved.owner, &resolved.function.name));
        assert_eq!(reference.parent_class(), Some(new));
    }

    #[test]
    fn test_field_redirect_consulted() {
        let (mut classes, bp, actor) = fixture();
        let helper = classes.install(Class::native("Helper_C", Some(actor)).with_property(Property::new("HitPoints", PinType::Integer)));
        classes.add_field_redirect("Helper_C", "Health", "HitPoints");

        let cx = ResolveContext::for_blueprint(&classes, &bp);
        let resolved = resolve_variable(&cx, &MemberReference::external(helper, "Health")).unwrap();
        assert_eq!(resolved.name, "HitPoints");
        assert!(resolved.stale);
    }

    #[test]
    fn test_local_scope() {
        let (classes, mut bp, _) = fixture();
        let mut graph = Graph::new_function("Tick");
        let local = VariableDescription::new("Counter", PinType::Integer);
        let guid = local.guid;
        graph.local_variables.push(local);
        bp.function_graphs.push(graph);

        let cx = ResolveContext::for_blueprint(&classes, &bp);
        let resolved = resolve_variable(&cx, &MemberReference::local("Tick", "Counter", guid)).unwrap();
        assert_eq!(resolved.pin_type, PinType::Integer);
        assert!(resolve_variable(&cx, &MemberReference::local("Tick", "Other", Uuid::new_v4())).is_err());
        assert!(resolve_function(&cx, &MemberReference::local("Tick", "Counter", guid)).is_err());
    }

    #[test]
    fn test_self_function_from_graph() {
        let (classes, mut bp, _) = fixture();
        bp.function_graphs.push(Graph::new_function("Open"));
        let cx = ResolveContext::for_blueprint(&classes, &bp);
        assert!(resolve_function(&cx, &MemberReference::self_member("Open", None)).is_ok());
        assert!(resolve_function(&cx, &MemberReference::self_member("ReceiveTick", None)).is_ok());
    }

    #[test]
    fn test_self_function_guid_beats_newer_graph_of_old_name() {
        let (classes, mut bp, _) = fixture();
        let renamed = Graph::new_function("OpenDoor");
        let guid = renamed.guid;
        bp.function_graphs.push(renamed);
        bp.function_graphs.push(Graph::new_function("Open"));

        let cx = ResolveContext::for_blueprint(&classes, &bp);
        let resolved = resolve_function(&cx, &MemberReference::self_member("Open", Some(guid))).unwrap();
        assert_eq!(resolved.function.name, "OpenDoor");
        assert!(resolved.stale);

        let by_name = resolve_function(&cx, &MemberReference::self_member("Open", None)).unwrap();
        assert_eq!(by_name.function.name, "Open");
    }

    #[test]
    fn test_explicit_reference_sees_skeleton_layout() {
        let (mut classes, bp, actor) = fixture();
        let mut generated = Class::native("BP_Base_C", Some(actor));
        generated.kind = ClassKind::Generated;
        let generated = classes.install(generated);
        let mut skeleton = Class::native("SKEL_BP_Base_C", Some(actor)).with_property(Property::new("Score", PinType::Integer));
        skeleton.kind = ClassKind::Skeleton;
        let skeleton = classes.install(skeleton);

        assert_eq!(layout_class(&classes, generated), skeleton);
        assert_eq!(authoritative_class(&classes, skeleton), generated);

        let cx = ResolveContext::for_blueprint(&classes, &bp);
        let resolved = resolve_variable(&cx, &MemberReference::external(generated, "Score")).unwrap();
        assert_eq!(resolved.owner, generated);
        assert!(!resolved.stale);
    }
}
