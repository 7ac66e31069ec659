//! End-to-end behaviour of the editing pipeline

use blueprint_editor::blueprint_types::{
    Blueprint, BlueprintId, BlueprintStatus, BlueprintType, Class, ClassHandle, ClassRegistry, Function,
    Graph, MemberReference, Node, NodeKind, PN_EXECUTE, PN_THEN, PN_VALUE, Pin, PinType,
};
use blueprint_editor::{
    AutoConfirm, BlueprintEvent, CompileType, EditorContext, EditorError, EditorSettings, RegenerateOutcome,
    ResolveContext, resolve_variable,
};
use uuid::Uuid;

fn editor() -> (EditorContext, ClassHandle) {
    let mut classes = ClassRegistry::new();
    let object = classes.register(Class::native("Object", None)).unwrap();
    let actor = classes
        .register(
            Class::native("Actor", Some(object))
                .with_function(Function::overridable("ReceiveBeginPlay"))
                .with_function(Function::overridable("ReceiveTick").with_input("DeltaSeconds", PinType::Real)),
        )
        .unwrap();
    (EditorContext::new(classes, EditorSettings::default()), actor)
}

fn generated(editor: &EditorContext, id: BlueprintId) -> ClassHandle {
    editor.blueprint(id).unwrap().generated_class.unwrap()
}

fn compiled(rx: &mut tokio::sync::broadcast::Receiver<BlueprintEvent>) -> Vec<BlueprintId> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            BlueprintEvent::Compiled { blueprint, .. } => Some(blueprint),
            _ => None,
        })
        .collect()
}

#[test]
fn test_regeneration_is_idempotent() {
    let (mut editor, actor) = editor();
    let mut bp = Blueprint::new(BlueprintId(1), "BP_Door", actor);
    bp.ubergraph_pages[0].add_node(Node::custom_event("open", "Open"));
    let id = editor.load_blueprint(bp).unwrap();

    assert_eq!(editor.regenerate_blueprint_class(id).unwrap(), RegenerateOutcome::Compiled);
    let class = generated(&editor, id);
    let status = editor.blueprint(id).unwrap().status;

    assert_eq!(
        editor.regenerate_blueprint_class(id).unwrap(),
        RegenerateOutcome::AlreadyRegenerated
    );
    assert_eq!(generated(&editor, id), class);
    assert_eq!(editor.blueprint(id).unwrap().status, status);
    assert!(!editor.classes().is_stale(class));
}

#[test]
fn test_interface_graphs_match_function_members() {
    let (mut editor, actor) = editor();
    let keep = Uuid::new_v4();
    let dropped = Uuid::new_v4();
    let usable = Class::interface("Usable")
        .with_function(Function::overridable("CanUse").with_output("Ok", PinType::Boolean).with_guid(keep))
        .with_function(Function::overridable("Price").with_output("Cost", PinType::Integer).with_guid(dropped))
        .with_function(Function::overridable("OnFocus"));
    editor.classes_mut().register(usable).unwrap();

    let id = editor.create_blueprint("BP_Shop", actor, BlueprintType::Normal).unwrap();
    editor.implement_new_interface(id, "Usable").unwrap();

    // The interface changes: one member goes away, one is added
    let added = Uuid::new_v4();
    editor.classes_mut().install(
        Class::interface("Usable")
            .with_function(Function::overridable("CanUse").with_output("Ok", PinType::Boolean).with_guid(keep))
            .with_function(Function::overridable("Stock").with_output("Count", PinType::Integer).with_guid(added))
            .with_function(Function::overridable("OnFocus")),
    );
    editor.compile(id, CompileType::Full).unwrap();

    let bp = editor.blueprint(id).unwrap();
    let mut guids: Vec<Uuid> = bp.implemented_interfaces[0]
        .graphs
        .iter()
        .filter_map(|g| g.interface_guid)
        .collect();
    guids.sort();
    let mut expected = vec![keep, added];
    expected.sort();
    assert_eq!(guids, expected);
    assert_eq!(bp.implemented_interfaces[0].graphs.len(), 2);
}

#[test]
fn test_rename_preserves_references_across_children() {
    let (mut editor, actor) = editor();
    let base = editor.create_blueprint("BP_Base", actor, BlueprintType::Normal).unwrap();
    editor.add_member_variable(base, "Health", PinType::Real).unwrap();
    let guid = editor.blueprint(base).unwrap().find_variable("Health").unwrap().guid;
    editor.blueprint_mut(base).unwrap().ubergraph_pages[0].add_node(Node::variable_get(
        "own_get",
        MemberReference::self_member("Health", Some(guid)),
        PinType::Real,
    ));
    editor.compile(base, CompileType::Full).unwrap();

    let child = editor
        .create_blueprint("BP_Child", generated(&editor, base), BlueprintType::Normal)
        .unwrap();
    editor.add_member_variable(child, "Shield", PinType::Real).unwrap();
    {
        let page = &mut editor.blueprint_mut(child).unwrap().ubergraph_pages[0];
        page.add_node(Node::custom_event("hit", "Hit"));
        page.add_node(Node::variable_get("get", MemberReference::self_member("Health", Some(guid)), PinType::Real));
        page.add_node(Node::variable_set("set", MemberReference::self_member("Shield", None), PinType::Real));
        page.connect("hit", PN_THEN, "set", PN_EXECUTE);
        page.connect("get", PN_VALUE, "set", PN_VALUE);
    }
    editor.compile(child, CompileType::Full).unwrap();
    let links_before = editor.blueprint(child).unwrap().ubergraph_pages[0].connections.len();
    let warnings_before = editor.results_log().warning_count();

    editor.rename_member_variable(base, "Health", "Vitality").unwrap();
    editor.compile(base, CompileType::Full).unwrap();
    editor.compile(child, CompileType::Full).unwrap();

    let base_bp = editor.blueprint(base).unwrap();
    let node = base_bp.ubergraph_pages[0].get_node("own_get").unwrap();
    assert_eq!(node.variable_reference().unwrap().member_name, "Vitality");

    let child_bp = editor.blueprint(child).unwrap();
    let cx = ResolveContext::for_blueprint(editor.classes(), child_bp);
    let reference = child_bp.ubergraph_pages[0].get_node("get").unwrap().variable_reference().unwrap();
    let resolved = resolve_variable(&cx, reference).unwrap();
    assert_eq!(resolved.name, "Vitality");
    assert!(!resolved.stale);

    assert_eq!(child_bp.ubergraph_pages[0].connections.len(), links_before);
    assert_eq!(editor.results_log().warning_count(), warnings_before);
    assert_eq!(child_bp.status, BlueprintStatus::UpToDate);
}

#[test]
fn test_cascade_compiles_parents_before_children() {
    let (mut editor, actor) = editor();
    let a = editor.create_blueprint("A", actor, BlueprintType::Normal).unwrap();
    let b = editor.create_blueprint("B", generated(&editor, a), BlueprintType::Normal).unwrap();
    let c = editor.create_blueprint("C", generated(&editor, b), BlueprintType::Normal).unwrap();
    editor.create_blueprint("Unrelated", actor, BlueprintType::Normal).unwrap();

    let mut rx = editor.subscribe();
    editor.add_member_variable(a, "Speed", PinType::Real).unwrap();
    assert_eq!(compiled(&mut rx), vec![a, b, c]);
}

#[test]
fn test_mutual_macro_dependencies_terminate() {
    let (mut editor, actor) = editor();
    let uses = |target: u32| {
        Node::new(
            "use",
            NodeKind::MacroInstance {
                macro_blueprint: BlueprintId(target),
                macro_graph: "Step".into(),
            },
        )
    };
    let mut first = Blueprint::new(BlueprintId(1), "ML_First", actor).with_type(BlueprintType::MacroLibrary);
    first.macro_graphs.push(Graph::new_macro("Step"));
    first.macro_graphs[0].add_node(uses(2));
    let mut second = Blueprint::new(BlueprintId(2), "ML_Second", actor).with_type(BlueprintType::MacroLibrary);
    second.macro_graphs.push(Graph::new_macro("Step"));
    second.macro_graphs[0].add_node(uses(1));

    let first = editor.load_blueprint(first).unwrap();
    let second = editor.load_blueprint(second).unwrap();
    editor.regenerate_blueprint_class(first).unwrap();
    editor.regenerate_blueprint_class(second).unwrap();

    assert!(editor.blueprint(first).unwrap().has_been_regenerated);
    assert!(editor.blueprint(second).unwrap().has_been_regenerated);
}

#[test]
fn test_declined_type_change_changes_nothing() {
    let (editor, actor) = editor();
    let mut editor = editor.with_prompt(AutoConfirm(false));
    let id = editor.create_blueprint("BP_Door", actor, BlueprintType::Normal).unwrap();
    editor.add_member_variable(id, "Open", PinType::Boolean).unwrap();
    editor.blueprint_mut(id).unwrap().ubergraph_pages[0].add_node(Node::variable_get(
        "get_open",
        MemberReference::self_member("Open", None),
        PinType::Boolean,
    ));
    let before = editor.blueprint(id).unwrap().clone();

    let result = editor.change_member_variable_type(id, "Open", PinType::Integer);
    assert!(matches!(result, Err(EditorError::Cancelled)));
    assert_eq!(editor.blueprint(id).unwrap(), &before);
}

#[test]
fn test_suppressed_confirmation_proceeds() {
    let mut classes = ClassRegistry::new();
    let actor = classes.register(Class::native("Actor", None)).unwrap();
    let settings = EditorSettings {
        suppress_type_change_confirmation: true,
        ..EditorSettings::default()
    };
    let mut editor = EditorContext::new(classes, settings).with_prompt(AutoConfirm(false));
    let id = editor.create_blueprint("BP_Door", actor, BlueprintType::Normal).unwrap();
    editor.add_member_variable(id, "Open", PinType::Boolean).unwrap();
    editor.blueprint_mut(id).unwrap().ubergraph_pages[0].add_node(Node::variable_get(
        "get_open",
        MemberReference::self_member("Open", None),
        PinType::Boolean,
    ));

    editor.change_member_variable_type(id, "Open", PinType::Integer).unwrap();
    let bp = editor.blueprint(id).unwrap();
    assert_eq!(bp.find_variable("Open").unwrap().var_type, PinType::Integer);
    let pin = bp.ubergraph_pages[0].get_node("get_open").unwrap().find_pin(PN_VALUE).unwrap();
    assert_eq!(pin.pin_type, PinType::Integer);
}

#[test]
fn test_implementers_follow_renamed_interface_function() {
    let (mut editor, actor) = editor();
    let interface_base = editor.classes_mut().register(Class::interface("Interface")).unwrap();
    let ifoo = editor
        .create_blueprint("IFoo", interface_base, BlueprintType::Interface)
        .unwrap();
    editor.add_function_graph(ifoo, "DoThing").unwrap();
    editor
        .blueprint_mut(ifoo)
        .unwrap()
        .find_graph_mut("DoThing")
        .unwrap()
        .set_signature(&Function::new("DoThing").with_output("Done", PinType::Boolean));
    editor.compile(ifoo, CompileType::Full).unwrap();

    let child = editor.create_blueprint("Child", actor, BlueprintType::Normal).unwrap();
    editor.implement_new_interface(child, "IFoo_C").unwrap();
    let links_before = {
        let graph = editor.blueprint_mut(child).unwrap().find_graph_mut("DoThing").unwrap();
        graph.add_node(Node::generic(
            "work",
            "DoWork",
            vec![Pin::exec_in(), Pin::exec_out(PN_THEN), Pin::data_out("Result", PinType::Boolean)],
        ));
        graph.connect("entry", PN_THEN, "work", PN_EXECUTE);
        graph.connect("work", PN_THEN, "result", PN_EXECUTE);
        graph.connect("work", "Result", "result", "Done");
        graph.connections.len()
    };

    editor.rename_graph(ifoo, "DoThing", "DoStuff").unwrap();
    editor.compile(child, CompileType::Full).unwrap();

    let bp = editor.blueprint(child).unwrap();
    assert!(bp.find_graph("DoThing").is_none());
    let graph = bp.find_graph("DoStuff").unwrap();
    assert_eq!(graph.connections.len(), links_before);
    assert_eq!(graph.links_from("work", "Result"), vec![("result".to_string(), "Done".to_string())]);
}

#[test]
fn test_child_skeleton_sees_new_parent_variable() {
    let (mut editor, actor) = editor();
    let base = editor.create_blueprint("Base", actor, BlueprintType::Normal).unwrap();
    let derived = editor
        .create_blueprint("Derived", generated(&editor, base), BlueprintType::Normal)
        .unwrap();
    let derived_generated = generated(&editor, derived);

    editor.add_member_variable(base, "Score", PinType::Integer).unwrap();

    let skeleton = editor.blueprint(derived).unwrap().skeleton_class.unwrap();
    let (_, property) = editor.classes().find_property(skeleton, "Score").unwrap();
    assert_eq!(property.pin_type, PinType::Integer);
    // Only the skeleton was rebuilt
    assert_eq!(generated(&editor, derived), derived_generated);
}
