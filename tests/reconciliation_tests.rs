//! Integration tests for loop reconciliation and nested clones

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use stencil::{CloneOptions, DestroyOptions, Engine, EngineError, NodeId, RefreshOptions};

const LIBRARY: &str = r#"<div id=library><article id=book class=stencil-template><h1>~~title~~</h1><ul><li data-array=~~authors~~>~~name~~</li></ul></article></div>"#;

fn library() -> Engine {
    Engine::from_markup(LIBRARY)
}

fn book(title: &str, authors: &[&str]) -> Value {
    json!({
        "title": title,
        "authors": authors.iter().map(|a| json!({ "name": a })).collect::<Vec<_>>(),
    })
}

fn sub_clones(engine: &Engine, holder: NodeId) -> Vec<NodeId> {
    engine
        .doc()
        .descendants_with_class(holder, "book-authors-instance")
}

fn sub_names(engine: &Engine, holder: NodeId) -> Vec<String> {
    sub_clones(engine, holder)
        .iter()
        .map(|n| engine.doc().deep_text(*n))
        .collect()
}

#[test]
fn test_loop_builds_one_sub_clone_per_element() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob"])], CloneOptions::new())
        .expect("Should clone")[0];
    assert_eq!(sub_names(&engine, holder), vec!["Ann", "Bob"]);
    assert_eq!(engine.info().subs, 2);
}

#[test]
fn test_loop_ordinals_run_one_to_n() {
    let markup = r#"<div id=library><article id=book class=stencil-template><ul><li data-array=~~authors~~ data-n=~~[count]~~>~~name~~</li></ul></article></div>"#;
    let mut engine = Engine::from_markup(markup);
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob", "Cyd"])], CloneOptions::new())
        .unwrap()[0];
    let ordinals: Vec<String> = sub_clones(&engine, holder)
        .iter()
        .map(|n| engine.doc().elem(*n).unwrap().attr("data-n").unwrap().to_string())
        .collect();
    assert_eq!(ordinals, vec!["1", "2", "3"]);
}

#[test]
fn test_patch_in_place_preserves_identity() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob"])], CloneOptions::new())
        .unwrap()[0];
    let before = sub_clones(&engine, holder);

    // same length: only the bound fields change
    engine
        .refresh(
            holder,
            RefreshOptions::new().with_model(book("Go", &["Anna", "Bob"])),
        )
        .expect("Should refresh");
    let after = sub_clones(&engine, holder);
    assert_eq!(before, after, "node identities must be reused");
    assert_eq!(sub_names(&engine, holder), vec!["Anna", "Bob"]);
}

#[test]
fn test_length_change_rebuilds_the_group() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob"])], CloneOptions::new())
        .unwrap()[0];
    let before = sub_clones(&engine, holder);

    engine
        .refresh(
            holder,
            RefreshOptions::new().with_model(book("Go", &["Ann", "Bob", "Cyd"])),
        )
        .expect("Should refresh");
    let after = sub_clones(&engine, holder);
    assert_eq!(after.len(), 3);
    // every instance is brand new: rebuild, not splice
    for id in &after {
        assert!(!before.contains(id), "expected fresh nodes after rebuild");
    }
    assert_eq!(sub_names(&engine, holder), vec!["Ann", "Bob", "Cyd"]);
}

#[test]
fn test_length_round_trip_any_direction() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob", "Cyd"])], CloneOptions::new())
        .unwrap()[0];

    engine
        .refresh(holder, RefreshOptions::new().with_model(book("Go", &["Zoe"])))
        .unwrap();
    assert_eq!(sub_names(&engine, holder), vec!["Zoe"]);

    engine
        .refresh(
            holder,
            RefreshOptions::new().with_model(book("Go", &["Ann", "Bob", "Cyd", "Dee"])),
        )
        .unwrap();
    assert_eq!(sub_names(&engine, holder), vec!["Ann", "Bob", "Cyd", "Dee"]);
}

#[test]
fn test_rebuild_restarts_ordinals() {
    let markup = r#"<div id=library><article id=book class=stencil-template><ul><li data-array=~~authors~~ data-n=~~[count]~~>~~name~~</li></ul></article></div>"#;
    let mut engine = Engine::from_markup(markup);
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob"])], CloneOptions::new())
        .unwrap()[0];
    engine
        .refresh(
            holder,
            RefreshOptions::new().with_model(book("Go", &["Ann", "Bob", "Cyd"])),
        )
        .unwrap();
    let ordinals: Vec<String> = sub_clones(&engine, holder)
        .iter()
        .map(|n| engine.doc().elem(*n).unwrap().attr("data-n").unwrap().to_string())
        .collect();
    assert_eq!(ordinals, vec!["1", "2", "3"]);
}

#[test]
fn test_reorder_rebinds_positions_without_swapping_nodes() {
    // no identity key: an equal-length reorder is re-binding by position,
    // not a node swap
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob"])], CloneOptions::new())
        .unwrap()[0];
    let before = sub_clones(&engine, holder);

    engine
        .refresh(
            holder,
            RefreshOptions::new().with_model(book("Go", &["Bob", "Ann"])),
        )
        .unwrap();
    assert_eq!(sub_clones(&engine, holder), before);
    assert_eq!(sub_names(&engine, holder), vec!["Bob", "Ann"]);
}

#[test]
fn test_missing_array_is_repaired_to_empty() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![json!({ "title": "Go" })], CloneOptions::new())
        .expect("Should clone without the array field");
    let holder = holder[0];
    assert_eq!(sub_clones(&engine, holder).len(), 0);
    assert_eq!(
        engine.get_model(holder).unwrap()["authors"],
        json!([]),
        "the missing field is normalized on the model"
    );
}

#[test]
fn test_clone_sub_appends_and_syncs_the_holder_model() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann"])], CloneOptions::new())
        .unwrap()[0];

    engine
        .clone_sub(holder, "authors", vec![json!({ "name": "Bob" })], CloneOptions::new())
        .expect("Should clone sub");
    assert_eq!(sub_names(&engine, holder), vec!["Ann", "Bob"]);
    assert_eq!(
        engine.get_model(holder).unwrap()["authors"],
        json!([{ "name": "Ann" }, { "name": "Bob" }])
    );
}

#[test]
fn test_destroy_sub_clone_splices_the_holder_array() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob", "Cyd"])], CloneOptions::new())
        .unwrap()[0];
    let victim = sub_clones(&engine, holder)[1];

    engine
        .destroy(victim, DestroyOptions::new())
        .expect("Should destroy");
    assert_eq!(sub_names(&engine, holder), vec!["Ann", "Cyd"]);
    assert_eq!(
        engine.get_model(holder).unwrap()["authors"],
        json!([{ "name": "Ann" }, { "name": "Cyd" }])
    );
}

#[test]
fn test_nested_template_requires_a_container() {
    let mut engine = library();
    engine.get_template("book").expect("Should compile");
    let result = engine.clone_template(
        "book-authors-instance",
        vec![json!({ "name": "stray" })],
        CloneOptions::new(),
    );
    assert!(matches!(
        result,
        Err(EngineError::ContainerMissing { name }) if name == "book-authors-instance"
    ));
}

#[test]
fn test_refresh_after_sub_destroy_keeps_shape() {
    let mut engine = library();
    let holder = engine
        .clone_template("book", vec![book("Go", &["Ann", "Bob"])], CloneOptions::new())
        .unwrap()[0];
    let victim = sub_clones(&engine, holder)[0];
    engine.destroy(victim, DestroyOptions::new()).unwrap();

    // the holder model was spliced, so a plain refresh patches in place
    let remaining = sub_clones(&engine, holder);
    engine.refresh(holder, RefreshOptions::new()).unwrap();
    assert_eq!(sub_clones(&engine, holder), remaining);
    assert_eq!(sub_names(&engine, holder), vec!["Bob"]);
}

#[test]
fn test_deeply_nested_loops() {
    let markup = r#"<div id=org><section id=team class=stencil-template><h1>~~name~~</h1><div><p data-array=~~groups~~><b>~~label~~</b><span><i data-array=~~people~~>~~who~~</i></span></p></div></section></div>"#;
    let mut engine = Engine::from_markup(markup);
    let model = json!({
        "name": "core",
        "groups": [
            { "label": "g1", "people": [{ "who": "ann" }, { "who": "bob" }] },
            { "label": "g2", "people": [{ "who": "cyd" }] },
        ],
    });
    let holder = engine
        .clone_template("team", vec![model], CloneOptions::new())
        .expect("Should clone nested loops")[0];

    let markup_out = engine.doc().outer_markup(holder);
    for needle in ["core", "g1", "ann", "bob", "g2", "cyd"] {
        assert!(markup_out.contains(needle), "missing {needle}: {markup_out}");
    }
    // inner instances are named from the outermost holder template
    assert_eq!(
        engine.doc().descendants_with_class(holder, "team-people-instance").len(),
        3
    );
}
