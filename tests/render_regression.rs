//! Rendered-markup regression tests
//!
//! Serialized output is the engine's observable surface; these pin the
//! exact markup for representative clones so compiler or serializer
//! drift shows up as a diff.

use serde_json::json;
use stencil::{CloneOptions, Engine, RefreshOptions};

#[test]
fn test_single_clone_markup() {
    let mut engine = Engine::from_markup(
        r#"<div id=shelf><p id=book class=stencil-template><span id=~~isbn~~>~~title~~</span></p></div>"#,
    );
    engine
        .clone_template(
            "book",
            vec![json!({ "title": "The DOM", "isbn": "1-1" })],
            CloneOptions::new(),
        )
        .expect("Should clone");
    insta::assert_snapshot!(engine.markup(), @r#"<div class="stencil-container stencil-holds-book" id="shelf"><p class="stencil-clone book"><span class="stencil-node stencil-field stencil-field-title" id="1-1">The DOM</span></p></div>"#);
}

#[test]
fn test_two_clones_markup() {
    let mut engine = Engine::from_markup(
        r#"<div id=shelf><p id=book class=stencil-template><span id=~~isbn~~>~~title~~</span></p></div>"#,
    );
    engine
        .clone_template(
            "book",
            vec![
                json!({ "title": "The DOM", "isbn": "1-1" }),
                json!({ "title": "CSS3", "isbn": "2-2" }),
            ],
            CloneOptions::new(),
        )
        .expect("Should clone");
    insta::assert_snapshot!(engine.markup(), @r#"<div class="stencil-container stencil-holds-book" id="shelf"><p class="stencil-clone book"><span class="stencil-node stencil-field stencil-field-title" id="1-1">The DOM</span></p><p class="stencil-clone book"><span class="stencil-node stencil-field stencil-field-title" id="2-2">CSS3</span></p></div>"#);
}

#[test]
fn test_loop_markup() {
    let mut engine = Engine::from_markup(
        r#"<div id=library><article id=book class=stencil-template><h1>~~title~~</h1><ul><li data-array=~~authors~~>~~name~~</li></ul></article></div>"#,
    );
    engine
        .clone_template(
            "book",
            vec![json!({ "title": "Dot One", "authors": [{ "name": "Ann" }, { "name": "Bob" }] })],
            CloneOptions::new(),
        )
        .expect("Should clone");
    insta::assert_snapshot!(engine.markup(), @r#"<div class="stencil-container stencil-holds-book" id="library"><article class="stencil-clone book"><h1 class="stencil-node stencil-field stencil-field-title">Dot One</h1><ul class="stencil-node stencil-array stencil-container stencil-holds-book-authors-instance"><li class="stencil-node stencil-field stencil-field-name stencil-sub-clone stencil-clone book-authors-instance">Ann</li><li class="stencil-node stencil-field stencil-field-name stencil-sub-clone stencil-clone book-authors-instance">Bob</li></ul></article></div>"#);
}

#[test]
fn test_hidden_rule_markup() {
    let mut engine = Engine::from_markup(
        r#"<div id=box><p id=offer class=stencil-template data-require=~~price~~>on sale</p></div>"#,
    );
    let clone = engine
        .clone_template("offer", vec![json!({})], CloneOptions::new())
        .expect("Should clone")[0];
    insta::assert_snapshot!(engine.markup(), @r#"<div class="stencil-container stencil-holds-offer" id="box"><p class="stencil-node stencil-clone offer" hidden>on sale</p></div>"#);

    engine
        .refresh(clone, RefreshOptions::new().with_model(json!({ "price": 0 })))
        .expect("Should refresh");
    insta::assert_snapshot!(engine.markup(), @r#"<div class="stencil-container stencil-holds-offer" id="box"><p class="stencil-node stencil-clone offer">on sale</p></div>"#);
}

#[test]
fn test_count_and_value_pseudo_fields() {
    let mut engine = Engine::from_markup(
        r#"<div id=list><b id=item class=stencil-template data-n=~~[count]~~>~~[value]~~</b></div>"#,
    );
    engine
        .clone_template(
            "item",
            vec![json!("alpha"), json!("beta")],
            CloneOptions::new(),
        )
        .expect("Should clone");
    insta::assert_snapshot!(engine.markup(), @r#"<div class="stencil-container stencil-holds-item" id="list"><b class="stencil-node stencil-field stencil-field-value stencil-clone item" data-n="1">alpha</b><b class="stencil-node stencil-field stencil-field-value stencil-clone item" data-n="2">beta</b></div>"#);
}
