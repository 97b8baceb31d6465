mod common;
use common::*;

use bson::{Bson, doc};
use tally_collection::{Collection, ForeignKey, Key, RelationKind};

fn attached_ids(order: &Bson, relation: &str, field: &str) -> Vec<i32> {
    let Some(Bson::Array(rows)) = order.as_document().and_then(|d| d.get(relation).cloned())
    else {
        panic!("relation {relation} not attached");
    };
    rows.iter()
        .filter_map(|r| r.as_document()?.get(field)?.as_i32())
        .collect()
}

// ── Join correctness ────────────────────────────────────────────

#[test]
fn attach_joins_children_by_key_in_child_order() {
    let mut orders = orders();
    orders.add_relation("items", item_rows(), "order_id", "ID");

    let rows = orders.get();
    assert_eq!(attached_ids(&rows[0], "items", "order_item_id"), vec![100, 101]);
    assert_eq!(attached_ids(&rows[1], "items", "order_item_id"), vec![102]);
    assert_eq!(attached_ids(&rows[2], "items", "order_item_id"), vec![103]);
    assert_eq!(attached_ids(&rows[4], "items", "order_item_id"), vec![104]);
}

#[test]
fn parent_without_children_gets_an_empty_bucket() {
    let mut orders = orders();
    orders.add_relation("items", item_rows(), "order_id", "ID");

    // Order 4 has no line items.
    let rows = orders.get();
    assert_eq!(attached_ids(&rows[3], "items", "order_item_id"), Vec::<i32>::new());
}

#[test]
fn join_keys_match_loosely_across_types() {
    let parents = vec![doc! { "ID": 7 }];
    let children = vec![
        doc! { "parent": 7i64, "n": 1 },
        doc! { "parent": "7", "n": 2 },
    ];
    let mut collection = Collection::new(parents);
    collection.add_relation("children", children, "parent", "ID");

    let rows = collection.get();
    assert_eq!(attached_ids(&rows[0], "children", "n"), vec![1, 2]);
}

// ── Pre-grouped (indexed) children ──────────────────────────────

#[test]
fn indexed_relation_uses_existing_keys_without_regrouping() {
    let grouped = Collection::from_entries(vec![
        (Key::Int(1), Bson::Array(vec![doc! { "n": 10 }.into()])),
        (Key::Int(2), Bson::Array(vec![doc! { "n": 20 }.into()])),
    ]);
    let parents = vec![doc! { "ID": 1 }, doc! { "ID": 2 }, doc! { "ID": 3 }];
    let mut collection = Collection::new(parents);
    collection.add_relation_with(
        "meta",
        grouped,
        ForeignKey::Indexed,
        "ID",
        RelationKind::Many,
        true,
    );

    let rows = collection.get();
    assert_eq!(attached_ids(&rows[0], "meta", "n"), vec![10]);
    assert_eq!(attached_ids(&rows[1], "meta", "n"), vec![20]);
    // Local key outside the index: empty bucket, never an error.
    assert_eq!(attached_ids(&rows[2], "meta", "n"), Vec::<i32>::new());
}

#[test]
fn indexed_relation_attaches_non_array_buckets_as_is() {
    // Flattened maps (meta_key -> meta_value) attach unchanged.
    let grouped = Collection::from_entries(vec![(
        Key::Int(1),
        Bson::Document(doc! { "color": "red" }),
    )]);
    let mut collection = Collection::new(vec![doc! { "ID": 1 }]);
    collection.add_relation_with(
        "meta",
        grouped,
        ForeignKey::Indexed,
        "ID",
        RelationKind::Many,
        true,
    );

    let row = collection.first().unwrap();
    assert_eq!(
        row.as_document().and_then(|d| d.get("meta").cloned()),
        Some(Bson::Document(doc! { "color": "red" }))
    );
}

// ── Registry behavior ───────────────────────────────────────────

#[test]
fn attach_with_unknown_name_is_a_no_op() {
    let mut collection = orders();
    let before = collection.get();
    collection.attach_relation("nothing");
    assert_eq!(collection.get(), before);
}

#[test]
fn re_adding_a_relation_overwrites_the_prior_definition() {
    let mut collection = orders();
    collection.add_relation("items", item_rows(), "order_id", "ID");
    collection.add_relation(
        "items",
        vec![doc! { "order_id": 1, "order_item_id": 999 }],
        "order_id",
        "ID",
    );

    let rows = collection.get();
    assert_eq!(attached_ids(&rows[0], "items", "order_item_id"), vec![999]);
    assert_eq!(collection.relation_names().count(), 1);
}

#[test]
fn transformations_carry_the_relation_registry() {
    let mut collection = orders();
    collection.add_relation("items", item_rows(), "order_id", "ID");

    let derived = collection
        .where_eq("status", "completed")
        .order_by("total")
        .limit(2);
    assert_eq!(ids(&derived), vec![1, 3]);
    assert!(derived.has_relation("items"));
    assert_eq!(derived.get_relation_data("items").len(), 5);
}

#[test]
fn delete_relation_removes_only_the_named_entry() {
    let mut collection = orders();
    collection.add_relation("items", item_rows(), "order_id", "ID");
    collection.add_relation("extra", Vec::<bson::Document>::new(), "order_id", "ID");

    collection.delete_relation("items");
    assert!(!collection.has_relation("items"));
    assert!(collection.has_relation("extra"));
}

#[test]
fn get_relation_data_for_unknown_name_is_empty() {
    assert!(orders().get_relation_data("nothing").is_empty());
}

#[test]
fn attach_does_not_touch_the_child_registry() {
    let mut child = Collection::new(item_rows());
    child.add_relation("meta", Vec::<bson::Document>::new(), "order_item_id", "order_item_id");

    let mut parents = orders();
    parents.add_relation("items", child.clone(), "order_id", "ID");

    assert_eq!(child.relation_names().count(), 1);
    // The registered copy still carries its own registry, untouched.
    assert!(parents.get_relation_data("items").has_relation("meta"));
}

// ── Nested graphs ───────────────────────────────────────────────

#[test]
fn innermost_relations_attach_before_outer_ones() {
    let item_meta = vec![
        doc! { "order_item_id": 100, "meta_key": "sku", "meta_value": "W-1" },
        doc! { "order_item_id": 102, "meta_key": "sku", "meta_value": "W-2" },
    ];
    let mut items = Collection::new(item_rows());
    items.add_relation("meta", item_meta, "order_item_id", "order_item_id");

    let mut orders = orders();
    orders.add_relation("items", items, "order_id", "ID");

    // The attached item rows carry their own attached meta.
    let rows = orders.get();
    let Some(Bson::Array(order_items)) =
        rows[0].as_document().and_then(|d| d.get("items").cloned())
    else {
        panic!("items not attached");
    };
    let meta = order_items[0].as_document().and_then(|d| d.get("meta").cloned());
    assert_eq!(
        meta,
        Some(Bson::Array(vec![
            doc! { "order_item_id": 100, "meta_key": "sku", "meta_value": "W-1" }.into()
        ]))
    );
}

#[test]
fn deferred_relations_are_read_through_the_registry() {
    let item_meta = Collection::new(vec![
        doc! { "order_item_id": 100, "meta_key": "sku", "meta_value": "W-1" },
    ])
    .group_by("order_item_id");

    let mut items = Collection::new(item_rows());
    items.add_relation_with(
        "meta",
        item_meta,
        ForeignKey::Indexed,
        "order_item_id",
        RelationKind::Many,
        false,
    );

    let mut orders = orders();
    orders.add_relation("order_items", items, "order_id", "ID");

    // Not attached onto the item rows...
    let rows = orders.get();
    let Some(Bson::Array(order_items)) =
        rows[0].as_document().and_then(|d| d.get("order_items").cloned())
    else {
        panic!("order_items not attached");
    };
    assert!(order_items[0].as_document().is_some_and(|d| !d.contains_key("meta")));

    // ...but reachable by drilling through the registries.
    let meta = orders
        .get_relation_data("order_items")
        .get_relation_data("meta");
    assert_eq!(meta.index(100).len(), 1);
}
