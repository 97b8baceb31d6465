#![allow(dead_code)]

use bson::{Document, doc};
use tally_collection::Collection;

/// Five order records with mixed statuses and totals.
pub fn orders() -> Collection {
    Collection::new(vec![
        doc! { "ID": 1, "status": "completed", "total": 20 },
        doc! { "ID": 2, "status": "pending", "total": 35 },
        doc! { "ID": 3, "status": "completed", "total": 20 },
        doc! { "ID": 4, "status": "refunded", "total": 5 },
        doc! { "ID": 5, "status": "completed", "total": 80 },
    ])
}

/// Line items for the orders above; order 4 has none.
pub fn item_rows() -> Vec<Document> {
    vec![
        doc! { "order_id": 1, "order_item_id": 100, "order_item_name": "Widget", "order_item_type": "line_item" },
        doc! { "order_id": 1, "order_item_id": 101, "order_item_name": "Gadget", "order_item_type": "line_item" },
        doc! { "order_id": 2, "order_item_id": 102, "order_item_name": "Widget", "order_item_type": "line_item" },
        doc! { "order_id": 3, "order_item_id": 103, "order_item_name": "Shipping", "order_item_type": "shipping" },
        doc! { "order_id": 5, "order_item_id": 104, "order_item_name": "Widget", "order_item_type": "line_item" },
    ]
}

/// Ids of the records in a collection, for order assertions.
pub fn ids(collection: &Collection) -> Vec<i32> {
    collection
        .get()
        .iter()
        .filter_map(|v| v.as_document()?.get("ID")?.as_i32())
        .collect()
}
