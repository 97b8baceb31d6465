use bson::{Bson, Document};
use tally_collection::{Collection, ForeignKey, Key, RelationKind};
use tracing::{debug, info};

use crate::cache::Cache;
use crate::error::LoadError;
use crate::repository::Repository;

/// Cache group for primed item metadata.
pub const CACHE_GROUP: &str = "orders";

/// Bulk-assembled order graph.
///
/// [`load`](BulkOrders::load) fetches every related row set for a batch of
/// orders — one fetch per entity type — and joins them in memory, so that
/// [`get`](BulkOrders::get) hands out fully-assembled orders without going
/// back to the store. Relations are attached innermost-first: grandchild
/// rows (item meta, refund meta) are joined onto their own parents before
/// those collections are joined onto the orders.
#[derive(Debug, Default)]
pub struct BulkOrders {
    orders: Option<Collection>,
}

/// One fully-assembled order pulled out of the bulk graph.
#[derive(Debug, Clone)]
pub struct LoadedOrder {
    /// The order record with `meta`, `comments`, `order_items` and
    /// `refunds` attached.
    pub order: Document,
    /// Line items, projected to id, name and type.
    pub items: Collection,
    /// Line-item metadata buckets, keyed by item id.
    pub item_meta: Collection,
    /// Comment rows for this order.
    pub comments: Collection,
    /// Sum of the refund amounts over this order's refunds.
    pub total_refunded: f64,
}

impl BulkOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.orders.is_some()
    }

    /// The assembled parent collection, if loaded.
    pub fn collection(&self) -> Option<&Collection> {
        self.orders.as_ref()
    }

    /// Fetch and join the whole graph for `orders` in one bulk pass per
    /// entity type.
    pub fn load(&mut self, orders: Vec<Document>, repo: &dyn Repository) -> Result<(), LoadError> {
        let mut order_collection = Collection::new(orders);
        let order_ids: Vec<Bson> = order_collection.pluck("ID").get();

        // Order metadata, pre-grouped by owner and flattened to
        // meta_key -> meta_value maps so the relation joins by index
        // instead of re-grouping per attach.
        let meta_rows = repo.order_meta(&order_ids)?;
        let meta = key_meta_by_owner(&Collection::new(meta_rows).group_by("post_id"));

        // Line items, with their metadata registered but not attached:
        // consumers read it through the relation registry, already grouped
        // by item id.
        let mut items = Collection::new(repo.order_items(&order_ids)?);
        let item_ids: Vec<Bson> = items.pluck("order_item_id").get();
        let item_meta = Collection::new(repo.order_item_meta(&item_ids)?).group_by("order_item_id");
        items.add_relation_with(
            "meta",
            item_meta,
            ForeignKey::Indexed,
            "order_item_id",
            RelationKind::Many,
            false,
        );

        let comments = Collection::new(repo.order_comments(&order_ids)?);

        // Refunds carry their amount rows as a nested relation, joined
        // before the refunds themselves are joined onto the orders.
        let mut refunds = Collection::new(repo.refunds(&order_ids)?);
        if !refunds.is_empty() {
            let refund_ids: Vec<Bson> = refunds.pluck("ID").get();
            let refund_meta = Collection::new(repo.refund_meta(&refund_ids)?);
            refunds.add_relation("meta", refund_meta, "post_id", "ID");
        }

        info!(
            orders = order_collection.len(),
            items = items.len(),
            comments = comments.len(),
            refunds = refunds.len(),
            "assembling bulk order graph"
        );

        order_collection.add_relation_with(
            "meta",
            meta,
            ForeignKey::Indexed,
            "ID",
            RelationKind::Many,
            true,
        );
        order_collection.add_relation("comments", comments, "comment_post_ID", "ID");
        order_collection.add_relation("order_items", items, "order_id", "ID");
        order_collection.add_relation("refunds", refunds, "post_parent", "ID");

        self.orders = Some(order_collection);
        Ok(())
    }

    /// Pull one fully-assembled order out of the bulk graph.
    ///
    /// Returns `None` when no bulk load has run or the id is absent;
    /// callers fall through to their uncached single-order path.
    pub fn get(&self, order_id: impl Into<Bson>) -> Option<LoadedOrder> {
        let orders = self.orders.as_ref()?;
        let order_id = order_id.into();
        let order = match orders.where_first("ID", order_id.clone()) {
            Some(Bson::Document(doc)) => doc,
            _ => return None,
        };

        let items = Collection::from_bson(order.get("order_items").unwrap_or(&Bson::Null));
        let item_ids: Vec<Key> = items
            .pluck("order_item_id")
            .get()
            .iter()
            .map(Key::from_bson)
            .collect();

        let item_meta = orders
            .get_relation_data("order_items")
            .get_relation_data("meta")
            .indexes(&item_ids);

        let items = items.fields(["order_item_id", "order_item_name", "order_item_type"]);

        let comments = Collection::from_bson(order.get("comments").unwrap_or(&Bson::Null));

        // Three levels deep: each refund's meta rows, the first row of
        // each, its meta_value, summed numerically.
        let total_refunded = Collection::from_bson(order.get("refunds").unwrap_or(&Bson::Null))
            .pluck("meta")
            .pluck("0")
            .pluck("meta_value")
            .sum();

        debug!(order = %order_id, items = items.len(), "order assembled from bulk graph");
        Some(LoadedOrder {
            order,
            items,
            item_meta,
            comments,
            total_refunded,
        })
    }

    /// [`get`](BulkOrders::get), then prime the item-meta cache for the
    /// returned order.
    pub fn get_cached(&self, order_id: impl Into<Bson>, cache: &dyn Cache) -> Option<LoadedOrder> {
        let order = self.get(order_id)?;
        Self::prime_item_meta_cache(&order, cache);
        Some(order)
    }

    /// Reshape each item's metadata into `meta_id -> { key, value }`
    /// documents and write one cache entry per item, keyed
    /// `{prefix}item_meta_array_{item_id}`. A separate step rather than a
    /// side effect of [`get`](BulkOrders::get), so the join path stays
    /// side-effect-free.
    pub fn prime_item_meta_cache(order: &LoadedOrder, cache: &dyn Cache) {
        let prefix = cache.prefix(CACHE_GROUP);
        for id in order.items.pluck("order_item_id").get() {
            let item_key = Key::from_bson(&id);
            let rows = order
                .item_meta
                .index(item_key.clone())
                .fields(["meta_value", "meta_key", "meta_id"])
                .order_by("meta_id");

            let mut entry = Document::new();
            for row in rows.to_documents() {
                let Some(meta_id) = row.get("meta_id") else {
                    continue;
                };
                let mut reshaped = Document::new();
                reshaped.insert("key", row.get("meta_key").cloned().unwrap_or(Bson::Null));
                reshaped.insert("value", row.get("meta_value").cloned().unwrap_or(Bson::Null));
                entry.insert(Key::from_bson(meta_id).to_string(), reshaped);
            }
            cache.set(
                &format!("{prefix}item_meta_array_{item_key}"),
                entry,
                CACHE_GROUP,
            );
        }
    }
}

/// Flatten grouped metadata buckets into `meta_key -> meta_value` maps,
/// keeping the owner-id keys.
fn key_meta_by_owner(grouped: &Collection) -> Collection {
    let entries = grouped
        .entries()
        .iter()
        .map(|(owner, bucket)| {
            let map = Collection::from_bson(bucket)
                .pluck_keyed("meta_value", "meta_key")
                .to_keyed_document();
            (owner.clone(), Bson::Document(map))
        })
        .collect::<Vec<_>>();
    Collection::from_entries(entries)
}
