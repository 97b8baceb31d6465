use bson::{Bson, Document};

use crate::error::LoadError;

/// Bulk-fetch boundary for the order graph.
///
/// Implementations own the actual store access and the conversion to BSON
/// documents — a SQL repository maps result rows, a fixture repository
/// hands back literals. Each method receives the id set the loader already
/// holds and returns the raw related rows in store order; ids are passed
/// through untyped, exactly as they were plucked from the parent rows.
pub trait Repository {
    /// Metadata rows for the given orders: `post_id`, `meta_key`, `meta_value`.
    fn order_meta(&self, order_ids: &[Bson]) -> Result<Vec<Document>, LoadError>;

    /// Line items: `order_id`, `order_item_id`, `order_item_name`, `order_item_type`.
    fn order_items(&self, order_ids: &[Bson]) -> Result<Vec<Document>, LoadError>;

    /// Line-item metadata: `meta_id`, `order_item_id`, `meta_key`, `meta_value`.
    fn order_item_meta(&self, item_ids: &[Bson]) -> Result<Vec<Document>, LoadError>;

    /// Approved comment rows for the given orders, carrying `comment_post_ID`.
    fn order_comments(&self, order_ids: &[Bson]) -> Result<Vec<Document>, LoadError>;

    /// Refund rows whose `post_parent` is one of the given orders.
    fn refunds(&self, order_ids: &[Bson]) -> Result<Vec<Document>, LoadError>;

    /// Refund amount rows: `post_id`, `meta_value`.
    fn refund_meta(&self, refund_ids: &[Bson]) -> Result<Vec<Document>, LoadError>;
}
