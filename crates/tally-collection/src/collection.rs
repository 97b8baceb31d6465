use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use bson::{Bson, Document};

use crate::error::CollectionError;
use crate::key::Key;
use crate::relation::{ForeignKey, Relation, RelationKind};
use crate::sort::{Sort, SortDirection};
use crate::value;

/// Field projection applied lazily at [`Collection::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Fields(Vec<String>),
}

/// An ordered, keyed, in-memory collection of heterogeneous records.
///
/// Entries keep their keys across filtering and slicing, the way the row
/// sets they were built from do; a freshly-wrapped row set is keyed by
/// position. Every query operation is copy-on-write: it returns a new
/// `Collection` carrying the relation registry (and entries are cloned —
/// there is no shared storage between the old and new value). The only
/// mutating operations are [`add_relation`](Collection::add_relation) and
/// [`attach_relation`](Collection::attach_relation), which write joined
/// buckets into this collection's own records.
///
/// Absence is never an error: unknown relation names, missing fields and
/// empty buckets all yield empty results.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    entries: Vec<(Key, Bson)>,
    projection: Projection,
    direction: SortDirection,
    relations: BTreeMap<String, Relation>,
}

impl Collection {
    // ── Construction ────────────────────────────────────────────

    /// Wrap a row set, keyed by position.
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        Self::from_values(rows.into_iter().map(Bson::Document))
    }

    /// Wrap arbitrary values, keyed by position.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Bson>,
    {
        Self::from_entries(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Key::Int(i as i64), v)),
        )
    }

    /// Wrap explicitly-keyed entries (e.g. data grouped upstream).
    pub fn from_entries<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Key, Bson)>,
    {
        Self {
            entries: pairs.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Wrap an attached value — a relation bucket, a grouped map, or a
    /// bare scalar — as a collection. `Null` becomes the empty collection.
    pub fn from_bson(value: &Bson) -> Self {
        match value {
            Bson::Array(rows) => Self::from_values(rows.iter().cloned()),
            Bson::Document(map) => Self::from_entries(map.iter().map(|(k, v)| {
                let k: &str = k.as_ref();
                (Key::from(k), v.clone())
            })),
            Bson::Null => Self::default(),
            other => Self::from_values([other.clone()]),
        }
    }

    /// New collection over `entries`, carrying this one's relation
    /// registry, projection and sort direction forward.
    fn with_entries(&self, entries: Vec<(Key, Bson)>) -> Self {
        Self {
            entries,
            projection: self.projection.clone(),
            direction: self.direction,
            relations: self.relations.clone(),
        }
    }

    // ── Introspection ───────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    /// The keyed entries, in order.
    pub fn entries(&self) -> &[(Key, Bson)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    // ── Filtering ───────────────────────────────────────────────

    /// Keep records whose `field` loosely equals `value`. Records missing
    /// the field are excluded, not an error.
    pub fn where_eq(&self, field: &str, value: impl Into<Bson>) -> Self {
        let value = value.into();
        let entries = self
            .entries
            .iter()
            .filter(|(_, record)| {
                value::field(record, field).is_some_and(|v| value::loose_eq(v, &value))
            })
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    /// Apply every `field: value` pair in `filters` as a logical AND, by
    /// sequential narrowing.
    pub fn where_all(&self, filters: &Document) -> Self {
        let mut result = self.with_entries(self.entries.clone());
        for (field, value) in filters {
            let field: &str = field.as_ref();
            result = result.where_eq(field, value.clone());
        }
        result
    }

    /// Union of the matches of each branch, evaluated against this
    /// (pre-filter) collection. A record matching several branches appears
    /// once, at its first-match position; a later match overwrites the
    /// value stored under the same key without moving it.
    pub fn or_where(&self, branches: &[Document]) -> Self {
        let mut entries: Vec<(Key, Bson)> = Vec::new();
        let mut at: HashMap<Key, usize> = HashMap::new();
        for branch in branches {
            for (key, record) in self.where_all(branch).entries {
                match at.get(&key) {
                    Some(&i) => entries[i].1 = record,
                    None => {
                        at.insert(key.clone(), entries.len());
                        entries.push((key, record));
                    }
                }
            }
        }
        self.with_entries(entries)
    }

    /// Strict membership test — exact type and case, unlike the loose
    /// [`where_eq`](Collection::where_eq).
    pub fn where_in(&self, field: &str, list: &[Bson]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, record)| value::field(record, field).is_some_and(|v| list.contains(v)))
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    /// Shorthand for `where_eq(..).first()`.
    pub fn where_first(&self, field: &str, value: impl Into<Bson>) -> Option<Bson> {
        self.where_eq(field, value).first()
    }

    /// Shorthand for `where_eq(..).last()`.
    pub fn where_last(&self, field: &str, value: impl Into<Bson>) -> Option<Bson> {
        self.where_eq(field, value).last()
    }

    // ── Projection ──────────────────────────────────────────────

    /// Declare a field projection. Nothing is dropped until the collection
    /// is materialized via [`get`](Collection::get); unknown names silently
    /// yield fewer fields than requested.
    pub fn fields<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = self.with_entries(self.entries.clone());
        out.projection = Projection::Fields(names.into_iter().map(Into::into).collect());
        out
    }

    /// Collection of `field`'s value per record, keeping entry keys.
    /// Records missing the field are skipped.
    pub fn pluck(&self, field: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|(k, record)| {
                value::field(record, field).map(|v| (k.clone(), v.clone()))
            })
            .collect();
        self.with_entries(entries)
    }

    /// Like [`pluck`](Collection::pluck), but keyed by `index_field`'s
    /// value instead of the original keys. Colliding keys keep their first
    /// position; the last write wins.
    pub fn pluck_keyed(&self, field: &str, index_field: &str) -> Self {
        let mut entries: Vec<(Key, Bson)> = Vec::new();
        let mut at: HashMap<Key, usize> = HashMap::new();
        for (_, record) in &self.entries {
            let Some(value) = value::field(record, field) else {
                continue;
            };
            let Some(index) = value::field(record, index_field) else {
                continue;
            };
            let key = Key::from_bson(index);
            match at.get(&key) {
                Some(&i) => entries[i].1 = value.clone(),
                None => {
                    at.insert(key.clone(), entries.len());
                    entries.push((key, value.clone()));
                }
            }
        }
        self.with_entries(entries)
    }

    // ── Ordering ────────────────────────────────────────────────

    /// Set the default direction used by [`order_by`](Collection::order_by).
    pub fn order(&self, direction: SortDirection) -> Self {
        let mut out = self.with_entries(self.entries.clone());
        out.direction = direction;
        out
    }

    /// Sort by `field` in the collection's current default direction.
    pub fn order_by(&self, field: &str) -> Self {
        self.order_by_dir(field, self.direction)
    }

    /// Stable sort by `field`: equal keys keep their original relative
    /// order, so chained sorts compose as secondary keys.
    pub fn order_by_dir(&self, field: &str, direction: SortDirection) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|(_, a), (_, b)| {
            let ord = value::compare(value::field(a, field), value::field(b, field));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        let mut out = self.with_entries(entries);
        out.direction = direction;
        out
    }

    /// Sort by several keys at once; earlier sorts take precedence and
    /// stability settles the rest.
    pub fn order_by_many(&self, sorts: &[Sort]) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|(_, a), (_, b)| {
            for sort in sorts {
                let ord = value::compare(
                    value::field(a, &sort.field),
                    value::field(b, &sort.field),
                );
                let ord = match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        self.with_entries(entries)
    }

    // ── Slicing ─────────────────────────────────────────────────

    /// Window of `limit` entries starting at `offset`, keys preserved.
    /// A negative offset is measured from the end.
    pub fn slice(&self, offset: i64, limit: Option<usize>) -> Self {
        let len = self.entries.len();
        let start = if offset < 0 {
            len.saturating_sub(offset.unsigned_abs() as usize)
        } else {
            (offset as usize).min(len)
        };
        let end = match limit {
            Some(n) => (start + n).min(len),
            None => len,
        };
        self.with_entries(self.entries[start..end].to_vec())
    }

    /// First `n` entries; when `n` is negative, the last `|n|` entries.
    pub fn limit(&self, n: i64) -> Self {
        if n < 0 {
            self.slice(n, Some(n.unsigned_abs() as usize))
        } else {
            self.slice(0, Some(n as usize))
        }
    }

    /// `count` entries starting at `offset` (negative = from the end).
    pub fn limit_at(&self, offset: i64, count: usize) -> Self {
        self.slice(offset, Some(count))
    }

    // ── Grouping & lookup ───────────────────────────────────────

    /// Partition records into buckets keyed by `field`'s value. Buckets
    /// appear in first-appearance order of each distinct key and preserve
    /// insertion order internally. Records missing the field are dropped.
    pub fn group_by(&self, field: &str) -> Self {
        let mut order: Vec<Key> = Vec::new();
        let mut buckets: HashMap<Key, Vec<Bson>> = HashMap::new();
        for (_, record) in &self.entries {
            let Some(value) = value::field(record, field) else {
                continue;
            };
            let key = Key::from_bson(value);
            if !buckets.contains_key(&key) {
                order.push(key.clone());
            }
            buckets.entry(key).or_default().push(record.clone());
        }
        let entries = order
            .into_iter()
            .map(|k| {
                let rows = buckets.remove(&k).unwrap_or_default();
                (k, Bson::Array(rows))
            })
            .collect();
        self.with_entries(entries)
    }

    /// The entry stored under `key`, wrapped as a sub-collection. Missing
    /// keys yield an empty collection.
    pub fn index(&self, key: impl Into<Key>) -> Self {
        match self.value_at(&key.into()) {
            Some(value) => {
                let mut sub = Self::from_bson(value);
                sub.relations = self.relations.clone();
                sub
            }
            None => self.with_entries(Vec::new()),
        }
    }

    /// The raw value stored under `key`, if any.
    pub fn value_at(&self, key: &Key) -> Option<&Bson> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Subset of entries whose key is in `keys`, preserving this
    /// collection's order.
    pub fn indexes(&self, keys: &[Key]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| keys.contains(k))
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    // ── Aggregation ─────────────────────────────────────────────

    /// Numeric sum over the entry values. Numeric strings are parsed;
    /// anything else counts as zero.
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, v)| value::numeric(v)).sum()
    }

    // ── Terminal extraction ─────────────────────────────────────

    /// Materialize the values in order, with the field projection applied.
    /// Idempotent: the collection itself is untouched.
    pub fn get(&self) -> Vec<Bson> {
        self.entries.iter().map(|(_, v)| self.project(v)).collect()
    }

    pub fn first(&self) -> Option<Bson> {
        self.entries.first().map(|(_, v)| self.project(v))
    }

    pub fn last(&self) -> Option<Bson> {
        self.entries.last().map(|(_, v)| self.project(v))
    }

    /// Materialize every record as a document, projection applied.
    /// Non-document values are skipped.
    pub fn to_documents(&self) -> Vec<Document> {
        self.get()
            .into_iter()
            .filter_map(|v| match v {
                Bson::Document(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Materialize the keyed entries as a single document, projection
    /// applied, keys stringified.
    pub fn to_keyed_document(&self) -> Document {
        let mut out = Document::new();
        for (k, v) in &self.entries {
            out.insert(k.to_string(), self.project(v));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, CollectionError> {
        Ok(serde_json::to_string(&self.get())?)
    }

    fn project(&self, value: &Bson) -> Bson {
        let Projection::Fields(names) = &self.projection else {
            return value.clone();
        };
        match value {
            Bson::Document(doc) => {
                let mut out = Document::new();
                for (k, v) in doc {
                    let k: &str = k.as_ref();
                    if names.iter().any(|n| n == k) {
                        out.insert(k, v.clone());
                    }
                }
                Bson::Document(out)
            }
            other => other.clone(),
        }
    }

    // ── Relations ───────────────────────────────────────────────

    /// Register a to-many relation under `name` and attach it immediately.
    /// Re-using a name overwrites the previous definition.
    pub fn add_relation(
        &mut self,
        name: &str,
        items: impl Into<Collection>,
        foreign_key: impl Into<ForeignKey>,
        local_key: &str,
    ) {
        self.add_relation_with(name, items, foreign_key, local_key, RelationKind::Many, true);
    }

    /// Full-parameter form of [`add_relation`](Collection::add_relation);
    /// `attach = false` registers the relation without joining it, for
    /// consumers that read it through
    /// [`get_relation_data`](Collection::get_relation_data).
    pub fn add_relation_with(
        &mut self,
        name: &str,
        items: impl Into<Collection>,
        foreign_key: impl Into<ForeignKey>,
        local_key: &str,
        kind: RelationKind,
        attach: bool,
    ) {
        self.relations.insert(
            name.to_string(),
            Relation {
                collection: items.into(),
                foreign_key: foreign_key.into(),
                local_key: local_key.to_string(),
                kind,
            },
        );
        if attach {
            self.attach_relation(name);
        }
    }

    /// Execute the join registered under `name` and write each parent's
    /// bucket into the parent record as a field called `name`. Unknown
    /// names are a no-op.
    ///
    /// This is the eager bulk join: one grouping pass over the child
    /// (skipped entirely for [`ForeignKey::Indexed`] children), then one
    /// pass over the parents — O(parent + child), never per-parent. A
    /// parent whose local-key value has no bucket gets an empty array.
    ///
    /// Nested graphs must be attached innermost-first: join grandchildren
    /// onto a child collection before that child is joined here, or the
    /// nested field will silently be missing from the attached rows. The
    /// child collection itself — including its relation registry — is
    /// only read, never modified.
    pub fn attach_relation(&mut self, name: &str) {
        let Some(relation) = self.relations.get(name) else {
            return;
        };
        let lookup = match &relation.foreign_key {
            ForeignKey::Indexed => relation.collection.clone(),
            ForeignKey::Field(field) => relation.collection.group_by(field),
        };
        let local_key = relation.local_key.clone();
        for (_, record) in &mut self.entries {
            let Bson::Document(doc) = record else {
                continue;
            };
            let bucket = doc
                .get(&local_key)
                .map(Key::from_bson)
                .and_then(|k| lookup.value_at(&k).cloned())
                .unwrap_or_else(|| Bson::Array(Vec::new()));
            doc.insert(name, bucket);
        }
    }

    /// Attach every registered relation, in registration-name order.
    pub fn attach_relations(&mut self) {
        let names: Vec<String> = self.relations.keys().cloned().collect();
        for name in names {
            self.attach_relation(&name);
        }
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn delete_relation(&mut self, name: &str) {
        self.relations.remove(name);
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// The raw child collection registered under `name`, for further
    /// chained querying (e.g. drilling into a nested relation's own
    /// relations). Empty when the name is unknown.
    pub fn get_relation_data(&self, name: &str) -> Collection {
        self.relations
            .get(name)
            .map(|r| r.collection.clone())
            .unwrap_or_default()
    }
}

impl From<Vec<Document>> for Collection {
    fn from(rows: Vec<Document>) -> Self {
        Collection::new(rows)
    }
}

impl From<Vec<Bson>> for Collection {
    fn from(values: Vec<Bson>) -> Self {
        Collection::from_values(values)
    }
}
