//! In-memory document client.
//!
//! [`MemoryClient`] evaluates the filters and options produced by
//! [`compile`](crate::compile) against documents kept in process memory. It
//! understands exactly what this crate emits: equality, `$regex` with
//! `$options`, inclusion projections, sort documents, `skip`/`limit`, `$set`
//! updates and whole-document replacement. It is meant for tests and for
//! running the builder without a server.
//!
//! As on the server, a condition on an array field matches when the whole
//! array or any element matches. Other query operators are rejected.
//!
//! Documents always carry their identity under `_id`, which is assigned a new
//! `ObjectId` on insert when missing.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use parking_lot::RwLock;
use regex_lite::Regex;

use crate::client::{
    ClientResult, CollectionHandle, DeleteOutcome, DocumentClient, InsertOutcome, UpdateOutcome,
};
use crate::compile::QueryOptions;

const ID_FIELD: &str = "_id";

type Namespace = (String, String);
type Store = Arc<RwLock<HashMap<Namespace, Vec<Document>>>>;

/// A client backed by process memory.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    store: Store,
}

impl MemoryClient {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a collection as-is, assigning `_id` where missing.
    pub fn seed(&self, database: &str, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let mut store = self.store.write();
        let target = store
            .entry((database.to_string(), collection.to_string()))
            .or_default();
        target.extend(docs.into_iter().map(with_id));
    }

    /// Snapshot the documents of a collection in storage order.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.store
            .read()
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Remove every collection.
    pub fn clear(&self) {
        self.store.write().clear();
    }
}

impl DocumentClient for MemoryClient {
    type Handle = MemoryCollection;

    fn collection_handle(&self, database: &str, collection: &str) -> ClientResult<Self::Handle> {
        if database.is_empty() || collection.is_empty() {
            return Err("database and collection names must not be empty".into());
        }
        Ok(MemoryCollection {
            store: Arc::clone(&self.store),
            namespace: (database.to_string(), collection.to_string()),
        })
    }
}

/// Handle to one in-memory collection.
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    store: Store,
    namespace: Namespace,
}

impl MemoryCollection {
    fn matching(&self, matcher: &Matcher) -> Vec<Document> {
        self.store
            .read()
            .get(&self.namespace)
            .map(|docs| docs.iter().filter(|d| matcher.matches(d)).cloned().collect())
            .unwrap_or_default()
    }

    fn with_docs<T>(&self, f: impl FnOnce(&mut Vec<Document>) -> T) -> T {
        let mut store = self.store.write();
        f(store.entry(self.namespace.clone()).or_default())
    }

    fn update(
        &self,
        filter: Document,
        update: Document,
        many: bool,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome> {
        let matcher = Matcher::new(&filter)?;
        let set = set_fields(update)?;

        self.with_docs(|docs| -> ClientResult<UpdateOutcome> {
            let mut outcome = UpdateOutcome::default();
            for doc in docs.iter_mut().filter(|d| matcher.matches(d)) {
                outcome.matched_count += 1;
                let mut changed = false;
                for (key, value) in &set {
                    if key == ID_FIELD && doc.get(ID_FIELD) != Some(value) {
                        return Err("the '_id' field is immutable".into());
                    }
                    if doc.get(key) != Some(value) {
                        doc.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
                if changed {
                    outcome.modified_count += 1;
                }
                if !many {
                    break;
                }
            }

            if outcome.matched_count == 0 && upsert {
                let mut seeded = matcher.equality_fields();
                for (key, value) in set {
                    seeded.insert(key, value);
                }
                let seeded = with_id(seeded);
                outcome.upserted_id = seeded.get(ID_FIELD).cloned();
                docs.push(seeded);
            }
            Ok(outcome)
        })
    }

    fn delete(&self, filter: Document, many: bool) -> ClientResult<DeleteOutcome> {
        let matcher = Matcher::new(&filter)?;
        self.with_docs(|docs| {
            let before = docs.len();
            if many {
                docs.retain(|d| !matcher.matches(d));
            } else if let Some(pos) = docs.iter().position(|d| matcher.matches(d)) {
                docs.remove(pos);
            }
            Ok(DeleteOutcome {
                deleted_count: (before - docs.len()) as u64,
            })
        })
    }
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    async fn count(&self, filter: Document, options: QueryOptions) -> ClientResult<u64> {
        let matcher = Matcher::new(&filter)?;
        let docs = paginate(self.matching(&matcher), &options);
        Ok(docs.len() as u64)
    }

    async fn find(&self, filter: Document, options: QueryOptions) -> ClientResult<Vec<Document>> {
        let matcher = Matcher::new(&filter)?;
        let mut docs = self.matching(&matcher);
        if let Some(ref sort) = options.sort {
            let keys = sort_keys(sort)?;
            docs.sort_by(|a, b| compare_docs(a, b, &keys));
        }
        let docs = paginate(docs, &options);
        Ok(match options.projection {
            Some(ref projection) => docs.iter().map(|d| project(d, projection)).collect(),
            None => docs,
        })
    }

    async fn insert_one(&self, document: Document) -> ClientResult<InsertOutcome> {
        self.insert_many(vec![document]).await
    }

    async fn insert_many(&self, documents: Vec<Document>) -> ClientResult<InsertOutcome> {
        let documents: Vec<Document> = documents.into_iter().map(with_id).collect();
        self.with_docs(|docs| -> ClientResult<InsertOutcome> {
            let mut ids: Vec<Bson> = Vec::with_capacity(documents.len());
            for doc in &documents {
                let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
                let taken = ids.contains(&id) || docs.iter().any(|d| d.get(ID_FIELD) == Some(&id));
                if taken {
                    return Err(format!("duplicate key error: _id {}", id).into());
                }
                ids.push(id);
            }
            docs.extend(documents);
            Ok(InsertOutcome { inserted_ids: ids })
        })
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome> {
        self.update(filter, update, false, upsert)
    }

    async fn update_many(&self, filter: Document, update: Document) -> ClientResult<UpdateOutcome> {
        self.update(filter, update, true, false)
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> ClientResult<UpdateOutcome> {
        if replacement.keys().any(|k| k.starts_with('$')) {
            return Err("replacement document must not contain update operators".into());
        }
        let matcher = Matcher::new(&filter)?;

        self.with_docs(|docs| -> ClientResult<UpdateOutcome> {
            let mut outcome = UpdateOutcome::default();
            if let Some(doc) = docs.iter_mut().find(|d| matcher.matches(d)) {
                outcome.matched_count = 1;
                let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
                if replacement.get(ID_FIELD).is_some_and(|new_id| *new_id != id) {
                    return Err("the '_id' field is immutable".into());
                }
                let mut next = Document::new();
                next.insert(ID_FIELD, id);
                for (key, value) in replacement {
                    if key != ID_FIELD {
                        next.insert(key, value);
                    }
                }
                if *doc != next {
                    *doc = next;
                    outcome.modified_count = 1;
                }
            } else if upsert {
                let mut seeded = Document::new();
                if let Some(id) = matcher.equality_fields().get(ID_FIELD) {
                    seeded.insert(ID_FIELD, id.clone());
                }
                seeded.extend(replacement);
                let seeded = with_id(seeded);
                outcome.upserted_id = seeded.get(ID_FIELD).cloned();
                docs.push(seeded);
            }
            Ok(outcome)
        })
    }

    async fn delete_one(&self, filter: Document) -> ClientResult<DeleteOutcome> {
        self.delete(filter, false)
    }

    async fn delete_many(&self, filter: Document) -> ClientResult<DeleteOutcome> {
        self.delete(filter, true)
    }
}

// ==================== Evaluation ====================

enum Condition {
    Equals(Bson),
    Pattern(Regex),
}

impl Condition {
    /// Arrays match as a whole or when any element matches.
    fn matches(&self, value: &Bson) -> bool {
        let direct = match self {
            Self::Equals(expected) => bson_equal(value, expected),
            Self::Pattern(re) => matches!(value, Bson::String(s) if re.is_match(s)),
        };
        direct || matches!(value, Bson::Array(items) if items.iter().any(|item| self.matches(item)))
    }
}

/// A compiled filter document.
struct Matcher {
    conditions: Vec<(String, Condition)>,
}

impl Matcher {
    fn new(filter: &Document) -> ClientResult<Self> {
        let mut conditions = Vec::with_capacity(filter.len());
        for (field, value) in filter {
            if field.starts_with('$') {
                return Err(format!("unsupported top-level operator '{}'", field).into());
            }
            let condition = match value {
                Bson::Document(operators) if operators.contains_key("$regex") => {
                    Condition::Pattern(compile_regex(operators)?)
                }
                Bson::Document(operators) if operators.keys().any(|k| k.starts_with('$')) => {
                    return Err(format!("unsupported operator in filter on '{}'", field).into());
                }
                other => Condition::Equals(other.clone()),
            };
            conditions.push((field.clone(), condition));
        }
        Ok(Self { conditions })
    }

    fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            match get_path(doc, field) {
                Some(value) => condition.matches(value),
                None => matches!(condition, Condition::Equals(Bson::Null)),
            }
        })
    }

    /// Equality conditions as a document, used to seed upserts.
    fn equality_fields(&self) -> Document {
        self.conditions
            .iter()
            .filter_map(|(field, condition)| match condition {
                Condition::Equals(value) => Some((field.clone(), value.clone())),
                Condition::Pattern(_) => None,
            })
            .collect()
    }
}

fn compile_regex(operators: &Document) -> ClientResult<Regex> {
    let pattern = operators
        .get_str("$regex")
        .map_err(|_| "$regex must be a string")?;
    let flags: String = operators
        .get_str("$options")
        .unwrap_or_default()
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();
    let pattern = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    };
    Regex::new(&pattern).map_err(|e| format!("invalid $regex: {}", e).into())
}

fn set_fields(update: Document) -> ClientResult<Document> {
    let mut set = Document::new();
    for (op, value) in update {
        match (op.as_str(), value) {
            ("$set", Bson::Document(fields)) => set.extend(fields),
            ("$set", _) => return Err("$set requires a document".into()),
            (op, _) if op.starts_with('$') => {
                return Err(format!("unsupported update operator '{}'", op).into());
            }
            _ => return Err("update document must only contain update operators".into()),
        }
    }
    Ok(set)
}

fn with_id(doc: Document) -> Document {
    if doc.contains_key(ID_FIELD) {
        return doc;
    }
    let mut out = Document::new();
    out.insert(ID_FIELD, ObjectId::new());
    out.extend(doc);
    out
}

fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?);
    for part in parts {
        current = match current {
            Some(Bson::Document(inner)) => inner.get(part),
            _ => return None,
        };
    }
    current
}

fn paginate(docs: Vec<Document>, options: &QueryOptions) -> Vec<Document> {
    let skip = options.skip.map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
    let iter = docs.into_iter().skip(skip);
    match options.limit {
        // A zero limit means no limit.
        Some(0) | None => iter.collect(),
        Some(n) => iter.take(usize::try_from(n).unwrap_or(usize::MAX)).collect(),
    }
}

fn project(doc: &Document, projection: &Document) -> Document {
    let include_id = projection.get(ID_FIELD).is_none_or(is_truthy);
    let mut out = Document::new();
    if include_id {
        if let Some(id) = doc.get(ID_FIELD) {
            out.insert(ID_FIELD, id.clone());
        }
    }
    for (field, flag) in projection {
        if field == ID_FIELD || !is_truthy(flag) {
            continue;
        }
        if let Some(value) = doc.get(field) {
            out.insert(field.clone(), value.clone());
        }
    }
    out
}

fn is_truthy(flag: &Bson) -> bool {
    match flag {
        Bson::Boolean(b) => *b,
        other => to_f64(other).is_some_and(|n| n != 0.0),
    }
}

fn sort_keys(sort: &Document) -> ClientResult<Vec<(String, bool)>> {
    sort.iter()
        .map(|(field, direction)| match to_f64(direction) {
            Some(d) if d > 0.0 => Ok((field.clone(), true)),
            Some(d) if d < 0.0 => Ok((field.clone(), false)),
            _ => Err(format!("invalid sort direction for '{}': {}", field, direction).into()),
        })
        .collect()
}

fn compare_docs(a: &Document, b: &Document, keys: &[(String, bool)]) -> Ordering {
    for (field, ascending) in keys {
        let ord = match (get_path(a, field), get_path(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => bson_cmp(x, y),
        };
        if ord != Ordering::Equal {
            return if *ascending { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::float_cmp)]
fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (to_f64(a), to_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Cross-type ordering rank, following the server's comparison order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        _ => 12,
    }
}

fn bson_cmp(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (to_f64(a), to_f64(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn handle(client: &MemoryClient) -> MemoryCollection {
        client.collection_handle("db", "items").unwrap()
    }

    fn titles(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.get_str("title").unwrap()).collect()
    }

    #[test]
    fn test_seed_assigns_ids() {
        let client = MemoryClient::new();
        client.seed("db", "items", [doc! { "title": "a" }, doc! { "_id": 5, "title": "b" }]);

        let docs = client.documents("db", "items");
        assert!(matches!(docs[0].get(ID_FIELD), Some(Bson::ObjectId(_))));
        assert_eq!(docs[1].get_i32(ID_FIELD).unwrap(), 5);
    }

    #[test]
    fn test_clear_removes_collections() {
        let client = MemoryClient::new();
        client.seed("db", "items", [doc! { "title": "a" }]);
        client.seed("db", "other", [doc! { "title": "b" }]);

        client.clone().clear();
        assert!(client.documents("db", "items").is_empty());
        assert!(client.documents("db", "other").is_empty());
    }

    #[tokio::test]
    async fn test_filters_match_array_elements() {
        let client = MemoryClient::new();
        client.seed(
            "db",
            "items",
            [
                doc! { "title": "a", "tags": ["red", "Blue"] },
                doc! { "title": "b", "tags": ["green"] },
                doc! { "title": "c", "tags": "red" },
            ],
        );
        let items = handle(&client);

        let docs = items
            .find(doc! { "tags": "red" }, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(titles(&docs), vec!["a", "c"]);

        let docs = items
            .find(
                doc! { "tags": { "$regex": "^blu", "$options": "i" } },
                QueryOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(titles(&docs), vec!["a"]);

        let docs = items
            .find(doc! { "tags": ["green"] }, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(titles(&docs), vec!["b"]);
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let client = MemoryClient::new();
        assert!(client.collection_handle("db", "").is_err());
    }

    #[tokio::test]
    async fn test_find_with_regex_sort_and_limit() {
        let client = MemoryClient::new();
        client.seed(
            "db",
            "items",
            [
                doc! { "title": "beta" },
                doc! { "title": "Alpha" },
                doc! { "title": "alphabet" },
                doc! { "title": "gamma" },
            ],
        );

        let options = QueryOptions {
            sort: Some(doc! { "title": -1 }),
            limit: Some(2),
            ..QueryOptions::default()
        };
        let docs = handle(&client)
            .find(doc! { "title": { "$regex": "^alpha", "$options": "i" } }, options)
            .await
            .unwrap();

        assert_eq!(titles(&docs), vec!["alphabet", "Alpha"]);
    }

    #[tokio::test]
    async fn test_find_projection_keeps_id() {
        let client = MemoryClient::new();
        client.seed("db", "items", [doc! { "_id": 1, "title": "a", "price": 3 }]);

        let options = QueryOptions {
            projection: Some(doc! { "price": 1 }),
            ..QueryOptions::default()
        };
        let docs = handle(&client).find(doc! {}, options).await.unwrap();
        assert_eq!(docs, vec![doc! { "_id": 1, "price": 3 }]);
    }

    #[tokio::test]
    async fn test_count_honors_skip() {
        let client = MemoryClient::new();
        client.seed("db", "items", (0..5).map(|i| doc! { "n": i }));

        let options = QueryOptions {
            skip: Some(3),
            ..QueryOptions::default()
        };
        assert_eq!(handle(&client).count(doc! {}, options).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_sort_direction() {
        let client = MemoryClient::new();
        let options = QueryOptions {
            sort: Some(doc! { "title": 0 }),
            ..QueryOptions::default()
        };
        assert!(handle(&client).find(doc! {}, options).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let client = MemoryClient::new();
        let items = handle(&client);
        items.insert_one(doc! { "_id": "x" }).await.unwrap();

        let err = items.insert_one(doc! { "_id": "x" }).await.unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
        assert_eq!(client.documents("db", "items").len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let client = MemoryClient::new();
        client.seed("db", "items", [doc! { "_id": 1, "title": "a", "qty": 1 }]);

        let outcome = handle(&client)
            .update_one(doc! { "_id": 1 }, doc! { "$set": { "qty": 2 } }, false)
            .await
            .unwrap();

        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 1);
        assert_eq!(
            client.documents("db", "items"),
            vec![doc! { "_id": 1, "title": "a", "qty": 2 }]
        );
    }

    #[tokio::test]
    async fn test_update_without_change_is_not_modified() {
        let client = MemoryClient::new();
        client.seed("db", "items", [doc! { "_id": 1, "qty": 1 }]);

        let outcome = handle(&client)
            .update_many(doc! {}, doc! { "$set": { "qty": 1 } })
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 0);
    }

    #[tokio::test]
    async fn test_update_requires_operators() {
        let client = MemoryClient::new();
        let err = handle(&client)
            .update_many(doc! {}, doc! { "qty": 1 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("update operators"));
    }

    #[tokio::test]
    async fn test_upsert_seeds_from_filter() {
        let client = MemoryClient::new();
        let outcome = handle(&client)
            .update_one(doc! { "sku": "A1" }, doc! { "$set": { "qty": 4 } }, true)
            .await
            .unwrap();

        assert!(outcome.upserted_id.is_some());
        let docs = client.documents("db", "items");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("sku").unwrap(), "A1");
        assert_eq!(docs[0].get_i32("qty").unwrap(), 4);
    }

    #[tokio::test]
    async fn test_replace_keeps_id() {
        let client = MemoryClient::new();
        client.seed("db", "items", [doc! { "_id": 1, "title": "a", "qty": 1 }]);

        let outcome = handle(&client)
            .replace_one(doc! { "title": "a" }, doc! { "title": "b" }, false)
            .await
            .unwrap();

        assert_eq!(outcome.modified_count, 1);
        assert_eq!(client.documents("db", "items"), vec![doc! { "_id": 1, "title": "b" }]);
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let client = MemoryClient::new();
        client.seed("db", "items", (0..3).map(|_| doc! { "kind": "x" }));
        let items = handle(&client);

        let one = items.delete_one(doc! { "kind": "x" }).await.unwrap();
        assert_eq!(one.deleted_count, 1);

        let rest = items.delete_many(doc! { "kind": "x" }).await.unwrap();
        assert_eq!(rest.deleted_count, 2);
        assert!(client.documents("db", "items").is_empty());
    }

    #[test]
    fn test_bson_ordering() {
        assert_eq!(bson_cmp(&Bson::Int32(2), &Bson::Double(1.5)), Ordering::Greater);
        assert_eq!(
            bson_cmp(&Bson::String("a".into()), &Bson::String("b".into())),
            Ordering::Less
        );
        assert_eq!(bson_cmp(&Bson::Null, &Bson::Int32(0)), Ordering::Less);
    }
}
