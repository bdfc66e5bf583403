//! Normalization of documents returned by the client.

use bson::{Bson, Document};

/// Default identity field name.
pub const DEFAULT_IDENTITY_FIELD: &str = "_id";

/// Rewrite every wrapped identity value in `doc` to a plain string.
///
/// The document is walked recursively, so identity fields inside nested
/// documents and arrays are flattened too. A value is considered wrapped when
/// it is a native ObjectId or an extended-JSON `{ "$oid": "<hex>" }` document.
///
/// ```rust
/// use bson::{doc, oid::ObjectId};
/// use docquery_core::normalize_identity;
///
/// let oid = ObjectId::new();
/// let doc = normalize_identity(doc! { "_id": oid, "name": "Widget" }, "_id");
/// assert_eq!(doc.get_str("_id").unwrap(), oid.to_hex());
/// ```
pub fn normalize_identity(doc: Document, identity_field: &str) -> Document {
    doc.into_iter()
        .map(|(key, value)| {
            let value = if key == identity_field {
                unwrap_identity(value, identity_field)
            } else {
                normalize_value(value, identity_field)
            };
            (key, value)
        })
        .collect()
}

fn normalize_value(value: Bson, identity_field: &str) -> Bson {
    match value {
        Bson::Document(doc) => Bson::Document(normalize_identity(doc, identity_field)),
        Bson::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(|item| normalize_value(item, identity_field))
                .collect(),
        ),
        other => other,
    }
}

fn unwrap_identity(value: Bson, identity_field: &str) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Document(doc) => match extended_oid(&doc) {
            Some(hex) => Bson::String(hex.to_string()),
            None => Bson::Document(normalize_identity(doc, identity_field)),
        },
        Bson::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(|item| unwrap_identity(item, identity_field))
                .collect(),
        ),
        other => other,
    }
}

fn extended_oid(doc: &Document) -> Option<&str> {
    if doc.len() != 1 {
        return None;
    }
    doc.get_str("$oid").ok()
}

/// Render a native id as a plain string.
pub fn identity_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Document(doc) => match extended_oid(doc) {
            Some(hex) => hex.to_string(),
            None => doc.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_level_identity_flattened() {
        let oid = ObjectId::new();
        let doc = normalize_identity(doc! { "_id": oid, "title": "Gadget" }, "_id");
        assert_eq!(doc, doc! { "_id": oid.to_hex(), "title": "Gadget" });
    }

    #[test]
    fn test_nested_identity_flattened() {
        let outer = ObjectId::new();
        let inner = ObjectId::new();
        let tag = ObjectId::new();
        let doc = doc! {
            "_id": outer,
            "owner": { "_id": inner, "name": "Ada" },
            "tags": [ { "_id": tag } ]
        };

        let normalized = normalize_identity(doc, "_id");
        assert_eq!(
            normalized,
            doc! {
                "_id": outer.to_hex(),
                "owner": { "_id": inner.to_hex(), "name": "Ada" },
                "tags": [ { "_id": tag.to_hex() } ]
            }
        );
    }

    #[test]
    fn test_extended_json_identity_flattened() {
        let doc = doc! { "_id": { "$oid": "507f1f77bcf86cd799439011" } };
        let normalized = normalize_identity(doc, "_id");
        assert_eq!(normalized.get_str("_id").unwrap(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn test_non_identity_object_ids_untouched() {
        let reference = ObjectId::new();
        let doc = doc! { "_id": "already-plain", "author": reference };
        let normalized = normalize_identity(doc.clone(), "_id");
        assert_eq!(normalized, doc);
    }

    #[test]
    fn test_custom_identity_field() {
        let oid = ObjectId::new();
        let doc = normalize_identity(doc! { "uid": oid, "_id": 7 }, "uid");
        assert_eq!(doc.get_str("uid").unwrap(), oid.to_hex());
        assert_eq!(doc.get_i32("_id").unwrap(), 7);
    }

    #[test]
    fn test_identity_to_string() {
        let oid = ObjectId::new();
        assert_eq!(identity_to_string(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(identity_to_string(&Bson::String("abc".into())), "abc");
        assert_eq!(identity_to_string(&Bson::Int32(42)), "42");
    }
}
