//! Filter comparators and per-field predicates.

use std::fmt;

use bson::{Bson, doc, oid::ObjectId};

use crate::error::{QueryError, QueryResult};

/// Comparator accepted by [`QueryBuilder::filter`](crate::QueryBuilder::filter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparator {
    /// Exact match.
    #[default]
    Eq,
    /// Case-insensitive prefix match.
    Starts,
    /// Case-insensitive suffix match.
    Ends,
    /// Case-insensitive substring match.
    Contains,
}

impl Comparator {
    /// Parse a comparator name.
    ///
    /// Names are matched case-insensitively. Unrecognized names fall back to
    /// [`Comparator::Eq`].
    ///
    /// ```rust
    /// use docquery_core::Comparator;
    ///
    /// assert_eq!(Comparator::parse("starts"), Comparator::Starts);
    /// assert_eq!(Comparator::parse("LIKE"), Comparator::Eq);
    /// ```
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "STARTS" => Self::Starts,
            "ENDS" => Self::Ends,
            "CONTAINS" => Self::Contains,
            _ => Self::Eq,
        }
    }

    /// Get the canonical name of the comparator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Starts => "STARTS",
            Self::Ends => "ENDS",
            Self::Contains => "CONTAINS",
        }
    }
}

impl From<&str> for Comparator {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Field equals the value.
    Eq(String),
    /// Field starts with the value, ignoring case.
    StartsWith(String),
    /// Field ends with the value, ignoring case.
    EndsWith(String),
    /// Field contains the value, ignoring case.
    Contains(String),
}

impl Predicate {
    /// Build a predicate from a comparator and a value.
    pub fn new(comparator: Comparator, value: impl Into<String>) -> Self {
        let value = value.into();
        match comparator {
            Comparator::Eq => Self::Eq(value),
            Comparator::Starts => Self::StartsWith(value),
            Comparator::Ends => Self::EndsWith(value),
            Comparator::Contains => Self::Contains(value),
        }
    }

    /// Get the comparator this predicate was built with.
    pub fn comparator(&self) -> Comparator {
        match self {
            Self::Eq(_) => Comparator::Eq,
            Self::StartsWith(_) => Comparator::Starts,
            Self::EndsWith(_) => Comparator::Ends,
            Self::Contains(_) => Comparator::Contains,
        }
    }

    /// Get the raw value of the predicate.
    pub fn value(&self) -> &str {
        match self {
            Self::Eq(v) | Self::StartsWith(v) | Self::EndsWith(v) | Self::Contains(v) => v,
        }
    }

    /// Compile the predicate into the BSON condition for `field`.
    ///
    /// Equality on the identity field is converted to an [`ObjectId`].
    /// Pattern values are regex-escaped before anchoring, so `"W.dget"`
    /// matches a literal dot rather than any character.
    pub fn to_bson(&self, field: &str, identity_field: &str) -> QueryResult<Bson> {
        let condition = match self {
            Self::Eq(value) if field == identity_field => {
                let oid = ObjectId::parse_str(value)
                    .map_err(|e| QueryError::conversion(field, value.as_str(), e))?;
                Bson::ObjectId(oid)
            }
            Self::Eq(value) => Bson::String(value.clone()),
            Self::StartsWith(value) => regex_condition(format!("^{}", regex_lite::escape(value))),
            Self::EndsWith(value) => regex_condition(format!("{}$", regex_lite::escape(value))),
            Self::Contains(value) => regex_condition(regex_lite::escape(value)),
        };
        Ok(condition)
    }
}

fn regex_condition(pattern: String) -> Bson {
    Bson::Document(doc! { "$regex": pattern, "$options": "i" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_parse() {
        assert_eq!(Comparator::parse("EQ"), Comparator::Eq);
        assert_eq!(Comparator::parse("STARTS"), Comparator::Starts);
        assert_eq!(Comparator::parse("ends"), Comparator::Ends);
        assert_eq!(Comparator::parse(" Contains "), Comparator::Contains);
    }

    #[test]
    fn test_comparator_unknown_falls_back_to_eq() {
        assert_eq!(Comparator::parse("GT"), Comparator::Eq);
        assert_eq!(Comparator::from(""), Comparator::Eq);
    }

    #[test]
    fn test_predicate_new() {
        let pred = Predicate::new(Comparator::Ends, "son");
        assert_eq!(pred, Predicate::EndsWith("son".to_string()));
        assert_eq!(pred.comparator(), Comparator::Ends);
        assert_eq!(pred.value(), "son");
    }

    #[test]
    fn test_eq_compiles_to_literal() {
        let pred = Predicate::Eq("active".to_string());
        assert_eq!(
            pred.to_bson("status", "_id").unwrap(),
            Bson::String("active".to_string())
        );
    }

    #[test]
    fn test_eq_on_identity_field_converts() {
        let oid = ObjectId::new();
        let pred = Predicate::Eq(oid.to_hex());
        assert_eq!(pred.to_bson("_id", "_id").unwrap(), Bson::ObjectId(oid));
    }

    #[test]
    fn test_eq_on_identity_field_rejects_bad_literal() {
        let pred = Predicate::Eq("not-an-id".to_string());
        let err = pred.to_bson("_id", "_id").unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_pattern_predicates() {
        let starts = Predicate::StartsWith("Wid".to_string()).to_bson("title", "_id").unwrap();
        assert_eq!(starts, Bson::Document(doc! { "$regex": "^Wid", "$options": "i" }));

        let ends = Predicate::EndsWith("get".to_string()).to_bson("title", "_id").unwrap();
        assert_eq!(ends, Bson::Document(doc! { "$regex": "get$", "$options": "i" }));

        let contains = Predicate::Contains("dge".to_string()).to_bson("title", "_id").unwrap();
        assert_eq!(contains, Bson::Document(doc! { "$regex": "dge", "$options": "i" }));
    }

    #[test]
    fn test_pattern_escapes_metacharacters() {
        let pred = Predicate::Contains("1.5".to_string());
        let bson = pred.to_bson("version", "_id").unwrap();
        let doc = bson.as_document().unwrap();
        assert_eq!(doc.get_str("$regex").unwrap(), r"1\.5");
    }

    #[test]
    fn test_pattern_on_identity_field_is_not_converted() {
        let pred = Predicate::StartsWith("abc".to_string());
        assert!(pred.to_bson("_id", "_id").is_ok());
    }
}
