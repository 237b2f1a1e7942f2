//! Field decoders for documents written by many hands over time.
//!
//! The same field shows up as int32, int64, double or a numeric string
//! depending on which script wrote it, so the models accept all of them.

use bson::Bson;
use serde::{Deserialize, Deserializer};

pub fn bson_to_string(value: &Bson) -> Option<String> {
    match value {
        Bson::String(s) => Some(s.clone()),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        Bson::Double(f) => Some(f.to_string()),
        Bson::Boolean(b) => Some(b.to_string()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::DateTime(dt) => dt.try_to_rfc3339_string().ok(),
        _ => None,
    }
}

pub fn bson_to_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.is_finite() => Some(*f as i64),
        Bson::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Bson>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(bson_to_string))
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string(deserializer).map(Option::unwrap_or_default)
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Bson>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(bson_to_i64))
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Bson>::deserialize(deserializer)?;
    Ok(match value {
        Some(Bson::Boolean(b)) => Some(b),
        Some(Bson::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Some(other) => bson_to_i64(&other).map(|n| n != 0),
        None => None,
    })
}

/// Arrays of ids; non-string entries are rendered, anything else is empty.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Bson>::deserialize(deserializer)?;
    Ok(match value {
        Some(Bson::Array(items)) => items.iter().filter_map(bson_to_string).collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "opt_i64")]
        order: Option<i64>,
        #[serde(default, deserialize_with = "opt_string")]
        duration: Option<String>,
        #[serde(default, deserialize_with = "opt_bool")]
        published: Option<bool>,
        #[serde(default, deserialize_with = "string_list")]
        ids: Vec<String>,
    }

    fn decode(d: bson::Document) -> Fields {
        bson::from_document(d).unwrap()
    }

    #[test]
    fn numbers_in_any_encoding() {
        assert_eq!(decode(doc! { "order": 3_i32 }).order, Some(3));
        assert_eq!(decode(doc! { "order": 3_i64 }).order, Some(3));
        assert_eq!(decode(doc! { "order": 3.0 }).order, Some(3));
        assert_eq!(decode(doc! { "order": " 7 " }).order, Some(7));
        assert_eq!(decode(doc! { "order": "first" }).order, None);
        assert_eq!(decode(doc! {}).order, None);
    }

    #[test]
    fn scalars_render_as_text() {
        assert_eq!(decode(doc! { "duration": "3 hours" }).duration.as_deref(), Some("3 hours"));
        assert_eq!(decode(doc! { "duration": 8_i32 }).duration.as_deref(), Some("8"));
        assert_eq!(decode(doc! { "duration": bson::Bson::Null }).duration, None);
    }

    #[test]
    fn booleans_from_strings_and_numbers() {
        assert_eq!(decode(doc! { "published": true }).published, Some(true));
        assert_eq!(decode(doc! { "published": "False" }).published, Some(false));
        assert_eq!(decode(doc! { "published": 1_i32 }).published, Some(true));
    }

    #[test]
    fn id_lists_tolerate_mixed_content() {
        let p = decode(doc! { "ids": ["a", 2_i32, { "x": 1 }] });
        assert_eq!(p.ids, vec!["a".to_string(), "2".to_string()]);
        assert!(decode(doc! { "ids": "not-a-list" }).ids.is_empty());
    }
}
