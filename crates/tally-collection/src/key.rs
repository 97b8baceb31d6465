use std::fmt;

use bson::Bson;

/// Normalized collection key.
///
/// Join-key values arrive as whatever the upstream rows carried — Int32,
/// Int64, Double, String. Keys normalize the way associative-array keys do
/// in the systems this data comes from: integers stay integers, integral
/// doubles and canonical integer strings collapse to `Int`, booleans
/// collapse to 0/1, everything else keeps its string form. This is what
/// lets a parent record with `order_id: 7i32` find a bucket grouped under
/// `7i64` or `"7"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn from_bson(value: &Bson) -> Key {
        match value {
            Bson::Int32(n) => Key::Int(i64::from(*n)),
            Bson::Int64(n) => Key::Int(*n),
            Bson::Double(d)
                if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d <= i64::MAX as f64 =>
            {
                Key::Int(*d as i64)
            }
            Bson::Boolean(b) => Key::Int(i64::from(*b)),
            Bson::String(s) => Key::from(s.as_str()),
            other => Key::Str(other.to_string()),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Key {
        // Only the canonical integer form collapses: "07" stays a string.
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Key::Int(n),
            _ => Key::Str(s.to_string()),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Key {
        Key::from(s.as_str())
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Key {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Key {
        Key::Int(i64::from(n))
    }
}

impl From<&Bson> for Key {
    fn from(value: &Bson) -> Key {
        Key::from_bson(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_forms_collapse() {
        assert_eq!(Key::from_bson(&Bson::Int32(7)), Key::Int(7));
        assert_eq!(Key::from_bson(&Bson::Int64(7)), Key::Int(7));
        assert_eq!(Key::from_bson(&Bson::Double(7.0)), Key::Int(7));
        assert_eq!(Key::from_bson(&Bson::String("7".into())), Key::Int(7));
    }

    #[test]
    fn non_canonical_strings_stay_strings() {
        assert_eq!(Key::from("07"), Key::Str("07".into()));
        assert_eq!(Key::from("7.0"), Key::Str("7.0".into()));
        assert_eq!(Key::from("sku-7"), Key::Str("sku-7".into()));
    }

    #[test]
    fn fractional_doubles_stay_strings() {
        assert!(matches!(Key::from_bson(&Bson::Double(7.5)), Key::Str(_)));
    }

    #[test]
    fn booleans_collapse_to_ints() {
        assert_eq!(Key::from_bson(&Bson::Boolean(true)), Key::Int(1));
        assert_eq!(Key::from_bson(&Bson::Boolean(false)), Key::Int(0));
    }
}
