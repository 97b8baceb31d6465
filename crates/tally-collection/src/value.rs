use std::cmp::Ordering;

use bson::Bson;

/// Read a named field out of a record.
///
/// Records are documents; attached relation buckets are arrays, which
/// accept a numeric name so `pluck("0")` can drill into them. One code
/// path for every record shape.
pub(crate) fn field<'a>(record: &'a Bson, name: &str) -> Option<&'a Bson> {
    match record {
        Bson::Document(doc) => doc.get(name),
        Bson::Array(arr) => name.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    }
}

/// Loose equality for `where_eq`: compatible scalar types compare across
/// type boundaries, so `1i32`, `1i64` and `"1"` all match each other.
/// Incompatible types are silently excluded.
pub(crate) fn loose_eq(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        // ── Direct type matches ─────────────────────────────────
        (Bson::String(x), Bson::String(y)) => x == y,
        (Bson::Int32(x), Bson::Int32(y)) => x == y,
        (Bson::Int64(x), Bson::Int64(y)) => x == y,
        (Bson::Double(x), Bson::Double(y)) => x == y,
        (Bson::Boolean(x), Bson::Boolean(y)) => x == y,
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis() == y.timestamp_millis()
        }
        (Bson::Null, Bson::Null) => true,

        // ── Numeric widening ────────────────────────────────────
        (Bson::Int32(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Int32(x)) => {
            i64::from(*x) == *y
        }
        (Bson::Int32(x), Bson::Double(y)) | (Bson::Double(y), Bson::Int32(x)) => {
            f64::from(*x) == *y
        }
        (Bson::Int64(x), Bson::Double(y)) | (Bson::Double(y), Bson::Int64(x)) => {
            *x as f64 == *y
        }

        // ── String ↔ number coercion ────────────────────────────
        (Bson::String(s), Bson::Int32(n)) | (Bson::Int32(n), Bson::String(s)) => {
            s.parse::<i64>().is_ok_and(|v| v == i64::from(*n))
        }
        (Bson::String(s), Bson::Int64(n)) | (Bson::Int64(n), Bson::String(s)) => {
            s.parse::<i64>().is_ok_and(|v| v == *n)
        }
        (Bson::String(s), Bson::Double(d)) | (Bson::Double(d), Bson::String(s)) => {
            s.parse::<f64>().is_ok_and(|v| v == *d)
        }
        (Bson::String(s), Bson::Boolean(b)) | (Bson::Boolean(b), Bson::String(s)) => {
            match s.as_str() {
                "true" => *b,
                "false" => !*b,
                _ => false,
            }
        }

        // ── Incompatible types: silent exclusion ────────────────
        _ => false,
    }
}

/// Cross-type ordering for `order_by`. Missing fields sort first.
pub(crate) fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            // Numbers sort before non-numeric values.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(d) => Some(*d),
        Bson::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Numeric coercion for `sum`: numbers pass through, numeric strings
/// parse, everything else counts as zero.
pub(crate) fn numeric(value: &Bson) -> f64 {
    match value {
        Bson::Boolean(b) => f64::from(u8::from(*b)),
        other => as_number(other).unwrap_or(0.0),
    }
}
