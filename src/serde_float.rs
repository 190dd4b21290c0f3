//! Serde adapter for scalars that may be non-finite.
//!
//! JSON has no literal for infinities or NaN and `serde_json` writes them as
//! `null`, which does not read back as a float. Fields tagged with
//! `#[serde(with = "optiviz::serde_float")]` write finite values as numbers
//! and non-finite ones as the strings `"Infinity"`, `"-Infinity"` and
//! `"NaN"`. Vectors, matrices and options of scalars are encoded element-wise.
//!
//! Decoding goes through `deserialize_any`, so the adapter needs a
//! self-describing format such as JSON.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// Values that can be written and read through this adapter.
pub trait FloatWire: Sized {
    fn encode<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>;
    fn decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>;
}

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: FloatWire,
    S: Serializer,
{
    value.encode(serializer)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FloatWire,
    D: Deserializer<'de>,
{
    T::decode(deserializer)
}

fn non_finite_tag(v: f64) -> &'static str {
    if v.is_nan() {
        NAN
    } else if v > 0.0 {
        INFINITY
    } else {
        NEG_INFINITY
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a number or one of \"{NAN}\", \"{INFINITY}\", \"{NEG_INFINITY}\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        match v {
            NAN => Ok(f64::NAN),
            INFINITY => Ok(f64::INFINITY),
            NEG_INFINITY => Ok(f64::NEG_INFINITY),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }
}

impl FloatWire for f64 {
    fn encode<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_finite() {
            serializer.serialize_f64(*self)
        } else {
            serializer.serialize_str(non_finite_tag(*self))
        }
    }

    fn decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl FloatWire for f32 {
    fn encode<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_finite() {
            serializer.serialize_f32(*self)
        } else {
            serializer.serialize_str(non_finite_tag(f64::from(*self)))
        }
    }

    fn decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor).map(|v| v as f32)
    }
}

struct Encoded<'a, T>(&'a T);

impl<T: FloatWire> Serialize for Encoded<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.encode(serializer)
    }
}

struct Decoded<T>(T);

impl<'de, T: FloatWire> Deserialize<'de> for Decoded<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::decode(deserializer).map(Decoded)
    }
}

impl<T: FloatWire> FloatWire for Vec<T> {
    fn encode<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for v in self {
            seq.serialize_element(&Encoded(v))?;
        }
        seq.end()
    }

    fn decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<Decoded<T>>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|d| d.0).collect())
    }
}

impl<T: FloatWire> FloatWire for Option<T> {
    fn encode<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Some(v) => serializer.serialize_some(&Encoded(v)),
            None => serializer.serialize_none(),
        }
    }

    fn decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<Decoded<T>>::deserialize(deserializer).map(|o| o.map(|d| d.0))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "crate::serde_float")]
        loss: f64,
        #[serde(with = "crate::serde_float")]
        path: Vec<Vec<f64>>,
        #[serde(with = "crate::serde_float")]
        change: Option<f32>,
    }

    #[test]
    fn non_finite_values_survive_json() {
        let sample = Sample {
            loss: f64::INFINITY,
            path: vec![vec![1.5, f64::NEG_INFINITY], vec![f64::NAN]],
            change: Some(f32::NAN),
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(
            json,
            r#"{"loss":"Infinity","path":[[1.5,"-Infinity"],["NaN"]],"change":"NaN"}"#
        );

        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back.loss, f64::INFINITY);
        assert_eq!(back.path[0], vec![1.5, f64::NEG_INFINITY]);
        assert!(back.path[1][0].is_nan());
        assert!(back.change.is_some_and(f32::is_nan));
    }

    #[test]
    fn finite_values_stay_numbers() {
        let json = r#"{"loss":2,"path":[],"change":null}"#;
        let back: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(back.loss, 2.0);
        assert!(back.path.is_empty());
        assert_eq!(back.change, None);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let json = r#"{"loss":"inf","path":[],"change":null}"#;
        assert!(serde_json::from_str::<Sample>(json).is_err());
    }
}
