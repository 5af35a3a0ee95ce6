use arcstr::ArcStr;
use ontol_runtime::{value::Value, FnvIndexMap};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize,
};

/// The materialized response data, keys in selection order.
#[derive(Clone, PartialEq, Debug)]
pub enum ResultNode {
    Null,
    Scalar(Value),
    List(Vec<ResultNode>),
    Object(FnvIndexMap<ArcStr, ResultNode>),
}

impl ResultNode {
    pub fn object(entries: impl IntoIterator<Item = (ArcStr, ResultNode)>) -> Self {
        Self::Object(entries.into_iter().collect())
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Scalar(value) => value.into(),
            Self::List(items) => items.iter().map(ResultNode::to_json).collect(),
            Self::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, node)| (key.to_string(), node.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for ResultNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            value => Self::Scalar(value),
        }
    }
}

impl Serialize for ResultNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Scalar(value) => value.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut ser_map = serializer.serialize_map(Some(map.len()))?;
                for (key, node) in map {
                    ser_map.serialize_entry(key.as_str(), node)?;
                }
                ser_map.end()
            }
        }
    }
}
