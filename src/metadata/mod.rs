use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

mod fetcher;

pub use fetcher::MetadataFetcher;

/// Metadata document an NFT's token URI points at. The document is
/// untrusted: missing or mistyped fields come through as empty values
/// instead of failing the whole parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: String,
    /// Display order is document order; duplicates are kept
    #[serde(default, deserialize_with = "lenient_attributes")]
    pub attributes: Vec<NftAttribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    #[serde(default)]
    pub trait_type: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Number(serde_json::Number),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{s}"),
            AttributeValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for NftAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.trait_type, self.value)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(s),
        _ => Ok(String::new()),
    }
}

// Entries that are not {trait_type, value} objects with a string or numeric
// value are skipped rather than discarding the whole document.
fn lenient_attributes<'de, D>(deserializer: D) -> Result<Vec<NftAttribute>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<NftAttribute>(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Source of metadata for listings. Implementations must never fail: any
/// problem resolving a document is reported as `None`.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Whether `uri` is a token URI this source resolves.
    fn accepts(&self, uri: &str) -> bool;

    async fn fetch_metadata(&self, uri: &str) -> Option<NftMetadata>;
}
