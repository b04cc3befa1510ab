use crate::error;

/// Index data providers we know how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum IndexSource {
    /// China Securities Index (中证指数).
    Cs,
    /// CNI Index (国证指数).
    Cni,
}

impl IndexSource {
    pub const ALL: [IndexSource; 2] = [IndexSource::Cs, IndexSource::Cni];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexSource::Cs => "cs",
            IndexSource::Cni => "cni",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IndexSource::Cs => "中证指数",
            IndexSource::Cni => "国证指数",
        }
    }
}

impl std::fmt::Display for IndexSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndexSource {
    type Err = error::OverlapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cs" => Ok(IndexSource::Cs),
            "cni" => Ok(IndexSource::Cni),
            other => Err(error::OverlapError::UnsupportedSource(other.to_string())),
        }
    }
}

impl TryFrom<String> for IndexSource {
    type Error = error::OverlapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One index selected by a caller.
///
/// `name` is display text and doubles as the key within a single request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndexRef {
    pub code: String,
    pub name: String,
    pub source: IndexSource,
}

/// Canonical constituent row, identical for every provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConstituentRecord {
    pub stock_code: String,
    pub stock_name: String,
    /// Percentage weight, 0 when the provider left it out.
    pub weight: f64,
}

/// Entry of a provider's index catalogue.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndexListing {
    pub code: String,
    pub short_name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderInfo {
    pub id: IndexSource,
    pub name: &'static str,
}

pub fn providers() -> Vec<ProviderInfo> {
    IndexSource::ALL
        .iter()
        .map(|source| ProviderInfo { id: *source, name: source.display_name() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_sources() {
        assert_eq!("cs".parse::<IndexSource>().unwrap(), IndexSource::Cs);
        assert_eq!("cni".parse::<IndexSource>().unwrap(), IndexSource::Cni);
    }

    #[test]
    fn rejects_unknown_source() {
        let err = "zz".parse::<IndexSource>().unwrap_err();
        assert!(matches!(err, error::OverlapError::UnsupportedSource(ref s) if s == "zz"));
    }

    #[test]
    fn index_ref_deserializes_from_request_json() {
        let parsed: IndexRef =
            serde_json::from_str(r#"{"code":"000300","name":"沪深300","source":"cs"}"#).unwrap();
        assert_eq!(parsed.source, IndexSource::Cs);
        assert_eq!(parsed.code, "000300");

        let bad = serde_json::from_str::<IndexRef>(r#"{"code":"1","name":"x","source":"zz"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn providers_lists_both_sources() {
        let json = serde_json::to_value(providers()).unwrap();
        assert_eq!(json[0]["id"], "cs");
        assert_eq!(json[1]["id"], "cni");
        assert_eq!(json[1]["name"], "国证指数");
    }
}
