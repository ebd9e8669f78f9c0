use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Metadata store backends
///
/// Selected at startup from `METADATA_STORE`. Defined in core because it's
/// used in configuration and by the database crate's factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataStoreKind {
    Postgres,
    Memory,
}

impl FromStr for MetadataStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(MetadataStoreKind::Postgres),
            "memory" => Ok(MetadataStoreKind::Memory),
            _ => Err(anyhow::anyhow!("Invalid metadata store: {}", s)),
        }
    }
}

impl Display for MetadataStoreKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataStoreKind::Postgres => write!(f, "postgres"),
            MetadataStoreKind::Memory => write!(f, "memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_kind() {
        assert_eq!(
            "postgresql".parse::<MetadataStoreKind>().unwrap(),
            MetadataStoreKind::Postgres
        );
        assert_eq!(
            "Memory".parse::<MetadataStoreKind>().unwrap(),
            MetadataStoreKind::Memory
        );
        assert!("mongo".parse::<MetadataStoreKind>().is_err());
    }
}
