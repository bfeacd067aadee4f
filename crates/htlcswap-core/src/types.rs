use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Seconds since the UNIX epoch.
pub type Timestamp = i64;

/// Unique identifier for a swap offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(pub Uuid);

impl SwapId {
    /// Create a new swap ID (UUID v7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SwapId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SwapId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::ValidationError(format!("invalid swap id '{}': {}", s, e)))
    }
}

/// Asset identifier (e.g. `btc`, `depix`).
///
/// Always stored lower-case and trimmed so that `BTC` and `btc` name the
/// same asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Normalise and validate an asset identifier.
    pub fn new(code: &str) -> Result<Self, CoreError> {
        let normalised = code.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(CoreError::ValidationError("asset identifier must not be empty".into()));
        }
        if !normalised
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::ValidationError(format!(
                "asset identifier contains invalid characters: {}",
                code
            )));
        }
        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AssetId::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A ledger address. Opaque to the engine; only emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::ValidationError("address must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a transaction on an external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl TxRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 commitment to a swap secret. Both legs of a swap share it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hashlock(pub [u8; 32]);

impl Hashlock {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidHex(format!("hashlock must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hashlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hashlock({})", self.to_hex())
    }
}

impl fmt::Display for Hashlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hashlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hashlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Hashlock::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// The party performing an operation on a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The party that created the offer and locks first.
    #[default]
    Initiator,
    /// The party that accepted the offer and locks second.
    Acceptor,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => write!(f, "initiator"),
            Self::Acceptor => write!(f, "acceptor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_id_unique() {
        assert_ne!(SwapId::new(), SwapId::new());
    }

    #[test]
    fn test_swap_id_parse() {
        let id = SwapId::new();
        let parsed: SwapId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<SwapId>().is_err());
    }

    #[test]
    fn test_asset_id_normalised() {
        let a = AssetId::new("  BTC ").unwrap();
        assert_eq!(a.as_str(), "btc");
        assert_eq!(a, AssetId::new("btc").unwrap());
    }

    #[test]
    fn test_asset_id_rejects_empty_and_garbage() {
        assert!(AssetId::new("").is_err());
        assert!(AssetId::new("   ").is_err());
        assert!(AssetId::new("b tc").is_err());
    }

    #[test]
    fn test_address_rejects_blank() {
        assert!(Address::new("").is_err());
        assert!(Address::new("  ").is_err());
        assert_eq!(Address::new(" tb1qxyz ").unwrap().as_str(), "tb1qxyz");
    }

    #[test]
    fn test_address_deserialize_validates() {
        let ok: Result<Address, _> = serde_json::from_str("\"addrA\"");
        assert!(ok.is_ok());
        let bad: Result<Address, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_hashlock_hex() {
        let h = Hashlock([0xab; 32]);
        let hex = h.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Hashlock::from_hex(&hex).unwrap(), h);
        assert!(Hashlock::from_hex("abcd").is_err());
        assert!(Hashlock::from_hex("zz").is_err());
    }

    #[test]
    fn test_hashlock_serializes_as_hex_string() {
        let h = Hashlock([1; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
    }

    #[test]
    fn test_actor_default_and_serde() {
        assert_eq!(Actor::default(), Actor::Initiator);
        let a: Actor = serde_json::from_str("\"acceptor\"").unwrap();
        assert_eq!(a, Actor::Acceptor);
    }
}
