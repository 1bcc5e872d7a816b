use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BadgeError, BadgeResult};

/// Upper bound, in bytes, on a badge's metadata location.
pub const MAX_URI_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Timestamp: issuance and revocation instants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds_since_epoch: u64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            seconds_since_epoch: now.timestamp() as u64,
            nanoseconds: now.timestamp_subsec_nanos(),
        }
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            seconds_since_epoch: seconds,
            nanoseconds: 0,
        }
    }

    pub fn to_rfc3339(&self) -> String {
        let dt =
            chrono::DateTime::from_timestamp(self.seconds_since_epoch as i64, self.nanoseconds);
        dt.map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "invalid".to_string())
    }
}

// ---------------------------------------------------------------------------
// Account: 20-byte identity of a caller or holder
// ---------------------------------------------------------------------------

/// A caller or holder identity. The all-zero value is the null account and
/// never holds a badge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Account(pub [u8; 20]);

impl Account {
    pub const NULL: Account = Account([0u8; 20]);

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", self)
    }
}

impl FromStr for Account {
    type Err = BadgeError;

    fn from_str(s: &str) -> BadgeResult<Self> {
        decode_fixed::<20>(s).map(Account).ok_or_else(|| {
            BadgeError::InvalidMetadata(format!("account must be 20 hex-encoded bytes: {:?}", s))
        })
    }
}

impl TryFrom<String> for Account {
    type Error = BadgeError;

    fn try_from(s: String) -> BadgeResult<Self> {
        s.parse()
    }
}

impl From<Account> for String {
    fn from(account: Account) -> Self {
        account.to_string()
    }
}

// ---------------------------------------------------------------------------
// BadgeId: sequential identifier, never reused
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BadgeId(pub u64);

impl BadgeId {
    pub fn initial() -> Self {
        Self(0)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Level: audit quality level, ordered
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Bronze,
    Silver,
    Gold,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Bronze => write!(f, "bronze"),
            Level::Silver => write!(f, "silver"),
            Level::Gold => write!(f, "gold"),
        }
    }
}

impl FromStr for Level {
    type Err = BadgeError;

    fn from_str(s: &str) -> BadgeResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(Level::Bronze),
            "silver" => Ok(Level::Silver),
            "gold" => Ok(Level::Gold),
            other => Err(BadgeError::InvalidMetadata(format!(
                "unknown level '{}'",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportFingerprint: SHA-256 of the audit report content
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportFingerprint(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl ReportFingerprint {
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for ReportFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ReportFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReportFingerprint({})", hex::encode(&self.0[..8]))
    }
}

impl FromStr for ReportFingerprint {
    type Err = BadgeError;

    fn from_str(s: &str) -> BadgeResult<Self> {
        decode_fixed::<32>(s).map(ReportFingerprint).ok_or_else(|| {
            BadgeError::InvalidMetadata("fingerprint must be 32 hex-encoded bytes".into())
        })
    }
}

// ---------------------------------------------------------------------------
// MetadataUri: bounded, non-empty pointer to off-system report storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetadataUri(String);

impl MetadataUri {
    pub fn new(uri: impl Into<String>) -> BadgeResult<Self> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(BadgeError::InvalidMetadata("uri must not be empty".into()));
        }
        if uri.len() > MAX_URI_LEN {
            return Err(BadgeError::InvalidMetadata(format!(
                "uri is {} bytes, limit is {}",
                uri.len(),
                MAX_URI_LEN
            )));
        }
        Ok(Self(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetadataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MetadataUri {
    type Error = BadgeError;

    fn try_from(s: String) -> BadgeResult<Self> {
        Self::new(s)
    }
}

impl From<MetadataUri> for String {
    fn from(uri: MetadataUri) -> Self {
        uri.0
    }
}

// ---------------------------------------------------------------------------
// Role: the two capability sets consulted on mutation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lifecycle governance: administrative revocation, role management.
    Administrator,
    /// Authorized to mint badges.
    Issuer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "administrator"),
            Role::Issuer => write!(f, "issuer"),
        }
    }
}

// ---------------------------------------------------------------------------
// CapabilityId: 4-byte interface marker for interoperability discovery
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityId(pub [u8; 4]);

impl CapabilityId {
    /// Interface introspection itself.
    pub const INTROSPECTION: CapabilityId = CapabilityId([0x01, 0xff, 0xc9, 0xa7]);
    /// Ownership bookkeeping (holder lookup, transfer, approvals).
    pub const OWNERSHIP: CapabilityId = CapabilityId([0x80, 0xac, 0x58, 0xcd]);
    /// Per-token metadata location.
    pub const OWNERSHIP_METADATA: CapabilityId = CapabilityId([0x5b, 0x5e, 0x13, 0x9f]);
    /// Role-based access control.
    pub const ROLE_REGISTRY: CapabilityId = CapabilityId([0x79, 0x65, 0xdb, 0x0b]);
    /// Minimal soulbound marker: every token reports itself locked.
    pub const SOULBOUND: CapabilityId = CapabilityId([0xb4, 0x5a, 0x3c, 0x0e]);
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self)
    }
}

impl FromStr for CapabilityId {
    type Err = BadgeError;

    fn from_str(s: &str) -> BadgeResult<Self> {
        decode_fixed::<4>(s).map(CapabilityId).ok_or_else(|| {
            BadgeError::InvalidMetadata("capability id must be 4 hex-encoded bytes".into())
        })
    }
}

impl TryFrom<String> for CapabilityId {
    type Error = BadgeError;

    fn try_from(s: String) -> BadgeResult<Self> {
        s.parse()
    }
}

impl From<CapabilityId> for String {
    fn from(id: CapabilityId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// DelegationScope: what an approval request would have granted
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationScope {
    /// Approve one account to act on a single badge.
    Single(BadgeId),
    /// Approve an operator for every badge of the owner.
    AllOf { owner: Account, approved: bool },
}

// ---------------------------------------------------------------------------
// EventHash: hash of a lifecycle event entry (for chain integrity)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventHash(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Decode hex, with or without a `0x` prefix, into a fixed-size array.
fn decode_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).ok()?;
    bytes.try_into().ok()
}

// ---------------------------------------------------------------------------
// Hex serialization helper for fixed-size byte arrays
// ---------------------------------------------------------------------------

mod hex_bytes {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {} bytes", N)))
    }
}
