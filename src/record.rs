//! Domain records eligible for backup.
//!
//! A [`Record`] is the generic unit the engine moves: it carries ownership
//! (for user-scoped backups), a data-type tag (for retention policy lookup),
//! a last-modified timestamp (for incremental selection), and the names of
//! its sensitive fields (subject to field-level encryption).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier of the account a record belongs to.
pub type OwnerId = u64;

/// Closed set of data-type categories covered by retention policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    UserProfiles,
    AuctionItems,
    Bids,
    Payments,
    Orders,
    WalletTransactions,
    LedgerBlocks,
    AuctionParticipants,
}

impl DataType {
    /// Every category, in a stable order.
    pub const ALL: [DataType; 8] = [
        DataType::UserProfiles,
        DataType::AuctionItems,
        DataType::Bids,
        DataType::Payments,
        DataType::Orders,
        DataType::WalletTransactions,
        DataType::LedgerBlocks,
        DataType::AuctionParticipants,
    ];

    /// Stable tag used in artifact names and policy configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            DataType::UserProfiles => "user_profiles",
            DataType::AuctionItems => "auction_items",
            DataType::Bids => "bids",
            DataType::Payments => "payments",
            DataType::Orders => "orders",
            DataType::WalletTransactions => "wallet_transactions",
            DataType::LedgerBlocks => "ledger_blocks",
            DataType::AuctionParticipants => "auction_participants",
        }
    }

    pub fn parse_tag(tag: &str) -> Option<DataType> {
        DataType::ALL.into_iter().find(|dt| dt.tag() == tag)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Field names encrypted by default on profile-bearing records.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "email",
    "phone",
    "bank_account_number",
    "upi_vpa",
    "bank_holder_name",
    "bank_ifsc",
];

/// A domain entity eligible for backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub owner: OwnerId,
    pub data_type: DataType,
    pub last_modified: DateTime<Utc>,
    /// Field values keyed by name. BTreeMap keeps serialization canonical.
    pub fields: BTreeMap<String, Value>,
    /// Names of fields whose values are encrypted in backup payloads.
    pub sensitive: BTreeSet<String>,
}

impl Record {
    pub fn new(owner: OwnerId, data_type: DataType, last_modified: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            data_type,
            last_modified,
            fields: BTreeMap::new(),
            sensitive: BTreeSet::new(),
        }
    }

    /// Set a field value, builder style.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Flag a field as sensitive, builder style.
    pub fn with_sensitive(mut self, name: &str) -> Self {
        self.sensitive.insert(name.to_string());
        self
    }

    /// Flag the default sensitive fields that are present on this record.
    pub fn with_default_sensitive(mut self) -> Self {
        for name in DEFAULT_SENSITIVE_FIELDS {
            if self.fields.contains_key(*name) {
                self.sensitive.insert((*name).to_string());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for dt in DataType::ALL {
            assert_eq!(DataType::parse_tag(dt.tag()), Some(dt));
        }
        assert_eq!(DataType::parse_tag("unknown"), None);
    }

    #[test]
    fn default_sensitive_only_flags_present_fields() {
        let record = Record::new(1, DataType::UserProfiles, Utc::now())
            .with_field("email", "a@b.example")
            .with_field("location", "Pune")
            .with_default_sensitive();

        assert!(record.sensitive.contains("email"));
        assert!(!record.sensitive.contains("phone"));
        assert!(!record.sensitive.contains("location"));
    }
}
