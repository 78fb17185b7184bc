//! Canonical record serialization for backup payloads.
//!
//! The serializer produces a versioned JSON payload with records ordered by
//! id ascending. Sensitive field values are replaced with the output of the
//! injected [`FieldCipher`] during serialization; deserialization leaves them
//! encrypted so integrity checking stays separate from decryption.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::FieldCipher;
use crate::error::{Result, VaultError};
use crate::record::Record;

/// Payload format version understood by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    version: u32,
    records: Vec<Record>,
}

/// Converts live records to the canonical backup payload and back.
pub struct RecordSerializer {
    cipher: Arc<dyn FieldCipher>,
}

impl RecordSerializer {
    pub fn new(cipher: Arc<dyn FieldCipher>) -> Self {
        Self { cipher }
    }

    /// Produce the canonical payload bytes for a record sequence.
    ///
    /// Records are sorted by id ascending and sensitive string fields are
    /// encrypted per record. Field encryption runs in parallel across
    /// records.
    pub fn serialize(&self, records: &[Record]) -> Result<Vec<u8>> {
        let mut ordered: Vec<&Record> = records.iter().collect();
        ordered.sort_by_key(|r| r.id);

        let records: Vec<Record> = ordered
            .par_iter()
            .map(|record| self.encrypt_record(record))
            .collect::<Result<_>>()?;

        let payload = Payload {
            version: FORMAT_VERSION,
            records,
        };
        Ok(serde_json::to_vec(&payload)?)
    }

    /// Parse a canonical payload. Sensitive fields stay encrypted; use
    /// [`RecordSerializer::decrypt_records`] to recover plaintext.
    pub fn deserialize(&self, payload: &[u8]) -> Result<Vec<Record>> {
        let payload: Payload = serde_json::from_slice(payload)
            .map_err(|e| VaultError::format(format!("malformed payload: {e}")))?;

        if payload.version != FORMAT_VERSION {
            return Err(VaultError::format(format!(
                "unsupported payload version {} (expected {})",
                payload.version, FORMAT_VERSION
            )));
        }
        Ok(payload.records)
    }

    /// Decrypt every sensitive field of every record. All-or-nothing: the
    /// first failing field fails the whole batch.
    pub fn decrypt_records(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        records
            .into_iter()
            .map(|mut record| {
                for name in record.sensitive.clone() {
                    if let Some(Value::String(ciphertext)) = record.fields.get(&name) {
                        let plaintext = self.cipher.decrypt_field(ciphertext)?;
                        record.fields.insert(name, Value::String(plaintext));
                    }
                }
                Ok(record)
            })
            .collect()
    }

    fn encrypt_record(&self, record: &Record) -> Result<Record> {
        let mut out = record.clone();
        for name in &record.sensitive {
            if let Some(Value::String(plaintext)) = record.fields.get(name) {
                let ciphertext = self.cipher.encrypt_field(plaintext)?;
                out.fields.insert(name.clone(), Value::String(ciphertext));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{ChaChaFieldCipher, EncryptionKey, NoopCipher};
    use crate::record::DataType;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new(7, DataType::UserProfiles, Utc::now())
                .with_field("email", "seller@example.com")
                .with_field("location", "Mumbai")
                .with_default_sensitive(),
            Record::new(3, DataType::Bids, Utc::now())
                .with_field("amount", "1500.00")
                .with_field("item", 42),
        ]
    }

    #[test]
    fn round_trip_with_noop_cipher_is_exact() {
        let serializer = RecordSerializer::new(Arc::new(NoopCipher));
        let records = sample_records();

        let payload = serializer.serialize(&records).unwrap();
        let mut restored = serializer.deserialize(&payload).unwrap();

        let mut expected = records;
        expected.sort_by_key(|r| r.id);
        restored.sort_by_key(|r| r.id);
        assert_eq!(expected, restored);
    }

    #[test]
    fn round_trip_recovers_sensitive_fields_after_decryption() {
        let cipher = Arc::new(ChaChaFieldCipher::new(&EncryptionKey::new([5; 32])));
        let serializer = RecordSerializer::new(cipher);
        let records = sample_records();

        let payload = serializer.serialize(&records).unwrap();
        let encrypted = serializer.deserialize(&payload).unwrap();

        let profile = encrypted
            .iter()
            .find(|r| r.data_type == DataType::UserProfiles)
            .unwrap();
        assert_ne!(
            profile.fields["email"],
            Value::String("seller@example.com".into())
        );

        let decrypted = serializer.decrypt_records(encrypted).unwrap();
        let profile = decrypted
            .iter()
            .find(|r| r.data_type == DataType::UserProfiles)
            .unwrap();
        assert_eq!(
            profile.fields["email"],
            Value::String("seller@example.com".into())
        );
        assert_eq!(profile.fields["location"], Value::String("Mumbai".into()));
    }

    #[test]
    fn records_are_ordered_by_id() {
        let serializer = RecordSerializer::new(Arc::new(NoopCipher));
        let records = sample_records();

        let payload = serializer.serialize(&records).unwrap();
        let restored = serializer.deserialize(&payload).unwrap();

        let ids: Vec<_> = restored.iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn unsupported_version_is_a_format_error() {
        let serializer = RecordSerializer::new(Arc::new(NoopCipher));
        let payload = br#"{"version":99,"records":[]}"#;
        let err = serializer.deserialize(payload).unwrap_err();
        assert!(matches!(err, VaultError::Format { .. }));
    }

    #[test]
    fn malformed_payload_is_a_format_error() {
        let serializer = RecordSerializer::new(Arc::new(NoopCipher));
        let err = serializer.deserialize(b"{not json").unwrap_err();
        assert!(matches!(err, VaultError::Format { .. }));
    }

    #[test]
    fn wrong_key_fails_field_decryption() {
        let records = sample_records();
        let payload = RecordSerializer::new(Arc::new(ChaChaFieldCipher::new(
            &EncryptionKey::new([1; 32]),
        )))
        .serialize(&records)
        .unwrap();

        let other = RecordSerializer::new(Arc::new(ChaChaFieldCipher::new(
            &EncryptionKey::new([2; 32]),
        )));
        let encrypted = other.deserialize(&payload).unwrap();
        assert!(other.decrypt_records(encrypted).is_err());
    }
}
