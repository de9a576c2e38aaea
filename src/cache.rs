/// Cache-aside layer for customer, debt and boleto lookups.
///
/// Entries are JSON strings wrapped with a SHA-256 checksum so a corrupted or
/// tampered entry is discarded and the read falls back to the database. Keys
/// are namespaced per entity (`cliente:`, `dividas:`, `boletos:`) and every
/// mutation invalidates the affected customer's keys.
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

pub fn cliente_key(cpf: &str) -> String {
    format!("cliente:{}", cpf)
}

pub fn dividas_key(cpf: &str) -> String {
    format!("dividas:{}", cpf)
}

pub fn boletos_key(cpf: &str) -> String {
    format!("boletos:{}", cpf)
}

/// Cached payload with an integrity checksum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    /// JSON-serialized payload.
    pub data: String,
    /// SHA-256 of `data`, hex encoded.
    pub checksum: String,
}

impl CacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns the payload only when the checksum still matches.
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: CacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache validation failed: checksum mismatch, entry of {} bytes dropped",
                entry.data.len()
            );
            None
        }
    }
}

/// Checksummed read; a hit with an invalid checksum counts as a miss.
pub async fn get_validated<T: DeserializeOwned>(cache: &Cache<String, String>, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    let data = CacheEntry::deserialize_and_validate(&raw)?;
    match serde_json::from_str(&data) {
        Ok(value) => {
            metrics::counter!("cache_hits_total").increment(1);
            Some(value)
        }
        Err(e) => {
            tracing::warn!("Cache entry for '{}' failed to deserialize: {}", key, e);
            None
        }
    }
}

/// Checksummed write. Serialization failures are logged and skipped; the
/// cache never blocks the request outcome.
pub async fn put_validated<T: Serialize>(cache: &Cache<String, String>, key: String, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => {
            let entry = CacheEntry::new(json);
            cache.insert(key, entry.serialize()).await;
        }
        Err(e) => {
            tracing::warn!("Failed to serialize cache entry for '{}': {}", key, e);
        }
    }
}

/// Drops every cached view of a customer. Called around any mutation that
/// touches the customer's debts or boletos.
pub async fn invalidate_cliente(cache_cliente: &Cache<String, String>, cache_boleto: &Cache<String, String>, cpf: &str) {
    cache_cliente.invalidate(&cliente_key(cpf)).await;
    cache_cliente.invalidate(&dividas_key(cpf)).await;
    cache_boleto.invalidate(&boletos_key(cpf)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trip() {
        let data = r#"{"cpf":"65423511674"}"#.to_string();
        let entry = CacheEntry::new(data.clone());

        assert!(entry.is_valid());
        let serialized = entry.serialize();
        assert_eq!(CacheEntry::deserialize_and_validate(&serialized), Some(data));
    }

    #[test]
    fn tampered_entry_rejected() {
        let entry = CacheEntry::new(r#"{"status":"ativo"}"#.to_string());
        let serialized = entry.serialize();

        let tampered = serialized.replace("ativo", "pago!");
        assert_eq!(CacheEntry::deserialize_and_validate(&tampered), None);
    }

    #[test]
    fn checksum_is_deterministic() {
        let a = CacheEntry::new("abc".to_string());
        let b = CacheEntry::new("abc".to_string());
        assert_eq!(a.checksum, b.checksum);
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(cliente_key("65423511674"), "cliente:65423511674");
        assert_eq!(dividas_key("65423511674"), "dividas:65423511674");
        assert_eq!(boletos_key("65423511674"), "boletos:65423511674");
    }
}
