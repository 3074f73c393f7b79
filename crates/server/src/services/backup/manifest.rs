//! The `data.json` manifest at the root of every backup archive.
//!
//! Collection keys (`wydania`, `produkty`, ...) are fixed names of this format;
//! records inside them use this server's camelCase field names, so only archives
//! written by this server decode. Records are carried as raw JSON values: the
//! export side serializes typed records into them, the import side decodes them
//! one at a time so a single broken record does not reject the archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Customer, Member, Message, Order, Product, Release, Settings};

/// Manifest format written by this version.
pub const FORMAT_VERSION: &str = "1.0";

/// Value of `metadata.source` in exported archives.
pub const SOURCE: &str = "MP RECORDS";

/// Archive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub source: String,
}

/// Record collections, keyed as in the archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestData {
    pub wydania: Vec<Value>,
    pub produkty: Vec<Value>,
    pub czlonkowie: Vec<Value>,
    pub wiadomosci: Vec<Value>,
    pub zamowienia: Vec<Value>,
    /// Settings singleton; at most one element is used.
    pub ustawienia: Vec<Value>,
    /// Customers, never with a password.
    pub klienci: Vec<Value>,
}

/// A backup manifest.
///
/// `data` is required when reading; `metadata` may be missing from archives
/// produced by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub data: ManifestData,
}

/// Every collection read from the store at export time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub releases: Vec<Release>,
    pub products: Vec<Product>,
    pub members: Vec<Member>,
    pub messages: Vec<Message>,
    pub orders: Vec<Order>,
    pub settings: Option<Settings>,
    pub customers: Vec<Customer>,
}

impl Snapshot {
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.releases.len()
            + self.products.len()
            + self.members.len()
            + self.messages.len()
            + self.orders.len()
            + usize::from(self.settings.is_some())
            + self.customers.len()
    }
}

fn to_values<T: Serialize>(records: &[T]) -> Result<Vec<Value>, serde_json::Error> {
    records.iter().map(serde_json::to_value).collect()
}

impl Manifest {
    /// Build the manifest for `snapshot`, stamped with `exported_at`.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if a record cannot be encoded.
    pub fn from_snapshot(
        snapshot: &Snapshot,
        exported_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            metadata: Some(Metadata {
                export_date: exported_at,
                version: FORMAT_VERSION.to_owned(),
                source: SOURCE.to_owned(),
            }),
            data: ManifestData {
                wydania: to_values(&snapshot.releases)?,
                produkty: to_values(&snapshot.products)?,
                czlonkowie: to_values(&snapshot.members)?,
                wiadomosci: to_values(&snapshot.messages)?,
                zamowienia: to_values(&snapshot.orders)?,
                ustawienia: to_values(snapshot.settings.as_slice())?,
                klienci: to_values(&snapshot.customers)?,
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_snapshot_has_every_collection() {
        let manifest = Manifest::from_snapshot(&Snapshot::default(), Utc::now()).unwrap();
        let value = serde_json::to_value(&manifest).unwrap();

        for key in [
            "wydania",
            "produkty",
            "czlonkowie",
            "wiadomosci",
            "zamowienia",
            "ustawienia",
            "klienci",
        ] {
            assert_eq!(value["data"][key], json!([]), "{key}");
        }
        assert_eq!(value["metadata"]["version"], "1.0");
        assert_eq!(value["metadata"]["source"], "MP RECORDS");
    }

    #[test]
    fn test_data_is_required() {
        let parsed: Result<Manifest, _> = serde_json::from_value(json!({"metadata": null}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let manifest: Manifest =
            serde_json::from_value(json!({"data": {"wydania": [{"title": "x"}]}})).unwrap();
        assert!(manifest.metadata.is_none());
        assert_eq!(manifest.data.wydania.len(), 1);
        assert!(manifest.data.klienci.is_empty());
    }

    #[test]
    fn test_settings_exported_as_single_element() {
        let snapshot = Snapshot {
            settings: Some(Settings::default()),
            ..Snapshot::default()
        };
        let manifest = Manifest::from_snapshot(&snapshot, Utc::now()).unwrap();
        assert_eq!(manifest.data.ustawienia.len(), 1);
        assert_eq!(snapshot.record_count(), 1);
    }
}
