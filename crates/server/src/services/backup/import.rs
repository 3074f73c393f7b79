//! Archive import.
//!
//! The archive is opened in memory on the blocking pool. The manifest is
//! decoded before anything touches the disk; then every `uploads/` entry is
//! written below the upload directory. Records are applied collection by
//! collection, each matched to existing records through its natural key:
//!
//! | Collection | Natural key |
//! |------------|-------------|
//! | releases   | title       |
//! | products   | name        |
//! | members    | nickname    |
//! | customers  | email       |
//! | orders     | order number|
//!
//! Messages have no natural key and are always inserted. Settings are always
//! overwritten. A failing record is logged and counted, never fatal.
//!
//! Ids from the archive are not reused: inserted records get fresh ids and
//! replaced records keep the id already stored. References from customer carts
//! and orders to products and customers are rewritten to the stored ids.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use zip::ZipArchive;
use zip::result::ZipError;

use mp_records_core::{
    CustomerId, MemberId, MessageId, OrderId, OrderNumber, ProductId, ReleaseId,
};

use super::manifest::{Manifest, ManifestData, Metadata};
use super::{BackupError, MANIFEST_NAME, UPLOADS_PREFIX};
use crate::db::{RepositoryError, Store};
use crate::models::{
    Customer, Member, Message, Order, Product, Release, Settings, ValidationError,
};

/// Outcome counters for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub processed: u64,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Outcome counters for a whole import, keyed like the manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub wydania: CollectionStats,
    pub produkty: CollectionStats,
    pub czlonkowie: CollectionStats,
    pub wiadomosci: CollectionStats,
    pub zamowienia: CollectionStats,
    pub ustawienia: CollectionStats,
    pub klienci: CollectionStats,
    /// Upload files written to disk.
    pub files: u64,
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub stats: ImportStats,
    pub metadata: Option<Metadata>,
}

/// Why a single record was not applied.
#[derive(Debug, Error)]
enum RecordError {
    #[error("undecodable record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

enum Outcome {
    Inserted,
    Updated,
    Skipped,
}

impl CollectionStats {
    const fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Archive ids mapped to the ids they were stored under.
#[derive(Debug, Default)]
struct IdMap {
    products: HashMap<ProductId, ProductId>,
    customers: HashMap<CustomerId, CustomerId>,
}

impl IdMap {
    fn product(&self, id: ProductId) -> ProductId {
        self.products.get(&id).copied().unwrap_or(id)
    }

    fn customer(&self, id: CustomerId) -> CustomerId {
        self.customers.get(&id).copied().unwrap_or(id)
    }
}

/// How one collection is matched and written during import.
#[async_trait]
trait NaturalKey {
    type Record: DeserializeOwned + Send + Sync;
    type Id: Copy + Send + Sync;

    const COLLECTION: &'static str;

    fn key(record: &Self::Record) -> String;
    fn id(record: &Self::Record) -> Self::Id;
    fn set_id(record: &mut Self::Record, id: Self::Id);
    fn new_id() -> Self::Id;
    fn validate(record: &Self::Record) -> Result<(), ValidationError>;

    /// Rewrite references to records imported earlier.
    fn resolve(_record: &mut Self::Record, _ids: &IdMap) {}

    /// Remember which stored id an archive id ended up as.
    fn link(_ids: &mut IdMap, _archived: Self::Id, _stored: Self::Id) {}

    async fn find(store: &dyn Store, key: &str) -> Result<Option<Self::Record>, RepositoryError>;
    async fn insert(store: &dyn Store, record: &Self::Record) -> Result<(), RepositoryError>;
    async fn replace(store: &dyn Store, record: &Self::Record) -> Result<(), RepositoryError>;
}

struct Releases;
struct Products;
struct Members;
struct Customers;
struct Orders;

#[async_trait]
impl NaturalKey for Releases {
    type Record = Release;
    type Id = ReleaseId;
    const COLLECTION: &'static str = "wydania";

    fn key(record: &Release) -> String {
        record.title.clone()
    }
    fn id(record: &Release) -> ReleaseId {
        record.id
    }
    fn set_id(record: &mut Release, id: ReleaseId) {
        record.id = id;
    }
    fn new_id() -> ReleaseId {
        ReleaseId::new()
    }
    fn validate(record: &Release) -> Result<(), ValidationError> {
        record.validate()
    }

    async fn find(store: &dyn Store, key: &str) -> Result<Option<Release>, RepositoryError> {
        store.find_release_by_title(key).await
    }
    async fn insert(store: &dyn Store, record: &Release) -> Result<(), RepositoryError> {
        store.insert_release(record).await
    }
    async fn replace(store: &dyn Store, record: &Release) -> Result<(), RepositoryError> {
        store.update_release(record).await
    }
}

#[async_trait]
impl NaturalKey for Products {
    type Record = Product;
    type Id = ProductId;
    const COLLECTION: &'static str = "produkty";

    fn key(record: &Product) -> String {
        record.name.clone()
    }
    fn id(record: &Product) -> ProductId {
        record.id
    }
    fn set_id(record: &mut Product, id: ProductId) {
        record.id = id;
    }
    fn new_id() -> ProductId {
        ProductId::new()
    }
    fn validate(record: &Product) -> Result<(), ValidationError> {
        record.validate()
    }
    fn link(ids: &mut IdMap, archived: ProductId, stored: ProductId) {
        ids.products.insert(archived, stored);
    }

    async fn find(store: &dyn Store, key: &str) -> Result<Option<Product>, RepositoryError> {
        store.find_product_by_name(key).await
    }
    async fn insert(store: &dyn Store, record: &Product) -> Result<(), RepositoryError> {
        store.insert_product(record).await
    }
    async fn replace(store: &dyn Store, record: &Product) -> Result<(), RepositoryError> {
        store.update_product(record).await
    }
}

#[async_trait]
impl NaturalKey for Members {
    type Record = Member;
    type Id = MemberId;
    const COLLECTION: &'static str = "czlonkowie";

    fn key(record: &Member) -> String {
        record.nickname.clone()
    }
    fn id(record: &Member) -> MemberId {
        record.id
    }
    fn set_id(record: &mut Member, id: MemberId) {
        record.id = id;
    }
    fn new_id() -> MemberId {
        MemberId::new()
    }
    fn validate(record: &Member) -> Result<(), ValidationError> {
        record.validate()
    }

    async fn find(store: &dyn Store, key: &str) -> Result<Option<Member>, RepositoryError> {
        store.find_member_by_nickname(key).await
    }
    async fn insert(store: &dyn Store, record: &Member) -> Result<(), RepositoryError> {
        store.insert_member(record).await
    }
    async fn replace(store: &dyn Store, record: &Member) -> Result<(), RepositoryError> {
        store.update_member(record).await
    }
}

#[async_trait]
impl NaturalKey for Customers {
    type Record = Customer;
    type Id = CustomerId;
    const COLLECTION: &'static str = "klienci";

    fn key(record: &Customer) -> String {
        record.email.as_str().to_owned()
    }
    fn id(record: &Customer) -> CustomerId {
        record.id
    }
    fn set_id(record: &mut Customer, id: CustomerId) {
        record.id = id;
    }
    fn new_id() -> CustomerId {
        CustomerId::new()
    }
    fn validate(record: &Customer) -> Result<(), ValidationError> {
        record.validate()
    }
    fn resolve(record: &mut Customer, ids: &IdMap) {
        for item in &mut record.cart {
            item.product = ids.product(item.product);
        }
    }
    fn link(ids: &mut IdMap, archived: CustomerId, stored: CustomerId) {
        ids.customers.insert(archived, stored);
    }

    async fn find(store: &dyn Store, key: &str) -> Result<Option<Customer>, RepositoryError> {
        store.find_customer_by_email(key).await
    }
    /// Imported customers have no password and must reset it to log in.
    async fn insert(store: &dyn Store, record: &Customer) -> Result<(), RepositoryError> {
        store.insert_customer(record, None).await
    }
    async fn replace(store: &dyn Store, record: &Customer) -> Result<(), RepositoryError> {
        store.update_customer(record).await
    }
}

#[async_trait]
impl NaturalKey for Orders {
    type Record = Order;
    type Id = OrderId;
    const COLLECTION: &'static str = "zamowienia";

    fn key(record: &Order) -> String {
        record.number.as_str().to_owned()
    }
    fn id(record: &Order) -> OrderId {
        record.id
    }
    fn set_id(record: &mut Order, id: OrderId) {
        record.id = id;
    }
    fn new_id() -> OrderId {
        OrderId::new()
    }
    fn validate(record: &Order) -> Result<(), ValidationError> {
        record.validate()
    }
    fn resolve(record: &mut Order, ids: &IdMap) {
        record.customer = record.customer.map(|id| ids.customer(id));
        for item in &mut record.items {
            item.product = ids.product(item.product);
        }
    }

    async fn find(store: &dyn Store, key: &str) -> Result<Option<Order>, RepositoryError> {
        let number = OrderNumber::parse(key)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        store.find_order_by_number(&number).await
    }
    /// Stock is not taken for restored orders.
    async fn insert(store: &dyn Store, record: &Order) -> Result<(), RepositoryError> {
        store.insert_order(record, &[]).await
    }
    async fn replace(store: &dyn Store, record: &Order) -> Result<(), RepositoryError> {
        store.update_order(record).await
    }
}

async fn import_record<K: NaturalKey>(
    store: &dyn Store,
    value: Value,
    overwrite: bool,
    ids: &mut IdMap,
) -> Result<Outcome, RecordError> {
    let mut record: K::Record = serde_json::from_value(value)?;
    K::resolve(&mut record, ids);
    K::validate(&record)?;

    let archived = K::id(&record);
    let outcome = match K::find(store, &K::key(&record)).await? {
        Some(existing) if !overwrite => {
            K::link(ids, archived, K::id(&existing));
            Outcome::Skipped
        }
        Some(existing) => {
            let stored = K::id(&existing);
            K::set_id(&mut record, stored);
            K::replace(store, &record).await?;
            K::link(ids, archived, stored);
            Outcome::Updated
        }
        None => {
            let stored = K::new_id();
            K::set_id(&mut record, stored);
            K::insert(store, &record).await?;
            K::link(ids, archived, stored);
            Outcome::Inserted
        }
    };
    Ok(outcome)
}

async fn import_collection<K: NaturalKey>(
    store: &dyn Store,
    records: Vec<Value>,
    overwrite: bool,
    ids: &mut IdMap,
) -> CollectionStats {
    let mut stats = CollectionStats::default();
    for value in records {
        stats.processed += 1;
        match import_record::<K>(store, value, overwrite, ids).await {
            Ok(outcome) => stats.record(&outcome),
            Err(e) => {
                tracing::warn!(collection = K::COLLECTION, error = %e, "record import failed");
                stats.failed += 1;
            }
        }
    }
    stats
}

async fn import_messages(store: &dyn Store, records: Vec<Value>) -> CollectionStats {
    async fn one(store: &dyn Store, value: Value) -> Result<(), RecordError> {
        let mut message: Message = serde_json::from_value(value)?;
        message.validate()?;
        message.id = MessageId::new();
        store.insert_message(&message).await?;
        Ok(())
    }

    let mut stats = CollectionStats::default();
    for value in records {
        stats.processed += 1;
        match one(store, value).await {
            Ok(()) => stats.inserted += 1,
            Err(e) => {
                tracing::warn!(collection = "wiadomosci", error = %e, "record import failed");
                stats.failed += 1;
            }
        }
    }
    stats
}

async fn import_settings(store: &dyn Store, records: Vec<Value>) -> CollectionStats {
    async fn one(store: &dyn Store, value: Value) -> Result<(), RecordError> {
        let settings: Settings = serde_json::from_value(value)?;
        store.save_settings(&settings).await?;
        Ok(())
    }

    let mut stats = CollectionStats::default();
    let Some(value) = records.into_iter().next() else {
        return stats;
    };
    stats.processed = 1;

    match one(store, value).await {
        Ok(()) => stats.updated = 1,
        Err(e) => {
            tracing::warn!(collection = "ustawienia", error = %e, "record import failed");
            stats.failed = 1;
        }
    }
    stats
}

/// Apply every collection of `data` to the store.
///
/// Products go before customers and orders so their references can be
/// rewritten to stored ids.
pub async fn apply_manifest(store: &dyn Store, data: ManifestData, overwrite: bool) -> ImportStats {
    let mut ids = IdMap::default();
    let wydania = import_collection::<Releases>(store, data.wydania, overwrite, &mut ids).await;
    let produkty = import_collection::<Products>(store, data.produkty, overwrite, &mut ids).await;
    let czlonkowie = import_collection::<Members>(store, data.czlonkowie, overwrite, &mut ids).await;
    let klienci = import_collection::<Customers>(store, data.klienci, overwrite, &mut ids).await;
    let zamowienia = import_collection::<Orders>(store, data.zamowienia, overwrite, &mut ids).await;
    let wiadomosci = import_messages(store, data.wiadomosci).await;
    let ustawienia = import_settings(store, data.ustawienia).await;

    ImportStats {
        wydania,
        produkty,
        czlonkowie,
        wiadomosci,
        zamowienia,
        ustawienia,
        klienci,
        files: 0,
    }
}

/// Decode the manifest, then write every upload entry below `uploads_dir`.
///
/// # Errors
///
/// - `BackupError::Archive` if the bytes are not a ZIP archive
/// - `BackupError::MissingManifest` / `InvalidManifest` for a bad manifest,
///   reported before any file is written
/// - `BackupError::Io` if a file cannot be written
pub fn unpack(archive: &[u8], uploads_dir: &Path) -> Result<(Manifest, u64), BackupError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let manifest: Manifest = match zip.by_name(MANIFEST_NAME) {
        Ok(entry) => serde_json::from_reader(entry).map_err(BackupError::InvalidManifest)?,
        Err(ZipError::FileNotFound) => return Err(BackupError::MissingManifest),
        Err(e) => return Err(e.into()),
    };

    let mut files = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(target) = upload_target(entry.enclosed_name(), uploads_dir) else {
            continue;
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        std::fs::write(&target, contents)?;
        files += 1;
    }
    Ok((manifest, files))
}

/// Where an archive entry lands on disk, if it is an upload.
fn upload_target(name: Option<PathBuf>, uploads_dir: &Path) -> Option<PathBuf> {
    let rel = name?.strip_prefix(UPLOADS_PREFIX).ok()?.to_path_buf();
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(uploads_dir.join(rel))
}

/// Restore a backup archive.
///
/// Files written before a later failure are not removed.
///
/// # Errors
///
/// Returns `BackupError` if the archive or its manifest is unreadable or a
/// file cannot be written. Per-record failures are counted instead.
#[instrument(skip(store, archive), fields(size = archive.len()))]
pub async fn import_archive(
    store: &dyn Store,
    uploads_dir: &Path,
    archive: Vec<u8>,
    overwrite: bool,
) -> Result<ImportReport, BackupError> {
    let dir = uploads_dir.to_path_buf();
    let (manifest, files) =
        tokio::task::spawn_blocking(move || unpack(&archive, &dir)).await??;

    let mut stats = apply_manifest(store, manifest.data, overwrite).await;
    stats.files = files;

    tracing::info!(
        overwrite,
        files,
        releases = stats.wydania.processed,
        products = stats.produkty.processed,
        orders = stats.zamowienia.processed,
        customers = stats.klienci.processed,
        "backup imported"
    );
    Ok(ImportReport {
        stats,
        metadata: manifest.metadata,
    })
}
