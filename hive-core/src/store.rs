//! Package reference storage

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::controller::PackageController;
use crate::database::ReferenceDatabase;
use crate::environment::PackageEnvironment;
use crate::error::PackageError;
use crate::reference::{PackageReference, ReferenceMap};

/// Persisted CRUD over package references.
///
/// The document is read on first use and cached. One lock serializes every
/// read-modify-persist cycle; a mutation is committed to the cache only
/// after the document was written.
pub struct ReferenceStore {
    database: Arc<dyn ReferenceDatabase>,
    environment: Arc<PackageEnvironment>,
    cache: Mutex<Option<ReferenceMap>>,
}

impl ReferenceStore {
    pub fn new(database: Arc<dyn ReferenceDatabase>, environment: Arc<PackageEnvironment>) -> Self {
        Self {
            database,
            environment,
            cache: Mutex::new(None),
        }
    }

    /// Store a reference under a new id
    pub async fn put(&self, reference: PackageReference) -> Result<Uuid, PackageError> {
        let id = Uuid::new_v4();
        self.modify(|references| {
            references.insert(id, reference);
            Some(id)
        })
        .await?;

        tracing::debug!(id = %id, "Package reference added");
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<PackageReference>, PackageError> {
        let mut cache = self.cache.lock().await;
        let references = self.loaded(&mut cache).await?;
        Ok(references.get(&id).cloned())
    }

    /// Replace an existing reference. Returns `false` if `id` is unknown.
    pub async fn try_update(
        &self,
        id: Uuid,
        reference: PackageReference,
    ) -> Result<bool, PackageError> {
        let updated = self
            .modify(|references| {
                let slot = references.get_mut(&id)?;
                *slot = reference;
                Some(())
            })
            .await?;
        Ok(updated.is_some())
    }

    /// Remove a reference; unknown ids are not an error
    pub async fn delete(&self, id: Uuid) -> Result<(), PackageError> {
        self.modify(|references| {
            if references.remove(&id).is_none() {
                tracing::debug!(id = %id, "Package reference to delete does not exist");
            }
            Some(())
        })
        .await?;
        Ok(())
    }

    /// Snapshot of all references
    pub async fn get_all(&self) -> Result<ReferenceMap, PackageError> {
        let mut cache = self.cache.lock().await;
        Ok(self.loaded(&mut cache).await?.clone())
    }

    /// Available versions of a stored reference, `None` if `id` is unknown
    pub async fn get_versions(
        &self,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<String>>, PackageError> {
        // The lock is released before any external tool runs
        let Some(reference) = self.get(id).await? else {
            return Ok(None);
        };

        let controller = PackageController::new(reference, Arc::clone(&self.environment));
        controller.list_versions(cancel).await.map(Some)
    }

    /// Apply `mutate` to a copy of the references and persist it.
    ///
    /// Nothing is written when `mutate` returns `None`.
    async fn modify<T>(
        &self,
        mutate: impl FnOnce(&mut ReferenceMap) -> Option<T>,
    ) -> Result<Option<T>, PackageError> {
        let mut cache = self.cache.lock().await;
        let mut next = self.loaded(&mut cache).await?.clone();

        let Some(value) = mutate(&mut next) else {
            return Ok(None);
        };

        let document = serde_json::to_string_pretty(&next)?;
        self.database.write(&document).await?;
        *cache = Some(next);

        Ok(Some(value))
    }

    async fn loaded<'a>(
        &self,
        cache: &'a mut Option<ReferenceMap>,
    ) -> Result<&'a ReferenceMap, PackageError> {
        if cache.is_none() {
            let references = match self.database.try_read().await? {
                Some(document) => serde_json::from_str(&document)?,
                None => ReferenceMap::new(),
            };
            tracing::debug!(count = references.len(), "Package references loaded");
            *cache = Some(references);
        }
        Ok(cache.get_or_insert_default())
    }
}
