use crate::error::CatalogError;
use crate::model::{CatalogEntity, Lookup};

/// Remote catalog operations the merge engine needs.
///
/// Implementations hold one session for the whole run. Calls are made
/// strictly one at a time.
pub trait CatalogClient {
    fn lookup_by_uid(&self, uid: &str) -> Result<Lookup, CatalogError>;

    /// Returns the assigned id when the service echoes the new record.
    fn create(&self, entity: &CatalogEntity) -> Result<Option<i64>, CatalogError>;

    fn update(&self, id: i64, entity: &CatalogEntity) -> Result<(), CatalogError>;
}

impl<C: CatalogClient + ?Sized> CatalogClient for &C {
    fn lookup_by_uid(&self, uid: &str) -> Result<Lookup, CatalogError> {
        (**self).lookup_by_uid(uid)
    }

    fn create(&self, entity: &CatalogEntity) -> Result<Option<i64>, CatalogError> {
        (**self).create(entity)
    }

    fn update(&self, id: i64, entity: &CatalogEntity) -> Result<(), CatalogError> {
        (**self).update(id, entity)
    }
}
