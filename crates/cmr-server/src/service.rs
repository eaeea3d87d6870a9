//! The resolver service: validated reads and writes over a record store.
//!
//! Resolve is the cheap public read path. Register is the privileged write
//! path. Authorization happens at the HTTP layer; this type assumes its caller
//! is allowed to perform the operation it asks for.

use std::sync::Arc;

use cmr_store::{RecordStore, StoreError};
use cmr_types::{AssetRefs, ComponentRecord, ComponentTuple, NewRecord, TokenUri, Validator};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::retry::RetryPolicy;

/// What to do when registering a tuple that already has a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegisterPolicy {
    /// Store another record; lookups keep returning the earliest one.
    #[default]
    AllowDuplicates,
    /// Reject with [`ServerError::Duplicate`].
    RejectDuplicates,
}

pub struct ResolverService {
    store: Arc<dyn RecordStore>,
    validator: Validator,
    retry: RetryPolicy,
    register_policy: RegisterPolicy,
}

impl ResolverService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            validator: Validator::default(),
            retry: RetryPolicy::default(),
            register_policy: RegisterPolicy::default(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_register_policy(mut self, policy: RegisterPolicy) -> Self {
        self.register_policy = policy;
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Validate raw tokens and resolve them to a metadata pointer.
    pub async fn resolve_raw(
        &self,
        wheel: &str,
        engine: &str,
        build: &str,
        wrapping: &str,
    ) -> ServerResult<TokenUri> {
        let tuple = self.validator.validate(wheel, engine, build, wrapping)?;
        self.resolve(&tuple).await
    }

    /// Resolve a tuple to the metadata pointer of its earliest record.
    ///
    /// A draft record resolves to an empty pointer.
    pub async fn resolve(&self, tuple: &ComponentTuple) -> ServerResult<TokenUri> {
        self.validator.check_tuple(tuple)?;
        let found = self
            .retry
            .run("find_by_components", StoreError::is_transient, || {
                self.store.find_by_components(tuple)
            })
            .await?;

        match found {
            Some(record) => {
                debug!(%tuple, id = %record.id, state = ?record.state(), "resolved");
                Ok(TokenUri::from(&record))
            }
            None => Err(ServerError::NotFound(*tuple)),
        }
    }

    /// Validate raw tokens and register a record for them.
    pub async fn register_raw(
        &self,
        wheel: &str,
        engine: &str,
        build: &str,
        wrapping: &str,
        refs: AssetRefs,
    ) -> ServerResult<ComponentRecord> {
        let tuple = self.validator.validate(wheel, engine, build, wrapping)?;
        self.register(tuple, refs).await
    }

    /// Create a record for `tuple`. Placeholder `refs` register a draft.
    pub async fn register(&self, tuple: ComponentTuple, refs: AssetRefs) -> ServerResult<ComponentRecord> {
        self.validator.check_tuple(&tuple)?;
        self.validator.check_refs(&refs)?;
        let refs = if refs.is_placeholder() { AssetRefs::placeholder() } else { refs };

        let record = NewRecord::new(tuple, refs);
        let nothing_written = |e: &StoreError| matches!(e, StoreError::Unavailable(_));
        let created = match self.register_policy {
            RegisterPolicy::AllowDuplicates => {
                self.retry
                    .run("create", nothing_written, || self.store.create(record.clone()))
                    .await?
            }
            RegisterPolicy::RejectDuplicates => self
                .retry
                .run("create_unique", nothing_written, || self.store.create_unique(record.clone()))
                .await?
                .map_err(|existing| ServerError::Duplicate { tuple, existing: existing.id })?,
        };

        info!(%tuple, id = %created.id, state = ?created.state(), "record registered");
        Ok(created)
    }

    /// Validate raw tokens and list every record stored for them.
    pub async fn records_for_raw(
        &self,
        wheel: &str,
        engine: &str,
        build: &str,
        wrapping: &str,
    ) -> ServerResult<Vec<ComponentRecord>> {
        let tuple = self.validator.validate(wheel, engine, build, wrapping)?;
        self.records_for(&tuple).await
    }

    /// Every record for `tuple` in storage order, duplicates included.
    pub async fn records_for(&self, tuple: &ComponentTuple) -> ServerResult<Vec<ComponentRecord>> {
        self.validator.check_tuple(tuple)?;
        Ok(self
            .retry
            .run("find_all_by_components", StoreError::is_transient, || {
                self.store.find_all_by_components(tuple)
            })
            .await?)
    }

    /// Every record in storage order.
    pub async fn list_all(&self) -> ServerResult<Vec<ComponentRecord>> {
        Ok(self
            .retry
            .run("list_all", StoreError::is_transient, || self.store.list_all())
            .await?)
    }

    /// Remove every record. Not retried.
    pub async fn clear_all(&self) -> ServerResult<usize> {
        let removed = self.store.clear_all().await?;
        warn!(removed, "all records cleared");
        Ok(removed)
    }
}
