//! Narrow capability interface over the subscription surface.
//!
//! Platform billing integration stays outside the core; this trait is the
//! seam a platform binding would implement. [`LocalEntitlements`] is the
//! store-backed stand-in used by the CLI.
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;

use crate::store::{KEY_GOLD_MEMBERSHIP, KeyValueStore, StoreError};

pub const GOLD_PRODUCT_ID: &str = "stardust_gold_monthly";

#[derive(Error, Debug)]
pub enum EntitlementError {
    #[error("Purchase could not be recorded: {0}")]
    Store(#[from] StoreError),
}

pub trait Entitlements: Send + Sync {
    fn is_subscribed(&self) -> bool;
    fn purchase(&self) -> Result<(), EntitlementError>;
    fn restore_purchases(&self) -> Result<(), EntitlementError>;
}

pub struct LocalEntitlements {
    store: Arc<dyn KeyValueStore>,
    subscribed: AtomicBool,
}

impl LocalEntitlements {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let subscribed = matches!(
            store.get(KEY_GOLD_MEMBERSHIP),
            Ok(Some(product)) if product == GOLD_PRODUCT_ID
        );
        Self {
            store,
            subscribed: AtomicBool::new(subscribed),
        }
    }
}

impl Entitlements for LocalEntitlements {
    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }

    fn purchase(&self) -> Result<(), EntitlementError> {
        self.store.set(KEY_GOLD_MEMBERSHIP, GOLD_PRODUCT_ID)?;
        self.subscribed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn restore_purchases(&self) -> Result<(), EntitlementError> {
        let subscribed = matches!(
            self.store.get(KEY_GOLD_MEMBERSHIP)?,
            Some(product) if product == GOLD_PRODUCT_ID
        );
        self.subscribed.store(subscribed, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_purchase_activates_membership() {
        let store = Arc::new(MemoryStore::new());
        let entitlements = LocalEntitlements::new(store.clone());
        assert!(!entitlements.is_subscribed());

        entitlements.purchase().unwrap();
        assert!(entitlements.is_subscribed());
        assert_eq!(
            store.get(KEY_GOLD_MEMBERSHIP).unwrap(),
            Some(GOLD_PRODUCT_ID.to_string())
        );
    }

    #[test]
    fn test_membership_survives_reopen() {
        let store = Arc::new(MemoryStore::new());
        LocalEntitlements::new(store.clone()).purchase().unwrap();

        let reopened = LocalEntitlements::new(store);
        assert!(reopened.is_subscribed());
    }

    #[test]
    fn test_restore_picks_up_external_purchase() {
        let store = Arc::new(MemoryStore::new());
        let entitlements = LocalEntitlements::new(store.clone());
        assert!(!entitlements.is_subscribed());

        store.set(KEY_GOLD_MEMBERSHIP, GOLD_PRODUCT_ID).unwrap();
        entitlements.restore_purchases().unwrap();
        assert!(entitlements.is_subscribed());
    }

    #[test]
    fn test_unknown_product_does_not_subscribe() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY_GOLD_MEMBERSHIP, "some_other_product").unwrap();
        let entitlements = LocalEntitlements::new(store);
        assert!(!entitlements.is_subscribed());
    }
}
