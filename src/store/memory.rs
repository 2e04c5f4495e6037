//! In-process identity store for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityRecord, IdentityStore, NewIdentity, StoreError};

/// `HashMap` behind an async lock; every trait method is a single critical
/// section, which gives the same atomic-record-update guarantee the durable
/// store gets from single SQL statements.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, IdentityRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError> {
        let mut records = self.records.write().await;
        if records
            .values()
            .any(|record| record.email == identity.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            name: identity.name,
            email: identity.email,
            dob: identity.dob,
            password_hash: identity.password_hash,
            role: identity.role,
            email_verified: false,
            otp_hash: None,
            otp_expires_at: None,
            reset_otp_hash: None,
            reset_otp_expires_at: None,
            reset_verified: false,
            created_at: Utc::now(),
        };
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|record| record.email == email)
            .cloned())
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        otp_hash: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.otp_hash = Some(otp_hash);
        record.otp_expires_at = Some(expires_at);
        Ok(())
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.email_verified = true;
        record.otp_hash = None;
        record.otp_expires_at = None;
        Ok(())
    }

    async fn set_reset_code(
        &self,
        id: Uuid,
        otp_hash: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.reset_otp_hash = Some(otp_hash);
        record.reset_otp_expires_at = Some(expires_at);
        record.reset_verified = false;
        Ok(())
    }

    async fn mark_reset_verified(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.reset_verified = true;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.password_hash = password_hash;
        record.reset_otp_hash = None;
        record.reset_otp_expires_at = None;
        record.reset_verified = false;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;
    use anyhow::Result;
    use chrono::{Duration, NaiveDate};

    fn identity(email: &str) -> NewIdentity {
        NewIdentity {
            name: "Alice".to_string(),
            email: email.to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() -> Result<()> {
        let store = MemoryStore::new();
        store.create(identity("a@b.com")).await?;
        let duplicate = store.create(identity("a@b.com")).await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateEmail)));
        Ok(())
    }

    #[tokio::test]
    async fn new_records_start_unverified_with_no_codes() -> Result<()> {
        let store = MemoryStore::new();
        let record = store.create(identity("a@b.com")).await?;
        assert!(!record.email_verified);
        assert!(record.otp_hash.is_none());
        assert!(record.otp_expires_at.is_none());
        assert!(record.reset_otp_hash.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn mark_email_verified_clears_both_otp_fields() -> Result<()> {
        let store = MemoryStore::new();
        let record = store.create(identity("a@b.com")).await?;
        store
            .set_verification_code(record.id, vec![1, 2, 3], Utc::now() + Duration::minutes(10))
            .await?;
        store.mark_email_verified(record.id).await?;

        let record = store
            .find_by_email("a@b.com")
            .await?
            .expect("record exists");
        assert!(record.email_verified);
        assert!(record.otp_hash.is_none());
        assert!(record.otp_expires_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reset_code_lives_in_its_own_namespace() -> Result<()> {
        let store = MemoryStore::new();
        let record = store.create(identity("a@b.com")).await?;
        store
            .set_verification_code(record.id, vec![1], Utc::now() + Duration::minutes(10))
            .await?;
        store
            .set_reset_code(record.id, vec![2], Utc::now() + Duration::minutes(10))
            .await?;

        let record = store
            .find_by_email("a@b.com")
            .await?
            .expect("record exists");
        assert_eq!(record.otp_hash.as_deref(), Some(&[1u8][..]));
        assert_eq!(record.reset_otp_hash.as_deref(), Some(&[2u8][..]));
        Ok(())
    }

    #[tokio::test]
    async fn update_password_clears_all_reset_state() -> Result<()> {
        let store = MemoryStore::new();
        let record = store.create(identity("a@b.com")).await?;
        store
            .set_reset_code(record.id, vec![2], Utc::now() + Duration::minutes(10))
            .await?;
        store.mark_reset_verified(record.id).await?;
        store
            .update_password(record.id, "$argon2id$new".to_string())
            .await?;

        let record = store
            .find_by_email("a@b.com")
            .await?
            .expect("record exists");
        assert_eq!(record.password_hash, "$argon2id$new");
        assert!(record.reset_otp_hash.is_none());
        assert!(record.reset_otp_expires_at.is_none());
        assert!(!record.reset_verified);
        Ok(())
    }

    #[tokio::test]
    async fn mutations_on_unknown_id_return_not_found() {
        let store = MemoryStore::new();
        let missing = store.mark_email_verified(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }
}
