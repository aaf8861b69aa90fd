//! In-memory registration store for development and testing
//!
//! Keeps everything in a process-local map. The check and the write of
//! `mark_attended` happen under one lock with no await in between.

use async_trait::async_trait;
use checkin_common::{Registration, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::storage::{RegistrationStore, Transition};

/// Process-local registration store
#[derive(Default)]
pub struct MemoryStore {
    registrations: Mutex<HashMap<String, Registration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn find(&self, id: &str) -> Result<Option<Registration>> {
        Ok(self.registrations.lock().await.get(id).cloned())
    }

    async fn mark_attended(&self, id: &str, at: DateTime<Utc>) -> Result<Transition> {
        let mut registrations = self.registrations.lock().await;

        let Some(registration) = registrations.get_mut(id) else {
            return Ok(Transition::NotFound);
        };

        match registration.mark_attended(at) {
            Ok(()) => {
                info!("Marked registration as attended: {}", id);
                Ok(Transition::Marked(registration.clone()))
            }
            Err(_) => {
                debug!("Registration {} already attended", id);
                Ok(Transition::AlreadyAttended(registration.clone()))
            }
        }
    }

    async fn insert(&self, registration: &Registration) -> Result<bool> {
        let mut registrations = self.registrations.lock().await;

        if registrations.contains_key(&registration.id) {
            debug!("Registration {} already exists", registration.id);
            return Ok(false);
        }

        registrations.insert(registration.id.clone(), registration.clone());
        info!(
            "Inserted registration: id={}, event={}",
            registration.id, registration.event_id
        );
        Ok(true)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Registration>> {
        let registrations = self.registrations.lock().await;

        let mut matching: Vec<Registration> = registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            a.attendee_name
                .cmp(&b.attendee_name)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matching)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed;
    use std::sync::Arc;

    fn registration(id: &str, event_id: &str, name: &str) -> Registration {
        Registration::new(
            id.to_string(),
            event_id.to_string(),
            name.to_string(),
            "IT".to_string(),
            "2".to_string(),
            "Tech Fest".to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let reg = registration("R1", "evt-1", "Kiran");

        assert!(store.insert(&reg).await.unwrap());
        assert!(!store.insert(&reg).await.unwrap());
        assert_eq!(store.find("R1").await.unwrap(), Some(reg));
        assert_eq!(store.find("R2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mark_attended_transitions_once() {
        let store = MemoryStore::new();
        store.insert(&registration("R1", "evt-1", "Kiran")).await.unwrap();

        let at = Utc::now();
        let Transition::Marked(marked) = store.mark_attended("R1", at).await.unwrap() else {
            panic!("first mark should succeed");
        };
        assert_eq!(marked.attended_at(), Some(at));

        let second = store
            .mark_attended("R1", at + chrono::Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(second, Transition::AlreadyAttended(marked));

        assert_eq!(
            store.mark_attended("nope", at).await.unwrap(),
            Transition::NotFound
        );
    }

    #[tokio::test]
    async fn test_concurrent_marks_apply_once() {
        let store = Arc::new(MemoryStore::new());
        store.insert(&registration("R1", "evt-1", "Kiran")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.mark_attended("R1", Utc::now()).await.unwrap()
            }));
        }

        let mut marked = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Transition::Marked(_) => marked += 1,
                Transition::AlreadyAttended(_) => already += 1,
                Transition::NotFound => panic!("registration vanished"),
            }
        }

        assert_eq!(marked, 1);
        assert_eq!(already, 31);
    }

    #[tokio::test]
    async fn test_seed_rejects_unreachable_ids() {
        let store = MemoryStore::new();

        let result = seed(
            &store,
            &[
                registration("R1", "evt-1", "Kiran"),
                registration(" R2 ", "evt-1", "Padded"),
                registration("", "evt-1", "Blank"),
            ],
        )
        .await;

        assert!(matches!(result, Err(checkin_common::Error::InvalidRecord(_))));
        // Rejected before any insert
        assert!(store.find("R1").await.unwrap().is_none());
        assert!(store.list_by_event("evt-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_registration_can_check_in() {
        let store = Arc::new(MemoryStore::new());
        seed(store.as_ref(), &[registration("R1", "evt-1", "Kiran")])
            .await
            .unwrap();

        let service = crate::orchestrator::CheckInService::new(store);
        let result = service.check_in_manual(" R1 ").await.unwrap();
        assert!(result.is_approved());
    }

    #[tokio::test]
    async fn test_list_by_event_sorted_by_name() {
        let store = MemoryStore::new();
        let created = seed(
            &store,
            &[
                registration("R1", "evt-1", "Zoya"),
                registration("R2", "evt-1", "Aman"),
                registration("R3", "evt-2", "Bela"),
                registration("R1", "evt-1", "Duplicate"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(created, 3);

        let names: Vec<String> = store
            .list_by_event("evt-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.attendee_name)
            .collect();
        assert_eq!(names, vec!["Aman", "Zoya"]);
    }
}
