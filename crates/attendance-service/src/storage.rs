//! Registration storage
//!
//! Redis data model:
//! - registration:{id} → Hash with registration fields
//! - registrations:all → Set of all registration ids
//! - event:{event_id}:registrations → Set of registration ids for one event
//!
//! The Pending → Attended transition runs as a single Lua script, so two
//! scans of the same ticket can never both observe `Pending`.

use async_trait::async_trait;
use checkin_common::{validate_id, Attendance, Error, Registration, Result};
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Outcome of an attempted attendance transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    NotFound,
    /// Pending → Attended applied; snapshot after the write
    Marked(Registration),
    /// Nothing written; snapshot with the original check-in time
    AlreadyAttended(Registration),
}

/// Persistent registration store
///
/// Only `mark_attended` may change attendance, and it must be atomic per id.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Look up a registration by id
    async fn find(&self, id: &str) -> Result<Option<Registration>>;

    /// Atomically move a pending registration to attended at `at`
    async fn mark_attended(&self, id: &str, at: DateTime<Utc>) -> Result<Transition>;

    /// Store a new registration
    /// Returns Ok(true) if created, Ok(false) if the id is already taken
    async fn insert(&self, registration: &Registration) -> Result<bool>;

    /// All registrations for one event
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Registration>>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> Result<()>;
}

/// Insert every registration, skipping ids that already exist
/// Returns the number of newly created registrations
///
/// Nothing is inserted if any id fails [`validate_id`].
pub async fn seed(store: &dyn RegistrationStore, registrations: &[Registration]) -> Result<usize> {
    for registration in registrations {
        validate_id(&registration.id)?;
    }

    let mut created = 0;
    for registration in registrations {
        if store.insert(registration).await? {
            created += 1;
        } else {
            debug!("Seed skipped existing registration: {}", registration.id);
        }
    }
    Ok(created)
}

/// Check-and-mark in one step.
/// Returns {0, {}} when missing, {1, fields} when marked, {2, fields} when already attended.
const MARK_ATTENDED_SCRIPT: &str = r#"
    local key = KEYS[1]
    if redis.call('EXISTS', key) == 0 then
        return {0, {}}
    end
    if redis.call('HGET', key, 'status') == 'Attended' then
        return {2, redis.call('HGETALL', key)}
    end
    redis.call('HSET', key, 'status', 'Attended', 'attendedAt', ARGV[1])
    return {1, redis.call('HGETALL', key)}
"#;

/// Create the hash and both index entries unless the id exists.
const INSERT_SCRIPT: &str = r#"
    local key = KEYS[1]
    if redis.call('EXISTS', key) == 1 then
        return 0
    end
    redis.call('HSET', key,
        'id', ARGV[1],
        'eventId', ARGV[2],
        'attendeeName', ARGV[3],
        'department', ARGV[4],
        'year', ARGV[5],
        'eventTitle', ARGV[6],
        'status', ARGV[7],
        'attendedAt', ARGV[8])
    redis.call('SADD', KEYS[2], ARGV[1])
    redis.call('SADD', KEYS[3], ARGV[1])
    return 1
"#;

const ALL_REGISTRATIONS_KEY: &str = "registrations:all";

fn registration_key(id: &str) -> String {
    format!("registration:{}", id)
}

fn event_key(event_id: &str) -> String {
    format!("event:{}:registrations", event_id)
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::Redis(e.to_string())
}

/// Rebuild a registration from a flat HGETALL reply
fn registration_from_fields(fields: Vec<String>) -> Result<Registration> {
    // Redis returns a flat array: [key1, val1, key2, val2, ...]
    let mut map = HashMap::new();
    for chunk in fields.chunks(2) {
        if chunk.len() == 2 {
            map.insert(chunk[0].clone(), chunk[1].clone());
        }
    }

    let mut take = |field: &str| {
        map.remove(field)
            .ok_or_else(|| Error::InvalidRecord(format!("missing field '{}'", field)))
    };

    let id = take("id")?;
    let event_id = take("eventId")?;
    let attendee_name = take("attendeeName")?;
    let department = take("department")?;
    let year = take("year")?;
    let event_title = take("eventTitle")?;
    let status = take("status")?;
    let attended_at = map.remove("attendedAt");

    Ok(Registration {
        id,
        event_id,
        attendee_name,
        department,
        year,
        event_title,
        attendance: Attendance::from_parts(&status, attended_at.as_deref())?,
    })
}

/// Redis-backed registration store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    mark_script: redis::Script,
    insert_script: redis::Script,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(redis_err)?;
        let conn = ConnectionManager::new(client).await.map_err(redis_err)?;

        info!("Successfully connected to Redis");

        Ok(Self {
            conn,
            mark_script: redis::Script::new(MARK_ATTENDED_SCRIPT),
            insert_script: redis::Script::new(INSERT_SCRIPT),
        })
    }
}

#[async_trait]
impl RegistrationStore for RedisStore {
    async fn find(&self, id: &str) -> Result<Option<Registration>> {
        let mut conn = self.conn.clone();

        let fields: Vec<String> = conn.hgetall(registration_key(id)).await.map_err(redis_err)?;
        if fields.is_empty() {
            return Ok(None);
        }

        registration_from_fields(fields).map(Some)
    }

    async fn mark_attended(&self, id: &str, at: DateTime<Utc>) -> Result<Transition> {
        let mut conn = self.conn.clone();

        let (code, fields): (i64, Vec<String>) = self
            .mark_script
            .key(registration_key(id))
            .arg(at.to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;

        match code {
            0 => Ok(Transition::NotFound),
            1 => {
                info!("Marked registration as attended: {}", id);
                Ok(Transition::Marked(registration_from_fields(fields)?))
            }
            2 => {
                debug!("Registration {} already attended", id);
                Ok(Transition::AlreadyAttended(registration_from_fields(fields)?))
            }
            other => Err(Error::Storage(format!(
                "unexpected mark_attended script result: {}",
                other
            ))),
        }
    }

    async fn insert(&self, registration: &Registration) -> Result<bool> {
        let mut conn = self.conn.clone();

        let attended_at = registration
            .attended_at()
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        let created: i64 = self
            .insert_script
            .key(registration_key(&registration.id))
            .key(ALL_REGISTRATIONS_KEY)
            .key(event_key(&registration.event_id))
            .arg(&registration.id)
            .arg(&registration.event_id)
            .arg(&registration.attendee_name)
            .arg(&registration.department)
            .arg(&registration.year)
            .arg(&registration.event_title)
            .arg(registration.attendance.label())
            .arg(attended_at)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;

        if created == 1 {
            info!(
                "Inserted registration: id={}, event={}",
                registration.id, registration.event_id
            );
            Ok(true)
        } else {
            debug!("Registration {} already exists", registration.id);
            Ok(false)
        }
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Registration>> {
        let mut conn = self.conn.clone();

        let ids: Vec<String> = conn.smembers(event_key(event_id)).await.map_err(redis_err)?;

        let mut registrations = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.find(id).await? {
                Some(registration) => registrations.push(registration),
                None => warn!("Event {} indexes missing registration {}", event_id, id),
            }
        }

        registrations.sort_by(|a, b| {
            a.attendee_name
                .cmp(&b.attendee_name)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(registrations)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields(pairs: &[(&str, &str)]) -> Vec<String> {
        pairs
            .iter()
            .flat_map(|(k, v)| [k.to_string(), v.to_string()])
            .collect()
    }

    fn pending_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("id", "R1"),
            ("eventId", "evt-1"),
            ("attendeeName", "Meera Iyer"),
            ("department", "MECH"),
            ("year", "4"),
            ("eventTitle", "Design Sprint"),
            ("status", "Pending"),
            ("attendedAt", ""),
        ]
    }

    #[test]
    fn test_registration_from_fields_pending() {
        let reg = registration_from_fields(fields(&pending_fields())).unwrap();
        assert_eq!(reg.id, "R1");
        assert_eq!(reg.event_id, "evt-1");
        assert_eq!(reg.attendance, Attendance::Pending);
    }

    #[test]
    fn test_registration_from_fields_attended() {
        let mut pairs = pending_fields();
        pairs[6] = ("status", "Attended");
        pairs[7] = ("attendedAt", "2026-02-01T08:15:00+00:00");

        let reg = registration_from_fields(fields(&pairs)).unwrap();
        assert_eq!(
            reg.attended_at(),
            Some(Utc.with_ymd_and_hms(2026, 2, 1, 8, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_registration_from_fields_missing_field() {
        let pairs: Vec<_> = pending_fields()
            .into_iter()
            .filter(|(k, _)| *k != "eventTitle")
            .collect();

        let err = registration_from_fields(fields(&pairs)).unwrap_err();
        assert!(err.to_string().contains("eventTitle"));
    }

    // Integration tests require Redis to be running
    // Run with: docker compose up -d redis

    async fn get_test_store() -> RedisStore {
        RedisStore::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis")
    }

    fn unique_registration(prefix: &str) -> Registration {
        Registration::new(
            format!("{}-{}", prefix, uuid::Uuid::new_v4()),
            format!("evt-{}", uuid::Uuid::new_v4()),
            "Test Student".to_string(),
            "CSE".to_string(),
            "1".to_string(),
            "Test Event".to_string(),
        )
    }

    #[tokio::test]
    #[ignore] // Only run when Redis is available
    async fn test_insert_and_find() {
        let store = get_test_store().await;
        let reg = unique_registration("find");

        assert!(store.insert(&reg).await.unwrap());
        assert!(!store.insert(&reg).await.unwrap());

        let found = store.find(&reg.id).await.unwrap().expect("Registration not found");
        assert_eq!(found, reg);

        let listed = store.list_by_event(&reg.event_id).await.unwrap();
        assert_eq!(listed, vec![reg]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_mark_attended_once() {
        let store = get_test_store().await;
        let reg = unique_registration("mark");
        store.insert(&reg).await.unwrap();

        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 15, 0).unwrap();
        let first = store.mark_attended(&reg.id, at).await.unwrap();
        let Transition::Marked(marked) = first else {
            panic!("first mark should succeed");
        };
        assert_eq!(marked.attended_at(), Some(at));

        let later = at + chrono::Duration::minutes(1);
        let second = store.mark_attended(&reg.id, later).await.unwrap();
        assert_eq!(second, Transition::AlreadyAttended(marked));

        assert_eq!(
            store.mark_attended("missing-registration", at).await.unwrap(),
            Transition::NotFound
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_concurrent_mark_attended() {
        let store = get_test_store().await;
        let reg = unique_registration("race");
        store.insert(&reg).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let id = reg.id.clone();
            handles.push(tokio::spawn(async move {
                store.mark_attended(&id, Utc::now()).await.unwrap()
            }));
        }

        let mut marked = 0;
        for handle in handles {
            if let Transition::Marked(_) = handle.await.unwrap() {
                marked += 1;
            }
        }
        assert_eq!(marked, 1);
    }
}
