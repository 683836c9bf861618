//! # PostgreSQL Event Store
//!
//! Persists rosters across four tables (see `migrations/`):
//!
//! - `volunteer_events` - one row per event, carrying the optimistic `version`
//! - `volunteer_participations` - participation records
//! - `volunteer_participation_transitions` - append-only audit trail
//! - `volunteer_waitlist_entries` - active and archived waitlist entries
//!
//! A save runs in one transaction. The event row update is conditional on the
//! loaded version; zero affected rows means another writer got there first and
//! the whole save rolls back.
//!
//! An exclusive session is a single transaction that first takes
//! `pg_advisory_xact_lock` on a key derived from the event id, then loads and
//! saves through the same connection. Every process using the database waits on
//! the same key, and the lock is released by commit or rollback, including the
//! rollback sqlx issues when a session is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::{EventSession, EventStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::models::{
    Event, EventId, EventRoster, ParticipationRecord, ParticipationTransition, VolunteerId,
    WaitlistEntry,
};
use crate::state_machine::{EventStatus, ParticipationStatus, WaitlistEntryStatus};
use crate::waitlist::WaitlistQueue;

#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

/// Exclusive session: one transaction holding the event's advisory lock
struct PgEventSession {
    tx: Transaction<'static, Postgres>,
    event_id: EventId,
}

#[derive(Debug, FromRow)]
struct EventRow {
    event_id: Uuid,
    title: String,
    capacity: i32,
    status: String,
    waitlist_enabled: bool,
    max_waitlist_size: i32,
    start_time: DateTime<Utc>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ParticipationRow {
    participation_id: Uuid,
    volunteer_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TransitionRow {
    transition_id: Uuid,
    participation_id: Uuid,
    from_state: Option<String>,
    to_state: String,
    sort_key: i32,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct WaitlistEntryRow {
    volunteer_id: Uuid,
    joined_at: DateTime<Utc>,
    sequence: i64,
    status: String,
    notified_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

fn parse_status<T: FromStr>(field: &'static str, value: &str) -> StoreResult<T> {
    value.parse().map_err(|_| StoreError::CorruptRecord {
        field,
        value: value.to_string(),
    })
}

fn to_u32(field: &'static str, value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::CorruptRecord {
        field,
        value: value.to_string(),
    })
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Advisory lock key: the two halves of the event UUID folded together
fn advisory_key(event_id: EventId) -> i64 {
    let bits = event_id.as_uuid().as_u128();
    ((bits >> 64) as u64 ^ bits as u64) as i64
}

impl EventRow {
    fn into_event(self) -> StoreResult<Event> {
        Ok(Event {
            id: EventId::from_uuid(self.event_id),
            title: self.title,
            capacity: to_u32("capacity", self.capacity)?,
            status: parse_status::<EventStatus>("event status", &self.status)?,
            waitlist_enabled: self.waitlist_enabled,
            max_waitlist_size: to_u32("max_waitlist_size", self.max_waitlist_size)?,
            start_time: self.start_time,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TransitionRow {
    fn into_transition(self) -> StoreResult<ParticipationTransition> {
        let from_state = self
            .from_state
            .as_deref()
            .map(|s| parse_status::<ParticipationStatus>("transition from_state", s))
            .transpose()?;
        Ok(ParticipationTransition {
            id: self.transition_id,
            from_state,
            to_state: parse_status("transition to_state", &self.to_state)?,
            sort_key: self.sort_key,
            reason: self.reason,
            created_at: self.created_at,
        })
    }
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration and wrap it
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_roster(
        conn: &mut PgConnection,
        event_id: EventId,
    ) -> StoreResult<Option<EventRoster>> {
        let id = event_id.as_uuid();

        let Some(event_row) = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT event_id, title, capacity, status, waitlist_enabled, max_waitlist_size,
                   start_time, version, created_at, updated_at
            FROM volunteer_events
            WHERE event_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };
        let event = event_row.into_event()?;

        let participation_rows = sqlx::query_as::<_, ParticipationRow>(
            r#"
            SELECT participation_id, volunteer_id, status, created_at, updated_at
            FROM volunteer_participations
            WHERE event_id = $1
            ORDER BY created_at ASC, participation_id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let transition_rows = sqlx::query_as::<_, TransitionRow>(
            r#"
            SELECT t.transition_id, t.participation_id, t.from_state, t.to_state,
                   t.sort_key, t.reason, t.created_at
            FROM volunteer_participation_transitions t
            JOIN volunteer_participations p ON p.participation_id = t.participation_id
            WHERE p.event_id = $1
            ORDER BY t.participation_id, t.sort_key ASC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let mut transitions: HashMap<Uuid, Vec<ParticipationTransition>> = HashMap::new();
        for row in transition_rows {
            let participation_id = row.participation_id;
            transitions
                .entry(participation_id)
                .or_default()
                .push(row.into_transition()?);
        }

        let mut participations = Vec::with_capacity(participation_rows.len());
        for row in participation_rows {
            participations.push(ParticipationRecord {
                id: row.participation_id,
                event_id,
                volunteer_id: VolunteerId::from_uuid(row.volunteer_id),
                status: parse_status("participation status", &row.status)?,
                transitions: transitions.remove(&row.participation_id).unwrap_or_default(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
        }

        let entry_rows = sqlx::query_as::<_, WaitlistEntryRow>(
            r#"
            SELECT volunteer_id, joined_at, sequence, status, notified_at, expires_at
            FROM volunteer_waitlist_entries
            WHERE event_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let mut entries = Vec::with_capacity(entry_rows.len());
        for row in entry_rows {
            entries.push(WaitlistEntry {
                event_id,
                volunteer_id: VolunteerId::from_uuid(row.volunteer_id),
                joined_at: row.joined_at,
                sequence: row.sequence,
                status: parse_status::<WaitlistEntryStatus>("waitlist status", &row.status)?,
                notified_at: row.notified_at,
                expires_at: row.expires_at,
            });
        }

        Ok(Some(EventRoster::from_parts(
            event,
            participations,
            WaitlistQueue::from_entries(entries),
        )))
    }

    /// Version-checked update of the event row plus its children
    async fn save_roster(conn: &mut PgConnection, roster: &EventRoster) -> StoreResult<i64> {
        let event = &roster.event;

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE volunteer_events
            SET title = $3, capacity = $4, status = $5, waitlist_enabled = $6,
                max_waitlist_size = $7, start_time = $8, updated_at = $9,
                version = version + 1
            WHERE event_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.version)
        .bind(&event.title)
        .bind(to_i32(event.capacity))
        .bind(event.status.to_string())
        .bind(event.waitlist_enabled)
        .bind(to_i32(event.max_waitlist_size))
        .bind(event.start_time)
        .bind(event.updated_at)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(new_version) = new_version else {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT version FROM volunteer_events WHERE event_id = $1")
                    .bind(event.id.as_uuid())
                    .fetch_optional(&mut *conn)
                    .await?;
            return Err(match exists {
                Some(_) => StoreError::ConcurrentModification {
                    event_id: event.id,
                    expected_version: event.version,
                },
                None => StoreError::EventNotFound { event_id: event.id },
            });
        };

        Self::write_children(conn, roster).await?;

        debug!(
            event_id = %event.id,
            version = new_version,
            "Event roster saved"
        );
        Ok(new_version)
    }

    async fn write_children(conn: &mut PgConnection, roster: &EventRoster) -> StoreResult<()> {
        let event_id = roster.event.id.as_uuid();

        // Records are in creation order, so a cancelled record is updated
        // before a replacement record for the same volunteer is inserted.
        for record in roster.participations() {
            sqlx::query(
                r#"
                INSERT INTO volunteer_participations
                    (participation_id, event_id, volunteer_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (participation_id)
                DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(record.id)
            .bind(event_id)
            .bind(record.volunteer_id.as_uuid())
            .bind(record.status.to_string())
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut *conn)
            .await?;

            let latest = record.most_recent_transition().map_or(0, |t| t.sort_key);
            for transition in &record.transitions {
                sqlx::query(
                    r#"
                    INSERT INTO volunteer_participation_transitions
                        (transition_id, participation_id, from_state, to_state, sort_key,
                         most_recent, reason, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (transition_id) DO NOTHING
                    "#,
                )
                .bind(transition.id)
                .bind(record.id)
                .bind(transition.from_state.map(|s| s.to_string()))
                .bind(transition.to_state.to_string())
                .bind(transition.sort_key)
                .bind(transition.sort_key == latest)
                .bind(transition.reason.as_deref())
                .bind(transition.created_at)
                .execute(&mut *conn)
                .await?;
            }

            sqlx::query(
                r#"
                UPDATE volunteer_participation_transitions
                SET most_recent = false
                WHERE participation_id = $1 AND sort_key < $2 AND most_recent = true
                "#,
            )
            .bind(record.id)
            .bind(latest)
            .execute(&mut *conn)
            .await?;
        }

        sqlx::query("DELETE FROM volunteer_waitlist_entries WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        for entry in roster.waitlist().all_entries() {
            sqlx::query(
                r#"
                INSERT INTO volunteer_waitlist_entries
                    (event_id, volunteer_id, joined_at, sequence, status, notified_at, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(event_id)
            .bind(entry.volunteer_id.as_uuid())
            .bind(entry.joined_at)
            .bind(entry.sequence)
            .bind(entry.status.to_string())
            .bind(entry.notified_at)
            .bind(entry.expires_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn begin_exclusive(&self, event_id: EventId) -> StoreResult<Box<dyn EventSession>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(advisory_key(event_id))
            .execute(&mut *tx)
            .await?;
        debug!(event_id = %event_id, "Advisory lock acquired");
        Ok(Box::new(PgEventSession { tx, event_id }))
    }

    async fn insert(&self, roster: &EventRoster) -> StoreResult<()> {
        let event = &roster.event;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO volunteer_events
                (event_id, title, capacity, status, waitlist_enabled, max_waitlist_size,
                 start_time, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(to_i32(event.capacity))
        .bind(event.status.to_string())
        .bind(event.waitlist_enabled)
        .bind(to_i32(event.max_waitlist_size))
        .bind(event.start_time)
        .bind(event.version)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::DuplicateEvent { event_id: event.id });
        }

        Self::write_children(&mut *tx, roster).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load(&self, event_id: EventId) -> StoreResult<Option<EventRoster>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_roster(&mut *conn, event_id).await
    }

    async fn save(&self, roster: &EventRoster) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;
        let version = Self::save_roster(&mut *tx, roster).await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn events_with_expired_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<EventId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT event_id
            FROM volunteer_waitlist_entries
            WHERE status = 'notified' AND expires_at < $1
            ORDER BY event_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(EventId::from_uuid).collect())
    }
}

#[async_trait]
impl EventSession for PgEventSession {
    async fn load(&mut self) -> StoreResult<Option<EventRoster>> {
        PgEventStore::load_roster(&mut *self.tx, self.event_id).await
    }

    async fn save(&mut self, roster: &EventRoster) -> StoreResult<i64> {
        PgEventStore::save_roster(&mut *self.tx, roster).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::EventFactory;

    #[test]
    fn test_corrupt_status_is_reported() {
        let err = parse_status::<EventStatus>("event status", "archived").unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { field: "event status", .. }));
    }

    #[test]
    fn test_negative_capacity_is_corrupt() {
        assert!(to_u32("capacity", -1).is_err());
        assert_eq!(to_u32("capacity", 4).unwrap(), 4);
    }

    #[test]
    fn test_advisory_key_is_stable_per_event() {
        let event_id = EventId::new();
        assert_eq!(advisory_key(event_id), advisory_key(event_id));
        assert_ne!(advisory_key(event_id), advisory_key(EventId::new()));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a migrated database"]
    async fn test_sessions_on_one_event_serialize() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let config = DatabaseConfig {
            url,
            max_connections: 4,
        };
        // Two pools stand in for two processes
        let app = PgEventStore::connect(&config).await.unwrap();
        let sweeper = PgEventStore::connect(&config).await.unwrap();

        let roster = EventFactory::new().approved().build();
        let event_id = roster.event.id;
        app.insert(&roster).await.unwrap();

        let mut first = app.begin_exclusive(event_id).await.unwrap();
        let loaded = first.load().await.unwrap().unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            sweeper.begin_exclusive(event_id),
        )
        .await;
        assert!(blocked.is_err(), "second session should wait for the first");

        assert_eq!(first.save(&loaded).await.unwrap(), 1);
        first.commit().await.unwrap();

        let mut second = sweeper.begin_exclusive(event_id).await.unwrap();
        let reloaded = second.load().await.unwrap().unwrap();
        assert_eq!(reloaded.event.version, 1);
        assert_eq!(second.save(&reloaded).await.unwrap(), 2);
        second.commit().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a migrated database"]
    async fn test_round_trip_against_postgres() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PgEventStore::connect(&DatabaseConfig {
            url,
            max_connections: 2,
        })
        .await
        .unwrap();

        let mut roster = EventFactory::new().capacity(1).approved().build();
        let now = Utc::now();
        roster
            .open_participation(VolunteerId::new(), ParticipationStatus::Registered, now)
            .unwrap();
        let event_id = roster.event.id;
        roster
            .waitlist_mut()
            .join(event_id, VolunteerId::new(), now, 5)
            .unwrap();
        store.insert(&roster).await.unwrap();

        let loaded = store.load(event_id).await.unwrap().unwrap();
        assert_eq!(loaded.seats_taken(), 1);
        assert_eq!(loaded.waitlist().active_count(), 1);

        assert_eq!(store.save(&loaded).await.unwrap(), 1);
        assert!(matches!(
            store.save(&loaded).await,
            Err(StoreError::ConcurrentModification { .. })
        ));
    }
}
