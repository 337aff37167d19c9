//! Sqlite implementation of BookingRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use hourglass_core::ports::BookingRepository;
use hourglass_domain::{Booking, BookingStatus, HourglassError, Result, TimeSlot};
use rusqlite::Row;
use uuid::Uuid;

use super::manager::DbManager;
use super::{parse_instant, store_instant};
use crate::errors::InfraError;

pub struct SqliteBookingRepository {
    db: Arc<DbManager>,
}

impl SqliteBookingRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

/// Raw column values; timestamps and enums are validated in
/// [`finish_booking`] so the error carries domain context instead of a
/// rusqlite conversion failure.
struct BookingRow {
    id: String,
    user_id: String,
    event_type_id: String,
    start: String,
    end: String,
    attendee_name: String,
    attendee_email: String,
    status: String,
    external_event_ref: Option<String>,
}

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        event_type_id: row.get(2)?,
        start: row.get(3)?,
        end: row.get(4)?,
        attendee_name: row.get(5)?,
        attendee_email: row.get(6)?,
        status: row.get(7)?,
        external_event_ref: row.get(8)?,
    })
}

fn finish_booking(row: BookingRow) -> Result<Booking> {
    Ok(Booking {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| HourglassError::Database(format!("invalid booking id: {e}")))?,
        user_id: row.user_id,
        event_type_id: row.event_type_id,
        start_time: parse_instant(&row.start)?,
        end_time: parse_instant(&row.end)?,
        attendee_name: row.attendee_name,
        attendee_email: row.attendee_email,
        status: BookingStatus::parse(&row.status)?,
        external_event_ref: row.external_event_ref,
    })
}

const BOOKING_COLUMNS: &str = "id, user_id, event_type_id, start_time, end_time, \
                               attendee_name, attendee_email, status, external_event_ref";

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn confirmed_slots_on(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let date = date.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT start_time, end_time FROM bookings
                     WHERE user_id = ?1 AND DATE(start_time) = ?2 AND status = 'confirmed'
                     ORDER BY start_time",
                )
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map((&user_id, &date), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            rows.into_iter()
                .map(|(start, end)| {
                    Ok(TimeSlot { start: parse_instant(&start)?, end: parse_instant(&end)? })
                })
                .collect()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn confirmed_slots_in(&self, user_id: &str, range: TimeSlot) -> Result<Vec<TimeSlot>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let (from, to) = (store_instant(range.start), store_instant(range.end));
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT start_time, end_time FROM bookings
                     WHERE user_id = ?1 AND status = 'confirmed'
                       AND start_time >= ?2 AND start_time < ?3
                     ORDER BY start_time",
                )
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map((&user_id, &from, &to), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            rows.into_iter()
                .map(|(start, end)| {
                    Ok(TimeSlot { start: parse_instant(&start)?, end: parse_instant(&end)? })
                })
                .collect()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn find_conflicting(
        &self,
        user_id: &str,
        slot: TimeSlot,
        exclude: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let (start, end) = (store_instant(slot.start), store_instant(slot.end));
        let exclude = exclude.map(|id| id.to_string()).unwrap_or_default();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            // The general half-open overlap predicate, string-compared on
            // the fixed-width stored form
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM bookings
                     WHERE user_id = ?1 AND status = 'confirmed'
                       AND id != ?2
                       AND start_time < ?4 AND end_time > ?3
                     LIMIT 1",
                    (&user_id, &exclude, &start, &end),
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(InfraError::from(other)),
                })?;

            Ok(found.and_then(|id| Uuid::parse_str(&id).ok()))
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn insert(&self, booking: &Booking) -> Result<()> {
        let db = self.db.clone();
        let booking = booking.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO bookings (id, user_id, event_type_id, start_time, end_time,
                                       attendee_name, attendee_email, status, external_event_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                (
                    booking.id.to_string(),
                    &booking.user_id,
                    &booking.event_type_id,
                    store_instant(booking.start_time),
                    store_instant(booking.end_time),
                    &booking.attendee_name,
                    &booking.attendee_email,
                    booking.status.as_str(),
                    &booking.external_event_ref,
                ),
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let db = self.db.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let partial = conn
                .query_row(
                    &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                    [&id],
                    booking_from_row,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(InfraError::from(other)),
                })?;

            partial.map(finish_booking).transpose()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> Result<()> {
        let db = self.db.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE bookings SET status = ?2 WHERE id = ?1",
                    (&id, status.as_str()),
                )
                .map_err(InfraError::from)?;
            if updated == 0 {
                return Err(HourglassError::NotFound(format!("booking not found: {id}")));
            }
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn update_slot(&self, id: Uuid, slot: TimeSlot, status: BookingStatus) -> Result<()> {
        let db = self.db.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE bookings SET start_time = ?2, end_time = ?3, status = ?4
                     WHERE id = ?1",
                    (&id, store_instant(slot.start), store_instant(slot.end), status.as_str()),
                )
                .map_err(InfraError::from)?;
            if updated == 0 {
                return Err(HourglassError::NotFound(format!("booking not found: {id}")));
            }
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn set_external_ref(&self, id: Uuid, external_ref: &str) -> Result<()> {
        let db = self.db.clone();
        let id = id.to_string();
        let external_ref = external_ref.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE bookings SET external_event_ref = ?2 WHERE id = ?1",
                (&id, &external_ref),
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}
