//! Booking lifecycle integration tests over in-memory fakes.

mod support;

use chrono::{TimeZone, Utc};
use hourglass_core::NewBooking;
use hourglass_domain::{BookingStatus, HourglassError, TimeSlot};
use support::{harness, EVENT_SLUG};

fn slot(h: u32, m: u32) -> TimeSlot {
    // A future Monday (2026-06-15) relative to the mock clock
    let start = Utc.with_ymd_and_hms(2026, 6, 15, h, m, 0).unwrap();
    TimeSlot { start, end: start + chrono::Duration::minutes(30) }
}

fn request(s: TimeSlot) -> NewBooking {
    NewBooking {
        event_slug: EVENT_SLUG.to_string(),
        slot: s,
        attendee_name: "Ada Lovelace".to_string(),
        attendee_email: "ada@example.com".to_string(),
        notes: Some("looking forward to it".to_string()),
    }
}

#[tokio::test]
async fn test_create_books_and_mirrors_event() {
    let h = harness();

    let booking = h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.external_event_ref.as_deref(), Some("google:evt-1"));
    assert_eq!(h.notifier.confirmed.lock().len(), 1);

    let created = h.google.created_events.lock();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].summary, "Intro Call with Ada Lovelace");
    assert_eq!(created[0].slot, slot(14, 0));
}

#[tokio::test]
async fn test_conflicting_booking_is_rejected() {
    let h = harness();

    h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    // Same slot
    let same = h.bookings_service.create(request(slot(14, 0))).await;
    assert!(matches!(same, Err(HourglassError::Conflict(_))));

    // Overlapping slot
    let overlapping = h.bookings_service.create(request(slot(14, 15))).await;
    assert!(matches!(overlapping, Err(HourglassError::Conflict(_))));

    // Adjacent slot is fine under half-open semantics
    h.bookings_service.create(request(slot(14, 30))).await.unwrap();
}

/// The no-double-booking invariant: across everything the service accepted,
/// confirmed intervals never overlap.
#[tokio::test]
async fn test_confirmed_bookings_never_overlap() {
    let h = harness();

    for (hour, minute) in [(14, 0), (14, 15), (14, 30), (15, 0), (14, 45), (15, 15)] {
        let _ = h.bookings_service.create(request(slot(hour, minute))).await;
    }

    let confirmed: Vec<TimeSlot> = h
        .bookings
        .all()
        .into_iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .map(|b| b.slot())
        .collect();

    for (i, a) in confirmed.iter().enumerate() {
        for b in &confirmed[i + 1..] {
            assert!(!a.overlaps(b), "confirmed bookings {a:?} and {b:?} overlap");
        }
    }
}

#[tokio::test]
async fn test_calendar_failure_does_not_block_booking() {
    let h = harness();
    h.google.fail_requests(true);
    h.outlook.fail_requests(true);

    let booking = h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.external_event_ref, None, "no mirrored event, booking stands");
}

#[tokio::test]
async fn test_cancel_is_terminal() {
    let h = harness();
    let booking = h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    let canceled = h.bookings_service.cancel(booking.id).await.unwrap();
    assert_eq!(canceled.status, BookingStatus::Canceled);
    assert_eq!(h.google.deleted_events.lock().as_slice(), ["evt-1"]);
    assert_eq!(h.notifier.canceled.lock().len(), 1);

    // Canceled is terminal
    let again = h.bookings_service.cancel(booking.id).await;
    assert!(matches!(again, Err(HourglassError::Conflict(_))));

    // And the slot is free again
    h.bookings_service.create(request(slot(14, 0))).await.unwrap();
}

#[tokio::test]
async fn test_reschedule_moves_confirmed_booking() {
    let h = harness();
    let booking = h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    let moved = h.bookings_service.reschedule(booking.id, slot(16, 0)).await.unwrap();

    assert_eq!(moved.status, BookingStatus::Confirmed);
    assert_eq!(moved.start_time, slot(16, 0).start);
    assert_eq!(h.notifier.rescheduled.lock().len(), 1);

    let stored = h.bookings.all().into_iter().find(|b| b.id == booking.id).unwrap();
    assert_eq!(stored.start_time, slot(16, 0).start);
    assert_eq!(stored.status, BookingStatus::Confirmed);

    let updates = h.google.updated_events.lock();
    assert_eq!(updates.as_slice(), [("evt-1".to_string(), slot(16, 0))]);
}

#[tokio::test]
async fn test_reschedule_rejects_conflicting_target() {
    let h = harness();
    let first = h.bookings_service.create(request(slot(14, 0))).await.unwrap();
    h.bookings_service.create(request(slot(16, 0))).await.unwrap();

    let result = h.bookings_service.reschedule(first.id, slot(16, 0)).await;
    assert!(matches!(result, Err(HourglassError::Conflict(_))));
}

/// Rescheduling onto a slot that only conflicts with the booking itself is
/// allowed (the conflict check excludes the booking being moved).
#[tokio::test]
async fn test_reschedule_may_overlap_itself() {
    let h = harness();
    let booking = h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    let moved = h.bookings_service.reschedule(booking.id, slot(14, 15)).await.unwrap();
    assert_eq!(moved.start_time, slot(14, 15).start);
}

#[tokio::test]
async fn test_reschedule_requires_confirmed_status() {
    let h = harness();
    let booking = h.bookings_service.create(request(slot(14, 0))).await.unwrap();
    h.bookings_service.cancel(booking.id).await.unwrap();

    let result = h.bookings_service.reschedule(booking.id, slot(16, 0)).await;
    assert!(matches!(result, Err(HourglassError::Conflict(_))));
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let h = harness();
    let result = h.bookings_service.cancel(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(HourglassError::NotFound(_))));
}

/// Booking a slot removes it from subsequent availability computations: the
/// write invalidates the cached day.
#[tokio::test]
async fn test_booking_invalidates_availability_cache() {
    let h = harness();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();

    let before = h.availability.compute_availability(EVENT_SLUG, date, None).await.unwrap();
    assert_eq!(before.slots.len(), 16);

    h.bookings_service.create(request(slot(14, 0))).await.unwrap();

    let after = h.availability.compute_availability(EVENT_SLUG, date, None).await.unwrap();
    assert_eq!(after.slots.len(), 15);
    assert!(!after.slots.iter().any(|s| s.start == slot(14, 0).start));
}
