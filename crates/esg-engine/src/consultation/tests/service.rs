use super::common::*;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::consultation::{ConsultationError, ConsultationStatus, LedgerError};

#[test]
fn scheduling_requires_enough_remaining_hours() {
    let (service, _) = build_service(StubLedger::with_hours(1));
    let owner = user("ana");

    match service.schedule(&owner, booking(in_days(2, 10), 90)) {
        Err(ConsultationError::InsufficientHours { needed, remaining }) => {
            assert_eq!(needed, Decimal::new(15, 1));
            assert_eq!(remaining, Decimal::ONE);
        }
        other => panic!("expected insufficient hours, got {other:?}"),
    }

    let booked = service
        .schedule(&owner, booking(in_days(2, 10), 60))
        .expect("one hour fits");
    assert_eq!(booked.status, ConsultationStatus::Scheduled);
    assert_eq!(booked.topic.as_deref(), Some("Inventário de emissões"));
}

#[test]
fn durations_outside_bounds_are_rejected() {
    let (service, _) = build_service(StubLedger::with_hours(24));
    let owner = user("bia");
    for minutes in [0, 481] {
        assert!(matches!(
            service.schedule(&owner, booking(in_days(1, 9), minutes)),
            Err(ConsultationError::InvalidDuration(value)) if value == minutes
        ));
    }
}

#[test]
fn overlapping_bookings_of_the_same_user_are_refused() {
    let (service, _) = build_service(StubLedger::with_hours(24));
    let owner = user("caio");
    let first = in_days(3, 10);
    service
        .schedule(&owner, booking(first, 60))
        .expect("first booking");

    // Starts inside the lead buffer before the existing session.
    assert!(matches!(
        service.schedule(&owner, booking(first - Duration::minutes(30), 30)),
        Err(ConsultationError::SlotTaken)
    ));
    // Another user is unaffected.
    service
        .schedule(&user("dani"), booking(first, 60))
        .expect("other user books the same hour");
    // Far enough apart.
    service
        .schedule(&owner, booking(first + Duration::hours(3), 60))
        .expect("later booking");
}

#[test]
fn cancelled_sessions_free_their_slot() {
    let (service, _) = build_service(StubLedger::with_hours(24));
    let owner = user("edu");
    let at = in_days(4, 14);
    let booked = service.schedule(&owner, booking(at, 60)).expect("book");
    service.cancel(&owner, booked.id).expect("cancel");

    service
        .schedule(&owner, booking(at, 60))
        .expect("slot is free again");
}

#[test]
fn completion_charges_hours_once() {
    let (service, ledger) = build_service(StubLedger::with_hours(4));
    let owner = user("fabi");
    let booked = service
        .schedule(&owner, booking(in_days(1, 11), 90))
        .expect("book");

    assert!(matches!(
        service.complete(&owner, booked.id, None),
        Err(ConsultationError::InvalidTransition { status: ConsultationStatus::Scheduled, .. })
    ));

    let started = service.start(&owner, booked.id).expect("start");
    assert!(started.started_at.is_some());

    let completed = service
        .complete(&owner, booked.id, Some("Plano de descarbonização revisado".to_string()))
        .expect("complete");
    assert_eq!(completed.status, ConsultationStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(
        completed.notes.as_deref(),
        Some("Plano de descarbonização revisado")
    );
    assert_eq!(ledger.debits(), vec![Decimal::new(15, 1)]);

    assert!(matches!(
        service.complete(&owner, booked.id, None),
        Err(ConsultationError::InvalidTransition { status: ConsultationStatus::Completed, .. })
    ));
    assert!(matches!(
        service.cancel(&owner, booked.id),
        Err(ConsultationError::InvalidTransition { .. })
    ));
    assert_eq!(ledger.debits().len(), 1);
}

#[test]
fn failed_charge_reopens_the_session() {
    let (service, _) = build_service(StubLedger::refusing(8));
    let owner = user("gabi");
    let booked = service
        .schedule(&owner, booking(in_days(1, 15), 60))
        .expect("book");
    service.start(&owner, booked.id).expect("start");

    let error = service
        .complete(&owner, booked.id, Some("notas".to_string()))
        .expect_err("debit refused");
    assert!(matches!(
        error,
        ConsultationError::Ledger(LedgerError::Insufficient { .. })
    ));
    assert_eq!(error.kind(), crate::error::ErrorKind::CapacityExceeded);

    let current = service.get(&owner, booked.id).expect("still there");
    assert_eq!(current.status, ConsultationStatus::InProgress);
    assert!(current.completed_at.is_none());
}

#[test]
fn consultations_are_private_to_their_owner() {
    let (service, _) = build_service(StubLedger::with_hours(8));
    let booked = service
        .schedule(&user("hugo"), booking(in_days(2, 9), 60))
        .expect("book");

    assert!(matches!(
        service.get(&user("iris"), booked.id),
        Err(ConsultationError::NotFound)
    ));
    assert!(matches!(
        service.start(&user("iris"), booked.id),
        Err(ConsultationError::NotFound)
    ));
}

#[test]
fn listings_filter_and_order() {
    let (service, _) = build_service(StubLedger::with_hours(24));
    let owner = user("joao");
    let early = service
        .schedule(&owner, booking(in_days(1, 9), 60))
        .expect("early");
    let late = service
        .schedule(&owner, booking(in_days(5, 9), 60))
        .expect("late");
    service.cancel(&owner, late.id).expect("cancel");
    service
        .schedule(&owner, booking(in_days(3, 9), 60))
        .expect("middle");

    let all = service.list(&owner, None).expect("list");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, late.id);

    let cancelled = service
        .list(&owner, Some(ConsultationStatus::Cancelled))
        .expect("cancelled");
    assert_eq!(cancelled.len(), 1);

    let upcoming = service.upcoming(&owner).expect("upcoming");
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0].id, early.id);
}

#[test]
fn slots_cover_business_hours_and_mark_booked_ones() {
    let (service, _) = build_service(StubLedger::with_hours(24));
    let day = in_days(6, 10);
    service
        .schedule(&user("kai"), booking(day, 120))
        .expect("book two hours");

    let slots = service
        .slots_at(day.date_naive(), Utc::now())
        .expect("slots");
    assert_eq!(slots.len(), 9);
    assert_eq!(slots[0].time, "09:00");
    assert_eq!(slots[8].time, "17:00");
    let taken: Vec<&str> = slots
        .iter()
        .filter(|slot| !slot.available)
        .map(|slot| slot.time.as_str())
        .collect();
    assert_eq!(taken, vec!["10:00", "11:00"]);

    let past = service
        .slots_at(day.date_naive(), day + Duration::days(2))
        .expect("slots");
    assert!(past.iter().all(|slot| !slot.available));
}
