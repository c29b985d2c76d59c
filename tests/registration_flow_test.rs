//! Registration and waitlist allocator integration tests
//!
//! Requires TEST_DATABASE_URL; each test skips cleanly when it is unset.

mod helpers;

use assert_matches::assert_matches;
use futures::future::join_all;
use helpers::{actor, TestApp};
use serial_test::serial;

use campushub::models::{RegistrationStatus, UserRole};
use campushub::CampusHubError;

#[tokio::test]
#[serial]
async fn test_register_waitlist_and_promote() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let alice = app.create_user("Alice", UserRole::User).await;
    let bob = app.create_user("Bob", UserRole::User).await;
    let carol = app.create_user("Carol", UserRole::User).await;

    let event = app.create_published_event(&admin, Some(2)).await;

    let a = app
        .services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();
    let b = app
        .services
        .registrations
        .register_for_event(event.id, &actor(&bob))
        .await
        .unwrap();
    let c = app
        .services
        .registrations
        .register_for_event(event.id, &actor(&carol))
        .await
        .unwrap();

    assert_eq!(a.status, RegistrationStatus::Registered);
    assert_eq!(b.status, RegistrationStatus::Registered);
    assert_eq!(c.status, RegistrationStatus::Waitlisted);

    let stats = app
        .services
        .registrations
        .registration_stats(event.id)
        .await
        .unwrap();
    assert_eq!(stats.counts.registered, 2);
    assert_eq!(stats.counts.waitlisted, 1);
    assert!(stats.is_full);
    assert!(!stats.can_register);

    // Alice leaves; Carol (earliest waitlisted) takes the seat.
    app.services
        .registrations
        .unregister_from_event(event.id, alice.id, &actor(&alice))
        .await
        .unwrap();

    let rows = app
        .services
        .registrations
        .list_event_registrations(event.id)
        .await
        .unwrap();
    let status_of = |user_id: i64| {
        rows.iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.status)
            .unwrap()
    };
    assert_eq!(status_of(alice.id), RegistrationStatus::Cancelled);
    assert_eq!(status_of(bob.id), RegistrationStatus::Registered);
    assert_eq!(status_of(carol.id), RegistrationStatus::Registered);

    // Registered count is conserved by the promotion.
    let stats = app
        .services
        .registrations
        .registration_stats(event.id)
        .await
        .unwrap();
    assert_eq!(stats.counts.registered, 2);
    assert_eq!(stats.counts.waitlisted, 0);
}

#[tokio::test]
#[serial]
async fn test_duplicate_registration_rejected() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let alice = app.create_user("Alice", UserRole::User).await;
    let event = app.create_published_event(&admin, Some(1)).await;

    app.services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();

    assert_matches!(
        app.services
            .registrations
            .register_for_event(event.id, &actor(&alice))
            .await,
        Err(CampusHubError::AlreadyRegistered)
    );

    // A second caller lands on the waitlist; registering again is also
    // rejected, with the waitlist-specific error.
    let bob = app.create_user("Bob", UserRole::User).await;
    app.services
        .registrations
        .register_for_event(event.id, &actor(&bob))
        .await
        .unwrap();
    assert_matches!(
        app.services
            .registrations
            .register_for_event(event.id, &actor(&bob))
            .await,
        Err(CampusHubError::AlreadyWaitlisted)
    );
}

#[tokio::test]
#[serial]
async fn test_reactivation_reuses_row() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let alice = app.create_user("Alice", UserRole::User).await;
    let event = app.create_published_event(&admin, Some(5)).await;

    app.services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();
    app.services
        .registrations
        .unregister_from_event(event.id, alice.id, &actor(&alice))
        .await
        .unwrap();
    let reactivated = app
        .services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();

    assert_eq!(reactivated.status, RegistrationStatus::Registered);

    // Exactly one row exists for the pair.
    let rows = app
        .services
        .registrations
        .list_event_registrations(event.id)
        .await
        .unwrap();
    assert_eq!(rows.iter().filter(|r| r.user_id == alice.id).count(), 1);
}

#[tokio::test]
#[serial]
async fn test_reactivation_waitlists_when_event_filled_up() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let alice = app.create_user("Alice", UserRole::User).await;
    let bob = app.create_user("Bob", UserRole::User).await;
    let event = app.create_published_event(&admin, Some(1)).await;

    app.services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();
    app.services
        .registrations
        .unregister_from_event(event.id, alice.id, &actor(&alice))
        .await
        .unwrap();

    // Bob takes the only seat while Alice is cancelled.
    app.services
        .registrations
        .register_for_event(event.id, &actor(&bob))
        .await
        .unwrap();

    // Reactivation re-runs the capacity check and lands on the waitlist.
    let reactivated = app
        .services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();
    assert_eq!(reactivated.status, RegistrationStatus::Waitlisted);
}

#[tokio::test]
#[serial]
async fn test_unregister_requires_active_registration() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let alice = app.create_user("Alice", UserRole::User).await;
    let event = app.create_published_event(&admin, None).await;

    assert_matches!(
        app.services
            .registrations
            .unregister_from_event(event.id, alice.id, &actor(&alice))
            .await,
        Err(CampusHubError::NotRegistered)
    );
}

#[tokio::test]
#[serial]
async fn test_unregister_waitlisted_does_not_promote() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let alice = app.create_user("Alice", UserRole::User).await;
    let bob = app.create_user("Bob", UserRole::User).await;
    let carol = app.create_user("Carol", UserRole::User).await;
    let event = app.create_published_event(&admin, Some(1)).await;

    app.services
        .registrations
        .register_for_event(event.id, &actor(&alice))
        .await
        .unwrap();
    app.services
        .registrations
        .register_for_event(event.id, &actor(&bob))
        .await
        .unwrap();
    app.services
        .registrations
        .register_for_event(event.id, &actor(&carol))
        .await
        .unwrap();

    // Bob leaves the waitlist: no seat vacated, Carol stays waitlisted.
    app.services
        .registrations
        .unregister_from_event(event.id, bob.id, &actor(&bob))
        .await
        .unwrap();

    let rows = app
        .services
        .registrations
        .list_event_registrations(event.id)
        .await
        .unwrap();
    let carol_row = rows.iter().find(|r| r.user_id == carol.id).unwrap();
    assert_eq!(carol_row.status, RegistrationStatus::Waitlisted);
}

#[tokio::test]
#[serial]
async fn test_category_restriction_enforced() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let student = app
        .create_user_with_category("Student One", UserRole::User, Some("student"))
        .await;
    let visitor = app
        .create_user_with_category("Visitor One", UserRole::User, Some("visitor"))
        .await;

    let event_at = chrono::Utc::now() + chrono::Duration::days(2);
    let event = app
        .services
        .events
        .create_event(
            campushub::models::CreateEventRequest {
                title: "Students Only".to_string(),
                description: None,
                event_at,
                registration_starts_at: chrono::Utc::now() - chrono::Duration::hours(1),
                registration_ends_at: event_at - chrono::Duration::hours(1),
                location_id: None,
                max_attendees: None,
                allowed_categories: Some(vec!["student".to_string()]),
                publish_immediately: true,
            },
            &actor(&admin),
        )
        .await
        .unwrap();

    assert!(app
        .services
        .registrations
        .register_for_event(event.id, &actor(&student))
        .await
        .is_ok());
    assert_matches!(
        app.services
            .registrations
            .register_for_event(event.id, &actor(&visitor))
            .await,
        Err(CampusHubError::CategoryRestricted)
    );
}

#[tokio::test]
#[serial]
async fn test_capacity_invariant_under_concurrent_registration() {
    let Some(app) = TestApp::new().await else { return };

    let admin = app.create_user("Admin One", UserRole::Admin).await;
    let event = app.create_published_event(&admin, Some(1)).await;

    let mut users = Vec::new();
    for i in 0..5 {
        users.push(app.create_user(&format!("Racer {i}"), UserRole::User).await);
    }

    let tasks = users.iter().map(|user| {
        let registrations = app.services.registrations.clone();
        let actor = actor(user);
        let event_id = event.id;
        tokio::spawn(async move { registrations.register_for_event(event_id, &actor).await })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let registered = outcomes
        .iter()
        .filter(|r| r.status == RegistrationStatus::Registered)
        .count();
    let waitlisted = outcomes
        .iter()
        .filter(|r| r.status == RegistrationStatus::Waitlisted)
        .count();
    assert_eq!(registered, 1);
    assert_eq!(waitlisted, 4);

    let stats = app
        .services
        .registrations
        .registration_stats(event.id)
        .await
        .unwrap();
    assert_eq!(stats.counts.registered, 1);
    assert_eq!(stats.counts.waitlisted, 4);
}
