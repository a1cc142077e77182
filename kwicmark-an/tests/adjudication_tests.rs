//! Adjudication resolver and review queue integration tests

mod helpers;

use kwicmark_an::adjudication::{self, ReviewQueue};
use kwicmark_an::consistency;
use kwicmark_an::db::{decisions, projects, users};
use kwicmark_an::session::ReviewSessions;
use kwicmark_common::{Decision, Error, Role};

#[tokio::test]
async fn disagreement_requires_distinct_decisions() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let carol = helpers::add_annotator(&db.pool, "carol", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one", "two"]).await;

    // Snippet one: {A:1, B:1, C:0} -> flagged. Snippet two: {A:1, B:1}
    // -> unanimous, not flagged.
    helpers::annotate(&db.pool, alice, ids[0], true).await;
    helpers::annotate(&db.pool, bob, ids[0], true).await;
    helpers::annotate(&db.pool, carol, ids[0], false).await;
    helpers::annotate(&db.pool, alice, ids[1], true).await;
    helpers::annotate(&db.pool, bob, ids[1], true).await;

    let items = adjudication::disagreements(&db.pool, project).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].snippet.id, ids[0]);
    assert_eq!(items[0].annotations.len(), 3);
    assert_eq!(items[0].annotations["carol"], Decision::No);
}

#[tokio::test]
async fn review_queue_walks_and_clamps() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one", "two", "three"]).await;

    for id in &ids {
        helpers::annotate(&db.pool, alice, *id, true).await;
        helpers::annotate(&db.pool, bob, *id, false).await;
    }

    let mut queue = ReviewQueue::load(&db.pool, project).await.unwrap();
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.current().unwrap().snippet.id, ids[0]);

    // Walking past the end stays on the last item
    queue.next();
    queue.next();
    queue.next();
    queue.next();
    assert_eq!(queue.current().unwrap().snippet.id, ids[2]);

    // Walking before the start stays on the first
    queue.prev();
    queue.prev();
    queue.prev();
    queue.prev();
    assert_eq!(queue.current().unwrap().snippet.id, ids[0]);
}

#[tokio::test]
async fn resolve_then_advance_records_and_moves() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one", "two"]).await;

    for id in &ids {
        helpers::annotate(&db.pool, alice, *id, true).await;
        helpers::annotate(&db.pool, bob, *id, false).await;
    }

    let mut queue = ReviewQueue::load(&db.pool, project).await.unwrap();
    queue
        .resolve_then_advance(&db.pool, Decision::Yes)
        .await
        .unwrap();

    assert_eq!(queue.current().unwrap().snippet.id, ids[1]);
    assert_eq!(
        decisions::get(&db.pool, ids[0]).await.unwrap(),
        Some(Decision::Yes)
    );

    // Repeated resolution overwrites rather than accumulating rows
    adjudication::resolve(&db.pool, ids[0], Decision::No).await.unwrap();
    assert_eq!(
        decisions::get(&db.pool, ids[0]).await.unwrap(),
        Some(Decision::No)
    );
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM final_decisions WHERE snippet_id = ?")
        .bind(ids[0])
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn refresh_picks_up_new_disagreements() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one", "two"]).await;

    helpers::annotate(&db.pool, alice, ids[0], true).await;
    helpers::annotate(&db.pool, bob, ids[0], false).await;

    let mut queue = ReviewQueue::load(&db.pool, project).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.version(), 0);

    // A new disagreement lands after the snapshot was taken
    helpers::annotate(&db.pool, alice, ids[1], true).await;
    helpers::annotate(&db.pool, bob, ids[1], false).await;
    assert_eq!(queue.len(), 1, "snapshot stays fixed until refresh");

    queue.refresh(&db.pool).await.unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.version(), 1);
}

#[tokio::test]
async fn current_resolution_reflects_prior_adjudication() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one"]).await;

    helpers::annotate(&db.pool, alice, ids[0], true).await;
    helpers::annotate(&db.pool, bob, ids[0], false).await;

    let queue = ReviewQueue::load(&db.pool, project).await.unwrap();
    assert_eq!(queue.current_resolution(&db.pool).await.unwrap(), None);

    adjudication::resolve(&db.pool, ids[0], Decision::Yes).await.unwrap();
    assert_eq!(
        queue.current_resolution(&db.pool).await.unwrap(),
        Some(Decision::Yes)
    );
}

#[tokio::test]
async fn consistency_over_duplicate_content() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;

    // Content "X" appears three times; "unique" once
    let ids = helpers::add_snippets(&db.pool, project, &["X", "X", "X", "unique"]).await;

    // Alice contradicts herself on the X group: [1, 1, 0]
    helpers::annotate(&db.pool, alice, ids[0], true).await;
    helpers::annotate(&db.pool, alice, ids[1], true).await;
    helpers::annotate(&db.pool, alice, ids[2], false).await;

    // Bob only ever saw distinct content
    helpers::annotate(&db.pool, bob, ids[0], true).await;
    helpers::annotate(&db.pool, bob, ids[3], false).await;

    let reports = consistency::consistency(&db.pool, project).await.unwrap();
    assert_eq!(reports.len(), 2);

    let alice_report = reports.iter().find(|r| r.user_id == alice).unwrap();
    assert_eq!(alice_report.total, 3);
    assert_eq!(alice_report.consistent, 0);
    assert_eq!(alice_report.ratio(), 0.0);

    let bob_report = reports.iter().find(|r| r.user_id == bob).unwrap();
    assert_eq!(bob_report.total, 0);
    assert_eq!(bob_report.ratio(), 1.0);
}

#[tokio::test]
async fn review_sessions_keep_position_across_take_and_put() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let super_id = helpers::add_annotator(&db.pool, "super", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one", "two", "three"]).await;

    for id in &ids {
        helpers::annotate(&db.pool, alice, *id, true).await;
        helpers::annotate(&db.pool, bob, *id, false).await;
    }

    let sessions = ReviewSessions::new();
    assert!(sessions.take(super_id, project).await.is_none());

    let mut queue = ReviewQueue::load(&db.pool, project).await.unwrap();
    assert!(!queue.is_empty());
    assert_eq!(queue.project_id(), project);
    queue.next();
    assert_eq!(queue.position(), (1, 3));
    sessions.put(super_id, project, queue).await;

    // A later request resumes where the stored queue left off
    let queue = sessions.take(super_id, project).await.unwrap();
    assert_eq!(queue.position(), (1, 3));
    assert_eq!(queue.current().unwrap().snippet.id, ids[1]);

    // take removes the entry; an empty project yields an empty queue
    assert!(sessions.take(super_id, project).await.is_none());
    let other = helpers::create_project(&db.pool, "q").await;
    let empty = ReviewQueue::load(&db.pool, other).await.unwrap();
    assert!(empty.is_empty());
    assert!(empty.current().is_none());
}

#[tokio::test]
async fn resolve_for_enforces_role_and_assignment() {
    let db = helpers::setup().await;
    let project = helpers::create_project(&db.pool, "p").await;
    let alice = helpers::add_annotator(&db.pool, "alice", project).await;
    let bob = helpers::add_annotator(&db.pool, "bob", project).await;
    let ids = helpers::add_snippets(&db.pool, project, &["one"]).await;
    helpers::annotate(&db.pool, alice, ids[0], true).await;
    helpers::annotate(&db.pool, bob, ids[0], false).await;

    // An annotator cannot adjudicate
    let alice_user = users::get_by_username(&db.pool, "alice").await.unwrap();
    let result = adjudication::resolve_for(&db.pool, &alice_user, ids[0], Decision::Yes).await;
    assert!(matches!(result, Err(Error::Unauthorized(_))));

    // Neither can a superannotator who is not assigned to the project
    users::create(&db.pool, "sam", Role::Superannotator)
        .await
        .unwrap();
    let sam = users::get_by_username(&db.pool, "sam").await.unwrap();
    let result = adjudication::resolve_for(&db.pool, &sam, ids[0], Decision::Yes).await;
    assert!(matches!(result, Err(Error::Unauthorized(_))));

    // Assigned superannotator succeeds
    projects::assign_user(&db.pool, sam.id, project).await.unwrap();
    adjudication::resolve_for(&db.pool, &sam, ids[0], Decision::Yes)
        .await
        .unwrap();
    assert_eq!(
        decisions::get(&db.pool, ids[0]).await.unwrap(),
        Some(Decision::Yes)
    );

    // A snippet that does not exist is a lookup failure, not a write
    let result = adjudication::resolve_for(&db.pool, &sam, 9999, Decision::No).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
