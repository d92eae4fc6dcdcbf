//! Integration tests for the work-session repository.

use chrono::{Duration, Utc};
use pomo_core::work_session::{FinishOutcome, SessionState, SessionStatus, SessionType};
use pomo_db::models::task::CreateTask;
use pomo_db::models::user::CreateUser;
use pomo_db::models::work_session::{CreateWorkSession, WorkSessionFilter};
use pomo_db::repositories::{TaskRepo, UserRepo, WorkSessionRepo};
use sqlx::PgPool;

async fn new_user(pool: &PgPool, name: &str) -> i64 {
    let input = CreateUser {
        username: name.to_string(),
        email: format!("{name}@test.com"),
        password_hash: "not-a-real-hash".to_string(),
        role: "user".to_string(),
    };
    UserRepo::create(pool, &input).await.unwrap().id
}

fn new_session(user_id: i64, task_id: Option<i64>) -> CreateWorkSession {
    CreateWorkSession {
        user_id,
        task_id,
        session_type: SessionType::Pomodoro,
        state: SessionState::start(Utc::now(), Some(25)),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_and_read_back_state(pool: PgPool) {
    let user_id = new_user(&pool, "timer").await;
    let session = WorkSessionRepo::create(&pool, &new_session(user_id, None))
        .await
        .unwrap();

    let found = WorkSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    let state = found.state().unwrap();
    assert_eq!(state.status, SessionStatus::Running);
    assert_eq!(state.total_paused_seconds, 0);
    assert_eq!(found.session_type, SessionType::Pomodoro.as_str());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_transition_requires_expected_status(pool: PgPool) {
    let user_id = new_user(&pool, "pauser").await;
    let session = WorkSessionRepo::create(&pool, &new_session(user_id, None))
        .await
        .unwrap();

    let current = session.state().unwrap();
    let mut state = current.clone();
    state.pause(Utc::now()).unwrap();

    let paused = WorkSessionRepo::apply_transition(&pool, session.id, &current, &state)
        .await
        .unwrap()
        .expect("row was running");
    assert_eq!(paused.status, "paused");
    assert!(paused.paused_at.is_some());

    // Replaying the same transition against the stale status matches nothing.
    let stale = WorkSessionRepo::apply_transition(&pool, session.id, &current, &state)
        .await
        .unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_write_after_pause_resume_cycle_is_rejected(pool: PgPool) {
    let user_id = new_user(&pool, "cycler").await;
    let session = WorkSessionRepo::create(&pool, &new_session(user_id, None))
        .await
        .unwrap();
    let start = session.start_time;

    // Request A reads the running row and computes a finish from it.
    let stale = session.state().unwrap();
    let mut stale_finish = stale.clone();
    stale_finish
        .finish(FinishOutcome::Completed, None, None, start + Duration::seconds(200))
        .unwrap();

    // Request B pauses and resumes in between; the row is running again.
    let mut paused = stale.clone();
    paused.pause(start + Duration::seconds(100)).unwrap();
    let row = WorkSessionRepo::apply_transition(&pool, session.id, &stale, &paused)
        .await
        .unwrap()
        .unwrap();
    let paused = row.state().unwrap();
    let mut resumed = paused.clone();
    resumed.resume(start + Duration::seconds(160)).unwrap();
    let row = WorkSessionRepo::apply_transition(&pool, session.id, &paused, &resumed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "running");
    assert_eq!(row.total_paused_seconds, 60);

    // A's write still sees status = running but must not land.
    let lost = WorkSessionRepo::apply_transition(&pool, session.id, &stale, &stale_finish)
        .await
        .unwrap();
    assert!(lost.is_none());

    let after = WorkSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, "running");
    assert_eq!(after.total_paused_seconds, 60);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_paused_at_constraint_rejects_inconsistent_rows(pool: PgPool) {
    let user_id = new_user(&pool, "broken").await;
    let session = WorkSessionRepo::create(&pool, &new_session(user_id, None))
        .await
        .unwrap();

    let current = session.state().unwrap();
    let mut state = current.clone();
    state.status = SessionStatus::Paused;
    state.paused_at = None;

    let result = WorkSessionRepo::apply_transition(&pool, session.id, &current, &state).await;
    assert!(result.is_err(), "paused without paused_at must violate the check");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_filters_by_owner_task_and_status(pool: PgPool) {
    let alice = new_user(&pool, "alice").await;
    let bob = new_user(&pool, "bob").await;
    let task = TaskRepo::create(
        &pool,
        &CreateTask {
            user_id: alice,
            title: "Write report".to_string(),
        },
    )
    .await
    .unwrap();

    let with_task = WorkSessionRepo::create(&pool, &new_session(alice, Some(task.id)))
        .await
        .unwrap();
    WorkSessionRepo::create(&pool, &new_session(alice, None))
        .await
        .unwrap();
    WorkSessionRepo::create(&pool, &new_session(bob, None))
        .await
        .unwrap();

    let running = with_task.state().unwrap();
    let mut finished = running.clone();
    finished
        .finish(FinishOutcome::Completed, None, None, Utc::now())
        .unwrap();
    WorkSessionRepo::apply_transition(&pool, with_task.id, &running, &finished)
        .await
        .unwrap()
        .unwrap();

    let alice_all = WorkSessionRepo::list(
        &pool,
        &WorkSessionFilter {
            user_id: Some(alice),
            ..Default::default()
        },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(alice_all.len(), 2);

    let completed_for_task = WorkSessionRepo::list(
        &pool,
        &WorkSessionFilter {
            user_id: Some(alice),
            task_id: Some(task.id),
            status: Some(SessionStatus::Completed),
            ..Default::default()
        },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(completed_for_task.len(), 1);
    assert_eq!(completed_for_task[0].id, with_task.id);

    let everyone = WorkSessionRepo::list(&pool, &WorkSessionFilter::default(), 50, 0)
        .await
        .unwrap();
    assert_eq!(everyone.len(), 3);

    let future_only = WorkSessionRepo::list(
        &pool,
        &WorkSessionFilter {
            from: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        },
        50,
        0,
    )
    .await
    .unwrap();
    assert!(future_only.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_removes_row(pool: PgPool) {
    let user_id = new_user(&pool, "deleter").await;
    let session = WorkSessionRepo::create(&pool, &new_session(user_id, None))
        .await
        .unwrap();

    assert!(WorkSessionRepo::delete(&pool, session.id).await.unwrap());
    assert!(!WorkSessionRepo::delete(&pool, session.id).await.unwrap());
    assert!(WorkSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .is_none());
}
