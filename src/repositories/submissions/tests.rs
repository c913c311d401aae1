use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use super::{finalize, upsert_draft, DraftUpsert, FinalizeSubmission, Finalized};
use crate::core::time::primitive_now_utc;
use crate::db::models::{Submission, Testcase};
use crate::db::types::{GradeStatus, SubmissionState, TestcaseStatus, UserRole};
use crate::repositories;
use crate::repositories::testcases::{GuardedWrite, UpdateTestcase};
use crate::services::grading::{Aggregate, CaseOutcome};
use crate::test_support;

struct Seeded {
    draft: Submission,
    testcase: Testcase,
}

async fn seed(pool: &PgPool) -> Seeded {
    let admin = test_support::insert_user(pool, "admin@example.com", "Admin", UserRole::Admin).await;
    let candidate =
        test_support::insert_user(pool, "cand@example.com", "Cand", UserRole::Candidate).await;
    let problem = test_support::insert_problem(pool, "Echo", &admin.id).await;
    let testcase = test_support::insert_testcase(pool, &problem.id, "7", "7", false).await;
    let draft = upsert_draft(
        pool,
        DraftUpsert {
            candidate_id: &candidate.id,
            problem_id: &problem.id,
            code: "echo",
            language: "python",
            now: primitive_now_utc(),
        },
    )
    .await
    .expect("draft");

    Seeded { draft, testcase }
}

fn passing(testcase: &Testcase) -> CaseOutcome {
    CaseOutcome {
        testcase_id: testcase.id.clone(),
        status: TestcaseStatus::Passed,
        stdout: testcase.expected_output.clone(),
        stderr: String::new(),
        compile_output: String::new(),
        error: None,
        indeterminate: false,
    }
}

const ALL_PASSED: Aggregate = Aggregate { passed: 1, total: 1, status: GradeStatus::Passed, score: 100 };

async fn finalize_one(
    pool: &PgPool,
    submission_id: &str,
    testcase: &Testcase,
) -> Result<Finalized, sqlx::Error> {
    let outcomes = [passing(testcase)];
    finalize(
        pool,
        FinalizeSubmission {
            submission_id,
            code: "echo",
            aggregate: ALL_PASSED,
            outcomes: &outcomes,
            graded: std::slice::from_ref(testcase),
            now: primitive_now_utc(),
        },
    )
    .await
}

async fn result_count(pool: &PgPool, submission_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM submission_results WHERE submission_id = $1")
        .bind(submission_id)
        .fetch_one(pool)
        .await
        .expect("count results")
}

#[tokio::test]
async fn second_finalize_writes_nothing() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let seeded = seed(pool).await;

    let first = finalize_one(pool, &seeded.draft.id, &seeded.testcase).await.expect("finalize");
    let Finalized::Sealed(sealed) = first else {
        panic!("expected the first finalize to seal, got {first:?}");
    };
    assert_eq!(sealed.submission_status, SubmissionState::Submitted);
    assert_eq!(sealed.code.as_deref(), Some("echo"));

    let second = finalize_one(pool, &seeded.draft.id, &seeded.testcase).await.expect("finalize");
    assert!(matches!(second, Finalized::AlreadySubmitted), "got {second:?}");
    assert_eq!(result_count(pool, &seeded.draft.id).await, 1);
}

#[tokio::test]
async fn delete_waiting_on_an_open_finalize_is_refused() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db().clone();
    let seeded = seed(&pool).await;

    // Same locks and writes as finalize, held open.
    let mut tx = pool.begin().await.expect("begin");
    sqlx::query("SELECT id FROM testcases WHERE id = $1 FOR SHARE")
        .bind(&seeded.testcase.id)
        .fetch_all(&mut *tx)
        .await
        .expect("share lock");
    sqlx::query(
        "INSERT INTO submission_results (
            id, submission_id, testcase_id, actual_output, status, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&seeded.draft.id)
    .bind(&seeded.testcase.id)
    .bind("7")
    .bind(TestcaseStatus::Passed)
    .bind(primitive_now_utc())
    .execute(&mut *tx)
    .await
    .expect("insert result");

    let delete = tokio::spawn({
        let pool = pool.clone();
        let id = seeded.testcase.id.clone();
        async move { repositories::testcases::delete_unreferenced(&pool, &id).await }
    });
    let update = tokio::spawn({
        let pool = pool.clone();
        let id = seeded.testcase.id.clone();
        async move {
            repositories::testcases::update_unreferenced(
                &pool,
                &id,
                UpdateTestcase { expected_output: Some("8".to_string()), ..Default::default() },
            )
            .await
        }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!delete.is_finished());
    assert!(!update.is_finished());
    tx.commit().await.expect("commit");

    let deleted = delete.await.expect("join delete").expect("delete");
    assert!(matches!(deleted, GuardedWrite::Locked), "got {deleted:?}");
    let updated = update.await.expect("join update").expect("update");
    assert!(matches!(updated, GuardedWrite::Locked), "got {updated:?}");

    assert_eq!(result_count(&pool, &seeded.draft.id).await, 1);
    let kept = repositories::testcases::list_for_problem(&pool, &seeded.testcase.problem_id)
        .await
        .expect("testcases");
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].expected_output, "7");
}

#[tokio::test]
async fn finalize_after_a_concurrent_edit_keeps_the_draft() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db().clone();
    let seeded = seed(&pool).await;

    // An edit that started before finalize, still uncommitted.
    let mut tx = pool.begin().await.expect("begin");
    sqlx::query("UPDATE testcases SET expected_output = '8' WHERE id = $1")
        .bind(&seeded.testcase.id)
        .execute(&mut *tx)
        .await
        .expect("edit");

    let finalizing = tokio::spawn({
        let pool = pool.clone();
        let submission_id = seeded.draft.id.clone();
        let testcase = seeded.testcase.clone();
        async move { finalize_one(&pool, &submission_id, &testcase).await }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!finalizing.is_finished());
    tx.commit().await.expect("commit");

    let outcome = finalizing.await.expect("join").expect("finalize");
    assert!(matches!(outcome, Finalized::TestcasesChanged), "got {outcome:?}");

    let draft = repositories::submissions::find_by_id(&pool, &seeded.draft.id)
        .await
        .expect("lookup")
        .expect("submission");
    assert!(draft.is_draft());
    assert_eq!(result_count(&pool, &seeded.draft.id).await, 0);
}

#[tokio::test]
async fn deleting_the_problem_still_cascades_through_results() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let seeded = seed(pool).await;
    finalize_one(pool, &seeded.draft.id, &seeded.testcase).await.expect("finalize");

    let deleted = repositories::problems::delete(pool, &seeded.testcase.problem_id)
        .await
        .expect("delete problem");

    assert!(deleted);
    assert_eq!(result_count(pool, &seeded.draft.id).await, 0);
    assert!(repositories::submissions::find_by_id(pool, &seeded.draft.id)
        .await
        .expect("lookup")
        .is_none());
}
