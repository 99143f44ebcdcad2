// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job table operations.
//!
//! Every function takes the current time explicitly so callers (and tests)
//! control the clock. Times are UNIX seconds.

use std::str::FromStr;

use rusqlite::{OptionalExtension, Row, params};
use tidyread_core::TidyreadError;
use tidyread_core::types::EnqueueOutcome;

use crate::database::{Database, map_tr_err};
use crate::models::{DedupPolicy, JobRecord, JobStatus, NewJob};
use crate::queries::dead_letters;

const COLUMNS: &str = "dedup_id, function_name, args, status, attempts, max_tries, run_at, \
                       locked_until, rerun, last_error, enqueued_at, finished_at";

fn row_to_job(row: &Row<'_>) -> Result<JobRecord, rusqlite::Error> {
    let status: String = row.get(3)?;
    Ok(JobRecord {
        dedup_id: row.get(0)?,
        function_name: row.get(1)?,
        args: row.get(2)?,
        status: JobStatus::from_str(&status).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        attempts: row.get(4)?,
        max_tries: row.get(5)?,
        run_at: row.get(6)?,
        locked_until: row.get(7)?,
        rerun: row.get(8)?,
        last_error: row.get(9)?,
        enqueued_at: row.get(10)?,
        finished_at: row.get(11)?,
    })
}

fn select_job(
    conn: &rusqlite::Connection,
    dedup_id: &str,
) -> Result<Option<JobRecord>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM jobs WHERE dedup_id = ?1"),
        params![dedup_id],
        row_to_job,
    )
    .optional()
}

/// Insert a job, or start a fresh run over a finished row with the same id.
fn fresh_run(conn: &rusqlite::Connection, job: &NewJob, now: f64) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO jobs (dedup_id, function_name, args, status, attempts, max_tries,
                           run_at, locked_until, rerun, last_error, enqueued_at, finished_at)
         VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?5, NULL, 0, NULL, ?6, NULL)
         ON CONFLICT(dedup_id) DO UPDATE SET
            function_name = excluded.function_name,
            args = excluded.args,
            status = 'pending',
            attempts = 0,
            max_tries = excluded.max_tries,
            run_at = excluded.run_at,
            locked_until = NULL,
            rerun = 0,
            last_error = NULL,
            enqueued_at = excluded.enqueued_at,
            finished_at = NULL",
        params![job.dedup_id, job.function_name, job.args, job.max_tries, job.run_at, now],
    )?;
    Ok(())
}

/// Submit a job under `policy`.
///
/// With [`DedupPolicy::Coalesce`] a pending row takes the new args and keeps
/// its due time; a processing row takes the new args and is flagged to run
/// again after the current run. With [`DedupPolicy::Unique`] the submission is
/// dropped while an equivalent run is pending, processing, or finished within
/// the keep window.
pub async fn enqueue(
    db: &Database,
    job: NewJob,
    policy: DedupPolicy,
    now: f64,
) -> Result<EnqueueOutcome, TidyreadError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = select_job(&tx, &job.dedup_id)?;

            let outcome = match (existing, policy) {
                (None, _) => {
                    fresh_run(&tx, &job, now)?;
                    EnqueueOutcome::Created
                }
                (Some(row), DedupPolicy::Coalesce) => match row.status {
                    JobStatus::Pending => {
                        tx.execute(
                            "UPDATE jobs SET args = ?1, function_name = ?2 WHERE dedup_id = ?3",
                            params![job.args, job.function_name, job.dedup_id],
                        )?;
                        EnqueueOutcome::Coalesced
                    }
                    JobStatus::Processing => {
                        tx.execute(
                            "UPDATE jobs SET args = ?1, function_name = ?2, run_at = ?3, rerun = 1
                             WHERE dedup_id = ?4",
                            params![job.args, job.function_name, job.run_at, job.dedup_id],
                        )?;
                        EnqueueOutcome::Coalesced
                    }
                    JobStatus::Completed | JobStatus::Dead => {
                        fresh_run(&tx, &job, now)?;
                        EnqueueOutcome::Created
                    }
                },
                (Some(row), DedupPolicy::Unique { keep_result_secs }) => match row.status {
                    JobStatus::Pending | JobStatus::Processing => EnqueueOutcome::Duplicate,
                    JobStatus::Completed | JobStatus::Dead => {
                        let finished = row.finished_at.unwrap_or(row.enqueued_at);
                        if now - finished < keep_result_secs {
                            EnqueueOutcome::Duplicate
                        } else {
                            fresh_run(&tx, &job, now)?;
                            EnqueueOutcome::Created
                        }
                    }
                },
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `limit` due jobs, marking them processing until `now + lock_secs`.
///
/// Processing rows whose lock has expired are claimable again; their run was
/// abandoned by a crashed or stalled worker.
pub async fn claim_due(
    db: &Database,
    now: f64,
    limit: usize,
    lock_secs: f64,
) -> Result<Vec<JobRecord>, TidyreadError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let due = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {COLUMNS} FROM jobs
                     WHERE (status = 'pending' AND run_at <= ?1)
                        OR (status = 'processing' AND locked_until < ?1)
                     ORDER BY run_at ASC
                     LIMIT ?2"
                ))?;
                stmt.query_map(params![now, limit], row_to_job)?
                    .collect::<Result<Vec<_>, _>>()?
            };

            let locked_until = now + lock_secs;
            for job in &due {
                tx.execute(
                    "UPDATE jobs SET status = 'processing', locked_until = ?1 WHERE dedup_id = ?2",
                    params![locked_until, job.dedup_id],
                )?;
            }
            tx.commit()?;

            Ok(due
                .into_iter()
                .map(|job| JobRecord {
                    status: JobStatus::Processing,
                    locked_until: Some(locked_until),
                    ..job
                })
                .collect())
        })
        .await
        .map_err(map_tr_err)
}

/// Finish a run successfully.
///
/// A row flagged for re-run goes back to pending with a fresh attempt budget
/// instead. Returns `true` in that case.
pub async fn complete(db: &Database, dedup_id: &str, now: f64) -> Result<bool, TidyreadError> {
    let dedup_id = dedup_id.to_string();
    db.connection()
        .call(move |conn| {
            let rerun = conn.execute(
                "UPDATE jobs SET status = 'pending', rerun = 0, attempts = 0,
                    locked_until = NULL, last_error = NULL
                 WHERE dedup_id = ?1 AND status = 'processing' AND rerun = 1",
                params![dedup_id],
            )?;
            if rerun > 0 {
                return Ok(true);
            }
            conn.execute(
                "UPDATE jobs SET status = 'completed', locked_until = NULL, finished_at = ?1
                 WHERE dedup_id = ?2 AND status = 'processing'",
                params![now, dedup_id],
            )?;
            Ok(false)
        })
        .await
        .map_err(map_tr_err)
}

/// Put a claimed job back to pending without counting an attempt.
pub async fn reschedule(db: &Database, dedup_id: &str, run_at: f64) -> Result<(), TidyreadError> {
    let dedup_id = dedup_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'pending', run_at = MAX(run_at, ?1), rerun = 0,
                    locked_until = NULL
                 WHERE dedup_id = ?2 AND status = 'processing'",
                params![run_at, dedup_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt and schedule the next one.
pub async fn retry(
    db: &Database,
    dedup_id: &str,
    run_at: f64,
    error: &str,
) -> Result<(), TidyreadError> {
    let dedup_id = dedup_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'pending', attempts = attempts + 1, run_at = ?1,
                    rerun = 0, locked_until = NULL, last_error = ?2
                 WHERE dedup_id = ?3 AND status = 'processing'",
                params![run_at, error, dedup_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job dead and write its dead-letter record in one transaction.
///
/// Only a row still in `processing` is buried, so a job produces at most one
/// record per run. Records older than `now - retention_secs` are pruned in
/// the same transaction. A job flagged for re-run is put back to pending with
/// a fresh attempt budget after the record is written. Returns whether a
/// record was written.
pub async fn bury(
    db: &Database,
    dedup_id: &str,
    error: &str,
    now: f64,
    retention_secs: f64,
) -> Result<bool, TidyreadError> {
    let dedup_id = dedup_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(job) = select_job(&tx, &dedup_id)? else {
                return Ok(false);
            };
            if job.status != JobStatus::Processing {
                return Ok(false);
            }

            tx.execute(
                "UPDATE jobs SET status = 'dead', attempts = attempts + 1, locked_until = NULL,
                    last_error = ?1, finished_at = ?2
                 WHERE dedup_id = ?3",
                params![error, now, dedup_id],
            )?;
            dead_letters::insert(&tx, &job.dedup_id, &job.function_name, &job.args, &error, now)?;
            dead_letters::prune_before(&tx, now - retention_secs)?;

            if job.rerun {
                tx.execute(
                    "UPDATE jobs SET status = 'pending', attempts = 0, rerun = 0,
                        last_error = NULL, finished_at = NULL
                     WHERE dedup_id = ?1",
                    params![dedup_id],
                )?;
            }

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete finished rows older than `cutoff`. Returns how many were removed.
pub async fn prune_finished(db: &Database, cutoff: f64) -> Result<usize, TidyreadError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM jobs
                 WHERE status IN ('completed', 'dead') AND finished_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, dedup_id: &str) -> Result<Option<JobRecord>, TidyreadError> {
    let dedup_id = dedup_id.to_string();
    db.connection()
        .call(move |conn| select_job(conn, &dedup_id))
        .await
        .map_err(map_tr_err)
}

/// Count of rows per status, in `JobStatus` order.
pub async fn count_by_status(db: &Database) -> Result<Vec<(JobStatus, i64)>, TidyreadError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
        .map(|rows| {
            [
                JobStatus::Pending,
                JobStatus::Processing,
                JobStatus::Completed,
                JobStatus::Dead,
            ]
            .into_iter()
            .map(|status| {
                let n = rows
                    .iter()
                    .find(|(s, _)| *s == status.to_string())
                    .map_or(0, |(_, n)| *n);
                (status, n)
            })
            .collect()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn read_job(args: &str, run_at: f64) -> NewJob {
        NewJob {
            dedup_id: "read_100_none".to_string(),
            function_name: "mark_as_read_job".to_string(),
            args: args.to_string(),
            max_tries: 3,
            run_at,
        }
    }

    fn reaction_job() -> NewJob {
        NewJob {
            dedup_id: "react_1_2_👍".to_string(),
            function_name: "send_reaction_job".to_string(),
            args: "[1,2,\"👍\"]".to_string(),
            max_tries: 3,
            run_at: 0.0,
        }
    }

    const UNIQUE: DedupPolicy = DedupPolicy::Unique {
        keep_result_secs: 3600.0,
    };

    #[tokio::test]
    async fn coalesce_keeps_due_time_and_latest_args() {
        let (db, _dir) = setup_db().await;
        let first = enqueue(&db, read_job("[100,null,1]", 10.5), DedupPolicy::Coalesce, 10.0)
            .await
            .unwrap();
        assert_eq!(first, EnqueueOutcome::Created);
        let second = enqueue(&db, read_job("[100,null,2]", 10.9), DedupPolicy::Coalesce, 10.4)
            .await
            .unwrap();
        assert_eq!(second, EnqueueOutcome::Coalesced);

        let job = get(&db, "read_100_none").await.unwrap().unwrap();
        assert_eq!(job.args, "[100,null,2]");
        assert_eq!(job.run_at, 10.5);
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn coalesce_while_processing_flags_rerun() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, read_job("[100,null,1]", 0.0), DedupPolicy::Coalesce, 0.0)
            .await
            .unwrap();
        let claimed = claim_due(&db, 1.0, 10, 60.0).await.unwrap();
        assert_eq!(claimed.len(), 1);

        let outcome = enqueue(&db, read_job("[100,null,5]", 1.5), DedupPolicy::Coalesce, 1.0)
            .await
            .unwrap();
        assert_eq!(outcome, EnqueueOutcome::Coalesced);

        assert!(complete(&db, "read_100_none", 2.0).await.unwrap());
        let job = get(&db, "read_100_none").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.args, "[100,null,5]");
        assert!(!job.rerun);

        let again = claim_due(&db, 2.0, 10, 60.0).await.unwrap();
        assert_eq!(again.len(), 1);
        assert!(!complete(&db, "read_100_none", 3.0).await.unwrap());
        let job = get(&db, "read_100_none").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn coalesce_after_completion_starts_fresh_run() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, read_job("[1]", 0.0), DedupPolicy::Coalesce, 0.0).await.unwrap();
        claim_due(&db, 0.0, 1, 60.0).await.unwrap();
        complete(&db, "read_100_none", 1.0).await.unwrap();

        let outcome = enqueue(&db, read_job("[2]", 5.5), DedupPolicy::Coalesce, 5.0)
            .await
            .unwrap();
        assert_eq!(outcome, EnqueueOutcome::Created);
        let job = get(&db, "read_100_none").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.run_at, 5.5);
        assert_eq!(job.finished_at, None);
    }

    #[tokio::test]
    async fn unique_drops_duplicates_within_keep_window() {
        let (db, _dir) = setup_db().await;
        assert_eq!(
            enqueue(&db, reaction_job(), UNIQUE, 0.0).await.unwrap(),
            EnqueueOutcome::Created
        );
        assert_eq!(
            enqueue(&db, reaction_job(), UNIQUE, 0.1).await.unwrap(),
            EnqueueOutcome::Duplicate
        );

        claim_due(&db, 1.0, 10, 60.0).await.unwrap();
        complete(&db, "react_1_2_👍", 2.0).await.unwrap();
        assert_eq!(
            enqueue(&db, reaction_job(), UNIQUE, 100.0).await.unwrap(),
            EnqueueOutcome::Duplicate
        );
        assert_eq!(
            enqueue(&db, reaction_job(), UNIQUE, 3700.0).await.unwrap(),
            EnqueueOutcome::Created
        );
    }

    #[tokio::test]
    async fn claim_skips_future_jobs_and_recovers_expired_locks() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, read_job("[1]", 50.0), DedupPolicy::Coalesce, 0.0).await.unwrap();
        assert!(claim_due(&db, 10.0, 10, 30.0).await.unwrap().is_empty());

        let claimed = claim_due(&db, 50.0, 10, 30.0).await.unwrap();
        assert_eq!(claimed[0].locked_until, Some(80.0));
        assert!(claim_due(&db, 60.0, 10, 30.0).await.unwrap().is_empty());

        // Worker vanished; lock expired.
        let recovered = claim_due(&db, 81.0, 10, 30.0).await.unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].attempts, 0);
    }

    #[tokio::test]
    async fn reschedule_does_not_count_attempts() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, reaction_job(), UNIQUE, 0.0).await.unwrap();
        claim_due(&db, 0.0, 1, 60.0).await.unwrap();
        reschedule(&db, "react_1_2_👍", 40.0).await.unwrap();
        let job = get(&db, "react_1_2_👍").await.unwrap().unwrap();
        assert_eq!(job.attempts, 0);
        assert_eq!(job.run_at, 40.0);
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn retry_then_bury_writes_one_dead_letter() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, reaction_job(), UNIQUE, 0.0).await.unwrap();

        claim_due(&db, 0.0, 1, 60.0).await.unwrap();
        retry(&db, "react_1_2_👍", 5.0, "boom 1").await.unwrap();
        let job = get(&db, "react_1_2_👍").await.unwrap().unwrap();
        assert_eq!(job.attempts, 1);
        assert_eq!(job.last_error.as_deref(), Some("boom 1"));

        claim_due(&db, 5.0, 1, 60.0).await.unwrap();
        assert!(bury(&db, "react_1_2_👍", "boom 2", 6.0, 3600.0).await.unwrap());
        // Already dead: a second bury writes nothing.
        assert!(!bury(&db, "react_1_2_👍", "boom 3", 7.0, 3600.0).await.unwrap());

        let job = get(&db, "react_1_2_👍").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Dead);
        assert_eq!(job.attempts, 2);
        assert_eq!(
            dead_letters::count_for_job(&db, "react_1_2_👍").await.unwrap(),
            1
        );
        let records = dead_letters::list(&db, 10).await.unwrap();
        assert_eq!(records[0].error, "boom 2");
        assert_eq!(records[0].function_name, "send_reaction_job");
        assert_eq!(records[0].args, "[1,2,\"👍\"]");
    }

    #[tokio::test]
    async fn bury_prunes_expired_dead_letters() {
        let (db, _dir) = setup_db().await;
        let mut old = reaction_job();
        old.dedup_id = "react_old".to_string();
        enqueue(&db, old, UNIQUE, 0.0).await.unwrap();
        claim_due(&db, 0.0, 1, 60.0).await.unwrap();
        bury(&db, "react_old", "old failure", 1.0, 100.0).await.unwrap();

        enqueue(&db, reaction_job(), UNIQUE, 500.0).await.unwrap();
        claim_due(&db, 500.0, 1, 60.0).await.unwrap();
        bury(&db, "react_1_2_👍", "new failure", 500.0, 100.0).await.unwrap();

        let records = dead_letters::list(&db, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job_id, "react_1_2_👍");
    }

    #[tokio::test]
    async fn prune_finished_removes_old_rows_only() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, reaction_job(), UNIQUE, 0.0).await.unwrap();
        claim_due(&db, 0.0, 1, 60.0).await.unwrap();
        complete(&db, "react_1_2_👍", 1.0).await.unwrap();
        enqueue(&db, read_job("[1]", 0.0), DedupPolicy::Coalesce, 0.0).await.unwrap();

        assert_eq!(prune_finished(&db, 0.5).await.unwrap(), 0);
        assert_eq!(prune_finished(&db, 2.0).await.unwrap(), 1);
        let counts = count_by_status(&db).await.unwrap();
        assert_eq!(counts[0], (JobStatus::Pending, 1));
        assert_eq!(counts[2], (JobStatus::Completed, 0));
    }
}
