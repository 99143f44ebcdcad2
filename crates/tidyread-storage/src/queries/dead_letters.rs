// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter records. Rows are written by [`crate::queries::jobs::bury`].

use rusqlite::params;
use tidyread_core::TidyreadError;

use crate::database::{Database, map_tr_err};
use crate::models::DeadLetter;

pub(crate) fn insert(
    conn: &rusqlite::Connection,
    job_id: &str,
    function_name: &str,
    args: &str,
    error: &str,
    timestamp: f64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dead_letters (job_id, function_name, args, error, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![job_id, function_name, args, error, timestamp],
    )?;
    Ok(())
}

pub(crate) fn prune_before(
    conn: &rusqlite::Connection,
    cutoff: f64,
) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM dead_letters WHERE timestamp < ?1", params![cutoff])
}

/// Newest records first.
pub async fn list(db: &Database, limit: usize) -> Result<Vec<DeadLetter>, TidyreadError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, job_id, function_name, args, error, timestamp
                 FROM dead_letters ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )?;
            let records = stmt
                .query_map(params![limit], |row| {
                    Ok(DeadLetter {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        function_name: row.get(2)?,
                        args: row.get(3)?,
                        error: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every record. Returns how many were removed.
pub async fn clear(db: &Database) -> Result<usize, TidyreadError> {
    db.connection()
        .call(|conn| conn.execute("DELETE FROM dead_letters", []))
        .await
        .map_err(map_tr_err)
}

/// Delete records older than `cutoff` (UNIX seconds).
pub async fn prune(db: &Database, cutoff: f64) -> Result<usize, TidyreadError> {
    db.connection()
        .call(move |conn| prune_before(conn, cutoff))
        .await
        .map_err(map_tr_err)
}

/// Records for one job id.
pub async fn count_for_job(db: &Database, job_id: &str) -> Result<i64, TidyreadError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM dead_letters WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    async fn seed(db: &Database, job_id: &'static str, ts: f64) {
        db.connection()
            .call(move |conn| insert(conn, job_id, "send_reaction_job", "[1,2,\"👍\"]", "boom", ts))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_is_newest_first_and_limited() {
        let (db, _dir) = setup_db().await;
        seed(&db, "a", 10.0).await;
        seed(&db, "b", 30.0).await;
        seed(&db, "c", 20.0).await;

        let ids: Vec<_> = list(&db, 2).await.unwrap().into_iter().map(|d| d.job_id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn prune_and_clear() {
        let (db, _dir) = setup_db().await;
        seed(&db, "old", 10.0).await;
        seed(&db, "new", 100.0).await;
        assert_eq!(prune(&db, 50.0).await.unwrap(), 1);
        assert_eq!(count_for_job(&db, "old").await.unwrap(), 0);
        assert_eq!(clear(&db).await.unwrap(), 1);
        assert!(list(&db, 10).await.unwrap().is_empty());
    }
}
