// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each takes a `&Database` and calls through its
//! single writer connection.

pub mod audit;
pub mod dead_letters;
pub mod flood;
pub mod jobs;
pub mod rules;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::database::Database;

    pub async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }
}
