// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! Each SQLite tier has its own migration set, compiled into the binary via
//! `embed_migrations!` and applied when the tier is opened.

use mohtasib_core::MohtasibError;

mod local {
    use refinery::embed_migrations;
    embed_migrations!("migrations/local");
}

mod objects {
    use refinery::embed_migrations;
    embed_migrations!("migrations/objects");
}

/// Which migration set to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// The persistent key/value table.
    LocalKeyValue,
    /// Large-object headers and chunks.
    LargeObjects,
}

/// Run all pending migrations of `schema` against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection, schema: Schema) -> Result<(), MohtasibError> {
    let report = match schema {
        Schema::LocalKeyValue => local::migrations::runner().run(conn),
        Schema::LargeObjects => objects::migrations::runner().run(conn),
    }
    .map_err(MohtasibError::storage)?;

    let applied = report.applied_migrations().len();
    if applied > 0 {
        tracing::debug!(?schema, applied, "applied migrations");
    }
    Ok(())
}
