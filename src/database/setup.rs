use anyhow::{Context, Result};

use super::connection::DbConn;

const TABLES: [&str; 5] = [
    "player_history",
    "previous_scores",
    "scores",
    "leaderboards",
    "players",
];

/// Creates missing tables and indexes. Safe to run on every start.
pub fn initialize_schema(conn: &mut DbConn) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    let statements = split_sql_statements(schema_sql);

    for (idx, statement) in statements.iter().enumerate() {
        execute_sql(conn, statement)
            .with_context(|| format!("Failed to execute statement {}", idx + 1))?;
    }

    log::info!("Database schema ready ({} statements)", statements.len());
    Ok(())
}

/// Drops every table and recreates the schema.
pub fn reset_database(conn: &mut DbConn) -> Result<()> {
    for table in TABLES {
        execute_sql(conn, &format!("DROP TABLE IF EXISTS {}", table))
            .with_context(|| format!("Failed to drop table {}", table))?;
    }

    log::info!("Dropped {} tables", TABLES.len());
    initialize_schema(conn)
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn execute_sql(conn: &mut DbConn, sql: &str) -> Result<()> {
    conn.execute(sql, [])
        .context("Failed to execute SQL statement")
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ignores_blank_statements() {
        let statements = split_sql_statements("CREATE TABLE a (x INTEGER);\n\n;CREATE INDEX i ON a (x);\n");
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with("CREATE INDEX"));
    }

    #[test]
    fn test_schema_is_reentrant() {
        let (_dir, pool) = crate::test_support::temp_pool();
        let mut conn = crate::database::get_connection(&pool).unwrap();

        initialize_schema(&mut conn).unwrap();
        reset_database(&mut conn).unwrap();
    }
}
