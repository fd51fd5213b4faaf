use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Identity columns are never updated in place; see `Warehouse::upsert_card`.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_cards_and_grades",
        sql: r#"
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    source_url TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(name, source_url)
);

CREATE TABLE IF NOT EXISTS grades (
    id TEXT PRIMARY KEY,
    card_id TEXT NOT NULL,
    grade TEXT NOT NULL,
    position INTEGER NOT NULL,
    recent_price DOUBLE,
    average_price DOUBLE,
    population BIGINT,
    market_cap DOUBLE,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(card_id, grade)
);
"#,
    },
    Migration {
        version: "0002_auctions_and_volume",
        sql: r#"
CREATE TABLE IF NOT EXISTS auctions (
    grade_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    sale_date TEXT,
    date_raw TEXT,
    auction_house TEXT NOT NULL,
    sale_type TEXT NOT NULL,
    certification TEXT NOT NULL,
    price DOUBLE NOT NULL
);

CREATE TABLE IF NOT EXISTS volume_metrics (
    grade_id TEXT PRIMARY KEY,
    total_volume DOUBLE NOT NULL,
    volume_10y DOUBLE NOT NULL,
    volume_5y DOUBLE NOT NULL,
    annual_volume DOUBLE NOT NULL,
    monthly_volume DOUBLE NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;
        if applied == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }
    Ok(())
}
