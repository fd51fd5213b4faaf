//! # Slabprice Warehouse
//!
//! `DuckDB` persistence for scraped card records.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `cards` | One row per `(name, source_url)` |
//! | `grades` | One row per `(card_id, grade)` with price summary and population |
//! | `auctions` | Individual sales of a grade, replaced on every write |
//! | `volume_metrics` | Trailing sale volumes keyed by grade |
//!
//! All values travel as bound parameters; nothing is interpolated into SQL.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use duckdb::{ConnectionPool, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("card '{0}' not found")]
    RecordNotFound(String),

    #[error("stored value out of range: {0}")]
    OutOfRange(String),
}

/// Where the warehouse lives on disk.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for slabprice data.
    pub slabprice_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let slabprice_home = resolve_slabprice_home();
        let db_path = slabprice_home.join("warehouse.duckdb");
        Self {
            slabprice_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Overrides the database file location, keeping the home directory.
    #[must_use]
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

/// A card with its grades, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRow {
    pub name: String,
    pub source_url: String,
    pub grades: Vec<GradeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRow {
    pub grade: String,
    pub recent_price: Option<f64>,
    pub average_price: Option<f64>,
    pub population: Option<u64>,
    pub market_cap: Option<f64>,
    pub auctions: Vec<AuctionRow>,
    pub volume: Option<VolumeRow>,
}

/// One sale. `sale_date` is RFC 3339; `date_raw` keeps text that could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRow {
    pub sale_date: Option<String>,
    pub date_raw: Option<String>,
    pub auction_house: String,
    pub sale_type: String,
    pub certification: String,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRow {
    pub total_volume: f64,
    pub volume_10y: f64,
    pub volume_5y: f64,
    pub annual_volume: f64,
    pub monthly_volume: f64,
}

/// A card as read back from the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCard {
    pub id: String,
    #[serde(flatten)]
    pub card: CardRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSummary {
    pub id: String,
    pub name: String,
    pub source_url: String,
    pub grade_count: u64,
    pub sale_count: u64,
}

/// Handle to the card warehouse.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    pool: ConnectionPool,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Opens (creating if needed) the database and applies pending migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = ConnectionPool::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Writes `card` in one transaction and returns its id.
    ///
    /// The card is matched on `(name, source_url)` and each grade on
    /// `(card_id, grade)`. A grade's auctions are replaced wholesale and its
    /// volume metrics are overwritten. Grades missing from `card` are removed.
    pub fn upsert_card(&self, card: &CardRow) -> Result<String, WarehouseError> {
        let connection = self.pool.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = write_card(&connection, card);
        finalize_transaction(&connection, result)
    }

    /// Every stored card, ordered by name then source.
    pub fn list_cards(&self) -> Result<Vec<CardSummary>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT c.id, c.name, c.source_url, \
             (SELECT COUNT(*) FROM grades g WHERE g.card_id = c.id), \
             (SELECT COUNT(*) FROM auctions a JOIN grades g ON a.grade_id = g.id \
              WHERE g.card_id = c.id) \
             FROM cards c ORDER BY c.name, c.source_url",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, name, source_url, grade_count, sale_count) = row?;
            summaries.push(CardSummary {
                id,
                name,
                source_url,
                grade_count: to_u64(grade_count)?,
                sale_count: to_u64(sale_count)?,
            });
        }
        Ok(summaries)
    }

    /// Id of the card stored under `(name, source_url)`, if any.
    pub fn find_card_id(&self, name: &str, source_url: &str) -> Result<Option<String>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let params: [&dyn ToSql; 2] = [&name, &source_url];
        find_id(
            &connection,
            "SELECT id FROM cards WHERE name = ? AND source_url = ?",
            params.as_slice(),
        )
    }

    /// Loads a card with grades and auctions in their stored order.
    pub fn load_card(&self, card_id: &str) -> Result<StoredCard, WarehouseError> {
        let connection = self.pool.acquire()?;

        let mut statement = connection.prepare("SELECT name, source_url FROM cards WHERE id = ?")?;
        let mut rows = statement.query([card_id])?;
        let (name, source_url): (String, String) = match rows.next()? {
            Some(row) => (row.get(0)?, row.get(1)?),
            None => return Err(WarehouseError::RecordNotFound(card_id.to_owned())),
        };

        let grades = load_grades(&connection, card_id)?;
        Ok(StoredCard {
            id: card_id.to_owned(),
            card: CardRow {
                name,
                source_url,
                grades,
            },
        })
    }
}

fn write_card(connection: &Connection, card: &CardRow) -> Result<String, WarehouseError> {
    let params: [&dyn ToSql; 2] = [&card.name, &card.source_url];
    let existing = find_id(
        connection,
        "SELECT id FROM cards WHERE name = ? AND source_url = ?",
        params.as_slice(),
    )?;

    let card_id = match existing {
        Some(card_id) => {
            connection.execute(
                "UPDATE cards SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                [&card_id],
            )?;
            card_id
        }
        None => {
            let card_id = Uuid::new_v4().to_string();
            let params: [&dyn ToSql; 3] = [&card_id, &card.name, &card.source_url];
            connection.execute(
                "INSERT INTO cards (id, name, source_url) VALUES (?, ?, ?)",
                params.as_slice(),
            )?;
            card_id
        }
    };

    let mut kept_grade_ids = Vec::with_capacity(card.grades.len());
    for (position, grade) in card.grades.iter().enumerate() {
        let grade_id = write_grade(connection, &card_id, position, grade)?;
        kept_grade_ids.push(grade_id);
    }

    let mut statement = connection.prepare("SELECT id FROM grades WHERE card_id = ?")?;
    let stored_ids = statement
        .query_map([&card_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for stale in stored_ids.iter().filter(|id| !kept_grade_ids.contains(id)) {
        connection.execute("DELETE FROM auctions WHERE grade_id = ?", [stale])?;
        connection.execute("DELETE FROM volume_metrics WHERE grade_id = ?", [stale])?;
        connection.execute("DELETE FROM grades WHERE id = ?", [stale])?;
    }

    Ok(card_id)
}

fn write_grade(
    connection: &Connection,
    card_id: &str,
    position: usize,
    grade: &GradeRow,
) -> Result<String, WarehouseError> {
    let position = to_i64(position)?;
    let population = grade.population.map(to_i64).transpose()?;

    let params: [&dyn ToSql; 2] = [&card_id, &grade.grade];
    let existing = find_id(
        connection,
        "SELECT id FROM grades WHERE card_id = ? AND grade = ?",
        params.as_slice(),
    )?;

    let grade_id = match existing {
        Some(grade_id) => {
            let params: [&dyn ToSql; 6] = [
                &position,
                &grade.recent_price,
                &grade.average_price,
                &population,
                &grade.market_cap,
                &grade_id,
            ];
            connection.execute(
                "UPDATE grades SET position = ?, recent_price = ?, average_price = ?, \
                 population = ?, market_cap = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params.as_slice(),
            )?;
            grade_id
        }
        None => {
            let grade_id = Uuid::new_v4().to_string();
            let params: [&dyn ToSql; 8] = [
                &grade_id,
                &card_id,
                &grade.grade,
                &position,
                &grade.recent_price,
                &grade.average_price,
                &population,
                &grade.market_cap,
            ];
            connection.execute(
                "INSERT INTO grades \
                 (id, card_id, grade, position, recent_price, average_price, population, market_cap) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params.as_slice(),
            )?;
            grade_id
        }
    };

    connection.execute("DELETE FROM auctions WHERE grade_id = ?", [&grade_id])?;
    for (index, auction) in grade.auctions.iter().enumerate() {
        let index = to_i64(index)?;
        let params: [&dyn ToSql; 8] = [
            &grade_id,
            &index,
            &auction.sale_date,
            &auction.date_raw,
            &auction.auction_house,
            &auction.sale_type,
            &auction.certification,
            &auction.price,
        ];
        connection.execute(
            "INSERT INTO auctions \
             (grade_id, position, sale_date, date_raw, auction_house, sale_type, certification, price) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params.as_slice(),
        )?;
    }

    if let Some(volume) = &grade.volume {
        write_volume(connection, &grade_id, volume)?;
    }

    Ok(grade_id)
}

fn write_volume(connection: &Connection, grade_id: &str, volume: &VolumeRow) -> Result<(), WarehouseError> {
    let params: [&dyn ToSql; 1] = [&grade_id];
    let exists = find_id(
        connection,
        "SELECT grade_id FROM volume_metrics WHERE grade_id = ?",
        params.as_slice(),
    )?
    .is_some();

    let params: [&dyn ToSql; 6] = [
        &volume.total_volume,
        &volume.volume_10y,
        &volume.volume_5y,
        &volume.annual_volume,
        &volume.monthly_volume,
        &grade_id,
    ];
    let sql = if exists {
        "UPDATE volume_metrics SET total_volume = ?, volume_10y = ?, volume_5y = ?, \
         annual_volume = ?, monthly_volume = ?, updated_at = CURRENT_TIMESTAMP WHERE grade_id = ?"
    } else {
        "INSERT INTO volume_metrics \
         (total_volume, volume_10y, volume_5y, annual_volume, monthly_volume, grade_id) \
         VALUES (?, ?, ?, ?, ?, ?)"
    };
    connection.execute(sql, params.as_slice())?;
    Ok(())
}

fn load_grades(connection: &Connection, card_id: &str) -> Result<Vec<GradeRow>, WarehouseError> {
    let mut statement = connection.prepare(
        "SELECT id, grade, recent_price, average_price, population, market_cap \
         FROM grades WHERE card_id = ? ORDER BY position",
    )?;
    let rows = statement
        .query_map([card_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<f64>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut grades = Vec::with_capacity(rows.len());
    for (grade_id, grade, recent_price, average_price, population, market_cap) in rows {
        grades.push(GradeRow {
            grade,
            recent_price,
            average_price,
            population: population.map(to_u64).transpose()?,
            market_cap,
            auctions: load_auctions(connection, &grade_id)?,
            volume: load_volume(connection, &grade_id)?,
        });
    }
    Ok(grades)
}

fn load_auctions(connection: &Connection, grade_id: &str) -> Result<Vec<AuctionRow>, WarehouseError> {
    let mut statement = connection.prepare(
        "SELECT sale_date, date_raw, auction_house, sale_type, certification, price \
         FROM auctions WHERE grade_id = ? ORDER BY position",
    )?;
    let auctions = statement
        .query_map([grade_id], |row| {
            Ok(AuctionRow {
                sale_date: row.get(0)?,
                date_raw: row.get(1)?,
                auction_house: row.get(2)?,
                sale_type: row.get(3)?,
                certification: row.get(4)?,
                price: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(auctions)
}

fn load_volume(connection: &Connection, grade_id: &str) -> Result<Option<VolumeRow>, WarehouseError> {
    let mut statement = connection.prepare(
        "SELECT total_volume, volume_10y, volume_5y, annual_volume, monthly_volume \
         FROM volume_metrics WHERE grade_id = ?",
    )?;
    let mut rows = statement.query([grade_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    Ok(Some(VolumeRow {
        total_volume: row.get(0)?,
        volume_10y: row.get(1)?,
        volume_5y: row.get(2)?,
        annual_volume: row.get(3)?,
        monthly_volume: row.get(4)?,
    }))
}

fn find_id(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<String>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

/// Commits on success, rolls back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn to_i64<T>(value: T) -> Result<i64, WarehouseError>
where
    T: Copy + std::fmt::Display + TryInto<i64>,
{
    value
        .try_into()
        .map_err(|_| WarehouseError::OutOfRange(value.to_string()))
}

fn to_u64(value: i64) -> Result<u64, WarehouseError> {
    u64::try_from(value).map_err(|_| WarehouseError::OutOfRange(value.to_string()))
}

/// `SLABPRICE_HOME`, else `$HOME/.slabprice`, else `./.slabprice`.
fn resolve_slabprice_home() -> PathBuf {
    if let Some(path) = env::var_os("SLABPRICE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".slabprice");
    }

    PathBuf::from(".slabprice")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp(temp: &tempfile::TempDir) -> Warehouse {
        let slabprice_home = temp.path().join("slabprice-home");
        let db_path = slabprice_home.join("warehouse.duckdb");
        Warehouse::open(WarehouseConfig {
            slabprice_home,
            db_path,
            max_pool_size: 2,
        })
        .expect("warehouse open")
    }

    fn auction(date: &str, price: f64) -> AuctionRow {
        AuctionRow {
            sale_date: Some(date.to_owned()),
            date_raw: None,
            auction_house: String::from("Heritage"),
            sale_type: String::from("Auction"),
            certification: String::from("12345678"),
            price,
        }
    }

    fn grade(label: &str, auctions: Vec<AuctionRow>) -> GradeRow {
        GradeRow {
            grade: label.to_owned(),
            recent_price: auctions.first().map(|sale| sale.price),
            average_price: None,
            population: Some(12),
            market_cap: None,
            auctions,
            volume: None,
        }
    }

    #[test]
    fn migrations_create_tables_once() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);
        warehouse.initialize().expect("second initialize is a no-op");

        let connection = warehouse.pool.acquire().expect("connection");
        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_name IN ('cards', 'grades', 'auctions', 'volume_metrics')",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(tables, 4);

        let applied: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(applied, 2);
    }

    #[test]
    fn upsert_keeps_card_id_and_replaces_auctions() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let mut card = CardRow {
            name: String::from("1986 Fleer Jordan"),
            source_url: String::from("https://www.psacard.com/auctionprices/x/values/1"),
            grades: vec![grade(
                "PSA 8",
                vec![auction("2024-01-01T00:00:00Z", 100.0), auction("2023-01-01T00:00:00Z", 90.0)],
            )],
        };
        let first_id = warehouse.upsert_card(&card).expect("first write");

        card.grades[0].auctions = vec![auction("2025-01-01T00:00:00Z", 150.0)];
        let second_id = warehouse.upsert_card(&card).expect("second write");
        assert_eq!(first_id, second_id);

        let stored = warehouse.load_card(&first_id).expect("load");
        assert_eq!(stored.card.grades.len(), 1);
        assert_eq!(stored.card.grades[0].auctions.len(), 1);
        assert_eq!(stored.card.grades[0].auctions[0].price, 150.0);
        assert_eq!(warehouse.list_cards().expect("list").len(), 1);
    }

    #[test]
    fn names_with_quotes_are_stored_verbatim() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let tricky = r#"O'Neal'; DROP TABLE cards; --"#;
        let card = CardRow {
            name: tricky.to_owned(),
            source_url: String::from("https://www.psacard.com/auctionprices/x/values/2"),
            grades: Vec::new(),
        };
        let id = warehouse.upsert_card(&card).expect("write");

        let stored = warehouse.load_card(&id).expect("load");
        assert_eq!(stored.card.name, tricky);
    }

    #[test]
    fn unknown_card_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);
        let error = warehouse.load_card("missing").expect_err("absent");
        assert!(matches!(error, WarehouseError::RecordNotFound(id) if id == "missing"));
    }
}
