//! SQLite implementation of the store boundary.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::{Connection, OpenFlags, ToSql, params};
use tracing::{debug, info};

use crate::{
    domain::{Buyer, Product, PurchaseOrder, ReferenceKind, ReferenceSet},
    error::{Error, config_error},
    input::{FileReadResult, read_file},
    store::{ChunkWriter, ConnectionFactory, ReferenceSource},
};

/// Columns bound per purchase order line in the multi-row insert
const COLUMNS_PER_ROW: usize = 4;

/// Default `SQLITE_MAX_VARIABLE_NUMBER` of SQLite 3.32+. The bundled build compiles in a higher
/// limit, but a system library may not.
const MAX_BIND_PARAMETERS: usize = 32_766;

/// Rows that fit into one multi-row insert
const MAX_CHUNK_ROWS: usize = MAX_BIND_PARAMETERS / COLUMNS_PER_ROW;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS Buyer (
        BuyerId TEXT PRIMARY KEY NOT NULL
    );

    CREATE TABLE IF NOT EXISTS Product (
        ProductCode TEXT PRIMARY KEY NOT NULL
    );

    CREATE TABLE IF NOT EXISTS PurchaseOrderLines (
        BuyerId TEXT NOT NULL,
        OrderDate TEXT NOT NULL,
        ProductCode TEXT NOT NULL,
        Quantity INTEGER NOT NULL
    );
"#;

/// Handle to a SQLite database file. Cheap to share; every call opens its own connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

/// Counts of a reference data load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub buyers_inserted: usize,
    pub products_inserted: usize,
    /// Raw lines of either file which could not be decoded
    pub unprocessable: Vec<String>,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the database file and the tables if they do not exist yet.
    pub fn init_schema(&self) -> Result<(), Error> {
        let conn = self.open(true)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %self.path.display(), "schema initialized");
        Ok(())
    }

    /// Loads the buyers and products flat files into the reference tables in one transaction.
    /// Identifiers already present are skipped.
    pub fn seed_from_files(
        &self,
        buyers_path: impl AsRef<Path>,
        products_path: impl AsRef<Path>,
    ) -> Result<SeedReport, Error> {
        let buyers: FileReadResult<Buyer> = read_file(buyers_path)?;
        let products: FileReadResult<Product> = read_file(products_path)?;
        self.seed(&buyers, &products)
    }

    pub fn seed(
        &self,
        buyers: &FileReadResult<Buyer>,
        products: &FileReadResult<Product>,
    ) -> Result<SeedReport, Error> {
        let mut conn = self.open(false)?;
        let tx = conn.transaction()?;

        let mut report = SeedReport::default();
        {
            let mut insert_buyer = tx.prepare("INSERT OR IGNORE INTO Buyer (BuyerId) VALUES (?1)")?;
            for buyer in &buyers.records {
                report.buyers_inserted += insert_buyer.execute(params![buyer.buyer_id])?;
            }

            let mut insert_product =
                tx.prepare("INSERT OR IGNORE INTO Product (ProductCode) VALUES (?1)")?;
            for product in &products.records {
                report.products_inserted += insert_product.execute(params![product.product_code])?;
            }
        }
        tx.commit()?;

        report.unprocessable.extend(buyers.unprocessable.iter().cloned());
        report.unprocessable.extend(products.unprocessable.iter().cloned());

        info!(
            buyers = report.buyers_inserted,
            products = report.products_inserted,
            unprocessable = report.unprocessable.len(),
            "reference data seeded"
        );
        Ok(report)
    }

    pub fn count_purchase_order_lines(&self) -> Result<usize, Error> {
        let conn = self.open(false)?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM PurchaseOrderLines", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// All persisted lines in insertion order
    pub fn purchase_order_lines(&self) -> Result<Vec<PurchaseOrder>, Error> {
        let conn = self.open(false)?;
        let mut stmt = conn.prepare(
            "SELECT BuyerId, OrderDate, ProductCode, Quantity FROM PurchaseOrderLines ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PurchaseOrder {
                buyer_id: row.get(0)?,
                order_date: row.get(1)?,
                product_code: row.get(2)?,
                quantity: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn open(&self, create: bool) -> Result<Connection, Error> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

impl ReferenceSource for SqliteStore {
    fn load_reference_set(&self, kind: ReferenceKind) -> Result<ReferenceSet, Error> {
        let conn = self.open(false)?;
        // table and column names come from a closed enum, never from input
        let sql = format!("SELECT {} FROM {}", kind.key_column(), kind.table());
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<ReferenceSet, _>>()?;
        debug!(table = kind.table(), count = ids.len(), "reference set fetched");
        Ok(ids)
    }
}

impl ConnectionFactory for SqliteStore {
    type Connection = SqliteWriter;

    fn connect(&self) -> Result<SqliteWriter, Error> {
        Ok(SqliteWriter {
            conn: self.open(false)?,
        })
    }

    fn max_chunk_rows(&self) -> Option<usize> {
        Some(MAX_CHUNK_ROWS)
    }
}

/// Connection owned by a single chunk
pub struct SqliteWriter {
    conn: Connection,
}

impl ChunkWriter for SqliteWriter {
    fn begin(&mut self) -> Result<(), Error> {
        // take the write lock up front so concurrent chunks queue on the busy timeout
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn insert(&mut self, chunk: &[PurchaseOrder]) -> Result<usize, Error> {
        if chunk.is_empty() {
            return Ok(0);
        }
        if chunk.len() > MAX_CHUNK_ROWS {
            return Err(config_error(format!(
                "a chunk of {} rows exceeds the statement limit of {MAX_CHUNK_ROWS} rows",
                chunk.len()
            )));
        }

        let sql = insert_statement(chunk.len());
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() * COLUMNS_PER_ROW);
        for order in chunk {
            values.push(&order.buyer_id);
            values.push(&order.order_date);
            values.push(&order.product_code);
            values.push(&order.quantity);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        Ok(stmt.execute(values.as_slice())?)
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Error> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// Builds `INSERT ... VALUES (?, ?, ?, ?), ...` with one placeholder group per row.
pub(crate) fn insert_statement(rows: usize) -> String {
    const PREFIX: &str =
        "INSERT INTO PurchaseOrderLines (BuyerId, OrderDate, ProductCode, Quantity) VALUES ";
    const GROUP: &str = "(?, ?, ?, ?)";

    let mut sql = String::with_capacity(PREFIX.len() + rows * (GROUP.len() + 2));
    sql.push_str(PREFIX);
    for i in 0..rows {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(GROUP);
    }
    sql
}
