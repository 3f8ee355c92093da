//! Sales data access
//!
//! Executes a caller-supplied SQL string against the sales table and
//! renders the result rows as text for the model to read.
//!
//! Trust boundary: the query string originates from the model's tool-call
//! arguments and is executed with no allow-list, no parameterization, and
//! no read-only restriction. That boundary is part of this demo's contract
//! and is documented here rather than patched.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS sales (
    id INTEGER PRIMARY KEY,
    date TEXT,
    product TEXT,
    quantity INTEGER,
    price REAL,
    total REAL
)";

/// Demo rows inserted when the table is empty so a clean checkout answers
/// questions out of the box.
const DEMO_ROWS: &[(&str, &str, i64, f64)] = &[
    ("2024-01-14", "Roadster 500", 2, 899.99),
    ("2024-01-29", "Trail Blazer 29", 1, 1249.00),
    ("2024-02-03", "City Cruiser", 3, 549.50),
    ("2024-02-18", "Roadster 500", 1, 899.99),
    ("2024-03-05", "Gravel King", 2, 1599.00),
    ("2024-03-12", "City Cruiser", 1, 549.50),
    ("2024-03-27", "Trail Blazer 29", 2, 1249.00),
    ("2024-04-02", "Roadster 500", 1, 899.99),
];

/// Thread-safe handle to the sales database
#[derive(Clone)]
pub struct SalesDb {
    conn: Arc<Mutex<Connection>>,
}

impl SalesDb {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(SCHEMA)?;
        seed_demo_rows(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run an arbitrary query and render its rows. Failures are embedded in
    /// the returned text so the model can self-correct or apologize instead
    /// of crashing the turn.
    pub fn execute(&self, query: &str) -> String {
        match self.run_query(query) {
            Ok(rendered) => rendered,
            Err(e) => format!("Error: {e}"),
        }
    }

    fn run_query(&self, query: &str) -> rusqlite::Result<String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(query)?;
        let column_count = stmt.column_count();

        let mut rendered = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                fields.push(render_value(row.get_ref(idx)?));
            }
            rendered.push(render_tuple(&fields));
        }

        Ok(format!("[{}]", rendered.join(", ")))
    }
}

fn seed_demo_rows(conn: &Connection) -> rusqlite::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    for (date, product, quantity, price) in DEMO_ROWS {
        #[allow(clippy::cast_precision_loss)]
        let total = *quantity as f64 * price;
        conn.execute(
            "INSERT INTO sales (date, product, quantity, price, total) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![date, product, quantity, price, total],
        )?;
    }
    tracing::info!(rows = DEMO_ROWS.len(), "Seeded demo sales data");
    Ok(())
}

/// Render a row the way the model saw rows in the original dataset:
/// a tuple literal, with the trailing comma for one-element tuples.
fn render_tuple(fields: &[String]) -> String {
    if fields.len() == 1 {
        format!("({},)", fields[0])
    } else {
        format!("({})", fields.join(", "))
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => {
            if r.fract() == 0.0 {
                format!("{r:.1}")
            } else {
                r.to_string()
            }
        }
        ValueRef::Text(t) => format!("'{}'", String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
