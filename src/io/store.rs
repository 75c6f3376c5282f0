//! SQLite persistence of the normalized table.
//!
//! One fixed table, replaced wholesale on every ETL run (drop + create + insert in a
//! single transaction, so a failed run leaves the previous table intact). Loading
//! reads the table back as a `RawTable` and runs it through the normalizer again,
//! which is a no-op on already-normalized data.

use std::path::Path;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, params_from_iter};
use tracing::info;

use crate::dataset::{Dataset, Field};
use crate::domain::{RawCell, RawTable};
use crate::error::EtlError;
use crate::normalize::normalize;

/// Table holding the normalized incidents.
pub const TABLE: &str = "incidents";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replace the incidents table with `dataset`. Returns the number of rows written.
pub fn write_dataset(conn: &mut Connection, dataset: &Dataset) -> Result<usize, EtlError> {
    let layout = dataset.layout();
    let column_defs: Vec<String> = layout
        .iter()
        .map(|c| {
            let ty = if c.field == Field::Value { "REAL" } else { "TEXT" };
            format!("{} {ty}", quote_ident(&c.name))
        })
        .collect();
    let placeholders = vec!["?"; layout.len()].join(", ");

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({cols});",
        table = quote_ident(TABLE),
        cols = column_defs.join(", "),
    ))?;

    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_ident(TABLE)
        ))?;
        for record in dataset.all() {
            let values = layout.iter().map(|c| match c.field {
                Field::Date => Value::Text(record.date.format("%Y-%m-%d").to_string()),
                Field::Time if record.time.is_empty() => Value::Null,
                Field::Time => Value::Text(record.time.clone()),
                Field::Timestamp => record
                    .timestamp
                    .map(|ts| Value::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()))
                    .unwrap_or(Value::Null),
                Field::Category => record.category.clone().map(Value::Text).unwrap_or(Value::Null),
                Field::Value => Value::Real(record.value),
                Field::Extra(idx) => record
                    .extra
                    .get(idx)
                    .cloned()
                    .flatten()
                    .map(Value::Text)
                    .unwrap_or(Value::Null),
            });
            stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;

    Ok(dataset.len())
}

/// Read the incidents table as untyped rows, in insertion order.
pub fn read_table(conn: &Connection, path: &Path) -> Result<RawTable, EtlError> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [TABLE],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(EtlError::TableNotFound {
            path: path.to_path_buf(),
            table: TABLE.to_string(),
        });
    }

    let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(TABLE)))?;
    let headers: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = headers.len();
    let mut table = RawTable::new(headers);

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(convert_value(row.get_ref(idx)?));
        }
        table.rows.push(cells);
    }
    Ok(table)
}

fn convert_value(value: ValueRef<'_>) -> RawCell {
    match value {
        ValueRef::Null => RawCell::Empty,
        ValueRef::Integer(i) => RawCell::Number(i as f64),
        ValueRef::Real(f) => RawCell::Number(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            RawCell::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Normalize-and-persist target: create or overwrite the store at `path`.
pub fn save_dataset(path: &Path, dataset: &Dataset) -> Result<usize, EtlError> {
    let mut conn = Connection::open(path)?;
    let written = write_dataset(&mut conn, dataset)?;
    info!(path = %path.display(), rows = written, table = TABLE, "replaced store table");
    Ok(written)
}

/// Load a new dataset from the store at `path`.
///
/// The store must already exist; it is opened read-only.
pub fn load_dataset(path: &Path) -> Result<Dataset, EtlError> {
    if !path.is_file() {
        return Err(EtlError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let table = read_table(&conn, path)?;
    let dataset = normalize(&table)?;
    info!(path = %path.display(), rows = dataset.len(), "loaded dataset from store");
    Ok(dataset)
}
