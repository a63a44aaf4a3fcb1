//! SQLite row record store.
//!
//! # Responsibility
//! - Persist a record as one `roms` row, one column per variable.
//! - Keep `roms` columns in step with the form's variables.
//! - Read patient identity for a measurement row.
//!
//! # Invariants
//! - `NULL` columns are absent from loaded records (never written yet).
//! - `NoValue` is stored as the configured no-value text and read back as
//!   that text; only the synchronizer knows which columns are numeric.
//! - Column names are plain identifiers; anything else is rejected before
//!   it reaches SQL text.

use super::record_store::{RecordStore, StoreError, StoreResult};
use crate::model::value::{Record, Value};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

static COLUMN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid column name regex"));

/// `roms` columns that are not measurement variables.
const KEY_COLUMNS: &[&str] = &["rom_id", "patient_id", "created_at"];

/// Measurement row id.
pub type RomId = i64;

/// Read-only patient identity shown alongside a measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientInfo {
    pub firstname: String,
    pub lastname: String,
    pub ssn: String,
    pub patient_code: String,
}

impl PatientInfo {
    /// Control id / value pairs for the unbound `rdonly_*` widgets.
    pub fn readonly_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("rdonly_firstname", self.firstname.as_str()),
            ("rdonly_lastname", self.lastname.as_str()),
            ("rdonly_ssn", self.ssn.as_str()),
            ("rdonly_patient_code", self.patient_code.as_str()),
        ]
    }
}

/// Record store addressing `roms` rows by id.
pub struct SqliteRowStore<'conn> {
    conn: &'conn Connection,
    no_value_text: String,
}

impl<'conn> SqliteRowStore<'conn> {
    pub fn new(conn: &'conn Connection, no_value_text: impl Into<String>) -> Self {
        Self {
            conn,
            no_value_text: no_value_text.into(),
        }
    }

    /// Adds a `roms` column for every variable the table lacks.
    ///
    /// Returns the names of added columns.
    pub fn ensure_columns(&self, variables: &BTreeSet<String>) -> StoreResult<Vec<String>> {
        let existing = self.data_columns()?;
        let mut added = Vec::new();
        for variable in variables {
            if existing.contains(variable) || KEY_COLUMNS.contains(&variable.as_str()) {
                continue;
            }
            let column = checked_column(variable)?;
            self.conn
                .execute_batch(&format!("ALTER TABLE roms ADD COLUMN \"{column}\";"))?;
            added.push(variable.clone());
        }
        if !added.is_empty() {
            info!(
                "event=schema_sync module=repo status=ok store=sqlite added_columns={}",
                added.len()
            );
        }
        Ok(added)
    }

    /// Inserts a patient and returns its id.
    pub fn create_patient(&self, patient: &PatientInfo) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO patients (firstname, lastname, ssn, patient_code)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                patient.firstname,
                patient.lastname,
                patient.ssn,
                patient.patient_code
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Inserts an empty measurement row for a patient.
    pub fn create_rom(&self, patient_id: i64) -> StoreResult<RomId> {
        self.conn
            .execute("INSERT INTO roms (patient_id) VALUES (?1);", [patient_id])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Patient identity of the measurement row.
    pub fn patient_info(&self, rom_id: RomId) -> StoreResult<PatientInfo> {
        self.conn
            .query_row(
                "SELECT p.firstname, p.lastname, p.ssn, p.patient_code
                 FROM roms r JOIN patients p ON p.patient_id = r.patient_id
                 WHERE r.rom_id = ?1;",
                [rom_id],
                |row| {
                    Ok(PatientInfo {
                        firstname: row.get(0)?,
                        lastname: row.get(1)?,
                        ssn: row.get(2)?,
                        patient_code: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("patient of rom_id {rom_id}")))
    }

    /// Writes one variable of one row.
    pub fn save_field(&self, rom_id: RomId, key: &str, value: &Value) -> StoreResult<()> {
        let column = checked_column(key)?;
        let changed = self.conn.execute(
            &format!("UPDATE roms SET \"{column}\" = ?1 WHERE rom_id = ?2;"),
            params![self.to_sql(value), rom_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("rom_id {rom_id}")));
        }
        Ok(())
    }

    fn data_columns(&self) -> StoreResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info('roms');")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(names
            .into_iter()
            .filter(|name| !KEY_COLUMNS.contains(&name.as_str()))
            .collect())
    }

    fn to_sql(&self, value: &Value) -> SqlValue {
        match value {
            Value::Number(number) => SqlValue::Real(*number),
            Value::Text(text) => SqlValue::Text(text.clone()),
            Value::NoValue => SqlValue::Text(self.no_value_text.clone()),
        }
    }

}

fn from_sql(column: &str, value: ValueRef<'_>) -> StoreResult<Option<Value>> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(number) => Ok(Some(Value::Number(number as f64))),
        ValueRef::Real(number) => Ok(Some(Value::Number(number))),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Some(Value::text(text)))
            .map_err(|_| StoreError::Parse(format!("column `{column}` is not valid UTF-8"))),
        ValueRef::Blob(_) => Err(StoreError::Parse(format!(
            "column `{column}` holds a blob"
        ))),
    }
}

impl RecordStore for SqliteRowStore<'_> {
    type Locator = RomId;

    fn load(&self, rom_id: &RomId) -> StoreResult<Record> {
        let columns: Vec<String> = self.data_columns()?.into_iter().collect();
        if columns.is_empty() {
            let exists = self
                .conn
                .query_row("SELECT 1 FROM roms WHERE rom_id = ?1;", [rom_id], |_| Ok(()))
                .optional()?;
            return match exists {
                Some(()) => Ok(Record::new()),
                None => Err(StoreError::NotFound(format!("rom_id {rom_id}"))),
            };
        }

        let select_list = columns
            .iter()
            .map(|column| format!("\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {select_list} FROM roms WHERE rom_id = ?1;"))?;
        let mut rows = stmt.query([rom_id])?;
        let Some(row) = rows.next()? else {
            return Err(StoreError::NotFound(format!("rom_id {rom_id}")));
        };

        let mut record = Record::new();
        for (index, column) in columns.iter().enumerate() {
            if let Some(value) = from_sql(column, row.get_ref(index)?)? {
                record.insert(column.clone(), value);
            }
        }

        info!(
            "event=record_load module=repo status=ok store=sqlite keys={}",
            record.len()
        );
        Ok(record)
    }

    /// Writes every variable with one `UPDATE` per column, atomically.
    fn save(&self, rom_id: &RomId, record: &Record) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in record {
            self.save_field(*rom_id, key, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn describe(&self, rom_id: &RomId) -> String {
        format!("rom_id {rom_id}")
    }
}

fn checked_column(name: &str) -> StoreResult<&str> {
    if COLUMN_NAME_RE.is_match(name) {
        Ok(name)
    } else {
        Err(StoreError::InvalidKey(name.to_string()))
    }
}
