//! Patient repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `patients` table.
//! - Enforce field constraints and the `(name, birth_year)` uniqueness rule.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the draft before any SQL mutation.
//! - Create/update run the uniqueness check and the write inside one
//!   `IMMEDIATE` transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::patient::{Patient, PatientDraft, PatientId, PatientValidationError};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PATIENTS_TABLE: &str = "patients";
const PATIENT_COLUMNS: [&str; 4] = ["id", "name", "address", "birth_year"];

const PATIENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    address,
    birth_year
FROM patients";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from patient persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// A field failed its constraint.
    Validation(PatientValidationError),
    /// Another patient already has this `(name, birth_year)` pair.
    Conflict { name: String, birth_year: i32 },
    /// No patient with this id exists.
    NotFound(PatientId),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted data cannot be converted into a valid `Patient`.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Stable machine-readable code, safe to log (never carries field values).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Conflict { .. } => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Db(_) => "db_error",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_table",
            Self::MissingRequiredColumn { .. } => "missing_column",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { name, birth_year } => write!(
                f,
                "a patient named `{name}` with birth_year {birth_year} already exists"
            ),
            Self::NotFound(id) => write!(f, "patient not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted patient data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "patient repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "patient repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "patient repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Conflict { .. } => None,
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<PatientValidationError> for RepoError {
    fn from(value: PatientValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for patient CRUD operations.
pub trait PatientRepository {
    fn create(&self, draft: &PatientDraft) -> RepoResult<Patient>;
    fn get(&self, id: PatientId) -> RepoResult<Patient>;
    fn list(&self) -> RepoResult<Vec<Patient>>;
    fn update(&self, id: PatientId, draft: &PatientDraft) -> RepoResult<Patient>;
    fn delete(&self, id: PatientId) -> RepoResult<()>;
}

/// SQLite-backed patient repository.
pub struct SqlitePatientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePatientRepository<'conn> {
    /// Creates repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not match what this repository reads and writes.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_patient_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PatientRepository for SqlitePatientRepository<'_> {
    fn create(&self, draft: &PatientDraft) -> RepoResult<Patient> {
        draft.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_unique_in_tx(&tx, draft, None)?;
        tx.execute(
            "INSERT INTO patients (name, address, birth_year) VALUES (?1, ?2, ?3);",
            params![draft.name.as_str(), draft.address.as_str(), draft.birth_year],
        )
        .map_err(|err| map_write_error(err, draft))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(draft.clone().into_patient(id))
    }

    fn get(&self, id: PatientId) -> RepoResult<Patient> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PATIENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => parse_patient_row(row),
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn list(&self) -> RepoResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PATIENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut patients = Vec::new();

        while let Some(row) = rows.next()? {
            patients.push(parse_patient_row(row)?);
        }

        Ok(patients)
    }

    fn update(&self, id: PatientId, draft: &PatientDraft) -> RepoResult<Patient> {
        draft.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !patient_exists_in_tx(&tx, id)? {
            return Err(RepoError::NotFound(id));
        }
        ensure_unique_in_tx(&tx, draft, Some(id))?;
        tx.execute(
            "UPDATE patients
             SET
                name = ?2,
                address = ?3,
                birth_year = ?4
             WHERE id = ?1;",
            params![
                id,
                draft.name.as_str(),
                draft.address.as_str(),
                draft.birth_year
            ],
        )
        .map_err(|err| map_write_error(err, draft))?;
        tx.commit()?;

        Ok(draft.clone().into_patient(id))
    }

    fn delete(&self, id: PatientId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn ensure_unique_in_tx(
    tx: &Transaction<'_>,
    draft: &PatientDraft,
    exclude_id: Option<PatientId>,
) -> RepoResult<()> {
    let holder: Option<PatientId> = tx
        .query_row(
            "SELECT id
             FROM patients
             WHERE name = ?1
               AND birth_year = ?2
               AND (?3 IS NULL OR id <> ?3)
             LIMIT 1;",
            params![draft.name.as_str(), draft.birth_year, exclude_id],
            |row| row.get(0),
        )
        .optional()?;

    match holder {
        Some(_) => Err(conflict(draft)),
        None => Ok(()),
    }
}

fn patient_exists_in_tx(tx: &Transaction<'_>, id: PatientId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Maps constraint failures raised by SQLite itself: unique-index violations
/// become `Conflict`, CHECK violations become `Validation`.
fn map_write_error(err: rusqlite::Error, draft: &PatientDraft) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            conflict(draft)
        }
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_CHECK =>
        {
            RepoError::Validation(PatientValidationError::RejectedByStore(
                message
                    .clone()
                    .unwrap_or_else(|| "CHECK constraint failed".to_string()),
            ))
        }
        _ => err.into(),
    }
}

fn conflict(draft: &PatientDraft) -> RepoError {
    RepoError::Conflict {
        name: draft.name.clone(),
        birth_year: draft.birth_year,
    }
}

fn parse_patient_row(row: &Row<'_>) -> RepoResult<Patient> {
    let id: PatientId = row.get("id")?;
    let birth_year_raw: i64 = row.get("birth_year")?;
    let birth_year = i32::try_from(birth_year_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "birth_year `{birth_year_raw}` out of range in patients.birth_year for id {id}"
        ))
    })?;

    let patient = Patient {
        id,
        name: row.get("name")?,
        address: row.get("address")?,
        birth_year,
    };
    patient
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("patient {id}: {err}")))?;
    Ok(patient)
}

fn ensure_patient_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, PATIENTS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(PATIENTS_TABLE));
    }

    for column in PATIENT_COLUMNS {
        if !table_has_column(conn, PATIENTS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: PATIENTS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
