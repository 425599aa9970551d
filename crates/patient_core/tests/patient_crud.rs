use patient_core::db::migrations::latest_version;
use patient_core::db::open_db_in_memory;
use patient_core::{
    Patient, PatientDraft, PatientRepository, PatientService, PatientValidationError, RepoError,
    SqlitePatientRepository,
};
use rusqlite::Connection;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let draft = PatientDraft::new("Jan de Vries", "Dorpsstraat 1", 1990);
    let created = repo.create(&draft).unwrap();

    assert_eq!(created.id, 3);
    let loaded = repo.get(created.id).unwrap();
    assert_eq!(loaded, draft.into_patient(3));
}

#[test]
fn duplicate_name_and_birth_year_conflicts_despite_other_address() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    repo.create(&PatientDraft::new("Jan de Vries", "Dorpsstraat 1", 1990))
        .unwrap();
    let err = repo
        .create(&PatientDraft::new("Jan de Vries", "Other address", 1990))
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Conflict { ref name, birth_year: 1990 } if name == "Jan de Vries"
    ));
    assert_eq!(repo.list().unwrap().len(), 3);
}

#[test]
fn same_name_with_different_birth_year_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let created = repo
        .create(&PatientDraft::new("Bart Luijten", "Achterdijk 46 C, Odijk", 1963))
        .unwrap();
    assert_eq!(created.birth_year, 1963);
}

#[test]
fn update_matching_own_row_does_not_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let updated = repo
        .update(1, &PatientDraft::new("Bart Luijten", "New address", 1962))
        .unwrap();

    assert_eq!(updated.address, "New address");
    assert_eq!(repo.get(1).unwrap().address, "New address");
}

#[test]
fn update_onto_another_records_pair_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let err = repo
        .update(2, &PatientDraft::new("Bart Luijten", "Elsewhere 2", 1962))
        .unwrap_err();

    assert!(matches!(err, RepoError::Conflict { .. }));
    assert_eq!(repo.get(2).unwrap().name, "Els Gijsbers");
}

#[test]
fn update_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let err = repo
        .update(42, &PatientDraft::new("Nobody", "Nowhere", 1950))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(42)));
}

#[test]
fn birth_year_out_of_range_is_rejected_by_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    for year in [1899, 2026, 0, -1] {
        let create_err = repo
            .create(&PatientDraft::new("Anna", "Straat 1", year))
            .unwrap_err();
        assert!(matches!(
            create_err,
            RepoError::Validation(PatientValidationError::BirthYearOutOfRange { value, .. }) if value == year
        ));

        let update_err = repo
            .update(1, &PatientDraft::new("Bart Luijten", "Straat 1", year))
            .unwrap_err();
        assert!(matches!(update_err, RepoError::Validation(_)));
    }

    assert_eq!(repo.get(1).unwrap().birth_year, 1962);
}

#[test]
fn empty_name_or_address_is_rejected_by_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let cases = [
        (PatientDraft::new("", "Straat 1", 1980), PatientValidationError::EmptyName),
        (PatientDraft::new("Anna", "", 1980), PatientValidationError::EmptyAddress),
        (PatientDraft::new("Anna", " \t ", 1980), PatientValidationError::EmptyAddress),
    ];

    for (draft, expected) in cases {
        match repo.create(&draft).unwrap_err() {
            RepoError::Validation(actual) => assert_eq!(actual, expected),
            other => panic!("unexpected error: {other}"),
        }
        match repo.update(2, &draft).unwrap_err() {
            RepoError::Validation(actual) => assert_eq!(actual, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(repo.list().unwrap().len(), 2);
}

#[test]
fn nul_in_name_or_address_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let cases = [
        (PatientDraft::new("\0Anna", "Straat 1", 1980), "name"),
        (PatientDraft::new("Anna", "\0Straat", 1980), "address"),
    ];

    for (draft, expected_field) in cases {
        match repo.create(&draft).unwrap_err() {
            RepoError::Validation(PatientValidationError::ContainsNul { field }) => {
                assert_eq!(field, expected_field)
            }
            other => panic!("unexpected error: {other}"),
        }
        match repo.update(1, &draft).unwrap_err() {
            RepoError::Validation(PatientValidationError::ContainsNul { field }) => {
                assert_eq!(field, expected_field)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(repo.list().unwrap().len(), 2);
}

#[test]
fn validation_runs_before_not_found_check() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let err = repo
        .update(99, &PatientDraft::new("", "Straat 1", 1980))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn delete_then_get_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    repo.delete(2).unwrap();

    assert!(matches!(repo.get(2).unwrap_err(), RepoError::NotFound(2)));
    assert!(matches!(repo.delete(2).unwrap_err(), RepoError::NotFound(2)));
}

#[test]
fn deleted_ids_are_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let third = repo
        .create(&PatientDraft::new("Jan de Vries", "Dorpsstraat 1", 1990))
        .unwrap();
    repo.delete(third.id).unwrap();

    let fourth = repo
        .create(&PatientDraft::new("Jan de Vries", "Dorpsstraat 1", 1990))
        .unwrap();
    assert_eq!(fourth.id, 4);
}

#[test]
fn list_returns_seed_rows_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let patients = repo.list().unwrap();
    let names: Vec<_> = patients.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Bart Luijten", "Els Gijsbers"]);
    assert!(patients
        .iter()
        .all(|p| p.address == "Achterdijk 46 C, Odijk" && p.birth_year == 1962));
}

#[test]
fn read_rejects_invalid_persisted_row() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON;
         UPDATE patients SET birth_year = 1800 WHERE id = 1;",
    )
    .unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let err = repo.get(1).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn service_wraps_repository_calls() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();
    let service = PatientService::new(repo);

    let created = service
        .create_patient(&PatientDraft::new("Fatima el Amrani", "Kerkplein 3", 1985))
        .unwrap();
    let fetched: Patient = service.get_patient(created.id).unwrap();
    assert_eq!(fetched, created);

    let updated = service
        .update_patient(created.id, &PatientDraft::new("Fatima el Amrani", "Kerkplein 5", 1985))
        .unwrap();
    assert_eq!(updated.address, "Kerkplein 5");

    service.delete_patient(created.id).unwrap();
    assert_eq!(service.list_patients().unwrap().len(), 2);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqlitePatientRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_patients_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePatientRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("patients"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE patients (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            address TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePatientRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "patients",
            column: "birth_year"
        })
    ));
}
