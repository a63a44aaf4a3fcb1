use romentry_core::db::open_db_in_memory;
use romentry_core::{
    clinical_form, Checkpoint, FormConfig, FormSynchronizer, MemoryForm, NativeValue, PatientInfo,
    Record, RecordStore, Registry, SqliteCheckpoint, SqliteRowStore, StoreError, Value,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

const NO_VALUE_TEXT: &str = "Ei mitattu";

fn variables(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn patient() -> PatientInfo {
    PatientInfo {
        firstname: "Testi".to_string(),
        lastname: "Potilas".to_string(),
        ssn: "131052-308T".to_string(),
        patient_code: "P-0001".to_string(),
    }
}

fn new_rom(store: &SqliteRowStore<'_>) -> i64 {
    let patient_id = store.create_patient(&patient()).unwrap();
    store.create_rom(patient_id).unwrap()
}

fn raw_column(conn: &Connection, rom_id: i64, column: &str) -> Option<String> {
    conn.query_row(
        &format!("SELECT CAST(\"{column}\" AS TEXT) FROM roms WHERE rom_id = ?1;"),
        [rom_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn ensure_columns_adds_only_missing_columns() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);

    let added = store
        .ensure_columns(&variables(&["AntropPaino", "TiedotNimi"]))
        .unwrap();
    assert_eq!(added, vec!["AntropPaino".to_string(), "TiedotNimi".to_string()]);

    let added = store
        .ensure_columns(&variables(&["AntropPaino", "TiedotNimi", "cmtLonkka", "rom_id"]))
        .unwrap();
    assert_eq!(added, vec!["cmtLonkka".to_string()]);
}

#[test]
fn unsafe_variable_names_never_reach_sql() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);

    let err = store
        .ensure_columns(&variables(&["x\" TEXT); DROP TABLE roms; --"]))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey(_)));
}

#[test]
fn row_store_writes_no_value_as_text_and_reads_it_back_verbatim() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);
    store
        .ensure_columns(&variables(&["AntropPaino", "AntropPituus", "TiedotNimi"]))
        .unwrap();
    let rom_id = new_rom(&store);

    let record: Record = [
        ("AntropPaino".to_string(), Value::Number(80.5)),
        ("AntropPituus".to_string(), Value::NoValue),
        ("TiedotNimi".to_string(), Value::text("Åsa")),
    ]
    .into_iter()
    .collect();
    store.save(&rom_id, &record).unwrap();

    assert_eq!(
        raw_column(&conn, rom_id, "AntropPituus").as_deref(),
        Some(NO_VALUE_TEXT)
    );
    let loaded = store.load(&rom_id).unwrap();
    assert_eq!(loaded.get("AntropPaino"), Some(&Value::Number(80.5)));
    assert_eq!(loaded.get("AntropPituus"), Some(&Value::text(NO_VALUE_TEXT)));
    assert_eq!(loaded.get("TiedotNimi"), Some(&Value::text("Åsa")));
}

#[test]
fn null_columns_are_absent_from_loaded_records() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);
    store
        .ensure_columns(&variables(&["AntropPaino", "AntropPituus"]))
        .unwrap();
    let rom_id = new_rom(&store);
    store
        .save_field(rom_id, "AntropPaino", &Value::Number(80.0))
        .unwrap();

    let loaded = store.load(&rom_id).unwrap();
    assert_eq!(loaded.get("AntropPaino"), Some(&Value::Number(80.0)));
    assert!(!loaded.contains_key("AntropPituus"));
}

#[test]
fn missing_rows_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);

    assert!(matches!(store.load(&42), Err(StoreError::NotFound(_))));
    store.ensure_columns(&variables(&["AntropPaino"])).unwrap();
    assert!(matches!(store.load(&42), Err(StoreError::NotFound(_))));
    assert!(matches!(
        store.save_field(42, "AntropPaino", &Value::NoValue),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(store.patient_info(42), Err(StoreError::NotFound(_))));
}

#[test]
fn patient_info_fills_read_only_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);
    let rom_id = new_rom(&store);

    let info = store.patient_info(rom_id).unwrap();
    assert_eq!(info, patient());
    assert_eq!(
        info.readonly_fields()[2],
        ("rdonly_ssn", "131052-308T")
    );
}

#[test]
fn sqlite_checkpoint_updates_only_changed_columns() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRowStore::new(&conn, NO_VALUE_TEXT);
    store
        .ensure_columns(&variables(&["AntropPaino", "TiedotNimi"]))
        .unwrap();
    let rom_id = new_rom(&store);

    let record: Record = [
        ("AntropPaino".to_string(), Value::Number(80.0)),
        ("TiedotNimi".to_string(), Value::text("ei tallenneta")),
    ]
    .into_iter()
    .collect();
    let mut checkpoint = SqliteCheckpoint::new(SqliteRowStore::new(&conn, NO_VALUE_TEXT), rom_id);
    checkpoint
        .write(&record, &["AntropPaino".to_string()])
        .unwrap();

    assert_eq!(raw_column(&conn, rom_id, "AntropPaino").as_deref(), Some("80.0"));
    assert_eq!(raw_column(&conn, rom_id, "TiedotNimi"), None);
}

#[test]
fn clinical_form_edits_flow_into_a_rom_row() {
    let conn = open_db_in_memory().unwrap();
    let config = FormConfig::default();
    let registry = Registry::build(&clinical_form(), &config.body_weight_control).unwrap();
    let setup = SqliteRowStore::new(&conn, config.no_value_text.as_str());
    setup.ensure_columns(&registry.all_variable_names()).unwrap();
    let rom_id = new_rom(&setup);

    let view = MemoryForm::for_registry(&registry);
    let checkpoint = SqliteCheckpoint::new(
        SqliteRowStore::new(&conn, config.no_value_text.as_str()),
        rom_id,
    );
    let mut sync = FormSynchronizer::new(registry, view, config)
        .unwrap()
        .with_checkpoint(checkpoint);

    for (id, value) in [
        ("spAntropPaino", 80.0),
        ("spIsokinPolviEkstensioOikNormUn", 160.0),
    ] {
        let native = sync.view_mut().set(id, NativeValue::Number(value));
        sync.on_control_changed(id, native).unwrap();
    }

    let row = setup.load(&rom_id).unwrap();
    assert_eq!(row.len(), 3);
    assert_eq!(
        row.get("IsokinPolviEkstensioOikNorm"),
        Some(&Value::Number(2.0))
    );

    let view = MemoryForm::for_registry(sync.registry());
    let registry = sync.registry().clone();
    let mut reopened = FormSynchronizer::new(registry, view, FormConfig::default()).unwrap();
    let outcome = reopened.load_from(&setup, &rom_id).unwrap();
    assert!(!outcome.report.requires_attention());
    assert_eq!(outcome.modified, 3);
    assert_eq!(reopened.record(), sync.record());
}

#[test]
fn text_equal_to_no_value_text_survives_a_row_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let config = FormConfig::default();
    let registry = Registry::build(&clinical_form(), &config.body_weight_control).unwrap();
    let store = SqliteRowStore::new(&conn, config.no_value_text.as_str());
    store.ensure_columns(&registry.all_variable_names()).unwrap();
    let rom_id = new_rom(&store);

    let view = MemoryForm::for_registry(&registry);
    let mut sync = FormSynchronizer::new(registry, view, config).unwrap();
    for (id, value) in [
        ("lnTiedotNimi", NativeValue::text(NO_VALUE_TEXT)),
        ("cmtLonkka", NativeValue::text(NO_VALUE_TEXT)),
        ("spAntropPituus", NativeValue::Number(172.0)),
    ] {
        let native = sync.view_mut().set(id, value);
        sync.on_control_changed(id, native).unwrap();
    }
    sync.save_to(&store, &rom_id).unwrap();

    let view = MemoryForm::for_registry(sync.registry());
    let registry = sync.registry().clone();
    let mut reopened = FormSynchronizer::new(registry, view, FormConfig::default()).unwrap();
    let outcome = reopened.load_from(&store, &rom_id).unwrap();

    assert!(outcome.report.is_clean());
    assert_eq!(reopened.record(), sync.record());
    assert_eq!(
        reopened.record().get("TiedotNimi"),
        Some(&Value::text(NO_VALUE_TEXT))
    );
    assert_eq!(reopened.record().get("AntropPaino"), Some(&Value::NoValue));
    assert_eq!(outcome.modified, 3);
}
