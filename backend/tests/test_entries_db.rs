use serial_test::serial;

use wbdict_backend::db::entries_models::NewEntry;
use wbdict_backend::{TagRules, parse_tei_entry, parse_tei_file};

mod helpers;
use helpers as h;

fn fixture_entries() -> Vec<NewEntry> {
    let rules = TagRules::default();
    ["DWB/DWB__haus.xml", "BWB/BWB__hof.xml"]
        .iter()
        .map(|name| NewEntry::from(&parse_tei_file(&h::tei_fixture(name), &rules).unwrap()))
        .collect()
}

#[test]
#[serial]
fn test_upsert_and_read_back() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());
    let db = h::open_test_db(tmp.path());

    assert_eq!(db.upsert_entries(&fixture_entries()).unwrap(), 2);
    assert_eq!(db.count_entries().unwrap(), 2);

    let haus = db.get_entry("DWB__haus").expect("entry stored");
    assert_eq!(haus.wb, "DWB");
    assert_eq!(haus.lemma, "Haus");
    assert_eq!(haus.lemma_variants_list(), vec!["Hus", "Hauß", "hus"]);
    assert_eq!(haus.regions_list(), vec!["allg.", "obd."]);
    assert_eq!(haus.data_json()["TEI"]["text"]["body"]["entry"]["@xmlId"], "DWB__haus");

    assert!(db.get_entry("DWB__nichts").is_none());
    assert_eq!(db.get_entries_by_lemma("Hof").len(), 1);
}

#[test]
#[serial]
fn test_upsert_replaces_existing_row() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());
    let db = h::open_test_db(tmp.path());

    db.upsert_entries(&fixture_entries()).unwrap();

    let changed = parse_tei_entry(
        r#"<entry xml:id="BWB__hof"><form type="lemma"><orth>Hoff</orth></form></entry>"#,
        &TagRules::default(),
    )
    .unwrap();
    db.upsert_entries(&[NewEntry::from(&changed)]).unwrap();

    assert_eq!(db.count_entries().unwrap(), 2);
    let hof = db.get_entry("BWB__hof").unwrap();
    assert_eq!(hof.lemma, "Hoff");
    assert!(hof.definitions_list().is_empty());
    assert!(hof.updated_at >= hof.created_at);
}

#[test]
#[serial]
fn test_wb_statistics() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());
    let db = h::open_test_db(tmp.path());

    let mut new_entries = fixture_entries();
    let extra = parse_tei_entry(
        r#"<entry xml:id="DWB__haus2"><form type="lemma"><orth>Haus</orth></form></entry>"#,
        &TagRules::default(),
    )
    .unwrap();
    new_entries.push(NewEntry::from(&extra));
    db.upsert_entries(&new_entries).unwrap();

    let rows = db.wb_statistics().unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].wb, "BWB");
    assert_eq!(rows[0].entries, 1);
    assert!((rows[0].avg_definitions - 1.0).abs() < 1e-9);

    assert_eq!(rows[1].wb, "DWB");
    assert_eq!(rows[1].entries, 2);
    assert_eq!(rows[1].unique_lemmas, 1);
    // 3 variants and 3 definitions over two entries
    assert!((rows[1].avg_variants - 1.5).abs() < 1e-9);
    assert!((rows[1].avg_definitions - 1.5).abs() < 1e-9);
}

#[test]
#[serial]
fn test_open_without_schema_then_migrate() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());

    let db_path = tmp.path().join("nested/dir/entries.sqlite3");
    let db = wbdict_backend::db::DatabaseHandle::open(&db_path, false).unwrap();
    assert!(db.count_entries().is_err());

    db.run_migrations().unwrap();
    db.run_migrations().unwrap();
    assert_eq!(db.count_entries().unwrap(), 0);
}
