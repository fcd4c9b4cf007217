use serde_json::json;
use serial_test::serial;

use wbdict_backend::side_channel::convert_via_side_channel;
use wbdict_backend::{Document, EntryError, TagRules, document_to_json, parse_tei_entry, parse_tei_file};

mod helpers;
use helpers as h;

#[test]
#[serial]
fn test_haus_entry_fields() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());

    let entry = parse_tei_file(&h::tei_fixture("DWB/DWB__haus.xml"), &TagRules::default()).unwrap();

    assert_eq!(entry.id, "DWB__haus");
    assert_eq!(entry.wb, "DWB");
    assert_eq!(entry.lemma, "Haus");
    assert_eq!(entry.lemma_variants, vec!["Hus", "Hauß", "hus"]);
    assert_eq!(entry.definitions, vec!["Gebäude, ", " zum Wohnen", "Familie, Geschlecht"]);
    assert_eq!(entry.regions, vec!["allg.", "obd."]);
    assert!(entry.search_text.starts_with("Haus Hus Hauß hus Gebäude,"));
    assert!(entry.search_text.ends_with("ein   Haus"));
}

#[test]
#[serial]
fn test_haus_entry_mixed_content() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());

    let entry = parse_tei_file(&h::tei_fixture("DWB/DWB__haus.xml"), &TagRules::default()).unwrap();
    let e = &entry.data["TEI"]["text"]["body"]["entry"];

    assert_eq!(e["@xmlId"], json!("DWB__haus"));
    assert_eq!(e["@xmlLang"], json!("de"));
    assert_eq!(e["form"].as_array().map(Vec::len), Some(4));
    assert_eq!(e["gramGrp"], json!({"pos": {"value": "n"}, "gen": {"value": "n"}}));

    let sense = &e["sense"][0];
    assert_eq!(
        sense["def"],
        json!({"content": [
            {"type": "text", "value": "Gebäude, "},
            {"type": "hi", "value": "bes.", "rend": "it"},
            {"type": "text", "value": " zum Wohnen"}
        ]})
    );
    assert_eq!(
        sense["note"][0]["content"],
        json!([
            {"type": "text", "value": "vgl. "},
            {"type": "ref", "value": "Hütte", "target": "#DWB__huette"},
            {"type": "text", "value": " und "},
            {"type": "ref", "value": "Heim", "target": "#DWB__heim"}
        ])
    );
    assert!(sense["note"][0].get("ref").is_none());
    assert_eq!(sense["cit"][0]["bibl"], json!([{"value": "Goethe"}]));
    assert_eq!(sense["cit"][0]["quote"]["content"][1], json!({"type": "hi", "value": "großes"}));

    assert_eq!(e["sense"][1]["def"], json!({"value": "Familie, Geschlecht"}));
    assert_eq!(
        e["etym"]["content"],
        json!([
            {"type": "text", "value": "ahd. "},
            {"type": "mentioned", "value": "hūs"},
            {"type": "text", "value": ", mhd. "},
            {"type": "mentioned", "value": "hûs"}
        ])
    );
}

#[test]
#[serial]
fn test_side_channel_agrees_on_fixtures() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());
    let rules = TagRules::default();

    for name in ["DWB/DWB__haus.xml", "BWB/BWB__hof.xml"] {
        let xml = std::fs::read_to_string(h::tei_fixture(name)).unwrap();
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(convert_via_side_channel(&doc, &rules), document_to_json(&doc, &rules), "{}", name);
    }
}

#[test]
#[serial]
fn test_serialized_tree_converts_the_same() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());
    let rules = TagRules::default();

    let entry = parse_tei_file(&h::tei_fixture("DWB/DWB__haus.xml"), &rules).unwrap();
    let again = parse_tei_entry(&entry.tei_xml, &rules).unwrap();
    assert_eq!(again.data, entry.data);
    assert_eq!(again.search_text, entry.search_text);
}

#[test]
#[serial]
fn test_missing_id_fixture() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());

    let err = parse_tei_file(&h::tei_fixture("broken/no_id.xml"), &TagRules::default()).unwrap_err();
    assert_eq!(err.downcast_ref::<EntryError>(), Some(&EntryError::MissingId));
}

#[test]
#[serial]
fn test_utf16_file_matches_utf8() {
    let tmp = tempfile::tempdir().unwrap();
    h::test_env_setup(tmp.path());

    let xml = std::fs::read_to_string(h::tei_fixture("BWB/BWB__hof.xml")).unwrap();
    let mut bytes = vec![0xFF, 0xFE];
    for unit in xml.replace('\n', "\r\n").encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let utf16_path = tmp.path().join("hof16.xml");
    std::fs::write(&utf16_path, bytes).unwrap();

    let rules = TagRules::default();
    let from_utf16 = parse_tei_file(&utf16_path, &rules).unwrap();
    let from_utf8 = parse_tei_file(&h::tei_fixture("BWB/BWB__hof.xml"), &rules).unwrap();
    assert_eq!(from_utf16, from_utf8);
}

#[test]
fn test_malformed_entry_recovers() {
    let xml = r#"<entry xml:id="X__y"><form type="lemma"><orth>Wort</orth></form><sense><def>a <hi>b</def>"#;
    let entry = parse_tei_entry(xml, &TagRules::default()).unwrap();
    assert_eq!(entry.lemma, "Wort");
    assert_eq!(entry.definitions, vec!["a "]);
}
