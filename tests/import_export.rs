use pm_wallet::{Entry, Error, Wallet};
use tempfile::TempDir;

fn seeded(dir: &TempDir) -> Wallet {
    let mut wallet = Wallet::in_dir(dir.path(), "default", "pass");
    for (name, group) in [("mail", "personal"), ("github", "work"), ("vpn", "work")] {
        wallet
            .add_entry(Entry {
                name: name.into(),
                group: group.into(),
                password: "pw".into(),
                ..Entry::new()
            })
            .unwrap();
    }
    wallet
}

#[test]
fn export_contains_every_field() {
    let dir = TempDir::new().unwrap();
    let wallet = seeded(&dir);
    let data = wallet.export().unwrap();

    let json: serde_json::Value = serde_json::from_slice(&data).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);
    for (record, entry) in records.iter().zip(wallet.entries()) {
        assert_eq!(record["id"], entry.id.as_str());
        for field in ["name", "group", "uri", "user", "password", "otp", "comment"] {
            assert!(record.get(field).is_some(), "missing {field}");
        }
    }
}

#[test]
fn export_import_into_empty_wallet() {
    let dir = TempDir::new().unwrap();
    let source = seeded(&dir);
    let data = source.export().unwrap();

    let mut target = Wallet::in_dir(dir.path(), "other", "pass");
    assert_eq!(target.import(&data).unwrap(), 3);
    assert_eq!(target.entries(), source.entries());
}

#[test]
fn importing_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let source = seeded(&dir);
    let data = source.export().unwrap();

    let mut target = Wallet::in_dir(dir.path(), "other", "pass");
    target.import(&data).unwrap();
    assert_eq!(target.import(&data).unwrap(), 0);
    assert_eq!(target.len(), 3);
}

#[test]
fn reimport_into_source_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let mut wallet = seeded(&dir);
    let data = wallet.export().unwrap();
    assert_eq!(wallet.import(&data).unwrap(), 0);
    assert_eq!(wallet.len(), 3);
}

#[test]
fn records_without_id_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let mut wallet = Wallet::in_dir(dir.path(), "default", "pass");
    let doc = br#"[
        {"name":"a","group":"","uri":"","user":"","password":"1","otp":"","comment":""},
        {"name":"b","password":"2"}
    ]"#;
    assert_eq!(wallet.import(doc).unwrap(), 2);
    let ids: Vec<&str> = wallet.entries().iter().map(|e| e.id.as_str()).collect();
    assert!(ids.iter().all(|id| !id.is_empty()));
    assert_ne!(ids[0], ids[1]);
    assert_eq!(wallet.entries()[1].name, "b");
}

#[test]
fn imported_entries_survive_save() {
    let dir = TempDir::new().unwrap();
    let data = seeded(&dir).export().unwrap();

    let mut wallet = Wallet::in_dir(dir.path(), "imported", "pass");
    wallet.import(&data).unwrap();
    wallet.save().unwrap();

    let mut reopened = Wallet::in_dir(dir.path(), "imported", "pass");
    reopened.load().unwrap();
    assert_eq!(reopened.groups(), ["personal", "work"]);
    assert_eq!(reopened.search("", "work").len(), 2);
}

#[test]
fn malformed_import_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut wallet = seeded(&dir);
    let docs: [&[u8]; 4] = [
        b"[",
        b"42",
        br#"[{"name":1}]"#,
        br#"[{"name":"x","otp":"!!"}]"#,
    ];
    for doc in docs {
        assert!(matches!(wallet.import(doc), Err(Error::MalformedImport(_))));
    }
    assert_eq!(wallet.len(), 3);
}
