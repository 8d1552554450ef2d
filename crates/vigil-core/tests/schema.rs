// Verify the on-disk JSON schema stays compatible with existing config
// files: PascalCase field names, every field optional.

use vigil_core::Config;

const BASE: &str = r#"{
    "Variables": { "X": "1", "SRC": "/var/imports" },
    "Enabled":  ["importer"],
    "Disabled": ["backup"],
    "Commands": [
        { "Name": "importer", "Pool": "db", "Interval": "15m",
          "Timeout": "1h", "Command": "/usr/bin/importer",
          "Params": ["--src", "!SRC"], "StartTime": "" },
        { "Name": "backup", "Pool": "db", "Interval": "24h",
          "Timeout": "8h", "Command": "/usr/bin/backup",
          "Params": [], "StartTime": "2h30m" }
    ]
}"#;

#[test]
fn full_schema_parses() {
    let cfg: Config = serde_json::from_str(BASE).unwrap();
    assert_eq!(cfg.variables["X"], "1");
    assert_eq!(cfg.enabled, vec!["importer"]);
    assert_eq!(cfg.disabled, vec!["backup"]);
    assert_eq!(cfg.commands.len(), 2);
    assert_eq!(cfg.commands[1].start_time, "2h30m");
    assert_eq!(cfg.commands[0].params, vec!["--src", "!SRC"]);
}

#[test]
fn partial_file_parses_with_defaults() {
    let cfg: Config = serde_json::from_str(r#"{ "Enabled": ["x"] }"#).unwrap();
    assert!(cfg.variables.is_empty());
    assert!(cfg.commands.is_empty());
    assert_eq!(cfg.enabled, vec!["x"]);
}

#[test]
fn overlay_round_trip_changes_hash() {
    let mut base: Config = serde_json::from_str(BASE).unwrap();
    let base_hash = base.hash_signature();

    let overlay: Config = serde_json::from_str(
        r#"{
            "Variables": { "X": "2" },
            "Enabled": ["backup"],
            "Commands": [
                { "Name": "importer", "Pool": "db", "Interval": "30m",
                  "Timeout": "1h", "Command": "/usr/bin/importer",
                  "Params": [], "StartTime": "" }
            ]
        }"#,
    )
    .unwrap();

    base.overlay(overlay);

    assert_eq!(base.variables["X"], "2");
    assert_eq!(base.variables["SRC"], "/var/imports");
    assert_eq!(base.commands[0].interval, "30m");
    assert_eq!(base.effective_enabled().get("backup"), Some(&true));
    assert_ne!(base.hash_signature(), base_hash);
}

#[test]
fn unchanged_config_hashes_identically() {
    let a: Config = serde_json::from_str(BASE).unwrap();
    let b: Config = serde_json::from_str(BASE).unwrap();
    assert_eq!(a.hash_signature(), b.hash_signature());
}
