use std::io::Write;

use vault_ingest::config::load_config;
use vault_ingest::entry::EntryKind;
use vault_ingest::store::RetryPolicy;

#[test]
fn bundled_config_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/vault-ingest.toml");
    let config = load_config(&path).unwrap();
    assert_eq!(config.github.branch, "main");
    assert_eq!(config.vault.note_path(EntryKind::Liked), "Liked/tweets.md");
    assert_eq!(config.retry.max_attempts, 5);
}

#[test]
fn config_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[github]
owner = "me"
repo = "notes"
branch = "vault"

[vault]
wishlist_path = "Books/wishlist.md"

[retry]
max_attempts = 3
backoff_base_ms = 250
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.github.repo, "notes");
    assert_eq!(config.vault.note_path(EntryKind::Book), "Books/wishlist.md");
    assert_eq!(config.vault.assets_dir(EntryKind::Book), "assets");

    let policy = RetryPolicy::from(&config.retry);
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff(2), std::time::Duration::from_millis(1000));
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn zero_attempts_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[github]\nowner = \"me\"\nrepo = \"notes\"\n\n[retry]\nmax_attempts = 0\n"
    )
    .unwrap();
    assert!(load_config(file.path()).is_err());
}
