// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

#[test]
fn test_missing_file_has_no_token() {
    let temp = TempDir::new().unwrap();
    let store = FileCredentialStore::new(temp.path().join("credentials.json"));
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
}

#[test]
fn test_set_get_remove() {
    let temp = TempDir::new().unwrap();
    let store = FileCredentialStore::new(temp.path().join("nested/credentials.json"));

    store.set(AUTH_TOKEN_KEY, "abc123").unwrap();
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("abc123"));

    assert!(store.remove(AUTH_TOKEN_KEY).unwrap());
    assert!(!store.remove(AUTH_TOKEN_KEY).unwrap());
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
}

#[test]
fn test_set_keeps_other_keys() {
    let temp = TempDir::new().unwrap();
    let store = FileCredentialStore::new(temp.path().join("credentials.json"));

    store.set("refresh", "r1").unwrap();
    store.set(AUTH_TOKEN_KEY, "t1").unwrap();
    store.set(AUTH_TOKEN_KEY, "t2").unwrap();

    assert_eq!(store.get("refresh").unwrap().as_deref(), Some("r1"));
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("t2"));
}

#[test]
fn test_corrupt_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("credentials.json");
    std::fs::write(&path, "not json").unwrap();

    let err = FileCredentialStore::new(&path).get(AUTH_TOKEN_KEY).unwrap_err();
    assert!(matches!(err, Error::Credential(_)));
}

#[cfg(unix)]
#[test]
fn test_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let store = FileCredentialStore::new(temp.path().join("credentials.json"));
    store.set(AUTH_TOKEN_KEY, "secret").unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_memory_store() {
    let store = MemoryCredentialStore::with_token("tok");
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("tok"));
    store.remove(AUTH_TOKEN_KEY);
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
}
