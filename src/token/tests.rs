use super::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

// =========================================================
// In-memory storage mock
// =========================================================

#[derive(Clone, Default)]
struct MemoryStorage {
    cells: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    fn new() -> Self {
        Self::default()
    }

    fn seed(&self, key: &str, value: &str) {
        self.cells
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn contains(&self, key: &str) -> bool {
        self.cells.borrow().contains_key(key)
    }

    /// Simulates the browser session ending: session storage is wiped.
    fn wipe(&self) {
        self.cells.borrow_mut().clear();
    }
}

impl StorageArea for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.cells.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> bool {
        self.cells
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.cells.borrow_mut().remove(key).is_some()
    }
}

fn tokens(access: &str) -> AuthTokens {
    AuthTokens {
        access: access.to_string(),
        refresh: Some(format!("{access}-refresh")),
        extra: serde_json::Map::new(),
    }
}

fn store() -> (TokenStore<MemoryStorage, MemoryStorage>, MemoryStorage, MemoryStorage) {
    let durable = MemoryStorage::new();
    let ephemeral = MemoryStorage::new();
    (
        TokenStore::new(durable.clone(), ephemeral.clone()),
        durable,
        ephemeral,
    )
}

// =========================================================
// Contract tests
// =========================================================

#[test]
fn durable_value_wins_over_stale_ephemeral_copy() {
    let (store, _durable, ephemeral) = store();

    // A stale session-scoped bundle is already lying around.
    ephemeral.seed(
        TOKEN_STORAGE_KEY,
        &serde_json::to_string(&tokens("stale")).unwrap(),
    );

    assert!(store.set(&tokens("fresh"), true));
    assert_eq!(store.get().unwrap().access, "fresh");
}

#[test]
fn durable_set_removes_the_ephemeral_copy() {
    let (store, durable, ephemeral) = store();
    ephemeral.seed(
        TOKEN_STORAGE_KEY,
        &serde_json::to_string(&tokens("stale")).unwrap(),
    );

    store.set(&tokens("fresh"), true);

    assert!(durable.contains(TOKEN_STORAGE_KEY));
    assert!(!ephemeral.contains(TOKEN_STORAGE_KEY));
}

#[test]
fn non_durable_set_touches_only_the_ephemeral_backend() {
    let (store, durable, ephemeral) = store();

    store.set(&tokens("active"), false);

    assert!(!durable.contains(TOKEN_STORAGE_KEY));
    assert!(ephemeral.contains(TOKEN_STORAGE_KEY));
    assert_eq!(store.get().unwrap().access, "active");
}

#[test]
fn clear_empties_both_backends() {
    let (store, durable, ephemeral) = store();
    durable.seed(
        TOKEN_STORAGE_KEY,
        &serde_json::to_string(&tokens("remembered")).unwrap(),
    );
    ephemeral.seed(
        TOKEN_STORAGE_KEY,
        &serde_json::to_string(&tokens("active")).unwrap(),
    );

    store.clear();

    assert!(store.get().is_none());
    assert!(!durable.contains(TOKEN_STORAGE_KEY));
    assert!(!ephemeral.contains(TOKEN_STORAGE_KEY));
}

#[test]
fn clear_is_idempotent() {
    let (store, _, _) = store();
    store.clear();
    store.clear();
    assert!(store.get().is_none());
}

#[test]
fn session_only_login_does_not_survive_a_browser_restart() {
    let (store, _durable, ephemeral) = store();

    // Login without "remember me".
    store.set(&tokens("active"), false);
    assert!(store.get().is_some());

    // Browser restart: the ephemeral backend is gone, the durable one kept.
    ephemeral.wipe();
    assert!(store.get().is_none());
}

#[test]
fn remembered_login_survives_a_browser_restart() {
    let (store, _durable, ephemeral) = store();

    store.set(&tokens("remembered"), true);
    ephemeral.wipe();

    assert_eq!(store.get().unwrap().access, "remembered");
}

#[test]
fn unreadable_durable_bundle_falls_back_to_the_ephemeral_one() {
    let (store, durable, ephemeral) = store();
    durable.seed(TOKEN_STORAGE_KEY, "{not valid json");
    ephemeral.seed(
        TOKEN_STORAGE_KEY,
        &serde_json::to_string(&tokens("active")).unwrap(),
    );

    assert_eq!(store.get().unwrap().access, "active");
}

#[test]
fn unreadable_bundles_everywhere_mean_no_session() {
    let (store, durable, ephemeral) = store();
    durable.seed(TOKEN_STORAGE_KEY, "garbage");
    ephemeral.seed(TOKEN_STORAGE_KEY, "<html>tunnel page</html>");

    assert!(store.get().is_none());
}

#[test]
fn opaque_fields_round_trip_untouched() {
    let (store, _, _) = store();

    let raw = r#"{"access":"a","refresh":"r","token_type":"Bearer","scope":"all"}"#;
    let bundle: AuthTokens = serde_json::from_str(raw).unwrap();
    store.set(&bundle, true);

    let read_back = store.get().unwrap();
    assert_eq!(read_back, bundle);
    assert_eq!(
        read_back.extra.get("token_type").and_then(|v| v.as_str()),
        Some("Bearer")
    );
}
