use super::*;

fn store_in(dir: &tempfile::TempDir) -> CounterStore {
    CounterStore::new(dir.path().join("state.json"))
}

async fn write_raw(store: &CounterStore, contents: &str) {
    tokio::fs::write(store.path(), contents).await.expect("write");
}

#[tokio::test]
async fn load_defaults_to_one_without_stored_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(store_in(&dir).load().await, 1);
}

#[tokio::test]
async fn saved_value_survives_a_new_instance() {
    let dir = tempfile::tempdir().expect("tempdir");
    store_in(&dir).save(4).await;
    assert_eq!(store_in(&dir).load().await, 4);
}

#[tokio::test]
async fn reset_yields_one_regardless_of_prior_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    store.save(9).await;
    assert_eq!(store.reset().await, 1);
    assert_eq!(store_in(&dir).load().await, 1);
}

#[tokio::test]
async fn corrupt_or_non_positive_values_fall_back_to_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    write_raw(&store, "not json").await;
    assert_eq!(store.load().await, 1);

    write_raw(&store, r#"{"nextRefinementIndex": 0}"#).await;
    assert_eq!(store.load().await, 1);

    write_raw(&store, r#"{"nextRefinementIndex": -3}"#).await;
    assert_eq!(store.load().await, 1);

    write_raw(&store, r#"{"nextRefinementIndex": "abc"}"#).await;
    assert_eq!(store.load().await, 1);
}

#[tokio::test]
async fn numeric_strings_are_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    write_raw(&store, r#"{"nextRefinementIndex": "7"}"#).await;
    assert_eq!(store.load().await, 7);
}

#[tokio::test]
async fn save_preserves_unrelated_keys_and_creates_parent_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CounterStore::new(dir.path().join("nested").join("state.json"));
    store.save(2).await;
    let raw = tokio::fs::read_to_string(store.path()).await.expect("read");
    let mut state: Map<String, Value> = serde_json::from_str(&raw).expect("json");
    state.insert("theme".to_string(), Value::from("dark"));
    write_raw(&store, &serde_json::to_string(&state).expect("encode")).await;

    store.save(3).await;

    let raw = tokio::fs::read_to_string(store.path()).await.expect("read");
    let state: Map<String, Value> = serde_json::from_str(&raw).expect("json");
    assert_eq!(state.get("theme"), Some(&Value::from("dark")));
    assert_eq!(state.get(COUNTER_KEY), Some(&Value::from(3)));
}

#[tokio::test]
async fn unwritable_location_is_swallowed() {
    let dir = tempfile::tempdir().expect("tempdir");
    // A directory where the state file should be makes every write fail.
    let blocked = dir.path().join("state.json");
    tokio::fs::create_dir_all(&blocked).await.expect("mkdir");
    let store = CounterStore::new(&blocked);

    store.save(5).await;
    assert_eq!(store.load().await, 1);
}
