//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  collections::HashSet,
  sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
  },
};

use hoplink_core::{
  Param, Triple,
  param::{self, PARAM_LEN},
  policy::{CollisionPolicy, Exhaustion},
  salt::SaltSource,
  store::MappingStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn shoes() -> Triple { Triple::new("shoes", "google", "ad1") }

/// Hands out the given salts in order, repeating the last one forever.
struct ScriptedSalt {
  salts: Mutex<Vec<String>>,
}

impl ScriptedSalt {
  fn new(salts: &[&str]) -> Self {
    let mut salts: Vec<String> = salts.iter().map(|s| s.to_string()).collect();
    salts.reverse();
    Self { salts: Mutex::new(salts) }
  }
}

impl SaltSource for ScriptedSalt {
  fn draw(&self) -> String {
    let mut salts = self.salts.lock().unwrap();
    if salts.len() > 1 {
      salts.pop().unwrap()
    } else {
      salts[0].clone()
    }
  }
}

/// Distinct salts from a counter.
#[derive(Default)]
struct CountingSalt(AtomicU64);

impl SaltSource for CountingSalt {
  fn draw(&self) -> String {
    self.0.fetch_add(1, Ordering::SeqCst).to_string()
  }
}

// ─── get_or_create ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_is_idempotent() {
  let s = store().await;

  let first  = s.get_or_create(shoes()).await.unwrap();
  let second = s.get_or_create(shoes()).await.unwrap();
  assert_eq!(first, second);
  assert_eq!(first.as_str().len(), PARAM_LEN);

  let history = s.history(shoes()).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].version, 1);
  assert_eq!(history[0].previous_param, None);
  assert_eq!(history[0].param, first);
}

#[tokio::test]
async fn get_or_create_uses_unsalted_param() {
  let s = store().await;
  let p = s.get_or_create(shoes()).await.unwrap();
  assert_eq!(p, param::generate(&shoes(), ""));
}

#[tokio::test]
async fn get_or_create_returns_latest_version_after_refresh() {
  let s = store().await;
  let v1 = s.get_or_create(shoes()).await.unwrap();
  let refreshed = s.refresh(shoes()).await.unwrap();
  assert_ne!(refreshed.new_param, v1);

  let again = s.get_or_create(shoes()).await.unwrap();
  assert_eq!(again, refreshed.new_param);
  assert_eq!(s.history(shoes()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn triples_are_case_sensitive() {
  let s = store().await;
  let lower = s.get_or_create(shoes()).await.unwrap();
  let upper = s
    .get_or_create(Triple::new("Shoes", "google", "ad1"))
    .await
    .unwrap();
  assert_ne!(lower, upper);
}

#[tokio::test]
async fn concurrent_get_or_create_inserts_once() {
  let s = store().await;

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { s.get_or_create(shoes()).await.unwrap() })
    })
    .collect();

  let mut params = HashSet::new();
  for h in handles {
    params.insert(h.await.unwrap());
  }
  assert_eq!(params.len(), 1);
  assert_eq!(s.history(shoes()).await.unwrap().len(), 1);
}

// ─── refresh ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_without_prior_record_starts_at_version_one() {
  let s = store().await;

  let first = s.refresh(shoes()).await.unwrap();
  assert_eq!(first.version, 1);
  assert_eq!(first.previous_param, None);

  let second = s.refresh(shoes()).await.unwrap();
  assert_eq!(second.version, 2);
  assert_eq!(second.previous_param, Some(first.new_param.clone()));
  assert_ne!(second.new_param, first.new_param);
}

#[tokio::test]
async fn refresh_chain_is_contiguous() {
  let s = store().await;
  let v1 = s.get_or_create(shoes()).await.unwrap();
  for _ in 0..4 {
    s.refresh(shoes()).await.unwrap();
  }

  let history = s.history(shoes()).await.unwrap();
  let versions: Vec<u32> = history.iter().map(|m| m.version).collect();
  assert_eq!(versions, vec![1, 2, 3, 4, 5]);

  assert_eq!(history[0].param, v1);
  for pair in history.windows(2) {
    assert_eq!(pair[1].previous_param.as_ref(), Some(&pair[0].param));
  }
}

#[tokio::test]
async fn refresh_does_not_touch_other_triples() {
  let s = store().await;
  let other = Triple::new("boots", "google", "ad1");
  let other_param = s.get_or_create(other.clone()).await.unwrap();

  s.refresh(shoes()).await.unwrap();

  let history = s.history(other.clone()).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(s.get_or_create(other).await.unwrap(), other_param);
}

#[tokio::test]
async fn refresh_retries_past_a_colliding_salt() {
  let s = store()
    .await
    .with_salt_source(ScriptedSalt::new(&["first", "first", "second"]));

  let v1 = s.refresh(shoes()).await.unwrap();
  assert_eq!(v1.new_param, param::generate(&shoes(), "first"));

  let v2 = s.refresh(shoes()).await.unwrap();
  assert_eq!(v2.new_param, param::generate(&shoes(), "second"));
  assert_eq!(v2.version, 2);
  assert_eq!(v2.previous_param, Some(v1.new_param));
}

#[tokio::test]
async fn refresh_avoids_the_unsalted_version_one_param() {
  // An empty salt reproduces the get_or_create param exactly.
  let s = store()
    .await
    .with_salt_source(ScriptedSalt::new(&["", "fresh"]));

  let v1 = s.get_or_create(shoes()).await.unwrap();
  let v2 = s.refresh(shoes()).await.unwrap();
  assert_eq!(v2.new_param, param::generate(&shoes(), "fresh"));
  assert_eq!(v2.previous_param, Some(v1));
}

#[tokio::test]
async fn refresh_exhaustion_with_fail_policy_writes_nothing() {
  let s = store()
    .await
    .with_policy(CollisionPolicy { max_attempts: 3, on_exhaustion: Exhaustion::Fail })
    .with_salt_source(ScriptedSalt::new(&["stuck"]));

  s.refresh(shoes()).await.unwrap();
  let err = s.refresh(shoes()).await.unwrap_err();
  assert!(
    matches!(
      err,
      Error::Core(hoplink_core::Error::CollisionExhausted { attempts: 3 })
    ),
    "unexpected error: {err}"
  );
  assert_eq!(s.history(shoes()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_exhaustion_with_proceed_policy_keeps_params_unique() {
  let s = store()
    .await
    .with_salt_source(ScriptedSalt::new(&["stuck"]));
  assert_eq!(s.policy().on_exhaustion, Exhaustion::Proceed);

  let v1 = s.refresh(shoes()).await.unwrap();
  let err = s.refresh(shoes()).await.unwrap_err();
  assert!(
    matches!(&err, Error::Core(hoplink_core::Error::ParamCollision(p)) if *p == v1.new_param),
    "unexpected error: {err}"
  );

  let history = s.history(shoes()).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].param, v1.new_param);
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_by_param_round_trips_every_version() {
  let s = store().await;
  let v1 = s.get_or_create(shoes()).await.unwrap();
  let v2 = s.refresh(shoes()).await.unwrap().new_param;

  assert_eq!(s.get_by_param(v1).await.unwrap(), Some(shoes()));
  assert_eq!(s.get_by_param(v2).await.unwrap(), Some(shoes()));
}

#[tokio::test]
async fn get_by_param_unknown_is_none() {
  let s = store().await;
  s.get_or_create(shoes()).await.unwrap();
  let missing = s.get_by_param(Param::new("0000000000000000")).await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn get_most_recent_empty_is_none() {
  let s = store().await;
  assert!(s.get_most_recent().await.unwrap().is_none());
}

#[tokio::test]
async fn get_most_recent_returns_last_insert() {
  let s = store().await;
  s.get_or_create(shoes()).await.unwrap();
  let boots = Triple::new("boots", "bing", "ad2");
  let boots_param = s.get_or_create(boots.clone()).await.unwrap();

  let recent = s.get_most_recent().await.unwrap().unwrap();
  assert_eq!(recent.triple, boots);
  assert_eq!(recent.param, boots_param);

  let refreshed = s.refresh(shoes()).await.unwrap();
  let recent = s.get_most_recent().await.unwrap().unwrap();
  assert_eq!(recent.triple, shoes());
  assert_eq!(recent.param, refreshed.new_param);
  assert_eq!(recent.version, 2);
}

/// Write a version-1 row directly, bypassing the store's timestamping.
async fn insert_raw(
  s:          &SqliteStore,
  keyword:    &'static str,
  param:      &'static str,
  created_at: &'static str,
) {
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO mappings (keyword, src, creative, our_param, created_at)
         VALUES (?1, 'src', 'cr', ?2, ?3)",
        rusqlite::params![keyword, param, created_at],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn get_most_recent_breaks_timestamp_ties_by_insertion_order() {
  let s = store().await;
  insert_raw(&s, "first", "tiedparam0000001", "2024-01-01T00:00:00.000000Z").await;
  insert_raw(&s, "second", "tiedparam0000002", "2024-01-01T00:00:00.000000Z").await;

  let recent = s.get_most_recent().await.unwrap().unwrap();
  assert_eq!(recent.param.as_str(), "tiedparam0000002");
  assert_eq!(recent.triple.keyword, "second");
}

#[tokio::test]
async fn created_at_never_goes_backwards() {
  let s = store().await;
  // A row stamped in the future, as after the clock stepped back.
  insert_raw(&s, "future", "futureparam00000", "2999-01-01T00:00:00.000000Z").await;

  let created = s.get_or_create(shoes()).await.unwrap();
  let recent = s.get_most_recent().await.unwrap().unwrap();
  assert_eq!(recent.param, created);

  let refreshed = s.refresh(shoes()).await.unwrap();
  let recent = s.get_most_recent().await.unwrap().unwrap();
  assert_eq!(recent.param, refreshed.new_param);

  let history = s.history(shoes()).await.unwrap();
  assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
  assert!(history.iter().all(|m| m.created_at.format("%Y").to_string() == "2999"));
}

#[tokio::test]
async fn history_unknown_triple_is_empty() {
  let s = store().await;
  assert!(s.history(shoes()).await.unwrap().is_empty());
}

// ─── Invariants ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn params_stay_unique_across_mixed_operations() {
  let s = store().await.with_salt_source(CountingSalt::default());
  let triples: Vec<Triple> = (0..5)
    .map(|i| Triple::new(format!("kw{i}"), "src", "creative"))
    .collect();

  let mut seen = HashSet::new();
  for t in &triples {
    seen.insert(s.get_or_create(t.clone()).await.unwrap());
    for _ in 0..3 {
      assert!(seen.insert(s.refresh(t.clone()).await.unwrap().new_param));
    }
  }
  assert_eq!(seen.len(), triples.len() * 4);

  for t in &triples {
    let history = s.history(t.clone()).await.unwrap();
    let ids: Vec<i64> = history.iter().map(|m| m.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
  }
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn mappings_survive_reopen() {
  let dir = std::env::temp_dir().join(format!(
    "hoplink-store-{}-{}",
    std::process::id(),
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
  ));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("mappings.sqlite");

  let s = SqliteStore::open(&path).await.unwrap();
  let v1 = s.get_or_create(shoes()).await.unwrap();
  let v2 = s.refresh(shoes()).await.unwrap();
  s.close().await.unwrap();

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.get_or_create(shoes()).await.unwrap(), v2.new_param);
  assert_eq!(s.get_by_param(v1).await.unwrap(), Some(shoes()));
  s.close().await.unwrap();

  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn reads_rows_written_with_sqlite_default_timestamp() {
  let s = store().await;
  s.conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO mappings (keyword, src, creative, our_param)
         VALUES ('legacy', 'src', 'cr', 'legacyparam00000')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let recent = s.get_most_recent().await.unwrap().unwrap();
  assert_eq!(recent.param.as_str(), "legacyparam00000");
  assert_eq!(recent.version, 1);

  let v1 = s
    .get_or_create(Triple::new("legacy", "src", "cr"))
    .await
    .unwrap();
  assert_eq!(v1.as_str(), "legacyparam00000");
}
