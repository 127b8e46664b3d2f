//! [`SqliteStore`] — the SQLite implementation of [`MappingStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use hoplink_core::{
  Mapping, Param, Refreshed, Triple,
  param,
  policy::{CollisionPolicy, Exhaustion},
  salt::{OsSalt, SaltSource},
  store::MappingStore,
};

use crate::{
  Error, Result,
  encode::{MAPPING_COLUMNS, RawMapping, encode_dt},
  schema::SCHEMA,
};

/// How long a writer waits on another process's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_HEAD: &str = "SELECT our_param, version FROM mappings
   WHERE keyword = ?1 AND src = ?2 AND creative = ?3
   ORDER BY version DESC
   LIMIT 1";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A mapping store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and salt source are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  policy:          CollisionPolicy,
  salts:           Arc<dyn SaltSource>,
}

/// What a refresh transaction ended with.
enum RefreshOutcome {
  Inserted(Refreshed),
  Exhausted { attempts: u32 },
  /// The insert itself hit the uniqueness constraint.
  Collided(Param),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      policy: CollisionPolicy::default(),
      salts: Arc::new(OsSalt),
    })
  }

  /// Replace the refresh collision policy.
  pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Replace the source of refresh salts.
  pub fn with_salt_source(mut self, salts: impl SaltSource + 'static) -> Self {
    self.salts = Arc::new(salts);
    self
  }

  pub fn policy(&self) -> CollisionPolicy { self.policy }

  /// Close the underlying connection. Other clones of this store fail with
  /// a database error afterwards.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}

/// Timestamp for a new row: the wall clock, but never earlier than the
/// newest stored `created_at`, so text order follows insertion order even if
/// the clock steps back. Must run inside the write transaction.
fn next_created_at(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<String> {
  let now = encode_dt(Utc::now());
  let newest: Option<String> =
    tx.query_row("SELECT MAX(created_at) FROM mappings", [], |row| row.get(0))?;
  Ok(match newest {
    Some(newest) if newest > now => newest,
    _ => now,
  })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── MappingStore impl ───────────────────────────────────────────────────────

impl MappingStore for SqliteStore {
  type Error = Error;

  async fn get_or_create(&self, triple: Triple) -> Result<Param> {
    let candidate = param::generate(&triple, "");
    let insert_param = candidate.clone().into_inner();

    let (head, inserted): (Option<String>, bool) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created_at = next_created_at(&tx)?;

        // Insert-if-absent keyed on the triple. A racing writer that got
        // there first either owns the triple (NOT EXISTS) or the param
        // (ON CONFLICT); both leave the existing row in place.
        let inserted = tx.execute(
          "INSERT INTO mappings
             (keyword, src, creative, our_param, version, previous_param, created_at)
           SELECT ?1, ?2, ?3, ?4, 1, NULL, ?5
           WHERE NOT EXISTS (
             SELECT 1 FROM mappings
             WHERE keyword = ?1 AND src = ?2 AND creative = ?3
           )
           ON CONFLICT (our_param) DO NOTHING",
          rusqlite::params![
            triple.keyword,
            triple.source,
            triple.creative,
            insert_param,
            created_at,
          ],
        )?;

        let head: Option<String> = tx
          .query_row(
            SELECT_HEAD,
            rusqlite::params![triple.keyword, triple.source, triple.creative],
            |row| row.get(0),
          )
          .optional()?;

        tx.commit()?;
        Ok((head, inserted > 0))
      })
      .await?;

    match head {
      Some(p) => {
        if inserted {
          tracing::debug!(param = %p, "created mapping");
        }
        Ok(Param::new(p))
      }
      // The version-1 param belongs to a different triple.
      None => Err(hoplink_core::Error::ParamCollision(candidate).into()),
    }
  }

  async fn refresh(&self, triple: Triple) -> Result<Refreshed> {
    let policy = self.policy;
    let salts  = Arc::clone(&self.salts);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let head: Option<(String, u32)> = tx
          .query_row(
            SELECT_HEAD,
            rusqlite::params![triple.keyword, triple.source, triple.creative],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let (version, previous_param) = match head {
          Some((p, v)) => (v + 1, Some(p)),
          None => (1, None),
        };

        let attempts = policy.attempts();
        let mut attempt = 0;
        let new_param = loop {
          attempt += 1;
          let candidate = param::generate(&triple, &salts.draw());
          let taken = tx
            .query_row(
              "SELECT 1 FROM mappings WHERE our_param = ?1",
              rusqlite::params![candidate.as_str()],
              |_| Ok(()),
            )
            .optional()?
            .is_some();

          if !taken {
            break candidate;
          }
          tracing::debug!(attempt, param = %candidate, "refresh candidate collided");

          if attempt >= attempts {
            match policy.on_exhaustion {
              Exhaustion::Fail => {
                return Ok(RefreshOutcome::Exhausted { attempts });
              }
              Exhaustion::Proceed => {
                tracing::warn!(
                  attempts,
                  param = %candidate,
                  "no unique refresh param found; inserting last candidate",
                );
                break candidate;
              }
            }
          }
        };

        let created_at = next_created_at(&tx)?;
        let inserted = tx.execute(
          "INSERT INTO mappings
             (keyword, src, creative, our_param, version, previous_param, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            triple.keyword,
            triple.source,
            triple.creative,
            new_param.as_str(),
            version,
            previous_param,
            created_at,
          ],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Ok(RefreshOutcome::Collided(new_param));
          }
          Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(RefreshOutcome::Inserted(Refreshed {
          new_param,
          version,
          previous_param: previous_param.map(Param::new),
        }))
      })
      .await?;

    match outcome {
      RefreshOutcome::Inserted(refreshed) => {
        tracing::debug!(
          param = %refreshed.new_param,
          version = refreshed.version,
          "refreshed mapping",
        );
        Ok(refreshed)
      }
      RefreshOutcome::Exhausted { attempts } => {
        Err(hoplink_core::Error::CollisionExhausted { attempts }.into())
      }
      RefreshOutcome::Collided(p) => {
        Err(hoplink_core::Error::ParamCollision(p).into())
      }
    }
  }

  async fn get_by_param(&self, param: Param) -> Result<Option<Triple>> {
    let param_str = param.into_inner();

    let triple = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT keyword, src, creative FROM mappings WHERE our_param = ?1",
              rusqlite::params![param_str],
              |row| {
                Ok(Triple {
                  keyword:  row.get(0)?,
                  source:   row.get(1)?,
                  creative: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(triple)
  }

  async fn get_most_recent(&self) -> Result<Option<Mapping>> {
    let raw: Option<RawMapping> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MAPPING_COLUMNS} FROM mappings
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1"
              ),
              [],
              RawMapping::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMapping::into_mapping).transpose()
  }

  async fn history(&self, triple: Triple) -> Result<Vec<Mapping>> {
    let raws: Vec<RawMapping> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MAPPING_COLUMNS} FROM mappings
           WHERE keyword = ?1 AND src = ?2 AND creative = ?3
           ORDER BY version ASC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![triple.keyword, triple.source, triple.creative],
            RawMapping::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMapping::into_mapping).collect()
  }
}
