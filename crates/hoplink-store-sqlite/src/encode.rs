//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are written as fixed-width RFC 3339 UTC strings with
//! microseconds, so text order matches time order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use hoplink_core::{Mapping, Param, Triple};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Format written by SQLite's `CURRENT_TIMESTAMP`, found in older rows.
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, SQLITE_TIMESTAMP)
    .map(|naive| naive.and_utc())
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Mapping rows ────────────────────────────────────────────────────────────

/// Column list matching [`RawMapping::from_row`].
pub const MAPPING_COLUMNS: &str =
  "id, keyword, src, creative, our_param, version, previous_param, created_at";

/// A `mappings` row as read from SQLite, before timestamp decoding.
pub struct RawMapping {
  pub id:             i64,
  pub keyword:        String,
  pub src:            String,
  pub creative:       String,
  pub our_param:      String,
  pub version:        u32,
  pub previous_param: Option<String>,
  pub created_at:     String,
}

impl RawMapping {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      keyword:        row.get(1)?,
      src:            row.get(2)?,
      creative:       row.get(3)?,
      our_param:      row.get(4)?,
      version:        row.get(5)?,
      previous_param: row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_mapping(self) -> Result<Mapping> {
    Ok(Mapping {
      id:             self.id,
      triple:         Triple::new(self.keyword, self.src, self.creative),
      param:          Param::new(self.our_param),
      version:        self.version,
      previous_param: self.previous_param.map(Param::new),
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}
