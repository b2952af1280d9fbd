//! Rashomon Storage Layer
//!
//! Implements the `OracleStore` trait using SQLite.
//!
//! # Architecture
//!
//! - Four append-structured tables: claims, edges (+ supporter rows),
//!   trust_entries, revision_log
//! - Sources and supersession links referenced by those tables
//! - Edges are soft-deleted (active flag); the log is append-only
//! - Belief labels are derived state and are not persisted here
//!
//! # Examples
//!
//! ```no_run
//! use rashomon_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for claim operations
//! ```

#![warn(missing_docs)]

use rashomon_domain::traits::{OracleStore, TrustSubject};
use rashomon_domain::{
    BeliefLabel, Claim, ClaimId, EdgeId, JustificationEdge, Polarity, Pov, PovId,
    ProvenanceKind, RevisionLogEntry, RevisionTrigger, Source, SourceId, Supersession, TrustMap,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-based implementation of `OracleStore`
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance; the engine owns exactly one.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rashomon_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("rashomon.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Convert ClaimId to bytes for storage
    fn claim_id_to_bytes(id: ClaimId) -> Vec<u8> {
        id.as_bytes().to_vec()
    }

    /// Convert bytes to ClaimId
    fn bytes_to_claim_id(bytes: &[u8]) -> Result<ClaimId, StoreError> {
        if bytes.len() != 32 {
            return Err(StoreError::InvalidData(format!(
                "Expected 32 bytes for ClaimId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(ClaimId::from_bytes(arr))
    }

    /// Convert a u128-backed id (edge, POV) to bytes for storage
    fn u128_to_bytes(value: u128) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    /// Convert bytes back to a u128-backed id
    fn bytes_to_u128(bytes: &[u8]) -> Result<u128, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for id, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(u128::from_be_bytes(arr))
    }

    fn row_to_claim(
        id: Vec<u8>,
        content: String,
        kind: String,
        source: String,
        created_at: u64,
    ) -> Result<Claim, StoreError> {
        Ok(Claim {
            id: Self::bytes_to_claim_id(&id)?,
            content,
            kind: ProvenanceKind::from_str_tag(&kind).map_err(StoreError::InvalidData)?,
            source: SourceId::new(source),
            created_at,
        })
    }

    fn load_supporters(&self, edge: EdgeId) -> Result<BTreeSet<ClaimId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT claim_id FROM edge_supporters WHERE edge_id = ?1")?;
        let rows = stmt.query_map(params![Self::u128_to_bytes(edge.value())], |row| {
            row.get::<_, Vec<u8>>(0)
        })?;
        let mut supporters = BTreeSet::new();
        for row in rows {
            supporters.insert(Self::bytes_to_claim_id(&row?)?);
        }
        Ok(supporters)
    }

    fn load_trust_map(&self, pov: PovId, default_weight: f64) -> Result<TrustMap, StoreError> {
        let mut map = TrustMap::new(default_weight);
        let mut stmt = self
            .conn
            .prepare("SELECT subject, weight FROM trust_entries WHERE pov_id = ?1")?;
        let rows = stmt.query_map(params![Self::u128_to_bytes(pov.value())], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        for row in rows {
            let (subject, weight) = row?;
            if let Some(source) = subject.strip_prefix("source:") {
                map.weights.insert(SourceId::new(source), weight);
            } else if let Some(class) = subject.strip_prefix("class:") {
                map.class_weights.insert(class.to_string(), weight);
            } else {
                return Err(StoreError::InvalidData(format!(
                    "Unknown trust subject: {}",
                    subject
                )));
            }
        }
        Ok(map)
    }
}

impl OracleStore for SqliteStore {
    type Error = StoreError;

    fn put_source(&mut self, source: &Source) -> Result<bool, Self::Error> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO sources (id, name, class, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                source.id.as_str(),
                source.name,
                source.class,
                source.created_at
            ],
        )?;
        Ok(changed > 0)
    }

    fn get_source(&self, id: &SourceId) -> Result<Option<Source>, Self::Error> {
        self.conn
            .query_row(
                "SELECT id, name, class, created_at FROM sources WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok(Source {
                        id: SourceId::new(row.get::<_, String>(0)?),
                        name: row.get(1)?,
                        class: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn list_sources(&self) -> Result<Vec<Source>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, class, created_at FROM sources ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Source {
                id: SourceId::new(row.get::<_, String>(0)?),
                name: row.get(1)?,
                class: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn put_claim(&mut self, claim: &Claim) -> Result<bool, Self::Error> {
        // Content addressing makes this idempotent: an existing row is the
        // same claim, so INSERT OR IGNORE performs no mutation.
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO claims (id, content, kind, source_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Self::claim_id_to_bytes(claim.id),
                claim.content,
                claim.kind.as_str(),
                claim.source.as_str(),
                claim.created_at
            ],
        )?;
        Ok(changed > 0)
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT id, content, kind, source_id, created_at FROM claims WHERE id = ?1",
                params![Self::claim_id_to_bytes(id)],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, u64>(4)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, content, kind, source, created_at)| {
            Self::row_to_claim(id, content, kind, source, created_at)
        })
        .transpose()
    }

    fn list_claims(&self) -> Result<Vec<Claim>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, kind, source_id, created_at FROM claims ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u64>(4)?,
            ))
        })?;
        let mut claims = Vec::new();
        for row in rows {
            let (id, content, kind, source, created_at) = row?;
            claims.push(Self::row_to_claim(id, content, kind, source, created_at)?);
        }
        Ok(claims)
    }

    fn put_supersession(&mut self, link: &Supersession) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT OR IGNORE INTO supersessions (old_id, new_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                Self::claim_id_to_bytes(link.old),
                Self::claim_id_to_bytes(link.new),
                link.created_at
            ],
        )?;
        Ok(())
    }

    fn list_supersessions(&self) -> Result<Vec<Supersession>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT old_id, new_id, created_at FROM supersessions ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;
        let mut links = Vec::new();
        for row in rows {
            let (old, new, created_at) = row?;
            links.push(Supersession {
                old: Self::bytes_to_claim_id(&old)?,
                new: Self::bytes_to_claim_id(&new)?,
                created_at,
            });
        }
        Ok(links)
    }

    fn put_edge(&mut self, edge: &JustificationEdge) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO edges (id, target, polarity, strength, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Self::u128_to_bytes(edge.id.value()),
                Self::claim_id_to_bytes(edge.target),
                edge.polarity.as_str(),
                edge.strength,
                edge.active,
                edge.created_at
            ],
        )?;
        for supporter in &edge.supporters {
            self.conn.execute(
                "INSERT OR IGNORE INTO edge_supporters (edge_id, claim_id) VALUES (?1, ?2)",
                params![
                    Self::u128_to_bytes(edge.id.value()),
                    Self::claim_id_to_bytes(*supporter)
                ],
            )?;
        }
        Ok(())
    }

    fn deactivate_edge(&mut self, id: EdgeId) -> Result<bool, Self::Error> {
        let changed = self.conn.execute(
            "UPDATE edges SET active = 0 WHERE id = ?1",
            params![Self::u128_to_bytes(id.value())],
        )?;
        Ok(changed > 0)
    }

    fn get_edge(&self, id: EdgeId) -> Result<Option<JustificationEdge>, Self::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT id, target, polarity, strength, active, created_at
                 FROM edges WHERE id = ?1",
                params![Self::u128_to_bytes(id.value())],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, u64>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((id_bytes, target, polarity, strength, active, created_at)) = row else {
            return Ok(None);
        };
        let edge_id = EdgeId::from_value(Self::bytes_to_u128(&id_bytes)?);
        Ok(Some(JustificationEdge {
            id: edge_id,
            supporters: self.load_supporters(edge_id)?,
            target: Self::bytes_to_claim_id(&target)?,
            polarity: Polarity::from_str_tag(&polarity).map_err(StoreError::InvalidData)?,
            strength,
            active,
            created_at,
        }))
    }

    fn list_edges(&self) -> Result<Vec<JustificationEdge>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, target, polarity, strength, active, created_at
             FROM edges ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, u64>(5)?,
            ))
        })?;
        let raw: Vec<_> = rows.collect::<Result<Vec<_>, _>>()?;
        let mut edges = Vec::new();
        for (id_bytes, target, polarity, strength, active, created_at) in raw {
            let edge_id = EdgeId::from_value(Self::bytes_to_u128(&id_bytes)?);
            edges.push(JustificationEdge {
                id: edge_id,
                supporters: self.load_supporters(edge_id)?,
                target: Self::bytes_to_claim_id(&target)?,
                polarity: Polarity::from_str_tag(&polarity).map_err(StoreError::InvalidData)?,
                strength,
                active,
                created_at,
            });
        }
        Ok(edges)
    }

    fn put_pov(&mut self, pov: &Pov) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO povs (id, name, default_weight, edge_blend, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Self::u128_to_bytes(pov.id.value()),
                pov.name,
                pov.trust.default_weight,
                pov.edge_blend,
                pov.created_at,
                pov.updated_at
            ],
        )?;
        for (source, weight) in &pov.trust.weights {
            self.put_trust_entry(
                pov.id,
                &TrustSubject::Source(source.clone()),
                *weight,
                pov.updated_at,
            )?;
        }
        for (class, weight) in &pov.trust.class_weights {
            self.put_trust_entry(
                pov.id,
                &TrustSubject::Class(class.clone()),
                *weight,
                pov.updated_at,
            )?;
        }
        Ok(())
    }

    fn put_trust_entry(
        &mut self,
        pov: PovId,
        subject: &TrustSubject,
        weight: f64,
        updated_at: u64,
    ) -> Result<(), Self::Error> {
        match subject {
            TrustSubject::Default => {
                self.conn.execute(
                    "UPDATE povs SET default_weight = ?2, updated_at = ?3 WHERE id = ?1",
                    params![Self::u128_to_bytes(pov.value()), weight, updated_at],
                )?;
            }
            _ => {
                self.conn.execute(
                    "INSERT OR REPLACE INTO trust_entries (pov_id, subject, weight, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        Self::u128_to_bytes(pov.value()),
                        subject.as_storage_string(),
                        weight,
                        updated_at
                    ],
                )?;
                self.conn.execute(
                    "UPDATE povs SET updated_at = ?2 WHERE id = ?1",
                    params![Self::u128_to_bytes(pov.value()), updated_at],
                )?;
            }
        }
        Ok(())
    }

    fn list_povs(&self) -> Result<Vec<Pov>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, default_weight, edge_blend, created_at, updated_at
             FROM povs ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, u64>(5)?,
            ))
        })?;
        let raw: Vec<_> = rows.collect::<Result<Vec<_>, _>>()?;
        let mut povs = Vec::new();
        for (id_bytes, name, default_weight, edge_blend, created_at, updated_at) in raw {
            let id = PovId::from_value(Self::bytes_to_u128(&id_bytes)?);
            povs.push(Pov {
                id,
                name,
                trust: self.load_trust_map(id, default_weight)?,
                edge_blend,
                created_at,
                updated_at,
            });
        }
        Ok(povs)
    }

    fn append_log(&mut self, entry: &RevisionLogEntry) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO revision_log (seq, ts, pov_id, claim_id, old_label, new_label, trigger, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.seq,
                entry.timestamp,
                Self::u128_to_bytes(entry.pov.value()),
                Self::claim_id_to_bytes(entry.claim),
                entry.old_label.as_str(),
                entry.new_label.as_str(),
                entry.trigger.as_storage_string(),
                entry.reason
            ],
        )?;
        Ok(())
    }

    fn history(
        &self,
        claim: ClaimId,
        pov: Option<PovId>,
    ) -> Result<Vec<RevisionLogEntry>, Self::Error> {
        let sql = match pov {
            Some(_) => {
                "SELECT seq, ts, pov_id, claim_id, old_label, new_label, trigger, reason
                 FROM revision_log WHERE claim_id = ?1 AND pov_id = ?2 ORDER BY seq ASC"
            }
            None => {
                "SELECT seq, ts, pov_id, claim_id, old_label, new_label, trigger, reason
                 FROM revision_log WHERE claim_id = ?1 ORDER BY seq ASC"
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        };
        let raw: Vec<_> = match pov {
            Some(pov) => stmt
                .query_map(
                    params![
                        Self::claim_id_to_bytes(claim),
                        Self::u128_to_bytes(pov.value())
                    ],
                    map_row,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![Self::claim_id_to_bytes(claim)], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        let mut entries = Vec::new();
        for (seq, ts, pov_bytes, claim_bytes, old, new, trigger, reason) in raw {
            entries.push(RevisionLogEntry {
                seq,
                timestamp: ts,
                pov: PovId::from_value(Self::bytes_to_u128(&pov_bytes)?),
                claim: Self::bytes_to_claim_id(&claim_bytes)?,
                old_label: BeliefLabel::from_str_tag(&old).map_err(StoreError::InvalidData)?,
                new_label: BeliefLabel::from_str_tag(&new).map_err(StoreError::InvalidData)?,
                trigger: RevisionTrigger::from_storage_string(&trigger)
                    .map_err(StoreError::InvalidData)?,
                reason,
            });
        }
        Ok(entries)
    }

    fn last_seq(&self) -> Result<u64, Self::Error> {
        let seq: Option<u64> = self
            .conn
            .query_row("SELECT MAX(seq) FROM revision_log", [], |row| row.get(0))?;
        Ok(seq.unwrap_or(0))
    }
}
