// crates/warden-registry/src/registry.rs
// ============================================================================
// Module: SQLite Registry
// Description: Durable tenant/tool registry backed by SQLite.
// Purpose: Persist registry rows and apply atomic kill-switch updates.
// Dependencies: rand, rusqlite, serde_json, warden-core
// ============================================================================

//! ## Overview
//! This module implements the registry over `SQLite` with two flat tables
//! queried explicitly. The kill-switch flips `is_active` for a tool set in a
//! single `UPDATE ... RETURNING` statement inside a transaction, so
//! concurrent togglers cannot lose updates and readers never see a partial
//! flip. Database contents are untrusted; decode failures fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use thiserror::Error;

use warden_core::TenantSlug;
use warden_core::ToolId;
use warden_core::ToolName;
use warden_core::time::unix_millis_now;

use crate::model::NewTool;
use crate::model::Tenant;
use crate::model::ToolRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the registry.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Length of generated row identifiers in bytes before hex encoding.
const ROW_ID_BYTES: usize = 16;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl RegistryConfig {
    /// Creates a config with default timeouts for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Tenant slug is not registered.
    #[error("tenant not found: {0}")]
    TenantNotFound(TenantSlug),
    /// Tool name is not registered for the tenant.
    #[error("tool '{tool}' not registered for tenant '{tenant}'")]
    ToolNotFound {
        /// Tenant that was queried.
        tenant: TenantSlug,
        /// Tool name that was queried.
        tool: ToolName,
    },
    /// Kill-switch matched no tools for the tenant.
    #[error("no matching tools found for tenant '{0}'")]
    NoMatchingTools(TenantSlug),
    /// Tool name is already registered for the tenant.
    #[error("tool '{tool}' already registered for tenant '{tenant}'")]
    ToolExists {
        /// Tenant that owns the conflicting tool.
        tenant: TenantSlug,
        /// Conflicting tool name.
        tool: ToolName,
    },
    /// Underlying database failure.
    #[error("registry database error: {0}")]
    Db(String),
    /// Stored JSON column failed to decode.
    #[error("registry encoding error: {0}")]
    Encode(String),
}

// ============================================================================
// SECTION: SQLite Registry
// ============================================================================

/// Tenant/tool registry backed by one `SQLite` connection.
///
/// # Invariants
/// - The connection is serialized behind a mutex; every public operation is
///   one transaction.
/// - Kill-switch updates are a single bulk statement, never per-row loops.
pub struct SqliteRegistry {
    /// Guarded database connection.
    connection: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Opens (creating when necessary) the registry database.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Db`] when the database cannot be opened or
    /// the schema cannot be initialized.
    pub fn open(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let mut connection = Connection::open(&config.path).map_err(db_err)?;
        connection
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(db_err)?;
        connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
        connection.execute_batch("PRAGMA journal_mode = wal;").map_err(db_err)?;
        init_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Returns the tenant registered under `slug`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TenantNotFound`] when the slug is unknown.
    pub fn find_tenant(&self, slug: &TenantSlug) -> Result<Tenant, RegistryError> {
        let guard = self.lock()?;
        find_tenant_in(&guard, slug)?.ok_or_else(|| RegistryError::TenantNotFound(slug.clone()))
    }

    /// Returns all tenants ordered by slug.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Db`] on query failure.
    pub fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT id, slug, display_name, created_at_ms FROM tenants ORDER BY slug",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], tenant_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<Tenant>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Returns the tenant for `slug`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Db`] on statement failure.
    pub fn get_or_create_tenant(
        &self,
        slug: &TenantSlug,
        display_name: Option<&str>,
    ) -> Result<Tenant, RegistryError> {
        let guard = self.lock()?;
        if let Some(existing) = find_tenant_in(&guard, slug)? {
            return Ok(existing);
        }
        let tenant = Tenant {
            id: generate_row_id(),
            slug: slug.clone(),
            display_name: display_name
                .map_or_else(|| display_name_from_slug(slug.as_str()), str::to_string),
            created_at_ms: unix_millis_now(),
        };
        guard
            .execute(
                "INSERT INTO tenants (id, slug, display_name, created_at_ms) VALUES (?1, ?2, \
                 ?3, ?4)",
                params![tenant.id, tenant.slug.as_str(), tenant.display_name, tenant.created_at_ms],
            )
            .map_err(db_err)?;
        Ok(tenant)
    }

    /// Registers a new tool, creating its tenant on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ToolExists`] when `(tenant, name)` is taken,
    /// and [`RegistryError::Db`] on statement failure.
    pub fn register_tool(&self, new_tool: &NewTool) -> Result<ToolRecord, RegistryError> {
        let tenant = self.get_or_create_tenant(&new_tool.tenant_slug, None)?;
        let guard = self.lock()?;
        let existing: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM tools WHERE tenant_id = ?1 AND name = ?2",
                params![tenant.id, new_tool.name.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(RegistryError::ToolExists {
                tenant: new_tool.tenant_slug.clone(),
                tool: new_tool.name.clone(),
            });
        }
        let now = unix_millis_now();
        let record = ToolRecord {
            id: ToolId::new(generate_row_id()),
            tenant_id: tenant.id,
            name: new_tool.name.clone(),
            url: new_tool.url.clone(),
            owner: new_tool.owner.clone(),
            scopes: new_tool.scopes.clone(),
            metadata: new_tool.metadata.clone(),
            is_active: true,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let scopes_json = serde_json::to_string(&record.scopes)
            .map_err(|err| RegistryError::Encode(err.to_string()))?;
        let metadata_json = serde_json::to_string(&record.metadata)
            .map_err(|err| RegistryError::Encode(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO tools (id, tenant_id, name, url, owner, scopes_json, \
                 metadata_json, is_active, created_at_ms, updated_at_ms) VALUES (?1, ?2, ?3, \
                 ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id.as_str(),
                    record.tenant_id,
                    record.name.as_str(),
                    record.url,
                    record.owner,
                    scopes_json,
                    metadata_json,
                    record.is_active,
                    record.created_at_ms,
                    record.updated_at_ms
                ],
            )
            .map_err(|err| {
                // A racing insert can slip past the existence check; surface
                // the constraint violation as the same conflict.
                if is_unique_violation(&err) {
                    RegistryError::ToolExists {
                        tenant: new_tool.tenant_slug.clone(),
                        tool: new_tool.name.clone(),
                    }
                } else {
                    db_err(err)
                }
            })?;
        Ok(record)
    }

    /// Returns the tool registered under `(tenant_slug, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TenantNotFound`] or
    /// [`RegistryError::ToolNotFound`] when either half is unknown.
    pub fn find_tool(
        &self,
        tenant_slug: &TenantSlug,
        name: &ToolName,
    ) -> Result<ToolRecord, RegistryError> {
        let guard = self.lock()?;
        let tenant = find_tenant_in(&guard, tenant_slug)?
            .ok_or_else(|| RegistryError::TenantNotFound(tenant_slug.clone()))?;
        let raw = guard
            .query_row(
                "SELECT id, tenant_id, name, url, owner, scopes_json, metadata_json, \
                 is_active, created_at_ms, updated_at_ms FROM tools WHERE tenant_id = ?1 AND \
                 name = ?2",
                params![tenant.id, name.as_str()],
                raw_tool_from_row,
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| RegistryError::ToolNotFound {
                tenant: tenant_slug.clone(),
                tool: name.clone(),
            })?;
        tool_from_raw(raw)
    }

    /// Returns registered tools, optionally scoped to one tenant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TenantNotFound`] when a scoping slug is
    /// unknown, and [`RegistryError::Db`] on query failure.
    pub fn list_tools(
        &self,
        tenant_slug: Option<&TenantSlug>,
    ) -> Result<Vec<ToolRecord>, RegistryError> {
        let guard = self.lock()?;
        let raw_rows = match tenant_slug {
            Some(slug) => {
                let tenant = find_tenant_in(&guard, slug)?
                    .ok_or_else(|| RegistryError::TenantNotFound(slug.clone()))?;
                let mut stmt = guard
                    .prepare(
                        "SELECT id, tenant_id, name, url, owner, scopes_json, metadata_json, \
                         is_active, created_at_ms, updated_at_ms FROM tools WHERE tenant_id = \
                         ?1 ORDER BY name",
                    )
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map(params![tenant.id], raw_tool_from_row)
                    .map_err(db_err)?
                    .collect::<Result<Vec<RawTool>, _>>()
                    .map_err(db_err)?;
                rows
            }
            None => {
                let mut stmt = guard
                    .prepare(
                        "SELECT id, tenant_id, name, url, owner, scopes_json, metadata_json, \
                         is_active, created_at_ms, updated_at_ms FROM tools ORDER BY \
                         tenant_id, name",
                    )
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map([], raw_tool_from_row)
                    .map_err(db_err)?
                    .collect::<Result<Vec<RawTool>, _>>()
                    .map_err(db_err)?;
                rows
            }
        };
        raw_rows.into_iter().map(tool_from_raw).collect()
    }

    /// Sets `is_active` for a tenant's tools in one atomic bulk update.
    ///
    /// With a tool filter, only that tool flips; otherwise every tool of the
    /// tenant flips. Returns the affected tool identifiers for audit logging.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TenantNotFound`] when the slug is unknown and
    /// [`RegistryError::NoMatchingTools`] when the update matched zero rows.
    pub fn set_active(
        &self,
        tenant_slug: &TenantSlug,
        tool_name: Option<&ToolName>,
        active: bool,
    ) -> Result<Vec<ToolId>, RegistryError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_err)?;
        let tenant_id: String = tx
            .query_row(
                "SELECT id FROM tenants WHERE slug = ?1",
                params![tenant_slug.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| RegistryError::TenantNotFound(tenant_slug.clone()))?;
        let now = unix_millis_now();
        let affected = match tool_name {
            Some(name) => {
                let mut stmt = tx
                    .prepare(
                        "UPDATE tools SET is_active = ?1, updated_at_ms = ?2 WHERE tenant_id \
                         = ?3 AND name = ?4 RETURNING id",
                    )
                    .map_err(db_err)?;
                let ids = stmt
                    .query_map(params![active, now, tenant_id, name.as_str()], |row| {
                        row.get::<_, String>(0)
                    })
                    .map_err(db_err)?
                    .collect::<Result<Vec<String>, _>>()
                    .map_err(db_err)?;
                ids
            }
            None => {
                let mut stmt = tx
                    .prepare(
                        "UPDATE tools SET is_active = ?1, updated_at_ms = ?2 WHERE tenant_id \
                         = ?3 RETURNING id",
                    )
                    .map_err(db_err)?;
                let ids = stmt
                    .query_map(params![active, now, tenant_id], |row| row.get::<_, String>(0))
                    .map_err(db_err)?
                    .collect::<Result<Vec<String>, _>>()
                    .map_err(db_err)?;
                ids
            }
        };
        if affected.is_empty() {
            return Err(RegistryError::NoMatchingTools(tenant_slug.clone()));
        }
        tx.commit().map_err(db_err)?;
        Ok(affected.into_iter().map(ToolId::new).collect())
    }

    /// Acquires the guarded connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.connection
            .lock()
            .map_err(|_| RegistryError::Db("registry connection poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Creates the registry schema when absent.
fn init_schema(connection: &mut Connection) -> Result<(), RegistryError> {
    let tx = connection.transaction().map_err(db_err)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS registry_meta (version INTEGER NOT NULL);
         CREATE TABLE IF NOT EXISTS tenants (
             id TEXT PRIMARY KEY,
             slug TEXT NOT NULL UNIQUE,
             display_name TEXT NOT NULL,
             created_at_ms INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS tools (
             id TEXT PRIMARY KEY,
             tenant_id TEXT NOT NULL REFERENCES tenants(id),
             name TEXT NOT NULL,
             url TEXT NOT NULL,
             owner TEXT NOT NULL,
             scopes_json TEXT NOT NULL,
             metadata_json TEXT NOT NULL,
             is_active INTEGER NOT NULL DEFAULT 1,
             created_at_ms INTEGER NOT NULL,
             updated_at_ms INTEGER NOT NULL,
             UNIQUE (tenant_id, name)
         );
         CREATE INDEX IF NOT EXISTS idx_tools_tenant ON tools (tenant_id);",
    )
    .map_err(db_err)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM registry_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    match version {
        None => {
            tx.execute("INSERT INTO registry_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_err)?;
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(RegistryError::Db(format!(
                "unsupported registry schema version: {found}"
            )));
        }
    }
    tx.commit().map_err(db_err)
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw tool columns before JSON decoding.
type RawTool = (String, String, String, String, String, String, String, bool, i64, i64);

/// Maps a tenant row.
fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        slug: TenantSlug::new(row.get::<_, String>(1)?),
        display_name: row.get(2)?,
        created_at_ms: row.get(3)?,
    })
}

/// Maps raw tool columns without decoding JSON text.
fn raw_tool_from_row(row: &Row<'_>) -> rusqlite::Result<RawTool> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

/// Decodes JSON columns and builds the tool record.
fn tool_from_raw(raw: RawTool) -> Result<ToolRecord, RegistryError> {
    let (id, tenant_id, name, url, owner, scopes_json, metadata_json, is_active, created, updated) =
        raw;
    let scopes: Vec<String> = serde_json::from_str(&scopes_json)
        .map_err(|err| RegistryError::Encode(format!("scopes for tool {id}: {err}")))?;
    let metadata = serde_json::from_str(&metadata_json)
        .map_err(|err| RegistryError::Encode(format!("metadata for tool {id}: {err}")))?;
    Ok(ToolRecord {
        id: ToolId::new(id),
        tenant_id,
        name: ToolName::new(name),
        url,
        owner,
        scopes,
        metadata,
        is_active,
        created_at_ms: created,
        updated_at_ms: updated,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Finds a tenant by slug on an open connection.
fn find_tenant_in(
    connection: &Connection,
    slug: &TenantSlug,
) -> Result<Option<Tenant>, RegistryError> {
    connection
        .query_row(
            "SELECT id, slug, display_name, created_at_ms FROM tenants WHERE slug = ?1",
            params![slug.as_str()],
            tenant_from_row,
        )
        .optional()
        .map_err(db_err)
}

/// Wraps a `rusqlite` failure into a registry error.
fn db_err(err: rusqlite::Error) -> RegistryError {
    RegistryError::Db(err.to_string())
}

/// Returns true when a failure is a uniqueness constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(info, _)
            if info.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Generates a random 128-bit lowercase-hex row identifier.
fn generate_row_id() -> String {
    let mut bytes = [0_u8; ROW_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(ROW_ID_BYTES * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Derives a display name from a slug ("acme-corp" becomes "Acme Corp").
fn display_name_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<String>>()
        .join(" ")
}
