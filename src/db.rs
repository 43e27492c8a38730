use crate::entities::{Beneficiario, Situacao, TipoCesta};
use crate::error::{DbError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

pub const ENTITY_BENEFICIARIO: &str = "beneficiario";

const BENEFICIARIO_COLUMNS: &str = "id, nome, cpf, data_nascimento, email, telefone, cep,
    logradouro, numero, complemento, bairro, cidade, uf, situacao, tipo_cesta";

// ============================================================================
// SQL MAPPING FOR ENUMS (stored as their variant names)
// ============================================================================

impl ToSql for Situacao {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Situacao {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for TipoCesta {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TipoCesta {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Event for audit trail: one row per committed change
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for file databases; in-memory ones report "memory" and carry on
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS beneficiarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL,
            cpf TEXT NOT NULL,
            data_nascimento TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            telefone TEXT NOT NULL DEFAULT '',
            cep TEXT NOT NULL DEFAULT '',
            logradouro TEXT NOT NULL DEFAULT '',
            numero TEXT NOT NULL DEFAULT '',
            complemento TEXT NOT NULL DEFAULT '',
            bairro TEXT NOT NULL DEFAULT '',
            cidade TEXT NOT NULL DEFAULT '',
            uf TEXT NOT NULL DEFAULT '',
            situacao TEXT NOT NULL,
            tipo_cesta TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_beneficiarios_cpf ON beneficiarios(cpf)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Drop every table. The connection stays usable; call `setup_database` to start over.
pub fn drop_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS events;
         DROP TABLE IF EXISTS beneficiarios;",
    )?;
    Ok(())
}

fn row_to_beneficiario(row: &Row<'_>) -> rusqlite::Result<Beneficiario> {
    Ok(Beneficiario {
        id: row.get(0)?,
        nome: row.get(1)?,
        cpf: row.get(2)?,
        data_nascimento: row.get(3)?,
        email: row.get(4)?,
        telefone: row.get(5)?,
        cep: row.get(6)?,
        logradouro: row.get(7)?,
        numero: row.get(8)?,
        complemento: row.get(9)?,
        bairro: row.get(10)?,
        cidade: row.get(11)?,
        uf: row.get(12)?,
        situacao: row.get(13)?,
        tipo_cesta: row.get(14)?,
    })
}

/// Insert one beneficiary and return its id.
///
/// `id == 0` lets SQLite pick the next rowid; a positive id is stored as
/// given and fails with `Conflict` when already taken, or when it belonged
/// to a deleted beneficiary whose audit trail is still on record.
pub fn insert_beneficiario(conn: &Connection, b: &Beneficiario) -> Result<i64> {
    if b.id < 0 {
        return Err(DbError::InvalidValue(format!("negative id {}", b.id)));
    }

    let explicit_id = if b.is_persisted() { Some(b.id) } else { None };

    if let Some(id) = explicit_id {
        if has_events(conn, ENTITY_BENEFICIARIO, &id.to_string())? {
            return Err(DbError::Conflict(id));
        }
    }

    let result = conn.execute(
        "INSERT INTO beneficiarios (
            id, nome, cpf, data_nascimento, email, telefone, cep,
            logradouro, numero, complemento, bairro, cidade, uf, situacao, tipo_cesta
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            explicit_id,
            b.nome,
            b.cpf,
            b.data_nascimento,
            b.email,
            b.telefone,
            b.cep,
            b.logradouro,
            b.numero,
            b.complemento,
            b.bairro,
            b.cidade,
            b.uf,
            b.situacao,
            b.tipo_cesta,
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DbError::Conflict(b.id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Replace every column of the row with `b.id`
pub fn update_beneficiario(conn: &Connection, b: &Beneficiario) -> Result<()> {
    let changed = conn.execute(
        "UPDATE beneficiarios
         SET nome = ?2, cpf = ?3, data_nascimento = ?4, email = ?5, telefone = ?6,
             cep = ?7, logradouro = ?8, numero = ?9, complemento = ?10, bairro = ?11,
             cidade = ?12, uf = ?13, situacao = ?14, tipo_cesta = ?15
         WHERE id = ?1",
        params![
            b.id,
            b.nome,
            b.cpf,
            b.data_nascimento,
            b.email,
            b.telefone,
            b.cep,
            b.logradouro,
            b.numero,
            b.complemento,
            b.bairro,
            b.cidade,
            b.uf,
            b.situacao,
            b.tipo_cesta,
        ],
    )?;

    if changed == 0 {
        return Err(DbError::NotFound(b.id));
    }
    Ok(())
}

pub fn delete_beneficiario(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM beneficiarios WHERE id = ?1", params![id])?;

    if changed == 0 {
        return Err(DbError::NotFound(id));
    }
    Ok(())
}

pub fn get_beneficiario(conn: &Connection, id: i64) -> Result<Option<Beneficiario>> {
    let sql = format!("SELECT {} FROM beneficiarios WHERE id = ?1", BENEFICIARIO_COLUMNS);
    let found = conn
        .query_row(&sql, params![id], row_to_beneficiario)
        .optional()?;

    Ok(found)
}

/// All beneficiaries in insertion (id) order
pub fn get_all_beneficiarios(conn: &Connection) -> Result<Vec<Beneficiario>> {
    let sql = format!("SELECT {} FROM beneficiarios ORDER BY id", BENEFICIARIO_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    let beneficiarios = stmt
        .query_map([], row_to_beneficiario)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(beneficiarios)
}

pub fn find_beneficiario_by_cpf(conn: &Connection, cpf: &str) -> Result<Option<Beneficiario>> {
    let sql = format!(
        "SELECT {} FROM beneficiarios WHERE cpf = ?1 ORDER BY id LIMIT 1",
        BENEFICIARIO_COLUMNS
    );
    let found = conn
        .query_row(&sql, params![cpf], row_to_beneficiario)
        .optional()?;

    Ok(found)
}

pub fn count_beneficiarios(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM beneficiarios", [], |row| row.get(0))?;

    Ok(count)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

pub fn has_events(conn: &Connection, entity_type: &str, entity_id: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM events WHERE entity_type = ?1 AND entity_id = ?2 LIMIT 1",
            params![entity_type, entity_id],
            |_| Ok(()),
        )
        .optional()?;

    Ok(found.is_some())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let rows = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(
            |(event_id, timestamp, event_type, entity_type, entity_id, data, actor)| -> Result<Event> {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| DbError::InvalidValue(format!("event timestamp: {}", e)))?
                    .with_timezone(&Utc);

                Ok(Event {
                    event_id,
                    timestamp,
                    event_type,
                    entity_type,
                    entity_id,
                    data: serde_json::from_str(&data)?,
                    actor,
                })
            },
        )
        .collect()
}
