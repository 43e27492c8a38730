// Persistence context
//
// `Database` owns the SQLite connection and is cheap to clone. Each unit of
// work gets its own `AppDbContext`, which stages inserts/updates/removes and
// commits them in a single SQLite transaction on `save_changes`.

use crate::db::{self, Event, ENTITY_BENEFICIARIO};
use crate::entities::Beneficiario;
use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

const DEFAULT_ACTOR: &str = "api";

// ============================================================================
// DATABASE HANDLE
// ============================================================================

/// Shared handle to the beneficiary database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a file database and make sure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        db::setup_database(&conn)?;
        info!(path = %path.as_ref().display(), "database opened");
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory database. Nothing is shared between two calls;
    /// the data goes away with the last clone of the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Start a unit of work
    pub fn context(&self) -> AppDbContext {
        AppDbContext {
            db: self.clone(),
            pending: Vec::new(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Drop all tables. Used to tear down test databases.
    pub fn ensure_deleted(&self) -> Result<()> {
        self.with_conn(|conn| db::drop_database(conn))
    }

    /// Recreate the schema after `ensure_deleted`
    pub fn ensure_created(&self) -> Result<()> {
        self.with_conn(|conn| db::setup_database(conn))
    }

    /// A panic while the lock was held leaves the connection usable: any open
    /// transaction was rolled back when it was dropped during unwinding.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("recovering database connection after a panic");
            self.conn.clear_poison();
            PoisonError::into_inner(poisoned)
        });
        f(&mut *conn)
    }

    /// Run blocking SQLite work off the async executor
    pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f)).await?
    }
}

// ============================================================================
// UNIT OF WORK
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Change {
    Insert(Beneficiario),
    Update(Beneficiario),
    Delete(i64),
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedChanges {
    /// Rows inserted, updated or deleted
    pub rows_affected: usize,

    /// Inserted records with their final ids, in staging order
    pub inserted: Vec<Beneficiario>,
}

/// Unit of work over the `beneficiarios` table.
///
/// Reads go straight to the database. Writes are staged and only reach it
/// on `save_changes`; a failed commit rolls back the whole batch and keeps
/// the changes staged.
pub struct AppDbContext {
    db: Database,
    pending: Vec<Change>,
    actor: String,
}

impl AppDbContext {
    /// Name recorded on the audit events of this context's commits
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn add(&mut self, beneficiario: Beneficiario) {
        self.pending.push(Change::Insert(beneficiario));
    }

    pub fn add_range(&mut self, beneficiarios: impl IntoIterator<Item = Beneficiario>) {
        self.pending
            .extend(beneficiarios.into_iter().map(Change::Insert));
    }

    /// Stage a full replacement of the row with `beneficiario.id`
    pub fn update(&mut self, beneficiario: Beneficiario) {
        self.pending.push(Change::Update(beneficiario));
    }

    pub fn remove(&mut self, id: i64) {
        self.pending.push(Change::Delete(id));
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn find(&self, id: i64) -> Result<Option<Beneficiario>> {
        self.db.with_conn(|conn| db::get_beneficiario(conn, id))
    }

    pub async fn find_async(&self, id: i64) -> Result<Option<Beneficiario>> {
        self.db.run(move |conn| db::get_beneficiario(conn, id)).await
    }

    /// First record, in id order, matching `predicate`
    pub async fn first_or_default_async<P>(&self, predicate: P) -> Result<Option<Beneficiario>>
    where
        P: Fn(&Beneficiario) -> bool + Send + 'static,
    {
        self.db
            .run(move |conn| {
                let all = db::get_all_beneficiarios(conn)?;
                Ok(all.into_iter().find(|b| predicate(b)))
            })
            .await
    }

    pub fn to_list(&self) -> Result<Vec<Beneficiario>> {
        self.db.with_conn(|conn| db::get_all_beneficiarios(conn))
    }

    pub async fn to_list_async(&self) -> Result<Vec<Beneficiario>> {
        self.db.run(|conn| db::get_all_beneficiarios(conn)).await
    }

    pub fn count(&self) -> Result<i64> {
        self.db.with_conn(|conn| db::count_beneficiarios(conn))
    }

    pub fn find_by_cpf(&self, cpf: &str) -> Result<Option<Beneficiario>> {
        self.db.with_conn(|conn| db::find_beneficiario_by_cpf(conn, cpf))
    }

    /// Audit trail of one beneficiary, newest first
    pub async fn events_async(&self, id: i64) -> Result<Vec<Event>> {
        self.db
            .run(move |conn| db::get_events_for_entity(conn, ENTITY_BENEFICIARIO, &id.to_string()))
            .await
    }

    // ========================================================================
    // COMMIT
    // ========================================================================

    pub fn save_changes(&mut self) -> Result<SavedChanges> {
        let changes = self.pending.clone();
        let actor = self.actor.clone();
        let saved = self
            .db
            .with_conn(move |conn| apply_changes(conn, changes, &actor))?;
        self.pending.clear();
        Ok(saved)
    }

    pub async fn save_changes_async(&mut self) -> Result<SavedChanges> {
        let changes = self.pending.clone();
        let actor = self.actor.clone();
        let saved = self
            .db
            .run(move |conn| apply_changes(conn, changes, &actor))
            .await?;
        self.pending.clear();
        Ok(saved)
    }
}

fn apply_changes(conn: &mut Connection, changes: Vec<Change>, actor: &str) -> Result<SavedChanges> {
    if changes.is_empty() {
        return Ok(SavedChanges::default());
    }

    let tx = conn.transaction()?;
    let mut saved = SavedChanges::default();

    for change in changes {
        let event = match change {
            Change::Insert(mut b) => {
                b.id = db::insert_beneficiario(&tx, &b)?;
                let event = Event::new(
                    "beneficiario_created",
                    ENTITY_BENEFICIARIO,
                    &b.id.to_string(),
                    serde_json::json!({ "nome": b.nome, "cpf": b.cpf }),
                    actor,
                );
                saved.inserted.push(b);
                event
            }
            Change::Update(b) => {
                db::update_beneficiario(&tx, &b)?;
                Event::new(
                    "beneficiario_updated",
                    ENTITY_BENEFICIARIO,
                    &b.id.to_string(),
                    serde_json::to_value(&b)?,
                    actor,
                )
            }
            Change::Delete(id) => {
                db::delete_beneficiario(&tx, id)?;
                Event::new(
                    "beneficiario_deleted",
                    ENTITY_BENEFICIARIO,
                    &id.to_string(),
                    serde_json::json!({}),
                    actor,
                )
            }
        };

        db::insert_event(&tx, &event)?;
        saved.rows_affected += 1;
    }

    tx.commit()?;
    debug!(
        rows = saved.rows_affected,
        inserted = saved.inserted.len(),
        actor,
        "changes committed"
    );

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_support::{camila, pietra, seeded};

    #[test]
    fn test_add_is_invisible_until_saved() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = db.context();

        ctx.add(pietra(15));
        assert!(ctx.has_changes());
        assert!(ctx.find(15).unwrap().is_none());

        let saved = ctx.save_changes().unwrap();
        assert_eq!(saved.rows_affected, 1);
        assert!(!ctx.has_changes());
        assert_eq!(ctx.find(15).unwrap(), Some(pietra(15)));
    }

    #[test]
    fn test_save_reports_generated_ids() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = db.context();

        ctx.add_range(vec![pietra(0), camila(0)]);
        let saved = ctx.save_changes().unwrap();

        let ids: Vec<i64> = saved.inserted.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(saved.inserted[1].nome, "Camila Gabriela Luciana Baptista");
    }

    #[test]
    fn test_failed_commit_rolls_back_whole_batch() {
        let db = seeded(vec![pietra(15)]);
        let mut ctx = db.context();

        ctx.add(camila(16));
        ctx.remove(99);

        let err = ctx.save_changes().unwrap_err();
        assert!(matches!(err, DbError::NotFound(99)));

        // camila was rolled back and both changes are still staged
        assert!(ctx.find(16).unwrap().is_none());
        assert!(ctx.has_changes());
    }

    #[test]
    fn test_contexts_do_not_share_pending_changes() {
        let db = Database::open_in_memory().unwrap();
        let mut a = db.context();
        let mut b = db.context();

        a.add(pietra(15));
        let saved = b.save_changes().unwrap();

        assert_eq!(saved, SavedChanges::default());
        assert!(a.has_changes());
        assert!(b.find(15).unwrap().is_none());
    }

    #[test]
    fn test_in_memory_databases_are_isolated() {
        let first = seeded(vec![pietra(15)]);
        let second = Database::open_in_memory().unwrap();

        assert!(first.context().find(15).unwrap().is_some());
        assert!(second.context().find(15).unwrap().is_none());
    }

    #[test]
    fn test_ensure_deleted_then_created() {
        let db = seeded(vec![pietra(15)]);

        db.ensure_deleted().unwrap();
        assert!(db.context().find(15).is_err());

        db.ensure_created().unwrap();
        assert!(db.context().find(15).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_async_queries() {
        let db = seeded(vec![pietra(15), camila(16)]);
        let ctx = db.context();

        assert_eq!(ctx.find_async(16).await.unwrap(), Some(camila(16)));
        assert_eq!(ctx.to_list_async().await.unwrap(), vec![pietra(15), camila(16)]);

        let verde = ctx
            .first_or_default_async(|b| b.tipo_cesta == crate::entities::TipoCesta::Verde)
            .await
            .unwrap();
        assert_eq!(verde.map(|b| b.id), Some(16));

        let none = ctx.first_or_default_async(|b| b.uf == "SP").await.unwrap();
        assert!(none.is_none());

        let by_cpf = ctx.find_by_cpf("32989238697").unwrap();
        assert_eq!(by_cpf.map(|b| b.id), Some(15));
    }

    #[tokio::test]
    async fn test_commit_writes_audit_events() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = db.context().with_actor("tester");

        ctx.add(pietra(10));
        ctx.save_changes_async().await.unwrap();

        let mut renamed = pietra(10);
        renamed.nome = "Silvana Araujo".to_string();
        ctx.update(renamed);
        ctx.save_changes_async().await.unwrap();

        ctx.remove(10);
        ctx.save_changes_async().await.unwrap();

        let events = ctx.events_async(10).await.unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["beneficiario_deleted", "beneficiario_updated", "beneficiario_created"]
        );
        assert!(events.iter().all(|e| e.actor == "tester"));
        assert_eq!(events[1].data["nome"], "Silvana Araujo");
    }

    #[tokio::test]
    async fn test_panicking_predicate_does_not_break_later_queries() {
        let db = seeded(vec![pietra(15)]);
        let ctx = db.context();

        let err = ctx
            .first_or_default_async(|_| panic!("predicate blew up"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TaskFailed(_)));

        assert_eq!(db.context().find_async(15).await.unwrap(), Some(pietra(15)));
        assert_eq!(db.context().to_list().unwrap(), vec![pietra(15)]);

        let mut writer = db.context();
        writer.add(camila(16));
        writer.save_changes_async().await.unwrap();
        assert_eq!(db.context().count().unwrap(), 2);
    }

    #[test]
    fn test_panic_inside_commit_leaves_no_partial_rows() {
        let db = Database::open_in_memory().unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = db.with_conn(|conn| -> Result<()> {
                let tx = conn.transaction()?;
                db::insert_beneficiario(&tx, &pietra(15))?;
                panic!("interrupted mid-transaction");
            });
        }));
        assert!(outcome.is_err());

        assert!(db.context().find(15).unwrap().is_none());
        assert_eq!(db.context().count().unwrap(), 0);
    }
}
