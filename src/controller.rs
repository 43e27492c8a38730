// Beneficiario controller
//
// Translates the five CRUD operations into context calls and wraps the
// outcome in an `ActionResult`. Storage faults come back as `Err`; every
// expected outcome (found, missing, invalid, conflicting) is a variant.

use crate::context::Database;
use crate::db::Event;
use crate::entities::Beneficiario;
use crate::error::{DbError, Result};
use crate::validation::{summarize, validate_beneficiario};
use chrono::Utc;
use tracing::{info, warn};

pub const GET_BY_ID_ACTION: &str = "GetById";

/// HTTP-style outcome of a controller action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<T> {
    /// 200 with a body
    Ok(T),

    /// 201 with the created value and the action that reads it back
    CreatedAtAction {
        action_name: &'static str,
        id: i64,
        value: T,
    },

    /// 204
    NoContent,

    /// 404
    NotFound,

    /// 400
    BadRequest(String),

    /// 409
    Conflict(String),
}

impl<T> ActionResult<T> {
    pub fn status_code(&self) -> u16 {
        match self {
            ActionResult::Ok(_) => 200,
            ActionResult::CreatedAtAction { .. } => 201,
            ActionResult::NoContent => 204,
            ActionResult::BadRequest(_) => 400,
            ActionResult::NotFound => 404,
            ActionResult::Conflict(_) => 409,
        }
    }

    /// Body carried by `Ok` and `CreatedAtAction`
    pub fn value(&self) -> Option<&T> {
        match self {
            ActionResult::Ok(value) | ActionResult::CreatedAtAction { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            ActionResult::Ok(value) | ActionResult::CreatedAtAction { value, .. } => Some(value),
            _ => None,
        }
    }

    /// `Location` of a created resource
    pub fn location(&self) -> Option<String> {
        match self {
            ActionResult::CreatedAtAction { id, .. } => Some(beneficiario_location(*id)),
            _ => None,
        }
    }
}

pub fn beneficiario_location(id: i64) -> String {
    format!("/beneficiarios/{}", id)
}

#[derive(Clone)]
pub struct BeneficiarioController {
    db: Database,
}

impl BeneficiarioController {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ActionResult<Beneficiario>> {
        let ctx = self.db.context();

        Ok(match ctx.find_async(id).await? {
            Some(beneficiario) => ActionResult::Ok(beneficiario),
            None => ActionResult::NotFound,
        })
    }

    pub async fn get_all(&self) -> Result<ActionResult<Vec<Beneficiario>>> {
        let ctx = self.db.context();
        Ok(ActionResult::Ok(ctx.to_list_async().await?))
    }

    pub async fn create(&self, beneficiario: Beneficiario) -> Result<ActionResult<Beneficiario>> {
        if let Err(errors) = validate_beneficiario(&beneficiario, Utc::now().date_naive()) {
            return Ok(ActionResult::BadRequest(summarize(&errors)));
        }

        let mut ctx = self.db.context();
        ctx.add(beneficiario);

        let saved = match ctx.save_changes_async().await {
            Ok(saved) => saved,
            Err(DbError::Conflict(id)) => {
                warn!(id, "create rejected: id already in use");
                return Ok(ActionResult::Conflict(format!("Beneficiario {} already exists", id)));
            }
            Err(e) => return Err(e),
        };

        let created = saved
            .inserted
            .into_iter()
            .next()
            .ok_or_else(|| DbError::InvalidValue("commit reported no inserted row".to_string()))?;

        info!(id = created.id, "beneficiario created");
        Ok(ActionResult::CreatedAtAction {
            action_name: GET_BY_ID_ACTION,
            id: created.id,
            value: created,
        })
    }

    /// Replace every field of beneficiary `id`.
    ///
    /// A body id of 0 is taken to mean `id`; any other mismatch is a bad request.
    pub async fn update(&self, id: i64, mut beneficiario: Beneficiario) -> Result<ActionResult<()>> {
        if beneficiario.id != 0 && beneficiario.id != id {
            return Ok(ActionResult::BadRequest(format!(
                "Route id {} does not match body id {}",
                id, beneficiario.id
            )));
        }
        beneficiario.id = id;

        if let Err(errors) = validate_beneficiario(&beneficiario, Utc::now().date_naive()) {
            return Ok(ActionResult::BadRequest(summarize(&errors)));
        }

        let mut ctx = self.db.context();
        ctx.update(beneficiario);

        match ctx.save_changes_async().await {
            Ok(_) => {
                info!(id, "beneficiario updated");
                Ok(ActionResult::NoContent)
            }
            Err(DbError::NotFound(_)) => Ok(ActionResult::NotFound),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<ActionResult<()>> {
        let mut ctx = self.db.context();

        if ctx.find_async(id).await?.is_none() {
            return Ok(ActionResult::NotFound);
        }

        ctx.remove(id);

        match ctx.save_changes_async().await {
            Ok(_) => {
                info!(id, "beneficiario deleted");
                Ok(ActionResult::NoContent)
            }
            // removed by someone else between the lookup and the commit
            Err(DbError::NotFound(_)) => Ok(ActionResult::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Audit trail of a beneficiary. Deleted beneficiaries keep their history.
    pub async fn history(&self, id: i64) -> Result<ActionResult<Vec<Event>>> {
        let ctx = self.db.context();
        let events = ctx.events_async(id).await?;

        if events.is_empty() && ctx.find_async(id).await?.is_none() {
            return Ok(ActionResult::NotFound);
        }
        Ok(ActionResult::Ok(events))
    }
}
