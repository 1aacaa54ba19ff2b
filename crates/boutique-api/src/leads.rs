//! Read-only views of captured records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/leads` | Ordered by id |
//! | `GET`  | `/leads/{id}` | 404 if not found |
//! | `GET`  | `/leads/{id}/feedback` | 404 if the lead does not exist |
//! | `GET`  | `/feedback` | Every entry, grouped by lead |

use axum::{
  Json,
  extract::{Path, State},
};
use boutique_agent::generator::Generator;
use boutique_core::{
  feedback::FeedbackEntry,
  lead::{Lead, LeadId},
  store::LeadStore,
};

use crate::{AppState, error::ApiError};

/// `GET /leads`
pub async fn list<S, G>(
  State(assistant): State<AppState<S, G>>,
) -> Result<Json<Vec<Lead>>, ApiError>
where
  S: LeadStore,
  G: Generator,
{
  let leads = assistant
    .book()
    .store()
    .list_leads()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(leads))
}

/// `GET /leads/{id}`
pub async fn get_one<S, G>(
  State(assistant): State<AppState<S, G>>,
  Path(id): Path<LeadId>,
) -> Result<Json<Lead>, ApiError>
where
  S: LeadStore,
  G: Generator,
{
  let lead = assistant
    .book()
    .store()
    .get_lead(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lead {id} not found")))?;
  Ok(Json(lead))
}

/// `GET /leads/{id}/feedback`
pub async fn feedback_for<S, G>(
  State(assistant): State<AppState<S, G>>,
  Path(id): Path<LeadId>,
) -> Result<Json<Vec<FeedbackEntry>>, ApiError>
where
  S: LeadStore,
  G: Generator,
{
  let store = assistant.book().store();
  if store.get_lead(id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("lead {id} not found")));
  }
  let entries = store
    .list_feedback(Some(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

/// `GET /feedback`
pub async fn all_feedback<S, G>(
  State(assistant): State<AppState<S, G>>,
) -> Result<Json<Vec<FeedbackEntry>>, ApiError>
where
  S: LeadStore,
  G: Generator,
{
  let entries = assistant
    .book()
    .store()
    .list_feedback(None)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}
