use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    auth::{generate_client_id, hash_password, verify_password},
    error::AppError,
    models::{
        Admin, ClientRecord, DirectoryEntry, FormStub, IntakeFields, IntakeForm, IntakePatch,
        IntakeUpdate, IntakeUpsert, NewAdmin, NewClient, SignPatch,
    },
    state::AppState,
    store::{OnConflict, StoreError},
};

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn admin_login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<Value>, AppError> {
    let admin: Option<Admin> = state
        .store
        .from("admins")
        .eq("username", &payload.username)
        .maybe_single()
        .await?;

    let authenticated = match admin {
        Some(admin) => verify_password(&payload.password, &admin.password),
        // First-ever login against an empty table: seed lazily, then treat
        // the attempt as successful.
        None if payload.username == state.config.admin_username
            && payload.password == state.config.admin_password =>
        {
            let hash = hash_password(&payload.password).map_err(AppError::Hash)?;
            let row = NewAdmin {
                username: &payload.username,
                password: &hash,
            };
            state
                .store
                .from("admins")
                .upsert::<Admin, _>(&row, "username", OnConflict::IgnoreDuplicates)
                .await?;
            info!("Seeded admin account on first login");
            true
        }
        None => false,
    };

    if !authenticated {
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(json!({
        "success": true,
        "user": { "username": payload.username, "role": "admin" },
    })))
}

#[derive(Deserialize)]
pub struct ClientLoginRequest {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
    mobile: Option<String>,
    name: Option<String>,
}

/// Two modes, picked by body shape: a returning client presents
/// `clientId`+`mobile`, a registration presents `name`+`mobile`.
pub async fn client_login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ClientLoginRequest>,
) -> Result<Json<Value>, AppError> {
    let mobile = payload.mobile.as_deref().unwrap_or_default();

    if let Some(client_id) = payload.client_id.as_deref().filter(|id| !id.is_empty()) {
        let client: Option<ClientRecord> = state
            .store
            .from("clients")
            .eq("client_id", client_id)
            .eq("mobile", mobile)
            .maybe_single()
            .await?;

        return match client {
            Some(client) => Ok(Json(json!({ "success": true, "client": client }))),
            None => Err(AppError::InvalidClientLogin),
        };
    }

    let name = payload.name.as_deref().unwrap_or_default();
    if name.is_empty() || mobile.is_empty() {
        return Err(AppError::Validation("Missing required fields"));
    }

    // Insert-if-absent keyed on the mobile uniqueness constraint, so two
    // concurrent registrations for one number converge on a single row.
    let fresh_id = generate_client_id();
    let row = NewClient {
        client_id: &fresh_id,
        name,
        mobile,
    };
    let inserted: Option<ClientRecord> = state
        .store
        .from("clients")
        .upsert(&row, "mobile", OnConflict::IgnoreDuplicates)
        .await?;

    let client = match inserted {
        Some(client) => {
            info!("Registered client {}", client.client_id);
            client
        }
        None => {
            state
                .store
                .from("clients")
                .eq("mobile", mobile)
                .single()
                .await?
        }
    };

    Ok(Json(json!({ "success": true, "client": client })))
}

#[derive(Deserialize)]
pub struct IntakeSubmission {
    client_id: Option<String>,
    #[serde(flatten)]
    fields: IntakeFields,
}

/// One atomic upsert keyed on the form's `client_id` uniqueness
/// constraint: first submit inserts, a resubmit overwrites the form
/// columns in place. `created_at` and `updated_at` are never carried.
pub async fn intake_submit_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IntakeSubmission>,
) -> Result<Json<Value>, AppError> {
    let client_id = payload
        .client_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(AppError::Validation("Client ID is missing"))?;

    info!("Received intake submission for client {client_id}");

    let row = IntakeUpsert {
        client_id,
        fields: &payload.fields,
    };
    state
        .store
        .from("intake_forms")
        .upsert::<IntakeForm, _>(&row, "client_id", OnConflict::MergeDuplicates)
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Serialize)]
pub struct ErrorBody {
    error: String,
}

fn directory_error(err: StoreError) -> (StatusCode, Json<ErrorBody>) {
    error!("Directory query failed: {err}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

pub async fn admin_clients_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DirectoryEntry>>, (StatusCode, Json<ErrorBody>)> {
    let clients: Vec<ClientRecord> = state
        .store
        .from("clients")
        .order_desc("created_at")
        .fetch_all()
        .await
        .map_err(directory_error)?;

    let stubs: Vec<FormStub> = state
        .store
        .from("intake_forms")
        .select("id,client_id,created_at")
        .fetch_all()
        .await
        .map_err(directory_error)?;

    Ok(Json(flatten_directory(clients, stubs)))
}

/// Join each client with its (at most one consumed) form, keeping the
/// client ordering from the store.
fn flatten_directory(clients: Vec<ClientRecord>, stubs: Vec<FormStub>) -> Vec<DirectoryEntry> {
    let mut forms: HashMap<String, FormStub> = stubs
        .into_iter()
        .map(|stub| (stub.client_id.clone(), stub))
        .collect();

    clients
        .into_iter()
        .map(|client| {
            let stub = forms.remove(&client.client_id);

            DirectoryEntry {
                form_id: stub.as_ref().map(|s| s.id),
                form_date: stub.map(|s| s.created_at),
                client,
            }
        })
        .collect()
}

pub async fn admin_client_handler(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let client: Option<ClientRecord> = state
        .store
        .from("clients")
        .eq("client_id", &client_id)
        .maybe_single()
        .await?;

    let form: Option<IntakeForm> = state
        .store
        .from("intake_forms")
        .eq("client_id", &client_id)
        .maybe_single()
        .await?;

    Ok(Json(json!({ "client": client, "form": form })))
}

#[derive(Deserialize)]
pub struct AdminUpdateRequest {
    form_id: Option<i64>,
    #[serde(flatten)]
    patch: IntakePatch,
}

pub async fn admin_update_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let form_id = payload
        .form_id
        .ok_or(AppError::Validation("Form ID is required"))?;

    let update = IntakeUpdate {
        patch: &payload.patch,
        updated_at: Utc::now(),
        status: "submitted",
    };

    let updated: Vec<IntakeForm> = state
        .store
        .from("intake_forms")
        .eq("id", &form_id.to_string())
        .update(&update)
        .await?;

    let form = updated
        .into_iter()
        .next()
        .ok_or(AppError::Store(StoreError::RowMissing("intake_forms")))?;

    Ok(Json(json!({ "success": true, "form": form })))
}

#[derive(Deserialize)]
pub struct SignRequest {
    client_id: Option<String>,
    #[serde(default)]
    admin_signature: String,
}

pub async fn admin_sign_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignRequest>,
) -> Result<Json<Value>, AppError> {
    let client_id = payload
        .client_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(AppError::Validation("Client ID is missing"))?;

    let patch = SignPatch {
        admin_signature: &payload.admin_signature,
    };
    let _: Vec<IntakeForm> = state
        .store
        .from("intake_forms")
        .eq("client_id", client_id)
        .update(&patch)
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client(id: i64, client_id: &str, day: u32) -> ClientRecord {
        ClientRecord {
            id,
            client_id: client_id.to_string(),
            name: "Asha".to_string(),
            mobile: "9001".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, day, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_flatten_directory_pairs_forms_with_clients() {
        let clients = vec![client(2, "B4C5D6", 8), client(1, "A1B2C3", 5)];
        let stubs = vec![FormStub {
            id: 40,
            client_id: "A1B2C3".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 6, 10, 0, 0).unwrap(),
        }];

        let entries = flatten_directory(clients, stubs);

        assert_eq!(entries.len(), 2);
        // Store ordering (newest first) is preserved.
        assert_eq!(entries[0].client.client_id, "B4C5D6");
        assert_eq!(entries[0].form_id, None);
        assert_eq!(entries[0].form_date, None);
        assert_eq!(entries[1].form_id, Some(40));
        assert!(entries[1].form_date.is_some());
    }

    #[test]
    fn test_directory_entry_wire_shape_is_flat() {
        let entries = flatten_directory(
            vec![client(1, "A1B2C3", 5)],
            vec![FormStub {
                id: 40,
                client_id: "A1B2C3".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 1, 6, 10, 0, 0).unwrap(),
            }],
        );

        let value = serde_json::to_value(&entries).unwrap();
        assert_eq!(value[0]["client_id"], "A1B2C3");
        assert_eq!(value[0]["name"], "Asha");
        assert_eq!(value[0]["form_id"], 40);
        assert!(value[0].get("client").is_none());
    }

    #[test]
    fn test_submission_with_only_client_id_is_valid() {
        let payload: IntakeSubmission =
            serde_json::from_value(json!({ "client_id": "A1B2C3" })).unwrap();

        assert_eq!(payload.client_id.as_deref(), Some("A1B2C3"));
        assert_eq!(payload.fields.signature, "");
    }

    #[test]
    fn test_submission_without_client_id_deserializes_to_none() {
        let payload: IntakeSubmission = serde_json::from_value(json!({})).unwrap();

        assert!(payload.client_id.is_none());
    }

    #[test]
    fn test_client_login_request_accepts_camel_case_and_null() {
        let payload: ClientLoginRequest = serde_json::from_value(json!({
            "clientId": null,
            "mobile": "9001",
            "name": "Asha"
        }))
        .unwrap();

        assert!(payload.client_id.is_none());
        assert_eq!(payload.mobile.as_deref(), Some("9001"));
        assert_eq!(payload.name.as_deref(), Some("Asha"));
    }

    #[test]
    fn test_update_request_splits_form_id_from_patch() {
        let payload: AdminUpdateRequest = serde_json::from_value(json!({
            "form_id": 40,
            "id": 40,
            "client_id": "A1B2C3",
            "additional_notes": "reviewed"
        }))
        .unwrap();

        assert_eq!(payload.form_id, Some(40));
        assert_eq!(payload.patch.additional_notes.as_deref(), Some("reviewed"));

        let value = serde_json::to_value(&payload.patch).unwrap();
        assert!(value.get("client_id").is_none());
        assert!(value.get("id").is_none());
    }
}
