//! Credential helpers: client identifier generation, password hashing and
//! the idempotent seed-admin step run at startup.
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{info, warn};

use crate::{
    models::{Admin, NewAdmin},
    state::AppState,
    store::OnConflict,
};

const CLIENT_ID_BYTES: usize = 3;

/// Short client identifier: 3 random bytes, hex, uppercase. Collisions are
/// not checked against existing ids (16.7M combinations).
pub fn generate_client_id() -> String {
    let random_bytes: [u8; CLIENT_ID_BYTES] = rand::random();

    hex::encode(random_bytes).to_uppercase()
}

/// Salted argon2 hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;

    Ok(hash.to_string())
}

/// Constant-time verification against a stored PHC string. A stored value
/// that does not parse as one (e.g. legacy plaintext) never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Idempotent startup seeding: insert the configured admin unless a row
/// with that username already exists. Failures are logged, not fatal — the
/// login path can still seed lazily.
pub async fn seed_admin(state: &AppState) {
    let hash = match hash_password(&state.config.admin_password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Could not hash seed admin password: {e}");
            return;
        }
    };

    let row = NewAdmin {
        username: &state.config.admin_username,
        password: &hash,
    };

    match state
        .store
        .from("admins")
        .upsert::<Admin, _>(&row, "username", OnConflict::IgnoreDuplicates)
        .await
    {
        Ok(Some(_)) => info!("Admin account seeded"),
        Ok(None) => info!("Admin account already present"),
        Err(e) => warn!("Could not seed admin account: {e}"),
    }
}
