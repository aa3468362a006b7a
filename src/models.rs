//! Rows and wire shapes for the three store tables.
//!
//! The form sections are explicit records rather than free-form blobs:
//! unknown keys are dropped at deserialization and the protected columns
//! (`id`, `client_id`, `created_at`, `updated_at`) cannot travel inside a
//! patch because the patch types do not have them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    /// Salted argon2 hash in PHC string form, never plaintext.
    pub password: String,
}

#[derive(Serialize)]
pub struct NewAdmin<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientRecord {
    pub id: i64,
    pub client_id: String,
    pub name: String,
    pub mobile: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct NewClient<'a> {
    pub client_id: &'a str,
    pub name: &'a str,
    pub mobile: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BasicInfo {
    pub name: String,
    pub age: String,
    pub dob: String,
    pub gender: String,
    pub occupation: String,
    pub residence: String,
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PersonalSocial {
    pub marital: String,
    pub tongue: String,
    pub religion: String,
    pub family_type: String,
    pub members: String,
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ReferralInfo {
    pub source: String,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct InformantDetails {
    pub name: String,
    pub relation: String,
    pub duration: String,
    pub reliability: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DurationProgress {
    pub duration: String,
    pub course: String,
}

/// Everything a client controls on the case-history form. A resubmission
/// carries the whole set, so writing it is a full overwrite of these
/// columns and nothing else.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IntakeFields {
    pub basic_info: BasicInfo,
    pub personal_social: PersonalSocial,
    pub referral_info: ReferralInfo,
    pub informant_details: InformantDetails,
    pub presenting_concerns: String,
    pub duration_progress: DurationProgress,
    pub additional_notes: String,
    pub declaration: bool,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IntakeForm {
    pub id: i64,
    pub client_id: String,
    #[serde(flatten)]
    pub fields: IntakeFields,
    pub admin_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row shape for the submit upsert: the client's fields keyed by their id.
#[derive(Serialize)]
pub struct IntakeUpsert<'a> {
    pub client_id: &'a str,
    #[serde(flatten)]
    pub fields: &'a IntakeFields,
}

/// Per-section overwrite from the admin editor. Absent sections stay
/// untouched in the store.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IntakePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_info: Option<BasicInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_social: Option<PersonalSocial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_info: Option<ReferralInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub informant_details: Option<InformantDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenting_concerns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_progress: Option<DurationProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_signature: Option<String>,
}

/// What actually goes over the wire for an admin edit: the sanctioned
/// patch plus a fresh `updated_at` stamp and the pinned status.
#[derive(Serialize)]
pub struct IntakeUpdate<'a> {
    #[serde(flatten)]
    pub patch: &'a IntakePatch,
    pub updated_at: DateTime<Utc>,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct SignPatch<'a> {
    pub admin_signature: &'a str,
}

/// A client row flattened together with its form's identity, as the
/// directory screen consumes it.
#[derive(Serialize, Debug)]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub client: ClientRecord,
    pub form_id: Option<i64>,
    pub form_date: Option<DateTime<Utc>>,
}

/// The slice of `intake_forms` the directory join needs.
#[derive(Deserialize, Debug)]
pub struct FormStub {
    pub id: i64,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
}
