//! Tests for the domain user model.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn user_id() -> UserId {
    UserId::new("kV2nWq8ZtYb3").expect("valid id")
}

#[rstest]
#[case("", UserValidationError::EmptyId)]
#[case(" padded ", UserValidationError::InvalidId)]
#[case("users/abc", UserValidationError::InvalidId)]
fn user_id_rejects_unusable_keys(#[case] raw: &str, #[case] expected: UserValidationError) {
    assert_eq!(UserId::new(raw), Err(expected));
}

#[rstest]
fn user_id_deserialises_through_validation() {
    let err = serde_json::from_value::<UserId>(json!("")).expect_err("empty id");
    assert!(err.to_string().contains("must not be empty"));
}

#[rstest]
#[case("", UserValidationError::EmptyEmail)]
#[case("not-an-address", UserValidationError::InvalidEmail)]
fn email_rejects_malformed_values(#[case] raw: &str, #[case] expected: UserValidationError) {
    assert_eq!(Email::new(raw), Err(expected));
}

#[rstest]
fn email_trims_input() {
    let email = Email::new("  ada@example.com ").expect("valid email");
    assert_eq!(email.as_ref(), "ada@example.com");
}

#[rstest]
#[case("patient", Role::Patient, Collection::Patients)]
#[case("caretaker", Role::Caretaker, Collection::Caretakers)]
fn roles_map_to_their_partition(
    #[case] raw: &str,
    #[case] role: Role,
    #[case] partition: Collection,
) {
    let parsed: Role = raw.parse().expect("recognised role");
    assert_eq!(parsed, role);
    assert_eq!(parsed.partition(), partition);
    assert_eq!(parsed.to_string(), raw);
}

#[rstest]
#[case("admin")]
#[case("Patient")]
#[case("")]
fn unrecognised_roles_are_rejected(#[case] raw: &str) {
    let err = raw.parse::<Role>().expect_err("role must be rejected");
    assert_eq!(err.value, raw);
}

#[rstest]
fn stored_roles_fall_back_to_caretaker() {
    assert_eq!(Role::from_stored("doctor"), Role::Caretaker);
    assert_eq!(Role::from_stored("patient"), Role::Patient);
}

#[rstest]
fn user_record_decodes_stored_fields(user_id: UserId) {
    let fields = json!({
        "email": "ada@example.com",
        "userType": "patient",
        "createdAt": "2026-03-01T10:00:00Z",
    });
    let record = UserRecord::from_fields(user_id.clone(), fields.as_object().expect("object"));

    assert_eq!(record.id, user_id);
    assert_eq!(record.email, "ada@example.com");
    assert_eq!(record.role, Role::Patient);
    assert_eq!(
        record.created_at.map(|ts| ts.to_rfc3339()),
        Some("2026-03-01T10:00:00+00:00".to_owned())
    );
}

#[rstest]
fn user_record_without_role_resolves_to_caretaker(user_id: UserId) {
    let fields = json!({ "email": "ada@example.com" });
    let record = UserRecord::from_fields(user_id, fields.as_object().expect("object"));
    assert_eq!(record.role, Role::Caretaker);
}

#[rstest]
fn profile_registration_fields_override_denormalised_keys(user_id: UserId) {
    let payload = json!({
        "email": "ada@example.com",
        "uid": "spoofed",
        "userType": "caretaker",
        "bloodType": "O+",
    });
    let fields = ProfileDocument::registration_fields(
        &user_id,
        Role::Patient,
        payload.as_object().cloned().expect("object"),
    );

    assert_eq!(fields.get(UID_FIELD), Some(&json!("kV2nWq8ZtYb3")));
    assert_eq!(fields.get(ROLE_FIELD), Some(&json!("patient")));
    assert_eq!(fields.get("bloodType"), Some(&json!("O+")));
}

#[rstest]
fn profile_document_exposes_created_at(user_id: UserId) {
    let fields = json!({ "createdAt": "2026-03-01T10:00:00Z", "name": "Ada" });
    let profile = ProfileDocument::new(
        user_id,
        Role::Caretaker,
        fields.as_object().cloned().expect("object"),
    );

    assert!(profile.created_at().is_some());
    assert_eq!(profile.get("name"), Some(&json!("Ada")));
    assert_eq!(profile.id().as_ref(), "kV2nWq8ZtYb3");
    assert_eq!(profile.fields().len(), 2);
    assert!(profile.into_fields().contains_key("createdAt"));
}
