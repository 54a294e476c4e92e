//! Modèle de données

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};
use uuid::Uuid;

use crate::utils::input_validation::Email;
use crate::utils::password_utils::PWHash;

/// Role d'un utilisateur: Patient, Médecin ou Hôpital
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Hospital,
}

/// Every role, for operations open to any authenticated caller.
pub const ANY_ROLE: &[Role] = &[Role::Patient, Role::Doctor, Role::Hospital];

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Display,
        )]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }
    };
}

id_type!(
    /// Un identifiant unique d'identité (compte de connexion).
    IdentityID
);
id_type!(
    /// Un identifiant unique de profil patient.
    PatientID
);
id_type!(
    /// Un identifiant unique de profil médecin.
    DoctorID
);
id_type!(
    /// Un identifiant unique de profil hôpital.
    HospitalID
);
id_type!(AppointmentID);
id_type!(RecordID);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Cycle de validation d'un médecin par l'hôpital.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

/// Profil d'un patient. La date de naissance et le genre sont figés à la création.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("{first_name} {last_name}")]
pub struct Patient {
    pub id: PatientID,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    pub blood_group: Option<String>,
    pub allergies: Vec<String>,
    pub profile_picture: Option<String>,
    pub identity: Option<IdentityID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profil d'un médecin. Le numéro de licence est unique et figé.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("Dr. {first_name} {last_name} ({specialization})")]
pub struct Doctor {
    pub id: DoctorID,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub qualification: String,
    pub license_number: String,
    pub phone: String,
    pub email: String,
    pub department: String,
    pub experience: u32,
    pub consultation_fee: f64,
    pub availability: BTreeMap<String, String>,
    pub status: ApprovalStatus,
    pub profile_picture: Option<String>,
    pub identity: Option<IdentityID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    /// Copie publique du profil, sans lien vers le compte.
    pub fn public(&self) -> Doctor {
        Doctor {
            identity: None,
            ..self.clone()
        }
    }
}

/// Profil d'un hôpital. Le numéro d'enregistrement est unique et figé.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("{name}")]
pub struct Hospital {
    pub id: HospitalID,
    pub name: String,
    pub address: Address,
    pub phone: String,
    pub email: String,
    pub registration_number: String,
    pub departments: Vec<String>,
    pub profile_picture: Option<String>,
    pub identity: Option<IdentityID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Le profil rattaché à une identité. Exactement un des trois.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(tag = "kind", content = "profile", rename_all = "lowercase")]
pub enum Profile {
    Patient(Patient),
    Doctor(Doctor),
    Hospital(Hospital),
}

impl Profile {
    pub fn reference(&self) -> ProfileRef {
        match self {
            Profile::Patient(p) => ProfileRef::Patient(p.id),
            Profile::Doctor(d) => ProfileRef::Doctor(d.id),
            Profile::Hospital(h) => ProfileRef::Hospital(h.id),
        }
    }
}

/// Référence typée vers un profil: le genre du profil et son identifiant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ProfileRef {
    Patient(PatientID),
    Doctor(DoctorID),
    Hospital(HospitalID),
}

impl ProfileRef {
    pub fn role(&self) -> Role {
        match self {
            ProfileRef::Patient(_) => Role::Patient,
            ProfileRef::Doctor(_) => Role::Doctor,
            ProfileRef::Hospital(_) => Role::Hospital,
        }
    }
}

/// Le compte de connexion. Le rôle découle du profil lié et ne change jamais.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[display("{email}")]
pub struct Identity {
    pub id: IdentityID,
    pub email: Email,
    pub password: PWHash,
    pub role: Role,
    pub profile: ProfileRef,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(email: Email, password: PWHash, profile: ProfileRef) -> Self {
        Self {
            id: IdentityID::new(),
            email,
            password,
            role: profile.role(),
            profile,
            created_at: Utc::now(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
            profile: self.profile,
        }
    }
}

/// L'appelant authentifié d'une requête, tel que résolu depuis son jeton.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    pub id: IdentityID,
    pub role: Role,
    pub profile: ProfileRef,
}

#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("{date} {time} - {reason} [{status}]")]
pub struct Appointment {
    pub id: AppointmentID,
    pub patient: PatientID,
    pub doctor: DoctorID,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
    pub status: AppointmentStatus,
    pub advice: Option<String>,
    pub prescription: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_name: String,
    pub result: String,
    pub date: Option<NaiveDate>,
}

/// Un dossier médical rédigé par un médecin pour un patient.
#[derive(Debug, Serialize, Deserialize, Clone, Display)]
#[serde(rename_all = "camelCase")]
#[display("{diagnosis}")]
pub struct MedicalRecord {
    pub id: RecordID,
    pub patient: PatientID,
    pub doctor: DoctorID,
    pub appointment: Option<AppointmentID>,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub treatment: Option<String>,
    pub medications: Vec<Medication>,
    pub test_results: Vec<TestResult>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// La vue d'un compte renvoyée au client: jamais le haché du mot de passe.
#[derive(Debug, Serialize, Clone)]
pub struct Account {
    pub id: IdentityID,
    pub email: Email,
    pub role: Role,
    pub profile: Profile,
}

/// Résultat d'une inscription ou d'une connexion.
#[derive(Debug, Serialize, Clone)]
pub struct Session {
    pub token: String,
    pub user: Account,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: usize,
    pub total_doctors: usize,
    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub completed_appointments: usize,
    pub total_records: usize,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct HospitalOverview {
    pub patients: Vec<Patient>,
    pub doctors: Vec<Doctor>,
    pub appointments: Vec<Appointment>,
    pub records: Vec<MedicalRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::password_utils::hash;

    #[test]
    fn identity_role_follows_profile_kind() {
        let email = Email::try_from("doc@example.com").unwrap();
        let identity = Identity::new(email, hash("secret1").unwrap(), ProfileRef::Doctor(DoctorID::new()));
        assert_eq!(identity.role, Role::Doctor);
        assert_eq!(identity.principal().role, Role::Doctor);
    }

    #[test]
    fn profile_ref_serializes_kind_and_id() {
        let id = PatientID::new();
        let value = serde_json::to_value(ProfileRef::Patient(id)).unwrap();
        assert_eq!(value["kind"], "patient");
        assert_eq!(value["id"], id.to_string());
    }

    #[test]
    fn appointment_status_parses_lowercase() {
        assert_eq!("confirmed".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Confirmed);
        assert!("done".parse::<AppointmentStatus>().is_err());
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Pending);
    }

    #[test]
    fn gender_parses_capitalised_names() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("female".parse::<Gender>().is_err());
    }
}
