//! Stockage des données en mémoire, avec sauvegarde en JSON
//!
//! Les contraintes d'unicité (email, numéro de licence, numéro
//! d'enregistrement) sont garanties ici, au moment de l'écriture,
//! et non par une vérification préalable dans les services.

use crate::{
    models::{
        Appointment, AppointmentID, Doctor, DoctorID, Hospital, HospitalID, Identity, IdentityID,
        MedicalRecord, Patient, PatientID, Profile, ProfileRef, RecordID,
    },
    utils::input_validation::Email,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{self, ErrorKind::NotFound},
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DBError {
    #[error("Invalid identity ID: {0}")]
    InvalidIdentityID(IdentityID),
    #[error("Invalid patient ID: {0}")]
    InvalidPatientID(PatientID),
    #[error("Invalid doctor ID: {0}")]
    InvalidDoctorID(DoctorID),
    #[error("Invalid hospital ID: {0}")]
    InvalidHospitalID(HospitalID),
    #[error("Invalid appointment ID: {0}")]
    InvalidAppointmentID(AppointmentID),
    #[error("Invalid record ID: {0}")]
    InvalidRecordID(RecordID),
    #[error("Email already registered: {0}")]
    EmailTaken(Email),
    #[error("License number already registered: {0}")]
    LicenseTaken(String),
    #[error("Registration number already registered: {0}")]
    RegistrationTaken(String),
    #[error("Identity does not point to the given profile")]
    ProfileMismatch,
}

/// Le stockage de documents utilisé par les services.
///
/// Chaque écriture est atomique pour un document; `create_account`
/// l'est pour le couple profil + identité.
pub trait Store {
    fn save(&self) -> Result<(), io::Error>;

    fn get_identity(&self, id: IdentityID) -> Result<&Identity, DBError>;
    fn lookup_email(&self, email: &Email) -> Option<&Identity>;

    /// Crée le profil puis l'identité qui le référence, et lie le profil
    /// à l'identité. Si une étape échoue, rien n'est conservé.
    fn create_account(&mut self, identity: Identity, profile: Profile) -> Result<(), DBError>;

    fn get_patient(&self, id: PatientID) -> Result<&Patient, DBError>;
    fn get_patient_mut(&mut self, id: PatientID) -> Result<&mut Patient, DBError>;
    fn list_patients(&self) -> Vec<&Patient>;

    fn get_doctor(&self, id: DoctorID) -> Result<&Doctor, DBError>;
    fn get_doctor_mut(&mut self, id: DoctorID) -> Result<&mut Doctor, DBError>;
    fn lookup_license(&self, license_number: &str) -> Option<&Doctor>;
    fn list_doctors(&self) -> Vec<&Doctor>;

    fn get_hospital(&self, id: HospitalID) -> Result<&Hospital, DBError>;
    fn get_hospital_mut(&mut self, id: HospitalID) -> Result<&mut Hospital, DBError>;
    fn lookup_registration(&self, registration_number: &str) -> Option<&Hospital>;

    fn get_appointment(&self, id: AppointmentID) -> Result<&Appointment, DBError>;
    fn get_appointment_mut(&mut self, id: AppointmentID) -> Result<&mut Appointment, DBError>;
    fn store_appointment(&mut self, appointment: Appointment);
    fn list_appointments(&self) -> Vec<&Appointment>;

    fn get_record(&self, id: RecordID) -> Result<&MedicalRecord, DBError>;
    fn get_record_mut(&mut self, id: RecordID) -> Result<&mut MedicalRecord, DBError>;
    fn store_record(&mut self, record: MedicalRecord);
    fn list_records(&self) -> Vec<&MedicalRecord>;

    /// Charge le profil pointé par une référence.
    fn get_profile(&self, reference: ProfileRef) -> Result<Profile, DBError> {
        Ok(match reference {
            ProfileRef::Patient(id) => Profile::Patient(self.get_patient(id)?.clone()),
            ProfileRef::Doctor(id) => Profile::Doctor(self.get_doctor(id)?.clone()),
            ProfileRef::Hospital(id) => Profile::Hospital(self.get_hospital(id)?.clone()),
        })
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct Database {
    #[serde(skip)]
    path: Option<PathBuf>,
    identities: HashMap<IdentityID, Identity>,
    patients: HashMap<PatientID, Patient>,
    doctors: HashMap<DoctorID, Doctor>,
    hospitals: HashMap<HospitalID, Hospital>,
    appointments: HashMap<AppointmentID, Appointment>,
    records: HashMap<RecordID, MedicalRecord>,
}

impl Database {
    /// Une base purement en mémoire, jamais sauvegardée.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: PathBuf) -> Result<Self, io::Error> {
        match File::open(&path) {
            // File successfuly opened
            Ok(f) => {
                let mut db: Self = serde_json::from_reader(f)?;
                db.path = Some(path);
                Ok(db)
            }

            // Fichier non existant, on le crée
            Err(not_found) if not_found.kind() == NotFound => {
                info!("DB file not found, creating new empty DB");
                let new_db = Database {
                    path: Some(path),
                    ..Default::default()
                };

                // On vérifie la sauvegarde immédiatement pour diminuer le risque de perte de données
                new_db.save()?;
                Ok(new_db)
            }

            // Autre erreur d'IO, on s'arrête
            Err(other) => Err(other),
        }
    }

    fn insert_profile(&mut self, profile: Profile) -> Result<(), DBError> {
        match profile {
            Profile::Patient(patient) => {
                self.patients.insert(patient.id, patient);
            }
            Profile::Doctor(doctor) => {
                if self.lookup_license(&doctor.license_number).is_some() {
                    return Err(DBError::LicenseTaken(doctor.license_number));
                }
                self.doctors.insert(doctor.id, doctor);
            }
            Profile::Hospital(hospital) => {
                if self.lookup_registration(&hospital.registration_number).is_some() {
                    return Err(DBError::RegistrationTaken(hospital.registration_number));
                }
                self.hospitals.insert(hospital.id, hospital);
            }
        }
        Ok(())
    }

    fn insert_identity(&mut self, identity: Identity) -> Result<(), DBError> {
        if self.lookup_email(&identity.email).is_some() {
            return Err(DBError::EmailTaken(identity.email));
        }
        self.identities.insert(identity.id, identity);
        Ok(())
    }

    fn remove_profile(&mut self, reference: ProfileRef) {
        match reference {
            ProfileRef::Patient(id) => {
                self.patients.remove(&id);
            }
            ProfileRef::Doctor(id) => {
                self.doctors.remove(&id);
            }
            ProfileRef::Hospital(id) => {
                self.hospitals.remove(&id);
            }
        }
    }

    fn link_profile(&mut self, reference: ProfileRef, identity: IdentityID) -> Result<(), DBError> {
        match reference {
            ProfileRef::Patient(id) => self.get_patient_mut(id)?.identity = Some(identity),
            ProfileRef::Doctor(id) => self.get_doctor_mut(id)?.identity = Some(identity),
            ProfileRef::Hospital(id) => self.get_hospital_mut(id)?.identity = Some(identity),
        }
        Ok(())
    }
}

impl Store for Database {
    fn save(&self) -> Result<(), io::Error> {
        if let Some(path) = &self.path {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, self)?;
        }
        Ok(())
    }

    fn get_identity(&self, id: IdentityID) -> Result<&Identity, DBError> {
        self.identities
            .get(&id)
            .ok_or(DBError::InvalidIdentityID(id))
    }

    fn lookup_email(&self, email: &Email) -> Option<&Identity> {
        self.identities.values().find(|i| &i.email == email)
    }

    fn create_account(&mut self, identity: Identity, profile: Profile) -> Result<(), DBError> {
        let reference = profile.reference();
        if identity.profile != reference {
            return Err(DBError::ProfileMismatch);
        }

        self.insert_profile(profile)?;

        let identity_id = identity.id;
        if let Err(e) = self.insert_identity(identity) {
            warn!("Identity creation failed ({e}), removing orphan profile {reference:?}");
            self.remove_profile(reference);
            return Err(e);
        }

        self.link_profile(reference, identity_id)
    }

    fn get_patient(&self, id: PatientID) -> Result<&Patient, DBError> {
        self.patients.get(&id).ok_or(DBError::InvalidPatientID(id))
    }

    fn get_patient_mut(&mut self, id: PatientID) -> Result<&mut Patient, DBError> {
        self.patients
            .get_mut(&id)
            .ok_or(DBError::InvalidPatientID(id))
    }

    fn list_patients(&self) -> Vec<&Patient> {
        let mut patients: Vec<&Patient> = self.patients.values().collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        patients
    }

    fn get_doctor(&self, id: DoctorID) -> Result<&Doctor, DBError> {
        self.doctors.get(&id).ok_or(DBError::InvalidDoctorID(id))
    }

    fn get_doctor_mut(&mut self, id: DoctorID) -> Result<&mut Doctor, DBError> {
        self.doctors.get_mut(&id).ok_or(DBError::InvalidDoctorID(id))
    }

    fn lookup_license(&self, license_number: &str) -> Option<&Doctor> {
        self.doctors
            .values()
            .find(|d| d.license_number == license_number)
    }

    fn list_doctors(&self) -> Vec<&Doctor> {
        let mut doctors: Vec<&Doctor> = self.doctors.values().collect();
        doctors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        doctors
    }

    fn get_hospital(&self, id: HospitalID) -> Result<&Hospital, DBError> {
        self.hospitals
            .get(&id)
            .ok_or(DBError::InvalidHospitalID(id))
    }

    fn get_hospital_mut(&mut self, id: HospitalID) -> Result<&mut Hospital, DBError> {
        self.hospitals
            .get_mut(&id)
            .ok_or(DBError::InvalidHospitalID(id))
    }

    fn lookup_registration(&self, registration_number: &str) -> Option<&Hospital> {
        self.hospitals
            .values()
            .find(|h| h.registration_number == registration_number)
    }

    fn get_appointment(&self, id: AppointmentID) -> Result<&Appointment, DBError> {
        self.appointments
            .get(&id)
            .ok_or(DBError::InvalidAppointmentID(id))
    }

    fn get_appointment_mut(&mut self, id: AppointmentID) -> Result<&mut Appointment, DBError> {
        self.appointments
            .get_mut(&id)
            .ok_or(DBError::InvalidAppointmentID(id))
    }

    fn store_appointment(&mut self, appointment: Appointment) {
        self.appointments.insert(appointment.id, appointment);
    }

    fn list_appointments(&self) -> Vec<&Appointment> {
        let mut appointments: Vec<&Appointment> = self.appointments.values().collect();
        appointments.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        appointments
    }

    fn get_record(&self, id: RecordID) -> Result<&MedicalRecord, DBError> {
        self.records.get(&id).ok_or(DBError::InvalidRecordID(id))
    }

    fn get_record_mut(&mut self, id: RecordID) -> Result<&mut MedicalRecord, DBError> {
        self.records.get_mut(&id).ok_or(DBError::InvalidRecordID(id))
    }

    fn store_record(&mut self, record: MedicalRecord) {
        self.records.insert(record.id, record);
    }

    fn list_records(&self) -> Vec<&MedicalRecord> {
        let mut records: Vec<&MedicalRecord> = self.records.values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Role};
    use crate::utils::password_utils::hash;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn doctor(license: &str) -> Doctor {
        let now = Utc::now();
        Doctor {
            id: DoctorID::new(),
            first_name: "Gregory".into(),
            last_name: "House".into(),
            specialization: "Diagnostics".into(),
            qualification: "MD".into(),
            license_number: license.into(),
            phone: "555-0100".into(),
            email: "house@example.com".into(),
            department: "Medicine".into(),
            experience: 20,
            consultation_fee: 150.0,
            availability: BTreeMap::new(),
            status: ApprovalStatus::Pending,
            profile_picture: None,
            identity: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn account(email: &str, license: &str) -> (Identity, Profile) {
        let doctor = doctor(license);
        let identity = Identity::new(
            Email::try_from(email).unwrap(),
            hash("secret1").unwrap(),
            ProfileRef::Doctor(doctor.id),
        );
        (identity, Profile::Doctor(doctor))
    }

    #[test]
    fn test_create_account_links_both_ways() {
        let mut db = Database::in_memory();
        let (identity, profile) = account("house@example.com", "LIC1");
        let identity_id = identity.id;
        let reference = identity.profile;

        db.create_account(identity, profile).unwrap();

        let stored = db.get_identity(identity_id).unwrap();
        assert_eq!(stored.role, Role::Doctor);
        let ProfileRef::Doctor(doctor) = reference else {
            panic!("expected a doctor reference");
        };
        assert_eq!(db.get_doctor(doctor).unwrap().identity, Some(identity_id));
    }

    #[test]
    fn test_duplicate_email_rolls_back_profile() {
        let mut db = Database::in_memory();
        let (identity, profile) = account("house@example.com", "LIC1");
        db.create_account(identity, profile).unwrap();

        let (identity, profile) = account("HOUSE@example.com", "LIC2");
        let result = db.create_account(identity, profile);

        assert!(matches!(result, Err(DBError::EmailTaken(_))));
        assert!(db.lookup_license("LIC2").is_none(), "orphan profile was kept");
        assert_eq!(db.list_doctors().len(), 1);
    }

    #[test]
    fn test_duplicate_license_creates_nothing() {
        let mut db = Database::in_memory();
        let (identity, profile) = account("house@example.com", "LIC1");
        db.create_account(identity, profile).unwrap();

        let (identity, profile) = account("wilson@example.com", "LIC1");
        let email = identity.email.clone();
        assert_eq!(
            db.create_account(identity, profile),
            Err(DBError::LicenseTaken("LIC1".into()))
        );
        assert!(db.lookup_email(&email).is_none());
    }

    #[test]
    fn test_mismatched_profile_is_refused() {
        let mut db = Database::in_memory();
        let (identity, _) = account("house@example.com", "LIC1");
        let (_, other_profile) = account("house@example.com", "LIC2");
        assert_eq!(
            db.create_account(identity, other_profile),
            Err(DBError::ProfileMismatch)
        );
    }

    #[test]
    fn test_unknown_ids_are_reported() {
        let db = Database::in_memory();
        let id = AppointmentID::new();
        assert_eq!(
            db.get_appointment(id).err(),
            Some(DBError::InvalidAppointmentID(id))
        );
    }

    #[test]
    fn test_json_round_trip_keeps_accounts() {
        let mut db = Database::in_memory();
        let (identity, profile) = account("house@example.com", "LIC1");
        let identity_id = identity.id;
        db.create_account(identity, profile).unwrap();

        let json = serde_json::to_string(&db).unwrap();
        let restored: Database = serde_json::from_str(&json).unwrap();
        assert!(restored.get_identity(identity_id).is_ok());
        assert!(restored.lookup_license("LIC1").is_some());
    }
}
