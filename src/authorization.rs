//! Wrapper d'appel à Casbin pour la vérification statique
//! des conventions objet-action

use casbin::{CoreApi, DefaultModel, MemoryAdapter, MgmtApi};
use log::{debug, error, info};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::{
    Appointment, DoctorID, MedicalRecord, Patient, PatientID, Principal, ProfileRef,
};

const MODEL: &str = include_str!("../access_control/model.conf");
const POLICY: &str = include_str!("../access_control/policy.csv");

/// Un enforcer Casbin
pub struct Enforcer(casbin::Enforcer);

type CasbinResult = Result<(), AccessDenied>;

/// Une erreur sans détails en cas d'accès refusé
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not authorized")]
pub struct AccessDenied;

/// Un contexte contenant une référence à un enforcer et à un sujet.
pub struct Context<'ctx> {
    enforcer: &'ctx Enforcer,
    subject: &'ctx Principal,
}

/// Lit les lignes `p, action, règle` de la politique. La règle peut
/// elle-même contenir des virgules.
fn parse_policy(policy: &str) -> Vec<Vec<String>> {
    policy
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.splitn(3, ',').map(str::trim);
            match (fields.next(), fields.next(), fields.next()) {
                (Some("p"), Some(act), Some(rule)) => Some(vec![act.to_string(), rule.to_string()]),
                _ => {
                    error!("Ignoring malformed policy line: {line}");
                    None
                }
            }
        })
        .collect()
}

/// La paire patient/médecin qui détermine la propriété d'un rendez-vous ou d'un dossier
#[derive(Debug, Serialize, Hash)]
struct Ownership {
    patient: PatientID,
    doctor: DoctorID,
}

fn ownership(patient: PatientID, doctor: DoctorID) -> Ownership {
    Ownership { patient, doctor }
}

#[derive(Debug, Serialize, Hash)]
struct PatientObject {
    id: PatientID,
}

/// Objet vide, pour les actions qui ne portent pas sur un document
#[derive(Debug, Serialize, Hash)]
struct Unscoped {}

impl Enforcer {
    pub fn load() -> Result<Self, casbin::Error> {
        futures::executor::block_on(async {
            let model = DefaultModel::from_str(MODEL).await?;
            let mut enforcer = casbin::Enforcer::new(model, MemoryAdapter::default()).await?;
            enforcer.add_policies(parse_policy(POLICY)).await?;
            Ok::<_, casbin::Error>(Enforcer(enforcer))
        })
    }

    pub fn with_subject<'ctx>(&'ctx self, subject: &'ctx Principal) -> Context<'ctx> {
        Context {
            enforcer: self,
            subject,
        }
    }
}

impl Context<'_> {
    fn enforce<O>(&self, object: O, action: &str) -> CasbinResult
    where
        O: Serialize + std::fmt::Debug + std::hash::Hash,
    {
        let subject = self.subject;

        debug!(
            "Enforcing {}",
            json!({ "sub": subject, "obj": &object, "act": action })
        );

        match self.enforcer.0.enforce((subject, &object, action)) {
            Err(e) => {
                error!("Casbin error: {e:?}");
                Err(AccessDenied)
            }
            Ok(true) => {
                debug!("{} {:?} on {action}: granted", subject.role, subject.id);
                Ok(())
            }
            Ok(false) => {
                info!("{} {:?} on {action}: denied", subject.role, subject.id);
                Err(AccessDenied)
            }
        }
    }

    pub fn book_appointment(&self, appointment: &Appointment) -> CasbinResult {
        self.enforce(
            ownership(appointment.patient, appointment.doctor),
            "book-appointment",
        )
    }

    pub fn read_appointment(&self, appointment: &Appointment) -> CasbinResult {
        self.enforce(
            ownership(appointment.patient, appointment.doctor),
            "read-appointment",
        )
    }

    pub fn update_appointment(&self, appointment: &Appointment) -> CasbinResult {
        self.enforce(
            ownership(appointment.patient, appointment.doctor),
            "update-appointment",
        )
    }

    pub fn create_record(&self, record: &MedicalRecord) -> CasbinResult {
        self.enforce(ownership(record.patient, record.doctor), "create-record")
    }

    pub fn read_record(&self, record: &MedicalRecord) -> CasbinResult {
        self.enforce(ownership(record.patient, record.doctor), "read-record")
    }

    pub fn update_record(&self, record: &MedicalRecord) -> CasbinResult {
        self.enforce(ownership(record.patient, record.doctor), "update-record")
    }

    pub fn read_patient(&self, patient: &Patient) -> CasbinResult {
        self.enforce(PatientObject { id: patient.id }, "read-patient")
    }

    pub fn update_profile(&self, profile: ProfileRef) -> CasbinResult {
        self.enforce(profile, "update-profile")
    }

    pub fn moderate_doctor(&self) -> CasbinResult {
        self.enforce(Unscoped {}, "moderate-doctor")
    }

    pub fn read_overview(&self) -> CasbinResult {
        self.enforce(Unscoped {}, "read-overview")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::*;
    use chrono::{NaiveDate, Utc};

    /// Creates an enforcer to use within the test
    fn set_enforcer() -> Enforcer {
        Enforcer::load().expect("Error in loading Enforcer")
    }

    fn principal(profile: ProfileRef) -> Principal {
        Principal {
            id: IdentityID::new(),
            role: profile.role(),
            profile,
        }
    }

    fn create_test_appointment(patient: PatientID, doctor: DoctorID) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: AppointmentID::new(),
            patient,
            doctor,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: "10:00".into(),
            reason: "Checkup".into(),
            status: AppointmentStatus::Pending,
            advice: None,
            prescription: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn create_test_record(patient: PatientID, doctor: DoctorID) -> MedicalRecord {
        let now = Utc::now();
        MedicalRecord {
            id: RecordID::new(),
            patient,
            doctor,
            appointment: None,
            diagnosis: "Flu".into(),
            symptoms: vec!["fever".into()],
            treatment: None,
            medications: vec![],
            test_results: vec![],
            notes: None,
            follow_up_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn create_test_patient(id: PatientID) -> Patient {
        let now = Utc::now();
        Patient {
            id,
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: Gender::Female,
            phone: "555-0100".into(),
            address: Address::default(),
            emergency_contact: EmergencyContact::default(),
            blood_group: None,
            allergies: vec![],
            profile_picture: None,
            identity: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_policy_parsing_keeps_rules_with_commas() {
        let rules = parse_policy("# comment\n\np, act, a == \"x, y\" && b\nbroken line\n");
        assert_eq!(rules, vec![vec!["act".to_string(), "a == \"x, y\" && b".to_string()]]);
    }

    #[test]
    fn test_patient_appointment_scoping() {
        let enforcer = set_enforcer();
        let (me, other) = (PatientID::new(), PatientID::new());
        let doctor = DoctorID::new();
        let subject = principal(ProfileRef::Patient(me));
        let context = enforcer.with_subject(&subject);

        let mine = create_test_appointment(me, doctor);
        let theirs = create_test_appointment(other, doctor);

        assert!(context.book_appointment(&mine).is_ok(), "Patient should book for themselves");
        assert!(context.book_appointment(&theirs).is_err(), "Patient booked for someone else");
        assert!(context.read_appointment(&mine).is_ok());
        assert!(context.read_appointment(&theirs).is_err());
        assert!(
            context.update_appointment(&mine).is_err(),
            "Patient should not update appointment status"
        );
    }

    #[test]
    fn test_doctor_ownership() {
        let enforcer = set_enforcer();
        let (me, other) = (DoctorID::new(), DoctorID::new());
        let patient = PatientID::new();
        let subject = principal(ProfileRef::Doctor(me));
        let context = enforcer.with_subject(&subject);

        let mine = create_test_appointment(patient, me);
        let theirs = create_test_appointment(patient, other);
        assert!(context.update_appointment(&mine).is_ok());
        assert!(context.update_appointment(&theirs).is_err());
        assert!(context.read_appointment(&theirs).is_err());
        assert!(context.book_appointment(&mine).is_err(), "Doctor should not book");

        let my_record = create_test_record(patient, me);
        let their_record = create_test_record(patient, other);
        assert!(context.create_record(&my_record).is_ok());
        assert!(context.create_record(&their_record).is_err());
        assert!(context.update_record(&my_record).is_ok());
        assert!(context.update_record(&their_record).is_err());
        assert!(context.read_record(&their_record).is_err());

        assert!(context.read_patient(&create_test_patient(patient)).is_ok());
        assert!(context.moderate_doctor().is_err());
        assert!(context.read_overview().is_err());
    }

    #[test]
    fn test_hospital_reads_everything_but_mutates_nothing_clinical() {
        let enforcer = set_enforcer();
        let subject = principal(ProfileRef::Hospital(HospitalID::new()));
        let context = enforcer.with_subject(&subject);

        let appointment = create_test_appointment(PatientID::new(), DoctorID::new());
        let record = create_test_record(PatientID::new(), DoctorID::new());

        assert!(context.read_appointment(&appointment).is_ok());
        assert!(context.read_record(&record).is_ok());
        assert!(context.read_patient(&create_test_patient(PatientID::new())).is_ok());
        assert!(context.moderate_doctor().is_ok());
        assert!(context.read_overview().is_ok());

        assert!(context.update_appointment(&appointment).is_err());
        assert!(context.update_record(&record).is_err());
        assert!(context.create_record(&record).is_err());
    }

    #[test]
    fn test_profile_updates_only_on_own_profile() {
        let enforcer = set_enforcer();
        let me = PatientID::new();
        let subject = principal(ProfileRef::Patient(me));
        let context = enforcer.with_subject(&subject);

        assert!(context.update_profile(ProfileRef::Patient(me)).is_ok());
        assert!(context.update_profile(ProfileRef::Patient(PatientID::new())).is_err());
        assert!(
            context.read_patient(&create_test_patient(me)).is_err(),
            "Patients read their own profile through my_profile, not by id"
        );
    }
}
