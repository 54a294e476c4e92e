//! Requêtes reçues par les services et leur validation champ par champ.
//!
//! Les noms de champs suivent le format JSON des clients (camelCase).
//! Les champs absents d'une requête prennent leur valeur par défaut et
//! sont ensuite signalés par la validation s'ils étaient obligatoires.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::models::{
    Address, Appointment, AppointmentID, AppointmentStatus, ApprovalStatus, Doctor, DoctorID,
    EmergencyContact, Gender, Hospital, HospitalID, MedicalRecord, Medication, Patient, PatientID,
    Profile, RecordID, TestResult,
};
use crate::utils::input_validation::{
    parse_date, validate_phone, Email, Password, ValidationErrors,
};

const DEFAULT_QUALIFICATION: &str = "Not specified";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterPatient {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub phone: String,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    pub blood_group: Option<String>,
    pub allergies: Vec<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterDoctor {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub qualification: Option<String>,
    pub license_number: String,
    pub phone: String,
    pub department: String,
    pub experience: Option<u32>,
    pub consultation_fee: Option<f64>,
    pub availability: BTreeMap<String, String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterHospital {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub registration_number: String,
    pub address: Address,
    pub departments: Vec<String>,
    pub profile_picture: Option<String>,
}

/// Une demande d'inscription, pour l'un des trois rôles
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Registration {
    Patient(RegisterPatient),
    Doctor(RegisterDoctor),
    Hospital(RegisterHospital),
}

/// Une inscription validée, prête à être stockée
#[derive(Debug)]
pub struct NewAccount {
    pub email: Email,
    pub password: Password,
    pub profile: Profile,
}

fn credentials(
    errors: &mut ValidationErrors,
    email: &str,
    password: String,
) -> (Option<Email>, Option<Password>) {
    let email = errors.capture("email", Email::try_from(email));
    let password = errors.capture("password", Password::try_from(password));
    (email, password)
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

impl Registration {
    /// Valide tous les champs et construit le profil. Toutes les erreurs
    /// sont rapportées ensemble.
    pub fn validate(self) -> Result<NewAccount, ValidationErrors> {
        match self {
            Registration::Patient(p) => p.validate(),
            Registration::Doctor(d) => d.validate(),
            Registration::Hospital(h) => h.validate(),
        }
    }
}

impl RegisterPatient {
    fn validate(self) -> Result<NewAccount, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let (email, password) = credentials(&mut errors, &self.email, self.password);
        errors.require("firstName", &self.first_name, "First name is required");
        errors.require("lastName", &self.last_name, "Last name is required");
        let date_of_birth = errors.capture(
            "dateOfBirth",
            parse_date(&self.date_of_birth)
                .map_err(|_| "Please provide a valid date of birth"),
        );
        let gender = errors.capture(
            "gender",
            self.gender
                .trim()
                .parse::<Gender>()
                .map_err(|_| "Please select a valid gender"),
        );
        errors.capture("phone", validate_phone(&self.phone));

        match (email, password, date_of_birth, gender) {
            (Some(email), Some(password), Some(date_of_birth), Some(gender))
                if errors.is_empty() =>
            {
                let now = Utc::now();
                let patient = Patient {
                    id: PatientID::new(),
                    first_name: trimmed(&self.first_name),
                    last_name: trimmed(&self.last_name),
                    date_of_birth,
                    gender,
                    phone: trimmed(&self.phone),
                    address: self.address,
                    emergency_contact: self.emergency_contact,
                    blood_group: self.blood_group,
                    allergies: self.allergies,
                    profile_picture: self.profile_picture,
                    identity: None,
                    created_at: now,
                    updated_at: now,
                };
                Ok(NewAccount {
                    email,
                    password,
                    profile: Profile::Patient(patient),
                })
            }
            _ => Err(errors),
        }
    }
}

impl RegisterDoctor {
    fn validate(self) -> Result<NewAccount, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let (email, password) = credentials(&mut errors, &self.email, self.password);
        errors.require("firstName", &self.first_name, "First name is required");
        errors.require("lastName", &self.last_name, "Last name is required");
        errors.require("specialization", &self.specialization, "Specialization is required");
        errors.require("licenseNumber", &self.license_number, "License number is required");
        errors.capture("phone", validate_phone(&self.phone));
        errors.require("department", &self.department, "Department is required");
        if self.consultation_fee.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
            errors.add("consultationFee", "Consultation fee must be a positive amount");
        }

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => {
                let now = Utc::now();
                let doctor = Doctor {
                    id: DoctorID::new(),
                    first_name: trimmed(&self.first_name),
                    last_name: trimmed(&self.last_name),
                    specialization: trimmed(&self.specialization),
                    qualification: self
                        .qualification
                        .filter(|q| !q.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_QUALIFICATION.to_string()),
                    license_number: trimmed(&self.license_number),
                    phone: trimmed(&self.phone),
                    email: email.to_string(),
                    department: trimmed(&self.department),
                    experience: self.experience.unwrap_or(0),
                    consultation_fee: self.consultation_fee.unwrap_or(0.0),
                    availability: self.availability,
                    status: ApprovalStatus::Pending,
                    profile_picture: self.profile_picture,
                    identity: None,
                    created_at: now,
                    updated_at: now,
                };
                Ok(NewAccount {
                    email,
                    password,
                    profile: Profile::Doctor(doctor),
                })
            }
            _ => Err(errors),
        }
    }
}

impl RegisterHospital {
    fn validate(self) -> Result<NewAccount, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let (email, password) = credentials(&mut errors, &self.email, self.password);
        errors.require("name", &self.name, "Hospital name is required");
        errors.capture("phone", validate_phone(&self.phone));
        errors.require(
            "registrationNumber",
            &self.registration_number,
            "Registration number is required",
        );

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => {
                let now = Utc::now();
                let hospital = Hospital {
                    id: HospitalID::new(),
                    name: trimmed(&self.name),
                    address: self.address,
                    phone: trimmed(&self.phone),
                    email: email.to_string(),
                    registration_number: trimmed(&self.registration_number),
                    departments: self.departments,
                    profile_picture: self.profile_picture,
                    identity: None,
                    created_at: now,
                    updated_at: now,
                };
                Ok(NewAccount {
                    email,
                    password,
                    profile: Profile::Hospital(hospital),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Demande de rendez-vous par un patient.
///
/// `patient_id` est accepté mais ignoré: le rendez-vous est toujours
/// pris pour le profil de l'appelant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookAppointment {
    pub doctor_id: Option<DoctorID>,
    pub patient_id: Option<PatientID>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: String,
}

impl BookAppointment {
    pub fn into_appointment(self, patient: PatientID) -> Result<Appointment, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.doctor_id.is_none() {
            errors.add("doctorId", "Doctor is required");
        }
        let date = errors.capture(
            "appointmentDate",
            parse_date(&self.appointment_date).map_err(|_| "Please provide a valid appointment date"),
        );
        errors.require("appointmentTime", &self.appointment_time, "Appointment time is required");
        errors.require("reason", &self.reason, "Reason is required");

        match (self.doctor_id, date) {
            (Some(doctor), Some(date)) if errors.is_empty() => {
                let now = Utc::now();
                Ok(Appointment {
                    id: AppointmentID::new(),
                    patient,
                    doctor,
                    date,
                    time: trimmed(&self.appointment_time),
                    reason: trimmed(&self.reason),
                    status: AppointmentStatus::Pending,
                    advice: None,
                    prescription: None,
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    pub status: String,
}

impl StatusUpdate {
    pub fn new(status: AppointmentStatus) -> Self {
        Self {
            status: status.to_string().to_lowercase(),
        }
    }

    pub fn validate(&self) -> Result<AppointmentStatus, ValidationErrors> {
        self.status.trim().parse::<AppointmentStatus>().map_err(|_| {
            let mut errors = ValidationErrors::default();
            errors.add(
                "status",
                "Status must be one of pending, confirmed, completed, cancelled",
            );
            errors
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdviceSubmission {
    pub advice: String,
    pub prescription: Option<String>,
}

impl AdviceSubmission {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("advice", &self.advice, "Advice is required");
        errors.into_result()
    }
}

/// Création d'un dossier médical par un médecin.
///
/// `doctor_id` est accepté mais ignoré: le dossier est toujours
/// attribué au médecin appelant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMedicalRecord {
    pub patient_id: Option<PatientID>,
    pub doctor_id: Option<DoctorID>,
    pub appointment_id: Option<AppointmentID>,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub treatment: Option<String>,
    pub medications: Vec<Medication>,
    pub test_results: Vec<TestResult>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl NewMedicalRecord {
    pub fn into_record(self, doctor: DoctorID) -> Result<MedicalRecord, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.patient_id.is_none() {
            errors.add("patientId", "Patient is required");
        }
        errors.require("diagnosis", &self.diagnosis, "Diagnosis is required");

        match self.patient_id {
            Some(patient) if errors.is_empty() => {
                let now = Utc::now();
                Ok(MedicalRecord {
                    id: RecordID::new(),
                    patient,
                    doctor,
                    appointment: self.appointment_id,
                    diagnosis: trimmed(&self.diagnosis),
                    symptoms: self.symptoms,
                    treatment: self.treatment,
                    medications: self.medications,
                    test_results: self.test_results,
                    notes: self.notes,
                    follow_up_date: self.follow_up_date,
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Modification des champs cliniques d'un dossier. Le patient et le
/// médecin d'un dossier ne changent jamais.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordPatch {
    pub appointment_id: Option<AppointmentID>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub treatment: Option<String>,
    pub medications: Option<Vec<Medication>>,
    pub test_results: Option<Vec<TestResult>>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl RecordPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(diagnosis) = &self.diagnosis {
            errors.require("diagnosis", diagnosis, "Diagnosis is required");
        }
        errors.into_result()
    }

    pub fn apply(self, record: &mut MedicalRecord) {
        if let Some(appointment) = self.appointment_id {
            record.appointment = Some(appointment);
        }
        if let Some(diagnosis) = self.diagnosis {
            record.diagnosis = trimmed(&diagnosis);
        }
        if let Some(symptoms) = self.symptoms {
            record.symptoms = symptoms;
        }
        if self.treatment.is_some() {
            record.treatment = self.treatment;
        }
        if let Some(medications) = self.medications {
            record.medications = medications;
        }
        if let Some(test_results) = self.test_results {
            record.test_results = test_results;
        }
        if self.notes.is_some() {
            record.notes = self.notes;
        }
        if self.follow_up_date.is_some() {
            record.follow_up_date = self.follow_up_date;
        }
        record.updated_at = Utc::now();
    }
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        errors.require(field, value, "This field cannot be empty");
    }
}

fn check_phone(errors: &mut ValidationErrors, value: &Option<String>) {
    if let Some(phone) = value {
        errors.capture("phone", validate_phone(phone));
    }
}

fn check_email(errors: &mut ValidationErrors, value: &Option<String>) -> Option<Email> {
    value
        .as_deref()
        .and_then(|email| errors.capture("email", Email::try_from(email)))
}

/// Modification de son profil par un patient. Date de naissance et
/// genre ne sont pas modifiables et sont ignorés s'ils sont fournis.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub blood_group: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub profile_picture: Option<String>,
}

impl PatientPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_name(&mut errors, "firstName", &self.first_name);
        check_name(&mut errors, "lastName", &self.last_name);
        check_phone(&mut errors, &self.phone);
        errors.into_result()
    }

    pub fn apply(self, patient: &mut Patient) {
        if let Some(first_name) = self.first_name {
            patient.first_name = trimmed(&first_name);
        }
        if let Some(last_name) = self.last_name {
            patient.last_name = trimmed(&last_name);
        }
        if let Some(phone) = self.phone {
            patient.phone = trimmed(&phone);
        }
        if let Some(address) = self.address {
            patient.address = address;
        }
        if let Some(contact) = self.emergency_contact {
            patient.emergency_contact = contact;
        }
        if self.blood_group.is_some() {
            patient.blood_group = self.blood_group;
        }
        if let Some(allergies) = self.allergies {
            patient.allergies = allergies;
        }
        if self.profile_picture.is_some() {
            patient.profile_picture = self.profile_picture;
        }
        patient.updated_at = Utc::now();
    }
}

/// Modification de son profil par un médecin. Le numéro de licence
/// n'est pas modifiable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub department: Option<String>,
    pub experience: Option<u32>,
    pub consultation_fee: Option<f64>,
    pub availability: Option<BTreeMap<String, String>>,
    pub profile_picture: Option<String>,
}

impl DoctorPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_name(&mut errors, "firstName", &self.first_name);
        check_name(&mut errors, "lastName", &self.last_name);
        check_phone(&mut errors, &self.phone);
        check_email(&mut errors, &self.email);
        check_name(&mut errors, "specialization", &self.specialization);
        check_name(&mut errors, "department", &self.department);
        if self.consultation_fee.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
            errors.add("consultationFee", "Consultation fee must be a positive amount");
        }
        errors.into_result()
    }

    pub fn apply(self, doctor: &mut Doctor) {
        if let Some(first_name) = self.first_name {
            doctor.first_name = trimmed(&first_name);
        }
        if let Some(last_name) = self.last_name {
            doctor.last_name = trimmed(&last_name);
        }
        if let Some(phone) = self.phone {
            doctor.phone = trimmed(&phone);
        }
        if let Some(email) = self.email.as_deref().and_then(|e| Email::try_from(e).ok()) {
            doctor.email = email.to_string();
        }
        if let Some(specialization) = self.specialization {
            doctor.specialization = trimmed(&specialization);
        }
        if let Some(qualification) = self.qualification {
            doctor.qualification = trimmed(&qualification);
        }
        if let Some(department) = self.department {
            doctor.department = trimmed(&department);
        }
        if let Some(experience) = self.experience {
            doctor.experience = experience;
        }
        if let Some(fee) = self.consultation_fee {
            doctor.consultation_fee = fee;
        }
        if let Some(availability) = self.availability {
            doctor.availability = availability;
        }
        if self.profile_picture.is_some() {
            doctor.profile_picture = self.profile_picture;
        }
        doctor.updated_at = Utc::now();
    }
}

/// Modification de son profil par un hôpital. Le numéro
/// d'enregistrement n'est pas modifiable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HospitalPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    pub departments: Option<Vec<String>>,
    pub profile_picture: Option<String>,
}

impl HospitalPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_name(&mut errors, "name", &self.name);
        check_phone(&mut errors, &self.phone);
        check_email(&mut errors, &self.email);
        errors.into_result()
    }

    pub fn apply(self, hospital: &mut Hospital) {
        if let Some(name) = self.name {
            hospital.name = trimmed(&name);
        }
        if let Some(phone) = self.phone {
            hospital.phone = trimmed(&phone);
        }
        if let Some(email) = self.email.as_deref().and_then(|e| Email::try_from(e).ok()) {
            hospital.email = email.to_string();
        }
        if let Some(address) = self.address {
            hospital.address = address;
        }
        if let Some(departments) = self.departments {
            hospital.departments = departments;
        }
        if self.profile_picture.is_some() {
            hospital.profile_picture = self.profile_picture;
        }
        hospital.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient_payload() -> RegisterPatient {
        RegisterPatient {
            email: "Jane@Example.com".into(),
            password: "secret1".into(),
            first_name: " Jane ".into(),
            last_name: "Doe".into(),
            date_of_birth: "1990-04-12".into(),
            gender: "Female".into(),
            phone: "555-0100".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_patient_registration_builds_profile() {
        let account = Registration::Patient(patient_payload()).validate().unwrap();
        assert_eq!(account.email.as_ref(), "jane@example.com");
        let Profile::Patient(patient) = account.profile else {
            panic!("expected a patient profile");
        };
        assert_eq!(patient.first_name, "Jane");
        assert_eq!(patient.gender, Gender::Female);
        assert!(patient.identity.is_none());
    }

    #[test]
    fn test_empty_patient_registration_lists_every_field() {
        let errors = Registration::Patient(RegisterPatient::default())
            .validate()
            .unwrap_err();
        for field in ["email", "password", "firstName", "lastName", "dateOfBirth", "gender", "phone"] {
            assert!(errors.has(field), "missing error for {field}: {errors:?}");
        }
    }

    #[test]
    fn test_doctor_registration_defaults() {
        let registration: Registration = serde_json::from_value(json!({
            "role": "doctor",
            "email": "house@example.com",
            "password": "secret1",
            "firstName": "Gregory",
            "lastName": "House",
            "specialization": "Diagnostics",
            "licenseNumber": "LIC1",
            "phone": "555-0100",
            "department": "Medicine",
        }))
        .unwrap();

        let Profile::Doctor(doctor) = registration.validate().unwrap().profile else {
            panic!("expected a doctor profile");
        };
        assert_eq!(doctor.status, ApprovalStatus::Pending);
        assert_eq!(doctor.qualification, "Not specified");
        assert_eq!(doctor.experience, 0);
        assert_eq!(doctor.consultation_fee, 0.0);
        assert_eq!(doctor.email, "house@example.com");
    }

    #[test]
    fn test_doctor_registration_requires_license_and_department() {
        let errors = Registration::Doctor(RegisterDoctor {
            email: "house@example.com".into(),
            password: "secret1".into(),
            first_name: "Gregory".into(),
            last_name: "House".into(),
            specialization: "Diagnostics".into(),
            phone: "555-0100".into(),
            ..Default::default()
        })
        .validate()
        .unwrap_err();

        assert!(errors.has("licenseNumber"));
        assert!(errors.has("department"));
        assert_eq!(errors.fields().len(), 2);
    }

    #[test]
    fn test_hospital_registration_requires_registration_number() {
        let errors = Registration::Hospital(RegisterHospital {
            email: "admin@general.org".into(),
            password: "short".into(),
            name: "General".into(),
            phone: "555-0100".into(),
            ..Default::default()
        })
        .validate()
        .unwrap_err();

        assert!(errors.has("registrationNumber"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_booking_ignores_supplied_patient() {
        let me = PatientID::new();
        let appointment = BookAppointment {
            doctor_id: Some(DoctorID::new()),
            patient_id: Some(PatientID::new()),
            appointment_date: "2025-06-01".into(),
            appointment_time: "10:30".into(),
            reason: "Checkup".into(),
        }
        .into_appointment(me)
        .unwrap();

        assert_eq!(appointment.patient, me);
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert!(appointment.advice.is_none());
    }

    #[test]
    fn test_booking_validation() {
        let errors = BookAppointment {
            appointment_date: "tomorrow".into(),
            ..Default::default()
        }
        .into_appointment(PatientID::new())
        .unwrap_err();

        for field in ["doctorId", "appointmentDate", "appointmentTime", "reason"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_status_update_accepts_only_known_statuses() {
        assert_eq!(
            StatusUpdate::new(AppointmentStatus::Confirmed).validate().unwrap(),
            AppointmentStatus::Confirmed
        );
        let bad = StatusUpdate {
            status: "archived".into(),
        };
        assert!(bad.validate().unwrap_err().has("status"));
    }

    #[test]
    fn test_record_forces_doctor() {
        let me = DoctorID::new();
        let record = NewMedicalRecord {
            patient_id: Some(PatientID::new()),
            doctor_id: Some(DoctorID::new()),
            diagnosis: "Migraine".into(),
            ..Default::default()
        }
        .into_record(me)
        .unwrap();
        assert_eq!(record.doctor, me);

        let errors = NewMedicalRecord::default().into_record(me).unwrap_err();
        assert!(errors.has("patientId") && errors.has("diagnosis"));
    }

    #[test]
    fn test_patient_patch_ignores_immutable_fields() {
        let Profile::Patient(mut patient) = Registration::Patient(patient_payload())
            .validate()
            .unwrap()
            .profile
        else {
            panic!("expected a patient profile");
        };

        let patch: PatientPatch = serde_json::from_value(json!({
            "phone": "555-0199",
            "dateOfBirth": "2001-01-01",
            "gender": "Male",
            "allergies": ["penicillin"],
        }))
        .unwrap();
        patch.validate().unwrap();
        patch.apply(&mut patient);

        assert_eq!(patient.phone, "555-0199");
        assert_eq!(patient.allergies, vec!["penicillin".to_string()]);
        assert_eq!(patient.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12).unwrap());
        assert_eq!(patient.gender, Gender::Female);
    }

    #[test]
    fn test_profile_patch_validation() {
        let patch = DoctorPatch {
            first_name: Some("  ".into()),
            email: Some("not-an-email".into()),
            consultation_fee: Some(-5.0),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert!(errors.has("firstName") && errors.has("email") && errors.has("consultationFee"));

        assert!(HospitalPatch::default().validate().is_ok());
    }
}
