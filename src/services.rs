//! API d'accès aux données hospitalières, et point d'entrée unique pour
//! l'authentification et le contrôle d'accès.
//!
//! Chaque opération reçoit le jeton de l'appelant et le résout à nouveau:
//! le service ne garde aucune session en mémoire.

use log::{info, warn};

use crate::authorization::{Context, Enforcer};
use crate::db::{Database, Store};
use crate::errors::ServiceError;
use crate::models::{
    Account, Appointment, AppointmentID, AppointmentStatus, ApprovalStatus, DashboardStats, Doctor,
    DoctorID, Hospital, HospitalOverview, Identity, MedicalRecord, Patient, PatientID, Principal,
    Profile, ProfileRef, RecordID, Role, Session, ANY_ROLE,
};
use crate::payloads::{
    AdviceSubmission, BookAppointment, DoctorPatch, HospitalPatch, NewAccount, NewMedicalRecord,
    PatientPatch, RecordPatch, Registration, StatusUpdate,
};
use crate::token::TokenIssuer;
use crate::utils::input_validation::Email;
use crate::utils::password_utils::{hash, verify};

pub struct Service<S: Store = Database> {
    db: S,
    enforcer: Enforcer,
    tokens: TokenIssuer,
}

fn patient_of(principal: &Principal) -> Result<PatientID, ServiceError> {
    match principal.profile {
        ProfileRef::Patient(id) => Ok(id),
        _ => Err(ServiceError::Forbidden),
    }
}

fn doctor_of(principal: &Principal) -> Result<DoctorID, ServiceError> {
    match principal.profile {
        ProfileRef::Doctor(id) => Ok(id),
        _ => Err(ServiceError::Forbidden),
    }
}

impl<S: Store> Service<S> {
    pub fn new(db: S, enforcer: Enforcer, tokens: TokenIssuer) -> Self {
        Self {
            db,
            enforcer,
            tokens,
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        self.db.save()
    }

    pub fn store(&self) -> &S {
        &self.db
    }

    fn account(&self, identity: &Identity) -> Result<Account, ServiceError> {
        Ok(Account {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            profile: self.db.get_profile(identity.profile)?,
        })
    }

    fn session(&self, identity: &Identity) -> Result<Session, ServiceError> {
        let token = self
            .tokens
            .issue(identity.id, identity.role)
            .map_err(|e| ServiceError::Internal(format!("Token issuance failed: {e}")))?;

        Ok(Session {
            token,
            user: self.account(identity)?,
        })
    }

    /// Crée un contexte d'autorisation ayant l'appelant comme sujet
    fn enforce<'ctx>(&'ctx self, principal: &'ctx Principal) -> Context<'ctx> {
        self.enforcer.with_subject(principal)
    }

    /// Inscrit un nouvel utilisateur avec son profil, et ouvre une session.
    pub fn register(&mut self, registration: Registration) -> Result<Session, ServiceError> {
        let NewAccount {
            email,
            password,
            profile,
        } = registration.validate()?;

        // Messages précis pour le cas courant. L'unicité reste garantie
        // par le stockage lors de l'écriture.
        if self.db.lookup_email(&email).is_some() {
            return Err(ServiceError::DuplicateIdentity);
        }
        match &profile {
            Profile::Doctor(d) if self.db.lookup_license(&d.license_number).is_some() => {
                return Err(ServiceError::DuplicateLicense)
            }
            Profile::Hospital(h) if self.db.lookup_registration(&h.registration_number).is_some() => {
                return Err(ServiceError::DuplicateRegistration)
            }
            _ => {}
        }

        let password = hash(password.as_ref())
            .map_err(|e| ServiceError::Internal(format!("Password hashing failed: {e}")))?;
        let identity = Identity::new(email, password, profile.reference());
        let identity_id = identity.id;
        let role = identity.role;

        self.db.create_account(identity, profile)?;
        info!("Account {identity_id} created with role {role}");

        let identity = self.db.get_identity(identity_id)?;
        self.session(identity)
    }

    /// Vérifie les identifiants. Email inconnu et mauvais mot de passe
    /// donnent la même erreur.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let identity = Email::try_from(email)
            .ok()
            .and_then(|email| self.db.lookup_email(&email));

        if !verify(password, identity.map(|i| &i.password)) {
            warn!("Failed login attempt");
            return Err(ServiceError::InvalidCredentials);
        }
        let Some(identity) = identity else {
            return Err(ServiceError::InvalidCredentials);
        };

        if let ProfileRef::Doctor(id) = identity.profile {
            let doctor = self.db.get_doctor(id)?;
            if !doctor.is_approved() {
                info!("Login refused for doctor {id}: status {}", doctor.status);
                return Err(ServiceError::ApprovalPending);
            }
        }

        info!("Identity {} logged in", identity.id);
        self.session(identity)
    }

    /// Résout le jeton en appelant, et vérifie que son rôle fait partie
    /// des rôles autorisés.
    pub fn authorize(&self, token: &str, allowed: &[Role]) -> Result<Principal, ServiceError> {
        let claims = self.tokens.verify(token).inspect_err(|e| {
            info!("Rejected token: {e}");
        })?;

        let identity = self
            .db
            .get_identity(claims.sub)
            .map_err(|_| ServiceError::Unauthenticated)?;

        if !allowed.contains(&identity.role) {
            warn!("{} {} refused, allowed roles {allowed:?}", identity.role, identity.id);
            return Err(ServiceError::Forbidden);
        }

        Ok(identity.principal())
    }

    /// Le compte de l'appelant, avec son profil
    pub fn me(&self, token: &str) -> Result<Account, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        let identity = self.db.get_identity(principal.id)?;
        self.account(identity)
    }

    pub fn my_profile(&self, token: &str) -> Result<Profile, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        Ok(self.db.get_profile(principal.profile)?)
    }

    pub fn update_patient_profile(
        &mut self,
        token: &str,
        patch: PatientPatch,
    ) -> Result<Patient, ServiceError> {
        let principal = self.authorize(token, &[Role::Patient])?;
        let id = patient_of(&principal)?;
        self.enforce(&principal)
            .update_profile(ProfileRef::Patient(id))?;
        patch.validate()?;

        let patient = self.db.get_patient_mut(id)?;
        patch.apply(patient);
        info!("Patient profile {id} updated");
        Ok(patient.clone())
    }

    pub fn update_doctor_profile(
        &mut self,
        token: &str,
        patch: DoctorPatch,
    ) -> Result<Doctor, ServiceError> {
        let principal = self.authorize(token, &[Role::Doctor])?;
        let id = doctor_of(&principal)?;
        self.enforce(&principal)
            .update_profile(ProfileRef::Doctor(id))?;
        patch.validate()?;

        let doctor = self.db.get_doctor_mut(id)?;
        patch.apply(doctor);
        info!("Doctor profile {id} updated");
        Ok(doctor.clone())
    }

    pub fn update_hospital_profile(
        &mut self,
        token: &str,
        patch: HospitalPatch,
    ) -> Result<Hospital, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital])?;
        let ProfileRef::Hospital(id) = principal.profile else {
            return Err(ServiceError::Forbidden);
        };
        self.enforce(&principal)
            .update_profile(ProfileRef::Hospital(id))?;
        patch.validate()?;

        let hospital = self.db.get_hospital_mut(id)?;
        patch.apply(hospital);
        info!("Hospital profile {id} updated");
        Ok(hospital.clone())
    }

    /// Prend un rendez-vous pour l'appelant avec un médecin existant
    pub fn book_appointment(
        &mut self,
        token: &str,
        request: BookAppointment,
    ) -> Result<Appointment, ServiceError> {
        let principal = self.authorize(token, &[Role::Patient])?;
        let me = patient_of(&principal)?;
        let appointment = request.into_appointment(me)?;

        let doctor = self.db.get_doctor(appointment.doctor)?;
        if !doctor.is_approved() {
            info!("Appointment booked with doctor {} in status {}", doctor.id, doctor.status);
        }

        self.enforce(&principal).book_appointment(&appointment)?;

        info!("Appointment {} booked by patient {me}", appointment.id);
        self.db.store_appointment(appointment.clone());
        Ok(appointment)
    }

    /// Les rendez-vous visibles par l'appelant, du plus récent au plus ancien
    pub fn list_appointments(&self, token: &str) -> Result<Vec<Appointment>, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        let ctx = self.enforce(&principal);

        Ok(self
            .db
            .list_appointments()
            .into_iter()
            .filter(|a| ctx.read_appointment(a).is_ok())
            .cloned()
            .collect())
    }

    pub fn get_appointment(
        &self,
        token: &str,
        id: AppointmentID,
    ) -> Result<Appointment, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        let appointment = self.db.get_appointment(id)?;
        self.enforce(&principal).read_appointment(appointment)?;
        Ok(appointment.clone())
    }

    pub fn update_appointment_status(
        &mut self,
        token: &str,
        id: AppointmentID,
        update: StatusUpdate,
    ) -> Result<Appointment, ServiceError> {
        let principal = self.authorize(token, &[Role::Doctor])?;
        let appointment = self.db.get_appointment(id)?;
        self.enforce(&principal).update_appointment(appointment)?;
        let status = update.validate()?;

        let appointment = self.db.get_appointment_mut(id)?;
        info!("Appointment {id}: {} -> {status}", appointment.status);
        appointment.status = status;
        appointment.updated_at = chrono::Utc::now();
        Ok(appointment.clone())
    }

    /// Enregistre le conseil du médecin et clôt le rendez-vous
    pub fn submit_advice(
        &mut self,
        token: &str,
        id: AppointmentID,
        submission: AdviceSubmission,
    ) -> Result<Appointment, ServiceError> {
        let principal = self.authorize(token, &[Role::Doctor])?;
        let appointment = self.db.get_appointment(id)?;
        self.enforce(&principal).update_appointment(appointment)?;
        submission.validate()?;

        let appointment = self.db.get_appointment_mut(id)?;
        appointment.advice = Some(submission.advice.trim().to_string());
        appointment.prescription = Some(submission.prescription.unwrap_or_default());
        appointment.status = AppointmentStatus::Completed;
        appointment.updated_at = chrono::Utc::now();
        info!("Advice submitted on appointment {id}");
        Ok(appointment.clone())
    }

    /// Crée un dossier médical, toujours au nom du médecin appelant
    pub fn create_record(
        &mut self,
        token: &str,
        request: NewMedicalRecord,
    ) -> Result<MedicalRecord, ServiceError> {
        let principal = self.authorize(token, &[Role::Doctor])?;
        let me = doctor_of(&principal)?;
        let record = request.into_record(me)?;

        self.db.get_patient(record.patient)?;
        if let Some(appointment) = record.appointment {
            self.db.get_appointment(appointment)?;
        }
        self.enforce(&principal).create_record(&record)?;

        info!("Medical record {} created by doctor {me}", record.id);
        self.db.store_record(record.clone());
        Ok(record)
    }

    pub fn list_records(&self, token: &str) -> Result<Vec<MedicalRecord>, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        let ctx = self.enforce(&principal);

        Ok(self
            .db
            .list_records()
            .into_iter()
            .filter(|r| ctx.read_record(r).is_ok())
            .cloned()
            .collect())
    }

    pub fn get_record(&self, token: &str, id: RecordID) -> Result<MedicalRecord, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        let record = self.db.get_record(id)?;
        self.enforce(&principal).read_record(record)?;
        Ok(record.clone())
    }

    pub fn update_record(
        &mut self,
        token: &str,
        id: RecordID,
        patch: RecordPatch,
    ) -> Result<MedicalRecord, ServiceError> {
        let principal = self.authorize(token, &[Role::Doctor])?;
        let record = self.db.get_record(id)?;
        self.enforce(&principal).update_record(record)?;
        patch.validate()?;
        if let Some(appointment) = patch.appointment_id {
            self.db.get_appointment(appointment)?;
        }

        let record = self.db.get_record_mut(id)?;
        patch.apply(record);
        info!("Medical record {id} updated");
        Ok(record.clone())
    }

    /// L'annuaire des médecins. Le lien vers le compte n'est visible que
    /// par les hôpitaux.
    pub fn list_doctors(&self, token: &str) -> Result<Vec<Doctor>, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        Ok(self
            .db
            .list_doctors()
            .into_iter()
            .map(|d| match principal.role {
                Role::Hospital => d.clone(),
                _ => d.public(),
            })
            .collect())
    }

    pub fn get_doctor(&self, token: &str, id: DoctorID) -> Result<Doctor, ServiceError> {
        let principal = self.authorize(token, ANY_ROLE)?;
        let doctor = self.db.get_doctor(id)?;
        Ok(match principal.role {
            Role::Hospital => doctor.clone(),
            _ => doctor.public(),
        })
    }

    pub fn pending_doctors(&self, token: &str) -> Result<Vec<Doctor>, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital])?;
        self.enforce(&principal).moderate_doctor()?;
        Ok(self
            .db
            .list_doctors()
            .into_iter()
            .filter(|d| d.status == ApprovalStatus::Pending)
            .cloned()
            .collect())
    }

    fn set_doctor_status(
        &mut self,
        token: &str,
        id: DoctorID,
        status: ApprovalStatus,
    ) -> Result<Doctor, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital])?;
        self.enforce(&principal).moderate_doctor()?;

        let doctor = self.db.get_doctor_mut(id)?;
        info!(
            "Doctor {id}: {} -> {status} by hospital identity {}",
            doctor.status, principal.id
        );
        doctor.status = status;
        doctor.updated_at = chrono::Utc::now();
        Ok(doctor.clone())
    }

    pub fn approve_doctor(&mut self, token: &str, id: DoctorID) -> Result<Doctor, ServiceError> {
        self.set_doctor_status(token, id, ApprovalStatus::Approved)
    }

    pub fn reject_doctor(&mut self, token: &str, id: DoctorID) -> Result<Doctor, ServiceError> {
        self.set_doctor_status(token, id, ApprovalStatus::Rejected)
    }

    pub fn list_patients(&self, token: &str) -> Result<Vec<Patient>, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital])?;
        self.enforce(&principal).read_overview()?;
        Ok(self.db.list_patients().into_iter().cloned().collect())
    }

    pub fn get_patient(&self, token: &str, id: PatientID) -> Result<Patient, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital, Role::Doctor])?;
        let patient = self.db.get_patient(id)?;
        self.enforce(&principal).read_patient(patient)?;
        Ok(patient.clone())
    }

    pub fn dashboard(&self, token: &str) -> Result<DashboardStats, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital])?;
        self.enforce(&principal).read_overview()?;

        let appointments = self.db.list_appointments();
        let count = |status: AppointmentStatus| appointments.iter().filter(|a| a.status == status).count();

        Ok(DashboardStats {
            total_patients: self.db.list_patients().len(),
            total_doctors: self.db.list_doctors().len(),
            total_appointments: appointments.len(),
            pending_appointments: count(AppointmentStatus::Pending),
            completed_appointments: count(AppointmentStatus::Completed),
            total_records: self.db.list_records().len(),
        })
    }

    pub fn all_data(&self, token: &str) -> Result<HospitalOverview, ServiceError> {
        let principal = self.authorize(token, &[Role::Hospital])?;
        self.enforce(&principal).read_overview()?;

        Ok(HospitalOverview {
            patients: self.db.list_patients().into_iter().cloned().collect(),
            doctors: self.db.list_doctors().into_iter().cloned().collect(),
            appointments: self.db.list_appointments().into_iter().cloned().collect(),
            records: self.db.list_records().into_iter().cloned().collect(),
        })
    }
}
