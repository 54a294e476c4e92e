use anyhow::Result;
use derive_more::Display;
use hospital_organizer::authorization::Enforcer;
use hospital_organizer::config::Config;
use hospital_organizer::db::Database;
use hospital_organizer::models::*;
use hospital_organizer::payloads::*;
use hospital_organizer::services::Service;
use hospital_organizer::token::TokenIssuer;
use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};
use log::warn;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

type MenuExit = Option<()>;
const MENU_EXIT: MenuExit = None;
const MENU_LOOP: MenuExit = Some(());

/// Représente un menu texte
trait Menu {
    /// Implémente le contenu du menu. La valeur de retour
    /// doit être None si le menu souhaite terminer,
    /// ou Some(()) s'il faut le relancer.
    fn enter(&mut self) -> Result<MenuExit>;

    /// Lance le menu en boucle, en interceptant les erreurs,
    /// sauf si le menu souhaite quitter.
    fn enter_loop(&mut self) {
        while let Some(result) = self.enter().transpose() {
            if let Err(error) = result {
                eprintln!("Erreur: {error}");
            }
        }
    }
}

fn optional(prompt: &str) -> Result<Option<String>> {
    let value = Text::new(prompt).prompt()?;
    Ok(Some(value).filter(|v| !v.trim().is_empty()))
}

fn prompt_registration() -> Result<Registration> {
    let role = Select::new("Type de compte:", Role::iter().collect()).prompt()?;
    let email = Text::new("Email:").prompt()?;
    let password = Password::new("Mot de passe:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;

    Ok(match role {
        Role::Patient => Registration::Patient(RegisterPatient {
            email,
            password,
            first_name: Text::new("Prénom:").prompt()?,
            last_name: Text::new("Nom:").prompt()?,
            date_of_birth: Text::new("Date de naissance (AAAA-MM-JJ):").prompt()?,
            gender: Select::new("Genre:", vec!["Male", "Female", "Other"])
                .prompt()?
                .to_string(),
            phone: Text::new("Téléphone:").prompt()?,
            blood_group: optional("Groupe sanguin (optionnel):")?,
            ..Default::default()
        }),
        Role::Doctor => Registration::Doctor(RegisterDoctor {
            email,
            password,
            first_name: Text::new("Prénom:").prompt()?,
            last_name: Text::new("Nom:").prompt()?,
            specialization: Text::new("Spécialisation:").prompt()?,
            qualification: optional("Qualification (optionnel):")?,
            license_number: Text::new("Numéro de licence:").prompt()?,
            phone: Text::new("Téléphone:").prompt()?,
            department: Text::new("Département:").prompt()?,
            ..Default::default()
        }),
        Role::Hospital => Registration::Hospital(RegisterHospital {
            email,
            password,
            name: Text::new("Nom de l'hôpital:").prompt()?,
            phone: Text::new("Téléphone:").prompt()?,
            registration_number: Text::new("Numéro d'enregistrement:").prompt()?,
            ..Default::default()
        }),
    })
}

fn print_appointment(appointment: &Appointment) {
    println!(
        "\n[{}]\nDate: {} {}\nMotif: {}\nStatut: {}",
        appointment.id, appointment.date, appointment.time, appointment.reason, appointment.status
    );
    if let Some(advice) = &appointment.advice {
        println!("Conseil: {advice}");
    }
    if let Some(prescription) = appointment.prescription.as_deref().filter(|p| !p.is_empty()) {
        println!("Ordonnance: {prescription}");
    }
}

fn print_record(record: &MedicalRecord) {
    println!(
        "\n[{}]\nDiagnostic: {}\nSymptômes: {}",
        record.id,
        record.diagnosis,
        record.symptoms.join(", ")
    );
    if let Some(treatment) = &record.treatment {
        println!("Traitement: {treatment}");
    }
    for m in &record.medications {
        println!("- {} {} ({}, {})", m.name, m.dosage, m.frequency, m.duration);
    }
    if let Some(notes) = &record.notes {
        println!("Notes: {notes}");
    }
    println!("===============");
}

pub struct App {
    service: Service,
}

impl App {
    pub fn new(service: Service) -> Self {
        App { service }
    }

    pub fn start(&mut self) -> Result<()> {
        println!("Bienvenue sur l'organiseur de dossiers patients de l'hôpital.");
        self.enter_loop();
        self.service.save()?;
        Ok(())
    }
}

impl Menu for App {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Créer un compte")]
            Register,
            #[display("Se connecter")]
            Login,
            #[display("Quitter")]
            Exit,
        }

        let choice = Select::new("Que voulez-vous faire ?", Choice::iter().collect()).prompt()?;

        let session = match choice {
            Choice::Register => self.service.register(prompt_registration()?)?,
            Choice::Login => {
                let email = Text::new("Email:").prompt()?;
                let password = Password::new("Mot de passe:")
                    .without_confirmation()
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .prompt()?;
                self.service.login(&email, &password)?
            }
            Choice::Exit => return Ok(MENU_EXIT),
        };

        println!("[*] Bienvenue, {}.", session.user.profile);
        let token = session.token;
        let service = &mut self.service;
        match session.user.role {
            Role::Patient => PatientMenu { service, token }.enter_loop(),
            Role::Doctor => DoctorMenu { service, token }.enter_loop(),
            Role::Hospital => HospitalMenu { service, token }.enter_loop(),
        }
        // Sauvegarde à chaque déconnexion
        self.service.save()?;
        Ok(MENU_LOOP)
    }
}

struct PatientMenu<'srv> {
    service: &'srv mut Service,
    token: String,
}

impl Menu for PatientMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Voir mon profil")]
            Profile,
            #[display("Modifier mon téléphone")]
            UpdatePhone,
            #[display("Prendre un rendez-vous")]
            Book,
            #[display("Mes rendez-vous")]
            Appointments,
            #[display("Mes dossiers médicaux")]
            Records,
            #[display("Se déconnecter")]
            Logout,
        }

        let choice = Select::new("Que voulez-vous faire ?", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::Profile => {
                if let Profile::Patient(p) = self.service.my_profile(&self.token)? {
                    println!(
                        "{p}\nNé(e) le: {}\nGenre: {}\nTéléphone: {}\nAllergies: {}",
                        p.date_of_birth,
                        p.gender,
                        p.phone,
                        p.allergies.join(", ")
                    );
                }
            }
            Choice::UpdatePhone => {
                let phone = Text::new("Nouveau numéro:").prompt()?;
                self.service.update_patient_profile(
                    &self.token,
                    PatientPatch {
                        phone: Some(phone),
                        ..Default::default()
                    },
                )?;
            }
            Choice::Book => {
                let doctors = self.service.list_doctors(&self.token)?;
                let Some(doctor) = Select::new("Choisissez un médecin:", doctors).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };
                let appointment = self.service.book_appointment(
                    &self.token,
                    BookAppointment {
                        doctor_id: Some(doctor.id),
                        appointment_date: Text::new("Date (AAAA-MM-JJ):").prompt()?,
                        appointment_time: Text::new("Heure:").prompt()?,
                        reason: Text::new("Motif:").prompt()?,
                        ..Default::default()
                    },
                )?;
                print_appointment(&appointment);
            }
            Choice::Appointments => {
                let appointments = self.service.list_appointments(&self.token)?;
                if appointments.is_empty() {
                    println!("[*] Aucun rendez-vous");
                }
                appointments.iter().for_each(print_appointment);
            }
            Choice::Records => {
                let records = self.service.list_records(&self.token)?;
                if records.is_empty() {
                    println!("[*] Aucun dossier médical");
                }
                records.iter().for_each(print_record);
            }
            Choice::Logout => return Ok(MENU_EXIT),
        }
        Ok(MENU_LOOP)
    }
}

struct DoctorMenu<'srv> {
    service: &'srv mut Service,
    token: String,
}

impl DoctorMenu<'_> {
    fn manage_appointment(&mut self, appointment: Appointment) -> Result<()> {
        #[derive(EnumIter, Display)]
        enum Action {
            #[display("Changer le statut")]
            Status,
            #[display("Donner un conseil")]
            Advice,
            #[display("Créer un dossier médical")]
            Record,
            #[display("Retour")]
            Back,
        }

        print_appointment(&appointment);
        match Select::new("Action:", Action::iter().collect()).prompt()? {
            Action::Status => {
                let status =
                    Select::new("Nouveau statut:", AppointmentStatus::iter().collect()).prompt()?;
                self.service.update_appointment_status(
                    &self.token,
                    appointment.id,
                    StatusUpdate::new(status),
                )?;
            }
            Action::Advice => {
                let advice = inquire::Editor::new("Conseil:").prompt()?;
                let prescription = optional("Ordonnance (optionnel):")?;
                self.service.submit_advice(
                    &self.token,
                    appointment.id,
                    AdviceSubmission {
                        advice,
                        prescription,
                    },
                )?;
            }
            Action::Record => {
                let symptoms = Text::new("Symptômes (séparés par des virgules):").prompt()?;
                let record = self.service.create_record(
                    &self.token,
                    NewMedicalRecord {
                        patient_id: Some(appointment.patient),
                        appointment_id: Some(appointment.id),
                        diagnosis: Text::new("Diagnostic:").prompt()?,
                        symptoms: symptoms
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect(),
                        treatment: optional("Traitement (optionnel):")?,
                        notes: optional("Notes (optionnel):")?,
                        ..Default::default()
                    },
                )?;
                print_record(&record);
            }
            Action::Back => {}
        }
        Ok(())
    }
}

impl Menu for DoctorMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Mes rendez-vous")]
            Appointments,
            #[display("Mes dossiers médicaux")]
            Records,
            #[display("Modifier ma disponibilité")]
            Availability,
            #[display("Se déconnecter")]
            Logout,
        }

        let choice = Select::new("Que voulez-vous faire ?", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::Appointments => {
                let appointments = self.service.list_appointments(&self.token)?;
                if appointments.is_empty() {
                    println!("[*] Aucun rendez-vous");
                    return Ok(MENU_LOOP);
                }
                if let Some(appointment) =
                    Select::new("Choisissez un rendez-vous:", appointments).prompt_skippable()?
                {
                    self.manage_appointment(appointment)?;
                }
            }
            Choice::Records => {
                let records = self.service.list_records(&self.token)?;
                let Some(record) = Select::new("Choisissez un dossier:", records).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };
                print_record(&record);
                if Confirm::new("Modifier le diagnostic ?")
                    .with_default(false)
                    .prompt()?
                {
                    let diagnosis = Text::new("Diagnostic:").prompt()?;
                    self.service.update_record(
                        &self.token,
                        record.id,
                        RecordPatch {
                            diagnosis: Some(diagnosis),
                            ..Default::default()
                        },
                    )?;
                }
            }
            Choice::Availability => {
                let day = Text::new("Jour:").prompt()?;
                let slot = Text::new("Créneau:").prompt()?;
                let Profile::Doctor(me) = self.service.my_profile(&self.token)? else {
                    return Ok(MENU_LOOP);
                };
                let mut availability = me.availability;
                availability.insert(day, slot);
                self.service.update_doctor_profile(
                    &self.token,
                    DoctorPatch {
                        availability: Some(availability),
                        ..Default::default()
                    },
                )?;
            }
            Choice::Logout => return Ok(MENU_EXIT),
        }
        Ok(MENU_LOOP)
    }
}

struct HospitalMenu<'srv> {
    service: &'srv mut Service,
    token: String,
}

impl Menu for HospitalMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Tableau de bord")]
            Dashboard,
            #[display("Médecins en attente")]
            PendingDoctors,
            #[display("Liste des patients")]
            Patients,
            #[display("Tous les rendez-vous")]
            Appointments,
            #[display("Se déconnecter")]
            Logout,
        }

        let choice = Select::new("Que voulez-vous faire ?", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::Dashboard => {
                let stats = self.service.dashboard(&self.token)?;
                println!(
                    "Patients: {}\nMédecins: {}\nRendez-vous: {} ({} en attente, {} terminés)\nDossiers: {}",
                    stats.total_patients,
                    stats.total_doctors,
                    stats.total_appointments,
                    stats.pending_appointments,
                    stats.completed_appointments,
                    stats.total_records
                );
            }
            Choice::PendingDoctors => {
                let pending = self.service.pending_doctors(&self.token)?;
                if pending.is_empty() {
                    println!("[*] Aucun médecin en attente");
                    return Ok(MENU_LOOP);
                }
                let Some(doctor) = Select::new("Choisissez un médecin:", pending).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };
                println!("Licence: {}\nDépartement: {}", doctor.license_number, doctor.department);
                if Confirm::new("Approuver ce médecin ?").prompt()? {
                    self.service.approve_doctor(&self.token, doctor.id)?;
                } else {
                    self.service.reject_doctor(&self.token, doctor.id)?;
                }
            }
            Choice::Patients => {
                for patient in self.service.list_patients(&self.token)? {
                    println!("{patient} - {} - {}", patient.date_of_birth, patient.phone);
                }
            }
            Choice::Appointments => {
                self.service
                    .list_appointments(&self.token)?
                    .iter()
                    .for_each(print_appointment);
            }
            Choice::Logout => return Ok(MENU_EXIT),
        }
        Ok(MENU_LOOP)
    }
}

fn main() -> Result<()> {
    let config = Config::from_env()?;
    simple_logging::log_to_file(&config.log_file, config.log_level)?;
    if config.uses_dev_secret() {
        warn!("HOSPITAL_TOKEN_SECRET not set, using the development secret");
    }

    let db = Database::open(config.db_file.clone())?;
    let enforcer = Enforcer::load()?;
    let tokens = TokenIssuer::new(config.token_secret.clone(), config.token_ttl());
    App::new(Service::new(db, enforcer, tokens)).start()
}
