use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clinic_admin_core::api::EXPORT_FILE_NAME;
use clinic_admin_core::models::{NewReview, Patient, PrescriptionDraft, PrescriptionList};
use clinic_admin_core::{ClientConfig, Dashboard, HttpPatientService, NotificationKind, Tab};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic-admin")]
#[command(about = "Clinic admin dashboard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients
    List {
        /// all, completed or pending
        #[arg(long, default_value = "all")]
        tab: Tab,
        /// Match against name, email or phone
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one patient with prescriptions
    Show {
        patient_id: String,
    },
    /// Show dashboard figures
    Stats,
    /// Mark a checkup as complete
    Complete {
        patient_id: String,
    },
    /// Add a prescription to a patient
    AddPrescription {
        patient_id: String,
        tablets: String,
        dosage: String,
        duration: String,
    },
    /// Delete a prescription
    DeletePrescription {
        patient_id: String,
        prescription_id: String,
        /// Delete from the newly added list instead of the history
        #[arg(long)]
        new: bool,
    },
    /// Delete a patient
    DeletePatient {
        patient_id: String,
    },
    /// Send the checkup email and mark the checkup complete
    SendEmail {
        patient_id: String,
    },
    /// Download the patient spreadsheet
    Download {
        path: Option<PathBuf>,
    },
    /// List reviews
    Reviews,
    /// Submit a review
    SubmitReview {
        name: String,
        email: String,
        /// 1 to 5
        rating: u8,
        comment: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("clinic_admin=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let env: HashMap<String, String> = std::env::vars().collect();
    let config = ClientConfig::from_env_map(&env)?;
    let ttl = config.notification_ttl();
    tracing::info!(base_url = config.base_url(), "using clinic service");

    let service = HttpPatientService::new(config)?;
    let dashboard = Dashboard::with_notification_ttl(service, ttl);

    let result = run(&dashboard, cli.command).await;

    if let Some(notification) = dashboard.notification() {
        match notification.kind {
            NotificationKind::Success => println!("{}: {}", notification.head, notification.message),
            NotificationKind::Failure => eprintln!("{}: {}", notification.head, notification.message),
        }
    }
    result
}

async fn run(dashboard: &Dashboard<HttpPatientService>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List { tab, search } => {
            dashboard.refresh_patients().await?;
            dashboard.set_tab(tab);
            if let Some(term) = search {
                dashboard.set_search(term);
            }
            let patients = dashboard.visible_patients();
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!(
                    "ID: {}, Name: {}, Email: {}, Phone: {}, Status: {}",
                    patient.id,
                    patient.name,
                    patient.email,
                    patient.phone,
                    status(&patient)
                );
            }
        }
        Commands::Show { patient_id } => {
            dashboard.refresh_patients().await?;
            let patient = dashboard.select_patient(&patient_id)?;
            print_patient(&patient);
        }
        Commands::Stats => {
            dashboard.refresh_patients().await?;
            if let Err(e) = dashboard.refresh_reviews().await {
                tracing::warn!(error = %e, "review counts unavailable");
            }
            let stats = dashboard.stats();
            println!("Total patients:     {}", stats.total_patients);
            println!("Completed checkups: {}", stats.completed_checkups);
            println!("Pending checkups:   {}", stats.pending_checkups());
            println!("Good reviews:       {}", stats.good_reviews);
            println!("Bad reviews:        {}", stats.bad_reviews);
        }
        Commands::Complete { patient_id } => {
            dashboard.refresh_patients().await?;
            dashboard.mark_complete(&patient_id).await?;
        }
        Commands::AddPrescription {
            patient_id,
            tablets,
            dosage,
            duration,
        } => {
            dashboard.refresh_patients().await?;
            dashboard.select_patient(&patient_id)?;
            dashboard
                .add_prescription(&PrescriptionDraft::new(tablets, dosage, duration))
                .await?;
            if let Some(patient) = dashboard.selected_patient() {
                print_patient(&patient);
            }
        }
        Commands::DeletePrescription {
            patient_id,
            prescription_id,
            new,
        } => {
            let list = if new {
                PrescriptionList::NewlyAdded
            } else {
                PrescriptionList::Historical
            };
            dashboard.refresh_patients().await?;
            dashboard
                .delete_prescription(&patient_id, list, &prescription_id)
                .await?;
        }
        Commands::DeletePatient { patient_id } => {
            dashboard.refresh_patients().await?;
            dashboard.delete_patient(&patient_id).await?;
        }
        Commands::SendEmail { patient_id } => {
            dashboard.refresh_patients().await?;
            dashboard.send_email(&patient_id).await?;
        }
        Commands::Download { path } => {
            let dest = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            let bytes = dashboard.download_export(&dest).await?;
            println!("Saved {} bytes to {}", bytes, dest.display());
        }
        Commands::Reviews => {
            dashboard.refresh_reviews().await?;
            for review in dashboard.reviews() {
                println!(
                    "{} ({}/5, {}): {}",
                    review.name, review.rating, review.date, review.comment
                );
            }
        }
        Commands::SubmitReview {
            name,
            email,
            rating,
            comment,
        } => {
            let review = NewReview {
                name,
                email,
                rating,
                comment,
            };
            dashboard.submit_review(&review).await?;
        }
    }
    Ok(())
}

fn status(patient: &Patient) -> &'static str {
    if patient.is_completed {
        "completed"
    } else {
        "pending"
    }
}

fn print_patient(patient: &Patient) {
    println!("ID:       {}", patient.id);
    println!("Name:     {}", patient.name);
    println!("Email:    {}", patient.email);
    println!("Phone:    {}", patient.phone);
    println!("Age:      {}", patient.age);
    println!("Sex:      {}", patient.sex);
    println!("Address:  {}", patient.address);
    println!("Concerns: {}", patient.medical_concern.join(", "));
    println!("Status:   {}", status(patient));

    for (label, list) in [
        ("Prescriptions", PrescriptionList::Historical),
        ("New prescriptions", PrescriptionList::NewlyAdded),
    ] {
        let entries = patient.prescriptions(list);
        if entries.is_empty() {
            continue;
        }
        println!("{}:", label);
        for p in entries {
            println!(
                "  [{}] {} {} for {} ({})",
                p.id, p.tablets, p.dosage, p.duration, p.date
            );
        }
    }
}
