use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use campus_admissions::config::AppConfig;
use campus_admissions::error::AppError;
use campus_admissions::telemetry;
use campus_admissions::workflows::admission::{
    admission_router, standard_departments, AdmissionNotice, AdmissionService, ApplicantId,
    Category, DashboardView, MemoryRepository, NoticeError, NoticePublisher, RegistrationForm,
    VerificationAction,
};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Campus Admissions Orchestrator",
    about = "Run the admissions service or demonstrate an allocation cycle from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seat allocation utilities for stakeholder demos
    Admission {
        #[command(subcommand)]
        command: AdmissionCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum AdmissionCommand {
    /// Run a full seeded admission cycle and render the resulting dashboard
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Roster CSV to register applicants from (defaults to a built-in sample set)
    #[arg(long)]
    roster: Option<PathBuf>,
    /// After allocation, reject this applicant's documents to demonstrate the
    /// reallocation cascade
    #[arg(long)]
    cancel: Option<u64>,
    /// Include the waiting queue in the output
    #[arg(long)]
    list_waiting: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Admission {
            command: AdmissionCommand::Demo(args),
        } => run_admission_demo(args),
    }
}

/// Notice publisher for the server: hands events to the log pipeline so an
/// operator-facing notifier can be swapped in without touching the service.
struct LoggingNotices;

impl NoticePublisher for LoggingNotices {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError> {
        info!(
            template = %notice.template,
            applicant = %notice.applicant_id,
            "admission notice"
        );
        Ok(())
    }
}

/// Notice publisher for the demo CLI, echoing the messages an e-mail adapter
/// would send.
struct ConsoleNotices;

impl NoticePublisher for ConsoleNotices {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError> {
        let line = match notice.template.as_str() {
            "applicant_selected" => format!(
                "provisional admission offered in {}",
                notice
                    .details
                    .get("department")
                    .map(String::as_str)
                    .unwrap_or("-")
            ),
            "admission_confirmed" => "admission confirmed, welcome!".to_string(),
            "admission_cancelled" => {
                "admission cancelled after document rejection".to_string()
            }
            other => other.to_string(),
        };
        println!("[notice] applicant {}: {}", notice.applicant_id, line);
        Ok(())
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let repository = Arc::new(MemoryRepository::seeded(standard_departments()));
    let notices = Arc::new(LoggingNotices);
    let service = Arc::new(AdmissionService::new(repository, notices));

    if let Some(path) = &config.seed.roster_path {
        let file = std::fs::File::open(path)?;
        let imported = service.import_roster(file)?;
        info!(count = imported.len(), ?path, "seeded repository from roster");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(admission_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campus admissions service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_admission_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(MemoryRepository::seeded(standard_departments()));
    let notices = Arc::new(ConsoleNotices);
    let service = AdmissionService::new(repository, notices);

    match &args.roster {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            let imported = service.import_roster(file)?;
            println!("Registered {} applicants from {}", imported.len(), path.display());
        }
        None => {
            for form in demo_roster() {
                service.register(form)?;
            }
            println!("Registered built-in sample applicants");
        }
    }

    let merit = service.generate_merit_list()?;
    println!("\nMerit list");
    for entry in &merit {
        let rank = entry
            .rank
            .map(|rank| format!("#{rank}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "- {} {} | score {:.2} | {}",
            rank, entry.name, entry.final_score, entry.category
        );
    }

    let outcome = service.allocate()?;
    println!(
        "\nAllocation complete: {} selected, {} waitlisted, {} rejected",
        outcome.selected.len(),
        outcome.waitlisted.len(),
        outcome.rejected.len()
    );

    if let Some(id) = args.cancel {
        let outcome = service.verify(ApplicantId(id), VerificationAction::Reject)?;
        match outcome.promoted {
            Some(promoted) => println!(
                "\nSeat freed by applicant {}; applicant {} promoted from the waiting queue",
                id, promoted
            ),
            None => println!(
                "\nSeat freed by applicant {}; nobody on the waiting queue qualified",
                id
            ),
        }
    }

    render_dashboard(&service.dashboard()?, args.list_waiting);
    Ok(())
}

fn demo_roster() -> Vec<RegistrationForm> {
    let applicant = |name: &str,
                     age: u8,
                     qualifying: f32,
                     entrance: f32,
                     preferences: &[&str],
                     category: Category| RegistrationForm {
        name: name.to_string(),
        age,
        qualifying_score: qualifying,
        entrance_score: entrance,
        preferences: preferences.iter().map(|p| p.to_string()).collect(),
        category,
        registered_on: None,
    };

    vec![
        applicant("Asha Verma", 18, 92.0, 88.0, &["CS", "MECH"], Category::General),
        applicant("Tanvi Rao", 18, 88.0, 84.0, &["CS"], Category::General),
        applicant("Rohan Gupta", 19, 85.0, 80.0, &["CS"], Category::General),
        applicant("Meera Iyer", 17, 85.0, 80.0, &["CS", "CIVIL"], Category::General),
        applicant("Divya Nair", 18, 78.0, 90.0, &["CS"], Category::Obc),
        applicant("Imran Khan", 19, 64.0, 70.0, &["MECH"], Category::Sc),
        applicant("Lata Devi", 18, 60.0, 66.0, &["CIVIL"], Category::St),
        applicant("Kabir Shah", 18, 70.0, 75.0, &["PHYSICS"], Category::General),
    ]
}

fn render_dashboard(dashboard: &DashboardView, list_waiting: bool) {
    println!("\nDepartment seat matrix");
    for department in &dashboard.departments {
        println!(
            "- {}: {}/{} seats filled ({} open)",
            department.name, department.occupied, department.total_seats, department.available
        );
        for seat in &department.seats {
            println!("    {}: {}/{}", seat.category, seat.filled, seat.quota);
        }
    }

    println!("\nApplicants");
    for applicant in &dashboard.applicants {
        let rank = applicant
            .rank
            .map(|rank| format!("#{rank}"))
            .unwrap_or_else(|| "-".to_string());
        let department = applicant
            .allocated_department
            .as_deref()
            .unwrap_or("-");
        let documents = applicant.document_status.unwrap_or("-");
        println!(
            "- {} | {} | score {:.2} | rank {} | {} | dept {} | docs {}",
            applicant.applicant_id,
            applicant.name,
            applicant.final_score,
            rank,
            applicant.status,
            department,
            documents
        );
    }

    if list_waiting {
        if dashboard.waiting.is_empty() {
            println!("\nWaiting queue: empty");
        } else {
            println!("\nWaiting queue");
            for id in &dashboard.waiting {
                println!("- applicant {id}");
            }
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
