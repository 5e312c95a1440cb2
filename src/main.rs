//! Chocó Limpio CLI
//!
//! Drives the page controllers against a live backend:
//! - Sign in, register and reset passwords
//! - Watch the dashboard and the collector worklist
//! - Confirmed actions: collect pickups, review applications, delete the account

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use choco_limpio::chart::ChartSpec;
use choco_limpio::client::{
    Attachment, LoginForm, PickupReport, ProfileUpdate, RegistrationForm, RequestAction, Role,
};
use choco_limpio::config::{generate_default_config, LoggingConfig};
use choco_limpio::confirm::{AssumeYes, Confirm, TerminalConfirm};
use choco_limpio::controllers::dashboard::live_time;
use choco_limpio::view::render_theme_toggle;
use choco_limpio::{
    ActionError, AdminController, AuthController, Backend, BackendClient, Completion, Config,
    DashboardController, PasswordResetController, Poller, ProfileController, PushNotifier,
    ReportController, SessionStore, ThemeStore, WorklistController,
};

#[derive(Parser)]
#[command(name = "choco-limpio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the Chocó Limpio recycling-collection service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Answer yes to every yes/no confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email, phone or user name
    Login {
        identificador: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Create an account
    Register {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        telefono: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        barrio: String,
        /// Birth date, YYYY-MM-DD
        #[arg(long, default_value = "")]
        fecha_nac: String,
        /// Apply as a collector (lanchero)
        #[arg(long)]
        lanchero: bool,
        /// Application message, required with --lanchero
        #[arg(long)]
        mensaje: Option<String>,
        /// Boat photo, required with --lanchero
        #[arg(long)]
        foto_lancha: Option<PathBuf>,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Request a password reset link
    ResetRequest { email: String },

    /// Set a new password from a reset link
    ResetConfirm {
        /// The full link from the email, including its #access_token fragment
        link: String,
    },

    /// Show the dashboard
    Dashboard {
        /// Keep refreshing until Ctrl-C; press Enter to refresh immediately
        #[arg(long)]
        watch: bool,
    },

    /// Show pending pickups (collectors)
    Worklist {
        #[arg(long)]
        watch: bool,
    },

    /// Mark a pickup as collected
    Collect { id: i64 },

    /// Review collector applications
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },

    /// Edit profile fields; omitted fields keep their value
    Profile {
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        barrio: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Birth date, YYYY-MM-DD
        #[arg(long)]
        fecha_nac: Option<String>,
    },

    /// Upload a new avatar image
    Avatar { path: PathBuf },

    /// Delete the account (asks you to type ELIMINAR)
    DeleteAccount,

    /// Report recyclables for pickup
    Report {
        /// Weight in kilograms
        #[arg(long)]
        kg: String,
        /// Where to pick it up
        #[arg(long)]
        ubicacion: String,
        /// Photo of the recyclables
        #[arg(long)]
        foto: PathBuf,
    },

    /// Show or toggle the theme preference
    Theme {
        #[arg(long)]
        toggle: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Approve applications
    Approve { ids: Vec<String> },
    /// Reject and delete applicants
    Reject { ids: Vec<String> },
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("choco_limpio={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.backend_url {
        config.backend.base_url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging);

    tracing::debug!(
        backend = %config.backend.base_url,
        data_dir = ?config.storage.data_dir(),
        "Chocó Limpio CLI v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Commands that never touch the backend
    match &cli.command {
        Commands::Config { output } => return write_config(output.as_deref()),
        Commands::Theme { toggle } => return theme(&config, *toggle),
        _ => {}
    }

    let sessions = SessionStore::new(config.storage.session_path());
    let backend = Arc::new(
        BackendClient::with_session(&config.backend, sessions.load().as_deref())
            .context("Failed to create backend client")?,
    );
    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalConfirm)
    };

    let signed_out = run(cli.command, &config, Arc::clone(&backend), confirm).await?;

    if signed_out {
        sessions.clear().context("Failed to clear session")?;
    } else if let Some(cookie) = backend.session_cookie() {
        sessions.save(&cookie).context("Failed to save session")?;
    }
    Ok(())
}

/// Run one command. Returns `true` when the session ended.
async fn run(
    command: Commands,
    config: &Config,
    backend: Arc<BackendClient>,
    confirm: Arc<dyn Confirm>,
) -> anyhow::Result<bool> {
    let today = Local::now().date_naive();

    match command {
        Commands::Login {
            identificador,
            password,
        } => {
            let contrasena = password_or_prompt(password, confirm.as_ref()).await?;
            let auth = AuthController::new(backend);
            finish(auth.login(&LoginForm { identificador, contrasena }).await).await?;
        }

        Commands::Logout => {
            if let Err(e) = backend.logout().await {
                tracing::warn!(error = %e, "Logout request failed");
            }
            println!("Sesión cerrada.");
            return Ok(true);
        }

        Commands::Register {
            nombre,
            telefono,
            email,
            barrio,
            fecha_nac,
            lanchero,
            mensaje,
            foto_lancha,
            password,
        } => {
            let contrasena = password_or_prompt(password, confirm.as_ref()).await?;
            let foto_lancha = match foto_lancha {
                Some(path) => Some(read_attachment(&path).await?),
                None => None,
            };
            let form = RegistrationForm {
                nombre,
                telefono,
                email,
                barrio,
                contrasena,
                fecha_nac,
                rol: if lanchero { Role::Lanchero } else { Role::Usuario },
                mensaje_lanchero: mensaje,
                foto_lancha,
            };
            let auth = AuthController::new(backend);
            finish(auth.register(&form, today).await).await?;
        }

        Commands::ResetRequest { email } => {
            let auth = AuthController::new(backend);
            finish(auth.request_password_reset(&email).await).await?;
        }

        Commands::ResetConfirm { link } => {
            let page = PasswordResetController::from_url(backend, &link);
            if let Some(notice) = page.initial_notice() {
                bail!("{}", notice);
            }
            let new_password = confirm
                .prompt("Nueva contraseña:")
                .await
                .context("No password entered")?;
            let confirm_password = confirm
                .prompt("Confirmar contraseña:")
                .await
                .context("No password entered")?;
            finish(page.submit(&new_password, &confirm_password).await).await?;
        }

        Commands::Dashboard { watch } => {
            let page = Arc::new(DashboardController::new(backend, config.display.label_locale()));
            if watch {
                watch_dashboard(page, config.polling.user_stats_interval()).await?;
            } else {
                page.on_load(false).await;
                page.refresh_user()
                    .await
                    .context("No se pudieron cargar los datos del usuario")?;
                print_dashboard(&page).await;
            }
        }

        Commands::Worklist { watch } => {
            let page = Arc::new(WorklistController::new(backend, confirm));
            if watch {
                watch_worklist(page, config.polling.worklist_interval()).await?;
            } else {
                page.load_reports()
                    .await
                    .context("Error al obtener los reportes")?;
                if let Some(view) = page.view().await {
                    println!("{}", view.to_text());
                }
            }
        }

        Commands::Collect { id } => {
            let page = WorklistController::new(backend, confirm);
            finish(page.collect(id).await).await?;
            println!("Reporte {} marcado como recogido.", id);
            if let Some(view) = page.view().await {
                println!("{}", view.to_text());
            }
        }

        Commands::Admin { action } => {
            let (action, ids) = match action {
                AdminCommand::Approve { ids } => (RequestAction::Approve, ids),
                AdminCommand::Reject { ids } => (RequestAction::Reject, ids),
            };
            let page = AdminController::new(backend, confirm, ids.clone());
            let mut failed = 0;
            for id in &ids {
                match page.process(id, action).await {
                    Ok(_) => println!("Solicitud {} procesada.", id),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {}", id, e.user_message());
                    }
                }
            }
            if failed > 0 {
                bail!("{} de {} solicitudes no se procesaron", failed, ids.len());
            }
        }

        Commands::Profile {
            nombre,
            barrio,
            email,
            fecha_nac,
        } => {
            let update = ProfileUpdate {
                nombre: nombre.unwrap_or_default(),
                barrio: barrio.unwrap_or_default(),
                email: email.unwrap_or_default(),
                fecha_nac: fecha_nac.unwrap_or_default(),
            };
            let page = ProfileController::new(backend, confirm);
            finish(page.update_profile(&update, today).await).await?;
        }

        Commands::Avatar { path } => {
            let avatar = read_attachment(&path).await?;
            let page = ProfileController::new(backend, confirm);
            finish(page.upload_avatar(&avatar).await).await?;
            if let Some(src) = page.avatar_src() {
                println!("{}", src);
            }
        }

        Commands::DeleteAccount => {
            let page = ProfileController::new(backend, confirm);
            finish(page.delete_account().await).await?;
            return Ok(true);
        }

        Commands::Report {
            kg,
            ubicacion,
            foto,
        } => {
            let report = PickupReport {
                kg,
                ubicacion,
                foto: read_attachment(&foto).await?,
            };
            let page = ReportController::new(backend);
            finish(page.submit(&report).await).await?;
        }

        Commands::Config { .. } | Commands::Theme { .. } => {}
    }

    Ok(false)
}

/// Print the outcome of an action and follow its navigation
async fn finish(result: Result<Completion, ActionError>) -> anyhow::Result<()> {
    let completion = match result {
        Ok(completion) => completion,
        Err(e) => bail!("{}", e.user_message()),
    };

    if let Some(notice) = &completion.notice {
        println!("{}", notice);
    }
    if let Some(navigation) = completion.navigation {
        let target = navigation.wait().await;
        println!("→ {}", target);
    }
    Ok(())
}

async fn password_or_prompt(
    password: Option<String>,
    confirm: &dyn Confirm,
) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => confirm
            .prompt("Contraseña:")
            .await
            .context("No password entered"),
    }
}

async fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    Attachment::from_path(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))
}

fn write_config(output: Option<&Path>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn theme(config: &Config, toggle: bool) -> anyhow::Result<()> {
    let mut store = ThemeStore::open(config.storage.theme_path());
    if toggle {
        store.toggle().context("Failed to save theme")?;
    }
    let theme = store.current();
    println!("{} {}", theme.as_str(), render_theme_toggle(theme));
    Ok(())
}

fn chart_text(chart: Option<ChartSpec>) -> String {
    chart
        .map(|chart| chart.to_text(30))
        .unwrap_or_else(|| "Sin datos esta semana".to_string())
}

async fn print_dashboard<B: Backend>(page: &DashboardController<B>) {
    if let Some(stats) = page.stats_view().await {
        println!("{}", stats.to_text());
    }
    println!("\nProgreso semanal\n{}", chart_text(page.chart()));
    if let Some(ranking) = page.ranking_view().await {
        println!("\nRanking\n{}", ranking.to_text());
    }
}

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Forward each line typed on stdin as a push notification. A plain thread,
/// so a pending read never holds up runtime shutdown.
fn refresh_on_enter(notifier: PushNotifier) {
    std::thread::spawn(move || {
        let mut line = String::new();
        while matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            if !notifier.notify() {
                break;
            }
            line.clear();
        }
    });
}

async fn watch_dashboard<B: Backend + 'static>(
    page: Arc<DashboardController<B>>,
    interval: Duration,
) -> anyhow::Result<()> {
    page.on_load(false).await;

    let (notifier, push) = PushNotifier::channel();
    refresh_on_enter(notifier);
    let poller = Poller::spawn(Arc::clone(&page), interval, Some(push));

    let mut clock = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = clock.tick() => {
                print!("{}Chocó Limpio · {}\n\n", CLEAR_SCREEN, live_time(&Local::now()));
                print_dashboard(&page).await;
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}

async fn watch_worklist<B: Backend + 'static>(
    page: Arc<WorklistController<B>>,
    interval: Duration,
) -> anyhow::Result<()> {
    let poller = Poller::spawn(Arc::clone(&page), interval, None);

    let mut clock = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = clock.tick() => {
                print!("{}Chocó Limpio · {}\n\n", CLEAR_SCREEN, live_time(&Local::now()));
                match page.view().await {
                    Some(view) => println!("{}", view.to_text()),
                    None => println!("Cargando reportes..."),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}
