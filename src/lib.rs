//! # Chocó Limpio
//!
//! Client for the Chocó Limpio recycling-collection backend: the page
//! controllers of the web frontend, modelled without a browser.
//!
//! ## Features
//!
//! - **Forms**: login, registration, password reset, profile and pickup
//!   reports, validated before anything is sent
//! - **Polling**: dashboard totals every 10 s and the collector worklist
//!   every 15 s, plus push-triggered refreshes
//! - **Confirmed actions**: approve/reject applications, mark pickups as
//!   collected, delete the account
//! - **Views**: pure render functions producing [`view::ViewNode`] trees
//!
//! ## Modules
//!
//! - [`client`]: backend API trait and its HTTP implementation
//! - [`controllers`]: one controller per page
//! - [`poller`]: interval and push driven refresh loop
//! - [`view`], [`chart`]: render functions and chart data
//! - [`validation`]: client-side form rules
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use choco_limpio::{BackendClient, Config, DashboardController, Poller};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let backend = Arc::new(BackendClient::new(&config.backend)?);
//!
//!     let dashboard = Arc::new(DashboardController::new(
//!         backend,
//!         config.display.label_locale(),
//!     ));
//!     dashboard.on_load(false).await;
//!
//!     let poller = Poller::spawn(dashboard.clone(), config.polling.user_stats_interval(), None);
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     poller.stop();
//!
//!     if let Some(view) = dashboard.stats_view().await {
//!         println!("{}", view.to_text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod chart;
pub mod client;
pub mod config;
pub mod confirm;
pub mod controllers;
pub mod page;
pub mod poller;
pub mod theme;
pub mod validation;
pub mod view;

// Re-export top-level types for convenience
pub use client::{Backend, BackendClient, ClientError, ClientResult, SessionStore};

pub use controllers::{
    ActionError, AdminController, AuthController, DashboardController, PasswordResetController,
    ProfileController, ReportController, WorklistController,
};

pub use config::{Config, ConfigError};

pub use page::{BusyGuard, Completion, Control, Navigation, Notice, Section};

pub use poller::{Poller, PushNotifier, Refresh};

pub use theme::{Theme, ThemeStore};

pub use validation::ValidationError;
