//! User dashboard: weekly chart, personal totals and the leaderboard

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use std::sync::{Arc, Mutex};

use crate::chart::{weekly_progress_chart, ChartCanvas, ChartSpec, LabelLocale};
use crate::client::{Backend, ClientError};
use crate::page::Section;
use crate::poller::Refresh;
use crate::view::{render_ranking, render_user_stats, ViewNode};

/// `HH:MM:SS` for the header clock
pub fn live_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M:%S").to_string()
}

pub struct DashboardController<B: Backend> {
    backend: Arc<B>,
    locale: LabelLocale,
    stats: Section,
    ranking: Section,
    canvas: Mutex<ChartCanvas>,
}

impl<B: Backend> DashboardController<B> {
    pub fn new(backend: Arc<B>, locale: LabelLocale) -> Self {
        Self {
            backend,
            locale,
            stats: Section::new(),
            ranking: Section::new(),
            canvas: Mutex::new(ChartCanvas::new()),
        }
    }

    /// Page load: draw the weekly chart once. A profile edit lands here
    /// with `updated` set, which also reloads the totals straight away.
    pub async fn on_load(&self, updated: bool) {
        let chart = self.load_weekly_progress();
        let result = if updated {
            let (chart, user) = futures_util::future::join(chart, self.refresh_user()).await;
            chart.and(user)
        } else {
            chart.await
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to load dashboard");
        }
    }

    /// Fetch the weekly totals and redraw the chart from scratch
    pub async fn load_weekly_progress(&self) -> Result<(), ClientError> {
        let progress = self.backend.weekly_progress().await?;
        let spec = weekly_progress_chart(&progress.progress, self.locale);
        tracing::debug!(days = spec.labels.len(), "Redrawing weekly chart");

        let mut canvas = self.canvas.lock().unwrap_or_else(|p| p.into_inner());
        canvas.redraw(spec);
        Ok(())
    }

    /// Fetch the user snapshot and rebuild the totals and the leaderboard
    pub async fn refresh_user(&self) -> Result<(), ClientError> {
        let snapshot = self.backend.user_snapshot().await?;
        let stats = render_user_stats(&snapshot);
        let ranking = render_ranking(&snapshot.top_users);

        self.stats.replace(stats).await;
        self.ranking.replace(ranking).await;
        tracing::debug!(ranked = snapshot.top_users.len(), "Dashboard user data refreshed");
        Ok(())
    }

    pub async fn stats_view(&self) -> Option<ViewNode> {
        self.stats.view().await
    }

    pub async fn ranking_view(&self) -> Option<ViewNode> {
        self.ranking.view().await
    }

    /// The chart currently drawn, if any
    pub fn chart(&self) -> Option<ChartSpec> {
        let canvas = self.canvas.lock().unwrap_or_else(|p| p.into_inner());
        canvas.current().map(|instance| instance.spec.clone())
    }

    /// How many chart instances have been replaced
    pub fn charts_destroyed(&self) -> u64 {
        self.canvas
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .destroyed_count()
    }
}

#[async_trait]
impl<B: Backend + 'static> Refresh for DashboardController<B> {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.refresh_user().await
    }
}
