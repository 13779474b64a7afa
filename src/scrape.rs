use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::config::{Credentials, ScrapeConfig};
use crate::crawl::LessonApi;
use crate::formats::LessonMeta;
use crate::series::SeriesIndex;
use crate::writer::OutputLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Existing,
    Locked,
    NoContentUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonOutcome {
    Processed,
    Skipped(SkipReason),
    Failed(LessonFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonFailure {
    pub id: u64,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub failures: Vec<LessonFailure>,
}

impl ScrapeSummary {
    pub fn from_outcomes(outcomes: Vec<LessonOutcome>, elapsed: Duration) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            elapsed,
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                LessonOutcome::Processed => summary.processed += 1,
                LessonOutcome::Skipped(_) => summary.skipped += 1,
                LessonOutcome::Failed(failure) => {
                    summary.failed += 1;
                    summary.failures.push(failure);
                }
            }
        }
        summary
    }
}

impl fmt::Display for ScrapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== COMPLETE ===")?;
        writeln!(f, "Processed: {}", self.processed)?;
        writeln!(f, "Skipped:   {}", self.skipped)?;
        writeln!(f, "Failed:    {}", self.failed)?;
        writeln!(f, "Total:     {}", self.total)?;
        writeln!(f, "Time:      {:.1}s", self.elapsed.as_secs_f64())?;
        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed lessons:")?;
            for failure in &self.failures {
                writeln!(f, "  - [{}] {}: {}", failure.id, failure.title, failure.message)?;
            }
        }
        Ok(())
    }
}

/// State shared read-only by every batch worker.
struct LessonJob {
    api: LessonApi,
    layout: OutputLayout,
    series: SeriesIndex,
    skip_existing: bool,
    write_text: bool,
    total: usize,
}

pub async fn run(config: ScrapeConfig) -> anyhow::Result<ScrapeSummary> {
    let started = Instant::now();

    let session_cookie = match &config.credentials {
        Credentials::SessionCookie(cookie) => cookie.clone(),
        Credentials::Password { email, password } => {
            tracing::info!("scrape: authenticate");
            let sign_in_url = config.provider.sign_in_url()?;
            crate::auth::authenticate(&sign_in_url, email, password)
                .await
                .context("authenticate")?
        }
    };

    let api = LessonApi::new(config.provider.clone(), config.retry, config.page_delay)?;

    tracing::info!("scrape: fetch lesson index");
    let mut lessons = api
        .fetch_all_lessons(&session_cookie)
        .await
        .context("fetch lesson index")?;
    tracing::info!(total = lessons.len(), "found lessons");

    if let Some(level) = config.level {
        lessons.retain(|lesson| level.matches(&lesson.level));
        tracing::info!(%level, remaining = lessons.len(), "filtered by level");
    }
    if let Some(limit) = config.limit {
        lessons.truncate(limit);
        tracing::info!(limit, "limited lessons");
    }

    tracing::info!(out = %config.output_dir.display(), "scrape: prepare output");
    let layout = OutputLayout::new(&config.output_dir);
    layout.ensure_output_dirs(config.write_text).await?;
    layout.write_master_index(&lessons).await?;

    let series = SeriesIndex::build(&lessons);
    let job = Arc::new(LessonJob {
        api,
        layout,
        series,
        skip_existing: config.skip_existing,
        write_text: config.write_text,
        total: lessons.len(),
    });

    tracing::info!(concurrency = config.concurrency, "scrape: process lessons");
    let items: Vec<(usize, LessonMeta)> = lessons.into_iter().enumerate().collect();
    let worker_job = Arc::clone(&job);
    let outcomes = crate::pool::process_batch(items, config.concurrency, move |(idx, lesson)| {
        let job = Arc::clone(&worker_job);
        async move { job.process(idx + 1, lesson).await }
    })
    .await;

    if config.write_text {
        tracing::info!("scrape: write series info");
        write_series_info(&job.layout, &job.series).await?;
    }

    Ok(ScrapeSummary::from_outcomes(outcomes, started.elapsed()))
}

impl LessonJob {
    async fn process(&self, position: usize, lesson: LessonMeta) -> LessonOutcome {
        match self.try_process(position, &lesson).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let message = format!("{err:#}");
                tracing::error!(lesson_id = lesson.id, error = %message, "lesson failed");
                LessonOutcome::Failed(LessonFailure {
                    id: lesson.id,
                    title: lesson.title,
                    message,
                })
            }
        }
    }

    async fn try_process(
        &self,
        position: usize,
        lesson: &LessonMeta,
    ) -> anyhow::Result<LessonOutcome> {
        if self.skip_existing && self.layout.lesson_json_exists(lesson.id).await? {
            tracing::debug!(lesson_id = lesson.id, "skipped (already written)");
            return Ok(LessonOutcome::Skipped(SkipReason::Existing));
        }

        let series_note = match (lesson.series_course(), lesson.course_position) {
            (Some(course), Some(chapter)) => format!(" ({} ch. {chapter})", course.title),
            _ => String::new(),
        };
        tracing::info!(
            lesson_id = lesson.id,
            "[{position}/{}] processing: {}{series_note}",
            self.total,
            lesson.title
        );

        if lesson.locked {
            tracing::info!(lesson_id = lesson.id, "skipped (locked)");
            return Ok(LessonOutcome::Skipped(SkipReason::Locked));
        }
        let Some(crd_url) = lesson.crd_url.as_deref().filter(|u| !u.is_empty()) else {
            tracing::info!(lesson_id = lesson.id, "skipped (no CRD url)");
            return Ok(LessonOutcome::Skipped(SkipReason::NoContentUrl));
        };

        let crd = self.api.fetch_crd(crd_url).await.context("fetch crd")?;
        let parsed = crate::normalize::normalize(crd, lesson, self.series.total_chapters(lesson));

        self.layout.write_lesson_json(&parsed).await?;
        if self.write_text {
            let text = crate::render::format_lesson_text(&parsed);
            self.layout
                .write_lesson_text(&parsed, &text)
                .await
                .context("write lesson text")?;
            self.layout
                .write_series_text(&parsed, &text)
                .await
                .context("write series text")?;
        }

        Ok(LessonOutcome::Processed)
    }
}

async fn write_series_info(layout: &OutputLayout, series: &SeriesIndex) -> anyhow::Result<()> {
    for group in series.groups() {
        let info =
            crate::render::format_series_info(&group.title, &group.description, &group.chapters());
        layout
            .write_series_info(&group.title, &info)
            .await
            .with_context(|| format!("write series info: {}", group.title))?;
    }
    Ok(())
}

/// `show` subcommand: prints the stored text rendering of one lesson.
pub async fn show(output_dir: &str, id: u64) -> anyhow::Result<String> {
    let layout = OutputLayout::new(output_dir);
    let lesson = layout
        .read_lesson_json(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("lesson {id} not found under {output_dir}"))?;
    Ok(crate::render::format_lesson_text(&lesson))
}
