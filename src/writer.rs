use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;

use crate::formats::{LessonMeta, ParsedLesson};
use crate::level::{Level, level_dir_name};

pub const MASTER_INDEX_FILE: &str = "lessons.json";
pub const SERIES_INFO_FILE: &str = "_series-info.txt";

/// Paths under the scrape output directory. Lesson artifacts are keyed by id,
/// so re-scraping a lesson overwrites the same files.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn master_index_path(&self) -> PathBuf {
        self.root.join(MASTER_INDEX_FILE)
    }

    pub fn lessons_dir(&self) -> PathBuf {
        self.root.join("lessons")
    }

    pub fn lesson_json_path(&self, id: u64) -> PathBuf {
        self.lessons_dir().join(format!("{id}.json"))
    }

    pub fn level_dir(&self, raw_level: &str) -> PathBuf {
        self.root.join("by-level").join(level_dir_name(raw_level))
    }

    pub fn series_dir(&self, series_title: &str) -> PathBuf {
        self.root.join("by-series").join(slugify(series_title))
    }

    pub fn lesson_text_path(&self, lesson: &ParsedLesson) -> PathBuf {
        self.level_dir(&lesson.level)
            .join(format!("{}-{}.txt", lesson.id, slugify(&lesson.title)))
    }

    pub fn series_text_path(&self, lesson: &ParsedLesson) -> Option<PathBuf> {
        let series = lesson.series.as_ref()?;
        Some(self.series_dir(&series.title).join(format!(
            "{:02}-{}.txt",
            series.chapter,
            slugify(&lesson.title)
        )))
    }

    pub async fn ensure_output_dirs(&self, write_text: bool) -> anyhow::Result<()> {
        let mut dirs = vec![self.lessons_dir()];
        if write_text {
            dirs.extend(Level::ALL.map(|level| self.level_dir(level.as_str())));
        }
        for dir in dirs {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("create output dir: {}", dir.display()))?;
        }
        Ok(())
    }

    pub async fn write_master_index(&self, lessons: &[LessonMeta]) -> anyhow::Result<()> {
        write_json_atomic(&self.master_index_path(), &lessons)
            .await
            .context("write master index")
    }

    pub async fn read_master_index(&self) -> anyhow::Result<Vec<LessonMeta>> {
        let path = self.master_index_path();
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?
            .ok_or_else(|| anyhow::anyhow!("master index not found: {}", path.display()))
    }

    pub async fn write_lesson_json(&self, lesson: &ParsedLesson) -> anyhow::Result<()> {
        write_json_atomic(&self.lesson_json_path(lesson.id), lesson)
            .await
            .with_context(|| format!("write lesson json: {}", lesson.id))
    }

    pub async fn read_lesson_json(&self, id: u64) -> anyhow::Result<Option<ParsedLesson>> {
        let path = self.lesson_json_path(id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    pub async fn lesson_json_exists(&self, id: u64) -> anyhow::Result<bool> {
        let path = self.lesson_json_path(id);
        fs::try_exists(&path)
            .await
            .with_context(|| format!("check: {}", path.display()))
    }

    pub async fn write_lesson_text(&self, lesson: &ParsedLesson, text: &str) -> anyhow::Result<()> {
        write_text(&self.lesson_text_path(lesson), text).await
    }

    /// No-op for lessons outside a series.
    pub async fn write_series_text(&self, lesson: &ParsedLesson, text: &str) -> anyhow::Result<()> {
        match self.series_text_path(lesson) {
            Some(path) => write_text(&path, text).await,
            None => Ok(()),
        }
    }

    pub async fn write_series_info(&self, series_title: &str, info: &str) -> anyhow::Result<()> {
        write_text(&self.series_dir(series_title).join(SERIES_INFO_FILE), info).await
    }
}

/// URL-friendly slug. Titles that are mostly CJK keep their ideographs.
pub fn slugify(text: &str) -> String {
    let total = text.chars().count();
    let cjk = text.chars().filter(|c| is_cjk(*c)).count();
    let keep_cjk = cjk > 0 && cjk * 2 > total;

    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || (keep_cjk && is_cjk(c));
        if !keep {
            pending_dash = true;
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push(c);
    }
    out
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

async fn write_text(path: &Path, text: &str) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;
    fs::write(path, text)
        .await
        .with_context(|| format!("write text: {}", path.display()))
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

pub(crate) async fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
