use crate::reader::{Lesson, LessonSummary, lesson, lesson_summary};
use crate::writer::OutputLayout;

/// Read-only view over a scrape output directory.
#[derive(Debug, Clone)]
pub struct Library {
    layout: OutputLayout,
}

impl Library {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    /// Summaries in master-index order. An unscraped directory yields none.
    pub async fn summaries(&self) -> anyhow::Result<Vec<LessonSummary>> {
        if !tokio::fs::try_exists(self.layout.master_index_path()).await? {
            tracing::warn!(
                path = %self.layout.master_index_path().display(),
                "master index missing; serving empty library"
            );
            return Ok(Vec::new());
        }
        let lessons = self.layout.read_master_index().await?;
        Ok(lessons.iter().map(lesson_summary).collect())
    }

    pub async fn lesson(&self, id: u64) -> anyhow::Result<Option<Lesson>> {
        let parsed = self.layout.read_lesson_json(id).await?;
        Ok(parsed.as_ref().map(lesson))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{CrdData, CrdWord, LessonMeta};
    use crate::normalize::normalize;

    fn meta(id: u64, title: &str) -> LessonMeta {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "level": "Newbie",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn empty_directory_has_no_lessons() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let library = Library::new(OutputLayout::new(temp.path()));
        assert!(library.summaries().await?.is_empty());
        assert_eq!(library.lesson(1).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn reads_index_and_lessons() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let layout = OutputLayout::new(temp.path());
        let lessons = vec![meta(2, "Two"), meta(1, "One")];
        layout.write_master_index(&lessons).await?;

        let crd = CrdData {
            words: vec![CrdWord {
                hanzi: "好".to_owned(),
                tc_hanzi: None,
                pinyin: Some("hǎo".to_owned()),
                meaning: Some("good".to_owned()),
                hsk: Some(1),
            }],
            sentence_indices: vec![0],
            sentence_translations: vec!["One".to_owned(), "Good".to_owned()],
            syllable_times: None,
            extra: Default::default(),
        };
        layout.write_lesson_json(&normalize(crd, &lessons[1], None)).await?;

        let library = Library::new(layout);
        let ids: Vec<String> = library.summaries().await?.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["2", "1"]);

        let view = library.lesson(1).await?.expect("lesson 1 written");
        assert_eq!(view.sentences.len(), 1);
        assert_eq!(view.sentences[0].english, "Good");
        assert_eq!(view.vocabulary[0].simplified, "好");
        assert_eq!(library.lesson(2).await?, None);
        Ok(())
    }
}
