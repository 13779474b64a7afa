use std::collections::HashMap;

use crate::formats::{Course, LessonMeta};
use crate::writer::slugify;

/// Lessons grouped by course, built from the complete index before any
/// lesson body is fetched so chapter totals do not depend on fetch order.
#[derive(Debug, Default)]
pub struct SeriesIndex {
    groups: Vec<SeriesGroup>,
    by_key: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct SeriesGroup {
    pub key: String,
    pub title: String,
    pub description: String,
    pub members: Vec<LessonMeta>,
    /// Highest course position seen; undercounts when the index was filtered.
    pub chapter_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub position: u32,
    pub title: String,
}

impl SeriesIndex {
    pub fn build(lessons: &[LessonMeta]) -> Self {
        let mut index = Self::default();
        for lesson in lessons {
            let Some(course) = lesson.series_course() else {
                continue;
            };
            let key = series_key(course);
            let slot = match index.by_key.get(&key) {
                Some(&slot) => slot,
                None => {
                    index.groups.push(SeriesGroup {
                        key: key.clone(),
                        title: course.title.clone(),
                        description: course.description.clone().unwrap_or_default(),
                        members: Vec::new(),
                        chapter_count: 0,
                    });
                    index.by_key.insert(key, index.groups.len() - 1);
                    index.groups.len() - 1
                }
            };
            let group = &mut index.groups[slot];
            group.chapter_count = group
                .chapter_count
                .max(lesson.course_position.unwrap_or(0));
            group.members.push(lesson.clone());
        }
        index
    }

    pub fn total_chapters(&self, lesson: &LessonMeta) -> Option<u32> {
        let course = lesson.series_course()?;
        let slot = self.by_key.get(&series_key(course))?;
        Some(self.groups[*slot].chapter_count)
    }

    pub fn groups(&self) -> &[SeriesGroup] {
        &self.groups
    }
}

impl SeriesGroup {
    /// Members with a known position, in chapter order.
    pub fn chapters(&self) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = self
            .members
            .iter()
            .filter_map(|m| {
                Some(Chapter {
                    position: m.course_position?,
                    title: m.title.clone(),
                })
            })
            .collect();
        chapters.sort_by_key(|c| c.position);
        chapters
    }
}

fn series_key(course: &Course) -> String {
    if course.slug.is_empty() {
        slugify(&course.title)
    } else {
        course.slug.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: u64, title: &str, course: Option<(&str, &str)>, pos: Option<u32>) -> LessonMeta {
        let mut value = serde_json::json!({
            "id": id,
            "title": title,
            "level": "Elementary",
            "has_course": course.is_some(),
            "course_position": pos,
        });
        if let Some((course_title, slug)) = course {
            value["course"] = serde_json::json!({
                "title": course_title,
                "slug": slug,
                "description": "A story",
            });
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn chapter_count_is_max_position_per_course() {
        let lessons = vec![
            lesson(1, "Two", Some(("Trip", "trip")), Some(2)),
            lesson(2, "Solo", None, None),
            lesson(3, "Five", Some(("Trip", "trip")), Some(5)),
            lesson(4, "One", Some(("Other", "other")), Some(1)),
        ];
        let index = SeriesIndex::build(&lessons);

        assert_eq!(index.groups().len(), 2);
        assert_eq!(index.total_chapters(&lessons[0]), Some(5));
        assert_eq!(index.total_chapters(&lessons[1]), None);
        assert_eq!(index.total_chapters(&lessons[3]), Some(1));
    }

    #[test]
    fn chapters_sorted_and_positionless_members_dropped() {
        let lessons = vec![
            lesson(1, "Three", Some(("Trip", "trip")), Some(3)),
            lesson(2, "Loose", Some(("Trip", "trip")), None),
            lesson(3, "One", Some(("Trip", "trip")), Some(1)),
        ];
        let index = SeriesIndex::build(&lessons);
        let group = &index.groups()[0];

        assert_eq!(group.title, "Trip");
        assert_eq!(group.description, "A story");
        assert_eq!(group.members.len(), 3);
        let titles: Vec<_> = group.chapters().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["One", "Three"]);
    }

    #[test]
    fn course_without_flag_is_ignored() {
        let mut orphan = lesson(9, "Orphan", Some(("Trip", "trip")), Some(1));
        orphan.has_course = false;
        let index = SeriesIndex::build(&[orphan]);
        assert!(index.groups().is_empty());
    }
}
