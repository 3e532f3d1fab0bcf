use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::parse::{map_day_name, parse_lesson_line, parse_time_range};

/// Sentinel group recorded when a cell yields no group codes. This is a plain
/// string on purpose: the schedule vocabulary downstream is string group
/// names, and the UI renders it as-is.
pub const UNSPECIFIED_GROUP: &str = "Не указана";

/// Biweekly rotation tag for a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekType {
    Numerator,
    Denominator,
    Both,
}

impl WeekType {
    /// Week-type labels as they appear inside a schedule cell map, checked in
    /// this fixed order for every time slot.
    pub const CELL_LABELS: [(&'static str, WeekType); 3] = [
        ("числитель", WeekType::Numerator),
        ("знаменатель", WeekType::Denominator),
        ("Общая", WeekType::Both),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeekType::Numerator => "numerator",
            WeekType::Denominator => "denominator",
            WeekType::Both => "both",
        }
    }

    pub fn parse(tag: &str) -> Option<WeekType> {
        match tag {
            "numerator" => Some(WeekType::Numerator),
            "denominator" => Some(WeekType::Denominator),
            "both" => Some(WeekType::Both),
            _ => None,
        }
    }
}

/// One normalized, not-yet-persisted lesson record. The materializer emits one
/// draft per group, so `groups` always holds exactly one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub subject_name: String,
    pub groups: Vec<String>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub week_type: WeekType,
    pub classroom: String,
    pub lesson_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntry {
    pub name: String,
    pub groups: Vec<String>,
}

/// Subjects keyed by exact name, in first-seen order. Built as a fold over
/// lesson drafts; group sets are unioned, never replaced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubjectRegistry {
    entries: Vec<SubjectEntry>,
}

impl SubjectRegistry {
    pub fn absorb(mut self, draft: &LessonDraft) -> SubjectRegistry {
        match self
            .entries
            .iter_mut()
            .find(|e| e.name == draft.subject_name)
        {
            Some(entry) => {
                for group in &draft.groups {
                    if !entry.groups.contains(group) {
                        entry.groups.push(group.clone());
                    }
                }
            }
            None => {
                let mut groups: Vec<String> = Vec::new();
                for group in &draft.groups {
                    if !groups.contains(group) {
                        groups.push(group.clone());
                    }
                }
                self.entries.push(SubjectEntry {
                    name: draft.subject_name.clone(),
                    groups,
                });
            }
        }
        self
    }

    pub fn into_entries(self) -> Vec<SubjectEntry> {
        self.entries
    }
}

/// Result of one ingestion run, ready for the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleImport {
    pub subjects: Vec<SubjectEntry>,
    pub lessons: Vec<LessonDraft>,
}

/// Walks a raw schedule document (day -> time range -> week-type label ->
/// cell text) and materializes lesson drafts plus the deduplicated subject
/// registry. Malformed days, slots and cells are logged and skipped; the only
/// hard failure is a document with no iterable day map at all.
pub fn process_schedule(document: &Value) -> anyhow::Result<ScheduleImport> {
    let days = match document.get("days") {
        Some(inner) if !inner.is_null() => inner,
        _ => document,
    };
    let Some(days) = days.as_object() else {
        anyhow::bail!("schedule document has no day map to iterate");
    };

    let mut lessons: Vec<LessonDraft> = Vec::new();

    for (day_name, day_value) in days {
        let Some(slots) = day_value.as_object() else {
            warn!("skipping day {day_name:?}: value is not an object");
            continue;
        };
        let day_of_week = map_day_name(day_name);

        for (time_label, slot_value) in slots {
            let Some(cells) = slot_value.as_object() else {
                warn!("skipping time slot {time_label:?} on {day_name:?}: value is not an object");
                continue;
            };
            let (start_time, end_time) = parse_time_range(time_label);

            for (label, week_type) in WeekType::CELL_LABELS {
                match cells.get(label) {
                    Some(Value::String(cell)) if !cell.is_empty() => {
                        materialize_cell(
                            cell,
                            day_of_week,
                            &start_time,
                            &end_time,
                            week_type,
                            &mut lessons,
                        );
                    }
                    Some(Value::Null) | None => {}
                    Some(Value::String(_)) => {}
                    Some(other) => {
                        warn!(
                            "skipping {label} cell at {day_name:?} {time_label:?}: \
                             expected a string, got {other}"
                        );
                    }
                }
            }
        }
    }

    let registry = lessons
        .iter()
        .fold(SubjectRegistry::default(), |acc, draft| acc.absorb(draft));

    Ok(ScheduleImport {
        subjects: registry.into_entries(),
        lessons,
    })
}

/// Expands one parsed cell into one draft per group. A cell whose parse comes
/// back with an empty subject contributes nothing; a parse with no groups
/// contributes a single draft under the unspecified-group sentinel.
fn materialize_cell(
    cell: &str,
    day_of_week: u8,
    start_time: &str,
    end_time: &str,
    week_type: WeekType,
    lessons: &mut Vec<LessonDraft>,
) {
    let parsed = parse_lesson_line(cell);
    if parsed.subject_name.is_empty() {
        return;
    }

    let groups = if parsed.groups.is_empty() {
        vec![UNSPECIFIED_GROUP.to_string()]
    } else {
        parsed.groups
    };

    for group in groups {
        lessons.push(LessonDraft {
            subject_name: parsed.subject_name.clone(),
            groups: vec![group],
            day_of_week,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            week_type,
            classroom: parsed.classroom.clone(),
            lesson_type: parsed.lesson_type.clone(),
        });
    }
}
