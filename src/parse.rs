use lazy_static::lazy_static;
use regex::Regex;

/// Markers that separate the subject name from classroom/group tokens in a
/// schedule cell. Matched case-insensitively against whole tokens.
const LESSON_TYPE_MARKERS: [&str; 6] = ["лб", "лк", "пр", "лаб", "лек", "прак"];

/// Fallback slot used when a time-range label cannot be split into two parts.
pub const FALLBACK_TIME_RANGE: (&str, &str) = ("08:30", "10:00");

lazy_static! {
    // Group code: 2+ letters, hyphen, digits. Example: "ИСТ-122", "ФКспк-324".
    static ref GROUP_RE: Regex = Regex::new(r"^[А-Яа-яA-Za-z]{2,}-[0-9]+$").unwrap();
    // Classroom fragments: pure digits with optional trailing letters
    // ("312", "312а") or a digit run framed by single letters ("а312", "а312б").
    static ref CLASSROOM_DIGITS_RE: Regex =
        Regex::new(r"^[0-9]+[А-Яа-яA-Za-z]*$").unwrap();
    static ref CLASSROOM_FRAMED_RE: Regex =
        Regex::new(r"^[А-Яа-яA-Za-z]?[0-9]+[А-Яа-яA-Za-z]?$").unwrap();
    // Last-resort group scan over the raw cell text. Catches codes the
    // whitespace tokenizer split apart, e.g. "ИСТ - 122".
    static ref LOOSE_GROUP_RE: Regex =
        Regex::new(r"[А-Яа-яA-Za-z]+\s*-\s*[0-9]+").unwrap();
}

/// One schedule cell after tokenization. `subject_name` is the raw cell text
/// verbatim whenever no lesson-type marker was found, so it is empty only for
/// an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLessonLine {
    pub subject_name: String,
    pub lesson_type: String,
    pub classroom: String,
    pub groups: Vec<String>,
}

/// Maps a localized (Russian or English) day name to 1..=6, Monday first.
/// Unknown names fall back to Monday; callers must not treat the fallback as
/// an error signal.
pub fn map_day_name(name: &str) -> u8 {
    match name.trim().to_lowercase().as_str() {
        "понедельник" | "monday" => 1,
        "вторник" | "tuesday" => 2,
        "среда" | "wednesday" => 3,
        "четверг" | "thursday" => 4,
        "пятница" | "friday" => 5,
        "суббота" | "saturday" => 6,
        _ => 1,
    }
}

/// Splits a time-range label like "8:30-10:00" into start and end. Accepts
/// hyphen, en-dash and em-dash separators. Anything that does not split into
/// exactly two parts yields the fixed fallback pair; a two-part split is
/// returned as-is, even when one side is empty.
pub fn parse_time_range(label: &str) -> (String, String) {
    let clean: String = label.chars().filter(|c| !c.is_whitespace()).collect();
    let parts: Vec<&str> = clean.split(['-', '–', '—']).collect();
    if let [start, end] = parts.as_slice() {
        return (start.to_string(), end.to_string());
    }
    (
        FALLBACK_TIME_RANGE.0.to_string(),
        FALLBACK_TIME_RANGE.1.to_string(),
    )
}

fn is_lesson_type_marker(token: &str) -> bool {
    let lower = token.to_lowercase();
    LESSON_TYPE_MARKERS.contains(&lower.as_str())
}

fn strip_punctuation(token: &str) -> String {
    token
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Single-char-hyphen-single-char classroom shape, e.g. "и-З". Only the first
/// two hyphen-separated segments are inspected.
fn is_classroom_shape(token: &str) -> bool {
    if !token.contains('-') {
        return false;
    }
    let mut segments = token.split('-');
    match (segments.next(), segments.next()) {
        (Some(before), Some(after)) => {
            before.chars().count() == 1 && after.chars().count() == 1
        }
        _ => false,
    }
}

/// True when the token can belong to a classroom string: digits, digits with
/// adjacent single letters, or the single-char-hyphen shape. Group codes are
/// never classroom fragments.
fn is_classroom_fragment(token: &str) -> bool {
    if is_group(token) {
        return false;
    }
    if CLASSROOM_DIGITS_RE.is_match(token) || CLASSROOM_FRAMED_RE.is_match(token) {
        return true;
    }
    is_classroom_shape(token)
}

/// Whether the token (after stripping '.' and ',') is a group code. A 2+
/// letter prefix before the hyphen always wins as a group; a single-letter
/// prefix is a classroom fragment, never a group.
pub fn is_group(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let clean = strip_punctuation(token);
    if is_classroom_shape(&clean) {
        return false;
    }
    GROUP_RE.is_match(&clean)
}

fn extract_groups<'a, I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: Vec<String> = Vec::new();
    for token in tokens {
        let clean = strip_punctuation(token);
        if is_group(&clean) {
            push_unique(&mut groups, clean);
        }
    }
    groups
}

fn push_unique(groups: &mut Vec<String>, group: String) {
    if !groups.contains(&group) {
        groups.push(group);
    }
}

/// Scanner state for the remaining tokens after the lesson-type marker:
/// classroom fragments first, group codes after.
enum Scan {
    SeekingClassroom,
    CollectingGroups,
}

/// Parses one raw schedule cell into subject name, lesson type, classroom and
/// group codes. Never fails: when no structure is recognized, the whole cell
/// text becomes the subject name and the other fields stay empty.
pub fn parse_lesson_line(cell: &str) -> ParsedLessonLine {
    let mut result = ParsedLessonLine::default();

    let tokens: Vec<&str> = cell.split_whitespace().collect();
    let marker_index = tokens.iter().position(|t| is_lesson_type_marker(t));

    match marker_index {
        Some(at) if at > 0 => {
            result.subject_name = tokens[..at].join(" ");
            result.lesson_type = tokens[at].to_string();

            let remaining = &tokens[at + 1..];
            let mut classroom = String::new();
            let mut group_tokens: Vec<&str> = Vec::new();
            let mut state = Scan::SeekingClassroom;

            for (i, token) in remaining.iter().enumerate() {
                match state {
                    Scan::SeekingClassroom => {
                        let last = i == remaining.len() - 1;
                        let next_is_group =
                            remaining.get(i + 1).is_some_and(|next| is_group(next));
                        // Classroom tokens are concatenated without spaces.
                        classroom.push_str(token);
                        if last || next_is_group {
                            state = Scan::CollectingGroups;
                        } else if token.contains('-') && is_classroom_shape(token) {
                            state = Scan::CollectingGroups;
                        } else if is_classroom_fragment(token) {
                            // Classroom may span several tokens; keep seeking.
                        } else {
                            // Unclassifiable token: absorb it into the
                            // classroom and stop looking for more.
                            state = Scan::CollectingGroups;
                        }
                    }
                    Scan::CollectingGroups => {
                        if is_group(token) {
                            group_tokens.push(*token);
                        }
                        // Non-group tokens after the classroom are dropped.
                    }
                }
            }

            result.classroom = classroom;
            result.groups = extract_groups(group_tokens);
        }
        // No marker, or a marker in leading position: keep the cell text
        // verbatim as the subject and still try to pull group codes out.
        _ => {
            result.subject_name = cell.to_string();
            result.groups = extract_groups(tokens);
        }
    }

    // The tokenizer misses codes split by stray spacing ("ИСТ - 122"); rescan
    // the raw text and squeeze the whitespace out of each match.
    if result.groups.is_empty() {
        for m in LOOSE_GROUP_RE.find_iter(cell) {
            let squeezed: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
            push_unique(&mut result.groups, squeezed);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_names_map_case_insensitively() {
        assert_eq!(map_day_name("Понедельник"), 1);
        assert_eq!(map_day_name("СУББОТА"), 6);
        assert_eq!(map_day_name("wednesday"), 3);
        assert_eq!(map_day_name("Friday"), 5);
    }

    #[test]
    fn unknown_day_names_fall_back_to_monday() {
        assert_eq!(map_day_name("unknown"), 1);
        assert_eq!(map_day_name(""), 1);
        assert_eq!(map_day_name("воскресенье"), 1);
    }

    #[test]
    fn time_range_splits_on_all_dash_variants() {
        assert_eq!(
            parse_time_range("8:30-10:00"),
            ("8:30".to_string(), "10:00".to_string())
        );
        assert_eq!(
            parse_time_range("10:10 – 11:40"),
            ("10:10".to_string(), "11:40".to_string())
        );
        assert_eq!(
            parse_time_range("12:00—13:30"),
            ("12:00".to_string(), "13:30".to_string())
        );
    }

    #[test]
    fn malformed_time_range_yields_fallback_pair() {
        let fallback = ("08:30".to_string(), "10:00".to_string());
        assert_eq!(parse_time_range("garbage"), fallback);
        assert_eq!(parse_time_range(""), fallback);
        assert_eq!(parse_time_range("8:30-10:00-11:30"), fallback);
    }

    #[test]
    fn two_part_time_range_is_kept_even_with_an_empty_side() {
        assert_eq!(
            parse_time_range("8:30-"),
            ("8:30".to_string(), String::new())
        );
        assert_eq!(
            parse_time_range("–10:00"),
            (String::new(), "10:00".to_string())
        );
    }

    #[test]
    fn group_codes_need_two_letter_prefix() {
        assert!(is_group("ИСТ-122"));
        assert!(is_group("Ссп-124"));
        assert!(is_group("ФКспк-324"));
        assert!(is_group("AB-1"));
        assert!(is_group("ИСТ-122,"));

        assert!(!is_group("а-З"));
        assert!(!is_group("и-3"));
        assert!(!is_group("312"));
        assert!(!is_group("312а"));
        assert!(!is_group("ИСТ-"));
        assert!(!is_group(""));
    }

    #[test]
    fn classroom_fragments_cover_digit_and_framed_shapes() {
        assert!(is_classroom_fragment("312"));
        assert!(is_classroom_fragment("312а"));
        assert!(is_classroom_fragment("а312"));
        assert!(is_classroom_fragment("и-З"));
        assert!(!is_classroom_fragment("ИСТ-122"));
        assert!(!is_classroom_fragment("Математика"));
    }

    #[test]
    fn marker_line_splits_subject_type_classroom_groups() {
        let parsed = parse_lesson_line("Математика лк 215 ИСТ-122 ИСТ-123");
        assert_eq!(parsed.subject_name, "Математика");
        assert_eq!(parsed.lesson_type, "лк");
        assert_eq!(parsed.classroom, "215");
        assert_eq!(parsed.groups, vec!["ИСТ-122", "ИСТ-123"]);
    }

    #[test]
    fn multi_word_subject_is_joined_before_marker() {
        let parsed = parse_lesson_line("Теория вероятностей пр 312а ПМИ-21");
        assert_eq!(parsed.subject_name, "Теория вероятностей");
        assert_eq!(parsed.lesson_type, "пр");
        assert_eq!(parsed.classroom, "312а");
        assert_eq!(parsed.groups, vec!["ПМИ-21"]);
    }

    #[test]
    fn classroom_may_span_several_tokens() {
        let parsed = parse_lesson_line("Физика лб 312 а ИСТ-122");
        assert_eq!(parsed.classroom, "312а");
        assert_eq!(parsed.groups, vec!["ИСТ-122"]);
    }

    #[test]
    fn single_char_hyphen_token_is_classroom_not_group() {
        let parsed = parse_lesson_line("Информатика пр и-З ИВТ-21");
        assert_eq!(parsed.classroom, "и-З");
        assert_eq!(parsed.groups, vec!["ИВТ-21"]);
    }

    #[test]
    fn no_marker_keeps_whole_cell_as_subject_but_extracts_groups() {
        let parsed = parse_lesson_line("Физкультура ИСТ-122");
        assert_eq!(parsed.subject_name, "Физкультура ИСТ-122");
        assert_eq!(parsed.lesson_type, "");
        assert_eq!(parsed.classroom, "");
        assert_eq!(parsed.groups, vec!["ИСТ-122"]);
    }

    #[test]
    fn leading_marker_is_treated_as_unstructured() {
        let parsed = parse_lesson_line("лк Математика ИСТ-122");
        assert_eq!(parsed.subject_name, "лк Математика ИСТ-122");
        assert_eq!(parsed.lesson_type, "");
        assert_eq!(parsed.groups, vec!["ИСТ-122"]);
    }

    #[test]
    fn marker_matches_case_insensitively() {
        let parsed = parse_lesson_line("Химия ЛБ 101 ХИМ-11");
        assert_eq!(parsed.lesson_type, "ЛБ");
        assert_eq!(parsed.subject_name, "Химия");
    }

    #[test]
    fn fallback_scan_recovers_groups_split_by_spaces() {
        let parsed = parse_lesson_line("Математика лк 215 ИСТ - 122");
        assert_eq!(parsed.subject_name, "Математика");
        assert_eq!(parsed.groups, vec!["ИСТ-122"]);
    }

    #[test]
    fn fallback_scan_accepts_single_letter_prefixes() {
        // The loose rescan is intentionally broader than is_group: with no
        // other candidates, even a one-letter code is kept.
        let parsed = parse_lesson_line("Информатика пр и-3");
        assert_eq!(parsed.classroom, "и-3");
        assert_eq!(parsed.groups, vec!["и-3"]);
    }

    #[test]
    fn groups_are_deduplicated_in_first_seen_order() {
        let parsed = parse_lesson_line("Математика лк 215 ИСТ-123 ИСТ-122 ИСТ-123");
        assert_eq!(parsed.groups, vec!["ИСТ-123", "ИСТ-122"]);
    }

    #[test]
    fn punctuation_is_stripped_from_group_tokens() {
        let parsed = parse_lesson_line("Математика лк 215 ИСТ-122, ИСТ-123.");
        assert_eq!(parsed.groups, vec!["ИСТ-122", "ИСТ-123"]);
    }

    #[test]
    fn unparseable_cell_becomes_subject_verbatim() {
        let parsed = parse_lesson_line("Иностранный язык");
        assert_eq!(parsed.subject_name, "Иностранный язык");
        assert_eq!(parsed.lesson_type, "");
        assert_eq!(parsed.classroom, "");
        assert!(parsed.groups.is_empty());
    }

    #[test]
    fn empty_cell_parses_to_empty_line() {
        assert_eq!(parse_lesson_line(""), ParsedLessonLine::default());
    }
}
