use crate::ingest::WeekType;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

struct LessonRow {
    id: String,
    subject_id: String,
    subject_name: String,
    group_name: String,
    day_of_week: i64,
    start_time: String,
    end_time: String,
    week_type: String,
    classroom: String,
    lesson_type: String,
}

fn row_from(r: &rusqlite::Row<'_>) -> rusqlite::Result<LessonRow> {
    Ok(LessonRow {
        id: r.get(0)?,
        subject_id: r.get(1)?,
        subject_name: r.get(2)?,
        group_name: r.get(3)?,
        day_of_week: r.get(4)?,
        start_time: r.get(5)?,
        end_time: r.get(6)?,
        week_type: r.get(7)?,
        classroom: r.get(8)?,
        lesson_type: r.get(9)?,
    })
}

const LESSON_COLUMNS: &str = "id, subject_id, subject_name, group_name, day_of_week, \
                              start_time, end_time, week_type, classroom, lesson_type";

/// Recombines per-group lesson rows into one record per (subject, slot, week
/// type, classroom, lesson type) with the group list merged back together.
/// The first row of each cluster contributes the representative id.
fn merge_rows(rows: Vec<LessonRow>) -> Vec<serde_json::Value> {
    let mut keys: Vec<String> = Vec::new();
    let mut merged: Vec<serde_json::Value> = Vec::new();

    for row in rows {
        let key = format!(
            "{}-{}-{}-{}-{}-{}-{}",
            row.subject_id,
            row.day_of_week,
            row.start_time,
            row.end_time,
            row.week_type,
            row.classroom,
            row.lesson_type
        );
        match keys.iter().position(|k| *k == key) {
            Some(i) => {
                if let Some(groups) = merged[i]["groups"].as_array_mut() {
                    groups.push(json!(row.group_name));
                }
            }
            None => {
                keys.push(key);
                merged.push(json!({
                    "id": row.id,
                    "subjectId": row.subject_id,
                    "subjectName": row.subject_name,
                    "groups": [row.group_name],
                    "dayOfWeek": row.day_of_week,
                    "startTime": row.start_time,
                    "endTime": row.end_time,
                    "weekType": row.week_type,
                    "classroom": row.classroom,
                    "lessonType": row.lesson_type,
                }));
            }
        }
    }
    merged
}

fn lessons_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let sql = format!(
        "SELECT {LESSON_COLUMNS} FROM lessons ORDER BY day_of_week, start_time, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| row_from(r))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(json!({ "lessons": merge_rows(rows) }))
}

fn lessons_list_by_day_and_week(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let day_of_week = params
        .get("dayOfWeek")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing dayOfWeek"))?;
    let week_type = params
        .get("weekType")
        .and_then(|v| v.as_str())
        .and_then(WeekType::parse)
        .ok_or_else(|| {
            HandlerErr::bad_params("weekType must be numerator, denominator or both")
        })?;

    // A lesson tagged "both" shows up on either half of the rotation.
    let sql = format!(
        "SELECT {LESSON_COLUMNS} FROM lessons
         WHERE day_of_week = ? AND (week_type = ? OR week_type = 'both')
         ORDER BY start_time, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((day_of_week, week_type.as_str()), |r| row_from(r))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(json!({ "lessons": merge_rows(rows) }))
}

fn lessons_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let lesson_id = params
        .get("lessonId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params("missing lessonId"))?;
    let deleted = conn.execute("DELETE FROM lessons WHERE id = ?", [lesson_id])?;
    Ok(json!({ "deleted": deleted }))
}

fn handle_lessons_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match lessons_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_lessons_list_by_day_and_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match lessons_list_by_day_and_week(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_lessons_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match lessons_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lessons.list" => Some(handle_lessons_list(state, req)),
        "lessons.listByDayAndWeek" => Some(handle_lessons_list_by_day_and_week(state, req)),
        "lessons.delete" => Some(handle_lessons_delete(state, req)),
        _ => None,
    }
}
