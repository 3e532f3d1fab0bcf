use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn subjects_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.groups,
                (SELECT COUNT(*) FROM lessons l WHERE l.subject_id = s.id) AS lesson_count
         FROM subjects s
         ORDER BY s.name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, i64>(3)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    let subjects: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(id, name, groups, lesson_count)| {
            let groups: Vec<String> = serde_json::from_str(&groups).unwrap_or_default();
            json!({
                "id": id,
                "name": name,
                "groups": groups,
                "lessonCount": lesson_count,
            })
        })
        .collect();
    Ok(json!({ "subjects": subjects }))
}

fn subjects_update_groups(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = params
        .get("subjectId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params("missing subjectId"))?;
    let Some(groups_json) = params.get("groups").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing groups"));
    };
    let groups: Vec<String> = groups_json
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();

    let updated = conn.execute(
        "UPDATE subjects SET groups = ? WHERE id = ?",
        (
            serde_json::to_string(&groups).unwrap_or_else(|_| "[]".to_string()),
            subject_id,
        ),
    )?;
    if updated == 0 {
        return Err(HandlerErr::new("not_found", "subject not found"));
    }
    Ok(json!({ "updated": updated }))
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match subjects_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_subjects_update_groups(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match subjects_update_groups(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.updateGroups" => Some(handle_subjects_update_groups(state, req)),
        _ => None,
    }
}
