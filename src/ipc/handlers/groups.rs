use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

/// Group names are not a first-class table; the known set is whatever the
/// imported lessons reference.
fn groups_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT group_name, COUNT(*) AS lesson_count
         FROM lessons
         WHERE group_name != ''
         GROUP BY group_name
         ORDER BY group_name",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    let groups: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(name, lesson_count)| json!({ "name": name, "lessonCount": lesson_count }))
        .collect();
    Ok(json!({ "groups": groups }))
}

fn handle_groups_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match groups_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "groups.list" => Some(handle_groups_list(state, req)),
        _ => None,
    }
}
