use crate::ingest;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use log::info;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Pulls the schedule document out of the request params. Upload responses
/// sometimes nest the payload one level under "data"; accept both shapes.
fn document_param(params: &serde_json::Value) -> Result<&serde_json::Value, HandlerErr> {
    let document = params
        .get("document")
        .ok_or_else(|| HandlerErr::bad_params("missing document"))?;
    Ok(match document.get("data") {
        Some(inner) if !inner.is_null() => inner,
        _ => document,
    })
}

fn run_parser(params: &serde_json::Value) -> Result<ingest::ScheduleImport, HandlerErr> {
    let document = document_param(params)?;
    ingest::process_schedule(document)
        .map_err(|e| HandlerErr::new("bad_document", e.to_string()))
}

fn schedule_preview(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let import = run_parser(params)?;
    serde_json::to_value(&import)
        .map_err(|e| HandlerErr::new("serialize_failed", e.to_string()))
}

/// Persists one ingestion run: subjects are upserted by exact name with the
/// stored group set unioned (never overwritten), then the lesson table is
/// wiped and refilled from the fresh drafts. Lessons absent from the new
/// document are gone afterwards; that destructive resync is the intended
/// policy for re-uploads.
fn schedule_import(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let import = run_parser(params)?;
    let imported_at = Utc::now().to_rfc3339();

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    let mut subject_ids: HashMap<String, String> = HashMap::new();
    for entry in &import.subjects {
        let existing: Option<(String, String)> = tx
            .query_row(
                "SELECT id, groups FROM subjects WHERE name = ?",
                [&entry.name],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let id = match existing {
            Some((id, stored)) => {
                let mut merged: Vec<String> = serde_json::from_str(&stored).unwrap_or_default();
                for group in &entry.groups {
                    if !merged.contains(group) {
                        merged.push(group.clone());
                    }
                }
                tx.execute(
                    "UPDATE subjects SET groups = ? WHERE id = ?",
                    (encode_groups(&merged), &id),
                )?;
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO subjects(id, name, groups) VALUES(?, ?, ?)",
                    (&id, &entry.name, encode_groups(&entry.groups)),
                )?;
                id
            }
        };
        subject_ids.insert(entry.name.clone(), id);
    }

    tx.execute("DELETE FROM lessons", [])?;
    let mut lesson_count: usize = 0;
    for draft in &import.lessons {
        // Every draft's subject was registered above; a miss would mean the
        // registry and the draft list disagree, so just skip the row.
        let Some(subject_id) = subject_ids.get(&draft.subject_name) else {
            continue;
        };
        for group in &draft.groups {
            tx.execute(
                "INSERT INTO lessons(id, subject_id, subject_name, group_name, day_of_week,
                                     start_time, end_time, week_type, classroom, lesson_type,
                                     imported_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    Uuid::new_v4().to_string(),
                    subject_id,
                    &draft.subject_name,
                    group,
                    draft.day_of_week as i64,
                    &draft.start_time,
                    &draft.end_time,
                    draft.week_type.as_str(),
                    &draft.classroom,
                    &draft.lesson_type,
                    &imported_at,
                ),
            )?;
            lesson_count += 1;
        }
    }

    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    info!(
        "schedule import: {} subjects, {} lessons",
        import.subjects.len(),
        lesson_count
    );

    Ok(json!({
        "subjectCount": import.subjects.len(),
        "lessonCount": lesson_count,
        "importedAt": imported_at,
    }))
}

fn encode_groups(groups: &[String]) -> String {
    serde_json::to_string(groups).unwrap_or_else(|_| "[]".to_string())
}

fn handle_schedule_preview(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match schedule_preview(&req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_schedule_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match schedule_import(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.preview" => Some(handle_schedule_preview(state, req)),
        "schedule.import" => Some(handle_schedule_import(state, req)),
        _ => None,
    }
}
