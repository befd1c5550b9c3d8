use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, optional_i64, optional_str, required_str, row_exists, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn subjects_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    // The teacher name is resolved here so the UI never has to join;
    // a dangling teacher_id resolves to null.
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.name, s.teacher_id, s.weekly_hours,
                    (SELECT t.name FROM teachers t WHERE t.id = s.teacher_id) AS teacher_name
             FROM subjects s ORDER BY s.name",
        )
        .map_err(db_err("db_query_failed"))?;
    let subjects = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "teacherId": r.get::<_, Option<String>>(2)?,
                "weeklyHours": r.get::<_, Option<i64>>(3)?,
                "teacherName": r.get::<_, Option<String>>(4)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "subjects": subjects }))
}

fn subjects_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let teacher_id = optional_str(params, "teacherId")?;
    let weekly_hours = optional_i64(params, "weeklyHours")?;

    if let Some(tid) = &teacher_id {
        if !row_exists(conn, "SELECT 1 FROM teachers WHERE id = ?", tid)? {
            return Err(HandlerErr::not_found("teacher not found"));
        }
    }

    let subject_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subjects(id, name, teacher_id, weekly_hours) VALUES(?, ?, ?, ?)",
        (&subject_id, &name, &teacher_id, &weekly_hours),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "subjectId": subject_id, "name": name }))
}

fn subjects_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_str(params, "subjectId")?;
    if !row_exists(conn, "SELECT 1 FROM subjects WHERE id = ?", &subject_id)? {
        return Err(HandlerErr::not_found("subject not found"));
    }

    let patch = params.get("patch").unwrap_or(&serde_json::Value::Null);
    let mut fields = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();
    if let Some(name) = optional_str(patch, "name")? {
        if name.is_empty() {
            return Err(HandlerErr::bad_params("name must not be empty"));
        }
        fields.push("name = ?");
        values.push(name.into());
    }
    if let Some(tid) = optional_str(patch, "teacherId")? {
        if !row_exists(conn, "SELECT 1 FROM teachers WHERE id = ?", &tid)? {
            return Err(HandlerErr::not_found("teacher not found"));
        }
        fields.push("teacher_id = ?");
        values.push(tid.into());
    }
    if let Some(hours) = optional_i64(patch, "weeklyHours")? {
        fields.push("weekly_hours = ?");
        values.push(hours.into());
    }
    if fields.is_empty() {
        return Ok(json!({ "subjectId": subject_id, "updated": false }));
    }

    values.push(subject_id.clone().into());
    let sql = format!("UPDATE subjects SET {} WHERE id = ?", fields.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(db_err("db_update_failed"))?;
    Ok(json!({ "subjectId": subject_id, "updated": true }))
}

fn subjects_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_str(params, "subjectId")?;
    if !row_exists(conn, "SELECT 1 FROM subjects WHERE id = ?", &subject_id)? {
        return Err(HandlerErr::not_found("subject not found"));
    }
    conn.execute("DELETE FROM subjects WHERE id = ?", [&subject_id])
        .map_err(db_err("db_delete_failed"))?;
    Ok(json!({ "removed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "subjects.list" => subjects_list,
        "subjects.create" => subjects_create,
        "subjects.update" => subjects_update,
        "subjects.delete" => subjects_delete,
        _ => return None,
    };
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    Some(match handler(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
