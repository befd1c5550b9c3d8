use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, required_f64, required_i64, required_str, row_exists, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn grades_record(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let subject_id = required_str(params, "subjectId")?;
    let term = required_i64(params, "term")?;
    let value = required_f64(params, "value")?;

    if term < 1 {
        return Err(HandlerErr::bad_params("term must be a positive term number"));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(HandlerErr::bad_params("value must be a non-negative number"));
    }
    if !row_exists(conn, "SELECT 1 FROM students WHERE id = ?", &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let grade_id = Uuid::new_v4().to_string();
    let recorded_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO grades(id, student_id, subject_id, term, value, recorded_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&grade_id, &student_id, &subject_id, &term, &value, &recorded_at),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "gradeId": grade_id }))
}

fn grades_list_by_student(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    if !row_exists(conn, "SELECT 1 FROM students WHERE id = ?", &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let mut stmt = conn
        .prepare(
            "SELECT g.id, g.subject_id, g.term, g.value, g.recorded_at,
                    (SELECT s.name FROM subjects s WHERE s.id = g.subject_id) AS subject_name
             FROM grades g
             WHERE g.student_id = ?
             ORDER BY g.term, subject_name",
        )
        .map_err(db_err("db_query_failed"))?;
    let grades = stmt
        .query_map([&student_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "subjectId": r.get::<_, String>(1)?,
                "term": r.get::<_, i64>(2)?,
                "value": r.get::<_, f64>(3)?,
                "recordedAt": r.get::<_, String>(4)?,
                "subjectName": r.get::<_, Option<String>>(5)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "grades": grades }))
}

fn grades_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = required_str(params, "gradeId")?;
    let removed = conn
        .execute("DELETE FROM grades WHERE id = ?", [&grade_id])
        .map_err(db_err("db_delete_failed"))?;
    if removed == 0 {
        return Err(HandlerErr::not_found("grade not found"));
    }
    Ok(json!({ "removed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "grades.record" => grades_record,
        "grades.listByStudent" => grades_list_by_student,
        "grades.delete" => grades_delete,
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
