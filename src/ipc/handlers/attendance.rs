use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, required_str, row_exists, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

const STATUSES: [&str; 4] = ["present", "absent", "late", "excused"];

fn parse_date(raw: &str) -> Result<String, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| HandlerErr::bad_params("date must be YYYY-MM-DD"))
}

fn attendance_record(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let student_id = required_str(params, "studentId")?;
    let date = parse_date(&required_str(params, "date")?)?;
    let status = required_str(params, "status")?;

    if !STATUSES.contains(&status.as_str()) {
        return Err(HandlerErr::bad_params(format!(
            "status must be one of {}",
            STATUSES.join(", ")
        )));
    }
    if !row_exists(conn, "SELECT 1 FROM classes WHERE id = ?", &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }
    if !row_exists(conn, "SELECT 1 FROM students WHERE id = ?", &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    // One record per class/student/day; re-recording overwrites the status.
    let record_id = Uuid::new_v4().to_string();
    let recorded_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO attendance_records(id, class_id, student_id, date, status, recorded_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(class_id, student_id, date)
         DO UPDATE SET status = excluded.status, recorded_at = excluded.recorded_at",
        (&record_id, &class_id, &student_id, &date, &status, &recorded_at),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "classId": class_id, "studentId": student_id, "date": date, "status": status }))
}

fn attendance_list_by_class_date(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let date = parse_date(&required_str(params, "date")?)?;
    if !row_exists(conn, "SELECT 1 FROM classes WHERE id = ?", &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }

    let mut stmt = conn
        .prepare(
            "SELECT a.student_id, a.status, a.recorded_at,
                    (SELECT s.name FROM students s WHERE s.id = a.student_id) AS student_name
             FROM attendance_records a
             WHERE a.class_id = ? AND a.date = ?
             ORDER BY student_name",
        )
        .map_err(db_err("db_query_failed"))?;
    let records = stmt
        .query_map((&class_id, &date), |r| {
            Ok(json!({
                "studentId": r.get::<_, String>(0)?,
                "status": r.get::<_, String>(1)?,
                "recordedAt": r.get::<_, String>(2)?,
                "studentName": r.get::<_, Option<String>>(3)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "date": date, "records": records }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "attendance.record" => attendance_record,
        "attendance.listByClassDate" => attendance_list_by_class_date,
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
