use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, optional_i64, optional_str, required_str, row_exists, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn classes_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    // Include enrollment and slot counts so the UI can show a useful
    // dashboard. Correlated subqueries avoid double-counting from joins.
    let mut stmt = conn
        .prepare(
            "SELECT
               c.id,
               c.name,
               c.school_year,
               c.shift,
               (SELECT COUNT(*) FROM class_students cs WHERE cs.class_id = c.id) AS student_count,
               (SELECT COUNT(*) FROM schedule_slots sl WHERE sl.class_id = c.id) AS slot_count
             FROM classes c
             ORDER BY c.name",
        )
        .map_err(db_err("db_query_failed"))?;
    let classes = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "schoolYear": r.get::<_, Option<i64>>(2)?,
                "shift": r.get::<_, Option<String>>(3)?,
                "studentCount": r.get::<_, i64>(4)?,
                "slotCount": r.get::<_, i64>(5)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "classes": classes }))
}

fn classes_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let school_year = optional_i64(params, "schoolYear")?;
    let shift = optional_str(params, "shift")?;

    let class_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, name, school_year, shift) VALUES(?, ?, ?, ?)",
        (&class_id, &name, &school_year, &shift),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "classId": class_id, "name": name }))
}

fn classes_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    if !row_exists(conn, "SELECT 1 FROM classes WHERE id = ?", &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed"))?;

    // Explicitly delete dependents in order (no ON DELETE CASCADE).
    // Schedule slots referencing the class are left in place on purpose.
    if let Err(e) = tx.execute(
        "DELETE FROM attendance_records WHERE class_id = ?",
        [&class_id],
    ) {
        let _ = tx.rollback();
        return Err(HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "attendance_records" })),
        });
    }
    if let Err(e) = tx.execute("DELETE FROM class_students WHERE class_id = ?", [&class_id]) {
        let _ = tx.rollback();
        return Err(HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "class_students" })),
        });
    }
    if let Err(e) = tx.execute("DELETE FROM classes WHERE id = ?", [&class_id]) {
        let _ = tx.rollback();
        return Err(HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "classes" })),
        });
    }
    tx.commit().map_err(db_err("db_commit_failed"))?;
    Ok(json!({ "removed": true }))
}

fn classes_enroll_student(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let student_id = required_str(params, "studentId")?;
    if !row_exists(conn, "SELECT 1 FROM classes WHERE id = ?", &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }
    if !row_exists(conn, "SELECT 1 FROM students WHERE id = ?", &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let already: bool = conn
        .query_row(
            "SELECT 1 FROM class_students WHERE class_id = ? AND student_id = ?",
            (&class_id, &student_id),
            |r| r.get::<_, i64>(0),
        )
        .map(|_| true)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(false),
            other => Err(other),
        })
        .map_err(db_err("db_query_failed"))?;
    if already {
        return Err(HandlerErr::new(
            "conflict",
            "student is already enrolled in this class",
        ));
    }

    conn.execute(
        "INSERT INTO class_students(class_id, student_id) VALUES(?, ?)",
        (&class_id, &student_id),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "classId": class_id, "studentId": student_id }))
}

fn classes_students(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    if !row_exists(conn, "SELECT 1 FROM classes WHERE id = ?", &class_id)? {
        return Err(HandlerErr::not_found("class not found"));
    }

    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.name, s.enrollment_no
             FROM students s
             JOIN class_students cs ON cs.student_id = s.id
             WHERE cs.class_id = ?
             ORDER BY s.name",
        )
        .map_err(db_err("db_query_failed"))?;
    let students = stmt
        .query_map([&class_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "enrollmentNo": r.get::<_, Option<String>>(2)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "classes.list" => classes_list,
        "classes.create" => classes_create,
        "classes.delete" => classes_delete,
        "classes.enrollStudent" => classes_enroll_student,
        "classes.students" => classes_students,
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
