use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, optional_i64, optional_str, required_str, row_exists, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

const PATCHABLE: [(&str, &str); 7] = [
    ("name", "name"),
    ("enrollmentNo", "enrollment_no"),
    ("guardianFather", "guardian_father"),
    ("guardianMother", "guardian_mother"),
    ("phone", "phone"),
    ("idDocument", "id_document"),
    ("houseNo", "house_no"),
];

fn student_json(r: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    Ok(json!({
        "id": r.get::<_, String>(0)?,
        "name": r.get::<_, String>(1)?,
        "enrollmentNo": r.get::<_, Option<String>>(2)?,
        "age": r.get::<_, Option<i64>>(3)?,
        "guardianFather": r.get::<_, Option<String>>(4)?,
        "guardianMother": r.get::<_, Option<String>>(5)?,
        "phone": r.get::<_, Option<String>>(6)?,
        "idDocument": r.get::<_, Option<String>>(7)?,
        "houseNo": r.get::<_, Option<String>>(8)?
    }))
}

fn students_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, enrollment_no, age, guardian_father, guardian_mother,
                    phone, id_document, house_no
             FROM students ORDER BY name",
        )
        .map_err(db_err("db_query_failed"))?;
    let students = stmt
        .query_map([], student_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "students": students }))
}

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let enrollment_no = optional_str(params, "enrollmentNo")?;
    let age = optional_i64(params, "age")?;
    let guardian_father = optional_str(params, "guardianFather")?;
    let guardian_mother = optional_str(params, "guardianMother")?;
    let phone = optional_str(params, "phone")?;
    let id_document = optional_str(params, "idDocument")?;
    let house_no = optional_str(params, "houseNo")?;

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, name, enrollment_no, age, guardian_father, guardian_mother,
                              phone, id_document, house_no)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            &name,
            &enrollment_no,
            &age,
            &guardian_father,
            &guardian_mother,
            &phone,
            &id_document,
            &house_no,
        ),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "studentId": student_id, "name": name }))
}

fn students_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    if !row_exists(conn, "SELECT 1 FROM students WHERE id = ?", &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let patch = params.get("patch").unwrap_or(&serde_json::Value::Null);
    let mut fields = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();
    for (key, column) in PATCHABLE {
        if let Some(v) = optional_str(patch, key)? {
            if key == "name" && v.is_empty() {
                return Err(HandlerErr::bad_params("name must not be empty"));
            }
            fields.push(format!("{} = ?", column));
            values.push(v.into());
        }
    }
    if let Some(age) = optional_i64(patch, "age")? {
        fields.push("age = ?".to_string());
        values.push(age.into());
    }
    if fields.is_empty() {
        return Ok(json!({ "studentId": student_id, "updated": false }));
    }

    values.push(student_id.clone().into());
    let sql = format!("UPDATE students SET {} WHERE id = ?", fields.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(db_err("db_update_failed"))?;
    Ok(json!({ "studentId": student_id, "updated": true }))
}

fn students_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    if !row_exists(conn, "SELECT 1 FROM students WHERE id = ?", &student_id)? {
        return Err(HandlerErr::not_found("student not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed"))?;
    for (table, sql) in [
        ("grades", "DELETE FROM grades WHERE student_id = ?"),
        (
            "attendance_records",
            "DELETE FROM attendance_records WHERE student_id = ?",
        ),
        (
            "class_students",
            "DELETE FROM class_students WHERE student_id = ?",
        ),
        ("students", "DELETE FROM students WHERE id = ?"),
    ] {
        if let Err(e) = tx.execute(sql, [&student_id]) {
            let _ = tx.rollback();
            return Err(HandlerErr {
                code: "db_delete_failed",
                message: e.to_string(),
                details: Some(json!({ "table": table })),
            });
        }
    }
    tx.commit().map_err(db_err("db_commit_failed"))?;
    Ok(json!({ "removed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "students.list" => students_list,
        "students.create" => students_create,
        "students.update" => students_update,
        "students.delete" => students_delete,
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
