use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, optional_str, required_str, row_exists, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

const PATCHABLE: [(&str, &str); 6] = [
    ("name", "name"),
    ("document", "document"),
    ("subjectArea", "subject_area"),
    ("education", "education"),
    ("availability", "availability"),
    ("contact", "contact"),
];

fn teachers_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, document, subject_area, education, availability, contact
             FROM teachers ORDER BY name",
        )
        .map_err(db_err("db_query_failed"))?;
    let teachers = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "document": r.get::<_, Option<String>>(2)?,
                "subjectArea": r.get::<_, Option<String>>(3)?,
                "education": r.get::<_, Option<String>>(4)?,
                "availability": r.get::<_, Option<String>>(5)?,
                "contact": r.get::<_, Option<String>>(6)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "teachers": teachers }))
}

fn teachers_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let document = optional_str(params, "document")?;
    let subject_area = optional_str(params, "subjectArea")?;
    let education = optional_str(params, "education")?;
    let availability = optional_str(params, "availability")?;
    let contact = optional_str(params, "contact")?;

    let teacher_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO teachers(id, name, document, subject_area, education, availability, contact)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &teacher_id,
            &name,
            &document,
            &subject_area,
            &education,
            &availability,
            &contact,
        ),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "teacherId": teacher_id, "name": name }))
}

fn teachers_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = required_str(params, "teacherId")?;
    if !row_exists(conn, "SELECT 1 FROM teachers WHERE id = ?", &teacher_id)? {
        return Err(HandlerErr::not_found("teacher not found"));
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
    if fields.is_empty() {
        return Ok(json!({ "teacherId": teacher_id, "updated": false }));
    }

    values.push(teacher_id.clone().into());
    let sql = format!("UPDATE teachers SET {} WHERE id = ?", fields.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(db_err("db_update_failed"))?;
    Ok(json!({ "teacherId": teacher_id, "updated": true }))
}

fn teachers_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = required_str(params, "teacherId")?;
    if !row_exists(conn, "SELECT 1 FROM teachers WHERE id = ?", &teacher_id)? {
        return Err(HandlerErr::not_found("teacher not found"));
    }
    // Schedule slots keep their teacher_id; listings resolve it leniently.
    conn.execute("DELETE FROM teachers WHERE id = ?", [&teacher_id])
        .map_err(db_err("db_delete_failed"))?;
    Ok(json!({ "removed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "teachers.list" => teachers_list,
        "teachers.create" => teachers_create,
        "teachers.update" => teachers_update,
        "teachers.delete" => teachers_delete,
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
