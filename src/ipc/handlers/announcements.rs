use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, optional_str, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn announcements_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, body, audience, created_at
             FROM announcements ORDER BY created_at DESC",
        )
        .map_err(db_err("db_query_failed"))?;
    let announcements = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, String>(1)?,
                "body": r.get::<_, String>(2)?,
                "audience": r.get::<_, String>(3)?,
                "createdAt": r.get::<_, String>(4)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(json!({ "announcements": announcements }))
}

fn announcements_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let title = required_str(params, "title")?;
    let body = required_str(params, "body")?;
    let audience = optional_str(params, "audience")?.unwrap_or_else(|| "all".to_string());

    let announcement_id = Uuid::new_v4().to_string();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO announcements(id, title, body, audience, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (&announcement_id, &title, &body, &audience, &created_at),
    )
    .map_err(db_err("db_insert_failed"))?;
    Ok(json!({ "announcementId": announcement_id }))
}

fn announcements_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let announcement_id = required_str(params, "announcementId")?;
    let removed = conn
        .execute("DELETE FROM announcements WHERE id = ?", [&announcement_id])
        .map_err(db_err("db_delete_failed"))?;
    if removed == 0 {
        return Err(HandlerErr::not_found("announcement not found"));
    }
    Ok(json!({ "removed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "announcements.list" => announcements_list,
        "announcements.create" => announcements_create,
        "announcements.delete" => announcements_delete,
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
