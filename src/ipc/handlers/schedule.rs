use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{self, NewSlot, ScheduleError, Slot, SlotPatch};
use rusqlite::Connection;
use serde_json::json;

/// Conflict and validation messages travel verbatim to the UI, which shows
/// them to the user as-is.
fn schedule_error_response(id: &str, e: ScheduleError) -> serde_json::Value {
    match e {
        ScheduleError::Validation(m) => err(id, "bad_params", m, None),
        ScheduleError::Conflict(m) => err(id, "conflict", m, None),
        ScheduleError::NotFound(m) => err(id, "not_found", m, None),
        ScheduleError::Db(e) => err(id, "db_query_failed", e.to_string(), None),
    }
}

fn slot_json(slot: &Slot) -> serde_json::Value {
    json!({
        "id": slot.id,
        "teacherId": slot.teacher_id,
        "subjectId": slot.subject_id,
        "classId": slot.class_id,
        "weekday": slot.weekday,
        "startTime": slot.start_time,
        "endTime": slot.end_time
    })
}

fn slots_json(slots: &[Slot]) -> serde_json::Value {
    json!({ "slots": slots.iter().map(slot_json).collect::<Vec<_>>() })
}

fn parse_new_slot(params: &serde_json::Value) -> Result<NewSlot, HandlerErr> {
    Ok(NewSlot {
        teacher_id: required_str(params, "teacherId")?,
        subject_id: required_str(params, "subjectId")?,
        class_id: required_str(params, "classId")?,
        weekday: required_str(params, "weekday")?,
        start_time: required_str(params, "startTime")?,
        end_time: required_str(params, "endTime")?,
    })
}

fn parse_patch(params: &serde_json::Value) -> Result<SlotPatch, HandlerErr> {
    let patch = params.get("patch").unwrap_or(&serde_json::Value::Null);
    if patch.is_null() {
        return Err(HandlerErr::bad_params("missing patch"));
    }
    Ok(SlotPatch {
        teacher_id: optional_str(patch, "teacherId")?,
        subject_id: optional_str(patch, "subjectId")?,
        class_id: optional_str(patch, "classId")?,
        weekday: optional_str(patch, "weekday")?,
        start_time: optional_str(patch, "startTime")?,
        end_time: optional_str(patch, "endTime")?,
    })
}

fn schedule_create(conn: &Connection, req: &Request) -> serde_json::Value {
    let new_slot = match parse_new_slot(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match schedule::create_slot(conn, &new_slot) {
        Ok(slot_id) => ok(&req.id, json!({ "slotId": slot_id })),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

fn schedule_update(conn: &Connection, req: &Request) -> serde_json::Value {
    let slot_id = match required_str(&req.params, "slotId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let patch = match parse_patch(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match schedule::update_slot(conn, &slot_id, &patch) {
        Ok(()) => ok(&req.id, json!({ "slotId": slot_id })),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

fn schedule_delete(conn: &Connection, req: &Request) -> serde_json::Value {
    let slot_id = match required_str(&req.params, "slotId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match schedule::delete_slot(conn, &slot_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

fn schedule_get(conn: &Connection, req: &Request) -> serde_json::Value {
    let slot_id = match required_str(&req.params, "slotId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match schedule::get_slot(conn, &slot_id) {
        Ok(Some(slot)) => ok(&req.id, json!({ "slot": slot_json(&slot) })),
        Ok(None) => err(&req.id, "not_found", format!("slot {} not found", slot_id), None),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

fn schedule_list(conn: &Connection, req: &Request) -> serde_json::Value {
    match schedule::list_all(conn) {
        Ok(slots) => ok(&req.id, slots_json(&slots)),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

fn schedule_list_by_teacher(conn: &Connection, req: &Request) -> serde_json::Value {
    let teacher_id = match required_str(&req.params, "teacherId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match schedule::list_by_teacher(conn, &teacher_id) {
        Ok(slots) => ok(&req.id, slots_json(&slots)),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

fn schedule_list_by_class(conn: &Connection, req: &Request) -> serde_json::Value {
    let class_id = match required_str(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match schedule::list_by_class(conn, &class_id) {
        Ok(slots) => ok(&req.id, slots_json(&slots)),
        Err(e) => schedule_error_response(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler = match req.method.as_str() {
        "schedule.create" => schedule_create,
        "schedule.update" => schedule_update,
        "schedule.delete" => schedule_delete,
        "schedule.get" => schedule_get,
        "schedule.list" => schedule_list,
        "schedule.listByTeacher" => schedule_list_by_teacher,
        "schedule.listByClass" => schedule_list_by_class,
        _ => return None,
    };
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    Some(handler(conn, req))
}
