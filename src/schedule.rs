use rusqlite::{Connection, OptionalExtension};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Weekdays with a fixed listing rank. Weekday is stored as free-form text
/// (the UI only offers these five, but the store tolerates anything);
/// out-of-set values sort after these by plain string comparison.
pub const WEEKDAY_ORDER: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

#[derive(Debug)]
pub enum ScheduleError {
    /// Bad input, rejected before any persistence attempt.
    Validation(String),
    /// The slot would double-book a teacher on the same weekday.
    Conflict(String),
    NotFound(String),
    Db(rusqlite::Error),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Validation(m) => write!(f, "{}", m),
            ScheduleError::Conflict(m) => write!(f, "{}", m),
            ScheduleError::NotFound(m) => write!(f, "{}", m),
            ScheduleError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<rusqlite::Error> for ScheduleError {
    fn from(e: rusqlite::Error) -> Self {
        ScheduleError::Db(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub id: String,
    pub teacher_id: String,
    pub subject_id: String,
    pub class_id: String,
    pub weekday: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub teacher_id: String,
    pub subject_id: String,
    pub class_id: String,
    pub weekday: String,
    pub start_time: String,
    pub end_time: String,
}

/// Partial update; unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct SlotPatch {
    pub teacher_id: Option<String>,
    pub subject_id: Option<String>,
    pub class_id: Option<String>,
    pub weekday: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl SlotPatch {
    pub fn is_empty(&self) -> bool {
        self.teacher_id.is_none()
            && self.subject_id.is_none()
            && self.class_id.is_none()
            && self.weekday.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }
}

/// Zero-padded 24h HH:MM. Fixed width is what makes lexical comparison of
/// time strings valid everywhere below.
fn is_valid_time(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return false;
    }
    if !(b[0].is_ascii_digit()
        && b[1].is_ascii_digit()
        && b[3].is_ascii_digit()
        && b[4].is_ascii_digit())
    {
        return false;
    }
    let hour = (b[0] - b'0') * 10 + (b[1] - b'0');
    let minute = (b[3] - b'0') * 10 + (b[4] - b'0');
    hour < 24 && minute < 60
}

fn validate_window(start: &str, end: &str) -> Result<(), ScheduleError> {
    if !is_valid_time(start) {
        return Err(ScheduleError::Validation(format!(
            "start time '{}' must be HH:MM",
            start
        )));
    }
    if !is_valid_time(end) {
        return Err(ScheduleError::Validation(format!(
            "end time '{}' must be HH:MM",
            end
        )));
    }
    if start >= end {
        return Err(ScheduleError::Validation(format!(
            "start time {} must be before end time {}",
            start, end
        )));
    }
    Ok(())
}

fn validate_refs(teacher_id: &str, subject_id: &str, class_id: &str, weekday: &str) -> Result<(), ScheduleError> {
    if teacher_id.is_empty() {
        return Err(ScheduleError::Validation("teacherId is required".into()));
    }
    if subject_id.is_empty() {
        return Err(ScheduleError::Validation("subjectId is required".into()));
    }
    if class_id.is_empty() {
        return Err(ScheduleError::Validation("classId is required".into()));
    }
    if weekday.is_empty() {
        return Err(ScheduleError::Validation("weekday is required".into()));
    }
    Ok(())
}

/// Half-open intervals: windows that merely touch (a_end == b_start) do not
/// overlap.
fn windows_overlap(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    !(a_end <= b_start || b_end <= a_start)
}

/// Scans every other slot for the teacher on that weekday and returns the
/// first one the window collides with. Per-teacher slot counts are tens at
/// most, so the linear scan is fine.
fn find_conflict(
    conn: &Connection,
    teacher_id: &str,
    weekday: &str,
    start: &str,
    end: &str,
    ignore_id: Option<&str>,
) -> Result<Option<Slot>, ScheduleError> {
    let mut stmt = conn.prepare(
        "SELECT id, teacher_id, subject_id, class_id, weekday, start_time, end_time
         FROM schedule_slots
         WHERE teacher_id = ? AND weekday = ?",
    )?;
    let rows = stmt
        .query_map((teacher_id, weekday), row_to_slot)?
        .collect::<Result<Vec<_>, _>>()?;

    for slot in rows {
        if ignore_id == Some(slot.id.as_str()) {
            continue;
        }
        if windows_overlap(start, end, &slot.start_time, &slot.end_time) {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}

pub fn create_slot(conn: &Connection, slot: &NewSlot) -> Result<String, ScheduleError> {
    validate_refs(&slot.teacher_id, &slot.subject_id, &slot.class_id, &slot.weekday)?;
    validate_window(&slot.start_time, &slot.end_time)?;

    if let Some(existing) = find_conflict(
        conn,
        &slot.teacher_id,
        &slot.weekday,
        &slot.start_time,
        &slot.end_time,
        None,
    )? {
        return Err(ScheduleError::Conflict(format!(
            "teacher is already booked on {} from {} to {}",
            existing.weekday, existing.start_time, existing.end_time
        )));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO schedule_slots(id, teacher_id, subject_id, class_id, weekday, start_time, end_time)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &slot.teacher_id,
            &slot.subject_id,
            &slot.class_id,
            &slot.weekday,
            &slot.start_time,
            &slot.end_time,
        ),
    )?;
    Ok(id)
}

pub fn update_slot(conn: &Connection, id: &str, patch: &SlotPatch) -> Result<(), ScheduleError> {
    let Some(current) = get_slot(conn, id)? else {
        return Err(ScheduleError::NotFound(format!("slot {} not found", id)));
    };
    if patch.is_empty() {
        return Ok(());
    }

    // Overlay the patch onto the current row and validate the result as a
    // whole; the row itself is excluded from the conflict scan.
    let teacher_id = patch.teacher_id.as_deref().unwrap_or(&current.teacher_id);
    let subject_id = patch.subject_id.as_deref().unwrap_or(&current.subject_id);
    let class_id = patch.class_id.as_deref().unwrap_or(&current.class_id);
    let weekday = patch.weekday.as_deref().unwrap_or(&current.weekday);
    let start = patch.start_time.as_deref().unwrap_or(&current.start_time);
    let end = patch.end_time.as_deref().unwrap_or(&current.end_time);

    validate_refs(teacher_id, subject_id, class_id, weekday)?;
    validate_window(start, end)?;

    if let Some(existing) = find_conflict(conn, teacher_id, weekday, start, end, Some(id))? {
        return Err(ScheduleError::Conflict(format!(
            "teacher is already booked on {} from {} to {}",
            existing.weekday, existing.start_time, existing.end_time
        )));
    }

    // Persist only the fields the patch actually set.
    let mut fields = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();
    for (column, value) in [
        ("teacher_id", &patch.teacher_id),
        ("subject_id", &patch.subject_id),
        ("class_id", &patch.class_id),
        ("weekday", &patch.weekday),
        ("start_time", &patch.start_time),
        ("end_time", &patch.end_time),
    ] {
        if let Some(v) = value {
            fields.push(format!("{} = ?", column));
            values.push(v.clone().into());
        }
    }
    values.push(id.to_string().into());
    let sql = format!(
        "UPDATE schedule_slots SET {} WHERE id = ?",
        fields.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(())
}

/// Unconditional; deleting an unknown id is a no-op and reports `false`.
pub fn delete_slot(conn: &Connection, id: &str) -> Result<bool, ScheduleError> {
    let removed = conn.execute("DELETE FROM schedule_slots WHERE id = ?", [id])?;
    Ok(removed > 0)
}

pub fn get_slot(conn: &Connection, id: &str) -> Result<Option<Slot>, ScheduleError> {
    let slot = conn
        .query_row(
            "SELECT id, teacher_id, subject_id, class_id, weekday, start_time, end_time
             FROM schedule_slots WHERE id = ?",
            [id],
            row_to_slot,
        )
        .optional()?;
    Ok(slot)
}

pub fn list_by_teacher(conn: &Connection, teacher_id: &str) -> Result<Vec<Slot>, ScheduleError> {
    let mut stmt = conn.prepare(
        "SELECT id, teacher_id, subject_id, class_id, weekday, start_time, end_time
         FROM schedule_slots WHERE teacher_id = ?",
    )?;
    let mut slots = stmt
        .query_map([teacher_id], row_to_slot)?
        .collect::<Result<Vec<_>, _>>()?;
    slots.sort_by(slot_order);
    Ok(slots)
}

pub fn list_by_class(conn: &Connection, class_id: &str) -> Result<Vec<Slot>, ScheduleError> {
    let mut stmt = conn.prepare(
        "SELECT id, teacher_id, subject_id, class_id, weekday, start_time, end_time
         FROM schedule_slots WHERE class_id = ?",
    )?;
    let mut slots = stmt
        .query_map([class_id], row_to_slot)?
        .collect::<Result<Vec<_>, _>>()?;
    slots.sort_by(slot_order);
    Ok(slots)
}

pub fn list_all(conn: &Connection) -> Result<Vec<Slot>, ScheduleError> {
    let mut stmt = conn.prepare(
        "SELECT id, teacher_id, subject_id, class_id, weekday, start_time, end_time
         FROM schedule_slots",
    )?;
    let mut slots = stmt
        .query_map([], row_to_slot)?
        .collect::<Result<Vec<_>, _>>()?;
    slots.sort_by(slot_order);
    Ok(slots)
}

fn row_to_slot(row: &rusqlite::Row<'_>) -> rusqlite::Result<Slot> {
    Ok(Slot {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        subject_id: row.get(2)?,
        class_id: row.get(3)?,
        weekday: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
    })
}

fn weekday_rank(day: &str) -> usize {
    WEEKDAY_ORDER
        .iter()
        .position(|d| *d == day)
        .unwrap_or(WEEKDAY_ORDER.len())
}

fn slot_order(a: &Slot, b: &Slot) -> Ordering {
    weekday_rank(&a.weekday)
        .cmp(&weekday_rank(&b.weekday))
        .then_with(|| a.weekday.cmp(&b.weekday))
        .then_with(|| a.start_time.cmp(&b.start_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::init_schema(&conn).expect("init schema");
        conn
    }

    fn slot(teacher: &str, weekday: &str, start: &str, end: &str) -> NewSlot {
        NewSlot {
            teacher_id: teacher.to_string(),
            subject_id: "subj-1".to_string(),
            class_id: "class-1".to_string(),
            weekday: weekday.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn assert_conflict<T: std::fmt::Debug>(result: Result<T, ScheduleError>) {
        match result {
            Err(ScheduleError::Conflict(_)) => {}
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    fn assert_validation<T: std::fmt::Debug>(result: Result<T, ScheduleError>) {
        match result {
            Err(ScheduleError::Validation(_)) => {}
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn rejects_overlapping_window_for_same_teacher_and_day() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("first slot");
        assert_conflict(create_slot(&conn, &slot("t1", "Monday", "09:00", "11:00")));
        assert_eq!(list_all(&conn).expect("list").len(), 1);
    }

    #[test]
    fn rejects_contained_and_identical_windows() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("first slot");
        assert_conflict(create_slot(&conn, &slot("t1", "Monday", "08:30", "09:30")));
        assert_conflict(create_slot(&conn, &slot("t1", "Monday", "07:00", "11:00")));
        assert_conflict(create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")));
    }

    #[test]
    fn adjacent_windows_do_not_conflict() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("first slot");
        create_slot(&conn, &slot("t1", "Monday", "10:00", "12:00")).expect("adjacent after");
        create_slot(&conn, &slot("t1", "Monday", "06:00", "08:00")).expect("adjacent before");
    }

    #[test]
    fn same_window_allowed_across_teachers_and_days() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("t1 Monday");
        create_slot(&conn, &slot("t2", "Monday", "08:00", "10:00")).expect("t2 same window");
        create_slot(&conn, &slot("t1", "Tuesday", "08:00", "10:00")).expect("t1 other day");
    }

    #[test]
    fn rejects_inverted_or_empty_window() {
        let conn = test_conn();
        assert_validation(create_slot(&conn, &slot("t1", "Monday", "10:00", "09:00")));
        assert_validation(create_slot(&conn, &slot("t1", "Monday", "10:00", "10:00")));
        assert_eq!(list_all(&conn).expect("list").len(), 0);
    }

    #[test]
    fn rejects_malformed_times() {
        let conn = test_conn();
        for (start, end) in [
            ("8:00", "10:00"),
            ("08:00", "10:0"),
            ("24:00", "25:00"),
            ("08:60", "09:00"),
            ("ab:cd", "10:00"),
            ("08-00", "10:00"),
        ] {
            assert_validation(create_slot(&conn, &slot("t1", "Monday", start, end)));
        }
    }

    #[test]
    fn rejects_missing_references() {
        let conn = test_conn();
        let mut s = slot("", "Monday", "08:00", "10:00");
        assert_validation(create_slot(&conn, &s));
        s.teacher_id = "t1".into();
        s.weekday = "".into();
        assert_validation(create_slot(&conn, &s));
    }

    #[test]
    fn update_of_unknown_slot_is_not_found() {
        let conn = test_conn();
        let patch = SlotPatch {
            end_time: Some("11:00".into()),
            ..SlotPatch::default()
        };
        match update_slot(&conn, "missing", &patch) {
            Err(ScheduleError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn update_excludes_own_window_from_conflict_scan() {
        let conn = test_conn();
        let id = create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("create");

        // Re-asserting the identical window must succeed.
        let same = SlotPatch {
            start_time: Some("08:00".into()),
            end_time: Some("10:00".into()),
            ..SlotPatch::default()
        };
        update_slot(&conn, &id, &same).expect("same window");

        // Extending with no neighbor to collide with must succeed too.
        let extend = SlotPatch {
            end_time: Some("10:30".into()),
            ..SlotPatch::default()
        };
        update_slot(&conn, &id, &extend).expect("extend window");
        let updated = get_slot(&conn, &id).expect("get").expect("slot exists");
        assert_eq!(updated.end_time, "10:30");
    }

    #[test]
    fn update_into_neighboring_window_conflicts() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("first");
        let second = create_slot(&conn, &slot("t1", "Monday", "10:00", "12:00")).expect("second");

        let patch = SlotPatch {
            start_time: Some("09:00".into()),
            ..SlotPatch::default()
        };
        assert_conflict(update_slot(&conn, &second, &patch));

        // Failed update leaves the row unchanged.
        let unchanged = get_slot(&conn, &second).expect("get").expect("slot exists");
        assert_eq!(unchanged.start_time, "10:00");
    }

    #[test]
    fn update_moving_teacher_revalidates_against_target_teacher() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("t1 slot");
        let id = create_slot(&conn, &slot("t2", "Monday", "09:00", "11:00")).expect("t2 slot");

        let patch = SlotPatch {
            teacher_id: Some("t1".into()),
            ..SlotPatch::default()
        };
        assert_conflict(update_slot(&conn, &id, &patch));
    }

    #[test]
    fn update_patches_only_given_fields() {
        let conn = test_conn();
        let id = create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("create");

        let patch = SlotPatch {
            subject_id: Some("subj-2".into()),
            ..SlotPatch::default()
        };
        update_slot(&conn, &id, &patch).expect("patch subject");

        let updated = get_slot(&conn, &id).expect("get").expect("slot exists");
        assert_eq!(updated.subject_id, "subj-2");
        assert_eq!(updated.teacher_id, "t1");
        assert_eq!(updated.weekday, "Monday");
        assert_eq!(updated.start_time, "08:00");
        assert_eq!(updated.end_time, "10:00");
    }

    #[test]
    fn empty_patch_is_a_noop() {
        let conn = test_conn();
        let id = create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("create");
        update_slot(&conn, &id, &SlotPatch::default()).expect("empty patch");
        let unchanged = get_slot(&conn, &id).expect("get").expect("slot exists");
        assert_eq!(unchanged.start_time, "08:00");
    }

    #[test]
    fn delete_is_idempotent_and_leaves_other_rows_alone() {
        let conn = test_conn();
        let keep = create_slot(&conn, &slot("t1", "Monday", "08:00", "10:00")).expect("keep");
        let gone = create_slot(&conn, &slot("t1", "Tuesday", "08:00", "10:00")).expect("gone");

        assert!(delete_slot(&conn, &gone).expect("delete existing"));
        assert!(!delete_slot(&conn, &gone).expect("delete again"));
        assert!(!delete_slot(&conn, "999").expect("delete unknown"));

        let remaining = list_all(&conn).expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep);
    }

    #[test]
    fn listings_order_by_weekday_rank_then_start_time() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Friday", "08:00", "09:00")).expect("friday");
        create_slot(&conn, &slot("t1", "Monday", "10:00", "11:00")).expect("monday late");
        create_slot(&conn, &slot("t1", "Monday", "08:00", "09:00")).expect("monday early");
        create_slot(&conn, &slot("t1", "Wednesday", "08:00", "09:00")).expect("wednesday");

        let slots = list_by_teacher(&conn, "t1").expect("list");
        let order: Vec<(&str, &str)> = slots
            .iter()
            .map(|s| (s.weekday.as_str(), s.start_time.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Monday", "08:00"),
                ("Monday", "10:00"),
                ("Wednesday", "08:00"),
                ("Friday", "08:00"),
            ]
        );
    }

    #[test]
    fn out_of_set_weekdays_sort_after_the_fixed_week_lexically() {
        let conn = test_conn();
        create_slot(&conn, &slot("t1", "Sunday", "08:00", "09:00")).expect("sunday");
        create_slot(&conn, &slot("t1", "Saturday", "08:00", "09:00")).expect("saturday");
        create_slot(&conn, &slot("t1", "Friday", "08:00", "09:00")).expect("friday");

        let slots = list_by_teacher(&conn, "t1").expect("list");
        let days: Vec<&str> = slots.iter().map(|s| s.weekday.as_str()).collect();
        assert_eq!(days, vec!["Friday", "Saturday", "Sunday"]);
    }

    #[test]
    fn list_by_class_filters_and_orders() {
        let conn = test_conn();
        let mut a = slot("t1", "Tuesday", "08:00", "09:00");
        a.class_id = "class-a".into();
        let mut b = slot("t2", "Monday", "08:00", "09:00");
        b.class_id = "class-a".into();
        let mut other = slot("t3", "Monday", "08:00", "09:00");
        other.class_id = "class-b".into();
        create_slot(&conn, &a).expect("a");
        create_slot(&conn, &b).expect("b");
        create_slot(&conn, &other).expect("other");

        let slots = list_by_class(&conn, "class-a").expect("list");
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].weekday, "Monday");
        assert_eq!(slots[1].weekday, "Tuesday");
    }

    #[test]
    fn overlap_rule_is_half_open() {
        assert!(windows_overlap("08:00", "10:00", "09:00", "11:00"));
        assert!(windows_overlap("09:00", "11:00", "08:00", "10:00"));
        assert!(windows_overlap("08:00", "10:00", "08:00", "10:00"));
        assert!(!windows_overlap("08:00", "10:00", "10:00", "12:00"));
        assert!(!windows_overlap("10:00", "12:00", "08:00", "10:00"));
    }
}
