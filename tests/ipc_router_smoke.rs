
use serde_json::json;
use test_support::{request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schooldesk-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let teacher = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "teachers.create",
        json!({ "name": "Smoke Teacher", "subjectArea": "Mathematics" }),
    );
    let teacher_id = teacher
        .get("teacherId")
        .and_then(|v| v.as_str())
        .expect("teacherId")
        .to_string();

    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.create",
        json!({ "name": "Mathematics", "teacherId": teacher_id }),
    );
    let subject_id = subject
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "classes.create",
        json!({ "name": "Smoke Class", "schoolYear": 2025, "shift": "morning" }),
    );
    let class_id = class
        .get("classId")
        .and_then(|v| v.as_str())
        .expect("classId")
        .to_string();

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({ "name": "Smoke Student", "enrollmentNo": "2025-001" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    let _ = request_ok(&mut stdin, &mut reader, "7", "teachers.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "8", "subjects.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "9", "classes.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "10", "students.list", json!({}));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "classes.enrollStudent",
        json!({ "classId": class_id, "studentId": student_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "classes.students",
        json!({ "classId": class_id }),
    );

    let slot = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "schedule.create",
        json!({
            "teacherId": teacher_id,
            "subjectId": subject_id,
            "classId": class_id,
            "weekday": "Monday",
            "startTime": "08:00",
            "endTime": "10:00"
        }),
    );
    let slot_id = slot
        .get("slotId")
        .and_then(|v| v.as_str())
        .expect("slotId")
        .to_string();

    let _ = request_ok(&mut stdin, &mut reader, "14", "schedule.list", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "schedule.listByTeacher",
        json!({ "teacherId": teacher_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "schedule.listByClass",
        json!({ "classId": class_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "schedule.get",
        json!({ "slotId": slot_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "schedule.update",
        json!({ "slotId": slot_id, "patch": { "endTime": "10:30" } }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "grades.record",
        json!({ "studentId": student_id, "subjectId": subject_id, "term": 1, "value": 15.5 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "grades.listByStudent",
        json!({ "studentId": student_id }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "21",
        "attendance.record",
        json!({
            "classId": class_id,
            "studentId": student_id,
            "date": "2025-09-01",
            "status": "present"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "22",
        "attendance.listByClassDate",
        json!({ "classId": class_id, "date": "2025-09-01" }),
    );

    let announcement = request_ok(
        &mut stdin,
        &mut reader,
        "23",
        "announcements.create",
        json!({ "title": "Smoke", "body": "Router smoke announcement" }),
    );
    let announcement_id = announcement
        .get("announcementId")
        .and_then(|v| v.as_str())
        .expect("announcementId")
        .to_string();
    let _ = request_ok(&mut stdin, &mut reader, "24", "announcements.list", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "25",
        "announcements.delete",
        json!({ "announcementId": announcement_id }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "26",
        "schedule.delete",
        json!({ "slotId": slot_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "27",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "28",
        "classes.delete",
        json!({ "classId": class_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "29",
        "subjects.delete",
        json!({ "subjectId": subject_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "30",
        "teachers.delete",
        json!({ "teacherId": teacher_id }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
