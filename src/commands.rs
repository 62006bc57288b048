use crate::{emit_success, Context, CourseCommand, StudentCommand};
use registrar::config::{self, RegistrarConfig};
use registrar::ui::{self, Icons};
use registrar::EnrollmentManager;

pub fn run_init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let config = RegistrarConfig {
        database: Some(ctx.database.display().to_string()),
        port: Some(ctx.config.port(None)),
        busy_timeout_ms: Some(ctx.config.busy_timeout().as_millis() as u64),
    };
    config::write_config(&ctx.config_path, &config, force)?;
    let store = ctx.open_store()?;

    if ctx.output_mode.is_human() {
        ui::success(&format!("Wrote {}", ctx.config_path.display()));
        ui::info("Database", &ctx.database.display().to_string());
        ui::summary_row("Students:", &store.count_students()?.to_string());
        ui::summary_row("Courses:", &store.count_courses()?.to_string());
    } else {
        emit_success(ctx.output_mode, "init", serde_json::to_value(&config)?)?;
    }
    Ok(())
}

pub fn run_student(ctx: &Context, cmd: StudentCommand) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let manager = EnrollmentManager::new(&store);

    match cmd {
        StudentCommand::Add { roll, first, last } => {
            let student = store.create_student(roll.trim(), first.trim(), last.as_deref().map(str::trim))?;
            if ctx.output_mode.is_human() {
                ui::success(&format!("Added student {} ({})", student.full_name(), student.roll_number));
                ui::info("ID", &student.student_id.to_string());
            } else {
                emit_success(ctx.output_mode, "student add", serde_json::to_value(&student)?)?;
            }
        }

        StudentCommand::List => {
            let students = store.list_students()?;
            if ctx.output_mode.is_human() {
                if students.is_empty() {
                    ui::empty("students");
                } else {
                    ui::header(Icons::PERSON, &format!("{} student(s)", students.len()));
                    println!("{}", ui::students_table(&students));
                }
            } else {
                emit_success(ctx.output_mode, "student list", serde_json::to_value(&students)?)?;
            }
        }

        StudentCommand::Show { id } => {
            let student = store.get_student(id)?;
            let courses = manager.list_enrollments_for_student(id)?;
            if ctx.output_mode.is_human() {
                ui::header(Icons::PERSON, &student.full_name());
                ui::summary_row("ID:", &student.student_id.to_string());
                ui::summary_row("Roll:", &student.roll_number);
                ui::section("Courses");
                if courses.is_empty() {
                    ui::empty("courses");
                } else {
                    println!("{}", ui::courses_table(&courses));
                }
            } else {
                let data = serde_json::json!({ "student": student, "courses": courses });
                emit_success(ctx.output_mode, "student show", data)?;
            }
        }

        StudentCommand::Update { id, first, last, course } => {
            let student = manager.update_student_and_enroll(
                id,
                first.trim(),
                last.as_deref().map(str::trim),
                course,
            )?;
            if ctx.output_mode.is_human() {
                ui::success(&format!("Updated student {}", student.full_name()));
                if let Some(course_id) = course {
                    ui::info("Enrolled in course", &course_id.to_string());
                }
            } else {
                emit_success(ctx.output_mode, "student update", serde_json::to_value(&student)?)?;
            }
        }

        StudentCommand::Delete { id } => {
            let removed = manager.delete_student_cascade(id)?;
            if ctx.output_mode.is_human() {
                ui::success(&format!("{} Deleted student {}", Icons::DEL, id));
                ui::summary_row("Enrollments removed:", &removed.to_string());
            } else {
                let data = serde_json::json!({ "id": id, "enrollments_removed": removed });
                emit_success(ctx.output_mode, "student delete", data)?;
            }
        }
    }
    Ok(())
}

pub fn run_course(ctx: &Context, cmd: CourseCommand) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let manager = EnrollmentManager::new(&store);

    match cmd {
        CourseCommand::Add { code, name, description } => {
            let course = store.create_course(code.trim(), name.trim(), description.as_deref().map(str::trim))?;
            if ctx.output_mode.is_human() {
                ui::success(&format!("Added course {}", course));
                ui::info("ID", &course.course_id.to_string());
            } else {
                emit_success(ctx.output_mode, "course add", serde_json::to_value(&course)?)?;
            }
        }

        CourseCommand::List => {
            let courses = store.list_courses()?;
            if ctx.output_mode.is_human() {
                if courses.is_empty() {
                    ui::empty("courses");
                } else {
                    ui::header(Icons::BOOK, &format!("{} course(s)", courses.len()));
                    println!("{}", ui::courses_table(&courses));
                }
            } else {
                emit_success(ctx.output_mode, "course list", serde_json::to_value(&courses)?)?;
            }
        }

        CourseCommand::Show { id } => {
            let course = store.get_course(id)?;
            let students = manager.list_students_for_course(id)?;
            if ctx.output_mode.is_human() {
                ui::header(Icons::BOOK, &course.to_string());
                if let Some(description) = &course.course_description {
                    ui::summary_row("Description:", description);
                }
                ui::section("Students");
                if students.is_empty() {
                    ui::empty("students");
                } else {
                    println!("{}", ui::students_table(&students));
                }
            } else {
                let data = serde_json::json!({ "course": course, "students": students });
                emit_success(ctx.output_mode, "course show", data)?;
            }
        }

        CourseCommand::Update { id, name, description } => {
            let course = store.update_course(id, name.trim(), description.as_deref().map(str::trim))?;
            if ctx.output_mode.is_human() {
                ui::success(&format!("Updated course {}", course));
            } else {
                emit_success(ctx.output_mode, "course update", serde_json::to_value(&course)?)?;
            }
        }

        CourseCommand::Delete { id } => {
            let removed = manager.delete_course_cascade(id)?;
            if ctx.output_mode.is_human() {
                ui::success(&format!("{} Deleted course {}", Icons::DEL, id));
                ui::summary_row("Enrollments removed:", &removed.to_string());
            } else {
                let data = serde_json::json!({ "id": id, "enrollments_removed": removed });
                emit_success(ctx.output_mode, "course delete", data)?;
            }
        }
    }
    Ok(())
}

pub fn run_enroll(ctx: &Context, student_id: i64, course_id: i64) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let enrollment = EnrollmentManager::new(&store).enroll(student_id, course_id)?;

    if ctx.output_mode.is_human() {
        ui::linked(student_id, course_id);
    } else {
        emit_success(ctx.output_mode, "enroll", serde_json::to_value(enrollment)?)?;
    }
    Ok(())
}

pub fn run_withdraw(ctx: &Context, student_id: i64, course_id: i64) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    EnrollmentManager::new(&store).withdraw(student_id, course_id)?;

    if ctx.output_mode.is_human() {
        ui::unlinked(student_id, course_id);
    } else {
        let data = serde_json::json!({ "student_id": student_id, "course_id": course_id });
        emit_success(ctx.output_mode, "withdraw", data)?;
    }
    Ok(())
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;

    if ctx.output_mode.is_human() {
        ui::header(Icons::STATS, &format!("Registrar Statistics ({})", ctx.database.display()));
        ui::info("Database", &format!("{} {}", Icons::DATABASE, ctx.database.display()));
        println!("{}", ui::stats_table(&stats));
    } else {
        emit_success(ctx.output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}
