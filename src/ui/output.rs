use crate::ui::{theme, Icons, Theme};
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    let t = theme();
    if t.quiet {
        return;
    }
    println!("{} {}", icon, text.style(t.heading.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().ok.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().failure.clone()));
}

pub fn info(label: &str, value: &str) {
    let t = theme();
    if t.quiet {
        return;
    }
    println!("{} {}: {}", Icons::INFO, label.style(t.label.clone()), value);
}

pub fn section(title: &str) {
    let t = theme();
    if t.quiet {
        return;
    }
    println!();
    println!("━{}━", title.style(t.heading.clone()));
}

pub fn empty(what: &str) {
    println!("{}", empty_line(theme(), what));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().label.clone()), value);
}

/// Report a new enrollment
pub fn linked(student_id: i64, course_id: i64) {
    println!("{}", link_line(theme(), Icons::LINK, "Enrolled", student_id, course_id));
}

/// Report a withdrawal
pub fn unlinked(student_id: i64, course_id: i64) {
    println!("{}", link_line(theme(), Icons::UNLINK, "Withdrew", student_id, course_id));
}

fn empty_line(t: &Theme, what: &str) -> String {
    format!("{} {}", Icons::EMPTY, format!("No {} found.", what).style(t.empty.clone()))
}

fn link_line(t: &Theme, icon: &str, verb: &str, student_id: i64, course_id: i64) -> String {
    let pair = format!("student {} ↔ course {}", student_id, course_id);
    format!("{} {} {}", icon, verb.style(t.ok.clone()), pair.style(t.link.clone()))
}
