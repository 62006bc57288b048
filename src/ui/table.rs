use tabled::{settings::Style, Table, Tabled};

use crate::course::Course;
use crate::storage::StoreStats;
use crate::student::Student;

#[derive(Tabled)]
struct StudentRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Roll")]
    roll_number: String,
    #[tabled(rename = "First")]
    first_name: String,
    #[tabled(rename = "Last")]
    last_name: String,
}

#[derive(Tabled)]
struct CourseRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Table")]
    table: &'static str,
    #[tabled(rename = "Rows")]
    rows: usize,
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn students_table(students: &[Student]) -> String {
    render(
        students
            .iter()
            .map(|s| StudentRow {
                id: s.student_id,
                roll_number: s.roll_number.clone(),
                first_name: s.first_name.clone(),
                last_name: or_dash(&s.last_name),
            })
            .collect(),
    )
}

pub fn courses_table(courses: &[Course]) -> String {
    render(
        courses
            .iter()
            .map(|c| CourseRow {
                id: c.course_id,
                code: c.course_code.clone(),
                name: c.course_name.clone(),
                description: or_dash(&c.course_description),
            })
            .collect(),
    )
}

pub fn stats_table(stats: &StoreStats) -> String {
    render(vec![
        MetricRow { table: "student", rows: stats.students },
        MetricRow { table: "course", rows: stats.courses },
        MetricRow { table: "enrollments", rows: stats.enrollments },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_renders_nothing() {
        assert!(students_table(&[]).is_empty());
        assert!(courses_table(&[]).is_empty());
    }

    #[test]
    fn test_missing_optional_shows_dash() {
        let table = students_table(&[Student {
            student_id: 7,
            roll_number: "R7".to_string(),
            first_name: "Ann".to_string(),
            last_name: None,
        }]);
        assert!(table.contains("R7"));
        assert!(table.contains("Ann"));
        assert!(table.contains('-'));
    }
}
