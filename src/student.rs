//! Student records

use serde::{Deserialize, Serialize};

/// A persisted student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// System-assigned, immutable
    pub student_id: i64,
    /// Unique across all students
    pub roll_number: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Student {
    /// "First Last", or just the first name when there is no last name
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let mut student = Student {
            student_id: 1,
            roll_number: "R1".to_string(),
            first_name: "Ann".to_string(),
            last_name: Some("Lee".to_string()),
        };
        assert_eq!(student.full_name(), "Ann Lee");

        student.last_name = None;
        assert_eq!(student.full_name(), "Ann");
    }
}
