pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{empty, error, header, info, linked, section, success, summary_row, unlinked};
pub use table::{courses_table, stats_table, students_table};
pub use theme::{quiet_flag, theme, Theme, QUIET_ENV};
