//! Terminal palette for registrar output

use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Environment variable that silences informational lines
pub const QUIET_ENV: &str = "REGISTRAR_QUIET";

/// Styles per kind of line, plus whether informational lines are shown at all.
/// Successes, errors and data (tables, empty results) always print.
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub ok: Style,
    pub failure: Style,
    pub label: Style,
    /// A student/course pair being linked or unlinked
    pub link: Style,
    /// "No students found." and similar
    pub empty: Style,
    pub quiet: bool,
}

impl Theme {
    pub fn new(color: bool, quiet: bool) -> Self {
        let base = if color {
            Self {
                heading: Style::new().cyan().bold(),
                ok: Style::new().green().bold(),
                failure: Style::new().red().bold(),
                label: Style::new().white().dimmed(),
                link: Style::new().blue().underline(),
                empty: Style::new().yellow().italic(),
                quiet: false,
            }
        } else {
            Self {
                heading: Style::new(),
                ok: Style::new(),
                failure: Style::new(),
                label: Style::new(),
                link: Style::new(),
                empty: Style::new(),
                quiet: false,
            }
        };
        Self { quiet, ..base }
    }

    /// Colour when stdout is a terminal; quiet when `REGISTRAR_QUIET` says so
    pub fn from_env() -> Self {
        let quiet = quiet_flag(std::env::var(QUIET_ENV).ok().as_deref());
        Self::new(console::Term::stdout().is_term(), quiet)
    }
}

/// `1`, `true` or `yes` (any case) turn quiet mode on
pub fn quiet_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::from_env)
}
