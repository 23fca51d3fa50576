use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "daymark-dev",
            Profile::Prod => "daymark",
        }
    }
}

/// Get the configuration directory path for daymark
/// If profile is Dev, uses "daymark-dev" instead of "daymark"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "daymark", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for daymark
/// If profile is Dev, uses "daymark-dev" instead of "daymark"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "daymark", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Check that a string is a well-formed YYYY-MM-DD date key
pub fn is_date_key(value: &str) -> bool {
    value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
        && parse_date(value).is_ok()
}

/// Get the current date as an ISO 8601 string (YYYY-MM-DD)
pub fn get_current_date_string() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Get the current time as an HH:MM string
pub fn get_current_time_string() -> String {
    chrono::Utc::now().format("%H:%M").to_string()
}

/// Generate a fresh opaque record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Split a free-form tag string on whitespace and commas into tokens
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_key_accepts_well_formed_dates() {
        assert!(is_date_key("2024-01-31"));
        assert!(!is_date_key("2024-1-31"));
        assert!(!is_date_key("2024-13-01"));
        assert!(!is_date_key("not-a-date"));
        assert!(!is_date_key("2024-01-31T00:00:00Z"));
    }

    #[test]
    fn tags_split_on_commas_and_whitespace() {
        assert_eq!(parse_tags("a, b  c"), vec!["a", "b", "c"]);
        assert_eq!(parse_tags("  ,, "), Vec::<String>::new());
    }

}
