use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

fn app_name(profile: Profile) -> &'static str {
    match profile {
        Profile::Dev => "tasktrack-dev",
        Profile::Prod => "tasktrack",
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "tasktrack-dev" instead of "tasktrack"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tasktrack", app_name(profile))
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "tasktrack-dev" instead of "tasktrack"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tasktrack", app_name(profile))
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Deadline for a date entered without a time: 23:59 local time
pub fn deadline_for_date(date: NaiveDate) -> Option<i64> {
    let time = NaiveTime::from_hms_opt(23, 59, 0)?;
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Format a millisecond timestamp as local "YYYY-MM-DD HH:MM"
pub fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates_only() {
        assert!(parse_date("2024-03-10").is_ok());
        assert!(parse_date("10.03.2024").is_err());
    }

    #[test]
    fn deadline_lands_at_end_of_that_day() {
        let date = parse_date("2024-03-10").expect("date");
        let deadline = deadline_for_date(date).expect("deadline");
        assert_eq!(format_timestamp(deadline), "2024-03-10 23:59");
    }

    #[test]
    fn expand_leaves_absolute_paths_alone() {
        assert_eq!(expand_path("/var/data/tasks.db"), PathBuf::from("/var/data/tasks.db"));
    }
}
