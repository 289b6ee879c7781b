//! Persistent run reports under `~/.casegen/reports/`
//!
//! Every `execute`/`run` is saved regardless of `--output` mode.
//! Directory layout: `{host_port}_{timestamp}/` holding `cases.json`,
//! `summary.json` and a `config.toml` snapshot.

use std::path::PathBuf;
use std::time::SystemTime;

use casegen_core::{Config, RunReport};

/// Where reports go.
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    /// `~/.casegen/reports`
    pub fn home() -> Result<Self, std::io::Error> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self::at(PathBuf::from(home).join(".casegen").join("reports")))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write one report and return its directory.
    pub fn save(
        &self,
        report: &RunReport,
        config: &Config,
        base_url: &str,
        source: Option<&str>,
    ) -> Result<PathBuf, std::io::Error> {
        self.save_stamped(report, config, base_url, source, Stamp::now())
    }

    fn save_stamped(
        &self,
        report: &RunReport,
        config: &Config,
        base_url: &str,
        source: Option<&str>,
        stamp: Stamp,
    ) -> Result<PathBuf, std::io::Error> {
        let dir = self.fresh_dir(&format!("{}_{}", host_port(base_url), stamp.compact()))?;

        std::fs::write(dir.join("cases.json"), to_json(&report.results)?)?;

        let summary = serde_json::json!({
            "summary": report.summary,
            "meta": {
                "timestamp": stamp.iso(),
                "base_url": base_url,
                "source": source,
            },
        });
        std::fs::write(dir.join("summary.json"), to_json(&summary)?)?;

        let config_toml =
            toml::to_string_pretty(config).map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(dir.join("config.toml"), config_toml)?;

        Ok(dir)
    }

    /// `name`, or `name_2`, `name_3`, ... when runs land in the same second.
    fn fresh_dir(&self, name: &str) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(&self.root)?;
        let mut candidate = self.root.join(name);
        let mut n = 2;
        while candidate.exists() {
            candidate = self.root.join(format!("{name}_{n}"));
            n += 1;
        }
        std::fs::create_dir(&candidate)?;
        Ok(candidate)
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, std::io::Error> {
    serde_json::to_string_pretty(value).map_err(|e| std::io::Error::other(e.to_string()))
}

/// `"https://petstore.swagger.io:443/v2"` → `"petstore.swagger.io_443"`
fn host_port(url: &str) -> String {
    let authority = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if authority.is_empty() {
        "unknown".to_string()
    } else {
        authority.replace(':', "_")
    }
}

/// UTC wall-clock broken into calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl Stamp {
    fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::from_epoch(secs)
    }

    fn from_epoch(secs: u64) -> Self {
        let (year, month, day) = date_from_days(secs / 86_400);
        let rem = secs % 86_400;
        Self {
            year,
            month,
            day,
            hour: u32::try_from(rem / 3600).unwrap_or_default(),
            minute: u32::try_from(rem % 3600 / 60).unwrap_or_default(),
            second: u32::try_from(rem % 60).unwrap_or_default(),
        }
    }

    /// `20261018T093000`
    fn compact(self) -> String {
        format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }

    /// `2026-10-18T09:30:00Z`
    fn iso(self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Days since 1970-01-01 to a proleptic Gregorian date, using 400-year eras
/// that start on March 1st.
fn date_from_days(days: u64) -> (i64, u32, u32) {
    const DAYS_PER_ERA: u64 = 146_097;
    // 1970-01-01 is day 719_468 counted from 0000-03-01
    let shifted = days + 719_468;
    let era = shifted / DAYS_PER_ERA;
    let day_of_era = shifted % DAYS_PER_ERA;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let march_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * march_month + 2) / 5 + 1;
    let month = if march_month < 10 { march_month + 3 } else { march_month - 9 };
    let year = era * 400 + year_of_era + u64::from(month <= 2);
    (
        i64::try_from(year).unwrap_or_default(),
        u32::try_from(month).unwrap_or_default(),
        u32::try_from(day).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegen_core::{ExecutedCase, Outcome, RunSummary};
    use std::path::Path;

    #[test]
    fn host_port_variants() {
        assert_eq!(host_port("http://localhost:8080"), "localhost_8080");
        assert_eq!(host_port("https://petstore.swagger.io/v2"), "petstore.swagger.io");
        assert_eq!(host_port("http://10.0.0.1:3000/v1?x=1"), "10.0.0.1_3000");
        assert_eq!(host_port(""), "unknown");
    }

    #[test]
    fn epoch_dates() {
        assert_eq!(date_from_days(0), (1970, 1, 1));
        // 2000-02-29, leap day in a century leap year
        assert_eq!(date_from_days(11_016), (2000, 2, 29));
        assert_eq!(date_from_days(20_744), (2026, 10, 18));
    }

    #[test]
    fn stamp_formats() {
        let stamp = Stamp::from_epoch(20_744 * 86_400 + 9 * 3600 + 30 * 60 + 5);
        assert_eq!(stamp.compact(), "20261018T093005");
        assert_eq!(stamp.iso(), "2026-10-18T09:30:05Z");
    }

    fn report() -> RunReport {
        let case = serde_json::from_value(serde_json::json!({
            "Test Case Name": "get pet",
            "Description": "d",
            "Endpoint": "/pet/1",
            "Method": "GET",
            "Expected Status Code": 200
        }))
        .unwrap();
        let results = vec![ExecutedCase {
            case,
            outcome: Outcome::classify(200, 200, 0.05),
        }];
        let summary = RunSummary::from_results(&results, 0.05);
        RunReport { results, summary }
    }

    #[test]
    fn save_writes_report_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReportStore::at(tmp.path());
        let dir = store
            .save(&report(), &Config::default(), "http://localhost:8080", Some("swagger.json"))
            .unwrap();

        let name = dir.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("localhost_8080_"));

        let cases: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("cases.json")).unwrap()).unwrap();
        assert_eq!(cases[0]["Status"], "PASSED");

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["summary"]["passed_cases"], 1);
        assert_eq!(summary["meta"]["source"], "swagger.json");
        assert!(dir.join("config.toml").exists());
    }

    #[test]
    fn directory_and_meta_share_one_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let stamp = Stamp::from_epoch(20_744 * 86_400 + 23 * 3600 + 59 * 60 + 59);
        let dir = ReportStore::at(tmp.path())
            .save_stamped(&report(), &Config::default(), "http://localhost:8080", None, stamp)
            .unwrap();

        assert!(dir.ends_with(Path::new("localhost_8080_20261018T235959")));
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["meta"]["timestamp"], "2026-10-18T23:59:59Z");
        assert!(summary["meta"]["source"].is_null());
    }

    #[test]
    fn same_second_runs_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReportStore::at(tmp.path());
        let first = store.fresh_dir("host_20260101T000000").unwrap();
        let second = store.fresh_dir("host_20260101T000000").unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with(Path::new("host_20260101T000000_2")));
    }
}
