//! Invocation of the external timetable-to-calendar converter.
//!
//! The converter is a separate executable. It takes the first Sunday of the
//! term as its only argument, reads the captured page from the working
//! directory and writes a calendar file next to it.
use chrono::{Datelike, NaiveDate, Weekday};
use classgrab_config::ConverterConfig;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::process::Command;
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("invalid start date {input:?}: expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("{} not found; capture the timetable first", .0.display())]
    MissingArtifact(PathBuf),

    #[error("converter {} not found; build it or add it to PATH", .0.display())]
    NotFound(PathBuf),

    #[error("failed to launch converter {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; `message` is the converter's own diagnostic text.
    #[error("converter failed ({status}):\n{message}")]
    Failed { status: String, message: String },

    #[error("converter exited successfully but {} was not written", .0.display())]
    MissingCalendar(PathBuf),
}

/// First Sunday of the term, the converter's single argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartDate(NaiveDate);

impl StartDate {
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn is_sunday(&self) -> bool {
        self.0.weekday() == Weekday::Sun
    }
}

impl FromStr for StartDate {
    type Err = ConvertError;

    /// ```
    /// use classgrab_convert::StartDate;
    ///
    /// let d: StartDate = "2026-03-01".parse().unwrap();
    /// assert!(d.is_sunday());
    /// assert_eq!(d.to_string(), "2026-03-01");
    /// assert!("2026-3-1x".parse::<StartDate>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(StartDate)
            .map_err(|_| ConvertError::InvalidDate {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for StartDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// Platform executable name for `program`.
pub fn executable_name(program: &str) -> String {
    if cfg!(windows) && !program.to_ascii_lowercase().ends_with(".exe") {
        format!("{program}.exe")
    } else {
        program.to_string()
    }
}

/// Find `program` in `search_dirs` (relative to `base_dir`).
///
/// Falls back to the bare name so the OS search path decides. Programs given
/// with a directory component are returned untouched.
pub fn locate(program: &str, search_dirs: &[PathBuf], base_dir: &Path) -> PathBuf {
    let name = executable_name(program);
    let as_path = Path::new(&name);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        return as_path.to_path_buf();
    }

    search_dirs
        .iter()
        .map(|dir| base_dir.join(dir).join(&name))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Directory holding the running executable, the base for converter lookup.
pub fn launcher_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// A successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutcome {
    pub calendar: PathBuf,
}

/// Resolved converter invocation.
#[derive(Debug, Clone)]
pub struct Converter {
    pub program: PathBuf,
    pub working_dir: PathBuf,
    pub artifact: PathBuf,
    pub calendar: PathBuf,
}

impl Converter {
    pub fn from_config(
        cfg: &ConverterConfig,
        artifact: &Path,
        launcher_dir: &Path,
        working_dir: &Path,
    ) -> Self {
        Self {
            program: locate(&cfg.program, &cfg.search_dirs, launcher_dir),
            working_dir: working_dir.to_path_buf(),
            artifact: artifact.to_path_buf(),
            calendar: cfg.calendar.clone(),
        }
    }

    /// Run the converter for `date` and confirm the calendar exists afterwards.
    ///
    /// Any date is passed through; whether it must be a Sunday is up to the
    /// caller and the converter.
    pub async fn convert(&self, date: &StartDate) -> Result<ConvertOutcome, ConvertError> {
        let artifact = self.working_dir.join(&self.artifact);
        if !artifact.is_file() {
            return Err(ConvertError::MissingArtifact(artifact));
        }
        info!(
            target: "classgrab::convert",
            program = %self.program.display(),
            %date,
            "running converter"
        );

        let output = Command::new(&self.program)
            .arg(date.to_string())
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => ConvertError::NotFound(self.program.clone()),
                _ => ConvertError::Launch {
                    program: self.program.clone(),
                    source,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            return Err(ConvertError::Failed {
                status: output.status.to_string(),
                message,
            });
        }

        let calendar = self.working_dir.join(&self.calendar);
        if !calendar.is_file() {
            return Err(ConvertError::MissingCalendar(calendar));
        }
        Ok(ConvertOutcome { calendar })
    }
}
