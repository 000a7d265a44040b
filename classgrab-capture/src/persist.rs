use classgrab_common::{CaptureError, Classification};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Decides whether captured markup looks like the timetable view.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub marker: String,
    pub title_keyword: String,
}

impl Classifier {
    pub fn new(marker: impl Into<String>, title_keyword: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            title_keyword: title_keyword.into(),
        }
    }

    /// `Confirmed` when the markup carries the marker or the title the keyword.
    ///
    /// ```
    /// use classgrab_capture::Classifier;
    /// use classgrab_common::Classification;
    ///
    /// let c = Classifier::new("kbappTimetableDayColumn", "课表");
    /// assert_eq!(c.classify("<div class=\"kbappTimetableDayColumn\">", ""), Classification::Confirmed);
    /// assert_eq!(c.classify("<html></html>", "我的课表"), Classification::Confirmed);
    /// assert_eq!(c.classify("<html></html>", "登录"), Classification::Uncertain);
    /// ```
    pub fn classify(&self, content: &str, title: &str) -> Classification {
        let marker_hit = !self.marker.is_empty() && content.contains(&self.marker);
        let title_hit = !self.title_keyword.is_empty() && title.contains(&self.title_keyword);
        if marker_hit || title_hit {
            Classification::Confirmed
        } else {
            Classification::Uncertain
        }
    }
}

/// What a finished capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub path: PathBuf,
    pub classification: Classification,
    pub title: String,
    pub bytes: usize,
}

/// Write `content` to `path`, replacing any previous artifact.
///
/// The page goes to a sibling temp file first and is renamed into place, so a
/// failed write never leaves a truncated artifact behind.
pub async fn write_artifact(path: &Path, content: &str) -> Result<(), CaptureError> {
    let persist_err = |source| CaptureError::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(persist_err)?;
    }

    let tmp = partial_path(path);
    let mut file = fs::File::create(&tmp).await.map_err(persist_err)?;
    file.write_all(content.as_bytes())
        .await
        .map_err(persist_err)?;
    file.sync_all().await.map_err(persist_err)?;
    drop(file);

    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(persist_err(err));
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".partial");
    path.with_file_name(name)
}
