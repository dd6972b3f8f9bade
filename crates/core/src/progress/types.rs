//! Progress snapshot types.

use serde::{Deserialize, Serialize};

/// Latest known progress of a job, as reported to polling clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum JobProgress {
    /// The fetcher has been launched but has not reported anything yet.
    #[default]
    Starting,

    /// Single-item download progress.
    Downloading {
        percent: f32,
        total_size: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<String>,
    },

    /// Position within a playlist; speed/ETA refer to the current item.
    Playlist {
        current_index: u32,
        total_count: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<String>,
    },

    /// Multiple outputs are being packed into an archive.
    Compressing,
}

impl JobProgress {
    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            JobProgress::Starting => "starting".to_string(),
            JobProgress::Downloading { percent, .. } => format!("{:.1}%", percent),
            JobProgress::Playlist {
                current_index,
                total_count,
                ..
            } => format!("item {}/{}", current_index, total_count),
            JobProgress::Compressing => "compressing".to_string(),
        }
    }
}
