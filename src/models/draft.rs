//! A social post draft: title, caption and a link to uploaded media.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// URL extensions rendered as video rather than image.
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "webm"];

/// A persisted draft row.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Draft {
    /// Assigned by the database; drafts are listed by descending id.
    pub id: i64,

    pub title: String,

    pub caption: String,

    /// Public URL of the uploaded media. Its last path segment is the storage key.
    pub media_url: String,
}

impl Draft {
    /// Whether the media should be presented as video.
    pub fn is_video(&self) -> bool {
        self.media_url
            .rsplit_once('.')
            .map(|(_, ext)| {
                VIDEO_EXTENSIONS
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Column values for a draft that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub title: String,
    pub caption: String,
    pub media_url: String,
}
