//! Entry kinds and markdown formatting for vault notes.

use chrono::NaiveDate;

use crate::tweets::TweetImage;

/// Destination of an ingested post, selected by the webhook path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Book,
    Liked,
}

impl EntryKind {
    /// `Liked` when the request path contains `/liked`, otherwise `Book`.
    pub fn from_request_path(path: &str) -> Self {
        if path.contains("/liked") {
            EntryKind::Liked
        } else {
            EntryKind::Book
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Book => "book",
            EntryKind::Liked => "liked",
        }
    }

    pub fn default_note_path(&self) -> &'static str {
        match self {
            EntryKind::Book => "wishlist.md",
            EntryKind::Liked => "Liked/tweets.md",
        }
    }

    pub fn default_assets_dir(&self) -> &'static str {
        match self {
            EntryKind::Book => "assets",
            EntryKind::Liked => "Liked/assets",
        }
    }

    /// Noun used in the append commit message.
    pub fn commit_label(&self) -> &'static str {
        match self {
            EntryKind::Book => "wishlist",
            EntryKind::Liked => "liked tweet",
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `{assets_dir}/{YYYY-MM}/{filename}`
pub fn image_path(date: NaiveDate, filename: &str, assets_dir: &str) -> String {
    format!(
        "{}/{}/{}",
        assets_dir.trim_end_matches('/'),
        date.format("%Y-%m"),
        filename
    )
}

/// Normalise post text for a single markdown list item: literal `\n`
/// sequences become line breaks, runs of whitespace collapse, and blank
/// lines are dropped.
pub fn sanitize_text(text: &str) -> String {
    text.replace("\\n", "\n")
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line item appended to a note file.
#[derive(Debug, Clone)]
pub struct WishlistEntry {
    /// Ingestion date; also selects the `YYYY-MM` assets folder.
    pub date: NaiveDate,
    /// Link text, `@handle` for posts.
    pub title: String,
    /// Post URL as submitted.
    pub url: String,
    /// Submitter's note, rendered after the link when present.
    pub note: Option<String>,
    /// Post text before sanitising.
    pub text: String,
    /// Images linked as wiki-links under the entry.
    pub images: Vec<TweetImage>,
}

impl WishlistEntry {
    /// Render as a nested markdown list. No trailing newline.
    pub fn to_markdown(&self, assets_dir: &str) -> String {
        let mut main_line = format!("- {} [{}]({})", format_date(self.date), self.title, self.url);
        if let Some(note) = self.note.as_deref().filter(|n| !n.is_empty()) {
            main_line.push_str(&format!(" note: {}", note));
        }

        let mut lines = vec![
            main_line,
            format!("  - text: {}", sanitize_text(&self.text)),
            format!("  - original: {}", self.url),
        ];

        if !self.images.is_empty() {
            lines.push("  - images:".to_string());
            for image in &self.images {
                lines.push(format!(
                    "    - [[{}]]",
                    image_path(self.date, &image.filename, assets_dir)
                ));
            }
        }

        lines.join("\n")
    }
}
