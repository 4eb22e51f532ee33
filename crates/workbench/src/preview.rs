//! Remote HTML preview panes.
//! （遠端 HTML 預覽面板。）

use thiserror::Error;
use tracing::warn;

use editore_settings::Theme;

/// Inline text shown when a fetch fails.
pub const PREVIEW_FAILURE_MESSAGE: &str = "Failed to fetch content. Please try again later.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Fetches remote preview content.
pub trait PreviewSource {
    fn fetch(&mut self, url: &str) -> Result<String, PreviewError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Idle,
    Ready(String),
    Failed(String),
}

/// One preview pane bound to a URL. Failures stay inside the pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPane {
    url: String,
    state: PreviewState,
}

impl PreviewPane {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: PreviewState::Idle,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    /// Fetches the URL and stores either the styled document or the inline
    /// failure message.
    pub fn load<P: PreviewSource + ?Sized>(&mut self, source: &mut P, theme: Theme) -> &PreviewState {
        self.state = match source.fetch(&self.url) {
            Ok(body) => PreviewState::Ready(styled_document(&body, theme)),
            Err(err) => {
                warn!(url = %self.url, error = %err, "preview fetch failed");
                PreviewState::Failed(PREVIEW_FAILURE_MESSAGE.to_string())
            }
        };
        &self.state
    }

    pub fn retry<P: PreviewSource + ?Sized>(&mut self, source: &mut P, theme: Theme) -> &PreviewState {
        self.load(source, theme)
    }

    pub fn close(&mut self) {
        self.state = PreviewState::Idle;
    }
}

/// Prefixes `body` with scrollbar and margin styles matching `theme`.
pub fn styled_document(body: &str, theme: Theme) -> String {
    let (track, thumb) = if theme.is_dark() {
        ("#1e1e1e", "#4a4a4a")
    } else {
        ("#f1f1f1", "#888")
    };
    format!(
        "<style>\n\
         ::-webkit-scrollbar {{ width: 8px; height: 8px; }}\n\
         ::-webkit-scrollbar-track {{ background: {track}; }}\n\
         ::-webkit-scrollbar-thumb {{ background: {thumb}; border-radius: 4px; }}\n\
         ::-webkit-scrollbar-thumb:hover {{ background: #555; }}\n\
         body {{ margin: 0; padding: 16px; }}\n\
         </style>\n{body}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<String, PreviewError>>);

    impl PreviewSource for Scripted {
        fn fetch(&mut self, url: &str) -> Result<String, PreviewError> {
            self.0.pop_front().unwrap_or_else(|| {
                Err(PreviewError::Request {
                    url: url.to_string(),
                    reason: "exhausted".into(),
                })
            })
        }
    }

    #[test]
    fn failure_is_inline_and_retry_recovers() {
        let mut source = Scripted(VecDeque::from([
            Err(PreviewError::Status {
                url: "u".into(),
                status: 503,
            }),
            Ok("<h1>hi</h1>".to_string()),
        ]));
        let mut pane = PreviewPane::new("https://example.invalid/index.html");
        assert_eq!(
            pane.load(&mut source, Theme::Dark),
            &PreviewState::Failed(PREVIEW_FAILURE_MESSAGE.to_string())
        );
        match pane.retry(&mut source, Theme::Dark) {
            PreviewState::Ready(html) => {
                assert!(html.contains("#4a4a4a"));
                assert!(html.ends_with("<h1>hi</h1>"));
            }
            other => panic!("expected ready pane, got {other:?}"),
        }
        pane.close();
        assert_eq!(pane.state(), &PreviewState::Idle);
    }

    #[test]
    fn light_theme_uses_light_scrollbar() {
        let html = styled_document("<p/>", Theme::Light);
        assert!(html.contains("#f1f1f1"));
        assert!(!html.contains("#1e1e1e"));
    }
}
