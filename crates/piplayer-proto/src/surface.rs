use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which kind of client is connected.  Each surface has its own push path
/// and its own reconnect delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Renders media.
    #[default]
    Viewer,
    /// Issues commands and follows the canonical index.
    Control,
    /// Remote-driven menu.
    Menu,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Viewer, Surface::Control, Surface::Menu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Viewer => "viewer",
            Surface::Control => "control",
            Surface::Menu => "menu",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    pub fn push_path(&self) -> String {
        format!("/ws/{}", self.as_str())
    }

    pub fn default_reconnect_delay(&self) -> Duration {
        match self {
            Surface::Viewer => Duration::from_secs(5),
            Surface::Control | Surface::Menu => Duration::from_secs(2),
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push subscription URL for `surface`, derived from the HTTP base URL.
pub fn push_url(server_url: &str, surface: Surface) -> String {
    let base = server_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}{}", ws_base, surface.push_path())
}
