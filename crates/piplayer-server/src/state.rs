use std::path::PathBuf;
use std::sync::Arc;

use piplayer_proto::item::PlaylistItem;
use tokio::sync::RwLock;

use crate::content::{self, ContentError};
use crate::hub::Hub;

pub type AppState = Arc<ServerState>;

/// The canonical playlist held by the server of record.
#[derive(Debug, Default)]
pub struct Library {
    pub items: Vec<PlaylistItem>,
    pub current: Option<usize>,
}

impl Library {
    pub fn replace(&mut self, items: Vec<PlaylistItem>) {
        if self.current.map_or(false, |i| i >= items.len()) {
            self.current = None;
        }
        self.items = items;
    }

    pub fn index_of(&self, visual: &str) -> Option<usize> {
        self.items.iter().position(|item| item.visual == visual)
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.current.and_then(|i| self.items.get(i))
    }
}

pub struct ServerState {
    pub content_dir: PathBuf,
    pub library: RwLock<Library>,
    pub hub: Hub,
}

impl ServerState {
    pub fn new(content_dir: PathBuf) -> AppState {
        Arc::new(Self {
            content_dir,
            library: RwLock::new(Library::default()),
            hub: Hub::new(),
        })
    }

    /// Rescan the content folder into the library.
    pub async fn reload(&self) -> Result<Vec<PlaylistItem>, ContentError> {
        let items = content::scan(&self.content_dir)?;
        self.library.write().await.replace(items.clone());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_drops_stale_current() {
        let mut lib = Library::default();
        lib.replace(vec![PlaylistItem::new("a.png"), PlaylistItem::new("b.png")]);
        lib.current = Some(1);
        lib.replace(vec![PlaylistItem::new("a.png")]);
        assert_eq!(lib.current, None);
        assert_eq!(lib.index_of("a.png"), Some(0));
        assert_eq!(lib.index_of("b.png"), None);
    }
}
