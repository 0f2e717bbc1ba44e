//! Per-viewer playlists.
//!
//! A playlist belongs to the viewer who created it; every other viewer sees
//! it as missing. Items form a set ordered by position: adding appends,
//! adding an item twice is a conflict, and removing one closes the gap.

use crate::content::{ContentRef, Playlist, PlaylistId, PlaylistItem, ViewerId};
use crate::error::{log_store_error, CatalogError, Result};
use crate::store::{CatalogStore, PlaylistStore};
use chrono::Utc;
use log::info;
use std::sync::Arc;

#[derive(Debug)]
pub struct PlaylistManager<S> {
    store: Arc<S>,
}

impl<S> PlaylistManager<S>
where
    S: CatalogStore + PlaylistStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an empty playlist. Fails with [`CatalogError::InvalidInput`]
    /// for a blank name and [`CatalogError::Conflict`] when the viewer
    /// already has one with the same name.
    pub fn create(&self, owner: ViewerId, name: &str, description: &str) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidInput("playlist name cannot be empty".into()));
        }

        let playlist = self
            .store
            .insert_playlist(owner, name, description.trim(), Utc::now())
            .map_err(log_store_error)?
            .ok_or_else(|| {
                CatalogError::Conflict(format!("viewer {owner} already has a playlist named '{name}'"))
            })?;

        info!("Viewer {owner} created playlist {} '{name}'", playlist.id);
        Ok(playlist)
    }

    /// Newest first.
    pub fn list(&self, owner: ViewerId) -> Result<Vec<Playlist>> {
        self.store.playlists(owner).map_err(log_store_error)
    }

    fn owned(&self, owner: ViewerId, id: PlaylistId) -> Result<Playlist> {
        self.store
            .find_playlist(id)
            .map_err(log_store_error)?
            .filter(|playlist| playlist.owner == owner)
            .ok_or_else(|| CatalogError::NotFound(format!("viewer {owner} has no playlist {id}")))
    }

    pub fn delete(&self, owner: ViewerId, id: PlaylistId) -> Result<()> {
        let playlist = self.owned(owner, id)?;
        if !self.store.delete_playlist(id).map_err(log_store_error)? {
            return Err(CatalogError::NotFound(format!("viewer {owner} has no playlist {id}")));
        }
        info!("Viewer {owner} deleted playlist {id} '{}'", playlist.name);
        Ok(())
    }

    /// Append `content` and return its position.
    pub fn add_item(&self, owner: ViewerId, id: PlaylistId, content: ContentRef) -> Result<u32> {
        let playlist = self.owned(owner, id)?;
        if self
            .store
            .find_by_id(content)
            .map_err(log_store_error)?
            .is_none()
        {
            return Err(CatalogError::ContentNotFound { content });
        }

        let position = self
            .store
            .append_playlist_item(id, content)
            .map_err(log_store_error)?
            .ok_or_else(|| {
                CatalogError::Conflict(format!("{content} is already in playlist '{}'", playlist.name))
            })?;

        info!("Added {content} to playlist {id} at position {position}");
        Ok(position)
    }

    pub fn remove_item(&self, owner: ViewerId, id: PlaylistId, content: ContentRef) -> Result<()> {
        let playlist = self.owned(owner, id)?;
        let removed = self
            .store
            .remove_playlist_item(id, content)
            .map_err(log_store_error)?;
        if !removed {
            return Err(CatalogError::NotFound(format!(
                "{content} is not in playlist '{}'",
                playlist.name
            )));
        }

        info!("Removed {content} from playlist {id}");
        Ok(())
    }

    /// Items in position order.
    pub fn items(&self, owner: ViewerId, id: PlaylistId) -> Result<Vec<PlaylistItem>> {
        self.owned(owner, id)?;
        self.store.playlist_items(id).map_err(log_store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{movie, track};
    use crate::db::SqliteStore;

    fn setup() -> PlaylistManager<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_item(&movie(1, "Drama", "PG", 0.0)).unwrap();
        for id in 1..=3 {
            store.insert_item(&track(id, "Pop", "General", 0.0)).unwrap();
        }
        PlaylistManager::new(Arc::new(store))
    }

    fn contents(items: &[PlaylistItem]) -> Vec<ContentRef> {
        items.iter().map(|item| item.content).collect()
    }

    #[test]
    fn test_create_trims_and_rejects_blank_or_duplicate_names() {
        let playlists = setup();
        let owner = ViewerId(1);

        let created = playlists.create(owner, "  Sunday  ", " slow ones ").unwrap();
        assert_eq!(created.name, "Sunday");
        assert_eq!(created.description, "slow ones");

        assert!(matches!(playlists.create(owner, "   ", ""), Err(CatalogError::InvalidInput(_))));
        assert!(matches!(playlists.create(owner, "SUNDAY", ""), Err(CatalogError::Conflict(_))));
        assert!(playlists.create(ViewerId(2), "Sunday", "").is_ok());
        assert_eq!(playlists.list(owner).unwrap().len(), 1);
    }

    #[test]
    fn test_items_keep_insertion_order_and_close_gaps() {
        let playlists = setup();
        let owner = ViewerId(1);
        let id = playlists.create(owner, "Mix", "").unwrap().id;

        assert_eq!(playlists.add_item(owner, id, ContentRef::Audio(2)).unwrap(), 1);
        assert_eq!(playlists.add_item(owner, id, ContentRef::AudioVisual(1)).unwrap(), 2);
        assert_eq!(playlists.add_item(owner, id, ContentRef::Audio(1)).unwrap(), 3);
        playlists.remove_item(owner, id, ContentRef::Audio(2)).unwrap();

        let items = playlists.items(owner, id).unwrap();
        assert_eq!(contents(&items), vec![ContentRef::AudioVisual(1), ContentRef::Audio(1)]);
        assert_eq!(items.iter().map(|item| item.position).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_adding_twice_conflicts() {
        let playlists = setup();
        let owner = ViewerId(1);
        let id = playlists.create(owner, "Mix", "").unwrap().id;

        playlists.add_item(owner, id, ContentRef::Audio(3)).unwrap();
        let err = playlists.add_item(owner, id, ContentRef::Audio(3)).unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(playlists.items(owner, id).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_content_and_absent_items() {
        let playlists = setup();
        let owner = ViewerId(1);
        let id = playlists.create(owner, "Mix", "").unwrap().id;

        let err = playlists.add_item(owner, id, ContentRef::AudioVisual(9)).unwrap_err();
        assert!(matches!(err, CatalogError::ContentNotFound { .. }));
        let err = playlists.remove_item(owner, id, ContentRef::Audio(1)).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_other_viewers_cannot_touch_a_playlist() {
        let playlists = setup();
        let id = playlists.create(ViewerId(1), "Mine", "").unwrap().id;
        playlists.add_item(ViewerId(1), id, ContentRef::Audio(1)).unwrap();
        let intruder = ViewerId(2);

        assert!(matches!(playlists.items(intruder, id), Err(CatalogError::NotFound(_))));
        assert!(matches!(
            playlists.add_item(intruder, id, ContentRef::Audio(2)),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(playlists.delete(intruder, id), Err(CatalogError::NotFound(_))));
        assert_eq!(playlists.items(ViewerId(1), id).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_then_lookup_is_not_found() {
        let playlists = setup();
        let owner = ViewerId(4);
        let keep = playlists.create(owner, "Keep", "").unwrap().id;
        let drop = playlists.create(owner, "Drop", "").unwrap().id;

        playlists.delete(owner, drop).unwrap();
        assert!(matches!(playlists.delete(owner, drop), Err(CatalogError::NotFound(_))));
        let remaining: Vec<PlaylistId> = playlists.list(owner).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec![keep]);
    }
}
