use crate::catalog::{CatalogError, ItemKind, MediaPool};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFolder {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<FolderId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub id: ItemId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    pub folder: FolderId,
}

/// Project state exported from the host: folder tree, items and the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,
    #[serde(default)]
    pub current_folder: Option<FolderId>,
    pub folders: Vec<SnapshotFolder>,
    pub items: Vec<SnapshotItem>,
    #[serde(default)]
    pub selection: Vec<ItemId>,
}

pub fn load_snapshot(path: &Path) -> Result<ProjectSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("プロジェクトファイルを読めませんでした: {}", path.display()))?;
    let snapshot = serde_json::from_str::<ProjectSnapshot>(&raw).with_context(|| {
        format!(
            "プロジェクトファイルのパースに失敗しました: {}",
            path.display()
        )
    })?;
    Ok(snapshot)
}

/// Writes through a sibling temp file so a crash never leaves a truncated project.
pub fn save_snapshot(path: &Path, snapshot: &ProjectSnapshot) -> Result<()> {
    let body =
        serde_json::to_string_pretty(snapshot).context("プロジェクトのシリアライズに失敗しました")?;
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    fs::write(&temp, body)
        .with_context(|| format!("一時ファイルを書き込めませんでした: {}", path.display()))?;
    fs::rename(&temp, path).with_context(|| {
        format!(
            "プロジェクトファイルを書き込めませんでした: {}",
            path.display()
        )
    })?;
    Ok(())
}

/// [`MediaPool`] over an in-memory [`ProjectSnapshot`].
///
/// `index_lag` simulates the host's asynchronous catalog: a duplicated item only shows
/// up in [`MediaPool::catalog_entry`] after that many lookups.
#[derive(Debug)]
pub struct SnapshotPool {
    snapshot: ProjectSnapshot,
    index_lag: u32,
    pending_index: RefCell<HashMap<ItemId, u32>>,
}

impl SnapshotPool {
    pub fn new(snapshot: ProjectSnapshot) -> Self {
        Self {
            snapshot,
            index_lag: 0,
            pending_index: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_index_lag(mut self, lookups: u32) -> Self {
        self.index_lag = lookups;
        self
    }

    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    pub fn item(&self, id: ItemId) -> Option<&SnapshotItem> {
        self.snapshot.items.iter().find(|item| item.id == id)
    }

    pub fn folder(&self, id: FolderId) -> Option<&SnapshotFolder> {
        self.snapshot.folders.iter().find(|folder| folder.id == id)
    }

    fn require_item(&self, id: ItemId) -> Result<&SnapshotItem, CatalogError> {
        self.item(id)
            .ok_or_else(|| CatalogError::InvalidHandle(format!("item {}", id.0)))
    }

    fn require_folder(&self, id: FolderId) -> Result<&SnapshotFolder, CatalogError> {
        self.folder(id)
            .ok_or_else(|| CatalogError::InvalidHandle(format!("folder {}", id.0)))
    }

    /// The host refuses two timelines sharing a name.
    fn name_taken(&self, name: &str, except: Option<ItemId>) -> bool {
        self.snapshot.items.iter().any(|other| {
            Some(other.id) != except
                && other.name == name
                && ItemKind::classify(other.item_type.as_deref()) == ItemKind::Timeline
        })
    }

    fn next_item_id(&self) -> ItemId {
        let max = self.snapshot.items.iter().map(|i| i.id.0).max().unwrap_or(0);
        ItemId(max + 1)
    }

    fn next_folder_id(&self) -> FolderId {
        let max = self.snapshot.folders.iter().map(|f| f.id.0).max().unwrap_or(0);
        FolderId(max + 1)
    }
}

impl MediaPool for SnapshotPool {
    type Item = ItemId;
    type Folder = FolderId;

    fn selected_items(&self) -> Result<Vec<ItemId>, CatalogError> {
        Ok(self.snapshot.selection.clone())
    }

    fn item_name(&self, item: &ItemId) -> Result<String, CatalogError> {
        Ok(self.require_item(*item)?.name.clone())
    }

    fn item_type(&self, item: &ItemId) -> Result<Option<String>, CatalogError> {
        Ok(self.require_item(*item)?.item_type.clone())
    }

    fn rename_item(&mut self, item: &ItemId, name: &str) -> Result<bool, CatalogError> {
        self.require_item(*item)?;
        if name.is_empty() || self.name_taken(name, Some(*item)) {
            return Ok(false);
        }
        if let Some(entry) = self.snapshot.items.iter_mut().find(|i| i.id == *item) {
            entry.name = name.to_string();
        }
        Ok(true)
    }

    fn duplicate_item(
        &mut self,
        item: &ItemId,
        name: &str,
    ) -> Result<Option<ItemId>, CatalogError> {
        let source = self.require_item(*item)?.clone();
        if ItemKind::classify(source.item_type.as_deref()) != ItemKind::Timeline {
            return Err(CatalogError::Host(format!(
                "タイムライン以外は複製できません: {}",
                source.name
            )));
        }
        if name.is_empty() || self.name_taken(name, None) {
            return Ok(None);
        }

        let id = self.next_item_id();
        let folder = self.snapshot.current_folder.unwrap_or(source.folder);
        self.snapshot.items.push(SnapshotItem {
            id,
            name: name.to_string(),
            item_type: source.item_type,
            folder,
        });
        if self.index_lag > 0 {
            self.pending_index.borrow_mut().insert(id, self.index_lag);
        }
        Ok(Some(id))
    }

    fn catalog_entry(&self, item: &ItemId) -> Result<Option<ItemId>, CatalogError> {
        self.require_item(*item)?;
        let mut pending = self.pending_index.borrow_mut();
        if let Some(remaining) = pending.get_mut(item) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
            pending.remove(item);
        }
        Ok(Some(*item))
    }

    fn current_folder(&self) -> Result<Option<FolderId>, CatalogError> {
        match self.snapshot.current_folder {
            Some(id) => Ok(Some(self.require_folder(id)?.id)),
            None => self.root_folder(),
        }
    }

    fn root_folder(&self) -> Result<Option<FolderId>, CatalogError> {
        Ok(self
            .snapshot
            .folders
            .iter()
            .find(|folder| folder.parent.is_none())
            .map(|folder| folder.id))
    }

    fn folder_name(&self, folder: &FolderId) -> Result<String, CatalogError> {
        Ok(self.require_folder(*folder)?.name.clone())
    }

    fn subfolders(&self, folder: &FolderId) -> Result<Vec<FolderId>, CatalogError> {
        self.require_folder(*folder)?;
        Ok(self
            .snapshot
            .folders
            .iter()
            .filter(|f| f.parent == Some(*folder))
            .map(|f| f.id)
            .collect())
    }

    fn create_subfolder(
        &mut self,
        parent: &FolderId,
        name: &str,
    ) -> Result<Option<FolderId>, CatalogError> {
        self.require_folder(*parent)?;
        if name.is_empty() {
            return Ok(None);
        }
        let id = self.next_folder_id();
        self.snapshot.folders.push(SnapshotFolder {
            id,
            name: name.to_string(),
            parent: Some(*parent),
        });
        Ok(Some(id))
    }

    fn move_item(&mut self, item: &ItemId, folder: &FolderId) -> Result<bool, CatalogError> {
        self.require_folder(*folder)?;
        self.require_item(*item)?;
        if let Some(entry) = self.snapshot.items.iter_mut().find(|i| i.id == *item) {
            entry.folder = *folder;
        }
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn folder(id: u64, name: &str, parent: Option<u64>) -> SnapshotFolder {
        SnapshotFolder {
            id: FolderId(id),
            name: name.to_string(),
            parent: parent.map(FolderId),
        }
    }

    pub fn item(id: u64, name: &str, item_type: &str, folder: u64) -> SnapshotItem {
        SnapshotItem {
            id: ItemId(id),
            name: name.to_string(),
            item_type: Some(item_type.to_string()),
            folder: FolderId(folder),
        }
    }

    /// Root folder `0` with the given items, all selected in order.
    pub fn project(items: Vec<SnapshotItem>) -> ProjectSnapshot {
        let selection = items.iter().map(|i| i.id).collect();
        ProjectSnapshot {
            name: "Test Project".to_string(),
            current_folder: None,
            folders: vec![folder(0, "Master", None)],
            items,
            selection,
        }
    }
}
