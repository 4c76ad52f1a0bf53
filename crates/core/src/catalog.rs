use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Timeline,
    Audio,
    Video,
    Unknown,
}

impl ItemKind {
    /// Maps the host's free-form type label onto the kinds the engine branches on.
    pub fn classify(type_label: Option<&str>) -> ItemKind {
        let Some(label) = type_label.map(str::trim) else {
            return ItemKind::Unknown;
        };
        if label.eq_ignore_ascii_case("timeline") {
            ItemKind::Timeline
        } else if label.eq_ignore_ascii_case("audio") {
            ItemKind::Audio
        } else if label.to_ascii_lowercase().starts_with("video") {
            ItemKind::Video
        } else {
            ItemKind::Unknown
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("無効なハンドルです: {0}")]
    InvalidHandle(String),
    #[error("ホスト側でエラーが発生しました: {0}")]
    Host(String),
}

/// Project catalog provided by the host application.
///
/// Every primitive may report a soft failure (`false`, `None`) or an error for a stale
/// handle. The orchestrator treats both as per-item conditions.
pub trait MediaPool {
    type Item: Clone;
    type Folder: Clone;

    /// Items selected by the user, in selection order.
    fn selected_items(&self) -> Result<Vec<Self::Item>, CatalogError>;

    fn item_name(&self, item: &Self::Item) -> Result<String, CatalogError>;

    /// Raw type label such as `"Timeline"` or `"Video + Audio"`.
    fn item_type(&self, item: &Self::Item) -> Result<Option<String>, CatalogError>;

    fn rename_item(&mut self, item: &Self::Item, name: &str) -> Result<bool, CatalogError>;

    /// Copies `item` under `name` and returns a handle to the copy.
    fn duplicate_item(
        &mut self,
        item: &Self::Item,
        name: &str,
    ) -> Result<Option<Self::Item>, CatalogError>;

    /// The movable catalog entry behind a freshly duplicated item. Hosts index new items
    /// asynchronously, so this can return `None` for a short while after duplication.
    fn catalog_entry(&self, item: &Self::Item) -> Result<Option<Self::Item>, CatalogError>;

    fn current_folder(&self) -> Result<Option<Self::Folder>, CatalogError>;

    fn root_folder(&self) -> Result<Option<Self::Folder>, CatalogError>;

    fn folder_name(&self, folder: &Self::Folder) -> Result<String, CatalogError>;

    fn subfolders(&self, folder: &Self::Folder) -> Result<Vec<Self::Folder>, CatalogError>;

    fn create_subfolder(
        &mut self,
        parent: &Self::Folder,
        name: &str,
    ) -> Result<Option<Self::Folder>, CatalogError>;

    fn move_item(&mut self, item: &Self::Item, folder: &Self::Folder)
        -> Result<bool, CatalogError>;
}

/// Classification never fails: unreadable items count as [`ItemKind::Unknown`].
pub fn classify_item<P: MediaPool>(pool: &P, item: &P::Item) -> ItemKind {
    match pool.item_type(item) {
        Ok(label) => ItemKind::classify(label.as_deref()),
        Err(err) => {
            tracing::error!("アイテム種別を取得できませんでした: {err}");
            ItemKind::Unknown
        }
    }
}
