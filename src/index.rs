//! The artifact index read by the web front end.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{error::Result, view::View};

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexItem {
    pub file: PathBuf,
    pub display_name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexGroup {
    pub id: String,
    pub title: String,
    pub plotter: String,
    pub items: Vec<IndexItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub groups: Vec<IndexGroup>,
}

/// The view whose children share a group: the leaf's parent, or the leaf itself
/// when it has none.
fn group_of(leaf: &View) -> &View {
    leaf.parent().unwrap_or(leaf)
}

impl Index {
    pub fn group_id(leaf: &View) -> String {
        group_of(leaf).full_name()
    }

    /// Files `file` under the group of `leaf`, creating the group on first use.
    pub fn add(&mut self, plotter: &str, leaf: &View, file: PathBuf) {
        let group = group_of(leaf);
        let id = group.full_name();

        let position = match self
            .groups
            .iter()
            .position(|g| g.id == id && g.plotter == plotter)
        {
            Some(position) => position,
            None => {
                self.groups.push(IndexGroup {
                    id,
                    title: group.full_long_name(),
                    plotter: plotter.to_string(),
                    items: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        let display_name = leaf
            .long_name()
            .or(leaf.name())
            .unwrap_or_default()
            .to_string();
        self.groups[position].items.push(IndexItem {
            file,
            display_name,
            id: leaf.full_name(),
        });
    }

    /// Removes a group and everything filed under it.
    pub fn drop_group(&mut self, plotter: &str, id: &str) {
        self.groups.retain(|g| !(g.id == id && g.plotter == plotter));
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes `index.json` into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(INDEX_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
