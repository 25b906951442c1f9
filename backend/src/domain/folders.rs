use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const ROOT_FOLDER_NAME: &str = "My Projects";
const MAX_FOLDER_NAME_LEN: usize = 255;

/// Root and year folders are provisioned by the server; only custom folders
/// belong to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Root,
    Year,
    Custom,
}

impl FolderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FolderKind::Root => "root",
            FolderKind::Year => "year",
            FolderKind::Custom => "custom",
        }
    }

    pub fn is_user_managed(self) -> bool {
        matches!(self, FolderKind::Custom)
    }
}

impl fmt::Display for FolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FolderKind {
    type Err = FolderRuleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "root" => Ok(FolderKind::Root),
            "year" => Ok(FolderKind::Year),
            "custom" => Ok(FolderKind::Custom),
            other => Err(FolderRuleError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FolderRuleError {
    #[error("unknown folder kind: {0}")]
    UnknownKind(String),
    #[error("{0} folders cannot be renamed")]
    RenameProtected(FolderKind),
    #[error("{0} folders cannot be moved")]
    MoveProtected(FolderKind),
    #[error("{0} folders cannot be deleted")]
    DeleteProtected(FolderKind),
    #[error("folder cannot be its own parent")]
    SelfParent,
    #[error("cannot move folder into itself or a descendant")]
    IntoDescendant,
    #[error("name must not be empty")]
    EmptyName,
    #[error("folder names must not contain '/'")]
    SlashInName,
    #[error("folder names must be at most 255 characters")]
    NameTooLong,
    #[error("a folder with the same name already exists in the target")]
    NameConflict,
}

pub fn normalize_folder_name(raw: &str) -> Result<String, FolderRuleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FolderRuleError::EmptyName);
    }
    if trimmed.contains('/') {
        return Err(FolderRuleError::SlashInName);
    }
    if trimmed.chars().count() > MAX_FOLDER_NAME_LEN {
        return Err(FolderRuleError::NameTooLong);
    }
    Ok(trimmed.to_string())
}

pub fn ensure_renamable(kind: FolderKind) -> Result<(), FolderRuleError> {
    if kind.is_user_managed() {
        Ok(())
    } else {
        Err(FolderRuleError::RenameProtected(kind))
    }
}

pub fn ensure_movable(kind: FolderKind) -> Result<(), FolderRuleError> {
    if kind.is_user_managed() {
        Ok(())
    } else {
        Err(FolderRuleError::MoveProtected(kind))
    }
}

pub fn ensure_deletable(kind: FolderKind) -> Result<(), FolderRuleError> {
    if kind.is_user_managed() {
        Ok(())
    } else {
        Err(FolderRuleError::DeleteProtected(kind))
    }
}

pub fn year_folder_name(year: i32) -> String {
    year.to_string()
}

/// Returns `name` unchanged when free, otherwise the first `name (n)` not in
/// `taken`, starting at 2. The base is shortened so the result stays within
/// the folder name limit.
pub fn unique_sibling_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let mut suffix = 2;
    loop {
        let tail = format!(" ({suffix})");
        let room = MAX_FOLDER_NAME_LEN.saturating_sub(tail.chars().count());
        let base: String = name.chars().take(room).collect();
        let candidate = format!("{}{tail}", base.trim_end());
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[derive(Debug, Clone)]
pub struct FolderNode {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub kind: FolderKind,
}

/// In-memory view over one owner's folders. Children are kept sorted by name,
/// with year folders newest first.
#[derive(Debug, Default)]
pub struct FolderTree {
    nodes: HashMap<Uuid, FolderNode>,
    children: HashMap<Option<Uuid>, Vec<Uuid>>,
}

impl FolderTree {
    pub fn new(nodes: impl IntoIterator<Item = FolderNode>) -> Self {
        let nodes: HashMap<Uuid, FolderNode> =
            nodes.into_iter().map(|node| (node.id, node)).collect();

        let mut children: HashMap<Option<Uuid>, Vec<Uuid>> = HashMap::new();
        for node in nodes.values() {
            // Dangling parents are surfaced at the top level.
            let parent = node.parent_id.filter(|id| nodes.contains_key(id));
            children.entry(parent).or_default().push(node.id);
        }

        for ids in children.values_mut() {
            ids.sort_by(|a, b| sibling_order(&nodes[a], &nodes[b]));
        }

        Self { nodes, children }
    }

    pub fn get(&self, id: Uuid) -> Option<&FolderNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top_level(&self) -> &[Uuid] {
        self.children_of(None)
    }

    pub fn children_of(&self, id: Option<Uuid>) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ancestors(&self, id: Uuid) -> Vec<Uuid> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|node| node.parent_id);
        while let Some(parent_id) = current {
            if chain.len() >= self.nodes.len() || chain.contains(&parent_id) {
                break;
            }
            let Some(parent) = self.nodes.get(&parent_id) else {
                break;
            };
            chain.push(parent_id);
            current = parent.parent_id;
        }
        chain
    }

    /// Slash-separated path from the top of the tree, e.g. `/My Projects/2025/Demos`.
    pub fn path_of(&self, id: Uuid) -> Option<String> {
        let node = self.nodes.get(&id)?;
        let mut segments: Vec<&str> = self
            .ancestors(id)
            .iter()
            .rev()
            .filter_map(|ancestor| self.nodes.get(ancestor).map(|n| n.name.as_str()))
            .collect();
        segments.push(node.name.as_str());
        Some(format!("/{}", segments.join("/")))
    }

    /// The folder itself followed by every folder below it.
    pub fn subtree(&self, id: Uuid) -> Vec<Uuid> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        let mut ids = vec![id];
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            for child in self.children_of(Some(current)) {
                if !ids.contains(child) {
                    ids.push(*child);
                    queue.push(*child);
                }
            }
        }
        ids
    }

    pub fn sibling_names(&self, parent_id: Option<Uuid>, excluding: Option<Uuid>) -> HashSet<String> {
        self.children_of(parent_id)
            .iter()
            .filter(|id| Some(**id) != excluding)
            .filter_map(|id| self.nodes.get(id).map(|node| node.name.clone()))
            .collect()
    }

    pub fn check_reparent(&self, folder_id: Uuid, new_parent: Uuid) -> Result<(), FolderRuleError> {
        if folder_id == new_parent {
            return Err(FolderRuleError::SelfParent);
        }
        if self.subtree(folder_id).contains(&new_parent) {
            return Err(FolderRuleError::IntoDescendant);
        }
        Ok(())
    }
}

fn sibling_order(a: &FolderNode, b: &FolderNode) -> std::cmp::Ordering {
    let rank = |kind: FolderKind| match kind {
        FolderKind::Root => 0,
        FolderKind::Year => 1,
        FolderKind::Custom => 2,
    };
    rank(a.kind)
        .cmp(&rank(b.kind))
        .then_with(|| match (a.kind, b.kind) {
            (FolderKind::Year, FolderKind::Year) => b.name.cmp(&a.name),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        })
        .then_with(|| a.id.cmp(&b.id))
}
