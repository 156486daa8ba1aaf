//! 层级路径计算
//!
//! 记录只保存 `parent_id` + `name`，路径在读取时沿父指针解析。

use super::id::ItemId;
use rustc_hash::{FxHashMap, FxHashSet};

pub fn join_path(parent_path: &str, name: &str) -> String {
    let mut path = String::with_capacity(parent_path.len() + name.len() + 1);
    path.push_str(parent_path);
    path.push('/');
    path.push_str(name);
    path
}

#[derive(Debug, Clone)]
struct FolderNode {
    parent: Option<ItemId>,
    name: String,
}

/// Resolves folder paths by walking parent pointers, memoizing each folder.
///
/// A dangling parent ends the walk as if it were root, and a revisited
/// folder breaks the walk, so malformed hierarchies still resolve.
pub struct PathResolver {
    nodes: FxHashMap<ItemId, FolderNode>,
    cache: FxHashMap<ItemId, String>,
}

impl PathResolver {
    pub fn new<'a, I>(folders: I) -> Self
    where
        I: IntoIterator<Item = (&'a ItemId, Option<&'a ItemId>, &'a str)>,
    {
        let nodes = folders
            .into_iter()
            .map(|(id, parent, name)| {
                (
                    id.clone(),
                    FolderNode {
                        parent: parent.cloned(),
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        Self {
            nodes,
            cache: FxHashMap::default(),
        }
    }

    pub fn folder_path(&mut self, id: &ItemId) -> String {
        if let Some(path) = self.cache.get(id) {
            return path.clone();
        }

        let mut chain: Vec<ItemId> = Vec::new();
        let mut visited = FxHashSet::default();
        let mut base = String::new();
        let mut cursor = Some(id.clone());

        while let Some(current) = cursor {
            if !visited.insert(current.clone()) {
                tracing::warn!(folder = %current, "cycle in folder hierarchy");
                break;
            }
            if let Some(cached) = self.cache.get(&current) {
                base = cached.clone();
                break;
            }
            let Some(node) = self.nodes.get(&current) else {
                break;
            };
            cursor = node.parent.clone();
            chain.push(current);
        }

        let mut path = base;
        for folder_id in chain.iter().rev() {
            if let Some(node) = self.nodes.get(folder_id) {
                path = join_path(&path, &node.name);
                self.cache.insert(folder_id.clone(), path.clone());
            }
        }

        self.cache.get(id).cloned().unwrap_or_default()
    }

    pub fn parent_path(&mut self, parent: Option<&ItemId>) -> String {
        match parent {
            Some(id) => self.folder_path(id),
            None => String::new(),
        }
    }

    pub fn child_path(&mut self, parent: Option<&ItemId>, name: &str) -> String {
        let parent_path = self.parent_path(parent);
        join_path(&parent_path, name)
    }
}

/// `root` plus every folder transitively parented under it.
///
/// Expands the set over the parent relation until nothing new is added, so
/// cycles and dangling parents terminate without special handling.
pub fn descendant_closure<'a, I>(root: &ItemId, edges: I) -> FxHashSet<ItemId>
where
    I: IntoIterator<Item = (&'a ItemId, Option<&'a ItemId>)>,
{
    let edges: Vec<(&ItemId, Option<&ItemId>)> = edges.into_iter().collect();
    let mut closure = FxHashSet::default();
    closure.insert(root.clone());

    loop {
        let mut grew = false;
        for (id, parent) in &edges {
            let Some(parent) = parent else {
                continue;
            };
            if closure.contains(*parent) && !closure.contains(*id) {
                closure.insert((*id).clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    closure
}

#[cfg(test)]
#[path = "../../tests/unit/models/hierarchy.rs"]
mod tests;
