//! In-memory node table.
//!
//! Maps kernel inode numbers to mount-relative paths and their attributes.
//! Nodes are discovered by directory scans and lookups; inode numbers are
//! allocated monotonically and stay stable for a path within one mount
//! lifetime, but carry no meaning across remounts. Attribute changes made
//! through `setattr` live only here - nothing is written upstream, so they
//! are lost on remount.

use std::collections::HashMap;
use std::time::SystemTime;

/// Inode number of the mount root.
pub const ROOT_INO: u64 = 1;

/// What a node is; downstream code discriminates on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Attributes surfaced for one node.
#[derive(Debug, Clone)]
pub struct NodeAttr {
    /// Size in bytes. Zero for directories.
    pub size: u64,
    /// Permission bits.
    pub perm: u16,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    /// ETag of the backing object; part of the cache filename. `None` for
    /// directories.
    pub etag: Option<String>,
}

impl NodeAttr {
    /// Attributes for a directory.
    pub fn directory(perm: u16, uid: u32, gid: u32, mtime: Option<SystemTime>) -> Self {
        let mtime: SystemTime = mtime.unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            size: 0,
            perm,
            uid,
            gid,
            atime: mtime,
            mtime,
            ctime: mtime,
            etag: None,
        }
    }

    /// Attributes for a regular file.
    pub fn file(
        size: u64,
        perm: u16,
        uid: u32,
        gid: u32,
        mtime: Option<SystemTime>,
        etag: String,
    ) -> Self {
        let mtime: SystemTime = mtime.unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            size,
            perm,
            uid,
            gid,
            atime: mtime,
            mtime,
            ctime: mtime,
            etag: Some(etag),
        }
    }
}

/// One entry in the node table.
#[derive(Debug, Clone)]
pub struct Node {
    pub ino: u64,
    pub parent: u64,
    /// Final path component; empty for the root.
    pub name: String,
    /// Mount-relative path; empty for the root.
    pub path: String,
    pub kind: NodeKind,
    pub attr: NodeAttr,
}

/// Table of discovered nodes.
pub struct NodeTable {
    nodes: HashMap<u64, Node>,
    by_path: HashMap<String, u64>,
    next_ino: u64,
}

impl NodeTable {
    /// Create a table holding only the root directory.
    pub fn new(root_attr: NodeAttr) -> Self {
        let mut nodes: HashMap<u64, Node> = HashMap::new();
        nodes.insert(
            ROOT_INO,
            Node {
                ino: ROOT_INO,
                parent: ROOT_INO,
                name: String::new(),
                path: String::new(),
                kind: NodeKind::Directory,
                attr: root_attr,
            },
        );
        let mut by_path: HashMap<String, u64> = HashMap::new();
        by_path.insert(String::new(), ROOT_INO);
        Self {
            nodes,
            by_path,
            next_ino: ROOT_INO + 1,
        }
    }

    pub fn get(&self, ino: u64) -> Option<&Node> {
        self.nodes.get(&ino)
    }

    pub fn get_mut(&mut self, ino: u64) -> Option<&mut Node> {
        self.nodes.get_mut(&ino)
    }

    /// Record a scan result under `parent`, reusing the path's inode when
    /// it was seen before.
    ///
    /// For an existing node only the store-derived fields (size, times,
    /// etag, kind) are refreshed; ownership and permission bits set through
    /// `setattr` stick until remount.
    pub fn upsert(&mut self, parent: u64, name: &str, kind: NodeKind, attr: NodeAttr) -> u64 {
        let parent_path: &str = self
            .nodes
            .get(&parent)
            .map(|n| n.path.as_str())
            .unwrap_or("");
        let path: String = if parent_path.is_empty() {
            name.to_string()
        } else {
            format!("{parent_path}/{name}")
        };

        if let Some(&ino) = self.by_path.get(&path) {
            if let Some(node) = self.nodes.get_mut(&ino) {
                node.kind = kind;
                node.attr.size = attr.size;
                node.attr.mtime = attr.mtime;
                node.attr.ctime = attr.ctime;
                node.attr.etag = attr.etag;
            }
            return ino;
        }

        let ino: u64 = self.next_ino;
        self.next_ino += 1;
        self.nodes.insert(
            ino,
            Node {
                ino,
                parent,
                name: name.to_string(),
                path: path.clone(),
                kind,
                attr,
            },
        );
        self.by_path.insert(path, ino);
        ino
    }

    /// Number of known nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NodeTable {
        NodeTable::new(NodeAttr::directory(0o755, 0, 0, None))
    }

    #[test]
    fn test_root_exists() {
        let t: NodeTable = table();
        let root: &Node = t.get(ROOT_INO).unwrap();
        assert_eq!(root.kind, NodeKind::Directory);
        assert_eq!(root.path, "");
    }

    #[test]
    fn test_upsert_allocates_sequentially_and_reuses() {
        let mut t: NodeTable = table();
        let bucket: u64 =
            t.upsert(ROOT_INO, "b", NodeKind::Directory, NodeAttr::directory(0o770, 0, 0, None));
        let file: u64 = t.upsert(
            bucket,
            "a",
            NodeKind::File,
            NodeAttr::file(10, 0o644, 0, 0, None, "e1".into()),
        );
        assert_eq!(bucket, ROOT_INO + 1);
        assert_eq!(file, ROOT_INO + 2);
        assert_eq!(t.get(file).unwrap().path, "b/a");

        // Rescan with fresh metadata keeps the inode.
        let again: u64 = t.upsert(
            bucket,
            "a",
            NodeKind::File,
            NodeAttr::file(20, 0o644, 0, 0, None, "e2".into()),
        );
        assert_eq!(again, file);
        assert_eq!(t.get(file).unwrap().attr.size, 20);
        assert_eq!(t.get(file).unwrap().attr.etag.as_deref(), Some("e2"));
    }

    #[test]
    fn test_upsert_preserves_setattr_overrides() {
        let mut t: NodeTable = table();
        let bucket: u64 =
            t.upsert(ROOT_INO, "b", NodeKind::Directory, NodeAttr::directory(0o770, 0, 0, None));
        let file: u64 = t.upsert(
            bucket,
            "a",
            NodeKind::File,
            NodeAttr::file(10, 0o644, 0, 0, None, "e1".into()),
        );

        t.get_mut(file).unwrap().attr.perm = 0o600;

        t.upsert(
            bucket,
            "a",
            NodeKind::File,
            NodeAttr::file(10, 0o644, 0, 0, None, "e1".into()),
        );
        assert_eq!(t.get(file).unwrap().attr.perm, 0o600);
    }
}
