//! FUSE request dispatch and mount lifecycle.
//!
//! `MinFs` receives kernel requests, routes listings/lookups to the
//! resolver and opens to the file workflow, and owns the evictor task.
//! fuser's dispatch is synchronous; object-store work is bridged into the
//! tokio runtime captured at construction time.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, Request, TimeOrNow,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use minfs_cache::{CacheStore, Evictor, EvictorConfig, HandleRegistry, KeyedMutex};
use minfs_common::{object_path, split_mount_path};
use minfs_storage::{ClientPool, ObjectClient};

use crate::error::VfsError;
use crate::file::{open_file, OpenFile};
use crate::nodes::{Node, NodeAttr, NodeKind, NodeTable};
use crate::options::MountOptions;
use crate::resolver::{Resolver, ScanEntry};

/// TTL for FUSE attribute replies.
const TTL: Duration = Duration::from_secs(1);

/// Shared state the nodes operate against.
///
/// Nodes carry a borrowed (non-owning) reference to this context; it
/// outlives all of them for the mount's lifetime.
pub struct MountContext {
    /// Per-uid object clients.
    pub pool: ClientPool,
    /// On-disk cache store.
    pub store: Arc<CacheStore>,
    /// Open-handle registry.
    pub registry: Arc<HandleRegistry>,
    /// Per-cache-path mutual exclusion.
    pub keyed: Arc<KeyedMutex>,
}

impl MountContext {
    pub fn new(pool: ClientPool, store: CacheStore) -> Self {
        Self {
            pool,
            store: Arc::new(store),
            registry: Arc::new(HandleRegistry::new()),
            keyed: Arc::new(KeyedMutex::new()),
        }
    }
}

/// The mounted filesystem.
pub struct MinFs {
    ctx: Arc<MountContext>,
    options: MountOptions,
    nodes: NodeTable,
    /// fh -> local fd slot. The handle registry holds the matching
    /// cache-path entries.
    open_files: HashMap<u64, OpenFile>,
    /// Tokio runtime handle for bridging into async object-store calls.
    runtime: Handle,
    evictor_task: JoinHandle<()>,
}

impl MinFs {
    /// Create the filesystem and launch the evictor task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(ctx: Arc<MountContext>, options: MountOptions) -> Result<Self, VfsError> {
        let runtime: Handle = Handle::try_current()
            .map_err(|e| VfsError::MountFailed(format!("no tokio runtime: {e}")))?;

        let evictor = Arc::new(Evictor::new(
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.registry),
            Arc::clone(&ctx.keyed),
            EvictorConfig {
                quota_gb: options.quota_gb,
                interval: options.evictor_interval,
            },
        ));
        let evictor_task: JoinHandle<()> = runtime.spawn(evictor.run());

        let root_attr = NodeAttr::directory(0o755, options.uid, options.gid, None);

        Ok(Self {
            ctx,
            options,
            nodes: NodeTable::new(root_attr),
            open_files: HashMap::new(),
            runtime,
            evictor_task,
        })
    }

    /// Convert a node to FUSE file attributes.
    fn to_file_attr(&self, node: &Node) -> FileAttr {
        let kind: FileType = match node.kind {
            NodeKind::Directory => FileType::Directory,
            NodeKind::File => FileType::RegularFile,
        };
        let size: u64 = node.attr.size;

        FileAttr {
            ino: node.ino,
            size,
            blocks: (size + 511) / 512,
            atime: node.attr.atime,
            mtime: node.attr.mtime,
            ctime: node.attr.ctime,
            crtime: UNIX_EPOCH,
            kind,
            perm: node.attr.perm,
            nlink: if kind == FileType::Directory { 2 } else { 1 },
            uid: node.attr.uid,
            gid: node.attr.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn node_attr_from_entry(&self, entry: &ScanEntry) -> (NodeKind, NodeAttr) {
        match entry {
            ScanEntry::Dir { perm, mtime, .. } => (
                NodeKind::Directory,
                NodeAttr::directory(*perm, self.options.uid, self.options.gid, *mtime),
            ),
            ScanEntry::File {
                size, etag, mtime, ..
            } => (
                NodeKind::File,
                NodeAttr::file(
                    *size,
                    self.options.file_mode as u16,
                    self.options.uid,
                    self.options.gid,
                    *mtime,
                    etag.clone(),
                ),
            ),
        }
    }

    /// Fetch the client for the requesting uid, bridging into the runtime.
    fn client_for(&self, uid: u32) -> Result<Arc<dyn ObjectClient>, VfsError> {
        self.runtime
            .block_on(self.ctx.pool.client_for(uid))
            .map_err(VfsError::from)
    }
}

impl Filesystem for MinFs {
    fn destroy(&mut self) {
        // The cache is persistent; nothing to drain.
        self.evictor_task.abort();
        tracing::info!("filesystem unmounted");
    }

    fn lookup(&mut self, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        let (parent_kind, parent_path): (NodeKind, String) = match self.nodes.get(parent) {
            Some(node) => (node.kind, node.path.clone()),
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        if parent_kind != NodeKind::Directory {
            reply.error(libc::ENOTDIR);
            return;
        }

        let client: Arc<dyn ObjectClient> = match self.client_for(req.uid()) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "lookup: client construction failed");
                reply.error(err.errno());
                return;
            }
        };

        let resolver = Resolver::new(client.as_ref(), &self.options);
        let found: Result<Option<ScanEntry>, VfsError> =
            self.runtime.block_on(resolver.lookup(&parent_path, name));

        match found {
            Ok(Some(entry)) => {
                let (kind, attr) = self.node_attr_from_entry(&entry);
                let ino: u64 = self.nodes.upsert(parent, entry.name(), kind, attr);
                let node: &Node = self.nodes.get(ino).expect("node just upserted");
                reply.entry(&TTL, &self.to_file_attr(node), 0);
            }
            Ok(None) => reply.error(libc::ENOENT),
            Err(err) => {
                tracing::error!(parent = %parent_path, name, error = %err, "lookup failed");
                reply.error(err.errno());
            }
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        match self.nodes.get(ino) {
            Some(node) => reply.attr(&TTL, &self.to_file_attr(node)),
            None => reply.error(libc::ENOENT),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // In-memory only: nothing is written upstream, and the changes are
        // lost on remount.
        let Some(node) = self.nodes.get_mut(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Some(mode) = mode {
            node.attr.perm = (mode & 0o7777) as u16;
        }
        if let Some(uid) = uid {
            node.attr.uid = uid;
        }
        if let Some(gid) = gid {
            node.attr.gid = gid;
        }
        if let Some(size) = size {
            node.attr.size = size;
        }
        if let Some(atime) = atime {
            node.attr.atime = resolve_time(atime);
        }
        if let Some(mtime) = mtime {
            node.attr.mtime = resolve_time(mtime);
        }

        let node: &Node = self.nodes.get(ino).expect("node present above");
        reply.attr(&TTL, &self.to_file_attr(node));
    }

    fn readdir(
        &mut self,
        req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let (kind, path, parent): (NodeKind, String, u64) = match self.nodes.get(ino) {
            Some(node) => (node.kind, node.path.clone(), node.parent),
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        if kind != NodeKind::Directory {
            reply.error(libc::ENOTDIR);
            return;
        }

        let client: Arc<dyn ObjectClient> = match self.client_for(req.uid()) {
            Ok(client) => client,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        let resolver = Resolver::new(client.as_ref(), &self.options);
        let scanned: Result<Vec<ScanEntry>, VfsError> = self.runtime.block_on(resolver.scan(&path));
        let scanned: Vec<ScanEntry> = match scanned {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(path = %path, error = %err, "readdir scan failed");
                reply.error(err.errno());
                return;
            }
        };

        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent, FileType::Directory, "..".to_string()),
        ];
        for entry in &scanned {
            let (kind, attr) = self.node_attr_from_entry(entry);
            let child: u64 = self.nodes.upsert(ino, entry.name(), kind, attr);
            let file_type: FileType = match kind {
                NodeKind::Directory => FileType::Directory,
                NodeKind::File => FileType::RegularFile,
            };
            entries.push((child, file_type, entry.name().to_string()));
        }

        for (i, (e_ino, file_type, name)) in entries.iter().enumerate().skip(offset as usize) {
            if reply.add(*e_ino, (i + 1) as i64, *file_type, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let (kind, path): (NodeKind, String) = match self.nodes.get(ino) {
            Some(node) => (node.kind, node.path.clone()),
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        if kind != NodeKind::File {
            reply.error(libc::EISDIR);
            return;
        }

        let Some((bucket, rel)) = split_mount_path(&path) else {
            reply.error(libc::EISDIR);
            return;
        };
        let key: String = object_path(&self.options.base_path, rel);

        let client: Arc<dyn ObjectClient> = match self.client_for(req.uid()) {
            Ok(client) => client,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        let opened: Result<_, VfsError> = self
            .runtime
            .block_on(open_file(&self.ctx, client.as_ref(), bucket, &key, flags));

        match opened {
            Ok((handle, open, size)) => {
                tracing::debug!(
                    path = %path,
                    handle,
                    cache = %open.cache_path.display(),
                    "serving file handle"
                );
                self.open_files.insert(handle, open);
                if let Some(node) = self.nodes.get_mut(ino) {
                    node.attr.size = size;
                }
                // Bypass the kernel page cache; every read is served here.
                reply.opened(handle, fuser::consts::FOPEN_DIRECT_IO);
            }
            Err(err) => {
                tracing::error!(path = %path, error = %err, "open failed");
                reply.error(err.errno());
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(open) = self.open_files.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let mut buf: Vec<u8> = vec![0u8; size as usize];
        let mut filled: usize = 0;
        loop {
            match open.file.read_at(&mut buf[filled..], offset as u64 + filled as u64) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    if filled == buf.len() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(fh, error = %e, "read failed");
                    reply.error(libc::EIO);
                    return;
                }
            }
        }
        reply.data(&buf[..filled]);
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // Close the fd and unregister; retention of the cache file is the
        // evictor's decision.
        self.open_files.remove(&fh);
        self.ctx.registry.release(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, 512, 255, 0);
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EPERM);
    }

    fn unlink(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EPERM);
    }

    fn rmdir(&mut self, _req: &Request, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EPERM);
    }

    fn rename(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EPERM);
    }

    fn create(
        &mut self,
        _req: &Request,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        reply.error(libc::EPERM);
    }

    fn write(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        reply.error(libc::EPERM);
    }
}

fn resolve_time(t: TimeOrNow) -> SystemTime {
    match t {
        TimeOrNow::SpecificTime(time) => time,
        TimeOrNow::Now => SystemTime::now(),
    }
}

/// Mount the filesystem and block until unmount.
///
/// # Arguments
/// * `fs` - The filesystem to mount
/// * `mountpoint` - Path to mount at
pub fn mount(fs: MinFs, mountpoint: &Path) -> Result<(), VfsError> {
    fuser::mount2(
        fs,
        mountpoint,
        &[MountOption::FSName("minfs".into()), MountOption::AutoUnmount],
    )
    .map_err(|e| VfsError::MountFailed(e.to_string()))
}

/// Mount the filesystem in the background.
///
/// # Returns
/// Background session handle; dropping it unmounts.
pub fn spawn_mount(
    fs: MinFs,
    mountpoint: &Path,
) -> Result<fuser::BackgroundSession, VfsError> {
    fuser::spawn_mount2(
        fs,
        mountpoint,
        &[MountOption::FSName("minfs".into()), MountOption::AutoUnmount],
    )
    .map_err(|e| VfsError::MountFailed(e.to_string()))
}
