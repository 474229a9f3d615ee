use crate::console::Console;
use crate::host::{Host, StdHost};
use crate::string_array::{StringArray, StringArrayError};
use crate::table::HandleTable;
use crate::vfs::{LeafKind, NodeId, Vfs};
use crate::{Errno, Result};
use anyhow::Context;
use std::fmt;
use tracing::debug;

/// A builder allowing customizable construction of `WasiCtx` instances.
#[derive(Default)]
pub struct WasiCtxBuilder {
    host: Option<Box<dyn Host>>,
    args: Vec<String>,
    env: Vec<(String, String)>,
    preloads: Vec<Preload>,
}

/// Filesystem content created by `build`, in the order it was added.
enum Preload {
    Dir(String),
    File(String, Vec<u8>),
}

impl WasiCtxBuilder {
    /// Builder for a new `WasiCtx`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `host` for console lines, clocks, randomness and `proc_exit`
    /// instead of the current process.
    pub fn host(mut self, host: impl Host + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Add an argument to the command-line arguments list.
    ///
    /// Arguments must not contain NUL bytes, or else `WasiCtxBuilder::build()` will fail.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add arguments to the command-line arguments list.
    pub fn args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an entry to the environment.
    ///
    /// Keys and values must not contain NUL bytes, or else `WasiCtxBuilder::build()` will fail.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Create the directory `path` (and its parents) before the guest runs.
    pub fn preload_dir(mut self, path: impl Into<String>) -> Self {
        self.preloads.push(Preload::Dir(path.into()));
        self
    }

    /// Create the file `path` holding `contents` before the guest runs.
    pub fn preload_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.preloads
            .push(Preload::File(path.into(), contents.into()));
        self
    }

    /// Build a `WasiCtx`, consuming this `WasiCtxBuilder`.
    ///
    /// Fails if an argument or environment entry contains a NUL byte, or if
    /// a preloaded path is not absolute or collides with an existing node
    /// of the other kind.
    pub fn build(self) -> anyhow::Result<WasiCtx> {
        let host = self.host.unwrap_or_else(|| Box::new(StdHost::new()));
        let mut ctx = WasiCtx::new(host);
        for arg in self.args {
            ctx.push_arg(arg).context("adding argument")?;
        }
        for (key, value) in self.env {
            ctx.push_env(&key, &value)
                .with_context(|| format!("adding environment variable {key:?}"))?;
        }
        for preload in self.preloads {
            match preload {
                Preload::Dir(path) => {
                    ctx.preload_dir(&path)
                        .with_context(|| format!("preloading directory {path:?}"))?;
                }
                Preload::File(path, contents) => {
                    ctx.preload_file(&path, &contents)
                        .with_context(|| format!("preloading file {path:?}"))?;
                }
            }
        }
        Ok(ctx)
    }
}

/// Everything the hostcalls operate on: the filesystem, the descriptor
/// table, the console buffers and the host callbacks.
pub struct WasiCtx {
    pub(crate) vfs: Vfs,
    pub(crate) table: HandleTable,
    pub(crate) console: Console,
    pub(crate) args: StringArray,
    pub(crate) env: StringArray,
    pub(crate) host: Box<dyn Host>,
    pending_path: Vec<u8>,
}

impl WasiCtx {
    /// An empty filesystem with only the root preopened at fd 3.
    pub fn new(host: Box<dyn Host>) -> Self {
        let vfs = Vfs::new();
        let table = HandleTable::new(vfs.root());
        Self {
            vfs,
            table,
            console: Console::default(),
            args: StringArray::new(),
            env: StringArray::new(),
            host,
            pending_path: Vec::new(),
        }
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) -> std::result::Result<(), StringArrayError> {
        self.args.push(arg.into())
    }

    pub fn push_env(&mut self, var: &str, value: &str) -> std::result::Result<(), StringArrayError> {
        self.env.push(format!("{var}={value}"))
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn table(&self) -> &HandleTable {
        &self.table
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// The contents of the file at the absolute `path`.
    pub fn file_contents(&self, path: &str) -> Result<&[u8]> {
        let node = self.vfs.resolve(self.vfs.root(), absolute(path)?)?;
        self.vfs.contents(node)
    }

    /// Returns a zeroed buffer of `len` bytes for the host to write a path
    /// into, ahead of [`WasiCtx::materialize_file`].
    pub fn stage_path(&mut self, len: usize) -> &mut [u8] {
        self.pending_path.clear();
        self.pending_path.resize(len, 0);
        &mut self.pending_path
    }

    /// Makes the staged path an empty file of `size` zero bytes, replacing
    /// any directory there, and returns its contents for the host to fill.
    pub fn materialize_file(&mut self, size: usize) -> Result<&mut [u8]> {
        let path = std::str::from_utf8(&self.pending_path)?;
        let root = self.vfs.root();
        let (node, _) = self
            .vfs
            .resolve_or_create(root, absolute(path)?, LeafKind::File)?;
        if node == root {
            return Err(Errno::Isdir);
        }
        debug!("loader: {:?} <- {} bytes", path, size);
        self.vfs.make_file(node);
        self.vfs.set_size(node, u64::try_from(size)?)?;
        self.vfs.contents_mut(node)
    }

    /// Stages `path` and materializes it holding `contents`.
    pub fn preload_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        self.stage_path(path.len()).copy_from_slice(path.as_bytes());
        self.materialize_file(contents.len())?
            .copy_from_slice(contents);
        Ok(())
    }

    /// Creates the directory at the absolute `path` and any missing parents.
    pub fn preload_dir(&mut self, path: &str) -> Result<NodeId> {
        let root = self.vfs.root();
        let (node, _) = self
            .vfs
            .resolve_or_create(root, absolute(path)?, LeafKind::Directory)?;
        if !self.vfs.node(node).is_dir() {
            return Err(Errno::Notdir);
        }
        debug!("loader: directory {:?}", path);
        Ok(node)
    }
}

/// Loader paths must be rooted.
fn absolute(path: &str) -> Result<&str> {
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(Errno::Inval)
    }
}

impl fmt::Debug for WasiCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasiCtx")
            .field("vfs", &self.vfs)
            .field("table", &self.table)
            .field("console", &self.console)
            .field("args", &self.args)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
