// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::{FixId, IdError};

const HISTORY_FILENAME: &str = "proteus-history.json";

/// What a conversation item is, which controls both rendering and the
/// streaming rules applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    /// A prompt the user submitted.
    User,
    /// A streamed AI reply.
    Ai,
    /// An engine notice shown inline (fix applied, fix discarded).
    UserMessage,
    /// A failure surfaced as a history item instead of a crash.
    Error,
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Ai => "ai",
            Self::UserMessage => "usermessage",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Markup pair attached to the item that produced a fix proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixAttachment {
    pub original_fragment: String,
    pub fixed_fragment: String,
    pub fix_id: FixId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationItem {
    pub kind: ConversationKind,
    pub content: String,
    pub is_streaming: bool,
    pub fix: Option<FixAttachment>,
}

impl ConversationItem {
    pub fn new(kind: ConversationKind, content: impl Into<String>) -> Self {
        Self { kind, content: content.into(), is_streaming: false, fix: None }
    }
}

/// Result of routing one streamed chunk into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamUpdate {
    /// The chunk was appended to the active streaming item and persisted.
    Appended,
    /// No item is currently streaming; the chunk was dropped.
    NoActiveItem,
}

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    InvalidFixId { value: String, source: IdError },
    SymlinkRefused { path: PathBuf },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::InvalidFixId { value, source } => {
                write!(f, "invalid persisted fix id {value:?}: {source}")
            }
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidFixId { source, .. } => Some(source),
            Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to
    /// stable storage where possible. Exact guarantees are
    /// platform/filesystem-dependent.
    Durable,
}

/// The conversation history: an ordered in-memory item list mirrored to one
/// JSON file under the session folder.
///
/// Invariant: at most one item is streaming at any time. The whole list is
/// rewritten on every mutation; history grows at interaction volume, not at
/// log volume, so full rewrites stay cheap.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
    durability: WriteDurability,
    items: Vec<ConversationItem>,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
            items: Vec::new(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILENAME)
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item currently receiving streamed chunks, if any.
    pub fn streaming_item(&self) -> Option<&ConversationItem> {
        self.items.iter().find(|item| item.is_streaming)
    }

    /// Pushes an item and persists the full list.
    ///
    /// An ai-typed item starts streaming; every other kind is stored
    /// settled. If a previous stream never finalized, its flag is cleared
    /// here so at most one item streams at a time.
    pub fn append(&mut self, mut item: ConversationItem) -> Result<(), StoreError> {
        item.is_streaming = matches!(item.kind, ConversationKind::Ai);
        if item.is_streaming {
            for existing in &mut self.items {
                existing.is_streaming = false;
            }
        }
        self.items.push(item);
        self.persist()
    }

    /// Appends `chunk` to the active streaming item and persists.
    ///
    /// Without an active item this reports [`StreamUpdate::NoActiveItem`]
    /// and touches nothing; a chunk arriving after finalize is a timing
    /// artifact, not an error.
    pub fn update_streaming(&mut self, chunk: &str) -> Result<StreamUpdate, StoreError> {
        let Some(item) = self.items.iter_mut().find(|item| item.is_streaming) else {
            return Ok(StreamUpdate::NoActiveItem);
        };
        item.content.push_str(chunk);
        self.persist()?;
        Ok(StreamUpdate::Appended)
    }

    /// Marks the active streaming item settled, persists, and returns its
    /// full accumulated content. Returns `None` when nothing was streaming.
    pub fn finalize(&mut self) -> Result<Option<String>, StoreError> {
        let Some(item) = self.items.iter_mut().find(|item| item.is_streaming) else {
            return Ok(None);
        };
        item.is_streaming = false;
        let content = item.content.clone();
        self.persist()?;
        Ok(Some(content))
    }

    /// Attaches the fix markup pair to the most recent ai item and
    /// persists. Returns `false` when the history holds no ai item.
    pub fn attach_fix(&mut self, fix: FixAttachment) -> Result<bool, StoreError> {
        let Some(item) = self
            .items
            .iter_mut()
            .rev()
            .find(|item| matches!(item.kind, ConversationKind::Ai))
        else {
            return Ok(false);
        };
        item.fix = Some(fix);
        self.persist()?;
        Ok(true)
    }

    /// Reads the persisted list, replacing the in-memory one.
    ///
    /// A missing file is an empty history. An item persisted mid-stream by
    /// an interrupted session comes back settled with its partial content.
    pub fn load(&mut self) -> Result<&[ConversationItem], StoreError> {
        let path = self.log_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.items.clear();
                return Ok(&self.items);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let json_items: Vec<ConversationItemJson> =
            serde_json::from_str(&contents).map_err(|source| StoreError::Json { path, source })?;

        let mut items = Vec::with_capacity(json_items.len());
        for json in json_items {
            let mut item = item_from_json(json)?;
            item.is_streaming = false;
            items.push(item);
        }
        self.items = items;
        Ok(&self.items)
    }

    /// Drops every item and persists the empty list.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.items.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json_items = self.items.iter().map(item_to_json).collect::<Vec<_>>();
        let path = self.log_path();
        let json = serde_json::to_string_pretty(&json_items)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;
        write_atomic(&self.root, &path, format!("{json}\n").as_bytes(), self.durability)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationItemJson {
    #[serde(rename = "type")]
    kind: ConversationKindJson,
    content: String,
    #[serde(
        default,
        rename = "isStreaming",
        skip_serializing_if = "is_false"
    )]
    is_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fix: Option<FixAttachmentJson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ConversationKindJson {
    User,
    Ai,
    UserMessage,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixAttachmentJson {
    original_fragment: String,
    fixed_fragment: String,
    fix_id: String,
}

impl From<ConversationKind> for ConversationKindJson {
    fn from(kind: ConversationKind) -> Self {
        match kind {
            ConversationKind::User => Self::User,
            ConversationKind::Ai => Self::Ai,
            ConversationKind::UserMessage => Self::UserMessage,
            ConversationKind::Error => Self::Error,
        }
    }
}

impl From<ConversationKindJson> for ConversationKind {
    fn from(kind: ConversationKindJson) -> Self {
        match kind {
            ConversationKindJson::User => Self::User,
            ConversationKindJson::Ai => Self::Ai,
            ConversationKindJson::UserMessage => Self::UserMessage,
            ConversationKindJson::Error => Self::Error,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn item_to_json(item: &ConversationItem) -> ConversationItemJson {
    ConversationItemJson {
        kind: item.kind.into(),
        content: item.content.clone(),
        is_streaming: item.is_streaming,
        fix: item.fix.as_ref().map(|fix| FixAttachmentJson {
            original_fragment: fix.original_fragment.clone(),
            fixed_fragment: fix.fixed_fragment.clone(),
            fix_id: fix.fix_id.to_string(),
        }),
    }
}

fn item_from_json(json: ConversationItemJson) -> Result<ConversationItem, StoreError> {
    let fix = match json.fix {
        None => None,
        Some(fix_json) => {
            let fix_id = FixId::new(fix_json.fix_id.clone()).map_err(|source| {
                StoreError::InvalidFixId { value: fix_json.fix_id, source }
            })?;
            Some(FixAttachment {
                original_fragment: fix_json.original_fragment,
                fixed_fragment: fix_json.fixed_fragment,
                fix_id,
            })
        }
    };

    Ok(ConversationItem {
        kind: json.kind.into(),
        content: json.content,
        is_streaming: json.is_streaming,
        fix,
    })
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic(
    root: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    fs::create_dir_all(root)
        .map_err(|source| StoreError::Io { path: root.to_path_buf(), source })?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io { path: path.to_path_buf(), source });
        }
    }

    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path = parent.join(format!(".proteus.tmp.{}.{}", file_name.to_string_lossy(), nanos));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    file.write_all(contents)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    if durability == WriteDurability::Durable {
        file.sync_all()
            .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
            dir.sync_all()
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
    }

    Ok(())
}
