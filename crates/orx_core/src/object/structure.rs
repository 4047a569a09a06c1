//! # Structure Storage
//!
//! Registry multiplexing every structure type over a list or tree backend.
//!
//! Each registered type owns:
//! - A header bank, one [`StructureHeader`] per live structure
//! - A node bank plus a [`LinkList`] or [`Tree`], depending on its [`StorageKind`]
//!
//! ```text
//!   Guid ──(id, item)──> header bank[item] ──storage──> node bank[node]
//!                                ^                           |
//!                                └──────────item─────────────┘
//! ```
//!
//! The registry knows nothing about what a structure carries: domain modules
//! keep their own data keyed by [`Guid`]. Reference counters are stored here
//! but never enforced: modules check them before calling [`StructureRegistry::delete`].

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::{Guid, StorageKind, StructureId};
use crate::config::{CoreConfig, DEFAULT_STORAGE_BANK_SIZE};
use crate::error::{BankError, StructureError, StructureResult};
use crate::memory::{compact_all, Bank, BankFlags, Compact, MemoryType};
use crate::utils::{
    LinkList, ListId, ListNode, ListStorage, NodeId, Tree, TreeId, TreeNode, TreeStorage,
};

/// Where a structure's storage node lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageHandle {
    /// Not linked.
    #[default]
    None,
    /// Node of the type's list.
    List(NodeId),
    /// Node of the type's tree.
    Tree(NodeId),
}

/// Generic header every structure carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StructureHeader {
    guid: Guid,
    owner: Guid,
    flags: u32,
    ref_count: u32,
    storage: StorageHandle,
}

impl StructureHeader {
    /// Returns the structure's GUID.
    #[inline]
    #[must_use]
    pub const fn guid(&self) -> Guid {
        self.guid
    }

    /// Returns the owner's GUID, [`Guid::NONE`] if unowned.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> Guid {
        self.owner
    }

    /// Returns the flags.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// Returns the reference counter.
    #[inline]
    #[must_use]
    pub const fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Returns the storage node handle.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> StorageHandle {
        self.storage
    }
}

/// Per-type update function run by [`StructureRegistry::update`].
///
/// Receives the registry, the updated structure, the caller if any, and the
/// elapsed time in seconds.
pub type UpdateHook = Rc<dyn Fn(&mut StructureRegistry, Guid, Option<Guid>, f32) -> StructureResult<()>>;

#[derive(Clone)]
struct Hook(UpdateHook);

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpdateHook")
    }
}

/// Registration parameters of a structure type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    /// Backend kind.
    pub storage: StorageKind,
    /// Memory tag of the type's banks.
    pub memory_type: MemoryType,
    /// Cells per segment of the header bank.
    pub bank_size: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct ListCell {
    node: ListNode,
    item: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct TreeCell {
    node: TreeNode,
    item: u32,
}

impl ListStorage for Bank<ListCell> {
    fn node(&self, id: NodeId) -> &ListNode {
        match self.get_at_index(id.0) {
            Some(cell) => &cell.node,
            None => panic!("list node {} is not allocated", id.0),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ListNode {
        match self.get_at_index_mut(id.0) {
            Some(cell) => &mut cell.node,
            None => panic!("list node {} is not allocated", id.0),
        }
    }
}

impl TreeStorage for Bank<TreeCell> {
    fn node(&self, id: NodeId) -> &TreeNode {
        match self.get_at_index(id.0) {
            Some(cell) => &cell.node,
            None => panic!("tree node {} is not allocated", id.0),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        match self.get_at_index_mut(id.0) {
            Some(cell) => &mut cell.node,
            None => panic!("tree node {} is not allocated", id.0),
        }
    }
}

/// Physical storage of one type.
#[derive(Debug)]
enum Backend {
    List { list: LinkList, cells: Bank<ListCell> },
    Tree { tree: Tree, cells: Bank<TreeCell> },
}

impl Backend {
    fn new(id: StructureId, kind: StorageKind, segment_size: u32, memory_type: MemoryType) -> StructureResult<Self> {
        let raw_id = id.index() as u32;
        Ok(match kind {
            StorageKind::List => Self::List {
                list: LinkList::new(ListId(raw_id)),
                cells: Bank::new(segment_size, BankFlags::empty(), memory_type)?,
            },
            StorageKind::Tree => Self::Tree {
                tree: Tree::new(TreeId(raw_id)),
                cells: Bank::new(segment_size, BankFlags::empty(), memory_type)?,
            },
        })
    }

    const fn kind(&self) -> StorageKind {
        match self {
            Self::List { .. } => StorageKind::List,
            Self::Tree { .. } => StorageKind::Tree,
        }
    }

    fn count(&self) -> u32 {
        match self {
            Self::List { list, .. } => list.count(),
            Self::Tree { tree, .. } => tree.count(),
        }
    }

    /// Allocates and links a node for header `item`.
    ///
    /// Lists get it at the head; trees get it as root if empty, else as the
    /// root's first child.
    fn link_new(&mut self, item: u32) -> StructureResult<StorageHandle> {
        match self {
            Self::List { list, cells } => {
                let cell = cells.allocate()?;
                cell.item = item;
                let node = NodeId(cell.index());
                if let Err(error) = list.add_start(cells, node) {
                    cells.free(node.0);
                    return Err(error.into());
                }
                Ok(StorageHandle::List(node))
            }
            Self::Tree { tree, cells } => {
                let cell = cells.allocate()?;
                cell.item = item;
                let node = NodeId(cell.index());
                let linked = match tree.root() {
                    None => tree.add_root(cells, node),
                    Some(root) => tree.add_child(cells, root, node),
                };
                if let Err(error) = linked {
                    cells.free(node.0);
                    return Err(error.into());
                }
                Ok(StorageHandle::Tree(node))
            }
        }
    }

    /// Unlinks and frees a node. Nothing changes on failure.
    fn unlink(&mut self, handle: StorageHandle) -> StructureResult<()> {
        match (self, handle) {
            (Self::List { list, cells }, StorageHandle::List(node)) => {
                list.remove(cells, node)?;
                cells.free(node.0);
            }
            (Self::Tree { tree, cells }, StorageHandle::Tree(node)) => {
                tree.remove(cells, node)?;
                cells.free(node.0);
            }
            (backend, handle) => {
                panic!("storage handle {handle:?} doesn't match a {:?} backend", backend.kind());
            }
        }
        Ok(())
    }

    fn clean(&mut self) {
        match self {
            Self::List { list, cells } => {
                list.clean(cells);
                cells.clear();
            }
            Self::Tree { tree, cells } => {
                tree.clean(cells);
                cells.clear();
            }
        }
    }

    /// Returns the header item stored in node `node`.
    fn item_of(&self, node: NodeId) -> Option<u32> {
        match self {
            Self::List { cells, .. } => cells.get_at_index(node.0).map(|cell| cell.item),
            Self::Tree { cells, .. } => cells.get_at_index(node.0).map(|cell| cell.item),
        }
    }
}

/// Everything registered for one type.
#[derive(Debug)]
struct TypeStorage {
    info: TypeInfo,
    headers: Bank<StructureHeader>,
    backend: Backend,
    update: Option<Hook>,
    instance_counter: u32,
}

impl TypeStorage {
    fn guid_of(&self, node: NodeId) -> Option<Guid> {
        let item = self.backend.item_of(node)?;
        self.headers.get_at_index(item).map(|header| header.guid)
    }

    fn tree_link(&self, header: &StructureHeader, link: impl Fn(&TreeNode) -> Option<NodeId>) -> Option<Guid> {
        match (&self.backend, header.storage) {
            (Backend::Tree { cells, .. }, StorageHandle::Tree(node)) => {
                link(cells.node(node)).and_then(|next| self.guid_of(next))
            }
            _ => {
                warn!(guid = %header.guid, "storage type is not tree type");
                None
            }
        }
    }

    fn list_link(&self, header: &StructureHeader, link: impl Fn(&ListNode) -> Option<NodeId>) -> Option<Guid> {
        match (&self.backend, header.storage) {
            (Backend::List { cells, .. }, StorageHandle::List(node)) => {
                link(cells.node(node)).and_then(|next| self.guid_of(next))
            }
            _ => {
                warn!(guid = %header.guid, "storage type is not list type");
                None
            }
        }
    }
}

/// Per-type structure storage.
///
/// Replaces process-wide tables: several registries can coexist, each one
/// owning its banks. Not thread-safe; owned by the engine thread.
///
/// # Example
///
/// ```rust
/// use orx_core::memory::MemoryType;
/// use orx_core::object::{StorageKind, StructureId, StructureRegistry};
///
/// let mut registry = StructureRegistry::new();
/// registry.register(StructureId::Frame, StorageKind::Tree, MemoryType::Main, 16)?;
///
/// let root = registry.create(StructureId::Frame)?;
/// let child = registry.create(StructureId::Frame)?;
/// assert_eq!(registry.get_parent(child), Some(root));
/// # Ok::<(), orx_core::error::StructureError>(())
/// ```
#[derive(Debug)]
pub struct StructureRegistry {
    storages: [Option<TypeStorage>; StructureId::NUMBER],
    storage_bank_size: u32,
    header_flags: BankFlags,
}

impl Default for StructureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureRegistry {
    /// Creates a registry with no type registered.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage_bank_size(DEFAULT_STORAGE_BANK_SIZE)
    }

    /// Creates a registry whose node banks use `storage_bank_size` cells per segment.
    ///
    /// # Panics
    ///
    /// Panics if `storage_bank_size` is zero.
    #[must_use]
    pub fn with_storage_bank_size(storage_bank_size: u32) -> Self {
        assert!(storage_bank_size > 0, "Storage bank size must be greater than zero");
        debug!(storage_bank_size, "structure registry initialized");
        Self {
            storages: std::array::from_fn(|_| None),
            storage_bank_size,
            header_flags: BankFlags::empty(),
        }
    }

    /// Creates a registry and registers every configured type.
    ///
    /// # Errors
    ///
    /// Returns the first registration failure.
    pub fn from_config(config: &CoreConfig) -> StructureResult<Self> {
        let mut registry = Self::with_storage_bank_size(config.structure.storage_bank_size);
        registry.header_flags = config.bank.flags();
        for entry in &config.structure.types {
            registry.register(entry.id, entry.storage, entry.memory, config.bank_size_of(entry))?;
        }
        Ok(registry)
    }

    /// Binds a type to a storage kind.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::AlreadyRegistered`] if the type is bound,
    /// or a bank error if its banks can't be created.
    ///
    /// # Panics
    ///
    /// Panics if `bank_size` is zero.
    pub fn register(
        &mut self,
        id: StructureId,
        storage: StorageKind,
        memory_type: MemoryType,
        bank_size: u32,
    ) -> StructureResult<()> {
        self.register_with_update(id, storage, memory_type, bank_size, None)
    }

    /// Binds a type to a storage kind and an optional update hook.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    ///
    /// # Panics
    ///
    /// Panics if `bank_size` is zero.
    pub fn register_with_update(
        &mut self,
        id: StructureId,
        storage: StorageKind,
        memory_type: MemoryType,
        bank_size: u32,
        update: Option<UpdateHook>,
    ) -> StructureResult<()> {
        if self.storages[id.index()].is_some() {
            warn!(%id, "structure is already registered");
            return Err(StructureError::AlreadyRegistered(id));
        }

        let headers = Bank::new(bank_size, self.header_flags, memory_type)?;
        let backend = Backend::new(id, storage, self.storage_bank_size, memory_type)?;
        self.storages[id.index()] = Some(TypeStorage {
            info: TypeInfo {
                storage,
                memory_type,
                bank_size,
            },
            headers,
            backend,
            update: update.map(Hook),
            instance_counter: 0,
        });

        debug!(%id, ?storage, memory = %memory_type, bank_size, "structure type registered");
        Ok(())
    }

    /// Unbinds a type, dropping every structure still stored for it.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotRegistered`] if the type isn't bound.
    pub fn unregister(&mut self, id: StructureId) -> StructureResult<()> {
        let Some(mut storage) = self.storages[id.index()].take() else {
            warn!(%id, "structure is not registered");
            return Err(StructureError::NotRegistered(id));
        };

        let live = storage.backend.count();
        if live > 0 {
            warn!(%id, live, "unregistering structure type with live structures");
        }
        storage.backend.clean();

        debug!(%id, "structure type unregistered");
        Ok(())
    }

    /// Replaces the update hook of a registered type, `None` to remove it.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotRegistered`] if the type isn't bound.
    pub fn set_update_hook(&mut self, id: StructureId, update: Option<UpdateHook>) -> StructureResult<()> {
        let Some(storage) = self.storages[id.index()].as_mut() else {
            warn!(%id, "structure is not registered");
            return Err(StructureError::NotRegistered(id));
        };
        storage.update = update.map(Hook);
        Ok(())
    }

    /// Checks whether a registered type has an update hook.
    #[must_use]
    pub fn has_update_hook(&self, id: StructureId) -> bool {
        self.storages[id.index()]
            .as_ref()
            .is_some_and(|storage| storage.update.is_some())
    }

    /// Runs the update hook of a structure's type.
    ///
    /// Types without a hook update successfully without doing anything.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotRegistered`] if the type isn't bound,
    /// [`StructureError::StaleGuid`] if `guid` is not live, or the hook's error.
    pub fn update(&mut self, guid: Guid, caller: Option<Guid>, dt: f32) -> StructureResult<()> {
        let Some(id) = guid.structure_id() else {
            return Err(StructureError::StaleGuid(guid));
        };
        let Some(storage) = self.storages[id.index()].as_ref() else {
            warn!(%id, "structure is not registered");
            return Err(StructureError::NotRegistered(id));
        };
        let hook = storage.update.clone();
        self.header_of(guid)?;

        match hook {
            Some(Hook(update)) => update(self, guid, caller, dt),
            None => Ok(()),
        }
    }

    /// Checks whether a type is bound.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, id: StructureId) -> bool {
        self.storages[id.index()].is_some()
    }

    /// Returns a type's registration parameters.
    #[must_use]
    pub fn type_info(&self, id: StructureId) -> Option<TypeInfo> {
        self.storages[id.index()].as_ref().map(|storage| storage.info)
    }

    /// Returns a type's storage kind, `None` if unregistered.
    #[must_use]
    pub fn get_storage_kind(&self, id: StructureId) -> Option<StorageKind> {
        self.storages[id.index()]
            .as_ref()
            .map(|storage| storage.backend.kind())
    }

    /// Returns the number of live structures of a type, `None` if unregistered.
    #[must_use]
    pub fn get_number(&self, id: StructureId) -> Option<u32> {
        match &self.storages[id.index()] {
            Some(storage) => Some(storage.backend.count()),
            None => {
                warn!(%id, "structure is not registered");
                None
            }
        }
    }

    /// Creates a structure and links it into its type's backend.
    ///
    /// Its reference counter and flags start at zero, it has no owner.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotRegistered`] if the type isn't bound, or
    /// a bank error if a cell can't be allocated.
    pub fn create(&mut self, id: StructureId) -> StructureResult<Guid> {
        let Some(storage) = self.storages[id.index()].as_mut() else {
            warn!(%id, "structure type is not registered");
            return Err(StructureError::NotRegistered(id));
        };
        let TypeStorage {
            headers,
            backend,
            instance_counter,
            ..
        } = storage;

        let capacity = headers.capacity();
        let header = headers.allocate()?;
        let item = header.index();
        if item > Guid::ITEM_MAX {
            headers.free(item);
            warn!(%id, "structure item index space exhausted");
            return Err(BankError::IndexSpaceExhausted { capacity }.into());
        }

        match backend.link_new(item) {
            Ok(handle) => {
                *instance_counter = instance_counter.wrapping_add(1);
                let guid = Guid::new(id, item, *instance_counter);
                **header = StructureHeader {
                    guid,
                    owner: Guid::NONE,
                    flags: 0,
                    ref_count: 0,
                    storage: handle,
                };
                trace!(%id, %guid, "structure created");
                Ok(guid)
            }
            Err(error) => {
                headers.free(item);
                warn!(%id, %error, "can't link structure into its storage");
                Err(error)
            }
        }
    }

    /// Unlinks a structure and frees its cells.
    ///
    /// The reference counter is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if `guid` is not live, or the
    /// backend's refusal (a tree root with children can't be deleted). The
    /// structure is left untouched on error.
    pub fn delete(&mut self, guid: Guid) -> StructureResult<()> {
        let storage = self.storage_of_mut(guid)?;
        let item = guid.item();
        let handle = storage
            .headers
            .get_at_index(item)
            .map_or(StorageHandle::None, |header| header.storage);

        if let Err(error) = storage.backend.unlink(handle) {
            warn!(%guid, %error, "can't remove structure from its storage");
            return Err(error);
        }
        storage.headers.free(item);

        trace!(%guid, "structure deleted");
        Ok(())
    }

    /// Returns the header of a live structure.
    #[must_use]
    pub fn get(&self, guid: Guid) -> Option<&StructureHeader> {
        let storage = self.storages[guid.structure_id()?.index()].as_ref()?;
        let header = storage.headers.get_at_index(guid.item())?;
        (header.guid == guid).then_some(&**header)
    }

    /// Checks whether `guid` designates a live structure.
    #[inline]
    #[must_use]
    pub fn contains(&self, guid: Guid) -> bool {
        self.get(guid).is_some()
    }

    /// First structure of a type: list head or tree root.
    #[must_use]
    pub fn get_first(&self, id: StructureId) -> Option<Guid> {
        let storage = self.registered(id)?;
        let node = match &storage.backend {
            Backend::List { list, .. } => list.first(),
            Backend::Tree { tree, .. } => tree.root(),
        }?;
        storage.guid_of(node)
    }

    /// Last structure of a type: list tail or tree root.
    #[must_use]
    pub fn get_last(&self, id: StructureId) -> Option<Guid> {
        let storage = self.registered(id)?;
        let node = match &storage.backend {
            Backend::List { list, .. } => list.last(),
            Backend::Tree { tree, .. } => tree.root(),
        }?;
        storage.guid_of(node)
    }

    /// Iterates over a type's structures: list order, or tree pre-order.
    pub fn iter(&self, id: StructureId) -> Box<dyn Iterator<Item = Guid> + '_> {
        let Some(storage) = self.registered(id) else {
            return Box::new(std::iter::empty());
        };
        match &storage.backend {
            Backend::List { list, cells } => Box::new(
                list.iter(cells)
                    .filter_map(move |node| storage.guid_of(node)),
            ),
            Backend::Tree { tree, cells } => Box::new(
                tree.depth_first(cells)
                    .filter_map(move |node| storage.guid_of(node)),
            ),
        }
    }

    /// Parent of a tree-stored structure.
    #[must_use]
    pub fn get_parent(&self, guid: Guid) -> Option<Guid> {
        let (storage, header) = self.lookup(guid)?;
        storage.tree_link(header, TreeNode::parent)
    }

    /// First child of a tree-stored structure.
    #[must_use]
    pub fn get_child(&self, guid: Guid) -> Option<Guid> {
        let (storage, header) = self.lookup(guid)?;
        storage.tree_link(header, TreeNode::child)
    }

    /// Previous sibling of a tree-stored structure.
    #[must_use]
    pub fn get_left_sibling(&self, guid: Guid) -> Option<Guid> {
        let (storage, header) = self.lookup(guid)?;
        storage.tree_link(header, TreeNode::left_sibling)
    }

    /// Next sibling of a tree-stored structure.
    #[must_use]
    pub fn get_right_sibling(&self, guid: Guid) -> Option<Guid> {
        let (storage, header) = self.lookup(guid)?;
        storage.tree_link(header, TreeNode::right_sibling)
    }

    /// Previous structure of a list-stored structure.
    #[must_use]
    pub fn get_previous(&self, guid: Guid) -> Option<Guid> {
        let (storage, header) = self.lookup(guid)?;
        storage.list_link(header, ListNode::previous)
    }

    /// Next structure of a list-stored structure.
    #[must_use]
    pub fn get_next(&self, guid: Guid) -> Option<Guid> {
        let (storage, header) = self.lookup(guid)?;
        storage.list_link(header, ListNode::next)
    }

    /// Moves a tree-stored structure and its branch under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] for a dead GUID,
    /// [`StructureError::TypeMismatch`] if both aren't of the same type,
    /// [`StructureError::WrongStorage`] if the type is list-stored, or
    /// [`TreeError::Cycle`](crate::error::TreeError::Cycle) if `parent` lies
    /// in the moved branch.
    pub fn set_parent(&mut self, guid: Guid, parent: Guid) -> StructureResult<()> {
        let parent_handle = self.header_of(parent)?.storage;
        let storage = self.storage_of_mut(guid)?;
        let (child_id, parent_id) = (guid.structure_id(), parent.structure_id());
        if let (Some(child), Some(parent)) = (child_id, parent_id) {
            if child != parent {
                warn!(%child, %parent, "can't parent structures of different types");
                return Err(StructureError::TypeMismatch { child, parent });
            }
        }

        let handle = storage
            .headers
            .get_at_index(guid.item())
            .map_or(StorageHandle::None, |header| header.storage);
        match (&mut storage.backend, handle, parent_handle) {
            (Backend::Tree { tree, cells }, StorageHandle::Tree(node), StorageHandle::Tree(parent_node)) => {
                tree.move_as_child(cells, parent_node, node)?;
                trace!(%guid, %parent, "structure parent set");
                Ok(())
            }
            (backend, ..) => {
                let id = storage_id(guid);
                warn!(%id, "storage type is not tree type");
                Err(StructureError::WrongStorage {
                    id,
                    expected: StorageKind::Tree,
                    actual: backend.kind(),
                })
            }
        }
    }

    /// Increases a structure's reference counter and returns its new value.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if `guid` is not live.
    pub fn increase_counter(&mut self, guid: Guid) -> StructureResult<u32> {
        let header = self.header_mut(guid)?;
        header.ref_count += 1;
        Ok(header.ref_count)
    }

    /// Decreases a structure's reference counter and returns its new value.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if `guid` is not live.
    ///
    /// # Panics
    ///
    /// Panics if the counter is already zero.
    pub fn decrease_counter(&mut self, guid: Guid) -> StructureResult<u32> {
        let header = self.header_mut(guid)?;
        assert!(header.ref_count > 0, "reference counter of {guid} is already zero");
        header.ref_count -= 1;
        Ok(header.ref_count)
    }

    /// Returns a structure's reference counter.
    #[must_use]
    pub fn get_counter(&self, guid: Guid) -> Option<u32> {
        self.get(guid).map(StructureHeader::ref_count)
    }

    /// Checks whether any of `flags` is set.
    #[must_use]
    pub fn test_flags(&self, guid: Guid, flags: u32) -> bool {
        self.get(guid).is_some_and(|header| header.flags & flags != 0)
    }

    /// Checks whether all of `flags` are set.
    #[must_use]
    pub fn test_all_flags(&self, guid: Guid, flags: u32) -> bool {
        self.get(guid).is_some_and(|header| header.flags & flags == flags)
    }

    /// Returns the flags selected by `mask`.
    #[must_use]
    pub fn get_flags(&self, guid: Guid, mask: u32) -> Option<u32> {
        self.get(guid).map(|header| header.flags & mask)
    }

    /// Clears `remove`, then sets `add`.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if `guid` is not live.
    pub fn set_flags(&mut self, guid: Guid, add: u32, remove: u32) -> StructureResult<()> {
        let header = self.header_mut(guid)?;
        header.flags = (header.flags & !remove) | add;
        Ok(())
    }

    /// Sets a structure's owner, [`Guid::NONE`] to clear it.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if `guid` is not live.
    pub fn set_owner(&mut self, guid: Guid, owner: Guid) -> StructureResult<()> {
        self.header_mut(guid)?.owner = owner;
        Ok(())
    }

    /// Returns a structure's owner.
    #[must_use]
    pub fn get_owner(&self, guid: Guid) -> Option<Guid> {
        self.get(guid)
            .map(StructureHeader::owner)
            .filter(|owner| !owner.is_none())
    }

    /// Releases the unused trailing segments of every bank.
    pub fn compact_all(&mut self) {
        for storage in self.storages.iter_mut().flatten() {
            let TypeStorage {
                headers, backend, ..
            } = storage;
            match backend {
                Backend::List { cells, .. } => compact_all(&mut [headers as &mut dyn Compact, cells]),
                Backend::Tree { cells, .. } => compact_all(&mut [headers as &mut dyn Compact, cells]),
            }
        }
    }

    /// Cleans every backend and releases every bank.
    pub fn exit(&mut self) {
        for (index, slot) in self.storages.iter_mut().enumerate() {
            if let Some(mut storage) = slot.take() {
                let live = storage.backend.count();
                if live > 0 {
                    debug!(id = %StructureId::ALL[index], live, "cleaning structures left at exit");
                }
                storage.backend.clean();
            }
        }
    }

    fn registered(&self, id: StructureId) -> Option<&TypeStorage> {
        let storage = self.storages[id.index()].as_ref();
        if storage.is_none() {
            warn!(%id, "structure is not registered");
        }
        storage
    }

    fn lookup(&self, guid: Guid) -> Option<(&TypeStorage, &StructureHeader)> {
        let storage = self.storages[guid.structure_id()?.index()].as_ref()?;
        let header = storage.headers.get_at_index(guid.item())?;
        (header.guid == guid).then_some((storage, &**header))
    }

    fn header_of(&self, guid: Guid) -> StructureResult<&StructureHeader> {
        self.get(guid).ok_or_else(|| {
            warn!(%guid, "stale structure GUID");
            StructureError::StaleGuid(guid)
        })
    }

    fn storage_of_mut(&mut self, guid: Guid) -> StructureResult<&mut TypeStorage> {
        if !self.contains(guid) {
            warn!(%guid, "stale structure GUID");
            return Err(StructureError::StaleGuid(guid));
        }
        self.storages[storage_id(guid).index()]
            .as_mut()
            .ok_or(StructureError::StaleGuid(guid))
    }

    fn header_mut(&mut self, guid: Guid) -> StructureResult<&mut StructureHeader> {
        let storage = self.storage_of_mut(guid)?;
        storage
            .headers
            .get_at_index_mut(guid.item())
            .map(|header| &mut **header)
            .ok_or(StructureError::StaleGuid(guid))
    }
}

impl Drop for StructureRegistry {
    fn drop(&mut self) {
        self.exit();
    }
}

/// Type of a GUID already checked to be live.
fn storage_id(guid: Guid) -> StructureId {
    match guid.structure_id() {
        Some(id) => id,
        None => panic!("GUID {guid} has no structure type"),
    }
}
