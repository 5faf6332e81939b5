//! Index File - the B+ tree orchestrator.
//!
//! The [`IndexFile`] owns every block of one index and provides:
//! - Insert with recursive node splitting
//! - Exact-match search, duplicate-aware lookup and range scans
//! - Breadth-first introspection and structural validation
//! - Saving to and loading from a [`DiskManager`]

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::path::Path;

use tracing::{debug, trace};

use crate::common::config::{IndexConfig, MAX_BLOCKS};
use crate::common::{BlockId, Error, Result};
use crate::index::btree::internal_node::InternalNode;
use crate::index::btree::key::{Key, KeyType};
use crate::index::btree::leaf_node::LeafNode;
use crate::index::btree::node::{MetaNode, Node, NodeKind};
use crate::storage::{Block, DiskManager};

/// A B+ tree index over one column, held as a sequence of blocks.
///
/// # Block Sequence
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬─────┐
/// │ Block 0  │ Block 1  │ Block 2  │ Block 3  │ ... │
/// │ metadata │ first    │ created by splits, appended │
/// │order+root│ root     │ in creation order           │
/// └──────────┴──────────┴──────────┴──────────┴─────┘
/// ```
/// Blocks are only ever appended; a split reuses the overflowing block as
/// its left half and appends the right half (and, when the root splits, a
/// new root).
///
/// # Splitting
/// A node holds at most `order - 1` keys. Inserting into a full node
/// builds the `order` combined keys in memory and cuts them at
/// `mid = ceil((order + 1) / 2) - 1`:
/// - leaf: `[0, mid)` stays, `[mid, order)` moves right, and the first
///   right key is *copied* up as the separator
/// - internal: `[0, mid)` stays, `(mid, order)` moves right, and key `mid`
///   is *moved* up
///
/// Promotion repeats up the path recorded during descent. When the root
/// itself splits, a new root with one separator is appended and the
/// metadata block is rewritten; this is the only way the tree grows taller.
///
/// # Thread Safety
/// `IndexFile` is single-threaded. Mutation takes `&mut self`, so callers
/// that share an index must serialize access themselves.
///
/// # Example
/// ```
/// use blockidx::index::btree::{IndexFile, Key, KeyType};
/// use blockidx::BlockId;
///
/// let mut index = IndexFile::new(4, KeyType::Int32).unwrap();
/// for k in [5, 1, 3, 7] {
///     index.insert(&Key::from(k), BlockId::new(k as u16)).unwrap();
/// }
///
/// assert_eq!(index.height(), 2);
/// let leaf = index.search(&Key::from(7)).unwrap().unwrap();
/// assert!(index.node(leaf).unwrap().is_leaf());
/// assert_eq!(index.search(&Key::from(4)).unwrap(), None);
/// ```
#[derive(Debug)]
pub struct IndexFile {
    config: IndexConfig,
    blocks: Vec<Node>,
}

impl IndexFile {
    /// Create an empty index: the metadata block plus an empty leaf root.
    ///
    /// # Errors
    /// Returns `Error::InvalidOrder` if `order` is unusable (see
    /// [`IndexConfig::validate`]).
    pub fn new(order: u16, key_type: KeyType) -> Result<Self> {
        Self::with_config(IndexConfig::new(order, key_type))
    }

    /// Create an empty index from a config.
    pub fn with_config(config: IndexConfig) -> Result<Self> {
        config.validate()?;

        let root = BlockId::new(1);
        let blocks = vec![
            Node::Meta(MetaNode::new(config.order, root)),
            Node::Leaf(LeafNode::new(config.key_type)),
        ];

        debug!(order = config.order, key_type = %config.key_type, "created index");
        Ok(Self { config, blocks })
    }

    // ========================================================================
    // Public API: Properties
    // ========================================================================

    /// Maximum number of children per internal node.
    #[inline]
    pub fn order(&self) -> u16 {
        self.config.order
    }

    /// Type of every key in this index.
    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.config.key_type
    }

    /// Settings this index was created with.
    #[inline]
    pub fn config(&self) -> IndexConfig {
        self.config
    }

    /// Current root block, as recorded in the metadata block.
    #[inline]
    pub fn root_id(&self) -> BlockId {
        self.meta().root()
    }

    /// Number of blocks, including the metadata block.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The decoded node at `block_id`, if it exists.
    pub fn node(&self, block_id: BlockId) -> Option<&Node> {
        self.blocks.get(block_id.index())
    }

    /// Kind of the block at `block_id`, if it exists.
    pub fn kind_of(&self, block_id: BlockId) -> Option<NodeKind> {
        self.node(block_id).map(Node::kind)
    }

    /// The raw block at `block_id`, if it exists.
    pub fn block(&self, block_id: BlockId) -> Option<&Block> {
        self.node(block_id).map(Node::block)
    }

    /// Read `len` bytes of a block, or `None` if out of range.
    pub fn read_bytes(&self, block_id: BlockId, offset: usize, len: usize) -> Option<&[u8]> {
        self.block(block_id)?.as_slice().get(offset..offset + len)
    }

    /// In-memory parent of a node (`None` for the root).
    pub fn parent_of(&self, block_id: BlockId) -> Option<BlockId> {
        self.node(block_id).and_then(Node::parent)
    }

    /// Number of levels from root to leaves (1 when the root is a leaf).
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root_id();
        while let Node::Internal(internal) = self.node_at(current) {
            current = internal.children()[0];
            height += 1;
        }
        height
    }

    /// Total number of entries across all leaves.
    pub fn len(&self) -> usize {
        self.leaves().iter().map(|&id| self.leaf(id).num_keys()).sum()
    }

    /// Check if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaf holding the smallest keys.
    pub fn leftmost_leaf(&self) -> BlockId {
        self.edge_leaf(|children| children[0])
    }

    /// Leaf holding the largest keys.
    pub fn rightmost_leaf(&self) -> BlockId {
        self.edge_leaf(|children| children[children.len() - 1])
    }

    /// Leaf block ids in key order, following `next` links.
    pub fn leaves(&self) -> Vec<BlockId> {
        let mut leaves = Vec::new();
        let mut current = Some(self.leftmost_leaf());
        while let Some(id) = current {
            leaves.push(id);
            current = self.leaf(id).next();
        }
        leaves
    }

    // ========================================================================
    // Public API: Insert and delete
    // ========================================================================

    /// Insert `key` pointing at data block `data_block_id`.
    ///
    /// Duplicate keys are allowed; each insert adds a new entry.
    ///
    /// # Errors
    /// - `Error::KeyTypeMismatch` if `key` is not of the index's type
    /// - `Error::KeyTooLarge` if the encoded key cannot fit a full node
    /// - `Error::IndexFull` if a split would need more than 65,536 blocks
    ///
    /// The index is unchanged when an error is returned.
    pub fn insert(&mut self, key: &Key, data_block_id: BlockId) -> Result<()> {
        self.check_type(key)?;
        let max = self.config.max_key_len();
        if key.encoded_len() > max {
            return Err(Error::KeyTooLarge {
                len: key.encoded_len(),
                max,
            });
        }

        let (leaf_id, ancestors) = self.descend(key, InternalNode::search_slot)?;
        trace!(key = %key, leaf = %leaf_id, depth = ancestors.len(), "insert");

        if !self.is_full(leaf_id) {
            return self.leaf_mut(leaf_id).insert(key, data_block_id);
        }

        // Worst case: every node on the path splits and a new root appears.
        if self.blocks.len() + ancestors.len() + 2 > MAX_BLOCKS {
            return Err(Error::IndexFull);
        }

        let (separator, right_id) = self.split_leaf(leaf_id, key, data_block_id)?;
        self.promote(leaf_id, separator, right_id, ancestors)
    }

    /// Delete entries for `key`.
    ///
    /// Not implemented: always fails and never modifies the index.
    ///
    /// # Errors
    /// Always returns `Error::Unimplemented`.
    pub fn delete(&mut self, _key: &Key) -> Result<bool> {
        Err(Error::Unimplemented("delete"))
    }

    // ========================================================================
    // Public API: Search and scans
    // ========================================================================

    /// Find the leaf that holds `key`.
    ///
    /// Descends exactly as `insert` does and checks the resolved leaf for an
    /// exact match. Returns the leaf's block id (not a data block id), or
    /// `None` if the key is absent.
    ///
    /// # Errors
    /// Returns `Error::KeyTypeMismatch` if `key` is not of the index's type.
    pub fn search(&self, key: &Key) -> Result<Option<BlockId>> {
        self.check_type(key)?;
        let (leaf_id, _) = self.descend(key, InternalNode::search_slot)?;
        Ok(self.leaf(leaf_id).contains(key)?.then_some(leaf_id))
    }

    /// Every data block id stored under `key`, in insertion order.
    pub fn lookup(&self, key: &Key) -> Result<Vec<BlockId>> {
        let entries = self.range(key.clone()..=key.clone())?;
        Ok(entries.into_iter().map(|(_, data_block_id)| data_block_id).collect())
    }

    /// All entries with keys in `range`, in key order.
    ///
    /// Starts at the leftmost leaf that can hold the lower bound and then
    /// follows `next` links.
    ///
    /// # Example
    /// ```
    /// use blockidx::index::btree::{IndexFile, Key, KeyType};
    /// use blockidx::BlockId;
    ///
    /// let mut index = IndexFile::new(3, KeyType::Int64).unwrap();
    /// for k in 0..20i64 {
    ///     index.insert(&Key::from(k), BlockId::new(1)).unwrap();
    /// }
    /// let keys: Vec<Key> = index
    ///     .range(Key::from(5i64)..Key::from(8i64))
    ///     .unwrap()
    ///     .into_iter()
    ///     .map(|(k, _)| k)
    ///     .collect();
    /// assert_eq!(keys, vec![Key::from(5i64), Key::from(6i64), Key::from(7i64)]);
    /// ```
    pub fn range<R: RangeBounds<Key>>(&self, range: R) -> Result<Vec<(Key, BlockId)>> {
        let start = match range.start_bound() {
            Bound::Included(key) | Bound::Excluded(key) => {
                self.check_type(key)?;
                self.descend(key, InternalNode::lower_bound_slot)?.0
            }
            Bound::Unbounded => self.leftmost_leaf(),
        };

        let past_end = |key: &Key| match range.end_bound() {
            Bound::Included(end) => key > end,
            Bound::Excluded(end) => key >= end,
            Bound::Unbounded => false,
        };

        let mut out = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            let leaf = self.leaf(id);
            for (key, data_block_id) in leaf.entries()? {
                if past_end(&key) {
                    return Ok(out);
                }
                if range.contains(&key) {
                    out.push((key, data_block_id));
                }
            }
            current = leaf.next();
        }
        Ok(out)
    }

    /// Every entry in key order.
    pub fn entries(&self) -> Result<Vec<(Key, BlockId)>> {
        self.range(..)
    }

    // ========================================================================
    // Public API: Introspection
    // ========================================================================

    /// Keys of every node in level order, starting at the root.
    ///
    /// Internal nodes contribute their separators, leaves their entries.
    pub fn breadth_first_traversal(&self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        for level in self.bfs_levels()? {
            for node_keys in level {
                keys.extend(node_keys);
            }
        }
        Ok(keys)
    }

    /// Keys grouped by level, then by node, left to right.
    pub fn bfs_levels(&self) -> Result<Vec<Vec<Vec<Key>>>> {
        let mut levels: Vec<Vec<Vec<Key>>> = Vec::new();
        let mut queue = VecDeque::from([(self.root_id(), 0usize)]);

        while let Some((id, depth)) = queue.pop_front() {
            let node = self.node_at(id);
            if levels.len() <= depth {
                levels.push(Vec::new());
            }
            levels[depth].push(node.keys()?);

            if let Node::Internal(internal) = node {
                queue.extend(internal.children().into_iter().map(|child| (child, depth + 1)));
            }
        }
        Ok(levels)
    }

    /// Check every structural invariant of the tree.
    ///
    /// Verifies node occupancy, key order within nodes and against the
    /// separators above them, uniform leaf depth, the leaf chain in both
    /// directions, and the in-memory parent links.
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let root = self.root_id();
        if root.is_metadata() || root.index() >= self.blocks.len() {
            return Err(violation(format!("root {} is out of range", root)));
        }
        if self.meta().order() != self.config.order {
            return Err(violation(format!(
                "metadata order {} differs from {}",
                self.meta().order(),
                self.config.order
            )));
        }

        let mut walk = Walk::default();
        self.validate_node(root, None, None, None, 0, &mut walk)?;

        // The leaf chain must visit exactly the leaves found top-down.
        let mut prev = None;
        let mut current = walk.leaves.first().copied();
        let mut chained = Vec::new();
        while let Some(id) = current {
            if chained.len() > walk.leaves.len() {
                return Err(violation("leaf chain does not terminate".into()));
            }
            let leaf = self
                .node(id)
                .and_then(Node::as_leaf)
                .ok_or_else(|| violation(format!("leaf chain reaches non-leaf {}", id)))?;
            if leaf.prev() != prev {
                return Err(violation(format!("{} has prev {:?}, expected {:?}", id, leaf.prev(), prev)));
            }
            chained.push(id);
            prev = Some(id);
            current = leaf.next();
        }
        if chained != walk.leaves {
            return Err(violation("leaf chain order differs from tree order".into()));
        }

        // Keys along the chain must be globally ordered.
        let keys: Vec<Key> = self.entries()?.into_iter().map(|(key, _)| key).collect();
        if keys.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(violation("leaf chain keys are out of order".into()));
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Persistence
    // ========================================================================

    /// Write every block to `dm`, padded to full pages, then sync.
    ///
    /// `dm` must be empty or hold an earlier save of this same index; a
    /// file with more blocks than the index is rejected.
    pub fn save(&self, dm: &mut DiskManager) -> Result<()> {
        dm.write_blocks(self.blocks.iter().map(Node::block))?;

        debug!(blocks = self.blocks.len(), root = %self.root_id(), "saved index");
        Ok(())
    }

    /// Save to the file at `path`, creating it if needed.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut dm = DiskManager::open_or_create(path)?;
        self.save(&mut dm)
    }

    /// Rebuild an index from the blocks in `dm`.
    ///
    /// Node kinds are not stored, so they are recovered from the tree's
    /// shape: the leftmost path from the root ends at a leaf whose `prev`
    /// link is 0, while every internal node has a non-zero free cursor at
    /// the same offset. That fixes the tree height; blocks above it are
    /// internal nodes and blocks at it are leaves. Parent links are rebuilt
    /// in the same top-down pass.
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` if the blocks do not form a
    /// valid tree, plus any I/O error.
    pub fn load(dm: &mut DiskManager, key_type: KeyType) -> Result<Self> {
        let count = dm.block_count();
        if count < 2 {
            return Err(violation(format!("index file holds only {} blocks", count)));
        }

        let mut raw: Vec<Option<Block>> = dm.read_blocks()?.into_iter().map(Some).collect();
        if raw.len() != count {
            return Err(violation(format!("read {} of {} blocks", raw.len(), count)));
        }

        let meta = match raw[0].take() {
            Some(block) => MetaNode::from_block(block),
            None => return Err(violation("missing metadata block".into())),
        };
        let config = IndexConfig::new(meta.order(), key_type);
        config.validate()?;

        let root = meta.root();
        let in_range = |id: BlockId| !id.is_metadata() && id.index() < count;
        if !in_range(root) {
            return Err(violation(format!("root {} is out of range", root)));
        }

        // Leaf depth from the leftmost path.
        let mut leaf_depth = 0;
        let mut current = root;
        loop {
            let block = raw[current.index()]
                .as_ref()
                .ok_or_else(|| violation(format!("{} visited twice", current)))?;
            if block.read_u16(2) == 0 {
                break;
            }
            current = BlockId::new(block.read_u16(4));
            leaf_depth += 1;
            if !in_range(current) || leaf_depth >= count {
                return Err(violation("leftmost path does not reach a leaf".into()));
            }
        }

        let mut nodes: Vec<Option<Node>> = (0..count).map(|_| None).collect();
        let mut queue = VecDeque::from([(root, None, 0usize)]);
        while let Some((id, parent, depth)) = queue.pop_front() {
            let block = raw[id.index()]
                .take()
                .ok_or_else(|| violation(format!("{} is reachable twice", id)))?;

            let mut node = if depth < leaf_depth {
                let internal = InternalNode::from_block(block, key_type);
                for child in internal.children() {
                    if !in_range(child) {
                        return Err(violation(format!("{} has child {} out of range", id, child)));
                    }
                    queue.push_back((child, Some(id), depth + 1));
                }
                Node::Internal(internal)
            } else {
                Node::Leaf(LeafNode::from_block(block, key_type))
            };
            node.set_parent(parent);
            nodes[id.index()] = Some(node);
        }

        let mut blocks = Vec::with_capacity(count);
        blocks.push(Node::Meta(meta));
        for (i, node) in nodes.into_iter().enumerate().skip(1) {
            match node {
                Some(node) => blocks.push(node),
                None => return Err(violation(format!("block {} is unreachable", i))),
            }
        }

        let index = Self { config, blocks };
        index.validate()?;

        debug!(blocks = count, height = leaf_depth + 1, "loaded index");
        Ok(index)
    }

    /// Load the index stored at `path`.
    pub fn open<P: AsRef<Path>>(path: P, key_type: KeyType) -> Result<Self> {
        let mut dm = DiskManager::open(path)?;
        Self::load(&mut dm, key_type)
    }

    // ========================================================================
    // Internal: Splitting
    // ========================================================================

    /// Split a full leaf while inserting `(key, data_block_id)`.
    ///
    /// Returns the separator to copy up and the new right leaf.
    fn split_leaf(&mut self, leaf_id: BlockId, key: &Key, data_block_id: BlockId) -> Result<(Key, BlockId)> {
        let key_type = self.key_type();
        let mid = split_point(self.order());

        let leaf = self.leaf(leaf_id);
        let mut entries = leaf.entries()?;
        let pos = entries.partition_point(|(k, _)| k <= key);
        entries.insert(pos, (key.clone(), data_block_id));
        let old_next = leaf.next();
        let parent = leaf.parent();

        let mut right = LeafNode::new(key_type);
        for (k, d) in &entries[mid..] {
            right.insert(k, *d)?;
        }
        right.set_prev(Some(leaf_id));
        right.set_next(old_next);
        right.set_parent(parent);
        let right_id = self.append_node(Node::Leaf(right));

        let left = self.leaf_mut(leaf_id);
        if pos < mid {
            left.remove_all_from(mid - 1);
            left.insert(key, data_block_id)?;
        } else {
            left.remove_all_from(mid);
        }
        left.set_next(Some(right_id));

        if let Some(next_id) = old_next {
            self.leaf_mut(next_id).set_prev(Some(right_id));
        }

        let separator = entries.swap_remove(mid).0;
        debug!(left = %leaf_id, right = %right_id, separator = %separator, "split leaf");
        Ok((separator, right_id))
    }

    /// Split a full internal node while inserting `key` as separator `slot`
    /// with `right_child` to its right.
    ///
    /// Returns the separator to move up and the new right node.
    fn split_internal(
        &mut self,
        node_id: BlockId,
        slot: usize,
        key: &Key,
        right_child: BlockId,
    ) -> Result<(Key, BlockId)> {
        let key_type = self.key_type();
        let mid = split_point(self.order());

        let node = self.internal(node_id);
        let mut keys = node.keys()?;
        let mut children = node.children();
        keys.insert(slot, key.clone());
        children.insert(slot + 1, right_child);
        let parent = node.parent();

        let mut right = InternalNode::new(key_type, &keys[mid + 1], children[mid + 1], children[mid + 2])?;
        for (i, (key, &child)) in keys[mid + 2..].iter().zip(&children[mid + 3..]).enumerate() {
            right.insert_at(i + 1, key, child)?;
        }
        right.set_parent(parent);
        let right_id = self.append_node(Node::Internal(right));

        for &child in &children[mid + 1..] {
            self.set_parent(child, Some(right_id));
        }

        let left = self.internal_mut(node_id);
        if slot < mid {
            left.remove_all_from(mid - 1);
            left.insert_at(slot, key, right_child)?;
        } else {
            left.remove_all_from(mid);
        }

        let separator = keys.swap_remove(mid);
        debug!(left = %node_id, right = %right_id, separator = %separator, "split internal");
        Ok((separator, right_id))
    }

    /// Insert `separator` between `left_id` and `right_id` into the nearest
    /// ancestor, splitting full ancestors on the way up.
    ///
    /// Each ancestor comes with the slot of the child that was descended
    /// into; the new sibling always lands directly right of the node it
    /// split from, even among equal separators.
    fn promote(
        &mut self,
        mut left_id: BlockId,
        mut separator: Key,
        mut right_id: BlockId,
        mut ancestors: Vec<(BlockId, usize)>,
    ) -> Result<()> {
        loop {
            let Some((parent_id, slot)) = ancestors.pop() else {
                return self.grow_root(left_id, &separator, right_id);
            };

            self.set_parent(right_id, Some(parent_id));
            if !self.is_full(parent_id) {
                return self.internal_mut(parent_id).insert_at(slot, &separator, right_id);
            }

            let (promoted, sibling_id) = self.split_internal(parent_id, slot, &separator, right_id)?;
            left_id = parent_id;
            separator = promoted;
            right_id = sibling_id;
        }
    }

    /// Put a new root above the two halves of a split root.
    fn grow_root(&mut self, left_id: BlockId, separator: &Key, right_id: BlockId) -> Result<()> {
        let root = InternalNode::new(self.key_type(), separator, left_id, right_id)?;
        let root_id = self.append_node(Node::Internal(root));

        self.set_parent(left_id, Some(root_id));
        self.set_parent(right_id, Some(root_id));
        self.meta_mut().set_root(root_id);

        debug!(root = %root_id, height = self.height(), "grew new root");
        Ok(())
    }

    // ========================================================================
    // Internal: Navigation
    // ========================================================================

    /// Walk from the root to a leaf, choosing children with `pick`.
    ///
    /// Returns the leaf and the internal nodes above it, root first, each
    /// paired with the slot of the child taken.
    fn descend(
        &self,
        key: &Key,
        pick: fn(&InternalNode, &Key) -> Result<(usize, BlockId)>,
    ) -> Result<(BlockId, Vec<(BlockId, usize)>)> {
        let mut ancestors = Vec::new();
        let mut current = self.root_id();
        loop {
            match self.node_at(current) {
                Node::Leaf(_) => return Ok((current, ancestors)),
                Node::Internal(internal) => {
                    let (slot, child) = pick(internal, key)?;
                    ancestors.push((current, slot));
                    current = child;
                }
                Node::Meta(_) => panic!("descended into the metadata block"),
            }
        }
    }

    fn edge_leaf(&self, pick: fn(&[BlockId]) -> BlockId) -> BlockId {
        let mut current = self.root_id();
        while let Node::Internal(internal) = self.node_at(current) {
            current = pick(&internal.children());
        }
        current
    }

    fn validate_node(
        &self,
        id: BlockId,
        parent: Option<BlockId>,
        lower: Option<&Key>,
        upper: Option<&Key>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        if id.is_metadata() || id.index() >= self.blocks.len() {
            return Err(violation(format!("child {} is out of range", id)));
        }
        walk.visited += 1;
        if walk.visited > self.blocks.len() {
            return Err(violation("tree contains a cycle".into()));
        }

        let node = self.node_at(id);
        if node.parent() != parent {
            return Err(violation(format!("{} has parent {:?}, expected {:?}", id, node.parent(), parent)));
        }

        let keys = node.keys()?;
        let is_root = parent.is_none();
        let max = self.config.max_keys();
        let min = if is_root {
            usize::from(!node.is_leaf())
        } else {
            min_keys(self.order())
        };
        if keys.len() < min || keys.len() > max {
            return Err(violation(format!("{} holds {} keys, allowed {}..={}", id, keys.len(), min, max)));
        }
        if keys.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(violation(format!("{} keys are out of order", id)));
        }
        let below = lower.is_some_and(|lo| keys.first().is_some_and(|k| k < lo));
        let above = upper.is_some_and(|hi| keys.last().is_some_and(|k| k > hi));
        if below || above {
            return Err(violation(format!("{} keys escape their separators", id)));
        }

        match node {
            Node::Leaf(_) => {
                match walk.leaf_depth {
                    Some(d) if d != depth => {
                        return Err(violation(format!("{} is at depth {}, other leaves at {}", id, depth, d)));
                    }
                    _ => walk.leaf_depth = Some(depth),
                }
                walk.leaves.push(id);
            }
            Node::Internal(internal) => {
                let children = internal.children();
                for (i, &child) in children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { Some(&keys[i - 1]) };
                    let hi = if i == keys.len() { upper } else { Some(&keys[i]) };
                    self.validate_node(child, Some(id), lo, hi, depth + 1, walk)?;
                }
            }
            Node::Meta(_) => return Err(violation(format!("{} is the metadata block", id))),
        }
        Ok(())
    }

    // ========================================================================
    // Internal: Block access
    // ========================================================================

    fn check_type(&self, key: &Key) -> Result<()> {
        if key.key_type() != self.key_type() {
            return Err(Error::KeyTypeMismatch {
                expected: self.key_type(),
                actual: key.key_type(),
            });
        }
        Ok(())
    }

    fn is_full(&self, block_id: BlockId) -> bool {
        self.node_at(block_id).num_keys() >= self.config.max_keys()
    }

    /// Append a node; callers check capacity before mutating anything.
    fn append_node(&mut self, node: Node) -> BlockId {
        assert!(self.blocks.len() < MAX_BLOCKS, "index file is out of block ids");
        let block_id = BlockId::new(self.blocks.len() as u16);
        self.blocks.push(node);
        block_id
    }

    fn set_parent(&mut self, block_id: BlockId, parent: Option<BlockId>) {
        self.blocks[block_id.index()].set_parent(parent);
    }

    fn node_at(&self, block_id: BlockId) -> &Node {
        &self.blocks[block_id.index()]
    }

    fn meta(&self) -> &MetaNode {
        match &self.blocks[0] {
            Node::Meta(meta) => meta,
            other => panic!("block 0 is a {:?} node", other.kind()),
        }
    }

    fn meta_mut(&mut self) -> &mut MetaNode {
        match &mut self.blocks[0] {
            Node::Meta(meta) => meta,
            other => panic!("block 0 is a {:?} node", other.kind()),
        }
    }

    fn leaf(&self, block_id: BlockId) -> &LeafNode {
        match self.node_at(block_id) {
            Node::Leaf(leaf) => leaf,
            other => panic!("{} is a {:?} node, expected a leaf", block_id, other.kind()),
        }
    }

    fn leaf_mut(&mut self, block_id: BlockId) -> &mut LeafNode {
        match &mut self.blocks[block_id.index()] {
            Node::Leaf(leaf) => leaf,
            other => panic!("{} is a {:?} node, expected a leaf", block_id, other.kind()),
        }
    }

    fn internal(&self, block_id: BlockId) -> &InternalNode {
        match self.node_at(block_id) {
            Node::Internal(internal) => internal,
            other => panic!("{} is a {:?} node, expected internal", block_id, other.kind()),
        }
    }

    fn internal_mut(&mut self, block_id: BlockId) -> &mut InternalNode {
        match &mut self.blocks[block_id.index()] {
            Node::Internal(internal) => internal,
            other => panic!("{} is a {:?} node, expected internal", block_id, other.kind()),
        }
    }
}

/// Prints one line per level, nodes separated by `|`.
impl fmt::Display for IndexFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = self.bfs_levels().map_err(|_| fmt::Error)?;
        for level in levels {
            let nodes: Vec<String> = level
                .iter()
                .map(|keys| keys.iter().map(Key::to_string).collect::<Vec<_>>().join(" "))
                .collect();
            writeln!(f, "{}", nodes.join(" | "))?;
        }
        Ok(())
    }
}

/// State gathered while validating top-down.
#[derive(Default)]
struct Walk {
    visited: usize,
    leaf_depth: Option<usize>,
    leaves: Vec<BlockId>,
}

/// Index of the first key that moves right: `ceil((order + 1) / 2) - 1`.
#[inline]
fn split_point(order: u16) -> usize {
    usize::from(order + 1).div_ceil(2) - 1
}

/// Fewest keys a non-root node may hold: `ceil(order / 2) - 1`.
#[inline]
fn min_keys(order: u16) -> usize {
    usize::from(order).div_ceil(2) - 1
}

fn violation(message: String) -> Error {
    Error::InvariantViolation(message)
}

// ============================================================================
// TESTS
// ============================================================================
