//! An intrusive ordered dictionary.
//!
//! Implemented as a red-black tree in the CLR style, with a few extensions:
//!
//! - a red root node is allowed, which keeps `join` and `split` simple,
//! - the black height is stored in each node's status word, so it is
//!   available in O(1),
//! - an augmentation callback reports every structural event so auxiliary
//!   subtree data can be maintained,
//! - `join3`, `join2` and `split` provide O(log n) bulk restructuring,
//! - `insert_at` inserts relative to a known neighbour without invoking a
//!   comparator.
//!
//! The tree is intrusive: each element embeds a [`Node`] link cell and the
//! caller's storage implements [`Forest`] to resolve an id to its cell.
//! One storage type can host several independent link kinds by implementing
//! `Forest` for several id types. The functions here are free functions
//! taking the storage, a root slot, and comparator closures; they never
//! allocate.

use std::cmp::Ordering;

const RED: u32 = 1;

/// The link cell embedded in every tree element.
///
/// The status word packs the colour in bit 0 and twice the black height in
/// the remaining bits; a node outside any tree is black with height zero.
#[derive(Copy, Clone, Debug)]
pub struct Node<I> {
    parent: Option<I>,
    child: [Option<I>; 2],
    stat: u32,
}

impl<I: Copy + PartialEq> Node<I> {
    pub fn new() -> Self {
        Node {
            parent: None,
            child: [None, None],
            stat: 0,
        }
    }

    /// Whether this node is linked into a tree of more than one element.
    ///
    /// A lone root is not distinguishable from a detached node; roots are
    /// tracked by the caller's root slot.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.parent.is_some() || self.child[0].is_some() || self.child[1].is_some()
    }

    /// The parent link. Augmentation callbacks use this to walk upward.
    #[inline]
    pub fn parent(&self) -> Option<I> {
        self.parent
    }

    /// Child 0 (left) or child 1 (right). Augmentation callbacks use this
    /// to recompute subtree aggregates.
    #[inline]
    pub fn child(&self, i: usize) -> Option<I> {
        self.child[i]
    }

    #[inline]
    fn clear(&mut self) {
        *self = Node::new();
    }
}

impl<I: Copy + PartialEq> Default for Node<I> {
    fn default() -> Self {
        Node::new()
    }
}

/// Resolves ids to their embedded link cells.
pub trait Forest<I: Copy + PartialEq> {
    fn node(&self, id: I) -> &Node<I>;
    fn node_mut(&mut self, id: I) -> &mut Node<I>;
}

/// What to do when a key compares equal to existing entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Find some equal element; insertion returns it instead of inserting.
    Any,
    /// Find the left-most equal element.
    First,
    /// Find the right-most equal element.
    Last,
    /// Walk to the gap left of all equal elements; insertion inserts there.
    FirstOrGap,
    /// Walk to the gap right of all equal elements; insertion inserts there.
    LastOrGap,
}

impl DuplicatePolicy {
    #[inline]
    fn on_equal(self) -> i32 {
        match self {
            DuplicatePolicy::Any => 0,
            DuplicatePolicy::First => -2,
            DuplicatePolicy::Last => 2,
            DuplicatePolicy::FirstOrGap => -1,
            DuplicatePolicy::LastOrGap => 1,
        }
    }
}

/// A structural event reported to an [`Augment`] callback.
///
/// Rotations pass the new parent as `main` and the old parent (now a child)
/// as `aux`. `Nop`/`Nop2` are walk-up notifications without a structural
/// change; `Fini` marks the top of the rebalanced path so the augmentation
/// can finish propagating towards the root. `Add` fires after a leaf is
/// attached, `CutSwap` before a two-child removal swaps with its successor,
/// `CutLeaf` after a leaf or half-leaf is unlinked (`main` is its former
/// parent), `Join` after `join3` attaches its middle node, and `Split`
/// before a node is dissolved into two subtrees plus itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AugmentEvent {
    RotateLeft,
    RotateRight,
    Nop,
    Nop2,
    Fini,
    Add,
    CutSwap,
    CutLeaf,
    Join,
    Split,
}

/// Augmentation callback invoked on every structural event.
pub trait Augment<S, I: Copy + PartialEq> {
    fn event(&mut self, store: &mut S, main: I, aux: Option<I>, event: AugmentEvent);
}

/// The augmentation callback that does nothing.
pub struct NoAugment;

impl<S, I: Copy + PartialEq> Augment<S, I> for NoAugment {
    #[inline]
    fn event(&mut self, _: &mut S, _: I, _: Option<I>, _: AugmentEvent) {}
}

/// A position in the tree, as returned by [`find_ref`].
///
/// Describes where a key would be inserted: as child `child` of `parent`,
/// or at the tree's extremum when `parent` is `None` (`child == 1` means
/// new minimum, `child == 0` new maximum). `path` records whether the
/// search ever stepped left (bit 0), right (bit 1) or found an equal
/// element (bit 2), which is enough to update cached extrema in O(1).
#[derive(Copy, Clone, Debug)]
pub struct Ref<I> {
    pub parent: Option<I>,
    pub child: usize,
    pub path: u32,
}

impl<I> Ref<I> {
    /// Whether a node inserted at this position becomes the minimum.
    #[inline]
    pub fn is_min(&self) -> bool {
        self.path & 6 == 0
    }

    /// Whether a node inserted at this position becomes the maximum.
    #[inline]
    pub fn is_max(&self) -> bool {
        self.path & 5 == 0
    }
}

// -- status word helpers --------------------------------------------------

#[inline]
fn height2<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: Option<I>) -> u32 {
    match n {
        None => 0,
        Some(n) => s.node(n).stat & !RED,
    }
}

#[inline]
fn is_red<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: Option<I>) -> bool {
    match n {
        None => false,
        Some(n) => s.node(n).stat & RED != 0,
    }
}

#[inline]
fn red_id<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: I) -> bool {
    s.node(n).stat & RED != 0
}

#[inline]
fn set_red<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    s.node_mut(n).stat |= RED;
}

#[inline]
fn set_black<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    s.node_mut(n).stat &= !RED;
}

/// Recolour a red node black, which raises its black height by one.
#[inline]
fn inc_set_black<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    debug_assert!(red_id(s, n));
    s.node_mut(n).stat += 1;
}

/// Recolour a black node red, which lowers its black height by one.
#[inline]
fn dec_set_red<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    debug_assert!(!red_id(s, n));
    s.node_mut(n).stat -= 1;
}

#[inline]
fn inc<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    s.node_mut(n).stat += 2;
}

#[inline]
fn dec<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    debug_assert!(s.node(n).stat >= 2);
    s.node_mut(n).stat -= 2;
}

#[inline]
fn set_red_leaf<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    s.node_mut(n).stat = RED;
}

#[inline]
fn set_red_same_depth<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I, level: Option<I>) {
    let h = height2(s, level);
    s.node_mut(n).stat = h | RED;
}

#[inline]
fn ensure_black<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    if red_id(s, n) {
        inc_set_black(s, n);
    }
}

#[inline]
fn inc_set_black_if_needed<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, n: I) {
    let node = s.node(n);
    if node.stat & RED != 0 && (is_red(s, node.child[0]) || is_red(s, node.child[1])) {
        inc_set_black(s, n);
    }
}

// -- structure helpers ----------------------------------------------------

/// The index of `child` in `parent`.
#[inline]
fn idx_of<S: Forest<I>, I: Copy + PartialEq>(s: &S, parent: I, child: I) -> usize {
    let p = s.node(parent);
    debug_assert!(p.child[0] == Some(child) || p.child[1] == Some(child));
    (p.child[1] == Some(child)) as usize
}

#[inline]
fn set_child_and_parent<S: Forest<I>, I: Copy + PartialEq>(
    s: &mut S,
    parent: I,
    i: usize,
    n: Option<I>,
) {
    s.node_mut(parent).child[i] = n;
    if let Some(n) = n {
        s.node_mut(n).parent = Some(parent);
    }
}

/// Replace child `i` of `r` by `e`, keeping the collapsed edge's colour.
#[inline]
fn collapse_edge<S: Forest<I>, I: Copy + PartialEq>(s: &mut S, r: I, i: usize, e: Option<I>) {
    if let Some(e) = e {
        if is_red(s, s.node(r).child[i]) {
            set_red(s, e);
        }
    }
    s.node_mut(r).child[i] = e;
}

#[inline]
fn augment<S, I: Copy + PartialEq, A: Augment<S, I>>(
    aug: &mut A,
    s: &mut S,
    main: Option<I>,
    aux: Option<I>,
    event: AugmentEvent,
) {
    if let Some(main) = main {
        aug.event(s, main, aux, event);
    }
}

// -- queries --------------------------------------------------------------

/// Whether `n` may be a member of the tree rooted at `root` (exact for
/// trees of more than one element, O(1)).
#[inline]
pub fn may_contain<S: Forest<I>, I: Copy + PartialEq>(s: &S, root: Option<I>, n: I) -> bool {
    root == Some(n) || s.node(n).is_linked()
}

/// The black height of a node, O(1). Debugging aid; do not build
/// algorithms on it.
#[inline]
pub fn black_height<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: Option<I>) -> u32 {
    height2(s, n) >> 1
}

/// Whether the node is red. Debugging aid.
#[inline]
pub fn node_is_red<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: I) -> bool {
    red_id(s, n)
}

/// First (`dir == 0`) or last (`dir == 1`) element of a tree.
pub fn start<S: Forest<I>, I: Copy + PartialEq>(s: &S, root: Option<I>, dir: usize) -> Option<I> {
    let mut p = None;
    let mut n = root;
    while let Some(c) = n {
        p = Some(c);
        n = s.node(c).child[dir];
    }
    p
}

/// The root of the tree containing `n`.
pub fn root_of<S: Forest<I>, I: Copy + PartialEq>(s: &S, mut n: I) -> I {
    while let Some(p) = s.node(n).parent {
        n = p;
    }
    n
}

/// One iteration step: forward for `dir == 0`, backward for `dir == 1`.
/// O(log n) worst case, O(1) amortised during iteration and O(1) on an
/// extremum.
pub fn step<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: I, dir: usize) -> Option<I> {
    if let Some(c) = s.node(n).child[1 - dir] {
        return start(s, Some(c), dir);
    }
    let mut n = n;
    let mut p = s.node(n).parent;
    while let Some(q) = p {
        if s.node(q).child[1 - dir] != Some(n) {
            break;
        }
        n = q;
        p = s.node(q).parent;
    }
    p
}

#[inline]
pub fn min<S: Forest<I>, I: Copy + PartialEq>(s: &S, root: Option<I>) -> Option<I> {
    start(s, root, 0)
}

#[inline]
pub fn max<S: Forest<I>, I: Copy + PartialEq>(s: &S, root: Option<I>) -> Option<I> {
    start(s, root, 1)
}

#[inline]
pub fn next<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: I) -> Option<I> {
    step(s, n, 0)
}

#[inline]
pub fn prev<S: Forest<I>, I: Copy + PartialEq>(s: &S, n: I) -> Option<I> {
    step(s, n, 1)
}

/// Find a node matching `key`.
///
/// With `Any`, some equal node; with `First`/`Last`, the outermost equal
/// node; with the `*OrGap` policies, always `None` (the gap is only
/// reachable through [`find_ref`]).
pub fn find<S, I, K, C>(
    s: &S,
    root: Option<I>,
    key: &K,
    cmp: &C,
    dup: DuplicatePolicy,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
{
    find_ref(s, root, key, cmp, dup).0
}

/// Find a node and the insertion position for `key`.
///
/// The position can be fed to [`insert_ref_aug`] to insert without
/// searching again.
pub fn find_ref<S, I, K, C>(
    s: &S,
    root: Option<I>,
    key: &K,
    cmp: &C,
    dup: DuplicatePolicy,
) -> (Option<I>, Ref<I>)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
{
    let on_equal = dup.on_equal();
    let mut i = 1usize;
    let mut path = 0u32;
    let mut equal = None;
    let mut n = root;
    let mut p = root;
    while let Some(c) = n {
        let mut d = match cmp(s, key, c) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        if d == 0 {
            equal = Some(c);
            d = on_equal;
        }
        if d == 0 {
            path |= 4;
            break;
        }
        p = n;
        i = (d > 0) as usize;
        path |= (i + 1) as u32;
        n = s.node(c).child[i];
    }
    let found = match dup {
        DuplicatePolicy::First | DuplicatePolicy::Last => equal,
        _ => n,
    };
    (
        found,
        Ref {
            parent: p,
            child: i,
            path,
        },
    )
}

// -- rotation and insert balancing ----------------------------------------

fn rotate<S, I, A>(s: &mut S, root: &mut Option<I>, dir: usize, x: I, aug: &mut A)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    let y = s.node(x).child[1 - dir].expect("rotation without inner child");
    let yc = s.node(y).child[dir];
    s.node_mut(x).child[1 - dir] = yc;
    if let Some(yc) = yc {
        s.node_mut(yc).parent = Some(x);
    }
    let xp = s.node(x).parent;
    s.node_mut(y).parent = xp;
    match xp {
        None => *root = Some(y),
        Some(p) => {
            let i = idx_of(s, p, x);
            s.node_mut(p).child[i] = Some(y);
        }
    }
    s.node_mut(y).child[dir] = Some(x);
    s.node_mut(x).parent = Some(y);
    let ev = if dir == 0 {
        AugmentEvent::RotateLeft
    } else {
        AugmentEvent::RotateRight
    };
    aug.event(s, y, Some(x), ev);
}

fn balance_insert<S, I, A>(s: &mut S, root: &mut Option<I>, mut x: I, aug: &mut A)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    loop {
        let p = match s.node(x).parent {
            Some(p) => p,
            None => break,
        };
        // A red root is allowed, so stop below it.
        if s.node(p).parent.is_none() || !red_id(s, p) {
            break;
        }
        debug_assert!(red_id(s, x));
        let g = s.node(p).parent.expect("red node without grandparent");
        let side = idx_of(s, g, p);
        let uncle = s.node(g).child[1 - side];
        if is_red(s, uncle) {
            inc_set_black(s, p);
            inc_set_black(s, uncle.expect("red uncle"));
            set_red(s, g);
            aug.event(s, p, Some(x), AugmentEvent::Nop2);
            x = g;
        } else {
            if s.node(p).child[1 - side] == Some(x) {
                x = p;
                rotate(s, root, side, x, aug);
            }
            let p2 = s.node(x).parent.expect("unrooted rotation child");
            inc_set_black(s, p2);
            let g2 = s.node(p2).parent.expect("missing grandparent");
            if !red_id(s, g2) {
                dec_set_red(s, g2);
            }
            rotate(s, root, 1 - side, g2, aug);
            x = s.node(x).parent.expect("unrooted rotation child");
            debug_assert!(!red_id(s, x));
            break;
        }
    }
    let px = s.node(x).parent;
    augment(aug, s, px, Some(x), AugmentEvent::Fini);
}

// -- insertion ------------------------------------------------------------

/// Insert `node` at a position previously produced by [`find_ref`] (or
/// assembled by hand), then rebalance.
pub fn insert_ref_aug<S, I, A>(s: &mut S, node: I, at: &Ref<I>, root: &mut Option<I>, aug: &mut A)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    debug_assert!(!s.node(node).is_linked());
    debug_assert!(!red_id(s, node));

    let mut p = at.parent;
    let mut i = at.child;

    // A None parent addresses the extremum: child 1 inserts a new
    // minimum, child 0 a new maximum.
    if p.is_none() {
        i = 1 - i;
        p = start(s, *root, i);
    }

    let (p, i) = match p {
        None => {
            // Empty tree.
            *root = Some(node);
            set_red_leaf(s, node);
            return;
        }
        Some(p) => {
            if s.node(p).child[i].is_some() {
                // The slot is taken; the free slot faces it from the
                // neighbour in the insertion direction.
                let i = 1 - i;
                let p = step(s, p, i).expect("inner node without neighbour");
                (p, i)
            } else {
                (p, i)
            }
        }
    };

    debug_assert!(s.node(p).child[i].is_none());
    s.node_mut(node).parent = Some(p);
    s.node_mut(p).child[i] = Some(node);
    set_red_leaf(s, node);
    aug.event(s, node, None, AugmentEvent::Add);

    balance_insert(s, root, node, aug);
    if let Some(r) = *root {
        ensure_black(s, r);
    }
}

/// Insert `node` with a separate search key, maintaining optional cached
/// extrema in O(1). Returns an existing equal node (without inserting)
/// when the policy is `Any`.
pub fn insert_update_by_aug<S, I, K, C, A>(
    s: &mut S,
    node: I,
    key: &K,
    root: &mut Option<I>,
    min_slot: Option<&mut Option<I>>,
    max_slot: Option<&mut Option<I>>,
    cmp: &C,
    dup: DuplicatePolicy,
    aug: &mut A,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
    A: Augment<S, I>,
{
    debug_assert!(!s.node(node).is_linked());
    let (found, at) = find_ref(s, *root, key, cmp, dup);
    if let Some(found) = found {
        return Some(found);
    }
    if let Some(max_slot) = max_slot {
        if at.is_max() {
            *max_slot = Some(node);
        }
    }
    if let Some(min_slot) = min_slot {
        if at.is_min() {
            *min_slot = Some(node);
        }
    }
    insert_ref_aug(s, node, &at, root, aug);
    None
}

/// [`insert_update_by_aug`] without cached extrema.
pub fn insert_by_aug<S, I, K, C, A>(
    s: &mut S,
    node: I,
    key: &K,
    root: &mut Option<I>,
    cmp: &C,
    dup: DuplicatePolicy,
    aug: &mut A,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
    A: Augment<S, I>,
{
    insert_update_by_aug(s, node, key, root, None, None, cmp, dup, aug)
}

/// Insert `node`, keyed by itself.
pub fn insert_aug<S, I, C, A>(
    s: &mut S,
    node: I,
    root: &mut Option<I>,
    cmp: &C,
    dup: DuplicatePolicy,
    aug: &mut A,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &I, I) -> Ordering,
    A: Augment<S, I>,
{
    insert_update_by_aug(s, node, &node.clone(), root, None, None, cmp, dup, aug)
}

/// Insert `node`, keyed by itself, maintaining cached extrema.
pub fn insert_update_aug<S, I, C, A>(
    s: &mut S,
    node: I,
    root: &mut Option<I>,
    min_slot: Option<&mut Option<I>>,
    max_slot: Option<&mut Option<I>>,
    cmp: &C,
    dup: DuplicatePolicy,
    aug: &mut A,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &I, I) -> Ordering,
    A: Augment<S, I>,
{
    insert_update_by_aug(s, node, &node.clone(), root, min_slot, max_slot, cmp, dup, aug)
}

/// Insert immediately before (`dir == 0`) or after (`dir == 1`) a known
/// node, without a comparator, maintaining optional cached extrema.
///
/// With `pos == None` the insertion lands at the tree's end selected by
/// `dir`: before-nothing appends a new maximum, after-nothing a new
/// minimum.
pub fn insert_update_at_aug<S, I, A>(
    s: &mut S,
    node: I,
    pos: Option<I>,
    dir: usize,
    root: &mut Option<I>,
    min_slot: Option<&mut Option<I>>,
    max_slot: Option<&mut Option<I>>,
    aug: &mut A,
) where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    debug_assert!(!s.node(node).is_linked());
    if let Some(max_slot) = max_slot {
        if max_slot.is_none() || (*max_slot == pos && dir == 1) {
            *max_slot = Some(node);
        }
    }
    if let Some(min_slot) = min_slot {
        if min_slot.is_none() || (*min_slot == pos && dir == 0) {
            *min_slot = Some(node);
        }
    }
    let at = Ref {
        parent: pos,
        child: dir,
        path: 0,
    };
    insert_ref_aug(s, node, &at, root, aug);
}

/// [`insert_update_at_aug`] without cached extrema.
pub fn insert_at_aug<S, I, A>(
    s: &mut S,
    node: I,
    pos: Option<I>,
    dir: usize,
    root: &mut Option<I>,
    aug: &mut A,
) where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    insert_update_at_aug(s, node, pos, dir, root, None, None, aug)
}

/// [`insert_at_aug`] without augmentation.
pub fn insert_at<S, I>(s: &mut S, node: I, pos: Option<I>, dir: usize, root: &mut Option<I>)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    insert_at_aug(s, node, pos, dir, root, &mut NoAugment)
}

/// [`insert_by_aug`] without augmentation.
pub fn insert_by<S, I, K, C>(
    s: &mut S,
    node: I,
    key: &K,
    root: &mut Option<I>,
    cmp: &C,
    dup: DuplicatePolicy,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
{
    insert_by_aug(s, node, key, root, cmp, dup, &mut NoAugment)
}

/// [`insert_aug`] without augmentation.
pub fn insert<S, I, C>(
    s: &mut S,
    node: I,
    root: &mut Option<I>,
    cmp: &C,
    dup: DuplicatePolicy,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &I, I) -> Ordering,
{
    insert_aug(s, node, root, cmp, dup, &mut NoAugment)
}

/// [`insert_update_aug`] without augmentation.
pub fn insert_update<S, I, C>(
    s: &mut S,
    node: I,
    root: &mut Option<I>,
    min_slot: Option<&mut Option<I>>,
    max_slot: Option<&mut Option<I>>,
    cmp: &C,
    dup: DuplicatePolicy,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &I, I) -> Ordering,
{
    insert_update_aug(s, node, root, min_slot, max_slot, cmp, dup, &mut NoAugment)
}

// -- removal --------------------------------------------------------------

fn balance_remove<S, I, A>(s: &mut S, root: &mut Option<I>, p: I, i: usize, aug: &mut A)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    let mut p_opt = Some(p);
    let mut i = i;
    let mut x = s.node(p).child[i];
    loop {
        if is_red(s, x) {
            break;
        }
        let p = match p_opt {
            Some(p) => p,
            None => break,
        };

        let mut w = s.node(p).child[1 - i];
        if is_red(s, w) {
            let wr = w.expect("red sibling");
            inc_set_black(s, wr);
            dec_set_red(s, p);
            rotate(s, root, i, p, aug);
            w = s.node(p).child[1 - i];
        }

        if let Some(mut w) = w {
            debug_assert!(!red_id(s, w));
            let near = s.node(w).child[i];
            let far = s.node(w).child[1 - i];
            if !is_red(s, far) && !is_red(s, near) {
                // Both nephews black: push the deficit up.
                dec_set_red(s, w);
                dec(s, p);
            } else {
                if !is_red(s, s.node(w).child[1 - i]) {
                    let near = s.node(w).child[i].expect("red near nephew");
                    inc_set_black(s, near);
                    dec_set_red(s, w);
                    rotate(s, root, 1 - i, w, aug);
                    w = s.node(p).child[1 - i].expect("sibling after rotation");
                }
                if red_id(s, p) {
                    set_red(s, w);
                    set_black(s, p);
                } else {
                    inc(s, w);
                    dec(s, p);
                }
                let far = s.node(w).child[1 - i].expect("red far nephew");
                inc_set_black(s, far);
                rotate(s, root, i, p, aug);
                aug.event(s, w, Some(p), AugmentEvent::Fini);
                return;
            }
        }

        aug.event(s, p, x, AugmentEvent::Nop);
        x = Some(p);
        match s.node(p).parent {
            None => {
                p_opt = None;
                break;
            }
            Some(q) => {
                i = idx_of(s, q, p);
                p_opt = Some(q);
            }
        }
    }

    augment(aug, s, p_opt, x, AugmentEvent::Fini);

    if is_red(s, x) {
        inc_set_black(s, x.expect("red node"));
    }
}

/// Remove a node from the tree, updating the root slot.
pub fn remove_aug<S, I, A>(s: &mut S, c: I, root: &mut Option<I>, aug: &mut A)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    debug_assert!(may_contain(s, *root, c));

    let father: Option<I>;
    let cut_index: Option<usize>;
    let removed_red: bool;

    if s.node(c).child[0].is_some() && s.node(c).child[1].is_some() {
        // Two children: swap with the in-order successor, which is a node
        // without a left subtree, then cut that node's old position.
        let d = next(s, c).expect("two-child node without successor");
        aug.event(s, c, Some(d), AugmentEvent::CutSwap);
        debug_assert!(s.node(d).child[0].is_none());

        let e = s.node(d).child[1];
        let mut f = s.node(d).parent;
        removed_red = red_id(s, d);

        // The successor takes over c's links and colour wholesale.
        let content = *s.node(c);
        *s.node_mut(d) = content;

        // When c was the successor's parent, the cut happens below the
        // successor's own new position.
        let i = (f == Some(c)) as usize;
        if i == 1 {
            f = Some(d);
        }
        let f = f.expect("successor without parent");

        collapse_edge(s, f, i, e);
        if let Some(e) = e {
            s.node_mut(e).parent = Some(f);
        }

        // Buddy pointers around the moved successor.
        if let Some(dp) = s.node(d).parent {
            let side = idx_of(s, dp, c);
            s.node_mut(dp).child[side] = Some(d);
        }
        if let Some(ch) = s.node(d).child[0] {
            s.node_mut(ch).parent = Some(d);
        }
        if let Some(ch) = s.node(d).child[1] {
            s.node_mut(ch).parent = Some(d);
        }
        if *root == Some(c) {
            *root = Some(d);
        }

        father = Some(f);
        cut_index = Some(i);
    } else {
        removed_red = red_id(s, c);
        let b = match s.node(c).child[0] {
            Some(b) => Some(b),
            None => s.node(c).child[1],
        };
        let p = s.node(c).parent;
        if let Some(b) = b {
            s.node_mut(b).parent = p;
        }
        match p {
            None => {
                father = b;
                cut_index = None;
            }
            Some(p) => {
                let i = idx_of(s, p, c);
                collapse_edge(s, p, i, b);
                father = Some(p);
                cut_index = Some(i);
            }
        }
    }

    s.node_mut(c).clear();
    augment(aug, s, father, Some(c), AugmentEvent::CutLeaf);

    let i = match cut_index {
        None => {
            // The root was removed with at most one child.
            *root = father;
            augment(aug, s, father, None, AugmentEvent::Fini);
            return;
        }
        Some(i) => i,
    };

    if !removed_red {
        balance_remove(s, root, father.expect("cut below a parent"), i, aug);
    } else {
        augment(aug, s, father, None, AugmentEvent::Fini);
    }
}

/// [`remove_aug`] without augmentation.
pub fn remove<S, I>(s: &mut S, c: I, root: &mut Option<I>)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    remove_aug(s, c, root, &mut NoAugment)
}

// -- swapping -------------------------------------------------------------

fn swap_update_child<S, I>(s: &mut S, a: I, old: I)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    if let Some(p) = s.node(a).parent {
        let i = idx_of(s, p, old);
        s.node_mut(p).child[i] = Some(a);
    }
}

fn swap_update_parent<S, I>(s: &mut S, a: I, i: usize)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    if let Some(c) = s.node(a).child[i] {
        s.node_mut(c).parent = Some(a);
    }
}

/// Exchange the tree positions of two nodes in O(1).
///
/// The nodes may be in the same tree, in different trees, or one of them
/// in no tree at all. Handles parent/sibling/child aliasing. Does not
/// update root slots; see [`swap_update_root`] and [`swap_update_root2`].
/// No augmentation fires: there is no balancing and no information about
/// which trees are involved.
pub fn swap<S, I>(s: &mut S, a: I, b: I)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    if a == b {
        return;
    }

    let na = *s.node(a);
    let nb = *s.node(b);
    *s.node_mut(a) = nb;
    *s.node_mut(b) = na;

    let pa = s.node(a).parent;
    if pa.is_some() && pa == s.node(b).parent {
        // Siblings: their parent's child slots both need flipping.
        let p = pa.expect("sibling parent");
        debug_assert!(p != a && p != b);
        s.node_mut(p).child.swap(0, 1);
    } else {
        // One may now appear to be its own parent: it was the other's
        // child.
        if s.node(a).parent == Some(a) {
            s.node_mut(a).parent = Some(b);
        }
        if s.node(b).parent == Some(b) {
            s.node_mut(b).parent = Some(a);
        }
        swap_update_child(s, a, b);
        swap_update_child(s, b, a);
    }

    swap_update_parent(s, a, 0);
    swap_update_parent(s, a, 1);
    swap_update_parent(s, b, 0);
    swap_update_parent(s, b, 1);
}

/// [`swap`], updating one root slot if the root moved.
pub fn swap_update_root<S, I>(s: &mut S, root: &mut Option<I>, a: I, b: I)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    swap(s, a, b);
    if *root == Some(a) {
        *root = Some(b);
    } else if *root == Some(b) {
        *root = Some(a);
    }
}

/// [`swap`], updating the root slots of two trees.
pub fn swap_update_root2<S, I>(s: &mut S, r1: &mut Option<I>, r2: &mut Option<I>, a: I, b: I)
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    swap(s, a, b);
    for root in [r1, r2].iter_mut() {
        if **root == Some(a) {
            **root = Some(b);
        } else if **root == Some(b) {
            **root = Some(a);
        }
    }
}

// -- join and split -------------------------------------------------------

/// Join the tree `l`, the single free node `m`, and the tree `r`, in
/// order. All keys in `l` must be `<=` `m`'s and `m`'s `<=` all keys in
/// `r`; this precondition is not checked. O(|Δ black height|).
pub fn join3_aug<S, I, A>(s: &mut S, l: Option<I>, m: I, r: Option<I>, aug: &mut A) -> I
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    debug_assert!(!s.node(m).is_linked());

    let mut l = l;
    let mut r = r;
    // Make l the higher tree; i is the side of the lower one.
    let i = (height2(s, l) < height2(s, r)) as usize;
    if i == 1 {
        std::mem::swap(&mut l, &mut r);
    }

    if height2(s, l) > height2(s, r) && is_red(s, r) {
        // Might equalise the heights.
        inc_set_black(s, r.expect("red tree root"));
    }

    if height2(s, l) == height2(s, r) {
        set_child_and_parent(s, m, i, l);
        set_child_and_parent(s, m, 1 - i, r);
        set_red_same_depth(s, m, l);
        inc_set_black_if_needed(s, m);
        aug.event(s, m, None, AugmentEvent::Join);
        return m;
    }

    debug_assert!(!is_red(s, r));
    let l = l.expect("higher tree is empty");
    let mut root = Some(l);

    // Walk down the inner edge of l to the black node at r's height.
    let mut p = l;
    let mut c = s.node(p).child[1 - i];
    while is_red(s, c) || height2(s, c) > height2(s, r) {
        p = c.expect("ran past a leaf");
        c = s.node(p).child[1 - i];
    }

    set_child_and_parent(s, p, 1 - i, Some(m));
    set_child_and_parent(s, m, i, c);
    set_child_and_parent(s, m, 1 - i, r);
    set_red_same_depth(s, m, c);
    aug.event(s, m, None, AugmentEvent::Join);

    // Resolve red-red conflicts along the walked edge.
    let mut m = m;
    loop {
        if s.node(p).parent.is_none() {
            break;
        }
        if !(red_id(s, p) && is_red(s, s.node(p).child[1 - i])) {
            break;
        }
        aug.event(s, p, Some(m), AugmentEvent::Nop);
        m = p;
        p = s.node(p).parent.expect("checked above");
        debug_assert!(!red_id(s, p));

        let inner = s.node(m).child[1 - i].expect("red inner child");
        inc_set_black(s, inner);
        inc(s, m);
        rotate(s, &mut root, i, p, aug);

        p = m;
        if s.node(p).parent.is_none() {
            break;
        }
        p = s.node(m).parent.expect("checked above");
    }

    inc_set_black_if_needed(s, p);
    aug.event(s, p, None, AugmentEvent::Fini);

    root.expect("join lost its root")
}

/// [`join3_aug`] without augmentation.
pub fn join3<S, I>(s: &mut S, l: Option<I>, m: I, r: Option<I>) -> I
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    join3_aug(s, l, m, r, &mut NoAugment)
}

/// Join two trees in order. Extracts the minimum of `r` to use as the
/// middle node of [`join3_aug`].
pub fn join2_aug<S, I, A>(s: &mut S, l: Option<I>, r: Option<I>, aug: &mut A) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    if l.is_none() {
        return r;
    }
    if r.is_none() {
        return l;
    }
    let mut r = r;
    let m = start(s, r, 0).expect("non-empty tree");
    remove_aug(s, m, &mut r, aug);
    Some(join3_aug(s, l, m, r, aug))
}

/// [`join2_aug`] without augmentation.
pub fn join2<S, I>(s: &mut S, l: Option<I>, r: Option<I>) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    join2_aug(s, l, r, &mut NoAugment)
}

/// Split a tree by a comparator.
///
/// Elements comparing less than `key` end up in the first result tree,
/// greater in the second; equal elements go right when `equal_goes_right`,
/// left otherwise. O(log n) time and O(log n) stack.
pub fn split_aug<S, I, K, C, A>(
    s: &mut S,
    n: Option<I>,
    key: &K,
    cmp: &C,
    equal_goes_right: bool,
    aug: &mut A,
) -> (Option<I>, Option<I>)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
    A: Augment<S, I>,
{
    let n = match n {
        None => return (None, None),
        Some(n) => n,
    };
    debug_assert!(s.node(n).parent.is_none());

    aug.event(s, n, None, AugmentEvent::Split);

    // Disassemble the root.
    let nl = s.node(n).child[0];
    let nr = s.node(n).child[1];
    s.node_mut(n).child = [None, None];
    if let Some(nl) = nl {
        s.node_mut(nl).parent = None;
    }
    if let Some(nr) = nr {
        s.node_mut(nr).parent = None;
    }
    s.node_mut(n).stat = 0;

    let d = match cmp(s, key, n) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    let goes_left = d >= if equal_goes_right { 1 } else { 0 };

    if goes_left {
        let (nm, r) = split_aug(s, nr, key, cmp, equal_goes_right, aug);
        let l = join3_aug(s, nl, n, nm, aug);
        (Some(l), r)
    } else {
        let (l, nm) = split_aug(s, nl, key, cmp, equal_goes_right, aug);
        let r = join3_aug(s, nm, n, nr, aug);
        (l, Some(r))
    }
}

/// [`split_aug`] without augmentation.
pub fn split<S, I, K, C>(
    s: &mut S,
    n: Option<I>,
    key: &K,
    cmp: &C,
    equal_goes_right: bool,
) -> (Option<I>, Option<I>)
where
    S: Forest<I>,
    I: Copy + PartialEq,
    C: Fn(&S, &K, I) -> Ordering,
{
    split_aug(s, n, key, cmp, equal_goes_right, &mut NoAugment)
}

// -- extraction -----------------------------------------------------------

/// Remove and return the first (`dir == 0`) or last element.
pub fn extract_start_aug<S, I, A>(
    s: &mut S,
    root: &mut Option<I>,
    dir: usize,
    aug: &mut A,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    let r = start(s, *root, dir)?;
    remove_aug(s, r, root, aug);
    Some(r)
}

/// Remove and return a cached extremum, updating the cache. The cache
/// update is O(1): the neighbour of an extremum is at most two links away.
pub fn extract_update_start_aug<S, I, A>(
    s: &mut S,
    root: &mut Option<I>,
    extremum: &mut Option<I>,
    dir: usize,
    aug: &mut A,
) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
    A: Augment<S, I>,
{
    let r = (*extremum)?;
    debug_assert!(step(s, r, 1 - dir).is_none());
    *extremum = step(s, r, dir);
    remove_aug(s, r, root, aug);
    Some(r)
}

/// Remove and return the cached minimum.
pub fn extract_update_min<S, I>(s: &mut S, root: &mut Option<I>, min_slot: &mut Option<I>) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    extract_update_start_aug(s, root, min_slot, 0, &mut NoAugment)
}

/// Remove and return the cached maximum.
pub fn extract_update_max<S, I>(s: &mut S, root: &mut Option<I>, max_slot: &mut Option<I>) -> Option<I>
where
    S: Forest<I>,
    I: Copy + PartialEq,
{
    extract_update_start_aug(s, root, max_slot, 1, &mut NoAugment)
}
