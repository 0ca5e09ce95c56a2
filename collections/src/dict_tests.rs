//! Structure tests for the red-black dictionary: randomized workloads
//! checked against the red-black invariants, plain-vector references, and
//! a brute-force recomputation of a subtree-xor augmentation.

use crate::dict::{self, Augment, AugmentEvent, DuplicatePolicy, Forest, Node};
use std::cmp::Ordering;

struct Store {
    nodes: Vec<Node<u32>>,
    keys: Vec<u64>,
    /// Subtree xor of keys, maintained through the augmentation callback.
    xor: Vec<u64>,
}

impl Store {
    fn new(keys: &[u64]) -> Self {
        Store {
            nodes: keys.iter().map(|_| Node::new()).collect(),
            keys: keys.to_vec(),
            xor: keys.to_vec(),
        }
    }
}

impl Forest<u32> for Store {
    fn node(&self, id: u32) -> &Node<u32> {
        &self.nodes[id as usize]
    }
    fn node_mut(&mut self, id: u32) -> &mut Node<u32> {
        &mut self.nodes[id as usize]
    }
}

fn by_key(s: &Store, key: &u64, n: u32) -> Ordering {
    key.cmp(&s.keys[n as usize])
}

fn node_by_key(s: &Store, key: &u32, n: u32) -> Ordering {
    s.keys[*key as usize].cmp(&s.keys[n as usize])
}

/// The subtree-xor augmentation, following the same event protocol the
/// sweep engine uses for its bundle trees.
struct XorAug;

fn update_xor(s: &mut Store, n: Option<u32>) {
    if let Some(n) = n {
        let mut x = s.keys[n as usize];
        for i in 0..2 {
            if let Some(c) = s.node(n).child(i) {
                x ^= s.xor[c as usize];
            }
        }
        s.xor[n as usize] = x;
    }
}

fn update_xor_up(s: &mut Store, mut n: Option<u32>) {
    while let Some(c) = n {
        update_xor(s, Some(c));
        n = s.node(c).parent();
    }
}

impl Augment<Store, u32> for XorAug {
    fn event(&mut self, s: &mut Store, main: u32, aux: Option<u32>, event: AugmentEvent) {
        match event {
            AugmentEvent::RotateLeft | AugmentEvent::RotateRight => {
                update_xor(s, aux);
                update_xor(s, Some(main));
            }
            AugmentEvent::Nop
            | AugmentEvent::Add
            | AugmentEvent::Join
            | AugmentEvent::CutLeaf => {
                update_xor(s, Some(main));
            }
            AugmentEvent::Nop2 => {
                update_xor(s, Some(main));
                let p = s.node(main).parent();
                update_xor(s, p);
            }
            AugmentEvent::Fini => {
                update_xor_up(s, Some(main));
            }
            AugmentEvent::CutSwap => {}
            AugmentEvent::Split => {
                s.xor[main as usize] = s.keys[main as usize];
            }
        }
    }
}

struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

/// Walk the whole tree, checking the red-black invariants, the parent
/// pointers, the stored black heights, and the key order. Returns the
/// number of nodes.
fn check_tree(s: &Store, root: Option<u32>) -> usize {
    fn rec(s: &Store, n: Option<u32>, parent: Option<u32>, min: u64, max: u64) -> (u32, usize) {
        let n = match n {
            None => return (0, 0),
            Some(n) => n,
        };
        assert_eq!(s.node(n).parent(), parent, "bad parent pointer");
        let key = s.keys[n as usize];
        assert!(key >= min && key <= max, "order violation");
        let red = dict::node_is_red(s, n);
        if red {
            for i in 0..2 {
                if let Some(c) = s.node(n).child(i) {
                    assert!(!dict::node_is_red(s, c), "red node with red child");
                }
            }
        }
        let (hl, cl) = rec(s, s.node(n).child(0), Some(n), min, key);
        let (hr, cr) = rec(s, s.node(n).child(1), Some(n), key, max);
        assert_eq!(hl, hr, "black height mismatch");
        let h = hl + !red as u32;
        assert_eq!(
            dict::black_height(s, Some(n)),
            h,
            "stored black height out of date"
        );
        (h, cl + cr + 1)
    }
    let (_, count) = rec(s, root, None, 0, u64::max_value());
    count
}

fn check_xor(s: &Store, root: Option<u32>) {
    fn rec(s: &Store, n: Option<u32>) -> u64 {
        let n = match n {
            None => return 0,
            Some(n) => n,
        };
        let x = s.keys[n as usize]
            ^ rec(s, s.node(n).child(0))
            ^ rec(s, s.node(n).child(1));
        assert_eq!(s.xor[n as usize], x, "augmentation out of date");
        x
    }
    rec(s, root);
}

fn contents(s: &Store, root: Option<u32>) -> Vec<u64> {
    let mut out = Vec::new();
    let mut n = dict::min(s, root);
    while let Some(c) = n {
        out.push(s.keys[c as usize]);
        n = dict::next(s, c);
    }
    out
}

#[test]
fn ordered_iteration() {
    let keys: Vec<u64> = (0..100).map(|i| (i * 37) % 100).collect();
    let mut s = Store::new(&keys);
    let mut root = None;
    for id in 0..keys.len() as u32 {
        let prev = dict::insert(&mut s, id, &mut root, &node_by_key, DuplicatePolicy::Any);
        assert!(prev.is_none());
        check_tree(&s, root);
    }
    let sorted: Vec<u64> = (0..100).collect();
    assert_eq!(contents(&s, root), sorted);

    // Backwards, too.
    let mut back = Vec::new();
    let mut n = dict::max(&s, root);
    while let Some(c) = n {
        back.push(s.keys[c as usize]);
        n = dict::prev(&s, c);
    }
    back.reverse();
    assert_eq!(back, sorted);
}

#[test]
fn duplicate_policies() {
    let keys = [5u64, 5, 5, 3, 7];
    let mut s = Store::new(&keys);
    let mut root = None;
    for id in 0..keys.len() as u32 {
        dict::insert(&mut s, id, &mut root, &node_by_key, DuplicatePolicy::LastOrGap);
    }

    // Any finds something equal; First/Last find the outermost entries.
    assert!(dict::find(&s, root, &5u64, &by_key, DuplicatePolicy::Any).is_some());
    let first = dict::find(&s, root, &5u64, &by_key, DuplicatePolicy::First).unwrap();
    let last = dict::find(&s, root, &5u64, &by_key, DuplicatePolicy::Last).unwrap();
    assert!(dict::prev(&s, first).map_or(true, |p| s.keys[p as usize] < 5));
    assert!(dict::next(&s, last).map_or(true, |n| s.keys[n as usize] > 5));
    assert_ne!(first, last);

    // Gap policies return no node but a usable insertion ref.
    let (found, gap) = dict::find_ref(&s, root, &5u64, &by_key, DuplicatePolicy::FirstOrGap);
    assert!(found.is_none());
    assert!(gap.path & 4 == 0);

    // Inserting with Any against an equal key returns the existing node.
    let mut s2 = Store::new(&[5, 5]);
    let mut root2 = None;
    assert!(dict::insert(&mut s2, 0, &mut root2, &node_by_key, DuplicatePolicy::Any).is_none());
    assert_eq!(
        dict::insert(&mut s2, 1, &mut root2, &node_by_key, DuplicatePolicy::Any),
        Some(0)
    );
}

#[test]
fn insert_at_positions() {
    // Build 0,10,20,...,90 and then wedge nodes in by position only.
    let mut keys: Vec<u64> = (0..10).map(|i| i * 10).collect();
    keys.push(15); // id 10, inserted after id 1 (key 10)
    keys.push(5); // id 11, inserted before id 1
    let mut s = Store::new(&keys);
    let mut root = None;
    for id in 0..10u32 {
        dict::insert(&mut s, id, &mut root, &node_by_key, DuplicatePolicy::Any);
    }
    dict::insert_at(&mut s, 10, Some(1), 1, &mut root);
    dict::insert_at(&mut s, 11, Some(1), 0, &mut root);
    check_tree(&s, root);
    assert_eq!(
        contents(&s, root),
        vec![0, 5, 10, 15, 20, 30, 40, 50, 60, 70, 80, 90]
    );
}

#[test]
fn cached_extrema() {
    let keys: Vec<u64> = vec![50, 30, 70, 10, 90, 20, 80];
    let mut s = Store::new(&keys);
    let mut root = None;
    let mut lo = None;
    let mut hi = None;
    for id in 0..keys.len() as u32 {
        dict::insert_update(
            &mut s,
            id,
            &mut root,
            Some(&mut lo),
            Some(&mut hi),
            &node_by_key,
            DuplicatePolicy::Any,
        );
        assert_eq!(lo, dict::min(&s, root));
        assert_eq!(hi, dict::max(&s, root));
    }
    let mut drained = Vec::new();
    while let Some(n) = dict::extract_update_min(&mut s, &mut root, &mut lo) {
        assert_eq!(lo, dict::min(&s, root));
        drained.push(s.keys[n as usize]);
        check_tree(&s, root);
    }
    assert_eq!(drained, vec![10, 20, 30, 50, 70, 80, 90]);
    assert!(root.is_none());
}

#[test]
fn swap_nodes() {
    let mut rng = Rng(0x9e3779b97f4a7c15);
    let keys: Vec<u64> = (0..32).collect();
    let mut s = Store::new(&keys);
    let mut root = None;
    for id in 0..32u32 {
        dict::insert(&mut s, id, &mut root, &node_by_key, DuplicatePolicy::Any);
    }
    // Swapping two nodes and swapping them back must leave a valid tree;
    // in between, the key order is violated on purpose, so only check
    // structure by counting.
    for _ in 0..200 {
        let a = (rng.next() % 32) as u32;
        let b = (rng.next() % 32) as u32;
        dict::swap_update_root(&mut s, &mut root, a, b);
        dict::swap_update_root(&mut s, &mut root, a, b);
        assert_eq!(check_tree(&s, root), 32);
    }
}

#[test]
fn randomized_insert_remove_find() {
    let mut rng = Rng(0x243f6a8885a308d3);
    let n = 128usize;
    let keys: Vec<u64> = (0..n).map(|_| rng.next() % 64).collect();
    let mut s = Store::new(&keys);
    let mut root: Option<u32> = None;
    let mut live = vec![false; n];

    for round in 0..4000 {
        let id = (rng.next() % n as u64) as u32;
        if live[id as usize] {
            dict::remove(&mut s, id, &mut root);
            live[id as usize] = false;
        } else {
            dict::insert(
                &mut s,
                id,
                &mut root,
                &node_by_key,
                DuplicatePolicy::LastOrGap,
            );
            live[id as usize] = true;
        }
        if round % 16 == 0 {
            let count = check_tree(&s, root);
            assert_eq!(count, live.iter().filter(|l| **l).count());
            let mut expect: Vec<u64> = live
                .iter()
                .enumerate()
                .filter(|(_, l)| **l)
                .map(|(i, _)| keys[i])
                .collect();
            expect.sort();
            assert_eq!(contents(&s, root), expect);
            // Every live key can be found.
            let probe = rng.next() % 64;
            let found = dict::find(&s, root, &probe, &by_key, DuplicatePolicy::Any);
            assert_eq!(found.is_some(), expect.binary_search(&probe).is_ok());
        }
    }
}

#[test]
fn randomized_augmented_workload() {
    let mut rng = Rng(0xb7e151628aed2a6b);
    let n = 96usize;
    let keys: Vec<u64> = (0..n).map(|_| rng.next()).collect();
    let mut s = Store::new(&keys);
    let mut root: Option<u32> = None;
    let mut live = vec![false; n];

    for round in 0..3000 {
        let id = (rng.next() % n as u64) as u32;
        if live[id as usize] {
            dict::remove_aug(&mut s, id, &mut root, &mut XorAug);
            live[id as usize] = false;
        } else {
            // Detached nodes hold their own key as their subtree xor.
            s.xor[id as usize] = s.keys[id as usize];
            dict::insert_aug(
                &mut s,
                id,
                &mut root,
                &node_by_key,
                DuplicatePolicy::LastOrGap,
                &mut XorAug,
            );
            live[id as usize] = true;
        }
        if round % 8 == 0 {
            check_tree(&s, root);
            check_xor(&s, root);
        }
    }
}

#[test]
fn split_and_join_roundtrip() {
    let mut rng = Rng(0x452821e638d01377);
    for _ in 0..50 {
        let n = 1 + (rng.next() % 80) as usize;
        let keys: Vec<u64> = (0..n).map(|_| rng.next() % 1000).collect();
        let mut s = Store::new(&keys);
        let mut root: Option<u32> = None;
        for id in 0..n as u32 {
            s.xor[id as usize] = s.keys[id as usize];
            dict::insert_aug(
                &mut s,
                id,
                &mut root,
                &node_by_key,
                DuplicatePolicy::LastOrGap,
                &mut XorAug,
            );
        }
        let all = contents(&s, root);

        let pivot = rng.next() % 1000;
        let (l, r) = dict::split_aug(&mut s, root, &pivot, &by_key, true, &mut XorAug);
        check_tree(&s, l);
        check_tree(&s, r);
        check_xor(&s, l);
        check_xor(&s, r);
        for &k in &contents(&s, l) {
            assert!(k < pivot);
        }
        for &k in &contents(&s, r) {
            assert!(k >= pivot);
        }

        let joined = dict::join2_aug(&mut s, l, r, &mut XorAug);
        check_tree(&s, joined);
        check_xor(&s, joined);
        assert_eq!(contents(&s, joined), all);
    }
}

#[test]
fn join3_keeps_order() {
    let keys: Vec<u64> = (0..41).collect();
    let mut s = Store::new(&keys);
    // Left tree: 0..20, middle: 20, right: 21..41.
    let mut l = None;
    for id in 0..20u32 {
        dict::insert(&mut s, id, &mut l, &node_by_key, DuplicatePolicy::Any);
    }
    let mut r = None;
    for id in 21..41u32 {
        dict::insert(&mut s, id, &mut r, &node_by_key, DuplicatePolicy::Any);
    }
    let root = Some(dict::join3(&mut s, l, 20, r));
    check_tree(&s, root);
    assert_eq!(contents(&s, root), (0..41).collect::<Vec<_>>());

    // Degenerate shapes: empty sides.
    let keys2 = [1u64, 2, 3];
    let mut s2 = Store::new(&keys2);
    let root2 = Some(dict::join3(&mut s2, None, 0, None));
    check_tree(&s2, root2);
    let mut r2 = None;
    dict::insert(&mut s2, 2, &mut r2, &node_by_key, DuplicatePolicy::Any);
    let root3 = Some(dict::join3(&mut s2, root2, 1, r2));
    check_tree(&s2, root3);
    assert_eq!(contents(&s2, root3), vec![1, 2, 3]);
}
