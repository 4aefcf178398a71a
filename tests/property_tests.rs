//! Property suites for value equality, relation insert semantics, and
//! lattice joins.

mod common;

use common::*;
use fixlog::{EvalContext, LatticeStore, Linker, RelationStore, Root, TableSym, Value};
use proptest::prelude::*;

/// First-order values: the shapes that can appear in stored tuples.
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Unit),
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::Int8),
        any::<i64>().prop_map(Value::Int64),
        any::<f64>().prop_map(Value::Float64),
        "[a-z]{0,8}".prop_map(|s| Value::string(s)),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::tuple),
            ("[A-Z][a-z]{0,4}", inner).prop_map(|(name, payload)| Value::tag(name, payload)),
        ]
    })
}

proptest! {
    #[test]
    fn prop_value_equality_is_reflexive(v in value_strategy()) {
        prop_assert_eq!(&v, &v);
        prop_assert_eq!(&v, &v.clone());
    }

    #[test]
    fn prop_value_equality_is_symmetric(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(a == b, b == a);
    }

    #[test]
    fn prop_equal_values_hash_alike(v in value_strategy()) {
        let mut set = std::collections::HashSet::new();
        set.insert(v.clone());
        prop_assert!(set.contains(&v.clone()));
    }

    #[test]
    fn prop_containers_preserve_equality_depth(
        elms in prop::collection::vec(value_strategy(), 0..5)
    ) {
        let a = Value::tuple(elms.clone());
        let b = Value::tuple(elms);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_relation_insert_is_idempotent(
        rows in prop::collection::vec(prop::collection::vec(any::<i64>(), 2), 1..20)
    ) {
        let store = RelationStore::new();
        let table = TableSym::new(1, "t");

        for row in &rows {
            let tuple: Vec<Value> = row.iter().copied().map(Value::Int64).collect();
            store.insert(&table, tuple);
        }
        let len_after_first = store.len(&table);

        // Re-inserting every row reports no change and leaves the set as is.
        for row in &rows {
            let tuple: Vec<Value> = row.iter().copied().map(Value::Int64).collect();
            prop_assert!(!store.insert(&table, tuple));
        }
        prop_assert_eq!(store.len(&table), len_after_first);
    }

    #[test]
    fn prop_inserted_tuples_are_scannable(
        rows in prop::collection::vec(prop::collection::vec(any::<i64>(), 2), 1..20)
    ) {
        let store = RelationStore::new();
        let table = TableSym::new(1, "t");
        for row in &rows {
            let tuple: Vec<Value> = row.iter().copied().map(Value::Int64).collect();
            store.insert(&table, tuple.clone());
            prop_assert!(store.contains(&table, &tuple));
        }
    }

    #[test]
    fn prop_lattice_upserts_join_to_the_lub(v in any::<i64>(), w in any::<i64>()) {
        let mut root = Root::new();
        let ops = max_lattice(&mut root, 1);
        let linker = Linker::new();
        let ctx = EvalContext::new(&root, &linker);

        let store = LatticeStore::new();
        let table = TableSym::new(1, "best");
        let key = vec![Value::Int64(0)];

        // Guard against the bot element itself: the entry would be pruned.
        prop_assume!(v != i64::MIN && w != i64::MIN);

        store.upsert(&table, key.clone(), Value::Int64(v), &ops, &ctx).expect("upsert");
        store.upsert(&table, key.clone(), Value::Int64(w), &ops, &ctx).expect("upsert");

        prop_assert_eq!(store.get(&table, &key), Some(Value::Int64(v.max(w))));
    }

    #[test]
    fn prop_lattice_upsert_of_bot_is_a_no_op(v in any::<i64>()) {
        let mut root = Root::new();
        let ops = max_lattice(&mut root, 1);
        let linker = Linker::new();
        let ctx = EvalContext::new(&root, &linker);

        let store = LatticeStore::new();
        let table = TableSym::new(1, "best");
        let key = vec![Value::Int64(0)];
        prop_assume!(v != i64::MIN);

        store.upsert(&table, key.clone(), Value::Int64(v), &ops, &ctx).expect("upsert");
        let changed = store
            .upsert(&table, key.clone(), Value::Int64(i64::MIN), &ops, &ctx)
            .expect("upsert");

        prop_assert!(!changed);
        prop_assert_eq!(store.get(&table, &key), Some(Value::Int64(v)));
    }

    #[test]
    fn prop_lattice_entries_only_ascend(values in prop::collection::vec(any::<i64>(), 1..12)) {
        let mut root = Root::new();
        let ops = max_lattice(&mut root, 1);
        let linker = Linker::new();
        let ctx = EvalContext::new(&root, &linker);

        let store = LatticeStore::new();
        let table = TableSym::new(1, "best");
        let key = vec![Value::Int64(0)];

        let mut prev: Option<i64> = None;
        for v in values {
            store.upsert(&table, key.clone(), Value::Int64(v), &ops, &ctx).expect("upsert");
            let current = match store.get(&table, &key) {
                Some(Value::Int64(c)) => Some(c),
                None => None,
                other => panic!("unexpected {other:?}"),
            };
            if let (Some(p), Some(c)) = (prev, current) {
                prop_assert!(c >= p);
            }
            prev = current.or(prev);
        }
    }
}
