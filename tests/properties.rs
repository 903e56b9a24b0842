//! Property-based tests for the filtering invariants

use proptest::prelude::*;

use recoprep::builder::MatrixBuilder;
use recoprep::context::RunContext;
use recoprep::dataset::Dataset;
use recoprep::kcore;
use recoprep::mapper::TokenMapper;
use recoprep::postprocessing::{KCores, Pipeline};
use recoprep::sparse;
use recoprep::types::RemovedIndices;

fn interactions_strategy() -> impl Strategy<Value=Vec<(usize, usize, u8)>> {
    prop::collection::vec((0usize..12, 0usize..10, 1u8..6), 1..80)
}

fn build_dataset(triples: &[(usize, usize, u8)]) -> Dataset {
    let mut builder = MatrixBuilder::new();
    for (user, item, rating) in triples.iter() {
        builder.add_triple(&format!("u{}", user), &format!("i{}", item), *rating as f64)
            .unwrap();
    }
    Dataset::from_interactions(builder.finalize()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mappers_are_dense_and_match_the_shape(triples in interactions_strategy()) {
        let dataset = build_dataset(&triples);

        let users = dataset.get_row_token_to_index_mapper();
        let items = dataset.get_column_token_to_index_mapper();

        prop_assert_eq!(users.len(), dataset.num_users());
        prop_assert_eq!(items.len(), dataset.num_items());

        for index in 0..users.len() {
            let token = users.token(index).unwrap();
            prop_assert_eq!(users.index(token), Some(index));
        }
        for index in 0..items.len() {
            let token = items.token(index).unwrap();
            prop_assert_eq!(items.index(token), Some(index));
        }
    }

    #[test]
    fn k_cores_meet_the_degree_bound(triples in interactions_strategy(), k in 1usize..5) {
        let dataset = build_dataset(&triples);
        let mut ctx = RunContext::new();

        let reduction = kcore::select_k_cores(
            dataset.get_interaction_matrix().clone(), k, true, &mut ctx).unwrap();

        prop_assert_eq!(reduction.matrix.rows() + reduction.removed_rows.len(), dataset.num_users());
        prop_assert_eq!(reduction.matrix.cols() + reduction.removed_cols.len(), dataset.num_items());

        if reduction.degenerate {
            prop_assert_eq!(reduction.matrix.shape(), (0, 0));
        } else {
            prop_assert!(sparse::row_degrees(&reduction.matrix).iter().all(|degree| *degree >= k));
            prop_assert!(sparse::column_degrees(&reduction.matrix).iter().all(|degree| *degree >= k));
        }
    }

    #[test]
    fn k_cores_are_idempotent(triples in interactions_strategy(), k in 1usize..4) {
        let dataset = build_dataset(&triples);
        let mut ctx = RunContext::new();

        let first = kcore::select_k_cores(
            dataset.get_interaction_matrix().clone(), k, true, &mut ctx).unwrap();
        prop_assume!(!first.degenerate);

        let second = kcore::select_k_cores(first.matrix.clone(), k, true, &mut ctx).unwrap();

        prop_assert!(second.removed_rows.is_empty());
        prop_assert!(second.removed_cols.is_empty());
        prop_assert_eq!(second.iterations, 1);
        prop_assert_eq!(second.matrix.to_csr(), first.matrix.to_csr());
    }

    #[test]
    fn content_stays_aligned_with_the_items(
        triples in interactions_strategy(),
        features in prop::collection::vec((0usize..10, 0usize..6), 0..40),
        k in 1usize..4,
    ) {
        let mut dataset = build_dataset(&triples);

        let mut tags = MatrixBuilder::new()
            .with_row_mapper(dataset.get_column_token_to_index_mapper().clone()).unwrap();
        for (item, feature) in features.iter() {
            let item = format!("i{}", item);
            if dataset.get_column_token_to_index_mapper().contains(&item) {
                tags.add_triple(&item, &format!("f{}", feature), 1.0).unwrap();
            }
        }
        dataset.add_finalized_content("tags", tags.finalize()).unwrap();

        let kept_items_before: Vec<String> = dataset.get_column_token_to_index_mapper()
            .tokens()
            .map(|token| token.to_string())
            .collect();

        let mut ctx = RunContext::new();
        let dataset = Pipeline::new()
            .then(KCores::new(k).unwrap())
            .run(dataset, &mut ctx)
            .unwrap();

        prop_assert!(dataset.verify_consistency().is_ok());
        prop_assert_eq!(dataset.get_content_matrix("tags").unwrap().rows(), dataset.num_items());

        // surviving items keep their relative order
        let surviving: Vec<&str> = dataset.get_column_token_to_index_mapper().tokens().collect();
        let expected: Vec<&str> = kept_items_before.iter()
            .map(|token| token.as_str())
            .filter(|token| dataset.get_column_token_to_index_mapper().contains(token))
            .collect();
        prop_assert_eq!(surviving, expected);

        // every remaining feature still occurs
        let tags = dataset.get_content_matrix("tags").unwrap();
        prop_assert!(sparse::column_degrees(tags).iter().all(|degree| *degree >= 1));
    }

    #[test]
    fn reconcile_keeps_order_and_density(
        len in 0usize..30,
        removed in prop::collection::btree_set(0usize..30, 0..15),
    ) {
        let removed: RemovedIndices = removed.into_iter().filter(|index| *index < len).collect();
        let mapper = TokenMapper::from_tokens((0..len).map(|index| format!("t{}", index))).unwrap();

        let reconciled = mapper.reconcile(&removed).unwrap();

        prop_assert_eq!(reconciled.len(), len - removed.len());

        let expected: Vec<String> = (0..len)
            .filter(|index| !removed.contains(index))
            .map(|index| format!("t{}", index))
            .collect();
        let actual: Vec<String> = reconciled.tokens().map(|token| token.to_string()).collect();
        prop_assert_eq!(actual, expected);
    }
}
