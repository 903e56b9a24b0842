/**
 * RecoPrep
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

#[cfg(test)]
mod tests {

    use crate::builder::{MatrixBuilder, NewTokenPolicy};
    use crate::context::RunContext;
    use crate::dataset::Dataset;
    use crate::features::FeatureBounds;
    use crate::kcore;
    use crate::postprocessing::{ImplicitInteractions, KCores, Pipeline};

    #[test]
    fn programmatic_usage() {

        /* Our input data comprises of observed interactions between users and items, together
           with a rating. The identifiers used can be strings of arbitrary length and structure. */
        let ratings = vec![
            ("alice", "apple", 4.0),
            ("alice", "dog", 3.0),
            ("alice", "pony", 5.0),
            ("bob", "apple", 2.0),
            ("bob", "pony", 4.0),
            ("bob", "dog", 1.0),
            ("charles", "pony", 5.0),
            ("charles", "apple", 1.0),
            ("dora", "bike", 3.0),
        ];

        /* A builder collects the triples and assigns consecutive integer indices to users (rows)
           and items (columns) in order of their first appearance. */
        let mut interactions = MatrixBuilder::new();
        interactions.add_triples(ratings).unwrap();

        let mut dataset = Dataset::from_interactions(interactions.finalize()).unwrap();

        println!("Found {} interactions between {} users and {} items.",
            dataset.num_interactions(), dataset.num_users(), dataset.num_items());

        /* Content matrices describe items with features. Their rows must use the item indices of
           the interactions, so we hand the item mapper to the builder. Items which never occur
           in the interactions are ignored. */
        let mut tags = MatrixBuilder::with_policies(NewTokenPolicy::Ignore, NewTokenPolicy::Add)
            .with_row_mapper(dataset.get_column_token_to_index_mapper().clone()).unwrap();
        tags.add_row("apple", &["fruit", "red"], 1.0).unwrap();
        tags.add_row("dog", &["animal"], 1.0).unwrap();
        tags.add_row("pony", &["animal", "small"], 1.0).unwrap();
        tags.add_row("bike", &["vehicle"], 1.0).unwrap();
        tags.add_row("unicorn", &["animal", "mythical"], 1.0).unwrap();

        dataset.add_finalized_content("tags", tags.finalize()).unwrap();

        /* Rare and overly common features carry little information, we drop those. */
        let mut dataset = dataset.prune_content_features(FeatureBounds::new(1, 0.8).unwrap())
            .unwrap();

        /* The pipeline keeps the 2-cores of the interactions and turns the ratings into implicit
           feedback afterwards. Users and items removed from the interactions are removed from
           the mappers and from all content matrices as well. */
        let pipeline = Pipeline::new()
            .then(KCores::new(2).unwrap())
            .then(ImplicitInteractions);

        let mut ctx = RunContext::new();
        dataset = pipeline.run(dataset, &mut ctx).unwrap();

        println!("Results are stored in {}", pipeline.subfolder());

        for (user, user_index) in dataset.get_row_token_to_index_mapper().iter() {
            println!("{} interacted with:", user);
            let history = dataset.get_interaction_matrix().outer_view(user_index).unwrap();
            for (item_index, _) in history.iter() {
                println!("\t{}", dataset.item_token(item_index).unwrap());
            }
        }

        assert_eq!(dataset.get_row_token_to_index_mapper().index("dora"), None);
        assert_eq!(dataset.get_column_token_to_index_mapper().index("bike"), None);
        assert_eq!(dataset.num_users(), 3);
        assert_eq!(dataset.num_items(), 3);

        let tag_mapper = dataset.get_content_feature_mapper("tags").unwrap();
        assert!(tag_mapper.contains("animal"));
        assert!(!tag_mapper.contains("vehicle"));
        assert!(!tag_mapper.contains("mythical"));
        assert_eq!(dataset.get_content_matrix("tags").unwrap().rows(), dataset.num_items());

        assert!(dataset.get_interaction_matrix().data().iter().all(|value| *value == 1.0));
        assert!(!ctx.has_degenerate_result());
    }

    #[test]
    fn cascading_removal_empties_the_matrix() {

        /* u2 only has a single interaction and is removed first. Afterwards, neither item has two
           users anymore, which in turn leaves u1 without interactions. */
        let mut builder = MatrixBuilder::new();
        builder.add_triples(vec![("u1", "i1", 1.0), ("u1", "i2", 1.0), ("u2", "i1", 1.0)])
            .unwrap();
        let interactions = builder.finalize().matrix;

        let mut ctx = RunContext::new();
        let reduction = kcore::select_k_cores(interactions, 2, true, &mut ctx).unwrap();

        assert!(reduction.degenerate);
        assert!(ctx.has_degenerate_result());
        assert_eq!(reduction.matrix.shape(), (0, 0));
        assert_eq!(reduction.removed_rows.len(), 2);
        assert_eq!(reduction.removed_cols.len(), 2);
    }

    #[test]
    fn repeated_interactions_are_summed() {
        let mut builder = MatrixBuilder::new();
        builder.add_triple("u1", "i1", 1.0).unwrap();
        builder.add_triple("u1", "i1", 1.0).unwrap();

        let dataset = Dataset::from_interactions(builder.finalize()).unwrap();

        assert_eq!(dataset.num_interactions(), 1);
        assert_eq!(dataset.get_interaction_matrix().get(0, 0), Some(&2.0));
    }
}
