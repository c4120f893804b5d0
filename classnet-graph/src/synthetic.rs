// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Stand-in networks for when no survey answers can be used.
//! Everything produced here is tagged synthetic.

use classnet_core::{NetworkData, NodeId, Provenance, RelationType, Relationship, Student};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

const MAX_OUT_DEGREE: usize = 5;

pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Placeholder names `Student 1..=n`
    pub fn roster(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Student {}", i)).collect()
    }

    /// Random relationships among `names`.
    ///
    /// Each student picks between 1 and `min(5, n-1) - 1` distinct others
    /// (at least one when anyone else exists), with a random type and a
    /// weight in 1..=3.
    pub fn generate(&mut self, names: &[String]) -> NetworkData {
        let nodes: Vec<Student> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Student::new(i as NodeId, name.as_str()))
            .collect();
        let n = nodes.len();

        let mut edges = Vec::new();
        if n >= 2 {
            let upper = MAX_OUT_DEGREE.min(n - 1);
            for from in 0..n {
                let out_degree = if upper > 1 {
                    self.rng.gen_range(1..upper)
                } else {
                    1
                };
                let others: Vec<usize> = (0..n).filter(|&to| to != from).collect();
                let targets: Vec<usize> = others
                    .choose_multiple(&mut self.rng, out_degree)
                    .copied()
                    .collect();
                for to in targets {
                    let relation_type = RelationType::SYNTHETIC
                        .choose(&mut self.rng)
                        .cloned()
                        .unwrap_or(RelationType::General);
                    let weight = self.rng.gen_range(1..=3);
                    edges.push(
                        Relationship::new(from as NodeId, to as NodeId, relation_type)
                            .with_weight(weight),
                    );
                }
            }
        }

        info!(nodes = n, edges = edges.len(), "Generated synthetic network");

        NetworkData {
            nodes,
            edges,
            question_types: Default::default(),
            provenance: Provenance::synthetic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_is_tagged_and_canonical() {
        let mut generator = SyntheticGenerator::new(Some(7));
        let network = generator.generate(&SyntheticGenerator::roster(10));

        assert!(network.is_synthetic());
        assert_eq!(network.nodes.len(), 10);

        let mut out_degree = vec![0usize; 10];
        let mut seen = HashSet::new();
        for edge in &network.edges {
            assert!(!edge.is_self_loop());
            assert!((1..=3).contains(&edge.weight));
            assert!(seen.insert((edge.from, edge.to)));
            out_degree[edge.from as usize] += 1;
        }
        assert!(out_degree.iter().all(|&d| (1..5).contains(&d)));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let names = SyntheticGenerator::roster(6);
        let a = SyntheticGenerator::new(Some(42)).generate(&names);
        let b = SyntheticGenerator::new(Some(42)).generate(&names);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_rosters() {
        let mut generator = SyntheticGenerator::new(Some(1));
        let single = generator.generate(&SyntheticGenerator::roster(1));
        assert!(single.edges.is_empty());
        assert!(single.is_synthetic());

        let pair = generator.generate(&SyntheticGenerator::roster(2));
        assert_eq!(pair.edges.len(), 2);
    }
}
