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

//! Louvain Community Detection
//!
//! Runs on the undirected projection of the social graph: students are
//! adjacent when either names the other, with the weights of both
//! directions summed.
//!
//! ## Algorithm Overview
//!
//! 1. **Local Moving Phase**: Visit nodes in random order and move each to
//!    the neighbouring community with the best modularity gain
//! 2. **Aggregation Phase**: Collapse every community into a super-node
//! 3. **Repeat**: Until a pass improves modularity by less than the
//!    configured minimum
//!
//! ## Modularity
//!
//! Q = Σc [ Lc/m - γ (dc / 2m)² ]
//!
//! Where:
//! - Lc = total edge weight inside community c
//! - dc = summed degree of the members of c
//! - m = total edge weight
//! - γ = resolution
//!
//! Reference: Blondel et al., "Fast unfolding of communities in large networks"

use crate::graph::SocialGraph;
use classnet_core::{Community, CommunityConfig, NodeId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Gains smaller than this are treated as ties
const GAIN_EPSILON: f64 = 1e-12;

/// Every student mapped to exactly one community
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityPartition {
    pub assignment: BTreeMap<NodeId, u32>,
    /// Ordered by id; ids are contiguous from 0
    pub communities: Vec<Community>,
    pub modularity: f64,
}

impl CommunityPartition {
    /// Each student alone in its own community
    pub fn singletons(ids: &[NodeId]) -> Self {
        Self::from_groups(ids, &(0..ids.len()).collect::<Vec<_>>(), 0.0)
    }

    /// Build from a per-position group label, renumbering communities by
    /// their smallest member id
    fn from_groups(ids: &[NodeId], groups: &[usize], modularity: f64) -> Self {
        let mut members: BTreeMap<usize, BTreeSet<NodeId>> = BTreeMap::new();
        for (&id, &group) in ids.iter().zip(groups) {
            members.entry(group).or_default().insert(id);
        }

        let mut sets: Vec<BTreeSet<NodeId>> = members.into_values().collect();
        sets.sort_by_key(|s| s.iter().next().copied());

        let mut assignment = BTreeMap::new();
        let communities = sets
            .into_iter()
            .enumerate()
            .map(|(cid, members)| {
                let cid = cid as u32;
                for &id in &members {
                    assignment.insert(id, cid);
                }
                Community { id: cid, members }
            })
            .collect();

        Self {
            assignment,
            communities,
            modularity,
        }
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn community_of(&self, id: NodeId) -> Option<u32> {
        self.assignment.get(&id).copied()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.communities.iter().map(Community::size).collect()
    }
}

/// Undirected weighted graph at one aggregation level
#[derive(Debug, Clone)]
struct Level {
    /// Neighbour weights, symmetric, no self entries
    adjacency: Vec<BTreeMap<usize, f64>>,
    /// Self-loop weight per node (internal weight of collapsed communities)
    self_loops: Vec<f64>,
}

impl Level {
    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Weighted degree, self loops counted twice
    fn degrees(&self) -> Vec<f64> {
        self.adjacency
            .iter()
            .zip(&self.self_loops)
            .map(|(adj, &s)| adj.values().sum::<f64>() + 2.0 * s)
            .collect()
    }

    /// Collapse communities (contiguous ids) into super-nodes
    fn aggregate(&self, community: &[usize], count: usize) -> Level {
        let mut adjacency = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for (i, adj) in self.adjacency.iter().enumerate() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for (&j, &w) in adj {
                let cj = community[j];
                if ci == cj {
                    // each internal edge is seen from both ends
                    self_loops[ci] += w / 2.0;
                } else {
                    *adjacency[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }

        Level {
            adjacency,
            self_loops,
        }
    }
}

/// Louvain community detection
pub struct LouvainClustering {
    config: CommunityConfig,
}

impl LouvainClustering {
    pub fn new() -> Self {
        Self {
            config: CommunityConfig::default(),
        }
    }

    pub fn with_config(config: CommunityConfig) -> Self {
        Self { config }
    }

    /// Partition the students of `graph`
    pub fn detect(&self, graph: &SocialGraph) -> CommunityPartition {
        let ids = graph.node_ids();
        let n = ids.len();
        if n == 0 {
            return CommunityPartition::default();
        }

        let base = Level {
            adjacency: graph.undirected_adjacency(),
            self_loops: vec![0.0; n],
        };
        let total_weight = base.degrees().iter().sum::<f64>() / 2.0;
        if total_weight == 0.0 {
            // No edges, each student is its own community
            return CommunityPartition::singletons(&ids);
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // base node -> current super-node
        let mut membership: Vec<usize> = (0..n).collect();
        let mut modularity = self.modularity(&base, &membership, total_weight);
        let mut level = base.clone();

        for pass in 0..self.config.max_passes {
            let (community, moved) = self.local_moving_phase(&level, total_weight, &mut rng);
            if !moved {
                break;
            }

            let (community, count) = renumber_communities(&community);
            for m in membership.iter_mut() {
                *m = community[*m];
            }

            let new_modularity = self.modularity(&base, &membership, total_weight);
            let improvement = new_modularity - modularity;
            modularity = new_modularity;
            debug!(pass, communities = count, modularity, "Louvain pass");

            if improvement < self.config.min_improvement {
                break;
            }
            level = level.aggregate(&community, count);
        }

        CommunityPartition::from_groups(&ids, &membership, modularity)
    }

    /// Move nodes between communities until no move improves modularity.
    ///
    /// Returns the community of each node and whether anything moved.
    fn local_moving_phase<R: Rng>(
        &self,
        level: &Level,
        total_weight: f64,
        rng: &mut R,
    ) -> (Vec<usize>, bool) {
        let n = level.len();
        let degrees = level.degrees();
        let mut community: Vec<usize> = (0..n).collect();
        let mut community_degree = degrees.clone();
        let two_m = 2.0 * total_weight;
        let resolution = self.config.resolution;

        // Random order for visiting nodes
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut moved_any = false;
        for _sweep in 0..self.config.max_passes.max(1) {
            let mut moved = false;
            for &node in &order {
                let current = community[node];
                let k = degrees[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&j, &w) in &level.adjacency[node] {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }

                community_degree[current] -= k;
                let gain_for = |c: usize, links_to_c: f64| {
                    links_to_c - resolution * community_degree[c] * k / two_m
                };

                let mut best = current;
                let mut best_gain = gain_for(current, links.get(&current).copied().unwrap_or(0.0));
                for (&c, &w) in &links {
                    let gain = gain_for(c, w);
                    if gain > best_gain + GAIN_EPSILON {
                        best_gain = gain;
                        best = c;
                    }
                }

                community_degree[best] += k;
                if best != current {
                    community[node] = best;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
            moved_any = true;
        }

        (community, moved_any)
    }

    /// Modularity of a partition of the base graph
    fn modularity(&self, base: &Level, community: &[usize], total_weight: f64) -> f64 {
        if total_weight == 0.0 {
            return 0.0;
        }
        let degrees = base.degrees();
        let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
        let mut degree_sum: BTreeMap<usize, f64> = BTreeMap::new();

        for (i, adj) in base.adjacency.iter().enumerate() {
            *degree_sum.entry(community[i]).or_insert(0.0) += degrees[i];
            *internal.entry(community[i]).or_insert(0.0) += base.self_loops[i];
            for (&j, &w) in adj {
                if community[i] == community[j] {
                    *internal.entry(community[i]).or_insert(0.0) += w / 2.0;
                }
            }
        }

        degree_sum
            .iter()
            .map(|(c, &d)| {
                let l = internal.get(c).copied().unwrap_or(0.0);
                l / total_weight - self.config.resolution * (d / (2.0 * total_weight)).powi(2)
            })
            .sum()
    }
}

impl Default for LouvainClustering {
    fn default() -> Self {
        Self::new()
    }
}

/// Renumber labels to be contiguous, in order of first appearance
fn renumber_communities(communities: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let mut next_id = 0usize;

    let renumbered = communities
        .iter()
        .map(|&c| {
            *mapping.entry(c).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            })
        })
        .collect();

    (renumbered, next_id)
}
