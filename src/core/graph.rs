// table relationship graph built from foreign keys
// undirected, neighbors kept sorted so path search is deterministic

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use super::heuristics::TablePath;
use super::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaGraph {
    adjacency: BTreeMap<String, Vec<String>>,
}

impl SchemaGraph {
    pub fn build(schema: &Schema) -> Self {
        Self::from_edges(
            schema
                .foreign_keys
                .iter()
                .map(|fk| (fk.table.as_str(), fk.referred_table.as_str())),
        )
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (a, b) in edges {
            if a.is_empty() || b.is_empty() {
                continue;
            }
            sets.entry(a.to_string()).or_default().insert(b.to_string());
            sets.entry(b.to_string()).or_default().insert(a.to_string());
        }

        let adjacency = sets
            .into_iter()
            .map(|(table, neighbors)| (table, neighbors.into_iter().collect()))
            .collect();

        Self { adjacency }
    }

    pub fn neighbors(&self, table: &str) -> &[String] {
        self.adjacency.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shortest path by edge count (BFS). `[start]` when start == end,
    /// empty when the tables are not connected.
    pub fn find_join_path(&self, start: &str, end: &str) -> Vec<String> {
        if start == end {
            return vec![start.to_string()];
        }

        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<Vec<&str>> = VecDeque::from([vec![start]]);

        while let Some(path) = queue.pop_front() {
            let Some(&node) = path.last() else {
                continue;
            };

            for neighbor in self.neighbors(node) {
                if !visited.insert(neighbor.as_str()) {
                    continue;
                }

                let mut next = path.clone();
                next.push(neighbor.as_str());

                if neighbor == end {
                    return next.into_iter().map(str::to_string).collect();
                }
                queue.push_back(next);
            }
        }

        vec![]
    }

    /// Paths for every `i < j` pair of tables, in the order given.
    pub fn join_paths(&self, tables: &[String]) -> Vec<TablePath> {
        let mut paths = Vec::new();

        for (i, left) in tables.iter().enumerate() {
            for right in &tables[i + 1..] {
                let path = self.find_join_path(left, right);
                if !path.is_empty() {
                    paths.push(TablePath {
                        from: left.clone(),
                        to: right.clone(),
                        path,
                    });
                }
            }
        }

        paths
    }
}
