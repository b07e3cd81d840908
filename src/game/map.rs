//! Map Graph & Connectivity
//!
//! A map is a static set of lands plus a symmetric border relation. Tables
//! keep their lands in map order, so land `i` of a table is node `i` of its
//! [`Adjacency`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::game::state::{Color, Emoji, Land};

/// Map loading failures.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Map file could not be read.
    #[error("failed to read map {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Map file is not valid JSON.
    #[error("invalid map json: {0}")]
    Json(#[from] serde_json::Error),
    /// Map has no lands.
    #[error("map {0} has no lands")]
    Empty(String),
    /// A land appears twice.
    #[error("duplicate land {0}")]
    DuplicateLand(Emoji),
    /// A border references a land that does not exist.
    #[error("border references unknown land {0}")]
    UnknownLand(Emoji),
    /// A land borders itself.
    #[error("land {0} borders itself")]
    SelfBorder(Emoji),
}

/// On-disk map format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Map name, matched against `TableConfig::map_name`.
    pub name: String,
    /// Land ids in map order.
    pub lands: Vec<Emoji>,
    /// Unordered land pairs that share a border.
    pub borders: Vec<(Emoji, Emoji)>,
}

impl MapDefinition {
    /// Load `<dir>/<name>.json`.
    pub fn load(dir: &Path, name: &str) -> Result<Self, MapError> {
        let path = dir.join(format!("{name}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|source| MapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Offset-row hexagonal grid, `cols` x `rows` cells.
    ///
    /// Cells are named `r{row}c{col}`. Odd rows are shifted right by half a cell.
    pub fn hex_grid(name: &str, cols: usize, rows: usize) -> Self {
        let id = |r: usize, c: usize| format!("r{r}c{c}");
        let mut lands = Vec::with_capacity(cols * rows);
        let mut borders = Vec::new();

        for r in 0..rows {
            for c in 0..cols {
                lands.push(id(r, c));
                if c + 1 < cols {
                    borders.push((id(r, c), id(r, c + 1)));
                }
                if r + 1 < rows {
                    // down-left / down-right depend on row parity
                    let (left, right) = if r % 2 == 0 {
                        (c.checked_sub(1), Some(c))
                    } else {
                        (Some(c), Some(c + 1))
                    };
                    for nc in [left, right].into_iter().flatten() {
                        if nc < cols {
                            borders.push((id(r, c), id(r + 1, nc)));
                        }
                    }
                }
            }
        }

        Self { name: name.to_string(), lands, borders }
    }
}

/// Static border graph of a map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjacency {
    matrix: Vec<Vec<bool>>,
    indexes: BTreeMap<Emoji, usize>,
    order: Vec<Emoji>,
}

impl Adjacency {
    /// Build and validate the graph of a map definition.
    pub fn from_definition(def: &MapDefinition) -> Result<Self, MapError> {
        if def.lands.is_empty() {
            return Err(MapError::Empty(def.name.clone()));
        }

        let mut indexes = BTreeMap::new();
        for (i, emoji) in def.lands.iter().enumerate() {
            if indexes.insert(emoji.clone(), i).is_some() {
                return Err(MapError::DuplicateLand(emoji.clone()));
            }
        }

        let n = def.lands.len();
        let mut matrix = vec![vec![false; n]; n];
        for (a, b) in &def.borders {
            let ia = *indexes.get(a).ok_or_else(|| MapError::UnknownLand(a.clone()))?;
            let ib = *indexes.get(b).ok_or_else(|| MapError::UnknownLand(b.clone()))?;
            if ia == ib {
                return Err(MapError::SelfBorder(a.clone()));
            }
            matrix[ia][ib] = true;
            matrix[ib][ia] = true;
        }

        Ok(Self { matrix, indexes, order: def.lands.clone() })
    }

    /// Number of lands.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True for a map without lands (never produced by `from_definition`).
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Land ids in map order.
    pub fn lands(&self) -> &[Emoji] {
        &self.order
    }

    /// Map index of a land.
    pub fn index_of(&self, emoji: &str) -> Option<usize> {
        self.indexes.get(emoji).copied()
    }

    /// Whether two map indexes share a border.
    #[inline]
    pub fn borders(&self, a: usize, b: usize) -> bool {
        self.matrix
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(false)
    }

    /// Whether two lands share a border.
    pub fn is_border(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(ia), Some(ib)) => self.borders(ia, ib),
            _ => false,
        }
    }

    /// Indexes bordering `index`.
    pub fn neighbour_indexes(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let row = self.matrix.get(index);
        (0..self.len()).filter(move |j| row.map(|r| r[*j]).unwrap_or(false))
    }
}

// =============================================================================
// CONNECTIVITY
// =============================================================================

/// Disjoint-set over land indexes.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Connected groups of `color` lands, as indexes into `lands`.
///
/// Groups are ordered by their smallest land index.
pub fn land_masses(lands: &[Land], adjacency: &Adjacency, color: Color) -> Vec<Vec<usize>> {
    let owned: Vec<usize> = lands
        .iter()
        .enumerate()
        .filter(|(_, l)| l.color == color)
        .map(|(i, _)| i)
        .collect();
    if owned.is_empty() {
        return Vec::new();
    }

    let map_index: Vec<Option<usize>> = lands
        .iter()
        .map(|l| adjacency.index_of(&l.emoji))
        .collect();

    let mut uf = UnionFind::new(lands.len());
    for (pos, &a) in owned.iter().enumerate() {
        for &b in &owned[pos + 1..] {
            if let (Some(ma), Some(mb)) = (map_index[a], map_index[b]) {
                if adjacency.borders(ma, mb) {
                    uf.union(a, b);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &i in &owned {
        let root = uf.find(i);
        groups.entry(root).or_default().push(i);
    }
    let mut masses: Vec<Vec<usize>> = groups.into_values().collect();
    masses.sort_by_key(|m| m[0]);
    masses
}

/// Size of the largest connected group of `color` lands.
pub fn max_connected(lands: &[Land], adjacency: &Adjacency, color: Color) -> usize {
    land_masses(lands, adjacency, color)
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
}

/// Lands bordering `emoji`, as indexes into `lands`.
pub fn neighbours(lands: &[Land], adjacency: &Adjacency, emoji: &str) -> Vec<usize> {
    let Some(origin) = adjacency.index_of(emoji) else {
        return Vec::new();
    };
    lands
        .iter()
        .enumerate()
        .filter(|(_, l)| {
            adjacency
                .index_of(&l.emoji)
                .map(|i| adjacency.borders(origin, i))
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Distinct colors bordering a land, excluding its own.
pub fn bordering_colors(lands: &[Land], adjacency: &Adjacency, emoji: &str) -> BTreeSet<Color> {
    let own = lands.iter().find(|l| l.emoji == emoji).map(|l| l.color);
    neighbours(lands, adjacency, emoji)
        .into_iter()
        .map(|i| lands[i].color)
        .filter(|c| Some(*c) != own)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
