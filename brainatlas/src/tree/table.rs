//! Flat tabular projection of a region tree.
//!
//! A pure read-only view for bulk inspection: one row per region with its
//! identifier, acronym, name, and ancestor path. Rendering is plain
//! aligned text; anything fancier belongs to the consumer.

use std::fmt;

use super::RegionTree;

/// One row of the tabular projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    /// Region identifier.
    pub id: u32,

    /// Short unique label.
    pub acronym: String,

    /// Full display name.
    pub name: String,

    /// Identifier path from the root to this region, inclusive.
    pub path: Vec<u32>,
}

/// Tabular projection of a [`RegionTree`], ordered by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    rows: Vec<RegionRow>,
}

impl RegionTable {
    pub(super) fn from_tree(tree: &RegionTree) -> Self {
        let mut rows: Vec<RegionRow> = tree
            .iter()
            .map(|node| RegionRow {
                id: node.id(),
                acronym: node.acronym().to_string(),
                name: node.name().to_string(),
                path: node.path().to_vec(),
            })
            .collect();
        rows.sort_unstable_by_key(|row| row.id);

        Self { rows }
    }

    /// Rows ordered by identifier.
    pub fn rows(&self) -> &[RegionRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for RegionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id_width = self
            .rows
            .iter()
            .map(|r| r.id.to_string().len())
            .max()
            .unwrap_or(2)
            .max("id".len());
        let acronym_width = self
            .rows
            .iter()
            .map(|r| r.acronym.len())
            .max()
            .unwrap_or(7)
            .max("acronym".len());

        writeln!(
            f,
            "{:>id_width$}  {:<acronym_width$}  {}",
            "id", "acronym", "name"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>id_width$}  {:<acronym_width$}  {}",
                row.id, row.acronym, row.name
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{RegionRecord, RegionTree};

    fn sample_tree() -> RegionTree {
        let records = vec![
            RegionRecord {
                id: 1,
                acronym: "grey".to_string(),
                name: "Grey matter".to_string(),
                structure_id_path: vec![1],
                rgb_triplet: [128, 128, 128],
            },
            RegionRecord {
                id: 2,
                acronym: "CH".to_string(),
                name: "Cerebrum".to_string(),
                structure_id_path: vec![1, 2],
                rgb_triplet: [176, 240, 255],
            },
        ];
        RegionTree::build(records).unwrap()
    }

    #[test]
    fn test_rows_ordered_by_id() {
        let table = sample_tree().to_table();

        let ids: Vec<u32> = table.rows().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_rows_carry_paths() {
        let table = sample_tree().to_table();
        assert_eq!(table.rows()[1].path, vec![1, 2]);
    }

    #[test]
    fn test_display_contains_every_acronym() {
        let rendered = sample_tree().to_table().to_string();

        assert!(rendered.contains("id"));
        assert!(rendered.contains("grey"));
        assert!(rendered.contains("Cerebrum"));
    }
}
