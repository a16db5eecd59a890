use serde::{Deserialize, Serialize};

/// The kind of domain a term integrates over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Volume,
    Surface,
}

/// A set of cells, split by element group.
///
/// For volume regions the cells are element indices of the group's volume approximation. For
/// surface regions the cells are the indices of the elements owning each face, while the
/// face data of the surface approximation is addressed by the position of the face within the
/// region (the *local* index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    name: String,
    kind: GeometryKind,
    cells: Vec<Vec<usize>>,
}

impl Region {
    /// Creates a volume region from the cells of each group.
    ///
    /// Cells are sorted, so that chunking visits them in ascending order.
    pub fn volume(name: impl Into<String>, cells: Vec<Vec<usize>>) -> Self {
        Self::new(name.into(), GeometryKind::Volume, cells)
    }

    /// Creates a surface region from the owning element of each face, per group.
    ///
    /// Faces keep the given order, since it defines the local face numbering of the surface
    /// approximation.
    pub fn surface(name: impl Into<String>, cells: Vec<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            kind: GeometryKind::Surface,
            cells,
        }
    }

    fn new(name: String, kind: GeometryKind, mut cells: Vec<Vec<usize>>) -> Self {
        for group_cells in &mut cells {
            group_cells.sort_unstable();
            group_cells.dedup();
        }
        Self { name, kind, cells }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn num_groups(&self) -> usize {
        self.cells.len()
    }

    /// The cells of the region in the given group. Empty if the region does not touch the group.
    pub fn cells(&self, group: usize) -> &[usize] {
        self.cells.get(group).map(Vec::as_slice).unwrap_or(&[])
    }
}
