//! Cells from intersections, tables from cells, rows from tables.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::intersections::{Intersection, Intersections};
use super::types::{BBox, KeyF64, KeyPoint, Rotation, key_f64};

/// Builds the minimal cells bounded by edge-connected vertices.
///
/// Vertices are visited in ascending (x, y) order. For each, the first
/// vertex below it (nearest first) and the first vertex to its right whose
/// shared bottom-right corner is connected to both define the cell.
pub fn intersections_to_cells(intersections: &Intersections) -> Vec<BBox> {
    let mut points: Vec<KeyPoint> = intersections.keys().copied().collect();
    points.sort();
    let nodes: Vec<&Intersection> = points.iter().map(|p| &intersections[p]).collect();

    let mut index: FxHashMap<KeyPoint, usize> = FxHashMap::default();
    let mut on_v: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    let mut on_h: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for (pid, (point, node)) in points.iter().zip(&nodes).enumerate() {
        index.insert(*point, pid);
        for id in &node.v {
            on_v.entry(id.0).or_default().push(pid);
        }
        for id in &node.h {
            on_h.entry(id.0).or_default().push(pid);
        }
    }
    // pids follow (x, y) order: per vertical edge that is y order, per
    // horizontal edge x order

    let connects = |a: usize, b: usize| -> bool {
        if points[a].0 == points[b].0 {
            nodes[a].shares_v(nodes[b])
        } else if points[a].1 == points[b].1 {
            nodes[a].shares_h(nodes[b])
        } else {
            false
        }
    };

    let following = |lists: &FxHashMap<usize, Vec<usize>>, ids: &[usize], pid: usize| {
        let mut out: Vec<usize> = Vec::new();
        for id in ids {
            if let Some(pids) = lists.get(id)
                && let Some(pos) = pids.iter().position(|p| *p == pid)
            {
                out.extend_from_slice(&pids[pos + 1..]);
            }
        }
        out
    };

    let mut cells = Vec::new();
    for (pid, point) in points.iter().enumerate() {
        let v_ids: Vec<usize> = nodes[pid].v.iter().map(|id| id.0).collect();
        let h_ids: Vec<usize> = nodes[pid].h.iter().map(|id| id.0).collect();

        let mut below = following(&on_v, &v_ids, pid);
        below.sort_by_key(|p| points[*p].1);
        below.dedup();
        let mut right = following(&on_h, &h_ids, pid);
        right.sort_by_key(|p| points[*p].0);
        right.dedup();

        'below: for &below_id in &below {
            if !connects(pid, below_id) {
                continue;
            }
            for &right_id in &right {
                if !connects(pid, right_id) {
                    continue;
                }
                let corner = (points[right_id].0, points[below_id].1);
                if let Some(&corner_id) = index.get(&corner)
                    && connects(corner_id, right_id)
                    && connects(corner_id, below_id)
                {
                    cells.push(BBox::new(
                        point.0.into_inner(),
                        point.1.into_inner(),
                        corner.0.into_inner(),
                        corner.1.into_inner(),
                    ));
                    break 'below;
                }
            }
        }
    }
    cells
}

/// Groups cells sharing corners into tables.
///
/// Tables of a single cell are dropped. Output is ordered by the smallest
/// (top, x0) of each table's cells.
pub fn cells_to_tables(cells: &[BBox]) -> Vec<Vec<BBox>> {
    let mut corner_map: FxHashMap<KeyPoint, Vec<usize>> = FxHashMap::default();
    for (idx, cell) in cells.iter().enumerate() {
        for corner in cell.corners() {
            corner_map.entry(corner).or_default().push(idx);
        }
    }

    let mut visited = vec![false; cells.len()];
    let mut tables: Vec<Vec<BBox>> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    for start in 0..cells.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        let mut group = Vec::new();
        while let Some(idx) = queue.pop_front() {
            group.push(cells[idx]);
            for corner in cells[idx].corners() {
                for &neighbor in corner_map.get(&corner).into_iter().flatten() {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        if group.len() > 1 {
            tables.push(group);
        }
    }

    let anchor = |t: &Vec<BBox>| -> (KeyF64, KeyF64) {
        t.iter()
            .map(|c| (key_f64(c.top), key_f64(c.x0)))
            .min()
            .unwrap_or_default()
    };
    tables.sort_by_key(anchor);
    tables
}

/// A row of a table; `None` marks a grid gap.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CellGroup {
    pub cells: Vec<Option<BBox>>,
}

impl CellGroup {
    /// Box around the present cells; `None` when every slot is a gap.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::enclosing(self.cells.iter().flatten().copied())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Arranges cells into rows according to the page rotation.
///
/// Cells with an identical row key share a row. Every row is laid out over
/// the table's distinct column keys, so missing cells show up as gaps.
pub fn rows(cells: &[BBox], rotation: Rotation) -> Vec<CellGroup> {
    let layout = rotation.row_layout();
    let row_sort = |c: &BBox| key_f64(layout.row_key.key(c) * layout.row_order.sign());
    let col_sort = |c: &BBox| key_f64(layout.col_key.key(c) * layout.col_order.sign());

    let mut sorted = cells.to_vec();
    sorted.sort_by_key(|c| (row_sort(c), col_sort(c)));

    let mut columns: Vec<KeyF64> = sorted.iter().map(col_sort).collect();
    columns.sort();
    columns.dedup();

    let mut groups: Vec<CellGroup> = Vec::new();
    let mut current: FxHashMap<KeyF64, BBox> = FxHashMap::default();
    let mut current_key: Option<KeyF64> = None;
    let flush = |row: &mut FxHashMap<KeyF64, BBox>, groups: &mut Vec<CellGroup>| {
        groups.push(CellGroup {
            cells: columns.iter().map(|k| row.get(k).copied()).collect(),
        });
        row.clear();
    };
    for cell in sorted {
        let key = row_sort(&cell);
        if current_key.is_some_and(|k| k != key) {
            flush(&mut current, &mut groups);
        }
        current_key = Some(key);
        current.insert(col_sort(&cell), cell);
    }
    if current_key.is_some() {
        flush(&mut current, &mut groups);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::intersections::edges_to_intersections;
    use crate::table::types::{EdgeKind, EdgeObj};

    fn grid_edges(xs: &[f64], ys: &[f64]) -> Vec<EdgeObj> {
        let (x0, x1) = (xs[0], xs[xs.len() - 1]);
        let (y0, y1) = (ys[0], ys[ys.len() - 1]);
        let mut edges: Vec<EdgeObj> = xs
            .iter()
            .map(|x| EdgeObj::vertical(*x, y0, y1, EdgeKind::Line))
            .collect();
        edges.extend(
            ys.iter()
                .map(|y| EdgeObj::horizontal(*y, x0, x1, EdgeKind::Line)),
        );
        edges
    }

    #[test]
    fn two_by_two_grid_gives_four_cells() {
        let edges = grid_edges(&[0.0, 10.0, 20.0], &[0.0, 10.0, 20.0]);
        let (_, points) = edges_to_intersections(&edges, 3.0, 3.0);
        let cells = intersections_to_cells(&points);
        assert_eq!(
            cells,
            vec![
                BBox::new(0.0, 0.0, 10.0, 10.0),
                BBox::new(0.0, 10.0, 10.0, 20.0),
                BBox::new(10.0, 0.0, 20.0, 10.0),
                BBox::new(10.0, 10.0, 20.0, 20.0),
            ]
        );
    }

    #[test]
    fn unconnected_vertices_form_no_cell() {
        // two disjoint crosses
        let edges = vec![
            EdgeObj::vertical(0.0, -5.0, 5.0, EdgeKind::Line),
            EdgeObj::horizontal(0.0, -5.0, 5.0, EdgeKind::Line),
            EdgeObj::vertical(50.0, 45.0, 55.0, EdgeKind::Line),
            EdgeObj::horizontal(50.0, 45.0, 55.0, EdgeKind::Line),
        ];
        let (_, points) = edges_to_intersections(&edges, 3.0, 3.0);
        assert_eq!(points.len(), 2);
        assert!(intersections_to_cells(&points).is_empty());
    }

    #[test]
    fn corner_sharing_groups_and_singletons_dropped() {
        let cells = vec![
            BBox::new(100.0, 0.0, 110.0, 10.0),
            BBox::new(0.0, 50.0, 10.0, 60.0),
            BBox::new(10.0, 60.0, 20.0, 70.0),
            BBox::new(200.0, 200.0, 210.0, 210.0),
            BBox::new(110.0, 0.0, 120.0, 10.0),
        ];
        let tables = cells_to_tables(&cells);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0][0], BBox::new(100.0, 0.0, 110.0, 10.0));
        assert_eq!(tables[0].len(), 2);
        assert_eq!(tables[1].len(), 2);
    }

    #[test]
    fn rows_pad_gaps() {
        let cells = vec![
            BBox::new(0.0, 0.0, 10.0, 10.0),
            BBox::new(10.0, 0.0, 20.0, 10.0),
            BBox::new(0.0, 10.0, 20.0, 20.0),
        ];
        let rows = rows(&cells, Rotation::R0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells, vec![Some(BBox::new(0.0, 10.0, 20.0, 20.0)), None]);
        assert_eq!(rows[1].bbox(), Some(BBox::new(0.0, 10.0, 20.0, 20.0)));
    }

    #[test]
    fn rotation_reverses_order() {
        let cells = vec![
            BBox::new(0.0, 0.0, 10.0, 10.0),
            BBox::new(10.0, 0.0, 20.0, 10.0),
            BBox::new(0.0, 10.0, 10.0, 20.0),
            BBox::new(10.0, 10.0, 20.0, 20.0),
        ];
        let upright = rows(&cells, Rotation::R0);
        let flipped = rows(&cells, Rotation::R180);
        assert_eq!(upright[0].cells[0], Some(cells[0]));
        assert_eq!(flipped[0].cells[0], Some(cells[3]));
        assert_eq!(flipped[1].cells[1], Some(cells[0]));

        let quarter = rows(&cells, Rotation::R90);
        // rows run along x, columns descend in y
        assert_eq!(quarter[0].cells, vec![Some(cells[2]), Some(cells[0])]);
    }

    #[test]
    fn all_gap_group_has_no_bbox() {
        let group = CellGroup {
            cells: vec![None, None],
        };
        assert_eq!(group.bbox(), None);
    }
}
