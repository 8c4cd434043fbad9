//! Quadtree over node positions
//!
//! Cells are stored in a flat arena. For Barnes-Hut each cell carries the
//! total charge of the points below it and their charge-weighted centroid,
//! so distant cells can stand in for all of their points. Collision only
//! needs the cell bounds, see [`QuadTree::index`].

/// Stop subdividing below this depth; deeper points share a leaf
const MAX_DEPTH: usize = 48;

#[derive(Debug, Clone)]
enum Contents {
    Leaf(Vec<usize>),
    Internal([Option<usize>; 4]),
}

#[derive(Debug, Clone)]
pub(crate) struct Cell {
    x0: f64,
    y0: f64,
    pub size: f64,
    contents: Contents,
    /// Sum of the charges below this cell
    pub charge: f64,
    /// Charge-weighted centroid
    pub cx: f64,
    pub cy: f64,
}

impl Cell {
    fn new(x0: f64, y0: f64, size: f64) -> Self {
        Self {
            x0,
            y0,
            size,
            contents: Contents::Leaf(Vec::new()),
            charge: 0.0,
            cx: 0.0,
            cy: 0.0,
        }
    }

    /// Point indices of a leaf, `None` for internal cells
    pub fn points(&self) -> Option<&[usize]> {
        match &self.contents {
            Contents::Leaf(points) => Some(points),
            Contents::Internal(_) => None,
        }
    }

    /// Whether any part of the cell lies within `reach` of `(x, y)` on both axes
    pub fn near(&self, x: f64, y: f64, reach: f64) -> bool {
        x + reach >= self.x0
            && x - reach <= self.x0 + self.size
            && y + reach >= self.y0
            && y - reach <= self.y0 + self.size
    }

    pub fn children(&self) -> impl Iterator<Item = usize> + '_ {
        let children: &[Option<usize>] = match &self.contents {
            Contents::Internal(children) => children,
            Contents::Leaf(_) => &[],
        };
        children.iter().flatten().copied()
    }

    fn quadrant(&self, x: f64, y: f64) -> usize {
        let half = self.size / 2.0;
        let right = x >= self.x0 + half;
        let bottom = y >= self.y0 + half;
        usize::from(right) | (usize::from(bottom) << 1)
    }

    fn child_origin(&self, quadrant: usize) -> (f64, f64) {
        let half = self.size / 2.0;
        (
            self.x0 + if quadrant & 1 == 1 { half } else { 0.0 },
            self.y0 + if quadrant & 2 == 2 { half } else { 0.0 },
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct QuadTree {
    cells: Vec<Cell>,
}

impl QuadTree {
    /// Build a tree over `points`, where `charges[i]` belongs to `points[i]`
    pub fn build(points: &[(f64, f64)], charges: &[f64]) -> Self {
        let mut tree = Self::index(points);
        if tree.root().is_some() {
            tree.accumulate(0, points, charges);
        }
        tree
    }

    /// Build a tree over `points` without charges, for range queries
    pub fn index(points: &[(f64, f64)]) -> Self {
        let mut tree = Self { cells: Vec::new() };
        if points.is_empty() {
            return tree;
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        // Slightly larger than the extent so the max edge falls inside
        let size = (max_x - min_x).max(max_y - min_y).max(1.0) * (1.0 + 1e-9);
        tree.cells.push(Cell::new(min_x, min_y, size));

        for i in 0..points.len() {
            tree.insert(0, i, points, 0);
        }
        tree
    }

    pub fn root(&self) -> Option<&Cell> {
        self.cells.first()
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    fn insert(&mut self, cell: usize, point: usize, points: &[(f64, f64)], depth: usize) {
        let (x, y) = points[point];
        match &mut self.cells[cell].contents {
            Contents::Leaf(existing) => {
                let coincident = existing.iter().all(|&p| points[p] == (x, y));
                if coincident || depth >= MAX_DEPTH {
                    existing.push(point);
                    return;
                }
                let displaced = std::mem::take(existing);
                self.cells[cell].contents = Contents::Internal([None; 4]);
                for p in displaced {
                    self.insert_into_child(cell, p, points, depth);
                }
                self.insert_into_child(cell, point, points, depth);
            }
            Contents::Internal(_) => self.insert_into_child(cell, point, points, depth),
        }
    }

    fn insert_into_child(&mut self, cell: usize, point: usize, points: &[(f64, f64)], depth: usize) {
        let (x, y) = points[point];
        let quadrant = self.cells[cell].quadrant(x, y);
        let existing = match &self.cells[cell].contents {
            Contents::Internal(children) => children[quadrant],
            Contents::Leaf(_) => None,
        };
        let child = match existing {
            Some(child) => child,
            None => {
                let (x0, y0) = self.cells[cell].child_origin(quadrant);
                let size = self.cells[cell].size / 2.0;
                self.cells.push(Cell::new(x0, y0, size));
                let child = self.cells.len() - 1;
                if let Contents::Internal(children) = &mut self.cells[cell].contents {
                    children[quadrant] = Some(child);
                }
                child
            }
        };
        self.insert(child, point, points, depth + 1);
    }

    fn accumulate(&mut self, cell: usize, points: &[(f64, f64)], charges: &[f64]) {
        let mut charge = 0.0;
        let mut weight = 0.0;
        let (mut sx, mut sy) = (0.0, 0.0);

        match self.cells[cell].contents.clone() {
            Contents::Leaf(members) => {
                for p in members {
                    let (x, y) = points[p];
                    let c = charges[p];
                    charge += c;
                    weight += c.abs();
                    sx += c.abs() * x;
                    sy += c.abs() * y;
                }
            }
            Contents::Internal(children) => {
                for child in children.into_iter().flatten() {
                    self.accumulate(child, points, charges);
                    let c = &self.cells[child];
                    charge += c.charge;
                    weight += c.charge.abs();
                    sx += c.charge.abs() * c.cx;
                    sy += c.charge.abs() * c.cy;
                }
            }
        }

        let c = &mut self.cells[cell];
        c.charge = charge;
        if weight > 0.0 {
            c.cx = sx / weight;
            c.cy = sy / weight;
        } else {
            c.cx = c.x0 + c.size / 2.0;
            c.cy = c.y0 + c.size / 2.0;
        }
    }
}
