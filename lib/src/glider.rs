//! Canonical `(direction, lane, timing)` description of a diagonal glider.

use crate::cell_list::{Cell, ObjCellList};
use crate::rect::Rect;
use strum::{EnumIter, IntoEnumIterator};

/// Direction a glider travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Direction {
    Nw,
    Ne,
    Se,
    Sw,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::Nw => 0,
            Direction::Ne => 1,
            Direction::Se => 2,
            Direction::Sw => 3,
        }
    }
}

/// `(dir, lane, timing)`: see the module docs for the geometric meaning of
/// `lane` and `timing`.
///
/// `lane` is the x-coordinate of the glider's center cell when the glider is
/// shifted in time so that the center cell has y-coordinate 0, in the phase
/// where three cells form a horizontal line. `timing` is the generation
/// count to reach the phase where the center cell has x-coordinate 0
/// (instead of y-coordinate), counted from the same reference phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glider {
    pub dir: Direction,
    pub lane: i32,
    pub timing: i32,
}

struct GliderData {
    cells: [(u8, u8); 5],
    x_offs: i32,
    y_offs: i32,
    lane_y_dir: i32,
    timing_x_dir: i32,
    timing_y_dir: i32,
}

macro_rules! gd {
    ($cells:expr, $x:expr, $y:expr, $ly:expr, $tx:expr, $ty:expr) => {
        GliderData {
            cells: $cells,
            x_offs: $x,
            y_offs: $y,
            lane_y_dir: $ly,
            timing_x_dir: $tx,
            timing_y_dir: $ty,
        }
    };
}

static GLIDER_DATA: [[GliderData; 4]; 4] = [
    [
        gd!([(0, 0), (1, 0), (2, 0), (0, 1), (1, 2)], -1, -1, -1, 1, 1),
        gd!([(1, 0), (2, 0), (0, 1), (1, 1), (2, 2)], -1, -1, -1, 1, 1),
        gd!([(0, 0), (1, 0), (0, 1), (2, 1), (0, 2)], 0, -1, -1, 1, 1),
        gd!([(1, 0), (0, 1), (1, 1), (0, 2), (2, 2)], 0, -1, -1, 1, 1),
    ],
    [
        gd!([(0, 0), (1, 0), (2, 0), (2, 1), (1, 2)], -1, -1, 1, -1, 1),
        gd!([(0, 0), (1, 0), (1, 1), (2, 1), (0, 2)], -1, -1, 1, -1, 1),
        gd!([(1, 0), (2, 0), (0, 1), (2, 1), (2, 2)], -2, -1, 1, -1, 1),
        gd!([(1, 0), (1, 1), (2, 1), (0, 2), (2, 2)], -2, -1, 1, -1, 1),
    ],
    [
        gd!([(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)], -1, -1, -1, -1, -1),
        gd!([(0, 0), (1, 1), (2, 1), (0, 2), (1, 2)], -1, -1, -1, -1, -1),
        gd!([(2, 0), (0, 1), (2, 1), (1, 2), (2, 2)], -2, -1, -1, -1, -1),
        gd!([(0, 0), (2, 0), (1, 1), (2, 1), (1, 2)], -2, -1, -1, -1, -1),
    ],
    [
        gd!([(1, 0), (0, 1), (0, 2), (1, 2), (2, 2)], -1, -1, 1, 1, -1),
        gd!([(2, 0), (0, 1), (1, 1), (1, 2), (2, 2)], -1, -1, 1, 1, -1),
        gd!([(0, 0), (0, 1), (2, 1), (0, 2), (1, 2)], 0, -1, 1, 1, -1),
        gd!([(0, 0), (2, 0), (0, 1), (1, 1), (1, 2)], 0, -1, 1, 1, -1),
    ],
];

impl Glider {
    pub fn new(dir: Direction, lane: i32, timing: i32) -> Self {
        Self { dir, lane, timing }
    }

    /// The range of `timing` values for which the glider's 3x3 bounding box
    /// can intersect `allowed_rect`.
    pub fn timing_range(dir: Direction, allowed_rect: &Rect) -> (i32, i32) {
        match dir {
            Direction::Nw | Direction::Sw => (
                4 * allowed_rect.left_x - 6,
                4 * (allowed_rect.left_x + allowed_rect.width) + 2,
            ),
            Direction::Ne | Direction::Se => (
                -(4 * (allowed_rect.left_x + allowed_rect.width)) - 2,
                -(4 * allowed_rect.left_x) + 6,
            ),
        }
    }

    /// Set `timing` so the glider has advanced by `progression` generations
    /// relative to the reference phase.
    pub fn set_progression(&mut self, progression: i32) {
        let base = &GLIDER_DATA[self.dir.index()][0];
        self.timing = -progression + base.timing_x_dir * (2 * self.lane);
    }

    /// Translate the glider's reference position by `(offs_x, offs_y)`.
    pub fn shift(&mut self, offs_x: i32, offs_y: i32) {
        let base = &GLIDER_DATA[self.dir.index()][0];
        self.lane += offs_x + base.lane_y_dir * offs_y;
        self.timing += 4 * (base.timing_x_dir * offs_x);
    }

    /// Mirror the glider across its own lane.
    pub fn mirror(&mut self) {
        let base = &GLIDER_DATA[self.dir.index()][0];
        let lane_offs = (-self.lane - 1) - self.lane;
        self.lane += lane_offs;
        self.timing += 2 * (base.timing_x_dir * lane_offs);
    }

    /// Produce this glider's 5-cell pattern at its current phase.
    pub fn to_obj_cell_list(&self, out: &mut ObjCellList) {
        let timing_phase = self.timing.rem_euclid(4);
        let timing_step = (self.timing - timing_phase) / 4;

        let data = &GLIDER_DATA[self.dir.index()][timing_phase as usize];

        let left_x = data.x_offs + data.timing_x_dir * timing_step;
        let top_y = data.y_offs + data.lane_y_dir * self.lane + data.timing_y_dir * timing_step;

        out.clear();
        for &(cx, cy) in &data.cells {
            out.add_on_cell(left_x + cx as i32, top_y + cy as i32);
        }
        debug_assert_eq!(out.obj_rect(), Rect::make(left_x, top_y, 3, 3));
    }

    /// All four directions, for callers that enumerate over them.
    pub fn directions() -> impl Iterator<Item = Direction> {
        Direction::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nw_glider_reference_phase_matches_five_cells() {
        let gl = Glider::new(Direction::Nw, 0, 0);
        let mut ocl = ObjCellList::new(5);
        gl.to_obj_cell_list(&mut ocl);
        assert_eq!(ocl.cell_count(), 5);
        assert_eq!(ocl.obj_rect().width, 3);
        assert_eq!(ocl.obj_rect().height, 3);
    }

    #[test]
    fn shift_and_mirror_round_trip_lane() {
        let mut gl = Glider::new(Direction::Se, 2, 4);
        let original = gl;
        gl.shift(3, -1);
        gl.shift(-3, 1);
        assert_eq!(gl, original);

        let mut gl2 = Glider::new(Direction::Nw, 1, 0);
        gl2.mirror();
        gl2.mirror();
        assert_eq!(gl2, Glider::new(Direction::Nw, 1, 0));
    }

    #[test]
    fn set_progression_advances_phase_deterministically() {
        let mut gl = Glider::new(Direction::Ne, 0, 0);
        gl.set_progression(4);
        let mut a = ObjCellList::new(5);
        gl.to_obj_cell_list(&mut a);
        assert_eq!(a.cell_count(), 5);
    }
}
