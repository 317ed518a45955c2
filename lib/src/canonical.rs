//! D4-orbit canonicalization: pick the lexicographically-lowest-hash
//! orientation of a pattern among its (up to) eight symmetries.
//!
//! Grounded on `GoLUtils_make_canonical`/`GoLUtils_try_canonical` in
//! `golutils.c`: translate the bounding box to the origin, orient so
//! width is never less than height (a diagonal flip if needed), then walk
//! the dihedral group of that square via horizontal/vertical/diagonal
//! flips, keeping whichever orientation hashes lowest. When width equals
//! height all 8 orientations are distinct group elements to try; otherwise
//! only the 4 orientations that preserve the width/height ordering apply.

use crate::grid::GoLGrid;
use crate::random_array::RandomDataArray;
use crate::rect::Rect;

fn try_canonical(candidate: &GoLGrid, dst: &mut GoLGrid, lowest_hash: &mut u64, rda: &RandomDataArray) {
    let hash = candidate.get_hash(rda);
    if hash < *lowest_hash {
        *lowest_hash = hash;
        dst.copy_from(candidate);
    }
}

/// Canonicalize `src` into a fresh `side`x`side` grid (`side` must be a
/// multiple of 64 and large enough to hold `src`'s bounding box) and
/// return it along with its hash. The canonical grid's virtual position is
/// always `(0, 0)`.
pub fn make_canonical(src: &GoLGrid, side: i32, rda: &RandomDataArray) -> (GoLGrid, u64) {
    let square = || GoLGrid::create(Rect::make(0, 0, side, side));
    let mut dst = square();

    if src.is_empty() {
        let hash = dst.get_hash(rda);
        return (dst, hash);
    }

    let bb0 = src.get_bounding_box();
    let mut temp1 = square();
    src.copy_unmatched(&mut temp1, -bb0.left_x, -bb0.top_y);
    let mut temp2 = square();

    let bb = temp1.get_bounding_box();
    if bb.height > bb.width {
        temp1.flip_diagonally(&mut temp2);
        std::mem::swap(&mut temp1, &mut temp2);
    }

    let mut lowest_hash = temp1.get_hash(rda);
    dst.copy_from(&temp1);

    if bb.height == bb.width {
        temp1.flip_horizontally(&mut temp2);
        try_canonical(&temp2, &mut dst, &mut lowest_hash, rda);
        temp2.flip_vertically(&mut temp1);
        try_canonical(&temp1, &mut dst, &mut lowest_hash, rda);
        temp1.flip_horizontally(&mut temp2);
        try_canonical(&temp2, &mut dst, &mut lowest_hash, rda);

        temp2.flip_diagonally(&mut temp1);
        try_canonical(&temp1, &mut dst, &mut lowest_hash, rda);
    }

    temp1.flip_horizontally(&mut temp2);
    try_canonical(&temp2, &mut dst, &mut lowest_hash, rda);
    temp2.flip_vertically(&mut temp1);
    try_canonical(&temp1, &mut dst, &mut lowest_hash, rda);
    temp1.flip_horizontally(&mut temp2);
    try_canonical(&temp2, &mut dst, &mut lowest_hash, rda);

    (dst, lowest_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_array::{RandomDataArray, RandomSeed};

    fn rda() -> RandomDataArray {
        let mut seed = RandomSeed::new(9, 1, false);
        RandomDataArray::create(64 * 64, &mut seed)
    }

    fn place(grid: &mut GoLGrid, cells: &[(i32, i32)]) {
        for &(x, y) in cells {
            grid.set_cell_on(x, y);
        }
    }

    #[test]
    fn canonical_form_is_independent_of_input_orientation() {
        let rda = rda();

        let mut l_tromino = GoLGrid::create(Rect::make(0, 0, 64, 64));
        place(&mut l_tromino, &[(5, 5), (6, 5), (5, 6)]);

        let mut flipped = GoLGrid::create(Rect::make(0, 0, 64, 64));
        l_tromino.flip_horizontally(&mut flipped);

        let mut rotated = GoLGrid::create(Rect::make(0, 0, 64, 64));
        let mut scratch = GoLGrid::create(Rect::make(0, 0, 64, 64));
        l_tromino.flip_diagonally(&mut scratch);
        scratch.flip_horizontally(&mut rotated);

        let (_, hash_a) = make_canonical(&l_tromino, 64, &rda);
        let (_, hash_b) = make_canonical(&flipped, 64, &rda);
        let (_, hash_c) = make_canonical(&rotated, 64, &rda);
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a, hash_c);
    }

    #[test]
    fn canonical_form_sets_virtual_position_to_origin() {
        let rda = rda();
        let mut g = GoLGrid::create(Rect::make(-30, 40, 64, 64));
        place(&mut g, &[(-25, 45), (-24, 45)]);

        let (canon, _) = make_canonical(&g, 64, &rda);
        assert_eq!(canon.get_bounding_box().left_x, 0);
        assert_eq!(canon.get_bounding_box().top_y, 0);
    }

    #[test]
    fn empty_pattern_canonicalizes_to_empty() {
        let rda = rda();
        let g = GoLGrid::create(Rect::make(0, 0, 64, 64));
        let (canon, _) = make_canonical(&g, 64, &rda);
        assert!(canon.is_empty());
    }

    #[test]
    fn asymmetric_pattern_is_not_equal_to_all_its_own_flips() {
        let rda = rda();
        let mut g = GoLGrid::create(Rect::make(0, 0, 64, 64));
        place(&mut g, &[(1, 1), (2, 1), (1, 2)]);
        let mut flipped = GoLGrid::create(Rect::make(0, 0, 64, 64));
        g.flip_horizontally(&mut flipped);
        assert!(!g.is_equal(&flipped));

        let (_, hash_g) = make_canonical(&g, 64, &rda);
        let (_, hash_flipped) = make_canonical(&flipped, 64, &rda);
        assert_eq!(hash_g, hash_flipped);
    }
}
