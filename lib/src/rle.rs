//! LifeHistory run-length-encoded output, without the `x = ... rule = ...`
//! header.
//!
//! Grounded on `GoLGrid_print_life_history_full` in `gridmisc.c`: the same
//! run-coalescing algorithm (an on/off run plus a pending end-of-row "$"
//! run, each flushed only when the state changes), reduced to the two
//! states this crate ever emits (on/off — no marked/envelope/special
//! overlays) and to spec.md's simplification of always emitting on one
//! line rather than line-wrapping at a column count: the original inserts
//! real newlines once a line exceeds its cap, this returns `None` instead
//! so a caller never produces a spec-violating multi-line pattern.

use crate::cell_list::ObjCellList;
use crate::rect::Rect;

const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

fn flush_run(out: &mut String, symbol: char, count: i32) {
    if count == 0 {
        return;
    } else if count == 1 {
        out.push(symbol);
    } else {
        out.push_str(&count.to_string());
        out.push(symbol);
    }
}

/// Encode the on-cells in `rect` (queried via `is_on`) as a single-line
/// LifeHistory body terminated by `!`. Returns `None` if the encoding would
/// exceed `max_line_length` characters, excluding the terminator.
pub fn format_life_history_body(
    rect: Rect,
    is_on: impl Fn(i32, i32) -> bool,
    max_line_length: usize,
) -> Option<String> {
    let mut out = String::new();
    let mut unwritten_state = false;
    let mut unwritten_count = 0i32;
    let mut unwritten_newline_count = 0i32;

    for y in rect.top_y..rect.bottom_y() {
        for x in rect.left_x..rect.right_x() {
            let cell_on = is_on(x, y);

            if unwritten_newline_count > 0 && cell_on {
                flush_run(&mut out, '$', unwritten_newline_count);
                unwritten_newline_count = 0;
            }

            if unwritten_count > 0 && cell_on != unwritten_state {
                let symbol = if unwritten_state { 'o' } else { 'b' };
                flush_run(&mut out, symbol, unwritten_count);
                unwritten_count = 0;
            }

            unwritten_state = cell_on;
            unwritten_count += 1;
        }

        if unwritten_count > 0 && unwritten_state {
            flush_run(&mut out, 'o', unwritten_count);
        }
        unwritten_count = 0;
        unwritten_newline_count += 1;
    }

    if out.len() > max_line_length {
        return None;
    }

    out.push('!');
    Some(out)
}

/// Encode an [`ObjCellList`] as a LifeHistory body using the crate's default
/// wrap cap.
pub fn format_cell_list(obj: &ObjCellList) -> Option<String> {
    let rect = Rect::make(0, 0, obj.obj_rect().width, obj.obj_rect().height);
    let cells = obj.cells();
    format_life_history_body(
        rect,
        |x, y| cells.iter().any(|c| c.x as i32 == x && c.y as i32 == y),
        DEFAULT_MAX_LINE_LENGTH,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glider_round_trips_through_parse_and_format() {
        let mut list = ObjCellList::new(16);
        assert!(list.parse_rle("bob$2bo$3o!"));
        let encoded = format_cell_list(&list).expect("fits on one line");

        let mut reparsed = ObjCellList::new(16);
        assert!(reparsed.parse_rle(&encoded));
        assert_eq!(reparsed.obj_rect(), list.obj_rect());
        assert_eq!(reparsed.cells(), list.cells());
    }

    #[test]
    fn block_encodes_as_two_on_runs() {
        let mut list = ObjCellList::new(8);
        assert!(list.parse_rle("2o$2o!"));
        let encoded = format_cell_list(&list).unwrap();
        assert_eq!(encoded, "2o$2o!");
    }

    #[test]
    fn empty_rect_encodes_to_bare_terminator() {
        let empty = ObjCellList::new(4);
        let encoded = format_cell_list(&empty).unwrap();
        assert_eq!(encoded, "!");
    }

    #[test]
    fn oversized_pattern_is_rejected_rather_than_wrapped() {
        let rect = Rect::make(0, 0, 2000, 1);
        let result = format_life_history_body(rect, |_, _| true, 64);
        assert!(result.is_none());
    }
}
