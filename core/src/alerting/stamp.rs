use crate::interface::Frame;

const GLYPH_WIDTH: usize = 3;
const GLYPH_HEIGHT: usize = 5;
const INK: [u8; 3] = [255, 255, 255];
const BACKDROP: [u8; 3] = [0, 0, 0];

// 3x5 bitmaps, one row per byte, most significant of the low three bits on the left.
fn glyph(c: char) -> Option<[u8; GLYPH_HEIGHT]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        's' => [0b000, 0b011, 0b100, 0b001, 0b110],
        _ => return None,
    };
    Some(rows)
}

/// Returns a copy of `frame` with `captured_at` burned into the top-left corner.
///
/// Glyphs scale with the frame height and are clipped on frames too small to
/// hold the whole label.
pub fn stamp_capture_time(frame: &Frame, captured_at: f64) -> Frame {
    let label = format!("{:.2}s", captured_at);
    let scale = (frame.height() / 60).clamp(1, 4);
    let advance = (GLYPH_WIDTH + 1) * scale;

    let mut stamped = frame.clone();
    stamped.fill_rect(
        0,
        0,
        label.chars().count() * advance + scale,
        GLYPH_HEIGHT * scale + 2 * scale,
        BACKDROP,
    );
    for (position, c) in label.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let left = scale + position * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    let x = left + col * scale;
                    let y = scale + row * scale;
                    stamped.fill_rect(x, y, x + scale, y + scale, INK);
                }
            }
        }
    }
    stamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_times_produce_different_pixels() {
        let source = Frame::filled(64, 32, [0, 90, 160]);
        let early = stamp_capture_time(&source, 1.0);
        let late = stamp_capture_time(&source, 1.5);
        assert_ne!(early, late);
        assert_ne!(early, source);
        assert_eq!(source.pixel(0, 0), Some([0, 90, 160]));
    }

    #[test]
    fn label_leaves_the_rest_of_the_frame_alone() {
        let source = Frame::filled(64, 32, [0, 90, 160]);
        let stamped = stamp_capture_time(&source, 12.25);
        assert_eq!(stamped.pixel(0, 0), Some(BACKDROP));
        assert_eq!(stamped.pixel(63, 31), Some([0, 90, 160]));
        // First stroke of the leading "1".
        assert_eq!(stamped.pixel(2, 1), Some(INK));
    }

    #[test]
    fn tiny_frames_are_clipped_not_rejected() {
        let source = Frame::filled(2, 2, [10, 10, 10]);
        let stamped = stamp_capture_time(&source, 3.0);
        assert_eq!(stamped.width(), 2);
        assert_eq!(stamped.height(), 2);
    }
}
