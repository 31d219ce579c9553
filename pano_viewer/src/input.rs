//! Pointer bookkeeping for the viewer window. A press that stays within a few
//! pixels of where it started is a click; anything further orbits the camera.

/// Pointer travel (in physical pixels) beyond which a press becomes a drag.
pub const CLICK_SLOP_PX: f32 = 4.0;
pub const ORBIT_RADIANS_PER_PIXEL: f32 = 0.005;
/// Distance multiplier per scroll line; scrolling up moves closer.
const ZOOM_PER_LINE: f32 = 0.9;
/// Pixel-precise touchpads report pixels rather than lines.
const PIXELS_PER_LINE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    None,
    Orbit { dx: f32, dy: f32 },
    Click { x: f32, y: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    origin: [f32; 2],
    last: [f32; 2],
    dragging: bool,
}

#[derive(Debug, Default)]
pub struct PointerTracker {
    position: Option<[f32; 2]>,
    press: Option<Press>,
}

impl PointerTracker {
    pub fn is_dragging(&self) -> bool {
        self.press.is_some_and(|press| press.dragging)
    }

    pub fn moved(&mut self, x: f32, y: f32) -> PointerAction {
        self.position = Some([x, y]);
        let Some(press) = self.press.as_mut() else {
            return PointerAction::None;
        };

        if !press.dragging {
            let travel = (x - press.origin[0]).hypot(y - press.origin[1]);
            if travel <= CLICK_SLOP_PX {
                return PointerAction::None;
            }
            press.dragging = true;
        }

        let action = PointerAction::Orbit {
            dx: x - press.last[0],
            dy: y - press.last[1],
        };
        press.last = [x, y];
        action
    }

    pub fn pressed(&mut self) {
        self.press = self.position.map(|origin| Press {
            origin,
            last: origin,
            dragging: false,
        });
    }

    pub fn released(&mut self) -> PointerAction {
        match self.press.take() {
            Some(press) if !press.dragging => PointerAction::Click {
                x: press.origin[0],
                y: press.origin[1],
            },
            _ => PointerAction::None,
        }
    }

    /// Cursor left the window; any press in progress is abandoned.
    pub fn left(&mut self) {
        self.position = None;
        self.press = None;
    }
}

/// Orbit distance factor for a scroll of `lines` (positive is away from the user).
pub fn scroll_zoom_factor(lines: f32) -> f32 {
    ZOOM_PER_LINE.powf(lines)
}

pub fn pixels_to_lines(pixels: f64) -> f32 {
    pixels as f32 / PIXELS_PER_LINE
}
