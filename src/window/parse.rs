//! X-style geometry strings: `[=][<width>{xX}<height>][{+-}<xoffset>{+-}<yoffset>]`.

use bitflags::bitflags;
use log::debug;

use super::WindowId;
use crate::error::{CasementError, Result};
use crate::hints::{GeometryHints, Gravity, HintFlags};
use crate::registry::{window_entry, WindowRegistry};

bitflags! {
    /// Which parts of a geometry string were present
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GeometryMask: u32 {
        const X_VALUE = 1 << 0;
        const Y_VALUE = 1 << 1;
        const WIDTH_VALUE = 1 << 2;
        const HEIGHT_VALUE = 1 << 3;
        const X_NEGATIVE = 1 << 4;
        const Y_NEGATIVE = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsedGeometry {
    pub mask: GeometryMask,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Optionally signed decimal at the start of `input`; `None` without digits
fn read_integer(input: &str) -> Option<(i32, &str)> {
    let (negative, rest) = match input.as_bytes().first() {
        Some(b'+') => (false, &input[1..]),
        Some(b'-') => (true, &input[1..]),
        _ => (false, input),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let value = rest[..digits]
        .bytes()
        .fold(0i32, |acc, d| acc.saturating_mul(10).saturating_add(i32::from(d - b'0')));
    Some((if negative { -value } else { value }, &rest[digits..]))
}

/// Parse a geometry string. Any malformed part, including trailing garbage,
/// yields an empty mask.
pub fn parse(input: &str) -> ParsedGeometry {
    fn inner(input: &str) -> Option<ParsedGeometry> {
        let mut parsed = ParsedGeometry::default();
        let mut rest = input.strip_prefix('=').unwrap_or(input);

        if !rest.is_empty() && !rest.starts_with(['+', '-', 'x', 'X']) {
            let (width, tail) = read_integer(rest)?;
            parsed.width = width;
            parsed.mask |= GeometryMask::WIDTH_VALUE;
            rest = tail;
        }

        if let Some(tail) = rest.strip_prefix(['x', 'X']) {
            let (height, tail) = read_integer(tail)?;
            parsed.height = height;
            parsed.mask |= GeometryMask::HEIGHT_VALUE;
            rest = tail;
        }

        if rest.starts_with(['+', '-']) {
            let negative = rest.starts_with('-');
            let (x, tail) = read_integer(&rest[1..])?;
            parsed.x = if negative { -x } else { x };
            parsed.mask |= GeometryMask::X_VALUE;
            if negative {
                parsed.mask |= GeometryMask::X_NEGATIVE;
            }
            rest = tail;

            if rest.starts_with(['+', '-']) {
                let negative = rest.starts_with('-');
                let (y, tail) = read_integer(&rest[1..])?;
                parsed.y = if negative { -y } else { y };
                parsed.mask |= GeometryMask::Y_VALUE;
                if negative {
                    parsed.mask |= GeometryMask::Y_NEGATIVE;
                }
                rest = tail;
            }
        }

        rest.is_empty().then_some(parsed)
    }

    inner(input).unwrap_or_default()
}

/// Reference corner implied by which offsets were negative
fn gravity_for(mask: GeometryMask) -> Gravity {
    match (
        mask.contains(GeometryMask::X_NEGATIVE),
        mask.contains(GeometryMask::Y_NEGATIVE),
    ) {
        (true, true) => Gravity::SouthEast,
        (true, false) => Gravity::NorthEast,
        (false, true) => Gravity::SouthWest,
        (false, false) => Gravity::NorthWest,
    }
}

impl WindowRegistry {
    /// Apply a user-supplied geometry string such as `640x480-0+0`. A size sets the
    /// default size; offsets position the window relative to the corner they name,
    /// kept on screen. Both are flagged as user-specified to the window manager.
    pub fn parse_geometry(&mut self, id: WindowId, geometry: &str) -> Result<()> {
        self.window(id).ok_or(CasementError::NoSuchWindow(id))?;
        let parsed = parse(geometry);
        if parsed.mask.is_empty() {
            return Err(CasementError::InvalidGeometry(geometry.to_string()));
        }
        let mask = parsed.mask;

        let size_set = mask.intersects(GeometryMask::WIDTH_VALUE | GeometryMask::HEIGHT_VALUE);
        if size_set {
            let width = if mask.contains(GeometryMask::WIDTH_VALUE) { parsed.width } else { -1 };
            let height = if mask.contains(GeometryMask::HEIGHT_VALUE) { parsed.height } else { -1 };
            self.set_default_size_internal(id, Some(width), Some(height), true)?;
        }

        let size = self.size(id)?;
        let screen = self.topology().screen_size();
        let gravity = gravity_for(mask);

        let mut x = if mask.contains(GeometryMask::X_VALUE) { parsed.x } else { 0 };
        let mut y = if mask.contains(GeometryMask::Y_VALUE) { parsed.y } else { 0 };
        if matches!(gravity, Gravity::SouthWest | Gravity::SouthEast) {
            y = screen.height - size.height + y;
        }
        if matches!(gravity, Gravity::SouthEast | Gravity::NorthEast) {
            x = screen.width - size.width + x;
        }
        let (x, y) = (x.max(0), y.max(0));

        let pos_set = mask.intersects(GeometryMask::X_VALUE | GeometryMask::Y_VALUE);
        if pos_set {
            self.set_gravity(id, gravity)?;
            self.move_to(id, x, y)?;
        }

        let window = window_entry(&mut self.windows, id)?;
        let hints = window
            .geometry_info_mut()
            .app_hints
            .get_or_insert_with(GeometryHints::default);
        if pos_set {
            hints.flags |= HintFlags::USER_POS;
        }
        if size_set {
            hints.flags |= HintFlags::USER_SIZE;
        }
        debug!(
            "Window {} geometry {:?}: {}x{} at {},{} ({:?})",
            id, geometry, size.width, size.height, x, y, gravity
        );
        Ok(())
    }
}
