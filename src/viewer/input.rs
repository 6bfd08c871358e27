use crate::engine::Binding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

impl PointerButton {
    pub const fn binding(self) -> Binding {
        match self {
            Self::Primary => Binding::Primary,
            Self::Secondary => Binding::Secondary,
        }
    }
}

/// Pointer input in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press { button: PointerButton, x: f32, y: f32 },
    Drag { button: PointerButton, x: f32, y: f32 },
    Release { button: PointerButton, x: f32, y: f32 },
    /// Positive `steps` scroll forward through the stack, or zoom in with ctrl held.
    Wheel { steps: f32, ctrl: bool },
}

impl PointerEvent {
    pub fn position(&self) -> Option<(f32, f32)> {
        match *self {
            Self::Press { x, y, .. } | Self::Drag { x, y, .. } | Self::Release { x, y, .. } => {
                Some((x, y))
            }
            Self::Wheel { .. } => None,
        }
    }
}
