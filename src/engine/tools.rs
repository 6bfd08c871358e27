use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolName {
    Wwwc,
    Pan,
    Zoom,
    Length,
    RectangleRoi,
    EllipticalRoi,
    ZoomMouseWheel,
    StackScrollMouseWheel,
}

impl ToolName {
    /// Tools selectable for the primary pointer button.
    pub const PRIMARY: [ToolName; 6] = [
        ToolName::Wwwc,
        ToolName::Pan,
        ToolName::Zoom,
        ToolName::Length,
        ToolName::RectangleRoi,
        ToolName::EllipticalRoi,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Wwwc => "Wwwc",
            Self::Pan => "Pan",
            Self::Zoom => "Zoom",
            Self::Length => "Length",
            Self::RectangleRoi => "RectangleRoi",
            Self::EllipticalRoi => "EllipticalRoi",
            Self::ZoomMouseWheel => "ZoomMouseWheel",
            Self::StackScrollMouseWheel => "StackScrollMouseWheel",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Wwwc => "W/L",
            Self::Pan => "Pan",
            Self::Zoom => "Zoom",
            Self::Length => "Length",
            Self::RectangleRoi => "Rect ROI",
            Self::EllipticalRoi => "Ellipse ROI",
            Self::ZoomMouseWheel => "Wheel zoom",
            Self::StackScrollMouseWheel => "Stack scroll",
        }
    }

    pub const fn shortcut(self) -> Option<char> {
        match self {
            Self::Wwwc => Some('w'),
            Self::Pan => Some('p'),
            Self::Zoom => Some('z'),
            Self::Length => Some('l'),
            Self::RectangleRoi => Some('r'),
            Self::EllipticalRoi => Some('e'),
            Self::ZoomMouseWheel | Self::StackScrollMouseWheel => None,
        }
    }

    pub const fn is_annotation(self) -> bool {
        matches!(self, Self::Length | Self::RectangleRoi | Self::EllipticalRoi)
    }

    pub const fn is_wheel(self) -> bool {
        matches!(self, Self::ZoomMouseWheel | Self::StackScrollMouseWheel)
    }

    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let tool = match normalized.as_str() {
            "wwwc" | "wl" | "windowlevel" => Self::Wwwc,
            "pan" => Self::Pan,
            "zoom" => Self::Zoom,
            "length" | "measure" | "ruler" => Self::Length,
            "rectangleroi" | "rectroi" | "rect" | "rectangle" => Self::RectangleRoi,
            "ellipticalroi" | "ellipseroi" | "ellipse" | "ellipsis" => Self::EllipticalRoi,
            "zoommousewheel" | "wheelzoom" => Self::ZoomMouseWheel,
            "stackscrollmousewheel" | "stackscroll" | "scroll" => Self::StackScrollMouseWheel,
            _ => return None,
        };
        Some(tool)
    }
}

impl FromStr for ToolName {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value).ok_or_else(|| EngineError::UnknownTool(value.to_string()))
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Binding {
    Primary,
    Secondary,
    Wheel,
    CtrlWheel,
}

impl Binding {
    pub const fn is_wheel(self) -> bool {
        matches!(self, Self::Wheel | Self::CtrlWheel)
    }
}

/// Mapping from input bindings to active tools.
pub trait ToolRegistry: Send {
    fn bind(&mut self, tool: ToolName, binding: Binding) -> Result<()>;

    /// Makes `tool` passive on `binding`. Unbinding a tool that is not active is a no-op.
    fn unbind(&mut self, tool: ToolName, binding: Binding);

    fn tools_on(&self, binding: Binding) -> Vec<ToolName>;

    fn bindings_of(&self, tool: ToolName) -> Vec<Binding>;

    fn active_on(&self, binding: Binding) -> Option<ToolName> {
        self.tools_on(binding).first().copied()
    }
}

/// Each binding drives at most one tool; binding a new tool replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolBindings {
    slots: BTreeMap<Binding, ToolName>,
}

impl Default for ToolBindings {
    fn default() -> Self {
        let slots = BTreeMap::from([
            (Binding::Primary, ToolName::Wwwc),
            (Binding::Secondary, ToolName::Zoom),
            (Binding::Wheel, ToolName::StackScrollMouseWheel),
            (Binding::CtrlWheel, ToolName::ZoomMouseWheel),
        ]);
        Self { slots }
    }
}

impl ToolRegistry for ToolBindings {
    fn bind(&mut self, tool: ToolName, binding: Binding) -> Result<()> {
        if tool.is_wheel() != binding.is_wheel() {
            return Err(EngineError::IncompatibleBinding { tool, binding });
        }
        if let Some(previous) = self.slots.insert(binding, tool)
            && previous != tool
        {
            log::debug!("{binding:?} binding: {previous} -> {tool}");
        }
        Ok(())
    }

    fn unbind(&mut self, tool: ToolName, binding: Binding) {
        if self.slots.get(&binding) == Some(&tool) {
            self.slots.remove(&binding);
        }
    }

    fn tools_on(&self, binding: Binding) -> Vec<ToolName> {
        self.slots.get(&binding).copied().into_iter().collect()
    }

    fn bindings_of(&self, tool: ToolName) -> Vec<Binding> {
        self.slots
            .iter()
            .filter(|(_, bound)| **bound == tool)
            .map(|(binding, _)| *binding)
            .collect()
    }
}
