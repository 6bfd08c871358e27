use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::WindowLevel;

use super::{Result, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Lung,
    Bone,
    Brain,
    Abdomen,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Lung, Preset::Bone, Preset::Brain, Preset::Abdomen];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Lung => "lung",
            Self::Bone => "bone",
            Self::Brain => "brain",
            Self::Abdomen => "abdomen",
        }
    }

    /// Center and width in Hounsfield units.
    pub const fn center_width(self) -> (f32, f32) {
        match self {
            Self::Lung => (-600.0, 1500.0),
            Self::Bone => (300.0, 1500.0),
            Self::Brain => (40.0, 80.0),
            Self::Abdomen => (40.0, 400.0),
        }
    }

    pub fn window(self) -> WindowLevel {
        let (center, width) = self.center_width();
        WindowLevel::new(center, width)
    }
}

impl FromStr for Preset {
    type Err = ViewerError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ViewerError::UnknownPreset(value.to_string()))
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}
