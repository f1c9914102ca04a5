use serde::{Deserialize, Serialize};

// ── Data Model ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// A tagged rectangle in image pixel coordinates. `x`/`y` is the top-left corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub tag: Tag,
}

impl Annotation {
    pub fn rect(&self) -> BoxRect {
        BoxRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// The rectangle handed to the caller when a box-drawing gesture completes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

// ── Tool ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    #[default]
    Box,
    /// Placeholder; no selection behaviour yet.
    Select,
}

impl ToolMode {
    pub fn label(self) -> &'static str {
        match self {
            ToolMode::Box => "Draw Box",
            ToolMode::Select => "Select",
        }
    }
}

impl std::str::FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "box" => Ok(ToolMode::Box),
            "select" => Ok(ToolMode::Select),
            other => Err(format!("unknown tool '{other}', expected 'box' or 'select'")),
        }
    }
}
