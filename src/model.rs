// Data model for the converted mascot definition: actions, behaviors,
// animations, hotspots, and the compiled-programs table that ties
// embedded expressions back into them (spec §3, §6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One compiled expression, keyed by its position in the program
/// candidates list gathered during conversion (spec §4.E pass 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub name: usize,
    pub symtab_l: Vec<String>,
    pub symtab_g: Vec<String>,
    pub symtab_f: Vec<String>,
    pub instructions: String,
    pub evaluate_once: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProgramsFile {
    pub programs: Vec<ProgramEntry>,
}

/// A mascot-definition hotspot shape. Only `Rectangle` appears in any
/// known `.xml` in the wild; `Other` preserves whatever string shows up so
/// unrecognized shapes round-trip instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Shape {
    Known(KnownShape),
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnownShape {
    Rectangle,
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Known(KnownShape::Rectangle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub shape: Shape,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub behavior: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub image: Option<String>,
    pub image_right: Option<String>,
    pub image_anchor_x: i64,
    pub image_anchor_y: i64,
    pub velocity_x: i64,
    pub velocity_y: i64,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub condition: Option<usize>,
    pub frames: Vec<Frame>,
    pub hotspots: Vec<Hotspot>,
    pub frame_count: usize,
    pub hotspots_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReference {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action_name: String,
    pub duration: Option<usize>,
    pub condition: Option<usize>,
    pub locals_overrides: HashMap<String, usize>,
    pub locals_count: usize,
}

/// One element of an action's `content` list: either a nested action
/// (flattened to a reference during parsing, spec §4.E pass 2), an
/// explicit `<ActionReference>`, or inline `<Animation>` frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionContent {
    Reference(ActionReference),
    Animation(Animation),
}

/// `Type` attribute of an `<Action>` element (spec §3, §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Fall,
    Move,
    Embedded,
    Stay,
    Animate,
    Sequence,
    Select,
}

impl ActionType {
    pub fn parse(value: &str) -> Option<ActionType> {
        Some(match value {
            "Fall" => ActionType::Fall,
            "Move" => ActionType::Move,
            "Embedded" => ActionType::Embedded,
            "Stay" => ActionType::Stay,
            "Animate" => ActionType::Animate,
            "Sequence" => ActionType::Sequence,
            "Select" => ActionType::Select,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Fall => "Fall",
            ActionType::Move => "Move",
            ActionType::Embedded => "Embedded",
            ActionType::Stay => "Stay",
            ActionType::Animate => "Animate",
            ActionType::Sequence => "Sequence",
            ActionType::Select => "Select",
        }
    }
}

/// `Class` attribute of an `<Action Type="Embedded">` element, mapped from
/// its fully-qualified Java class name (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddedType {
    Jump,
    Fall,
    Look,
    Offset,
    FallWithIE,
    JumpWithIE,
    WalkWithIE,
    ThrowIE,
    Dragged,
    Resist,
    Breed,
    Broadcast,
    ScanMove,
    Interact,
    Transform,
    Scanjump,
    Dispose,
    Mute,
}

impl EmbeddedType {
    /// Map a `com.group_finity.mascot.action.*` class name to its type,
    /// including the `Regist`->`Resist` and `SelfDestruct`->`Dispose`
    /// exceptions the original converter special-cases.
    pub fn from_class_name(class_name: &str) -> Option<EmbeddedType> {
        let variant = class_name.strip_prefix("com.group_finity.mascot.action.")?;
        Some(match variant {
            "Jump" => EmbeddedType::Jump,
            "Fall" => EmbeddedType::Fall,
            "Look" => EmbeddedType::Look,
            "Offset" => EmbeddedType::Offset,
            "FallWithIE" => EmbeddedType::FallWithIE,
            "JumpWithIE" => EmbeddedType::JumpWithIE,
            "WalkWithIE" => EmbeddedType::WalkWithIE,
            "ThrowIE" => EmbeddedType::ThrowIE,
            "Dragged" => EmbeddedType::Dragged,
            "Regist" | "Resist" => EmbeddedType::Resist,
            "Breed" => EmbeddedType::Breed,
            "Broadcast" => EmbeddedType::Broadcast,
            "ScanMove" => EmbeddedType::ScanMove,
            "Interact" => EmbeddedType::Interact,
            "Transform" => EmbeddedType::Transform,
            "Scanjump" => EmbeddedType::Scanjump,
            "SelfDestruct" | "Dispose" => EmbeddedType::Dispose,
            "Mute" => EmbeddedType::Mute,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddedType::Jump => "Jump",
            EmbeddedType::Fall => "Fall",
            EmbeddedType::Look => "Look",
            EmbeddedType::Offset => "Offset",
            EmbeddedType::FallWithIE => "FallWithIE",
            EmbeddedType::JumpWithIE => "JumpWithIE",
            EmbeddedType::WalkWithIE => "WalkWithIE",
            EmbeddedType::ThrowIE => "ThrowIE",
            EmbeddedType::Dragged => "Dragged",
            EmbeddedType::Resist => "Resist",
            EmbeddedType::Breed => "Breed",
            EmbeddedType::Broadcast => "Broadcast",
            EmbeddedType::ScanMove => "ScanMove",
            EmbeddedType::Interact => "Interact",
            EmbeddedType::Transform => "Transform",
            EmbeddedType::Scanjump => "Scanjump",
            EmbeddedType::Dispose => "Dispose",
            EmbeddedType::Mute => "Mute",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    #[serde(rename = "type")]
    pub action_type: &'static str,
    pub name: Option<String>,
    pub content: Vec<ActionContent>,
    pub content_count: usize,
    pub local_variables: HashMap<String, usize>,
    pub local_variables_count: usize,
    pub embedded_type: Option<&'static str>,
    pub loop_: bool,
    pub condition: Option<usize>,
    pub border_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub born_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affordance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub born_mascot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_look: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorRef {
    pub name: String,
    pub frequency: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorDef {
    pub name: String,
    pub action: Option<String>,
    pub next_behavior_list: Vec<BehaviorRef>,
    pub next_behavior_list_count: usize,
    pub hidden: bool,
    pub condition: Option<usize>,
    pub is_conditioner: bool,
    pub next_behavior_list_add: bool,
    pub frequency: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BehaviorsFile {
    pub definitions: Vec<BehaviorDef>,
    pub root_behavior_list: Vec<BehaviorRef>,
}

/// `.wlshm` package manifest (spec §6), enriched from `info.xml` where
/// present (artist/scripter/commissioner/support/icon).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,
    pub display_name: String,
    pub programs: usize,
    pub actions: usize,
    pub behaviors: usize,
    pub assets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commissioner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_other_round_trips() {
        let shape: Shape = serde_json::from_str("\"Circle\"").unwrap();
        assert_eq!(shape, Shape::Other("Circle".to_string()));
    }

    #[test]
    fn shape_known_rectangle_round_trips() {
        let shape: Shape = serde_json::from_str("\"Rectangle\"").unwrap();
        assert_eq!(shape, Shape::Known(KnownShape::Rectangle));
    }

    #[test]
    fn embedded_type_maps_regist_to_resist() {
        assert_eq!(
            EmbeddedType::from_class_name("com.group_finity.mascot.action.Regist"),
            Some(EmbeddedType::Resist)
        );
    }

    #[test]
    fn embedded_type_maps_selfdestruct_to_dispose() {
        assert_eq!(
            EmbeddedType::from_class_name("com.group_finity.mascot.action.SelfDestruct"),
            Some(EmbeddedType::Dispose)
        );
    }
}
