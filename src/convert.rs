// XML (`actions.xml` + `behaviors.xml`, Shimeji-ee's
// `http://www.group-finity.com/Mascot` namespace) -> the action/behavior
// JSON model plus the list of embedded-expression candidates later handed
// to `bytecode::compile` (spec §4.E).
//
// Parsing builds a small generic element tree with `quick_xml` first (this
// crate only ever sees documents that declare the Mascot namespace as the
// default, unprefixed namespace, so matching on local tag names rather
// than fully resolving namespaces is sufficient), then walks that tree
// with the same three-pass structure as the converter this was ported
// from: program-candidate discovery, action parsing, behavior parsing.
// Attributes are kept in document order (not a map) because candidate
// discovery order determines program-candidate indices downstream.

use crate::model::*;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("invalid xml format: {0}")]
    InvalidFormat(String),
    #[error("action {0} redefinition")]
    ActionRedefinition(String),
    #[error("behavior {0} redefinition")]
    BehaviorRedefinition(String),
    #[error("action {0} not defined")]
    ActionNotDefined(String),
    #[error("expression {0:?} was not registered as a program candidate")]
    UnknownProgramCandidate(String),
}

const MASCOT_VAR_NAMES: &[&str] = &[
    "X",
    "Y",
    "TargetX",
    "TargetY",
    "VelocityParam",
    "InitialVX",
    "InitialVY",
    "Gravity",
    "RegistanceX",
    "RegistanceY",
    "LookRight",
    "IeOffsetX",
    "IeOffsetY",
    "BornX",
    "BornY",
    "Duration",
    "BornInterval",
    "BornCount",
    "BornTransient",
    "Loop",
    "Condition",
    "FootX",
    "FootDX",
    "OffsetX",
    "OffsetY",
    "Gap",
];

#[derive(Debug, Clone, Default)]
struct XmlElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

fn local_name(qname: &[u8]) -> String {
    let full = String::from_utf8_lossy(qname);
    match full.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => full.to_string(),
    }
}

fn read_attrs(
    e: &quick_xml::events::BytesStart,
    decoder: quick_xml::Decoder,
) -> Result<Vec<(String, String)>, ConvertError> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = local_name(attr.key.as_ref());
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn parse_xml(source: &str) -> Result<XmlElement, ConvertError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = local_name(e.name().as_ref());
                let attrs = read_attrs(&e, reader.decoder())?;
                stack.push(XmlElement { tag, attrs, children: Vec::new() });
            }
            Event::Empty(e) => {
                let tag = local_name(e.name().as_ref());
                let attrs = read_attrs(&e, reader.decoder())?;
                let elem = XmlElement { tag, attrs, children: Vec::new() };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(elem),
                    None => root = Some(elem),
                }
            }
            Event::End(_) => {
                let elem = stack
                    .pop()
                    .ok_or_else(|| ConvertError::InvalidFormat("unbalanced closing tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(elem),
                    None => root = Some(elem),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| ConvertError::InvalidFormat("empty document".into()))
}

fn vector_to_tuple(value: Option<&str>) -> (i64, i64) {
    let value = match value {
        None => return (0, 0),
        Some(v) => v,
    };
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 2 {
        let only = parts[0].trim().parse().unwrap_or(0);
        return (only, only);
    }
    let a = parts[0].trim().parse().unwrap_or(0);
    let b = parts[1].trim().parse().unwrap_or(0);
    (a, b)
}

fn program_index(programs: &[String], value: Option<&str>) -> Result<Option<usize>, ConvertError> {
    match value {
        None => Ok(None),
        Some(v) => programs
            .iter()
            .position(|p| p == v)
            .map(Some)
            .ok_or_else(|| ConvertError::UnknownProgramCandidate(v.to_string())),
    }
}

fn parse_animation(elem: &XmlElement, programs: &[String]) -> Result<Animation, ConvertError> {
    if elem.tag != "Animation" {
        return Err(ConvertError::InvalidFormat("expected Animation".into()));
    }

    let mut animation = Animation {
        kind: "Animation",
        condition: program_index(programs, elem.attr("Condition"))?,
        frames: Vec::new(),
        hotspots: Vec::new(),
        frame_count: 0,
        hotspots_count: 0,
    };

    for child in &elem.children {
        match child.tag.as_str() {
            "Pose" => {
                let anchor = vector_to_tuple(child.attr("ImageAnchor"));
                let velocity = vector_to_tuple(child.attr("Velocity"));
                let mut image = child.attr("Image").map(str::to_string);
                let mut image_right = child.attr("ImageRight").map(str::to_string);
                if let Some(img) = &mut image {
                    *img = img.trim_start_matches('/').replace(".png", ".qoi");
                }
                if let Some(img) = &mut image_right {
                    *img = img.trim_start_matches('/').replace(".png", ".qoi");
                }
                animation.frames.push(Frame {
                    kind: "Frame",
                    image,
                    image_right,
                    image_anchor_x: anchor.0,
                    image_anchor_y: anchor.1,
                    velocity_x: velocity.0,
                    velocity_y: velocity.1,
                    duration: child.attr("Duration").and_then(|v| v.parse().ok()).unwrap_or(0),
                });
                animation.frame_count += 1;
            }
            "Hotspot" => {
                let origin = vector_to_tuple(Some(child.attr("Origin").unwrap_or("0,0")));
                let size = vector_to_tuple(Some(child.attr("Size").unwrap_or("0,0")));
                let shape_str = child.attr("Shape").unwrap_or("Rectangle");
                let shape = if shape_str == "Rectangle" {
                    Shape::Known(KnownShape::Rectangle)
                } else {
                    Shape::Other(shape_str.to_string())
                };
                animation.hotspots.push(Hotspot {
                    kind: "Hotspot",
                    shape,
                    x: origin.0,
                    y: origin.1,
                    width: size.0,
                    height: size.1,
                    behavior: child.attr("Behavior").map(str::to_string),
                });
                animation.hotspots_count += 1;
            }
            other => {
                log::warn!("unknown tag in animation: {}; skipping", other);
            }
        }
    }

    Ok(animation)
}

fn parse_action_reference(elem: &XmlElement, programs: &[String]) -> Result<ActionReference, ConvertError> {
    if elem.tag != "ActionReference" {
        return Err(ConvertError::InvalidFormat("expected ActionReference".into()));
    }
    let action_name = elem
        .attr("Name")
        .ok_or_else(|| ConvertError::InvalidFormat("ActionReference name not found".into()))?
        .to_string();

    let mut locals_overrides = std::collections::HashMap::new();
    let mut locals_count = 0;
    for name in MASCOT_VAR_NAMES {
        if let Some(value) = elem.attr(name) {
            if let Some(idx) = program_index(programs, Some(value))? {
                locals_overrides.insert(format!("mascot.{}", name), idx);
                locals_count += 1;
            }
        }
    }
    if locals_overrides.remove("mascot.Duration").is_some() {
        locals_count -= 1;
    }
    if locals_overrides.remove("mascot.Loop").is_some() {
        locals_count -= 1;
    }

    Ok(ActionReference {
        kind: "ActionReference",
        action_name,
        duration: program_index(programs, elem.attr("Duration"))?,
        condition: program_index(programs, elem.attr("Condition"))?,
        locals_overrides,
        locals_count,
    })
}

fn parse_bool_attr(elem: &XmlElement, name: &str) -> bool {
    elem.attr(name) == Some("true")
}

struct ActionContext {
    inlined_action_counter: usize,
}

fn parse_action(
    elem: &XmlElement,
    action_definitions: &mut Vec<(String, ActionDef)>,
    programs: &[String],
    depth: usize,
    ctx: &mut ActionContext,
) -> Result<ActionDef, ConvertError> {
    let action_type_str = elem
        .attr("Type")
        .ok_or_else(|| ConvertError::InvalidFormat("Action type not found".into()))?;
    let action_type = ActionType::parse(action_type_str)
        .ok_or_else(|| ConvertError::InvalidFormat(format!("unknown action type {:?}", action_type_str)))?;

    let mut name = elem.attr("Name").map(str::to_string);
    if name.is_none() {
        if depth == 0 {
            return Err(ConvertError::InvalidFormat("Root action must have a name".into()));
        }
        name = Some(format!("___INLINED_ACTION_{}", ctx.inlined_action_counter));
        ctx.inlined_action_counter += 1;
    }
    let name = name.unwrap();

    let embedded_type = match elem.attr("Class") {
        Some(class_name) => Some(
            EmbeddedType::from_class_name(class_name)
                .ok_or_else(|| ConvertError::InvalidFormat(format!("unknown action class {:?}", class_name)))?
                .name(),
        ),
        None => None,
    };

    let mut action = ActionDef {
        action_type: action_type.name(),
        name: Some(name.clone()),
        content: Vec::new(),
        content_count: 0,
        local_variables: std::collections::HashMap::new(),
        local_variables_count: 0,
        embedded_type,
        loop_: parse_bool_attr(elem, "Loop"),
        condition: program_index(programs, elem.attr("Condition"))?,
        border_type: elem.attr("BorderType").unwrap_or("Any").to_string(),
        target_behavior: None,
        born_behavior: None,
        select_behavior: None,
        affordance: None,
        transform_target: None,
        behavior: None,
        born_mascot: None,
        target_look: None,
    };

    let allows_nesting = matches!(action_type, ActionType::Sequence | ActionType::Select);

    for child in &elem.children {
        match child.tag.as_str() {
            "Action" => {
                if !allows_nesting {
                    log::warn!(
                        "{}action type {:?} does not support nested actions",
                        "  ".repeat(depth),
                        action_type
                    );
                    continue;
                }
                let nested = parse_action(child, action_definitions, programs, depth + 1, ctx)?;
                action.content.push(ActionContent::Reference(ActionReference {
                    kind: "ActionReference",
                    action_name: nested.name.clone().unwrap(),
                    duration: program_index(programs, child.attr("Duration"))?,
                    condition: program_index(programs, child.attr("Condition"))?,
                    locals_overrides: std::collections::HashMap::new(),
                    locals_count: 0,
                }));
                action.content_count += 1;
            }
            "ActionReference" => {
                if !allows_nesting {
                    log::warn!(
                        "{}action type {:?} does not support nested actions",
                        "  ".repeat(depth),
                        action_type
                    );
                    continue;
                }
                let actionref = parse_action_reference(child, programs)?;
                action.content.push(ActionContent::Reference(actionref));
                action.content_count += 1;
            }
            "Animation" => {
                if allows_nesting {
                    log::warn!(
                        "{}action type {:?} does not support animations",
                        "  ".repeat(depth),
                        action_type
                    );
                    continue;
                }
                let animation = parse_animation(child, programs)?;
                action.content.push(ActionContent::Animation(animation));
                action.content_count += 1;
            }
            _ => {}
        }
    }

    for (attr_name, attr_value) in &elem.attrs {
        if MASCOT_VAR_NAMES.contains(&attr_name.as_str()) {
            if let Some(idx) = program_index(programs, Some(attr_value.as_str()))? {
                action
                    .local_variables
                    .insert(format!("mascot.{}", attr_name), idx);
                action.local_variables_count += 1;
            }
        }
        match attr_name.as_str() {
            "TargetBehavior" => action.target_behavior = Some(attr_value.clone()),
            "BornBehavior" => action.born_behavior = Some(attr_value.clone()),
            "SelectBehavior" => action.select_behavior = Some(attr_value.clone()),
            "Affordance" => action.affordance = Some(attr_value.clone()),
            "TransformMascot" => action.transform_target = Some(attr_value.clone()),
            "Behavior" => action.behavior = Some(attr_value.clone()),
            "BornMascot" => action.born_mascot = Some(attr_value.clone()),
            "TargetLook" => action.target_look = Some(attr_value == "true"),
            _ => {}
        }
    }

    if action_definitions.iter().any(|(n, _)| n == &name) {
        return Err(ConvertError::ActionRedefinition(name));
    }

    if action.local_variables.remove("mascot.Duration").is_some() {
        action.local_variables_count -= 1;
    }
    if action.local_variables.remove("mascot.Loop").is_some() {
        action.local_variables_count -= 1;
    }

    action_definitions.push((name, action.clone()));
    Ok(action)
}

fn parse_action_list(
    action_list: &XmlElement,
    action_definitions: &mut Vec<(String, ActionDef)>,
    programs: &[String],
    ctx: &mut ActionContext,
) -> Result<(), ConvertError> {
    for action in &action_list.children {
        if action.tag != "Action" {
            return Err(ConvertError::InvalidFormat("expected Action".into()));
        }
        parse_action(action, action_definitions, programs, 0, ctx)?;
    }
    Ok(())
}

fn behavior_to_ref(behavior: &BehaviorDef) -> BehaviorRef {
    BehaviorRef { name: behavior.name.clone(), frequency: behavior.frequency }
}

struct BehaviorContext {
    inlined_behavior_counter: usize,
}

fn parse_behavior(
    elem: &XmlElement,
    behavior_definitions: &mut Vec<(String, BehaviorDef)>,
    action_definitions: &[(String, ActionDef)],
    programs: &[String],
    ctx: &mut BehaviorContext,
) -> Result<BehaviorDef, ConvertError> {
    let mut behavior = BehaviorDef {
        name: elem.attr("Name").unwrap_or_default().to_string(),
        action: None,
        next_behavior_list: Vec::new(),
        next_behavior_list_count: 0,
        hidden: false,
        condition: program_index(programs, elem.attr("Condition"))?,
        is_conditioner: false,
        next_behavior_list_add: true,
        frequency: elem.attr("Frequency").and_then(|v| v.parse().ok()).unwrap_or(0),
    };

    if elem.tag == "Condition" {
        behavior.name = format!("___CONDITION_{}", ctx.inlined_behavior_counter);
        ctx.inlined_behavior_counter += 1;
        behavior.is_conditioner = true;
        behavior.hidden = true;
        behavior.frequency = 0;

        for child in &elem.children {
            match parse_behavior(child, behavior_definitions, action_definitions, programs, ctx) {
                Ok(new_behavior) => {
                    behavior.next_behavior_list.push(behavior_to_ref(&new_behavior));
                    behavior.next_behavior_list_count += 1;
                }
                Err(ConvertError::BehaviorRedefinition(_)) => {
                    behavior.next_behavior_list.push(BehaviorRef {
                        name: child.attr("Name").unwrap_or_default().to_string(),
                        frequency: child.attr("Frequency").and_then(|v| v.parse().ok()).unwrap_or(0),
                    });
                    behavior.next_behavior_list_count += 1;
                }
                Err(other) => return Err(other),
            }
        }
    } else if elem.tag == "Behavior" {
        for child in elem.children_named("NextBehaviorList") {
            if child.attr("Add") == Some("false") {
                behavior.next_behavior_list_add = false;
            }
            for subchild in &child.children {
                match subchild.tag.as_str() {
                    "Behavior" => {
                        match parse_behavior(subchild, behavior_definitions, action_definitions, programs, ctx) {
                            Ok(new_behavior) => {
                                behavior.next_behavior_list.push(behavior_to_ref(&new_behavior));
                                behavior.next_behavior_list_count += 1;
                            }
                            Err(ConvertError::BehaviorRedefinition(_)) => {
                                behavior.next_behavior_list.push(BehaviorRef {
                                    name: subchild.attr("Name").unwrap_or_default().to_string(),
                                    frequency: subchild
                                        .attr("Frequency")
                                        .and_then(|v| v.parse().ok())
                                        .unwrap_or(0),
                                });
                                behavior.next_behavior_list_count += 1;
                            }
                            Err(other) => return Err(other),
                        }
                    }
                    "Condition" => {
                        let new_behavior =
                            parse_behavior(subchild, behavior_definitions, action_definitions, programs, ctx)?;
                        behavior.next_behavior_list.push(behavior_to_ref(&new_behavior));
                        behavior.next_behavior_list_count += 1;
                    }
                    "BehaviorReference" => {
                        behavior.next_behavior_list.push(BehaviorRef {
                            name: subchild.attr("Name").unwrap_or_default().to_string(),
                            frequency: subchild.attr("Frequency").and_then(|v| v.parse().ok()).unwrap_or(0),
                        });
                        behavior.next_behavior_list_count += 1;
                    }
                    _ => return Err(ConvertError::InvalidFormat("invalid xml format".into())),
                }
            }
        }

        behavior.action = Some(elem.attr("Action").unwrap_or(&behavior.name).to_string());
        let action_name = behavior.action.clone().unwrap();
        if !action_definitions.iter().any(|(n, _)| n == &action_name) {
            return Err(ConvertError::ActionNotDefined(action_name));
        }
    } else {
        return Err(ConvertError::InvalidFormat("invalid xml format".into()));
    }

    if behavior_definitions.iter().any(|(n, _)| n == &behavior.name) {
        return Err(ConvertError::BehaviorRedefinition(behavior.name.clone()));
    }
    behavior_definitions.push((behavior.name.clone(), behavior.clone()));
    Ok(behavior)
}

fn parse_behavior_list(
    behavior_list: &XmlElement,
    behavior_definitions: &mut Vec<(String, BehaviorDef)>,
    action_definitions: &[(String, ActionDef)],
    programs: &[String],
    root_behavior_list: &mut Vec<BehaviorRef>,
    ctx: &mut BehaviorContext,
) -> Result<(), ConvertError> {
    for child in &behavior_list.children {
        if child.tag == "Behavior" || child.tag == "Condition" {
            let behavior = parse_behavior(child, behavior_definitions, action_definitions, programs, ctx)?;
            root_behavior_list.push(behavior_to_ref(&behavior));
        } else {
            return Err(ConvertError::InvalidFormat("invalid xml format".into()));
        }
    }
    Ok(())
}

fn collect_program_candidates(elem: &XmlElement, candidates: &mut Vec<String>) {
    for (attr_name, attr_value) in &elem.attrs {
        if candidates.iter().any(|c| c == attr_value) {
            continue;
        }
        if MASCOT_VAR_NAMES.contains(&attr_name.as_str())
            || attr_value.starts_with("${")
            || attr_value.starts_with("#{")
        {
            candidates.push(attr_value.clone());
        }
    }
    for child in &elem.children {
        collect_program_candidates(child, candidates);
    }
}

/// Convert `actions.xml` + `behaviors.xml` text into the program-candidate
/// list plus action/behavior definitions (spec §4.E). Compiling the
/// candidates into bytecode is `package::compile_from_dir_fd`'s job, not
/// this function's — this mirrors the original's `shmconv`/`Compiler`
/// split (conversion and compilation are separately testable).
pub fn shmconv(
    actions_xml: &str,
    behaviors_xml: &str,
) -> Result<(Vec<String>, Vec<ActionDef>, BehaviorsFile), ConvertError> {
    let actions_root = parse_xml(actions_xml)?;
    let behaviors_root = parse_xml(behaviors_xml)?;

    let mut program_candidates = Vec::new();
    collect_program_candidates(&actions_root, &mut program_candidates);
    collect_program_candidates(&behaviors_root, &mut program_candidates);

    let mut action_definitions: Vec<(String, ActionDef)> = Vec::new();
    let mut action_ctx = ActionContext { inlined_action_counter: 0 };
    for action_list in actions_root.children_named("ActionList") {
        parse_action_list(action_list, &mut action_definitions, &program_candidates, &mut action_ctx)?;
    }

    // Sequence/Select actions reference other actions by name, so the
    // primitive (non-Sequence/Select) actions they depend on must sort
    // first.
    action_definitions.sort_by_key(|(_, def)| matches!(def.action_type, "Sequence" | "Select"));

    let mut behavior_definitions: Vec<(String, BehaviorDef)> = Vec::new();
    let mut root_behavior_list = Vec::new();
    let mut behavior_ctx = BehaviorContext { inlined_behavior_counter: 0 };
    for behavior_list in behaviors_root.children_named("BehaviorList") {
        parse_behavior_list(
            behavior_list,
            &mut behavior_definitions,
            &action_definitions,
            &program_candidates,
            &mut root_behavior_list,
            &mut behavior_ctx,
        )?;
    }

    if !behavior_definitions.iter().any(|(n, _)| n == "Fall") {
        log::warn!("Fall behavior not defined; it is required for execution and will not load");
    }
    if !behavior_definitions.iter().any(|(n, _)| n == "Dragged") {
        log::warn!("Dragged behavior not defined; it is required for execution and will not load");
    }
    if !behavior_definitions.iter().any(|(n, _)| n == "Thrown") {
        log::warn!("Thrown behavior not defined; it is required for execution and will not load");
    }

    let actions = action_definitions.into_iter().map(|(_, def)| def).collect();
    let behaviors = BehaviorsFile {
        definitions: behavior_definitions.into_iter().map(|(_, def)| def).collect(),
        root_behavior_list,
    };

    Ok((program_candidates, actions, behaviors))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Mascot xmlns="http://www.group-finity.com/Mascot">
  <ActionList>
    <Action Type="Stay" Name="Stand" BorderType="Floor">
      <Animation>
        <Pose Image="/shime1.png" ImageAnchor="64,128" Velocity="0,0" Duration="250"/>
      </Animation>
    </Action>
  </ActionList>
</Mascot>"#;

    const BEHAVIORS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Mascot xmlns="http://www.group-finity.com/Mascot">
  <BehaviorList>
    <Behavior Name="Stand" Frequency="100"/>
  </BehaviorList>
</Mascot>"#;

    #[test]
    fn converts_minimal_action_and_behavior() {
        let (candidates, actions, behaviors) = shmconv(ACTIONS_XML, BEHAVIORS_XML).unwrap();
        assert!(candidates.is_empty());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name.as_deref(), Some("Stand"));
        assert_eq!(actions[0].content.len(), 1);
        match &actions[0].content[0] {
            ActionContent::Animation(anim) => {
                assert_eq!(anim.frame_count, 1);
                assert_eq!(anim.frames[0].image.as_deref(), Some("shime1.qoi"));
            }
            other => panic!("expected animation, got {:?}", other),
        }
        assert_eq!(behaviors.definitions.len(), 1);
        assert_eq!(behaviors.definitions[0].action.as_deref(), Some("Stand"));
    }

    #[test]
    fn behavior_referencing_undefined_action_is_an_error() {
        let behaviors_xml = r#"<Mascot xmlns="http://www.group-finity.com/Mascot">
          <BehaviorList><Behavior Name="Ghost" Frequency="1"/></BehaviorList>
        </Mascot>"#;
        let result = shmconv(ACTIONS_XML, behaviors_xml);
        assert!(matches!(result, Err(ConvertError::ActionNotDefined(_))));
    }

    #[test]
    fn duplicate_action_name_is_a_redefinition_error() {
        let actions_xml = r#"<Mascot xmlns="http://www.group-finity.com/Mascot">
          <ActionList>
            <Action Type="Stay" Name="Stand" BorderType="Floor"><Animation/></Action>
            <Action Type="Stay" Name="Stand" BorderType="Floor"><Animation/></Action>
          </ActionList>
        </Mascot>"#;
        let result = shmconv(actions_xml, BEHAVIORS_XML);
        assert!(matches!(result, Err(ConvertError::ActionRedefinition(_))));
    }

    #[test]
    fn vector_to_tuple_handles_single_value() {
        assert_eq!(vector_to_tuple(Some("5")), (5, 5));
        assert_eq!(vector_to_tuple(Some("3,7")), (3, 7));
        assert_eq!(vector_to_tuple(None), (0, 0));
    }
}
