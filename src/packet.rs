// Binary wire protocol for the overlay daemon connection (spec §4.F).
//
// Every frame is an 8-byte little-endian header (`type, flags, length,
// object_id`) followed by a type-specific payload; `length` counts the
// whole frame, header included. Strings are length-prefixed by a single
// `u8`. Ancillary file descriptors ride alongside the frame bytes on the
// same `sendmsg`/`recvmsg` call (`crate::client` owns the socket loop;
// this module only encodes/decodes buffers plus the `RawFd`s handed to
// it). The full per-type table mirrors `original_source/ipc_protocol.py`'s
// `Packet` subclasses one for one, including the ones spec.md's table
// only itemizes by range (0x09-0x13, 0x51-0x54).

use std::os::fd::RawFd;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("short frame: expected at least {expected} bytes, got {got}")]
    ShortFrame { expected: usize, got: usize },
    #[error("truncated payload reading {field} (need {need} more bytes, have {have})")]
    Truncated { field: &'static str, need: usize, have: usize },
    #[error("invalid utf-8 in field {0}")]
    InvalidUtf8(&'static str),
    #[error("expected an ancillary fd for {0}, none were received")]
    MissingFd(&'static str),
    #[error("unknown packet type 0x{0:02X}")]
    UnknownType(u8),
}

/// 8-byte frame header, little-endian throughout (spec §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: u8,
    pub flags: u8,
    pub length: u16,
    pub object_id: u32,
}

pub const HEADER_LEN: usize = 8;

impl FrameHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = self.kind;
        buf[1] = self.flags;
        buf[2..4].copy_from_slice(&self.length.to_le_bytes());
        buf[4..8].copy_from_slice(&self.object_id.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<FrameHeader, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::ShortFrame { expected: HEADER_LEN, got: buf.len() });
        }
        Ok(FrameHeader {
            kind: buf[0],
            flags: buf[1],
            length: u16::from_le_bytes([buf[2], buf[3]]),
            object_id: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }
}

/// A small write cursor over an owned byte buffer, mirroring the
/// original's `Packet.write_values`.
#[derive(Default)]
struct Writer(Vec<u8>);

impl Writer {
    fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }
    fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn u64(&mut self, v: u64) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn i32(&mut self, v: i32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn f32(&mut self, v: f32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn str8(&mut self, s: &str) -> &mut Self {
        self.u8(s.len() as u8);
        self.0.extend_from_slice(s.as_bytes());
        self
    }
}

/// A read cursor over a borrowed payload, mirroring `Packet.read_values`.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn need(&self, field: &'static str, n: usize) -> Result<(), ProtocolError> {
        if self.buf.len() - self.pos < n {
            return Err(ProtocolError::Truncated { field, need: n, have: self.buf.len() - self.pos });
        }
        Ok(())
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        self.need(field, 1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, ProtocolError> {
        self.need(field, 2)?;
        let v = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, ProtocolError> {
        self.need(field, 4)?;
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, ProtocolError> {
        self.need(field, 8)?;
        let v = u64::from_le_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        Ok(v)
    }

    fn i32(&mut self, field: &'static str) -> Result<i32, ProtocolError> {
        self.need(field, 4)?;
        let v = i32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn f32(&mut self, field: &'static str) -> Result<f32, ProtocolError> {
        self.need(field, 4)?;
        let v = f32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn str8(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let len = self.u8(field)? as usize;
        self.need(field, len)?;
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(field))
    }
}

/// Outbound/inbound frame: header-derived metadata plus the raw payload
/// and any fds received alongside it. FDs are consumed front-to-back by
/// `decode`, matching `Packet.consume_fd`'s read cursor.
pub struct RawFrame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
    pub fds: Vec<RawFd>,
}

fn frame(kind: u8, flags: u8, object_id: u32, payload: Vec<u8>) -> (FrameHeader, Vec<u8>) {
    let header = FrameHeader { kind, flags, length: (HEADER_LEN + payload.len()) as u16, object_id };
    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(&payload);
    (header, bytes)
}

macro_rules! empty_packet {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;
    };
}

// ----- outbound, no payload -----

empty_packet!(ServerHello);
empty_packet!(Disconnect);
empty_packet!(StartSession);
empty_packet!(EnvironmentWithdrawn);
empty_packet!(CommitPrototypes);
empty_packet!(MascotDisposed);
empty_packet!(SelectionCancelled);
empty_packet!(ImportStarted);
empty_packet!(ExportFinished);
empty_packet!(ClickEventExpired);
empty_packet!(PrototypeWithdraw);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHello {
    pub version: u64,
}

impl ClientHello {
    pub fn encode(&self, object_id: u32) -> Vec<u8> {
        let mut w = Writer::default();
        w.u64(self.version);
        frame(0x00, 0, object_id, w.0).1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: u8,
    pub alert: u8,
    pub message: String,
    pub formatting_values: Vec<String>,
}

impl Notice {
    pub fn decode(payload: &[u8]) -> Result<Notice, ProtocolError> {
        let mut r = Reader::new(payload);
        let severity = r.u8("severity")?;
        let alert = r.u8("alert")?;
        let message = r.str8("message")?;
        let count = r.u8("nvals")?;
        let mut formatting_values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            formatting_values.push(r.str8("formatting_value")?);
        }
        Ok(Notice { severity, alert, message, formatting_values })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentAnnouncement {
    pub new_id: u32,
    pub name: String,
    pub description: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl EnvironmentAnnouncement {
    pub fn decode(payload: &[u8]) -> Result<EnvironmentAnnouncement, ProtocolError> {
        let mut r = Reader::new(payload);
        let new_id = r.u32("new_id")?;
        let name = r.str8("name")?;
        let description = r.str8("description")?;
        let x = r.u32("x")?;
        let y = r.u32("y")?;
        let width = r.u32("width")?;
        let height = r.u32("height")?;
        let scale = r.f32("scale")?;
        Ok(EnvironmentAnnouncement { new_id, name, description, x, y, width, height, scale })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentChanged {
    pub name: String,
    pub description: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl EnvironmentChanged {
    pub fn decode(payload: &[u8]) -> Result<EnvironmentChanged, ProtocolError> {
        let mut r = Reader::new(payload);
        let name = r.str8("name")?;
        let description = r.str8("description")?;
        let x = r.u32("x")?;
        let y = r.u32("y")?;
        let width = r.u32("width")?;
        let height = r.u32("height")?;
        let scale = r.f32("scale")?;
        Ok(EnvironmentChanged { name, description, x, y, width, height, scale })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentMascot {
    pub mascot_new_id: u32,
    pub prototype_id: u32,
}

impl EnvironmentMascot {
    pub fn decode(payload: &[u8]) -> Result<EnvironmentMascot, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(EnvironmentMascot { mascot_new_id: r.u32("mascot_new_id")?, prototype_id: r.u32("prototype_id")? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPrototype {
    pub prototype_id: u32,
}

impl StartPrototype {
    pub fn decode(payload: &[u8]) -> Result<StartPrototype, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(StartPrototype { prototype_id: r.u32("prototype_id")? })
    }
}

macro_rules! str_field_packet {
    ($name:ident, $field:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub $field: String,
        }
        impl $name {
            pub fn decode(payload: &[u8]) -> Result<$name, ProtocolError> {
                let mut r = Reader::new(payload);
                Ok($name { $field: r.str8(stringify!($field))? })
            }
        }
    };
}

str_field_packet!(PrototypeName, name);
str_field_packet!(PrototypeDisplayName, display_name);
str_field_packet!(PrototypePath, path);
str_field_packet!(PrototypeAddAction, action);
str_field_packet!(PrototypeAddBehavior, behavior);
str_field_packet!(PrototypeAuthor, author);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrototypeFd {
    pub fd: RawFd,
}

impl PrototypeFd {
    pub fn decode(fds: &mut std::vec::IntoIter<RawFd>) -> Result<PrototypeFd, ProtocolError> {
        Ok(PrototypeFd { fd: fds.next().ok_or(ProtocolError::MissingFd("PrototypeFD"))? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrototypeIcon {
    pub icon_fd: RawFd,
}

impl PrototypeIcon {
    pub fn decode(fds: &mut std::vec::IntoIter<RawFd>) -> Result<PrototypeIcon, ProtocolError> {
        Ok(PrototypeIcon { icon_fd: fds.next().ok_or(ProtocolError::MissingFd("PrototypeIcon"))? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrototypeVersion {
    pub version: u64,
}

impl PrototypeVersion {
    pub fn decode(payload: &[u8]) -> Result<PrototypeVersion, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(PrototypeVersion { version: r.u64("version")? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MascotMigrated {
    pub environment_id: u32,
}

impl MascotMigrated {
    pub fn decode(payload: &[u8]) -> Result<MascotMigrated, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(MascotMigrated { environment_id: r.u32("environment_id")? })
    }
}

/// Outbound only: client polls mascot state by sending this with the
/// mascot's object id in the frame header (spec §4.F `0x16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MascotGetInfo;

impl MascotGetInfo {
    pub fn encode(mascot_id: u32) -> Vec<u8> {
        frame(0x16, 0, mascot_id, Vec::new()).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableEntry {
    pub kind: u8,
    /// `kind == 1` selects the float interpretation per spec §4.F.MI.
    pub value_bits: u32,
    pub used: bool,
    pub evaluate_once: bool,
    pub script_id: u16,
}

impl VariableEntry {
    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.value_bits)
    }
    pub fn as_i32(&self) -> i32 {
        self.value_bits as i32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MascotInfo {
    pub prototype_id: u32,
    pub environment_id: u32,
    pub current_state: u32,
    pub current_action_name: String,
    pub current_action_index: u16,
    pub current_behavior_name: String,
    pub current_affordance_name: String,
    pub actions: Vec<(String, u32)>,
    pub behaviors: Vec<(String, u64)>,
    pub variables: Vec<VariableEntry>,
}

impl MascotInfo {
    pub fn decode(payload: &[u8]) -> Result<MascotInfo, ProtocolError> {
        let mut r = Reader::new(payload);
        let prototype_id = r.u32("prototype_id")?;
        let environment_id = r.u32("environment_id")?;
        let current_state = r.u32("current_state")?;
        let current_action_name = r.str8("current_action_name")?;
        let current_action_index = r.u16("current_action_index")?;
        let current_behavior_name = r.str8("current_behavior_name")?;
        let current_affordance_name = r.str8("current_affordance_name")?;

        let action_pool_len = r.u8("action_pool_len")?;
        let mut actions = Vec::with_capacity(action_pool_len as usize);
        for _ in 0..action_pool_len {
            let name = r.str8("action_name")?;
            let idx = r.u32("action_index")?;
            actions.push((name, idx));
        }

        let behavior_pool_len = r.u8("behavior_pool_len")?;
        let mut behaviors = Vec::with_capacity(behavior_pool_len as usize);
        for _ in 0..behavior_pool_len {
            let name = r.str8("behavior_name")?;
            let freq = r.u64("behavior_freq")?;
            behaviors.push((name, freq));
        }

        let var_count = r.u16("var_count")?;
        let mut variables = Vec::with_capacity(var_count as usize);
        for _ in 0..var_count {
            let kind = r.u8("var_kind")?;
            let value_bits = if kind == 1 { r.f32("var_value")?.to_bits() } else { r.i32("var_value")? as u32 };
            let used = r.u8("var_used")? != 0;
            let evaluate_once = r.u8("var_evaluate_once")? != 0;
            let script_id = r.u16("var_script_id")?;
            variables.push(VariableEntry { kind, value_bits, used, evaluate_once, script_id });
        }

        Ok(MascotInfo {
            prototype_id,
            environment_id,
            current_state,
            current_action_name,
            current_action_index,
            current_behavior_name,
            current_affordance_name,
            actions,
            behaviors,
            variables,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MascotClicked {
    pub new_clicked_id: u32,
}

impl MascotClicked {
    pub fn decode(payload: &[u8]) -> Result<MascotClicked, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(MascotClicked { new_clicked_id: r.u32("new_clicked_id")? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub new_selected_id: u32,
    pub environments: Vec<u32>,
}

impl Select {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.u32(self.new_selected_id);
        w.u8(self.environments.len() as u8);
        for env in &self.environments {
            w.u32(*env);
        }
        frame(0x1E, 0, 0, w.0).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionDone {
    pub environment_id: u32,
    pub mascot_id: u32,
    pub x: u32,
    pub y: u32,
    pub surface_x: u32,
    pub surface_y: u32,
}

impl SelectionDone {
    pub fn decode(payload: &[u8]) -> Result<SelectionDone, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(SelectionDone {
            environment_id: r.u32("environment_id")?,
            mascot_id: r.u32("mascot_id")?,
            x: r.u32("x")?,
            y: r.u32("y")?,
            surface_x: r.u32("surface_x")?,
            surface_y: r.u32("surface_y")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadPrototype {
    pub prototype_path: String,
}

impl ReloadPrototype {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.str8(&self.prototype_path);
        frame(0x21, 0, 0, w.0).1
    }
}

/// Outbound: `force` rides in the frame's `flags` byte (spec §4.F), the fd
/// rides as ancillary data — `crate::client` attaches it when sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportPrototype {
    pub new_id: u32,
    pub force: bool,
}

impl ImportPrototype {
    pub fn encode(&self) -> (Vec<u8>, u8) {
        let mut w = Writer::default();
        w.u32(self.new_id);
        let (_, bytes) = frame(0x22, self.force as u8, 0, w.0);
        (bytes, self.force as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFailed {
    pub error_code: i32,
}

impl ImportFailed {
    pub fn decode(payload: &[u8]) -> Result<ImportFailed, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(ImportFailed { error_code: r.i32("error_code")? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFinished {
    pub relative_path: String,
}

impl ImportFinished {
    pub fn decode(payload: &[u8]) -> Result<ImportFinished, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(ImportFinished { relative_path: r.str8("relative_path")? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportProgress {
    pub progress: f32,
}

impl ImportProgress {
    pub fn decode(payload: &[u8]) -> Result<ImportProgress, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(ImportProgress { progress: r.f32("progress")? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPrototype {
    pub new_id: u32,
    pub prototype_id: u32,
}

impl ExportPrototype {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.u32(self.new_id);
        w.u32(self.prototype_id);
        frame(0x27, 0, 0, w.0).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFailed {
    pub error_code: u32,
}

impl ExportFailed {
    pub fn decode(payload: &[u8]) -> Result<ExportFailed, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(ExportFailed { error_code: r.u32("error_code")? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawn {
    pub prototype_id: u32,
    pub environment_id: u32,
    pub x: u32,
    pub y: u32,
    pub behavior: String,
}

impl Spawn {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.u32(self.prototype_id);
        w.u32(self.environment_id);
        w.u32(self.x);
        w.u32(self.y);
        w.str8(&self.behavior);
        frame(0x2A, 0, 0, w.0).1
    }

    pub fn decode(payload: &[u8]) -> Result<Spawn, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(Spawn {
            prototype_id: r.u32("prototype_id")?,
            environment_id: r.u32("environment_id")?,
            x: r.u32("x")?,
            y: r.u32("y")?,
            behavior: r.str8("behavior")?,
        })
    }
}

macro_rules! targeted_packet {
    ($name:ident, $type_id:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            pub object_id: u32,
        }
        impl $name {
            pub fn encode(&self) -> Vec<u8> {
                frame($type_id, 0, self.object_id, Vec::new()).1
            }
        }
    };
}

targeted_packet!(Dispose, 0x2B);
targeted_packet!(EnvironmentClose, 0x2E);
targeted_packet!(SelectionCancel, 0x3C);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyBehavior {
    pub object_id: u32,
    pub behavior: String,
}

impl ApplyBehavior {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.str8(&self.behavior);
        frame(0x50, 0, self.object_id, w.0).1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetConfigKey {
    pub key: String,
}

impl GetConfigKey {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.str8(&self.key);
        frame(0x51, 0, 0, w.0).1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetConfigKey {
    pub key: String,
    pub value: String,
}

impl SetConfigKey {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.str8(&self.key);
        w.str8(&self.value);
        frame(0x52, 0, 0, w.0).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListConfigKeys;

impl ListConfigKeys {
    pub fn encode(&self) -> Vec<u8> {
        frame(0x53, 0, 0, Vec::new()).1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    pub key: String,
    pub value: String,
}

impl ConfigKey {
    pub fn decode(payload: &[u8]) -> Result<ConfigKey, ProtocolError> {
        let mut r = Reader::new(payload);
        Ok(ConfigKey { key: r.str8("key")?, value: r.str8("value")? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop;

impl Stop {
    pub fn encode(&self) -> Vec<u8> {
        frame(0x56, 0, 0, Vec::new()).1
    }
}

pub fn client_hello_frame(version: u64) -> Vec<u8> {
    ClientHello { version }.encode(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_header_round_trips() {
        let header = FrameHeader { kind: 0x2A, flags: 0, length: 42, object_id: 7 };
        let encoded = header.encode();
        assert_eq!(FrameHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn spawn_round_trips_and_length_matches_total_bytes() {
        let spawn = Spawn { prototype_id: 7, environment_id: 3, x: 100, y: 200, behavior: "Fall".into() };
        let bytes = spawn.encode();
        let header = FrameHeader::decode(&bytes).unwrap();
        assert_eq!(header.length as usize, bytes.len());
        let decoded = Spawn::decode(&bytes[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, spawn);
    }

    #[test]
    fn short_frame_is_an_error() {
        let result = FrameHeader::decode(&[0u8; 4]);
        assert!(matches!(result, Err(ProtocolError::ShortFrame { .. })));
    }

    #[test]
    fn notice_decodes_severity_message_and_formatting_values() {
        let mut w = Writer::default();
        w.u8(1).u8(0).str8("hello %s");
        w.u8(1).str8("world");
        let notice = Notice::decode(&w.0).unwrap();
        assert_eq!(notice.severity, 1);
        assert_eq!(notice.message, "hello %s");
        assert_eq!(notice.formatting_values, vec!["world".to_string()]);
    }

    #[test]
    fn mascot_info_decodes_pools_and_variables() {
        let mut w = Writer::default();
        w.u32(1).u32(2).u32(0);
        w.str8("Stand");
        w.u16(0);
        w.str8("Fall");
        w.str8("");
        w.u8(1);
        w.str8("Walk").u32(3);
        w.u8(1);
        w.str8("Fall").u64(100);
        w.u16(1);
        w.u8(1).f32(1.5).u8(1).u8(0).u16(9);
        let info = MascotInfo::decode(&w.0).unwrap();
        assert_eq!(info.actions, vec![("Walk".to_string(), 3)]);
        assert_eq!(info.behaviors, vec![("Fall".to_string(), 100)]);
        assert_eq!(info.variables.len(), 1);
        assert!((info.variables[0].as_f32() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn truncated_payload_is_an_error_not_a_panic() {
        let result = EnvironmentMascot::decode(&[1, 2, 3]);
        assert!(matches!(result, Err(ProtocolError::Truncated { .. })));
    }
}
