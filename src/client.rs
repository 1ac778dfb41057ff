// Socket bring-up, handshake, and the blocking dispatch loop (spec §4.G).
//
// Connects to the overlay's `SOCK_SEQPACKET` socket; if that fails and the
// caller asked to start one, forks a socketpair end to the daemon instead
// (`original_source/client.py::Client.__init__`'s connect-or-spawn
// fallback). The dispatch loops below block on one `recvmsg` per
// iteration — spec §5 is explicit that this client does no asynchronous
// I/O.

use crate::objects::{Environment, Mascot, ObjectTable};
use crate::packet;
use nix::sys::socket::{self, AddressFamily, ControlMessageOwned, MsgFlags, SockFlag, SockType, UnixAddr};
use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("overlay is already running at {0}")]
    AlreadyRunning(String),
    #[error("overlay is not running at {0} and start was not requested")]
    NotRunning(String),
    #[error("failed to start overlay: {0}")]
    SpawnFailed(String),
    #[error("socket error: {0}")]
    Socket(#[from] nix::Error),
    #[error(transparent)]
    Protocol(#[from] packet::ProtocolError),
    #[error("handshake did not complete before the connection closed")]
    HandshakeFailed,
}

pub struct StartupOptions {
    pub start: bool,
    pub cmdline_extra: Vec<String>,
    pub verbose: bool,
}

impl Default for StartupOptions {
    fn default() -> Self {
        StartupOptions { start: false, cmdline_extra: Vec::new(), verbose: false }
    }
}

/// One received frame, decoded header plus payload and any fds carried
/// alongside it (ownership passes to the caller, matching spec's FD
/// ownership invariant — the caller must fold them into `ObjectTable` or
/// drop them, never leak the raw numbers).
pub struct Received {
    pub header: packet::FrameHeader,
    pub payload: Vec<u8>,
    pub fds: Vec<OwnedFd>,
}

/// Outcome of an in-flight `ImportPrototype`, tracked so the CLI's
/// polling helpers (spec §4.G's `run_until`) can observe the result
/// without threading a callback through the dispatch loop.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Started,
    Progress(f32),
    Finished(String),
    Failed(i32),
}

#[derive(Debug, Clone, Copy)]
pub enum ExportOutcome {
    Finished,
    Failed(u32),
}

pub struct Client {
    socket: OwnedFd,
    pub initialized: bool,
    pub objects: ObjectTable,
    pub last_import: Option<ImportOutcome>,
    pub last_export: Option<ExportOutcome>,
    pub last_config_key: Option<(String, String)>,
    pub config_keys: Vec<(String, String)>,
    interrupted: Arc<AtomicBool>,
}

impl Client {
    /// Connect to `address`, falling back to forking an overlay instance
    /// over a freshly created socketpair when `options.start` is set and
    /// the initial connect fails (spec §4.G "Startup").
    pub fn connect(address: &str, options: &StartupOptions) -> Result<Client, ClientError> {
        let fd = socket::socket(AddressFamily::Unix, SockType::SeqPacket, SockFlag::empty(), None)?;
        let addr = UnixAddr::new(Path::new(address)).map_err(ClientError::Socket)?;

        let socket = match socket::connect(fd.as_raw_fd(), &addr) {
            Ok(()) => {
                if options.start {
                    return Err(ClientError::AlreadyRunning(address.to_string()));
                }
                fd
            }
            Err(_) if !options.start => {
                return Err(ClientError::NotRunning(address.to_string()));
            }
            Err(_) => spawn_overlay(address, options)?,
        };

        let mut client = Client {
            socket,
            initialized: false,
            objects: ObjectTable::new(),
            last_import: None,
            last_export: None,
            last_config_key: None,
            config_keys: Vec::new(),
            interrupted: install_sigint_flag(),
        };
        client.send(&packet::client_hello_frame(1), &[])?;
        client.wait_for_session_start()?;
        Ok(client)
    }

    /// Blocks until `StartSession` arrives, completing the handshake
    /// kicked off by `ClientHello` in `connect` (spec §4.G).
    fn wait_for_session_start(&mut self) -> Result<(), ClientError> {
        while !self.initialized {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(ClientError::HandshakeFailed);
            }
            match self.recv_one()? {
                None => return Err(ClientError::HandshakeFailed),
                Some(received) => self.handle_frame(received)?,
            }
        }
        Ok(())
    }

    fn send(&mut self, bytes: &[u8], fds: &[RawFd]) -> Result<(), ClientError> {
        let iov = [IoSlice::new(bytes)];
        let cmsg = if fds.is_empty() {
            Vec::new()
        } else {
            vec![socket::ControlMessage::ScmRights(fds)]
        };
        socket::sendmsg::<UnixAddr>(self.socket.as_raw_fd(), &iov, &cmsg, MsgFlags::empty(), None)?;
        Ok(())
    }

    /// Send a packet with no ancillary fds — the common case for every
    /// outbound message except `ImportPrototype`/`ExportPrototype`.
    pub fn send_packet(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.send(bytes, &[])
    }

    pub fn send_packet_with_fd(&mut self, bytes: &[u8], fd: RawFd) -> Result<(), ClientError> {
        self.send(bytes, &[fd])
    }

    fn recv_one(&mut self) -> Result<Option<Received>, ClientError> {
        let mut buf = vec![0u8; 4096];
        let mut iov = [IoSliceMut::new(&mut buf)];
        let mut cmsg_buffer = nix::cmsg_space!([RawFd; 4]);
        let msg = socket::recvmsg::<UnixAddr>(
            self.socket.as_raw_fd(),
            &mut iov,
            Some(&mut cmsg_buffer),
            MsgFlags::empty(),
        )?;

        let n = msg.bytes;
        if n == 0 {
            return Ok(None);
        }

        let mut fds = Vec::new();
        for cmsg in msg.cmsgs() {
            if let ControlMessageOwned::ScmRights(received) = cmsg {
                fds.extend(received.into_iter().map(|fd| unsafe { OwnedFd::from_raw_fd(fd) }));
            }
        }

        let header = packet::FrameHeader::decode(&buf[..n])?;
        let payload = buf[packet::HEADER_LEN..n].to_vec();
        Ok(Some(Received { header, payload, fds }))
    }

    /// Run the event loop forever (the "foreground" mode named in spec
    /// §4.G), applying every incoming frame to the object table.
    pub fn run_foreground(&mut self) -> Result<(), ClientError> {
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                return self.cancel_active_selection();
            }
            match self.recv_one()? {
                None => continue,
                Some(received) => self.handle_frame(received)?,
            }
        }
    }

    /// Run until `deadline` elapses or `done` returns true — used by the
    /// config get/set commands, which give up after 5s (spec §5).
    pub fn run_until(&mut self, deadline: Duration, mut done: impl FnMut(&Client) -> bool) -> Result<bool, ClientError> {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if self.interrupted.load(Ordering::SeqCst) {
                self.cancel_active_selection()?;
                return Ok(false);
            }
            if done(self) {
                return Ok(true);
            }
            match self.recv_one()? {
                None => continue,
                Some(received) => self.handle_frame(received)?,
            }
        }
        Ok(false)
    }

    fn cancel_active_selection(&mut self) -> Result<(), ClientError> {
        let ids: Vec<u32> = self.objects.selections.keys().copied().collect();
        for id in ids {
            let bytes = packet::SelectionCancel { object_id: id }.encode();
            self.send_packet(&bytes)?;
        }
        Ok(())
    }

    /// Route one decoded frame by its 8-bit type, updating the object
    /// table (spec §4.G's last paragraph). Unknown type bytes are
    /// silently ignored — forward compatibility per spec §7.
    fn handle_frame(&mut self, received: Received) -> Result<(), ClientError> {
        let Received { header, payload, fds } = received;
        let mut fds = fds.into_iter();

        match header.kind {
            0x01 => {} // ServerHello
            0x03 => {
                if let Ok(notice) = packet::Notice::decode(&payload) {
                    match notice.severity {
                        0 => log::info!("{}", notice.message),
                        1 => log::warn!("{}", notice.message),
                        _ => {
                            log::error!("{}", notice.message);
                        }
                    }
                }
            }
            0x04 => self.initialized = true,
            0x05 => {
                let announcement = packet::EnvironmentAnnouncement::decode(&payload)?;
                self.objects.environment_announced(Environment {
                    id: announcement.new_id,
                    name: announcement.name,
                    description: announcement.description,
                    x: announcement.x,
                    y: announcement.y,
                    width: announcement.width,
                    height: announcement.height,
                    scale: announcement.scale,
                    mascots: Vec::new(),
                });
            }
            0x06 => {
                let changed = packet::EnvironmentChanged::decode(&payload)?;
                if let Some(env) = self.objects.environments.get_mut(&header.object_id) {
                    env.name = changed.name;
                    env.description = changed.description;
                    env.x = changed.x;
                    env.y = changed.y;
                    env.width = changed.width;
                    env.height = changed.height;
                    env.scale = changed.scale;
                }
            }
            0x07 => {
                let added = packet::EnvironmentMascot::decode(&payload)?;
                self.objects.mascot_added(
                    header.object_id,
                    Mascot::new(added.mascot_new_id, added.prototype_id, header.object_id),
                );
            }
            0x08 => self.objects.environment_withdrawn(header.object_id),
            0x09 => {
                let start = packet::StartPrototype::decode(&payload)?;
                self.objects.start_prototype(start.prototype_id);
            }
            0x0A => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.name = packet::PrototypeName::decode(&payload)?.name;
                }
            }
            0x0B => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.display_name = packet::PrototypeDisplayName::decode(&payload)?.display_name;
                }
            }
            0x0C => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.path = packet::PrototypePath::decode(&payload)?.path;
                }
            }
            0x0D => {
                let fd = fds.next().ok_or(packet::ProtocolError::MissingFd("PrototypeFD"))?;
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.fd = Some(fd);
                }
            }
            0x0E => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.actions.push(packet::PrototypeAddAction::decode(&payload)?.action);
                }
            }
            0x0F => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.behaviors.push(packet::PrototypeAddBehavior::decode(&payload)?.behavior);
                }
            }
            0x10 => {
                let fd = fds.next().ok_or(packet::ProtocolError::MissingFd("PrototypeIcon"))?;
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.icon_fd = Some(fd);
                }
            }
            0x11 => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.author = packet::PrototypeAuthor::decode(&payload)?.author;
                }
            }
            0x12 => {
                if let Some(p) = self.objects.prototypes_pending.get_mut(&header.object_id) {
                    p.version = packet::PrototypeVersion::decode(&payload)?.version;
                }
            }
            0x13 => self.objects.commit_prototypes(),
            0x14 => {
                let migrated = packet::MascotMigrated::decode(&payload)?;
                self.objects.mascot_migrated(header.object_id, migrated.environment_id);
            }
            0x15 => self.objects.mascot_disposed(header.object_id),
            0x17 => {
                let info = packet::MascotInfo::decode(&payload)?;
                if let Some(mascot) = self.objects.mascots.get_mut(&header.object_id) {
                    mascot.prototype = info.prototype_id;
                    mascot.environment = Some(info.environment_id);
                    mascot.current_action = info.current_action_name;
                    mascot.action_index = info.current_action_index as i64;
                    mascot.state = info.current_state;
                    mascot.current_behavior = info.current_behavior_name;
                    mascot.affordance = info.current_affordance_name;
                    mascot.action_stack = info.actions;
                    mascot.behavior_pool = info.behaviors;
                    mascot.variables = info.variables;
                }
            }
            0x1F => {
                let done = packet::SelectionDone::decode(&payload)?;
                log::info!(
                    "selected point ({},{}) in environment {}, mascot {}",
                    done.x,
                    done.y,
                    done.environment_id,
                    done.mascot_id
                );
                self.objects.selections.remove(&header.object_id);
            }
            0x20 => {
                log::info!("selection cancelled");
                self.objects.selections.remove(&header.object_id);
            }
            0x23 => self.last_import = Some(ImportOutcome::Failed(packet::ImportFailed::decode(&payload)?.error_code)),
            0x24 => self.last_import = Some(ImportOutcome::Started),
            0x25 => self.last_import = Some(ImportOutcome::Finished(packet::ImportFinished::decode(&payload)?.relative_path)),
            0x26 => self.last_import = Some(ImportOutcome::Progress(packet::ImportProgress::decode(&payload)?.progress)),
            0x28 => self.last_export = Some(ExportOutcome::Failed(packet::ExportFailed::decode(&payload)?.error_code)),
            0x29 => self.last_export = Some(ExportOutcome::Finished),
            0x54 => {
                let config = packet::ConfigKey::decode(&payload)?;
                self.config_keys.push((config.key.clone(), config.value.clone()));
                self.last_config_key = Some((config.key, config.value));
            }
            0x55 => {} // ClickEventExpired
            0x57 => {
                self.objects.prototypes.remove(&header.object_id);
            }
            _ => log::debug!("ignoring unknown packet type 0x{:02X}", header.kind),
        }
        Ok(())
    }
}

fn install_sigint_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag)) {
        log::warn!("failed to install SIGINT handler: {}", err);
    }
    flag
}

/// Create a socketpair, fork+exec the overlay daemon with the peer end
/// passed through, and return our end (spec §4.G). Waits up to 1s for an
/// immediate exit, which indicates the daemon failed to start.
fn spawn_overlay(address: &str, options: &StartupOptions) -> Result<OwnedFd, ClientError> {
    let (ours, theirs) =
        socket::socketpair(AddressFamily::Unix, SockType::SeqPacket, None, SockFlag::empty())?;

    let mut command = std::process::Command::new("shimeji-overlayd");
    command.args(&options.cmdline_extra);
    command.arg("-cfd").arg(theirs.as_raw_fd().to_string());
    if !options.verbose {
        command.stdout(std::process::Stdio::null());
        command.stderr(std::process::Stdio::null());
    }
    // The child inherits open fds across fork+exec on Unix by default
    // unless FD_CLOEXEC is set; `theirs` was created without CLOEXEC so
    // it survives into the daemon process, matching
    // `subprocess.Popen(pass_fds=[overlay_side.fileno()])`.
    let mut child = command.spawn().map_err(|e| ClientError::SpawnFailed(e.to_string()))?;
    drop(theirs);

    match child.try_wait() {
        Ok(Some(status)) => Err(ClientError::SpawnFailed(format!("overlay exited immediately: {}", status))),
        Ok(None) => {
            std::thread::sleep(Duration::from_millis(50));
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ClientError::SpawnFailed(format!("overlay exited immediately: {}", status)));
            }
            log::debug!("started overlay for {}", address);
            Ok(ours)
        }
        Err(e) => Err(ClientError::SpawnFailed(e.to_string())),
    }
}

pub fn default_socket_path() -> String {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    format!("{}/shimeji-overlayd.sock", runtime_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_socket_path_falls_back_to_tmp() {
        std::env::remove_var("XDG_RUNTIME_DIR");
        assert_eq!(default_socket_path(), "/tmp/shimeji-overlayd.sock");
    }

    #[test]
    fn default_socket_path_honors_xdg_runtime_dir() {
        std::env::set_var("XDG_RUNTIME_DIR", "/run/user/1000");
        assert_eq!(default_socket_path(), "/run/user/1000/shimeji-overlayd.sock");
        std::env::remove_var("XDG_RUNTIME_DIR");
    }
}
