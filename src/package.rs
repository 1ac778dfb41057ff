// `.wlshm` package container: a 512-byte `WLPK` header followed by an
// uncompressed tar stream holding `manifest.json`, `scripts.json`,
// `actions.json`, `behaviors.json` and an `assets/` tree (spec §6).
//
// `compile` runs the converter (spec §4.E) and then drives every
// discovered program candidate through the tokenizer/parser/emitter/
// serializer pipeline (spec §4.A-D) one expression at a time. `write`
// walks an already-open assets directory fd and tars the result.
// `compile_from_dir_fd` ties the two together, reading `actions.xml` and
// `behaviors.xml` relative to a directory fd the caller already holds
// open, so no path component is ever resolved outside it — the variant
// spec §9 prefers for security. `compile_from_path` opens the directory
// itself and delegates, matching the filesystem-path convenience form on
// the happy path.

use crate::bytecode;
use crate::convert::{self, ConvertError};
use crate::model::{ActionDef, BehaviorsFile, Manifest, ProgramEntry, ProgramsFile};
use crate::serializer;
use nix::dir::{Dir, Type};
use nix::fcntl::{openat, OFlag};
use nix::sys::stat::Mode;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::path::Path;
use thiserror::Error;

pub const HEADER_LEN: usize = 512;
pub const MAGIC: &[u8; 4] = b"WLPK";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Emit(#[from] bytecode::EmitError),
    #[error(transparent)]
    Serialize(#[from] serializer::EmitError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("nix error: {0}")]
    Nix(#[from] nix::Error),
    #[error("name or version too long to fit the {HEADER_LEN}-byte package header: {0:?}")]
    HeaderFieldTooLong(String),
}

/// The converted, compiled mascot definition, ready to be written out as a
/// `.wlshm` package. Assembled by `compile`; written by `write`.
pub struct CompiledPackage {
    pub manifest: Manifest,
    pub programs: ProgramsFile,
    pub actions: Vec<ActionDef>,
    pub behaviors: BehaviorsFile,
}

/// Walk `actions.xml`/`behaviors.xml` through the converter, then compile
/// every discovered program candidate end to end.
pub fn compile(
    name: &str,
    version: &str,
    display_name: &str,
    actions_xml: &str,
    behaviors_xml: &str,
) -> Result<CompiledPackage, PackageError> {
    let (candidates, actions, behaviors) = convert::shmconv(actions_xml, behaviors_xml)?;

    let mut programs = Vec::with_capacity(candidates.len());
    for (index, expression) in candidates.iter().enumerate() {
        let program = bytecode::compile(expression, Vec::new(), Vec::new(), Vec::new())?;
        let emitted = serializer::emit(&program)?;
        programs.push(ProgramEntry {
            name: index,
            symtab_l: emitted.local_vars,
            symtab_g: emitted.global_vars,
            symtab_f: emitted.functions,
            instructions: emitted.instructions,
            evaluate_once: emitted.evaluate_once,
        });
    }

    let manifest = Manifest {
        name: name.to_string(),
        version: version.to_string(),
        description: String::new(),
        display_name: display_name.to_string(),
        programs: programs.len(),
        actions: actions.len(),
        behaviors: behaviors.definitions.len(),
        assets: 0,
        icon: None,
        artist: None,
        scripter: None,
        commissioner: None,
        support: None,
    };

    Ok(CompiledPackage {
        manifest,
        programs: ProgramsFile { programs },
        actions,
        behaviors,
    })
}

fn fixed_header(name: &str, version: &str) -> Result<[u8; HEADER_LEN], PackageError> {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(MAGIC);
    let mut offset = 4;

    let name_bytes = name.as_bytes();
    if name_bytes.len() > u8::MAX as usize {
        return Err(PackageError::HeaderFieldTooLong(name.to_string()));
    }
    header[offset] = name_bytes.len() as u8;
    offset += 1;
    header[offset..offset + name_bytes.len()].copy_from_slice(name_bytes);
    offset += name_bytes.len();

    let version_bytes = version.as_bytes();
    if version_bytes.len() > u8::MAX as usize || offset + 1 + version_bytes.len() > HEADER_LEN {
        return Err(PackageError::HeaderFieldTooLong(version.to_string()));
    }
    header[offset] = version_bytes.len() as u8;
    offset += 1;
    header[offset..offset + version_bytes.len()].copy_from_slice(version_bytes);

    Ok(header)
}

fn append_bytes<W: Write>(builder: &mut tar::Builder<W>, path: &str, bytes: &[u8]) -> Result<(), PackageError> {
    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, bytes)?;
    Ok(())
}

/// Recursively collect every regular file under `dir_fd` as
/// `(archive_path, contents)` pairs, descending directories as it finds
/// them. Never resolves a path component outside `dir_fd` itself.
fn collect_assets(dir_fd: RawFd, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, PackageError> {
    let mut out = Vec::new();
    let mut dir = Dir::openat(dir_fd, ".", OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty())?;

    for entry in dir.iter() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "." || name == ".." {
            continue;
        }
        match entry.file_type() {
            Some(Type::Directory) => {
                let sub_fd = openat(dir_fd, entry.file_name(), OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty())?;
                let nested = collect_assets(sub_fd, &format!("{}/{}", prefix, name));
                let _ = nix::unistd::close(sub_fd);
                out.extend(nested?);
            }
            Some(Type::File) | None => {
                let file_fd = openat(dir_fd, entry.file_name(), OFlag::O_RDONLY, Mode::empty())?;
                let mut file = unsafe { File::from_raw_fd(file_fd) };
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)?;
                out.push((format!("{}/{}", prefix, name), bytes));
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Write a compiled package plus its asset tree to `out` as the fixed
/// `WLPK` header followed by an uncompressed tar stream (spec §6).
/// `assets_dir_fd` of `None` packages an empty `assets/` tree.
pub fn write<W: Write>(pkg: &mut CompiledPackage, assets_dir_fd: Option<RawFd>, mut out: W) -> Result<(), PackageError> {
    let assets = match assets_dir_fd {
        Some(fd) => collect_assets(fd, "assets")?,
        None => Vec::new(),
    };
    pkg.manifest.assets = assets.len();

    out.write_all(&fixed_header(&pkg.manifest.name, &pkg.manifest.version)?)?;

    let mut builder = tar::Builder::new(&mut out);
    append_bytes(&mut builder, "manifest.json", &serde_json::to_vec_pretty(&pkg.manifest)?)?;
    append_bytes(&mut builder, "scripts.json", &serde_json::to_vec_pretty(&pkg.programs)?)?;
    append_bytes(&mut builder, "actions.json", &serde_json::to_vec_pretty(&pkg.actions)?)?;
    append_bytes(&mut builder, "behaviors.json", &serde_json::to_vec_pretty(&pkg.behaviors)?)?;
    for (path, bytes) in &assets {
        append_bytes(&mut builder, path, bytes)?;
    }
    builder.finish()?;
    Ok(())
}

fn read_relative(dir_fd: RawFd, name: &str) -> Result<String, PackageError> {
    let fd = openat(dir_fd, name, OFlag::O_RDONLY, Mode::empty())?;
    let mut file = unsafe { File::from_raw_fd(fd) };
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Compile a mascot definition whose `actions.xml`, `behaviors.xml` and
/// `assets/` live under an already-open directory fd, and write the
/// resulting `.wlshm` package to `out_path` (spec §9's preferred variant).
pub fn compile_from_dir_fd(
    dir_fd: RawFd,
    name: &str,
    version: &str,
    display_name: &str,
    out_path: &Path,
) -> Result<(), PackageError> {
    let actions_xml = read_relative(dir_fd, "actions.xml")?;
    let behaviors_xml = read_relative(dir_fd, "behaviors.xml")?;
    let mut pkg = compile(name, version, display_name, &actions_xml, &behaviors_xml)?;

    let assets_fd = match openat(dir_fd, "assets", OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty()) {
        Ok(fd) => Some(fd),
        Err(nix::Error::ENOENT) => None,
        Err(e) => return Err(e.into()),
    };

    let out = File::create(out_path)?;
    write(&mut pkg, assets_fd, out)?;
    if let Some(fd) = assets_fd {
        let _ = nix::unistd::close(fd);
    }
    Ok(())
}

/// Convenience wrapper over `compile_from_dir_fd` for callers that only
/// have a filesystem path. Behaves identically on the happy path.
pub fn compile_from_path(dir: &Path, name: &str, version: &str, display_name: &str, out_path: &Path) -> Result<(), PackageError> {
    let dir_file = File::open(dir)?;
    compile_from_dir_fd(dir_file.as_raw_fd(), name, version, display_name, out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Seek;

    const ACTIONS_XML: &str = r#"<Mascot xmlns="http://www.group-finity.com/Mascot">
      <ActionList>
        <Action Type="Stay" Name="Stand" BorderType="Floor">
          <Animation><Pose Image="/shime1.png" ImageAnchor="64,128" Velocity="0,0" Duration="250"/></Animation>
        </Action>
      </ActionList>
    </Mascot>"#;

    const BEHAVIORS_XML: &str = r#"<Mascot xmlns="http://www.group-finity.com/Mascot">
      <BehaviorList><Behavior Name="Stand" Frequency="100"/></BehaviorList>
    </Mascot>"#;

    #[test]
    fn compile_counts_programs_actions_and_behaviors() {
        let pkg = compile("demo", "1.0", "Demo", ACTIONS_XML, BEHAVIORS_XML).unwrap();
        assert_eq!(pkg.manifest.actions, 1);
        assert_eq!(pkg.manifest.behaviors, 1);
        assert_eq!(pkg.manifest.assets, 0);
    }

    #[test]
    fn write_emits_wlpk_header_followed_by_tar_stream() {
        let mut pkg = compile("demo", "1.0", "Demo", ACTIONS_XML, BEHAVIORS_XML).unwrap();
        let mut buf = std::io::Cursor::new(Vec::new());
        write(&mut pkg, None, &mut buf).unwrap();

        let bytes = buf.into_inner();
        assert!(bytes.len() > HEADER_LEN);
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(bytes[4] as usize, "demo".len());

        let mut archive = tar::Archive::new(&bytes[HEADER_LEN..]);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"manifest.json".to_string()));
        assert!(names.contains(&"scripts.json".to_string()));
        assert!(names.contains(&"actions.json".to_string()));
        assert!(names.contains(&"behaviors.json".to_string()));
    }

    #[test]
    fn compile_from_path_writes_a_package_from_a_mascot_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("actions.xml"), ACTIONS_XML).unwrap();
        std::fs::write(dir.path().join("behaviors.xml"), BEHAVIORS_XML).unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/shime1.png"), b"not-really-a-png").unwrap();

        let out_path = dir.path().join("out.wlshm");
        compile_from_path(dir.path(), "demo", "1.0", "Demo", &out_path).unwrap();

        let mut file = File::open(&out_path).unwrap();
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).unwrap();
        assert_eq!(&magic, MAGIC);

        file.seek(std::io::SeekFrom::Start(HEADER_LEN as u64)).unwrap();
        let mut rest = Vec::new();
        file.read_to_end(&mut rest).unwrap();
        let mut archive = tar::Archive::new(&rest[..]);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.ends_with("assets/shime1.png")));
    }
}
