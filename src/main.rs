use std::fs;
use std::os::fd::AsRawFd;
use std::time::Duration;

use clap::Parser;

use shimeji_ctl::cli::{Cli, ClientCommand, Command, ConvertArgs, PackageArgs};
use shimeji_ctl::client::{Client, ExportOutcome, ImportOutcome, StartupOptions};
use shimeji_ctl::clientconfig::ClientConfig;
use shimeji_ctl::error::CliError;
use shimeji_ctl::{client, package, packet};

const CONFIG_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    if let Err(err) = run(cli) {
        log::error!("{}", err);
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Convert(args) => convert(args),
        Command::Package(args) => package_cmd(args),
        Command::Client(command) => client_cmd(&cli, command),
    }
}

fn convert(args: &ConvertArgs) -> Result<(), CliError> {
    let actions_xml = fs::read_to_string(&args.actions)?;
    let behaviors_xml = fs::read_to_string(&args.behaviors)?;

    // `package::compile` runs the full converter + bytecode pipeline; the
    // manifest it also builds is package-specific and dropped here, since
    // `convert` only emits the three JSON documents spec §1 names.
    let pkg = package::compile("", "", "", &actions_xml, &behaviors_xml)?;

    fs::create_dir_all(&args.out_dir)?;
    fs::write(args.out_dir.join("programs.json"), serde_json::to_vec_pretty(&pkg.programs)?)?;
    fs::write(args.out_dir.join("actions.json"), serde_json::to_vec_pretty(&pkg.actions)?)?;
    fs::write(args.out_dir.join("behaviors.json"), serde_json::to_vec_pretty(&pkg.behaviors)?)?;

    log::info!(
        "converted {} programs, {} actions, {} behaviors into {}",
        pkg.programs.programs.len(),
        pkg.actions.len(),
        pkg.behaviors.definitions.len(),
        args.out_dir.display(),
    );
    Ok(())
}

fn package_cmd(args: &PackageArgs) -> Result<(), CliError> {
    let display_name = args.display_name.clone().unwrap_or_else(|| args.name.clone());
    package::compile_from_path(&args.dir, &args.name, &args.version, &display_name, &args.out)?;
    log::info!("wrote {}", args.out.display());
    Ok(())
}

fn resolve_options(cli: &Cli) -> Result<(String, StartupOptions), CliError> {
    let file_config = match &cli.config {
        Some(path) => ClientConfig::load(path).map_err(|e| CliError::Usage(e.to_string()))?,
        None => ClientConfig::default(),
    };
    let socket = cli.socket.clone().unwrap_or_else(|| file_config.resolved_socket_path());
    let options = StartupOptions {
        start: cli.start || file_config.start,
        cmdline_extra: Vec::new(),
        verbose: cli.verbose || file_config.verbose,
    };
    Ok((socket, options))
}

fn client_cmd(cli: &Cli, command: &ClientCommand) -> Result<(), CliError> {
    let (socket, options) = resolve_options(cli)?;
    let mut conn = Client::connect(&socket, &options)?;

    match command {
        ClientCommand::Status => {
            log::info!("connected to {} and completed the handshake", socket);
        }
        ClientCommand::ListPrototypes => {
            drain_initial_burst(&mut conn)?;
            for prototype in conn.objects.prototypes.values() {
                println!("{:08x} {} ({})", prototype.id, prototype.name, prototype.display_name);
            }
        }
        ClientCommand::ListEnvironments => {
            drain_initial_burst(&mut conn)?;
            for env in conn.objects.environments.values() {
                println!("{:08x} {} [{}x{} @ {},{}]", env.id, env.name, env.width, env.height, env.x, env.y);
            }
        }
        ClientCommand::Spawn(args) => {
            let bytes = packet::Spawn {
                prototype_id: args.prototype,
                environment_id: args.environment,
                x: args.x,
                y: args.y,
                behavior: args.behavior.clone(),
            }
            .encode();
            conn.send_packet(&bytes)?;
        }
        ClientCommand::Dispose { id } => {
            conn.send_packet(&packet::Dispose { object_id: *id }.encode())?;
        }
        ClientCommand::Select { environments } => {
            let new_id = conn.objects.new_selection(environments.clone());
            let bytes = packet::Select { new_selected_id: new_id, environments: environments.clone() }.encode();
            conn.send_packet(&bytes)?;
            log::info!("selection {:08x} started", new_id);
        }
        ClientCommand::Import { path, force } => import(&mut conn, path, *force)?,
        ClientCommand::Export { prototype, out } => export(&mut conn, *prototype, out)?,
        ClientCommand::ApplyBehavior { id, behavior } => {
            conn.send_packet(&packet::ApplyBehavior { object_id: *id, behavior: behavior.clone() }.encode())?;
        }
        ClientCommand::GetConfig { key } => get_config(&mut conn, key)?,
        ClientCommand::SetConfig { key, value } => {
            conn.send_packet(&packet::SetConfigKey { key: key.clone(), value: value.clone() }.encode())?;
        }
        ClientCommand::ListConfig => list_config(&mut conn)?,
        ClientCommand::ReloadPrototype { path } => {
            conn.send_packet(&packet::ReloadPrototype { prototype_path: path.clone() }.encode())?;
        }
        ClientCommand::Stop => {
            conn.send_packet(&packet::Stop.encode())?;
        }
    }
    Ok(())
}

/// Most of the read-only list commands need the daemon's opening burst of
/// `EnvironmentAnnouncement`/`StartPrototype`.../`CommitPrototypes` frames
/// to have landed in the object table first; there's no explicit "caught
/// up" signal, so this just drains whatever arrives within a short window.
fn drain_initial_burst(conn: &mut Client) -> Result<(), client::ClientError> {
    conn.run_until(Duration::from_millis(500), |_| false)?;
    Ok(())
}

fn import(conn: &mut Client, path: &std::path::Path, force: bool) -> Result<(), CliError> {
    let file = std::fs::File::open(path)?;
    let fd = file.as_raw_fd();
    let new_id = conn.objects.new_import(std::os::fd::OwnedFd::from(file.try_clone()?), force);
    let (bytes, _) = packet::ImportPrototype { new_id, force }.encode();
    conn.send_packet_with_fd(&bytes, fd)?;

    let finished = conn.run_until(CONFIG_TIMEOUT, |c| {
        matches!(&c.last_import, Some(ImportOutcome::Finished(_)) | Some(ImportOutcome::Failed(_)))
    })?;
    conn.objects.imports.remove(&new_id);
    if !finished {
        return Err(CliError::Usage(format!("import of {} timed out after {:?}", path.display(), CONFIG_TIMEOUT)));
    }
    match &conn.last_import {
        Some(ImportOutcome::Finished(relative_path)) => {
            log::info!("imported {} as {}", path.display(), relative_path);
            Ok(())
        }
        Some(ImportOutcome::Failed(code)) => Err(CliError::Usage(import_failure_message(*code))),
        _ => Err(CliError::Usage("import ended without a result".to_string())),
    }
}

fn import_failure_message(code: i32) -> String {
    match code {
        0 => "import failed: malformed package".to_string(),
        1 => "import failed: unsupported package version".to_string(),
        2 => "import failed: missing manifest".to_string(),
        3 => "import failed: missing program, action, or behavior data".to_string(),
        4 => "import failed: a prototype with this name already exists (use --force)".to_string(),
        5 => "import failed: asset extraction error".to_string(),
        6 => "import failed: permission denied".to_string(),
        7 => "import failed: daemon out of resources".to_string(),
        other => format!("import failed: unknown error code {}", other),
    }
}

fn export(conn: &mut Client, prototype: u32, out: &std::path::Path) -> Result<(), CliError> {
    let file = std::fs::File::create(out)?;
    let fd = file.as_raw_fd();
    let new_id = conn.objects.new_export(std::os::fd::OwnedFd::from(file.try_clone()?), prototype);
    let bytes = packet::ExportPrototype { new_id, prototype_id: prototype }.encode();
    conn.send_packet_with_fd(&bytes, fd)?;

    let finished = conn.run_until(CONFIG_TIMEOUT, |c| matches!(c.last_export, Some(_)))?;
    conn.objects.exports.remove(&new_id);
    if !finished {
        return Err(CliError::Usage(format!("export to {} timed out after {:?}", out.display(), CONFIG_TIMEOUT)));
    }
    match conn.last_export {
        Some(ExportOutcome::Finished) => {
            log::info!("exported prototype {:08x} to {}", prototype, out.display());
            Ok(())
        }
        Some(ExportOutcome::Failed(code)) => Err(CliError::Usage(format!("export failed: error code {}", code))),
        None => Err(CliError::Usage("export ended without a result".to_string())),
    }
}

fn get_config(conn: &mut Client, key: &str) -> Result<(), CliError> {
    conn.send_packet(&packet::GetConfigKey { key: key.to_string() }.encode())?;
    let found = conn.run_until(CONFIG_TIMEOUT, |c| matches!(&c.last_config_key, Some((k, _)) if k == key))?;
    if !found {
        return Err(CliError::Usage(format!("no response for config key {:?} within {:?}", key, CONFIG_TIMEOUT)));
    }
    if let Some((_, value)) = &conn.last_config_key {
        println!("{}", value);
    }
    Ok(())
}

fn list_config(conn: &mut Client) -> Result<(), CliError> {
    let before = conn.config_keys.len();
    conn.send_packet(&packet::ListConfigKeys.encode())?;
    conn.run_until(CONFIG_TIMEOUT, |c| c.config_keys.len() > before)?;
    // Give trailing keys a little more time to land, then stop.
    conn.run_until(Duration::from_millis(200), |_| false)?;
    for (key, value) in &conn.config_keys[before..] {
        println!("{} = {}", key, value);
    }
    Ok(())
}
