//! Engine cycles against a mock process table and on-disk log fixtures.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use biomewatch_core::{
    AssignmentMethod, BiomeTable, BiomeType, DetectionConfig, Engine, EngineEvent, EventReceiver,
    MockProcessProvider, TransientKind,
};
use chrono::Utc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    primary: PathBuf,
    state: PathBuf,
    processes: MockProcessProvider,
    engine: Engine<MockProcessProvider>,
    events: EventReceiver,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("primary");
        let state = dir.path().join("state");
        fs::create_dir_all(&primary).unwrap();
        fs::create_dir_all(&state).unwrap();

        let config = DetectionConfig {
            process_names: vec!["TestClient".to_string()],
            log_dirs: vec![primary.clone()],
            state_log_dirs: vec![state.clone()],
            ..DetectionConfig::default()
        };

        let processes = MockProcessProvider::new();
        let (engine, events) =
            Engine::new(config, processes.clone(), Arc::new(BiomeTable::builtin()));

        Self {
            _dir: dir,
            primary,
            state,
            processes,
            engine,
            events,
        }
    }

    fn drain(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn write_log(path: &Path, lines: &[&str]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).unwrap();
}

fn append_log(path: &Path, lines: &[&str]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

fn count(events: &[EngineEvent], pred: impl Fn(&EngineEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

fn is_state_changed(event: &EngineEvent) -> bool {
    matches!(event, EngineEvent::StateChanged(_))
}

fn is_transient(event: &EngineEvent) -> bool {
    matches!(event, EngineEvent::TransientEventFired { .. })
}

const SANDSTORM: &str = r#"2024-05-01T12:00:00.000Z,1.0,[BloxstrapRPC] {"largeImage":{"hoverText":"Sandstorm"}}"#;
const MARI: &str = "2024-05-01T12:00:05.000Z,1.0,[Merchant]: Mari has arrived on the island";

#[test]
fn test_instance_lifecycle_events() {
    let mut fx = Fixture::new();
    fx.processes.spawn(100, "TestClient.exe", None);
    fx.processes.spawn(200, "OtherApp", None);

    let report = fx.engine.run_cycle();
    assert_eq!(report.added, 1);
    let events = fx.drain();
    assert_eq!(count(&events, |e| matches!(e, EngineEvent::InstanceAdded(i) if i.pid == 100)), 1);
    assert_eq!(fx.engine.instances()[0].display_name, "Instance 100");

    fx.processes.kill(100);
    let report = fx.engine.run_cycle();
    assert_eq!(report.removed, 1);
    let events = fx.drain();
    assert_eq!(count(&events, |e| matches!(e, EngineEvent::InstanceRemoved(i) if i.pid == 100)), 1);
    assert!(fx.engine.store().is_empty());
}

#[test]
fn test_hex_pid_file_is_assigned_by_filename() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("Player_5E5C_2024.log");
    write_log(&log, &["2024-05-01T11:59:00.000Z,0.0,boot"]);
    fx.processes.spawn(24156, "TestClient", None);

    let report = fx.engine.run_cycle();
    assert_eq!(report.assigned, 1);

    let instance = fx.engine.store().get(24156).unwrap().clone();
    assert_eq!(instance.primary_log.as_deref(), Some(log.as_path()));
    assert_eq!(instance.assignment, Some(AssignmentMethod::Filename));
}

#[test]
fn test_same_state_fires_once_across_cycles() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("Player_5E5C_2024.log");
    write_log(&log, &["2024-05-01T11:59:00.000Z,0.0,boot", SANDSTORM]);
    fx.processes.spawn(24156, "TestClient", None);

    fx.engine.run_cycle();
    let events = fx.drain();
    assert_eq!(count(&events, is_state_changed), 1);
    assert_eq!(fx.engine.store().get(24156).unwrap().biome, BiomeType::Sandstorm);

    // Unchanged file
    fx.engine.run_cycle();
    assert_eq!(count(&fx.drain(), is_state_changed), 0);

    // Same biome announced again
    append_log(&log, &[r#"2024-05-01T12:01:00.000Z,1.0,"biome": "Sandstorm""#]);
    fx.engine.run_cycle();
    assert_eq!(count(&fx.drain(), is_state_changed), 0);

    append_log(&log, &[r#"2024-05-01T12:02:00.000Z,1.0,"biome": "Windy""#]);
    fx.engine.run_cycle();
    assert_eq!(count(&fx.drain(), is_state_changed), 1);
    assert_eq!(fx.engine.store().get(24156).unwrap().biome, BiomeType::Windy);
}

#[test]
fn test_transient_event_is_not_repeated() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("Player_5E5C_2024.log");
    write_log(&log, &[SANDSTORM, MARI]);
    fx.processes.spawn(24156, "TestClient", None);

    fx.engine.run_cycle();
    let events = fx.drain();
    assert_eq!(count(&events, is_transient), 1);
    let watermark = fx.engine.store().get(24156).unwrap().last_event_time;
    assert!(watermark.is_some());

    append_log(&log, &["2024-05-01T12:00:09.000Z,1.0,chatter"]);
    fx.engine.run_cycle();
    assert_eq!(count(&fx.drain(), is_transient), 0);

    let instance = fx.engine.store().get(24156).unwrap();
    assert!(instance.has_fired(TransientKind::Merchant));
    assert!(instance.last_event_time >= watermark);
}

#[test]
fn test_state_change_rearms_transients() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("Player_5E5C_2024.log");
    write_log(&log, &[SANDSTORM, MARI]);
    fx.processes.spawn(24156, "TestClient", None);
    fx.engine.run_cycle();
    fx.drain();

    append_log(
        &log,
        &[
            r#"2024-05-01T12:10:00.000Z,1.0,"biome": "Rainy""#,
            "2024-05-01T12:10:05.000Z,1.0,[Merchant]: Mari has arrived on the island",
        ],
    );
    fx.engine.run_cycle();
    let events = fx.drain();
    assert_eq!(count(&events, is_state_changed), 1);
    assert_eq!(count(&events, is_transient), 1);
}

#[test]
fn test_exclusive_assignment() {
    let mut fx = Fixture::new();
    write_log(&fx.primary.join("client_session.log"), &["boot"]);
    let now = Utc::now();
    fx.processes.spawn(1001, "TestClient", Some(now));
    fx.processes.spawn(1002, "TestClient", Some(now));

    fx.engine.run_cycle();

    let assigned: Vec<_> = fx
        .engine
        .instances()
        .into_iter()
        .filter_map(|i| i.primary_log)
        .collect();
    assert_eq!(assigned.len(), 1);
}

#[test]
fn test_filename_beats_content() {
    let mut fx = Fixture::new();
    let by_name = fx.primary.join("Player_5E5C_old.log");
    write_log(&by_name, &["boot"]);
    std::thread::sleep(std::time::Duration::from_millis(20));
    write_log(&fx.primary.join("launcher.log"), &["started pid:24156"]);
    fx.processes.spawn(24156, "TestClient", None);

    fx.engine.run_cycle();
    let instance = fx.engine.store().get(24156).unwrap();
    assert_eq!(instance.primary_log.as_deref(), Some(by_name.as_path()));
    assert_eq!(instance.assignment, Some(AssignmentMethod::Filename));
}

#[test]
fn test_content_match_when_name_has_no_pid() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("launcher.log");
    write_log(&log, &["started PID: 4321 ok"]);
    fx.processes.spawn(4321, "TestClient", None);

    fx.engine.run_cycle();
    let instance = fx.engine.store().get(4321).unwrap();
    assert_eq!(instance.primary_log.as_deref(), Some(log.as_path()));
    assert_eq!(instance.assignment, Some(AssignmentMethod::Content));
}

#[test]
fn test_vanished_log_is_relocated() {
    let mut fx = Fixture::new();
    let first = fx.primary.join("Player_5E5C_a.log");
    write_log(&first, &["boot"]);
    fx.processes.spawn(24156, "TestClient", None);
    fx.engine.run_cycle();

    fs::remove_file(&first).unwrap();
    let second = fx.primary.join("Player_5E5C_b.log");
    write_log(&second, &["boot again"]);

    fx.engine.run_cycle();
    let instance = fx.engine.store().get(24156).unwrap();
    assert_eq!(instance.primary_log.as_deref(), Some(second.as_path()));
}

#[test]
fn test_username_from_primary_log() {
    let mut fx = Fixture::new();
    write_log(
        &fx.primary.join("Player_5E5C_2024.log"),
        &[r#"2024-05-01T11:59:00.000Z,0.0,{"userId":7,"displayName":"StarGazer"}"#],
    );
    fx.processes.spawn(24156, "TestClient", None);

    fx.engine.run_cycle();
    let events = fx.drain();
    assert_eq!(
        count(&events, |e| matches!(e, EngineEvent::UsernameResolved(i) if i.username.as_deref() == Some("StarGazer"))),
        1
    );
    assert_eq!(fx.engine.store().get(24156).unwrap().display_name, "StarGazer");

    fx.engine.run_cycle();
    let events = fx.drain();
    assert_eq!(count(&events, |e| matches!(e, EngineEvent::UsernameResolved(_))), 0);
}

#[test]
fn test_state_log_from_state_directory() {
    let mut fx = Fixture::new();
    write_log(&fx.primary.join("Player_5E5C_2024.log"), &["launcher boot"]);
    let state_log = fx.state.join("client_state.log");
    write_log(
        &state_log,
        &[r#"2024-05-01T12:00:00.000Z,1.0,"biome": "Starfall""#],
    );
    fx.processes.spawn(24156, "TestClient", Some(Utc::now()));

    fx.engine.run_cycle();
    let instance = fx.engine.store().get(24156).unwrap();
    assert_eq!(instance.state_log.as_deref(), Some(state_log.as_path()));
    assert_eq!(instance.biome, BiomeType::Starfall);
}

#[test]
fn test_enumeration_failure_is_reported_and_retried() {
    let mut fx = Fixture::new();
    fx.processes.spawn(100, "TestClient", None);
    fx.processes.fail_next();

    let report = fx.engine.run_cycle();
    assert!(report.has_failures());
    assert_eq!(count(&fx.drain(), |e| matches!(e, EngineEvent::Error(_))), 1);

    let report = fx.engine.run_cycle();
    assert!(!report.has_failures());
    assert_eq!(report.added, 1);
}

#[test]
fn test_content_match_ignores_longer_pid() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("launcher.log");
    write_log(&log, &["started pid:24156 ok"]);
    fx.processes.spawn(2415, "TestClient", None);
    fx.processes.spawn(24156, "TestClient", None);

    fx.engine.run_cycle();
    let store = fx.engine.store();
    assert!(store.get(2415).unwrap().primary_log.is_none());

    let owner = store.get(24156).unwrap();
    assert_eq!(owner.primary_log.as_deref(), Some(log.as_path()));
    assert_eq!(owner.assignment, Some(AssignmentMethod::Content));
}

#[test]
fn test_username_log_becomes_state_log() {
    let mut fx = Fixture::new();
    let named = fx.state.join("a.log");
    write_log(&named, &[r#"{"displayName":"Nomad"}"#]);
    std::thread::sleep(std::time::Duration::from_millis(30));
    // Closer to the process start than the named log
    write_log(&fx.state.join("b.log"), &["nothing"]);
    fx.processes.spawn(24156, "TestClient", Some(Utc::now()));

    fx.engine.run_cycle();
    let events = fx.drain();
    assert_eq!(count(&events, |e| matches!(e, EngineEvent::UsernameResolved(_))), 1);
    assert_eq!(
        count(&events, |e| matches!(e, EngineEvent::Status(m) if m == "Found username Nomad from log: a.log")),
        1
    );

    let instance = fx.engine.store().get(24156).unwrap();
    assert_eq!(instance.username.as_deref(), Some("Nomad"));
    assert_eq!(instance.state_log.as_deref(), Some(named.as_path()));
}

#[test]
fn test_truncated_log_is_rescanned() {
    let mut fx = Fixture::new();
    let log = fx.primary.join("Player_5E5C_2024.log");
    write_log(&log, &["2024-05-01T11:59:00.000Z,0.0,boot", SANDSTORM]);
    fx.processes.spawn(24156, "TestClient", None);
    fx.engine.run_cycle();
    fx.drain();

    // Rotated in place with less content than was already consumed
    write_log(&log, &[r#"2024-05-01T12:30:00.000Z,1.0,"biome": "Windy""#]);
    fx.engine.run_cycle();

    assert_eq!(count(&fx.drain(), is_state_changed), 1);
    let instance = fx.engine.store().get(24156).unwrap();
    assert_eq!(instance.biome, BiomeType::Windy);
    assert_eq!(instance.state_cursor, fs::metadata(&log).unwrap().len());
}

#[test]
fn test_unassigned_instance_reported_once() {
    let mut fx = Fixture::new();
    fx.processes.spawn(100, "TestClient", None);
    let is_no_log = |e: &EngineEvent| matches!(e, EngineEvent::Status(m) if m.starts_with("No log found"));

    fx.engine.run_cycle();
    assert_eq!(count(&fx.drain(), is_no_log), 1);

    fx.engine.run_cycle();
    assert_eq!(count(&fx.drain(), is_no_log), 0);
    assert!(!fx.engine.store().get(100).unwrap().is_assigned());
}
