//! Tunnel lifecycle tests
//!
//! Runs the real binary against a stub `az` shell script. The stub answers
//! the lookup commands and, for `network bastion tunnel`, just idles until
//! signalled, so it shows up in the process table with a genuine tunnel
//! command line. Each test uses its own ports and only ever kills tunnels by
//! host name, so tests can run in parallel without touching real tunnels.

#![cfg(unix)]

use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

use abt_core::traits::ProcessTable;
use abt_core::tunnel::{parse_tunnel_cmdline, SystemProcessTable};
use assert_cmd::Command;
use predicates::prelude::*;

const STUB_AZ: &str = r#"#!/bin/sh
case "$1 $2 $3" in
  "account show"*) exit 0 ;;
  "network bastion list") echo '[{"name":"test-bastion"}]' ;;
  "vm show "*) echo '{"id":"/subscriptions/test/resourceGroups/AnsibleHosts/providers/Microsoft.Compute/virtualMachines/vm"}' ;;
  "network bastion tunnel")
    sleep 120 &
    trap 'kill $! 2>/dev/null; exit 0' TERM
    wait $!
    ;;
  *) echo "unexpected: $*" >&2; exit 3 ;;
esac
"#;

struct Fixture {
    dir: tempfile::TempDir,
    config: PathBuf,
    az: PathBuf,
}

impl Fixture {
    fn new(hosts: &[(&str, u16)]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let az = dir.path().join("az");
        std::fs::write(&az, STUB_AZ).expect("Failed to write stub az");
        std::fs::set_permissions(&az, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut yaml = String::from("azure_hosts:\n  hosts:\n");
        for (name, port) in hosts {
            yaml.push_str(&format!(
                "    {}:\n      ansible_port: {}\n      resource_group: AnsibleHosts\n",
                name, port
            ));
        }
        let config = dir.path().join("ansible_bastion_tunnels.yml");
        std::fs::write(&config, yaml).expect("Failed to write config");

        Self { dir, config, az }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ansible-bastion-tunnels").unwrap();
        cmd.current_dir(self.dir.path())
            .arg("-c")
            .arg(&self.config)
            .arg("--az-path")
            .arg(&self.az);
        cmd
    }
}

/// Tunnel pids per port, counting duplicates the registry would hide
fn tunnel_pids(ports: &[u16]) -> Vec<(u16, u32)> {
    let wanted: HashSet<u16> = ports.iter().copied().collect();
    let mut found: Vec<(u16, u32)> = SystemProcessTable::new()
        .processes()
        .into_iter()
        .filter_map(|p| {
            let args = parse_tunnel_cmdline(&p.cmd)?;
            wanted.contains(&args.port).then_some((args.port, p.pid))
        })
        .collect();
    found.sort();
    found
}

fn wait_for_tunnels(ports: &[u16], count: usize) -> Vec<(u16, u32)> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let found = tunnel_pids(ports);
        if found.len() == count || Instant::now() > deadline {
            return found;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn spawn_stub_tunnel(az: &Path, port: u16) -> Child {
    StdCommand::new(az)
        .args([
            "network",
            "bastion",
            "tunnel",
            "--name",
            "test-bastion",
            "--resource-group",
            "AnsibleHosts",
            "--target-resource-id",
            "/subscriptions/test/vm",
            "--resource-port",
            "22",
            "--port",
            &port.to_string(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn stub tunnel")
}

#[test]
fn test_list_launches_then_reuses_then_kills() {
    let ports = [46933, 46932];
    let fixture = Fixture::new(&[("server01", 46933), ("server02", 46932)]);

    // First run: no tunnels, both get launched
    let assert = fixture.cmd().arg("--list").assert().success();
    let inventory: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let hostvars = &inventory["_meta"]["hostvars"];
    assert_eq!(hostvars["server01"]["ansible_port"], 46933);
    assert_eq!(hostvars["server02"]["ansible_port"], 46932);
    assert_eq!(hostvars["server01"]["ansible_host"], "127.0.0.1");
    assert_eq!(hostvars["server02"]["ansible_host"], "127.0.0.1");

    let first = wait_for_tunnels(&ports, 2);
    assert_eq!(first.len(), 2, "expected two tunnels, found {:?}", first);

    // Second run: everything satisfied, nothing new
    fixture.cmd().arg("--list").assert().success();
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(tunnel_pids(&ports), first);

    // The table shows both
    fixture
        .cmd()
        .arg("--list-tunnels")
        .assert()
        .success()
        .stdout(predicate::str::contains("46933"))
        .stdout(predicate::str::contains("46932"))
        .stdout(predicate::str::contains("server01"));

    // Kill both by name
    fixture
        .cmd()
        .args(["--kill-tunnels", "server01", "server02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped 2 of 2 tunnel(s)"));

    let remaining = wait_for_tunnels(&ports, 0);
    assert!(remaining.is_empty(), "tunnels survived: {:?}", remaining);

    fixture
        .cmd()
        .arg("--list-tunnels")
        .assert()
        .success()
        .stdout(predicate::str::contains("46933").not())
        .stdout(predicate::str::contains("46932").not());
}

#[test]
fn test_list_tunnels_shows_single_entry() {
    let fixture = Fixture::new(&[("server01", 46943)]);
    let mut child = spawn_stub_tunnel(&fixture.az, 46943);
    let pid = child.id();

    let found = wait_for_tunnels(&[46943], 1);
    assert_eq!(found, [(46943u16, pid)]);

    let assert = fixture.cmd().arg("--list-tunnels").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let rows: Vec<_> = stdout.lines().filter(|l| l.contains("46943")).collect();
    assert_eq!(rows.len(), 1, "{}", stdout);
    assert!(rows[0].contains(&pid.to_string()));
    assert!(rows[0].contains("server01"));

    child.kill().unwrap();
    child.wait().unwrap();
}

#[test]
fn test_port_squatter_is_never_listed_or_killed() {
    let fixture = Fixture::new(&[("server01", 46953)]);

    // Carries the port on its command line but is not a bastion tunnel
    let mut squatter = StdCommand::new("sh")
        .args(["-c", "sleep 30", "--port", "46953"])
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(200));

    fixture
        .cmd()
        .arg("--list-tunnels")
        .assert()
        .success()
        .stdout(predicate::str::contains("46953").not());

    fixture
        .cmd()
        .args(["--kill-tunnels", "server01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tunnels running for the given hosts"));

    assert!(squatter.try_wait().unwrap().is_none());
    squatter.kill().unwrap();
    squatter.wait().unwrap();
}

#[test]
fn test_kill_reports_each_tunnel() {
    let fixture = Fixture::new(&[("server01", 46963), ("server02", 46964)]);
    let mut first = spawn_stub_tunnel(&fixture.az, 46963);
    let mut second = spawn_stub_tunnel(&fixture.az, 46964);
    assert_eq!(wait_for_tunnels(&[46963, 46964], 2).len(), 2);

    fixture
        .cmd()
        .args(["-k", "server01", "server02"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("PID: {}", first.id())))
        .stdout(predicate::str::contains(format!("PID: {}", second.id())))
        .stdout(predicate::str::contains("Stopped 2 of 2 tunnel(s)"));

    first.wait().unwrap();
    second.wait().unwrap();
    assert!(tunnel_pids(&[46963, 46964]).is_empty());
}
