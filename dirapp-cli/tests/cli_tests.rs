use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use dirapp_core::profile;
use dirapp_core::Backend;

const CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
    <system.applicationHost>
        <sites>
            <site name="Default Web Site" id="1">
                <application path="/" applicationPool="DefaultAppPool">
                    <virtualDirectory path="/" physicalPath="C:\inetpub\wwwroot" />
                </application>
                <application path="/api" applicationPool="DefaultAppPool">
                    <virtualDirectory path="/" physicalPath="C:\inetpub\wwwroot\api" />
                </application>
            </site>
            <site name="Headless" id="2">
                <application path="/child">
                    <virtualDirectory path="/" physicalPath="C:\inetpub\child" />
                </application>
            </site>
        </sites>
    </system.applicationHost>
</configuration>
"#;

fn dirapp_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dirapp"));
    cmd.env("HOME", home).env("USERPROFILE", home);
    cmd
}

fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("applicationHost.config");
    fs::write(&path, CONFIG).expect("write config");
    path
}

fn backups(dir: &Path) -> usize {
    fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .count()
}

#[test]
fn profile_list_is_empty_on_fresh_home() {
    let home = TempDir::new().expect("home");
    dirapp_cmd(home.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(contains("No profiles saved."));
}

#[test]
fn sites_lists_roots_and_flags_sites_without_one() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);

    let assert = dirapp_cmd(home.path())
        .args(["sites", "--json", "--backend", "direct", "--config"])
        .arg(&config)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let rows: serde_json::Value = serde_json::from_str(&stdout).expect("json");

    assert_eq!(rows[0]["name"], "Default Web Site");
    assert_eq!(rows[0]["applications"], 2);
    assert_eq!(rows[0]["root"], r"C:\inetpub\wwwroot");
    assert_eq!(rows[0]["pool"], "DefaultAppPool");
    assert_eq!(rows[1]["name"], "Headless");
    assert!(rows[1]["root"].is_null());
    assert!(rows[1]["problem"].as_str().unwrap_or_default().contains("Headless"));
}

#[test]
fn sites_table_names_every_site() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);

    dirapp_cmd(home.path())
        .args(["sites", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("Default Web Site").and(contains("Headless")));
}

#[test]
fn install_without_service_saves_profile_and_backup() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);

    dirapp_cmd(home.path())
        .args([
            "install",
            "--name",
            "web-apps",
            "--site",
            "Default Web Site",
            "--paths",
            r#""**\web.config""#,
            "--interval",
            "2000",
            "--depth",
            "-1",
            "--backend",
            "direct",
            "--no-service",
            "--config",
        ])
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("Config backup has been saved to"))
        .stdout(contains("installed"));

    let saved = profile::load_profile_at(home.path(), "web-apps").expect("profile saved");
    assert_eq!(saved.site, "Default Web Site");
    assert_eq!(saved.pattern, r"**\web.config");
    assert_eq!(saved.interval_ms, 2000);
    assert_eq!(saved.backend, Backend::Direct);
    assert_eq!(saved.config_path.as_deref(), Some(config.as_path()));
    assert_eq!(backups(work.path()), 1);
    assert_eq!(fs::read_to_string(&config).expect("config"), CONFIG);

    dirapp_cmd(home.path())
        .args(["profile", "show", "web-apps"])
        .assert()
        .success()
        .stdout(contains(r#""interval_ms": 2000"#));
}

#[test]
fn install_points_the_task_at_the_saved_profile_file() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);
    let expected = profile::profile_path_at(home.path(), "web-apps");

    dirapp_cmd(home.path())
        .args([
            "install",
            "--name",
            "web-apps",
            "--site",
            "Default Web Site",
            "--paths",
            "**/web.config",
            "--backend",
            "direct",
            "--no-service",
            "--config",
        ])
        .arg(&config)
        .assert()
        .success()
        .stdout(contains(format!("saved profile: {}", expected.display())))
        .stdout(contains(format!(
            "watch --profile-file \"{}\"",
            expected.display()
        )));

    assert!(profile::load_profile_file(&expected).is_ok());
}

#[test]
fn install_rejects_invalid_service_name() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);

    dirapp_cmd(home.path())
        .args([
            "install",
            "--name",
            "web apps 2",
            "--site",
            "Default Web Site",
            "--paths",
            "**/web.config",
            "--no-service",
            "--config",
        ])
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("letters or dashes"));

    assert_eq!(backups(work.path()), 0);
    assert!(profile::list_profiles_at(home.path()).expect("list").is_empty());
}

#[test]
fn install_refuses_site_without_root_application() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);

    dirapp_cmd(home.path())
        .args([
            "install",
            "--name",
            "headless",
            "--site",
            "Headless",
            "--paths",
            "**/web.config",
            "--no-service",
            "--config",
        ])
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("cannot be watched"));

    assert_eq!(backups(work.path()), 0);
}

#[test]
fn uninstall_without_service_removes_profile() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);

    dirapp_cmd(home.path())
        .args([
            "install",
            "--name",
            "gone",
            "--site",
            "Default Web Site",
            "--paths",
            "**/web.config",
            "--no-service",
            "--config",
        ])
        .arg(&config)
        .assert()
        .success();

    dirapp_cmd(home.path())
        .args(["uninstall", "--name", "gone", "--no-service"])
        .assert()
        .success()
        .stdout(contains("uninstalled").and(contains("gone")));
    assert!(profile::list_profiles_at(home.path()).expect("list").is_empty());
}

#[test]
fn watch_requires_a_profile_or_site_and_paths() {
    let home = TempDir::new().expect("home");
    dirapp_cmd(home.path())
        .args(["watch"])
        .assert()
        .failure()
        .stderr(contains("--profile"));
}

#[test]
fn watch_with_unknown_profile_fails() {
    let home = TempDir::new().expect("home");
    dirapp_cmd(home.path())
        .args(["watch", "--profile", "missing"])
        .assert()
        .failure()
        .stderr(contains("failed to load profile 'missing'"));
}

#[test]
fn watch_profile_file_is_read_regardless_of_home() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let config = write_config(&work);
    let file = work.path().join("boot.yaml");
    fs::write(
        &file,
        format!(
            "name: boot\nsite: Nope\npattern: '**/web.config'\nbackend: direct\nconfig_path: '{}'\ncreated_at: 2024-01-01T00:00:00Z\n",
            config.display()
        ),
    )
    .expect("write profile");

    dirapp_cmd(home.path())
        .arg("watch")
        .arg("--profile-file")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("watcher exited with error"))
        .stderr(contains("failed to load profile").not());
}

#[test]
fn watch_with_missing_profile_file_fails() {
    let home = TempDir::new().expect("home");
    let missing = home.path().join("absent.yaml");
    dirapp_cmd(home.path())
        .arg("watch")
        .arg("--profile-file")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(contains("failed to load profile file"));
}
