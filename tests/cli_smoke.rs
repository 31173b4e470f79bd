use assert_cmd::prelude::*;
use statcard::cache::LocCache;
use statcard::util::identity_digest;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn statcard(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("statcard").unwrap();
    cmd.current_dir(dir)
        .env_remove("USER_NAME")
        .env_remove("ACCESS_TOKEN")
        .env_remove("STATCARD_CACHE_DIR")
        .env_remove("STATCARD_COMMENT_SIZE")
        .env_remove("STATCARD_ARCHIVE")
        .env_remove("STATCARD_ENDPOINT")
        .env_remove("STATCARD_BIRTHDAY")
        .env("RUST_LOG", "off");
    for proxy in ["HTTP_PROXY", "HTTPS_PROXY", "ALL_PROXY", "http_proxy", "https_proxy", "all_proxy"] {
        cmd.env_remove(proxy);
    }
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn user_is_required() {
    let dir = tempdir().unwrap();
    statcard(dir.path()).args(["totals"]).assert().failure();
}

#[test]
fn totals_without_cache_are_zero() {
    let dir = tempdir().unwrap();
    let v = json_stdout(statcard(dir.path()).env("USER_NAME", "octo").args(["totals", "--json"]));
    assert_eq!(v["cached_repos"], 0);
    assert_eq!(v["totals"]["lines_added"], 0);
    assert_eq!(v["totals"]["net_lines"], 0);
    assert!(!dir.path().join("cache").exists());
}

#[test]
fn totals_read_cache_and_archive() {
    let dir = tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    fs::create_dir_all(&cache_dir).unwrap();
    fs::write(
        LocCache::file_path(&cache_dir, "octo"),
        format!(
            "{} 4 3 10 3\n{} 2 2 7 1\n",
            identity_digest("octo/a"),
            identity_digest("octo/b")
        ),
    )
    .unwrap();
    fs::write(cache_dir.join("repository_archive.txt"), "top\nold 9 4 2 0\nend\n").unwrap();

    let v = json_stdout(
        statcard(dir.path())
            .env("USER_NAME", "octo")
            .args(["--archive-header", "1", "--archive-footer", "1", "totals", "--json"]),
    );
    assert_eq!(v["cached_repos"], 2);
    assert_eq!(v["totals"]["lines_added"], 19);
    assert_eq!(v["totals"]["lines_deleted"], 4);
    assert_eq!(v["totals"]["net_lines"], 15);
    assert_eq!(v["totals"]["total_commits"], 9);
    assert_eq!(v["totals"]["repository_count"], 3);
}

#[test]
fn update_with_unreachable_api_still_patches_templates() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("card.svg"),
        r#"<svg><tspan id="loc_data">?</tspan><tspan id="follower_data">?</tspan></svg>"#,
    )
    .unwrap();

    let v = json_stdout(
        statcard(dir.path())
            .env("USER_NAME", "octo")
            .env("ACCESS_TOKEN", "not-a-token")
            .args([
                "update",
                "--endpoint",
                "http://127.0.0.1:9/graphql",
                "--svg",
                "card.svg",
                "--json",
            ]),
    );
    assert!(v["error"].is_string());
    assert_eq!(v["loc"]["lines_added"], 0);

    let svg = fs::read_to_string(dir.path().join("card.svg")).unwrap();
    assert_eq!(
        svg,
        r#"<svg><tspan id="loc_data">0</tspan><tspan id="follower_data">0</tspan></svg>"#
    );
}
