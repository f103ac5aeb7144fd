//! Integration tests for buildstash

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";

    fn buildstash(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("buildstash");
        cmd.arg("--config")
            .arg(home.path().join("config.toml"))
            .env("BUILDSTASH_PLAIN", "1")
            .env_remove("BUILDSTASH_ARCHIVE_PASSWORD");
        cmd
    }

    fn write_local_config(root: &Path, store: &Path) {
        let config = format!(
            "[platform]\nos = \"linux\"\n\n[backend]\nkind = \"local\"\npath = {:?}\n",
            store.display().to_string()
        );
        std::fs::write(root.join(".buildstash.toml"), config).unwrap();
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        buildstash(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("reuse compiled build output"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        buildstash(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildstash"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        buildstash(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_merges_local_file() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join(".buildstash.toml"),
            "[cache]\nremote_branch = \"upstream/trunk\"\n",
        )
        .unwrap();

        buildstash(&home)
            .arg("--root")
            .arg(project.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("upstream/trunk"));
    }

    #[test]
    fn invalid_config_fails() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("config.toml"), "[cache\n").unwrap();

        buildstash(&home)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn changes_outside_repository_fails_with_hint() {
        if !tool_available("git") {
            return;
        }
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        buildstash(&home)
            .arg("--root")
            .arg(project.path())
            .arg("changes")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Version control query failed"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn list_empty_store() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write_local_config(project.path(), &home.path().join("store"));

        buildstash(&home)
            .arg("--root")
            .arg(project.path())
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached dev builds"));
    }

    #[test]
    fn list_json_reports_stored_artifacts() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = home.path().join("store");
        write_local_config(project.path(), &store);

        let dir = store.join("x86_64/test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("x86_64_linux_test_{}_20240102030405.zip", COMMIT)),
            b"zip",
        )
        .unwrap();

        buildstash(&home)
            .arg("--root")
            .arg(project.path())
            .args(["list", "--profile", "test", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(COMMIT))
            .stdout(predicate::str::contains("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn unknown_profile_rejected() {
        let home = TempDir::new().unwrap();
        buildstash(&home)
            .args(["check", "--profile", "release"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown build profile"));
    }

    fn tool_available(program: &str) -> bool {
        std::process::Command::new(program)
            .arg("--version")
            .output()
            .is_ok()
    }

    fn git(root: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(["-c", "user.name=ci", "-c", "user.email=ci@example.com"])
            .args(args)
            .current_dir(root)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[test]
    fn run_publishes_then_restores() {
        if !tool_available("git") || !tool_available("zip") || !tool_available("unzip") {
            return;
        }

        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = home.path().join("store");
        write_local_config(project.path(), &store);
        std::fs::write(
            project.path().join(".buildstash.toml"),
            format!(
                "{}\n[build]\ncommand = [\"sh\", \"-c\", \"mkdir -p _build/{{profile}} && echo built > _build/{{profile}}/out\"]\n",
                std::fs::read_to_string(project.path().join(".buildstash.toml")).unwrap()
            ),
        )
        .unwrap();
        std::fs::write(project.path().join(".gitignore"), "_build/\n").unwrap();

        git(project.path(), &["init", "-q"]);
        git(project.path(), &["add", "."]);
        git(project.path(), &["commit", "-q", "-m", "initial"]);
        git(project.path(), &["update-ref", "refs/remotes/origin/main", "HEAD"]);

        buildstash(&home)
            .arg("--root")
            .arg(project.path())
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Uploaded"));

        let published: Vec<_> = std::fs::read_dir(store.join("x86_64/dev"))
            .unwrap()
            .collect();
        assert_eq!(published.len(), 1);

        std::fs::remove_dir_all(project.path().join("_build")).unwrap();

        buildstash(&home)
            .arg("--root")
            .arg(project.path())
            .arg("restore")
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored cached build"));

        let restored = std::fs::read_to_string(project.path().join("_build/dev/out")).unwrap();
        assert_eq!(restored.trim(), "built");
    }
}
