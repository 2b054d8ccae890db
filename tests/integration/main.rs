//! Integration tests for koji-lineage

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "builds": [
            {"id": 100, "nvr": "foo-container-1.0-1", "package_name": "foo-container",
             "extra": {"container_koji_task_id": 9001,
                       "image": {"parent_build_id": 50,
                                 "index": {"pull": ["registry.example.com/foo@sha256:aa"],
                                           "tags": ["latest"]}}}},
            {"id": 50, "nvr": "base-container-1.0-1", "package_name": "base-container",
             "extra": {"container_koji_task_id": "9000", "image": {"parent_build_id": null}}},
            {"id": 7, "nvr": "tooling-2.0-1", "package_name": "tooling"}
        ],
        "tasks": {
            "9001": {"repositories": ["registry.example.com/foo:batch-7"], "koji_builds": ["100"]},
            "9000": {"repositories": ["registry.example.com/base:batch-6"], "koji_builds": [50]}
        },
        "tags": {
            "candidate": [
                {"build_id": 100, "nvr": "foo-container-1.0-1", "package_name": "foo-container",
                 "build_type": "image"},
                {"build_id": 50, "nvr": "base-container-1.0-1", "package_name": "base-container",
                 "build_type": "image"},
                {"build_id": 7, "nvr": "tooling-2.0-1", "package_name": "tooling",
                 "build_type": "image"}
            ]
        }
    }"#;

    /// Isolated config, cache directory and snapshot for one test
    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            std::fs::write(temp.path().join("export.json"), SNAPSHOT).unwrap();
            Self { temp }
        }

        fn cache_dir(&self) -> PathBuf {
            self.temp.path().join("cache")
        }

        fn config_path(&self) -> PathBuf {
            self.temp.path().join("config.toml")
        }

        fn snapshot_path(&self) -> PathBuf {
            self.temp.path().join("export.json")
        }

        /// A command without a snapshot source
        fn bare(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("koji-lineage");
            cmd.env_remove("KOJI_LINEAGE_SNAPSHOT")
                .env_remove("KOJI_LINEAGE_CACHE_DIR")
                .env_remove("KOJI_LINEAGE_CONFIG")
                .arg("--config")
                .arg(self.config_path())
                .arg("--cache-dir")
                .arg(self.cache_dir());
            cmd
        }

        fn cmd(&self) -> Command {
            let mut cmd = self.bare();
            cmd.arg("--snapshot").arg(self.snapshot_path());
            cmd
        }
    }

    fn cache_file(dir: &Path, name: &str) -> PathBuf {
        dir.join(name)
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("koji-lineage")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("tree"))
            .stdout(predicate::str::contains("--snapshot"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("koji-lineage")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("koji-lineage"));
    }

    #[test]
    fn query_without_source_fails_with_hint() {
        let fixture = Fixture::new();
        fixture
            .bare()
            .args(["parent", "100"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No build metadata source"))
            .stderr(predicate::str::contains("--snapshot"));
    }

    #[test]
    fn resolve_nvr() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["resolve", "foo-container-1.0-1"])
            .assert()
            .success()
            .stdout(predicate::str::diff("100\n"));
    }

    #[test]
    fn parent_of_base_image() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["parent", "base-container-1.0-1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("base image"));
    }

    #[test]
    fn unknown_build_fails() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["nvr", "missing-container-0-0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build not found"));
    }

    #[test]
    fn tree_plain_lists_edges() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["tree", "foo-container-1.0-1", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("50 -\n100 50\n"));
    }

    #[test]
    fn tree_persists_caches() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["tree", "100", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("base-container-1.0-1"));

        let dir = fixture.cache_dir();
        for name in [
            "build_data",
            "task_results",
            "build_id_to_parent_id",
            "build_id_to_build_task_id",
            "nvr_to_build_id",
            "build_id_to_nvr",
        ] {
            assert!(cache_file(&dir, name).exists(), "{} not saved", name);
        }

        fixture
            .bare()
            .args(["cache", "stats", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("build_data 2"))
            .stdout(predicate::str::contains("build_id_to_parent_id 2"));
    }

    #[test]
    fn persisted_index_answers_later_runs() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["nvr", "100"])
            .assert()
            .success()
            .stdout(predicate::str::diff("foo-container-1.0-1\n"));

        // Second run answers the reverse lookup from the persisted index
        fixture
            .cmd()
            .args(["resolve", "foo-container-1.0-1"])
            .assert()
            .success()
            .stdout(predicate::str::diff("100\n"));
    }

    #[test]
    fn task_strict_fails_on_fault() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["task", "12345", "--strict"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Task result unavailable"));

        fixture
            .cmd()
            .args(["task", "12345"])
            .assert()
            .success()
            .stdout(predicate::str::contains("fault"));
    }

    #[test]
    fn tag_lists_only_containers() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["tag", "candidate"])
            .assert()
            .success()
            .stdout(predicate::str::diff(
                "base-container-1.0-1\nfoo-container-1.0-1\n",
            ));
    }

    #[test]
    fn tag_batch_matches_task_pullspecs() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["tag", "candidate", "--batch", "batch-7"])
            .assert()
            .success()
            .stdout(predicate::str::diff("foo-container-1.0-1\n"));
    }

    #[test]
    fn tag_records_group_builds_by_package() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["tag", "candidate", "--records", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff(
                "base-container-1.0-1 -\nfoo-container-1.0-1 50\ntooling-2.0-1 -\n",
            ));

        fixture
            .cmd()
            .args(["tag", "candidate", "--records", "--task-info", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"tooling\""))
            .stdout(predicate::str::contains("registry.example.com/foo:batch-7"));
    }

    #[test]
    fn record_includes_task_pullspecs() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["record", "100", "--task-info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("registry.example.com/foo:batch-7"))
            .stdout(predicate::str::contains("\"parent_build_id\": 50"));
    }

    #[test]
    fn cache_path_shows_directory() {
        let fixture = Fixture::new();
        fixture
            .bare()
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache"));
    }

    #[test]
    fn cache_clear_removes_files() {
        let fixture = Fixture::new();
        fixture.cmd().args(["tree", "100"]).assert().success();

        fixture
            .bare()
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 6 cache file(s)"));
        assert!(!cache_file(&fixture.cache_dir(), "build_data").exists());
    }

    #[test]
    fn corrupt_cache_file_is_ignored() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.cache_dir()).unwrap();
        std::fs::write(cache_file(&fixture.cache_dir(), "build_data"), "{not json").unwrap();

        fixture
            .cmd()
            .args(["nvr", "50"])
            .assert()
            .success()
            .stdout(predicate::str::diff("base-container-1.0-1\n"));
    }

    #[test]
    fn config_show_and_init() {
        let fixture = Fixture::new();
        fixture
            .bare()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));

        fixture
            .bare()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(fixture.config_path().exists());
    }
}
