//! Shell stand-ins for the programs a run invokes.
//!
//! [`StubToolchain`] installs `/bin/sh` scripts into a private `bin/`
//! directory and hands out an [`OrchestratorConfig`] whose search path points
//! there, so runs never touch a real Ansible or container installation.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use navrun::model::OrchestratorConfig;
use tempfile::TempDir;

use crate::helpers::artifact_json;

/// Marker printed for variables the stub navigator did not receive.
pub const UNSET: &str = "<unset>";

const RECORDED_VARIABLES: [&str; 5] = [
    "ANSIBLE_NAVIGATOR_CONFIG",
    "ANSIBLE_TF_OPERATION",
    "ANSIBLE_TF_INVENTORY",
    "ANSIBLE_TF_PREVIOUS_INVENTORY",
    "ANSIBLE_HOST_KEY_CHECKING",
];

/// Behaviour of the stub `ansible-navigator`.
#[derive(Debug, Clone)]
pub struct NavigatorStub {
    version_output: String,
    artifact: Option<serde_json::Value>,
    exit_code: i32,
    sleep_secs: Option<u64>,
    stdout: String,
    stderr: String,
    appended_known_host: Option<String>,
}

impl NavigatorStub {
    /// Writes a `successful` artifact and exits 0.
    #[must_use]
    pub fn succeeding() -> Self {
        Self {
            version_output: "ansible-navigator 24.2.0".to_string(),
            artifact: Some(artifact_json(
                "successful",
                &["PLAY [all]", "ok: [localhost]", "PLAY RECAP"],
            )),
            exit_code: 0,
            sleep_secs: None,
            stdout: "stub navigator stdout".to_string(),
            stderr: "stub navigator stderr".to_string(),
            appended_known_host: None,
        }
    }

    /// Writes an artifact with `status` and `stdout`, then exits with `exit_code`.
    #[must_use]
    pub fn finishing(status: &str, stdout: &[&str], exit_code: i32) -> Self {
        Self {
            artifact: Some(artifact_json(status, stdout)),
            exit_code,
            ..Self::succeeding()
        }
    }

    /// Sleeps for `secs` before doing anything else.
    #[must_use]
    pub fn hanging(secs: u64) -> Self {
        Self {
            sleep_secs: Some(secs),
            ..Self::succeeding()
        }
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: serde_json::Value) -> Self {
        self.artifact = Some(artifact);
        self
    }

    #[must_use]
    pub fn without_artifact(mut self) -> Self {
        self.artifact = None;
        self
    }

    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    #[must_use]
    pub fn with_version_output(mut self, output: &str) -> Self {
        self.version_output = output.to_string();
        self
    }

    #[must_use]
    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    #[must_use]
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    /// Append `line` to the known hosts file the run passes in.
    #[must_use]
    pub fn appending_known_host(mut self, line: &str) -> Self {
        self.appended_known_host = Some(line.to_string());
        self
    }

    fn script(&self, record_dir: &Path) -> String {
        let mut script = String::from("#!/bin/sh\n");
        script.push_str("if [ \"$1\" = \"--version\" ]; then\n");
        script.push_str(&format!("  printf '%s\\n' {}\n", quote(&self.version_output)));
        script.push_str("  exit 0\nfi\n");

        script.push_str(&format!("record_dir={}\n", quote(&record_dir.display().to_string())));
        script.push_str(": > \"$record_dir/args\"\n");
        script.push_str(
            "for arg in \"$@\"; do\n  printf '%s\\n' \"$arg\" >> \"$record_dir/args\"\ndone\n",
        );
        script.push_str("{\n");
        for name in RECORDED_VARIABLES {
            script.push_str(&format!("  printf '%s\\n' \"{name}=${{{name}-{UNSET}}}\"\n"));
        }
        script.push_str("  printf '%s\\n' \"PWD=$(pwd)\"\n");
        script.push_str("} > \"$record_dir/env\"\n");
        script.push_str(
            "if [ -f \"$ANSIBLE_NAVIGATOR_CONFIG\" ]; then cp \"$ANSIBLE_NAVIGATOR_CONFIG\" \"$record_dir/settings.yaml\"; fi\n",
        );

        script.push_str("artifact=''\nknown_hosts=''\nprev=''\n");
        script.push_str("for arg in \"$@\"; do\n");
        script.push_str(
            "  if [ \"$prev\" = \"--playbook-artifact-save-as\" ]; then artifact=\"$arg\"; fi\n",
        );
        script.push_str("  case \"$arg\" in\n");
        script.push_str(
            "    ansible_ssh_known_hosts_file=*) known_hosts=\"${arg#ansible_ssh_known_hosts_file=}\" ;;\n",
        );
        script.push_str("  esac\n  prev=\"$arg\"\ndone\n");

        script.push_str(&format!("printf '%s\\n' {}\n", quote(&self.stdout)));
        script.push_str(&format!("printf '%s\\n' {} >&2\n", quote(&self.stderr)));

        if let Some(secs) = self.sleep_secs {
            script.push_str(&format!("sleep {secs}\n"));
        }
        if let Some(line) = &self.appended_known_host {
            script.push_str(&format!(
                "if [ -n \"$known_hosts\" ]; then printf '%s\\n' {} >> \"$known_hosts\"; fi\n",
                quote(line)
            ));
        }
        if let Some(artifact) = &self.artifact {
            let json = serde_json::to_string_pretty(artifact).expect("artifact serializes");
            script.push_str("cat > \"$artifact\" <<'NAVRUN_ARTIFACT'\n");
            script.push_str(&json);
            script.push_str("\nNAVRUN_ARTIFACT\n");
        }
        script.push_str(&format!("exit {}\n", self.exit_code));
        script
    }
}

/// A private bin directory of stub programs plus scratch directories.
#[derive(Debug)]
pub struct StubToolchain {
    root: TempDir,
}

impl Default for StubToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl StubToolchain {
    /// A toolchain with a working `ansible-playbook` and nothing else.
    #[must_use]
    pub fn new() -> Self {
        let root = crate::helpers::temp_dir("toolchain");
        for sub in ["bin", "work", "records"] {
            fs::create_dir(root.path().join(sub)).expect("failed to create toolchain dir");
        }
        let toolchain = Self { root };
        toolchain.install_playbook(0);
        toolchain
    }

    #[must_use]
    pub fn with_navigator(self, stub: NavigatorStub) -> Self {
        self.install_navigator(&stub);
        self
    }

    /// Install a container engine stub whose `info` exits with `info_exit_code`.
    #[must_use]
    pub fn with_engine(self, name: &str, info_exit_code: i32) -> Self {
        self.install(
            name,
            &format!(
                "#!/bin/sh\nif [ \"$1\" = \"info\" ]; then exit {info_exit_code}; fi\nexit 0\n"
            ),
        );
        self
    }

    #[must_use]
    pub fn without(self, name: &str) -> Self {
        let path = self.bin_dir().join(name);
        if path.exists() {
            fs::remove_file(path).expect("failed to remove stub");
        }
        self
    }

    pub fn install_navigator(&self, stub: &NavigatorStub) -> PathBuf {
        self.install("ansible-navigator", &stub.script(&self.record_dir()))
    }

    /// Install `ansible-playbook` whose `--version` exits with `exit_code`.
    pub fn install_playbook(&self, exit_code: i32) -> PathBuf {
        self.install(
            "ansible-playbook",
            &format!(
                "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo 'ansible-playbook [core 2.16.0]'\n  exit {exit_code}\nfi\nexit 0\n"
            ),
        )
    }

    /// Write an executable script into the bin directory.
    pub fn install(&self, name: &str, script: &str) -> PathBuf {
        let path = self.bin_dir().join(name);
        fs::write(&path, script).expect("failed to write stub");
        let mut perms = fs::metadata(&path).expect("stub metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("failed to mark stub executable");
        path
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    /// A scratch directory usable as a run's working directory.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    /// Where the stub navigator records what it was called with.
    #[must_use]
    pub fn record_dir(&self) -> PathBuf {
        self.root.path().join("records")
    }

    #[must_use]
    pub fn search_path(&self) -> String {
        self.bin_dir().display().to_string()
    }

    /// Configuration that resolves programs only from this toolchain.
    #[must_use]
    pub fn config(&self, base_run_directory: &Path) -> OrchestratorConfig {
        OrchestratorConfig {
            base_run_directory: base_run_directory.to_path_buf(),
            search_path: Some(self.search_path()),
            termination_grace_ms: 200,
            ..OrchestratorConfig::default()
        }
    }

    /// Arguments of the last navigator invocation, one per element.
    #[must_use]
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.record_dir().join("args"))
            .map(|data| data.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Marker variables seen by the last navigator invocation.
    #[must_use]
    pub fn recorded_env(&self) -> BTreeMap<String, String> {
        fs::read_to_string(self.record_dir().join("env"))
            .map(|data| {
                data.lines()
                    .filter_map(|line| line.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Settings file the last navigator invocation was pointed at.
    #[must_use]
    pub fn recorded_settings(&self) -> Option<String> {
        fs::read_to_string(self.record_dir().join("settings.yaml")).ok()
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
