//! Bootstrap a MySQL InnoDB cluster with MySQL Shell.
//!
//! The cluster logic lives in a generated MySQL Shell JavaScript program;
//! this module renders it, hands it to a [`ScriptShell`] together with a
//! client login, and reports the shell's result as a one-step run.

use crate::error::{Error, Result};
use crate::remote::clock::Clock;
use crate::remote::local::LocalSession;
use crate::remote::shell;
use crate::remote::transport::Credential;
use crate::runner::{Command, RunOutcome, SequencedRunner};
use crate::scratch::ScratchFile;
use log::info;
use std::time::Duration;

pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_CLUSTER_NAME: &str = "myCluster";

/// Default pause before bootstrapping, giving freshly started instances time to settle.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(120);

/// Pause inside the script between configuring instances and creating the cluster.
const RESTART_GRACE_MS: u64 = 5000;

/// Cluster to build.
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    pub admin_user: String,
    pub admin_password: Credential,
    pub cluster_name: String,
    /// Every member, including the primary.
    pub hosts: Vec<String>,
    /// Host the cluster is created on.
    pub primary: String,
}

impl ClusterSpec {
    pub fn validate(&self) -> Result<()> {
        if self.admin_user.is_empty() {
            return Err(Error::InvalidInput("admin user must not be empty".to_string()));
        }
        if self.cluster_name.is_empty() {
            return Err(Error::InvalidInput("cluster name must not be empty".to_string()));
        }
        if self.hosts.is_empty() {
            return Err(Error::InvalidInput("at least one database host is required".to_string()));
        }
        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(Error::InvalidInput("database host names must not be empty".to_string()));
        }
        if self.primary.is_empty() {
            return Err(Error::InvalidInput("primary host must not be empty".to_string()));
        }
        let login_values = [
            self.admin_user.as_str(),
            self.admin_password.expose(),
            self.primary.as_str(),
        ];
        if login_values.iter().any(|v| v.contains(['\n', '\r'])) {
            return Err(Error::InvalidInput(
                "admin user, password and primary host must be single-line".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses the host list given as a JSON array of strings.
pub fn parse_hosts(json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json).map_err(|e| {
        Error::InvalidInput(format!(
            "database hosts must be a JSON array of strings (e.g. [\"db1\",\"db2\"]): {}",
            e
        ))
    })
}

/// Renders the `[client]` option file read by `mysqlsh --defaults-file`.
///
/// Values are double-quoted so `#`, backslashes and surrounding spaces
/// reach the client unchanged.
pub fn render_login(spec: &ClusterSpec) -> String {
    format!(
        "[client]\nuser={}\npassword={}\nhost={}\n",
        option_value(&spec.admin_user),
        option_value(spec.admin_password.expose()),
        option_value(&spec.primary)
    )
}

fn option_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::InvalidInput(format!("cannot encode script value: {}", e)))
}

/// Renders the MySQL Shell JavaScript that configures and joins every host.
pub fn render_script(spec: &ClusterSpec) -> Result<String> {
    spec.validate()?;

    let header = format!(
        "var primary = {primary};\n\
         var adminUser = {user};\n\
         var adminPassword = {password};\n\
         var members = {hosts};\n\
         var clusterName = {name};\n\
         var restartGraceMs = {grace};\n",
        primary = js_literal(&spec.primary)?,
        user = js_literal(&spec.admin_user)?,
        password = js_literal(spec.admin_password.expose())?,
        hosts = js_literal(&spec.hosts)?,
        name = js_literal(&spec.cluster_name)?,
        grace = RESTART_GRACE_MS,
    );

    Ok(format!("{}{}", header, SCRIPT_BODY))
}

const SCRIPT_BODY: &str = r#"
function pause(ms) {
    var until = Date.now() + ms;
    while (Date.now() < until) {}
}

function login(host) {
    return { host: host, user: adminUser, password: adminPassword };
}

print('\nMembers (' + members.length + '):\n');
members.forEach(function (h, i) { print('  ' + i + ': ' + h + '\n'); });

print('\nPreparing instances.\n');
members.forEach(function (h) {
    shell.connect(login(h));
    print('=> ' + h + ': checking instance configuration\n');
    var check = dba.checkInstanceConfiguration();
    if (check.status == 'ok') {
        print('   already configured for InnoDB Cluster\n');
    } else {
        print('   configuring (restart allowed)\n');
        var configured = dba.configureInstance(login(h), { restart: true });
        print('   ' + JSON.stringify(configured) + '\n');
    }
});

pause(restartGraceMs);

print('\nCreating cluster ' + clusterName + ' on ' + primary + '\n');
shell.connect(login(primary));
var cluster;
try {
    cluster = dba.createCluster(clusterName);
} catch (e) {
    print('Cluster was not created (' + e + '); using the existing one.\n');
    cluster = dba.getCluster(clusterName);
}

var failures = 0;
members.forEach(function (h) {
    if (h === primary) {
        print('=> ' + h + ': primary, skipping\n');
        return;
    }
    try {
        print('=> ' + h + ': adding with clone recovery\n');
        cluster.addInstance(h, { recoveryMethod: 'clone' });
        print('   added\n');
    } catch (e) {
        failures++;
        print('   could not be added: ' + e + '\n');
    }
});

if (failures > 0) {
    throw new Error(failures + ' instance(s) could not be added to ' + clusterName);
}
print('\nCluster ' + clusterName + ' is ready.\n');
"#;

/// Executes a generated MySQL Shell script.
///
/// `login` is the option-file text, `script` the JavaScript source. Both
/// carry the admin password, so implementations keep them off the command
/// line.
pub trait ScriptShell {
    fn run_script(&self, login: &str, script: &str) -> Result<RunOutcome>;
}

/// Runs scripts with the local `mysqlsh` binary.
#[derive(Debug, Clone)]
pub struct MysqlShell {
    binary: String,
}

impl MysqlShell {
    pub fn new() -> Self {
        Self {
            binary: "mysqlsh".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for MysqlShell {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptShell for MysqlShell {
    fn run_script(&self, login: &str, script: &str) -> Result<RunOutcome> {
        // Both files are removed when they go out of scope, whatever happens below.
        let login_file = ScratchFile::create("nodeops-mylogin-", ".cnf", login)?;
        let script_file = ScratchFile::create("nodeops-cluster-", ".js", script)?;

        let invocation = shell::join([
            self.binary.as_str(),
            format!("--defaults-file={}", login_file.path().display()).as_str(),
            "--no-wizard",
            "--js",
            format!("--file={}", script_file.path().display()).as_str(),
        ]);

        info!("Running MySQL Shell script");
        let mut session = LocalSession::new();
        let outcome = SequencedRunner::new(None).run(
            &mut session,
            &[Command::new(invocation).labeled("Running MySQL Shell script")],
        );
        Ok(outcome)
    }
}

/// Waits `settle`, then builds the cluster described by `spec`.
pub fn bootstrap<S, C>(
    script_shell: &S,
    clock: &C,
    settle: Duration,
    spec: &ClusterSpec,
) -> Result<RunOutcome>
where
    S: ScriptShell + ?Sized,
    C: Clock + ?Sized,
{
    let script = render_script(spec)?;

    if !settle.is_zero() {
        info!("Waiting {:?} for database instances to settle", settle);
        clock.sleep(settle);
    }

    script_shell.run_script(&render_login(spec), &script)
}

/// Name of this machine, used as the default primary.
pub fn local_hostname() -> Result<String> {
    let output = std::process::Command::new("hostname").output()?;
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || name.is_empty() {
        return Err(Error::InvalidInput(
            "could not determine the local hostname; pass --primary".to_string(),
        ));
    }
    Ok(name)
}
