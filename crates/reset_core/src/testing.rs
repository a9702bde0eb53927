//! Scripted host for unit tests.
//!
//! [`FakeHost`] stands in for the real machine behind [`CommandRunner`]:
//! it journals every command, answers from scripted rules and keeps a
//! small user database so `id`/`userdel` behave like the real tools.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::orchestrator::CleanupConfig;
use crate::system::{CommandOutput, CommandRunner, ProcessHandle};

type Effect = Arc<dyn Fn(&[&str]) -> CommandOutput + Send + Sync>;
type Hook = Arc<dyn Fn() + Send + Sync>;

enum Behaviour {
    Respond(CommandOutput),
    Unavailable,
    Effect(Effect),
}

struct Rule {
    prefix: String,
    behaviour: Behaviour,
}

#[derive(Default)]
struct State {
    rules: Vec<Rule>,
    users: BTreeSet<String>,
    on_spawn: Option<Effect>,
    on_terminate: Option<Hook>,
}

/// Fake [`CommandRunner`] with scripted answers.
#[derive(Default)]
pub(crate) struct FakeHost {
    journal: Arc<Mutex<Vec<String>>>,
    state: Mutex<State>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every command line starting with `prefix` with `output`.
    ///
    /// Later rules take precedence over earlier ones.
    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        self.push_rule(prefix, Behaviour::Respond(output));
    }

    /// Make every command line starting with `prefix` fail to spawn.
    pub fn unavailable(&self, prefix: &str) {
        self.push_rule(prefix, Behaviour::Unavailable);
    }

    /// Run `effect` for command lines starting with `prefix`.
    pub fn on(
        &self,
        prefix: &str,
        effect: impl Fn(&[&str]) -> CommandOutput + Send + Sync + 'static,
    ) {
        self.push_rule(prefix, Behaviour::Effect(Arc::new(effect)));
    }

    /// Run `effect` whenever a background process is spawned.
    pub fn on_spawn(&self, effect: impl Fn(&[&str]) -> CommandOutput + Send + Sync + 'static) {
        self.state.lock().on_spawn = Some(Arc::new(effect));
    }

    /// Run `hook` whenever a spawned process is terminated.
    pub fn on_terminate(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.state.lock().on_terminate = Some(Arc::new(hook));
    }

    /// Add a user to the fake user database.
    pub fn add_user(&self, name: &str) {
        self.state.lock().users.insert(name.to_string());
    }

    /// Whether a user is still present.
    pub fn has_user(&self, name: &str) -> bool {
        self.state.lock().users.contains(name)
    }

    /// Every command seen so far, as `program arg arg...`.
    pub fn commands(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    /// Commands whose line starts with `prefix`.
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn push_rule(&self, prefix: &str, behaviour: Behaviour) {
        self.state.lock().rules.push(Rule {
            prefix: prefix.to_string(),
            behaviour,
        });
    }

    fn builtin(&self, program: &str, args: &[&str]) -> CommandOutput {
        let mut state = self.state.lock();
        match (program, args) {
            ("id", ["-u", name]) => {
                if state.users.contains(*name) {
                    CommandOutput::ok("999\n")
                } else {
                    CommandOutput::failed(1, format!("id: '{name}': no such user\n"))
                }
            }
            ("userdel", [name]) => {
                if state.users.remove(*name) {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(6, format!("userdel: user '{name}' does not exist\n"))
                }
            }
            _ => CommandOutput::ok(""),
        }
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let line = command_line(program, args);
        self.journal.lock().push(line.clone());

        enum Matched {
            Respond(CommandOutput),
            Unavailable,
            Effect(Effect),
        }

        let matched = {
            let state = self.state.lock();
            state
                .rules
                .iter()
                .rev()
                .find(|r| line.starts_with(&r.prefix))
                .map(|r| match &r.behaviour {
                    Behaviour::Respond(out) => Matched::Respond(out.clone()),
                    Behaviour::Unavailable => Matched::Unavailable,
                    Behaviour::Effect(effect) => Matched::Effect(Arc::clone(effect)),
                })
        };

        match matched {
            Some(Matched::Respond(out)) => Ok(out),
            Some(Matched::Unavailable) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            )),
            Some(Matched::Effect(effect)) => Ok(effect(args)),
            None => Ok(self.builtin(program, args)),
        }
    }

    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<Box<dyn ProcessHandle>> {
        let line = command_line(program, args);
        self.journal.lock().push(format!("spawn {line}"));

        let (unavailable, on_spawn, on_terminate) = {
            let state = self.state.lock();
            let unavailable = state.rules.iter().rev().any(|r| {
                line.starts_with(&r.prefix) && matches!(r.behaviour, Behaviour::Unavailable)
            });
            (unavailable, state.on_spawn.clone(), state.on_terminate.clone())
        };

        if unavailable {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            ));
        }
        if let Some(effect) = on_spawn {
            effect(args);
        }

        Ok(Box::new(FakeProcess {
            journal: Arc::clone(&self.journal),
            name: program.to_string(),
            on_terminate,
        }))
    }
}

struct FakeProcess {
    journal: Arc<Mutex<Vec<String>>>,
    name: String,
    on_terminate: Option<Hook>,
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.journal.lock().push(format!("terminate {}", self.name));
        if let Some(hook) = &self.on_terminate {
            hook();
        }
        Ok(())
    }
}

/// A node laid out under a temporary root.
///
/// Mirrors the real layout (`var/lib/k0s`, `run/k0s`, `etc/systemd/system`,
/// `etc/cni/net.d`, `sys/class/net`) so steps can touch real files.
pub(crate) struct Sandbox {
    pub root: tempfile::TempDir,
    pub host: Arc<FakeHost>,
    pub settings: Settings,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create sandbox root");
        let base = root.path();

        let mut settings = Settings::default();
        settings.paths.data_dir = base.join("var/lib/k0s").display().to_string();
        settings.paths.mounts_file = base.join("proc/mounts").display().to_string();
        settings.services.unit_dir = base.join("etc/systemd/system").display().to_string();
        settings.cni.sys_class_net = base.join("sys/class/net").display().to_string();
        settings.cni.config_files = settings
            .cni
            .config_files
            .iter()
            .map(|f| rebase(base, f).display().to_string())
            .collect();

        for dir in ["proc", "etc/systemd/system", "etc/cni/net.d", "sys/class/net"] {
            std::fs::create_dir_all(base.join(dir)).expect("create sandbox dir");
        }
        std::fs::write(base.join("proc/mounts"), "").expect("write mount table");

        Self {
            root,
            host: FakeHost::new(),
            settings,
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.data_dir)
    }

    pub fn run_dir(&self) -> PathBuf {
        self.path("run/k0s")
    }

    pub fn config(&self) -> CleanupConfig {
        let runner: Arc<dyn CommandRunner> = self.host.clone();
        CleanupConfig::with_run_dir(self.data_dir(), self.run_dir(), self.settings.clone(), runner)
    }

    /// Create a file (and its parents) under the sandbox.
    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(&path, b"").expect("create file");
        path
    }

    /// Lay out everything a k0s node leaves behind.
    pub fn populate(&self) {
        self.touch("var/lib/k0s/bin/containerd");
        self.touch("var/lib/k0s/pki/ca.crt");
        self.touch("run/k0s/k0s.pid");
        for service in &self.settings.services.names {
            self.touch(&format!("etc/systemd/system/{service}.service"));
        }
        for file in &self.settings.cni.config_files {
            let path = Path::new(file);
            std::fs::create_dir_all(path.parent().expect("cni dir")).expect("create cni dir");
            std::fs::write(path, b"{}").expect("write cni file");
        }
        for iface in &self.settings.cni.interfaces {
            self.touch(&format!("sys/class/net/{iface}"));
        }
        for user in &self.settings.users.names {
            self.host.add_user(user);
        }
    }
}

fn rebase(base: &Path, absolute: &str) -> PathBuf {
    base.join(absolute.trim_start_matches('/'))
}
