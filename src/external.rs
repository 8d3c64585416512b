use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::Result;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Command that is not a builtin.
pub struct ExternalCommand {
    name: String,
    path: OsString,
    args: Vec<OsString>,
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let executable = lookup(env, name)?;
        Some(Box::new(ExternalCommand {
            name: name.to_string(),
            path: executable.into_os_string(),
            args: args.iter().map(|x| x.into()).collect(),
        }))
    }
}

impl ExecutableCommand for ExternalCommand {
    /// Spawn the resolved executable and wait for it.
    ///
    /// Standard input is inherited from the controlling terminal; stdout and
    /// stderr go to the sinks chosen by the redirection parser. Spawn and wait
    /// failures after a successful resolution are swallowed: the exit status
    /// is not surfaced to the user anyway.
    fn execute(
        self: Box<Self>,
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let mut cmd = Command::new(&self.path);
        cmd.arg0(&self.name)
            .args(&self.args)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .stdout(stdout.stdio())
            .stderr(stderr.stdio());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(_) => return Ok(127),
        };
        let exit_status = match child.wait() {
            Ok(status) => status,
            Err(_) => return Ok(1),
        };
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else {
        -1
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

/// Resolve a command name to the executable that would run for it.
///
/// A name containing a path separator is stat-checked directly; anything else
/// is searched across the PATH entries in order. Empty PATH entries are
/// skipped. The first directory containing a regular file of that name with
/// any execute bit set wins.
pub fn lookup(env: &Environment, name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }
    let search_paths = env.get_var("PATH")?;
    for dir in search_paths.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = Path::new(dir).join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Enumerate executable basenames across all PATH directories that start with
/// `prefix`, sorted and de-duplicated. Directories that cannot be read are
/// skipped silently.
pub fn find_matches(env: &Environment, prefix: &str) -> Vec<String> {
    let mut matches = Vec::new();
    let Some(search_paths) = env.get_var("PATH") else {
        return matches;
    };
    for dir in search_paths.split(':') {
        if dir.is_empty() {
            continue;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(prefix) && is_executable(&entry.path()) {
                matches.push(name);
            }
        }
    }
    matches.sort();
    matches.dedup();
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::fs::{self, File};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("external_test_{}_{}_{}", tag, std::process::id(), nanos));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn touch_executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).expect("create file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn touch_plain(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).expect("create file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
        path
    }

    fn env_with_path(path: &str) -> Environment {
        let mut vars = HashMap::new();
        vars.insert("PATH".to_string(), path.to_string());
        Environment {
            vars,
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
            exit_code: 0,
        }
    }

    #[test]
    fn test_lookup_finds_executable_in_path_order() {
        let first = make_unique_temp_dir("lookup_a");
        let second = make_unique_temp_dir("lookup_b");
        touch_executable(&second, "tool");
        let expected = touch_executable(&first, "tool");

        let env = env_with_path(&format!(
            "{}:{}",
            first.to_string_lossy(),
            second.to_string_lossy()
        ));
        assert_eq!(lookup(&env, "tool"), Some(expected));

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    fn test_lookup_skips_files_without_execute_bit() {
        let dir = make_unique_temp_dir("noexec");
        touch_plain(&dir, "data");

        let env = env_with_path(&dir.to_string_lossy());
        assert_eq!(lookup(&env, "data"), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_lookup_skips_empty_path_entries() {
        let dir = make_unique_temp_dir("emptyentry");
        let expected = touch_executable(&dir, "tool");

        let env = env_with_path(&format!("::{}", dir.to_string_lossy()));
        assert_eq!(lookup(&env, "tool"), Some(expected));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_lookup_with_separator_checks_directly() {
        let dir = make_unique_temp_dir("direct");
        let tool = touch_executable(&dir, "tool");
        let tool_str = tool.to_string_lossy().to_string();

        // PATH is irrelevant for names containing a slash
        let env = env_with_path("");
        assert_eq!(lookup(&env, &tool_str), Some(tool));
        assert_eq!(lookup(&env, "/no/such/binary"), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_find_matches_is_sorted_and_deduplicated() {
        let first = make_unique_temp_dir("matches_a");
        let second = make_unique_temp_dir("matches_b");
        touch_executable(&first, "foobaz");
        touch_executable(&first, "foobar");
        touch_executable(&second, "foobar");
        touch_executable(&second, "other");
        touch_plain(&first, "foobad");

        let env = env_with_path(&format!(
            "{}:{}",
            first.to_string_lossy(),
            second.to_string_lossy()
        ));
        assert_eq!(find_matches(&env, "foo"), vec!["foobar", "foobaz"]);

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    fn test_find_matches_skips_unreadable_directories() {
        let dir = make_unique_temp_dir("unreadable");
        let expected = touch_executable(&dir, "prog");
        let _ = expected;

        let env = env_with_path(&format!("/no/such/dir:{}", dir.to_string_lossy()));
        assert_eq!(find_matches(&env, "pr"), vec!["prog"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_find_matches_includes_every_proper_prefix() {
        let dir = make_unique_temp_dir("prefixes");
        touch_executable(&dir, "program");

        let env = env_with_path(&dir.to_string_lossy());
        for end in 1.."program".len() {
            let prefix = &"program"[..end];
            assert!(
                find_matches(&env, prefix).contains(&"program".to_string()),
                "prefix {:?} should match",
                prefix
            );
        }

        let _ = fs::remove_dir_all(dir);
    }
}
