use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdout};
use crate::env::Environment;
use crate::external;
use crate::interpreter::Factory;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use std::path::PathBuf;

/// Names handled inside the shell process. Lookup is exact-match and
/// case-sensitive; the completion engine and `type` share this table.
pub const BUILTINS: [&str; 5] = ["cd", "echo", "exit", "pwd", "type"];

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process. They receive the
/// redirection-stripped arguments plus the resolved output and error sinks.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO sinks and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match BuiltinCommand::execute(*self, &mut stdout, &mut stderr, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stderr, "{}", e)?;
                Ok(1)
            }
        }
    }
}

/// Fallback command produced when argument parsing fails; it prints the
/// diagnostic (or help text) that `argh` generated.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            stderr.write_all(self.output.as_bytes())?;
            Ok(1)
        } else {
            stdout.write_all(self.output.as_bytes())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// With no target, changes to the directory named by HOME; a leading `~`
/// expands to HOME.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.args.len() > 1 {
            writeln!(stderr, "cd: too many arguments")?;
            return Ok(1);
        }
        let target = match self.args.first() {
            Some(arg) => expand_tilde(arg, env),
            None => match env.get_var("HOME") {
                Some(home) => home,
                None => {
                    writeln!(stderr, "cd: HOME not set")?;
                    return Ok(1);
                }
            },
        };

        if env::set_current_dir(&target).is_err() {
            writeln!(stderr, "cd: {}: No such file or directory", target)?;
            return Ok(1);
        }
        env.current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from(&target));
        Ok(0)
    }
}

/// Expand a leading `~` to the value of HOME; any other argument is taken
/// verbatim. When HOME is unset the argument is left untouched.
fn expand_tilde(arg: &str, env: &Environment) -> String {
    match arg.strip_prefix('~') {
        Some(rest) => match env.get_var("HOME") {
            Some(home) => format!("{}{}", home, rest),
            None => arg.to_string(),
        },
        None => arg.to_string(),
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by spaces.
/// By default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Request shell termination with the given status (0 when absent).
pub struct Exit {
    #[argh(positional, greedy)]
    /// optional numeric exit status, base 10.
    pub args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match self.args.first() {
            None => env.request_exit(0),
            Some(arg) => {
                // a non-numeric argument is a no-op: the prompt returns
                if let Ok(code) = arg.parse::<i32>() {
                    env.request_exit(code);
                }
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how each command name would be interpreted.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to describe.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.names.is_empty() {
            writeln!(stdout, "type: missing argument")?;
            return Ok(1);
        }
        let mut code = 0;
        for name in &self.names {
            if BUILTINS.contains(&name.as_str()) {
                writeln!(stdout, "{} is a shell builtin", name)?;
            } else if let Some(path) = external::lookup(env, name) {
                writeln!(stdout, "{} is {}", name, path.display())?;
            } else {
                writeln!(stdout, "{}: not found", name)?;
                code = 1;
            }
        }
        Ok(code)
    }
}
