use crate::command::{CommandFactory, ExitCode, Stdout};
use crate::env::Environment;
use crate::io_adapters::{InheritedStderr, InheritedStdout};
use crate::{lexer, parser};
use anyhow::Result;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate — BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The shell core: runs one input line through tokenize → redirection parse →
/// dispatch.
///
/// The interpreter maintains an [`Environment`] and a list of
/// [`CommandFactory`] objects that are queried to create commands by name,
/// builtins before the external launcher. Parse errors, resource errors and
/// command failures are reported on the error sink and never abort the caller:
/// the REPL stays alive until an exit is requested.
///
/// Example
/// ```
/// use rawsh::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run_line("echo hello world").unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
        }
    }

    /// Read-only view of the shell environment (used by the completion scan
    /// and the driver's exit check).
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single input line with output and error wired to the process
    /// streams (unless redirected).
    pub fn run_line(&mut self, line: &str) -> Result<ExitCode> {
        self.run_line_with_sinks(line, Box::new(InheritedStdout), Box::new(InheritedStderr))
    }

    /// Core per-line pipeline. The default sinks are used for every stream the
    /// line does not redirect; redirection files are owned here and closed by
    /// drop on every path out of this function.
    pub fn run_line_with_sinks(
        &mut self,
        line: &str,
        default_out: Box<dyn Stdout>,
        mut default_err: Box<dyn Stdout>,
    ) -> Result<ExitCode> {
        let tokens = match lexer::tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                writeln!(default_err, "Parse error: {}", e)?;
                return Ok(2);
            }
        };
        if tokens.is_empty() {
            return Ok(0);
        }

        let parsed = match parser::parse_command(tokens) {
            Ok(parsed) => parsed,
            Err(e) => {
                writeln!(default_err, "{}", e)?;
                return Ok(2);
            }
        };

        let redirections = match parser::open_redirections(&parsed.redirects) {
            Ok(redirections) => redirections,
            Err(e) => {
                writeln!(default_err, "{:#}", e)?;
                return Ok(1);
            }
        };

        let out: Box<dyn Stdout> = match redirections.stdout {
            Some(file) => Box::new(file),
            None => default_out,
        };
        let err: Box<dyn Stdout> = match redirections.stderr {
            Some(file) => Box::new(file),
            None => default_err,
        };

        // a line holding only redirections still created its files
        let Some((name, rest)) = parsed.argv.split_first() else {
            return Ok(0);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        self.dispatch(name, &args, out, err)
    }

    fn dispatch(
        &mut self,
        name: &str,
        args: &[&str],
        out: Box<dyn Stdout>,
        mut err: Box<dyn Stdout>,
    ) -> Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(out, err, &mut self.env);
            }
        }
        writeln!(err, "{}: command not found", name)?;
        Ok(127)
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands: the five
    /// builtins followed by the external command launcher.
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::MemWriter;
    use std::env as stdenv;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!(
            "interpreter_test_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn run_capture(interp: &mut Interpreter, line: &str) -> (ExitCode, String, String) {
        let (out, out_handle) = MemWriter::with_handle();
        let (err, err_handle) = MemWriter::with_handle();
        let code = interp
            .run_line_with_sinks(line, Box::new(out), Box::new(err))
            .expect("run_line failed");
        let stdout = String::from_utf8(out_handle.borrow().clone()).unwrap();
        let stderr = String::from_utf8(err_handle.borrow().clone()).unwrap();
        (code, stdout, stderr)
    }

    #[test]
    fn test_echo_simple() {
        let mut sh = Interpreter::default();
        let (code, out, err) = run_capture(&mut sh, "echo hello world");
        assert_eq!(code, 0);
        assert_eq!(out, "hello world\n");
        assert_eq!(err, "");
    }

    #[test]
    fn test_echo_single_quoted_segments_concatenate() {
        let mut sh = Interpreter::default();
        let (_, out, _) = run_capture(&mut sh, "echo 'it''s'");
        assert_eq!(out, "its\n");
    }

    #[test]
    fn test_echo_double_quote_escape() {
        let mut sh = Interpreter::default();
        let (_, out, _) = run_capture(&mut sh, r#"echo "a\"b""#);
        assert_eq!(out, "a\"b\n");
    }

    #[test]
    fn test_unknown_command_reports_and_continues() {
        let mut sh = Interpreter::default();
        let (code, out, err) = run_capture(&mut sh, "nosuchcmd");
        assert_eq!(code, 127);
        assert_eq!(out, "");
        assert_eq!(err, "nosuchcmd: command not found\n");

        // the interpreter is still usable afterwards
        let (code, out, _) = run_capture(&mut sh, "echo still alive");
        assert_eq!(code, 0);
        assert_eq!(out, "still alive\n");
    }

    #[test]
    fn test_blank_line_is_a_no_op() {
        let mut sh = Interpreter::default();
        let (code, out, err) = run_capture(&mut sh, "   ");
        assert_eq!(code, 0);
        assert_eq!(out, "");
        assert_eq!(err, "");
    }

    #[test]
    fn test_parse_error_is_reported_on_stderr() {
        let mut sh = Interpreter::default();
        let (code, out, err) = run_capture(&mut sh, "echo 'unterminated");
        assert_ne!(code, 0);
        assert_eq!(out, "");
        assert_eq!(err, "Parse error: unterminated quote\n");

        let (_, _, err) = run_capture(&mut sh, "echo trailing\\");
        assert_eq!(err, "Parse error: trailing backslash\n");
    }

    #[test]
    fn test_dangling_redirection_is_a_syntax_error() {
        let mut sh = Interpreter::default();
        let (code, _, err) = run_capture(&mut sh, "echo hi >");
        assert_ne!(code, 0);
        assert_eq!(err, "syntax error: expected filename after >\n");
    }

    #[test]
    fn test_stdout_redirection_writes_file() {
        let dir = make_unique_temp_dir("redirect");
        let path = dir.join("out.txt");
        let mut sh = Interpreter::default();

        let (code, out, err) =
            run_capture(&mut sh, &format!("echo hi > {}", path.to_string_lossy()));
        assert_eq!(code, 0);
        assert_eq!(out, "", "redirected output must not reach the sink");
        assert_eq!(err, "");
        assert_eq!(fs::read_to_string(&path).unwrap(), "hi\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_stdout_append_redirection() {
        let dir = make_unique_temp_dir("append");
        let path = dir.join("out.txt");
        let arg = path.to_string_lossy();
        let mut sh = Interpreter::default();

        run_capture(&mut sh, &format!("echo one > {}", arg));
        run_capture(&mut sh, &format!("echo two >> {}", arg));
        run_capture(&mut sh, &format!("echo three 1>> {}", arg));
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_stderr_redirection_captures_builtin_errors() {
        let dir = make_unique_temp_dir("stderr");
        let path = dir.join("err.txt");
        let mut sh = Interpreter::default();

        let (code, _, err) = run_capture(
            &mut sh,
            &format!("cd one two 2> {}", path.to_string_lossy()),
        );
        assert_eq!(code, 1);
        assert_eq!(err, "", "redirected error must not reach the sink");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "cd: too many arguments\n"
        );

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_redirection_only_line_creates_file() {
        let dir = make_unique_temp_dir("bare");
        let path = dir.join("created.txt");
        let mut sh = Interpreter::default();

        let (code, _, err) = run_capture(&mut sh, &format!("> {}", path.to_string_lossy()));
        assert_eq!(code, 0);
        assert_eq!(err, "");
        assert!(path.exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_redirection_open_failure_aborts_invocation() {
        let mut sh = Interpreter::default();
        let (code, out, err) = run_capture(&mut sh, "echo hi > /no-such-dir-anywhere/out.txt");
        assert_eq!(code, 1);
        assert_eq!(out, "", "command must not run when the target cannot open");
        assert!(err.contains("/no-such-dir-anywhere/out.txt"));
    }

    #[test]
    fn test_exit_requests_termination() {
        let mut sh = Interpreter::default();
        run_capture(&mut sh, "exit 42");
        assert!(sh.env().should_exit);
        assert_eq!(sh.env().exit_code, 42);
    }

    #[test]
    fn test_exit_with_garbage_keeps_running() {
        let mut sh = Interpreter::default();
        run_capture(&mut sh, "exit notanumber");
        assert!(!sh.env().should_exit);
    }

    #[test]
    fn test_external_command_with_redirection() {
        // the child runs with the shell's working directory
        let _lock = crate::testutil::lock_current_dir();
        let dir = make_unique_temp_dir("external");
        let path = dir.join("out.txt");
        let mut sh = Interpreter::default();

        let (code, out, _) = run_capture(
            &mut sh,
            &format!("sh -c 'printf payload' > {}", path.to_string_lossy()),
        );
        assert_eq!(code, 0);
        assert_eq!(out, "");
        assert_eq!(fs::read_to_string(&path).unwrap(), "payload");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_pipeline_is_rejected() {
        let mut sh = Interpreter::default();
        let (code, _, err) = run_capture(&mut sh, "echo hi | wc");
        assert_ne!(code, 0);
        assert_eq!(err, "pipelines are not supported\n");
    }

    #[test]
    fn test_type_through_the_pipeline() {
        let mut sh = Interpreter::default();
        let (_, out, _) = run_capture(&mut sh, "type pwd");
        assert_eq!(out, "pwd is a shell builtin\n");
    }
}
