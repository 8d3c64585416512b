use rawsh::{Event, Interpreter, LineEditor};

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("rawsh: {:#}", e);
            1
        }
    };
    // the editor's raw-mode guard has been dropped by now on every path,
    // so the terminal is back in cooked mode
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let mut shell = Interpreter::default();
    let mut editor = LineEditor::new();

    loop {
        match editor.read_line(shell.env())? {
            Event::Interrupted | Event::Eof => return Ok(0),
            Event::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = shell.run_line(&line)?;
                if shell.env().should_exit {
                    return Ok(shell.env().exit_code);
                }
            }
        }
    }
}
