//! Macro lowering pass. `IF`/`ELSEIF`/`ELSE`/`END` and `WHILE`/`END`
//! become jump-on-false `BRANCH` and `GOTO` against synthetic `::N`
//! labels, so the parser and VM never see structured control flow.

use super::{ScriptError, ScriptResult};

enum Frame {
    If {
        /// Label the previous arm branches to when false
        pending: Option<usize>,
        /// Label past the whole macro, allocated on first use
        end: Option<usize>,
        line: usize,
    },
    While {
        start: usize,
        end: usize,
        line: usize,
    },
}

/// Lowers macros in the source, allocating synthetic labels from the
/// shared counter so labels stay unique across included files
pub fn preprocess(source: &str, counter: &mut usize) -> ScriptResult<String> {
    let mut output: Vec<String> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut next = |counter: &mut usize| {
        *counter += 1;
        *counter
    };

    for (index, line) in source.lines().enumerate() {
        let number = index + 1;
        let trimmed = line.trim_start();
        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (trimmed, ""),
        };

        match word.to_ascii_uppercase().as_str() {
            "IF" => {
                if rest.is_empty() {
                    return Err(ScriptError::compile(number, "IF without a condition"));
                }
                let pending = next(counter);
                output.push(format!("BRANCH \"{}\" ::{pending}", escape(rest)));
                stack.push(Frame::If {
                    pending: Some(pending),
                    end: None,
                    line: number,
                });
            }
            "ELSEIF" => {
                let Some(Frame::If { pending, end, .. }) = stack.last_mut() else {
                    return Err(ScriptError::compile(number, "ELSEIF without IF"));
                };
                let Some(previous) = pending.take() else {
                    return Err(ScriptError::compile(number, "ELSEIF after ELSE"));
                };
                let end = *end.get_or_insert_with(|| next(counter));
                output.push(format!("GOTO ::{end}"));
                output.push(format!("::{previous}"));
                let label = next(counter);
                output.push(format!("BRANCH \"{}\" ::{label}", escape(rest)));
                *pending = Some(label);
            }
            "ELSE" => {
                let Some(Frame::If { pending, end, .. }) = stack.last_mut() else {
                    return Err(ScriptError::compile(number, "ELSE without IF"));
                };
                let Some(previous) = pending.take() else {
                    return Err(ScriptError::compile(number, "duplicate ELSE"));
                };
                let end = *end.get_or_insert_with(|| next(counter));
                output.push(format!("GOTO ::{end}"));
                output.push(format!("::{previous}"));
            }
            "END" => match stack.pop() {
                Some(Frame::If { pending, end, .. }) => {
                    if let Some(pending) = pending {
                        output.push(format!("::{pending}"));
                    }
                    if let Some(end) = end {
                        output.push(format!("::{end}"));
                    }
                }
                Some(Frame::While { start, end, .. }) => {
                    output.push(format!("GOTO ::{start}"));
                    output.push(format!("::{end}"));
                }
                None => {
                    return Err(ScriptError::compile(number, "END without IF or WHILE"));
                }
            },
            "WHILE" => {
                if rest.is_empty() {
                    return Err(ScriptError::compile(number, "WHILE without a condition"));
                }
                let start = next(counter);
                let end = next(counter);
                output.push(format!("::{start}"));
                output.push(format!("BRANCH \"{}\" ::{end}", escape(rest)));
                stack.push(Frame::While {
                    start,
                    end,
                    line: number,
                });
            }
            _ => output.push(line.to_string()),
        }
    }

    if let Some(frame) = stack.last() {
        let (what, line) = match frame {
            Frame::If { line, .. } => ("IF", *line),
            Frame::While { line, .. } => ("WHILE", *line),
        };
        return Err(ScriptError::compile(line, format!("{what} without END")));
    }

    Ok(output.join("\n"))
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod test {
    use super::preprocess;

    #[test]
    fn test_if_else_lowering() {
        let mut counter = 0;
        let lowered = preprocess("IF $x = 1\nECHO one\nELSE\nECHO other\nEND\n", &mut counter)
            .unwrap();
        assert_eq!(
            lowered,
            "BRANCH \"$x = 1\" ::1\nECHO one\nGOTO ::2\n::1\nECHO other\n::2"
        );
    }

    #[test]
    fn test_elseif_chain_preserves_body_order() {
        let mut counter = 0;
        let lowered = preprocess(
            "IF $x = 1\nECHO a\nELSEIF $x = 2\nECHO b\nELSE\nECHO c\nEND\n",
            &mut counter,
        )
        .unwrap();
        // Every body line survives, in order, exactly once
        let bodies: Vec<&str> = lowered
            .lines()
            .filter(|line| line.starts_with("ECHO"))
            .collect();
        assert_eq!(bodies, vec!["ECHO a", "ECHO b", "ECHO c"]);
    }

    #[test]
    fn test_while_lowering() {
        let mut counter = 0;
        let lowered = preprocess("WHILE $i < 3\n$i ++\nEND\n", &mut counter).unwrap();
        assert_eq!(lowered, "::1\nBRANCH \"$i < 3\" ::2\n$i ++\nGOTO ::1\n::2");
    }

    #[test]
    fn test_quotes_escaped_in_condition() {
        let mut counter = 0;
        let lowered = preprocess("IF $name = \"ace\"\nHALT\nEND\n", &mut counter).unwrap();
        assert!(lowered.starts_with("BRANCH \"$name = \\\"ace\\\"\" ::1"));
    }

    #[test]
    fn test_unbalanced_if_rejected() {
        let mut counter = 0;
        let err = preprocess("IF $x\nECHO hi\n", &mut counter).unwrap_err();
        assert!(err.to_string().contains("IF without END"));
    }

    #[test]
    fn test_end_without_open_rejected() {
        let mut counter = 0;
        assert!(preprocess("END\n", &mut counter).is_err());
    }
}
