/// Block extraction: locating the bodies of if-chains, while-loops and
/// choice options by scanning forward from a start index.
///
/// Scanning is flat: a body ends at the first matching terminator, so a
/// nested construct of the same kind inside a body is not supported.
use crate::schema::line::{codes, ScriptSyntax};

/// A body collected by scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub lines: Vec<String>,
    /// Index of the terminating line, or `None` if the scan ran off the end.
    pub end: Option<usize>,
}

impl Block {
    pub fn is_terminated(&self) -> bool {
        self.end.is_some()
    }
}

/// Collect lines from `start` up to (not including) the first command whose
/// code is in `terminators`.
pub fn scan_until(lines: &[String], start: usize, terminators: &[&str], syntax: &ScriptSyntax) -> Block {
    let mut body = Vec::new();
    for (idx, line) in lines.iter().enumerate().skip(start) {
        if syntax.is_command_with(line, terminators) {
            return Block {
                lines: body,
                end: Some(idx),
            };
        }
        body.push(line.clone());
    }
    Block {
        lines: body,
        end: None,
    }
}

/// Body of one if/elif branch: up to the next `elif` or `endIf`.
pub fn if_block(lines: &[String], start: usize, syntax: &ScriptSyntax) -> Block {
    scan_until(lines, start, &[codes::ELIF, codes::END_IF], syntax)
}

/// Body of a while-loop: up to the first `endWhile`.
pub fn while_block(lines: &[String], start: usize, syntax: &ScriptSyntax) -> Block {
    scan_until(lines, start, &[codes::END_WHILE], syntax)
}

/// Everything a choice statement owns: up to the first `endChoice`.
pub fn choice_body(lines: &[String], start: usize, syntax: &ScriptSyntax) -> Block {
    scan_until(lines, start, &[codes::END_CHOICE], syntax)
}

/// The lines of option `chosen` inside a captured choice body: strictly
/// between its numeric marker and the next option marker or `endChoice`.
///
/// Returns `None` if no marker carries `chosen`.
pub fn choice_block(body: &[String], chosen: usize, syntax: &ScriptSyntax) -> Option<Vec<String>> {
    let mut lines = body.iter();
    lines.find(|line| syntax.option_marker(line) == Some(chosen))?;
    Some(
        lines
            .take_while(|line| {
                syntax.option_marker(line).is_none()
                    && !syntax.is_command_with(line, &[codes::END_CHOICE])
            })
            .cloned()
            .collect(),
    )
}

/// One branch of an if-chain: its condition and the lines it would run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub condition: String,
    pub body: Vec<String>,
}

/// A fully scanned if-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfChain {
    pub branches: Vec<Branch>,
    /// Index of the `endIf` line, or `None` if the chain is unterminated.
    pub end: Option<usize>,
}

/// Scan an if-chain whose `stateIf` line sits at `at`, collecting every
/// branch up to `endIf`.
pub fn if_chain(lines: &[String], at: usize, condition: &str, syntax: &ScriptSyntax) -> IfChain {
    let mut branches = Vec::new();
    let mut condition = condition.to_string();
    let mut idx = at;
    loop {
        let block = if_block(lines, idx + 1, syntax);
        branches.push(Branch {
            condition,
            body: block.lines,
        });
        let Some(end) = block.end else {
            return IfChain {
                branches,
                end: None,
            };
        };
        if syntax.is_command_with(&lines[end], &[codes::END_IF]) {
            return IfChain {
                branches,
                end: Some(end),
            };
        }
        condition = syntax.command_args(&lines[end]).unwrap_or("").to_string();
        idx = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn if_block_stops_at_elif() {
        let syntax = ScriptSyntax::default();
        let src = lines(">>>stateIf:true\nA\nB\n>>>elif:false\nC\n>>>endIf:");
        let block = if_block(&src, 1, &syntax);
        assert_eq!(block.lines, vec!["A", "B"]);
        assert_eq!(block.end, Some(3));
    }

    #[test]
    fn unterminated_block() {
        let syntax = ScriptSyntax::default();
        let src = lines(">>>stateWhile:true\nA\nB");
        let block = while_block(&src, 1, &syntax);
        assert_eq!(block.lines, vec!["A", "B"]);
        assert!(!block.is_terminated());
    }

    #[test]
    fn if_scan_is_flat() {
        let syntax = ScriptSyntax::default();
        let src = lines(
            ">>>stateIf:true\n>>>stateIf:false\ninner\n>>>endIf:\nafter inner\n>>>endIf:",
        );
        let block = if_block(&src, 1, &syntax);
        // The outer body ends at the inner endIf.
        assert_eq!(block.lines, vec![">>>stateIf:false", "inner"]);
        assert_eq!(block.end, Some(3));
    }

    #[test]
    fn chain_collects_every_branch() {
        let syntax = ScriptSyntax::default();
        let src = lines(
            ">>>stateIf:'s_a'\nA\n>>>elif:'s_b'\nB\n>>>elif: 's_c' \nC\n>>>endIf:\nafter",
        );
        let chain = if_chain(&src, 0, "'s_a'", &syntax);
        assert_eq!(chain.end, Some(6));
        let conditions: Vec<_> = chain.branches.iter().map(|b| b.condition.as_str()).collect();
        assert_eq!(conditions, vec!["'s_a'", "'s_b'", "'s_c'"]);
        assert_eq!(chain.branches[1].body, vec!["B"]);
    }

    #[test]
    fn chain_without_end() {
        let syntax = ScriptSyntax::default();
        let src = lines(">>>stateIf:true\nA\n>>>elif:false\nB");
        let chain = if_chain(&src, 0, "true", &syntax);
        assert_eq!(chain.end, None);
        assert_eq!(chain.branches.len(), 2);
    }

    #[test]
    fn choice_block_between_markers() {
        let syntax = ScriptSyntax::default();
        let body = lines(">>>0:\nyes line\n>>>1:\nno line\nno line 2\n>>>2:\nmaybe");
        assert_eq!(choice_block(&body, 0, &syntax), Some(lines("yes line")));
        assert_eq!(
            choice_block(&body, 1, &syntax),
            Some(lines("no line\nno line 2"))
        );
        assert_eq!(choice_block(&body, 2, &syntax), Some(lines("maybe")));
        assert_eq!(choice_block(&body, 3, &syntax), None);
    }

    #[test]
    fn choice_block_stops_at_end_choice() {
        let syntax = ScriptSyntax::default();
        let body = lines(">>>0:\nonly\n>>>endChoice:\nafter");
        assert_eq!(choice_block(&body, 0, &syntax), Some(lines("only")));
    }
}
