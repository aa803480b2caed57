/// Line classification: commands, comments, and literal text.
use serde::{Deserialize, Serialize};

/// Built-in command codes recognised by the default registry.
pub mod codes {
    pub const PRETEXT: &str = "pretext";
    pub const SET_SWITCH: &str = "setSwitch";
    pub const FLIP_SWITCH: &str = "flipSwitch";
    pub const SET_VAR: &str = "setVar";
    pub const STATE_IF: &str = "stateIf";
    pub const ELIF: &str = "elif";
    pub const END_IF: &str = "endIf";
    pub const STATE_WHILE: &str = "stateWhile";
    pub const END_WHILE: &str = "endWhile";
    pub const STATE_CHOICE: &str = "stateChoice";
    pub const END_CHOICE: &str = "endChoice";
    pub const OPEN_EVENT: &str = "openEvent";
    pub const STATE_COMMAND: &str = "stateCommand";

    /// Codes that only mark the end of a block.
    pub const TERMINATORS: [&str; 4] = [ELIF, END_IF, END_WHILE, END_CHOICE];
}

/// The classification of a single script line. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// A fenced line: `>>>code:args`.
    Command { code: &'a str, args: &'a str },
    /// An empty line or one starting with the comment marker.
    Comment,
    /// Anything else is shown to the player.
    Text(&'a str),
}

/// The lexical markers of the script language.
///
/// Every field has a default, so a RON file only needs to name the markers
/// it changes:
///
/// ```ron
/// (command_fence: "@@@", cancel_marker: '^')
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSyntax {
    /// Three-character prefix of a command line.
    pub command_fence: String,
    /// Two-character prefix of a comment line.
    pub comment_marker: String,
    /// Delimiter around name references inside expressions.
    pub name_quote: char,
    /// Two-character prefix selecting the numeric variable namespace.
    pub variable_prefix: String,
    /// Two-character prefix selecting the boolean switch namespace.
    pub switch_prefix: String,
    /// Trailing marker on the default choice option.
    pub default_marker: char,
    /// Trailing marker on the cancel choice option.
    pub cancel_marker: char,
}

impl Default for ScriptSyntax {
    fn default() -> Self {
        Self {
            command_fence: ">>>".to_string(),
            comment_marker: "//".to_string(),
            name_quote: '\'',
            variable_prefix: "v_".to_string(),
            switch_prefix: "s_".to_string(),
            default_marker: '*',
            cancel_marker: '~',
        }
    }
}

impl ScriptSyntax {
    pub fn is_command(&self, line: &str) -> bool {
        line.trim_start().starts_with(self.command_fence.as_str())
    }

    pub fn is_comment(&self, line: &str) -> bool {
        let line = line.trim();
        line.is_empty() || line.starts_with(self.comment_marker.as_str())
    }

    /// The code token between the fence and the first `:`.
    ///
    /// A command line without `:` is all code. Returns `None` for lines that
    /// are not commands.
    pub fn command_code<'a>(&self, line: &'a str) -> Option<&'a str> {
        let body = line.trim_start().strip_prefix(self.command_fence.as_str())?;
        let code = match body.find(':') {
            Some(colon) => &body[..colon],
            None => body,
        };
        Some(code.trim())
    }

    /// The trimmed text after the first `:` following the fence, or `None`
    /// if the line is not a command or has no `:`.
    pub fn command_args<'a>(&self, line: &'a str) -> Option<&'a str> {
        let body = line.trim_start().strip_prefix(self.command_fence.as_str())?;
        body.find(':').map(|colon| body[colon + 1..].trim())
    }

    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        if let Some(code) = self.command_code(line) {
            let args = self.command_args(line).unwrap_or("");
            return LineKind::Command { code, args };
        }
        if self.is_comment(line) {
            return LineKind::Comment;
        }
        LineKind::Text(line.trim_start())
    }

    /// True if `line` is a command whose code equals one of `wanted`.
    pub fn is_command_with(&self, line: &str, wanted: &[&str]) -> bool {
        self.command_code(line)
            .map(|code| wanted.contains(&code))
            .unwrap_or(false)
    }

    /// Parse a numeric option-marker code (`>>>0:`), if this is one.
    pub fn option_marker(&self, line: &str) -> Option<usize> {
        self.command_code(line)?.parse().ok()
    }

    fn is_marker(&self, c: char) -> bool {
        c == self.default_marker || c == self.cancel_marker
    }

    /// Normalize a name token: trim, drop quotes, drop trailing choice markers.
    ///
    /// Applying it twice gives the same result as applying it once.
    pub fn format_name(&self, token: &str) -> String {
        let unquoted: String = token
            .trim()
            .chars()
            .filter(|&c| c != self.name_quote && c != '"')
            .collect();
        unquoted
            .trim_end_matches(|c: char| self.is_marker(c) || c.is_whitespace())
            .trim()
            .to_string()
    }

    /// Split a choice option token into its label and trailing marker flags.
    pub fn split_option(&self, token: &str) -> (String, bool, bool) {
        let unquoted: String = token
            .chars()
            .filter(|&c| c != self.name_quote && c != '"')
            .collect();
        let mut rest = unquoted.trim();
        let mut is_default = false;
        let mut is_cancel = false;
        loop {
            if let Some(stripped) = rest.strip_suffix(self.default_marker) {
                is_default = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_suffix(self.cancel_marker) {
                is_cancel = true;
                rest = stripped;
            } else {
                break;
            }
        }
        (self.format_name(rest), is_default, is_cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_code_and_args() {
        let syntax = ScriptSyntax::default();
        let line = ">>>setVar: v_gold = 10 ";
        assert!(syntax.is_command(line));
        assert_eq!(syntax.command_code(line), Some("setVar"));
        assert_eq!(syntax.command_args(line), Some("v_gold = 10"));
    }

    #[test]
    fn args_keep_later_colons() {
        let syntax = ScriptSyntax::default();
        assert_eq!(
            syntax.command_args(">>>stateCommand:play_se: door"),
            Some("play_se: door")
        );
    }

    #[test]
    fn command_without_colon_has_no_args() {
        let syntax = ScriptSyntax::default();
        assert_eq!(syntax.command_code(">>>endIf"), Some("endIf"));
        assert_eq!(syntax.command_args(">>>endIf"), None);
        assert_eq!(
            syntax.classify(">>>endIf"),
            LineKind::Command {
                code: "endIf",
                args: ""
            }
        );
    }

    #[test]
    fn comments() {
        let syntax = ScriptSyntax::default();
        assert!(syntax.is_comment(""));
        assert!(syntax.is_comment("// x"));
        assert!(syntax.is_comment("   "));
        assert!(!syntax.is_comment("x"));
    }

    #[test]
    fn classify_text_strips_indentation() {
        let syntax = ScriptSyntax::default();
        assert_eq!(syntax.classify("    Hello."), LineKind::Text("Hello."));
        assert_eq!(syntax.classify("// note"), LineKind::Comment);
    }

    #[test]
    fn indented_commands_are_commands() {
        let syntax = ScriptSyntax::default();
        assert_eq!(syntax.command_code("   >>>endWhile:"), Some("endWhile"));
    }

    #[test]
    fn custom_fence() {
        let syntax = ScriptSyntax {
            command_fence: "@@@".to_string(),
            ..ScriptSyntax::default()
        };
        assert!(syntax.is_command("@@@pretext:x"));
        assert!(!syntax.is_command(">>>pretext:x"));
    }

    #[test]
    fn fence_with_colon_keeps_args_intact() {
        let syntax = ScriptSyntax {
            command_fence: "::>".to_string(),
            ..ScriptSyntax::default()
        };
        let line = "::>setVar:v_gold = 3";
        assert_eq!(syntax.command_code(line), Some("setVar"));
        assert_eq!(syntax.command_args(line), Some("v_gold = 3"));
        assert_eq!(
            syntax.classify(line),
            LineKind::Command {
                code: "setVar",
                args: "v_gold = 3"
            }
        );
        assert_eq!(syntax.command_args("plain: text"), None);
    }

    #[test]
    fn format_name_is_idempotent() {
        let syntax = ScriptSyntax::default();
        for raw in ["  'v_gold' ", "\"Yes\"*", "No~ ", "'s_door'*~", "plain", " a * "] {
            let once = syntax.format_name(raw);
            assert_eq!(syntax.format_name(&once), once, "input {:?}", raw);
        }
        assert_eq!(syntax.format_name("  'v_gold' "), "v_gold");
        assert_eq!(syntax.format_name("\"Yes\"*"), "Yes");
    }

    #[test]
    fn split_option_markers() {
        let syntax = ScriptSyntax::default();
        assert_eq!(syntax.split_option("Yes*"), ("Yes".to_string(), true, false));
        assert_eq!(syntax.split_option("No~"), ("No".to_string(), false, true));
        assert_eq!(syntax.split_option("'Maybe'"), ("Maybe".to_string(), false, false));
    }

    #[test]
    fn option_marker_codes() {
        let syntax = ScriptSyntax::default();
        assert_eq!(syntax.option_marker(">>>2:"), Some(2));
        assert_eq!(syntax.option_marker(">>>endChoice:"), None);
        assert_eq!(syntax.option_marker("2"), None);
    }
}
