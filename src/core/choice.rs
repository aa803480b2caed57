/// Player choices: option parsing, default/cancel markers, and deferred
/// resolution of the chosen option's block.
use serde::Serialize;

use crate::core::block::choice_block;
use crate::schema::line::ScriptSyntax;

/// Computes an option's block from the body captured when the choice was
/// declared, not from the live source.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceResolver {
    body: Vec<String>,
    syntax: ScriptSyntax,
}

impl ChoiceResolver {
    pub fn new(body: Vec<String>, syntax: ScriptSyntax) -> Self {
        Self { body, syntax }
    }

    /// The lines of option `index`, or `None` if the body has no such marker.
    pub fn resolve(&self, index: usize) -> Option<Vec<String>> {
        choice_block(&self.body, index, &self.syntax)
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }
}

/// What the display surface shows for a choice statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoicePrompt {
    pub labels: Vec<String>,
    pub default_index: Option<usize>,
    pub cancel_index: Option<usize>,
    #[serde(skip)]
    pub resolver: ChoiceResolver,
}

impl ChoicePrompt {
    /// Build a prompt from `stateChoice` arguments and the captured body.
    ///
    /// Options are space-separated; a trailing default or cancel marker
    /// flags that position. When several options carry the same marker the
    /// first one wins.
    pub fn parse(args: &str, body: Vec<String>, syntax: &ScriptSyntax) -> ChoicePrompt {
        let mut labels = Vec::new();
        let mut default_index = None;
        let mut cancel_index = None;

        for (position, token) in args.split_whitespace().enumerate() {
            let (label, is_default, is_cancel) = syntax.split_option(token);
            if is_default && default_index.is_none() {
                default_index = Some(position);
            }
            if is_cancel && cancel_index.is_none() {
                cancel_index = Some(position);
            }
            labels.push(label);
        }

        ChoicePrompt {
            labels,
            default_index,
            cancel_index,
            resolver: ChoiceResolver::new(body, syntax.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn resolve(&self, index: usize) -> Option<Vec<String>> {
        self.resolver.resolve(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> Vec<String> {
        ">>>0:\nYou pay.\n>>>1:\nYou haggle.\n>>>2:\nYou leave."
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn markers_follow_position_not_order() {
        let syntax = ScriptSyntax::default();
        let prompt = ChoicePrompt::parse("Pay Haggle~ Leave*", body(), &syntax);
        assert_eq!(prompt.labels, vec!["Pay", "Haggle", "Leave"]);
        assert_eq!(prompt.default_index, Some(2));
        assert_eq!(prompt.cancel_index, Some(1));

        let prompt = ChoicePrompt::parse("Pay* Haggle Leave~", body(), &syntax);
        assert_eq!(prompt.default_index, Some(0));
        assert_eq!(prompt.cancel_index, Some(2));
    }

    #[test]
    fn quotes_are_stripped() {
        let syntax = ScriptSyntax::default();
        let prompt = ChoicePrompt::parse("'Yes'* \"No\"", body(), &syntax);
        assert_eq!(prompt.labels, vec!["Yes", "No"]);
        assert_eq!(prompt.default_index, Some(0));
        assert_eq!(prompt.cancel_index, None);
    }

    #[test]
    fn first_marker_wins() {
        let syntax = ScriptSyntax::default();
        let prompt = ChoicePrompt::parse("A* B* C", body(), &syntax);
        assert_eq!(prompt.default_index, Some(0));
    }

    #[test]
    fn resolves_option_blocks() {
        let syntax = ScriptSyntax::default();
        let prompt = ChoicePrompt::parse("Pay Haggle Leave", body(), &syntax);
        assert_eq!(prompt.resolve(1), Some(vec!["You haggle.".to_string()]));
        assert_eq!(prompt.resolve(5), None);
    }

    #[test]
    fn prompt_serializes_without_resolver() {
        let syntax = ScriptSyntax::default();
        let prompt = ChoicePrompt::parse("Yes* No~", body(), &syntax);
        let text = ron::to_string(&prompt).unwrap();
        assert!(text.contains("Yes"));
        assert!(!text.contains("haggle"));
    }
}
