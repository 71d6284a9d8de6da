//! Parser for the router's text decision grammar.
//!
//! ```text
//! Thought: <free text>
//! Action: <tool name>
//! Action Input: <input>
//! ```
//!
//! or
//!
//! ```text
//! Thought: <free text>
//! Final Answer: <answer>
//! ```
//!
//! Labels are matched case-insensitively at the start of a line. Anything
//! from an `Observation:` line onwards is discarded, since observations are
//! written by the loop, never by the model.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Act {
        thought: String,
        tool: String,
        input: String,
    },
    Finish {
        thought: String,
        answer: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("the reply was empty")]
    Empty,

    #[error("`Action: {0}` has no \"Action Input:\" line")]
    MissingActionInput(String),

    #[error("no \"Action:\" or \"Final Answer:\" line was found")]
    NoDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
    Observation,
}

const LABELS: [(&str, Label); 5] = [
    ("thought:", Label::Thought),
    ("action input:", Label::ActionInput),
    ("action:", Label::Action),
    ("final answer:", Label::FinalAnswer),
    ("observation:", Label::Observation),
];

/// Split a line into its label and the text after the colon.
fn split_label(line: &str) -> Option<(Label, &str)> {
    let trimmed = line.trim_start();
    LABELS.iter().find_map(|(prefix, label)| {
        let head = trimmed.get(..prefix.len())?;
        head.eq_ignore_ascii_case(prefix)
            .then(|| (*label, trimmed[prefix.len()..].trim()))
    })
}

struct Section {
    label: Label,
    text: String,
}

/// Group lines into labelled sections; unlabelled leading text counts as a
/// thought. Stops at the first observation.
fn sections(output: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for line in output.lines() {
        match split_label(line) {
            Some((Label::Observation, _)) => break,
            Some((label, rest)) => sections.push(Section {
                label,
                text: rest.to_string(),
            }),
            None => match sections.last_mut() {
                Some(section) => {
                    section.text.push('\n');
                    section.text.push_str(line);
                }
                None if line.trim().is_empty() => {}
                None => sections.push(Section {
                    label: Label::Thought,
                    text: line.to_string(),
                }),
            },
        }
    }
    sections
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

/// Parse one model reply into a [`Decision`].
pub fn parse(output: &str) -> Result<Decision, ParseError> {
    if output.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let sections = sections(output);
    let position = |label: Label| sections.iter().position(|s| s.label == label);

    let thought = position(Label::Thought)
        .map(|i| sections[i].text.trim().to_string())
        .unwrap_or_default();
    let action = position(Label::Action);
    let final_answer = position(Label::FinalAnswer).filter(|&i| !sections[i].text.trim().is_empty());

    if let Some(f) = final_answer {
        // An answer written after an action means the model ran on past its turn.
        if action.is_none_or(|a| f > a) {
            return Ok(Decision::Finish {
                thought,
                answer: sections[f].text.trim().to_string(),
            });
        }
    }

    let Some(a) = action else {
        return Err(ParseError::NoDecision);
    };
    let tool = strip_quotes(&sections[a].text).to_string();
    if tool.is_empty() {
        return Err(ParseError::NoDecision);
    }

    let input = sections[a + 1..]
        .iter()
        .find(|s| s.label == Label::ActionInput)
        .map(|s| strip_quotes(&s.text).to_string())
        .ok_or_else(|| ParseError::MissingActionInput(tool.clone()))?;

    Ok(Decision::Act {
        thought,
        tool,
        input,
    })
}
