/// Built-in command handlers.
use crate::core::block::{choice_body, if_chain, while_block};
use crate::core::choice::ChoicePrompt;
use crate::core::error::{EvalError, ScriptError};
use crate::core::host::{Host, HostInstruction};
use crate::core::session::{FrameKind, Session};
use crate::schema::source::{Source, SourceId};

/// `pretext:<codes>`: prefix the next displayed text line.
pub fn pretext(args: &str, session: &mut Session, _host: &mut Host<'_>) -> Result<(), ScriptError> {
    session.set_pretext(args);
    Ok(())
}

/// Split `name = value` and normalize the name.
fn assignment(args: &str, session: &Session, command: &str) -> Result<(String, String), ScriptError> {
    let (name, value) = args.split_once('=').ok_or_else(|| {
        ScriptError::InvalidInput(format!("{} expects '<name> = <value>', got '{}'", command, args))
    })?;
    Ok((session.syntax().format_name(name), value.trim().to_string()))
}

/// `setVar:<name> = <expression>`
pub fn set_var(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let (name, expression) = assignment(args, session, "setVar")?;
    let idx = host
        .variables
        .lookup(&name)
        .ok_or_else(|| EvalError::DataNotFound(name.clone()))?;
    let value = session.evaluate_number(&expression, host)?;
    host.variables.set(idx, value);
    Ok(())
}

/// `setSwitch:<name> = true|false`
pub fn set_switch(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let (name, literal) = assignment(args, session, "setSwitch")?;
    let value = match literal.to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            return Err(ScriptError::InvalidInput(format!(
                "setSwitch expects true or false, got '{}'",
                literal
            )))
        }
    };
    let idx = host
        .switches
        .lookup(&name)
        .ok_or(EvalError::DataNotFound(name))?;
    host.switches.set(idx, value);
    Ok(())
}

/// `flipSwitch:<name>`
pub fn flip_switch(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let name = session.syntax().format_name(args);
    let missing = || EvalError::DataNotFound(name.clone());
    let idx = host.switches.lookup(&name).ok_or_else(missing)?;
    let current = host.switches.get(idx).ok_or_else(missing)?;
    host.switches.set(idx, !current);
    Ok(())
}

/// Move the cursor past a construct's terminator, or to the end of the
/// source with a diagnostic when there is none.
fn close_construct(session: &mut Session, host: &mut Host<'_>, end: Option<usize>, opener: &str, terminator: &str) {
    match end {
        Some(end) => session.jump_to(end + 1),
        None => {
            let len = session.current_lines().len();
            session.jump_to(len);
            session.diagnostic(host, &format!("Unterminated {}: missing {}", opener, terminator));
        }
    }
}

/// `stateIf:<condition>` with optional `elif:<condition>` branches and `endIf:`.
///
/// The first branch whose condition holds runs; later conditions are never
/// evaluated once a branch has been chosen.
pub fn state_if(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let chain = if_chain(session.current_lines(), session.current_index(), args, session.syntax());
    close_construct(session, host, chain.end, "stateIf", "endIf");

    for branch in chain.branches {
        if session.evaluate_condition(&branch.condition, host)? {
            session.push_block(branch.body, FrameKind::Block, host);
            break;
        }
    }
    Ok(())
}

/// `stateWhile:<condition>` ... `endWhile:`
///
/// The body is captured once at entry; each pass re-evaluates the original
/// condition and re-runs the same captured lines.
pub fn state_while(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let block = while_block(session.current_lines(), session.current_index() + 1, session.syntax());
    close_construct(session, host, block.end, "stateWhile", "endWhile");

    if session.evaluate_condition(args, host)? {
        session.push_block(
            block.lines,
            FrameKind::Loop {
                condition: args.to_string(),
            },
            host,
        );
    }
    Ok(())
}

/// `stateChoice:<opt> <opt>* <opt>~` with `>>>N:` option markers and `endChoice:`.
pub fn state_choice(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let body = choice_body(session.current_lines(), session.current_index() + 1, session.syntax());
    close_construct(session, host, body.end, "stateChoice", "endChoice");

    let prompt = ChoicePrompt::parse(args, body.lines, session.syntax());
    if prompt.is_empty() {
        return Err(ScriptError::InvalidInput("stateChoice has no options".to_string()));
    }
    session.present_choice(prompt, host)
}

/// `openEvent:<name>`: run another script before continuing this one.
pub fn open_event(args: &str, session: &mut Session, host: &mut Host<'_>) -> Result<(), ScriptError> {
    let name = session.syntax().format_name(args);
    if name.is_empty() {
        return Err(ScriptError::InvalidInput("openEvent needs a script name".to_string()));
    }
    let text = host.loader.load(&name)?;
    session.push_source(Source::parse(SourceId::Path(name), &text), host);
    Ok(())
}

/// `stateCommand:<payload>`: hand a raw instruction to the host and pause.
pub fn state_command(args: &str, session: &mut Session, _host: &mut Host<'_>) -> Result<(), ScriptError> {
    if args.is_empty() {
        return Err(ScriptError::InvalidInput("stateCommand needs a payload".to_string()));
    }
    session.stage_host_command(HostInstruction::Raw(args.to_string()))
}
