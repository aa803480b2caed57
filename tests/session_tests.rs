/// Session integration tests: fixture scripts driven through the full
/// step/choose/resume protocol with a host instruction stream.
use narrative_script::core::choice::ChoicePrompt;
use narrative_script::core::config::{ErrorPolicy, SessionConfig};
use narrative_script::core::error::ErrorKind;
use narrative_script::core::host::{
    DirLoader, Host, HostInstruction, HostRelay, InstructionStream, PageBuffer, ScriptLoader,
    VecInstructionStream,
};
use narrative_script::core::session::{Session, Status, Step};
use narrative_script::schema::source::{Cursor, Source, SourceId};
use narrative_script::schema::state::StateTables;
use pretty_assertions::assert_eq;
use std::path::Path;

struct Game {
    state: StateTables,
    display: PageBuffer,
    loader: DirLoader,
    stream: VecInstructionStream,
}

impl Game {
    fn new() -> Self {
        Self {
            state: StateTables::load_from_ron(Path::new("tests/fixtures/state.ron")).unwrap(),
            display: PageBuffer::new(),
            loader: DirLoader::new("tests/fixtures/scripts"),
            stream: VecInstructionStream::new(vec![
                HostInstruction::Raw("fade_in".into()),
                HostInstruction::Raw("run_script".into()),
                HostInstruction::Raw("fade_out".into()),
            ]),
        }
    }

    fn host(&mut self) -> Host<'_> {
        Host {
            variables: &mut self.state.variables,
            switches: &mut self.state.switches,
            display: &mut self.display,
            loader: &self.loader,
            stream: &mut self.stream,
        }
    }

    fn script(&self, name: &str) -> Source {
        let text = self.loader.load(name).unwrap();
        Source::parse(SourceId::Path(name.to_string()), &text)
    }

    fn prompt(&self) -> ChoicePrompt {
        self.display.prompt.clone().unwrap()
    }
}

#[test]
fn tavern_cellar_route() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());
    game.stream.advance();

    let tavern = game.script("tavern");
    let step = session.step(tavern, &mut game.host()).unwrap();
    assert_eq!(step, Step::Suspended(HostInstruction::ResolveChoice));
    assert_eq!(
        game.display.lines(),
        vec![
            "The door creaks as you step inside.",
            "The keeper eyes your purse.",
            "\\C[3]\"What'll it be?\"",
        ]
    );
    assert_eq!(game.state.switches.value("s_met_keeper"), Some(true));

    let prompt = game.prompt();
    assert_eq!(prompt.labels, vec!["Ale", "Nothing", "Cellar"]);
    assert_eq!(prompt.default_index, Some(0));
    assert_eq!(prompt.cancel_index, Some(1));

    // The relay placed the choice and a return right after the invoker.
    assert_eq!(
        game.stream.instructions(),
        [
            HostInstruction::Raw("fade_in".into()),
            HostInstruction::Raw("run_script".into()),
            HostInstruction::ResolveChoice,
            HostInstruction::Return { invoker: 1 },
            HostInstruction::Raw("fade_out".into()),
        ]
    );

    session.choose(2).unwrap();
    game.display.take();
    let step = session.resume(&mut game.host()).unwrap();
    assert_eq!(
        step,
        Step::Suspended(HostInstruction::Raw("play_se door_close".into()))
    );
    assert_eq!(
        game.display.lines(),
        vec!["A barrel rolls past.", "A barrel rolls past.", "It is quiet down here."]
    );
    assert_eq!(game.state.variables.value("v_round"), Some(2.0));
    assert_eq!(game.state.switches.value("s_cellar_open"), Some(true));

    game.display.take();
    let step = session.resume(&mut game.host()).unwrap();
    assert_eq!(step, Step::Completed);
    assert_eq!(game.display.lines(), vec!["You step back into the night."]);
    assert_eq!(session.status(), Status::Idle);
}

#[test]
fn tavern_ale_route_spends_gold() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());

    let tavern = game.script("tavern");
    session.step(tavern, &mut game.host()).unwrap();
    session.choose(0).unwrap();
    game.display.take();
    session.resume(&mut game.host()).unwrap();

    assert_eq!(game.display.lines(), vec!["You down a pint."]);
    assert_eq!(game.state.variables.value("v_gold"), Some(13.0));
    assert_eq!(game.state.variables.value("v_ale"), Some(1.0));
}

#[test]
fn tavern_poor_visitor_skips_both_branches() {
    let mut game = Game::new();
    game.state.variables.register("v_gold", 3.0);
    let mut session = Session::new(SessionConfig::default());

    let tavern = game.script("tavern");
    session.step(tavern, &mut game.host()).unwrap();
    assert_eq!(
        game.display.lines(),
        vec!["The door creaks as you step inside.", "\\C[3]\"What'll it be?\""]
    );
    assert_eq!(game.state.switches.value("s_met_keeper"), Some(false));
}

#[test]
fn unanswered_choice_runs_cancel_option() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());

    let tavern = game.script("tavern");
    session.step(tavern, &mut game.host()).unwrap();
    game.display.take();
    session.resume(&mut game.host()).unwrap();
    assert_eq!(game.display.lines(), vec!["You shake your head."]);
}

#[test]
fn resume_token_points_past_staging_line() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());
    let door = Source::parse(
        SourceId::Path("door".into()),
        "Knock.\n>>>stateCommand:open_door\nCreak.\nDone.",
    );

    session.step(door.clone(), &mut game.host()).unwrap();
    assert_eq!(game.display.lines(), vec!["Knock."]);
    assert_eq!(
        session.resume_token(&SourceId::Path("door".into())),
        Some(Cursor {
            source: SourceId::Path("door".into()),
            index: 2,
        })
    );

    // Nothing further runs until resume; a second step is refused.
    assert_eq!(
        session
            .step(door, &mut game.host())
            .unwrap_err()
            .kind(),
        ErrorKind::Protocol
    );
    assert_eq!(game.display.lines(), vec!["Knock."]);

    session.resume(&mut game.host()).unwrap();
    assert_eq!(game.display.lines(), vec!["Knock.", "Creak.", "Done."]);
    assert_eq!(session.resume_token(&SourceId::Path("door".into())), None);
}

#[test]
fn host_loop_drives_relay_instructions() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());
    let tavern = game.script("tavern");

    // Host sits on its "run_script" instruction.
    game.stream.advance();
    let mut step = session.step(tavern, &mut game.host()).unwrap();
    let mut executed = Vec::new();

    while let Step::Suspended(_) = step {
        // The host walks its stream until the relay's return.
        loop {
            match game.stream.advance().cloned() {
                Some(HostInstruction::ResolveChoice) => {
                    executed.push("choice".to_string());
                    session.choose(1).unwrap();
                }
                Some(HostInstruction::Raw(payload)) => executed.push(payload),
                Some(HostInstruction::Return { invoker }) => {
                    HostRelay::return_to_invoker(&mut game.stream, invoker);
                    break;
                }
                None => panic!("stream ran out before the return"),
            }
        }
        step = session.resume(&mut game.host()).unwrap();
    }

    assert_eq!(executed, vec!["choice", "play_se door_close"]);
    // Relay entries are gone; the host carries on with its own program.
    assert_eq!(game.stream.current_pointer(), 1);
    assert_eq!(
        game.stream.advance(),
        Some(&HostInstruction::Raw("fade_out".into()))
    );
}

#[test]
fn broken_script_reports_and_continues() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());
    let broken = game.script("broken");
    let step = session.step(broken, &mut game.host()).unwrap();
    assert_eq!(step, Step::Completed);

    let lines = game.display.lines();
    assert_eq!(lines[0], "Unknown command: dance");
    assert_eq!(lines[1], "Unexpected endIf: no open block");
    assert!(lines[2].starts_with("Error in setVar:"), "{}", lines[2]);
    assert_eq!(lines[3], "Unterminated stateIf: missing endIf");
    assert_eq!(lines[4], "Never closed.");
    assert_eq!(lines.len(), 5);
    assert_eq!(game.state.variables.value("v_gold"), Some(15.0));
}

#[test]
fn broken_script_halts_under_halt_policy() {
    let mut game = Game::new();
    let config = SessionConfig {
        error_policy: ErrorPolicy::Halt,
        ..SessionConfig::default()
    };
    let mut session = Session::new(config);
    let broken = game.script("broken");
    let err = session.step(broken, &mut game.host()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeError);
    assert_eq!(session.status(), Status::Idle);
    assert_eq!(session.depth(), 0);
}

#[test]
fn fixture_config_pages_every_two_lines() {
    let mut game = Game::new();
    let config = SessionConfig::load_from_ron(Path::new("tests/fixtures/session.ron")).unwrap();
    let mut session = Session::new(config);
    session.step(game.script("cellar"), &mut game.host()).unwrap();
    assert_eq!(
        game.display.pages,
        vec![
            vec!["A barrel rolls past.".to_string(), "A barrel rolls past.".to_string()],
            vec!["It is quiet down here.".to_string()],
        ]
    );
}

#[test]
fn missing_event_is_reported() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());
    let source = Source::parse(
        SourceId::Path("lost".into()),
        ">>>openEvent:'attic'\nStill here.",
    );
    session.step(source, &mut game.host()).unwrap();
    let lines = game.display.lines();
    assert!(lines[0].contains("attic"), "{}", lines[0]);
    assert_eq!(lines[1], "Still here.");
}

#[test]
fn state_survives_round_trip_after_play() {
    let mut game = Game::new();
    let mut session = Session::new(SessionConfig::default());
    session.step(game.script("cellar"), &mut game.host()).unwrap();
    let saved = game.state.to_ron().unwrap();
    let reloaded = StateTables::parse_ron(&saved).unwrap();
    assert_eq!(reloaded.variables.value("v_round"), Some(2.0));
    assert_eq!(reloaded.switches.value("s_cellar_open"), Some(false));
}
