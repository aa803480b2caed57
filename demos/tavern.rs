/// Tavern example: a short scripted visit to the Crooked Lantern.
///
/// Loads the scripts and state under `demo_data/tavern/`, registers a custom
/// `giveItem` command, and plays the visit twice with different answers.
///
/// Run with: cargo run --example tavern

use narrative_script::core::config::SessionConfig;
use narrative_script::core::host::{
    DirLoader, Host, HostInstruction, HostRelay, PageBuffer, ScriptLoader, VecInstructionStream,
};
use narrative_script::core::session::{Session, Step};
use narrative_script::schema::source::{Source, SourceId};
use narrative_script::schema::state::StateTables;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

fn main() {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    for answers in [vec![0], vec![1]] {
        println!("=== Visit with answers {:?} ===\n", answers);
        let inventory = play(&answers);
        println!("\nInventory: {:?}\n", inventory);
    }
}

fn play(answers: &[usize]) -> Vec<String> {
    let mut state = StateTables::load_from_ron(Path::new("demo_data/tavern/state.ron"))
        .expect("Failed to load tavern state");
    let loader = DirLoader::new("demo_data/tavern");
    let text = loader.load("arrival").expect("Failed to load arrival script");

    // Items handed out by the script land here.
    let inventory = Rc::new(RefCell::new(Vec::new()));
    let mut session = Session::new(SessionConfig::default());
    let bag = Rc::clone(&inventory);
    session
        .registry_mut()
        .register("giveItem", move |args, session, host| {
            bag.borrow_mut().push(args.to_string());
            session.diagnostic(host, &format!("[You receive: {}]", args));
            Ok(())
        });

    let mut display = PageBuffer::new();
    let mut stream = VecInstructionStream::new(vec![HostInstruction::Raw("run_script".into())]);
    let mut answers = answers.iter().copied();

    let source = Source::parse(SourceId::Path("arrival".into()), &text);
    let mut step = session
        .step(
            source,
            &mut Host {
                variables: &mut state.variables,
                switches: &mut state.switches,
                display: &mut display,
                loader: &loader,
                stream: &mut stream,
            },
        )
        .expect("Script failed");

    loop {
        for line in display.take().pages.into_iter().flatten() {
            println!("{}", line);
        }
        if step == Step::Completed {
            break;
        }

        while let Some(instruction) = stream.advance().cloned() {
            match instruction {
                HostInstruction::ResolveChoice => {
                    if let Some(index) = answers.next() {
                        println!("> choose {}", index);
                        session.choose(index).expect("Invalid choice");
                    }
                }
                HostInstruction::Raw(payload) => println!("[host: {}]", payload),
                HostInstruction::Return { invoker } => {
                    HostRelay::return_to_invoker(&mut stream, invoker);
                    break;
                }
            }
        }

        step = session
            .resume(&mut Host {
                variables: &mut state.variables,
                switches: &mut state.switches,
                display: &mut display,
                loader: &loader,
                stream: &mut stream,
            })
            .expect("Script failed");
    }

    println!(
        "\nGold left: {}",
        state.variables.value("v_gold").unwrap_or_default()
    );
    let items = inventory.borrow().clone();
    items
}
