#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ghost_prompt::{Key, Terminal};

/// One scripted input step: a key, or a pause that lets background work land.
#[derive(Debug, Clone)]
pub enum Step {
    Key(Key),
    Wait(Duration),
}

pub fn keys(text: &str) -> Vec<Step> {
    text.chars().map(|ch| Step::Key(Key::Char(ch))).collect()
}

/// Terminal that replays a key script on its own thread and records output.
pub struct ScriptedTerminal {
    script: Vec<Step>,
    columns: u16,
    output: Arc<Mutex<String>>,
    feeder: Option<JoinHandle<()>>,
    started: bool,
    stopped: bool,
}

impl ScriptedTerminal {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            columns: 60,
            output: Arc::new(Mutex::new(String::new())),
            feeder: None,
            started: false,
            stopped: false,
        }
    }

    pub fn with_columns(mut self, columns: u16) -> Self {
        self.columns = columns;
        self
    }

    pub fn output(&self) -> String {
        self.output.lock().expect("output lock").clone()
    }

    pub fn was_stopped(&self) -> bool {
        self.started && self.stopped
    }
}

impl Terminal for ScriptedTerminal {
    fn start(
        &mut self,
        mut on_input: Box<dyn FnMut(Key) + Send>,
        _on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()> {
        self.started = true;
        let script = std::mem::take(&mut self.script);
        self.feeder = Some(thread::spawn(move || {
            for step in script {
                match step {
                    Step::Key(key) => on_input(key),
                    Step::Wait(delay) => thread::sleep(delay),
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        self.stopped = true;
        if let Some(feeder) = self.feeder.take() {
            let _ = feeder.join();
        }
        Ok(())
    }

    fn write(&mut self, data: &str) -> io::Result<()> {
        self.output.lock().expect("output lock").push_str(data);
        Ok(())
    }

    fn columns(&self) -> u16 {
        self.columns
    }
}

/// Removes escape sequences so assertions can look at visible text.
pub fn visible_text(output: &str) -> String {
    ghost_prompt::core::text::ansi::strip_ansi(output)
}
