//! Script lifecycle and execution driver. The engine owns every loaded
//! script and the trigger registry; all execution is serialized on the
//! pipeline consumer task so scripts never race each other or the
//! variable stores.

use super::include::compile_file;
use super::triggers::{Firing, TriggerKind, TriggerManager};
use super::vm::{EngineOp, ScriptHost, Vm, VmState};
use super::{ScriptError, ScriptResult};
use super::value::VarParam;
use crate::database::entities::{script_call_stack, script_triggers, script_variables, scripts};
use crate::game::state::GameState;
use crate::game::store::GameStore;
use crate::services::events::{EventPublisher, ScriptStatusInfo};
use crate::utils::types::ScriptId;
use bytes::Bytes;
use chrono::Utc;
use log::{debug, warn};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Language version this runtime implements
pub const LANGUAGE_VERSION: i32 = 6;

/// Ordinal of the synthetic call-stack row recording the suspension
/// point itself
const CHECKPOINT_ORDINAL: i32 = 0;

#[derive(Debug, Clone)]
pub struct ScriptInfo {
    pub id: ScriptId,
    pub name: String,
    pub path: PathBuf,
    pub version: i32,
    pub system: bool,
}

struct RunningScript {
    info: ScriptInfo,
    vm: Vm,
}

/// Unit of work for the execution queue. Scripts queue loads, stops
/// and trigger fires instead of recursing into the registry.
enum Work {
    Run(ScriptId),
    Fire(Firing),
    Op(ScriptId, EngineOp),
}

pub struct ScriptEngine {
    store: GameStore,
    events: EventPublisher,
    game_state: Arc<GameState>,
    triggers: TriggerManager,
    scripts: Vec<RunningScript>,
    script_dir: PathBuf,
    writer: mpsc::UnboundedSender<Bytes>,
    current_line: String,
    current_ansi_line: String,
}

impl ScriptEngine {
    pub fn new(
        store: GameStore,
        events: EventPublisher,
        game_state: Arc<GameState>,
        writer: mpsc::UnboundedSender<Bytes>,
        script_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            events,
            game_state,
            triggers: TriggerManager::new(),
            scripts: Vec::new(),
            script_dir,
            writer,
            current_line: String::new(),
            current_ansi_line: String::new(),
        }
    }

    pub fn triggers(&self) -> &TriggerManager {
        &self.triggers
    }

    /// Summary published to the UI whenever the script set changes
    pub fn status(&self) -> ScriptStatusInfo {
        let active_count = self
            .scripts
            .iter()
            .filter(|script| {
                matches!(
                    script.vm.state,
                    VmState::Running | VmState::Waiting | VmState::WaitingInput
                )
            })
            .count();
        ScriptStatusInfo {
            active_count,
            total_count: self.scripts.len(),
            names: self
                .scripts
                .iter()
                .map(|script| script.info.name.clone())
                .collect(),
        }
    }

    /// Loads and starts a script. Compile errors return synchronously;
    /// the script runs until its first suspension before this returns.
    pub async fn load_script(&mut self, path: &str, system: bool) -> ScriptResult<ScriptId> {
        let id = self.load_inner(path, system).await?;
        let mut queue = VecDeque::new();
        queue.push_back(Work::Run(id));
        self.run_work(queue).await;
        Ok(id)
    }

    async fn load_inner(&mut self, path: &str, system: bool) -> ScriptResult<ScriptId> {
        let resolved = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.script_dir.join(path)
        };

        let compiled = compile_file(&resolved)?;
        let name = resolved
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        if self
            .scripts
            .iter()
            .any(|script| script.info.path == resolved)
        {
            return Err(ScriptError::runtime(format!(
                "script '{name}' is already running"
            )));
        }

        let id = Uuid::new_v4();
        let mut vm = Vm::new(compiled.program);

        // A previous instance stopped while suspended leaves its
        // checkpoint behind; pick it up and continue from there
        let restored = self.restore_checkpoint(&resolved, &mut vm, id).await;

        let includes = compiled
            .includes
            .iter()
            .map(|include| include.display().to_string())
            .collect::<Vec<_>>();
        let row = scripts::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.clone()),
            path: Set(resolved.display().to_string()),
            version: Set(LANGUAGE_VERSION),
            running: Set(true),
            system: Set(system),
            loaded_at: Set(Utc::now().naive_utc()),
            stopped_at: Set(None),
            includes: Set(serde_json::to_string(&includes).unwrap_or_default()),
            description: Set(String::new()),
        };
        scripts::Entity::insert(row).exec(self.store.db()).await?;

        debug!("Loaded script '{name}' ({id}), restored checkpoint: {restored}");

        self.scripts.push(RunningScript {
            info: ScriptInfo {
                id,
                name,
                path: resolved,
                version: LANGUAGE_VERSION,
                system,
            },
            vm,
        });
        self.events.script_status(&self.status());
        Ok(id)
    }

    /// Restores a persisted suspension checkpoint for the same source
    /// path, if one exists. Returns whether anything was restored.
    async fn restore_checkpoint(&self, path: &Path, vm: &mut Vm, new_id: ScriptId) -> bool {
        let path_text = path.display().to_string();
        let Ok(previous) = scripts::Entity::find()
            .filter(scripts::Column::Path.eq(path_text))
            .filter(scripts::Column::Running.eq(false))
            .one(self.store.db())
            .await
        else {
            return false;
        };
        let Some(previous) = previous else {
            return false;
        };

        let Ok(frames) = script_call_stack::Model::by_script(self.store.db(), &previous.id).await
        else {
            return false;
        };
        if frames.is_empty() {
            let _ = scripts::Model::remove(self.store.db(), &previous.id).await;
            return false;
        }

        for frame in &frames {
            if frame.ordinal == CHECKPOINT_ORDINAL {
                vm.pc = frame.saved_pc as usize;
            } else {
                vm.call_stack.push(super::vm::Frame {
                    label: frame.label.clone(),
                    saved_pc: frame.saved_pc as usize,
                    return_pc: frame.return_pc as usize,
                });
            }
        }
        // Parked until an external resume or trigger
        vm.state = VmState::Paused;

        // Re-arm the triggers that were live at suspension
        if let Ok(rows) = script_triggers::Model::by_script(self.store.db(), &previous.id).await {
            for row in rows {
                let kind = match row.kind {
                    0 => TriggerKind::TextLine,
                    1 => TriggerKind::Text,
                    2 => TriggerKind::TextOut,
                    3 => TriggerKind::Event,
                    4 => TriggerKind::Delay,
                    5 => TriggerKind::Auto,
                    _ => TriggerKind::AutoText,
                };
                self.triggers.add(
                    Some(row.trigger_id),
                    kind,
                    row.pattern,
                    row.label,
                    row.response,
                    Some(row.lifecycle),
                    new_id,
                    None,
                );
            }
        }

        self.restore_variables(vm, &previous.id).await;

        let _ = scripts::Model::remove(self.store.db(), &previous.id).await;
        true
    }

    /// Writes the VM's variable trees as per-script rows: one row per
    /// node, children pointing at their parent with their index path
    /// serialized alongside
    async fn persist_variables(&self, script_id: &str, vm: &Vm) -> super::ScriptResult<()> {
        for root in vm.vars.roots() {
            let root_row = script_variables::ActiveModel {
                script_id: Set(script_id.to_string()),
                name: Set(root.name.clone()),
                value: Set(root.value.clone()),
                parent_id: Set(None),
                index_path: Set("[]".to_string()),
                ..Default::default()
            };
            let root_id = script_variables::Entity::insert(root_row)
                .exec(self.store.db())
                .await?
                .last_insert_id;

            let mut stack: Vec<(i32, Vec<String>, &VarParam)> = root
                .children
                .iter()
                .map(|(index, child)| (root_id, vec![index.clone()], child))
                .collect();
            while let Some((parent_id, path, node)) = stack.pop() {
                let row = script_variables::ActiveModel {
                    script_id: Set(script_id.to_string()),
                    name: Set(root.name.clone()),
                    value: Set(node.value.clone()),
                    parent_id: Set(Some(parent_id)),
                    index_path: Set(serde_json::to_string(&path).unwrap_or_default()),
                    ..Default::default()
                };
                let row_id = script_variables::Entity::insert(row)
                    .exec(self.store.db())
                    .await?
                    .last_insert_id;
                for (index, child) in &node.children {
                    let mut child_path = path.clone();
                    child_path.push(index.clone());
                    stack.push((row_id, child_path, child));
                }
            }
        }
        Ok(())
    }

    /// Rebuilds variable trees persisted by [`Self::persist_variables`]
    async fn restore_variables(&self, vm: &mut Vm, old_script_id: &str) {
        let Ok(rows) = script_variables::Model::by_script(self.store.db(), old_script_id).await
        else {
            return;
        };

        let mut roots: Vec<VarParam> = Vec::new();
        for row in &rows {
            if row.parent_id.is_none() {
                let mut root = VarParam::new(&row.name);
                root.value = row.value.clone();
                roots.push(root);
            }
        }
        for row in &rows {
            if row.parent_id.is_none() {
                continue;
            }
            let Ok(path) = serde_json::from_str::<Vec<String>>(&row.index_path) else {
                continue;
            };
            let Some(root) = roots.iter_mut().find(|root| root.name == row.name) else {
                continue;
            };
            if let Ok(node) = root.descend_mut(&path) {
                node.value = row.value.clone();
            }
        }
        for root in roots {
            vm.vars.install_root(root);
        }
    }

    /// Stops a script by name, or every non-system script when None
    pub async fn stop_script(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                if let Some(index) = self
                    .scripts
                    .iter()
                    .position(|script| script.info.name == name)
                {
                    self.unload(index).await;
                }
            }
            None => self.stop_all(false).await,
        }
    }

    pub async fn stop_by_id(&mut self, id: ScriptId) {
        if let Some(index) = self.scripts.iter().position(|script| script.info.id == id) {
            self.unload(index).await;
        }
    }

    /// Stops every script; system scripts survive unless included
    pub async fn stop_all(&mut self, include_system: bool) {
        let mut index = 0;
        while index < self.scripts.len() {
            if include_system || !self.scripts[index].info.system {
                self.unload(index).await;
            } else {
                index += 1;
            }
        }
    }

    /// Removes a script from the registry. A script stopped while
    /// suspended leaves a checkpoint row behind; anything else removes
    /// its record entirely.
    async fn unload(&mut self, index: usize) {
        let script = self.scripts.remove(index);
        let id_text = script.info.id.to_string();
        let suspended = matches!(
            script.vm.state,
            VmState::Waiting | VmState::WaitingInput | VmState::Paused
        );

        if suspended {
            let mut rows = vec![script_call_stack::ActiveModel {
                script_id: Set(id_text.clone()),
                ordinal: Set(CHECKPOINT_ORDINAL),
                label: Set(String::new()),
                saved_pc: Set(script.vm.pc as i32),
                return_pc: Set(script.vm.pc as i32),
                ..Default::default()
            }];
            for (position, frame) in script.vm.call_stack.iter().enumerate() {
                rows.push(script_call_stack::ActiveModel {
                    script_id: Set(id_text.clone()),
                    ordinal: Set(position as i32 + 1),
                    label: Set(frame.label.clone()),
                    saved_pc: Set(frame.saved_pc as i32),
                    return_pc: Set(frame.return_pc as i32),
                    ..Default::default()
                });
            }
            if let Err(err) = script_call_stack::Entity::insert_many(rows)
                .exec(self.store.db())
                .await
            {
                warn!("Failed persisting call stack: {err}");
            }

            for trigger in self.triggers.snapshot() {
                if trigger.script_id != script.info.id {
                    continue;
                }
                let row = script_triggers::ActiveModel {
                    script_id: Set(id_text.clone()),
                    trigger_id: Set(trigger.id),
                    kind: Set(trigger.kind.discriminant()),
                    pattern: Set(trigger.pattern),
                    label: Set(trigger.label),
                    response: Set(trigger.response),
                    lifecycle: Set(trigger.lifecycle),
                    active: Set(trigger.active),
                    params: Set(String::new()),
                    ..Default::default()
                };
                if let Err(err) = script_triggers::Entity::insert(row).exec(self.store.db()).await
                {
                    warn!("Failed persisting trigger: {err}");
                }
            }

            if let Err(err) = self.persist_variables(&id_text, &script.vm).await {
                warn!("Failed persisting script variables: {err}");
            }

            if let Err(err) = scripts::Model::mark_stopped(self.store.db(), &id_text).await {
                warn!("Failed marking script stopped: {err}");
            }
        } else if let Err(err) = scripts::Model::remove(self.store.db(), &id_text).await {
            warn!("Failed removing script record: {err}");
        }

        self.triggers.remove_by_script(script.info.id);
        debug!("Unloaded script '{}'", script.info.name);
        self.events.script_status(&self.status());
    }

    /// Resumes a PAUSEd script, the checkpoint consumer of the pause
    /// semantics
    pub async fn resume(&mut self, name: Option<&str>) {
        let mut queue = VecDeque::new();
        for script in &mut self.scripts {
            if script.vm.state != VmState::Paused {
                continue;
            }
            if name.is_some_and(|name| script.info.name != name) {
                continue;
            }
            script.vm.state = VmState::Running;
            queue.push_back(Work::Run(script.info.id));
        }
        self.run_work(queue).await;
    }

    /// Feeds a complete incoming line: resumes exact WAITFOR matches
    /// then fires line triggers
    pub async fn process_line(&mut self, line: &str, ansi_line: &str) {
        self.current_line = line.to_string();
        self.current_ansi_line = ansi_line.to_string();

        let mut queue = VecDeque::new();
        for script in &mut self.scripts {
            if script.vm.state == VmState::Waiting
                && script.vm.wait_text.as_deref() == Some(line)
            {
                script.vm.wait_text = None;
                script.vm.state = VmState::Running;
                queue.push_back(Work::Run(script.info.id));
            }
        }
        for firing in self.triggers.match_line(line) {
            queue.push_back(Work::Fire(firing));
        }
        self.run_work(queue).await;
    }

    /// Feeds a raw incoming chunk to chunk-scoped text triggers
    pub async fn process_text(&mut self, text: &str) {
        let firings = self.triggers.match_text(text);
        let mut queue = VecDeque::new();
        for firing in firings {
            queue.push_back(Work::Fire(firing));
        }
        self.run_work(queue).await;
    }

    /// Feeds outbound text (user input or script SEND) to outbound
    /// triggers
    pub async fn process_text_out(&mut self, text: &str) {
        let firings = self.triggers.match_text_out(text);
        let mut queue = VecDeque::new();
        for firing in firings {
            queue.push_back(Work::Fire(firing));
        }
        self.run_work(queue).await;
    }

    /// Fires a named system event
    pub async fn fire_event(&mut self, event: &str) {
        let firings = self.triggers.match_event(event);
        let mut queue = VecDeque::new();
        for firing in firings {
            queue.push_back(Work::Fire(firing));
        }
        self.run_work(queue).await;
    }

    /// Fires delay triggers whose deadline has passed; called from the
    /// pipeline's periodic sweep
    pub async fn sweep_delay_triggers(&mut self) {
        let firings = self.triggers.due_delays();
        let mut queue = VecDeque::new();
        for firing in firings {
            queue.push_back(Work::Fire(firing));
        }
        self.run_work(queue).await;
    }

    /// Offers a line of user input to any script blocked on GETINPUT.
    /// Returns true when the input was consumed.
    pub async fn handle_user_input(&mut self, line: &str) -> bool {
        let mut queue = VecDeque::new();
        let mut consumed = false;
        for script in &mut self.scripts {
            if script.vm.state != VmState::WaitingInput {
                continue;
            }
            let Some((base, indexes)) = script.vm.input_target.take() else {
                continue;
            };
            if script.vm.vars.set(&base, &indexes, line).is_err() {
                continue;
            }
            script.vm.state = VmState::Running;
            queue.push_back(Work::Run(script.info.id));
            consumed = true;
            break;
        }
        self.run_work(queue).await;
        consumed
    }

    /// Drains the work queue: runs VMs, applies queued engine ops and
    /// fires triggers until everything settles
    async fn run_work(&mut self, mut queue: VecDeque<Work>) {
        while let Some(work) = queue.pop_front() {
            match work {
                Work::Run(id) => self.run_script(id, &mut queue).await,
                Work::Fire(firing) => {
                    // Triggers may carry a canned response sent ahead
                    // of the label dispatch
                    if !firing.response.is_empty() {
                        let _ = self
                            .writer
                            .send(Bytes::from(firing.response.clone().into_bytes()));
                    }
                    let Some(script) = self
                        .scripts
                        .iter_mut()
                        .find(|script| script.info.id == firing.script_id)
                    else {
                        // Owner died since matching; drop its trigger
                        self.triggers.remove(&firing.trigger_id);
                        continue;
                    };
                    match script.vm.jump_and_wake(&firing.label) {
                        Ok(()) => queue.push_back(Work::Run(firing.script_id)),
                        Err(err) => {
                            // The offending trigger is disabled, the
                            // rest stay live
                            self.triggers.disable(&firing.trigger_id);
                            let name = script.info.name.clone();
                            self.events.script_error(&name, &err.to_string());
                        }
                    }
                }
                Work::Op(owner, op) => self.apply_op(owner, op, &mut queue).await,
            }
        }

        // Unload anything that finished or failed
        let mut index = 0;
        while index < self.scripts.len() {
            if matches!(
                self.scripts[index].vm.state,
                VmState::Halted | VmState::Error
            ) {
                self.unload(index).await;
            } else {
                index += 1;
            }
        }
    }

    /// Steps one VM until it suspends, halts or errors
    async fn run_script(&mut self, id: ScriptId, queue: &mut VecDeque<Work>) {
        let Some(index) = self.scripts.iter().position(|script| script.info.id == id) else {
            return;
        };

        let active: Vec<String> = self
            .scripts
            .iter()
            .map(|script| script.info.name.clone())
            .collect();

        let mut outbound = Vec::new();
        let mut ops = Vec::new();

        let result = {
            let RunningScript { info, vm } = &mut self.scripts[index];
            let mut host = ScriptHost {
                store: &self.store,
                events: &self.events,
                game_state: &self.game_state,
                triggers: &self.triggers,
                script_id: info.id,
                script_name: &info.name,
                version: info.version,
                current_line: &self.current_line,
                current_ansi_line: &self.current_ansi_line,
                active_scripts: &active,
                outbound: &mut outbound,
                ops: &mut ops,
            };
            vm.run(&mut host).await
        };

        if let Err(err) = result {
            let name = self.scripts[index].info.name.clone();
            warn!("Script '{name}' failed: {err}");
            self.events.script_error(&name, &err.to_string());
        }

        for text in outbound {
            for firing in self.triggers.match_text_out(&text) {
                queue.push_back(Work::Fire(firing));
            }
            if self.writer.send(Bytes::from(text.into_bytes())).is_err() {
                debug!("Transport writer closed, outbound script data dropped");
            }
        }
        for op in ops {
            queue.push_back(Work::Op(id, op));
        }
    }

    async fn apply_op(&mut self, owner: ScriptId, op: EngineOp, queue: &mut VecDeque<Work>) {
        match op {
            EngineOp::LoadScript(path) => match self.load_inner(&path, false).await {
                Ok(id) => queue.push_back(Work::Run(id)),
                Err(err) => {
                    let name = self
                        .scripts
                        .iter()
                        .find(|script| script.info.id == owner)
                        .map(|script| script.info.name.clone())
                        .unwrap_or_default();
                    self.events.script_error(&name, &err.to_string());
                }
            },
            EngineOp::StopScript(None) => self.stop_by_id(owner).await,
            EngineOp::StopScript(Some(name)) => self.stop_script(Some(&name)).await,
            EngineOp::StopAll => self.stop_all(false).await,
            EngineOp::MarkSystem => {
                if let Some(script) = self
                    .scripts
                    .iter_mut()
                    .find(|script| script.info.id == owner)
                {
                    script.info.system = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::ScriptEngine;
    use crate::database::connect_in_memory;
    use crate::game::state::GameState;
    use crate::game::store::GameStore;
    use crate::services::events::{EventPublisher, ProxyListener};
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingListener {
        data: Mutex<String>,
        errors: Mutex<Vec<String>>,
    }

    impl ProxyListener for RecordingListener {
        fn on_data(&self, bytes: &[u8]) {
            self.data.lock().push_str(&String::from_utf8_lossy(bytes));
        }

        fn on_script_error(&self, _name: &str, error: &str) {
            self.errors.lock().push(error.to_string());
        }
    }

    struct Fixture {
        engine: ScriptEngine,
        listener: Arc<RecordingListener>,
        outbound: mpsc::UnboundedReceiver<bytes::Bytes>,
        dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let store = GameStore::new(connect_in_memory().await.unwrap());
        let listener = Arc::new(RecordingListener::default());
        let events = EventPublisher::new(listener.clone(), Duration::ZERO);
        let (tx, rx) = mpsc::unbounded_channel();
        let dir = TempDir::new().unwrap();
        let engine = ScriptEngine::new(
            store,
            events,
            Arc::new(GameState::default()),
            tx,
            dir.path().to_path_buf(),
        );
        Fixture {
            engine,
            listener,
            outbound: rx,
            dir,
        }
    }

    impl Fixture {
        async fn load(&mut self, name: &str, source: &str) {
            fs::write(self.dir.path().join(name), source).unwrap();
            self.engine.load_script(name, false).await.unwrap();
        }

        fn output(&self) -> String {
            self.listener.data.lock().clone()
        }
    }

    #[tokio::test]
    async fn test_if_macro_takes_then_arm() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "cond.twx",
                "setVar $x 1\nIF $x = 1\nECHO one\nELSE\nECHO other\nEND\n",
            )
            .await;
        assert_eq!(fixture.output(), "one");
    }

    #[tokio::test]
    async fn test_if_macro_takes_else_arm() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "cond.twx",
                "setVar $x 2\nIF $x = 1\nECHO one\nELSE\nECHO other\nEND\n",
            )
            .await;
        assert_eq!(fixture.output(), "other");
    }

    #[tokio::test]
    async fn test_while_macro_loops() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "loop.twx",
                "setVar $i 0\nWHILE $i < 3\n$i ++\nECHO $i\nEND\n",
            )
            .await;
        assert_eq!(fixture.output(), "123");
    }

    #[tokio::test]
    async fn test_branch_jumps_only_on_false() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "branch.twx",
                "BRANCH \"0\" ::9\nECHO skipped\n::9\nECHO done\n",
            )
            .await;
        assert_eq!(fixture.output(), "done");
    }

    #[tokio::test]
    async fn test_gosub_returns_past_call_site() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "sub.twx",
                "GOSUB :sub\nECHO after\nHALT\n:sub\nECHO inside\nRETURN\n",
            )
            .await;
        assert_eq!(fixture.output(), "insideafter");
    }

    #[tokio::test]
    async fn test_waitfor_resumes_on_exact_line() {
        let mut fixture = fixture().await;
        fixture
            .load("wait.twx", "WAITFOR \"Ready\"\nECHO go\n")
            .await;
        assert_eq!(fixture.output(), "");

        fixture.engine.process_line("Not yet", "Not yet").await;
        assert_eq!(fixture.output(), "");

        fixture.engine.process_line("Ready", "Ready").await;
        assert_eq!(fixture.output(), "go");
    }

    #[tokio::test]
    async fn test_text_line_trigger_lifecycle() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "trig.twx",
                "SETTEXTLINETRIGGER foo \"hello\" :greet 2\nPAUSE\n:greet\nECHO greet\nPAUSE\n",
            )
            .await;

        fixture.engine.process_line("well hello there", "").await;
        fixture.engine.process_line("hello again", "").await;
        fixture.engine.process_line("hello a third time", "").await;

        // Fired exactly twice, removed before the third line
        assert_eq!(fixture.output(), "greetgreet");
        assert!(fixture.engine.triggers().is_empty());
    }

    #[tokio::test]
    async fn test_send_reaches_transport() {
        let mut fixture = fixture().await;
        fixture.load("send.twx", "SEND \"mombo\" \" \" 2\n").await;
        let sent = fixture.outbound.recv().await.unwrap();
        assert_eq!(&sent[..], b"mombo 2");
    }

    #[tokio::test]
    async fn test_runtime_error_stops_only_that_script() {
        let mut fixture = fixture().await;
        fixture
            .load("steady.twx", "SETTEXTLINETRIGGER t \"x\" :l\nPAUSE\n:l\nPAUSE\n")
            .await;
        fs::write(fixture.dir.path().join("bad.twx"), "setVar $y 5\nDIVIDE $y 0\n").unwrap();
        fixture.engine.load_script("bad.twx", false).await.unwrap();

        assert_eq!(fixture.listener.errors.lock().len(), 1);
        // The failing script is gone, the healthy one survives
        assert_eq!(fixture.engine.status().total_count, 1);
    }

    #[tokio::test]
    async fn test_compile_error_returned_with_line() {
        let mut fixture = fixture().await;
        fs::write(fixture.dir.path().join("broken.twx"), "IF $x\nECHO hi\n").unwrap();
        let err = fixture
            .engine
            .load_script("broken.twx", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_delay_trigger_fires_on_sweep() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "delay.twx",
                "SETDELAYTRIGGER d :tick 0\nPAUSE\n:tick\nECHO tick\nPAUSE\n",
            )
            .await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        fixture.engine.sweep_delay_triggers().await;
        assert_eq!(fixture.output(), "tick");
        // One shot
        fixture.engine.sweep_delay_triggers().await;
        assert_eq!(fixture.output(), "tick");
    }

    #[tokio::test]
    async fn test_getinput_consumes_user_line() {
        let mut fixture = fixture().await;
        fixture
            .load("input.twx", "GETINPUT $name \"Name?\"\nECHO hi $name\n")
            .await;

        assert!(fixture.engine.handle_user_input("Kira").await);
        assert!(fixture.output().ends_with("hiKira"));
    }

    #[tokio::test]
    async fn test_checkpoint_survives_stop_and_reload() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "chk.twx",
                "setVar $mark before\nWAITFOR \"never\"\nECHO resumed $mark\n",
            )
            .await;

        // Stopping while suspended leaves a checkpoint behind
        fixture.engine.stop_script(Some("chk")).await;
        assert_eq!(fixture.engine.status().total_count, 0);

        // Reloading the same path restores position and variables
        fixture.engine.load_script("chk.twx", false).await.unwrap();
        assert_eq!(fixture.output(), "");
        fixture.engine.resume(None).await;
        assert_eq!(fixture.output(), "resumedbefore");
    }

    #[tokio::test]
    async fn test_event_trigger() {
        let mut fixture = fixture().await;
        fixture
            .load(
                "event.twx",
                "SETEVENTTRIGGER e \"CONNECT\" :on\nPAUSE\n:on\nECHO connected\nPAUSE\n",
            )
            .await;

        fixture.engine.fire_event("CONNECT").await;
        assert_eq!(fixture.output(), "connected");
    }
}
