//! Trigger registry. Triggers bind incoming text, outbound text, named
//! events and wall-clock delays to script labels. Matching is substring
//! based and case sensitive; dispatch snapshots the registry so firing
//! scripts can add or kill triggers freely.

use crate::utils::types::ScriptId;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle value for triggers that never expire
pub const LIFECYCLE_PERMANENT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Fires at most once per incoming line containing the pattern
    TextLine,
    /// Fires on any chunk of incoming text containing the pattern
    Text,
    /// Fires on outbound text
    TextOut,
    /// Fires on a named system event
    Event,
    /// Fires once its wall-clock deadline passes
    Delay,
    /// Permanent variant of TextLine
    Auto,
    /// Permanent variant of Text
    AutoText,
}

impl TriggerKind {
    /// Default lifecycle for the kind: text triggers are one-shot
    /// unless re-armed, auto variants persist
    pub fn default_lifecycle(&self) -> i32 {
        match self {
            TriggerKind::Auto | TriggerKind::AutoText => LIFECYCLE_PERMANENT,
            _ => 1,
        }
    }

    pub fn discriminant(&self) -> i32 {
        match self {
            TriggerKind::TextLine => 0,
            TriggerKind::Text => 1,
            TriggerKind::TextOut => 2,
            TriggerKind::Event => 3,
            TriggerKind::Delay => 4,
            TriggerKind::Auto => 5,
            TriggerKind::AutoText => 6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub id: String,
    pub kind: TriggerKind,
    pub pattern: String,
    pub label: String,
    pub response: String,
    /// Remaining fires, [`LIFECYCLE_PERMANENT`] for permanent
    pub lifecycle: i32,
    pub active: bool,
    pub script_id: ScriptId,
    /// Wall-clock deadline for delay triggers
    pub deadline: Option<DateTime<Utc>>,
}

impl Trigger {
    /// Substring, case sensitive. The policy is deliberately simple;
    /// scripts wanting more build it from getWord and friends.
    fn matches(&self, text: &str) -> bool {
        text.contains(&self.pattern)
    }
}

/// A matched trigger ready to fire
#[derive(Debug, Clone)]
pub struct Firing {
    pub trigger_id: String,
    pub script_id: ScriptId,
    pub label: String,
    pub response: String,
}

#[derive(Default)]
pub struct TriggerManager {
    triggers: RwLock<Vec<Trigger>>,
    next_id: AtomicU64,
}

impl TriggerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trigger returning its registry id. Scripts may name
    /// their triggers; unnamed ones get the next monotonic
    /// `trigger_<n>` id. Re-using a name replaces the old trigger.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        id: Option<String>,
        kind: TriggerKind,
        pattern: String,
        label: String,
        response: String,
        lifecycle: Option<i32>,
        script_id: ScriptId,
        delay: Option<Duration>,
    ) -> String {
        let id = id.unwrap_or_else(|| {
            format!("trigger_{}", self.next_id.fetch_add(1, Ordering::AcqRel) + 1)
        });
        self.remove(&id);
        let trigger = Trigger {
            id: id.clone(),
            kind,
            pattern,
            label,
            response,
            lifecycle: lifecycle.unwrap_or_else(|| kind.default_lifecycle()),
            active: true,
            script_id,
            deadline: delay.map(|delay| Utc::now() + delay),
        };
        self.triggers.write().push(trigger);
        id
    }

    /// Removes the trigger with the provided id
    pub fn remove(&self, id: &str) -> bool {
        let mut triggers = self.triggers.write();
        let before = triggers.len();
        triggers.retain(|trigger| trigger.id != id);
        triggers.len() != before
    }

    /// Removes every trigger owned by the provided script
    pub fn remove_by_script(&self, script_id: ScriptId) {
        self.triggers
            .write()
            .retain(|trigger| trigger.script_id != script_id);
    }

    pub fn clear(&self) {
        self.triggers.write().clear();
    }

    pub fn set_active(&self, id: &str, active: bool) -> bool {
        let mut triggers = self.triggers.write();
        match triggers.iter_mut().find(|trigger| trigger.id == id) {
            Some(trigger) => {
                trigger.active = active;
                true
            }
            None => false,
        }
    }

    /// Disables a trigger whose execution failed, keeping the rest of
    /// the registry live
    pub fn disable(&self, id: &str) {
        self.set_active(id, false);
    }

    pub fn snapshot(&self) -> Vec<Trigger> {
        self.triggers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.triggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.read().is_empty()
    }

    /// Matches a complete incoming line against line-scoped triggers
    pub fn match_line(&self, line: &str) -> Vec<Firing> {
        self.fire_matching(|trigger| {
            matches!(trigger.kind, TriggerKind::TextLine | TriggerKind::Auto)
                && trigger.matches(line)
        })
    }

    /// Matches a raw incoming chunk against text-scoped triggers
    pub fn match_text(&self, text: &str) -> Vec<Firing> {
        self.fire_matching(|trigger| {
            matches!(trigger.kind, TriggerKind::Text | TriggerKind::AutoText)
                && trigger.matches(text)
        })
    }

    /// Matches outbound text
    pub fn match_text_out(&self, text: &str) -> Vec<Firing> {
        self.fire_matching(|trigger| {
            matches!(trigger.kind, TriggerKind::TextOut) && trigger.matches(text)
        })
    }

    /// Matches a named system event
    pub fn match_event(&self, event: &str) -> Vec<Firing> {
        self.fire_matching(|trigger| {
            matches!(trigger.kind, TriggerKind::Event) && trigger.pattern == event
        })
    }

    /// Collects delay triggers whose deadline has passed. Delay
    /// triggers are one-shot regardless of lifecycle.
    pub fn due_delays(&self) -> Vec<Firing> {
        let now = Utc::now();
        let mut fired = Vec::new();
        let mut triggers = self.triggers.write();
        triggers.retain(|trigger| {
            let due = trigger.active
                && matches!(trigger.kind, TriggerKind::Delay)
                && trigger.deadline.is_some_and(|deadline| deadline <= now);
            if due {
                fired.push(Firing {
                    trigger_id: trigger.id.clone(),
                    script_id: trigger.script_id,
                    label: trigger.label.clone(),
                    response: trigger.response.clone(),
                });
            }
            !due
        });
        fired
    }

    /// Collects matches under the predicate, decrementing lifecycles
    /// and dropping triggers that reach zero
    fn fire_matching<F: Fn(&Trigger) -> bool>(&self, predicate: F) -> Vec<Firing> {
        let mut fired = Vec::new();
        let mut triggers = self.triggers.write();
        triggers.retain_mut(|trigger| {
            if !trigger.active || !predicate(trigger) {
                return true;
            }
            // An exhausted trigger is removed on its next match without
            // firing again
            if trigger.lifecycle == 0 {
                return false;
            }
            fired.push(Firing {
                trigger_id: trigger.id.clone(),
                script_id: trigger.script_id,
                label: trigger.label.clone(),
                response: trigger.response.clone(),
            });
            if trigger.lifecycle > 0 {
                trigger.lifecycle -= 1;
                if trigger.lifecycle == 0 {
                    return false;
                }
            }
            true
        });
        fired
    }
}

#[cfg(test)]
mod test {
    use super::{TriggerKind, TriggerManager};
    use chrono::Duration;
    use uuid::Uuid;

    fn manager() -> (TriggerManager, Uuid) {
        (TriggerManager::new(), Uuid::new_v4())
    }

    #[test]
    fn test_lifecycle_counts_fires() {
        let (manager, script) = manager();
        manager.add(
            None,
            TriggerKind::TextLine,
            "hello".to_string(),
            "greet".to_string(),
            String::new(),
            Some(2),
            script,
            None,
        );

        assert_eq!(manager.match_line("say hello there").len(), 1);
        assert_eq!(manager.match_line("hello again").len(), 1);
        // Exhausted and removed before a third fire
        assert_eq!(manager.match_line("hello?").len(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_matching_is_substring_case_sensitive() {
        let (manager, script) = manager();
        manager.add(
            None,
            TriggerKind::Auto,
            "Docking".to_string(),
            "dock".to_string(),
            String::new(),
            None,
            script,
            None,
        );

        assert_eq!(manager.match_line("Docking...").len(), 1);
        assert_eq!(manager.match_line("docking...").len(), 0);
        // Auto triggers persist
        assert_eq!(manager.match_line("Docking...").len(), 1);
    }

    #[test]
    fn test_inactive_triggers_skipped() {
        let (manager, script) = manager();
        let id = manager.add(
            None,
            TriggerKind::TextLine,
            "x".to_string(),
            "l".to_string(),
            String::new(),
            None,
            script,
            None,
        );
        manager.set_active(&id, false);
        assert_eq!(manager.match_line("x").len(), 0);
    }

    #[test]
    fn test_delay_trigger_is_one_shot() {
        let (manager, script) = manager();
        manager.add(
            None,
            TriggerKind::Delay,
            String::new(),
            "tick".to_string(),
            String::new(),
            None,
            script,
            Some(Duration::milliseconds(-1)),
        );

        assert_eq!(manager.due_delays().len(), 1);
        assert_eq!(manager.due_delays().len(), 0);
    }

    #[test]
    fn test_remove_by_script() {
        let (manager, script) = manager();
        manager.add(
            None,
            TriggerKind::TextLine,
            "a".to_string(),
            "l".to_string(),
            String::new(),
            None,
            script,
            None,
        );
        manager.remove_by_script(script);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_event_matching_is_exact() {
        let (manager, script) = manager();
        manager.add(
            None,
            TriggerKind::Event,
            "CONNECT".to_string(),
            "l".to_string(),
            String::new(),
            None,
            script,
            None,
        );
        assert_eq!(manager.match_event("CONNECTED").len(), 0);
        assert_eq!(manager.match_event("CONNECT").len(), 1);
    }
}
