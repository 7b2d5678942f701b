pub mod message_history;
pub mod planets;
pub mod player_stats;
pub mod ports;
pub mod script_call_stack;
pub mod script_triggers;
pub mod script_variables;
pub mod script_vars;
pub mod scripts;
pub mod sector_vars;
pub mod sectors;
pub mod ships;
pub mod traders;

pub type Sector = sectors::Model;
pub type Port = ports::Model;
pub type Ship = ships::Model;
pub type Trader = traders::Model;
pub type Planet = planets::Model;
pub type SectorVar = sector_vars::Model;
pub type ScriptVar = script_vars::Model;
pub type ScriptVariable = script_variables::Model;
pub type Script = scripts::Model;
pub type ScriptTrigger = script_triggers::Model;
pub type ScriptCallFrame = script_call_stack::Model;
pub type Message = message_history::Model;
pub type PlayerStatsRow = player_stats::Model;

pub use message_history::MessageKind;
pub use sectors::{ExploredLevel, FighterType};
