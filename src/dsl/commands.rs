//! The bug command vocabulary and the static opcode table.

use serde::Serialize;

/// Opcode that opens a counted loop. Its operand is the trip count.
pub const LOOP_START: i32 = 10;
/// Opcode that closes a counted loop. Its operand is the (negative) instruction
/// offset back to the matching `LOOP_START`.
pub const LOOP_END: i32 = 11;

/// Keyword that introduces a counted loop. Not a command on its own.
pub const REPEAT_KEYWORD: &str = "repeat";

/// Every instruction is `[opcode, operand]`.
pub const INSTRUCTION_WIDTH: usize = 2;

/// A command the bug can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BugCommand {
    Move,
    Jump,
    TurnLeft,
    TurnRight,
}

impl BugCommand {
    /// Every command, in opcode order. A new command needs a variant here plus
    /// an arm in `opcode` and `keyword`.
    pub const ALL: [BugCommand; 4] = [
        BugCommand::Move,
        BugCommand::Jump,
        BugCommand::TurnLeft,
        BugCommand::TurnRight,
    ];

    /// Look up a command by its lowercased keyword.
    pub fn from_keyword(word: &str) -> Option<BugCommand> {
        Self::ALL.into_iter().find(|c| c.keyword() == word)
    }

    pub fn from_opcode(opcode: i32) -> Option<BugCommand> {
        Self::ALL.into_iter().find(|c| c.opcode() == opcode)
    }

    pub fn opcode(self) -> i32 {
        match self {
            BugCommand::Move => 1,
            BugCommand::Jump => 2,
            BugCommand::TurnLeft => 3,
            BugCommand::TurnRight => 4,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BugCommand::Move => "move",
            BugCommand::Jump => "jump",
            BugCommand::TurnLeft => "turnleft",
            BugCommand::TurnRight => "turnright",
        }
    }
}

impl std::fmt::Display for BugCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Comma-separated list of known keywords, for error messages.
pub fn known_keywords() -> String {
    BugCommand::ALL
        .iter()
        .map(|c| c.keyword())
        .collect::<Vec<_>>()
        .join(", ")
}
