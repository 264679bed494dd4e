//! watt-banks - pre-authored programs for the watt sequencer.
//!
//! These banks exist to show what the engine can do, not to be musical.
//! Each program is a plain constructor returning an eagerly materialized
//! event sequence; [`registry`] builds the name table the CLI runs from.

pub mod teaching;

use watt_core::ProgramRegistry;

/// Build the registry of all shipped programs.
pub fn registry() -> ProgramRegistry {
    let mut registry = ProgramRegistry::new();
    registry.register("default", teaching::default_program);
    registry.register("cycle", teaching::cycle);
    registry.register("gliss", teaching::gliss);
    registry.register("siren", teaching::siren);
    registry.register("major", teaching::major);
    registry.register("arpeggio", teaching::arpeggio);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_programs_listed_and_buildable() {
        let registry = registry();
        let names = registry.names();
        assert_eq!(
            names,
            vec!["arpeggio", "cycle", "default", "gliss", "major", "siren"]
        );
        for name in names {
            let program = registry.build(name).unwrap();
            assert_eq!(program.name, name);
            assert!(program.bpm > 0);
            assert!(!program.events.is_empty());
        }
    }
}
