//! Teaching programs demonstrating the engine's range.

use watt_core::intervals::IONIAN;
use watt_core::{Effect, Program, ProgramEvent, Stomp};

/// Toe fully forward
const FWD: u8 = 127;

/// Toe fully back
const BACK: u8 = 0;

/// Default program on start: stomp toggling, then octave jumps.
pub fn default_program() -> Program {
    Program::new("default", 240, 4, 2)
        .with_event(ProgramEvent::new(0, 0.0).with_stomp(Stomp::Bypassed))
        .with_event(ProgramEvent::new(0, 2.0).with_stomp(Stomp::Enabled))
        .with_event(ProgramEvent::new(1, 0.0).with_effect(Effect::UP_OCTAVE).with_toe(FWD))
        .with_event(ProgramEvent::new(1, 1.0).with_toe(BACK))
        .with_event(ProgramEvent::new(1, 2.0).with_effect(Effect::DOWN_OCTAVE).with_toe(FWD))
        .with_event(ProgramEvent::new(1, 3.0).with_toe(BACK))
}

/// Cycle through all 16 effect patches, one per beat.
pub fn cycle() -> Program {
    let mut program = Program::new("cycle", 280, 16, 1);
    for patch in 0..16 {
        program = program
            .with_event(ProgramEvent::new(0, patch as f64).with_effect(Effect::new(patch)));
    }
    program
}

/// Sweep the toe up across a single beat in 128 sub-beat steps.
pub fn gliss() -> Program {
    let mut program = Program::new("gliss", 280, 1, 1)
        .with_event(ProgramEvent::new(0, 0.0).with_effect(Effect::UP_TWO_OCTAVES));
    for toe in 0u8..128 {
        program = program.with_event(ProgramEvent::new(0, toe as f64 / 128.0).with_toe(toe));
    }
    program
}

/// Sweep up one bar and back down the next; sounds like a siren.
pub fn siren() -> Program {
    let mut program = Program::new("siren", 60, 1, 2)
        .with_event(ProgramEvent::new(0, 0.0).with_effect(Effect::UP_TWO_OCTAVES));
    for toe in 0u8..128 {
        program = program.with_event(ProgramEvent::new(0, toe as f64 / 128.0).with_toe(toe));
    }
    for (step, toe) in (0u8..128).rev().enumerate() {
        program = program.with_event(ProgramEvent::new(1, step as f64 / 128.0).with_toe(toe));
    }
    program
}

/// Walk up the major scale, one degree per beat.
pub fn major() -> Program {
    let mut program = Program::new("major", 240, IONIAN.len() as u32, 1);
    for (beat, note) in IONIAN.iter().enumerate() {
        program = program.with_event(
            ProgramEvent::new(0, beat as f64)
                .with_effect(Effect::UP_OCTAVE)
                .with_toe(*note),
        );
    }
    program
}

/// Arpeggiate up and back down through the scale.
pub fn arpeggio() -> Program {
    let scale = IONIAN;
    Program::new("arpeggio", 240, 8, 1)
        .with_event(
            ProgramEvent::new(0, 0.0)
                .with_effect(Effect::UP_TWO_OCTAVES)
                .with_toe(scale[0]),
        )
        .with_event(ProgramEvent::new(0, 1.0).with_toe(scale[2]))
        .with_event(ProgramEvent::new(0, 2.0).with_toe(scale[4]))
        .with_event(ProgramEvent::new(0, 3.0).with_toe(scale[7]))
        .with_event(ProgramEvent::new(0, 4.0).with_toe(scale[6]))
        .with_event(ProgramEvent::new(0, 5.0).with_toe(scale[4]))
        .with_event(ProgramEvent::new(0, 6.0).with_toe(scale[3]))
        .with_event(ProgramEvent::new(0, 7.0).with_toe(scale[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use watt_core::intervals::P1;
    use watt_core::ToeValue;

    #[test]
    fn test_gliss_beats_are_fractional_and_ordered() {
        let program = gliss();
        // Patch select plus 128 toe steps
        assert_eq!(program.events.len(), 129);
        let beats: Vec<f64> = program.events.iter().map(|e| e.beat).collect();
        assert!(beats.windows(2).all(|w| w[0] <= w[1]));
        assert!(program.events.last().unwrap().beat < 1.0);
    }

    #[test]
    fn test_siren_sweeps_up_then_down() {
        let program = siren();
        assert_eq!(program.events.len(), 257);
        assert_eq!(program.events[1].toe, Some(ToeValue::Position(0)));
        assert_eq!(program.events[128].toe, Some(ToeValue::Position(127)));
        // First event of the descent bar starts back at the top
        assert_eq!(program.events[129].bar, 1);
        assert_eq!(program.events[129].toe, Some(ToeValue::Position(127)));
        assert_eq!(program.events.last().unwrap().toe, Some(ToeValue::Position(0)));
    }

    #[test]
    fn test_cycle_covers_all_patches() {
        let program = cycle();
        assert_eq!(program.events.len(), 16);
        assert_eq!(program.events[15].effect, Some(Effect::new(15)));
    }

    #[test]
    fn test_major_starts_at_unison() {
        let program = major();
        assert_eq!(program.events[0].toe, Some(ToeValue::Interval(P1)));
        assert_eq!(program.beats_per_measure, 8);
    }
}
